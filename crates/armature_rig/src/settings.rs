//! Hierarchy Settings
//!
//! Runtime switches of a [`RigHierarchy`](crate::RigHierarchy).
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use armature_rig::{HierarchySettings, RigHierarchy};
//!
//! // Defaults: propagation on, cache validation in debug builds only
//! let hierarchy = RigHierarchy::new();
//!
//! // Bulk import: skip validation and listener fan-out
//! let hierarchy = RigHierarchy::with_settings(HierarchySettings {
//!     ensure_cache_validity: false,
//!     forward_to_listeners: false,
//!     ..Default::default()
//! });
//! ```

use armature_core::SMALL_NUMBER;

/// Configuration of a rig hierarchy instance.
#[derive(Debug, Clone, PartialEq)]
pub struct HierarchySettings {
    /// Invalidate dependents when a transform is written.
    ///
    /// When disabled, writers are responsible for keeping dependents coherent
    /// (for example by calling
    /// [`compute_all_transforms`](crate::RigHierarchy::compute_all_transforms)
    /// before the edit).
    pub enable_dirty_propagation: bool,

    /// After every mutating call, verify that no element has both its local
    /// and its global transform dirty.
    ///
    /// Defaults to `true` in debug builds.
    pub ensure_cache_validity: bool,

    /// Forward value and weight edits to registered listener hierarchies.
    pub forward_to_listeners: bool,

    /// Growth granularity of the element array and the transform arenas.
    pub element_block_size: usize,

    /// Scale components with a magnitude at or below this are treated as
    /// collapsed when recovering local transforms from global ones.
    pub zero_scale_tolerance: f32,
}

impl Default for HierarchySettings {
    fn default() -> Self {
        Self {
            enable_dirty_propagation: true,
            ensure_cache_validity: cfg!(debug_assertions),
            forward_to_listeners: true,
            element_block_size: 64,
            zero_scale_tolerance: SMALL_NUMBER,
        }
    }
}
