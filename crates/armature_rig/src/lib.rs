//! # Armature Rig
//!
//! The rig hierarchy engine. A [`RigHierarchy`] owns a set of named elements
//! (bones, nulls, controls, curves, references, connectors and sockets) and
//! caches four transforms per element: initial and current pose, each in
//! local and global space. Only one side of each pair needs to be valid; the
//! other is recomputed lazily on read.
//!
//! ## Modules
//!
//! - [`hierarchy`]: the element store and slot bookkeeping
//! - [`resolve`]: lazy local/global resolution
//! - [`mutate`]: transform and curve writes
//! - [`propagate`]: dirty propagation to dependents
//! - [`solver`]: weighted multi-parent blending and its inverse
//! - [`structure`]: element creation, parenting, removal and renaming
//! - [`weights`]: parent weights and space switching
//! - [`children`]: the versioned child cache
//! - [`dependency`]: dependency and cycle queries
//! - [`pose`]: pose reset, copy and storage compaction
//! - [`snapshot`]: pose capture and reapplication by key
//! - [`events`], [`listener`]: change notifications and mirrored hierarchies
//!
//! ## Example
//!
//! ```
//! use armature_rig::RigHierarchy;
//! use armature_core::Transform;
//! use glam::Vec3;
//!
//! let mut rig = RigHierarchy::new();
//! let root = rig.add_bone("root", None, Transform::from_translation(Vec3::X), false)?;
//! let tip = rig.add_bone("tip", Some(root), Transform::from_translation(Vec3::Y), false)?;
//!
//! let global = rig.get_global_transform(&tip, false).unwrap_or_default();
//! assert!(global.translation.abs_diff_eq(Vec3::new(1.0, 1.0, 0.0), 1e-6));
//! # Ok::<(), armature_core::RigError>(())
//! ```

pub mod children;
pub mod dependency;
pub mod element;
pub mod events;
pub mod hierarchy;
pub mod listener;
pub mod mutate;
pub mod pose;
pub mod propagate;
pub mod resolve;
pub mod settings;
pub mod snapshot;
pub mod solver;
pub mod storage;
pub mod structure;
pub mod weights;

pub use dependency::{DependencyProvider, NoDependencies};
pub use element::{
    ControlSettings, CurveValue, Element, MultiParent, ParentConstraint, ParentModel, TransformSlots,
};
pub use events::{EventHandler, HierarchyEvent};
pub use hierarchy::RigHierarchy;
pub use listener::SharedHierarchy;
pub use settings::HierarchySettings;
pub use snapshot::{PoseEntry, RigPose};
pub use solver::{inverse_solve, solve};
pub use storage::{ReusableStorage, SlotRemap};

pub use armature_core::{
    ElementKey, ElementType, ElementTypeMask, ElementWeight, Result, RigError, Transform, TransformAspect,
    TransformType,
};
