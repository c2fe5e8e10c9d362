#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::too_many_arguments)]

//! # Armature
//!
//! Hierarchical transform cache and multi-parent constraint solver for
//! procedural character rigs.
//!
//! This crate re-exports the workspace members:
//!
//! - [`armature_core`]: transforms, weights, element keys and errors
//! - [`armature_rig`]: the [`RigHierarchy`] and everything operating on it
//!
//! ```
//! use armature::{ElementWeight, RigHierarchy, Transform};
//! use glam::Vec3;
//!
//! let mut rig = RigHierarchy::new();
//! let a = rig.add_bone("a", None, Transform::from_translation(Vec3::new(10.0, 0.0, 0.0)), true)?;
//! let b = rig.add_bone("b", None, Transform::IDENTITY, true)?;
//! let n = rig.add_null("n", Some(a), Transform::IDENTITY, false)?;
//! rig.add_parent(&n, &b, ElementWeight::FULL, false, None)?;
//!
//! let global = rig.get_global_transform(&n, false).unwrap_or_default();
//! assert!(global.translation.abs_diff_eq(Vec3::new(5.0, 0.0, 0.0), 1e-5));
//! # Ok::<(), armature::RigError>(())
//! ```

pub use armature_core;
pub use armature_rig;

pub use armature_core::{
    ElementKey, ElementType, ElementTypeMask, ElementWeight, KINDA_SMALL_NUMBER, Result, RigError, SMALL_NUMBER,
    TopologyVersion, Transform, TransformAspect, TransformType, VersionedCache, interner,
};
pub use armature_rig::{
    ControlSettings, DependencyProvider, HierarchyEvent, HierarchySettings, NoDependencies, PoseEntry, RigHierarchy,
    RigPose, SharedHierarchy,
};

pub use glam;
