//! # Armature Core
//!
//! Foundational value types shared by the rig hierarchy:
//!
//! - [`Transform`]: translation / rotation / scale with glam-style composition
//! - [`ElementWeight`]: per-channel parent constraint weights
//! - [`ElementKey`], [`ElementType`], [`ElementTypeMask`]: element identity
//! - [`TransformType`], [`TransformAspect`]: addressing of cached transforms
//! - [`TopologyVersion`], [`VersionedCache`]: invalidation of derived caches
//! - [`RigError`]: recoverable errors of structural edits

pub mod errors;
pub mod interner;
pub mod key;
pub mod math;
pub mod version;

pub use errors::{Result, RigError};
pub use interner::Symbol;
pub use key::{ElementKey, ElementType, ElementTypeMask, TransformAspect, TransformType};
pub use math::{ElementWeight, KINDA_SMALL_NUMBER, SMALL_NUMBER, Transform};
pub use version::{TopologyVersion, VersionedCache};
