//! Error Types
//!
//! This module defines the error types used throughout the rig hierarchy.
//!
//! # Overview
//!
//! The main error type [`RigError`] covers the recoverable failure modes of
//! structural edits:
//! - Lookup failures for element keys passed to mutating calls
//! - Parent relationship edits that are not applicable to an element
//! - Reparent / space-switch requests rejected because they would create a cycle
//!
//! Read-only queries never return errors: they hand back `Option` or an
//! identity value. Cache-coherence violations are programming errors and
//! panic in debug builds instead of being reported here.
//!
//! ```rust,ignore
//! use armature_core::errors::{RigError, Result};
//!
//! fn reparent() -> Result<()> {
//!     // Structural operations that may be rejected return Result
//!     Ok(())
//! }
//! ```

use thiserror::Error;

use crate::key::ElementKey;

/// The main error type for the rig hierarchy.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RigError {
    // ========================================================================
    // Lookup Errors
    // ========================================================================
    /// The requested element does not exist in the hierarchy.
    #[error("Element not found: {0}")]
    ElementNotFound(ElementKey),

    /// The requested parent is not one of the child's parents.
    #[error("'{parent}' is not a parent of '{child}'")]
    ParentNotFound {
        /// The child element
        child: ElementKey,
        /// The parent that was looked up
        parent: ElementKey,
    },

    /// A parent constraint index does not exist on the element.
    #[error("Constraint index {index} is out of range for '{child}'")]
    ConstraintIndexOutOfRange {
        /// The multi parent element
        child: ElementKey,
        /// The invalid constraint index
        index: usize,
    },

    // ========================================================================
    // Capability Errors
    // ========================================================================
    /// The element carries no transform (curves, connectors).
    #[error("Element '{0}' does not carry a transform")]
    NotATransformElement(ElementKey),

    /// The operation requires a multi parent element (nulls, controls).
    #[error("Element '{0}' does not support parent constraints")]
    NotMultiParent(ElementKey),

    /// The operation requires a control element.
    #[error("Element '{0}' is not a control")]
    NotAControl(ElementKey),

    /// The operation requires a curve element.
    #[error("Element '{0}' is not a curve")]
    NotACurve(ElementKey),

    // ========================================================================
    // Topology Errors
    // ========================================================================
    /// The child is already parented to the given parent.
    #[error("'{child}' is already parented to '{parent}'")]
    AlreadyParented {
        /// The child element
        child: ElementKey,
        /// The existing parent
        parent: ElementKey,
    },

    /// The requested parent relationship would make the hierarchy cyclic.
    #[error("Cannot parent '{child}' to '{parent}' - would cause a cycle")]
    CycleRejected {
        /// The element that was about to be reparented
        child: ElementKey,
        /// The requested parent, which already depends on `child`
        parent: ElementKey,
    },

    /// Sockets are attachment points for external content and never parent
    /// other elements.
    #[error("Cannot parent '{child}' under socket '{parent}'")]
    SocketParent {
        /// The element that was about to be parented
        child: ElementKey,
        /// The rejected socket
        parent: ElementKey,
    },

    /// A control with restricted space switching was asked to switch to a new space.
    #[error("Control '{control}' cannot switch to '{space}' - space switching is restricted")]
    SpaceSwitchingRestricted {
        /// The control element
        control: ElementKey,
        /// The rejected space
        space: ElementKey,
    },

    /// An element with the same key already exists.
    #[error("An element named '{0}' already exists")]
    NameCollision(ElementKey),
}

/// Alias for `Result<T, RigError>`.
pub type Result<T> = std::result::Result<T, RigError>;
