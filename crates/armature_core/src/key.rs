//! Element identity and transform addressing.
//!
//! An element is identified by its [`ElementKey`]: the pair of its
//! [`ElementType`] and its interned name. Transforms are addressed by a
//! [`TransformType`] (initial/current × local/global) and, for controls, a
//! [`TransformAspect`].

use std::fmt;

use bitflags::bitflags;

use crate::interner::{self, Symbol};

/// The kind of an element. Determines which capabilities it carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ElementType {
    Bone,
    Null,
    Control,
    Curve,
    Reference,
    Connector,
    Socket,
}

impl ElementType {
    /// All element types, in bucket order.
    pub const ALL: [ElementType; 7] = [
        ElementType::Bone,
        ElementType::Null,
        ElementType::Control,
        ElementType::Curve,
        ElementType::Reference,
        ElementType::Connector,
        ElementType::Socket,
    ];

    /// Position of this type in [`ElementType::ALL`].
    #[inline]
    #[must_use]
    pub const fn bucket(self) -> usize {
        self as usize
    }

    #[must_use]
    pub const fn mask(self) -> ElementTypeMask {
        match self {
            ElementType::Bone => ElementTypeMask::BONE,
            ElementType::Null => ElementTypeMask::NULL,
            ElementType::Control => ElementTypeMask::CONTROL,
            ElementType::Curve => ElementTypeMask::CURVE,
            ElementType::Reference => ElementTypeMask::REFERENCE,
            ElementType::Connector => ElementTypeMask::CONNECTOR,
            ElementType::Socket => ElementTypeMask::SOCKET,
        }
    }

    /// Elements of this type hold pose transform slots.
    #[must_use]
    pub const fn has_transform(self) -> bool {
        !matches!(self, ElementType::Curve | ElementType::Connector)
    }

    /// Elements of this type hold at most one parent.
    #[must_use]
    pub const fn is_single_parent(self) -> bool {
        matches!(
            self,
            ElementType::Bone | ElementType::Reference | ElementType::Socket
        )
    }

    /// Elements of this type hold an ordered list of weighted parent constraints.
    #[must_use]
    pub const fn is_multi_parent(self) -> bool {
        matches!(self, ElementType::Null | ElementType::Control)
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ElementType::Bone => "Bone",
            ElementType::Null => "Null",
            ElementType::Control => "Control",
            ElementType::Curve => "Curve",
            ElementType::Reference => "Reference",
            ElementType::Connector => "Connector",
            ElementType::Socket => "Socket",
        };
        f.write_str(name)
    }
}

bitflags! {
    /// A set of element types, used to filter queries and pose resets.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct ElementTypeMask: u32 {
        const BONE      = 1 << 0;
        const NULL      = 1 << 1;
        const CONTROL   = 1 << 2;
        const CURVE     = 1 << 3;
        const REFERENCE = 1 << 4;
        const CONNECTOR = 1 << 5;
        const SOCKET    = 1 << 6;
    }
}

impl ElementTypeMask {
    #[inline]
    #[must_use]
    pub fn contains_type(self, ty: ElementType) -> bool {
        self.contains(ty.mask())
    }
}

/// Unique identity of an element within a hierarchy.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementKey {
    pub ty: ElementType,
    pub name: Symbol,
}

impl ElementKey {
    /// Creates a key, interning `name`.
    pub fn new(ty: ElementType, name: &str) -> Self {
        Self {
            ty,
            name: interner::intern(name),
        }
    }

    #[inline]
    #[must_use]
    pub const fn from_symbol(ty: ElementType, name: Symbol) -> Self {
        Self { ty, name }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        interner::resolve(self.name)
    }
}

impl fmt::Debug for ElementKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.ty, self.name())
    }
}

impl fmt::Display for ElementKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.ty, self.name())
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for ElementKey {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        (self.ty, self.name()).serialize(serializer)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for ElementKey {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let (ty, name): (ElementType, String) = serde::Deserialize::deserialize(deserializer)?;
        Ok(ElementKey::new(ty, &name))
    }
}

/// Which of the four cached variants of a transform is addressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TransformType {
    InitialLocal = 0,
    CurrentLocal = 1,
    InitialGlobal = 2,
    CurrentGlobal = 3,
}

impl TransformType {
    pub const ALL: [TransformType; 4] = [
        TransformType::InitialLocal,
        TransformType::CurrentLocal,
        TransformType::InitialGlobal,
        TransformType::CurrentGlobal,
    ];

    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    #[inline]
    #[must_use]
    pub const fn is_initial(self) -> bool {
        matches!(self, TransformType::InitialLocal | TransformType::InitialGlobal)
    }

    #[inline]
    #[must_use]
    pub const fn is_local(self) -> bool {
        matches!(self, TransformType::InitialLocal | TransformType::CurrentLocal)
    }

    #[inline]
    #[must_use]
    pub const fn is_global(self) -> bool {
        !self.is_local()
    }

    /// The opposing representation of the same pose.
    #[must_use]
    pub const fn swap_local_and_global(self) -> Self {
        match self {
            TransformType::InitialLocal => TransformType::InitialGlobal,
            TransformType::CurrentLocal => TransformType::CurrentGlobal,
            TransformType::InitialGlobal => TransformType::InitialLocal,
            TransformType::CurrentGlobal => TransformType::CurrentLocal,
        }
    }

    #[must_use]
    pub const fn make_local(self) -> Self {
        if self.is_initial() {
            TransformType::InitialLocal
        } else {
            TransformType::CurrentLocal
        }
    }

    #[must_use]
    pub const fn make_global(self) -> Self {
        if self.is_initial() {
            TransformType::InitialGlobal
        } else {
            TransformType::CurrentGlobal
        }
    }

    #[must_use]
    pub const fn make_initial(self) -> Self {
        if self.is_local() {
            TransformType::InitialLocal
        } else {
            TransformType::InitialGlobal
        }
    }

    #[must_use]
    pub const fn make_current(self) -> Self {
        if self.is_local() {
            TransformType::CurrentLocal
        } else {
            TransformType::CurrentGlobal
        }
    }

    /// Builds a type from its two axes.
    #[must_use]
    pub const fn from_parts(initial: bool, local: bool) -> Self {
        match (initial, local) {
            (true, true) => TransformType::InitialLocal,
            (false, true) => TransformType::CurrentLocal,
            (true, false) => TransformType::InitialGlobal,
            (false, false) => TransformType::CurrentGlobal,
        }
    }
}

/// Which transform of an element is addressed. Only controls carry offset and shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TransformAspect {
    Pose = 0,
    Offset = 1,
    Shape = 2,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transform_type_axes() {
        for ty in TransformType::ALL {
            assert_eq!(ty.swap_local_and_global().swap_local_and_global(), ty);
            assert_eq!(ty.swap_local_and_global().is_initial(), ty.is_initial());
            assert_ne!(ty.swap_local_and_global().is_local(), ty.is_local());
            assert_eq!(TransformType::from_parts(ty.is_initial(), ty.is_local()), ty);
        }
        assert_eq!(TransformType::CurrentGlobal.make_local(), TransformType::CurrentLocal);
        assert_eq!(TransformType::CurrentLocal.make_initial(), TransformType::InitialLocal);
    }

    #[test]
    fn test_capabilities_are_exclusive() {
        for ty in ElementType::ALL {
            assert!(!(ty.is_single_parent() && ty.is_multi_parent()));
            if ty.is_single_parent() || ty.is_multi_parent() {
                assert!(ty.has_transform());
            }
        }
        assert!(!ElementType::Connector.is_single_parent());
        assert!(!ElementType::Connector.has_transform());
    }

    #[test]
    fn test_key_display() {
        let key = ElementKey::new(ElementType::Bone, "spine");
        assert_eq!(key.to_string(), "Bone(spine)");
        assert_eq!(key, ElementKey::new(ElementType::Bone, "spine"));
        assert_ne!(key, ElementKey::new(ElementType::Null, "spine"));
    }

    #[test]
    fn test_mask() {
        let mask = ElementTypeMask::BONE | ElementTypeMask::CONTROL;
        assert!(mask.contains_type(ElementType::Bone));
        assert!(mask.contains_type(ElementType::Control));
        assert!(!mask.contains_type(ElementType::Null));
        assert!(ElementTypeMask::all().contains_type(ElementType::Socket));
    }
}
