use super::transform::SMALL_NUMBER;

/// Per-channel influence of a parent constraint.
///
/// Components are never negative: every constructor and setter clamps to zero.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ElementWeight {
    pub location: f32,
    pub rotation: f32,
    pub scale: f32,
}

impl Default for ElementWeight {
    fn default() -> Self {
        Self::FULL
    }
}

impl ElementWeight {
    pub const FULL: Self = Self {
        location: 1.0,
        rotation: 1.0,
        scale: 1.0,
    };

    pub const ZERO: Self = Self {
        location: 0.0,
        rotation: 0.0,
        scale: 0.0,
    };

    #[must_use]
    pub fn new(location: f32, rotation: f32, scale: f32) -> Self {
        Self {
            location: location.max(0.0),
            rotation: rotation.max(0.0),
            scale: scale.max(0.0),
        }
    }

    /// Same weight on all three channels.
    #[must_use]
    pub fn uniform(weight: f32) -> Self {
        Self::new(weight, weight, weight)
    }

    /// Re-applies the non-negative clamp after direct field writes.
    #[must_use]
    pub fn clamped(self) -> Self {
        Self::new(self.location, self.rotation, self.scale)
    }

    #[inline]
    #[must_use]
    pub fn affects_location(&self) -> bool {
        self.location > SMALL_NUMBER
    }

    #[inline]
    #[must_use]
    pub fn affects_rotation(&self) -> bool {
        self.rotation > SMALL_NUMBER
    }

    #[inline]
    #[must_use]
    pub fn affects_scale(&self) -> bool {
        self.scale > SMALL_NUMBER
    }

    #[must_use]
    pub fn affects_any(&self) -> bool {
        self.affects_location() || self.affects_rotation() || self.affects_scale()
    }

    #[must_use]
    pub fn is_almost_zero(&self) -> bool {
        !self.affects_any()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weights_are_clamped() {
        let w = ElementWeight::new(-1.0, 0.5, -0.0);
        assert_eq!(w.location, 0.0);
        assert_eq!(w.rotation, 0.5);
        assert!(w.scale >= 0.0);
        assert!(!w.affects_location());
        assert!(w.affects_rotation());
    }

    #[test]
    fn test_zero_weight() {
        assert!(ElementWeight::ZERO.is_almost_zero());
        assert!(!ElementWeight::FULL.is_almost_zero());
        assert!(ElementWeight::uniform(1e-9).is_almost_zero());
    }
}
