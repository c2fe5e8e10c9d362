use std::ops::Mul;

use glam::{Affine3A, Quat, Vec3};

/// Below this magnitude a scale or weight component is treated as zero.
pub const SMALL_NUMBER: f32 = 1e-8;
/// Tolerance used when comparing transforms for equality.
pub const KINDA_SMALL_NUMBER: f32 = 1e-4;

/// Rigid transform with non-uniform scale (TRS).
///
/// Composition follows glam's convention: `parent * child` maps a point from
/// `child` space into `parent`'s space, scaling first, then rotating, then
/// translating.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    #[inline]
    #[must_use]
    pub const fn new(translation: Vec3, rotation: Quat, scale: Vec3) -> Self {
        Self {
            translation,
            rotation,
            scale,
        }
    }

    #[inline]
    #[must_use]
    pub const fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }

    #[inline]
    #[must_use]
    pub const fn from_rotation(rotation: Quat) -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation,
            scale: Vec3::ONE,
        }
    }

    #[inline]
    #[must_use]
    pub const fn from_scale(scale: Vec3) -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale,
        }
    }

    /// Decomposes an affine matrix. Shear is lost.
    #[must_use]
    pub fn from_affine(affine: &Affine3A) -> Self {
        let (scale, rotation, translation) = affine.to_scale_rotation_translation();
        Self {
            translation,
            rotation,
            scale,
        }
    }

    #[must_use]
    pub fn to_affine(&self) -> Affine3A {
        Affine3A::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }

    /// Maps a point from this transform's space into its parent space.
    #[inline]
    #[must_use]
    pub fn transform_point(&self, point: Vec3) -> Vec3 {
        self.rotation * (self.scale * point) + self.translation
    }

    /// Expresses `self` (a global transform) relative to `parent`.
    ///
    /// Inverse of composition: `parent * self.relative_to(parent) == self`
    /// whenever `parent` has no zero scale component. Zero scale components
    /// of the parent produce a zero component in the result.
    #[must_use]
    pub fn relative_to(&self, parent: &Transform) -> Transform {
        let inv_scale = safe_reciprocal(parent.scale);
        let inv_rotation = parent.rotation.inverse();
        Transform {
            translation: (inv_rotation * (self.translation - parent.translation)) * inv_scale,
            rotation: inv_rotation * self.rotation,
            scale: self.scale * inv_scale,
        }
    }

    #[must_use]
    pub fn inverse(&self) -> Transform {
        Transform::IDENTITY.relative_to(self)
    }

    /// Interpolates translation and scale linearly and rotation spherically.
    #[must_use]
    pub fn lerp(&self, other: &Transform, t: f32) -> Transform {
        Transform {
            translation: self.translation.lerp(other.translation, t),
            rotation: self.rotation.slerp(other.rotation, t),
            scale: self.scale.lerp(other.scale, t),
        }
    }

    /// Returns a copy with a unit-length rotation.
    #[must_use]
    pub fn normalized(&self) -> Transform {
        let rotation = if self.rotation.length_squared() > SMALL_NUMBER {
            self.rotation.normalize()
        } else {
            Quat::IDENTITY
        };
        Transform { rotation, ..*self }
    }

    /// Component-wise comparison; `q` and `-q` are considered equal rotations.
    #[must_use]
    pub fn abs_diff_eq(&self, other: &Transform, max_abs_diff: f32) -> bool {
        self.translation.abs_diff_eq(other.translation, max_abs_diff)
            && self.scale.abs_diff_eq(other.scale, max_abs_diff)
            && (self.rotation.abs_diff_eq(other.rotation, max_abs_diff)
                || self.rotation.abs_diff_eq(-other.rotation, max_abs_diff))
    }

    #[must_use]
    pub fn equals(&self, other: &Transform) -> bool {
        self.abs_diff_eq(other, KINDA_SMALL_NUMBER)
    }

    /// True if any scale component is within `tolerance` of zero.
    #[inline]
    #[must_use]
    pub fn has_nearly_zero_scale(&self, tolerance: f32) -> bool {
        self.scale.abs().min_element() <= tolerance
    }

    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.translation.is_finite() && self.rotation.is_finite() && self.scale.is_finite()
    }
}

impl Mul for Transform {
    type Output = Transform;

    fn mul(self, child: Transform) -> Transform {
        Transform {
            translation: self.transform_point(child.translation),
            rotation: self.rotation * child.rotation,
            scale: self.scale * child.scale,
        }
    }
}

impl Mul<&Transform> for &Transform {
    type Output = Transform;

    fn mul(self, child: &Transform) -> Transform {
        *self * *child
    }
}

#[inline]
fn safe_reciprocal(v: Vec3) -> Vec3 {
    let recip = |x: f32| if x.abs() <= SMALL_NUMBER { 0.0 } else { 1.0 / x };
    Vec3::new(recip(v.x), recip(v.y), recip(v.z))
}

#[cfg(test)]
mod tests {
    use std::f32::consts::FRAC_PI_2;

    use super::*;

    const EPSILON: f32 = 1e-5;

    fn sample() -> Transform {
        Transform::new(
            Vec3::new(1.0, -2.0, 3.0),
            Quat::from_rotation_y(0.7) * Quat::from_rotation_x(-0.3),
            Vec3::new(2.0, 0.5, 1.5),
        )
    }

    #[test]
    fn test_identity_is_neutral() {
        let t = sample();
        assert!((Transform::IDENTITY * t).abs_diff_eq(&t, EPSILON));
        assert!((t * Transform::IDENTITY).abs_diff_eq(&t, EPSILON));
    }

    #[test]
    fn test_compose_matches_affine() {
        let parent = sample();
        let child = Transform::new(Vec3::new(0.5, 1.0, -1.0), Quat::from_rotation_z(0.4), Vec3::ONE);
        let point = Vec3::new(0.3, 0.2, 0.1);

        let composed = (parent * child).transform_point(point);
        let expected = (parent.to_affine() * child.to_affine()).transform_point3(point);
        assert!(composed.abs_diff_eq(expected, EPSILON));
    }

    #[test]
    fn test_relative_to_inverts_compose() {
        let parent = sample();
        let child = Transform::new(Vec3::new(4.0, 0.0, 1.0), Quat::from_rotation_x(1.1), Vec3::new(1.0, 3.0, 0.5));

        let global = parent * child;
        assert!(global.relative_to(&parent).abs_diff_eq(&child, EPSILON));
    }

    #[test]
    fn test_inverse() {
        let t = sample();
        assert!((t * t.inverse()).abs_diff_eq(&Transform::IDENTITY, EPSILON));
    }

    #[test]
    fn test_rotation_sign_insensitive_compare() {
        let a = Transform::from_rotation(Quat::from_rotation_z(FRAC_PI_2));
        let b = Transform::from_rotation(-Quat::from_rotation_z(FRAC_PI_2));
        assert!(a.abs_diff_eq(&b, EPSILON));
    }

    #[test]
    fn test_zero_scale_parent() {
        let parent = Transform::from_scale(Vec3::new(0.0, 1.0, 1.0));
        let global = Transform::from_translation(Vec3::new(1.0, 2.0, 3.0));
        let local = global.relative_to(&parent);
        assert!(local.is_finite());
        assert_eq!(local.translation.x, 0.0);
        assert!(parent.has_nearly_zero_scale(SMALL_NUMBER));
    }
}
