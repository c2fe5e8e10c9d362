//! Transform and weight math tests
//!
//! Tests for:
//! - Composition order and `relative_to` round-trips
//! - Inverse, interpolation and normalization
//! - Zero scale handling
//! - ElementWeight clamping and channel queries

use armature::{ElementWeight, SMALL_NUMBER, Transform};
use glam::{Affine3A, Quat, Vec3};
use std::f32::consts::{FRAC_PI_2, FRAC_PI_4};

// ============================================================================
// Helper
// ============================================================================

const EPSILON: f32 = 1e-5;

fn vec3_approx(a: Vec3, b: Vec3) -> bool {
    a.abs_diff_eq(b, EPSILON)
}

fn sample_parent() -> Transform {
    Transform::new(
        Vec3::new(1.0, -2.0, 3.0),
        Quat::from_rotation_y(FRAC_PI_4) * Quat::from_rotation_x(0.3),
        Vec3::new(2.0, 0.5, 1.5),
    )
}

fn sample_child() -> Transform {
    Transform::new(
        Vec3::new(0.5, 4.0, -1.0),
        Quat::from_rotation_z(1.1),
        Vec3::new(1.0, 3.0, 0.25),
    )
}

// ============================================================================
// Composition
// ============================================================================

#[test]
fn transform_default_is_identity() {
    let t = Transform::default();
    assert_eq!(t, Transform::IDENTITY);
    assert_eq!(t.translation, Vec3::ZERO);
    assert_eq!(t.rotation, Quat::IDENTITY);
    assert_eq!(t.scale, Vec3::ONE);
}

#[test]
fn transform_composition_applies_parent_last() {
    let parent = Transform::new(Vec3::new(10.0, 0.0, 0.0), Quat::from_rotation_z(FRAC_PI_2), Vec3::splat(2.0));
    let child = Transform::from_translation(Vec3::X);

    let global = parent * child;
    // child offset is scaled, rotated onto +Y, then translated
    assert!(vec3_approx(global.translation, Vec3::new(10.0, 2.0, 0.0)));
    assert!(global.rotation.abs_diff_eq(parent.rotation, EPSILON));
    assert!(vec3_approx(global.scale, Vec3::splat(2.0)));
}

#[test]
fn transform_composition_matches_affine() {
    let parent = Transform::new(Vec3::new(1.0, 2.0, 3.0), Quat::from_rotation_y(0.7), Vec3::splat(1.5));
    let child = Transform::new(Vec3::new(-1.0, 0.5, 2.0), Quat::from_rotation_x(0.2), Vec3::splat(0.5));

    let composed = (parent * child).to_affine();
    let expected = parent.to_affine() * child.to_affine();
    assert!(composed.abs_diff_eq(expected, EPSILON));
}

#[test]
fn transform_affine_round_trip() {
    let t = Transform::new(Vec3::new(3.0, -1.0, 2.0), Quat::from_rotation_z(0.4), Vec3::new(1.0, 2.0, 3.0));
    let back = Transform::from_affine(&t.to_affine());
    assert!(back.abs_diff_eq(&t, EPSILON));

    let affine = Affine3A::from_translation(Vec3::Y);
    assert!(Transform::from_affine(&affine).abs_diff_eq(&Transform::from_translation(Vec3::Y), EPSILON));
}

#[test]
fn transform_relative_to_inverts_composition() {
    let parent = sample_parent();
    let child = sample_child();

    let global = parent * child;
    let local = global.relative_to(&parent);
    assert!(local.abs_diff_eq(&child, 1e-4));
    assert!((parent * local).abs_diff_eq(&global, 1e-4));
}

#[test]
fn transform_inverse_composes_to_identity() {
    let t = Transform::new(Vec3::new(4.0, 5.0, 6.0), Quat::from_rotation_x(FRAC_PI_4), Vec3::splat(2.0));
    let round = t * t.inverse();
    assert!(round.abs_diff_eq(&Transform::IDENTITY, EPSILON));
}

#[test]
fn transform_point_matches_composition() {
    let t = sample_parent();
    let p = Vec3::new(1.0, 1.0, 1.0);
    let via_compose = (t * Transform::from_translation(p)).translation;
    assert!(vec3_approx(t.transform_point(p), via_compose));
}

// ============================================================================
// Interpolation & normalization
// ============================================================================

#[test]
fn transform_lerp_endpoints_and_midpoint() {
    let a = Transform::from_translation(Vec3::ZERO);
    let b = Transform::new(Vec3::new(10.0, 0.0, 0.0), Quat::from_rotation_z(FRAC_PI_2), Vec3::splat(3.0));

    assert!(a.lerp(&b, 0.0).abs_diff_eq(&a, EPSILON));
    assert!(a.lerp(&b, 1.0).abs_diff_eq(&b, EPSILON));

    let mid = a.lerp(&b, 0.5);
    assert!(vec3_approx(mid.translation, Vec3::new(5.0, 0.0, 0.0)));
    assert!(vec3_approx(mid.scale, Vec3::splat(2.0)));
    assert!(mid.rotation.abs_diff_eq(Quat::from_rotation_z(FRAC_PI_4), EPSILON));
}

#[test]
fn transform_normalized_fixes_rotation_length() {
    let mut t = Transform::IDENTITY;
    t.rotation = Quat::from_xyzw(0.0, 0.0, 2.0, 0.0);
    let n = t.normalized();
    assert!((n.rotation.length() - 1.0).abs() < EPSILON);

    t.rotation = Quat::from_xyzw(0.0, 0.0, 0.0, 0.0);
    assert_eq!(t.normalized().rotation, Quat::IDENTITY);
}

#[test]
fn transform_equality_ignores_quaternion_sign() {
    let a = Transform::from_rotation(Quat::from_rotation_y(0.5));
    let mut b = a;
    b.rotation = -b.rotation;
    assert!(a.equals(&b));
    assert!(!a.equals(&Transform::from_rotation(Quat::from_rotation_y(0.6))));
}

// ============================================================================
// Zero scale
// ============================================================================

#[test]
fn transform_relative_to_zero_scale_parent_is_finite() {
    let parent = Transform::from_scale(Vec3::new(0.0, 1.0, 1.0));
    let global = Transform::from_translation(Vec3::new(3.0, 2.0, 1.0));

    let local = global.relative_to(&parent);
    assert!(local.is_finite());
    assert_eq!(local.translation.x, 0.0);
    assert_eq!(local.scale.x, 0.0);
    assert!(local.has_nearly_zero_scale(SMALL_NUMBER));
    assert!(!global.has_nearly_zero_scale(SMALL_NUMBER));
}

// ============================================================================
// ElementWeight
// ============================================================================

#[test]
fn weight_constructors_clamp_negative_values() {
    let w = ElementWeight::new(-2.0, 0.0, 3.0);
    assert_eq!(w.location, 0.0);
    assert_eq!(w.scale, 3.0);
    assert!(!w.affects_location());
    assert!(!w.affects_rotation());
    assert!(w.affects_scale());
    assert!(w.affects_any());

    let mut raw = ElementWeight::FULL;
    raw.scale = -3.0;
    assert_eq!(raw.clamped().scale, 0.0);
}

#[test]
fn weight_zero_and_full() {
    assert!(ElementWeight::ZERO.is_almost_zero());
    assert!(!ElementWeight::ZERO.affects_any());
    assert!(!ElementWeight::FULL.is_almost_zero());
    assert_eq!(ElementWeight::default(), ElementWeight::FULL);
    assert_eq!(ElementWeight::uniform(0.25), ElementWeight::new(0.25, 0.25, 0.25));
}
