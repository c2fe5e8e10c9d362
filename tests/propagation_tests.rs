//! Dirty Propagation Tests
//!
//! Tests for:
//! - Coherence of every element after sequences of writes
//! - Diamonds: multi parent elements reached through several paths
//! - Reparenting with and without keeping the global transform
//! - Cache validation and disabled propagation

use armature::{
    ControlSettings, ElementKey, ElementWeight, HierarchySettings, RigHierarchy, Transform, TransformType,
};
use glam::{Quat, Vec3};

// ============================================================================
// Helper
// ============================================================================

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

const EPSILON: f32 = 1e-4;

fn at(x: f32, y: f32, z: f32) -> Transform {
    Transform::from_translation(Vec3::new(x, y, z))
}

fn trs(t: Vec3, angle: f32, s: f32) -> Transform {
    Transform::new(t, Quat::from_rotation_y(angle), Vec3::splat(s))
}

fn global(h: &mut RigHierarchy, key: &ElementKey) -> Transform {
    h.get_global_transform(key, false).expect("element has a pose")
}

/// Every element must satisfy `global == parent_space * local` for both poses.
fn assert_coherent(h: &mut RigHierarchy) {
    h.ensure_cache_validity();
    for index in 0..h.len() {
        if h.get(index).is_some_and(|e| e.element_type().has_transform()) {
            for initial in [true, false] {
                let local = h.get_transform(index, TransformType::from_parts(initial, true));
                let global = h.get_transform(index, TransformType::from_parts(initial, false));
                let parent = h.get_parent_transform(index, initial);
                let key = h.key_of(index).unwrap();
                assert!(
                    (parent * local).abs_diff_eq(&global, EPSILON),
                    "{key} is incoherent (initial: {initial}): {:?} vs {:?}",
                    parent * local,
                    global
                );
            }
        }
    }
}

/// A small rig with a spine chain, two arms, a control and a null blended
/// between both hands.
struct Rig {
    h: RigHierarchy,
    hips: ElementKey,
    spine: ElementKey,
    hand_l: ElementKey,
    hand_r: ElementKey,
    ctrl: ElementKey,
    prop: ElementKey,
    tip: ElementKey,
}

fn rig() -> Rig {
    let mut h = RigHierarchy::new();
    let hips = h.add_bone("hips", None, trs(Vec3::new(0.0, 1.0, 0.0), 0.1, 1.0), false).unwrap();
    let spine = h.add_bone("spine", Some(hips), trs(Vec3::new(0.0, 0.5, 0.0), -0.2, 1.0), false).unwrap();
    let arm_l = h.add_bone("arm_l", Some(spine), trs(Vec3::new(0.5, 0.2, 0.0), 0.3, 1.0), false).unwrap();
    let hand_l = h.add_bone("hand_l", Some(arm_l), at(0.4, 0.0, 0.0), false).unwrap();
    let arm_r = h.add_bone("arm_r", Some(spine), trs(Vec3::new(-0.5, 0.2, 0.0), -0.3, 1.0), false).unwrap();
    let hand_r = h.add_bone("hand_r", Some(arm_r), at(-0.4, 0.0, 0.0), false).unwrap();
    let ctrl = h
        .add_control(
            "hand_l_ctrl",
            Some(hand_l),
            ControlSettings::default(),
            trs(Vec3::new(0.0, 0.1, 0.0), 0.5, 1.0),
            at(0.0, 0.0, 0.2),
            Transform::from_scale(Vec3::splat(0.5)),
        )
        .unwrap();
    let prop = h.add_null("prop", Some(hand_l), at(0.0, -0.1, 0.0), false).unwrap();
    h.add_parent(&prop, &hand_r, ElementWeight::FULL, false, None).unwrap();
    let tip = h.add_bone("prop_tip", Some(prop), at(0.0, 0.0, 0.3), false).unwrap();
    Rig {
        h,
        hips,
        spine,
        hand_l,
        hand_r,
        ctrl,
        prop,
        tip,
    }
}

// ============================================================================
// Coherence
// ============================================================================

#[test]
fn propagation_fresh_rig_is_coherent() {
    let mut r = rig();
    assert_coherent(&mut r.h);
}

#[test]
fn propagation_write_sequence_stays_coherent() {
    init_logger();
    let mut r = rig();
    let Rig {
        hips,
        spine,
        hand_l,
        hand_r,
        ctrl,
        prop,
        tip,
        ..
    } = r;

    let edits: [(ElementKey, Transform, bool, bool); 9] = [
        (hips, trs(Vec3::new(1.0, 1.0, 0.0), 0.4, 1.0), false, true),
        (spine, trs(Vec3::new(0.0, 2.0, 0.5), -0.3, 1.0), true, false),
        (hand_l, at(0.2, 0.0, 0.0), false, false),
        (prop, trs(Vec3::new(0.3, 0.3, 0.3), 1.0, 1.0), true, true),
        (hand_r, trs(Vec3::new(-2.0, 2.0, 0.0), 0.7, 1.0), true, true),
        (ctrl, at(0.0, 0.0, 1.0), false, true),
        (tip, at(5.0, 5.0, 5.0), true, false),
        (hips, Transform::IDENTITY, false, false),
        (spine, trs(Vec3::ZERO, 0.9, 2.0), false, true),
    ];

    for (key, transform, in_global, affect_children) in edits {
        if in_global {
            r.h.set_global_transform(&key, &transform, false, affect_children).unwrap();
        } else {
            r.h.set_local_transform(&key, &transform, false, affect_children).unwrap();
        }
        assert_coherent(&mut r.h);
    }
}

#[test]
fn propagation_reaches_diamond_once_moved() {
    init_logger();
    let mut r = rig();
    let before = global(&mut r.h, &r.tip);

    // both hands move with the spine, so the blended prop moves too
    r.h.set_local_transform(&r.spine, &at(0.0, 3.0, 0.0), false, true).unwrap();
    let after = global(&mut r.h, &r.tip);
    assert!(!after.abs_diff_eq(&before, EPSILON));
    assert_coherent(&mut r.h);
}

#[test]
fn propagation_stay_in_place_pins_direct_dependents() {
    let mut r = rig();
    let prop_before = global(&mut r.h, &r.prop);
    let tip_before = global(&mut r.h, &r.tip);

    r.h.set_global_transform(&r.hand_l, &at(3.0, 0.0, 0.0), false, false).unwrap();

    assert!(global(&mut r.h, &r.prop).abs_diff_eq(&prop_before, EPSILON));
    assert!(global(&mut r.h, &r.tip).abs_diff_eq(&tip_before, EPSILON));
    assert_coherent(&mut r.h);
}

#[test]
fn propagation_initial_and_current_are_independent() {
    let mut r = rig();
    let current_before = global(&mut r.h, &r.tip);

    r.h.set_local_transform(&r.hips, &at(9.0, 9.0, 9.0), true, true).unwrap();
    assert!(global(&mut r.h, &r.tip).abs_diff_eq(&current_before, EPSILON));

    let initial = r.h.get_global_transform(&r.tip, true).unwrap();
    assert!(!initial.abs_diff_eq(&current_before, EPSILON));
    assert_coherent(&mut r.h);
}

#[test]
fn propagation_offset_write_moves_control_subtree() {
    let mut r = rig();
    let under = r.h.add_bone("under_ctrl", Some(r.ctrl), at(0.0, 0.5, 0.0), false).unwrap();
    let before = global(&mut r.h, &under);

    r.h.set_control_offset(&r.ctrl, &at(1.0, 0.0, 0.0), TransformType::CurrentLocal, true)
        .unwrap();
    assert!(!global(&mut r.h, &under).abs_diff_eq(&before, EPSILON));
    assert_coherent(&mut r.h);

    r.h.set_control_offset(&r.ctrl, &at(2.0, 0.0, 0.0), TransformType::CurrentLocal, false)
        .unwrap();
    let pinned = global(&mut r.h, &under);
    r.h.set_control_offset(&r.ctrl, &at(3.0, 0.0, 0.0), TransformType::CurrentLocal, false)
        .unwrap();
    assert!(global(&mut r.h, &under).abs_diff_eq(&pinned, EPSILON));
    assert_coherent(&mut r.h);
}

// ============================================================================
// Reparenting
// ============================================================================

#[test]
fn reparent_keeping_global() {
    let mut r = rig();
    let before = global(&mut r.h, &r.hand_l);
    r.h.set_parent(&r.hand_l, &r.hips, true).unwrap();

    assert_eq!(r.h.get_first_parent(&r.hand_l), Some(r.hips));
    assert!(global(&mut r.h, &r.hand_l).abs_diff_eq(&before, EPSILON));
    assert_coherent(&mut r.h);
}

#[test]
fn reparent_keeping_local() {
    let mut r = rig();
    let local_before = r.h.get_local_transform(&r.hand_l, false).unwrap();
    r.h.set_parent(&r.hand_l, &r.hips, false).unwrap();

    let local_after = r.h.get_local_transform(&r.hand_l, false).unwrap();
    assert!(local_after.abs_diff_eq(&local_before, EPSILON));
    let hips = global(&mut r.h, &r.hips);
    assert!(global(&mut r.h, &r.hand_l).abs_diff_eq(&(hips * local_before), EPSILON));
    assert_coherent(&mut r.h);
}

#[test]
fn remove_parent_of_diamond() {
    let mut r = rig();
    let before = global(&mut r.h, &r.prop);

    r.h.remove_parent(&r.prop, &r.hand_r, true).unwrap();
    assert_eq!(r.h.number_of_parents(&r.prop), 1);
    assert!(global(&mut r.h, &r.prop).abs_diff_eq(&before, EPSILON));
    assert_coherent(&mut r.h);

    assert_eq!(r.h.remove_all_parents(&r.prop, false).unwrap(), 1);
    assert_eq!(r.h.number_of_parents(&r.prop), 0);
    assert_coherent(&mut r.h);
    assert_eq!(r.h.remove_all_parents(&r.prop, false).unwrap(), 0);
}

#[test]
fn add_parent_keeping_global() {
    let mut r = rig();
    let before = global(&mut r.h, &r.ctrl);
    r.h.add_parent(&r.ctrl, &r.hips, ElementWeight::uniform(0.5), true, None).unwrap();

    assert!(global(&mut r.h, &r.ctrl).abs_diff_eq(&before, EPSILON));
    assert_eq!(r.h.get_parents(&r.ctrl, false), vec![r.hand_l, r.hips]);
    assert_coherent(&mut r.h);
}

#[test]
fn add_parent_twice_is_rejected() {
    let mut r = rig();
    let err = r
        .h
        .add_parent(&r.prop, &r.hand_r, ElementWeight::FULL, false, None)
        .unwrap_err();
    assert_eq!(
        err,
        armature::RigError::AlreadyParented {
            child: r.prop,
            parent: r.hand_r
        }
    );
}

// ============================================================================
// Settings
// ============================================================================

#[test]
fn propagation_disabled_leaves_dependents_stale() {
    let mut h = RigHierarchy::with_settings(HierarchySettings {
        enable_dirty_propagation: false,
        ..Default::default()
    });
    let root = h.add_bone("root", None, at(1.0, 0.0, 0.0), false).unwrap();
    let child = h.add_bone("child", Some(root), at(0.0, 1.0, 0.0), false).unwrap();
    h.compute_all_transforms();

    h.set_local_transform(&root, &at(5.0, 0.0, 0.0), false, true).unwrap();
    assert!(global(&mut h, &child).translation.abs_diff_eq(Vec3::new(1.0, 1.0, 0.0), EPSILON));

    // re-enabling does not repair what was skipped; a parent edit does
    h.settings_mut().enable_dirty_propagation = true;
    h.set_local_transform(&root, &at(6.0, 0.0, 0.0), false, true).unwrap();
    assert!(global(&mut h, &child).translation.abs_diff_eq(Vec3::new(6.0, 1.0, 0.0), EPSILON));
}
