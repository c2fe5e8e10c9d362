//! Pose snapshots.
//!
//! A [`RigPose`] captures the local and global transforms of a set of
//! elements, plus curve values, addressed by key. It can be reapplied to the
//! same hierarchy or to any other hierarchy that shares the keys.

use armature_core::{
    ElementKey, ElementTypeMask, KINDA_SMALL_NUMBER, SMALL_NUMBER, Transform, TransformType,
};

use crate::events::HierarchyEvent;
use crate::hierarchy::RigHierarchy;

/// One element of a [`RigPose`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoseEntry {
    pub key: ElementKey,
    /// Identity for elements without a transform.
    pub local: Transform,
    /// Identity for elements without a transform.
    pub global: Transform,
    /// Set for curves with an explicit value.
    pub curve: Option<f32>,
}

/// Transforms and curve values of a hierarchy at one point in time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RigPose {
    pub entries: Vec<PoseEntry>,
}

impl RigPose {
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn get(&self, key: &ElementKey) -> Option<&PoseEntry> {
        self.entries.iter().find(|e| e.key == *key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PoseEntry> {
        self.entries.iter()
    }
}

impl RigHierarchy {
    /// Captures the initial or current pose of every element whose type is in
    /// `mask`, in index order. Dirty variants are resolved on the way.
    pub fn get_pose(&mut self, initial: bool, mask: ElementTypeMask) -> RigPose {
        let local_ty = TransformType::from_parts(initial, true);
        let global_ty = TransformType::from_parts(initial, false);

        let mut entries = Vec::new();
        for index in 0..self.elements.len() {
            let key = self.elements[index].key;
            if !mask.contains_type(key.ty) {
                continue;
            }
            let (local, global) = if self.elements[index].pose.is_some() {
                (self.get_transform(index, local_ty), self.get_transform(index, global_ty))
            } else {
                (Transform::IDENTITY, Transform::IDENTITY)
            };
            let curve = self.elements[index].curve.filter(|c| c.is_set).map(|c| c.value);
            entries.push(PoseEntry {
                key,
                local,
                global,
                curve,
            });
        }
        RigPose { entries }
    }

    /// Applies `pose` to the `ty` variant of every matching element.
    ///
    /// Entries whose key is missing here, or whose type is outside `mask`,
    /// are skipped. A `weight` below one blends from the present value
    /// towards the pose. Dependents follow the written elements. Curve values
    /// are only written for current types.
    pub fn set_pose(&mut self, pose: &RigPose, ty: TransformType, mask: ElementTypeMask, weight: f32) {
        if weight <= SMALL_NUMBER || pose.is_empty() {
            return;
        }
        let full = weight >= 1.0 - KINDA_SMALL_NUMBER;

        let applied = self.without_notifications(|h| {
            let mut applied = 0_usize;
            for entry in pose.iter() {
                if !mask.contains_type(entry.key.ty) {
                    continue;
                }
                let Some(index) = h.index_of(&entry.key) else {
                    continue;
                };

                if h.elements[index].pose.is_some() {
                    let target = if ty.is_local() { entry.local } else { entry.global };
                    let value = if full {
                        target
                    } else {
                        h.get_transform(index, ty).lerp(&target, weight)
                    };
                    h.set_transform(index, &value, ty, true);
                    applied += 1;
                } else if let Some(target) = entry.curve
                    && !ty.is_initial()
                {
                    let present = h.get_curve_value(&entry.key).unwrap_or(0.0);
                    let value = present + (target - present) * weight.min(1.0);
                    if let Err(err) = h.set_curve_value(&entry.key, value) {
                        log::trace!("Skipping pose curve '{}': {err}", entry.key);
                        continue;
                    }
                    applied += 1;
                }
            }
            applied
        });

        if applied > 0 {
            self.notify(HierarchyEvent::HierarchyReset);
        }
    }
}

#[cfg(test)]
mod tests {
    use armature_core::ElementType;
    use glam::Vec3;

    use super::*;

    #[test]
    fn test_pose_only_holds_masked_types() {
        let mut hierarchy = RigHierarchy::new();
        let bone = hierarchy
            .add_bone("bone", None, Transform::from_translation(Vec3::X), false)
            .unwrap();
        hierarchy.add_null("null", Some(bone), Transform::IDENTITY, false).unwrap();
        let curve = hierarchy.add_curve("curve", Some(0.5));

        let pose = hierarchy.get_pose(false, ElementTypeMask::BONE | ElementTypeMask::CURVE);
        assert_eq!(pose.len(), 2);
        assert!(pose.iter().all(|e| e.key.ty != ElementType::Null));
        assert_eq!(pose.get(&curve).and_then(|e| e.curve), Some(0.5));
        assert_eq!(pose.get(&bone).map(|e| e.global.translation), Some(Vec3::X));
    }
}
