//! Lazy local/global resolution.
//!
//! Reading a dirty variant recomputes it from the opposing, clean variant and
//! the parents' globals, stores it and marks it clean. Reads never propagate
//! to dependents.

use armature_core::{ElementKey, Transform, TransformAspect, TransformType};

use crate::element::{ParentConstraint, ParentModel, TransformSlots};
use crate::hierarchy::RigHierarchy;
use crate::solver;

impl RigHierarchy {
    /// Returns the pose transform of an element, resolving it if dirty.
    ///
    /// Elements without a pose (curves, connectors, out of range indices)
    /// yield the identity.
    pub fn get_transform(&mut self, index: usize, ty: TransformType) -> Transform {
        let Some(slots) = self.slots(index, TransformAspect::Pose) else {
            return Transform::IDENTITY;
        };
        if !self.slot_is_dirty(&slots, ty) {
            return self.slot_value(&slots, ty);
        }

        let opposed = ty.swap_local_and_global();
        debug_assert!(
            !self.slot_is_dirty(&slots, opposed),
            "{}: local and global transforms are both dirty",
            self.elements[index].key
        );

        let is_control = self.elements[index].is_control();
        let source = self.slot_value(&slots, opposed);

        let single_parent = match self.elements[index].parents {
            ParentModel::Single(parent) => parent,
            _ => None,
        };

        let result = if self.elements[index].parents.as_multi().is_some() {
            let offset = if is_control {
                self.get_control_offset_transform(index, ty.make_local())
            } else {
                Transform::IDENTITY
            };
            self.with_constraints(index, |h, constraints| {
                if ty.is_local() {
                    solver::inverse_solve(&source, constraints, ty, &offset, &mut |p, t| h.get_transform(p, t))
                } else {
                    solver::solve(constraints, ty, &offset, is_control, &source, true, &mut |p, t| {
                        h.get_transform(p, t)
                    })
                }
            })
        } else if let Some(parent) = single_parent {
            let parent_global = self.get_transform(parent, ty.make_global());
            if ty.is_local() {
                self.local_from_single_parent(&slots, ty, &source, &parent_global)
            } else {
                parent_global * source
            }
        } else {
            source
        };

        let result = result.normalized();
        self.store_slot(&slots, ty, result);
        result
    }

    /// Recovers a local transform below a single parent.
    ///
    /// When both the result and the parent collapse a scale axis, the
    /// division is meaningless; the previous local translation and scale are
    /// kept instead.
    fn local_from_single_parent(
        &self,
        slots: &TransformSlots,
        ty: TransformType,
        global: &Transform,
        parent_global: &Transform,
    ) -> Transform {
        let mut local = global.relative_to(parent_global);
        let tolerance = self.settings.zero_scale_tolerance;
        if local.has_nearly_zero_scale(tolerance) && parent_global.has_nearly_zero_scale(tolerance) {
            let previous = self.slot_value(slots, ty);
            local.translation = previous.translation;
            local.scale = previous.scale;
        }
        local
    }

    /// Runs `f` over the stored constraints of a multi parent element.
    ///
    /// The list is moved out for the duration of the call so the solver's
    /// parent memo lives on the stored constraints. Resolution only walks up
    /// to parents, which never read this element's constraints.
    pub(crate) fn with_constraints<R>(
        &mut self,
        index: usize,
        f: impl FnOnce(&mut Self, &mut [ParentConstraint]) -> R,
    ) -> R {
        let mut constraints = self.elements[index]
            .parents
            .as_multi_mut()
            .map(|multi| std::mem::take(&mut multi.constraints))
            .unwrap_or_default();
        let result = f(self, &mut constraints);
        if let Some(multi) = self.elements[index].parents.as_multi_mut() {
            multi.constraints = constraints;
        }
        result
    }

    /// Returns a control's offset transform, resolving it if dirty.
    ///
    /// The offset global is the blended parent space followed by the offset
    /// local; it does not include the pose.
    pub fn get_control_offset_transform(&mut self, index: usize, ty: TransformType) -> Transform {
        let Some(slots) = self.slots(index, TransformAspect::Offset) else {
            return Transform::IDENTITY;
        };
        if !self.slot_is_dirty(&slots, ty) {
            return self.slot_value(&slots, ty);
        }

        let opposed = ty.swap_local_and_global();
        debug_assert!(
            !self.slot_is_dirty(&slots, opposed),
            "{}: local and global offset transforms are both dirty",
            self.elements[index].key
        );
        let source = self.slot_value(&slots, opposed);

        if self.elements[index].parents.as_multi().is_none() {
            return source;
        }
        let result = self.with_constraints(index, |h, constraints| {
            if ty.is_local() {
                solver::inverse_solve(&source, constraints, ty, &Transform::IDENTITY, &mut |p, t| {
                    h.get_transform(p, t)
                })
            } else {
                solver::solve(constraints, ty, &source, true, &Transform::IDENTITY, false, &mut |p, t| {
                    h.get_transform(p, t)
                })
            }
        });

        let result = result.normalized();
        self.store_slot(&slots, ty, result);
        result
    }

    /// Returns a control's shape transform, resolving it if dirty.
    ///
    /// The shape is parented to the control's own pose.
    pub fn get_control_shape_transform(&mut self, index: usize, ty: TransformType) -> Transform {
        let Some(slots) = self.slots(index, TransformAspect::Shape) else {
            return Transform::IDENTITY;
        };
        if !self.slot_is_dirty(&slots, ty) {
            return self.slot_value(&slots, ty);
        }

        let opposed = ty.swap_local_and_global();
        debug_assert!(
            !self.slot_is_dirty(&slots, opposed),
            "{}: local and global shape transforms are both dirty",
            self.elements[index].key
        );
        let source = self.slot_value(&slots, opposed);

        let pose_global = self.get_transform(index, ty.make_global());
        let result = if ty.is_local() {
            source.relative_to(&pose_global)
        } else {
            pose_global * source
        };

        let result = result.normalized();
        self.store_slot(&slots, ty, result);
        result
    }

    /// Returns any aspect of an element.
    pub fn get_aspect_transform(&mut self, index: usize, aspect: TransformAspect, ty: TransformType) -> Transform {
        match aspect {
            TransformAspect::Pose => self.get_transform(index, ty),
            TransformAspect::Offset => self.get_control_offset_transform(index, ty),
            TransformAspect::Shape => self.get_control_shape_transform(index, ty),
        }
    }

    /// Returns the global space an element's local transform is expressed in.
    ///
    /// For a control this includes its offset. Parentless elements yield the
    /// identity.
    pub fn get_parent_transform(&mut self, index: usize, initial: bool) -> Transform {
        let ty = TransformType::from_parts(initial, false);
        let is_control = self.elements.get(index).is_some_and(|e| e.is_control());

        match self.elements.get(index).map(|e| &e.parents) {
            Some(ParentModel::Single(Some(parent))) => {
                let parent = *parent;
                self.get_transform(parent, ty)
            }
            Some(ParentModel::Multi(_)) => {
                let offset = if is_control {
                    self.get_control_offset_transform(index, ty.make_local())
                } else {
                    Transform::IDENTITY
                };
                self.with_constraints(index, |h, constraints| {
                    solver::solve(constraints, ty, &offset, is_control, &Transform::IDENTITY, false, &mut |p, t| {
                        h.get_transform(p, t)
                    })
                })
            }
            _ => Transform::IDENTITY,
        }
    }

    // ========================================================================
    // Key based accessors
    // ========================================================================

    pub fn get_local_transform(&mut self, key: &ElementKey, initial: bool) -> Option<Transform> {
        let index = self.index_of(key)?;
        self.slots(index, TransformAspect::Pose)?;
        Some(self.get_transform(index, TransformType::from_parts(initial, true)))
    }

    pub fn get_global_transform(&mut self, key: &ElementKey, initial: bool) -> Option<Transform> {
        let index = self.index_of(key)?;
        self.slots(index, TransformAspect::Pose)?;
        Some(self.get_transform(index, TransformType::from_parts(initial, false)))
    }

    pub fn get_control_offset(&mut self, key: &ElementKey, ty: TransformType) -> Option<Transform> {
        let index = self.index_of(key)?;
        self.slots(index, TransformAspect::Offset)?;
        Some(self.get_control_offset_transform(index, ty))
    }

    pub fn get_control_shape(&mut self, key: &ElementKey, ty: TransformType) -> Option<Transform> {
        let index = self.index_of(key)?;
        self.slots(index, TransformAspect::Shape)?;
        Some(self.get_control_shape_transform(index, ty))
    }
}

#[cfg(test)]
mod tests {
    use armature_core::ElementWeight;
    use glam::Vec3;

    use super::*;

    #[test]
    fn test_multi_parent_solve_memoizes_on_stored_constraints() {
        let mut hierarchy = RigHierarchy::new();
        let a = hierarchy
            .add_null("a", None, Transform::from_translation(Vec3::X * 2.0), false)
            .unwrap();
        let b = hierarchy
            .add_null("b", None, Transform::from_translation(Vec3::Y * 4.0), false)
            .unwrap();
        let c = hierarchy
            .add_null("c", None, Transform::from_translation(Vec3::Z * 6.0), false)
            .unwrap();
        let n = hierarchy.add_null("n", Some(a), Transform::IDENTITY, false).unwrap();
        hierarchy.add_parent(&n, &b, ElementWeight::FULL, false, None).unwrap();
        hierarchy.add_parent(&n, &c, ElementWeight::FULL, false, None).unwrap();
        let index = hierarchy.index_of(&n).unwrap();
        hierarchy
            .set_local_transform(&n, &Transform::from_translation(Vec3::X), false, true)
            .unwrap();
        assert!(hierarchy.is_dirty(index, TransformAspect::Pose, TransformType::CurrentGlobal));

        let global = hierarchy.get_transform(index, TransformType::CurrentGlobal);
        assert!(global.translation.abs_diff_eq(Vec3::new(2.0, 4.0, 6.0) / 3.0 + Vec3::X, 1e-5));

        let constraints = hierarchy.elements[index].parents.as_multi().unwrap().constraints();
        assert_eq!(constraints.len(), 3);
        for (constraint, expected) in constraints.iter().zip([Vec3::X * 2.0, Vec3::Y * 4.0, Vec3::Z * 6.0]) {
            assert!(!constraint.cache_is_dirty);
            assert_eq!(constraint.cached_global_transform.translation, expected);
        }
    }
}
