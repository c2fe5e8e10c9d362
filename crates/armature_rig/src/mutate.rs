//! Transform and curve writes.

use armature_core::{ElementKey, Result, RigError, Transform, TransformAspect, TransformType};

use crate::events::HierarchyEvent;
use crate::hierarchy::RigHierarchy;

impl RigHierarchy {
    /// Writes the pose transform of an element.
    ///
    /// With `affect_children` dependents follow the element; otherwise they
    /// keep their global transforms. The opposing variant of the element
    /// itself is invalidated and recomputed lazily.
    pub fn set_transform(&mut self, index: usize, transform: &Transform, ty: TransformType, affect_children: bool) {
        let Some(slots) = self.slots(index, TransformAspect::Pose) else {
            return;
        };
        let initial = ty.is_initial();
        let is_control = self.elements[index].is_control();

        let previous = self.get_transform(index, ty);
        if previous == *transform {
            return;
        }

        self.propagate_dirty_flags(index, initial, affect_children, true, false);
        if is_control {
            let local = ty.make_local();
            self.get_control_offset_transform(index, local);
            self.get_control_shape_transform(index, local);
        }
        if ty.is_global() {
            self.resolve_parent_globals(index, initial);
        }

        self.store_slot(&slots, ty, *transform);
        self.mark_slot_dirty(&slots, ty.swap_local_and_global());
        if let Some(shape) = self.slots(index, TransformAspect::Shape) {
            self.mark_slot_dirty(&shape, ty.make_global());
        }

        self.propagate_dirty_flags(index, initial, affect_children, false, true);
        if ty.is_local() && !affect_children {
            // dependents were pinned against the new global, materialize it
            self.get_transform(index, ty.make_global());
        }

        self.after_mutation();

        let key = self.elements[index].key;
        self.notify(HierarchyEvent::TransformChanged {
            key,
            aspect: TransformAspect::Pose,
            transform_type: ty,
            previous,
            current: *transform,
        });
        let transform = *transform;
        self.forward_to_listeners(initial, |listener| {
            if let Some(target) = listener.index_of(&key) {
                listener.set_transform(target, &transform, ty, affect_children);
            }
        });
    }

    /// Writes a control's offset.
    ///
    /// With `affect_children` the control keeps its local pose and moves
    /// with the offset, taking its dependents along. Otherwise the control
    /// stays in place and only its local pose changes.
    pub fn set_control_offset_transform(
        &mut self,
        index: usize,
        transform: &Transform,
        ty: TransformType,
        affect_children: bool,
    ) {
        let (Some(offset), Some(pose), Some(shape)) = (
            self.slots(index, TransformAspect::Offset),
            self.slots(index, TransformAspect::Pose),
            self.slots(index, TransformAspect::Shape),
        ) else {
            return;
        };
        let initial = ty.is_initial();
        let local = ty.make_local();
        let global = ty.make_global();

        let previous = self.get_control_offset_transform(index, ty);
        if previous == *transform {
            return;
        }

        if ty.is_global() {
            self.resolve_parent_globals(index, initial);
        }
        if affect_children {
            self.get_transform(index, local);
            self.get_control_shape_transform(index, local);
            self.propagate_dirty_flags(index, initial, true, true, false);
        } else {
            self.get_transform(index, global);
        }

        self.store_slot(&offset, ty, *transform);
        self.mark_slot_dirty(&offset, ty.swap_local_and_global());

        if affect_children {
            self.mark_slot_dirty(&pose, global);
            self.mark_slot_dirty(&shape, global);
            self.propagate_dirty_flags(index, initial, true, false, true);
        } else {
            self.mark_slot_dirty(&pose, local);
        }

        self.after_mutation();

        let key = self.elements[index].key;
        self.notify(HierarchyEvent::TransformChanged {
            key,
            aspect: TransformAspect::Offset,
            transform_type: ty,
            previous,
            current: *transform,
        });
        let transform = *transform;
        self.forward_to_listeners(initial, |listener| {
            if let Some(target) = listener.index_of(&key) {
                listener.set_control_offset_transform(target, &transform, ty, affect_children);
            }
        });
    }

    /// Writes a control's shape. The shape has no dependents.
    pub fn set_control_shape_transform(&mut self, index: usize, transform: &Transform, ty: TransformType) {
        let Some(shape) = self.slots(index, TransformAspect::Shape) else {
            return;
        };
        let initial = ty.is_initial();

        let previous = self.get_control_shape_transform(index, ty);
        if previous == *transform {
            return;
        }
        if ty.is_global() {
            self.get_transform(index, ty);
        }

        self.store_slot(&shape, ty, *transform);
        self.mark_slot_dirty(&shape, ty.swap_local_and_global());

        self.after_mutation();

        let key = self.elements[index].key;
        self.notify(HierarchyEvent::TransformChanged {
            key,
            aspect: TransformAspect::Shape,
            transform_type: ty,
            previous,
            current: *transform,
        });
        let transform = *transform;
        self.forward_to_listeners(initial, |listener| {
            if let Some(target) = listener.index_of(&key) {
                listener.set_control_shape_transform(target, &transform, ty);
            }
        });
    }

    // ========================================================================
    // Key based setters
    // ========================================================================

    fn transform_index(&self, key: &ElementKey, aspect: TransformAspect) -> Result<usize> {
        let index = self.index_of(key).ok_or(RigError::ElementNotFound(*key))?;
        match aspect {
            TransformAspect::Pose if self.elements[index].pose.is_none() => {
                Err(RigError::NotATransformElement(*key))
            }
            TransformAspect::Offset | TransformAspect::Shape if !self.elements[index].is_control() => {
                Err(RigError::NotAControl(*key))
            }
            _ => Ok(index),
        }
    }

    pub fn set_local_transform(
        &mut self,
        key: &ElementKey,
        transform: &Transform,
        initial: bool,
        affect_children: bool,
    ) -> Result<()> {
        let index = self.transform_index(key, TransformAspect::Pose)?;
        self.set_transform(index, transform, TransformType::from_parts(initial, true), affect_children);
        Ok(())
    }

    pub fn set_global_transform(
        &mut self,
        key: &ElementKey,
        transform: &Transform,
        initial: bool,
        affect_children: bool,
    ) -> Result<()> {
        let index = self.transform_index(key, TransformAspect::Pose)?;
        self.set_transform(index, transform, TransformType::from_parts(initial, false), affect_children);
        Ok(())
    }

    pub fn set_control_offset(
        &mut self,
        key: &ElementKey,
        transform: &Transform,
        ty: TransformType,
        affect_children: bool,
    ) -> Result<()> {
        let index = self.transform_index(key, TransformAspect::Offset)?;
        self.set_control_offset_transform(index, transform, ty, affect_children);
        Ok(())
    }

    pub fn set_control_shape(&mut self, key: &ElementKey, transform: &Transform, ty: TransformType) -> Result<()> {
        let index = self.transform_index(key, TransformAspect::Shape)?;
        self.set_control_shape_transform(index, transform, ty);
        Ok(())
    }

    // ========================================================================
    // Curves
    // ========================================================================

    /// The value of a curve, `None` if the curve does not exist or was never set.
    #[must_use]
    pub fn get_curve_value(&self, key: &ElementKey) -> Option<f32> {
        self.get_by_key(key)
            .and_then(|e| e.curve)
            .filter(|c| c.is_set)
            .map(|c| c.value)
    }

    #[must_use]
    pub fn is_curve_value_set(&self, key: &ElementKey) -> bool {
        self.get_curve_value(key).is_some()
    }

    pub fn set_curve_value(&mut self, key: &ElementKey, value: f32) -> Result<()> {
        self.write_curve(key, Some(value))
    }

    pub fn unset_curve_value(&mut self, key: &ElementKey) -> Result<()> {
        self.write_curve(key, None)
    }

    fn write_curve(&mut self, key: &ElementKey, value: Option<f32>) -> Result<()> {
        let index = self.index_of(key).ok_or(RigError::ElementNotFound(*key))?;
        let Some(curve) = self.elements[index].curve.as_mut() else {
            return Err(RigError::NotACurve(*key));
        };

        let previous = curve.is_set.then_some(curve.value);
        if previous == value {
            return Ok(());
        }
        curve.value = value.unwrap_or(0.0);
        curve.is_set = value.is_some();

        self.notify(HierarchyEvent::CurveChanged {
            key: *key,
            previous,
            current: value,
        });
        let key = *key;
        self.forward_to_listeners(false, |listener| {
            if let Err(err) = listener.write_curve(&key, value) {
                log::trace!("Listener rejected curve edit: {err}");
            }
        });
        Ok(())
    }

    /// Unsets every curve.
    pub fn reset_curve_values(&mut self) {
        for element in &mut self.elements {
            if let Some(curve) = element.curve.as_mut() {
                *curve = Default::default();
            }
        }
    }
}
