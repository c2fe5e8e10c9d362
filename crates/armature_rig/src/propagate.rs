//! Dirty propagation.
//!
//! When an element's global changes, each dependent either follows it (keeps
//! its local, global goes dirty) or stays in place (keeps its global, local
//! goes dirty). Propagation runs in two phases around the write:
//!
//! 1. compute: make the variant that will be kept clean, while the old parent
//!    values are still readable
//! 2. mark: invalidate the other variant
//!
//! Only followers recurse: a dependent that stays in place does not change
//! anything below it.
//!
//! Coherence relies on one rule: an element whose global is dirty only has
//! dependents whose globals are dirty as well. A dependent that is already
//! fully dirty is therefore skipped together with its subtree.

use armature_core::{TransformAspect, TransformType};
use bit_vec::BitVec;

use crate::hierarchy::RigHierarchy;

impl RigHierarchy {
    /// Propagates a change of `index`'s initial or current global to its
    /// dependents.
    ///
    /// With `affect_children` the dependents follow and the walk recurses;
    /// otherwise only the direct dependents are updated to stay in place.
    pub fn propagate_dirty_flags(
        &mut self,
        index: usize,
        initial: bool,
        affect_children: bool,
        compute_opposed: bool,
        mark_dirty: bool,
    ) {
        if !self.settings.enable_dirty_propagation || index >= self.elements.len() {
            return;
        }
        let mut visited = BitVec::from_elem(self.elements.len(), false);
        self.propagate_recursive(index, initial, affect_children, compute_opposed, mark_dirty, &mut visited);
    }

    fn propagate_recursive(
        &mut self,
        index: usize,
        initial: bool,
        affect_children: bool,
        compute_opposed: bool,
        mark_dirty: bool,
        visited: &mut BitVec,
    ) {
        let dependents = self.elements[index].elements_to_dirty.clone();

        for dependent in dependents {
            if affect_children {
                if visited.get(dependent).unwrap_or(true) {
                    continue;
                }
                visited.set(dependent, true);

                if self.is_global_fully_dirty(dependent, initial) {
                    log::trace!("{} already dirty, pruning", self.elements[dependent].key);
                    continue;
                }
            }

            let keep_global = !affect_children;
            if compute_opposed {
                self.compute_before_parent_change(dependent, initial, keep_global);
            }
            if mark_dirty {
                self.mark_after_parent_change(dependent, initial, keep_global);
            }

            if affect_children {
                self.propagate_recursive(dependent, initial, true, compute_opposed, mark_dirty, visited);
            }
        }
    }

    /// True if every global variant the element carries is dirty.
    pub(crate) fn is_global_fully_dirty(&self, index: usize, initial: bool) -> bool {
        let ty = TransformType::from_parts(initial, false);
        let element = &self.elements[index];
        element
            .all_slots()
            .iter()
            .all(|(_, slots)| self.slot_is_dirty(slots, ty))
    }

    /// Resolves the variants of `index` that must survive a change of its
    /// parent space.
    ///
    /// Controls always keep their offset local, since the offset is defined
    /// in parent space.
    pub(crate) fn compute_before_parent_change(&mut self, index: usize, initial: bool, keep_global: bool) {
        let local = TransformType::from_parts(initial, true);
        let global = local.swap_local_and_global();
        let is_control = self.elements[index].is_control();

        if is_control {
            self.get_control_offset_transform(index, local);
        }
        if keep_global {
            self.get_transform(index, global);
        } else {
            self.get_transform(index, local);
            if is_control {
                self.get_control_shape_transform(index, local);
            }
        }
    }

    /// Invalidates the variants of `index` that a change of its parent space
    /// made stale. Must follow [`compute_before_parent_change`](Self::compute_before_parent_change).
    pub(crate) fn mark_after_parent_change(&mut self, index: usize, initial: bool, keep_global: bool) {
        let local = TransformType::from_parts(initial, true);
        let global = local.swap_local_and_global();
        let element = &self.elements[index];
        let pose = element.slots(TransformAspect::Pose);
        let offset = element.slots(TransformAspect::Offset);
        let shape = element.slots(TransformAspect::Shape);

        if let Some(offset) = offset {
            self.mark_slot_dirty(&offset, global);
        }
        if keep_global {
            if let Some(pose) = pose {
                self.mark_slot_dirty(&pose, local);
            }
        } else {
            if let Some(pose) = pose {
                self.mark_slot_dirty(&pose, global);
            }
            if let Some(shape) = shape {
                self.mark_slot_dirty(&shape, global);
            }
        }
    }

    /// Resolves the globals of every parent of `index`, so that a clean
    /// global below them is never backed by a dirty one above.
    pub(crate) fn resolve_parent_globals(&mut self, index: usize, initial: bool) {
        let ty = TransformType::from_parts(initial, false);
        for parent in self.elements[index].parents.parent_indices() {
            self.get_transform(parent, ty);
        }
    }
}
