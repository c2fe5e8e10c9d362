//! Whole-pose utilities: materialization, validation, reset, copy and
//! storage compaction.

use armature_core::{ElementType, ElementTypeMask, TransformAspect, TransformType};
use bit_vec::BitVec;

use crate::events::HierarchyEvent;
use crate::hierarchy::RigHierarchy;
use crate::storage::SlotRemap;

impl RigHierarchy {
    /// Resolves every variant of every transform, leaving nothing dirty.
    ///
    /// Call before persisting: dirty flags are not meant to be stored.
    pub fn compute_all_transforms(&mut self) {
        for index in 0..self.elements.len() {
            for (aspect, _) in self.elements[index].all_slots() {
                for ty in TransformType::ALL {
                    self.get_aspect_transform(index, aspect, ty);
                }
            }
        }
    }

    /// Panics if any slot set has both its local and global variant dirty.
    pub fn ensure_cache_validity(&self) {
        for element in &self.elements {
            for (aspect, slots) in element.all_slots() {
                for ty in [TransformType::InitialLocal, TransformType::CurrentLocal] {
                    assert!(
                        !(self.slot_is_dirty(&slots, ty) && self.slot_is_dirty(&slots, ty.make_global())),
                        "{} {:?}: local and global {:?} transforms are both dirty",
                        element.key,
                        aspect,
                        if ty.is_initial() { "initial" } else { "current" },
                    );
                }
            }
        }
    }

    /// Resets the current pose and current weights of every element whose
    /// type is in `mask` to the initial ones.
    ///
    /// Local transforms are restored; globals are recomputed against the
    /// current parents. Dependents outside the mask follow.
    pub fn reset_pose_to_initial(&mut self, mask: ElementTypeMask) {
        let targets: Vec<usize> = self
            .elements
            .iter()
            .filter(|e| e.pose.is_some() && mask.contains_type(e.key.ty))
            .map(|e| e.index)
            .collect();
        if targets.is_empty() {
            return;
        }

        for &index in &targets {
            self.propagate_dirty_flags(index, false, true, true, false);
        }

        for &index in &targets {
            for (aspect, slots) in self.elements[index].all_slots() {
                let local = self.get_aspect_transform(index, aspect, TransformType::InitialLocal);
                self.transforms.set(slots.transform_slot(TransformType::CurrentLocal), local);
                self.dirty_states.set(slots.dirty_slot(TransformType::CurrentLocal), false);
            }
            if let Some(multi) = self.elements[index].parents.as_multi_mut() {
                for constraint in &mut multi.constraints {
                    constraint.weight = constraint.initial_weight;
                }
            }
        }

        self.settle_bulk_write(&targets, false);
        self.after_mutation();
        self.notify(HierarchyEvent::HierarchyReset);
    }

    /// Finishes a bulk overwrite of the locals of `targets`: their globals
    /// go dirty and dependents outside the set follow.
    ///
    /// The compute phase must have run on `targets` before the write.
    fn settle_bulk_write(&mut self, targets: &[usize], initial: bool) {
        let global = TransformType::from_parts(initial, false);
        let mut is_target = BitVec::from_elem(self.elements.len(), false);

        for &index in targets {
            is_target.set(index, true);
            for (_, slots) in self.elements[index].all_slots() {
                self.dirty_states.set(slots.dirty_slot(global), true);
            }
        }

        for &index in targets {
            let dependents = self.elements[index].elements_to_dirty.clone();
            for dependent in dependents {
                if is_target.get(dependent).unwrap_or(true) || self.is_global_fully_dirty(dependent, initial) {
                    continue;
                }
                self.mark_after_parent_change(dependent, initial, false);
                self.propagate_dirty_flags(dependent, initial, true, false, true);
            }
        }
    }

    /// Copies local poses and weights from `other` for every element both
    /// hierarchies contain. Dirty locals in `other` are resolved first.
    ///
    /// Globals are recomputed against this hierarchy's parents.
    pub fn copy_pose(&mut self, other: &mut RigHierarchy, current: bool, initial: bool, weights: bool) {
        let mut poses = Vec::with_capacity(2);
        if initial {
            poses.push(true);
        }
        if current {
            poses.push(false);
        }

        let mut targets = Vec::new();
        for source in 0..other.elements.len() {
            let key = other.elements[source].key;
            let Some(index) = self.index_of(&key) else {
                continue;
            };
            if self.elements[index].all_slots().len() == other.elements[source].all_slots().len() {
                targets.push((index, source));
            }
        }

        // weights move both poses
        let affected: &[bool] = if weights { &[true, false] } else { &poses };
        for &pose_is_initial in affected {
            for &(index, _) in &targets {
                self.compute_before_parent_change(index, pose_is_initial, false);
                self.propagate_dirty_flags(index, pose_is_initial, true, true, false);
            }
        }

        for &(index, source) in &targets {
            for (aspect, mine) in self.elements[index].all_slots() {
                for &pose_is_initial in &poses {
                    let ty = TransformType::from_parts(pose_is_initial, true);
                    let value = other.get_aspect_transform(source, aspect, ty);
                    self.transforms.set(mine.transform_slot(ty), value);
                    self.dirty_states.set(mine.dirty_slot(ty), false);
                }
            }

            if current
                && let (Some(curve), Some(src)) = (self.elements[index].curve.as_mut(), other.elements[source].curve)
            {
                *curve = src;
            }

            if weights
                && let (Some(mine), Some(src)) =
                    (self.elements[index].parents.as_multi_mut(), other.elements[source].parents.as_multi())
                && mine.constraints.len() == src.constraints.len()
            {
                for (dst, src) in mine.constraints.iter_mut().zip(&src.constraints) {
                    if current {
                        dst.weight = src.weight;
                    }
                    if initial {
                        dst.initial_weight = src.initial_weight;
                    }
                }
            }
        }

        let indices: Vec<usize> = targets.iter().map(|&(index, _)| index).collect();
        for &pose_is_initial in affected {
            self.settle_bulk_write(&indices, pose_is_initial);
        }

        self.after_mutation();
        self.notify(HierarchyEvent::HierarchyReset);
    }

    /// Replaces the whole content of this hierarchy with a copy of `other`.
    ///
    /// Storage is reused when both hierarchies hold the same number of
    /// elements per type. Settings, listeners and the event handler are kept.
    pub fn copy_hierarchy(&mut self, other: &RigHierarchy) {
        let same_layout = ElementType::ALL
            .iter()
            .all(|&ty| self.num_of_type(ty) == other.num_of_type(ty));

        if same_layout {
            log::debug!("Copying hierarchy into existing storage ({} elements)", other.len());
            self.elements.clone_from(&other.elements);
            self.elements_per_type.clone_from(&other.elements_per_type);
            self.key_lookup.clone_from(&other.key_lookup);
            self.transforms.clone_from(&other.transforms);
            self.dirty_states.clone_from(&other.dirty_states);
        } else {
            log::debug!("Copying hierarchy into fresh storage ({} elements)", other.len());
            self.elements = other.elements.clone();
            self.elements_per_type = other.elements_per_type.clone();
            self.key_lookup = other.key_lookup.clone();
            self.transforms = other.transforms.clone();
            self.dirty_states = other.dirty_states.clone();
        }

        self.child_cache.invalidate();
        self.dependency_memo.invalidate();
        self.topology.increment();

        self.after_mutation();
        self.notify(HierarchyEvent::HierarchyReset);
    }

    // ========================================================================
    // Storage compaction
    // ========================================================================

    /// Drops freed slots and orders the remaining ones by owner (element,
    /// aspect, variant). Returns whether any slot moved.
    pub fn compact_storage(&mut self) -> bool {
        let shrunk_values = self.transforms.shrink();
        let shrunk_dirty = self.dirty_states.shrink();
        let shrunk = shrunk_values.is_some() || shrunk_dirty.is_some();
        self.patch_slots(shrunk_values.as_ref(), shrunk_dirty.as_ref());

        let mut value_rank = vec![u64::MAX; self.transforms.len()];
        let mut dirty_rank = vec![u64::MAX; self.dirty_states.len()];
        for element in &self.elements {
            for (aspect, slots) in element.all_slots() {
                for ty in TransformType::ALL {
                    let rank = element.index as u64 * 12 + aspect_rank(aspect) * 4 + ty.index() as u64;
                    value_rank[slots.transform_slot(ty)] = rank;
                    dirty_rank[slots.dirty_slot(ty)] = rank;
                }
            }
        }

        let sorted_values = self.transforms.sort_by_key(|i| value_rank[i]);
        let sorted_dirty = self.dirty_states.sort_by_key(|i| dirty_rank[i]);
        let sorted = sorted_values.is_some() || sorted_dirty.is_some();
        self.patch_slots(sorted_values.as_ref(), sorted_dirty.as_ref());

        if shrunk || sorted {
            log::debug!(
                "Compacted transform storage to {} slots",
                self.transforms.len()
            );
        }
        shrunk || sorted
    }

    fn patch_slots(&mut self, values: Option<&SlotRemap>, dirty: Option<&SlotRemap>) {
        if values.is_none() && dirty.is_none() {
            return;
        }
        for element in &mut self.elements {
            for slots in element.all_slots_mut() {
                if let Some(remap) = values {
                    for slot in &mut slots.transforms {
                        if let Some(Some(new)) = remap.get(*slot) {
                            *slot = *new;
                        }
                    }
                }
                if let Some(remap) = dirty {
                    for slot in &mut slots.dirty {
                        if let Some(Some(new)) = remap.get(*slot) {
                            *slot = *new;
                        }
                    }
                }
            }
        }
    }
}

fn aspect_rank(aspect: TransformAspect) -> u64 {
    aspect as u64
}
