//! Parent weights and space switching.

use armature_core::{ElementKey, ElementWeight, Result, RigError, interner};
use smallvec::SmallVec;

use crate::dependency::DependencyProvider;
use crate::element::ParentModel;
use crate::events::HierarchyEvent;
use crate::hierarchy::RigHierarchy;

type WeightList = SmallVec<[ElementWeight; 2]>;

impl RigHierarchy {
    fn multi_parent_index(&self, key: &ElementKey) -> Result<usize> {
        let index = self.index_of(key).ok_or(RigError::ElementNotFound(*key))?;
        if self.elements[index].parents.as_multi().is_none() {
            return Err(RigError::NotMultiParent(*key));
        }
        Ok(index)
    }

    fn constraint_index(&self, child: usize, parent: &ElementKey) -> Option<usize> {
        self.elements[child].parents.as_multi()?.constraint_index(parent)
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Weight of the constraint from `child` to `parent`. Single parent
    /// elements report full weight for their parent.
    #[must_use]
    pub fn get_parent_weight(&self, child: &ElementKey, parent: &ElementKey, initial: bool) -> Option<ElementWeight> {
        let child = self.index_of(child)?;
        match &self.elements[child].parents {
            ParentModel::Single(Some(p)) if self.elements[*p].key == *parent => Some(ElementWeight::FULL),
            ParentModel::Multi(multi) => {
                let index = multi.constraint_index(parent)?;
                Some(multi.constraints[index].weight_for(initial))
            }
            _ => None,
        }
    }

    /// Weights of every parent of `child`, in constraint order.
    #[must_use]
    pub fn get_parent_weights(&self, child: &ElementKey, initial: bool) -> Vec<ElementWeight> {
        let Some(child) = self.index_of(child) else {
            return Vec::new();
        };
        match &self.elements[child].parents {
            ParentModel::Single(Some(_)) => vec![ElementWeight::FULL],
            ParentModel::Multi(multi) => multi.constraints.iter().map(|c| c.weight_for(initial)).collect(),
            _ => Vec::new(),
        }
    }

    /// The single parent currently driving `child`: the only constraint with
    /// a non-zero current weight, or the parent of a single parent element.
    #[must_use]
    pub fn get_active_parent(&self, child: &ElementKey) -> Option<ElementKey> {
        let child = self.index_of(child)?;
        match &self.elements[child].parents {
            ParentModel::Single(Some(parent)) => Some(self.elements[*parent].key),
            ParentModel::Multi(multi) => {
                let mut active = multi.constraints.iter().filter(|c| c.weight.affects_any());
                let first = active.next()?;
                if active.next().is_some() {
                    return None;
                }
                Some(self.elements[first.parent].key)
            }
            _ => None,
        }
    }

    /// Display label of a constraint, falling back to the parent's name.
    #[must_use]
    pub fn get_display_label_for_parent(&self, child: &ElementKey, parent: &ElementKey) -> Option<&'static str> {
        let child = self.index_of(child)?;
        let index = self.constraint_index(child, parent)?;
        let constraint = &self.elements[child].parents.as_multi()?.constraints[index];
        Some(constraint.display_label.map_or_else(|| parent.name(), interner::resolve))
    }

    // ========================================================================
    // Writes
    // ========================================================================

    /// Replaces every weight of `child` for the initial or current pose.
    ///
    /// With `affect_children` the child keeps its local transform and moves
    /// into the new parent space, taking its dependents along. Otherwise it
    /// stays in place.
    ///
    /// Returns whether anything changed.
    pub(crate) fn apply_parent_weights(
        &mut self,
        child: usize,
        weights: &[ElementWeight],
        initial: bool,
        affect_children: bool,
    ) -> bool {
        let Some(multi) = self.elements[child].parents.as_multi() else {
            return false;
        };
        debug_assert_eq!(multi.constraints.len(), weights.len());
        let unchanged = multi
            .constraints
            .iter()
            .zip(weights)
            .all(|(c, w)| c.weight_for(initial) == w.clamped());
        if unchanged {
            return false;
        }

        let keep_global = !affect_children;
        self.resolve_parent_globals(child, initial);
        self.compute_before_parent_change(child, initial, keep_global);
        if affect_children {
            self.propagate_dirty_flags(child, initial, true, true, false);
        }

        if let Some(multi) = self.elements[child].parents.as_multi_mut() {
            for (constraint, weight) in multi.constraints.iter_mut().zip(weights) {
                *constraint.weight_for_mut(initial) = weight.clamped();
            }
        }

        self.mark_after_parent_change(child, initial, keep_global);
        if affect_children {
            self.propagate_dirty_flags(child, initial, true, false, true);
        }
        true
    }

    fn commit_weights(&mut self, child: usize, weights: &[ElementWeight], initial: bool, affect_children: bool) {
        if !self.apply_parent_weights(child, weights, initial, affect_children) {
            return;
        }
        self.after_mutation();

        let key = self.elements[child].key;
        self.notify(HierarchyEvent::ParentWeightsChanged { child: key, initial });
        let weights: WeightList = weights.iter().copied().collect();
        self.forward_to_listeners(initial, |listener| {
            if let Err(err) = listener.set_parent_weight_array(&key, &weights, initial, affect_children) {
                log::trace!("Listener rejected parent weight edit: {err}");
            }
        });
    }

    /// Sets the weight of one constraint.
    pub fn set_parent_weight(
        &mut self,
        child: &ElementKey,
        parent: &ElementKey,
        weight: ElementWeight,
        initial: bool,
        affect_children: bool,
    ) -> Result<()> {
        let child_index = self.multi_parent_index(child)?;
        let constraint = self
            .constraint_index(child_index, parent)
            .ok_or(RigError::ParentNotFound {
                child: *child,
                parent: *parent,
            })?;

        let mut weights: WeightList = self.elements[child_index]
            .parents
            .as_multi()
            .map(|m| m.constraints.iter().map(|c| c.weight_for(initial)).collect())
            .unwrap_or_default();
        weights[constraint] = weight;

        self.commit_weights(child_index, &weights, initial, affect_children);
        Ok(())
    }

    /// Sets the weight of the constraint at `index` in constraint order.
    pub fn set_parent_weight_at(
        &mut self,
        child: &ElementKey,
        index: usize,
        weight: ElementWeight,
        initial: bool,
        affect_children: bool,
    ) -> Result<()> {
        let child_index = self.multi_parent_index(child)?;
        let mut weights: WeightList = self.elements[child_index]
            .parents
            .as_multi()
            .map(|m| m.constraints.iter().map(|c| c.weight_for(initial)).collect())
            .unwrap_or_default();
        let Some(slot) = weights.get_mut(index) else {
            return Err(RigError::ConstraintIndexOutOfRange { child: *child, index });
        };
        *slot = weight;

        self.commit_weights(child_index, &weights, initial, affect_children);
        Ok(())
    }

    /// Sets all weights at once. `weights` must match the constraint count.
    pub fn set_parent_weight_array(
        &mut self,
        child: &ElementKey,
        weights: &[ElementWeight],
        initial: bool,
        affect_children: bool,
    ) -> Result<()> {
        let child_index = self.multi_parent_index(child)?;
        let count = self.elements[child_index].parents.parent_indices().len();
        if weights.len() != count {
            return Err(RigError::ConstraintIndexOutOfRange {
                child: *child,
                index: weights.len().min(count),
            });
        }

        self.commit_weights(child_index, weights, initial, affect_children);
        Ok(())
    }

    // ========================================================================
    // Space switching
    // ========================================================================

    /// Checks whether `child` may switch to `parent` as its only active space.
    ///
    /// Rejected when `parent` is a socket, when `parent` depends on `child`
    /// (through the parent graph or `provider`), or when `child` is a control
    /// with restricted space switching and `parent` is not one of its spaces
    /// yet.
    pub fn can_switch_to_parent(
        &mut self,
        child: &ElementKey,
        parent: &ElementKey,
        provider: &dyn DependencyProvider,
    ) -> Result<()> {
        let child_index = self.multi_parent_index(child)?;
        let parent_index = self
            .transform_parent(child, Some(parent))?
            .ok_or(RigError::ElementNotFound(*parent))?;

        let existing = self.constraint_index(child_index, parent).is_some();
        let restricted = self.elements[child_index]
            .control_settings()
            .is_some_and(|s| s.restrict_space_switching);
        if restricted && !existing {
            return Err(RigError::SpaceSwitchingRestricted {
                control: *child,
                space: *parent,
            });
        }

        if self.is_dependent_on(parent_index, child_index, provider) {
            log::warn!("Cannot parent '{child}' to '{parent}' - would cause a cycle");
            return Err(RigError::CycleRejected {
                child: *child,
                parent: *parent,
            });
        }
        Ok(())
    }

    /// Makes `parent` the only active space of `child`: its weight becomes
    /// full and every other weight zero. A missing parent is added first,
    /// with zero weight and the child kept in place.
    pub fn switch_to_parent(
        &mut self,
        child: &ElementKey,
        parent: &ElementKey,
        initial: bool,
        affect_children: bool,
        provider: &dyn DependencyProvider,
    ) -> Result<()> {
        self.can_switch_to_parent(child, parent, provider)?;

        let child_index = self.multi_parent_index(child)?;
        if self.constraint_index(child_index, parent).is_none() {
            self.without_notifications(|h| h.add_parent(child, parent, ElementWeight::ZERO, true, None))?;
        }

        let Some(target) = self.constraint_index(child_index, parent) else {
            return Err(RigError::ParentNotFound {
                child: *child,
                parent: *parent,
            });
        };
        let count = self.elements[child_index].parents.parent_indices().len();
        let weights: WeightList = (0..count)
            .map(|i| if i == target { ElementWeight::FULL } else { ElementWeight::ZERO })
            .collect();

        self.commit_weights(child_index, &weights, initial, affect_children);
        Ok(())
    }
}
