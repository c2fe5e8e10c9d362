//! Structural editing: element creation, parenting, removal and renaming.
//!
//! Every edit validates first and commits second: a rejected call leaves the
//! hierarchy untouched.

use armature_core::{
    ElementKey, ElementType, ElementWeight, Result, RigError, Symbol, Transform, TransformAspect,
    TransformType, interner,
};
use smallvec::SmallVec;

use crate::element::{ControlAspects, ControlSettings, Element, ParentConstraint, ParentModel};
use crate::events::HierarchyEvent;
use crate::hierarchy::RigHierarchy;

impl RigHierarchy {
    // ========================================================================
    // Naming
    // ========================================================================

    /// Returns a key of type `ty` that is not used yet, derived from `name`
    /// by appending `_1`, `_2`, ... when needed.
    #[must_use]
    pub fn safe_new_key(&self, ty: ElementType, name: &str) -> ElementKey {
        let key = ElementKey::new(ty, name);
        if !self.contains(&key) {
            return key;
        }
        let mut suffix = 1_usize;
        loop {
            let candidate = ElementKey::new(ty, &format!("{name}_{suffix}"));
            if !self.contains(&candidate) {
                return candidate;
            }
            suffix += 1;
        }
    }

    // ========================================================================
    // Factory
    // ========================================================================

    fn create_element(&mut self, ty: ElementType, name: &str, settings: Option<ControlSettings>) -> usize {
        let key = self.safe_new_key(ty, name);
        if key.name() != name {
            log::debug!("Element name '{}' is taken, using '{}'", name, key.name());
        }

        let index = self.elements.len();
        if self.elements.len() == self.elements.capacity() {
            self.elements.reserve(self.settings.element_block_size);
        }
        let sub_index = self.elements_per_type[ty.bucket()].len();

        let mut element = Element::new(key, index, sub_index);
        if ty.has_transform() {
            element.pose = Some(self.allocate_slots());
        }
        if ty == ElementType::Control {
            element.control = Some(ControlAspects {
                offset: self.allocate_slots(),
                shape: self.allocate_slots(),
                settings: settings.unwrap_or_default(),
            });
        }

        self.elements.push(element);
        self.elements_per_type[ty.bucket()].push(index);
        self.key_lookup.insert(key, index);
        self.topology.increment();
        index
    }

    /// Looks up an element that can act as a parent of `child`.
    pub(crate) fn transform_parent(&self, child: &ElementKey, parent: Option<&ElementKey>) -> Result<Option<usize>> {
        let Some(parent) = parent else {
            return Ok(None);
        };
        let index = self.index_of(parent).ok_or(RigError::ElementNotFound(*parent))?;
        if self.elements[index].pose.is_none() {
            return Err(RigError::NotATransformElement(*parent));
        }
        if parent.ty == ElementType::Socket {
            log::warn!("Cannot parent '{child}' under socket '{parent}'");
            return Err(RigError::SocketParent {
                child: *child,
                parent: *parent,
            });
        }
        Ok(Some(index))
    }

    fn add_transform_element(
        &mut self,
        ty: ElementType,
        name: &str,
        parent: Option<ElementKey>,
        transform: Transform,
        transform_in_global: bool,
    ) -> Result<ElementKey> {
        let parent = self.transform_parent(&ElementKey::new(ty, name), parent.as_ref())?;
        let index = self.create_element(ty, name, None);

        if let Some(parent) = parent {
            self.link_parent(index, parent, ElementWeight::FULL, None);
        }
        let ty = TransformType::from_parts(true, !transform_in_global);
        self.initialize_slots(index, TransformAspect::Pose, &transform, ty);

        Ok(self.finish_add(index))
    }

    /// Writes the initial and current variants of `ty`'s space.
    fn initialize_slots(&mut self, index: usize, aspect: TransformAspect, transform: &Transform, ty: TransformType) {
        let Some(slots) = self.slots(index, aspect) else {
            return;
        };
        for initial in [true, false] {
            let ty = TransformType::from_parts(initial, ty.is_local());
            if ty.is_global() {
                self.resolve_parent_globals(index, initial);
            }
            self.store_slot(&slots, ty, *transform);
            self.mark_slot_dirty(&slots, ty.swap_local_and_global());
        }
    }

    fn finish_add(&mut self, index: usize) -> ElementKey {
        let key = self.elements[index].key;
        self.after_mutation();
        self.notify(HierarchyEvent::ElementAdded(key));
        key
    }

    /// Adds a bone below an optional parent.
    ///
    /// `transform` is the initial and current pose, in parent space unless
    /// `transform_in_global` is set.
    pub fn add_bone(
        &mut self,
        name: &str,
        parent: Option<ElementKey>,
        transform: Transform,
        transform_in_global: bool,
    ) -> Result<ElementKey> {
        self.add_transform_element(ElementType::Bone, name, parent, transform, transform_in_global)
    }

    /// Adds a null (locator). Further parents can be added as constraints.
    pub fn add_null(
        &mut self,
        name: &str,
        parent: Option<ElementKey>,
        transform: Transform,
        transform_in_global: bool,
    ) -> Result<ElementKey> {
        self.add_transform_element(ElementType::Null, name, parent, transform, transform_in_global)
    }

    pub fn add_reference(
        &mut self,
        name: &str,
        parent: Option<ElementKey>,
        transform: Transform,
        transform_in_global: bool,
    ) -> Result<ElementKey> {
        self.add_transform_element(ElementType::Reference, name, parent, transform, transform_in_global)
    }

    pub fn add_socket(
        &mut self,
        name: &str,
        parent: Option<ElementKey>,
        transform: Transform,
        transform_in_global: bool,
    ) -> Result<ElementKey> {
        self.add_transform_element(ElementType::Socket, name, parent, transform, transform_in_global)
    }

    /// Adds a control. `offset`, `value` and `shape` are all local: the
    /// offset in parent space, the value relative to the offset and the
    /// shape relative to the value.
    pub fn add_control(
        &mut self,
        name: &str,
        parent: Option<ElementKey>,
        settings: ControlSettings,
        offset: Transform,
        value: Transform,
        shape: Transform,
    ) -> Result<ElementKey> {
        let parent = self.transform_parent(&ElementKey::new(ElementType::Control, name), parent.as_ref())?;
        let index = self.create_element(ElementType::Control, name, Some(settings));

        if let Some(parent) = parent {
            self.link_parent(index, parent, ElementWeight::FULL, None);
        }
        self.initialize_slots(index, TransformAspect::Offset, &offset, TransformType::InitialLocal);
        self.initialize_slots(index, TransformAspect::Pose, &value, TransformType::InitialLocal);
        self.initialize_slots(index, TransformAspect::Shape, &shape, TransformType::InitialLocal);

        Ok(self.finish_add(index))
    }

    /// Adds a curve, optionally with an explicit value.
    pub fn add_curve(&mut self, name: &str, value: Option<f32>) -> ElementKey {
        let index = self.create_element(ElementType::Curve, name, None);
        if let (Some(value), Some(curve)) = (value, self.elements[index].curve.as_mut()) {
            curve.value = value;
            curve.is_set = true;
        }
        self.finish_add(index)
    }

    pub fn add_connector(&mut self, name: &str) -> ElementKey {
        let index = self.create_element(ElementType::Connector, name, None);
        self.finish_add(index)
    }

    // ========================================================================
    // Parent links
    // ========================================================================

    /// Links `child` to `parent` without touching any transform.
    fn link_parent(&mut self, child: usize, parent: usize, weight: ElementWeight, label: Option<Symbol>) {
        let parent_key = self.elements[parent].key;
        let replaced = match &mut self.elements[child].parents {
            ParentModel::Single(slot) => slot.replace(parent),
            ParentModel::Multi(multi) => {
                let mut constraint = ParentConstraint::new(parent, weight.clamped());
                constraint.display_label = label;
                multi.index_lookup.insert(parent_key, multi.constraints.len());
                multi.constraints.push(constraint);
                None
            }
            ParentModel::None => return,
        };
        if let Some(old) = replaced {
            self.remove_dependent(old, child);
        }
        self.elements[parent].elements_to_dirty.push(child);
        self.topology.increment();
    }

    /// Removes the link from `child` to `parent` without touching any transform.
    fn unlink_parent(&mut self, child: usize, parent: usize) {
        let parent_key = self.elements[parent].key;
        let removed = match &mut self.elements[child].parents {
            ParentModel::Single(slot) if *slot == Some(parent) => {
                *slot = None;
                true
            }
            ParentModel::Multi(multi) => {
                if let Some(position) = multi.constraints.iter().position(|c| c.parent == parent) {
                    multi.constraints.remove(position);
                    multi.index_lookup.remove(&parent_key);
                    for value in multi.index_lookup.values_mut() {
                        if *value > position {
                            *value -= 1;
                        }
                    }
                    true
                } else {
                    false
                }
            }
            _ => false,
        };
        if removed {
            self.remove_dependent(parent, child);
            self.topology.increment();
        }
    }

    fn remove_dependent(&mut self, parent: usize, child: usize) {
        let dependents = &mut self.elements[parent].elements_to_dirty;
        if let Some(position) = dependents.iter().position(|&d| d == child) {
            dependents.remove(position);
        }
    }

    /// Changes the parent space of `child` through `edit`.
    ///
    /// With `maintain_global` the child stays in place and its local absorbs
    /// the change; otherwise the child keeps its local, moves, and its
    /// dependents follow.
    pub(crate) fn reparent_with(&mut self, child: usize, maintain_global: bool, edit: impl FnOnce(&mut Self)) {
        for initial in [true, false] {
            self.compute_before_parent_change(child, initial, maintain_global);
            if !maintain_global {
                self.propagate_dirty_flags(child, initial, true, true, false);
            }
        }

        edit(self);

        for initial in [true, false] {
            if maintain_global {
                self.resolve_parent_globals(child, initial);
            }
            self.mark_after_parent_change(child, initial, maintain_global);
            if !maintain_global {
                self.propagate_dirty_flags(child, initial, true, false, true);
            }
        }
    }

    fn has_parent(&self, child: usize, parent: usize) -> bool {
        self.elements[child].parents.parent_indices().contains(&parent)
    }

    fn parented_index(&self, key: &ElementKey) -> Result<usize> {
        let index = self.index_of(key).ok_or(RigError::ElementNotFound(*key))?;
        if matches!(self.elements[index].parents, ParentModel::None) {
            return Err(RigError::NotATransformElement(*key));
        }
        Ok(index)
    }

    /// Rejects `child -> parent` links that would close a cycle.
    fn check_cycle(&mut self, child: usize, parent: usize) -> Result<()> {
        if self.is_parented_to(parent, child) {
            let (child, parent) = (self.elements[child].key, self.elements[parent].key);
            log::warn!("Cannot parent '{child}' to '{parent}' - would cause a cycle");
            return Err(RigError::CycleRejected { child, parent });
        }
        Ok(())
    }

    /// Adds a parent to `child`.
    ///
    /// Single parent elements replace their current parent; multi parent
    /// elements append a constraint with `weight` for both poses.
    pub fn add_parent(
        &mut self,
        child: &ElementKey,
        parent: &ElementKey,
        weight: ElementWeight,
        maintain_global: bool,
        display_label: Option<&str>,
    ) -> Result<()> {
        let child_index = self.parented_index(child)?;
        let parent_index = self.transform_parent(child, Some(parent))?.ok_or(RigError::ElementNotFound(*parent))?;

        if self.has_parent(child_index, parent_index) {
            return Err(RigError::AlreadyParented {
                child: *child,
                parent: *parent,
            });
        }
        self.check_cycle(child_index, parent_index)?;

        let label = display_label.map(interner::intern);
        self.without_notifications(|h| {
            h.reparent_with(child_index, maintain_global, |h| {
                h.link_parent(child_index, parent_index, weight, label);
            });
        });

        self.after_mutation();
        self.notify(HierarchyEvent::ParentChanged {
            child: *child,
            parent: Some(*parent),
            added: true,
        });
        Ok(())
    }

    pub fn remove_parent(&mut self, child: &ElementKey, parent: &ElementKey, maintain_global: bool) -> Result<()> {
        let child_index = self.parented_index(child)?;
        let parent_index = self.index_of(parent).ok_or(RigError::ElementNotFound(*parent))?;
        if !self.has_parent(child_index, parent_index) {
            return Err(RigError::ParentNotFound {
                child: *child,
                parent: *parent,
            });
        }

        self.without_notifications(|h| {
            h.reparent_with(child_index, maintain_global, |h| h.unlink_parent(child_index, parent_index));
        });

        self.after_mutation();
        self.notify(HierarchyEvent::ParentChanged {
            child: *child,
            parent: Some(*parent),
            added: false,
        });
        Ok(())
    }

    /// Detaches `child` from every parent. Returns the number of removed links.
    pub fn remove_all_parents(&mut self, child: &ElementKey, maintain_global: bool) -> Result<usize> {
        let child_index = self.parented_index(child)?;
        let parents = self.elements[child_index].parents.parent_indices();
        if parents.is_empty() {
            return Ok(0);
        }

        self.without_notifications(|h| {
            h.reparent_with(child_index, maintain_global, |h| {
                for &parent in &parents {
                    h.unlink_parent(child_index, parent);
                }
            });
        });

        self.after_mutation();
        self.notify(HierarchyEvent::ParentChanged {
            child: *child,
            parent: None,
            added: false,
        });
        Ok(parents.len())
    }

    /// Makes `parent` the only parent of `child`, with full weight.
    pub fn set_parent(&mut self, child: &ElementKey, parent: &ElementKey, maintain_global: bool) -> Result<()> {
        let child_index = self.parented_index(child)?;
        let parent_index = self.transform_parent(child, Some(parent))?.ok_or(RigError::ElementNotFound(*parent))?;

        let current = self.elements[child_index].parents.parent_indices();
        if current.as_slice() == [parent_index] {
            return Ok(());
        }
        self.check_cycle(child_index, parent_index)?;

        self.without_notifications(|h| {
            h.reparent_with(child_index, maintain_global, |h| {
                for &old in &current {
                    h.unlink_parent(child_index, old);
                }
                h.link_parent(child_index, parent_index, ElementWeight::FULL, None);
            });
        });

        self.after_mutation();
        self.notify(HierarchyEvent::ParentChanged {
            child: *child,
            parent: Some(*parent),
            added: true,
        });
        Ok(())
    }

    // ========================================================================
    // Removal & renaming
    // ========================================================================

    /// Removes an element. Its dependents drop it as a parent and keep their
    /// global transforms. Indices above the removed element shift down.
    pub fn remove_element(&mut self, key: &ElementKey) -> Result<()> {
        let index = self.index_of(key).ok_or(RigError::ElementNotFound(*key))?;

        self.without_notifications(|h| {
            let mut dependents: SmallVec<[usize; 4]> = h.elements[index].elements_to_dirty.clone();
            dependents.sort_unstable();
            dependents.dedup();
            for dependent in dependents {
                h.reparent_with(dependent, true, |h| h.unlink_parent(dependent, index));
            }
            for parent in h.elements[index].parents.parent_indices() {
                h.remove_dependent(parent, index);
            }
        });

        let removed = self.elements.remove(index);
        for (_, slots) in removed.all_slots() {
            self.deallocate_slots(&slots);
        }
        self.shift_indices_after_removal(&removed);
        self.key_lookup.remove(key);
        self.topology.increment();

        self.after_mutation();
        self.notify(HierarchyEvent::ElementRemoved(*key));
        Ok(())
    }

    fn shift_indices_after_removal(&mut self, removed: &Element) {
        let gone = removed.index;
        let shift = |i: &mut usize| {
            if *i > gone {
                *i -= 1;
            }
        };

        for (position, element) in self.elements.iter_mut().enumerate() {
            element.index = position;
            match &mut element.parents {
                ParentModel::Single(Some(parent)) => shift(parent),
                ParentModel::Multi(multi) => {
                    for constraint in &mut multi.constraints {
                        shift(&mut constraint.parent);
                    }
                }
                _ => {}
            }
            for dependent in &mut element.elements_to_dirty {
                shift(dependent);
            }
        }

        let bucket = &mut self.elements_per_type[removed.key.ty.bucket()];
        bucket.remove(removed.sub_index);
        for bucket in &mut self.elements_per_type {
            for index in bucket.iter_mut() {
                shift(index);
            }
        }
        for (sub_index, &index) in self.elements_per_type[removed.key.ty.bucket()].iter().enumerate() {
            self.elements[index].sub_index = sub_index;
        }

        for index in self.key_lookup.values_mut() {
            shift(index);
        }
    }

    /// Renames an element, keeping its type. Fails if the new key is taken.
    pub fn rename_element(&mut self, key: &ElementKey, new_name: &str) -> Result<ElementKey> {
        let index = self.index_of(key).ok_or(RigError::ElementNotFound(*key))?;
        let new_key = ElementKey::new(key.ty, new_name);
        if new_key == *key {
            return Ok(new_key);
        }
        if self.contains(&new_key) {
            return Err(RigError::NameCollision(new_key));
        }

        self.elements[index].key = new_key;
        self.key_lookup.remove(key);
        self.key_lookup.insert(new_key, index);

        let dependents = self.elements[index].elements_to_dirty.clone();
        for dependent in dependents {
            if let Some(multi) = self.elements[dependent].parents.as_multi_mut()
                && let Some(constraint) = multi.index_lookup.remove(key)
            {
                multi.index_lookup.insert(new_key, constraint);
            }
        }
        self.topology.increment();

        self.notify(HierarchyEvent::ElementRenamed {
            old: *key,
            new: new_key,
        });
        Ok(new_key)
    }

    // ========================================================================
    // Parent queries
    // ========================================================================

    /// Parents of an element in constraint order, regardless of weight.
    /// Recursive results are breadth first and free of duplicates.
    #[must_use]
    pub fn get_parents(&self, key: &ElementKey, recursive: bool) -> Vec<ElementKey> {
        let Some(index) = self.index_of(key) else {
            return Vec::new();
        };

        let mut out: Vec<usize> = self.elements[index].parents.parent_indices().to_vec();
        if recursive {
            let mut cursor = 0;
            while cursor < out.len() {
                for parent in self.elements[out[cursor]].parents.parent_indices() {
                    if !out.contains(&parent) {
                        out.push(parent);
                    }
                }
                cursor += 1;
            }
        }
        out.into_iter().map(|i| self.elements[i].key).collect()
    }

    /// Every element without a parent, in index order. Curves and
    /// connectors are always roots.
    #[must_use]
    pub fn get_root_elements(&self) -> Vec<ElementKey> {
        self.elements
            .iter()
            .filter(|e| e.parents.parent_indices().is_empty())
            .map(|e| e.key)
            .collect()
    }

    #[must_use]
    pub fn get_first_parent(&self, key: &ElementKey) -> Option<ElementKey> {
        let index = self.index_of(key)?;
        let parent = *self.elements[index].parents.parent_indices().first()?;
        Some(self.elements[parent].key)
    }

    #[must_use]
    pub fn number_of_parents(&self, key: &ElementKey) -> usize {
        self.index_of(key)
            .map_or(0, |i| self.elements[i].parents.parent_indices().len())
    }

    // ========================================================================
    // Control settings
    // ========================================================================

    #[must_use]
    pub fn get_control_settings(&self, key: &ElementKey) -> Option<&ControlSettings> {
        self.get_by_key(key)?.control_settings()
    }

    /// Replaces the settings of a control. Transforms and parents are left
    /// untouched; a restriction only affects later space switches.
    pub fn set_control_settings(&mut self, key: &ElementKey, settings: ControlSettings) -> Result<()> {
        let index = self.index_of(key).ok_or(RigError::ElementNotFound(*key))?;
        let Some(control) = self.elements[index].control.as_mut() else {
            return Err(RigError::NotAControl(*key));
        };
        if control.settings == settings {
            return Ok(());
        }
        control.settings = settings;

        self.notify(HierarchyEvent::ControlSettingsChanged(*key));
        Ok(())
    }
}
