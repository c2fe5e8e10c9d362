use std::fmt;

use armature_core::{
    ElementKey, ElementType, ElementTypeMask, TopologyVersion, Transform, TransformAspect,
    TransformType, VersionedCache,
};
use rustc_hash::FxHashMap;

use crate::children::ChildTable;
use crate::element::{Element, TransformSlots};
use crate::events::EventHandler;
use crate::listener::HierarchyListener;
use crate::settings::HierarchySettings;
use crate::storage::ReusableStorage;

/// The rig hierarchy: element store, transform cache and derived caches.
///
/// # Storage
///
/// Elements live in a flat array in insertion order and are additionally
/// grouped per [`ElementType`]. Every transform-bearing element owns four
/// slots (initial/current × local/global) per aspect in two shared arenas,
/// one for values and one for dirty flags.
///
/// # Cache coherence
///
/// For every slot set and every pose (initial or current), at most one of the
/// local and the global variant is dirty. Reads resolve the dirty side from
/// the clean one on demand; writes invalidate dependents through the
/// `elements_to_dirty` links.
///
/// Most operations address elements by index; indices are stable until an
/// element is removed.
pub struct RigHierarchy {
    pub(crate) elements: Vec<Element>,
    pub(crate) elements_per_type: [Vec<usize>; 7],
    pub(crate) key_lookup: FxHashMap<ElementKey, usize>,

    pub(crate) transforms: ReusableStorage<Transform>,
    pub(crate) dirty_states: ReusableStorage<bool>,

    pub(crate) topology: TopologyVersion,
    pub(crate) settings: HierarchySettings,

    // === Derived caches, keyed by topology version ===
    pub(crate) child_cache: VersionedCache<ChildTable>,
    pub(crate) dependency_memo: VersionedCache<FxHashMap<(usize, usize), bool>>,

    // === Notifications ===
    pub(crate) event_handler: Option<EventHandler>,
    pub(crate) suspend_notifications: bool,
    pub(crate) listeners: Vec<HierarchyListener>,
    pub(crate) propagating_to_listeners: bool,
}

impl Default for RigHierarchy {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RigHierarchy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RigHierarchy")
            .field("elements", &self.elements.len())
            .field("transform_slots", &self.transforms.len())
            .field("topology_version", &self.topology.get())
            .field("listeners", &self.listeners.len())
            .finish_non_exhaustive()
    }
}

impl RigHierarchy {
    #[must_use]
    pub fn new() -> Self {
        Self::with_settings(HierarchySettings::default())
    }

    #[must_use]
    pub fn with_settings(settings: HierarchySettings) -> Self {
        let block_size = settings.element_block_size;
        Self {
            elements: Vec::new(),
            elements_per_type: Default::default(),
            key_lookup: FxHashMap::default(),
            transforms: ReusableStorage::new(block_size * 4),
            dirty_states: ReusableStorage::new(block_size * 4),
            topology: TopologyVersion::new(),
            settings,
            child_cache: VersionedCache::default(),
            dependency_memo: VersionedCache::default(),
            event_handler: None,
            suspend_notifications: false,
            listeners: Vec::new(),
            propagating_to_listeners: false,
        }
    }

    #[inline]
    #[must_use]
    pub fn settings(&self) -> &HierarchySettings {
        &self.settings
    }

    #[inline]
    pub fn settings_mut(&mut self) -> &mut HierarchySettings {
        &mut self.settings
    }

    // ========================================================================
    // Element queries
    // ========================================================================

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn index_of(&self, key: &ElementKey) -> Option<usize> {
        self.key_lookup.get(key).copied()
    }

    #[inline]
    #[must_use]
    pub fn key_of(&self, index: usize) -> Option<ElementKey> {
        self.elements.get(index).map(|e| e.key)
    }

    #[inline]
    #[must_use]
    pub fn contains(&self, key: &ElementKey) -> bool {
        self.key_lookup.contains_key(key)
    }

    #[inline]
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Element> {
        self.elements.get(index)
    }

    #[must_use]
    pub fn get_by_key(&self, key: &ElementKey) -> Option<&Element> {
        self.index_of(key).map(|i| &self.elements[i])
    }

    /// All elements in index order.
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.elements.iter()
    }

    #[must_use]
    pub fn num_of_type(&self, ty: ElementType) -> usize {
        self.elements_per_type[ty.bucket()].len()
    }

    /// Keys of every element whose type is in `mask`, in index order.
    #[must_use]
    pub fn elements_of_type(&self, mask: ElementTypeMask) -> Vec<ElementKey> {
        self.elements
            .iter()
            .filter(|e| mask.contains_type(e.key.ty))
            .map(|e| e.key)
            .collect()
    }

    /// Element indices of one type, ordered by sub index.
    #[must_use]
    pub fn indices_of_type(&self, ty: ElementType) -> &[usize] {
        &self.elements_per_type[ty.bucket()]
    }

    // ========================================================================
    // Topology version
    // ========================================================================

    #[inline]
    #[must_use]
    pub fn topology_version(&self) -> u64 {
        self.topology.get()
    }

    /// Invalidates every topology-keyed cache.
    pub fn increment_topology_version(&mut self) {
        self.topology.increment();
    }

    // ========================================================================
    // Slot access
    // ========================================================================

    #[inline]
    pub(crate) fn slots(&self, index: usize, aspect: TransformAspect) -> Option<TransformSlots> {
        self.elements.get(index).and_then(|e| e.slots(aspect))
    }

    #[inline]
    pub(crate) fn slot_is_dirty(&self, slots: &TransformSlots, ty: TransformType) -> bool {
        *self.dirty_states.get(slots.dirty_slot(ty))
    }

    #[inline]
    pub(crate) fn slot_value(&self, slots: &TransformSlots, ty: TransformType) -> Transform {
        *self.transforms.get(slots.transform_slot(ty))
    }

    /// Writes a value and marks it clean.
    #[inline]
    pub(crate) fn store_slot(&mut self, slots: &TransformSlots, ty: TransformType, value: Transform) {
        self.transforms.set(slots.transform_slot(ty), value);
        self.dirty_states.set(slots.dirty_slot(ty), false);
    }

    /// Invalidates one variant. The opposing variant must be clean.
    #[inline]
    pub(crate) fn mark_slot_dirty(&mut self, slots: &TransformSlots, ty: TransformType) {
        debug_assert!(
            !self.slot_is_dirty(slots, ty.swap_local_and_global()),
            "both local and global transforms would be dirty"
        );
        self.dirty_states.set(slots.dirty_slot(ty), true);
    }

    /// True if the cached variant has to be recomputed before it can be read.
    #[must_use]
    pub fn is_dirty(&self, index: usize, aspect: TransformAspect, ty: TransformType) -> bool {
        self.slots(index, aspect).is_some_and(|slots| self.slot_is_dirty(&slots, ty))
    }

    /// Allocates the four slots of one aspect. Locals start clean at identity,
    /// globals start dirty.
    pub(crate) fn allocate_slots(&mut self) -> TransformSlots {
        let values = self.transforms.allocate(4, &Transform::IDENTITY);
        let dirty = self.dirty_states.allocate(4, &false);
        let slots = TransformSlots {
            transforms: [values[0], values[1], values[2], values[3]],
            dirty: [dirty[0], dirty[1], dirty[2], dirty[3]],
        };
        self.dirty_states.set(slots.dirty_slot(TransformType::InitialGlobal), true);
        self.dirty_states.set(slots.dirty_slot(TransformType::CurrentGlobal), true);
        slots
    }

    pub(crate) fn deallocate_slots(&mut self, slots: &TransformSlots) {
        for (&value, &dirty) in slots.transforms.iter().zip(&slots.dirty) {
            self.transforms.deallocate(value);
            self.dirty_states.deallocate(dirty);
        }
    }

    // ========================================================================
    // Post-mutation bookkeeping
    // ========================================================================

    pub(crate) fn after_mutation(&mut self) {
        if self.settings.ensure_cache_validity {
            self.ensure_cache_validity();
        }
    }
}
