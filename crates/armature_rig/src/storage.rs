//! Reusable slot arena backing every cached transform and dirty flag.
//!
//! Elements never hold transform values directly: they hold indices into a
//! [`ReusableStorage`]. Freed indices are recycled by later allocations, and
//! only [`shrink`](ReusableStorage::shrink) and
//! [`sort_by_key`](ReusableStorage::sort_by_key) move values. Both return an
//! old-to-new index remap so owners can patch their stored indices.

/// Remap produced by a relocation: `remap[old]` is the new index, or `None`
/// if the old index was free and has been dropped.
pub type SlotRemap = Vec<Option<usize>>;

#[derive(Debug, Clone)]
pub struct ReusableStorage<T> {
    values: Vec<T>,
    free_list: Vec<usize>,
    block_size: usize,
}

impl<T: Clone> ReusableStorage<T> {
    #[must_use]
    pub fn new(block_size: usize) -> Self {
        Self {
            values: Vec::new(),
            free_list: Vec::new(),
            block_size: block_size.max(1),
        }
    }

    /// Number of slots, including free ones.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Number of slots currently on the free list.
    #[inline]
    #[must_use]
    pub fn free_count(&self) -> usize {
        self.free_list.len()
    }

    /// Allocates `count` slots initialized to `default`, reusing freed slots
    /// first. New storage is reserved in whole blocks.
    pub fn allocate(&mut self, count: usize, default: &T) -> Vec<usize> {
        let mut indices = Vec::with_capacity(count);

        while indices.len() < count {
            let Some(index) = self.free_list.pop() else {
                break;
            };
            self.values[index] = default.clone();
            indices.push(index);
        }

        let remaining = count - indices.len();
        if remaining > 0 {
            let spare = self.values.capacity() - self.values.len();
            if spare < remaining {
                let blocks = (remaining - spare).div_ceil(self.block_size);
                self.values.reserve(blocks * self.block_size);
            }
            for _ in 0..remaining {
                indices.push(self.values.len());
                self.values.push(default.clone());
            }
        }

        indices
    }

    #[inline]
    #[must_use]
    pub fn get(&self, index: usize) -> &T {
        &self.values[index]
    }

    #[inline]
    pub fn get_mut(&mut self, index: usize) -> &mut T {
        &mut self.values[index]
    }

    #[inline]
    pub fn set(&mut self, index: usize, value: T) {
        self.values[index] = value;
    }

    /// Returns a slot to the free list. The value stays in place until reused.
    pub fn deallocate(&mut self, index: usize) {
        debug_assert!(index < self.values.len(), "slot {index} out of range");
        debug_assert!(!self.free_list.contains(&index), "slot {index} freed twice");
        self.free_list.push(index);
    }

    /// Drops every free slot, compacting the live ones to the front.
    ///
    /// Returns `None` when there was nothing to drop.
    pub fn shrink(&mut self) -> Option<SlotRemap> {
        if self.free_list.is_empty() {
            return None;
        }

        let mut is_free = vec![false; self.values.len()];
        for &index in &self.free_list {
            is_free[index] = true;
        }

        let mut remap = vec![None; self.values.len()];
        let mut next = 0;
        for (old, free) in is_free.iter().enumerate() {
            if !free {
                remap[old] = Some(next);
                if old != next {
                    self.values.swap(old, next);
                }
                next += 1;
            }
        }

        self.values.truncate(next);
        self.values.shrink_to_fit();
        self.free_list.clear();
        Some(remap)
    }

    /// Reorders the live slots by `key`. Free slots must be dropped first with
    /// [`shrink`](Self::shrink).
    ///
    /// Returns `None` if the slots were already in order.
    pub fn sort_by_key<K: Ord>(&mut self, mut key: impl FnMut(usize) -> K) -> Option<SlotRemap> {
        debug_assert!(self.free_list.is_empty(), "sort_by_key requires a shrunk storage");

        let mut order: Vec<usize> = (0..self.values.len()).collect();
        order.sort_by_cached_key(|&index| key(index));
        if order.iter().enumerate().all(|(new, &old)| new == old) {
            return None;
        }

        let mut remap = vec![None; self.values.len()];
        let mut sorted = Vec::with_capacity(self.values.len());
        for (new, &old) in order.iter().enumerate() {
            remap[old] = Some(new);
            sorted.push(self.values[old].clone());
        }
        self.values = sorted;
        Some(remap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocate_reuses_freed_slots() {
        let mut storage = ReusableStorage::new(4);
        let first = storage.allocate(3, &0_u32);
        assert_eq!(first, vec![0, 1, 2]);

        storage.deallocate(1);
        assert_eq!(storage.free_count(), 1);

        let second = storage.allocate(2, &7);
        assert_eq!(second, vec![1, 3]);
        assert_eq!(*storage.get(1), 7);
        assert_eq!(storage.len(), 4);
    }

    #[test]
    fn test_shrink_remaps_live_slots() {
        let mut storage = ReusableStorage::new(8);
        let indices = storage.allocate(4, &0_i32);
        for &i in &indices {
            storage.set(i, i as i32 * 10);
        }
        storage.deallocate(0);
        storage.deallocate(2);

        let remap = storage.shrink().expect("free slots were dropped");
        assert_eq!(remap, vec![None, Some(0), None, Some(1)]);
        assert_eq!(storage.len(), 2);
        assert_eq!(*storage.get(0), 10);
        assert_eq!(*storage.get(1), 30);

        assert!(storage.shrink().is_none());
    }

    #[test]
    fn test_sort_by_key() {
        let mut storage = ReusableStorage::new(8);
        storage.allocate(3, &0_u32);
        storage.set(0, 30);
        storage.set(1, 10);
        storage.set(2, 20);

        let ranks = [3, 1, 2];
        let remap = storage.sort_by_key(|i| ranks[i]).expect("slots moved");
        assert_eq!(remap, vec![Some(2), Some(0), Some(1)]);
        assert_eq!(*storage.get(0), 10);
        assert_eq!(*storage.get(2), 30);

        assert!(storage.sort_by_key(|i| i).is_none());
    }
}
