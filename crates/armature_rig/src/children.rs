//! Child cache: flattened parent-to-children adjacency.
//!
//! Rebuilt on first access after the topology version moved. Children of an
//! element occupy one contiguous run of a shared array, in index order; a
//! multi parent element is a child of every parent it has a constraint on.

use armature_core::ElementKey;
use bit_vec::BitVec;

use crate::hierarchy::RigHierarchy;

#[derive(Debug, Clone, Default)]
pub(crate) struct ChildTable {
    /// `(start, count)` into `children`, per element index.
    ranges: Vec<(usize, usize)>,
    children: Vec<usize>,
    /// Elements with at least one parent.
    has_parent: BitVec,
}

impl ChildTable {
    fn children_of(&self, index: usize) -> &[usize] {
        match self.ranges.get(index) {
            Some(&(start, count)) => &self.children[start..start + count],
            None => &[],
        }
    }
}

impl RigHierarchy {
    /// Direct children of `index`, in index order. Valid until the next
    /// structural change.
    pub fn children_of(&mut self, index: usize) -> &[usize] {
        let version = self.topology.get();
        if !self.child_cache.is_valid(version) {
            self.rebuild_child_cache();
            self.child_cache.validate(version);
        }
        self.child_cache.get().children_of(index)
    }

    fn rebuild_child_cache(&mut self) {
        let count = self.elements.len();
        let table = self.child_cache.get_mut();

        table.ranges.clear();
        table.ranges.resize(count, (0, 0));
        table.has_parent = BitVec::from_elem(count, false);

        // pass 1: count children per parent
        for element in &self.elements {
            let parents = element.parents.parent_indices();
            if parents.is_empty() {
                continue;
            }
            table.has_parent.set(element.index, true);
            for parent in parents {
                table.ranges[parent].1 += 1;
            }
        }

        let mut start = 0;
        for range in &mut table.ranges {
            range.0 = start;
            start += range.1;
            range.1 = 0;
        }
        table.children.clear();
        table.children.resize(start, 0);

        // pass 2: fill, visiting only elements that have parents
        for (index, has_parent) in table.has_parent.iter().enumerate() {
            if !has_parent {
                continue;
            }
            for parent in self.elements[index].parents.parent_indices() {
                let (start, filled) = &mut table.ranges[parent];
                table.children[*start + *filled] = index;
                *filled += 1;
            }
        }

        log::debug!("Rebuilt child cache: {} elements, {} links", count, start);
    }

    /// Children of an element by key, optionally including all descendants.
    ///
    /// Recursive results are breadth first and free of duplicates.
    pub fn get_children(&mut self, key: &ElementKey, recursive: bool) -> Vec<ElementKey> {
        let Some(index) = self.index_of(key) else {
            return Vec::new();
        };

        let mut out: Vec<usize> = self.children_of(index).to_vec();
        if recursive {
            let mut seen = BitVec::from_elem(self.elements.len(), false);
            for &child in &out {
                seen.set(child, true);
            }
            let mut cursor = 0;
            while cursor < out.len() {
                let current = out[cursor];
                cursor += 1;
                let grandchildren = self.children_of(current).to_vec();
                for child in grandchildren {
                    if !seen.get(child).unwrap_or(true) {
                        seen.set(child, true);
                        out.push(child);
                    }
                }
            }
        }

        out.into_iter().map(|i| self.elements[i].key).collect()
    }
}

#[cfg(test)]
mod tests {
    use armature_core::{ElementWeight, Transform};

    use crate::element::ControlSettings;

    use super::*;

    #[test]
    fn test_multi_parent_is_child_of_every_parent() {
        let mut hierarchy = RigHierarchy::new();
        let a = hierarchy.add_null("a", None, Transform::IDENTITY, false).unwrap();
        let b = hierarchy.add_null("b", None, Transform::IDENTITY, false).unwrap();
        let c = hierarchy
            .add_control("c", Some(a), ControlSettings::default(), Transform::IDENTITY, Transform::IDENTITY, Transform::IDENTITY)
            .unwrap();
        hierarchy.add_parent(&c, &b, ElementWeight::ZERO, true, None).unwrap();

        let (ia, ib, ic) = (hierarchy.index_of(&a).unwrap(), hierarchy.index_of(&b).unwrap(), hierarchy.index_of(&c).unwrap());
        assert_eq!(hierarchy.children_of(ia), &[ic]);
        assert_eq!(hierarchy.children_of(ib), &[ic]);
        assert!(hierarchy.children_of(ic).is_empty());
    }

    #[test]
    fn test_cache_rebuilds_after_topology_change() {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut hierarchy = RigHierarchy::new();
        let root = hierarchy.add_bone("root", None, Transform::IDENTITY, false).unwrap();
        hierarchy.add_bone("first", Some(root), Transform::IDENTITY, false).unwrap();
        assert_eq!(hierarchy.children_of(0).len(), 1);

        hierarchy.add_bone("second", Some(root), Transform::IDENTITY, false).unwrap();
        assert_eq!(hierarchy.children_of(0), &[1, 2]);

        let version = hierarchy.topology_version();
        let _ = hierarchy.children_of(0);
        assert_eq!(hierarchy.topology_version(), version);
    }

    #[test]
    fn test_children_are_in_index_order() {
        let mut hierarchy = RigHierarchy::new();
        let root = hierarchy.add_bone("root", None, Transform::IDENTITY, false).unwrap();
        let late = hierarchy.add_bone("late", None, Transform::IDENTITY, false).unwrap();
        hierarchy.add_bone("early", Some(root), Transform::IDENTITY, false).unwrap();
        hierarchy.set_parent(&late, &root, false).unwrap();

        let children = hierarchy.get_children(&root, false);
        assert_eq!(children.len(), 2);
        assert_eq!(children[0], late);
    }
}
