//! Dependency / cycle oracle.

use armature_core::ElementKey;
use bit_vec::BitVec;
use rustc_hash::FxHashMap;

use crate::hierarchy::RigHierarchy;

/// Extra dependency edges beyond the parent graph, for example from an
/// execution scheduler. Edges need not be acyclic.
pub trait DependencyProvider {
    /// Elements that `element` depends on.
    fn dependencies(&self, element: usize) -> &[usize];

    /// An empty provider adds no edges, which allows memoizing answers.
    fn is_empty(&self) -> bool;
}

/// The parent graph only.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDependencies;

impl DependencyProvider for NoDependencies {
    fn dependencies(&self, _element: usize) -> &[usize] {
        &[]
    }

    fn is_empty(&self) -> bool {
        true
    }
}

impl DependencyProvider for FxHashMap<usize, Vec<usize>> {
    fn dependencies(&self, element: usize) -> &[usize] {
        match self.get(&element) {
            Some(dependencies) => dependencies,
            None => &[],
        }
    }

    fn is_empty(&self) -> bool {
        FxHashMap::is_empty(self)
    }
}

impl RigHierarchy {
    /// True if `dependent` is influenced by `ancestor`, through any parent
    /// constraint (regardless of weight) or any provider edge.
    ///
    /// An element depends on itself.
    pub fn is_dependent_on(&mut self, dependent: usize, ancestor: usize, provider: &dyn DependencyProvider) -> bool {
        if dependent >= self.elements.len() || ancestor >= self.elements.len() {
            return false;
        }
        if dependent == ancestor {
            return true;
        }

        let memoize = provider.is_empty();
        if memoize {
            let version = self.topology.get();
            if !self.dependency_memo.is_valid(version) {
                log::debug!("Dependency memo reset at topology version {version}");
                self.dependency_memo.set(FxHashMap::default(), version);
            }
            let memo = self.dependency_memo.get();
            if let Some(&known) = memo.get(&(dependent, ancestor)) {
                return known;
            }
            // a valid hierarchy is acyclic
            if memo.get(&(ancestor, dependent)) == Some(&true) {
                return false;
            }
        }

        let result = self.search_dependency(dependent, ancestor, provider);
        if memoize {
            self.dependency_memo.get_mut().insert((dependent, ancestor), result);
        }
        result
    }

    fn search_dependency(&self, dependent: usize, ancestor: usize, provider: &dyn DependencyProvider) -> bool {
        let mut visited = BitVec::from_elem(self.elements.len(), false);
        let mut stack = vec![dependent];
        visited.set(dependent, true);

        while let Some(current) = stack.pop() {
            if current == ancestor {
                return true;
            }
            let parents = self.elements[current].parents.parent_indices();
            let extra = provider.dependencies(current);
            for &next in parents.iter().chain(extra) {
                if next < self.elements.len() && !visited.get(next).unwrap_or(true) {
                    visited.set(next, true);
                    stack.push(next);
                }
            }
        }
        false
    }

    /// True if `child` sits anywhere below `parent` in the parent graph.
    pub fn is_parented_to(&mut self, child: usize, parent: usize) -> bool {
        self.is_dependent_on(child, parent, &NoDependencies)
    }

    /// Key based [`is_parented_to`](Self::is_parented_to).
    pub fn is_parented_to_key(&mut self, child: &ElementKey, parent: &ElementKey) -> bool {
        match (self.index_of(child), self.index_of(parent)) {
            (Some(child), Some(parent)) => self.is_parented_to(child, parent),
            _ => false,
        }
    }
}
