/// Topology version counter - bumped on every structural change
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TopologyVersion {
    version: u64,
}

impl TopologyVersion {
    #[must_use]
    pub fn new() -> Self {
        Self { version: 0 }
    }

    /// Marks the topology as modified, increments version by 1
    pub fn increment(&mut self) {
        self.version = self.version.wrapping_add(1);
    }

    /// Gets the current version number
    #[must_use]
    pub fn get(&self) -> u64 {
        self.version
    }
}

/// A derived value tagged with the topology version it was computed against.
///
/// Reading a cache whose version does not match the hierarchy's current
/// topology version is a miss; callers rebuild and [`set`](Self::set) it.
#[derive(Debug, Clone, Default)]
pub struct VersionedCache<T> {
    value: T,
    version: Option<u64>,
}

impl<T> VersionedCache<T> {
    pub fn new(value: T) -> Self {
        Self { value, version: None }
    }

    /// Returns true if the cache was computed against `version`
    #[inline]
    #[must_use]
    pub fn is_valid(&self, version: u64) -> bool {
        self.version == Some(version)
    }

    /// Tags the current contents as valid for `version`
    #[inline]
    pub fn validate(&mut self, version: u64) {
        self.version = Some(version);
    }

    /// Replaces the contents and tags them with `version`
    pub fn set(&mut self, value: T, version: u64) {
        self.value = value;
        self.version = Some(version);
    }

    /// Forces the next access to miss
    #[inline]
    pub fn invalidate(&mut self) {
        self.version = None;
    }

    #[inline]
    #[must_use]
    pub fn get(&self) -> &T {
        &self.value
    }

    /// Mutable access to the contents, regardless of validity
    #[inline]
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_increment() {
        let mut v = TopologyVersion::new();
        assert_eq!(v.get(), 0);
        v.increment();
        v.increment();
        assert_eq!(v.get(), 2);
    }

    #[test]
    fn test_versioned_cache_misses_after_bump() {
        let mut topology = TopologyVersion::new();
        let mut cache = VersionedCache::new(Vec::<u32>::new());
        assert!(!cache.is_valid(topology.get()));

        cache.set(vec![1, 2, 3], topology.get());
        assert!(cache.is_valid(topology.get()));

        topology.increment();
        assert!(!cache.is_valid(topology.get()));
        assert_eq!(cache.get(), &vec![1, 2, 3]);
    }
}
