//! Shared hierarchies and listener fan-out.
//!
//! A hierarchy can mirror its value edits (transforms, control offsets and
//! shapes, curves, parent weights) onto listener hierarchies. Listeners are
//! addressed by element key, so they only need to contain the elements that
//! are being edited. Structural edits are not forwarded.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::hierarchy::RigHierarchy;

/// A hierarchy behind the store-wide lock.
pub type SharedHierarchy = Arc<Mutex<RigHierarchy>>;

#[derive(Debug, Clone)]
pub(crate) struct HierarchyListener {
    pub(crate) hierarchy: Weak<Mutex<RigHierarchy>>,
    pub(crate) react_to_initial: bool,
    pub(crate) react_to_current: bool,
}

impl HierarchyListener {
    fn reacts_to(&self, initial: bool) -> bool {
        if initial {
            self.react_to_initial
        } else {
            self.react_to_current
        }
    }
}

impl RigHierarchy {
    /// Moves the hierarchy behind a lock so it can be shared and listened to.
    #[must_use]
    pub fn into_shared(self) -> SharedHierarchy {
        Arc::new(Mutex::new(self))
    }

    /// Registers `listener` to receive this hierarchy's value edits.
    ///
    /// Registering the same listener twice updates its flags.
    pub fn register_listener(
        &mut self,
        listener: &SharedHierarchy,
        react_to_initial: bool,
        react_to_current: bool,
    ) {
        let weak = Arc::downgrade(listener);
        if let Some(existing) = self.listeners.iter_mut().find(|l| l.hierarchy.ptr_eq(&weak)) {
            existing.react_to_initial = react_to_initial;
            existing.react_to_current = react_to_current;
            return;
        }
        self.listeners.push(HierarchyListener {
            hierarchy: weak,
            react_to_initial,
            react_to_current,
        });
    }

    pub fn unregister_listener(&mut self, listener: &SharedHierarchy) {
        let weak = Arc::downgrade(listener);
        self.listeners.retain(|l| !l.hierarchy.ptr_eq(&weak));
    }

    pub fn clear_listeners(&mut self) {
        self.listeners.clear();
    }

    /// Number of registered listeners that are still alive.
    #[must_use]
    pub fn num_listeners(&self) -> usize {
        self.listeners.iter().filter(|l| l.hierarchy.strong_count() > 0).count()
    }

    /// Applies `edit` to every listener interested in the initial or current pose.
    ///
    /// Listeners that are locked elsewhere, or are themselves forwarding, are
    /// skipped. Dropped listeners are pruned.
    pub(crate) fn forward_to_listeners(&mut self, initial: bool, mut edit: impl FnMut(&mut RigHierarchy)) {
        if !self.settings.forward_to_listeners || self.propagating_to_listeners || self.listeners.is_empty() {
            return;
        }

        self.propagating_to_listeners = true;
        self.listeners.retain(|l| l.hierarchy.strong_count() > 0);

        for listener in &self.listeners {
            if !listener.reacts_to(initial) {
                continue;
            }
            let Some(shared) = listener.hierarchy.upgrade() else {
                continue;
            };
            let Some(mut target) = shared.try_lock() else {
                log::trace!("Skipping busy listener hierarchy");
                continue;
            };
            if target.propagating_to_listeners {
                continue;
            }
            edit(&mut *target);
        }

        self.propagating_to_listeners = false;
    }
}
