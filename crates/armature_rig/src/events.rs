//! Change notifications.
//!
//! A hierarchy delivers at most one [`HierarchyEvent`] per public mutating
//! call, after the change has been committed. Internal calls made while
//! servicing a mutation are suppressed.

use armature_core::{ElementKey, Transform, TransformAspect, TransformType};

use crate::hierarchy::RigHierarchy;

#[derive(Debug, Clone, PartialEq)]
pub enum HierarchyEvent {
    ElementAdded(ElementKey),
    ElementRemoved(ElementKey),
    ElementRenamed {
        old: ElementKey,
        new: ElementKey,
    },
    /// A parent link was added or removed. `parent` is `None` when every
    /// parent was removed at once.
    ParentChanged {
        child: ElementKey,
        parent: Option<ElementKey>,
        added: bool,
    },
    ParentWeightsChanged {
        child: ElementKey,
        initial: bool,
    },
    TransformChanged {
        key: ElementKey,
        aspect: TransformAspect,
        transform_type: TransformType,
        previous: Transform,
        current: Transform,
    },
    ControlSettingsChanged(ElementKey),
    CurveChanged {
        key: ElementKey,
        previous: Option<f32>,
        current: Option<f32>,
    },
    /// Poses or the whole hierarchy were replaced in bulk.
    HierarchyReset,
}

/// Receiver of hierarchy notifications.
pub type EventHandler = Box<dyn FnMut(&HierarchyEvent) + Send>;

impl RigHierarchy {
    /// Installs the notification receiver, replacing any previous one.
    pub fn set_event_handler(&mut self, handler: impl FnMut(&HierarchyEvent) + Send + 'static) {
        self.event_handler = Some(Box::new(handler));
    }

    pub fn clear_event_handler(&mut self) -> Option<EventHandler> {
        self.event_handler.take()
    }

    pub(crate) fn notify(&mut self, event: HierarchyEvent) {
        if self.suspend_notifications {
            return;
        }
        if let Some(handler) = self.event_handler.as_mut() {
            handler(&event);
        }
    }

    /// Runs `f` with notifications suppressed.
    pub(crate) fn without_notifications<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        let previous = std::mem::replace(&mut self.suspend_notifications, true);
        let result = f(self);
        self.suspend_notifications = previous;
        result
    }
}
