// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The event object seen by filters and handlers.
//!
//! Hosts translate their native events into [`Event`]. Synthetic events built
//! by [`Registry::trigger`](crate::Registry::trigger) and the mutation bridge
//! use the same type, flagged with [`Event::is_synthetic`] or carrying a
//! [`MutationRecord`].
//!
//! ```
//! use understory_interaction::category::EventCategory;
//! use understory_interaction::event::Event;
//!
//! let ev: Event<u32> = Event::new("click", EventCategory::Pointer)
//!     .with_target(7)
//!     .with_related_target(3);
//! assert_eq!(ev.targets().target, Some(7));
//! assert!(ev.init().bubbles);
//! assert!(!ev.is_synthetic());
//! ```

use alloc::rc::Rc;
use alloc::string::String;
use core::any::Any;
use core::cell::Cell;
use core::fmt;

use crate::category::{EventCategory, EventSpec};
use crate::mutation::MutationRecord;

/// Arbitrary caller data attached to a synthetic event.
pub type Payload = Rc<dyn Any>;

/// Dispatch flags an event is constructed with.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct EventInit {
    /// The event propagates to ancestors after the target phase.
    pub bubbles: bool,
    /// Handlers may prevent the default action.
    pub cancelable: bool,
    /// Legacy scoping flag, carried through untouched.
    pub scoped: bool,
    /// The event crosses shadow boundaries.
    pub composed: bool,
}

impl EventInit {
    /// Flags used for platform custom events: nothing set.
    pub const CUSTOM: Self = Self {
        bubbles: false,
        cancelable: false,
        scoped: false,
        composed: false,
    };
}

impl Default for EventInit {
    /// Flags used for synthetic triggers: bubbling, everything else off.
    fn default() -> Self {
        Self {
            bubbles: true,
            ..Self::CUSTOM
        }
    }
}

/// Every notion of "target" a platform may expose on an event.
///
/// On a real event these are the raw platform values. On a trigger they are
/// caller overrides: each `Some` field replaces the resolved value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventTargets<N> {
    /// The node that dispatched the event.
    pub target: Option<N>,
    /// The node whose listener is running.
    pub current_target: Option<N>,
    /// The secondary node (where the pointer came from or went to).
    pub related_target: Option<N>,
    /// Legacy alias of `target`.
    pub src_element: Option<N>,
    /// Legacy: the node the pointer left.
    pub from_element: Option<N>,
    /// Legacy: the node the pointer entered.
    pub to_element: Option<N>,
    /// Gecko: the target before retargeting, ignoring anonymous content.
    pub explicit_original_target: Option<N>,
    /// Gecko: the target before any retargeting.
    pub original_target: Option<N>,
}

impl<N> Default for EventTargets<N> {
    fn default() -> Self {
        Self {
            target: None,
            current_target: None,
            related_target: None,
            src_element: None,
            from_element: None,
            to_element: None,
            explicit_original_target: None,
            original_target: None,
        }
    }
}

impl<N: Clone> EventTargets<N> {
    /// Overrides with only the primary target set.
    pub fn with_target(target: N) -> Self {
        Self {
            target: Some(target),
            ..Self::default()
        }
    }

    /// Replace every field of `self` for which `overrides` has a value.
    pub fn overlay(&mut self, overrides: &Self) {
        fn put<N: Clone>(slot: &mut Option<N>, value: &Option<N>) {
            if value.is_some() {
                slot.clone_from(value);
            }
        }
        put(&mut self.target, &overrides.target);
        put(&mut self.current_target, &overrides.current_target);
        put(&mut self.related_target, &overrides.related_target);
        put(&mut self.src_element, &overrides.src_element);
        put(&mut self.from_element, &overrides.from_element);
        put(&mut self.to_element, &overrides.to_element);
        put(
            &mut self.explicit_original_target,
            &overrides.explicit_original_target,
        );
        put(&mut self.original_target, &overrides.original_target);
    }
}

/// An event delivered to the engine.
#[derive(Clone)]
pub struct Event<N> {
    name: String,
    category: EventCategory,
    init: EventInit,
    targets: EventTargets<N>,
    overrides: Option<EventTargets<N>>,
    mutation: Option<MutationRecord<N>>,
    synthetic: bool,
    data: Option<Payload>,
    default_prevented: Rc<Cell<bool>>,
}

impl<N> Event<N> {
    /// Create an event with default (bubbling) flags and no targets.
    pub fn new(name: impl Into<String>, category: EventCategory) -> Self {
        Self {
            name: name.into(),
            category,
            init: EventInit::default(),
            targets: EventTargets::default(),
            overrides: None,
            mutation: None,
            synthetic: false,
            data: None,
            default_prevented: Rc::new(Cell::new(false)),
        }
    }

    /// Create an event for a configured [`EventSpec`].
    pub fn from_spec(spec: &EventSpec) -> Self {
        Self::new(spec.name(), spec.category())
    }

    /// Replace the dispatch flags.
    #[must_use]
    pub fn with_init(mut self, init: EventInit) -> Self {
        self.init = init;
        self
    }

    /// Set the primary target.
    #[must_use]
    pub fn with_target(mut self, target: N) -> Self {
        self.targets.target = Some(target);
        self
    }

    /// Set the node whose listener is running.
    #[must_use]
    pub fn with_current_target(mut self, current: N) -> Self {
        self.targets.current_target = Some(current);
        self
    }

    /// Set the secondary target.
    #[must_use]
    pub fn with_related_target(mut self, related: N) -> Self {
        self.targets.related_target = Some(related);
        self
    }

    /// Replace all raw targets.
    #[must_use]
    pub fn with_targets(mut self, targets: EventTargets<N>) -> Self {
        self.targets = targets;
        self
    }

    /// Attach caller-supplied target overrides.
    #[must_use]
    pub fn with_overrides(mut self, overrides: EventTargets<N>) -> Self {
        self.overrides = Some(overrides);
        self
    }

    /// Attach a structural-mutation record.
    #[must_use]
    pub fn with_mutation(mut self, record: MutationRecord<N>) -> Self {
        self.mutation = Some(record);
        self
    }

    /// Attach caller data.
    #[must_use]
    pub fn with_data(mut self, data: Payload) -> Self {
        self.data = Some(data);
        self
    }

    /// Mark the event as engine-constructed rather than platform-originated.
    #[must_use]
    pub fn synthetic(mut self) -> Self {
        self.synthetic = true;
        self
    }

    /// The event name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The event family.
    pub fn category(&self) -> EventCategory {
        self.category
    }

    /// Dispatch flags.
    pub fn init(&self) -> EventInit {
        self.init
    }

    /// Raw platform targets.
    pub fn targets(&self) -> &EventTargets<N> {
        &self.targets
    }

    /// Mutable raw targets, for hosts retargeting during propagation.
    pub fn targets_mut(&mut self) -> &mut EventTargets<N> {
        &mut self.targets
    }

    /// Caller-supplied target overrides, if any.
    pub fn overrides(&self) -> Option<&EventTargets<N>> {
        self.overrides.as_ref()
    }

    /// The mutation record of a bridged structural change.
    pub fn mutation(&self) -> Option<&MutationRecord<N>> {
        self.mutation.as_ref()
    }

    /// Returns `true` for events built by the engine.
    pub fn is_synthetic(&self) -> bool {
        self.synthetic
    }

    /// Caller data of a synthetic event.
    pub fn data(&self) -> Option<&Payload> {
        self.data.as_ref()
    }

    /// Caller data downcast to `T`.
    pub fn data_as<T: 'static>(&self) -> Option<&T> {
        self.data.as_deref().and_then(|d| d.downcast_ref::<T>())
    }

    /// Ask the host not to run the default action. Ignored unless cancelable.
    ///
    /// Clones of an event share this flag, so a host can observe it after
    /// delivering clones to several listeners.
    pub fn prevent_default(&self) {
        if self.init.cancelable {
            self.default_prevented.set(true);
        }
    }

    /// Returns `true` once a handler prevented the default action.
    pub fn default_prevented(&self) -> bool {
        self.default_prevented.get()
    }
}

impl<N: fmt::Debug> fmt::Debug for Event<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("name", &self.name)
            .field("category", &self.category)
            .field("init", &self.init)
            .field("targets", &self.targets)
            .field("overrides", &self.overrides)
            .field("mutation", &self.mutation)
            .field("synthetic", &self.synthetic)
            .field("has_data", &self.data.is_some())
            .field("default_prevented", &self.default_prevented.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_init_bubbles_only() {
        let init = EventInit::default();
        assert!(init.bubbles);
        assert!(!init.cancelable && !init.scoped && !init.composed);
        assert!(!EventInit::CUSTOM.bubbles);
    }

    #[test]
    fn overlay_replaces_only_present_fields() {
        let mut base = EventTargets {
            target: Some(1),
            current_target: Some(2),
            related_target: Some(3),
            ..EventTargets::default()
        };
        let overrides = EventTargets {
            target: Some(9),
            to_element: Some(8),
            ..EventTargets::default()
        };
        base.overlay(&overrides);
        assert_eq!(base.target, Some(9));
        assert_eq!(base.current_target, Some(2));
        assert_eq!(base.related_target, Some(3));
        assert_eq!(base.to_element, Some(8));
    }

    #[test]
    fn prevent_default_requires_cancelable_and_is_shared() {
        let ev: Event<u32> = Event::new("click", EventCategory::Pointer);
        ev.prevent_default();
        assert!(!ev.default_prevented());

        let ev: Event<u32> = Event::new("click", EventCategory::Pointer).with_init(EventInit {
            cancelable: true,
            ..EventInit::default()
        });
        let copy = ev.clone();
        copy.prevent_default();
        assert!(ev.default_prevented());
    }

    #[test]
    fn data_downcasts() {
        let ev: Event<u32> = Event::new(":build", EventCategory::Custom).with_data(Rc::new(42_i32));
        assert_eq!(ev.data_as::<i32>(), Some(&42));
        assert_eq!(ev.data_as::<u8>(), None);
    }
}
