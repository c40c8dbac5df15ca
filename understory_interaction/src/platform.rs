// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The host capability contract.
//!
//! The engine never touches a real document. It talks to the host through
//! [`Platform`]: listener registration, structural-mutation observation, node
//! containment, a clock, and one-shot timers.
//!
//! Identities flow one way. The engine allocates [`ListenerId`], [`ObserverId`]
//! and [`TimerId`] values and hands them to the platform; the host reports
//! activity back by calling into the [`Registry`](crate::Registry):
//!
//! | Host activity | Call |
//! |---|---|
//! | A subscribed listener is reached during dispatch | [`Registry::handle_event`](crate::Registry::handle_event) |
//! | A scheduled timer elapsed | [`Registry::fire_timer`](crate::Registry::fire_timer) |
//! | An observer produced a batch of records | [`Registry::bridge_mutations`](crate::Registry::bridge_mutations), then dispatch the returned events |
//!
//! No callback owns the engine, so the host is free to hold the registry and
//! the platform side by side. See [`headless::HeadlessHost`](crate::headless::HeadlessHost)
//! for a complete in-memory implementation.

use core::fmt::Debug;

use crate::mutation::MutationFilter;

/// Identifies one subscribed listener (one bound anchor x event pair).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub(crate) u64);

/// Identifies one structural-mutation observer.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(pub(crate) u64);

/// Identifies one scheduled one-shot timer.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(pub(crate) u64);

impl ListenerId {
    /// Raw value, for host-side tables.
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl ObserverId {
    /// Raw value, for host-side tables.
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl TimerId {
    /// Raw value, for host-side tables.
    pub const fn get(self) -> u64 {
        self.0
    }
}

/// Listener registration flags.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct ListenerOptions {
    /// Run during the capture phase.
    pub capture: bool,
    /// The listener promises not to prevent the default action.
    pub passive: bool,
}

/// Host services consumed by the engine.
///
/// A host instance serves one [`Registry`](crate::Registry). Each registry
/// numbers its [`ListenerId`], [`ObserverId`] and [`TimerId`] values from 1,
/// so ids issued by two registries sharing a host would collide.
pub trait Platform: Sized {
    /// A node (element, document, window) events can be bound to.
    type Node: Clone + PartialEq + Debug;

    /// Register `listener` for `event` on `anchor`.
    fn subscribe(
        &mut self,
        anchor: &Self::Node,
        event: &str,
        listener: ListenerId,
        options: ListenerOptions,
    );

    /// Remove a registration made by [`Platform::subscribe`] with the same arguments.
    fn unsubscribe(
        &mut self,
        anchor: &Self::Node,
        event: &str,
        listener: ListenerId,
        options: ListenerOptions,
    );

    /// Start observing structural changes on `anchor`.
    fn observe_mutations(&mut self, anchor: &Self::Node, observer: ObserverId, filter: MutationFilter);

    /// Stop an observer started by [`Platform::observe_mutations`].
    fn disconnect(&mut self, observer: ObserverId);

    /// Returns `true` if `node` is `ancestor` or one of its descendants.
    fn contains(&self, ancestor: &Self::Node, node: &Self::Node) -> bool;

    /// Current time in milliseconds.
    fn now(&self) -> u64;

    /// Schedule `timer` to elapse after `delay` milliseconds.
    fn set_timer(&mut self, timer: TimerId, delay: u64);

    /// Cancel a timer scheduled by [`Platform::set_timer`]. Unknown ids are ignored.
    fn clear_timer(&mut self, timer: TimerId);
}

/// Shorthand for a platform's node type.
pub type NodeOf<P> = <P as Platform>::Node;
