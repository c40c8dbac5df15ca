// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Binding, delivery and unbinding.
//!
//! Each (anchor, event) pair of an interaction is one binding: a platform
//! listener, an optional mutation observer, and the pair's own rate limiter.
//! A delivery runs the limiter first; a deferred call parks the event and a
//! timer, and [`Registry::fire_timer`] later replays it through the same
//! pipeline:
//!
//! 1. exit if the interaction is disabled,
//! 2. resolve targets,
//! 3. run the filter chain (a suppressed dispatch stops here),
//! 4. pick the delegate,
//! 5. call the handler,
//! 6. spend one unit of the fire budget, removing the interaction at zero.

use alloc::string::{String, ToString};
use alloc::vec::Vec;

use crate::error::DispatchError;
use crate::event::Event;
use crate::filter::{self, Resolution};
use crate::limiter::Verdict;
use crate::mutation::{self, MutationRecord};
use crate::options::{InteractionOptions, Invocation};
use crate::platform::{ListenerId, NodeOf, ObserverId, Platform, TimerId};
use crate::registry::{Binding, Interaction, InteractionKey, InternalId, Pending, Registry};
use crate::targets::ResolvedTargets;

impl<P: Platform> Registry<P> {
    /// Attach every anchor x event pair and register the interaction.
    pub(crate) fn bind(
        &mut self,
        platform: &mut P,
        iid: InternalId,
        mut options: InteractionOptions<P>,
    ) -> InteractionKey {
        let id = options.id.get_or_insert_with(|| iid.to_string()).clone();
        let listener_options = options.listener_options();
        let mutation_filter = self.config.mutation_filter;

        let mut bindings = Vec::with_capacity(options.anchors.len() * options.events.len());
        for anchor in &options.anchors {
            for spec in &options.events {
                let listener = ListenerId(self.next_handle());
                platform.subscribe(anchor, spec.name(), listener, listener_options);
                let observer = spec.category().is_mutation().then(|| {
                    let observer = ObserverId(self.next_handle());
                    platform.observe_mutations(anchor, observer, mutation_filter);
                    observer
                });
                tracing::debug!(id = %id, event = spec.name(), anchor = ?anchor, "bound");
                bindings.push(Binding {
                    anchor: anchor.clone(),
                    event: spec.clone(),
                    listener,
                    observer,
                    limiter: options.rate_limit.map(|r| r.limiter()),
                    pending: None,
                });
            }
        }

        let remaining = options.fire_count;
        let key = self.insert(|key| Interaction {
            key,
            iid,
            options,
            enabled: true,
            remaining,
            bindings: Vec::new(),
        });
        for (index, binding) in bindings.iter().enumerate() {
            self.listeners.insert(binding.listener, (key, index));
            if let Some(observer) = binding.observer {
                self.observers.insert(observer, (key, index));
            }
        }
        if let Some(ix) = self.get_mut(key) {
            ix.bindings = bindings;
        }
        tracing::debug!(id = %id, "interaction enabled");
        key
    }

    /// Remove an interaction, detaching every listener and observer and
    /// cancelling pending deferred calls.
    ///
    /// Returns `false` if `key` is stale.
    pub fn remove(&mut self, platform: &mut P, key: InteractionKey) -> bool {
        let Some(mut ix) = self.take(key) else {
            return false;
        };
        let listener_options = ix.options.listener_options();
        for binding in ix.bindings.drain(..) {
            platform.unsubscribe(
                &binding.anchor,
                binding.event.name(),
                binding.listener,
                listener_options,
            );
            self.listeners.remove(&binding.listener);
            if let Some(observer) = binding.observer {
                platform.disconnect(observer);
                self.observers.remove(&observer);
            }
            if let Some(pending) = binding.pending {
                platform.clear_timer(pending.timer);
                self.timers.remove(&pending.timer);
            }
        }
        tracing::debug!(id = ix.id(), "interaction removed");
        true
    }

    /// Deliver a platform event to the listener it was subscribed with.
    ///
    /// Unknown listeners (already removed) are ignored.
    pub fn handle_event(
        &mut self,
        platform: &mut P,
        listener: ListenerId,
        event: &Event<NodeOf<P>>,
    ) -> Result<(), DispatchError> {
        let Some(&(key, index)) = self.listeners.get(&listener) else {
            tracing::debug!(listener = listener.get(), "event for stale listener");
            return Ok(());
        };
        self.deliver(platform, key, index, event)
    }

    /// Run the deferred call parked on `timer`.
    ///
    /// Unknown or superseded timers are ignored.
    pub fn fire_timer(&mut self, platform: &mut P, timer: TimerId) -> Result<(), DispatchError> {
        let Some((key, index)) = self.timers.remove(&timer) else {
            tracing::debug!(timer = timer.get(), "stale timer");
            return Ok(());
        };
        let Some(binding) = self.binding_mut(key, index) else {
            return Ok(());
        };
        let pending = match binding.pending.take() {
            Some(pending) if pending.timer == timer => pending,
            other => {
                binding.pending = other;
                return Ok(());
            }
        };
        if let Some(limiter) = binding.limiter.as_mut() {
            limiter.on_deferred(pending.at);
        }
        self.run(platform, key, index, &pending.event)
    }

    /// Turn a batch of structural changes seen by `observer` into events.
    ///
    /// Returns the anchor to dispatch them on and one event per record, or
    /// `None` for an observer that has been disconnected.
    pub fn bridge_mutations(
        &self,
        observer: ObserverId,
        records: impl IntoIterator<Item = MutationRecord<NodeOf<P>>>,
    ) -> Option<(NodeOf<P>, Vec<Event<NodeOf<P>>>)> {
        let Some(&(key, index)) = self.observers.get(&observer) else {
            tracing::debug!(observer = observer.get(), "mutations for stale observer");
            return None;
        };
        let binding = self.get(key)?.bindings.get(index)?;
        let events = mutation::bridge(binding.event.name(), records);
        Some((binding.anchor.clone(), events))
    }

    /// Rate-limit, then run or park.
    pub(crate) fn deliver(
        &mut self,
        platform: &mut P,
        key: InteractionKey,
        index: usize,
        event: &Event<NodeOf<P>>,
    ) -> Result<(), DispatchError> {
        let now = platform.now();
        let (verdict, superseded) = {
            let Some(binding) = self.binding_mut(key, index) else {
                return Ok(());
            };
            let verdict = binding
                .limiter
                .as_mut()
                .map_or(Verdict::Fire, |limiter| limiter.should_fire_now(now));
            (verdict, binding.pending.take().map(|p| p.timer))
        };
        if let Some(timer) = superseded {
            platform.clear_timer(timer);
            self.timers.remove(&timer);
        }
        match verdict {
            Verdict::Fire => self.run(platform, key, index, event),
            Verdict::Defer { at } => {
                let timer = TimerId(self.next_handle());
                if let Some(binding) = self.binding_mut(key, index) {
                    binding.pending = Some(Pending {
                        timer,
                        at,
                        event: event.clone(),
                    });
                }
                self.timers.insert(timer, (key, index));
                platform.set_timer(timer, at.saturating_sub(now));
                Ok(())
            }
        }
    }

    /// Steps 1 to 6 of the delivery pipeline.
    fn run(
        &mut self,
        platform: &mut P,
        key: InteractionKey,
        index: usize,
        event: &Event<NodeOf<P>>,
    ) -> Result<(), DispatchError> {
        let Some(ix) = self.get(key) else {
            return Ok(());
        };
        if !ix.enabled {
            tracing::trace!(id = ix.id(), event = event.name(), "disabled, skipping");
            return Ok(());
        }
        let Some(binding) = ix.bindings.get(index) else {
            return Ok(());
        };

        let mut targets = ResolvedTargets::resolve(event);
        let (delegate, matched): (_, Option<String>) =
            match filter::resolve(&*platform, &ix.options.filters, event, &targets) {
                Resolution::Suppressed => {
                    tracing::trace!(id = ix.id(), event = event.name(), "no filter matched");
                    return Ok(());
                }
                Resolution::Unfiltered => (None, None),
                Resolution::Delegate { node, filter } => (Some(node), Some(filter.into())),
            };
        let anchor = binding.anchor.clone();
        targets.delegate_target = delegate
            .or_else(|| targets.current_target.clone())
            .or_else(|| Some(anchor.clone()));
        let handler = ix.options.handler_fn();

        if let Some(handler) = handler {
            let invocation = Invocation {
                event,
                targets: &targets,
                filter: matched.as_deref(),
                anchor: &anchor,
            };
            if let Err(source) = handler(platform, &invocation) {
                let id = self.get(key).map(|ix| ix.id().to_string()).unwrap_or_default();
                return Err(DispatchError::Handler { id, source });
            }
        }
        self.spend(platform, key);
        Ok(())
    }

    /// Spend one unit of the fire budget.
    fn spend(&mut self, platform: &mut P, key: InteractionKey) {
        let Some(ix) = self.get_mut(key) else {
            return;
        };
        let Some(remaining) = ix.remaining.as_mut() else {
            return;
        };
        *remaining = remaining.saturating_sub(1);
        if *remaining == 0 {
            tracing::debug!(id = ix.id(), "fire count exhausted");
            self.remove(platform, key);
        }
    }
}
