// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Programmatic replay of a bound interaction.

use alloc::rc::Rc;
use core::fmt;

use crate::error::DispatchError;
use crate::event::{Event, EventInit, EventTargets, Payload};
use crate::platform::{NodeOf, Platform};
use crate::registry::Registry;

/// What a trigger carries into the synthetic event.
#[derive(Clone)]
pub struct TriggerOptions<N> {
    /// Targets overlaid on the resolved targets.
    pub targets: EventTargets<N>,
    /// Arbitrary payload, read back through [`Event::data`].
    pub data: Option<Payload>,
    /// Dispatch flags; [`RegistryConfig::trigger_init`](crate::RegistryConfig::trigger_init) when `None`.
    pub init: Option<EventInit>,
}

impl<N> Default for TriggerOptions<N> {
    fn default() -> Self {
        Self {
            targets: EventTargets::default(),
            data: None,
            init: None,
        }
    }
}

impl<N> TriggerOptions<N> {
    /// Override the primary target.
    #[must_use]
    pub fn with_target(mut self, target: N) -> Self {
        self.targets.target = Some(target);
        self
    }

    /// Override any targets.
    #[must_use]
    pub fn with_targets(mut self, targets: EventTargets<N>) -> Self {
        self.targets = targets;
        self
    }

    /// Attach a payload.
    #[must_use]
    pub fn with_data(mut self, data: Payload) -> Self {
        self.data = Some(data);
        self
    }

    /// Override the dispatch flags.
    #[must_use]
    pub fn with_init(mut self, init: EventInit) -> Self {
        self.init = Some(init);
        self
    }
}

impl<N: fmt::Debug> fmt::Debug for TriggerOptions<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TriggerOptions")
            .field("targets", &self.targets)
            .field("data", &self.data.is_some())
            .field("init", &self.init)
            .finish()
    }
}

impl<P: Platform> Registry<P> {
    /// Replay the interaction with caller id `id` without a platform event.
    ///
    /// One synthetic event is built per configured anchor x event pair and
    /// delivered through the interaction's first binding, rate limiter
    /// included. Replay stops early if the interaction expires. An unknown id
    /// is a no-op.
    ///
    /// ```
    /// use std::rc::Rc;
    /// use understory_interaction::headless::HeadlessHost;
    /// use understory_interaction::{Registry, TriggerOptions};
    ///
    /// let mut host = HeadlessHost::new();
    /// let root = host.root();
    /// let mut registry = Registry::new();
    /// registry.add_handler("greet", |_host: &mut HeadlessHost, inv| {
    ///     assert!(inv.event.is_synthetic());
    ///     assert_eq!(inv.event.data_as::<&str>(), Some(&"hi"));
    ///     Ok(())
    /// });
    /// registry
    ///     .interaction("")
    ///     .id("greeter")
    ///     .on([":greet"])
    ///     .anchors([root])
    ///     .handler("greet")
    ///     .enable(&mut host);
    ///
    /// let options = TriggerOptions::default().with_data(Rc::new("hi"));
    /// registry.trigger(&mut host, "greeter", options).unwrap();
    /// registry.trigger(&mut host, "nobody", TriggerOptions::default()).unwrap();
    /// ```
    pub fn trigger(
        &mut self,
        platform: &mut P,
        id: &str,
        options: TriggerOptions<NodeOf<P>>,
    ) -> Result<(), DispatchError> {
        let Some(ix) = self.by_id(id) else {
            tracing::debug!(id, "trigger: no such interaction");
            return Ok(());
        };
        if ix.bindings.is_empty() {
            return Ok(());
        }
        let key = ix.key();
        let anchors = ix.options.anchors.clone();
        let events = ix.options.events.clone();
        let init = options.init.unwrap_or(self.config.trigger_init);

        'replay: for anchor in &anchors {
            for spec in &events {
                if self.get(key).is_none() {
                    break 'replay;
                }
                let mut event = Event::from_spec(spec)
                    .with_init(init)
                    .with_current_target(anchor.clone())
                    .with_overrides(options.targets.clone())
                    .synthetic();
                if let Some(data) = &options.data {
                    event = event.with_data(Rc::clone(data));
                }
                self.deliver(platform, key, 0, &event)?;
            }
        }
        Ok(())
    }
}
