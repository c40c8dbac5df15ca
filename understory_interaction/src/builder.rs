// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Typed, fluent configuration of an interaction before it is bound.

use alloc::rc::Rc;
use alloc::string::ToString;
use core::fmt;

use crate::category::EventSpec;
use crate::filter::{FilterBinding, parse_filter_spec};
use crate::limiter::RateLimit;
use crate::options::{InteractionOptions, OptionField};
use crate::platform::{NodeOf, Platform};
use crate::registry::{InteractionKey, InternalId, Lifecycle, Registry};

/// An interaction being configured.
///
/// Obtained from [`Registry::interaction`] or [`Registry::interaction_from`].
/// Setters take and return the builder by value. List setters append, so
/// chained calls accumulate; [`reset`](Self::reset) clears a list. Invalid
/// values (empty strings, unknown filter or handler names) leave the
/// configuration unchanged.
///
/// [`enable`](Self::enable) consumes the builder, so configuration cannot
/// change once bound.
#[must_use = "an interaction does nothing until it is enabled"]
pub struct InteractionBuilder<'r, P: Platform> {
    registry: &'r mut Registry<P>,
    iid: InternalId,
    options: InteractionOptions<P>,
}

impl<'r, P: Platform> InteractionBuilder<'r, P> {
    pub(crate) fn new(
        registry: &'r mut Registry<P>,
        iid: InternalId,
        options: InteractionOptions<P>,
    ) -> Self {
        Self {
            registry,
            iid,
            options,
        }
    }

    /// Internal id assigned at construction.
    pub fn iid(&self) -> InternalId {
        self.iid
    }

    /// The configuration so far.
    pub fn options(&self) -> &InteractionOptions<P> {
        &self.options
    }

    /// Always [`Lifecycle::Uncreated`].
    pub fn state(&self) -> Lifecycle {
        Lifecycle::Uncreated
    }

    /// Set the caller id used by [`Registry::by_id`] and [`Registry::trigger`].
    pub fn id(mut self, id: &str) -> Self {
        if id.is_empty() {
            tracing::trace!(iid = %self.iid, "ignoring empty id");
        } else {
            self.options.id = Some(id.to_string());
        }
        self
    }

    /// Append to the event list.
    ///
    /// Names are trimmed and lower-cased; blank names are skipped.
    pub fn on<I, S>(mut self, events: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for raw in events {
            let raw = raw.as_ref();
            match EventSpec::parse(raw, &self.registry.config.user_agent) {
                Some(spec) => self.options.events.push(spec),
                None => tracing::trace!(iid = %self.iid, event = raw, "ignoring blank event name"),
            }
        }
        self
    }

    /// Set the namespace tag.
    pub fn namespace(mut self, namespace: &str) -> Self {
        if namespace.is_empty() {
            tracing::trace!(iid = %self.iid, "ignoring empty namespace");
        } else {
            self.options.namespace = Some(namespace.to_string());
        }
        self
    }

    /// Append to the anchor list.
    pub fn anchors(mut self, anchors: impl IntoIterator<Item = NodeOf<P>>) -> Self {
        self.options.anchors.extend(anchors);
        self
    }

    /// Append to the filter list.
    ///
    /// Each entry is `name` or `name@tiebreak`. Entries naming an unregistered
    /// filter or an unknown tie-break are dropped.
    pub fn filters<I, S>(mut self, specs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for spec in specs {
            let spec = spec.as_ref();
            let Some((name, tie_break)) = parse_filter_spec(spec) else {
                tracing::trace!(iid = %self.iid, filter = spec, "ignoring malformed filter");
                continue;
            };
            match self.registry.filter(name) {
                Some(f) => self
                    .options
                    .filters
                    .push(FilterBinding::new(name, tie_break, Rc::clone(f))),
                None => tracing::trace!(iid = %self.iid, filter = name, "ignoring unknown filter"),
            }
        }
        self
    }

    /// Remove the interaction after `count` successful invocations.
    ///
    /// A count of 0 behaves like 1: the first invocation exhausts it.
    pub fn fire_count(mut self, count: u32) -> Self {
        self.options.fire_count = Some(count);
        self
    }

    /// Listen during the capture phase.
    pub fn capture(mut self, capture: bool) -> Self {
        self.options.capture = capture;
        self
    }

    /// Register passive listeners.
    pub fn passive(mut self, passive: bool) -> Self {
        self.options.passive = passive;
        self
    }

    /// Debounce the handler by `wait` milliseconds. Replaces any throttle.
    ///
    /// A zero wait clears both limits.
    pub fn debounce(mut self, wait: u64) -> Self {
        self.options.rate_limit = (wait > 0).then_some(RateLimit::Debounce { wait });
        self
    }

    /// Throttle the handler to once per `interval` milliseconds. Replaces any debounce.
    ///
    /// A zero interval clears both limits.
    pub fn throttle(mut self, interval: u64) -> Self {
        self.options.rate_limit = (interval > 0).then_some(RateLimit::Throttle { interval });
        self
    }

    /// Use the registered handler `name`.
    pub fn handler(mut self, name: &str) -> Self {
        match self.registry.handler(name) {
            Some(f) => self.options.handler = Some((name.to_string(), Rc::clone(f))),
            None => tracing::trace!(iid = %self.iid, handler = name, "ignoring unknown handler"),
        }
        self
    }

    /// Restore `fields` to their defaults.
    pub fn reset(mut self, fields: impl IntoIterator<Item = OptionField>) -> Self {
        for field in fields {
            self.options.reset(field);
        }
        self
    }

    /// Discard the interaction. Nothing was bound, so nothing is detached.
    pub fn remove(self) {
        tracing::debug!(iid = %self.iid, "unbound interaction discarded");
    }

    /// Bind every anchor x event pair and start delivering.
    ///
    /// An interaction with no anchors or no events is still registered; it
    /// simply never fires.
    pub fn enable(self, platform: &mut P) -> InteractionKey {
        let Self {
            registry,
            iid,
            options,
        } = self;
        registry.bind(platform, iid, options)
    }
}

impl<P: Platform> fmt::Debug for InteractionBuilder<'_, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InteractionBuilder")
            .field("iid", &self.iid)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
