// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The engine instance: named filters and handlers plus the live interactions.

use alloc::rc::Rc;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::fmt;
use hashbrown::HashMap;

use crate::builder::InteractionBuilder;
use crate::category::EventSpec;
use crate::error::HandlerResult;
use crate::event::{Event, EventInit};
use crate::filter::FilterFn;
use crate::limiter::RateLimiter;
use crate::mutation::MutationFilter;
use crate::options::{HandlerFn, InteractionOptions, Invocation};
use crate::platform::{ListenerId, NodeOf, ObserverId, Platform, TimerId};
use crate::targets::ResolvedTargets;

/// Per-instance engine configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegistryConfig {
    /// Environment signature used for legacy event-name rewrites.
    pub user_agent: String,
    /// Dispatch flags of synthetic trigger events, unless a trigger overrides them.
    pub trigger_init: EventInit,
    /// Structural changes reported to `mutation` interactions.
    pub mutation_filter: MutationFilter,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            user_agent: String::new(),
            trigger_init: EventInit::default(),
            mutation_filter: MutationFilter::default(),
        }
    }
}

impl RegistryConfig {
    /// Set the environment signature.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set the default trigger flags.
    #[must_use]
    pub fn with_trigger_init(mut self, init: EventInit) -> Self {
        self.trigger_init = init;
        self
    }

    /// Set which structural changes the mutation bridge observes.
    #[must_use]
    pub fn with_mutation_filter(mut self, filter: MutationFilter) -> Self {
        self.mutation_filter = filter;
        self
    }
}

/// Engine-assigned identity of an interaction, fixed at construction.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InternalId(u64);

impl fmt::Display for InternalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "interaction-{}", self.0)
    }
}

/// Handle to a bound interaction.
///
/// A slot index plus a generation, in the manner of a box-tree `NodeId`:
/// once the interaction is removed the key goes stale and never aliases a
/// later interaction reusing the slot.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct InteractionKey(u32, u32);

impl InteractionKey {
    const fn idx(self) -> usize {
        self.0 as usize
    }
}

/// Where an interaction is in its life.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Lifecycle {
    /// Still being configured; nothing is bound.
    Uncreated,
    /// Bound and running.
    Enabled,
    /// Bound; deliveries exit before doing any work.
    Disabled,
    /// Unbound for good.
    Removed,
}

/// A deferred call waiting on a rate-limit timer.
#[derive(Debug)]
pub(crate) struct Pending<N> {
    pub(crate) timer: TimerId,
    pub(crate) at: u64,
    pub(crate) event: Event<N>,
}

/// One (anchor, event) pair attached to the platform.
#[derive(Debug)]
pub(crate) struct Binding<N> {
    pub(crate) anchor: N,
    pub(crate) event: EventSpec,
    pub(crate) listener: ListenerId,
    pub(crate) observer: Option<ObserverId>,
    pub(crate) limiter: Option<RateLimiter>,
    pub(crate) pending: Option<Pending<N>>,
}

/// A bound interaction.
pub struct Interaction<P: Platform> {
    pub(crate) key: InteractionKey,
    pub(crate) iid: InternalId,
    pub(crate) options: InteractionOptions<P>,
    pub(crate) enabled: bool,
    pub(crate) remaining: Option<u32>,
    pub(crate) bindings: Vec<Binding<NodeOf<P>>>,
}

impl<P: Platform> Interaction<P> {
    /// Registry handle.
    pub fn key(&self) -> InteractionKey {
        self.key
    }

    /// Internal id.
    pub fn iid(&self) -> InternalId {
        self.iid
    }

    /// Effective caller id (the internal id unless one was configured).
    pub fn id(&self) -> &str {
        self.options.id().unwrap_or_default()
    }

    /// Display name.
    pub fn name(&self) -> Option<&str> {
        self.options.name()
    }

    /// The configuration it was bound with. Read-only from here on.
    pub fn options(&self) -> &InteractionOptions<P> {
        &self.options
    }

    /// Returns `true` unless disabled.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Remaining fire budget; `None` is unbounded.
    pub fn remaining(&self) -> Option<u32> {
        self.remaining
    }

    /// [`Lifecycle::Enabled`] or [`Lifecycle::Disabled`].
    pub fn lifecycle(&self) -> Lifecycle {
        if self.enabled {
            Lifecycle::Enabled
        } else {
            Lifecycle::Disabled
        }
    }

    /// Number of (anchor, event) pairs attached.
    pub fn binding_count(&self) -> usize {
        self.bindings.len()
    }
}

impl<P: Platform> fmt::Debug for Interaction<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interaction")
            .field("key", &self.key)
            .field("iid", &self.iid)
            .field("options", &self.options)
            .field("enabled", &self.enabled)
            .field("remaining", &self.remaining)
            .field("bindings", &self.bindings)
            .finish()
    }
}

struct Slot<P: Platform> {
    generation: u32,
    interaction: Option<Interaction<P>>,
}

/// An engine instance.
///
/// Owns the named filters and handlers, the live interactions (in insertion
/// order), and the tables mapping platform identities back to bindings.
/// Independent registries never share state, and each drives its own host.
///
/// ```
/// use understory_interaction::headless::HeadlessHost;
/// use understory_interaction::{Lifecycle, Registry};
///
/// let mut host = HeadlessHost::new();
/// let root = host.root();
/// let mut registry: Registry<HeadlessHost> = Registry::new();
/// registry.add_handler("noop", |_, _| Ok(()));
///
/// let key = registry
///     .interaction("Resize")
///     .id("resize")
///     .on(["resize"])
///     .anchors([root])
///     .handler("noop")
///     .enable(&mut host);
///
/// assert_eq!(registry.state(key), Lifecycle::Enabled);
/// assert_eq!(registry.key_by_id("resize"), Some(key));
/// assert!(registry.remove_by_id(&mut host, "resize"));
/// assert_eq!(registry.state(key), Lifecycle::Removed);
/// ```
pub struct Registry<P: Platform> {
    pub(crate) config: RegistryConfig,
    filters: HashMap<String, FilterFn<P>>,
    handlers: HashMap<String, HandlerFn<P>>,
    slots: Vec<Slot<P>>,
    free: Vec<u32>,
    order: Vec<InteractionKey>,
    pub(crate) listeners: HashMap<ListenerId, (InteractionKey, usize)>,
    pub(crate) observers: HashMap<ObserverId, (InteractionKey, usize)>,
    pub(crate) timers: HashMap<TimerId, (InteractionKey, usize)>,
    next_handle: u64,
    next_iid: u64,
}

impl<P: Platform> Default for Registry<P> {
    fn default() -> Self {
        Self::with_config(RegistryConfig::default())
    }
}

impl<P: Platform> Registry<P> {
    /// Create an empty registry with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty registry.
    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            config,
            filters: HashMap::new(),
            handlers: HashMap::new(),
            slots: Vec::new(),
            free: Vec::new(),
            order: Vec::new(),
            listeners: HashMap::new(),
            observers: HashMap::new(),
            timers: HashMap::new(),
            next_handle: 0,
            next_iid: 0,
        }
    }

    /// The configuration.
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    // --- Filters and handlers -------------------------------------------------

    /// Register (or replace) a named delegation filter.
    pub fn add_filter(
        &mut self,
        name: impl Into<String>,
        filter: impl Fn(&P, &Event<NodeOf<P>>, &ResolvedTargets<NodeOf<P>>) -> Option<NodeOf<P>>
        + 'static,
    ) {
        self.filters.insert(name.into(), Rc::new(filter));
    }

    /// Unregister a filter. Interactions already configured with it keep it.
    pub fn remove_filter(&mut self, name: &str) -> bool {
        self.filters.remove(name).is_some()
    }

    /// Look up a filter by name.
    pub fn filter(&self, name: &str) -> Option<&FilterFn<P>> {
        self.filters.get(name)
    }

    /// Names of all registered filters, in no particular order.
    pub fn filter_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.filters.keys().map(String::as_str)
    }

    /// Register (or replace) a named handler.
    pub fn add_handler(
        &mut self,
        name: impl Into<String>,
        handler: impl Fn(&mut P, &Invocation<'_, NodeOf<P>>) -> HandlerResult + 'static,
    ) {
        self.handlers.insert(name.into(), Rc::new(handler));
    }

    /// Unregister a handler. Interactions already configured with it keep it.
    pub fn remove_handler(&mut self, name: &str) -> bool {
        self.handlers.remove(name).is_some()
    }

    /// Look up a handler by name.
    pub fn handler(&self, name: &str) -> Option<&HandlerFn<P>> {
        self.handlers.get(name)
    }

    /// Names of all registered handlers, in no particular order.
    pub fn handler_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.handlers.keys().map(String::as_str)
    }

    // --- Construction ---------------------------------------------------------

    /// Start configuring a new interaction. An empty `name` leaves it unnamed.
    pub fn interaction(&mut self, name: &str) -> InteractionBuilder<'_, P> {
        let iid = self.next_internal_id();
        let mut options = InteractionOptions::default();
        if !name.is_empty() {
            options.name = Some(name.to_string());
        }
        InteractionBuilder::new(self, iid, options)
    }

    /// Start configuring a new interaction from a copy of `source_id`'s configuration.
    ///
    /// The copy excludes the caller id. An unknown `source_id` yields an empty
    /// configuration.
    pub fn interaction_from(&mut self, name: &str, source_id: &str) -> InteractionBuilder<'_, P> {
        let iid = self.next_internal_id();
        let mut options = match self.by_id(source_id) {
            Some(source) => source.options.clone(),
            None => {
                tracing::trace!(source = source_id, "clone source not found");
                InteractionOptions::default()
            }
        };
        options.id = None;
        if !name.is_empty() {
            options.name = Some(name.to_string());
        }
        InteractionBuilder::new(self, iid, options)
    }

    fn next_internal_id(&mut self) -> InternalId {
        self.next_iid += 1;
        InternalId(self.next_iid)
    }

    pub(crate) fn next_handle(&mut self) -> u64 {
        self.next_handle += 1;
        self.next_handle
    }

    // --- Introspection --------------------------------------------------------

    /// Number of live interactions.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns `true` if no interaction is live.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Keys of live interactions, in the order they were bound.
    pub fn keys(&self) -> impl Iterator<Item = InteractionKey> + '_ {
        self.order.iter().copied()
    }

    /// Live interactions, in the order they were bound.
    pub fn interactions(&self) -> impl Iterator<Item = &Interaction<P>> + '_ {
        self.order.iter().filter_map(|&key| self.get(key))
    }

    /// Live interactions bound to `anchor`.
    pub fn interactions_for_anchor(&self, anchor: &NodeOf<P>) -> Vec<InteractionKey> {
        self.interactions()
            .filter(|ix| ix.options.anchors.contains(anchor))
            .map(Interaction::key)
            .collect()
    }

    /// Live interactions tagged with `namespace`.
    pub fn interactions_in_namespace(&self, namespace: &str) -> Vec<InteractionKey> {
        self.interactions()
            .filter(|ix| ix.options.namespace() == Some(namespace))
            .map(Interaction::key)
            .collect()
    }

    /// The live interaction behind `key`.
    pub fn get(&self, key: InteractionKey) -> Option<&Interaction<P>> {
        self.slots
            .get(key.idx())
            .filter(|slot| slot.generation == key.1)
            .and_then(|slot| slot.interaction.as_ref())
    }

    pub(crate) fn get_mut(&mut self, key: InteractionKey) -> Option<&mut Interaction<P>> {
        self.slots
            .get_mut(key.idx())
            .filter(|slot| slot.generation == key.1)
            .and_then(|slot| slot.interaction.as_mut())
    }

    pub(crate) fn binding_mut(
        &mut self,
        key: InteractionKey,
        index: usize,
    ) -> Option<&mut Binding<NodeOf<P>>> {
        self.get_mut(key).and_then(|ix| ix.bindings.get_mut(index))
    }

    /// The first live interaction whose caller id is `id`.
    pub fn by_id(&self, id: &str) -> Option<&Interaction<P>> {
        if id.is_empty() {
            return None;
        }
        self.interactions().find(|ix| ix.id() == id)
    }

    /// Key of the first live interaction whose caller id is `id`.
    pub fn key_by_id(&self, id: &str) -> Option<InteractionKey> {
        self.by_id(id).map(Interaction::key)
    }

    /// Lifecycle state behind `key`. Stale keys report [`Lifecycle::Removed`].
    pub fn state(&self, key: InteractionKey) -> Lifecycle {
        self.get(key).map_or(Lifecycle::Removed, Interaction::lifecycle)
    }

    // --- Arena ----------------------------------------------------------------

    /// Reserve a slot for a new interaction and record it as live.
    pub(crate) fn insert(
        &mut self,
        build: impl FnOnce(InteractionKey) -> Interaction<P>,
    ) -> InteractionKey {
        let key = if let Some(idx) = self.free.pop() {
            let slot = &mut self.slots[idx as usize];
            slot.generation += 1;
            InteractionKey(idx, slot.generation)
        } else {
            #[expect(clippy::cast_possible_truncation, reason = "u32 slots are ample")]
            let idx = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 1,
                interaction: None,
            });
            InteractionKey(idx, 1)
        };
        self.slots[key.idx()].interaction = Some(build(key));
        self.order.push(key);
        key
    }

    /// Free the slot behind `key` and drop it from the live list.
    pub(crate) fn take(&mut self, key: InteractionKey) -> Option<Interaction<P>> {
        let slot = self
            .slots
            .get_mut(key.idx())
            .filter(|slot| slot.generation == key.1)?;
        let interaction = slot.interaction.take()?;
        self.free.push(key.0);
        self.order.retain(|&k| k != key);
        Some(interaction)
    }

    // --- Control --------------------------------------------------------------

    /// Re-enable a bound interaction. Never re-binds.
    pub fn enable(&mut self, key: InteractionKey) -> bool {
        let Some(ix) = self.get_mut(key) else {
            return false;
        };
        ix.enabled = true;
        tracing::debug!(id = ix.id(), "interaction enabled");
        true
    }

    /// Disable a bound interaction; bindings stay attached.
    pub fn disable(&mut self, key: InteractionKey) -> bool {
        let Some(ix) = self.get_mut(key) else {
            return false;
        };
        ix.enabled = false;
        tracing::debug!(id = ix.id(), "interaction disabled");
        true
    }

    /// Enable every live interaction.
    pub fn enable_all(&mut self) {
        let keys: Vec<_> = self.keys().collect();
        for key in keys {
            self.enable(key);
        }
    }

    /// Disable every live interaction.
    pub fn disable_all(&mut self) {
        let keys: Vec<_> = self.keys().collect();
        for key in keys {
            self.disable(key);
        }
    }

    /// Remove the first live interaction with caller id `id`.
    pub fn remove_by_id(&mut self, platform: &mut P, id: &str) -> bool {
        match self.key_by_id(id) {
            Some(key) => self.remove(platform, key),
            None => {
                tracing::trace!(id, "remove: no such interaction");
                false
            }
        }
    }

    /// Remove every live interaction, newest first.
    pub fn remove_all(&mut self, platform: &mut P) {
        let keys: Vec<_> = self.keys().collect();
        for key in keys.into_iter().rev() {
            self.remove(platform, key);
        }
    }
}

impl<P: Platform> fmt::Debug for Registry<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("config", &self.config)
            .field("filters", &self.filters.len())
            .field("handlers", &self.handlers.len())
            .field("live", &self.order)
            .field("listeners", &self.listeners.len())
            .field("observers", &self.observers.len())
            .field("timers", &self.timers.len())
            .finish_non_exhaustive()
    }
}
