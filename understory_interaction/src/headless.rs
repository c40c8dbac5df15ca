// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! An in-memory [`Platform`]: node tree, listeners, mutation queue and a virtual clock.
//!
//! `HeadlessHost` is the reference host for tests and benchmarks. It keeps
//! a small document (tags, classes, attributes, text), routes events through
//! capture, target and bubble phases, queues structural changes per observer,
//! and runs timers against a clock that only moves when told to.
//!
//! ```
//! use std::cell::Cell;
//! use std::rc::Rc;
//! use understory_interaction::category::EventCategory;
//! use understory_interaction::event::Event;
//! use understory_interaction::headless::HeadlessHost;
//! use understory_interaction::Registry;
//!
//! let mut host = HeadlessHost::new();
//! let list = host.append(host.root(), "ul");
//! let item = host.append(list, "li");
//!
//! let clicks = Rc::new(Cell::new(0));
//! let seen = Rc::clone(&clicks);
//! let mut registry = Registry::new();
//! registry.add_handler("count", move |_host: &mut HeadlessHost, _| {
//!     seen.set(seen.get() + 1);
//!     Ok(())
//! });
//! registry
//!     .interaction("List clicks")
//!     .on(["click"])
//!     .anchors([list])
//!     .handler("count")
//!     .enable(&mut host);
//!
//! let click = Event::new("click", EventCategory::Pointer);
//! assert!(host.dispatch(&mut registry, item, click).unwrap());
//! assert_eq!(clicks.get(), 1);
//! ```

use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::fmt;
use smallvec::smallvec;

use crate::error::DispatchError;
use crate::event::Event;
use crate::mutation::{MutationFilter, MutationKind, MutationRecord};
use crate::platform::{ListenerId, ListenerOptions, ObserverId, Platform, TimerId};
use crate::registry::Registry;

/// A node of the headless document.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Clone, Debug, Default)]
struct NodeData {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    tag: String,
    classes: Vec<String>,
    attributes: Vec<(String, String)>,
    text: String,
}

#[derive(Clone, Debug)]
struct Listener {
    node: NodeId,
    event: String,
    id: ListenerId,
    options: ListenerOptions,
}

#[derive(Clone, Debug)]
struct Observer {
    node: NodeId,
    id: ObserverId,
    filter: MutationFilter,
    queue: Vec<MutationRecord<NodeId>>,
}

#[derive(Copy, Clone, Debug)]
struct Timer {
    id: TimerId,
    due: u64,
    seq: u64,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Phase {
    Capture,
    Target,
    Bubble,
}

/// In-memory host.
#[derive(Clone, Debug)]
pub struct HeadlessHost {
    nodes: Vec<NodeData>,
    listeners: Vec<Listener>,
    observers: Vec<Observer>,
    timers: Vec<Timer>,
    now: u64,
    seq: u64,
}

impl Default for HeadlessHost {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessHost {
    /// A document with only a root node (tag `#document`).
    pub fn new() -> Self {
        Self {
            nodes: alloc::vec![NodeData {
                tag: "#document".to_string(),
                ..NodeData::default()
            }],
            listeners: Vec::new(),
            observers: Vec::new(),
            timers: Vec::new(),
            now: 0,
            seq: 0,
        }
    }

    /// The document root.
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    fn node(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.0 as usize]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut NodeData {
        &mut self.nodes[id.0 as usize]
    }

    // --- Document -------------------------------------------------------------

    /// Append a new element under `parent`.
    pub fn append(&mut self, parent: NodeId, tag: &str) -> NodeId {
        #[expect(clippy::cast_possible_truncation, reason = "test documents stay small")]
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(NodeData {
            parent: Some(parent),
            tag: tag.to_string(),
            ..NodeData::default()
        });
        self.node_mut(parent).children.push(id);
        let mut record = MutationRecord::new(MutationKind::ChildList, parent);
        record.added = smallvec![id];
        self.record(record);
        id
    }

    /// Parent of `node`.
    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.node(node).parent
    }

    /// Children of `node`, in insertion order.
    pub fn children(&self, node: NodeId) -> &[NodeId] {
        &self.node(node).children
    }

    /// Tag name of `node`.
    pub fn tag(&self, node: NodeId) -> &str {
        &self.node(node).tag
    }

    /// `node` and its ancestors, nearest first.
    pub fn ancestors(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        core::iter::successors(Some(node), |&n| self.parent(n))
    }

    /// Add a class to `node`. Records an attribute change on `class`.
    pub fn add_class(&mut self, node: NodeId, class: &str) {
        if self.has_class(node, class) {
            return;
        }
        let old = self.node(node).classes.join(" ");
        self.node_mut(node).classes.push(class.to_string());
        self.record_attribute(node, "class", old);
    }

    /// Returns `true` if `node` carries `class`.
    pub fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.node(node).classes.iter().any(|c| c == class)
    }

    /// Nearest inclusive ancestor of `node` carrying `class`.
    pub fn closest_with_class(&self, node: NodeId, class: &str) -> Option<NodeId> {
        self.ancestors(node).find(|&n| self.has_class(n, class))
    }

    /// Nearest inclusive ancestor of `node` with tag `tag`.
    pub fn closest_with_tag(&self, node: NodeId, tag: &str) -> Option<NodeId> {
        self.ancestors(node).find(|&n| self.tag(n) == tag)
    }

    /// Set an attribute. Records an attribute change.
    pub fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) {
        let attributes = &mut self.node_mut(node).attributes;
        let old = match attributes.iter_mut().find(|(k, _)| k == name) {
            Some((_, v)) => core::mem::replace(v, value.to_string()),
            None => {
                attributes.push((name.to_string(), value.to_string()));
                String::new()
            }
        };
        self.record_attribute(node, name, old);
    }

    /// An attribute value.
    pub fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        self.node(node)
            .attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Replace the text of `node`. Records a character-data change.
    pub fn set_text(&mut self, node: NodeId, text: &str) {
        let old = core::mem::replace(&mut self.node_mut(node).text, text.to_string());
        let mut record = MutationRecord::new(MutationKind::CharacterData, node);
        record.old_value = Some(old);
        self.record(record);
    }

    /// Text of `node`.
    pub fn text(&self, node: NodeId) -> &str {
        &self.node(node).text
    }

    fn is_inclusive_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        self.ancestors(node).any(|n| n == ancestor)
    }

    fn record_attribute(&mut self, node: NodeId, name: &str, old: String) {
        let mut record = MutationRecord::new(MutationKind::Attributes, node);
        record.attribute_name = Some(name.to_string());
        record.old_value = Some(old);
        self.record(record);
    }

    /// Queue `record` on every observer that reports it.
    fn record(&mut self, record: MutationRecord<NodeId>) {
        let watching: Vec<usize> = self
            .observers
            .iter()
            .enumerate()
            .filter(|(_, o)| {
                o.filter.reports(record.kind)
                    && (o.node == record.target
                        || (o.filter.contains(MutationFilter::SUBTREE)
                            && self.is_inclusive_ancestor(o.node, record.target)))
            })
            .map(|(i, _)| i)
            .collect();
        for i in watching {
            let observer = &mut self.observers[i];
            let mut record = record.clone();
            let keep_old = match record.kind {
                MutationKind::Attributes => MutationFilter::ATTRIBUTE_OLD_VALUE,
                MutationKind::CharacterData => MutationFilter::CHARACTER_DATA_OLD_VALUE,
                MutationKind::ChildList => MutationFilter::empty(),
            };
            if !observer.filter.contains(keep_old) || keep_old.is_empty() {
                record.old_value = None;
            }
            observer.queue.push(record);
        }
    }

    // --- Listeners and dispatch -----------------------------------------------

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Number of active mutation observers.
    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    fn listeners_at(&self, node: NodeId, event: &str, phase: Phase) -> Vec<ListenerId> {
        self.listeners
            .iter()
            .filter(|l| l.node == node && l.event == event)
            .filter(|l| match phase {
                Phase::Capture => l.options.capture,
                Phase::Target => true,
                Phase::Bubble => !l.options.capture,
            })
            .map(|l| l.id)
            .collect()
    }

    fn is_registered(&self, id: ListenerId) -> bool {
        self.listeners.iter().any(|l| l.id == id)
    }

    /// Dispatch `event` at `target`.
    ///
    /// Listeners run capture (root to target), target (registration order),
    /// then bubble (target to root) if the event bubbles. Listeners removed
    /// during the dispatch are skipped. Returns `Ok(false)` if a handler
    /// prevented the default action.
    pub fn dispatch(
        &mut self,
        registry: &mut Registry<Self>,
        target: NodeId,
        mut event: Event<NodeId>,
    ) -> Result<bool, DispatchError> {
        let path: Vec<NodeId> = self.ancestors(target).collect();
        let mut seq: Vec<(Phase, NodeId)> = Vec::with_capacity(path.len() * 2);
        seq.extend(path.iter().skip(1).rev().map(|&n| (Phase::Capture, n)));
        seq.push((Phase::Target, target));
        if event.init().bubbles {
            seq.extend(path.iter().skip(1).map(|&n| (Phase::Bubble, n)));
        }

        event.targets_mut().target = Some(target);
        for (phase, node) in seq {
            let listeners = self.listeners_at(node, event.name(), phase);
            event.targets_mut().current_target = Some(node);
            for listener in listeners {
                if self.is_registered(listener) {
                    registry.handle_event(self, listener, &event)?;
                }
            }
        }
        Ok(!event.default_prevented())
    }

    /// Deliver queued structural changes, one batch per observer, and
    /// dispatch the bridged events on each observer's anchor.
    ///
    /// Returns the number of events dispatched.
    pub fn flush_mutations(&mut self, registry: &mut Registry<Self>) -> Result<usize, DispatchError> {
        let batches: Vec<(ObserverId, Vec<MutationRecord<NodeId>>)> = self
            .observers
            .iter_mut()
            .filter(|o| !o.queue.is_empty())
            .map(|o| (o.id, core::mem::take(&mut o.queue)))
            .collect();
        let mut dispatched = 0;
        for (observer, records) in batches {
            let Some((anchor, events)) = registry.bridge_mutations(observer, records) else {
                continue;
            };
            for event in events {
                self.dispatch(registry, anchor, event)?;
                dispatched += 1;
            }
        }
        Ok(dispatched)
    }

    // --- Clock ----------------------------------------------------------------

    /// Number of scheduled timers.
    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    /// Move the clock forward by `ms`, firing due timers in order.
    pub fn advance(&mut self, registry: &mut Registry<Self>, ms: u64) -> Result<(), DispatchError> {
        let until = self.now.saturating_add(ms);
        while let Some(pos) = self
            .timers
            .iter()
            .enumerate()
            .filter(|(_, t)| t.due <= until)
            .min_by_key(|(_, t)| (t.due, t.seq))
            .map(|(i, _)| i)
        {
            let timer = self.timers.swap_remove(pos);
            self.now = self.now.max(timer.due);
            registry.fire_timer(self, timer.id)?;
        }
        self.now = until;
        Ok(())
    }
}

impl Platform for HeadlessHost {
    type Node = NodeId;

    fn subscribe(&mut self, anchor: &NodeId, event: &str, listener: ListenerId, options: ListenerOptions) {
        self.listeners.push(Listener {
            node: *anchor,
            event: event.to_string(),
            id: listener,
            options,
        });
    }

    fn unsubscribe(
        &mut self,
        anchor: &NodeId,
        event: &str,
        listener: ListenerId,
        options: ListenerOptions,
    ) {
        self.listeners.retain(|l| {
            !(l.id == listener
                && l.node == *anchor
                && l.event == event
                && l.options.capture == options.capture)
        });
    }

    fn observe_mutations(&mut self, anchor: &NodeId, observer: ObserverId, filter: MutationFilter) {
        self.observers.push(Observer {
            node: *anchor,
            id: observer,
            filter,
            queue: Vec::new(),
        });
    }

    fn disconnect(&mut self, observer: ObserverId) {
        self.observers.retain(|o| o.id != observer);
    }

    fn contains(&self, ancestor: &NodeId, node: &NodeId) -> bool {
        self.is_inclusive_ancestor(*ancestor, *node)
    }

    fn now(&self) -> u64 {
        self.now
    }

    fn set_timer(&mut self, timer: TimerId, delay: u64) {
        self.seq += 1;
        self.timers.push(Timer {
            id: timer,
            due: self.now.saturating_add(delay),
            seq: self.seq,
        });
    }

    fn clear_timer(&mut self, timer: TimerId) {
        self.timers.retain(|t| t.id != timer);
    }
}
