// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Interaction configuration record.

use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;
use core::str::FromStr;
use smallvec::SmallVec;

use crate::category::EventSpec;
use crate::error::HandlerResult;
use crate::event::Event;
use crate::filter::FilterBinding;
use crate::limiter::RateLimit;
use crate::platform::{ListenerOptions, NodeOf, Platform};
use crate::targets::ResolvedTargets;

/// A registered handler function.
///
/// Handlers get the platform mutably (they commonly touch the document) and
/// the [`Invocation`] describing the dispatch.
pub type HandlerFn<P> = Rc<dyn Fn(&mut P, &Invocation<'_, NodeOf<P>>) -> HandlerResult>;

/// Everything a handler learns about one invocation.
#[derive(Debug)]
pub struct Invocation<'a, N> {
    /// The event as delivered (or synthesized).
    pub event: &'a Event<N>,
    /// Resolved targets, with `delegate_target` filled in.
    pub targets: &'a ResolvedTargets<N>,
    /// Name of the filter that accepted the delegate, if any.
    pub filter: Option<&'a str>,
    /// The node the listener is bound to.
    pub anchor: &'a N,
}

impl<N> Invocation<'_, N> {
    /// The node the handler acts on: the delegate, else the anchor.
    pub fn this(&self) -> &N {
        self.targets.delegate_target.as_ref().unwrap_or(self.anchor)
    }
}

/// Configuration of one interaction.
///
/// Every field has a default (see [`OptionField`]); a fresh record is all defaults.
pub struct InteractionOptions<P: Platform> {
    pub(crate) id: Option<String>,
    pub(crate) name: Option<String>,
    pub(crate) events: SmallVec<[EventSpec; 2]>,
    pub(crate) namespace: Option<String>,
    pub(crate) anchors: Vec<NodeOf<P>>,
    pub(crate) filters: Vec<FilterBinding<P>>,
    pub(crate) fire_count: Option<u32>,
    pub(crate) capture: bool,
    pub(crate) passive: bool,
    pub(crate) rate_limit: Option<RateLimit>,
    pub(crate) handler: Option<(String, HandlerFn<P>)>,
}

impl<P: Platform> InteractionOptions<P> {
    /// Caller-chosen id, if set.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Display name.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Configured events, in order.
    pub fn events(&self) -> &[EventSpec] {
        &self.events
    }

    /// Namespace tag.
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Anchor nodes, in order.
    pub fn anchors(&self) -> &[NodeOf<P>] {
        &self.anchors
    }

    /// Delegation filters, in evaluation order.
    pub fn filters(&self) -> &[FilterBinding<P>] {
        &self.filters
    }

    /// Initial fire budget; `None` is unbounded.
    pub fn fire_count(&self) -> Option<u32> {
        self.fire_count
    }

    /// Capture-phase listener.
    pub fn capture(&self) -> bool {
        self.capture
    }

    /// Passive listener.
    pub fn passive(&self) -> bool {
        self.passive
    }

    /// Debounce or throttle, if configured.
    pub fn rate_limit(&self) -> Option<RateLimit> {
        self.rate_limit
    }

    /// Registered name of the handler; `None` means the no-op default.
    pub fn handler_name(&self) -> Option<&str> {
        self.handler.as_ref().map(|(name, _)| name.as_str())
    }

    pub(crate) fn handler_fn(&self) -> Option<HandlerFn<P>> {
        self.handler.as_ref().map(|(_, f)| Rc::clone(f))
    }

    /// Listener flags passed to the platform.
    pub fn listener_options(&self) -> ListenerOptions {
        ListenerOptions {
            capture: self.capture,
            passive: self.passive,
        }
    }

    /// Restore one field to its default.
    pub fn reset(&mut self, field: OptionField) {
        match field {
            OptionField::Id => self.id = None,
            OptionField::Name => self.name = None,
            OptionField::Events => self.events.clear(),
            OptionField::Namespace => self.namespace = None,
            OptionField::Anchors => self.anchors.clear(),
            OptionField::Filters => self.filters.clear(),
            OptionField::FireCount => self.fire_count = None,
            OptionField::Capture => self.capture = false,
            OptionField::Passive => self.passive = false,
            OptionField::Debounce => {
                if matches!(self.rate_limit, Some(RateLimit::Debounce { .. })) {
                    self.rate_limit = None;
                }
            }
            OptionField::Throttle => {
                if matches!(self.rate_limit, Some(RateLimit::Throttle { .. })) {
                    self.rate_limit = None;
                }
            }
            OptionField::Handler => self.handler = None,
        }
    }
}

impl<P: Platform> Default for InteractionOptions<P> {
    fn default() -> Self {
        Self {
            id: None,
            name: None,
            events: SmallVec::new(),
            namespace: None,
            anchors: Vec::new(),
            filters: Vec::new(),
            fire_count: None,
            capture: false,
            passive: false,
            rate_limit: None,
            handler: None,
        }
    }
}

impl<P: Platform> Clone for InteractionOptions<P> {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            name: self.name.clone(),
            events: self.events.clone(),
            namespace: self.namespace.clone(),
            anchors: self.anchors.clone(),
            filters: self.filters.clone(),
            fire_count: self.fire_count,
            capture: self.capture,
            passive: self.passive,
            rate_limit: self.rate_limit,
            handler: self
                .handler
                .as_ref()
                .map(|(name, f)| (name.clone(), Rc::clone(f))),
        }
    }
}

/// Functions compare by identity.
impl<P: Platform> PartialEq for InteractionOptions<P> {
    fn eq(&self, other: &Self) -> bool {
        let same_handler = match (&self.handler, &other.handler) {
            (None, None) => true,
            (Some((a, f)), Some((b, g))) => a == b && Rc::ptr_eq(f, g),
            _ => false,
        };
        same_handler
            && self.id == other.id
            && self.name == other.name
            && self.events == other.events
            && self.namespace == other.namespace
            && self.anchors == other.anchors
            && self.filters == other.filters
            && self.fire_count == other.fire_count
            && self.capture == other.capture
            && self.passive == other.passive
            && self.rate_limit == other.rate_limit
    }
}

impl<P: Platform> fmt::Debug for InteractionOptions<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InteractionOptions")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("events", &self.events)
            .field("namespace", &self.namespace)
            .field("anchors", &self.anchors)
            .field("filters", &self.filters)
            .field("fire_count", &self.fire_count)
            .field("capture", &self.capture)
            .field("passive", &self.passive)
            .field("rate_limit", &self.rate_limit)
            .field("handler", &self.handler_name())
            .finish()
    }
}

/// A configuration field, for [`reset`](crate::InteractionBuilder::reset).
///
/// | Field | Default |
/// |---|---|
/// | `Id` | unset (the internal id is used) |
/// | `Name` | unset |
/// | `Events`, `Anchors`, `Filters` | empty |
/// | `Namespace` | unset |
/// | `FireCount` | unbounded |
/// | `Capture`, `Passive` | `false` |
/// | `Debounce`, `Throttle` | off |
/// | `Handler` | no-op |
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum OptionField {
    /// Caller id.
    Id,
    /// Display name.
    Name,
    /// Event list.
    Events,
    /// Namespace.
    Namespace,
    /// Anchor list.
    Anchors,
    /// Filter list.
    Filters,
    /// Fire budget.
    FireCount,
    /// Capture flag.
    Capture,
    /// Passive flag.
    Passive,
    /// Debounce period.
    Debounce,
    /// Throttle interval.
    Throttle,
    /// Handler.
    Handler,
}

/// An unrecognized option field name.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("unknown interaction option `{0}`")]
pub struct UnknownOptionField(pub String);

impl FromStr for OptionField {
    type Err = UnknownOptionField;

    /// Accepts the camel-case option names (`fireCount`) and snake case (`fire_count`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "id" => Self::Id,
            "name" => Self::Name,
            "events" => Self::Events,
            "namespace" => Self::Namespace,
            "anchors" => Self::Anchors,
            "filters" => Self::Filters,
            "fireCount" | "fire_count" => Self::FireCount,
            "capture" => Self::Capture,
            "passive" => Self::Passive,
            "debounce" => Self::Debounce,
            "throttle" => Self::Throttle,
            "handler" => Self::Handler,
            other => return Err(UnknownOptionField(other.into())),
        })
    }
}
