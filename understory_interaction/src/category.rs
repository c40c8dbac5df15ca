// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Event categories: which event "family" a name belongs to.
//!
//! A category is resolved once, when an interaction's event list is configured,
//! and then travels with the bound event. It decides two things:
//!
//! - whether binding attaches a [mutation bridge](crate::mutation) (the
//!   [`Library`](EventCategory::Library) category), and
//! - which kind of event a [synthetic trigger](crate::Registry::trigger) constructs.
//!
//! ## Classification
//!
//! - A leading `:` marks a user-defined event: always [`Custom`](EventCategory::Custom).
//! - Otherwise the lower-cased name is looked up in the known UI, pointer and
//!   library-defined sets, falling back to [`Generic`](EventCategory::Generic).
//!
//! ```
//! use understory_interaction::category::{EventCategory, EventSpec};
//!
//! assert_eq!(EventCategory::classify("click"), EventCategory::Pointer);
//! assert_eq!(EventCategory::classify("resize"), EventCategory::Ui);
//! assert_eq!(EventCategory::classify(":build"), EventCategory::Custom);
//! assert_eq!(EventCategory::classify("keydown"), EventCategory::Generic);
//!
//! // Gecko still only delivers the legacy wheel event name.
//! let spec = EventSpec::parse("mousewheel", "Mozilla/5.0 (X11; Linux x86_64; rv:109.0) Firefox/115.0").unwrap();
//! assert_eq!(spec.name(), "dommousescroll");
//! ```

use alloc::string::String;
use core::fmt;

/// Event names delivered with a plain UI event object.
const UI_EVENTS: &[&str] = &[
    "abort", "error", "load", "resize", "scroll", "select", "unload",
];

/// Event names delivered with a pointer (mouse) event object.
const POINTER_EVENTS: &[&str] = &[
    "click",
    "contextmenu",
    "dblclick",
    "mousedown",
    "mouseenter",
    "mouseleave",
    "mousemove",
    "mouseout",
    "mouseover",
    "mouseup",
    "show",
];

/// Events provided by this crate rather than the platform.
const LIBRARY_EVENTS: &[&str] = &["mutation"];

/// Wheel event name that Gecko only understands under its legacy alias.
const WHEEL_EVENT: &str = "mousewheel";
/// Legacy Gecko alias for [`WHEEL_EVENT`], before lower-casing.
const GECKO_WHEEL_EVENT: &str = "DOMMouseScroll";

/// The event object family an event name maps to.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
pub enum EventCategory {
    /// Document/window level UI events (`resize`, `scroll`, ...).
    Ui,
    /// Pointer events (`click`, `mouseover`, ...).
    Pointer,
    /// User-defined events, named with a leading `:`.
    Custom,
    /// Events synthesized by this crate (currently `mutation`).
    Library,
    /// Anything else.
    #[default]
    Generic,
}

impl EventCategory {
    /// Classify an event name.
    ///
    /// Matching is case-insensitive; a leading `:` always yields [`Self::Custom`].
    pub fn classify(name: &str) -> Self {
        if name.starts_with(':') {
            return Self::Custom;
        }
        let known = |set: &[&str]| set.iter().any(|e| e.eq_ignore_ascii_case(name));
        if known(UI_EVENTS) {
            Self::Ui
        } else if known(POINTER_EVENTS) {
            Self::Pointer
        } else if known(LIBRARY_EVENTS) {
            Self::Library
        } else {
            Self::Generic
        }
    }

    /// Returns `true` for the structural-mutation category handled by the bridge.
    pub const fn is_mutation(self) -> bool {
        matches!(self, Self::Library)
    }
}

impl fmt::Display for EventCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Ui => "UIEvent",
            Self::Pointer => "MouseEvent",
            Self::Custom => "CustomEvent",
            Self::Library => "LibraryEvent",
            Self::Generic => "Event",
        })
    }
}

/// Rendering engine families that need event-name rewrites.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum EngineFamily {
    /// Gecko (Firefox).
    Gecko,
    /// Anything else.
    Other,
}

impl EngineFamily {
    /// Detect the family from an environment signature (a user agent string).
    pub fn detect(user_agent: &str) -> Self {
        if user_agent.contains("Firefox") {
            Self::Gecko
        } else {
            Self::Other
        }
    }
}

/// A configured event: the name to bind and its resolved category.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct EventSpec {
    name: String,
    category: EventCategory,
}

impl EventSpec {
    /// Build a spec from an explicit name and category, without normalization.
    pub fn new(name: impl Into<String>, category: EventCategory) -> Self {
        Self {
            name: name.into(),
            category,
        }
    }

    /// Normalize a raw event name for the given environment signature.
    ///
    /// For Gecko, a raw name of exactly `mousewheel` is first rewritten to its
    /// legacy alias. The result is trimmed, lower-cased and classified.
    /// Returns `None` for an empty name.
    pub fn parse(raw: &str, user_agent: &str) -> Option<Self> {
        let raw = if raw == WHEEL_EVENT && EngineFamily::detect(user_agent) == EngineFamily::Gecko {
            GECKO_WHEEL_EVENT
        } else {
            raw.trim()
        };
        if raw.is_empty() {
            return None;
        }
        let name = raw.to_ascii_lowercase();
        let category = EventCategory::classify(&name);
        Some(Self { name, category })
    }

    /// The event name handed to the platform.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The resolved category.
    pub fn category(&self) -> EventCategory {
        self.category
    }
}
