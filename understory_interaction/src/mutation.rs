// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Mutation bridge: structural-change batches become one event per change.
//!
//! Binding an event of the [`Library`](crate::category::EventCategory::Library)
//! category (`mutation`) does not rely on a native event. Instead the engine
//! starts a platform observer on the anchor. When the host delivers a batch of
//! [`MutationRecord`]s, [`Registry::bridge_mutations`](crate::Registry::bridge_mutations)
//! turns each record into a custom event named after the configured event and
//! carrying that single record. The host dispatches those events on the anchor;
//! the bound handler then runs once per record, with the record's node as the
//! primary target.
//!
//! ```
//! use understory_interaction::mutation::{bridge, MutationKind, MutationRecord};
//!
//! let records = [
//!     MutationRecord::new(MutationKind::ChildList, 10_u32),
//!     MutationRecord::new(MutationKind::Attributes, 11),
//! ];
//! let events = bridge("mutation", records);
//! assert_eq!(events.len(), 2);
//! assert_eq!(events[1].mutation().unwrap().target, 11);
//! assert!(!events[0].init().bubbles);
//! ```

use alloc::string::String;
use alloc::vec::Vec;
use smallvec::SmallVec;

use crate::category::EventCategory;
use crate::event::{Event, EventInit};

bitflags::bitflags! {
    /// Which structural changes an observer reports.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct MutationFilter: u8 {
        /// Attribute changes.
        const ATTRIBUTES              = 0b0000_0001;
        /// Children added or removed.
        const CHILD_LIST              = 0b0000_0010;
        /// Text content changes.
        const CHARACTER_DATA          = 0b0000_0100;
        /// Observe the whole subtree, not just the anchor.
        const SUBTREE                 = 0b0000_1000;
        /// Record previous attribute values.
        const ATTRIBUTE_OLD_VALUE     = 0b0001_0000;
        /// Record previous text values.
        const CHARACTER_DATA_OLD_VALUE = 0b0010_0000;
    }
}

impl Default for MutationFilter {
    fn default() -> Self {
        Self::all()
    }
}

impl MutationFilter {
    /// Returns `true` if records of `kind` are reported.
    pub fn reports(self, kind: MutationKind) -> bool {
        self.contains(match kind {
            MutationKind::Attributes => Self::ATTRIBUTES,
            MutationKind::ChildList => Self::CHILD_LIST,
            MutationKind::CharacterData => Self::CHARACTER_DATA,
        })
    }
}

/// The kind of a structural change.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum MutationKind {
    /// An attribute changed.
    Attributes,
    /// Children were added or removed.
    ChildList,
    /// Text content changed.
    CharacterData,
}

/// One structural change.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MutationRecord<N> {
    /// What changed.
    pub kind: MutationKind,
    /// The affected node.
    pub target: N,
    /// Nodes added (child-list changes).
    pub added: SmallVec<[N; 1]>,
    /// Nodes removed (child-list changes).
    pub removed: SmallVec<[N; 1]>,
    /// Changed attribute name (attribute changes).
    pub attribute_name: Option<String>,
    /// Previous value, when old-value capture is enabled.
    pub old_value: Option<String>,
}

impl<N> MutationRecord<N> {
    /// A record with no added/removed nodes or values.
    pub fn new(kind: MutationKind, target: N) -> Self {
        Self {
            kind,
            target,
            added: SmallVec::new(),
            removed: SmallVec::new(),
            attribute_name: None,
            old_value: None,
        }
    }
}

/// Synthesize one custom event per record, named `event`.
///
/// The events use the platform's custom-event flags ([`EventInit::CUSTOM`]):
/// they do not bubble and cannot be canceled.
pub fn bridge<N>(event: &str, records: impl IntoIterator<Item = MutationRecord<N>>) -> Vec<Event<N>> {
    records
        .into_iter()
        .map(|record| {
            Event::new(event, EventCategory::Custom)
                .with_init(EventInit::CUSTOM)
                .with_mutation(record)
        })
        .collect()
}
