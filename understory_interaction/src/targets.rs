// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Resolved targets: the per-dispatch record filters and handlers work from.

use crate::event::{Event, EventTargets};

/// Normalized targets of one dispatch, plus the resolved delegate.
///
/// Built from the raw event targets in three steps:
///
/// 1. Normalize: `src_element` falls back to `target`; `from_element` and
///    `to_element` fall back to `related_target`.
/// 2. Apply caller overrides carried by a synthetic event.
/// 3. For a bridged mutation, the record's node becomes `target` and
///    `src_element`.
///
/// `delegate_target` is filled in after the filter chain ran.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedTargets<N> {
    /// The primary target.
    pub target: Option<N>,
    /// The node the listener is bound to.
    pub current_target: Option<N>,
    /// The secondary target.
    pub related_target: Option<N>,
    /// Alias of `target` unless the platform said otherwise.
    pub src_element: Option<N>,
    /// Where the pointer came from.
    pub from_element: Option<N>,
    /// Where the pointer went to.
    pub to_element: Option<N>,
    /// Gecko-specific, passed through.
    pub explicit_original_target: Option<N>,
    /// Gecko-specific, passed through.
    pub original_target: Option<N>,
    /// The node the filter chain settled on, or the bound node.
    pub delegate_target: Option<N>,
}

impl<N: Clone> ResolvedTargets<N> {
    /// Resolve the targets of `event`.
    pub fn resolve(event: &Event<N>) -> Self {
        let raw = event.targets();
        let mut targets = EventTargets {
            target: raw.target.clone(),
            current_target: raw.current_target.clone(),
            related_target: raw.related_target.clone(),
            src_element: raw.src_element.clone().or_else(|| raw.target.clone()),
            from_element: raw
                .from_element
                .clone()
                .or_else(|| raw.related_target.clone()),
            to_element: raw.to_element.clone().or_else(|| raw.related_target.clone()),
            explicit_original_target: raw.explicit_original_target.clone(),
            original_target: raw.original_target.clone(),
        };
        if let Some(overrides) = event.overrides() {
            targets.overlay(overrides);
        }
        if let Some(record) = event.mutation() {
            targets.target = Some(record.target.clone());
            targets.src_element = Some(record.target.clone());
        }
        let EventTargets {
            target,
            current_target,
            related_target,
            src_element,
            from_element,
            to_element,
            explicit_original_target,
            original_target,
        } = targets;
        Self {
            target,
            current_target,
            related_target,
            src_element,
            from_element,
            to_element,
            explicit_original_target,
            original_target,
            delegate_target: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::EventCategory;
    use crate::mutation::{MutationKind, MutationRecord};

    #[test]
    fn legacy_aliases_fall_back() {
        let ev: Event<u32> = Event::new("mouseover", EventCategory::Pointer)
            .with_target(5)
            .with_current_target(1)
            .with_related_target(4);
        let t = ResolvedTargets::resolve(&ev);
        assert_eq!(t.src_element, Some(5));
        assert_eq!(t.from_element, Some(4));
        assert_eq!(t.to_element, Some(4));
        assert_eq!(t.delegate_target, None);
    }

    #[test]
    fn explicit_legacy_values_win() {
        let raw = EventTargets {
            target: Some(5),
            related_target: Some(4),
            from_element: Some(9),
            ..EventTargets::default()
        };
        let ev: Event<u32> = Event::new("mouseout", EventCategory::Pointer).with_targets(raw);
        let t = ResolvedTargets::resolve(&ev);
        assert_eq!(t.from_element, Some(9));
        assert_eq!(t.to_element, Some(4));
    }

    #[test]
    fn overrides_apply_after_normalization() {
        let ev: Event<u32> = Event::new("click", EventCategory::Pointer)
            .with_current_target(1)
            .with_overrides(EventTargets::with_target(8))
            .synthetic();
        let t = ResolvedTargets::resolve(&ev);
        assert_eq!(t.target, Some(8));
        assert_eq!(t.current_target, Some(1));
        assert_eq!(t.src_element, None);
    }

    #[test]
    fn mutation_node_becomes_primary_target() {
        let ev: Event<u32> = Event::new("mutation", EventCategory::Custom)
            .with_target(1)
            .with_current_target(1)
            .with_mutation(MutationRecord::new(MutationKind::ChildList, 6));
        let t = ResolvedTargets::resolve(&ev);
        assert_eq!(t.target, Some(6));
        assert_eq!(t.src_element, Some(6));
        assert_eq!(t.current_target, Some(1));
    }
}
