// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Delegation filters and the filter-chain resolver.
//!
//! A filter looks at a dispatch and proposes a candidate node (typically the
//! nearest ancestor of the target matching some selector). Each configured
//! filter carries a [`TieBreak`] deciding whether its candidate counts:
//!
//! - [`TieBreak::Candidate`] (`self`): any candidate counts.
//! - [`TieBreak::SimulateEnter`] (`simulate-enter`, `mouseenter`): the
//!   candidate must not contain `from_element`, so moving between descendants
//!   of the candidate does not count as entering it.
//! - [`TieBreak::SimulateLeave`] (`simulate-leave`, `mouseleave`): the
//!   candidate must not contain `to_element`.
//!
//! [`resolve`] evaluates filters in configuration order and stops at the first
//! accepted candidate. If filters are configured and none is accepted, the
//! dispatch is suppressed and the handler never runs.
//!
//! Filters are configured by name with an optional `@tiebreak` suffix:
//!
//! ```
//! use understory_interaction::filter::{parse_filter_spec, TieBreak};
//!
//! assert_eq!(parse_filter_spec("cont"), Some(("cont", TieBreak::Candidate)));
//! assert_eq!(parse_filter_spec("cont@mouseenter"), Some(("cont", TieBreak::SimulateEnter)));
//! assert_eq!(parse_filter_spec("cont@simulate-leave"), Some(("cont", TieBreak::SimulateLeave)));
//! assert_eq!(parse_filter_spec("cont@sideways"), None);
//! ```

use alloc::rc::Rc;
use alloc::string::String;
use core::fmt;
use core::str::FromStr;

use crate::event::Event;
use crate::platform::{NodeOf, Platform};
use crate::targets::ResolvedTargets;

/// A registered filter function.
///
/// Receives the platform (for ancestor/attribute queries), the raw event and
/// the resolved targets; returns a candidate delegate or `None`.
pub type FilterFn<P> =
    Rc<dyn Fn(&P, &Event<NodeOf<P>>, &ResolvedTargets<NodeOf<P>>) -> Option<NodeOf<P>>>;

/// Whether a filter's candidate counts as a match.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
pub enum TieBreak {
    /// Any candidate matches.
    #[default]
    Candidate,
    /// The candidate must not contain the node the pointer came from.
    SimulateEnter,
    /// The candidate must not contain the node the pointer went to.
    SimulateLeave,
}

/// An unrecognized tie-break tag.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("unknown tie-break policy `{0}`")]
pub struct UnknownTieBreak(pub String);

impl FromStr for TieBreak {
    type Err = UnknownTieBreak;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "self" => Ok(Self::Candidate),
            "simulate-enter" | "mouseenter" => Ok(Self::SimulateEnter),
            "simulate-leave" | "mouseleave" => Ok(Self::SimulateLeave),
            other => Err(UnknownTieBreak(other.into())),
        }
    }
}

impl fmt::Display for TieBreak {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Candidate => "self",
            Self::SimulateEnter => "simulate-enter",
            Self::SimulateLeave => "simulate-leave",
        })
    }
}

/// Split `name` or `name@tiebreak`. Returns `None` for an empty name or an unknown tag.
pub fn parse_filter_spec(spec: &str) -> Option<(&str, TieBreak)> {
    let (name, tie_break) = match spec.split_once('@') {
        Some((name, tag)) => (name, tag.parse().ok()?),
        None => (spec, TieBreak::Candidate),
    };
    (!name.is_empty()).then_some((name, tie_break))
}

/// A filter as configured on an interaction.
pub struct FilterBinding<P: Platform> {
    name: String,
    tie_break: TieBreak,
    filter: FilterFn<P>,
}

impl<P: Platform> FilterBinding<P> {
    /// Pair a filter function with its registered name and tie-break policy.
    pub fn new(name: impl Into<String>, tie_break: TieBreak, filter: FilterFn<P>) -> Self {
        Self {
            name: name.into(),
            tie_break,
            filter,
        }
    }

    /// The registered filter name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The tie-break policy.
    pub fn tie_break(&self) -> TieBreak {
        self.tie_break
    }

    /// Run the filter and apply the tie-break policy.
    pub fn accept(
        &self,
        platform: &P,
        event: &Event<NodeOf<P>>,
        targets: &ResolvedTargets<NodeOf<P>>,
    ) -> Option<NodeOf<P>> {
        let candidate = (self.filter)(platform, event, targets)?;
        let excluded = match self.tie_break {
            TieBreak::Candidate => None,
            TieBreak::SimulateEnter => targets.from_element.as_ref(),
            TieBreak::SimulateLeave => targets.to_element.as_ref(),
        };
        match excluded {
            Some(node) if platform.contains(&candidate, node) => None,
            _ => Some(candidate),
        }
    }
}

impl<P: Platform> Clone for FilterBinding<P> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            tie_break: self.tie_break,
            filter: Rc::clone(&self.filter),
        }
    }
}

impl<P: Platform> PartialEq for FilterBinding<P> {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.tie_break == other.tie_break
            && Rc::ptr_eq(&self.filter, &other.filter)
    }
}

impl<P: Platform> fmt::Debug for FilterBinding<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterBinding")
            .field("name", &self.name)
            .field("tie_break", &self.tie_break)
            .finish_non_exhaustive()
    }
}

/// Outcome of running a filter chain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Resolution<'a, N> {
    /// No filters configured; the bound node is the delegate.
    Unfiltered,
    /// A filter accepted `node`.
    Delegate {
        /// The accepted candidate.
        node: N,
        /// Name of the accepting filter.
        filter: &'a str,
    },
    /// Filters were configured and none accepted: do not invoke the handler.
    Suppressed,
}

/// Evaluate `filters` in order and return the first accepted candidate.
pub fn resolve<'a, P: Platform>(
    platform: &P,
    filters: &'a [FilterBinding<P>],
    event: &Event<NodeOf<P>>,
    targets: &ResolvedTargets<NodeOf<P>>,
) -> Resolution<'a, NodeOf<P>> {
    if filters.is_empty() {
        return Resolution::Unfiltered;
    }
    filters
        .iter()
        .find_map(|f| {
            f.accept(platform, event, targets).map(|node| Resolution::Delegate {
                node,
                filter: f.name(),
            })
        })
        .unwrap_or(Resolution::Suppressed)
}
