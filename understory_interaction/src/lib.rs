// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=understory_interaction --heading-base-level=0

//! Understory Interaction: declarative event binding and delegation.
//!
//! An *interaction* describes which events to listen for, on which anchor
//! nodes, through which delegation filters, calling which handler, how many
//! times and at what rate. Binding it attaches real listeners through a host
//! [`Platform`]; the host then feeds events back into the [`Registry`].
//!
//! - [`Registry`] is an engine instance: named filters and handlers plus the
//!   live interactions, in insertion order.
//! - [`InteractionBuilder`] configures an interaction with typed, fluent
//!   setters. [`InteractionBuilder::enable`] consumes it, so bound
//!   configuration is fixed.
//! - [`filter`] resolves a delegate node from a filter chain, with
//!   enter/leave tie-breaks for pointer transitions.
//! - [`limiter`] provides debounce and throttle as clock-driven state
//!   machines; the engine asks the platform for timers.
//! - [`mutation`] bridges structural-change batches into one event per change.
//! - [`Registry::trigger`] replays an interaction with synthetic events.
//!
//! ## Driving the engine
//!
//! The registry never holds the platform. Every entry point that can run a
//! handler takes `&mut P`, and the platform reports back with engine-issued
//! ids:
//!
//! - [`Registry::handle_event`] for a listener's event,
//! - [`Registry::fire_timer`] when a scheduled timer elapses,
//! - [`Registry::bridge_mutations`] for a batch of structural changes.
//!
//! [`headless::HeadlessHost`] implements all of this in memory.
//!
//! ## Example
//!
//! ```
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use understory_interaction::category::EventCategory;
//! use understory_interaction::event::Event;
//! use understory_interaction::headless::HeadlessHost;
//! use understory_interaction::Registry;
//!
//! let mut host = HeadlessHost::new();
//! let root = host.root();
//! let card = host.append(root, "div");
//! host.add_class(card, "card");
//! let title = host.append(card, "h2");
//!
//! let opened = Rc::new(RefCell::new(Vec::new()));
//! let log = Rc::clone(&opened);
//!
//! let mut registry = Registry::new();
//! registry.add_filter("card", |host: &HeadlessHost, _, targets| {
//!     targets.target.and_then(|t| host.closest_with_class(t, "card"))
//! });
//! registry.add_handler("open", move |_, inv| {
//!     log.borrow_mut().push(*inv.this());
//!     Ok(())
//! });
//!
//! registry
//!     .interaction("Open card")
//!     .id("open-card")
//!     .on(["click"])
//!     .anchors([root])
//!     .filters(["card"])
//!     .fire_count(1)
//!     .handler("open")
//!     .enable(&mut host);
//!
//! let click = Event::new("click", EventCategory::Pointer);
//! host.dispatch(&mut registry, title, click.clone()).unwrap();
//! host.dispatch(&mut registry, title, click).unwrap();
//!
//! assert_eq!(*opened.borrow(), [card]);
//! assert!(registry.by_id("open-card").is_none());
//! ```
//!
//! Misuse never errors: setters given invalid values, unknown names and
//! operations on missing ids are no-ops, logged at `trace` level through
//! [`tracing`]. The only error is a failing handler, surfaced as
//! [`DispatchError`].
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

mod bind;
mod builder;
mod registry;
mod trigger;

pub mod category;
pub mod error;
pub mod event;
pub mod filter;
pub mod headless;
pub mod limiter;
pub mod mutation;
pub mod options;
pub mod platform;
pub mod targets;

pub use builder::InteractionBuilder;
pub use error::{DispatchError, HandlerError, HandlerResult};
pub use platform::Platform;
pub use registry::{
    Interaction, InteractionKey, InternalId, Lifecycle, Registry, RegistryConfig,
};
pub use trigger::TriggerOptions;
