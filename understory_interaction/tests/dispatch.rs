// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Dispatch tests for `understory_interaction`, driven through `HeadlessHost`.
//!
//! Covers delegation tie-breaks, fire-count expiry, rate limiting on the
//! virtual clock, the mutation bridge, synthetic triggers and handler errors.

use std::cell::RefCell;
use std::rc::Rc;

use understory_interaction::category::EventCategory;
use understory_interaction::event::{Event, EventInit, EventTargets};
use understory_interaction::headless::{HeadlessHost, NodeId};
use understory_interaction::platform::Platform;
use understory_interaction::{
    DispatchError, HandlerError, Lifecycle, Registry, TriggerOptions,
};

/// What a handler saw.
#[derive(Clone, Debug, PartialEq)]
struct Seen {
    this: NodeId,
    anchor: NodeId,
    target: Option<NodeId>,
    filter: Option<String>,
    synthetic: bool,
    tag: Option<u32>,
    at: u64,
}

type Log = Rc<RefCell<Vec<Seen>>>;

fn recording(registry: &mut Registry<HeadlessHost>) -> Log {
    let log: Log = Rc::default();
    let sink = Rc::clone(&log);
    registry.add_handler("record", move |host: &mut HeadlessHost, inv| {
        sink.borrow_mut().push(Seen {
            this: *inv.this(),
            anchor: *inv.anchor,
            target: inv.targets.target,
            filter: inv.filter.map(str::to_owned),
            synthetic: inv.event.is_synthetic(),
            tag: inv.event.data_as::<u32>().copied(),
            at: host.now(),
        });
        Ok(())
    });
    log
}

/// `root > cont(.cont) > [inner, inner2]`, `root > outside`.
struct Doc {
    host: HeadlessHost,
    root: NodeId,
    cont: NodeId,
    inner: NodeId,
    inner2: NodeId,
    outside: NodeId,
}

fn doc() -> Doc {
    let mut host = HeadlessHost::new();
    let root = host.root();
    let cont = host.append(root, "div");
    host.add_class(cont, "cont");
    let inner = host.append(cont, "span");
    let inner2 = host.append(cont, "span");
    let outside = host.append(root, "p");
    Doc {
        host,
        root,
        cont,
        inner,
        inner2,
        outside,
    }
}

fn with_cont_filter(registry: &mut Registry<HeadlessHost>) {
    registry.add_filter("cont", |host: &HeadlessHost, _, t| {
        t.target.and_then(|n| host.closest_with_class(n, "cont"))
    });
}

fn pointer(name: &str) -> Event<NodeId> {
    Event::new(name, EventCategory::Pointer)
}

#[test]
fn fire_count_expires_after_budget() {
    let Doc {
        mut host,
        root,
        cont,
        inner,
        ..
    } = doc();
    let mut registry = Registry::new();
    with_cont_filter(&mut registry);
    let log = recording(&mut registry);
    let key = registry
        .interaction("")
        .id("twice")
        .on(["click"])
        .anchors([root])
        .filters(["cont@self"])
        .fire_count(2)
        .handler("record")
        .enable(&mut host);

    for _ in 0..3 {
        host.dispatch(&mut registry, inner, pointer("click")).unwrap();
    }
    let log = log.borrow();
    assert_eq!(log.len(), 2);
    assert!(log.iter().all(|s| s.this == cont && s.filter.as_deref() == Some("cont")));
    assert_eq!(registry.state(key), Lifecycle::Removed);
    assert!(registry.by_id("twice").is_none());
    assert_eq!(host.listener_count(), 0);
}

#[test]
fn zero_fire_count_fires_once() {
    let Doc {
        mut host, root, ..
    } = doc();
    let mut registry = Registry::new();
    let log = recording(&mut registry);
    let key = registry
        .interaction("")
        .on(["click"])
        .anchors([root])
        .fire_count(0)
        .handler("record")
        .enable(&mut host);

    for _ in 0..3 {
        host.dispatch(&mut registry, root, pointer("click")).unwrap();
    }
    assert_eq!(log.borrow().len(), 1);
    assert_eq!(registry.state(key), Lifecycle::Removed);
    assert_eq!(host.listener_count(), 0);
}

#[test]
fn chained_setters_bind_every_pair() {
    let Doc {
        mut host,
        root,
        cont,
        inner,
        outside,
        ..
    } = doc();
    let mut registry = Registry::new();
    with_cont_filter(&mut registry);
    registry.add_filter("para", |host: &HeadlessHost, _, t| {
        t.target.and_then(|n| host.closest_with_tag(n, "p"))
    });
    let log = recording(&mut registry);
    let key = registry
        .interaction("")
        .on(["click"])
        .on(["mouseover"])
        .anchors([cont])
        .anchors([outside])
        .filters(["cont"])
        .filters(["para"])
        .handler("record")
        .enable(&mut host);

    assert_eq!(registry.get(key).unwrap().binding_count(), 4);
    assert_eq!(host.listener_count(), 4);

    host.dispatch(&mut registry, inner, pointer("mouseover")).unwrap();
    host.dispatch(&mut registry, outside, pointer("click")).unwrap();
    host.dispatch(&mut registry, root, pointer("click")).unwrap();
    let log = log.borrow();
    let seen: Vec<_> = log.iter().map(|s| (s.this, s.filter.clone())).collect();
    assert_eq!(
        seen,
        [
            (cont, Some("cont".to_owned())),
            (outside, Some("para".to_owned())),
        ]
    );
}

#[test]
fn suppressed_dispatch_spends_nothing() {
    let Doc {
        mut host,
        root,
        outside,
        inner,
        ..
    } = doc();
    let mut registry = Registry::new();
    with_cont_filter(&mut registry);
    let log = recording(&mut registry);
    let key = registry
        .interaction("")
        .on(["click"])
        .anchors([root])
        .filters(["cont"])
        .fire_count(1)
        .handler("record")
        .enable(&mut host);

    host.dispatch(&mut registry, outside, pointer("click")).unwrap();
    assert!(log.borrow().is_empty());
    assert_eq!(registry.get(key).unwrap().remaining(), Some(1));

    host.dispatch(&mut registry, inner, pointer("click")).unwrap();
    assert_eq!(log.borrow().len(), 1);
}

#[test]
fn unfiltered_delegate_is_the_anchor() {
    let Doc {
        mut host,
        root,
        inner,
        ..
    } = doc();
    let mut registry = Registry::new();
    let log = recording(&mut registry);
    registry
        .interaction("")
        .on(["click"])
        .anchors([root])
        .handler("record")
        .enable(&mut host);

    host.dispatch(&mut registry, inner, pointer("click")).unwrap();
    let log = log.borrow();
    let seen = &log[0];
    assert_eq!(seen.this, root);
    assert_eq!(seen.target, Some(inner));
    assert_eq!(seen.filter, None);
    assert!(!seen.synthetic);
}

#[test]
fn simulated_enter_ignores_moves_within_candidate() {
    let Doc {
        mut host,
        root,
        cont,
        inner,
        inner2,
        outside,
    } = doc();
    let mut registry = Registry::new();
    with_cont_filter(&mut registry);
    let log = recording(&mut registry);
    registry
        .interaction("")
        .on(["mouseover"])
        .anchors([root])
        .filters(["cont@simulate-enter"])
        .handler("record")
        .enable(&mut host);

    // From a sibling inside the candidate: not an enter.
    let within = pointer("mouseover").with_related_target(inner2);
    host.dispatch(&mut registry, inner, within).unwrap();
    assert!(log.borrow().is_empty());

    // From outside: enter, delegated to the candidate.
    let from_outside = pointer("mouseover").with_related_target(outside);
    host.dispatch(&mut registry, inner, from_outside).unwrap();
    assert_eq!(log.borrow().len(), 1);
    assert_eq!(log.borrow()[0].this, cont);
}

#[test]
fn simulated_leave_ignores_moves_within_candidate() {
    let Doc {
        mut host,
        root,
        cont,
        inner,
        inner2,
        outside,
    } = doc();
    let mut registry = Registry::new();
    with_cont_filter(&mut registry);
    let log = recording(&mut registry);
    registry
        .interaction("")
        .on(["mouseout"])
        .anchors([root])
        .filters(["cont@mouseleave"])
        .handler("record")
        .enable(&mut host);

    let within = pointer("mouseout").with_related_target(inner2);
    host.dispatch(&mut registry, inner, within).unwrap();
    assert!(log.borrow().is_empty());

    let to_outside = pointer("mouseout").with_related_target(outside);
    host.dispatch(&mut registry, inner, to_outside).unwrap();
    assert_eq!(log.borrow().len(), 1);
    assert_eq!(log.borrow()[0].this, cont);
}

#[test]
fn first_accepting_filter_wins() {
    let Doc {
        mut host,
        root,
        inner,
        ..
    } = doc();
    let mut registry = Registry::new();
    with_cont_filter(&mut registry);
    registry.add_filter("never", |_: &HeadlessHost, _, _| None);
    registry.add_filter("span", |host: &HeadlessHost, _, t| {
        t.target.and_then(|n| host.closest_with_tag(n, "span"))
    });
    let log = recording(&mut registry);
    registry
        .interaction("")
        .on(["click"])
        .anchors([root])
        .filters(["never", "span", "cont"])
        .handler("record")
        .enable(&mut host);

    host.dispatch(&mut registry, inner, pointer("click")).unwrap();
    let log = log.borrow();
    let seen = &log[0];
    assert_eq!(seen.this, inner);
    assert_eq!(seen.filter.as_deref(), Some("span"));
}

#[test]
fn debounce_coalesces_bursts() {
    let Doc {
        mut host, root, ..
    } = doc();
    let mut registry = Registry::new();
    let log = recording(&mut registry);
    registry
        .interaction("")
        .on(["scroll"])
        .anchors([root])
        .debounce(100)
        .handler("record")
        .enable(&mut host);

    for tag in 1..=3_u32 {
        let ev = Event::new("scroll", EventCategory::Ui).with_data(Rc::new(tag));
        host.dispatch(&mut registry, root, ev).unwrap();
        host.advance(&mut registry, 10).unwrap();
    }
    assert!(log.borrow().is_empty());
    assert_eq!(host.pending_timers(), 1);

    // Last event at t=20; quiet period ends at t=120.
    host.advance(&mut registry, 89).unwrap();
    assert!(log.borrow().is_empty());
    host.advance(&mut registry, 1).unwrap();
    let log = log.borrow();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].at, 120);
    assert_eq!(log[0].tag, Some(3));
}

#[test]
fn throttle_keeps_leading_and_latest_trailing_call() {
    let Doc {
        mut host, root, ..
    } = doc();
    let mut registry = Registry::new();
    let log = recording(&mut registry);
    registry
        .interaction("")
        .on(["mousemove"])
        .anchors([root])
        .throttle(50)
        .handler("record")
        .enable(&mut host);

    for tag in 1..=3_u32 {
        let ev = pointer("mousemove").with_data(Rc::new(tag));
        host.dispatch(&mut registry, root, ev).unwrap();
        host.advance(&mut registry, 10).unwrap();
    }
    assert_eq!(log.borrow().len(), 1, "leading call fires at once");

    host.advance(&mut registry, 30).unwrap();
    let log = log.borrow();
    let calls: Vec<_> = log.iter().map(|s| (s.at, s.tag)).collect();
    assert_eq!(calls, [(0, Some(1)), (50, Some(3))]);
}

#[test]
fn zero_period_disables_rate_limiting() {
    let Doc {
        mut host, root, ..
    } = doc();
    let mut registry = Registry::new();
    let log = recording(&mut registry);
    registry
        .interaction("")
        .on(["mousemove"])
        .anchors([root])
        .throttle(50)
        .debounce(0)
        .handler("record")
        .enable(&mut host);

    for _ in 0..3 {
        host.dispatch(&mut registry, root, pointer("mousemove")).unwrap();
    }
    assert_eq!(log.borrow().len(), 3);
    assert_eq!(host.pending_timers(), 0);
}

#[test]
fn mutation_bridge_dispatches_once_per_record() {
    let mut host = HeadlessHost::new();
    let root = host.root();
    let list = host.append(root, "ul");
    let items: Vec<_> = (0..3).map(|_| host.append(list, "li")).collect();

    let mut registry = Registry::new();
    let log = recording(&mut registry);
    let key = registry
        .interaction("List changes")
        .on(["mutation"])
        .anchors([list])
        .handler("record")
        .enable(&mut host);
    assert_eq!(host.observer_count(), 1);

    for &item in &items {
        host.append(item, "span");
    }
    assert_eq!(host.flush_mutations(&mut registry).unwrap(), 3);

    let targets: Vec<_> = log.borrow().iter().map(|s| s.target).collect();
    assert_eq!(targets, items.iter().copied().map(Some).collect::<Vec<_>>());
    assert!(log.borrow().iter().all(|s| s.anchor == list && s.this == list));

    // Nothing left to deliver.
    assert_eq!(host.flush_mutations(&mut registry).unwrap(), 0);

    registry.remove(&mut host, key);
    assert_eq!(host.observer_count(), 0);
    host.append(list, "li");
    assert_eq!(host.flush_mutations(&mut registry).unwrap(), 0);
}

#[test]
fn trigger_missing_id_is_a_no_op() {
    let mut registry: Registry<HeadlessHost> = Registry::new();
    let log = recording(&mut registry);
    let mut host = HeadlessHost::new();
    let options = TriggerOptions::default().with_data(Rc::new(7_u32));
    assert_eq!(registry.trigger(&mut host, "missingId", options), Ok(()));
    assert!(log.borrow().is_empty());
}

#[test]
fn trigger_replays_every_pair_through_first_binding() {
    let Doc {
        mut host,
        cont,
        outside,
        ..
    } = doc();
    let mut registry = Registry::new();
    let log = recording(&mut registry);
    registry
        .interaction("")
        .id("multi")
        .on(["click", ":ping"])
        .anchors([cont, outside])
        .handler("record")
        .enable(&mut host);

    registry
        .trigger(&mut host, "multi", TriggerOptions::default())
        .unwrap();
    let log = log.borrow();
    let this: Vec<_> = log.iter().map(|s| s.this).collect();
    assert_eq!(this, [cont, cont, outside, outside]);
    assert!(log.iter().all(|s| s.synthetic && s.anchor == cont));
}

#[test]
fn trigger_overrides_feed_the_filter_chain() {
    let Doc {
        mut host,
        root,
        cont,
        inner,
        ..
    } = doc();
    let mut registry = Registry::new();
    with_cont_filter(&mut registry);
    let log = recording(&mut registry);
    registry
        .interaction("")
        .id("delegated")
        .on(["click"])
        .anchors([root])
        .filters(["cont"])
        .handler("record")
        .enable(&mut host);

    // Without a target override the filter has nothing to work with.
    registry
        .trigger(&mut host, "delegated", TriggerOptions::default())
        .unwrap();
    assert!(log.borrow().is_empty());

    let options = TriggerOptions::default()
        .with_targets(EventTargets::with_target(inner))
        .with_data(Rc::new(9_u32));
    registry.trigger(&mut host, "delegated", options).unwrap();
    let log = log.borrow();
    let seen = &log[0];
    assert_eq!((seen.this, seen.target, seen.tag), (cont, Some(inner), Some(9)));
}

#[test]
fn trigger_stops_when_budget_runs_out() {
    let Doc {
        mut host,
        cont,
        outside,
        ..
    } = doc();
    let mut registry = Registry::new();
    let log = recording(&mut registry);
    registry
        .interaction("")
        .id("once")
        .on(["click"])
        .anchors([cont, outside])
        .fire_count(1)
        .handler("record")
        .enable(&mut host);

    registry
        .trigger(&mut host, "once", TriggerOptions::default())
        .unwrap();
    assert_eq!(log.borrow().len(), 1);
    assert!(registry.is_empty());
}

#[test]
fn trigger_init_override() {
    let Doc {
        mut host, root, ..
    } = doc();
    let flags: Rc<RefCell<Vec<EventInit>>> = Rc::default();
    let sink = Rc::clone(&flags);
    let mut registry = Registry::new();
    registry.add_handler("flags", move |_: &mut HeadlessHost, inv| {
        sink.borrow_mut().push(inv.event.init());
        inv.event.prevent_default();
        Ok(())
    });
    registry
        .interaction("")
        .id("flags")
        .on(["select"])
        .anchors([root])
        .handler("flags")
        .enable(&mut host);

    let cancelable = EventInit {
        cancelable: true,
        ..EventInit::default()
    };
    registry
        .trigger(&mut host, "flags", TriggerOptions::default())
        .unwrap();
    registry
        .trigger(&mut host, "flags", TriggerOptions::default().with_init(cancelable))
        .unwrap();
    assert_eq!(*flags.borrow(), [EventInit::default(), cancelable]);

    // A real cancelable event reports prevention back to the dispatcher.
    let ev = Event::new("select", EventCategory::Ui).with_init(cancelable);
    assert!(!host.dispatch(&mut registry, root, ev).unwrap());
    let ev = Event::new("select", EventCategory::Ui);
    assert!(host.dispatch(&mut registry, root, ev).unwrap());
}

#[test]
fn handler_errors_propagate_without_spending() {
    let Doc {
        mut host, root, ..
    } = doc();
    let mut registry = Registry::new();
    registry.add_handler("fail", |_: &mut HeadlessHost, _| Err(HandlerError::new("boom")));
    let key = registry
        .interaction("")
        .id("bad")
        .on(["click"])
        .anchors([root])
        .fire_count(2)
        .handler("fail")
        .enable(&mut host);

    let expected: Result<bool, DispatchError> = Err(DispatchError::Handler {
        id: "bad".into(),
        source: HandlerError::new("boom"),
    });
    assert_eq!(host.dispatch(&mut registry, root, pointer("click")), expected);
    assert_eq!(
        registry.trigger(&mut host, "bad", TriggerOptions::default()),
        Err(DispatchError::Handler {
            id: "bad".into(),
            source: HandlerError::new("boom"),
        })
    );
    assert_eq!(registry.get(key).unwrap().remaining(), Some(2));
}

#[test]
fn self_removal_mid_dispatch_leaves_others_running() {
    let Doc {
        mut host, root, ..
    } = doc();
    let mut registry = Registry::new();
    let log = recording(&mut registry);
    let once = registry
        .interaction("")
        .on(["click"])
        .anchors([root])
        .fire_count(1)
        .handler("record")
        .enable(&mut host);
    let always = registry
        .interaction("")
        .on(["click"])
        .anchors([root])
        .handler("record")
        .enable(&mut host);

    host.dispatch(&mut registry, root, pointer("click")).unwrap();
    host.dispatch(&mut registry, root, pointer("click")).unwrap();
    assert_eq!(log.borrow().len(), 3);
    assert_eq!(registry.state(once), Lifecycle::Removed);
    assert_eq!(registry.state(always), Lifecycle::Enabled);
}
