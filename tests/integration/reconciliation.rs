use std::time::Duration;

use murmur_services::{reconcile_tick, Reconciler};
use tokio::sync::broadcast;

use crate::*;

fn converged(hub: &Hub) -> bool {
    hub.nodes().iter().all(|n| n.is_complete())
}

/// Run reconciliation rounds by hand until every node knows every name.
fn reconcile_until_converged(hub: &Hub, max_rounds: usize) -> usize {
    for round in 1..=max_rounds {
        for node in hub.nodes() {
            reconcile_tick(&node.ctx);
        }
        hub.pump();
        if converged(hub) {
            return round;
        }
    }
    panic!("no convergence after {max_rounds} rounds: {:?}", hub.views());
}

#[test]
fn fresh_nodes_know_only_themselves() {
    let hub = Hub::new();
    let a = hub.join("10.0.0.1:9000", "alice");
    let b = hub.join("10.0.0.2:9000", "bob");

    assert_eq!(a.name_of("10.0.0.1:9000"), "alice");
    assert_eq!(a.name_of("10.0.0.2:9000"), "10.0.0.2:9000");
    assert_eq!(b.name_of("10.0.0.1:9000"), "10.0.0.1:9000");
    assert!(!a.is_complete());
    assert_eq!(hub.pending(), 0);
}

#[test]
fn two_nodes_converge_in_one_round() {
    let hub = Hub::new();
    let a = hub.join("10.0.0.1:9000", "alice");
    let b = hub.join("10.0.0.2:9000", "bob");

    assert_eq!(reconcile_until_converged(&hub, 1), 1);
    assert_eq!(a.name_of("10.0.0.2:9000"), "bob");
    assert_eq!(b.name_of("10.0.0.1:9000"), "alice");
}

#[test]
fn five_nodes_converge() {
    let hub = Hub::new();
    let names = ["alice", "bob", "carol", "dave", "erin"];
    for (i, name) in names.iter().enumerate() {
        hub.join(&format!("10.0.0.{}:9000", i + 1), name);
    }

    reconcile_until_converged(&hub, 10);

    let views = hub.views();
    for view in views.values() {
        assert_eq!(view.len(), names.len());
        for (i, name) in names.iter().enumerate() {
            let addr = murmur_core::PeerAddress::new(format!("10.0.0.{}:9000", i + 1));
            assert_eq!(view[&addr], *name);
        }
    }
}

#[test]
fn converged_nodes_stay_quiet() {
    let hub = Hub::new();
    hub.join("10.0.0.1:9000", "alice");
    hub.join("10.0.0.2:9000", "bob");
    reconcile_until_converged(&hub, 3);

    for node in hub.nodes() {
        assert_eq!(reconcile_tick(&node.ctx), None);
    }
    assert_eq!(hub.pump(), 0);
}

#[test]
fn late_joiner_learns_names_from_the_group() {
    let hub = Hub::new();
    hub.join("10.0.0.1:9000", "alice");
    hub.join("10.0.0.2:9000", "bob");
    reconcile_until_converged(&hub, 3);

    let c = hub.join("10.0.0.3:9000", "carol");
    assert!(!c.is_complete());

    reconcile_until_converged(&hub, 5);
    assert_eq!(c.name_of("10.0.0.1:9000"), "alice");
    assert_eq!(c.name_of("10.0.0.2:9000"), "bob");
}

#[test]
fn peer_leaving_before_it_answers_stops_the_requests() {
    let hub = Hub::new();
    let a = hub.join("10.0.0.1:9000", "alice");
    hub.join("10.0.0.2:9000", "bob");

    // bob goes away with alice's request still in flight
    assert_eq!(
        reconcile_tick(&a.ctx),
        Some(murmur_core::PeerAddress::new("10.0.0.2:9000"))
    );
    hub.leave("10.0.0.2:9000");
    hub.pump();

    assert!(a.is_complete());
    assert_eq!(a.ctx.directory().len(), 1);
    assert_eq!(reconcile_tick(&a.ctx), None);
}

#[test]
fn failed_request_is_retried_next_tick() {
    let hub = Hub::new();
    let a = hub.join("10.0.0.1:9000", "alice");
    hub.join("10.0.0.2:9000", "bob");
    hub.close("10.0.0.1:9000");

    reconcile_tick(&a.ctx);
    assert_eq!(hub.pending(), 0);
    assert_eq!(a.presentation.logs().len(), 1);

    // still missing, so the next tick asks again
    assert!(reconcile_tick(&a.ctx).is_some());
    assert_eq!(a.presentation.logs().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn scheduled_reconciliation_converges() {
    let hub = Hub::new();
    hub.join("10.0.0.1:9000", "alice");
    hub.join("10.0.0.2:9000", "bob");
    hub.join("10.0.0.3:9000", "carol");

    let (shutdown_tx, _) = broadcast::channel::<()>(1);
    let interval = Duration::from_secs(15);
    let tasks: Vec<_> = hub
        .nodes()
        .into_iter()
        .map(|n| {
            tokio::spawn(Reconciler::new(n.ctx.clone(), interval, shutdown_tx.subscribe()).run())
        })
        .collect();

    // nothing goes out before the first interval has passed
    tokio::time::sleep(Duration::from_secs(14)).await;
    assert_eq!(hub.pending(), 0);

    let mut rounds = 0;
    while !converged(&hub) {
        tokio::time::sleep(interval).await;
        hub.pump();
        rounds += 1;
        assert!(rounds <= 10, "no convergence: {:?}", hub.views());
    }

    shutdown_tx.send(()).unwrap();
    for task in tasks {
        task.await.unwrap();
    }
}
