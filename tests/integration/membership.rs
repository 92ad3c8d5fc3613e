use crate::*;

#[test]
fn roster_follows_joins_and_leaves() {
    let hub = Hub::new();
    let a = hub.join("10.0.0.1:9000", "alice");
    hub.join("10.0.0.2:9000", "bob");
    hub.join("10.0.0.3:9000", "carol");

    assert_eq!(a.presentation.roster().len(), 3);

    hub.leave("10.0.0.2:9000");
    let roster = a.presentation.roster();
    assert_eq!(roster.len(), 2);
    assert!(roster.iter().all(|e| e.address.as_str() != "10.0.0.2:9000"));
}

#[test]
fn roster_switches_to_names_after_reconciliation() {
    let hub = Hub::new();
    let a = hub.join("10.0.0.1:9000", "alice");
    hub.join("10.0.0.2:9000", "bob");

    let before: Vec<String> = a
        .presentation
        .roster()
        .into_iter()
        .map(|e| e.display_name)
        .collect();
    assert_eq!(before, vec!["10.0.0.2:9000", "alice"]);

    murmur_services::reconcile_tick(&a.ctx);
    hub.pump();

    let after: Vec<String> = a
        .presentation
        .roster()
        .into_iter()
        .map(|e| e.display_name)
        .collect();
    assert_eq!(after, vec!["alice", "bob"]);
}

#[test]
fn rejoin_forgets_the_old_name() {
    let hub = Hub::new();
    let a = hub.join("10.0.0.1:9000", "alice");
    hub.join("10.0.0.2:9000", "bob");
    murmur_services::reconcile_tick(&a.ctx);
    hub.pump();
    assert_eq!(a.name_of("10.0.0.2:9000"), "bob");

    hub.leave("10.0.0.2:9000");
    hub.join("10.0.0.2:9000", "robert");

    assert_eq!(a.name_of("10.0.0.2:9000"), "10.0.0.2:9000");
    murmur_services::reconcile_tick(&a.ctx);
    hub.pump();
    assert_eq!(a.name_of("10.0.0.2:9000"), "robert");
}

#[test]
fn unreachable_report_for_unknown_peer_is_harmless() {
    let hub = Hub::new();
    let a = hub.join("10.0.0.1:9000", "alice");

    a.ctx
        .directory()
        .on_peer_unreachable(&Peer::new("10.9.9.9:1"));
    assert_eq!(a.ctx.directory().len(), 1);
}
