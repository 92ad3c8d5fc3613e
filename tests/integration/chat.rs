use murmur_services::send_message;

use crate::*;

#[test]
fn chat_reaches_everyone_else_once() {
    let hub = Hub::new();
    let a = hub.join("10.0.0.1:9000", "alice");
    let b = hub.join("10.0.0.2:9000", "bob");
    let c = hub.join("10.0.0.3:9000", "carol");

    send_message(&a.ctx, "hello all").unwrap();
    assert_eq!(hub.pump(), 1);

    assert_eq!(a.presentation.transcript(), vec!["alice: hello all"]);
    assert_eq!(b.presentation.transcript().len(), 1);
    assert_eq!(c.presentation.transcript().len(), 1);
}

#[test]
fn sender_shown_by_address_until_its_name_is_known() {
    let hub = Hub::new();
    let a = hub.join("10.0.0.1:9000", "alice");
    let b = hub.join("10.0.0.2:9000", "bob");

    send_message(&a.ctx, "first").unwrap();
    hub.pump();

    murmur_services::reconcile_tick(&b.ctx);
    hub.pump();

    send_message(&a.ctx, "second").unwrap();
    hub.pump();

    assert_eq!(
        b.presentation.transcript(),
        vec!["10.0.0.1:9000: first", "alice: second"]
    );
}

#[test]
fn blank_lines_are_not_sent() {
    let hub = Hub::new();
    let a = hub.join("10.0.0.1:9000", "alice");
    hub.join("10.0.0.2:9000", "bob");

    send_message(&a.ctx, "   ").unwrap();
    assert_eq!(hub.pending(), 0);
    assert!(a.presentation.transcript().is_empty());
}

#[test]
fn send_on_closed_substrate_reports_error() {
    let hub = Hub::new();
    let a = hub.join("10.0.0.1:9000", "alice");
    hub.close("10.0.0.1:9000");

    assert!(send_message(&a.ctx, "anyone?").is_err());
    assert_eq!(hub.pending(), 0);
}
