//! Request/response correlation across several ports

use content_policy::error::MessagingError;
use content_policy::messaging::{HandlerResult, Port};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Pump `port` until it has handled at least one message.
fn pump_one(port: &Port) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while port.pump() == 0 {
        assert!(Instant::now() < deadline, "no message arrived at {}", port.name());
        thread::sleep(Duration::from_millis(1));
    }
}

fn wait_for_pending(port: &Port, count: usize) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while port.pending_requests() < count {
        assert!(Instant::now() < deadline, "requests never registered");
        thread::sleep(Duration::from_millis(1));
    }
}

#[test]
fn first_defined_answer_of_three_wins() {
    let requester = Port::new("requester");
    let silent = Port::new("silent");
    let first = Port::new("first");
    let second = Port::new("second");
    for responder in [&silent, &first, &second] {
        Port::connect(&requester, responder);
    }
    silent.on("query", |_, _| HandlerResult::NoValue);
    first.on("query", |_, _| HandlerResult::Value(json!("first")));
    second.on("query", |_, _| HandlerResult::Value(json!("second")));

    let waiting = {
        let requester = requester.clone();
        thread::spawn(move || requester.emit_sync::<_, Value>("query", &json!({})))
    };
    pump_one(&silent);
    pump_one(&first);
    pump_one(&second);

    assert_eq!(waiting.join().unwrap(), Ok(Some(json!("first"))));
    assert_eq!(requester.pending_requests(), 0);
}

#[test]
fn no_defined_answer_resolves_to_none() {
    let requester = Port::new("requester");
    let a = Port::new("a");
    let b = Port::new("b");
    Port::connect(&requester, &a);
    Port::connect(&requester, &b);
    a.on("query", |_, _| HandlerResult::NoValue);

    let waiting = {
        let requester = requester.clone();
        thread::spawn(move || requester.emit_sync::<_, Value>("query", &()))
    };
    pump_one(&a);
    pump_one(&b);
    assert_eq!(waiting.join().unwrap(), Ok(None));
}

#[test]
fn teardown_releases_blocked_synchronous_requests() {
    let requester = Port::new("requester");
    let stalled = Port::new("stalled");
    Port::connect(&requester, &stalled);

    let blocked: Vec<_> = (0..2)
        .map(|i| {
            let requester = requester.clone();
            thread::spawn(move || requester.emit_sync::<_, Value>("query", &i))
        })
        .collect();
    wait_for_pending(&requester, 2);

    let started = Instant::now();
    requester.disconnect();
    for handle in blocked {
        assert_eq!(
            handle.join().unwrap(),
            Err(MessagingError::Disconnected("query".to_string()))
        );
    }
    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(requester.pending_requests(), 0);
}

#[test]
fn responder_teardown_answers_queued_requests_with_none() {
    let requester = Port::new("requester");
    let responder = Port::new("responder");
    Port::connect(&requester, &responder);

    let waiting = {
        let requester = requester.clone();
        thread::spawn(move || requester.emit_sync::<_, Value>("query", &()))
    };
    wait_for_pending(&requester, 1);
    // The request is queued right after it is registered.
    thread::sleep(Duration::from_millis(50));
    responder.disconnect();
    assert_eq!(waiting.join().unwrap(), Ok(None));
}

#[test]
fn broadcast_reaches_every_peer() {
    let sender = Port::new("sender");
    let calls = Arc::new(AtomicUsize::new(0));
    let peers: Vec<Port> = (0..3).map(|i| Port::new(format!("peer-{}", i))).collect();
    for peer in &peers {
        Port::connect(&sender, peer);
        let calls = Arc::clone(&calls);
        peer.on("notify", move |_, _| {
            calls.fetch_add(1, Ordering::SeqCst);
            HandlerResult::NoValue
        });
    }

    sender.emit("notify", &json!({"page": 1})).unwrap();
    for peer in &peers {
        assert_eq!(peer.pump(), 1);
    }
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn async_request_aggregates_served_responders() {
    let requester = Port::new("requester");
    let responders: Vec<Port> = (0..3).map(|i| Port::new(format!("responder-{}", i))).collect();
    let mut workers = Vec::new();
    for (i, responder) in responders.iter().enumerate() {
        Port::connect(&requester, responder);
        responder.on_request("double", move |n: u64, _| (i == 1).then_some(n * 2));
        workers.push(responder.serve().unwrap());
    }

    let answer: Option<u64> = requester.emit_with_response("double", &21u64).await.unwrap();
    assert_eq!(answer, Some(42));

    for responder in &responders {
        responder.disconnect();
    }
    for worker in workers {
        worker.join().unwrap();
    }
}
