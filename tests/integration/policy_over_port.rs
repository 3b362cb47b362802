//! Policy decisions requested from another context through ports

use content_policy::config::Preferences;
use content_policy::filters::{FilterEngine, FilterList};
use content_policy::messaging::Port;
use content_policy::policy::{ChannelObserver, Policy};
use content_policy::service::{register_policy_handlers, ContentPolicyClient};
use content_policy::types::{
    ElemHideHitRequest, ElemHideQuery, FilterKind, Frame, RequestDescriptor,
};
use std::sync::Arc;
use std::time::Duration;

const LIST: &str = "||ads.example^\n\
                    ##.sponsored\n\
                    news.example#@#.sponsored\n\
                    @@||forum.example^$elemhide";

struct Harness {
    engine: FilterEngine,
    policy: Arc<Policy>,
    parent: Port,
    client: ContentPolicyClient,
    worker: Option<std::thread::JoinHandle<()>>,
}

impl Harness {
    fn start() -> Self {
        let engine = FilterEngine::from_list(&FilterList::parse(LIST));
        let policy = Arc::new(Policy::from_engine(&engine, Preferences::default()));
        let parent = Port::new("parent");
        let child = Port::new("content");
        Port::connect(&parent, &child);
        register_policy_handlers(&parent, Arc::clone(&policy));
        let worker = parent.serve().unwrap();
        Self {
            engine,
            policy,
            parent,
            client: ContentPolicyClient::new(child),
            worker: Some(worker),
        }
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        self.parent.disconnect();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

fn page(location: &str) -> Vec<Frame> {
    vec![Frame::new(location)]
}

#[test]
fn verdicts_and_observed_hits_cross_the_port() {
    let harness = Harness::start();
    let (observer, events) = ChannelObserver::new_pair();
    harness.policy.recorder().add_observer(Arc::new(observer));

    let decision = harness.client.should_allow(&RequestDescriptor::new(
        "SUBDOCUMENT",
        "http://ads.example/frame.html",
        page("http://blog.example/"),
    ));
    assert!(!decision.allow);
    assert!(decision.collapse);

    let event = events.recv_timeout(Duration::from_secs(1)).unwrap();
    assert_eq!(event.record.filter_text.as_deref(), Some("||ads.example^"));
    assert!(!event.is_private);
    assert_eq!(harness.client.port().pending_requests(), 0);
}

#[test]
fn element_hiding_status_and_hits() {
    let harness = Harness::start();

    let excepted = harness.client.elemhide_enabled(&ElemHideQuery {
        frames: page("http://forum.example/thread"),
        is_private: false,
    });
    assert!(!excepted.enabled);
    let hit = excepted.hit.unwrap();
    assert_eq!(hit.filter, "@@||forum.example^$elemhide");
    assert_eq!(hit.filter_type, FilterKind::Whitelist);

    let normal = harness.client.elemhide_enabled(&ElemHideQuery {
        frames: page("http://blog.example/"),
        is_private: false,
    });
    assert!(normal.enabled);
    assert!(normal.hit.is_none());
}

#[test]
fn elemhide_requests_respect_selector_exceptions() {
    let harness = Harness::start();
    let key = harness.engine.elemhide.key_for("##.sponsored").unwrap();

    let hidden = harness.client.should_allow(&RequestDescriptor::new(
        "ELEMHIDE",
        key.clone(),
        page("http://blog.example/"),
    ));
    assert!(!hidden.allow);

    let excepted = harness.client.should_allow(&RequestDescriptor::new(
        "ELEMHIDE",
        key,
        page("http://news.example/"),
    ));
    assert!(excepted.allow);
    assert_eq!(
        excepted.deciding_hit().map(|hit| hit.filter_kind),
        None,
        "selector exceptions are not blocking or whitelist hits"
    );
    assert_eq!(
        excepted.hits.last().unwrap().filter_kind,
        Some(FilterKind::ElemHideException)
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn async_client_calls() {
    let harness = Harness::start();
    let key = harness.engine.elemhide.key_for("##.sponsored").unwrap();

    let decision = harness
        .client
        .should_allow_async(&RequestDescriptor::new(
            "IMAGE",
            "http://static.example/logo.png",
            page("http://blog.example/"),
        ))
        .await;
    assert!(decision.allow);

    let record = harness
        .client
        .register_elemhide_hit(&ElemHideHitRequest {
            key,
            frames: page("http://blog.example/"),
            is_private: false,
        })
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.filter_text.as_deref(), Some("##.sponsored"));
}

#[test]
fn client_blocks_after_parent_teardown() {
    let harness = Harness::start();
    harness.parent.disconnect();

    let decision = harness.client.should_allow(&RequestDescriptor::new(
        "SCRIPT",
        "http://static.example/app.js",
        page("http://blog.example/"),
    ));
    assert!(!decision.allow);
    assert!(decision.hits.is_empty());
}
