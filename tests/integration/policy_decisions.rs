//! Decisions made by the policy engine against realistic filter lists

use super::test_utils::{frames, policy_for};
use content_policy::config::Preferences;
use content_policy::filters::FilterStorage;
use content_policy::policy::HitStatistics;
use content_policy::types::{ContentType, FilterKind, RequestDescriptor};
use std::sync::Arc;

const PAGE: &str = "http://site.example/article";

#[test]
fn document_exception_on_ancestor_frame_wins_over_blocking_filter() {
    let (_, policy) = policy_for(
        "||ads.example^\n@@||site.example^$document",
        Preferences::default(),
    );
    let request = RequestDescriptor::new(
        "SCRIPT",
        "http://ads.example/x.js",
        frames(&["http://ads.example/x.js", "http://site.example/"]),
    );

    let decision = policy.should_allow(&request);
    assert!(decision.allow);
    let hit = decision.deciding_hit().unwrap();
    assert_eq!(hit.filter_kind, Some(FilterKind::Whitelist));
    assert_eq!(hit.filter_text.as_deref(), Some("@@||site.example^$document"));
    assert_eq!(hit.frame_index, Some(1));
    assert_eq!(hit.content_type, ContentType::Document);
}

#[test]
fn same_request_without_exception_is_blocked() {
    let (_, policy) = policy_for("||ads.example^", Preferences::default());
    let request = RequestDescriptor::new(
        "SCRIPT",
        "http://ads.example/x.js",
        frames(&["http://ads.example/x.js", "http://site.example/"]),
    );
    let decision = policy.should_allow(&request);
    assert!(!decision.allow);
    assert_eq!(
        decision.deciding_hit().unwrap().filter_kind,
        Some(FilterKind::Blocking)
    );
}

#[test]
fn generic_block_exception_keeps_domain_specific_filters() {
    let list = "/banner/*\n\
                /promo/*$domain=site.example\n\
                @@||site.example^$genericblock";
    let (_, policy) = policy_for(list, Preferences::default());

    let generic = policy.should_allow(&RequestDescriptor::new(
        "IMAGE",
        "http://cdn.example/banner/1.png",
        frames(&[PAGE]),
    ));
    assert!(generic.allow);
    assert_eq!(generic.hits[0].content_type, ContentType::GenericBlock);
    assert_eq!(generic.hits.last().unwrap().filter_text, None);

    let specific = policy.should_allow(&RequestDescriptor::new(
        "IMAGE",
        "http://cdn.example/promo/1.png",
        frames(&[PAGE]),
    ));
    assert!(!specific.allow);
    assert_eq!(
        specific.deciding_hit().unwrap().filter_text.as_deref(),
        Some("/promo/*$domain=site.example")
    );
}

#[test]
fn generic_filters_apply_without_generic_block_exception() {
    let (_, policy) = policy_for("/banner/*", Preferences::default());
    let decision = policy.should_allow(&RequestDescriptor::new(
        "IMAGE",
        "http://cdn.example/banner/1.png",
        frames(&[PAGE]),
    ));
    assert!(!decision.allow);
}

#[test]
fn collapse_follows_type_and_preferences() {
    let list = "||ads.example^\n||forced.example^$collapse";
    let (_, policy) = policy_for(list, Preferences::default());

    let script = policy.should_allow(&RequestDescriptor::new(
        "SCRIPT",
        "http://ads.example/a.js",
        frames(&[PAGE]),
    ));
    assert!(!script.allow);
    assert!(!script.collapse);

    let image = RequestDescriptor::new("IMAGE", "http://ads.example/a.png", frames(&[PAGE]));
    assert!(policy.should_allow(&image).collapse);

    policy.set_preferences(Preferences {
        fast_collapse: true,
        ..Preferences::default()
    });
    let decision = policy.should_allow(&image);
    assert!(!decision.allow);
    assert!(!decision.collapse);

    let forced = policy.should_allow(&RequestDescriptor::new(
        "IMAGE",
        "http://forced.example/a.png",
        frames(&[PAGE]),
    ));
    assert!(forced.collapse);
}

#[test]
fn exempt_schemes_and_disabled_filtering_allow_everything() {
    let (_, policy) = policy_for("*", Preferences::default());
    let data = policy.should_allow(&RequestDescriptor::new(
        "IMAGE",
        "data:image/png;base64,AAAA",
        frames(&[PAGE]),
    ));
    assert!(data.allow);
    assert!(data.hits.is_empty());

    policy.set_preferences(Preferences {
        enabled: false,
        ..Preferences::default()
    });
    let decision = policy.should_allow(&RequestDescriptor::new(
        "IMAGE",
        "http://ads.example/a.png",
        frames(&[PAGE]),
    ));
    assert!(decision.allow);
}

#[test]
fn private_hits_reach_observers_but_not_counters() {
    let (engine, policy) = policy_for("||ads.example^", Preferences::default());
    let statistics = Arc::new(HitStatistics::new());
    policy.recorder().add_observer(statistics.clone());

    let request = RequestDescriptor::new("IMAGE", "http://ads.example/a.png", frames(&[PAGE]));
    policy.should_allow(&request);
    policy.should_allow(&request.clone().private());

    assert_eq!(engine.storage.hit_count("||ads.example^"), 1);
    assert_eq!(statistics.filter_hits("||ads.example^"), 1);
}

#[test]
fn third_party_option_uses_top_frame_domain() {
    let (_, policy) = policy_for("||cdn.example^$third-party", Preferences::default());

    let foreign = policy.should_allow(&RequestDescriptor::new(
        "SCRIPT",
        "http://cdn.example/lib.js",
        frames(&[PAGE]),
    ));
    assert!(!foreign.allow);
    assert!(foreign.hits.last().unwrap().third_party);

    let first_party = policy.should_allow(&RequestDescriptor::new(
        "SCRIPT",
        "http://cdn.example/lib.js",
        frames(&["http://www.cdn.example/"]),
    ));
    assert!(first_party.allow);
}
