//! Property-based tests for decision stability

use content_policy::config::Preferences;
use content_policy::filters::{FilterEngine, FilterList};
use content_policy::policy::Policy;
use content_policy::types::{Frame, RequestDescriptor};
use proptest::prelude::*;

const LIST: &str = "||ads.example^\n\
                    /banner/*$image\n\
                    @@||site.example^$document\n\
                    @@||blog.example^$genericblock\n\
                    ||tracker.example^$third-party,collapse";

fn content_type() -> impl Strategy<Value = String> {
    prop::sample::select(vec![
        "IMAGE", "SCRIPT", "SUBDOCUMENT", "OBJECT", "MEDIA", "PING", "bogus", "POPUP",
    ])
    .prop_map(str::to_string)
}

fn location() -> impl Strategy<Value = String> {
    (
        prop::sample::select(vec![
            "ads.example",
            "tracker.example",
            "site.example",
            "blog.example",
            "cdn.example",
        ]),
        "[a-z]{0,6}",
        prop::sample::select(vec!["http", "https", "data", "about"]),
    )
        .prop_map(|(host, path, scheme)| format!("{}://{}/banner/{}", scheme, host, path))
}

fn frames() -> impl Strategy<Value = Vec<Frame>> {
    prop::collection::vec(
        prop::sample::select(vec![
            "http://site.example/",
            "http://blog.example/post",
            "http://news.example/",
        ])
        .prop_map(Frame::new),
        0..3,
    )
}

proptest! {
    /// Repeating a request against unchanged filters yields the same verdict.
    #[test]
    fn should_allow_is_idempotent(
        content_type in content_type(),
        location in location(),
        frames in frames(),
        fast_collapse in any::<bool>(),
    ) {
        let engine = FilterEngine::from_list(&FilterList::parse(LIST));
        let policy = Policy::from_engine(&engine, Preferences {
            fast_collapse,
            ..Preferences::default()
        });
        let request = RequestDescriptor::new(content_type, location, frames);

        let first = policy.should_allow(&request);
        let second = policy.should_allow(&request);
        prop_assert_eq!(first, second);
    }

    /// Only blocked requests collapse.
    #[test]
    fn collapse_implies_blocked(
        content_type in content_type(),
        location in location(),
        frames in frames(),
    ) {
        let engine = FilterEngine::from_list(&FilterList::parse(LIST));
        let policy = Policy::from_engine(&engine, Preferences::default());
        let decision = policy.should_allow(&RequestDescriptor::new(content_type, location, frames));
        prop_assert!(!(decision.allow && decision.collapse));
    }
}
