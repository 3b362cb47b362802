//! Element hiding status and hit registration for content-side callers.

use crate::policy::classify::{host_of, is_blockable_scheme};
use crate::policy::composer::Policy;
use crate::policy::sitekey::SiteKeyValidator;
use crate::policy::whitelist::{WhitelistKind, WhitelistResolver};
use crate::types::{
    ContentType, ElemHideHitFields, ElemHideHitRequest, ElemHideQuery, ElemHideStatus, HitRecord,
};

impl Policy {
    /// Whether element hiding should run for a frame chain.
    ///
    /// A generic hiding exception keeps it enabled (only generic selectors are
    /// dropped) but still reports the exception.
    pub fn elemhide_enabled(&self, query: &ElemHideQuery) -> ElemHideStatus {
        let prefs = self.preferences.read().clone();
        let Some(requesting) = query.frames.first() else {
            return ElemHideStatus::disabled();
        };
        if !prefs.enabled || !is_blockable_scheme(&requesting.location, &prefs.whitelist_schemes) {
            return ElemHideStatus::disabled();
        }

        let validator = SiteKeyValidator::new(self.verifier.as_ref(), &prefs.client_identifier);
        let Some(hit) =
            WhitelistResolver::new(self.matcher.as_ref(), &validator).resolve(&query.frames, true)
        else {
            return ElemHideStatus::enabled();
        };

        let record = hit.to_record();
        self.recorder
            .record(&record, Some(hit.filter.as_ref()), query.is_private);

        ElemHideStatus {
            enabled: hit.kind == WhitelistKind::GenericHide,
            hit: Some(ElemHideHitFields {
                content_type: record.content_type,
                doc_domain: record.doc_domain,
                third_party: record.third_party,
                location: record.location,
                filter: hit.filter.text().to_string(),
                filter_type: hit.filter.kind(),
            }),
        }
    }

    /// Record that the content side hid an element with the filter behind `key`.
    pub fn register_elemhide_hit(&self, request: &ElemHideHitRequest) -> Option<HitRecord> {
        let filter = self.elemhide.filter_by_key(&request.key)?;
        let elemhide = filter.as_elemhide()?;

        let record = HitRecord {
            frame_index: None,
            content_type: ContentType::ElemHide,
            doc_domain: request.frames.first().and_then(|f| host_of(&f.location)),
            third_party: false,
            location: elemhide.hit_location(),
            filter_text: Some(filter.text().to_string()),
            filter_kind: Some(filter.kind()),
        };
        self.recorder
            .record(&record, Some(filter.as_ref()), request.is_private);
        Some(record)
    }
}

#[cfg(test)]
mod tests {
    use crate::config::Preferences;
    use crate::filters::{FilterEngine, FilterList, FilterStorage};
    use crate::policy::Policy;
    use crate::types::*;

    fn setup(list: &str) -> (Policy, FilterEngine) {
        let engine = FilterEngine::from_list(&FilterList::parse(list));
        (Policy::from_engine(&engine, Preferences::default()), engine)
    }

    fn query(location: &str) -> ElemHideQuery {
        ElemHideQuery {
            frames: vec![Frame::new(location)],
            is_private: false,
        }
    }

    #[test]
    fn enabled_without_exceptions() {
        let (policy, _) = setup("##.ad");
        assert_eq!(policy.elemhide_enabled(&query("http://site.example/")), ElemHideStatus::enabled());
    }

    #[test]
    fn disabled_for_empty_chain_exempt_scheme_or_global_switch() {
        let (policy, _) = setup("##.ad");
        let empty = ElemHideQuery {
            frames: Vec::new(),
            is_private: false,
        };
        assert!(!policy.elemhide_enabled(&empty).enabled);
        assert!(!policy.elemhide_enabled(&query("about:blank")).enabled);

        policy.set_preferences(Preferences {
            enabled: false,
            ..Preferences::default()
        });
        assert!(!policy.elemhide_enabled(&query("http://site.example/")).enabled);
    }

    #[test]
    fn elemhide_exception_disables_and_reports_hit() {
        let (policy, engine) = setup("@@||site.example^$elemhide");
        let status = policy.elemhide_enabled(&query("http://site.example/"));
        assert!(!status.enabled);
        let hit = status.hit.unwrap();
        assert_eq!(hit.content_type, ContentType::ElemHide);
        assert_eq!(hit.filter, "@@||site.example^$elemhide");
        assert_eq!(hit.filter_type, FilterKind::Whitelist);
        assert_eq!(engine.storage.hit_count("@@||site.example^$elemhide"), 1);
    }

    #[test]
    fn generichide_keeps_hiding_enabled() {
        let (policy, _) = setup("@@||site.example^$generichide");
        let status = policy.elemhide_enabled(&query("http://site.example/"));
        assert!(status.enabled);
        assert_eq!(status.hit.unwrap().content_type, ContentType::GenericHide);
    }

    #[test]
    fn status_serializes_hit_fields_flat() {
        let (policy, _) = setup("@@||site.example^$document");
        let status = policy.elemhide_enabled(&query("http://site.example/"));
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["enabled"], false);
        assert_eq!(json["contentType"], "DOCUMENT");
        assert_eq!(json["filterType"], "whitelist");
        assert_eq!(
            serde_json::to_value(ElemHideStatus::enabled()).unwrap(),
            serde_json::json!({"enabled": true})
        );
    }

    #[test]
    fn register_hit_counts_unless_private() {
        let (policy, engine) = setup("site.example##.ad");
        let key = engine.elemhide.key_for("site.example##.ad").unwrap();
        let mut request = ElemHideHitRequest {
            key,
            frames: vec![Frame::new("http://www.site.example/")],
            is_private: false,
        };

        let record = policy.register_elemhide_hit(&request).unwrap();
        assert_eq!(record.location, "##.ad");
        assert_eq!(record.doc_domain.as_deref(), Some("www.site.example"));
        assert_eq!(record.filter_kind, Some(FilterKind::ElemHide));
        assert!(!record.third_party);

        request.is_private = true;
        assert!(policy.register_elemhide_hit(&request).is_some());
        assert_eq!(engine.storage.hit_count("site.example##.ad"), 1);

        request.key = "H404".to_string();
        assert!(policy.register_elemhide_hit(&request).is_none());
    }
}
