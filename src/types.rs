//! Request, hit and decision types exchanged between the interception point
//! and the policy engine.
//!
//! Field names serialize in camelCase, the shape carried by the `shouldAllow`,
//! `elemhideEnabled` and `registerElemHideHit` messages.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Content type vocabulary understood by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContentType {
    #[serde(rename = "OTHER")]
    Other,
    #[serde(rename = "SCRIPT")]
    Script,
    #[serde(rename = "IMAGE")]
    Image,
    #[serde(rename = "STYLESHEET")]
    Stylesheet,
    #[serde(rename = "OBJECT")]
    Object,
    #[serde(rename = "SUBDOCUMENT")]
    Subdocument,
    #[serde(rename = "DOCUMENT")]
    Document,
    #[serde(rename = "XMLHTTPREQUEST")]
    XmlHttpRequest,
    #[serde(rename = "OBJECT_SUBREQUEST")]
    ObjectSubrequest,
    #[serde(rename = "FONT")]
    Font,
    #[serde(rename = "MEDIA")]
    Media,
    #[serde(rename = "PING")]
    Ping,
    #[serde(rename = "WEBSOCKET")]
    WebSocket,
    #[serde(rename = "ELEMHIDE")]
    ElemHide,
    #[serde(rename = "POPUP")]
    Popup,
    #[serde(rename = "GENERICHIDE")]
    GenericHide,
    #[serde(rename = "GENERICBLOCK")]
    GenericBlock,
}

impl ContentType {
    pub const ALL: [ContentType; 17] = [
        ContentType::Other,
        ContentType::Script,
        ContentType::Image,
        ContentType::Stylesheet,
        ContentType::Object,
        ContentType::Subdocument,
        ContentType::Document,
        ContentType::XmlHttpRequest,
        ContentType::ObjectSubrequest,
        ContentType::Font,
        ContentType::Media,
        ContentType::Ping,
        ContentType::WebSocket,
        ContentType::ElemHide,
        ContentType::Popup,
        ContentType::GenericHide,
        ContentType::GenericBlock,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ContentType::Other => "OTHER",
            ContentType::Script => "SCRIPT",
            ContentType::Image => "IMAGE",
            ContentType::Stylesheet => "STYLESHEET",
            ContentType::Object => "OBJECT",
            ContentType::Subdocument => "SUBDOCUMENT",
            ContentType::Document => "DOCUMENT",
            ContentType::XmlHttpRequest => "XMLHTTPREQUEST",
            ContentType::ObjectSubrequest => "OBJECT_SUBREQUEST",
            ContentType::Font => "FONT",
            ContentType::Media => "MEDIA",
            ContentType::Ping => "PING",
            ContentType::WebSocket => "WEBSOCKET",
            ContentType::ElemHide => "ELEMHIDE",
            ContentType::Popup => "POPUP",
            ContentType::GenericHide => "GENERICHIDE",
            ContentType::GenericBlock => "GENERICBLOCK",
        }
    }

    /// Map a host-reported type onto the vocabulary.
    ///
    /// Host aliases are folded first; anything still unknown becomes `Other`.
    pub fn normalize(raw: &str) -> ContentType {
        let upper = raw.trim().to_ascii_uppercase();
        let canonical = match upper.as_str() {
            "BEACON" => "PING",
            "IMAGESET" => "IMAGE",
            "FETCH" => "XMLHTTPREQUEST",
            other => other,
        };
        canonical.parse().unwrap_or(ContentType::Other)
    }

    /// False for types with no area on the page; blocking those never collapses.
    pub fn is_visual(self) -> bool {
        !matches!(
            self,
            ContentType::Script
                | ContentType::Stylesheet
                | ContentType::XmlHttpRequest
                | ContentType::ObjectSubrequest
                | ContentType::Font
                | ContentType::Ping
                | ContentType::WebSocket
                | ContentType::ElemHide
                | ContentType::Popup
                | ContentType::GenericHide
                | ContentType::GenericBlock
        )
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownContentType(pub String);

impl fmt::Display for UnknownContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown content type '{}'", self.0)
    }
}

impl std::error::Error for UnknownContentType {}

impl FromStr for ContentType {
    type Err = UnknownContentType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ContentType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| UnknownContentType(s.to_string()))
    }
}

/// One entry of the frame hierarchy, innermost first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Frame {
    pub location: String,
    #[serde(default)]
    pub site_key: Option<String>,
}

impl Frame {
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            site_key: None,
        }
    }

    pub fn with_site_key(location: impl Into<String>, site_key: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            site_key: Some(site_key.into()),
        }
    }
}

/// A single load attempt submitted for a decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestDescriptor {
    /// Type as reported by the host, normalized by the engine.
    pub content_type: String,
    /// Request location, or an element-hiding filter key for ELEMHIDE requests.
    pub location: String,
    pub frames: Vec<Frame>,
    #[serde(default)]
    pub is_private: bool,
}

impl RequestDescriptor {
    pub fn new(
        content_type: impl Into<String>,
        location: impl Into<String>,
        frames: Vec<Frame>,
    ) -> Self {
        Self {
            content_type: content_type.into(),
            location: location.into(),
            frames,
            is_private: false,
        }
    }

    pub fn private(mut self) -> Self {
        self.is_private = true;
        self
    }
}

/// Kind tag of a filter, as reported in hit records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterKind {
    Blocking,
    Whitelist,
    ElemHide,
    ElemHideException,
    Comment,
    Invalid,
}

impl FilterKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FilterKind::Blocking => "blocking",
            FilterKind::Whitelist => "whitelist",
            FilterKind::ElemHide => "elemhide",
            FilterKind::ElemHideException => "elemhideexception",
            FilterKind::Comment => "comment",
            FilterKind::Invalid => "invalid",
        }
    }
}

/// One examined frame or final match, reported alongside a decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HitRecord {
    /// Frame the hit applies to; `None` means the request itself.
    pub frame_index: Option<usize>,
    pub content_type: ContentType,
    pub doc_domain: Option<String>,
    pub third_party: bool,
    pub location: String,
    #[serde(rename = "filter")]
    pub filter_text: Option<String>,
    #[serde(rename = "filterType")]
    pub filter_kind: Option<FilterKind>,
}

/// Verdict for one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub allow: bool,
    pub collapse: bool,
    pub hits: Vec<HitRecord>,
}

impl Decision {
    pub fn allowed() -> Self {
        Self {
            allow: true,
            collapse: false,
            hits: Vec::new(),
        }
    }

    /// Default applied by an interception point that never received a verdict.
    pub fn fail_safe() -> Self {
        Self {
            allow: false,
            collapse: false,
            hits: Vec::new(),
        }
    }

    /// The hit that decided `allow`, if a blocking or whitelist filter applied.
    pub fn deciding_hit(&self) -> Option<&HitRecord> {
        self.hits.iter().rev().find(|hit| {
            matches!(
                hit.filter_kind,
                Some(FilterKind::Blocking) | Some(FilterKind::Whitelist)
            )
        })
    }
}

/// Payload of the `elemhideEnabled` message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElemHideQuery {
    pub frames: Vec<Frame>,
    #[serde(default)]
    pub is_private: bool,
}

/// Hit fields attached to an `elemhideEnabled` answer when an exception applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElemHideHitFields {
    pub content_type: ContentType,
    pub doc_domain: Option<String>,
    pub third_party: bool,
    pub location: String,
    pub filter: String,
    pub filter_type: FilterKind,
}

/// Response of the `elemhideEnabled` message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElemHideStatus {
    pub enabled: bool,
    #[serde(flatten, skip_serializing_if = "Option::is_none")]
    pub hit: Option<ElemHideHitFields>,
}

impl ElemHideStatus {
    pub fn enabled() -> Self {
        Self {
            enabled: true,
            hit: None,
        }
    }

    pub fn disabled() -> Self {
        Self {
            enabled: false,
            hit: None,
        }
    }
}

/// Payload of the `registerElemHideHit` message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElemHideHitRequest {
    pub key: String,
    pub frames: Vec<Frame>,
    #[serde(default)]
    pub is_private: bool,
}
