//! Site-key signatures checked with real RSA keys

use super::test_utils::policy_for;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use content_policy::config::{Preferences, DEFAULT_CLIENT_IDENTIFIER};
use content_policy::policy::sitekey::signed_data;
use content_policy::policy::{RsaSha1Verifier, SiteKeyValidator};
use content_policy::types::{Frame, RequestDescriptor};
use rand::rngs::OsRng;
use rsa::pkcs1v15::SigningKey;
use rsa::pkcs8::EncodePublicKey;
use rsa::signature::{SignatureEncoding, Signer};
use rsa::RsaPrivateKey;
use sha1::Sha1;

struct TestKey {
    signing: SigningKey<Sha1>,
    public_b64: String,
}

impl TestKey {
    fn generate() -> Self {
        let private = RsaPrivateKey::new(&mut OsRng, 512).unwrap();
        let der = private.to_public_key().to_public_key_der().unwrap();
        Self {
            signing: SigningKey::<Sha1>::new(private),
            public_b64: STANDARD.encode(der.as_bytes()),
        }
    }

    /// The key as it appears in `sitekey=` options.
    fn filter_key(&self) -> String {
        self.public_b64.trim_end_matches('=').to_string()
    }

    /// A `<key>_<signature>` declaration valid for `location`.
    fn declare(&self, location: &str) -> String {
        let data = signed_data(location, DEFAULT_CLIENT_IDENTIFIER).unwrap();
        let signature = self.signing.sign(data.as_bytes());
        format!("{}_{}", self.public_b64, STANDARD.encode(signature.to_bytes()))
    }
}

#[test]
fn innermost_valid_key_is_used() {
    let inner = TestKey::generate();
    let outer = TestKey::generate();
    let frames = vec![
        Frame::with_site_key("http://inner.example/frame", inner.declare("http://inner.example/frame")),
        Frame::with_site_key("http://outer.example/", outer.declare("http://outer.example/")),
    ];

    let verifier = RsaSha1Verifier;
    let validator = SiteKeyValidator::new(&verifier, DEFAULT_CLIENT_IDENTIFIER);
    let found = validator.find(&frames).unwrap();
    assert_eq!(found.key, inner.filter_key());
    assert_eq!(found.frame_index, 0);
}

#[test]
fn key_signed_for_another_location_is_ignored() {
    let key = TestKey::generate();
    let frames = vec![
        Frame::with_site_key("http://evil.example/", key.declare("http://good.example/")),
        Frame::with_site_key("http://good.example/", key.declare("http://good.example/")),
    ];

    let verifier = RsaSha1Verifier;
    let validator = SiteKeyValidator::new(&verifier, DEFAULT_CLIENT_IDENTIFIER);
    let found = validator.find(&frames).unwrap();
    assert_eq!(found.frame_index, 1);
}

#[test]
fn tampered_signature_is_rejected() {
    let key = TestKey::generate();
    let declaration = key.declare("http://site.example/");
    let (public, _) = declaration.split_once('_').unwrap();
    let forged = format!("{}_{}", public, STANDARD.encode([0u8; 64]));

    let verifier = RsaSha1Verifier;
    let validator = SiteKeyValidator::new(&verifier, DEFAULT_CLIENT_IDENTIFIER);
    assert!(validator
        .find(&[Frame::with_site_key("http://site.example/", forged)])
        .is_none());
}

#[test]
fn sitekey_exception_allows_signed_page() {
    let key = TestKey::generate();
    let list = format!(
        "||ads.example^\n@@$document,sitekey={}",
        key.filter_key()
    );
    let (_, policy) = policy_for(&list, Preferences::default());

    let signed = vec![Frame::with_site_key(
        "http://parked.example/",
        key.declare("http://parked.example/"),
    )];
    let decision = policy.should_allow(&RequestDescriptor::new(
        "SCRIPT",
        "http://ads.example/a.js",
        signed,
    ));
    assert!(decision.allow);

    let unsigned = vec![Frame::new("http://parked.example/")];
    let decision = policy.should_allow(&RequestDescriptor::new(
        "SCRIPT",
        "http://ads.example/a.js",
        unsigned,
    ));
    assert!(!decision.allow);
}

#[test]
fn outer_key_exception_applies_from_the_signers_parent() {
    let inner = TestKey::generate();
    let outer = TestKey::generate();
    let frames = vec![
        Frame::with_site_key("http://widget.example/", inner.declare("http://widget.example/")),
        Frame::new("http://embed.example/"),
        Frame::with_site_key("http://portal.example/", outer.declare("http://portal.example/")),
    ];
    let (_, policy) = policy_for(
        &format!(
            "||ads.example^\n||tracker.example^$sitekey={}\n@@||embed.example^$document,sitekey={}",
            inner.filter_key(),
            outer.filter_key()
        ),
        Preferences::default(),
    );

    let exempted = policy.should_allow(&RequestDescriptor::new(
        "SCRIPT",
        "http://ads.example/a.js",
        frames.clone(),
    ));
    assert!(exempted.allow);
    let hit = exempted.deciding_hit().unwrap();
    assert_eq!(hit.frame_index, Some(1));

    // Request matching sees the innermost key even though an outer one is valid.
    let plain = vec![frames[0].clone(), frames[2].clone()];
    let decision = policy.should_allow(&RequestDescriptor::new(
        "SCRIPT",
        "http://tracker.example/t.js",
        plain,
    ));
    assert!(!decision.allow);
    assert_eq!(
        decision.deciding_hit().unwrap().filter_text.as_deref(),
        Some(format!("||tracker.example^$sitekey={}", inner.filter_key()).as_str())
    );
}
