//! Site-key validation.
//!
//! A page may declare `<base64 public key>_<base64 signature>` on any frame.
//! The signature must cover `path \0 host[:port] \0 client identifier` of that
//! frame's own location, so a page cannot reuse a key signed for another site.

use crate::types::Frame;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use rsa::pkcs1v15::{Signature, VerifyingKey};
use rsa::pkcs8::DecodePublicKey;
use rsa::signature::Verifier;
use rsa::RsaPublicKey;
use sha1::Sha1;
use tracing::trace;
use url::Url;

/// Standard alphabet, accepting input with or without `=` padding.
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Checks a declared key/signature pair against signed data.
pub trait SignatureVerifier: Send + Sync {
    fn verify(&self, key: &str, signature: &str, data: &[u8]) -> bool;
}

/// RSASSA-PKCS1-v1_5 with SHA-1 over a DER SubjectPublicKeyInfo key.
#[derive(Debug, Clone, Copy, Default)]
pub struct RsaSha1Verifier;

impl SignatureVerifier for RsaSha1Verifier {
    fn verify(&self, key: &str, signature: &str, data: &[u8]) -> bool {
        let Ok(key_der) = LENIENT_BASE64.decode(key) else {
            return false;
        };
        let Ok(public_key) = RsaPublicKey::from_public_key_der(&key_der) else {
            return false;
        };
        let Ok(signature_bytes) = LENIENT_BASE64.decode(signature) else {
            return false;
        };
        let Ok(signature) = Signature::try_from(signature_bytes.as_slice()) else {
            return false;
        };
        VerifyingKey::<Sha1>::new(public_key)
            .verify(data, &signature)
            .is_ok()
    }
}

/// A verified site-key and the frame that declared it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteKey {
    /// Public key with `=` padding removed, as compared against `sitekey=` options.
    pub key: String,
    pub frame_index: usize,
}

pub struct SiteKeyValidator<'a> {
    verifier: &'a dyn SignatureVerifier,
    client_identifier: &'a str,
}

impl<'a> SiteKeyValidator<'a> {
    pub fn new(verifier: &'a dyn SignatureVerifier, client_identifier: &'a str) -> Self {
        Self {
            verifier,
            client_identifier,
        }
    }

    /// First valid site-key from the innermost frame outward.
    pub fn find(&self, frames: &[Frame]) -> Option<SiteKey> {
        self.find_from(frames, 0)
    }

    /// First valid site-key among `frames[start..]`; indices stay absolute.
    pub fn find_from(&self, frames: &[Frame], start: usize) -> Option<SiteKey> {
        frames
            .iter()
            .enumerate()
            .skip(start)
            .find_map(|(index, frame)| {
                let key = self.validate_frame(frame)?;
                Some(SiteKey {
                    key,
                    frame_index: index,
                })
            })
    }

    fn validate_frame(&self, frame: &Frame) -> Option<String> {
        let declaration = frame.site_key.as_deref()?;
        let mut parts = declaration.splitn(3, '_');
        let key = parts.next()?.replace('=', "");
        let signature = parts.next()?;
        if key.is_empty() || signature.is_empty() {
            return None;
        }

        let data = signed_data(&frame.location, self.client_identifier)?;
        if self.verifier.verify(&key, signature, data.as_bytes()) {
            Some(key)
        } else {
            trace!(location = %frame.location, "Ignoring site-key with invalid signature");
            None
        }
    }
}

/// The string a site-key signature covers for `location`.
pub fn signed_data(location: &str, client_identifier: &str) -> Option<String> {
    let url = Url::parse(location).ok()?;
    let mut path = url.path().to_string();
    if let Some(query) = url.query() {
        path.push('?');
        path.push_str(query);
    }
    let mut host = url.host_str()?.to_string();
    if let Some(port) = url.port() {
        host.push(':');
        host.push_str(&port.to_string());
    }
    Some([path.as_str(), host.as_str(), client_identifier].join("\0"))
}
