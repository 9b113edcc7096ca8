use std::fmt;

use axum::http::HeaderMap;
use bytes::Bytes;
use ring::signature::{ED25519, UnparsedPublicKey};

use crate::{
    error::{AuthError, VerifierError},
    types::Interaction,
};

pub const SIGNATURE_HEADER: &str = "X-Signature-Ed25519";
pub const TIMESTAMP_HEADER: &str = "X-Signature-Timestamp";

/// The two signature headers, both required before the body is looked at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureHeaders {
    pub signature: String,
    pub timestamp: String,
}

impl SignatureHeaders {
    pub fn new(signature: Option<&str>, timestamp: Option<&str>) -> Result<Self, AuthError> {
        let signature = signature.ok_or(AuthError::MissingHeader(SIGNATURE_HEADER))?;
        let timestamp = timestamp.ok_or(AuthError::MissingHeader(TIMESTAMP_HEADER))?;

        Ok(Self {
            signature: signature.to_string(),
            timestamp: timestamp.to_string(),
        })
    }

    pub fn from_headers(headers: &HeaderMap) -> Result<Self, AuthError> {
        let header = |name: &str| headers.get(name).and_then(|value| value.to_str().ok());
        Self::new(header(SIGNATURE_HEADER), header(TIMESTAMP_HEADER))
    }
}

/// Checks Ed25519 signatures over `timestamp || body` with the application's
/// public key.
#[derive(Clone)]
pub struct SignatureVerifier {
    public_key: [u8; 32],
}

impl fmt::Debug for SignatureVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignatureVerifier")
            .field("public_key", &hex::encode(self.public_key))
            .finish()
    }
}

impl SignatureVerifier {
    pub fn from_hex(public_key: &str) -> Result<Self, VerifierError> {
        let bytes = hex::decode(public_key.trim())?;
        let public_key: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| VerifierError::Length(bytes.len()))?;
        Ok(Self { public_key })
    }

    pub fn from_bytes(public_key: [u8; 32]) -> Self {
        Self { public_key }
    }

    pub fn verify(&self, timestamp: &str, signature_hex: &str, body: &[u8]) -> bool {
        let headers = SignatureHeaders {
            signature: signature_hex.to_string(),
            timestamp: timestamp.to_string(),
        };
        self.check(&headers, body).is_ok()
    }

    /// Verifies the exact received bytes. Never feed this a re-serialised body.
    pub fn check(&self, headers: &SignatureHeaders, body: &[u8]) -> Result<(), AuthError> {
        let signature =
            hex::decode(headers.signature.trim()).map_err(|_| AuthError::MalformedSignature)?;

        let mut message = Vec::with_capacity(headers.timestamp.len() + body.len());
        message.extend_from_slice(headers.timestamp.as_bytes());
        message.extend_from_slice(body);

        UnparsedPublicKey::new(&ED25519, &self.public_key)
            .verify(&message, &signature)
            .map_err(|_| AuthError::SignatureMismatch)
    }

    /// Verifies then parses. A body that verifies but does not parse is still
    /// an authentication failure.
    pub fn authenticate(
        &self,
        headers: &SignatureHeaders,
        body: &[u8],
    ) -> Result<Interaction, AuthError> {
        self.check(headers, body)?;
        Ok(Interaction::parse(body)?)
    }
}

/// A request body as handed over by the serving layer: already buffered by an
/// upstream layer, or still a stream that has to be read to completion.
pub enum InboundBody {
    Buffered(Bytes),
    Text(String),
    Stream(axum::body::Body),
}

impl InboundBody {
    pub async fn collect(self, limit: usize) -> Result<Bytes, AuthError> {
        let bytes = match self {
            InboundBody::Buffered(bytes) => bytes,
            InboundBody::Text(text) => Bytes::from(text),
            InboundBody::Stream(body) => axum::body::to_bytes(body, limit)
                .await
                .map_err(|error| AuthError::BodyRead(error.to_string()))?,
        };

        if bytes.len() > limit {
            return Err(AuthError::BodyRead(format!(
                "body of {} bytes exceeds limit of {limit}",
                bytes.len()
            )));
        }

        Ok(bytes)
    }
}

impl From<Bytes> for InboundBody {
    fn from(value: Bytes) -> Self {
        Self::Buffered(value)
    }
}

impl From<String> for InboundBody {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<axum::body::Body> for InboundBody {
    fn from(value: axum::body::Body) -> Self {
        Self::Stream(value)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use axum::http::{HeaderMap, HeaderValue};
    use bytes::Bytes;
    use ring::signature::{Ed25519KeyPair, KeyPair};

    use super::{InboundBody, SIGNATURE_HEADER, SignatureHeaders, SignatureVerifier, TIMESTAMP_HEADER};
    use crate::error::{AuthError, VerifierError};

    pub(crate) fn test_keypair() -> Ed25519KeyPair {
        match Ed25519KeyPair::from_seed_unchecked(&[7_u8; 32]) {
            Ok(pair) => pair,
            Err(error) => panic!("failed to build keypair: {error}"),
        }
    }

    pub(crate) fn test_verifier() -> SignatureVerifier {
        let pair = test_keypair();
        match SignatureVerifier::from_hex(&hex::encode(pair.public_key().as_ref())) {
            Ok(verifier) => verifier,
            Err(error) => panic!("failed to build verifier: {error}"),
        }
    }

    pub(crate) fn sign(timestamp: &str, body: &[u8]) -> String {
        let mut message = timestamp.as_bytes().to_vec();
        message.extend_from_slice(body);
        hex::encode(test_keypair().sign(&message).as_ref())
    }

    const TIMESTAMP: &str = "1700000000";
    const BODY: &[u8] = br#"{"type":1,"id":"1","token":"t"}"#;

    #[test]
    fn accepts_matching_signature() {
        let verifier = test_verifier();
        let signature = sign(TIMESTAMP, BODY);

        assert!(verifier.verify(TIMESTAMP, &signature, BODY));
    }

    #[test]
    fn rejects_any_flipped_byte() {
        let verifier = test_verifier();
        let signature = sign(TIMESTAMP, BODY);

        for index in 0..BODY.len() {
            let mut body = BODY.to_vec();
            body[index] ^= 0x01;
            assert!(
                !verifier.verify(TIMESTAMP, &signature, &body),
                "body byte {index} flipped but still verified"
            );
        }

        for index in 0..TIMESTAMP.len() {
            let mut timestamp = TIMESTAMP.as_bytes().to_vec();
            timestamp[index] ^= 0x01;
            let timestamp = String::from_utf8_lossy(&timestamp).to_string();
            assert!(
                !verifier.verify(&timestamp, &signature, BODY),
                "timestamp byte {index} flipped but still verified"
            );
        }

        let raw_signature = match hex::decode(&signature) {
            Ok(bytes) => bytes,
            Err(error) => panic!("signature should be hex: {error}"),
        };
        for index in 0..raw_signature.len() {
            let mut flipped = raw_signature.clone();
            flipped[index] ^= 0x01;
            assert!(
                !verifier.verify(TIMESTAMP, &hex::encode(&flipped), BODY),
                "signature byte {index} flipped but still verified"
            );
        }
    }

    #[test]
    fn missing_headers_are_rejected_before_verification() {
        let missing_signature = SignatureHeaders::new(None, Some(TIMESTAMP));
        assert!(matches!(
            missing_signature,
            Err(AuthError::MissingHeader(SIGNATURE_HEADER))
        ));

        let missing_timestamp = SignatureHeaders::new(Some("abcd"), None);
        assert!(matches!(
            missing_timestamp,
            Err(AuthError::MissingHeader(TIMESTAMP_HEADER))
        ));
    }

    #[test]
    fn reads_headers_case_insensitively() {
        let mut headers = HeaderMap::new();
        headers.insert("x-signature-ed25519", HeaderValue::from_static("00ff"));
        headers.insert("x-signature-timestamp", HeaderValue::from_static("123"));

        let parsed = match SignatureHeaders::from_headers(&headers) {
            Ok(parsed) => parsed,
            Err(error) => panic!("headers should parse: {error}"),
        };
        assert_eq!(parsed.signature, "00ff");
        assert_eq!(parsed.timestamp, "123");
    }

    #[test]
    fn malformed_signature_hex_is_rejected() {
        let verifier = test_verifier();
        let headers = SignatureHeaders {
            signature: "not-hex".to_string(),
            timestamp: TIMESTAMP.to_string(),
        };

        assert!(matches!(
            verifier.check(&headers, BODY),
            Err(AuthError::MalformedSignature)
        ));
    }

    #[test]
    fn verified_but_malformed_json_is_an_auth_failure() {
        let verifier = test_verifier();
        let body = b"{\"type\":";
        let headers = SignatureHeaders {
            signature: sign(TIMESTAMP, body),
            timestamp: TIMESTAMP.to_string(),
        };

        assert!(matches!(
            verifier.authenticate(&headers, body),
            Err(AuthError::MalformedPayload(_))
        ));
    }

    #[test]
    fn rejects_public_keys_of_wrong_length() {
        assert!(matches!(
            SignatureVerifier::from_hex("abcd"),
            Err(VerifierError::Length(2))
        ));
        assert!(matches!(
            SignatureVerifier::from_hex("zz"),
            Err(VerifierError::Hex(_))
        ));
    }

    #[tokio::test]
    async fn streamed_and_buffered_bodies_verify_identically() {
        let verifier = test_verifier();
        let headers = SignatureHeaders {
            signature: sign(TIMESTAMP, BODY),
            timestamp: TIMESTAMP.to_string(),
        };

        let bodies = [
            InboundBody::from(Bytes::from_static(BODY)),
            InboundBody::from(String::from_utf8_lossy(BODY).to_string()),
            InboundBody::from(axum::body::Body::from(BODY.to_vec())),
        ];

        for body in bodies {
            let bytes = match body.collect(1024).await {
                Ok(bytes) => bytes,
                Err(error) => panic!("body should collect: {error}"),
            };
            assert!(verifier.check(&headers, &bytes).is_ok());
        }
    }

    #[tokio::test]
    async fn oversized_body_is_rejected() {
        let body = InboundBody::from(axum::body::Body::from(vec![b'a'; 64]));

        assert!(matches!(body.collect(16).await, Err(AuthError::BodyRead(_))));
    }
}
