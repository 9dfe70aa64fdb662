// src/error.rs

use std::fmt;
use thiserror::Error;

/// The primary error type for the `openid-rp` library.
#[derive(Debug, Error)]
pub enum RpError {
    /// The provider configuration failed validation. Carries one error per offending field.
    #[error("Invalid provider configuration: {0}")]
    InvalidConfiguration(ValidationErrors),

    /// A provided URL could not be parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// A JSON Web Key Set supplied directly by an administrator is not well formed.
    #[error("Invalid JWKS document: {0}")]
    InvalidJwks(String),

    /// A remote document (discovery, JWKS, userinfo) could not be fetched or parsed.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// The ID token was rejected. This always aborts the authentication attempt.
    #[error(transparent)]
    Token(#[from] TokenError),

    /// The record store failed to load or persist a provider.
    #[error("Provider store error: {0}")]
    Store(String),

    /// No provider with the given id exists in the store.
    #[error("Provider not found: {0}")]
    ProviderNotFound(String),
}

/// A failure talking to, or understanding, a remote endpoint.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The request never produced a response (DNS, TLS, connect, timeout, ...).
    #[error("HTTP request to {url} failed: {message}")]
    Network { url: String, message: String },

    /// The endpoint answered with a non-2xx status.
    #[error("HTTP request to {url} returned status {status}")]
    Status { url: String, status: u16 },

    /// The response body was not the expected document.
    #[error("Response from {url} could not be parsed: {message}")]
    Parse { url: String, message: String },
}

impl FetchError {
    pub(crate) fn parse(url: &str, message: impl fmt::Display) -> Self {
        FetchError::Parse {
            url: url.to_string(),
            message: message.to_string(),
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        FetchError::Network {
            url: err.url().map(|u| u.to_string()).unwrap_or_default(),
            message: err.to_string(),
        }
    }
}

/// The stage of ID token validation at which a token was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationStage {
    /// Splitting the compact serialization and reading the header.
    Decoded,
    /// Resolving the key and verifying the signature.
    SignatureChecked,
    /// Baseline and strict claim checks.
    ClaimsChecked,
    /// Provider variant checks, the last step before acceptance.
    Accepted,
}

/// Why an ID token was rejected.
///
/// Distinct from [`RpError`]'s other variants so callers can tell a trust failure
/// apart from an infrastructure failure.
#[derive(Debug, Error, PartialEq)]
pub enum TokenError {
    /// The token is not a well-formed compact JWS.
    #[error("Malformed token: {0}")]
    Malformed(String),

    /// The header names an algorithm this provider does not accept.
    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// The header has no `kid`, so no key from the key set can be selected.
    #[error("The token header is missing the 'kid' (Key ID) field")]
    MissingKeyId,

    /// No key in the signing key set matches the token's `kid`.
    #[error("Key not found for kid: {0}")]
    KeyNotFound(String),

    /// The signature does not verify against the resolved key.
    #[error("Invalid signature: {0}")]
    SignatureInvalid(String),

    /// The `aud` claim names a different client and the token is not self-issued.
    #[error("Audience mismatch: expected '{expected}', got {actual}")]
    AudienceMismatch {
        expected: String,
        actual: serde_json::Value,
    },

    /// A claim required by strict validation is missing or wrong.
    #[error("Claim '{claim}' is invalid: {reason}")]
    ClaimInvalid { claim: String, reason: String },

    /// A provider variant rejected the token.
    #[error("Claim '{claim}' rejected by provider variant: {reason}")]
    VariantRejected { claim: String, reason: String },
}

impl TokenError {
    /// The validation stage that produced this error.
    pub fn stage(&self) -> ValidationStage {
        match self {
            TokenError::Malformed(_) | TokenError::UnsupportedAlgorithm(_) => {
                ValidationStage::Decoded
            }
            TokenError::MissingKeyId
            | TokenError::KeyNotFound(_)
            | TokenError::SignatureInvalid(_) => ValidationStage::SignatureChecked,
            TokenError::AudienceMismatch { .. } | TokenError::ClaimInvalid { .. } => {
                ValidationStage::ClaimsChecked
            }
            TokenError::VariantRejected { .. } => ValidationStage::Accepted,
        }
    }

    pub(crate) fn claim(claim: &str, reason: impl Into<String>) -> Self {
        TokenError::ClaimInvalid {
            claim: claim.to_string(),
            reason: reason.into(),
        }
    }
}

/// A validation error scoped to one configuration field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// The set of field-scoped errors produced by a configuration validity check.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.errors.push(FieldError {
            field: field.to_string(),
            message: message.into(),
        });
    }

    pub fn extend(&mut self, other: ValidationErrors) {
        self.errors.extend(other.errors);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Returns the errors recorded against `field`.
    pub fn on(&self, field: &str) -> impl Iterator<Item = &FieldError> {
        let field = field.to_string();
        self.errors.iter().filter(move |e| e.field == field)
    }

    pub fn has_error_on(&self, field: &str) -> bool {
        self.on(field).next().is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.errors.iter()
    }

    /// Converts to `Ok(())` when empty, otherwise to [`RpError::InvalidConfiguration`].
    pub fn into_result(self) -> Result<(), RpError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(RpError::InvalidConfiguration(self))
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .errors
            .iter()
            .map(|e| format!("{}: {}", e.field, e.message))
            .collect();
        f.write_str(&parts.join("; "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_errors_are_scoped() {
        let mut errors = ValidationErrors::new();
        errors.add("token_endpoint_auth_method", "is not a recognized value");
        errors.add("jwks_uri", "returned status 500");

        assert!(errors.has_error_on("token_endpoint_auth_method"));
        assert!(!errors.has_error_on("issuer"));
        assert_eq!(errors.on("jwks_uri").count(), 1);
        assert_eq!(
            errors.to_string(),
            "token_endpoint_auth_method: is not a recognized value; jwks_uri: returned status 500"
        );
        assert!(matches!(
            errors.into_result(),
            Err(RpError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn token_errors_report_their_stage() {
        assert_eq!(
            TokenError::Malformed("x".into()).stage(),
            ValidationStage::Decoded
        );
        assert_eq!(
            TokenError::KeyNotFound("k".into()).stage(),
            ValidationStage::SignatureChecked
        );
        assert_eq!(
            TokenError::claim("nonce", "mismatch").stage(),
            ValidationStage::ClaimsChecked
        );
        assert_eq!(
            TokenError::VariantRejected {
                claim: "tid".into(),
                reason: "mismatch".into()
            }
            .stage(),
            ValidationStage::Accepted
        );
    }
}
