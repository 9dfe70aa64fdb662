// src/validator/mod.rs

pub mod claims;
pub mod variant;

use crate::config::ProviderConfig;
use crate::error::TokenError;
use crate::flags::{FeatureFlags, STRICT_TOKEN_VALIDATION};
use crate::jwks::JwksCache;
use crate::model::ValidatedClaims;
use base64::engine::{general_purpose::URL_SAFE_NO_PAD, Engine};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Header, Validation};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, instrument, warn};
use variant::ClaimsCheck;

/// The OIDC ID Token validator.
///
/// Runs one token through decode, signature check, claims checks and variant
/// checks, rejecting at the first failure. Cheap to clone; one instance can
/// serve any number of concurrent authentication attempts.
#[derive(Clone)]
pub struct IdTokenValidator {
    config: Arc<ProviderConfig>,
    jwks: JwksCache,
    flags: Arc<dyn FeatureFlags>,
    extra_checks: Vec<Arc<dyn ClaimsCheck>>,
    refresh_on_unknown_kid: bool,
}

fn now_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

fn is_symmetric(alg: Algorithm) -> bool {
    matches!(alg, Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512)
}

/// Step 1: the token must be a three-segment compact JWS with a readable header.
fn decode_compact(token: &str) -> Result<Header, TokenError> {
    let segments: Vec<&str> = token.split('.').collect();
    if segments.len() != 3 || segments.iter().any(|s| s.is_empty()) {
        return Err(TokenError::Malformed(
            "expected three non-empty dot-separated segments".to_string(),
        ));
    }
    let header = decode_header(token).map_err(|e| TokenError::Malformed(e.to_string()))?;
    URL_SAFE_NO_PAD
        .decode(segments[1])
        .map_err(|e| TokenError::Malformed(format!("payload segment: {}", e)))?;
    Ok(header)
}

fn signature_error(err: jsonwebtoken::errors::Error) -> TokenError {
    match err.kind() {
        // Header and payload encoding were checked while decoding, so a base64
        // failure here comes from the signature segment.
        ErrorKind::Base64(_) => {
            TokenError::SignatureInvalid(format!("signature segment: {}", err))
        }
        ErrorKind::InvalidToken | ErrorKind::Json(_) | ErrorKind::Utf8(_) => {
            TokenError::Malformed(err.to_string())
        }
        ErrorKind::InvalidSignature => {
            TokenError::SignatureInvalid("signature does not verify".to_string())
        }
        _ => TokenError::SignatureInvalid(err.to_string()),
    }
}

impl IdTokenValidator {
    /// Creates a new validator for `config`, reading signing keys through `jwks`.
    pub fn new(config: ProviderConfig, jwks: JwksCache, flags: Arc<dyn FeatureFlags>) -> Self {
        Self {
            config: Arc::new(config),
            jwks,
            flags,
            extra_checks: Vec::new(),
            refresh_on_unknown_kid: false,
        }
    }

    /// On an unknown `kid`, fetch `jwks_uri` once and retry the lookup.
    ///
    /// The fetched set is only used for this validation; the stored configuration
    /// is refreshed on the next save.
    pub fn refresh_on_unknown_kid(mut self, enabled: bool) -> Self {
        self.refresh_on_unknown_kid = enabled;
        self
    }

    /// Adds a check that runs after the provider variant's own checks.
    pub fn with_check(mut self, check: Arc<dyn ClaimsCheck>) -> Self {
        self.extra_checks.push(check);
        self
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    fn strict(&self) -> bool {
        self.flags
            .enabled(STRICT_TOKEN_VALIDATION, &self.config.account)
    }

    /// Validates an OIDC ID Token.
    ///
    /// # Arguments
    ///
    /// * `token` - The raw ID Token string.
    /// * `expected_nonce` - The nonce generated for this authentication attempt.
    ///   Only consulted when strict validation is enabled.
    pub async fn validate(
        &self,
        token: &str,
        expected_nonce: Option<&str>,
    ) -> Result<ValidatedClaims, TokenError> {
        self.validate_at(token, expected_nonce, now_seconds()).await
    }

    /// Like [`IdTokenValidator::validate`], with `now` (Unix seconds) as the validation time.
    #[instrument(skip(self, token, expected_nonce), fields(provider = %self.config.id))]
    pub async fn validate_at(
        &self,
        token: &str,
        expected_nonce: Option<&str>,
        now: u64,
    ) -> Result<ValidatedClaims, TokenError> {
        let result = self.run(token, expected_nonce, now).await;
        match &result {
            Ok(claims) => debug!(sub = ?claims.sub(), "ID token accepted"),
            Err(e) => warn!(stage = ?e.stage(), "ID token rejected: {}", e),
        }
        result
    }

    async fn run(
        &self,
        token: &str,
        expected_nonce: Option<&str>,
        now: u64,
    ) -> Result<ValidatedClaims, TokenError> {
        // 1. Decode.
        let header = decode_compact(token)?;
        if !self.config.validation.algorithms.contains(&header.alg) {
            return Err(TokenError::UnsupportedAlgorithm(format!("{:?}", header.alg)));
        }

        // 2. Signature.
        let key = self.resolve_key(&header).await?;
        let payload = self.verify_signature(token, header.alg, &key)?;

        // 3. Baseline claims.
        claims::check_baseline(&payload, &self.config)?;

        // 4. Strict claims.
        if self.strict() {
            claims::check_strict(&payload, &self.config, expected_nonce, now)?;
        }

        // 5. Variant checks.
        let validated = ValidatedClaims::new(payload, token);
        self.config.variant.check(&validated, &self.config)?;
        for check in &self.extra_checks {
            check.check(&validated, &self.config)?;
        }
        Ok(validated)
    }

    async fn resolve_key(&self, header: &Header) -> Result<DecodingKey, TokenError> {
        if is_symmetric(header.alg) {
            if self.config.client_secret.is_empty() {
                return Err(TokenError::SignatureInvalid(
                    "no client secret is configured for a symmetric algorithm".to_string(),
                ));
            }
            return Ok(DecodingKey::from_secret(self.config.client_secret.as_bytes()));
        }

        let kid = header.kid.as_deref().ok_or(TokenError::MissingKeyId)?;
        let key_set = self.jwks.key_set(&self.config).await?;
        match key_set.decoding_key(kid) {
            Err(TokenError::KeyNotFound(_)) if self.refresh_on_unknown_kid => {
                self.retry_with_fresh_keys(kid).await
            }
            other => other,
        }
    }

    async fn retry_with_fresh_keys(&self, kid: &str) -> Result<DecodingKey, TokenError> {
        let Some(jwks_uri) = self.config.jwks_uri.as_ref() else {
            return Err(TokenError::KeyNotFound(kid.to_string()));
        };
        debug!("Unknown kid {}; fetching {} once", kid, jwks_uri);
        match self.jwks.fetch_key_set(jwks_uri).await {
            Ok((_, key_set)) => key_set.decoding_key(kid),
            Err(e) => {
                warn!("Key set refresh for unknown kid {} failed: {}", kid, e);
                Err(TokenError::KeyNotFound(kid.to_string()))
            }
        }
    }

    /// Verifies the signature only; every claim check is performed by this crate.
    fn verify_signature(
        &self,
        token: &str,
        alg: Algorithm,
        key: &DecodingKey,
    ) -> Result<Map<String, Value>, TokenError> {
        let mut validation = Validation::new(alg);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        decode::<Map<String, Value>>(token, key, &validation)
            .map(|data| data.claims)
            .map_err(signature_error)
    }
}
