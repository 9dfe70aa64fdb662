// src/jwks.rs

//! Fetching, storing and invalidating a provider's signing key set.
//!
//! The refresh decision runs when a provider configuration is saved, not on each
//! token validation: steady-state validation reads the key set reconstructed from
//! `cached_jwks_blob` and makes no network call.

use crate::client::{success_body, HttpFetcher};
use crate::config::ProviderConfig;
use crate::error::{FetchError, RpError, TokenError};
use jsonwebtoken::jwk::Jwk;
use jsonwebtoken::DecodingKey;
use moka::future::Cache;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// A JSON Web Key Set indexed by key id.
#[derive(Debug, Clone, Default)]
pub struct SigningKeySet {
    keys: HashMap<String, Jwk>,
}

impl SigningKeySet {
    /// Parses a JWKS document.
    ///
    /// The document must be a JSON object with a `keys` array. Individual entries that
    /// are not usable JWKs, or that carry no `kid`, are skipped.
    pub fn parse(blob: &str) -> Result<Self, String> {
        let document: serde_json::Value =
            serde_json::from_str(blob).map_err(|e| format!("not valid JSON: {}", e))?;
        let entries = document
            .get("keys")
            .and_then(serde_json::Value::as_array)
            .ok_or_else(|| "missing 'keys' array".to_string())?;

        let mut keys = HashMap::new();
        for entry in entries {
            let jwk: Jwk = match serde_json::from_value(entry.clone()) {
                Ok(jwk) => jwk,
                Err(e) => {
                    warn!("Skipping unusable JWK entry: {}", e);
                    continue;
                }
            };
            match jwk.common.key_id.clone() {
                Some(kid) => {
                    keys.entry(kid).or_insert(jwk);
                }
                None => debug!("Skipping JWK without 'kid'"),
            }
        }
        Ok(Self { keys })
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn contains(&self, kid: &str) -> bool {
        self.keys.contains_key(kid)
    }

    /// Returns the verification key for `kid`.
    pub fn decoding_key(&self, kid: &str) -> Result<DecodingKey, TokenError> {
        let jwk = self
            .keys
            .get(kid)
            .ok_or_else(|| TokenError::KeyNotFound(kid.to_string()))?;
        DecodingKey::from_jwk(jwk)
            .map_err(|e| TokenError::SignatureInvalid(format!("key '{}' is unusable: {}", kid, e)))
    }
}

/// What a refresh did to the provider's cached key set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JwksRefresh {
    /// No `jwks_uri` is configured; the cache was emptied.
    Cleared,
    /// The cached blob already belongs to the configured `jwks_uri`.
    Unchanged,
    /// A new key set was fetched.
    Fetched { keys: usize },
}

/// Refreshes provider key sets and hands out parsed [`SigningKeySet`]s.
#[derive(Clone)]
pub struct JwksCache {
    // The cache is internally ref-counted to allow for cheap cloning.
    inner: Arc<Inner>,
}

struct Inner {
    fetcher: Arc<dyn HttpFetcher>,
    // Parsed key sets keyed by the SHA-256 of the raw blob.
    parsed: Cache<String, Arc<SigningKeySet>>,
}

fn blob_digest(blob: &str) -> String {
    Sha256::digest(blob.as_bytes())
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

impl JwksCache {
    pub fn new(fetcher: Arc<dyn HttpFetcher>) -> Self {
        Self {
            inner: Arc::new(Inner {
                fetcher,
                parsed: Cache::new(100),
            }),
        }
    }

    /// Applies the refresh policy to `config`.
    ///
    /// * no `jwks_uri`: clear the cached blob and uri;
    /// * `jwks_uri` equal to `cached_jwks_uri` with a blob present: nothing to do;
    /// * otherwise: fetch `jwks_uri`, store the raw body and record the uri.
    ///
    /// On failure `config` is left unchanged.
    #[instrument(skip_all, fields(provider = %config.id), err)]
    pub async fn refresh(&self, config: &mut ProviderConfig) -> Result<JwksRefresh, FetchError> {
        let Some(jwks_uri) = config.jwks_uri.clone() else {
            if config.cached_jwks_blob.is_some() || config.cached_jwks_uri.is_some() {
                debug!("No jwks_uri configured; clearing cached key set");
            }
            config.cached_jwks_blob = None;
            config.cached_jwks_uri = None;
            return Ok(JwksRefresh::Cleared);
        };

        if config.cached_jwks_uri.as_deref() == Some(jwks_uri.as_str())
            && config.cached_jwks_blob.is_some()
        {
            debug!("Cached key set is current for {}", jwks_uri);
            return Ok(JwksRefresh::Unchanged);
        }

        let (blob, key_set) = self.fetch_key_set(&jwks_uri).await?;
        let keys = key_set.len();
        config.cached_jwks_blob = Some(blob);
        config.cached_jwks_uri = Some(jwks_uri.to_string());
        info!("Fetched {} signing keys from {}", keys, jwks_uri);
        Ok(JwksRefresh::Fetched { keys })
    }

    /// Fetches and parses the key set at `jwks_uri` without touching any configuration.
    #[instrument(skip(self), err)]
    pub async fn fetch_key_set(
        &self,
        jwks_uri: &Url,
    ) -> Result<(String, Arc<SigningKeySet>), FetchError> {
        let response = self.inner.fetcher.get(jwks_uri).await?;
        let body = success_body(jwks_uri, response)?;
        let blob = String::from_utf8(body.to_vec())
            .map_err(|e| FetchError::parse(jwks_uri.as_str(), e))?;
        let key_set = SigningKeySet::parse(&blob)
            .map_err(|e| FetchError::parse(jwks_uri.as_str(), e))?;

        let key_set = Arc::new(key_set);
        self.inner
            .parsed
            .insert(blob_digest(&blob), key_set.clone())
            .await;
        Ok((blob, key_set))
    }

    /// The signing key set currently cached on `config`.
    ///
    /// A provider without a cached blob has an empty key set, so every lookup misses.
    pub async fn key_set(&self, config: &ProviderConfig) -> Result<Arc<SigningKeySet>, TokenError> {
        let Some(blob) = config.cached_jwks_blob.as_deref() else {
            return Ok(Arc::new(SigningKeySet::default()));
        };

        let digest = blob_digest(blob);
        if let Some(key_set) = self.inner.parsed.get(&digest).await {
            return Ok(key_set);
        }

        let key_set = Arc::new(SigningKeySet::parse(blob).map_err(|e| {
            TokenError::SignatureInvalid(format!("cached key set is unreadable: {}", e))
        })?);
        self.inner.parsed.insert(digest, key_set.clone()).await;
        Ok(key_set)
    }
}

impl ProviderConfig {
    /// Replaces the cached key set with an administrator-supplied document.
    ///
    /// The document must be a well-formed JWKS. `cached_jwks_uri` is not changed.
    pub fn set_cached_jwks(&mut self, blob: &str) -> Result<(), RpError> {
        SigningKeySet::parse(blob).map_err(RpError::InvalidJwks)?;
        self.cached_jwks_blob = Some(blob.to_string());
        Ok(())
    }
}
