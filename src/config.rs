// src/config.rs

use crate::auth_method::AuthMethodSetting;
use crate::error::{RpError, ValidationErrors};
use crate::validator::variant::ProviderVariant;
use jsonwebtoken::Algorithm;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use url::Url;

/// Contains the validation settings for an OIDC ID Token.
///
/// Which algorithms are accepted, and how much clock skew is tolerated when
/// strict validation checks `exp`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationSettings {
    /// The signing algorithms that are permitted for the ID Token.
    /// Tokens signed with any other algorithm will be rejected.
    pub algorithms: Vec<Algorithm>,
    /// Clock skew tolerance in seconds for the `exp` check. Defaults to 0.
    pub leeway_seconds: u64,
}

impl Default for ValidationSettings {
    fn default() -> Self {
        Self {
            // RS256 for JWKS-signed tokens, HS256 for tokens signed with the client secret.
            algorithms: vec![Algorithm::RS256, Algorithm::HS256],
            leeway_seconds: 0,
        }
    }
}

/// A provider claim copied onto a local user attribute at login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FederatedAttribute {
    /// The source claim name, e.g. `email` or `given_name`.
    pub attribute: String,
}

impl FederatedAttribute {
    pub fn new(attribute: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
        }
    }
}

/// The persistent identity/trust configuration of one OpenID Connect provider.
///
/// Created by an administrator, persisted through a [`crate::store::ProviderStore`],
/// and refreshed by [`crate::provider::validate_and_refresh`] before every save.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Record key in the provider store.
    pub id: String,
    /// The account that owns this provider; the scope for feature-flag lookups.
    pub account: String,
    /// The authoritative `iss` of tokens minted by this provider.
    pub issuer: Option<String>,
    #[serde(deserialize_with = "blank_url_as_none")]
    pub authorize_url: Option<Url>,
    #[serde(deserialize_with = "blank_url_as_none")]
    pub token_url: Option<Url>,
    #[serde(deserialize_with = "blank_url_as_none")]
    pub userinfo_endpoint: Option<Url>,
    #[serde(deserialize_with = "blank_url_as_none")]
    pub end_session_endpoint: Option<Url>,
    /// When set, the endpoints above are refreshed from this document before use.
    #[serde(deserialize_with = "blank_url_as_none")]
    pub discovery_url: Option<Url>,
    /// Where the signing key set is fetched from.
    #[serde(deserialize_with = "blank_url_as_none")]
    pub jwks_uri: Option<Url>,
    pub client_id: String,
    pub client_secret: String,
    pub token_endpoint_auth_method: AuthMethodSetting,
    /// The claim naming the login identity.
    pub login_attribute: String,
    /// Local attribute name to source claim.
    pub federated_attributes: BTreeMap<String, FederatedAttribute>,
    /// The `jwks_uri` that `cached_jwks_blob` was fetched from.
    pub cached_jwks_uri: Option<String>,
    /// The raw JWKS document.
    pub cached_jwks_blob: Option<String>,
    pub variant: ProviderVariant,
    pub validation: ValidationSettings,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            id: String::new(),
            account: String::new(),
            issuer: None,
            authorize_url: None,
            token_url: None,
            userinfo_endpoint: None,
            end_session_endpoint: None,
            discovery_url: None,
            jwks_uri: None,
            client_id: String::new(),
            client_secret: String::new(),
            token_endpoint_auth_method: AuthMethodSetting::default(),
            login_attribute: "sub".to_string(),
            federated_attributes: BTreeMap::new(),
            cached_jwks_uri: None,
            cached_jwks_blob: None,
            variant: ProviderVariant::default(),
            validation: ValidationSettings::default(),
        }
    }
}

impl ProviderConfig {
    /// Runs the local (no network) validity checks.
    ///
    /// Discovery and JWKS refresh happen in [`crate::provider::validate_and_refresh`],
    /// which calls this as one of its steps.
    pub fn validate(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        if self.client_id.trim().is_empty() {
            errors.add("client_id", "can't be blank");
        }
        if self.login_attribute.trim().is_empty() {
            errors.add("login_attribute", "can't be blank");
        }
        self.token_endpoint_auth_method.validate(&mut errors);
        self.variant.validate(&mut errors);
        errors
    }

    /// The OAuth2 `scope` parameter to request for this provider.
    pub fn scope(&self) -> String {
        crate::scope::infer_scope(&self.login_attribute, &self.federated_attributes)
    }

    /// Parses a provider configuration from JSON, as written by the JSON file store.
    pub fn from_json(json: &str) -> Result<Self, RpError> {
        serde_json::from_str(json).map_err(|e| RpError::Store(e.to_string()))
    }
}

/// Reads an optional URL field, treating an empty or blank string as unset.
fn blank_url_as_none<'de, D>(deserializer: D) -> Result<Option<Url>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(raw) if !raw.trim().is_empty() => Url::parse(raw.trim())
            .map(Some)
            .map_err(serde::de::Error::custom),
        _ => Ok(None),
    }
}

fn parse_url(url: &str) -> Result<Url, RpError> {
    Url::parse(url).map_err(|e| RpError::InvalidUrl(format!("{}: {}", url, e)))
}

/// A builder for creating a `ProviderConfig` instance.
///
/// URL setters parse eagerly and fail fast on malformed input; `build` checks
/// that the required fields are present.
#[derive(Default)]
pub struct ProviderConfigBuilder {
    config: ProviderConfig,
    id: Option<String>,
    client_id: Option<String>,
}

impl ProviderConfigBuilder {
    /// Creates a new `ProviderConfigBuilder`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the store record id. This is a required field.
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Sets the feature-flag scope (owning account).
    pub fn account(mut self, account: impl Into<String>) -> Self {
        self.config.account = account.into();
        self
    }

    /// Sets the expected `iss` of ID tokens.
    pub fn issuer(mut self, issuer: impl Into<String>) -> Self {
        self.config.issuer = Some(issuer.into());
        self
    }

    /// Sets the client ID. This is a required field.
    pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    pub fn client_secret(mut self, secret: impl Into<String>) -> Self {
        self.config.client_secret = secret.into();
        self
    }

    pub fn discovery_url(mut self, url: &str) -> Result<Self, RpError> {
        self.config.discovery_url = Some(parse_url(url)?);
        Ok(self)
    }

    pub fn jwks_uri(mut self, url: &str) -> Result<Self, RpError> {
        self.config.jwks_uri = Some(parse_url(url)?);
        Ok(self)
    }

    pub fn authorize_url(mut self, url: &str) -> Result<Self, RpError> {
        self.config.authorize_url = Some(parse_url(url)?);
        Ok(self)
    }

    pub fn token_url(mut self, url: &str) -> Result<Self, RpError> {
        self.config.token_url = Some(parse_url(url)?);
        Ok(self)
    }

    pub fn userinfo_endpoint(mut self, url: &str) -> Result<Self, RpError> {
        self.config.userinfo_endpoint = Some(parse_url(url)?);
        Ok(self)
    }

    pub fn end_session_endpoint(mut self, url: &str) -> Result<Self, RpError> {
        self.config.end_session_endpoint = Some(parse_url(url)?);
        Ok(self)
    }

    /// Sets the client authentication method. Unknown values surface on validation.
    pub fn token_endpoint_auth_method(mut self, method: &str) -> Self {
        self.config.set_token_endpoint_auth_method(method);
        self
    }

    /// Sets the claim used as the login identifier. Defaults to `sub`.
    pub fn login_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.config.login_attribute = attribute.into();
        self
    }

    /// Maps local attribute `local` to provider claim `claim`.
    pub fn federated_attribute(mut self, local: impl Into<String>, claim: impl Into<String>) -> Self {
        self.config
            .federated_attributes
            .insert(local.into(), FederatedAttribute::new(claim));
        self
    }

    pub fn variant(mut self, variant: ProviderVariant) -> Self {
        self.config.variant = variant;
        self
    }

    /// Sets the allowed signing algorithms.
    /// Defaults to `[Algorithm::RS256, Algorithm::HS256]` if not set.
    pub fn algorithms(mut self, algorithms: Vec<Algorithm>) -> Self {
        self.config.validation.algorithms = algorithms;
        self
    }

    /// Sets the clock skew tolerance for `exp`, in seconds.
    pub fn leeway_seconds(mut self, leeway: u64) -> Self {
        self.config.validation.leeway_seconds = leeway;
        self
    }

    /// Consumes the builder and returns a `ProviderConfig`.
    ///
    /// # Errors
    ///
    /// Returns [`RpError::InvalidConfiguration`] if `id` or `client_id` is missing.
    pub fn build(self) -> Result<ProviderConfig, RpError> {
        let mut errors = ValidationErrors::new();
        if self.id.is_none() {
            errors.add("id", "is required");
        }
        if self.client_id.is_none() {
            errors.add("client_id", "is required");
        }
        errors.into_result()?;

        let mut config = self.config;
        config.id = self.id.unwrap_or_default();
        config.client_id = self.client_id.unwrap_or_default();
        Ok(config)
    }
}
