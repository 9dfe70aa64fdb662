// src/identity.rs

//! Turns a validated ID token (and, when needed, a userinfo response) into a login identity.

use crate::client::{fetch_json, HttpFetcher};
use crate::config::ProviderConfig;
use crate::error::RpError;
use crate::model::{claim_to_identifier, AuthorizationExchange, ValidatedClaims};
use crate::validator::IdTokenValidator;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// The outcome of a successful resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedLogin {
    /// The value of the provider's `login_attribute`.
    pub unique_id: String,
    /// Federated attributes keyed by their local name.
    pub attributes: BTreeMap<String, Value>,
    /// The validated ID token, kept for the logout `id_token_hint`.
    pub claims: ValidatedClaims,
}

/// Resolves the login identifier for one authorization-code exchange.
#[derive(Clone)]
pub struct UniqueIdResolver {
    validator: IdTokenValidator,
    fetcher: Arc<dyn HttpFetcher>,
}

/// A claim that is present and not `null`.
fn present<'a>(claims: &'a Map<String, Value>, name: &str) -> Option<&'a Value> {
    claims.get(name).filter(|v| !v.is_null())
}

fn collect_attributes(
    config: &ProviderConfig,
    sources: &[&Map<String, Value>],
) -> BTreeMap<String, Value> {
    let mut attributes = BTreeMap::new();
    for (local, federated) in &config.federated_attributes {
        // Later sources overlay earlier ones.
        for source in sources {
            if let Some(value) = present(source, &federated.attribute) {
                attributes.insert(local.clone(), value.clone());
            }
        }
    }
    attributes
}

impl UniqueIdResolver {
    pub fn new(validator: IdTokenValidator, fetcher: Arc<dyn HttpFetcher>) -> Self {
        Self { validator, fetcher }
    }

    /// Validates the exchange's ID token and resolves the login identifier.
    ///
    /// Returns `Ok(None)` when no identifier can be determined: the exchange carried
    /// no ID token, the attribute is in neither the token nor the userinfo response,
    /// or the userinfo response belongs to a different subject. Token rejections and
    /// userinfo transport failures are errors.
    #[instrument(skip_all, fields(provider = %self.validator.config().id))]
    pub async fn resolve(
        &self,
        exchange: &AuthorizationExchange,
    ) -> Result<Option<ResolvedLogin>, RpError> {
        let Some(id_token) = exchange.id_token() else {
            debug!("Token response carried no id_token; nothing to resolve");
            return Ok(None);
        };

        let claims = self
            .validator
            .validate(id_token, exchange.nonce.as_deref())
            .await?;
        let config = self.validator.config();
        let login_attribute = config.login_attribute.as_str();

        if let Some(value) = present(claims.claims(), login_attribute).cloned() {
            debug!("Login attribute '{}' found in the ID token", login_attribute);
            let attributes = collect_attributes(config, &[claims.claims()]);
            return Ok(Self::login(&value, attributes, claims));
        }

        let Some(userinfo_endpoint) = config.userinfo_endpoint.as_ref() else {
            debug!(
                "Login attribute '{}' missing and no userinfo endpoint configured",
                login_attribute
            );
            return Ok(None);
        };

        let userinfo: Map<String, Value> =
            fetch_json(self.fetcher.as_ref(), userinfo_endpoint, Some(&exchange.access_token))
                .await?;

        let userinfo_sub = userinfo.get("sub").and_then(Value::as_str);
        if claims.sub().is_none() || userinfo_sub != claims.sub() {
            warn!("Discarding userinfo response: 'sub' does not match the ID token");
            return Ok(None);
        }

        let Some(value) = present(&userinfo, login_attribute) else {
            debug!("Login attribute '{}' missing from userinfo", login_attribute);
            return Ok(None);
        };
        let attributes = collect_attributes(config, &[claims.claims(), &userinfo]);
        Ok(Self::login(value, attributes, claims))
    }

    fn login(
        value: &Value,
        attributes: BTreeMap<String, Value>,
        claims: ValidatedClaims,
    ) -> Option<ResolvedLogin> {
        let unique_id = claim_to_identifier(value)?;
        Some(ResolvedLogin {
            unique_id,
            attributes,
            claims,
        })
    }
}
