// src/model.rs

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Represents the data structure of an OIDC provider's discovery document.
/// Found at the `.well-known/openid-configuration` endpoint.
///
/// Every field is optional: a document that omits a field leaves the
/// corresponding provider setting untouched.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DiscoveryDocument {
    pub issuer: Option<String>,
    pub authorization_endpoint: Option<String>,
    pub token_endpoint: Option<String>,
    pub userinfo_endpoint: Option<String>,
    pub end_session_endpoint: Option<String>,
    pub jwks_uri: Option<String>,
}

/// The claims of an ID token that passed validation, together with the raw token.
///
/// Everything downstream of [`crate::validator::IdTokenValidator`] consumes this type.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedClaims {
    claims: Map<String, Value>,
    raw: String,
}

impl ValidatedClaims {
    pub(crate) fn new(claims: Map<String, Value>, raw: impl Into<String>) -> Self {
        Self {
            claims,
            raw: raw.into(),
        }
    }

    pub fn get(&self, claim: &str) -> Option<&Value> {
        self.claims.get(claim)
    }

    pub fn get_str(&self, claim: &str) -> Option<&str> {
        self.claims.get(claim).and_then(Value::as_str)
    }

    pub fn sub(&self) -> Option<&str> {
        self.get_str("sub")
    }

    pub fn iss(&self) -> Option<&str> {
        self.get_str("iss")
    }

    pub fn claims(&self) -> &Map<String, Value> {
        &self.claims
    }

    /// The token as received, for use as a logout `id_token_hint`.
    pub fn raw_token(&self) -> &str {
        &self.raw
    }
}

/// The in-flight authorization-code exchange, as produced by the OAuth2 client.
#[derive(Debug, Clone, Default)]
pub struct AuthorizationExchange {
    /// `params["id_token"]` of the token response.
    pub id_token: Option<String>,
    /// The access token, used for userinfo requests.
    pub access_token: String,
    /// The nonce this relying party generated for the attempt.
    pub nonce: Option<String>,
}

impl AuthorizationExchange {
    pub fn new(id_token: Option<String>, access_token: impl Into<String>, nonce: Option<String>) -> Self {
        Self {
            id_token,
            access_token: access_token.into(),
            nonce,
        }
    }

    /// The ID token, unless absent or blank.
    pub fn id_token(&self) -> Option<&str> {
        self.id_token.as_deref().filter(|t| !t.trim().is_empty())
    }
}

/// Generates a fresh nonce to send with an authorization request.
pub fn generate_nonce() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Renders a scalar claim as an identifier string.
///
/// Strings are returned as-is, numbers and booleans as their JSON text.
/// `null`, arrays and objects yield `None`.
pub fn claim_to_identifier(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
