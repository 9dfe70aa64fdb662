// src/auth_method.rs

//! How the OAuth2 client authenticates itself at the token endpoint.

use crate::config::ProviderConfig;
use crate::error::{RpError, ValidationErrors};
use oauth2::basic::BasicClient;
use oauth2::{AuthType, AuthUrl, ClientId, ClientSecret, TokenUrl};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const CLIENT_SECRET_BASIC: &str = "client_secret_basic";
pub const CLIENT_SECRET_POST: &str = "client_secret_post";

/// The client authentication methods this relying party supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TokenEndpointAuthMethod {
    ClientSecretBasic,
    #[default]
    ClientSecretPost,
}

/// The concrete outbound behavior for a token request.
#[derive(Debug, Clone)]
pub struct ClientAuthBehavior {
    /// Where the client credentials travel.
    pub auth_type: AuthType,
    /// The HTTP method of the token request.
    pub method: reqwest::Method,
}

impl TokenEndpointAuthMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenEndpointAuthMethod::ClientSecretBasic => CLIENT_SECRET_BASIC,
            TokenEndpointAuthMethod::ClientSecretPost => CLIENT_SECRET_POST,
        }
    }

    /// Maps the method onto the OAuth2 client's authentication behavior.
    pub fn client_auth(&self) -> ClientAuthBehavior {
        let auth_type = match self {
            TokenEndpointAuthMethod::ClientSecretBasic => AuthType::BasicAuth,
            TokenEndpointAuthMethod::ClientSecretPost => AuthType::RequestBody,
        };
        ClientAuthBehavior {
            auth_type,
            method: reqwest::Method::POST,
        }
    }
}

impl FromStr for TokenEndpointAuthMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            CLIENT_SECRET_BASIC => Ok(TokenEndpointAuthMethod::ClientSecretBasic),
            CLIENT_SECRET_POST => Ok(TokenEndpointAuthMethod::ClientSecretPost),
            other => Err(other.to_string()),
        }
    }
}

impl fmt::Display for TokenEndpointAuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The stored value of `token_endpoint_auth_method`.
///
/// Assigning an unknown method does not fail; the raw value is kept so that the
/// next validity check can report it against the field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AuthMethodSetting {
    Known(TokenEndpointAuthMethod),
    Unrecognized(String),
}

impl Default for AuthMethodSetting {
    fn default() -> Self {
        AuthMethodSetting::Known(TokenEndpointAuthMethod::default())
    }
}

impl From<String> for AuthMethodSetting {
    fn from(value: String) -> Self {
        match value.parse() {
            Ok(method) => AuthMethodSetting::Known(method),
            Err(raw) => AuthMethodSetting::Unrecognized(raw),
        }
    }
}

impl From<AuthMethodSetting> for String {
    fn from(value: AuthMethodSetting) -> Self {
        match value {
            AuthMethodSetting::Known(method) => method.as_str().to_string(),
            AuthMethodSetting::Unrecognized(raw) => raw,
        }
    }
}

impl AuthMethodSetting {
    pub fn as_str(&self) -> &str {
        match self {
            AuthMethodSetting::Known(method) => method.as_str(),
            AuthMethodSetting::Unrecognized(raw) => raw,
        }
    }

    pub fn method(&self) -> Option<TokenEndpointAuthMethod> {
        match self {
            AuthMethodSetting::Known(method) => Some(*method),
            AuthMethodSetting::Unrecognized(_) => None,
        }
    }

    pub(crate) fn validate(&self, errors: &mut ValidationErrors) {
        if let AuthMethodSetting::Unrecognized(raw) = self {
            errors.add(
                "token_endpoint_auth_method",
                format!(
                    "'{}' is not one of {}, {}",
                    raw, CLIENT_SECRET_BASIC, CLIENT_SECRET_POST
                ),
            );
        }
    }
}

impl ProviderConfig {
    pub fn token_endpoint_auth_method(&self) -> &str {
        self.token_endpoint_auth_method.as_str()
    }

    /// Stores the method. Unknown values are accepted here and reported by [`ProviderConfig::validate`].
    pub fn set_token_endpoint_auth_method(&mut self, value: &str) {
        self.token_endpoint_auth_method = AuthMethodSetting::from(value.to_string());
    }

    /// The outbound client behavior, or `None` when the configured method is not recognized.
    pub fn client_auth(&self) -> Option<ClientAuthBehavior> {
        self.token_endpoint_auth_method
            .method()
            .map(|method| method.client_auth())
    }

    /// Builds the OAuth2 client used for the authorization-code exchange.
    pub fn oauth2_client(&self) -> Result<BasicClient, RpError> {
        let (behavior, authorize_url) = match (self.client_auth(), self.authorize_url.clone()) {
            (Some(behavior), Some(url)) => (behavior, url),
            _ => {
                let mut errors = ValidationErrors::new();
                self.token_endpoint_auth_method.validate(&mut errors);
                if self.authorize_url.is_none() {
                    errors.add("authorize_url", "is required to build an OAuth2 client");
                }
                return Err(RpError::InvalidConfiguration(errors));
            }
        };
        let auth_url = AuthUrl::from_url(authorize_url);
        let token_url = self.token_url.clone().map(TokenUrl::from_url);
        let client_secret = if self.client_secret.is_empty() {
            None
        } else {
            Some(ClientSecret::new(self.client_secret.clone()))
        };

        Ok(BasicClient::new(
            ClientId::new(self.client_id.clone()),
            client_secret,
            auth_url,
            token_url,
        )
        .set_auth_type(behavior.auth_type))
    }
}
