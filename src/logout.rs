// src/logout.rs

//! RP-initiated logout: building the redirect to the provider's end-session endpoint.

use crate::config::ProviderConfig;
use crate::flags::{FeatureFlags, LOGOUT_PARAMETERS};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;
use url::Url;

/// The session key under which the raw ID token of the login is kept.
pub const ID_TOKEN_SESSION_KEY: &str = "oidc_id_token";

/// Read access to the caller's session.
pub trait Session {
    fn get(&self, key: &str) -> Option<&str>;
}

impl Session for HashMap<String, String> {
    fn get(&self, key: &str) -> Option<&str> {
        HashMap::get(self, key).map(String::as_str)
    }
}

/// Builds end-session redirects for providers.
#[derive(Clone)]
pub struct LogoutRedirectBuilder {
    flags: Arc<dyn FeatureFlags>,
}

fn has_param(url: &Url, name: &str) -> bool {
    url.query_pairs().any(|(k, _)| k == name)
}

impl LogoutRedirectBuilder {
    pub fn new(flags: Arc<dyn FeatureFlags>) -> Self {
        Self { flags }
    }

    /// Returns where to send the user agent after local logout, or `None` when the
    /// provider has no end-session endpoint.
    ///
    /// With logout parameters disabled the endpoint is returned unchanged. Otherwise
    /// the endpoint's own query string is kept as is, followed by `client_id` and
    /// `post_logout_redirect_uri` (each only when not already present) and the
    /// session's ID token as `id_token_hint`.
    pub fn build(
        &self,
        config: &ProviderConfig,
        post_logout_redirect_uri: &str,
        session: &dyn Session,
    ) -> Option<Url> {
        let endpoint = config.end_session_endpoint.as_ref()?;
        if !self.flags.enabled(LOGOUT_PARAMETERS, &config.account) {
            return Some(endpoint.clone());
        }

        let add_client_id = !has_param(endpoint, "client_id");
        let add_redirect = !has_param(endpoint, "post_logout_redirect_uri");
        let id_token_hint = session
            .get(ID_TOKEN_SESSION_KEY)
            .filter(|t| !t.is_empty() && !has_param(endpoint, "id_token_hint"));

        let mut redirect = endpoint.clone();
        if add_client_id || add_redirect || id_token_hint.is_some() {
            let mut pairs = redirect.query_pairs_mut();
            if add_client_id {
                pairs.append_pair("client_id", &config.client_id);
            }
            if add_redirect {
                pairs.append_pair("post_logout_redirect_uri", post_logout_redirect_uri);
            }
            if let Some(hint) = id_token_hint {
                pairs.append_pair("id_token_hint", hint);
            }
        }
        debug!(provider = %config.id, "Built end-session redirect");
        Some(redirect)
    }
}
