// src/flags.rs

//! Deployment feature flags consulted by validation and logout.

use std::collections::HashSet;

/// Enables the strict `aud`/`iss`/`exp`/`nonce` checks on ID tokens.
pub const STRICT_TOKEN_VALIDATION: &str = "oidc_strict_token_validation";

/// Enables `client_id`, `post_logout_redirect_uri` and `id_token_hint` on end-session redirects.
pub const LOGOUT_PARAMETERS: &str = "oidc_rp_initiated_logout_params";

/// Boolean flag lookup keyed by flag name and scope (an account id).
pub trait FeatureFlags: Send + Sync {
    fn enabled(&self, flag: &str, scope: &str) -> bool;
}

/// A fixed set of enabled flags.
#[derive(Debug, Clone, Default)]
pub struct StaticFlags {
    everywhere: HashSet<String>,
    scoped: HashSet<(String, String)>,
}

impl StaticFlags {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables `flag` for every scope.
    pub fn enable(mut self, flag: &str) -> Self {
        self.everywhere.insert(flag.to_string());
        self
    }

    /// Enables `flag` for `scope` only.
    pub fn enable_for(mut self, flag: &str, scope: &str) -> Self {
        self.scoped.insert((flag.to_string(), scope.to_string()));
        self
    }
}

impl FeatureFlags for StaticFlags {
    fn enabled(&self, flag: &str, scope: &str) -> bool {
        self.everywhere.contains(flag)
            || self.scoped.contains(&(flag.to_string(), scope.to_string()))
    }
}
