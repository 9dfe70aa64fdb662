// src/lib.rs

//! The trust core of an OpenID Connect relying party: provider configuration,
//! discovery, signing-key caching, ID token validation, login resolution and
//! RP-initiated logout.

pub mod auth_method;
pub mod client;
pub mod config;
pub mod discovery;
pub mod error;
pub mod flags;
pub mod identity;
pub mod jwks;
pub mod logout;
pub mod model;
pub mod provider;
pub mod scope;
pub mod store;
pub mod telemetry;
pub mod validator;

/// The public prelude for the `openid-rp` crate.
///
/// This module re-exports the most commonly used types for convenience.
pub mod prelude {
    pub use crate::auth_method::{AuthMethodSetting, TokenEndpointAuthMethod};
    pub use crate::client::{HttpFetcher, HttpResponse, ReqwestFetcher};
    pub use crate::config::{FederatedAttribute, ProviderConfig, ProviderConfigBuilder, ValidationSettings};
    pub use crate::error::{FetchError, RpError, TokenError, ValidationErrors, ValidationStage};
    pub use crate::flags::{FeatureFlags, StaticFlags, LOGOUT_PARAMETERS, STRICT_TOKEN_VALIDATION};
    pub use crate::identity::{ResolvedLogin, UniqueIdResolver};
    pub use crate::jwks::{JwksCache, JwksRefresh, SigningKeySet};
    pub use crate::logout::{LogoutRedirectBuilder, Session, ID_TOKEN_SESSION_KEY};
    pub use crate::model::{generate_nonce, AuthorizationExchange, DiscoveryDocument, ValidatedClaims};
    pub use crate::provider::{validate_and_refresh, ProviderService, ValidationReport};
    pub use crate::store::{JsonFileStore, MemoryStore, ProviderStore};
    pub use crate::validator::variant::{ClaimsCheck, ProviderVariant};
    pub use crate::validator::IdTokenValidator;

    pub use jsonwebtoken::Algorithm;
}
