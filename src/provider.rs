// src/provider.rs

//! The provider lifecycle: validate and refresh before save, then wire the
//! per-provider collaborators together.

use crate::client::HttpFetcher;
use crate::config::ProviderConfig;
use crate::discovery::refresh_discovery;
use crate::error::{RpError, ValidationErrors};
use crate::flags::FeatureFlags;
use crate::identity::UniqueIdResolver;
use crate::jwks::{JwksCache, JwksRefresh};
use crate::logout::{LogoutRedirectBuilder, Session};
use crate::store::ProviderStore;
use crate::validator::IdTokenValidator;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use url::Url;

/// The outcome of [`validate_and_refresh`].
#[derive(Debug, Clone)]
pub struct ValidationReport {
    /// Field-scoped errors. The configuration may only be persisted when empty.
    pub errors: ValidationErrors,
    /// The configuration with discovery and key-set refreshes applied.
    pub config: ProviderConfig,
    /// What the key-set refresh did, if it ran without error.
    pub jwks: Option<JwksRefresh>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Runs every check that has to pass before a provider is saved.
///
/// 1. discovery refresh, when `discovery_url` is set;
/// 2. the local checks of [`ProviderConfig::validate`];
/// 3. the key-set refresh policy of [`JwksCache::refresh`].
///
/// Failures become field errors on the report rather than aborting, so an
/// administrator sees every problem at once.
#[instrument(skip_all, fields(provider = %config.id))]
pub async fn validate_and_refresh(
    mut config: ProviderConfig,
    fetcher: &dyn HttpFetcher,
    jwks: &JwksCache,
) -> ValidationReport {
    let mut errors = ValidationErrors::new();

    if let Err(e) = refresh_discovery(&mut config, fetcher).await {
        errors.add("discovery_url", e.to_string());
    }

    errors.extend(config.validate());

    let jwks = match jwks.refresh(&mut config).await {
        Ok(refresh) => Some(refresh),
        Err(e) => {
            errors.add("jwks_uri", e.to_string());
            None
        }
    };

    if !errors.is_empty() {
        warn!("Provider configuration is invalid: {}", errors);
    }
    ValidationReport {
        errors,
        config,
        jwks,
    }
}

/// Ties a [`ProviderStore`] to the network and flag collaborators.
#[derive(Clone)]
pub struct ProviderService {
    store: Arc<dyn ProviderStore>,
    fetcher: Arc<dyn HttpFetcher>,
    flags: Arc<dyn FeatureFlags>,
    jwks: JwksCache,
}

impl ProviderService {
    pub fn new(
        store: Arc<dyn ProviderStore>,
        fetcher: Arc<dyn HttpFetcher>,
        flags: Arc<dyn FeatureFlags>,
    ) -> Self {
        let jwks = JwksCache::new(fetcher.clone());
        Self {
            store,
            fetcher,
            flags,
            jwks,
        }
    }

    /// Validates, refreshes and persists `config`.
    ///
    /// # Errors
    ///
    /// Returns [`RpError::InvalidConfiguration`] without persisting anything when
    /// the report carries errors.
    #[instrument(skip_all, fields(provider = %config.id), err)]
    pub async fn save(&self, config: ProviderConfig) -> Result<ValidationReport, RpError> {
        let report = validate_and_refresh(config, self.fetcher.as_ref(), &self.jwks).await;
        if !report.is_valid() {
            return Err(RpError::InvalidConfiguration(report.errors));
        }
        self.store.save(&report.config).await?;
        info!("Saved provider configuration");
        Ok(report)
    }

    pub async fn load(&self, id: &str) -> Result<ProviderConfig, RpError> {
        self.store
            .load(id)
            .await?
            .ok_or_else(|| RpError::ProviderNotFound(id.to_string()))
    }

    /// An ID token validator for the stored provider `id`.
    pub async fn validator(&self, id: &str) -> Result<IdTokenValidator, RpError> {
        let config = self.load(id).await?;
        Ok(IdTokenValidator::new(
            config,
            self.jwks.clone(),
            self.flags.clone(),
        ))
    }

    /// A login resolver for the stored provider `id`.
    pub async fn resolver(&self, id: &str) -> Result<UniqueIdResolver, RpError> {
        let validator = self.validator(id).await?;
        Ok(UniqueIdResolver::new(validator, self.fetcher.clone()))
    }

    /// The end-session redirect for the stored provider `id`, if it has one.
    pub async fn logout_redirect(
        &self,
        id: &str,
        post_logout_redirect_uri: &str,
        session: &dyn Session,
    ) -> Result<Option<Url>, RpError> {
        let config = self.load(id).await?;
        Ok(LogoutRedirectBuilder::new(self.flags.clone()).build(
            &config,
            post_logout_redirect_uri,
            session,
        ))
    }
}
