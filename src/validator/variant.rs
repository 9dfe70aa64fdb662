// src/validator/variant.rs

//! Extra trust requirements for specific identity-provider variants.

use crate::config::ProviderConfig;
use crate::error::{TokenError, ValidationErrors};
use crate::model::ValidatedClaims;
use serde::{Deserialize, Serialize};

/// An additional claims check run after the baseline and strict checks.
///
/// Implementations reject with [`TokenError::VariantRejected`] (or any other
/// [`TokenError`]) and never see a token whose signature has not been verified.
pub trait ClaimsCheck: Send + Sync {
    fn check(&self, claims: &ValidatedClaims, config: &ProviderConfig) -> Result<(), TokenError>;
}

/// The identity-provider variants this relying party knows about.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProviderVariant {
    /// A standards-compliant provider with no extra requirements.
    #[default]
    Generic,
    /// A multi-tenant provider whose tokens must carry the configured tenant in `tid`.
    TenantScoped { tenant_id: String },
}

impl ProviderVariant {
    pub(crate) fn validate(&self, errors: &mut ValidationErrors) {
        if let ProviderVariant::TenantScoped { tenant_id } = self {
            if tenant_id.trim().is_empty() {
                errors.add("tenant_id", "can't be blank");
            }
        }
    }
}

impl ClaimsCheck for ProviderVariant {
    fn check(&self, claims: &ValidatedClaims, _config: &ProviderConfig) -> Result<(), TokenError> {
        match self {
            ProviderVariant::Generic => Ok(()),
            ProviderVariant::TenantScoped { tenant_id } => match claims.get_str("tid") {
                Some(tid) if tid == tenant_id => Ok(()),
                Some(tid) => Err(TokenError::VariantRejected {
                    claim: "tid".to_string(),
                    reason: format!("expected tenant '{}', got '{}'", tenant_id, tid),
                }),
                None => Err(TokenError::VariantRejected {
                    claim: "tid".to_string(),
                    reason: "missing".to_string(),
                }),
            },
        }
    }
}
