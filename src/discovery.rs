// src/discovery.rs

//! Populates provider endpoints from an OIDC discovery document.

use crate::client::{fetch_json, HttpFetcher};
use crate::config::ProviderConfig;
use crate::error::FetchError;
use crate::model::DiscoveryDocument;
use tracing::{debug, instrument};
use url::Url;

fn parse_endpoint(source: &str, field: &str, value: &str) -> Result<Url, FetchError> {
    Url::parse(value).map_err(|e| FetchError::parse(source, format!("{}: {}", field, e)))
}

/// Copies the discovery fields present in `doc` onto `config`.
///
/// Absent fields leave the existing setting alone. All endpoint URLs are parsed
/// before anything is assigned, so a document with a bad URL changes nothing.
pub fn populate_from_discovery(
    config: &mut ProviderConfig,
    doc: &DiscoveryDocument,
    source: &str,
) -> Result<(), FetchError> {
    let endpoint = |field: &str, value: &Option<String>| -> Result<Option<Url>, FetchError> {
        value
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(|v| parse_endpoint(source, field, v))
            .transpose()
    };
    let authorize_url = endpoint("authorization_endpoint", &doc.authorization_endpoint)?;
    let token_url = endpoint("token_endpoint", &doc.token_endpoint)?;
    let userinfo_endpoint = endpoint("userinfo_endpoint", &doc.userinfo_endpoint)?;
    let end_session_endpoint = endpoint("end_session_endpoint", &doc.end_session_endpoint)?;
    let jwks_uri = endpoint("jwks_uri", &doc.jwks_uri)?;

    if let Some(issuer) = doc.issuer.as_deref().filter(|i| !i.trim().is_empty()) {
        config.issuer = Some(issuer.to_string());
    }
    if authorize_url.is_some() {
        config.authorize_url = authorize_url;
    }
    if token_url.is_some() {
        config.token_url = token_url;
    }
    if userinfo_endpoint.is_some() {
        config.userinfo_endpoint = userinfo_endpoint;
    }
    if end_session_endpoint.is_some() {
        config.end_session_endpoint = end_session_endpoint;
    }
    if jwks_uri.is_some() {
        config.jwks_uri = jwks_uri;
    }
    Ok(())
}

/// Fetches `config.discovery_url` and applies it. Does nothing when no discovery URL is set.
#[instrument(skip_all, fields(provider = %config.id), err)]
pub async fn refresh_discovery(
    config: &mut ProviderConfig,
    fetcher: &dyn HttpFetcher,
) -> Result<bool, FetchError> {
    let Some(discovery_url) = config.discovery_url.clone() else {
        return Ok(false);
    };

    debug!("Performing OIDC discovery at: {}", discovery_url);
    let doc: DiscoveryDocument = fetch_json(fetcher, &discovery_url, None).await?;
    populate_from_discovery(config, &doc, discovery_url.as_str())?;
    Ok(true)
}
