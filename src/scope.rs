// src/scope.rs

//! Derives the OAuth2 `scope` parameter from the claims a provider is asked to deliver.

use crate::config::FederatedAttribute;
use once_cell::sync::Lazy;
use std::collections::{BTreeMap, HashMap};

/// Standard OIDC scopes in request order, after `openid`.
const SCOPE_ORDER: [&str; 4] = ["profile", "email", "address", "phone"];

/// Standard claim name to the scope that carries it (OpenID Connect Core §5.4).
static CLAIM_SCOPES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    let profile = [
        "name",
        "family_name",
        "given_name",
        "middle_name",
        "nickname",
        "preferred_username",
        "profile",
        "picture",
        "website",
        "gender",
        "birthdate",
        "zoneinfo",
        "locale",
        "updated_at",
    ];
    let mut map: HashMap<&'static str, &'static str> =
        profile.iter().map(|claim| (*claim, "profile")).collect();
    map.insert("email", "email");
    map.insert("email_verified", "email");
    map.insert("address", "address");
    map.insert("phone_number", "phone");
    map.insert("phone_number_verified", "phone");
    map
});

/// Returns the scope conventionally carrying `claim`, if it is a standard claim.
pub fn scope_for_claim(claim: &str) -> Option<&'static str> {
    CLAIM_SCOPES.get(claim).copied()
}

/// Builds the space-delimited scope string: `openid` first, then each needed
/// standard scope once, in a fixed order.
pub fn infer_scope(
    login_attribute: &str,
    federated_attributes: &BTreeMap<String, FederatedAttribute>,
) -> String {
    let needed: Vec<&str> = std::iter::once(login_attribute)
        .chain(federated_attributes.values().map(|a| a.attribute.as_str()))
        .filter_map(scope_for_claim)
        .collect();

    let mut scopes = vec!["openid"];
    scopes.extend(SCOPE_ORDER.iter().filter(|scope| needed.contains(*scope)));
    scopes.join(" ")
}
