// src/validator/claims.rs

use crate::config::ProviderConfig;
use crate::error::TokenError;
use serde_json::{Map, Value};

/// `aud` may be a single string or an array of strings (OpenID Connect Core §2).
pub(crate) fn audience_matches(aud: &Value, client_id: &str) -> bool {
    match aud {
        Value::String(s) => s == client_id,
        Value::Array(values) => values.iter().any(|v| v.as_str() == Some(client_id)),
        _ => false,
    }
}

/// Always performed. A token carrying a foreign `aud` is only accepted when this
/// provider minted it for itself (`iss` equal to the client id).
pub(crate) fn check_baseline(claims: &Map<String, Value>, config: &ProviderConfig) -> Result<(), TokenError> {
    let Some(aud) = claims.get("aud") else {
        return Ok(());
    };
    let self_issued = claims.get("iss").and_then(Value::as_str) == Some(config.client_id.as_str());
    if audience_matches(aud, &config.client_id) || self_issued {
        return Ok(());
    }
    Err(TokenError::AudienceMismatch {
        expected: config.client_id.clone(),
        actual: aud.clone(),
    })
}

/// The strict checks: `aud`, `iss`, `exp` and `nonce` must all be present and correct.
pub(crate) fn check_strict(
    claims: &Map<String, Value>,
    config: &ProviderConfig,
    expected_nonce: Option<&str>,
    now: u64,
) -> Result<(), TokenError> {
    match claims.get("aud") {
        None => return Err(TokenError::claim("aud", "missing")),
        Some(aud) if !audience_matches(aud, &config.client_id) => {
            return Err(TokenError::claim(
                "aud",
                format!("does not include client id '{}'", config.client_id),
            ))
        }
        Some(_) => {}
    }

    let expected_issuer = config
        .issuer
        .as_deref()
        .ok_or_else(|| TokenError::claim("iss", "no issuer is configured for this provider"))?;
    match claims.get("iss").and_then(Value::as_str) {
        None => return Err(TokenError::claim("iss", "missing")),
        Some(iss) if iss != expected_issuer => {
            return Err(TokenError::claim(
                "iss",
                format!("expected '{}', got '{}'", expected_issuer, iss),
            ))
        }
        Some(_) => {}
    }

    let exp = match claims.get("exp") {
        None => return Err(TokenError::claim("exp", "missing")),
        Some(value) => value
            .as_u64()
            .or_else(|| value.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
            .ok_or_else(|| TokenError::claim("exp", "is not a numeric date"))?,
    };
    if exp.saturating_add(config.validation.leeway_seconds) <= now {
        return Err(TokenError::claim("exp", format!("token expired at {}", exp)));
    }

    let expected_nonce = expected_nonce.ok_or_else(|| {
        TokenError::claim("nonce", "no nonce was supplied for this authentication attempt")
    })?;
    match claims.get("nonce").and_then(Value::as_str) {
        None => Err(TokenError::claim("nonce", "missing")),
        Some(nonce) if nonce != expected_nonce => Err(TokenError::claim(
            "nonce",
            "does not match the nonce of this authentication attempt",
        )),
        Some(_) => Ok(()),
    }
}
