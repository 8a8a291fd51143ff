//! Capturing the Nirvana auth token.
//!
//! The web app authenticates every `/api/everything` request with an
//! `authtoken` query parameter. Copying any such request URL from the
//! browser's network panel (or the token itself) is enough to log in.

use relay_core::SharedSecret;
use reqwest::Url;

use super::credentials::CredentialStore;
use super::error::{Error, Result};

const WEB_ORIGIN: &str = "https://focus.nirvanahq.com";

/// Pull the auth token out of a request URL, or accept a bare token.
#[must_use]
pub fn extract_token(input: &str) -> Option<String> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    let url = if input.starts_with('/') {
        Url::parse(WEB_ORIGIN).and_then(|base| base.join(input)).ok()
    } else {
        Url::parse(input).ok()
    };

    match url {
        Some(url) if url.has_host() => {
            if !url.path().contains("/api/everything") {
                return None;
            }
            url.query_pairs()
                .find(|(key, _)| key == "authtoken")
                .map(|(_, value)| value.trim().to_string())
                .filter(|token| !token.is_empty())
        }
        _ if looks_like_token(input) => Some(input.to_string()),
        _ => None,
    }
}

fn looks_like_token(input: &str) -> bool {
    !input
        .chars()
        .any(|c| c.is_whitespace() || matches!(c, '/' | '?' | '&' | '=' | ':'))
}

/// Extract a token from `input`, persist it and make it live in `handle`.
///
/// A store that cannot be written is logged and ignored; the token is
/// still used for the rest of the session. Any other store failure leaves
/// `handle` untouched.
pub async fn capture_token(
    input: &str,
    store: &CredentialStore,
    handle: &SharedSecret,
) -> Result<String> {
    let token = extract_token(input).ok_or_else(|| {
        Error::Config(
            "no auth token found; paste a Nirvana /api/everything request URL or the token"
                .to_string(),
        )
    })?;

    match store.set_auth_token(&token).await {
        Ok(()) => {}
        Err(e) if e.is_environment_unavailable() => {
            tracing::warn!(error = %e, "auth token not persisted");
        }
        Err(e) => return Err(e.into()),
    }

    handle.set(token.clone());

    tracing::info!("auth token captured");
    Ok(token)
}
