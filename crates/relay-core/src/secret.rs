//! Credential handling: a shared, hot-swappable handle and masking for logs.
//!
//! Request URLs carry the Nirvana auth token as a query parameter and
//! error bodies may echo the model key, so anything logged goes through
//! [`mask_secrets`].

use std::borrow::Cow;
use std::fmt;
use std::sync::{Arc, LazyLock};

use parking_lot::RwLock;
use regex::Regex;

/// A credential shared between the component that captures it and the
/// clients that read it on every request.
#[derive(Clone, Default)]
pub struct SharedSecret(Arc<RwLock<Option<String>>>);

impl SharedSecret {
    /// Create a handle holding `value`. Empty strings count as absent.
    #[must_use]
    pub fn new(value: Option<String>) -> Self {
        Self(Arc::new(RwLock::new(value.filter(|v| !v.is_empty()))))
    }

    /// Current value, if any.
    #[must_use]
    pub fn get(&self) -> Option<String> {
        self.0.read().clone()
    }

    /// Replace the value for every holder of this handle.
    pub fn set(&self, value: impl Into<String>) {
        let value = value.into();
        *self.0.write() = if value.is_empty() { None } else { Some(value) };
    }

    pub fn clear(&self) {
        *self.0.write() = None;
    }

    #[must_use]
    pub fn is_set(&self) -> bool {
        self.0.read().is_some()
    }
}

impl fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = if self.is_set() { "<set>" } else { "<unset>" };
        f.debug_tuple("SharedSecret").field(&state).finish()
    }
}

/// Patterns that match the secrets this tool handles
const SECRET_PATTERNS: &[(&str, &str)] = &[
    // OpenAI keys
    (r"sk-proj-[a-zA-Z0-9_-]{20,}", "[MASKED_OPENAI_KEY]"),
    (r"sk-[a-zA-Z0-9_-]{20,}", "[MASKED_API_KEY]"),
    // Nirvana auth token in request URLs
    (r"(?i)authtoken=[^&\s]+", "authtoken=[MASKED_AUTH_TOKEN]"),
    // Bearer tokens
    (r"(?i)bearer\s+[a-zA-Z0-9._-]+", "[MASKED_BEARER_TOKEN]"),
    // JSON credential fields
    (
        r#""(authtoken|openai_api_key)"\s*:\s*"[^"]*""#,
        r#""$1": "[MASKED_SECRET]""#,
    ),
];

/// Compiled secret patterns
struct SecretMasker {
    patterns: Vec<(Regex, &'static str)>,
}

impl SecretMasker {
    fn new() -> Self {
        let patterns = SECRET_PATTERNS
            .iter()
            .filter_map(|(pattern, replacement)| {
                Regex::new(pattern).ok().map(|re| (re, *replacement))
            })
            .collect();

        Self { patterns }
    }

    fn mask<'a>(&self, text: &'a str) -> Cow<'a, str> {
        let mut result = Cow::Borrowed(text);

        for (pattern, replacement) in &self.patterns {
            if pattern.is_match(&result) {
                result = Cow::Owned(pattern.replace_all(&result, *replacement).into_owned());
            }
        }

        result
    }
}

static MASKER: LazyLock<SecretMasker> = LazyLock::new(SecretMasker::new);

/// Mask secrets in a string
#[must_use]
pub fn mask_secrets(text: &str) -> Cow<'_, str> {
    MASKER.mask(text)
}

/// Show only the last four characters of a credential.
#[must_use]
pub fn redact(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 8 {
        return "****".to_string();
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("****{tail}")
}
