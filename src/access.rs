//! Token gate for API mode
//!
//! [`AccessGate`] decides whether an inbound API request may proceed, based on a
//! [`CredentialConfiguration`] built once at startup from the process
//! environment and the static allow-list.
//!
//! The rules, evaluated in order:
//!
//! 1. No token (or an empty one): allowed only when nothing at all is configured.
//! 2. A non-empty token: allowed when it equals the environment secret, or when
//!    it is on the allow-list. Anything else is denied, including any token
//!    presented while nothing is configured.
//!
//! # Example
//!
//! ```
//! use douk_hooks::access::{AccessGate, CredentialConfiguration};
//!
//! let credentials = CredentialConfiguration::new(None, ["t1", "t2"]);
//! let gate = AccessGate::new(credentials);
//!
//! assert!(gate.authorize(Some("t1")));
//! assert!(!gate.authorize(Some("t3")));
//! assert!(!gate.authorize(None));
//! ```

use crate::config::AccessConfig;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Secrets accepted by the gate
///
/// Immutable once built; there is no API to add or remove secrets.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CredentialConfiguration {
    env_secret: Option<String>,
    allow_list: BTreeSet<String>,
}

impl CredentialConfiguration {
    /// Build from an explicit environment secret and allow-list
    ///
    /// An empty `env_secret` counts as absent.
    pub fn new<I, S>(env_secret: Option<String>, allow_list: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            env_secret: env_secret.filter(|s| !s.is_empty()),
            allow_list: allow_list.into_iter().map(Into::into).collect(),
        }
    }

    /// Build from the real process environment
    pub fn from_env(config: &AccessConfig) -> Self {
        Self::from_lookup(config, |name| std::env::var(name).ok())
    }

    /// Build using `lookup` to resolve environment variable names
    ///
    /// Names are probed in `config.env_token_names` order and the first
    /// non-empty value wins.
    pub fn from_lookup<F>(config: &AccessConfig, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let env_secret = config
            .env_token_names
            .iter()
            .filter_map(|name| lookup(name))
            .find(|value| !value.is_empty());

        Self::new(env_secret, config.tokens.iter().cloned())
    }

    /// The secret read from the environment, if any
    pub fn env_secret(&self) -> Option<&str> {
        self.env_secret.as_deref()
    }

    /// Number of allow-list entries
    pub fn allow_list_len(&self) -> usize {
        self.allow_list.len()
    }

    /// True when neither an environment secret nor an allow-list entry exists
    pub fn is_empty(&self) -> bool {
        self.env_secret.is_none() && self.allow_list.is_empty()
    }
}

/// Authorizes API-mode requests
///
/// Cheap to clone; all clones share one read-only [`CredentialConfiguration`].
#[derive(Debug, Clone, Default)]
pub struct AccessGate {
    credentials: Arc<CredentialConfiguration>,
}

impl AccessGate {
    /// Gate over `credentials`
    pub fn new(credentials: CredentialConfiguration) -> Self {
        Self {
            credentials: Arc::new(credentials),
        }
    }

    /// Gate configured from `config` and the process environment
    pub fn from_config(config: &AccessConfig) -> Self {
        let gate = Self::new(CredentialConfiguration::from_env(config));
        if gate.is_open() {
            tracing::warn!(
                "No API token configured, every request without a token is allowed; \
                 set API_TOKEN or DOUK_API_TOKEN to protect the API"
            );
        } else {
            tracing::info!(
                env_secret = gate.credentials.env_secret.is_some(),
                allow_list = gate.credentials.allow_list_len(),
                "API token validation enabled"
            );
        }
        gate
    }

    /// Whether requests without a token are let through
    pub fn is_open(&self) -> bool {
        self.credentials.is_empty()
    }

    /// The credentials this gate checks against
    pub fn credentials(&self) -> &CredentialConfiguration {
        &self.credentials
    }

    /// Decide whether a request presenting `token` may proceed
    ///
    /// `None` and `Some("")` are treated the same. Never fails.
    pub fn authorize(&self, token: Option<&str>) -> bool {
        let token = token.unwrap_or_default();

        if token.is_empty() {
            return self.credentials.is_empty();
        }

        if let Some(secret) = self.credentials.env_secret.as_deref() {
            if constant_time_eq(token.as_bytes(), secret.as_bytes()) {
                return true;
            }
        }

        // Compare against every entry so timing does not reveal list position
        self.credentials
            .allow_list
            .iter()
            .fold(false, |found, allowed| {
                constant_time_eq(token.as_bytes(), allowed.as_bytes()) | found
            })
    }
}

/// Constant-time byte comparison.
/// Always compares all bytes regardless of where the first mismatch occurs.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut result: u8 = 0;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn gate(env: Option<&str>, tokens: &[&str]) -> AccessGate {
        AccessGate::new(CredentialConfiguration::new(
            env.map(str::to_string),
            tokens.iter().copied(),
        ))
    }

    fn access_config(tokens: &[&str]) -> AccessConfig {
        AccessConfig {
            tokens: tokens.iter().map(|t| t.to_string()).collect(),
            env_token_names: vec!["API_TOKEN".into(), "DOUK_API_TOKEN".into()],
        }
    }

    #[test]
    fn nothing_configured_allows_only_missing_token() {
        let gate = gate(None, &[]);

        assert!(gate.is_open());
        assert!(gate.authorize(None));
        assert!(gate.authorize(Some("")));
        for token in ["x", "anything", "your-secret-token-1", " "] {
            assert!(
                !gate.authorize(Some(token)),
                "non-empty token {token:?} must be denied when nothing is configured"
            );
        }
    }

    #[test]
    fn any_configured_secret_denies_missing_token() {
        for gate in [
            gate(Some("secret"), &[]),
            gate(None, &["t1"]),
            gate(Some("secret"), &["t1", "t2"]),
        ] {
            assert!(!gate.is_open());
            assert!(!gate.authorize(None));
            assert!(!gate.authorize(Some("")));
        }
    }

    #[test]
    fn env_secret_always_accepted() {
        for tokens in [&[][..], &["t1"][..], &["t1", "t2", "t3"][..]] {
            let gate = gate(Some("secret"), tokens);
            assert!(gate.authorize(Some("secret")), "allow-list {tokens:?}");
        }
    }

    #[test]
    fn every_allow_list_entry_accepted() {
        let tokens = ["your-secret-token-1", "your-secret-token-2", "test-token-12345"];
        let gate = gate(Some("secret"), &tokens);
        for token in tokens {
            assert!(gate.authorize(Some(token)));
        }
    }

    #[test]
    fn unknown_tokens_denied() {
        let gate = gate(Some("secret"), &["t1", "t2"]);
        for token in ["t3", "secret ", "SECRET", "t", "t1t2", "invalid-token"] {
            assert!(!gate.authorize(Some(token)), "{token:?} must be denied");
        }
    }

    #[test]
    fn allow_list_scenario() {
        let gate = gate(None, &["t1", "t2"]);
        assert!(gate.authorize(Some("t1")));
        assert!(!gate.authorize(Some("t3")));
        assert!(!gate.authorize(Some("")));
    }

    #[test]
    fn env_secret_scenario() {
        let env = HashMap::from([("API_TOKEN", "secret")]);
        let credentials =
            CredentialConfiguration::from_lookup(&access_config(&[]), |name| {
                env.get(name).map(|v| v.to_string())
            });
        let gate = AccessGate::new(credentials);

        assert!(gate.authorize(Some("secret")));
        assert!(!gate.authorize(Some("")));
        assert!(!gate.authorize(Some("other")));
    }

    #[test]
    fn first_non_empty_env_var_wins() {
        let env = HashMap::from([("API_TOKEN", ""), ("DOUK_API_TOKEN", "fallback")]);
        let credentials =
            CredentialConfiguration::from_lookup(&access_config(&[]), |name| {
                env.get(name).map(|v| v.to_string())
            });
        assert_eq!(credentials.env_secret(), Some("fallback"));

        let env = HashMap::from([("API_TOKEN", "primary"), ("DOUK_API_TOKEN", "fallback")]);
        let credentials =
            CredentialConfiguration::from_lookup(&access_config(&[]), |name| {
                env.get(name).map(|v| v.to_string())
            });
        assert_eq!(credentials.env_secret(), Some("primary"));
        assert!(!AccessGate::new(credentials).authorize(Some("fallback")));
    }

    #[test]
    fn empty_env_values_count_as_unset() {
        let credentials =
            CredentialConfiguration::from_lookup(&access_config(&[]), |_| Some(String::new()));
        assert!(credentials.is_empty());
        assert!(AccessGate::new(credentials).authorize(None));
    }

    #[test]
    fn comparison_is_exact() {
        let gate = gate(Some("key-with-space "), &[]);
        assert!(!gate.authorize(Some("key-with-space")));
        assert!(gate.authorize(Some("key-with-space ")));
    }

    #[test]
    fn clones_share_credentials() {
        let gate = gate(None, &["t1"]);
        let clone = gate.clone();
        assert!(Arc::ptr_eq(&gate.credentials, &clone.credentials));
    }

    #[test]
    fn constant_time_eq_handles_lengths() {
        assert!(constant_time_eq(b"abc", b"abc"));
        assert!(!constant_time_eq(b"abc", b"abd"));
        assert!(!constant_time_eq(b"abc", b"abcd"));
        assert!(constant_time_eq(b"", b""));
    }
}
