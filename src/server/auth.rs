//! Access checks for matched pages: enabled flag, delivery prevention and
//! HTTP basic authentication against the site's bcrypt user table.

use axum::http::{header, HeaderMap};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::page::{PageNode, VALID_USER};

/// Password hashed for unknown users, so every check costs one bcrypt run
const DUMMY_PASSWORD: &str = "pcms-unknown-user";

/// Username and password presented with a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: &str, password: &str) -> Self {
        Self {
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    /// Parse an `Authorization: Basic ...` header
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
        let (scheme, encoded) = value.trim().split_once(' ')?;
        if !scheme.eq_ignore_ascii_case("basic") {
            return None;
        }
        let decoded = STANDARD.decode(encoded.trim()).ok()?;
        let decoded = String::from_utf8(decoded).ok()?;
        let (username, password) = decoded.split_once(':')?;
        Some(Self::new(username, password))
    }
}

/// Outcome of an access check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    Allow,
    /// Credentials missing or wrong; the client should be challenged
    Deny(String),
    /// The page or sub-path is not delivered at all
    Forbidden(String),
}

/// Username to bcrypt hash table from the site configuration
pub struct CredentialStore {
    users: BTreeMap<String, String>,
    dummy_hash: String,
}

impl CredentialStore {
    /// Create the store. Hashes a throwaway password at the strongest cost
    /// found in the table, used when a username is unknown.
    pub fn new(users: BTreeMap<String, String>) -> Result<Self, bcrypt::BcryptError> {
        let cost = users
            .values()
            .filter_map(|hash| hash_cost(hash))
            .max()
            .unwrap_or(4)
            .clamp(4, 31);
        let dummy_hash = bcrypt::hash(DUMMY_PASSWORD, cost)?;
        Ok(Self { users, dummy_hash })
    }

    /// Check a password. Runs bcrypt even for unknown usernames.
    pub fn verify(&self, username: &str, password: &str) -> bool {
        let (hash, known) = match self.users.get(username) {
            Some(hash) => (hash.as_str(), true),
            None => (self.dummy_hash.as_str(), false),
        };
        match bcrypt::verify(password, hash) {
            Ok(valid) => valid && known,
            Err(e) => {
                tracing::warn!("Cannot verify password of user {}: {}", username, e);
                false
            }
        }
    }
}

/// Cost factor of a `$2b$12$...` hash
fn hash_cost(hash: &str) -> Option<u32> {
    hash.split('$').nth(2)?.parse().ok()
}

/// Decides whether a matched page may be delivered
pub struct AccessGate {
    store: Arc<CredentialStore>,
}

impl AccessGate {
    pub fn new(store: CredentialStore) -> Self {
        Self {
            store: Arc::new(store),
        }
    }

    /// Check the page's `enabled` flag and `preventDelivery` patterns.
    ///
    /// Patterns only ever see the tail; an absent tail never matches.
    pub fn check_delivery(&self, page: &PageNode, tail: Option<&str>) -> Access {
        if !page.page_config.enabled {
            return Access::Forbidden(format!("page {} is disabled", page.route));
        }
        if let Some(tail) = tail {
            if let Some(filter) = page.delivery_filters().iter().find(|f| f.is_match(tail)) {
                return Access::Forbidden(format!(
                    "{} matches preventDelivery pattern {}",
                    tail,
                    filter.as_str()
                ));
            }
        }
        Access::Allow
    }

    /// Full check: delivery rules first, then `requiredUsers`
    pub async fn authorize(
        &self,
        page: &PageNode,
        tail: Option<&str>,
        credentials: Option<Credentials>,
    ) -> Access {
        let delivery = self.check_delivery(page, tail);
        if delivery != Access::Allow {
            return delivery;
        }

        let Some(required_users) = page.page_config.required_users.as_ref() else {
            return Access::Allow;
        };
        let Some(credentials) = credentials else {
            return Access::Deny(format!("credentials required for {}", page.route));
        };
        if required_users.is_empty() {
            return Access::Deny(format!("no users defined for {}", page.route));
        }

        tracing::debug!("Checking credentials for {}", page.route);
        let store = Arc::clone(&self.store);
        let username = credentials.username.clone();
        let verified = tokio::task::spawn_blocking(move || {
            store.verify(&credentials.username, &credentials.password)
        })
        .await
        .unwrap_or_else(|e| {
            tracing::error!("Password check failed: {}", e);
            false
        });

        let admitted = required_users
            .iter()
            .any(|user| user == &username || user == VALID_USER);
        if verified && admitted {
            tracing::debug!("Valid credentials for {}", page.route);
            Access::Allow
        } else {
            tracing::debug!("Access denied: invalid credentials for {}", page.route);
            Access::Deny(format!("invalid credentials for {}", page.route))
        }
    }
}
