//! Per-identity context store.
//!
//! Holds the last rendered context for each identity in process memory.
//! Writes replace the whole entry (last write wins); nothing is merged,
//! versioned, or expired. Rendering happens before the write lock is taken,
//! so the lock is only held for the map insert.

use std::collections::HashMap;
use std::sync::Arc;

use aymara_config::ContextConfig;
use aymara_core::Identity;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::normalize::normalize;
use crate::render::{LOG_PREVIEW_CHARS, RenderedContext};
use crate::unwrap::decode_layers;

/// Identity used when configuration does not provide a usable one.
const FALLBACK_IDENTITY: i64 = 2723;

// ── Clock ─────────────────────────────────────────────────────────────────

/// Source of "now" for stored-at timestamps.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

// ── Identity resolution ───────────────────────────────────────────────────

/// How the key for a stored context is chosen.
///
/// Priority: the explicit identity, then the identity embedded in the
/// payload under `identity_field`, then `default_identity`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityPolicy {
    pub default_identity: Identity,
    pub identity_field: String,
}

impl Default for IdentityPolicy {
    fn default() -> Self {
        Self::from(&ContextConfig::default())
    }
}

impl From<&ContextConfig> for IdentityPolicy {
    fn from(config: &ContextConfig) -> Self {
        Self {
            default_identity: Identity::parse(&config.default_identity)
                .unwrap_or_else(|| Identity::from(FALLBACK_IDENTITY)),
            identity_field: config.identity_field.clone(),
        }
    }
}

impl IdentityPolicy {
    /// Resolve the identity for a write.
    pub fn resolve(&self, explicit: Option<Identity>, raw: Option<&Value>) -> Identity {
        explicit
            .or_else(|| self.embedded(raw))
            .unwrap_or_else(|| self.default_identity.clone())
    }

    /// Identity carried inside the payload, if any.
    pub fn embedded(&self, raw: Option<&Value>) -> Option<Identity> {
        match raw? {
            Value::Object(map) => map.get(&self.identity_field).and_then(Identity::from_value),
            Value::String(s) => match decode_layers(s) {
                Value::Object(map) => map.get(&self.identity_field).and_then(Identity::from_value),
                _ => None,
            },
            _ => None,
        }
    }
}

// ── Store ─────────────────────────────────────────────────────────────────

/// A stored context and when it was written.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredContext {
    pub identity: Identity,
    pub text: RenderedContext,
    pub stored_at: DateTime<Utc>,
}

/// Shared identity → context map.
pub struct ContextStore {
    entries: RwLock<HashMap<Identity, StoredContext>>,
    policy: IdentityPolicy,
    clock: Arc<dyn Clock>,
}

impl Default for ContextStore {
    fn default() -> Self {
        Self::new(IdentityPolicy::default())
    }
}

impl ContextStore {
    pub fn new(policy: IdentityPolicy) -> Self {
        Self::with_clock(policy, Arc::new(SystemClock))
    }

    pub fn with_clock(policy: IdentityPolicy, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            policy,
            clock,
        }
    }

    pub fn policy(&self) -> &IdentityPolicy {
        &self.policy
    }

    /// Render `raw` and store it under the resolved identity.
    ///
    /// Returns the identity the context was stored under.
    pub async fn put(&self, explicit: Option<Identity>, raw: Option<&Value>) -> Identity {
        let identity = self.policy.resolve(explicit, raw);
        let text = normalize(raw);

        debug!(
            identity = %identity,
            preview = %text.preview(LOG_PREVIEW_CHARS),
            "Context rendered"
        );

        let entry = StoredContext {
            identity: identity.clone(),
            text,
            stored_at: self.clock.now(),
        };

        let total = {
            let mut entries = self.entries.write().await;
            entries.insert(identity.clone(), entry);
            entries.len()
        };

        info!(identity = %identity, total, "Context stored");
        identity
    }

    /// The rendered context stored for `identity`.
    pub async fn get(&self, identity: &Identity) -> Option<RenderedContext> {
        let found = self
            .entries
            .read()
            .await
            .get(identity)
            .map(|e| e.text.clone());
        debug!(identity = %identity, found = found.is_some(), "Context lookup");
        found
    }

    /// The full stored entry for `identity`.
    pub async fn entry(&self, identity: &Identity) -> Option<StoredContext> {
        self.entries.read().await.get(identity).cloned()
    }

    /// Remove the entry for `identity`. Returns whether one existed.
    pub async fn delete(&self, identity: &Identity) -> bool {
        let removed = self.entries.write().await.remove(identity).is_some();
        if removed {
            info!(identity = %identity, "Context deleted");
        }
        removed
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}
