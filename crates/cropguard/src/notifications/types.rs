//! Core types for the notification subsystem.
//!
//! These are shared by both delivery channels: the persistent stream and the
//! fallback poller.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::collections::{HashSet, VecDeque};

/// A single notification as served by the backend.
///
/// Arrives either as a stream message or inside a pull response. The `kind`
/// tag drives display styling elsewhere in the app and is opaque here.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct NotificationRecord {
    /// Unique id, used for cross-channel deduplication. May be empty for
    /// stream payloads that carry no id; such records skip dedup.
    #[serde(default)]
    pub id: String,

    /// Owning user.
    #[serde(default)]
    pub user_id: String,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub body: String,

    /// Category tag (`type` on the wire).
    #[serde(default, rename = "type")]
    pub kind: String,

    /// Server-side creation time. Missing or unparseable timestamps fall
    /// back to the epoch rather than failing the whole record.
    #[serde(default = "epoch", deserialize_with = "lenient_datetime")]
    pub created_at: DateTime<Utc>,
}

impl Default for NotificationRecord {
    fn default() -> Self {
        Self {
            id: String::new(),
            user_id: String::new(),
            title: String::new(),
            body: String::new(),
            kind: String::new(),
            created_at: epoch(),
        }
    }
}

fn epoch() -> DateTime<Utc> {
    DateTime::<Utc>::UNIX_EPOCH
}

fn lenient_datetime<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(parse_timestamp(value.as_ref()).unwrap_or_else(epoch))
}

fn parse_timestamp(value: Option<&Value>) -> Option<DateTime<Utc>> {
    match value? {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        Value::Number(n) => n.as_i64().and_then(|secs| DateTime::from_timestamp(secs, 0)),
        _ => None,
    }
}

/// One inbound message on the persistent stream.
///
/// A superset of [`NotificationRecord`]: older backend versions put the body
/// text in a `message` field, so the effective body is `body` falling back
/// to `message`. Unknown fields are ignored.
#[derive(Debug, Deserialize)]
pub struct StreamPayload {
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub user_id: String,

    pub title: Option<String>,

    pub body: Option<String>,

    pub message: Option<String>,

    #[serde(default, rename = "type")]
    pub kind: String,

    #[serde(default = "epoch", deserialize_with = "lenient_datetime")]
    pub created_at: DateTime<Utc>,
}

impl StreamPayload {
    pub fn from_json(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn into_record(self) -> NotificationRecord {
        NotificationRecord {
            id: self.id,
            user_id: self.user_id,
            title: self.title.unwrap_or_default(),
            body: self.body.or(self.message).unwrap_or_default(),
            kind: self.kind,
            created_at: self.created_at,
        }
    }
}

/// Maximum number of notification ids tracked for deduplication.
/// When exceeded, oldest entries are evicted to keep memory bounded.
pub const MAX_DELIVERED_IDS: usize = 10_000;

/// Ids already surfaced to the user within this process lifetime.
///
/// Both channels check-and-record here before handing a record to the
/// notifier, so a notification arriving over the stream and a concurrent
/// poll tick alerts at most once. In-memory only; a process restart starts
/// fresh (consumers already tolerate at-least-once delivery).
#[derive(Default)]
pub struct DeliveredIds {
    /// Set of delivered ids for O(1) lookups
    seen: HashSet<String>,
    /// Queue tracking insertion order for bounded eviction (oldest at front)
    order: VecDeque<String>,
}

impl DeliveredIds {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `id` if not already delivered. Returns true when the id is new.
    ///
    /// Empty ids are always reported new: without an id there is nothing to
    /// deduplicate on, and collapsing all id-less records into one entry
    /// would suppress distinct notifications.
    pub fn record_if_new(&mut self, id: &str) -> bool {
        if id.is_empty() {
            return true;
        }
        if self.seen.contains(id) {
            return false;
        }

        let id_owned = id.to_string();
        self.seen.insert(id_owned.clone());
        self.order.push_back(id_owned);

        while self.seen.len() > MAX_DELIVERED_IDS {
            if let Some(oldest) = self.order.pop_front() {
                self.seen.remove(&oldest);
            } else {
                // queue is empty but the set is not - shouldn't happen, clear to recover
                self.seen.clear();
                break;
            }
        }

        true
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
