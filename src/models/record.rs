use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU32, Ordering};
use thiserror::Error;
use uuid::Uuid;

/// Version label used when ingestion does not supply one
pub const DEFAULT_VERSION: &str = "latest";

/// Name of the identifier field in stored documents
pub const ID_FIELD: &str = "_id";

/// Length of a record identifier in bytes
pub const RECORD_ID_LEN: usize = 12;

static ID_COUNTER: Lazy<AtomicU32> = Lazy::new(|| {
    let seed = Uuid::new_v4();
    let bytes = seed.as_bytes();
    AtomicU32::new(u32::from_be_bytes([0, bytes[0], bytes[1], bytes[2]]))
});

/// Errors raised while parsing or decoding records
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RecordError {
    #[error("'{0}' is not a well-formed record identifier (expected 24 hex characters)")]
    MalformedId(String),

    #[error("Stored document is not a valid record: {0}")]
    InvalidDocument(String),
}

/// Opaque record identifier assigned by the store at creation.
///
/// Layout: 4 bytes of creation time (seconds, big endian), 5 random bytes and a
/// 3 byte counter. Rendered as 24 lowercase hex characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordId([u8; RECORD_ID_LEN]);

impl RecordId {
    /// Generate a fresh identifier
    pub fn new() -> Self {
        let mut bytes = [0u8; RECORD_ID_LEN];

        let secs = Utc::now().timestamp().clamp(0, u32::MAX as i64) as u32;
        bytes[0..4].copy_from_slice(&secs.to_be_bytes());

        let random = Uuid::new_v4();
        bytes[4..9].copy_from_slice(&random.as_bytes()[..5]);

        let count = ID_COUNTER.fetch_add(1, Ordering::Relaxed) & 0x00ff_ffff;
        bytes[9..12].copy_from_slice(&count.to_be_bytes()[1..]);

        Self(bytes)
    }

    /// Build an identifier from raw storage bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, RecordError> {
        let raw: [u8; RECORD_ID_LEN] = bytes
            .try_into()
            .map_err(|_| RecordError::MalformedId(format!("{} raw bytes", bytes.len())))?;
        Ok(Self(raw))
    }

    /// Raw bytes, used as the storage key
    pub fn as_bytes(&self) -> &[u8; RECORD_ID_LEN] {
        &self.0
    }

    /// Check whether a string is a well-formed identifier without allocating one
    pub fn is_well_formed(value: &str) -> bool {
        value.len() == RECORD_ID_LEN * 2 && value.bytes().all(|b| b.is_ascii_hexdigit())
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

impl FromStr for RecordId {
    type Err = RecordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if !Self::is_well_formed(s) {
            return Err(RecordError::MalformedId(s.to_string()));
        }

        let mut bytes = [0u8; RECORD_ID_LEN];
        for (i, chunk) in s.as_bytes().chunks(2).enumerate() {
            let pair = std::str::from_utf8(chunk)
                .map_err(|_| RecordError::MalformedId(s.to_string()))?;
            bytes[i] =
                u8::from_str_radix(pair, 16).map_err(|_| RecordError::MalformedId(s.to_string()))?;
        }

        Ok(Self(bytes))
    }
}

impl Serialize for RecordId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for RecordId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// A stored documentation entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    /// Unique identifier, rendered as plain hex text
    #[serde(rename = "_id")]
    pub id: RecordId,

    /// Subject the record documents
    pub technology: String,

    /// Documented version, `latest` when not supplied
    pub version: String,

    /// Ingested document, no fixed schema
    pub content: Value,

    /// Tags, seeded with the technology name
    pub tags: Vec<String>,

    /// Ingestion time
    pub last_updated: DateTime<Utc>,
}

impl Record {
    /// Create a new record for freshly ingested content
    pub fn new(technology: impl Into<String>, version: Option<String>, content: Value) -> Self {
        let technology = technology.into();
        let version = version
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_VERSION.to_string());

        Self {
            id: RecordId::new(),
            tags: vec![technology.clone()],
            technology,
            version,
            content,
            last_updated: Utc::now(),
        }
    }

    /// Title from the nested content, if the document has one
    pub fn title(&self) -> Option<&str> {
        self.content.get("title").and_then(Value::as_str)
    }

    /// Description from the nested content, if the document has one
    pub fn description(&self) -> Option<&str> {
        self.content.get("description").and_then(Value::as_str)
    }

    /// Convert to the store's document representation
    pub fn to_document(&self) -> Result<Map<String, Value>, RecordError> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(other) => Err(RecordError::InvalidDocument(format!(
                "expected an object, got {}",
                other
            ))),
            Err(e) => Err(RecordError::InvalidDocument(e.to_string())),
        }
    }

    /// Rebuild a record from a stored document
    pub fn from_document(document: Map<String, Value>) -> Result<Self, RecordError> {
        serde_json::from_value(Value::Object(document))
            .map_err(|e| RecordError::InvalidDocument(e.to_string()))
    }
}
