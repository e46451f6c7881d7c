use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Raised when data crossing into the app does not have the expected shape.
/// Any of these aborts the operation that encountered it.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("completion {id}: bad timestamp '{value}': {source}")]
    Timestamp {
        id: String,
        value: String,
        #[source]
        source: chrono::ParseError,
    },
    #[error("completion {id} belongs to user {user_id}, not the signed-in user")]
    ForeignRecord { id: String, user_id: String },
    #[error("completion {id} references unknown habit {habit_id}")]
    UnknownHabit { id: String, habit_id: String },
    #[error("malformed completion document: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRecord {
    pub id: String,
    pub habit_id: String,
    pub user_id: String,
    pub completed_at: DateTime<Utc>,
}

/// A completion row as it comes out of storage, before the timestamp is checked.
#[derive(Debug, Clone)]
pub struct RawCompletion {
    pub id: String,
    pub habit_id: String,
    pub user_id: String,
    pub completed_at: String,
}

impl TryFrom<RawCompletion> for CompletionRecord {
    type Error = IngestError;

    fn try_from(raw: RawCompletion) -> Result<Self, Self::Error> {
        let completed_at = parse_timestamp(&raw.completed_at).map_err(|source| {
            IngestError::Timestamp {
                id: raw.id.clone(),
                value: raw.completed_at.clone(),
                source,
            }
        })?;
        Ok(CompletionRecord {
            id: raw.id,
            habit_id: raw.habit_id,
            user_id: raw.user_id,
            completed_at,
        })
    }
}

/// Completion document in the hosted backend's export shape. System fields other
/// than `$id` are ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionDocument {
    #[serde(rename = "$id")]
    pub id: String,
    pub habit_id: String,
    pub user_id: String,
    pub completed_at: String,
}

impl CompletionDocument {
    pub fn parse_many(json: &str) -> Result<Vec<CompletionDocument>, IngestError> {
        Ok(serde_json::from_str(json)?)
    }
}

impl From<CompletionDocument> for RawCompletion {
    fn from(doc: CompletionDocument) -> Self {
        RawCompletion {
            id: doc.id,
            habit_id: doc.habit_id,
            user_id: doc.user_id,
            completed_at: doc.completed_at,
        }
    }
}

impl From<&CompletionRecord> for CompletionDocument {
    fn from(rec: &CompletionRecord) -> Self {
        CompletionDocument {
            id: rec.id.clone(),
            habit_id: rec.habit_id.clone(),
            user_id: rec.user_id.clone(),
            completed_at: format_timestamp(&rec.completed_at),
        }
    }
}

pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(s).map(|dt| dt.with_timezone(&Utc))
}

/// Fixed-width RFC 3339 so stored values sort lexicographically.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(completed_at: &str) -> RawCompletion {
        RawCompletion {
            id: "c1".to_string(),
            habit_id: "h1".to_string(),
            user_id: "u1".to_string(),
            completed_at: completed_at.to_string(),
        }
    }

    #[test]
    fn decodes_offset_timestamps_to_utc() {
        let rec = CompletionRecord::try_from(raw("2026-03-01T08:30:00+02:00")).unwrap();
        assert_eq!(format_timestamp(&rec.completed_at), "2026-03-01T06:30:00.000Z");
    }

    #[test]
    fn rejects_malformed_timestamp() {
        let err = CompletionRecord::try_from(raw("yesterday")).unwrap_err();
        match err {
            IngestError::Timestamp { id, value, .. } => {
                assert_eq!(id, "c1");
                assert_eq!(value, "yesterday");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn parses_backend_documents_ignoring_system_fields() {
        let json = r#"[{
            "$id": "abc",
            "$createdAt": "2026-01-01T00:00:00.000+00:00",
            "$collectionId": "completions",
            "habit_id": "h1",
            "user_id": "u1",
            "completed_at": "2026-01-01T00:00:00.000Z"
        }]"#;
        let docs = CompletionDocument::parse_many(json).unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, "abc");
    }

    #[test]
    fn document_missing_field_is_rejected() {
        let json = r#"[{"$id": "abc", "habit_id": "h1", "completed_at": "2026-01-01T00:00:00Z"}]"#;
        assert!(matches!(
            CompletionDocument::parse_many(json),
            Err(IngestError::Json(_))
        ));
    }
}
