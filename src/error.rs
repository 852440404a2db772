use std::path::PathBuf;

pub const SCHEMA_VERSION: &str = "4.0.0.0";

/// Every way a conversion run can fail. All of them are fatal: the run stops,
/// the transaction is rolled back and the partial target is removed.
#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    #[error("failed to read collection {}: {source:#}", path.to_string_lossy())]
    Source {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("invalid plugin block {class_id}: {source:#}")]
    PluginBlock {
        class_id: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to prepare target from template: {0:#}")]
    Template(#[source] anyhow::Error),

    #[error("the template database cannot be used as target: {}", .0.to_string_lossy())]
    TargetIsTemplate(PathBuf),

    #[error("database version incorrect: expected {expected}, found {found}")]
    SchemaVersion { expected: String, found: String },

    #[error("no {kind} interned for key {key}")]
    UnresolvedReference { kind: &'static str, key: String },

    #[error("{kind} key {key} interned twice")]
    DuplicateKey { kind: &'static str, key: String },

    #[error("error at query:\n{sql}")]
    Statement {
        sql: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error(transparent)]
    Database(#[from] rusqlite::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ConvertError {
    /// Stable code reported at the protocol boundary.
    pub fn code(&self) -> &'static str {
        match self {
            ConvertError::Source { .. } | ConvertError::PluginBlock { .. } => "source_invalid",
            ConvertError::Template(_) => "template_failed",
            ConvertError::TargetIsTemplate(_) => "target_is_template",
            ConvertError::SchemaVersion { .. } => "schema_version_mismatch",
            ConvertError::UnresolvedReference { .. } => "unresolved_reference",
            ConvertError::DuplicateKey { .. } => "duplicate_key",
            ConvertError::Statement { .. } => "statement_failed",
            ConvertError::Database(_) => "db_failed",
            ConvertError::Io(_) => "io_failed",
        }
    }

    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            ConvertError::Source { path, .. } => {
                Some(serde_json::json!({ "sourcePath": path.to_string_lossy() }))
            }
            ConvertError::PluginBlock { class_id, .. } => {
                Some(serde_json::json!({ "classId": class_id }))
            }
            ConvertError::SchemaVersion { expected, found } => {
                Some(serde_json::json!({ "expected": expected, "found": found }))
            }
            ConvertError::Statement { sql, source } => Some(serde_json::json!({
                "statement": sql,
                "driverError": source.to_string(),
            })),
            _ => None,
        }
    }
}

pub type Result<T, E = ConvertError> = std::result::Result<T, E>;
