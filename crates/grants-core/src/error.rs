use grants_uuid::RecordId;
use std::fmt;

/// The kind of record an operation failed to find.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordKind {
    Template,
    Organisation,
    Instance,
    FormStatus,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RecordKind::Template => "form template",
            RecordKind::Organisation => "organisation",
            RecordKind::Instance => "form instance",
            RecordKind::FormStatus => "form status",
        };
        f.write_str(name)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GrantsError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("{kind} not found: {id}")]
    NotFound { kind: RecordKind, id: String },

    #[error("failed to create storage directory: {0}")]
    StorageDirCreation(std::io::Error),
    #[error("failed to write record file: {0}")]
    FileWrite(std::io::Error),
    #[error("failed to read record file: {0}")]
    FileRead(std::io::Error),
    #[error("failed to serialize record: {0}")]
    Serialization(serde_json::Error),
    #[error("failed to deserialize record: {0}")]
    Deserialization(serde_json::Error),
    #[error("failed to serialize YAML: {0}")]
    YamlSerialization(serde_yaml::Error),
    #[error("failed to deserialize YAML: {0}")]
    YamlDeserialization(serde_yaml::Error),

    #[error("form template error: {0}")]
    Forms(#[from] forms::FormsError),
    #[error("invalid id: {0}")]
    Id(#[from] grants_uuid::UuidError),

    #[error(
        "instance {parent_id} was updated but its linked instance ({child}) was not: {source}",
        child = child_id.as_ref().map(|id| id.to_string()).unwrap_or_else(|| "new".into())
    )]
    Consistency {
        parent_id: RecordId,
        child_id: Option<RecordId>,
        #[source]
        source: Box<GrantsError>,
    },

    #[error("failed to persist field '{field}': {message}")]
    Persistence { field: String, message: String },
}

impl GrantsError {
    pub(crate) fn not_found(kind: RecordKind, id: impl ToString) -> Self {
        GrantsError::NotFound {
            kind,
            id: id.to_string(),
        }
    }
}

pub type GrantsResult<T> = std::result::Result<T, GrantsError>;
