use kafka_harness_client::ClientError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, HarnessError>;

#[derive(Error, Debug)]
pub enum HarnessError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("missing relation data from app: {}", .missing.join(", "))]
    MissingRelationData { missing: Vec<&'static str> },

    #[error("Relation not found: {0}")]
    RelationNotFound(String),

    #[error("Unknown channel: {0}")]
    UnknownChannel(String),

    #[error("Client error: {0}")]
    Client(#[from] ClientError),
}

impl HarnessError {
    pub fn category(&self) -> &'static str {
        match self {
            HarnessError::Io(_) => "io",
            HarnessError::Serialization(_) => "serialization",
            HarnessError::Config(_) | HarnessError::InvalidConfig(_) => "configuration",
            HarnessError::Storage(_) => "storage",
            HarnessError::MissingRelationData { .. } => "missing_relation_data",
            HarnessError::RelationNotFound(_) | HarnessError::UnknownChannel(_) => "relation",
            HarnessError::Client(e) => e.category(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_relation_data_message() {
        let err = HarnessError::MissingRelationData {
            missing: vec!["password", "endpoints"],
        };
        assert_eq!(
            err.to_string(),
            "missing relation data from app: password, endpoints"
        );
        assert_eq!(err.category(), "missing_relation_data");
    }

    #[test]
    fn test_client_error_category_passthrough() {
        let err: HarnessError = ClientError::InsufficientMessages {
            expected: 3,
            observed: 1,
        }
        .into();
        assert_eq!(err.category(), "insufficient_messages");
    }
}
