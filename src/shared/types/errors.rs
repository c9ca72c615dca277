use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Not found: {entity} with {field}={value}")]
    NotFound {
        entity: &'static str,
        field: &'static str,
        value: String,
    },

    #[error("Invalid state transition for transaction {transaction_id}: {reason}")]
    InvalidStateTransition {
        transaction_id: String,
        reason: String,
    },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Domain rule violated: {0}")]
    DomainViolation(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl DomainError {
    pub fn not_found(entity: &'static str, field: &'static str, value: impl ToString) -> Self {
        DomainError::NotFound {
            entity,
            field,
            value: value.to_string(),
        }
    }

    pub fn terminal(transaction_id: impl Into<String>, reason: impl Into<String>) -> Self {
        DomainError::InvalidStateTransition {
            transaction_id: transaction_id.into(),
            reason: reason.into(),
        }
    }

    /// Whether this error is likely transient (e.g. DB connection lost)
    /// and the operation may succeed if retried.
    pub fn is_transient(&self) -> bool {
        matches!(self, DomainError::Storage(_))
    }
}

#[derive(Debug, Error)]
pub enum InfraError {
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),
}

impl From<InfraError> for DomainError {
    fn from(err: InfraError) -> Self {
        DomainError::Storage(err.to_string())
    }
}

impl From<sea_orm::DbErr> for DomainError {
    fn from(err: sea_orm::DbErr) -> Self {
        InfraError::Database(err).into()
    }
}

/// Result type for domain operations
pub type DomainResult<T> = Result<T, DomainError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_message_names_the_key() {
        let err = DomainError::not_found("EVSE", "evseId-stationId", "1-ST-1");
        assert_eq!(err.to_string(), "Not found: EVSE with evseId-stationId=1-ST-1");
    }

    #[test]
    fn only_storage_errors_are_transient() {
        assert!(DomainError::Storage("connection reset".into()).is_transient());
        assert!(!DomainError::Conflict("version".into()).is_transient());
        assert!(!DomainError::terminal("TXN-1", "already ended").is_transient());
    }

    #[test]
    fn db_errors_map_to_storage() {
        let err: DomainError = sea_orm::DbErr::Custom("boom".into()).into();
        assert!(matches!(err, DomainError::Storage(msg) if msg.contains("boom")));
    }
}
