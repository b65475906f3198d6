//! Errors of the historic-instance collaborator

use thiserror::Error;
use trellis_types::ExecutionId;

pub type HistoryResult<T> = Result<T, HistoryError>;

#[derive(Error, Debug)]
pub enum HistoryError {
    #[error("historic process instance not found: {0}")]
    NotFound(ExecutionId),

    #[error("historic process instance already finished: {0}")]
    AlreadyFinished(ExecutionId),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_carry_instance_id() {
        let err = HistoryError::NotFound(ExecutionId::new("instance-1"));
        assert!(err.to_string().contains("instance-1"));
    }
}
