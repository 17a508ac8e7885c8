use shared::{
    domain::TransferId,
    error::{flatten_row_errors, FieldErrors},
};
use thiserror::Error;

use crate::draft::RowKey;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ListError {
    #[error("row {0} is already in the list")]
    DuplicateRow(RowKey),
    #[error("transfer already persisted as {existing}, refusing to reassign {attempted}")]
    ServerIdReassigned {
        existing: TransferId,
        attempted: TransferId,
    },
}

/// Failure reported by a [`crate::api::TransferApi`] call.
#[derive(Debug, Error)]
pub enum ApiFailure {
    /// One field error set per submitted row, in request order.
    #[error("request rejected with field errors for {} rows", .0.len())]
    FieldErrors(Vec<FieldErrors>),
    #[error("{0}")]
    Message(String),
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

#[derive(Debug, Error)]
pub enum SaveError {
    #[error("transfer list failed validation")]
    Validation(Vec<String>),
    #[error("server rejected the transfers")]
    Rejected(Vec<String>),
    #[error("{0}")]
    Server(String),
    #[error("server returned {received} transfers for {sent} submitted rows")]
    ResponseMismatch { sent: usize, received: usize },
    #[error("not every transfer is persisted; save before generating XML")]
    NotPersisted,
}

impl SaveError {
    /// Display lines for the user, one message per line.
    pub fn messages(&self) -> Vec<String> {
        match self {
            SaveError::Validation(messages) | SaveError::Rejected(messages) => messages.clone(),
            other => vec![other.to_string()],
        }
    }
}

impl From<ApiFailure> for SaveError {
    fn from(value: ApiFailure) -> Self {
        match value {
            ApiFailure::FieldErrors(rows) => {
                let messages = flatten_row_errors(&rows);
                if messages.is_empty() {
                    SaveError::Server("the server rejected the transfers".to_string())
                } else {
                    SaveError::Rejected(messages)
                }
            }
            ApiFailure::Message(message) => SaveError::Server(message),
            ApiFailure::Transport(err) => SaveError::Server(format!(
                "could not reach the server, please retry ({err})"
            )),
        }
    }
}
