use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    Unauthorized,
    Forbidden,
    NotFound,
    Validation,
    Internal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
}

/// Field name to messages, for a single submitted row.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// Error bodies the backend answers with on a rejected request.
///
/// A batch create answers with one entry per submitted row (empty for rows
/// that passed), other endpoints with a `detail` message or an [`ApiError`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ErrorBody {
    Rows(Vec<FieldErrors>),
    Detail { detail: String },
    Api(ApiError),
}

impl ErrorBody {
    /// Flattens the body into display lines, `"{row}. {field}: {message}"` for row errors.
    pub fn messages(&self) -> Vec<String> {
        match self {
            ErrorBody::Rows(rows) => flatten_row_errors(rows),
            ErrorBody::Detail { detail } => vec![detail.clone()],
            ErrorBody::Api(err) => vec![err.message.clone()],
        }
    }
}

pub fn flatten_row_errors(rows: &[FieldErrors]) -> Vec<String> {
    let mut out = Vec::new();
    for (index, fields) in rows.iter().enumerate() {
        for (field, messages) in fields {
            for message in messages {
                out.push(format!("{}. {field}: {message}", index + 1));
            }
        }
    }
    out
}
