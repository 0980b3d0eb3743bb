//! Caller-facing reply shape for an analysis request.

use crate::error::{Error, RunError};
use crate::orchestrator::Answer;
use serde_json::{Value, json};

/// An HTTP-style status and JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub status: u16,
    pub body: Value,
}

impl Reply {
    pub fn success(answer: &Answer) -> Self {
        Self {
            status: 200,
            body: json!({ "analysis": answer.text }),
        }
    }

    pub fn failure(error: &Error) -> Self {
        let (status, code) = match error {
            Error::Run(RunError::Gateway(_)) | Error::Model(_) => (400, "gateway_error"),
            Error::Run(run) => (422, run.code()),
            Error::Config(_) | Error::Storage(_) => (500, "internal_error"),
        };
        Self {
            status,
            body: json!({ "error": error.to_string(), "code": code }),
        }
    }

    pub fn from_result(result: &crate::Result<Answer>) -> Self {
        match result {
            Ok(answer) => Self::success(answer),
            Err(error) => Self::failure(error),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn to_json(&self) -> String {
        self.body.to_string()
    }
}
