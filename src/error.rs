//! Process-level error: a message for stderr plus the exit code to return.
//!
//! Exit codes:
//! - `2` bad input (arguments, file type, `not-text`, `missing-columns`)
//! - `3` nothing usable in the upload (`empty-dataset`)
//! - `4` runtime/storage failure
//! - `5` the session may not perform the action

use crate::domain::FileError;
use crate::store::StoreError;

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(5, message)
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::new(4, format!("Dataset store failure: {err}"))
    }
}

impl From<&FileError> for AppError {
    fn from(err: &FileError) -> Self {
        let code = match err {
            FileError::NotText | FileError::MissingColumns { .. } => 2,
            FileError::EmptyDataset => 3,
        };
        AppError::new(code, format!("Upload rejected: {err}"))
    }
}
