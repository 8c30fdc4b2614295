//! Call outcomes as values instead of errors

use crate::error::{ClientError, ClientResult};

/// Outcome of a call that never fails at the call site
#[derive(Debug)]
pub enum ApiResult<T> {
    Success(T),
    /// The server answered with a non-success status
    ApiError { status: u16, body: Option<String> },
    /// The call did not produce a usable response
    Error(ClientError),
}

impl<T> ApiResult<T> {
    pub fn from_call(result: ClientResult<T>) -> Self {
        match result {
            Ok(value) => ApiResult::Success(value),
            Err(ClientError::Status { status, body }) => ApiResult::ApiError { status, body },
            Err(e) => ApiResult::Error(e),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ApiResult::Success(_))
    }

    pub fn ok(self) -> Option<T> {
        match self {
            ApiResult::Success(value) => Some(value),
            _ => None,
        }
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> ApiResult<U> {
        match self {
            ApiResult::Success(value) => ApiResult::Success(f(value)),
            ApiResult::ApiError { status, body } => ApiResult::ApiError { status, body },
            ApiResult::Error(e) => ApiResult::Error(e),
        }
    }

    pub fn into_result(self) -> ClientResult<T> {
        match self {
            ApiResult::Success(value) => Ok(value),
            ApiResult::ApiError { status, body } => Err(ClientError::Status { status, body }),
            ApiResult::Error(e) => Err(e),
        }
    }
}

impl<T> From<ClientResult<T>> for ApiResult<T> {
    fn from(result: ClientResult<T>) -> Self {
        Self::from_call(result)
    }
}
