use std::error::Error as StdError;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use folio_api_types::{ApiErrorBody, ApiErrorMessage, codes};
use thiserror::Error;

use crate::{application::content::ContentError, infra::error::InfraError};

pub const NOT_FOUND_MESSAGE: &str =
    "Not all who wander are lost, but the page you're looking for is.";
const INTERNAL_MESSAGE: &str = "Something went wrong while preparing this page.";

/// Diagnostic detail attached to error responses for the logging middleware.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub source: &'static str,
    pub status: StatusCode,
    pub messages: Vec<String>,
}

impl ErrorReport {
    pub fn from_error(source: &'static str, status: StatusCode, error: &dyn StdError) -> Self {
        let mut messages = vec![error.to_string()];
        let mut current = error.source();
        while let Some(inner) = current {
            messages.push(inner.to_string());
            current = inner.source();
        }
        Self {
            source,
            status,
            messages,
        }
    }

    pub fn from_message(
        source: &'static str,
        status: StatusCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            source,
            status,
            messages: vec![message.into()],
        }
    }

    pub fn attach(self, response: &mut Response) {
        response.extensions_mut().insert(self);
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Content(#[from] ContentError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error("resource not found")]
    NotFound,
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }

    pub fn is_not_found(&self) -> bool {
        match self {
            AppError::NotFound => true,
            AppError::Content(err) => err.is_not_found(),
            AppError::Infra(_) | AppError::Unexpected(_) => false,
        }
    }

    fn status_code(&self) -> StatusCode {
        if self.is_not_found() {
            StatusCode::NOT_FOUND
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }

    fn presentation(&self) -> (&'static str, &'static str) {
        if self.is_not_found() {
            (codes::NOT_FOUND, NOT_FOUND_MESSAGE)
        } else {
            (codes::INTERNAL, INTERNAL_MESSAGE)
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let (code, message) = self.presentation();
        let report = ErrorReport::from_error("application::error::AppError", status, &self);
        let body = ApiErrorBody {
            error: ApiErrorMessage {
                code: code.to_string(),
                message: message.to_string(),
            },
        };
        let mut response = (status, Json(body)).into_response();
        report.attach(&mut response);
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::DomainError;

    #[test]
    fn missing_entries_map_to_not_found() {
        let err = AppError::from(ContentError::from(DomainError::entry_not_found(
            "posts", "absent",
        )));
        let response = err.into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let report = response
            .extensions()
            .get::<ErrorReport>()
            .expect("report attached");
        assert_eq!(
            report.messages,
            ["entry `absent` not found in collection `posts`"]
        );
    }

    #[test]
    fn other_failures_are_internal() {
        let err = AppError::from(ContentError::task("worker panicked"));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn report_collects_the_source_chain() {
        let err = ContentError::io(
            std::path::Path::new("posts/a/page.mdx"),
            std::io::Error::other("disk on fire"),
        );
        let report = ErrorReport::from_error("test", StatusCode::INTERNAL_SERVER_ERROR, &err);
        assert_eq!(
            report.messages,
            ["failed to read `posts/a/page.mdx`", "disk on fire"]
        );
    }
}
