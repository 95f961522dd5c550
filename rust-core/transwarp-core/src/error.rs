//! # Error Handling
//!
//! Two families of errors live here:
//!
//! - [`Error`] - failures of the framework itself (bad route pattern, bind failure,
//!   ORM mapping problems, database errors).
//! - [`HttpError`] - control-flow errors raised by handlers and interceptors. The
//!   dispatcher catches them and turns them into the matching response.

use crate::status::{status_line, POWERED_BY};
use thiserror::Error;

/// Result type alias for Transwarp operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for the Transwarp runtime
#[derive(Error, Debug)]
pub enum Error {
    /// Server failed to bind to the specified address
    #[error("Failed to bind server to {address}: {source}")]
    BindError {
        /// The address we tried to bind to
        address: String,
        /// The underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// Invalid route pattern provided
    #[error("Invalid route pattern: {pattern}: {reason}")]
    InvalidRoutePattern {
        /// The invalid pattern
        pattern: String,
        /// Reason for invalidity
        reason: String,
    },

    /// Interceptor pattern is neither `prefix*` nor `*suffix`
    #[error("Invalid pattern definition in interceptor: {pattern}")]
    InvalidInterceptorPattern {
        /// The rejected pattern
        pattern: String,
    },

    /// Response status outside the accepted range or format
    #[error("Bad response code: {0}")]
    InvalidStatus(String),

    /// Timezone offset could not be parsed
    #[error("bad utc time zone: {0}")]
    InvalidTimezone(String),

    /// HTTP protocol error
    #[error("HTTP error: {0}")]
    Http(#[from] hyper::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Request payload too large
    #[error("Payload too large: limit={limit} bytes")]
    PayloadTooLarge {
        /// Max allowed size
        limit: usize,
    },

    /// Database error
    #[error("Database error: {message}")]
    Database {
        /// Error message from database
        message: String,
    },

    /// Model declares no primary key
    #[error("Primary key not defined in class: {model}")]
    MissingPrimaryKey {
        /// Model name
        model: String,
    },

    /// Model declares more than one primary key
    #[error("Cannot define more than 1 primary key in class: {model}")]
    DuplicatePrimaryKey {
        /// Model name
        model: String,
    },

    /// Field has no column DDL
    #[error("no ddl in field \"{field}\".")]
    MissingDdl {
        /// Field name
        field: String,
    },

    /// A row lacks a column the model needs
    #[error("Missing column `{column}` in row")]
    MissingColumn {
        /// Column name
        column: String,
    },

    /// Column value cannot be converted to the Rust field type
    #[error("Cannot convert {found} to {expected}")]
    ValueType {
        /// Expected Rust type
        expected: &'static str,
        /// Description of the value found
        found: String,
    },
}

impl From<sqlx::Error> for Error {
    fn from(e: sqlx::Error) -> Self {
        Self::Database {
            message: e.to_string(),
        }
    }
}

/// HTTP error raised from handlers and interceptors
///
/// Handlers return `Err(HttpError)` to leave the normal response path; the
/// dispatcher renders it as an empty-bodied response with the error's status.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HttpError {
    /// Plain status error, optionally carrying extra headers
    #[error("{status}")]
    Http {
        /// Status line, e.g. `403 Forbidden`
        status: String,
        /// Extra headers sent with the error response
        headers: Vec<(String, String)>,
    },

    /// Redirect to another location
    #[error("{status}, {location}")]
    Redirect {
        /// Status line, e.g. `302 Found`
        status: String,
        /// Target of the redirect
        location: String,
    },

    /// No route matched the request
    #[error("url not found")]
    NotFound,
}

impl HttpError {
    /// Error with the given status code
    #[must_use]
    pub fn new(code: u16) -> Self {
        Self::Http {
            status: status_line(code),
            headers: Vec::new(),
        }
    }

    fn redirect_with(code: u16, location: impl Into<String>) -> Self {
        Self::Redirect {
            status: status_line(code),
            location: location.into(),
        }
    }

    /// 400 Bad Request
    #[must_use]
    pub fn bad_request() -> Self {
        Self::new(400)
    }

    /// 401 Unauthorized
    #[must_use]
    pub fn unauthorized() -> Self {
        Self::new(401)
    }

    /// 403 Forbidden
    #[must_use]
    pub fn forbidden() -> Self {
        Self::new(403)
    }

    /// 404 Not Found raised by application code
    #[must_use]
    pub fn not_found() -> Self {
        Self::new(404)
    }

    /// 409 Conflict
    #[must_use]
    pub fn conflict() -> Self {
        Self::new(409)
    }

    /// 500 Internal Server Error
    #[must_use]
    pub fn internal_error() -> Self {
        Self::new(500)
    }

    /// Permanent redirect (301)
    #[must_use]
    pub fn redirect(location: impl Into<String>) -> Self {
        Self::redirect_with(301, location)
    }

    /// Temporary redirect (302)
    #[must_use]
    pub fn found(location: impl Into<String>) -> Self {
        Self::redirect_with(302, location)
    }

    /// Temporary redirect (303)
    #[must_use]
    pub fn see_other(location: impl Into<String>) -> Self {
        Self::redirect_with(303, location)
    }

    /// Attach an extra header to a plain status error
    ///
    /// The first header added also adds `X-Powered-By`. Redirects and
    /// not-found errors ignore extra headers.
    #[must_use]
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if let Self::Http { headers, .. } = &mut self {
            if headers.is_empty() {
                headers.push((POWERED_BY.0.to_string(), POWERED_BY.1.to_string()));
            }
            headers.push((name.to_string(), value.to_string()));
        }
        self
    }

    /// Status line sent for this error
    #[must_use]
    pub fn status(&self) -> String {
        match self {
            Self::Http { status, .. } | Self::Redirect { status, .. } => status.clone(),
            Self::NotFound => status_line(404),
        }
    }

    /// Extra headers carried by the error
    #[must_use]
    pub fn headers(&self) -> &[(String, String)] {
        match self {
            Self::Http { headers, .. } => headers,
            _ => &[],
        }
    }
}
