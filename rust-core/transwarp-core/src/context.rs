//! # Request Context
//!
//! Everything a handler may touch while one request is in flight. The
//! dispatcher builds a fresh [`Context`] per request and drops it when the
//! request ends, whichever way it ends.

use crate::environ::Environ;
use crate::request::Request;
use crate::response::Response;
use std::path::PathBuf;
use std::sync::Arc;

/// Application-wide, read-only information
#[derive(Debug, Clone, Default)]
pub struct AppInfo {
    /// Root directory the application was started with
    pub document_root: Option<PathBuf>,
}

/// Per-request state passed to interceptors and handlers
#[derive(Debug)]
pub struct Context {
    /// Application information shared by all requests
    pub application: Arc<AppInfo>,
    /// The incoming request
    pub request: Request,
    /// The response being built
    pub response: Response,
}

impl Context {
    /// Context for a new request
    #[must_use]
    pub fn new(application: Arc<AppInfo>, environ: Environ) -> Self {
        Self {
            application,
            request: Request::new(environ),
            response: Response::new(),
        }
    }

    /// Shorthand for `self.request.param(name)`
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.request.param(name)
    }
}
