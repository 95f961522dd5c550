//! # Interceptors
//!
//! Chain-of-responsibility wrappers around route dispatch.
//!
//! An interceptor receives the request context and a `next` function. It may
//! call `next` to continue down the chain (and inspect or amend the response
//! afterwards), or return without calling it to short-circuit the request.
//!
//! Interceptors run outer-to-inner in registration order before the handler
//! and unwind in reverse order after it. Each one applies only to request
//! paths accepted by its [`PathPattern`].

use crate::context::Context;
use crate::error::{Error, Result};
use crate::route::HandlerResult;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Continuation handed to an interceptor
pub type Next<'a> = &'a dyn Fn(&mut Context) -> HandlerResult;

/// A fully composed request pipeline
pub type Chain = Box<dyn Fn(&mut Context) -> HandlerResult + Send + Sync>;

type InterceptorFn = Arc<dyn Fn(&mut Context, Next<'_>) -> HandlerResult + Send + Sync>;

/// Which request paths an interceptor applies to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathPattern {
    /// `"/api/"` or `"/api/*"`: paths starting with the prefix
    StartsWith(String),
    /// `"*.json"`: paths ending with the suffix
    EndsWith(String),
}

impl PathPattern {
    /// Parse `prefix`, `prefix*` or `*suffix`
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInterceptorPattern` for empty patterns, a lone
    /// `*`, inner wildcards or `?`.
    pub fn parse(pattern: &str) -> Result<Self> {
        let invalid = || Error::InvalidInterceptorPattern {
            pattern: pattern.to_string(),
        };
        let plain = |s: &str| !s.is_empty() && !s.contains(['*', '?']);

        if let Some(suffix) = pattern.strip_prefix('*') {
            return if plain(suffix) {
                Ok(Self::EndsWith(suffix.to_string()))
            } else {
                Err(invalid())
            };
        }
        let prefix = pattern.strip_suffix('*').unwrap_or(pattern);
        if plain(prefix) {
            Ok(Self::StartsWith(prefix.to_string()))
        } else {
            Err(invalid())
        }
    }

    /// Whether `path` is covered by the pattern
    #[must_use]
    pub fn matches(&self, path: &str) -> bool {
        match self {
            Self::StartsWith(prefix) => path.starts_with(prefix.as_str()),
            Self::EndsWith(suffix) => path.ends_with(suffix.as_str()),
        }
    }
}

/// A named, pattern-scoped request interceptor
#[derive(Clone)]
pub struct Interceptor {
    name: String,
    pattern: PathPattern,
    func: InterceptorFn,
}

impl fmt::Debug for Interceptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interceptor")
            .field("name", &self.name)
            .field("pattern", &self.pattern)
            .finish_non_exhaustive()
    }
}

impl Interceptor {
    /// Create an interceptor for paths matching `pattern`
    ///
    /// # Errors
    ///
    /// See [`PathPattern::parse`].
    pub fn new<F>(pattern: &str, func: F) -> Result<Self>
    where
        F: Fn(&mut Context, Next<'_>) -> HandlerResult + Send + Sync + 'static,
    {
        Ok(Self::from_parts("interceptor", PathPattern::parse(pattern)?, func))
    }

    fn from_parts<F>(name: &str, pattern: PathPattern, func: F) -> Self
    where
        F: Fn(&mut Context, Next<'_>) -> HandlerResult + Send + Sync + 'static,
    {
        Self {
            name: name.to_string(),
            pattern,
            func: Arc::new(func),
        }
    }

    /// Rename the interceptor (used in logs)
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Interceptor name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Path pattern
    #[must_use]
    pub const fn pattern(&self) -> &PathPattern {
        &self.pattern
    }

    /// Access log for every request, in structured form
    #[must_use]
    pub fn logging() -> Self {
        Self::from_parts("logging", PathPattern::StartsWith("/".into()), |ctx, next| {
            let method = ctx.request.method().to_string();
            let path = ctx.request.path_info();
            let request_id = ctx.request.header("x-request-id").unwrap_or("-").to_string();
            info!(method = %method, path = %path, request_id = %request_id, "Request received");

            let result = next(ctx);
            let status = match &result {
                Ok(_) => ctx.response.status().to_string(),
                Err(e) => e.status(),
            };
            info!(method = %method, path = %path, status = %status, request_id = %request_id, "Response sent");
            result
        })
    }

    /// Debug-level timing of every request
    #[must_use]
    pub fn timing() -> Self {
        Self::from_parts("timing", PathPattern::StartsWith("/".into()), |ctx, next| {
            let start = Instant::now();
            let result = next(ctx);
            debug!(
                method = %ctx.request.method(),
                path = %ctx.request.path_info(),
                duration_ms = %start.elapsed().as_millis(),
                "Request timing"
            );
            result
        })
    }

    /// Cross-Origin Resource Sharing headers on every response
    #[must_use]
    pub fn cors(origin: impl Into<String>) -> Self {
        let origin = origin.into();
        Self::from_parts("cors", PathPattern::StartsWith("/".into()), move |ctx, next| {
            let result = next(ctx);
            ctx.response
                .set_header("Access-Control-Allow-Origin", &origin);
            ctx.response.set_header(
                "Access-Control-Allow-Methods",
                "GET, POST, PUT, DELETE, PATCH, OPTIONS",
            );
            ctx.response
                .set_header("Access-Control-Allow-Headers", "Content-Type, Authorization");
            result
        })
    }
}

/// Anything that can be registered as an interceptor
///
/// Implemented by [`Interceptor`] and by the unit structs generated by the
/// `#[interceptor]` attribute macro.
pub trait IntoInterceptor {
    /// Produce the interceptor
    ///
    /// # Errors
    ///
    /// Propagates pattern errors.
    fn into_interceptor(self) -> Result<Interceptor>;
}

impl IntoInterceptor for Interceptor {
    fn into_interceptor(self) -> Result<Interceptor> {
        Ok(self)
    }
}

impl IntoInterceptor for Result<Interceptor> {
    fn into_interceptor(self) -> Result<Interceptor> {
        self
    }
}

/// Fold `interceptors` right-to-left around `last`
///
/// The first interceptor becomes the outermost layer. A layer whose pattern
/// does not accept the request path passes straight through to `next`.
pub fn build_chain<F>(last: F, interceptors: Vec<Interceptor>) -> Chain
where
    F: Fn(&mut Context) -> HandlerResult + Send + Sync + 'static,
{
    let last: Chain = Box::new(last);
    interceptors.into_iter().rev().fold(last, |next, interceptor| -> Chain {
        Box::new(move |ctx: &mut Context| -> HandlerResult {
            if interceptor.pattern.matches(&ctx.request.path_info()) {
                (interceptor.func)(ctx, &*next)
            } else {
                next(ctx)
            }
        })
    })
}
