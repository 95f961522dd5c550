//! # Transwarp
//!
//! A small web framework: path routing, a chain of request interceptors and an
//! active-record ORM, on top of a Hyper/Tokio server.
//!
//! ```no_run
//! use transwarp::prelude::*;
//!
//! #[get("/hello/:name")]
//! fn hello(ctx: &mut Context) -> Result<String, HttpError> {
//!     Ok(format!("hello, {}", ctx.param("name").unwrap_or("world")))
//! }
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     transwarp::init_tracing(false);
//!     let mut app = Application::new(None);
//!     app.add_url(hello)?;
//!     app.add_interceptor(Interceptor::logging())?;
//!     app.run("127.0.0.1", 9000).await?;
//!     Ok(())
//! }
//! ```
//!
//! Handlers are plain synchronous functions over `&mut Context`; the server
//! runs them on Tokio's blocking pool.

pub use transwarp_core::{
    app, context, environ, error, interceptor, request, response, route, router, server, status,
    tz, util, VERSION,
};
pub use transwarp_core::{
    build_chain, AppInfo, Application, Body, Context, CookieOptions, Dispatcher, Environ, Error,
    HandlerResult, HttpError, IntoInterceptor, IntoRoute, Interceptor, Method, Module,
    MultipartFile, Next, Params, PathPattern, Request, Response, Result, Route, Router, Server,
    ServerConfig, WsgiResponse,
};

pub use transwarp_core::route::{get, post};
pub use transwarp_macros::{get, interceptor, post};

/// Active-record ORM, plus the `Model` derive
pub mod orm {
    pub use transwarp_core::orm::*;
    pub use transwarp_macros::Model;
}

/// Everything a typical application imports
pub mod prelude {
    pub use crate::orm::{ActiveRecord, Db, DbValue, Field, Mapping, Model, SqliteDb};
    pub use crate::{
        get, interceptor, post, Application, Body, Context, CookieOptions, HandlerResult,
        HttpError, Interceptor, Module, Next,
    };
}

use tracing_subscriber::EnvFilter;

/// Initialize tracing for the application
///
/// The filter comes from `RUST_LOG`, defaulting to `info`. `json` selects
/// structured JSON output. Calling it more than once is harmless.
pub fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let _ = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}
