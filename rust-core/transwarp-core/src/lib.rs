//! # Transwarp Core
//!
//! Core runtime library for the Transwarp framework.
//! Provides the request dispatcher, routing, interceptors, an HTTP server
//! front end and an active-record ORM.
//!
//! ## Architecture
//!
//! Requests travel as a CGI-style [`Environ`]. The [`Dispatcher`] builds a
//! per-request [`Context`], runs it through the interceptor chain into the
//! matched route handler, and renders a [`WsgiResponse`]. The [`Server`] is a
//! thin Hyper layer translating between HTTP and that contract.
//!
//! ## Modules
//!
//! - `app` - Application registry and the dispatcher
//! - `server` - HTTP server built on Hyper
//! - `router` - Per-method static and dynamic route tables
//! - `route` - Route declaration and path-template compilation
//! - `interceptor` - Chain-of-responsibility request interceptors
//! - `context` - Per-request state
//! - `environ` - CGI-style request environment
//! - `request` - Lazy request view (inputs, headers, cookies, path args)
//! - `response` - Response status, headers and cookies
//! - `status` - Status code and header name tables
//! - `orm` - Field mappings, DDL generation and active records
//! - `tz` - Fixed UTC offsets
//! - `util` - Percent encoding
//! - `error` - Error types and handling

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod app;
pub mod context;
pub mod environ;
pub mod error;
pub mod interceptor;
pub mod orm;
pub mod request;
pub mod response;
pub mod route;
pub mod router;
pub mod server;
pub mod status;
pub mod tz;
pub mod util;

pub use app::{Application, Dispatcher, Module, WsgiResponse};
pub use context::{AppInfo, Context};
pub use environ::Environ;
pub use error::{Error, HttpError, Result};
pub use interceptor::{build_chain, IntoInterceptor, Interceptor, Next, PathPattern};
pub use request::{MultipartFile, Request};
pub use response::{Body, CookieOptions, Response};
pub use route::{get, post, HandlerResult, IntoRoute, Params, Route};
pub use router::{Method, Router};
pub use server::{Server, ServerConfig};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
