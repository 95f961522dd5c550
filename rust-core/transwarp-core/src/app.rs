//! # Application
//!
//! [`Application`] collects routes and interceptors. Freezing it with
//! [`Application::into_dispatcher`] yields a [`Dispatcher`]: the callable that
//! turns an [`Environ`] into a [`WsgiResponse`].
//!
//! Error mapping at the outermost layer:
//!
//! | handler outcome        | status            | headers                      |
//! |------------------------|-------------------|------------------------------|
//! | `Ok(body)`             | response status   | response headers             |
//! | `HttpError::Redirect`  | redirect status   | response headers + Location  |
//! | `HttpError::NotFound`  | `404 Not Found`   | response headers             |
//! | `HttpError::Http`      | error status      | response + error headers     |
//! | panic                  | `500`             | response headers             |
//!
//! Error responses carry an empty body.

use crate::context::{AppInfo, Context};
use crate::environ::Environ;
use crate::error::{Error, HttpError, Result};
use crate::interceptor::{build_chain, Chain, IntoInterceptor, Interceptor};
use crate::route::{HandlerResult, IntoRoute, Route};
use crate::router::{Method, Router};
use crate::server::Server;
use crate::status::{status_line, POWERED_BY};
use hyper::body::Bytes;
use std::net::SocketAddr;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

/// A named group of routes registered together
#[derive(Default)]
pub struct Module {
    name: String,
    routes: Vec<Result<Route>>,
}

impl Module {
    /// Empty module
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            routes: Vec::new(),
        }
    }

    /// Add a route to the module
    #[must_use]
    pub fn with(mut self, route: impl IntoRoute) -> Self {
        self.routes.push(route.into_route());
        self
    }

    /// Module name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Route and interceptor registry
#[derive(Default)]
pub struct Application {
    info: AppInfo,
    router: Router,
    interceptors: Vec<Interceptor>,
}

impl Application {
    /// New application, optionally rooted at `document_root`
    #[must_use]
    pub fn new(document_root: Option<PathBuf>) -> Self {
        Self {
            info: AppInfo { document_root },
            ..Self::default()
        }
    }

    /// Register one route
    ///
    /// # Errors
    ///
    /// Propagates route construction errors.
    pub fn add_url(&mut self, route: impl IntoRoute) -> Result<()> {
        self.router.add(route.into_route()?);
        Ok(())
    }

    /// Register every route of a module
    ///
    /// # Errors
    ///
    /// Returns the first route construction error; routes before it stay registered.
    pub fn add_module(&mut self, module: Module) -> Result<()> {
        info!("Add module: {}", module.name);
        for route in module.routes {
            self.router.add(route?);
        }
        Ok(())
    }

    /// Append an interceptor; registration order is execution order
    ///
    /// # Errors
    ///
    /// Propagates interceptor pattern errors.
    pub fn add_interceptor(&mut self, interceptor: impl IntoInterceptor) -> Result<()> {
        let interceptor = interceptor.into_interceptor()?;
        info!("Add interceptor: {}", interceptor.name());
        self.interceptors.push(interceptor);
        Ok(())
    }

    /// Freeze the application into a dispatcher
    #[must_use]
    pub fn into_dispatcher(self) -> Dispatcher {
        let router = self.router;
        let route = move |ctx: &mut Context| -> HandlerResult {
            let method: Method = ctx.request.method().parse()?;
            let path = ctx.request.path_info();
            let matched = router.match_route(method, &path)?;
            ctx.request.set_params(matched.params);
            matched.route.call(ctx)
        };

        Dispatcher {
            application: Arc::new(self.info),
            chain: build_chain(route, self.interceptors),
        }
    }

    /// Serve the application on `host:port` until Ctrl-C
    ///
    /// # Errors
    ///
    /// Returns `Error::BindError` when the address cannot be resolved or bound.
    pub async fn run(self, host: &str, port: u16) -> Result<()> {
        let address = resolve(host, port).await?;
        info!(
            "application ({:?}) will start at {}...",
            self.info.document_root, address
        );
        Server::new(self.into_dispatcher()).bind(address).serve().await
    }
}

/// First address `host:port` resolves to
async fn resolve(host: &str, port: u16) -> Result<SocketAddr> {
    let bind_error = |source| Error::BindError {
        address: format!("{host}:{port}"),
        source,
    };
    tokio::net::lookup_host((host, port))
        .await
        .map_err(bind_error)?
        .next()
        .ok_or_else(|| {
            bind_error(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "host resolved to no addresses",
            ))
        })
}

/// Status line, headers and body produced for one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WsgiResponse {
    /// Status line, e.g. `200 OK`
    pub status: String,
    /// Header list in sending order
    pub headers: Vec<(String, String)>,
    /// Response body
    pub body: Bytes,
}

impl WsgiResponse {
    /// Numeric status code
    #[must_use]
    pub fn status_code(&self) -> u16 {
        self.status
            .get(..3)
            .and_then(|code| code.parse().ok())
            .unwrap_or(500)
    }

    /// First header named `name` (case-insensitive)
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Frozen application: route tables and interceptor chain are final
pub struct Dispatcher {
    application: Arc<AppInfo>,
    chain: Chain,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("application", &self.application)
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    /// Application information
    #[must_use]
    pub fn application(&self) -> &AppInfo {
        &self.application
    }

    /// Process one request
    pub fn call(&self, environ: Environ) -> WsgiResponse {
        let mut ctx = Context::new(Arc::clone(&self.application), environ);
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| (self.chain)(&mut ctx)));

        match outcome {
            Ok(Ok(body)) => WsgiResponse {
                status: ctx.response.status().to_string(),
                headers: ctx.response.headers(),
                body: body.into_bytes(),
            },
            Ok(Err(HttpError::Redirect { status, location })) => {
                ctx.response.set_header("Location", &location);
                empty_response(status, ctx.response.headers())
            }
            Ok(Err(HttpError::NotFound)) => empty_response(status_line(404), ctx.response.headers()),
            Ok(Err(HttpError::Http { status, headers })) => {
                let mut all = ctx.response.headers();
                all.extend(headers.into_iter().filter(|(k, _)| k != POWERED_BY.0));
                empty_response(status, all)
            }
            Err(panic) => {
                let message = panic
                    .downcast_ref::<&str>()
                    .map(ToString::to_string)
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                error!(
                    method = %ctx.request.method(),
                    path = %ctx.request.path_info(),
                    "Handler panicked: {}",
                    message
                );
                empty_response(status_line(500), ctx.response.headers())
            }
        }
    }
}

fn empty_response(status: String, headers: Vec<(String, String)>) -> WsgiResponse {
    WsgiResponse {
        status,
        headers,
        body: Bytes::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::Body;
    use crate::route::{get, post};

    fn app() -> Application {
        let mut app = Application::new(Some(PathBuf::from("/srv/www")));
        app.add_url(get("/", |_| Ok::<_, HttpError>("index"))).unwrap();
        app.add_url(get("/users/:id", |ctx| {
            Ok::<_, HttpError>(format!("user {}", ctx.param("id").unwrap_or("?")))
        }))
        .unwrap();
        app.add_url(post("/users", |ctx| {
            ctx.response.set_status(201).ok();
            Ok::<_, HttpError>(format!("created {}", ctx.request.get("name").unwrap_or("")))
        }))
        .unwrap();
        app.add_url(get("/old", |_| Err::<Body, _>(HttpError::redirect("/new"))))
            .unwrap();
        app.add_url(get("/secret", |_| {
            Err::<Body, _>(HttpError::forbidden().with_header("X-Reason", "nope"))
        }))
        .unwrap();
        app.add_url(get("/boom", |_| -> std::result::Result<Body, HttpError> {
            panic!("handler failure")
        }))
        .unwrap();
        app
    }

    #[test]
    fn test_static_route_response() {
        let resp = app().into_dispatcher().call(Environ::new("GET", "/"));
        assert_eq!(resp.status, "200 OK");
        assert_eq!(resp.body.as_ref(), b"index");
        assert_eq!(resp.header("Content-Type"), Some("text/html; charset=utf-8"));
        assert_eq!(resp.header("X-Powered-By"), Some("transwarp/1.0"));
    }

    #[test]
    fn test_dynamic_route_response() {
        let resp = app().into_dispatcher().call(Environ::new("GET", "/users/42"));
        assert_eq!(resp.body.as_ref(), b"user 42");
    }

    #[test]
    fn test_post_route_reads_form() {
        let env = Environ::new("POST", "/users")
            .with_header("Content-Type", "application/x-www-form-urlencoded")
            .with_body("name=bob");
        let resp = app().into_dispatcher().call(env);
        assert_eq!(resp.status, "201 Created");
        assert_eq!(resp.body.as_ref(), b"created bob");
    }

    #[test]
    fn test_not_found() {
        let dispatcher = app().into_dispatcher();
        let resp = dispatcher.call(Environ::new("GET", "/missing"));
        assert_eq!(resp.status, "404 Not Found");
        assert!(resp.body.is_empty());

        let resp = dispatcher.call(Environ::new("PUT", "/"));
        assert_eq!(resp.status_code(), 404);

        let resp = dispatcher.call(Environ::new("BREW", "/"));
        assert_eq!(resp.status_code(), 404);
    }

    #[test]
    fn test_redirect_sets_location() {
        let resp = app().into_dispatcher().call(Environ::new("GET", "/old"));
        assert_eq!(resp.status, "301 Moved Permanently");
        assert_eq!(resp.header("Location"), Some("/new"));
        assert!(resp.body.is_empty());
    }

    #[test]
    fn test_http_error_headers() {
        let resp = app().into_dispatcher().call(Environ::new("GET", "/secret"));
        assert_eq!(resp.status, "403 Forbidden");
        assert_eq!(resp.header("X-Reason"), Some("nope"));
        let powered = resp.headers.iter().filter(|(k, _)| k == "X-Powered-By").count();
        assert_eq!(powered, 1);
    }

    #[test]
    fn test_panic_becomes_empty_500() {
        let resp = app().into_dispatcher().call(Environ::new("GET", "/boom"));
        assert_eq!(resp.status, "500 Internal Server Error");
        assert!(resp.body.is_empty());
    }

    #[test]
    fn test_interceptors_wrap_dispatch() {
        let mut app = app();
        app.add_interceptor(Interceptor::new("/users/", |ctx, next| {
            ctx.response.set_header("X-Intercepted", "yes");
            next(ctx)
        }))
        .unwrap();
        let dispatcher = app.into_dispatcher();

        let resp = dispatcher.call(Environ::new("GET", "/users/1"));
        assert_eq!(resp.header("X-Intercepted"), Some("yes"));

        let resp = dispatcher.call(Environ::new("GET", "/"));
        assert_eq!(resp.header("X-Intercepted"), None);
    }

    #[test]
    fn test_interceptor_sees_not_found() {
        let mut app = Application::new(None);
        app.add_interceptor(Interceptor::new("/", |ctx, next| {
            let result = next(ctx);
            if matches!(result, Err(HttpError::NotFound)) {
                return Ok(Body::from("fallback"));
            }
            result
        }))
        .unwrap();
        let resp = app.into_dispatcher().call(Environ::new("GET", "/anything"));
        assert_eq!(resp.status, "200 OK");
        assert_eq!(resp.body.as_ref(), b"fallback");
    }

    #[test]
    fn test_invalid_interceptor_pattern_rejected() {
        let mut app = Application::new(None);
        let result = app.add_interceptor(Interceptor::new("/a*b", |ctx, next| next(ctx)));
        assert!(matches!(result, Err(Error::InvalidInterceptorPattern { .. })));
    }

    #[test]
    fn test_add_module() {
        let mut app = Application::new(None);
        let module = Module::new("blog")
            .with(get("/blog", |_| Ok::<_, HttpError>("list")))
            .with(get("/blog/:id", |ctx| Ok::<_, HttpError>(ctx.request.args().join(","))));
        assert_eq!(module.name(), "blog");
        app.add_module(module).unwrap();

        let resp = app.into_dispatcher().call(Environ::new("GET", "/blog/7"));
        assert_eq!(resp.body.as_ref(), b"7");
    }

    #[test]
    fn test_add_module_propagates_route_errors() {
        let mut app = Application::new(None);
        let module = Module::new("broken").with(get("no-slash", |_| Ok::<_, HttpError>("")));
        assert!(app.add_module(module).is_err());
    }

    #[test]
    fn test_application_info_is_shared() {
        let dispatcher = app().into_dispatcher();
        assert_eq!(
            dispatcher.application().document_root,
            Some(PathBuf::from("/srv/www"))
        );
    }

    #[tokio::test]
    async fn test_resolve_keeps_lookup_error() {
        let addr = resolve("127.0.0.1", 9000).await.unwrap();
        assert_eq!(addr, SocketAddr::from(([127, 0, 0, 1], 9000)));

        match resolve("bad\0host", 80).await {
            Err(Error::BindError { address, source }) => {
                assert_eq!(address, "bad\0host:80");
                assert_eq!(source.kind(), std::io::ErrorKind::InvalidInput);
            }
            other => panic!("expected bind error, got {other:?}"),
        }
    }
}
