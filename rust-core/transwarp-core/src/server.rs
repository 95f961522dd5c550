//! # HTTP Server
//!
//! HTTP/1.1 front end for a [`Dispatcher`], built on Hyper and Tokio.
//! Implements graceful shutdown with signal handling.
//!
//! ## Key Features
//!
//! - Async connection handling with the Tokio runtime
//! - Handlers run on the blocking pool, one [`Environ`] per request
//! - Graceful shutdown on Ctrl-C with a bounded drain period
//! - Request body size limit enforced before dispatch

use crate::app::{Dispatcher, WsgiResponse};
use crate::environ::Environ;
use crate::error::{Error, Result};
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{HeaderName, HeaderValue};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

/// HTTP Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the server to
    pub address: SocketAddr,
    /// Enable keep-alive connections
    pub keep_alive: bool,
    /// Shutdown timeout for graceful shutdown (default: 30 seconds)
    pub shutdown_timeout: Duration,
    /// Max request body size in bytes
    pub max_body_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: ([127, 0, 0, 1], 9000).into(),
            keep_alive: true,
            shutdown_timeout: Duration::from_secs(30),
            max_body_size: 1024 * 1024,
        }
    }
}

/// HTTP server driving a dispatcher
pub struct Server {
    config: ServerConfig,
    dispatcher: Arc<Dispatcher>,
}

impl Server {
    /// Create a server with the default configuration
    #[must_use]
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            config: ServerConfig::default(),
            dispatcher: Arc::new(dispatcher),
        }
    }

    /// Bind the server to an address
    #[must_use]
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.config.address = addr;
        self
    }

    /// Replace the whole configuration
    #[must_use]
    pub fn with_config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Set max request body size
    pub fn set_max_body_size(&mut self, bytes: usize) {
        self.config.max_body_size = bytes;
    }

    /// Current configuration
    #[must_use]
    pub const fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Serve until Ctrl-C
    ///
    /// # Errors
    ///
    /// Returns `Error::BindError` when the listening socket cannot be set up
    /// and `Error::Io` when accepting a connection fails.
    pub async fn serve(self) -> Result<()> {
        self.serve_with_shutdown(shutdown_signal()).await
    }

    /// Serve until `shutdown` completes, then drain in-flight connections
    ///
    /// # Errors
    ///
    /// See [`Server::serve`].
    pub async fn serve_with_shutdown<S>(self, shutdown: S) -> Result<()>
    where
        S: Future<Output = ()>,
    {
        let addr = self.config.address;
        let listener = listen(addr).map_err(|source| Error::BindError {
            address: addr.to_string(),
            source,
        })?;

        info!("Server listening on http://{}", addr);

        let active = Arc::new(AtomicUsize::new(0));
        let keep_alive = self.config.keep_alive;
        let max_body_size = self.config.max_body_size;
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                accept_result = listener.accept() => {
                    let (stream, remote_addr) = accept_result?;
                    let io = TokioIo::new(stream);
                    let dispatcher = Arc::clone(&self.dispatcher);
                    let active = Arc::clone(&active);

                    tokio::task::spawn(async move {
                        active.fetch_add(1, Ordering::Relaxed);

                        let service = service_fn(move |req: Request<hyper::body::Incoming>| {
                            let dispatcher = Arc::clone(&dispatcher);
                            async move {
                                let method = req.method().clone();
                                let path = req.uri().path().to_string();
                                let version = format!("{:?}", req.version());

                                let response =
                                    handle_request(req, dispatcher, remote_addr, max_body_size).await;
                                info!("    {} - \"{} {} {}\" {}",
                                    remote_addr,
                                    method,
                                    path,
                                    version,
                                    response.status().as_u16()
                                );
                                Ok::<_, Infallible>(response)
                            }
                        });

                        if let Err(err) = http1::Builder::new()
                            .keep_alive(keep_alive)
                            .serve_connection(io, service)
                            .await
                        {
                            error!("Error serving connection: {:?}", err);
                        }
                        active.fetch_sub(1, Ordering::Relaxed);
                    });
                }
                () = &mut shutdown => {
                    info!("Shutdown signal received, stopping server...");
                    break;
                }
            }
        }

        let drain = async {
            while active.load(Ordering::Relaxed) > 0 {
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
        };
        if tokio::time::timeout(self.config.shutdown_timeout, drain).await.is_err() {
            info!(
                active = active.load(Ordering::Relaxed),
                "Shutdown timeout reached, dropping connections"
            );
        }
        Ok(())
    }
}

fn listen(addr: SocketAddr) -> std::io::Result<tokio::net::TcpListener> {
    let socket = if addr.is_ipv4() {
        tokio::net::TcpSocket::new_v4()?
    } else {
        tokio::net::TcpSocket::new_v6()?
    };
    socket.set_reuseaddr(true)?;
    #[cfg(not(windows))]
    {
        socket.set_reuseport(true)?;
    }
    socket.bind(addr)?;
    socket.listen(1024)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to install Ctrl-C handler: {}", e);
        std::future::pending::<()>().await;
    }
}

async fn handle_request(
    req: Request<hyper::body::Incoming>,
    dispatcher: Arc<Dispatcher>,
    remote_addr: SocketAddr,
    max_body_size: usize,
) -> Response<Full<Bytes>> {
    let environ = match Environ::from_hyper(req, remote_addr, max_body_size).await {
        Ok(environ) => environ,
        Err(Error::PayloadTooLarge { .. }) => {
            return plain(StatusCode::PAYLOAD_TOO_LARGE, "Payload Too Large");
        }
        Err(e) => {
            error!("Failed to parse request: {}", e);
            return plain(StatusCode::BAD_REQUEST, "Bad Request");
        }
    };

    let request_id = environ
        .get("HTTP_X_REQUEST_ID")
        .map_or_else(generate_request_id, str::to_string);
    let environ = environ.with_var("HTTP_X_REQUEST_ID", &request_id);

    match tokio::task::spawn_blocking(move || dispatcher.call(environ)).await {
        Ok(response) => into_hyper(response, &request_id),
        Err(e) => {
            error!("Dispatcher task failed: {}", e);
            plain(StatusCode::INTERNAL_SERVER_ERROR, "")
        }
    }
}

fn plain(status: StatusCode, body: &'static str) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from_static(body.as_bytes())));
    *response.status_mut() = status;
    response
}

/// Convert a dispatcher response; headers hyper cannot represent are skipped
fn into_hyper(response: WsgiResponse, request_id: &str) -> Response<Full<Bytes>> {
    let status = StatusCode::from_u16(response.status_code())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let mut out = Response::new(Full::new(response.body));
    *out.status_mut() = status;

    let headers = out.headers_mut();
    for (name, value) in &response.headers {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                headers.append(name, value);
            }
            _ => error!(header = %name, "Dropping invalid response header"),
        }
    }
    if !headers.contains_key("x-request-id") {
        if let Ok(value) = HeaderValue::from_str(request_id) {
            headers.insert("x-request-id", value);
        }
    }
    out
}

static REQUEST_COUNTER: AtomicUsize = AtomicUsize::new(1);

fn generate_request_id() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    let counter = REQUEST_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("{:x}-{:x}", now.as_nanos(), counter)
}
