//! # Request Environment
//!
//! The dispatcher's input: CGI-style variables plus the raw request body.
//!
//! Request headers become `HTTP_<NAME>` variables (upper-cased, `-` → `_`),
//! except `Content-Type` and `Content-Length`, which map to `CONTENT_TYPE` and
//! `CONTENT_LENGTH`. The path is stored still percent-encoded in `PATH_INFO`.

use crate::error::{Error, Result};
use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::body::Bytes;
use hyper::Request;
use std::collections::BTreeMap;
use std::net::SocketAddr;

/// CGI-style request environment
#[derive(Debug, Clone, Default)]
pub struct Environ {
    vars: BTreeMap<String, String>,
    input: Bytes,
}

fn header_var(name: &str) -> String {
    let key = name.to_ascii_uppercase().replace('-', "_");
    match key.as_str() {
        "CONTENT_TYPE" | "CONTENT_LENGTH" => key,
        _ => format!("HTTP_{key}"),
    }
}

impl Environ {
    /// Create an environment for `method` and a request target like `/a/b?x=1`
    #[must_use]
    pub fn new(method: &str, target: &str) -> Self {
        let (path, query) = target.split_once('?').unwrap_or((target, ""));
        let mut vars = BTreeMap::new();
        vars.insert("REQUEST_METHOD".to_string(), method.to_ascii_uppercase());
        vars.insert("PATH_INFO".to_string(), path.to_string());
        vars.insert("QUERY_STRING".to_string(), query.to_string());
        Self {
            vars,
            input: Bytes::new(),
        }
    }

    /// Add a request header
    ///
    /// A repeated header is joined onto the earlier value with `, `, or `; `
    /// for `Cookie`.
    #[must_use]
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        let key = header_var(name);
        let separator = if key == "HTTP_COOKIE" { "; " } else { ", " };
        self.vars
            .entry(key)
            .and_modify(|existing| {
                existing.push_str(separator);
                existing.push_str(value);
            })
            .or_insert_with(|| value.to_string());
        self
    }

    /// Set the request body (also sets `CONTENT_LENGTH`)
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.input = body.into();
        self.vars
            .insert("CONTENT_LENGTH".to_string(), self.input.len().to_string());
        self
    }

    /// Set the peer address
    #[must_use]
    pub fn with_remote_addr(mut self, addr: &str) -> Self {
        self.vars.insert("REMOTE_ADDR".to_string(), addr.to_string());
        self
    }

    /// Set an arbitrary variable
    #[must_use]
    pub fn with_var(mut self, key: &str, value: &str) -> Self {
        self.vars.insert(key.to_string(), value.to_string());
        self
    }

    /// Look up a variable
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    /// All variables in key order
    pub fn vars(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Raw request body
    #[must_use]
    pub const fn input(&self) -> &Bytes {
        &self.input
    }

    /// Build an environment from a hyper request, collecting at most
    /// `max_body_size` bytes of body
    ///
    /// # Errors
    ///
    /// Returns `Error::PayloadTooLarge` when the declared size exceeds the
    /// limit or the stream goes past it, and `Error::Http` when the body
    /// stream fails.
    pub async fn from_hyper(
        req: Request<hyper::body::Incoming>,
        remote_addr: SocketAddr,
        max_body_size: usize,
    ) -> Result<Self> {
        let mut env = Self::new(
            req.method().as_str(),
            req.uri().path_and_query().map_or("/", |pq| pq.as_str()),
        )
        .with_remote_addr(&remote_addr.ip().to_string())
        .with_var("SERVER_PROTOCOL", &format!("{:?}", req.version()));

        for (name, value) in req.headers() {
            if let Ok(value) = value.to_str() {
                env = env.with_header(name.as_str(), value);
            }
        }

        if let Some(declared) = env.get("CONTENT_LENGTH").and_then(|l| l.parse::<usize>().ok()) {
            if declared > max_body_size {
                return Err(Error::PayloadTooLarge {
                    limit: max_body_size,
                });
            }
        }

        let body = Limited::new(req.into_body(), max_body_size)
            .collect()
            .await
            .map_err(|e| body_error(e, max_body_size))?
            .to_bytes();
        Ok(env.with_body(body))
    }
}

fn body_error(e: Box<dyn std::error::Error + Send + Sync>, limit: usize) -> Error {
    if e.is::<LengthLimitError>() {
        return Error::PayloadTooLarge { limit };
    }
    match e.downcast::<hyper::Error>() {
        Ok(e) => Error::Http(*e),
        Err(e) => Error::Io(std::io::Error::new(std::io::ErrorKind::Other, e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_splits_query() {
        let env = Environ::new("get", "/users/1?x=1&y=2");
        assert_eq!(env.get("REQUEST_METHOD"), Some("GET"));
        assert_eq!(env.get("PATH_INFO"), Some("/users/1"));
        assert_eq!(env.get("QUERY_STRING"), Some("x=1&y=2"));
    }

    #[test]
    fn test_headers_become_cgi_vars() {
        let env = Environ::new("POST", "/")
            .with_header("X-Request-Id", "abc")
            .with_header("Content-Type", "text/plain")
            .with_header("Host", "example.com");
        assert_eq!(env.get("HTTP_X_REQUEST_ID"), Some("abc"));
        assert_eq!(env.get("CONTENT_TYPE"), Some("text/plain"));
        assert_eq!(env.get("HTTP_HOST"), Some("example.com"));
        assert_eq!(env.get("HTTP_CONTENT_TYPE"), None);
    }

    #[test]
    fn test_repeated_headers_are_joined() {
        let env = Environ::new("GET", "/")
            .with_header("Accept", "text/html")
            .with_header("accept", "application/json")
            .with_header("Cookie", "a=1")
            .with_header("Cookie", "b=2");
        assert_eq!(env.get("HTTP_ACCEPT"), Some("text/html, application/json"));
        assert_eq!(env.get("HTTP_COOKIE"), Some("a=1; b=2"));
    }

    #[test]
    fn test_with_body_sets_length() {
        let env = Environ::new("POST", "/").with_body("hello");
        assert_eq!(env.get("CONTENT_LENGTH"), Some("5"));
        assert_eq!(env.input().as_ref(), b"hello");
    }
}
