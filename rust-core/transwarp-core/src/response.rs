//! # HTTP Response
//!
//! The response a handler fills in while the request is processed, plus the
//! [`Body`] type handlers return.

use crate::error::{Error, Result};
use crate::status::{canonical_header, parse_status_line, reason_phrase, POWERED_BY};
use crate::tz::utc_zero;
use crate::util::quote;
use chrono::{DateTime, FixedOffset, TimeZone};
use hyper::body::Bytes;
use std::collections::BTreeMap;

const EXPIRES_FORMAT: &str = "%a, %d-%b-%Y %H:%M:%S GMT";

/// Response body returned by a handler
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Body(Bytes);

impl Body {
    /// An empty body
    #[must_use]
    pub const fn empty() -> Self {
        Self(Bytes::new())
    }

    /// Serialize `value` as a JSON body
    ///
    /// # Errors
    ///
    /// Returns `Error::Json` when serialization fails.
    pub fn json<T: serde::Serialize>(value: &T) -> Result<Self> {
        Ok(Self(Bytes::from(serde_json::to_vec(value)?)))
    }

    /// Body bytes
    #[must_use]
    pub const fn bytes(&self) -> &Bytes {
        &self.0
    }

    /// Consume into bytes
    #[must_use]
    pub fn into_bytes(self) -> Bytes {
        self.0
    }

    /// Whether the body is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<String> for Body {
    fn from(s: String) -> Self {
        Self(Bytes::from(s))
    }
}

impl From<&'static str> for Body {
    fn from(s: &'static str) -> Self {
        Self(Bytes::from_static(s.as_bytes()))
    }
}

impl From<Vec<u8>> for Body {
    fn from(v: Vec<u8>) -> Self {
        Self(Bytes::from(v))
    }
}

impl From<Bytes> for Body {
    fn from(b: Bytes) -> Self {
        Self(b)
    }
}

impl From<()> for Body {
    fn from((): ()) -> Self {
        Self::empty()
    }
}

impl<T: Into<Self>> From<Option<T>> for Body {
    fn from(value: Option<T>) -> Self {
        value.map_or_else(Self::empty, Into::into)
    }
}

/// Attributes of a `Set-Cookie` header
#[derive(Debug, Clone)]
pub struct CookieOptions {
    /// `Max-Age`, ignored when `expires` is set
    pub max_age: Option<i64>,
    /// `Expires`, rendered in GMT
    pub expires: Option<DateTime<FixedOffset>>,
    /// `Path`
    pub path: String,
    /// `Domain`
    pub domain: Option<String>,
    /// `Secure`
    pub secure: bool,
    /// `HttpOnly`
    pub http_only: bool,
}

impl Default for CookieOptions {
    fn default() -> Self {
        Self {
            max_age: None,
            expires: None,
            path: "/".to_string(),
            domain: None,
            secure: false,
            http_only: true,
        }
    }
}

/// Response under construction
///
/// Known headers are keyed by their upper-cased name so lookups ignore case;
/// unknown headers keep the caller's spelling.
#[derive(Debug, Clone)]
pub struct Response {
    status: String,
    headers: BTreeMap<String, String>,
    cookies: BTreeMap<String, String>,
}

impl Default for Response {
    fn default() -> Self {
        let mut headers = BTreeMap::new();
        headers.insert(
            "CONTENT-TYPE".to_string(),
            "text/html; charset=utf-8".to_string(),
        );
        Self {
            status: "200 OK".to_string(),
            headers,
            cookies: BTreeMap::new(),
        }
    }
}

fn header_key(name: &str) -> String {
    canonical_header(name).map_or_else(|| name.to_string(), str::to_ascii_uppercase)
}

impl Response {
    /// New `200 OK` HTML response
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set or replace a header
    pub fn set_header(&mut self, name: &str, value: impl ToString) {
        self.headers.insert(header_key(name), value.to_string());
    }

    /// Remove a header
    pub fn unset_header(&mut self, name: &str) {
        self.headers.remove(&header_key(name));
    }

    /// Current value of a header
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&header_key(name)).map(String::as_str)
    }

    /// Header list as sent: canonical names, then cookies, then `X-Powered-By`
    #[must_use]
    pub fn headers(&self) -> Vec<(String, String)> {
        let mut list: Vec<(String, String)> = self
            .headers
            .iter()
            .map(|(k, v)| {
                let name = canonical_header(k).map_or_else(|| k.clone(), str::to_string);
                (name, v.clone())
            })
            .collect();
        for cookie in self.cookies.values() {
            list.push(("Set-Cookie".to_string(), cookie.clone()));
        }
        list.push((POWERED_BY.0.to_string(), POWERED_BY.1.to_string()));
        list
    }

    /// `Content-Type` header
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.header("Content-Type")
    }

    /// Set `Content-Type`, or remove it with `None`
    pub fn set_content_type(&mut self, value: Option<&str>) {
        match value {
            Some(v) if !v.is_empty() => self.set_header("Content-Type", v),
            _ => self.unset_header("Content-Type"),
        }
    }

    /// `Content-Length` header
    #[must_use]
    pub fn content_length(&self) -> Option<&str> {
        self.header("Content-Length")
    }

    /// Set `Content-Length`
    pub fn set_content_length(&mut self, length: usize) {
        self.set_header("Content-Length", length);
    }

    /// Add or replace a cookie
    pub fn set_cookie(&mut self, name: &str, value: &str, options: &CookieOptions) {
        let mut parts = vec![format!("{}={}", quote(name), quote(value))];
        if let Some(expires) = options.expires {
            let gmt = expires.with_timezone(&utc_zero());
            parts.push(format!("Expires={}", gmt.format(EXPIRES_FORMAT)));
        } else if let Some(max_age) = options.max_age {
            parts.push(format!("Max-Age={max_age}"));
        }
        parts.push(format!("Path={}", options.path));
        if let Some(domain) = &options.domain {
            parts.push(format!("Domain={domain}"));
        }
        if options.secure {
            parts.push("Secure".to_string());
        }
        if options.http_only {
            parts.push("HttpOnly".to_string());
        }
        self.cookies.insert(name.to_string(), parts.join("; "));
    }

    /// Tell the client to drop a cookie
    pub fn delete_cookie(&mut self, name: &str) {
        let epoch = utc_zero().timestamp_opt(0, 0).single();
        let options = CookieOptions {
            expires: epoch,
            ..CookieOptions::default()
        };
        self.set_cookie(name, "__deleted__", &options);
    }

    /// Forget a cookie set earlier in this response
    pub fn unset_cookie(&mut self, name: &str) {
        self.cookies.remove(name);
    }

    /// Status line, e.g. `200 OK`
    #[must_use]
    pub fn status(&self) -> &str {
        &self.status
    }

    /// Numeric status code
    #[must_use]
    pub fn status_code(&self) -> u16 {
        self.status
            .get(..3)
            .and_then(|code| code.parse().ok())
            .unwrap_or(200)
    }

    /// Set the status from a code in `100..=900`
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidStatus` for codes outside the range.
    pub fn set_status(&mut self, code: u16) -> Result<()> {
        if !(100..=900).contains(&code) {
            return Err(Error::InvalidStatus(code.to_string()));
        }
        self.status = reason_phrase(code)
            .map_or_else(|| code.to_string(), |reason| format!("{code} {reason}"));
        Ok(())
    }

    /// Set the status from a full status line such as `"404 Not Found"`
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidStatus` when the line is malformed.
    pub fn set_status_line(&mut self, line: &str) -> Result<()> {
        self.status = parse_status_line(line)?;
        Ok(())
    }
}
