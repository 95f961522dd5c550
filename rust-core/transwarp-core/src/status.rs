//! # Status and Header Tables
//!
//! Reason phrases for the status codes the framework knows by name, and the
//! canonical spelling of well-known response headers.

use crate::error::{Error, Result};
use regex::Regex;
use std::sync::OnceLock;

/// Header appended to every response
pub const POWERED_BY: (&str, &str) = ("X-Powered-By", "transwarp/1.0");

const RESPONSE_HEADERS: &[&str] = &[
    "Accept-Ranges",
    "Age",
    "Allow",
    "Cache-Control",
    "Connection",
    "Content-Encoding",
    "Content-Language",
    "Content-Length",
    "Content-Location",
    "Content-MD5",
    "Content-Disposition",
    "Content-Range",
    "Content-Type",
    "Date",
    "ETag",
    "Expires",
    "Last-Modified",
    "Link",
    "Location",
    "P3P",
    "Pragma",
    "Proxy-Authenticate",
    "Refresh",
    "Retry-After",
    "Server",
    "Set-Cookie",
    "Strict-Transport-Security",
    "Trailer",
    "Transfer-Encoding",
    "Vary",
    "Via",
    "Warning",
    "WWW-Authenticate",
    "X-Frame-Options",
    "X-XSS-Protection",
    "X-Content-Type-Options",
    "X-Forwarded-Proto",
    "X-Powered-By",
    "X-UA-Compatible",
];

/// Reason phrase for a status code, if the code is known
#[must_use]
pub const fn reason_phrase(code: u16) -> Option<&'static str> {
    let reason = match code {
        // Informational
        100 => "Continue",
        101 => "Switching Protocols",
        102 => "Processing",

        // Successful
        200 => "OK",
        201 => "Created",
        202 => "Accepted",
        203 => "Non-Authoritative Information",
        204 => "No Content",
        205 => "Reset Content",
        206 => "Partial Content",
        207 => "Multi Status",
        226 => "IM Used",

        // Redirection
        300 => "Multiple Choices",
        301 => "Moved Permanently",
        302 => "Found",
        303 => "See Other",
        304 => "Not Modified",
        305 => "Use Proxy",
        307 => "Temporary Redirect",

        // Client Error
        400 => "Bad Request",
        401 => "Unauthorized",
        402 => "Payment Required",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        406 => "Not Acceptable",
        407 => "Proxy Authentication Required",
        408 => "Request Timeout",
        409 => "Conflict",
        410 => "Gone",
        411 => "Length Required",
        412 => "Precondition Failed",
        413 => "Request Entity Too Large",
        414 => "Request URI Too Long",
        415 => "Unsupported Media Type",
        416 => "Requested Range Not Satisfiable",
        417 => "Expectation Failed",
        418 => "I'm a teapot",
        422 => "Unprocessable Entity",
        423 => "Locked",
        424 => "Failed Dependency",
        426 => "Upgrade Required",

        // Server Error
        500 => "Internal Server Error",
        501 => "Not Implemented",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        504 => "Gateway Timeout",
        505 => "HTTP Version Not Supported",
        507 => "Insufficient Storage",
        510 => "Not Extended",

        _ => return None,
    };
    Some(reason)
}

/// `"<code> <reason>"`, or the bare code when no reason is known
#[must_use]
pub fn status_line(code: u16) -> String {
    reason_phrase(code).map_or_else(|| code.to_string(), |reason| format!("{code} {reason}"))
}

fn status_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d\d\d( [\w ]+)?$").expect("static status regex"))
}

/// Validate a caller-supplied status line such as `"404 Not Found"` or `"299"`
///
/// # Errors
///
/// Returns `Error::InvalidStatus` when the line is not three digits optionally
/// followed by a space and a word-character reason.
pub fn parse_status_line(line: &str) -> Result<String> {
    if status_regex().is_match(line) {
        Ok(line.to_string())
    } else {
        Err(Error::InvalidStatus(line.to_string()))
    }
}

/// Canonical spelling of a well-known response header
///
/// Matching ignores case and treats `_` as `-`. Returns `None` for unknown names.
#[must_use]
pub fn canonical_header(name: &str) -> Option<&'static str> {
    let wanted = name.replace('_', "-");
    RESPONSE_HEADERS
        .iter()
        .copied()
        .find(|h| h.eq_ignore_ascii_case(&wanted))
}
