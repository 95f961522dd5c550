//! # HTTP Request
//!
//! Read-only view over an [`Environ`] with lazy parsing.
//!
//! - Form inputs (query string plus url-encoded or multipart body) are parsed on
//!   first access
//! - Headers and cookies are derived from the CGI variables on demand
//! - Path arguments are filled in by the router once a dynamic route matches

use crate::environ::Environ;
use crate::route::Params;
use crate::util::unquote;
use futures_util::FutureExt;
use hyper::body::Bytes;
use std::cell::OnceCell;
use std::collections::HashMap;
use std::convert::Infallible;
use tracing::warn;

/// File uploaded in a `multipart/form-data` body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultipartFile {
    /// Client-side file name
    pub filename: String,
    /// Declared content type of the part, if any
    pub content_type: Option<String>,
    /// File contents
    pub data: Bytes,
}

/// Parsed form inputs: each key maps to every value it was sent with
#[derive(Debug, Default)]
struct Inputs {
    values: HashMap<String, Vec<String>>,
    files: HashMap<String, Vec<MultipartFile>>,
}

impl Inputs {
    fn push(&mut self, key: String, value: String) {
        self.values.entry(key).or_default().push(value);
    }
}

/// HTTP request seen by interceptors and handlers
#[derive(Debug)]
pub struct Request {
    environ: Environ,
    inputs: OnceCell<Inputs>,
    params: Params,
}

impl Request {
    /// Wrap an environment
    #[must_use]
    pub fn new(environ: Environ) -> Self {
        Self {
            environ,
            inputs: OnceCell::new(),
            params: Params::default(),
        }
    }

    /// Underlying environment
    #[must_use]
    pub const fn environ(&self) -> &Environ {
        &self.environ
    }

    /// Request method (`GET`, `POST`, ...)
    #[must_use]
    pub fn method(&self) -> &str {
        self.environ.get("REQUEST_METHOD").unwrap_or("GET")
    }

    /// Percent-decoded request path
    #[must_use]
    pub fn path_info(&self) -> String {
        unquote(self.environ.get("PATH_INFO").unwrap_or(""))
    }

    /// Raw query string (empty when absent)
    #[must_use]
    pub fn query_string(&self) -> &str {
        self.environ.get("QUERY_STRING").unwrap_or("")
    }

    /// Peer address
    #[must_use]
    pub fn remote_addr(&self) -> Option<&str> {
        self.environ.get("REMOTE_ADDR")
    }

    /// `Host` header (empty when absent)
    #[must_use]
    pub fn host(&self) -> &str {
        self.environ.get("HTTP_HOST").unwrap_or("")
    }

    /// Raw request body
    #[must_use]
    pub const fn body(&self) -> &Bytes {
        self.environ.input()
    }

    /// Request body as UTF-8 text
    #[must_use]
    pub fn body_str(&self) -> Option<&str> {
        std::str::from_utf8(self.body()).ok()
    }

    /// All `HTTP_*` headers keyed by upper-cased dashed name (`X-REQUEST-ID`)
    #[must_use]
    pub fn headers(&self) -> HashMap<String, String> {
        self.environ
            .vars()
            .filter_map(|(k, v)| {
                k.strip_prefix("HTTP_")
                    .map(|name| (name.replace('_', "-").to_ascii_uppercase(), v.to_string()))
            })
            .collect()
    }

    /// A single header, matched case-insensitively
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        let key = format!("HTTP_{}", name.to_ascii_uppercase().replace('-', "_"));
        self.environ.get(&key)
    }

    /// Cookies sent with the request
    #[must_use]
    pub fn cookies(&self) -> HashMap<String, String> {
        let mut cookies = HashMap::new();
        if let Some(raw) = self.environ.get("HTTP_COOKIE") {
            for (key, value) in raw.split(';').filter_map(|pair| pair.split_once('=')) {
                let key = key.trim();
                if !key.is_empty() {
                    cookies.insert(key.to_string(), unquote(value));
                }
            }
        }
        cookies
    }

    /// A single cookie
    #[must_use]
    pub fn cookie(&self, name: &str) -> Option<String> {
        self.cookies().remove(name)
    }

    fn inputs(&self) -> &Inputs {
        self.inputs.get_or_init(|| self.parse_inputs())
    }

    fn parse_inputs(&self) -> Inputs {
        let mut inputs = Inputs::default();
        let mut collect = |raw: &[u8]| {
            for (k, v) in url::form_urlencoded::parse(raw) {
                inputs.push(k.into_owned(), v.into_owned());
            }
        };

        collect(self.query_string().as_bytes());

        let content_type = self.environ.get("CONTENT_TYPE").unwrap_or("");
        if content_type.starts_with("application/x-www-form-urlencoded") {
            collect(&self.body()[..]);
        } else if content_type.starts_with("multipart/form-data") {
            parse_multipart(content_type, self.body().clone(), &mut inputs);
        }
        inputs
    }

    /// First value submitted for `key`
    ///
    /// For an uploaded file this is its file name; the contents are in
    /// [`Request::file`].
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.inputs()
            .values
            .get(key)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// Every value submitted for `key`
    #[must_use]
    pub fn get_list(&self, key: &str) -> Vec<&str> {
        self.inputs()
            .values
            .get(key)
            .map(|values| values.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// `defaults` overlaid with the first value of every submitted input
    #[must_use]
    pub fn input(&self, defaults: &[(&str, &str)]) -> HashMap<String, String> {
        let mut merged: HashMap<String, String> = defaults
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        for (k, values) in &self.inputs().values {
            if let Some(first) = values.first() {
                merged.insert(k.clone(), first.clone());
            }
        }
        merged
    }

    /// First file uploaded under `key`
    #[must_use]
    pub fn file(&self, key: &str) -> Option<&MultipartFile> {
        self.inputs().files.get(key).and_then(|files| files.first())
    }

    /// Every file uploaded under `key`
    #[must_use]
    pub fn files(&self, key: &str) -> &[MultipartFile] {
        self.inputs()
            .files
            .get(key)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Parse the body as JSON
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error when the body is not valid JSON for `T`.
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_slice(self.body())
    }

    /// Path arguments captured by the matched route, in template order
    #[must_use]
    pub fn args(&self) -> &[String] {
        self.params.values()
    }

    /// Path argument by name
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name)
    }

    pub(crate) fn set_params(&mut self, params: Params) {
        self.params = params;
    }
}

/// Collect the fields of a buffered `multipart/form-data` body
///
/// The whole body is already in memory, so the parser never waits and one
/// poll drives it to completion.
fn parse_multipart(content_type: &str, body: Bytes, inputs: &mut Inputs) {
    let boundary = match multer::parse_boundary(content_type) {
        Ok(boundary) => boundary,
        Err(e) => {
            warn!("Bad multipart content type: {}", e);
            return;
        }
    };
    let stream = futures_util::stream::iter([Ok::<_, Infallible>(body)]);
    let mut multipart = multer::Multipart::new(stream, boundary);

    let parsed = async {
        while let Some(field) = multipart.next_field().await? {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };
            let filename = field.file_name().map(str::to_string);
            let content_type = field.content_type().map(ToString::to_string);
            let data = field.bytes().await?;
            match filename {
                Some(filename) => {
                    inputs.push(name.clone(), filename.clone());
                    inputs.files.entry(name).or_default().push(MultipartFile {
                        filename,
                        content_type,
                        data,
                    });
                }
                None => inputs.push(name, String::from_utf8_lossy(&data).into_owned()),
            }
        }
        Ok::<_, multer::Error>(())
    }
    .now_or_never();

    match parsed {
        Some(Ok(())) => {}
        Some(Err(e)) => warn!("Malformed multipart body: {}", e),
        None => warn!("Multipart body could not be read in one pass"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_info_is_decoded() {
        let req = Request::new(Environ::new("GET", "/wiki/hello%20world"));
        assert_eq!(req.path_info(), "/wiki/hello world");
        assert_eq!(req.method(), "GET");
    }

    #[test]
    fn test_query_inputs() {
        let req = Request::new(Environ::new("GET", "/?a=1&b=x+y&a=2&empty="));
        assert_eq!(req.get("a"), Some("1"));
        assert_eq!(req.get_list("a"), vec!["1", "2"]);
        assert_eq!(req.get("b"), Some("x y"));
        assert_eq!(req.get("empty"), Some(""));
        assert_eq!(req.get("missing"), None);
        assert!(req.get_list("missing").is_empty());
    }

    #[test]
    fn test_form_body_inputs() {
        let env = Environ::new("POST", "/signin?next=/home")
            .with_header("Content-Type", "application/x-www-form-urlencoded")
            .with_body("email=a%40b.com&passwd=secret");
        let req = Request::new(env);
        assert_eq!(req.get("email"), Some("a@b.com"));
        assert_eq!(req.get("next"), Some("/home"));
    }

    #[test]
    fn test_input_defaults() {
        let req = Request::new(Environ::new("GET", "/?page=3"));
        let input = req.input(&[("page", "1"), ("size", "20")]);
        assert_eq!(input["page"], "3");
        assert_eq!(input["size"], "20");
    }

    #[test]
    fn test_non_form_body_is_not_parsed() {
        let env = Environ::new("POST", "/")
            .with_header("Content-Type", "application/json")
            .with_body(r#"{"a":1}"#);
        let req = Request::new(env);
        assert_eq!(req.get("a"), None);
        let value: serde_json::Value = req.json().unwrap();
        assert_eq!(value["a"], 1);
    }

    #[test]
    fn test_headers() {
        let env = Environ::new("GET", "/")
            .with_header("X-Request-Id", "42")
            .with_header("Host", "localhost:9000");
        let req = Request::new(env);
        assert_eq!(req.header("x-request-id"), Some("42"));
        assert_eq!(req.headers().get("X-REQUEST-ID"), Some(&"42".to_string()));
        assert_eq!(req.host(), "localhost:9000");
    }

    #[test]
    fn test_cookies() {
        let env = Environ::new("GET", "/").with_header("Cookie", "a=1; name=hello%20you; =bad; flag");
        let req = Request::new(env);
        let cookies = req.cookies();
        assert_eq!(cookies.len(), 2);
        assert_eq!(req.cookie("a"), Some("1".to_string()));
        assert_eq!(req.cookie("name"), Some("hello you".to_string()));
    }

    #[test]
    fn test_cookie_with_blank_key_is_dropped() {
        let env = Environ::new("GET", "/").with_header("Cookie", "  =x;\t=y; user=alice");
        let cookies = Request::new(env).cookies();
        assert_eq!(cookies.len(), 1);
        assert!(!cookies.contains_key(""));
        assert_eq!(cookies["user"], "alice");
    }

    fn upload() -> Environ {
        let body = "--XyZ\r\n\
            Content-Disposition: form-data; name=\"title\"\r\n\r\n\
            Holiday\r\n\
            --XyZ\r\n\
            Content-Disposition: form-data; name=\"tag\"\r\n\r\n\
            beach\r\n\
            --XyZ\r\n\
            Content-Disposition: form-data; name=\"photo\"; filename=\"sea.png\"\r\n\
            Content-Type: image/png\r\n\r\n\
            PNGDATA\r\n\
            --XyZ--\r\n";
        Environ::new("POST", "/upload?tag=sun")
            .with_header("Content-Type", "multipart/form-data; boundary=XyZ")
            .with_body(body)
    }

    #[test]
    fn test_multipart_fields_and_files() {
        let req = Request::new(upload());
        assert_eq!(req.get("title"), Some("Holiday"));
        assert_eq!(req.get_list("tag"), vec!["sun", "beach"]);
        assert_eq!(req.get("photo"), Some("sea.png"));

        let photo = req.file("photo").unwrap();
        assert_eq!(photo.filename, "sea.png");
        assert_eq!(photo.content_type.as_deref(), Some("image/png"));
        assert_eq!(photo.data.as_ref(), b"PNGDATA");
        assert_eq!(req.files("photo").len(), 1);
        assert!(req.file("title").is_none());
        assert!(req.files("missing").is_empty());

        let input = req.input(&[("album", "misc")]);
        assert_eq!(input["title"], "Holiday");
        assert_eq!(input["album"], "misc");
    }

    #[test]
    fn test_malformed_multipart_keeps_query_inputs() {
        let env = Environ::new("POST", "/upload?page=2")
            .with_header("Content-Type", "multipart/form-data")
            .with_body("garbage");
        let req = Request::new(env);
        assert_eq!(req.get("page"), Some("2"));
        assert!(req.file("photo").is_none());
    }
}
