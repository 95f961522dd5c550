//! # Route Declaration
//!
//! A route binds an HTTP method and a path template to a handler.
//!
//! Templates are either static (`/about`) or dynamic, with `:name` tokens
//! standing for exactly one path segment each (`/users/:id/posts/:post_id`).
//! Dynamic templates compile to an anchored regex: literal text is escaped
//! character by character, every token becomes a named capture `[^/]+`.

use crate::context::Context;
use crate::error::{Error, HttpError, Result};
use crate::response::Body;
use crate::router::Method;
use regex::Regex;
use std::fmt;
use std::sync::{Arc, OnceLock};

/// What handlers and interceptors return
pub type HandlerResult = std::result::Result<Body, HttpError>;

/// Type-erased request handler
pub type Handler = Arc<dyn Fn(&mut Context) -> HandlerResult + Send + Sync>;

fn token_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r":[a-zA-Z_]\w*").expect("static route token regex"))
}

/// Whether `path` contains no `:name` tokens
#[must_use]
pub fn is_static(path: &str) -> bool {
    !token_regex().is_match(path)
}

/// Translate a path template into regex source
///
/// ```
/// use transwarp_core::route::build_regex;
///
/// assert_eq!(build_regex("/path/to/:file"), r"^\/path\/to\/(?P<file>[^\/]+)$");
/// ```
#[must_use]
pub fn build_regex(path: &str) -> String {
    let mut re = String::from("^");
    let mut last = 0;

    for token in token_regex().find_iter(path) {
        push_escaped(&mut re, &path[last..token.start()]);
        re.push_str(&format!(r"(?P<{}>[^\/]+)", &token.as_str()[1..]));
        last = token.end();
    }
    push_escaped(&mut re, &path[last..]);
    re.push('$');
    re
}

// `<`, `>` and non-ASCII characters are not metacharacters and the regex
// parser refuses to see them escaped.
fn push_escaped(re: &mut String, literal: &str) {
    for ch in literal.chars() {
        if ch.is_ascii() && !ch.is_ascii_alphanumeric() && ch != '<' && ch != '>' {
            re.push('\\');
        }
        re.push(ch);
    }
}

/// Path arguments captured from a dynamic route, in template order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    names: Vec<String>,
    values: Vec<String>,
}

impl Params {
    /// Captured values, in template order
    #[must_use]
    pub fn values(&self) -> &[String] {
        &self.values
    }

    /// Value captured for `name`
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| self.values[i].as_str())
    }

    /// Number of captured values
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether nothing was captured
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

enum Matcher {
    Static,
    Dynamic { regex: Regex, names: Vec<String> },
}

/// A method + path template bound to a handler
pub struct Route {
    method: Method,
    path: String,
    matcher: Matcher,
    handler: Handler,
}

impl Route {
    /// Build a route from a handler closure or function
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidRoutePattern` when the template does not start
    /// with `/` or its regex fails to compile.
    pub fn new<F, B>(method: Method, path: &str, handler: F) -> Result<Self>
    where
        F: Fn(&mut Context) -> std::result::Result<B, HttpError> + Send + Sync + 'static,
        B: Into<Body>,
    {
        if !path.starts_with('/') {
            return Err(Error::InvalidRoutePattern {
                pattern: path.to_string(),
                reason: "path must start with '/'".to_string(),
            });
        }

        let matcher = if is_static(path) {
            Matcher::Static
        } else {
            let regex = Regex::new(&build_regex(path)).map_err(|e| Error::InvalidRoutePattern {
                pattern: path.to_string(),
                reason: e.to_string(),
            })?;
            let names = regex
                .capture_names()
                .flatten()
                .map(str::to_string)
                .collect();
            Matcher::Dynamic { regex, names }
        };

        Ok(Self {
            method,
            path: path.to_string(),
            matcher,
            handler: Arc::new(move |ctx: &mut Context| -> HandlerResult {
                handler(ctx).map(Into::into)
            }),
        })
    }

    /// HTTP method
    #[must_use]
    pub const fn method(&self) -> Method {
        self.method
    }

    /// Path template as registered
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Whether the template has no `:name` tokens
    #[must_use]
    pub const fn is_static(&self) -> bool {
        matches!(self.matcher, Matcher::Static)
    }

    /// Match a decoded request path
    ///
    /// Static routes match only their literal path and capture nothing.
    #[must_use]
    pub fn matches(&self, url: &str) -> Option<Params> {
        match &self.matcher {
            Matcher::Static => (url == self.path).then(Params::default),
            Matcher::Dynamic { regex, names } => {
                let caps = regex.captures(url)?;
                let values = names
                    .iter()
                    .map(|n| caps.name(n).map_or_else(String::new, |m| m.as_str().to_string()))
                    .collect();
                Some(Params {
                    names: names.clone(),
                    values,
                })
            }
        }
    }

    /// Invoke the handler
    pub fn call(&self, ctx: &mut Context) -> HandlerResult {
        (self.handler)(ctx)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.is_static() { "static" } else { "dynamic" };
        write!(f, "Route({kind},{},path={})", self.method, self.path)
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Anything that can be registered as a route
///
/// Implemented by [`Route`] itself and by the unit structs the `#[get]` /
/// `#[post]` attribute macros generate.
pub trait IntoRoute {
    /// Produce the route
    ///
    /// # Errors
    ///
    /// Propagates route construction errors.
    fn into_route(self) -> Result<Route>;
}

impl IntoRoute for Route {
    fn into_route(self) -> Result<Route> {
        Ok(self)
    }
}

impl IntoRoute for Result<Route> {
    fn into_route(self) -> Result<Route> {
        self
    }
}

/// `GET` route
///
/// # Errors
///
/// See [`Route::new`].
pub fn get<F, B>(path: &str, handler: F) -> Result<Route>
where
    F: Fn(&mut Context) -> std::result::Result<B, HttpError> + Send + Sync + 'static,
    B: Into<Body>,
{
    Route::new(Method::Get, path, handler)
}

/// `POST` route
///
/// # Errors
///
/// See [`Route::new`].
pub fn post<F, B>(path: &str, handler: F) -> Result<Route>
where
    F: Fn(&mut Context) -> std::result::Result<B, HttpError> + Send + Sync + 'static,
    B: Into<Body>,
{
    Route::new(Method::Post, path, handler)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(_: &mut Context) -> std::result::Result<&'static str, HttpError> {
        Ok("")
    }

    #[test]
    fn test_build_regex() {
        assert_eq!(build_regex("/path/to/:file"), r"^\/path\/to\/(?P<file>[^\/]+)$");
        assert_eq!(
            build_regex("/:user/:comments/list"),
            r"^\/(?P<user>[^\/]+)\/(?P<comments>[^\/]+)\/list$"
        );
        assert_eq!(build_regex(":id-:pid/:w"), r"^(?P<id>[^\/]+)\-(?P<pid>[^\/]+)\/(?P<w>[^\/]+)$");
    }

    #[test]
    fn test_build_regex_escapes_literals() {
        assert_eq!(build_regex("/a.b/:x"), r"^\/a\.b\/(?P<x>[^\/]+)$");
        let re = Regex::new(&build_regex("/a.b/:x")).unwrap();
        assert!(re.is_match("/a.b/1"));
        assert!(!re.is_match("/aXb/1"));
    }

    #[test]
    fn test_static_route_matches_only_literal() {
        let route = get("/about", noop).unwrap();
        assert!(route.is_static());
        assert_eq!(route.matches("/about"), Some(Params::default()));
        assert!(route.matches("/about/").is_none());
        assert!(route.matches("/About").is_none());
        assert!(route.matches("/about/x").is_none());
    }

    #[test]
    fn test_dynamic_route_captures_segments() {
        let route = get("/users/:uid/posts/:pid", noop).unwrap();
        assert!(!route.is_static());

        let params = route.matches("/users/42/posts/7").unwrap();
        assert_eq!(params.values(), &["42".to_string(), "7".to_string()]);
        assert_eq!(params.get("uid"), Some("42"));
        assert_eq!(params.get("pid"), Some("7"));
        assert_eq!(params.get("nope"), None);
    }

    #[test]
    fn test_dynamic_route_rejects_extra_or_missing_segments() {
        let route = get("/users/:uid", noop).unwrap();
        assert!(route.matches("/users/42/extra").is_none());
        assert!(route.matches("/users/").is_none());
        assert!(route.matches("/users").is_none());
        assert!(route.matches("/prefix/users/42").is_none());
    }

    #[test]
    fn test_route_display() {
        assert_eq!(get("/a", noop).unwrap().to_string(), "Route(static,GET,path=/a)");
        assert_eq!(
            post("/a/:id", noop).unwrap().to_string(),
            "Route(dynamic,POST,path=/a/:id)"
        );
    }

    #[test]
    fn test_path_must_be_absolute() {
        assert!(get("about", noop).is_err());
    }
}
