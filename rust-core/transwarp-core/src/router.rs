//! # Router
//!
//! Per-method route tables.
//!
//! - Static routes live in an exact-match map keyed by path
//! - Dynamic routes are scanned in registration order; the first match wins
//! - The static table is consulted before any dynamic route

use crate::error::HttpError;
use crate::route::{Params, Route};
use std::collections::HashMap;
use std::str::FromStr;
use tracing::info;

/// HTTP methods supported by the router
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// HTTP GET
    Get,
    /// HTTP POST
    Post,
    /// HTTP PUT
    Put,
    /// HTTP DELETE
    Delete,
    /// HTTP PATCH
    Patch,
    /// HTTP HEAD
    Head,
    /// HTTP OPTIONS
    Options,
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Get => write!(f, "GET"),
            Self::Post => write!(f, "POST"),
            Self::Put => write!(f, "PUT"),
            Self::Delete => write!(f, "DELETE"),
            Self::Patch => write!(f, "PATCH"),
            Self::Head => write!(f, "HEAD"),
            Self::Options => write!(f, "OPTIONS"),
        }
    }
}

impl FromStr for Method {
    type Err = HttpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "DELETE" => Ok(Self::Delete),
            "PATCH" => Ok(Self::Patch),
            "HEAD" => Ok(Self::Head),
            "OPTIONS" => Ok(Self::Options),
            _ => Err(HttpError::NotFound),
        }
    }
}

/// A matched route together with the arguments it captured
#[derive(Debug)]
pub struct Match<'a> {
    /// The route that matched
    pub route: &'a Route,
    /// Path arguments (empty for static routes)
    pub params: Params,
}

#[derive(Default)]
struct MethodRoutes {
    statics: HashMap<String, Route>,
    dynamics: Vec<Route>,
}

/// Route tables for every method
#[derive(Default)]
pub struct Router {
    method_routes: HashMap<Method, MethodRoutes>,
}

impl Router {
    /// Create a new empty router
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a route
    ///
    /// A static route replaces an earlier static route with the same method
    /// and path.
    pub fn add(&mut self, route: Route) {
        info!("Add route: {}", route);
        let table = self.method_routes.entry(route.method()).or_default();
        if route.is_static() {
            table.statics.insert(route.path().to_string(), route);
        } else {
            table.dynamics.push(route);
        }
    }

    /// Find the route for `method` and decoded `path`
    ///
    /// # Errors
    ///
    /// Returns `HttpError::NotFound` when no route matches.
    pub fn match_route(&self, method: Method, path: &str) -> Result<Match<'_>, HttpError> {
        let table = self.method_routes.get(&method).ok_or(HttpError::NotFound)?;

        if let Some(route) = table.statics.get(path) {
            return Ok(Match {
                route,
                params: Params::default(),
            });
        }

        table
            .dynamics
            .iter()
            .find_map(|route| route.matches(path).map(|params| Match { route, params }))
            .ok_or(HttpError::NotFound)
    }

    /// Number of registered routes
    #[must_use]
    pub fn len(&self) -> usize {
        self.method_routes
            .values()
            .map(|t| t.statics.len() + t.dynamics.len())
            .sum()
    }

    /// Whether no route is registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;
    use crate::route::{get, post, Route};

    fn route(method: Method, path: &str, tag: &'static str) -> Route {
        Route::new(method, path, move |_: &mut Context| Ok::<_, HttpError>(tag)).unwrap()
    }

    #[test]
    fn test_basic_routing() {
        let mut router = Router::new();
        router.add(route(Method::Get, "/", "index"));
        router.add(route(Method::Get, "/users", "list"));
        router.add(route(Method::Post, "/users", "create"));
        assert_eq!(router.len(), 3);

        let m = router.match_route(Method::Get, "/users").unwrap();
        assert_eq!(m.route.method(), Method::Get);
        assert!(m.params.is_empty());

        let m = router.match_route(Method::Post, "/users").unwrap();
        assert_eq!(m.route.method(), Method::Post);
    }

    #[test]
    fn test_path_parameters() {
        let mut router = Router::new();
        router.add(route(Method::Get, "/users/:id", "one"));
        router.add(route(Method::Get, "/users/:user_id/posts/:post_id", "post"));

        let m = router.match_route(Method::Get, "/users/123").unwrap();
        assert_eq!(m.params.get("id"), Some("123"));

        let m = router.match_route(Method::Get, "/users/456/posts/789").unwrap();
        assert_eq!(m.params.get("user_id"), Some("456"));
        assert_eq!(m.params.get("post_id"), Some("789"));
    }

    #[test]
    fn test_static_beats_dynamic() {
        let mut router = Router::new();
        router.add(route(Method::Get, "/users/:id", "one"));
        router.add(route(Method::Get, "/users/me", "me"));

        let m = router.match_route(Method::Get, "/users/me").unwrap();
        assert!(m.route.is_static());
    }

    #[test]
    fn test_first_dynamic_route_wins() {
        let mut router = Router::new();
        router.add(route(Method::Get, "/:a/:b", "first"));
        router.add(route(Method::Get, "/x/:b", "second"));

        let m = router.match_route(Method::Get, "/x/1").unwrap();
        assert_eq!(m.route.path(), "/:a/:b");
    }

    #[test]
    fn test_route_not_found() {
        let mut router = Router::new();
        router.add(get("/users", |_| Ok::<_, HttpError>("")).unwrap());
        assert_eq!(
            router.match_route(Method::Get, "/nonexistent").unwrap_err(),
            HttpError::NotFound
        );
    }

    #[test]
    fn test_method_without_routes() {
        let mut router = Router::new();
        router.add(post("/users", |_| Ok::<_, HttpError>("")).unwrap());
        assert!(router.match_route(Method::Get, "/users").is_err());
    }

    #[test]
    fn test_method_from_str() {
        assert_eq!("get".parse::<Method>().unwrap(), Method::Get);
        assert_eq!("OPTIONS".parse::<Method>().unwrap(), Method::Options);
        assert!("BREW".parse::<Method>().is_err());
    }
}
