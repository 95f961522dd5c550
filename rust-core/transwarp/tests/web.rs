use std::sync::{Arc, Mutex};
use transwarp::prelude::*;
use transwarp::{Environ, IntoInterceptor, IntoRoute, Method};

#[get("/")]
fn index(_ctx: &mut Context) -> Result<&'static str, HttpError> {
    Ok("index")
}

#[get("/users/:uid/comments/:cid")]
fn comment(ctx: &mut Context) -> Result<String, HttpError> {
    Ok(ctx.request.args().join("/"))
}

#[post("/signin")]
fn signin(ctx: &mut Context) -> Result<String, HttpError> {
    let name = ctx.request.get("name").unwrap_or("").to_string();
    if name.is_empty() {
        return Err(HttpError::bad_request());
    }
    ctx.response
        .set_cookie("user", &name, &CookieOptions::default());
    Err(HttpError::see_other("/"))
}

/// Rejects anonymous access to `/manage/`
#[interceptor("/manage/")]
fn manage_guard(ctx: &mut Context, next: Next<'_>) -> HandlerResult {
    if ctx.request.cookie("user").is_none() {
        return Err(HttpError::forbidden());
    }
    next(ctx)
}

#[post("/upload")]
fn upload(ctx: &mut Context) -> Result<String, HttpError> {
    let file = ctx.request.file("attachment").ok_or_else(HttpError::bad_request)?;
    Ok(format!(
        "{} {} {}",
        ctx.request.get("note").unwrap_or(""),
        file.filename,
        file.data.len()
    ))
}

#[get("/manage/")]
fn manage(_ctx: &mut Context) -> Result<&'static str, HttpError> {
    Ok("manage")
}

fn app() -> Application {
    let mut app = Application::new(None);
    app.add_url(index).unwrap();
    app.add_url(comment).unwrap();
    app.add_url(upload).unwrap();
    app.add_module(Module::new("auth").with(signin).with(manage))
        .unwrap();
    app.add_interceptor(manage_guard).unwrap();
    app
}

#[test]
fn test_attribute_macros_build_routes() {
    let route = index.into_route().unwrap();
    assert_eq!(route.method(), Method::Get);
    assert!(route.is_static());

    let route = comment.into_route().unwrap();
    assert_eq!(route.path(), "/users/:uid/comments/:cid");
    assert!(!route.is_static());

    assert_eq!(signin.into_route().unwrap().method(), Method::Post);
}

#[test]
fn test_interceptor_macro_is_named() {
    let interceptor = manage_guard.into_interceptor().unwrap();
    assert_eq!(interceptor.name(), "manage_guard");
}

#[test]
fn test_dispatch_through_macros() {
    let dispatcher = app().into_dispatcher();

    let resp = dispatcher.call(Environ::new("GET", "/"));
    assert_eq!(resp.status, "200 OK");
    assert_eq!(resp.body.as_ref(), b"index");

    let resp = dispatcher.call(Environ::new("GET", "/users/7/comments/99"));
    assert_eq!(resp.body.as_ref(), b"7/99");
}

#[test]
fn test_redirect_keeps_cookies() {
    let env = Environ::new("POST", "/signin")
        .with_header("Content-Type", "application/x-www-form-urlencoded")
        .with_body("name=alice");
    let resp = app().into_dispatcher().call(env);
    assert_eq!(resp.status, "303 See Other");
    assert_eq!(resp.header("Location"), Some("/"));
    assert_eq!(
        resp.header("Set-Cookie"),
        Some("user=alice; Path=/; HttpOnly")
    );
}

#[test]
fn test_bad_request_from_handler() {
    let resp = app().into_dispatcher().call(Environ::new("POST", "/signin"));
    assert_eq!(resp.status, "400 Bad Request");
    assert!(resp.body.is_empty());
}

#[test]
fn test_guard_interceptor() {
    let dispatcher = app().into_dispatcher();

    let resp = dispatcher.call(Environ::new("GET", "/manage/"));
    assert_eq!(resp.status, "403 Forbidden");

    let env = Environ::new("GET", "/manage/").with_header("Cookie", "user=alice");
    let resp = dispatcher.call(env);
    assert_eq!(resp.status, "200 OK");
    assert_eq!(resp.body.as_ref(), b"manage");
}

#[test]
fn test_interceptor_order_across_registrations() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut app = Application::new(None);
    app.add_url(index).unwrap();
    for name in ["outer", "inner"] {
        let log = Arc::clone(&log);
        app.add_interceptor(Interceptor::new("/", move |ctx, next| {
            log.lock().unwrap().push(format!("enter {name}"));
            let result = next(ctx);
            log.lock().unwrap().push(format!("leave {name}"));
            result
        }))
        .unwrap();
    }

    app.into_dispatcher().call(Environ::new("GET", "/"));
    assert_eq!(
        *log.lock().unwrap(),
        vec!["enter outer", "enter inner", "leave inner", "leave outer"]
    );
}

#[test]
fn test_percent_encoded_paths_are_decoded() {
    let resp = app()
        .into_dispatcher()
        .call(Environ::new("GET", "/users/a%20b/comments/1"));
    assert_eq!(resp.body.as_ref(), b"a b/1");
}

#[test]
fn test_multipart_upload_reaches_handler() {
    let body = "--b1\r\n\
        Content-Disposition: form-data; name=\"note\"\r\n\r\n\
        draft\r\n\
        --b1\r\n\
        Content-Disposition: form-data; name=\"attachment\"; filename=\"a.txt\"\r\n\
        Content-Type: text/plain\r\n\r\n\
        hello\r\n\
        --b1--\r\n";
    let env = Environ::new("POST", "/upload")
        .with_header("Content-Type", "multipart/form-data; boundary=b1")
        .with_body(body);
    let resp = app().into_dispatcher().call(env);
    assert_eq!(resp.status, "200 OK");
    assert_eq!(resp.body.as_ref(), b"draft a.txt 5");

    let resp = app().into_dispatcher().call(Environ::new("POST", "/upload"));
    assert_eq!(resp.status, "400 Bad Request");
}
