//! `transwarp-dev`: development server running a small demo application.

use anyhow::Context as _;
use clap::Parser;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};
use transwarp::prelude::*;
use transwarp::{Server, ServerConfig};

#[derive(Parser)]
#[command(name = "transwarp-dev")]
#[command(about = "Development server for Transwarp applications")]
struct Args {
    /// Interface to listen on
    #[arg(long, env = "TRANSWARP_HOST", default_value = "127.0.0.1")]
    host: String,

    /// Port to listen on
    #[arg(short, long, env = "TRANSWARP_PORT", default_value_t = 9000)]
    port: u16,

    /// Document root exposed to handlers
    #[arg(long)]
    document_root: Option<PathBuf>,

    /// Max request body size in bytes
    #[arg(long, default_value_t = 1024 * 1024)]
    max_body_size: usize,

    /// Emit JSON logs
    #[arg(long)]
    json_logs: bool,

    /// Print the demo schema and exit
    #[arg(long)]
    print_schema: bool,

    /// Create the demo schema in this SQLite database before serving
    #[arg(long)]
    database: Option<String>,
}

#[derive(Debug, Clone, Model)]
#[model(table = "notes", pre_insert = touch)]
struct Note {
    #[field(primary_key, ddl = "varchar(50)")]
    id: String,
    #[field(ddl = "varchar(100)")]
    title: String,
    body: Option<String>,
    #[field(updatable = false)]
    created_at: f64,
}

fn touch(note: &mut Note) {
    note.created_at = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0.0, |d| d.as_secs_f64());
}

#[get("/")]
fn index(ctx: &mut Context) -> Result<String, HttpError> {
    let root = ctx
        .application
        .document_root
        .as_ref()
        .map_or_else(|| "-".to_string(), |p| p.display().to_string());
    Ok(format!("<h1>transwarp {}</h1><p>document root: {root}</p>", transwarp::VERSION))
}

#[get("/hello/:name")]
fn hello(ctx: &mut Context) -> Result<String, HttpError> {
    Ok(format!("hello, {}", ctx.param("name").unwrap_or("world")))
}

#[post("/echo")]
fn echo(ctx: &mut Context) -> Result<Body, HttpError> {
    ctx.response.set_content_type(Some("application/json"));
    let inputs = ctx.request.input(&[]);
    Body::json(&inputs).map_err(|_| HttpError::internal_error())
}

#[get("/old")]
fn old(_ctx: &mut Context) -> Result<Body, HttpError> {
    Err(HttpError::redirect("/"))
}

#[interceptor("/admin/")]
fn admin_only(ctx: &mut Context, next: Next<'_>) -> HandlerResult {
    if ctx.request.cookie("admin").is_none() {
        return Err(HttpError::see_other("/"));
    }
    next(ctx)
}

#[get("/admin/")]
fn admin(_ctx: &mut Context) -> Result<&'static str, HttpError> {
    Ok("admin area")
}

fn build_app(document_root: Option<PathBuf>) -> transwarp::Result<Application> {
    let mut app = Application::new(document_root);
    app.add_url(index)?;
    app.add_url(hello)?;
    app.add_module(Module::new("demo").with(echo).with(old).with(admin))?;
    app.add_interceptor(Interceptor::logging())?;
    app.add_interceptor(Interceptor::timing())?;
    app.add_interceptor(admin_only)?;
    Ok(app)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if args.print_schema {
        println!("{}", Note::mapping().sql());
        return Ok(());
    }

    transwarp::init_tracing(args.json_logs);

    if let Some(url) = &args.database {
        let db = SqliteDb::connect(url, None).await?;
        db.execute(Note::mapping().sql()).await?;
        let mut welcome = Note {
            id: "welcome".to_string(),
            title: "Welcome".to_string(),
            body: None,
            created_at: 0.0,
        };
        welcome.insert(&db).await?;
        let notes = Note::count_all(&db).await?;
        tracing::info!(notes, "Demo schema ready");
        db.close().await;
    }

    let address = tokio::net::lookup_host((args.host.as_str(), args.port))
        .await
        .with_context(|| format!("cannot resolve {}:{}", args.host, args.port))?
        .next()
        .with_context(|| format!("no address for {}", args.host))?;

    let app = build_app(args.document_root)?;
    tracing::info!(address = %address, "transwarp-dev starting");

    let config = ServerConfig {
        address,
        max_body_size: args.max_body_size,
        ..ServerConfig::default()
    };
    Server::new(app.into_dispatcher())
        .with_config(config)
        .serve()
        .await?;
    Ok(())
}
