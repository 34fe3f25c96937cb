use std::{
    io::{self, Write},
    process,
};

use folio::{
    application::{content::ContentService, error::AppError},
    config::{self, Command, ListArgs, ShowArgs, WarmArgs},
    domain::entities::EntryMeta,
    infra::{
        bootstrap::{build_content_service, site_identity},
        error::InfraError,
        http::{self, HttpState},
        telemetry,
    },
};
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt()
        .with_max_level(Level::ERROR)
        .with_writer(io::stderr)
        .finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    telemetry::init(&settings.logging).map_err(AppError::from)?;
    let content = build_content_service(&settings).await?;

    match cli_args.command {
        None | Some(Command::Serve(_)) => run_serve(&settings, content).await,
        Some(Command::List(args)) => run_list(&settings, &content, args).await,
        Some(Command::Show(args)) => run_show(&settings, &content, args).await,
        Some(Command::Warm(args)) => run_warm(&content, args).await,
    }
}

async fn run_serve(settings: &config::Settings, content: ContentService) -> Result<(), AppError> {
    let state = HttpState::new(content, site_identity(settings));
    let router = http::build_router(state);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    info!(
        target = "folio::serve",
        addr = %settings.server.addr,
        "Listening"
    );

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(target = "folio::serve", error = %err, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!(target = "folio::serve", "Shutting down");
}

async fn run_list(
    settings: &config::Settings,
    content: &ContentService,
    args: ListArgs,
) -> Result<(), AppError> {
    let collection = args
        .collection
        .unwrap_or_else(|| settings.content.default_collection().to_string());
    let entries = content.list(&collection).await?;

    let mut stdout = io::stdout().lock();
    if args.json {
        serde_json::to_writer_pretty(&mut stdout, &entries)
            .map_err(|err| AppError::unexpected(format!("failed to encode entries: {err}")))?;
        writeln!(stdout).map_err(io_error)?;
    } else {
        for meta in &entries {
            writeln!(stdout, "{}", list_line(meta)).map_err(io_error)?;
        }
    }
    Ok(())
}

async fn run_show(
    settings: &config::Settings,
    content: &ContentService,
    args: ShowArgs,
) -> Result<(), AppError> {
    let collection = args
        .collection
        .unwrap_or_else(|| settings.content.default_collection().to_string());
    let entry = content.get(&collection, &args.slug).await?;

    let mut stdout = io::stdout().lock();
    if args.html {
        writeln!(stdout, "{}", entry.body.html).map_err(io_error)?;
    } else {
        serde_json::to_writer_pretty(&mut stdout, entry.as_ref())
            .map_err(|err| AppError::unexpected(format!("failed to encode entry: {err}")))?;
        writeln!(stdout).map_err(io_error)?;
    }
    Ok(())
}

async fn run_warm(content: &ContentService, args: WarmArgs) -> Result<(), AppError> {
    let collections = match args.collection {
        Some(collection) => vec![collection],
        None => content.collections().to_vec(),
    };

    for collection in collections {
        let count = content.warm(&collection).await?;
        writeln!(io::stdout(), "{collection}: {count} entries").map_err(io_error)?;
    }
    Ok(())
}

fn list_line(meta: &EntryMeta) -> String {
    let date = meta.effective_date().date().to_string();
    let tags = if meta.tags.is_empty() {
        String::new()
    } else {
        format!("  [{}]", meta.tags.join(", "))
    };
    format!("{date}  {:<32}  {}{tags}", meta.slug, meta.title)
}

fn io_error(err: io::Error) -> AppError {
    AppError::from(InfraError::from(err))
}
