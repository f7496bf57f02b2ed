use std::{
    net::{IpAddr, SocketAddr},
    sync::Arc,
};

use camino::Utf8PathBuf as PathBuf;
use clap::Parser;
use eyre::{self, Context, Result};
use tokio::signal;
use tracing::{info, warn};
use tracing_error::ErrorLayer;
use tracing_subscriber::{prelude::*, EnvFilter};

use galleria::app_state::{AppState, SharedState};
use galleria_core::{
    catalog::Gallery,
    config::{self, MediaBackendConfig},
    media::MediaClient,
    model::repository::db,
};

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    #[arg(short, long)]
    config: String,
    #[cfg(feature = "opentelemetry")]
    #[arg(long)]
    otel_endpoint: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "1")
    }
    if std::env::var("RUST_SPANTRACE").is_err() {
        std::env::set_var("RUST_SPANTRACE", "1");
    }
    color_eyre::install()?;
    if std::env::var("GALLERIA_LOG").is_err() {
        std::env::set_var("GALLERIA_LOG", "info,galleria=debug,galleria_core=debug")
    }
    let tracing = tracing_subscriber::registry()
        .with(EnvFilter::from_env("GALLERIA_LOG"))
        .with(ErrorLayer::default())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr));
    #[cfg(feature = "opentelemetry")]
    {
        use opentelemetry_otlp::WithExportConfig;
        let telemetry = args
            .otel_endpoint
            .as_ref()
            .map(|otel_endpoint| {
                opentelemetry_otlp::new_pipeline()
                    .tracing()
                    .with_exporter(
                        opentelemetry_otlp::new_exporter()
                            .tonic()
                            .with_endpoint(otel_endpoint.clone()),
                    )
                    .with_trace_config(opentelemetry_sdk::trace::config().with_resource(
                        opentelemetry_sdk::Resource::new(vec![opentelemetry::KeyValue::new(
                            opentelemetry_semantic_conventions::resource::SERVICE_NAME,
                            "galleria",
                        )]),
                    ))
                    .install_batch(opentelemetry_sdk::runtime::Tokio)
                    .wrap_err("error setting up OpenTelemetry exporter")
            })
            .transpose()?
            .map(|tracer| tracing_opentelemetry::layer().with_tracer(tracer));
        tracing.with(telemetry).init();
    }
    #[cfg(not(feature = "opentelemetry"))]
    {
        tracing.init();
    }

    let config_path = PathBuf::from(&args.config);
    let config = config::read_config(&config_path).await?;
    info!(?config, "Starting up...");

    let addr: IpAddr = config
        .server
        .address
        .parse()
        .wrap_err("error parsing listening address")?;

    tokio::fs::create_dir_all(&config.data_dir)
        .await
        .wrap_err_with(|| format!("error creating data directory {}", config.data_dir))?;
    let pool = db::open_and_migrate(config.database_path().as_str())
        .await
        .wrap_err("error opening database")?;

    let media_root = match &config.media_store.backend {
        MediaBackendConfig::Local { root, .. } => {
            tokio::fs::create_dir_all(root)
                .await
                .wrap_err_with(|| format!("error creating media directory {}", root))?;
            Some(root.clone())
        }
        MediaBackendConfig::Cloudinary(_) => None,
    };
    let media = MediaClient::from_config(&config.media_store, config.retry.clone())?;
    let gallery = Gallery::new(pool, media, config.media_store.folder.clone());
    info!(media_store = gallery.media_store_name(), folder = gallery.folder(), "media store ready");

    // finish work a previous run left in the outbox
    match gallery.sync_pending_remote_ops().await {
        Ok(report) if report.pending > 0 => warn!(
            pending = report.pending,
            "media store ops still queued after startup sync"
        ),
        Ok(report) => info!(synced = report.synced, "startup sync done"),
        Err(err) => warn!("startup sync failed: {:#}", err),
    }

    let shared_state: SharedState = Arc::new(AppState::new(
        gallery,
        &config.admin_password,
        config.server.max_upload_bytes,
        media_root,
    ));
    let app = galleria::app(shared_state);

    let listener = tokio::net::TcpListener::bind(SocketAddr::new(addr, config.server.port))
        .await
        .wrap_err("Error binding socket")?;
    info!("Listening on {}", SocketAddr::new(addr, config.server.port));
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .wrap_err("server error")?;
    info!("Shutting down...");

    Ok(())
}

async fn shutdown_signal() {
    match signal::ctrl_c().await {
        Ok(()) => {}
        Err(err) => {
            eprintln!("Unable to listen for shutdown signal: {}", err);
            std::process::exit(1);
            // we also shut down in case of error
        }
    }
}
