mod config;
mod db;
mod errors;
mod llm_client;
mod models;
mod review;
mod routes;
mod services;
mod state;

use anyhow::Result;
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::{create_pool, init_schema};
use crate::llm_client::LlmClient;
use crate::review::driver::{Collaborators, ReviewDriver};
use crate::routes::build_router;
use crate::services::generation::NoteGenerator;
use crate::services::storage::AudioStore;
use crate::services::transcription::{load_sample_transcript, NoTranscriber};
use crate::services::Backend;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Review API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let db = create_pool(&config.database_url).await?;
    init_schema(&db).await?;

    // Initialize S3 / MinIO
    let s3 = build_s3_client(&config).await;
    info!("S3 client initialized");

    // Initialize note generation (stub when no API key is configured)
    let llm = config.anthropic_api_key.clone().map(LlmClient::new);
    let generator = NoteGenerator::new(llm);
    info!(
        "Note generation: provider={}, model={}",
        generator.provider(),
        generator.model()
    );

    let sample_transcript = load_sample_transcript(config.sample_transcript_path.as_deref());

    let backend = Arc::new(Backend::new(
        db,
        AudioStore::new(s3, config.s3_bucket.clone()),
        generator,
        Arc::new(NoTranscriber),
        sample_transcript,
    ));

    let reviews = Arc::new(ReviewDriver::new(
        Collaborators {
            ingestion: backend.clone(),
            generation: backend.clone(),
            persistence: backend.clone(),
            audit: backend.clone(),
        },
        config.default_patient_id.clone(),
    ));

    // Build app state
    let state = AppState { backend, reviews };

    // Build router
    let app = build_router(state, config.max_upload_bytes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Constructs an S3 client configured for MinIO (local) or AWS (production).
async fn build_s3_client(config: &Config) -> aws_sdk_s3::Client {
    let credentials = Credentials::new(
        &config.aws_access_key_id,
        &config.aws_secret_access_key,
        None,
        None,
        "review-static",
    );

    let s3_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new("us-east-1"))
        .credentials_provider(credentials)
        .endpoint_url(&config.s3_endpoint)
        .load()
        .await;

    let s3_config = aws_sdk_s3::config::Builder::from(&s3_config)
        .force_path_style(true)
        .build();
    aws_sdk_s3::Client::from_conf(s3_config)
}
