use anyhow::{Context, Result};

use crate::services::handlers::DEFAULT_MAX_UPLOAD_BYTES;

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub s3_bucket: String,
    pub s3_endpoint: String,
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
    /// Absent → notes come from the built-in stub.
    pub anthropic_api_key: Option<String>,
    pub sample_transcript_path: Option<String>,
    pub default_patient_id: String,
    /// Largest accepted ingest upload, in bytes.
    pub max_upload_bytes: usize,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            s3_bucket: require_env("S3_BUCKET")?,
            s3_endpoint: require_env("S3_ENDPOINT")?,
            aws_access_key_id: require_env("AWS_ACCESS_KEY_ID")?,
            aws_secret_access_key: require_env("AWS_SECRET_ACCESS_KEY")?,
            anthropic_api_key: optional_env("ANTHROPIC_API_KEY"),
            sample_transcript_path: optional_env("SAMPLE_TRANSCRIPT_PATH"),
            default_patient_id: optional_env("DEFAULT_PATIENT_ID")
                .unwrap_or_else(|| "patient-001".to_string()),
            max_upload_bytes: parse_upload_limit(std::env::var("MAX_UPLOAD_BYTES").ok().as_deref())?,
            port: parse_port(std::env::var("PORT").ok().as_deref())?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

/// Unset and blank values are both treated as absent.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_port(raw: Option<&str>) -> Result<u16> {
    raw.unwrap_or("8080")
        .parse::<u16>()
        .context("PORT must be a valid port number")
}

fn parse_upload_limit(raw: Option<&str>) -> Result<usize> {
    match raw {
        None => Ok(DEFAULT_MAX_UPLOAD_BYTES),
        Some(raw) => raw
            .parse::<usize>()
            .context("MAX_UPLOAD_BYTES must be a byte count"),
    }
}
