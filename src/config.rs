use std::path::PathBuf;

use anyhow::Context;
use serde::Deserialize;

const DEFAULT_FRONTEND_URL: &str = "http://localhost:5173";

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    pub ttl_hours: i64,
    /// Cross-site cookies (`Secure` + `SameSite=None`) for production front-ends.
    pub cross_site: bool,
}

/// Credentials for the S3-compatible image backend.
#[derive(Debug, Clone, Deserialize)]
pub struct S3Config {
    pub endpoint: Option<String>,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    pub region: String,
    pub public_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub allowed_origins: Vec<String>,
    pub session: SessionConfig,
    pub upload_dir: PathBuf,
    pub s3: Option<S3Config>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let database_url = var("DATABASE_URL").context("DATABASE_URL is not set")?;

        let allowed_origins = var("FRONTEND_URL")
            .unwrap_or_else(|| DEFAULT_FRONTEND_URL.into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let session = SessionConfig {
            ttl_hours: var("SESSION_TTL_HOURS")
                .and_then(|v| v.parse::<i64>().ok())
                .filter(|h| *h > 0)
                .unwrap_or(24),
            cross_site: var("APP_ENV").is_some_and(|v| v.eq_ignore_ascii_case("production")),
        };

        let upload_dir = var("UPLOAD_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("public/images"));

        // Remote storage is used only when all credentials are present.
        let s3 = match (var("S3_BUCKET"), var("S3_ACCESS_KEY"), var("S3_SECRET_KEY")) {
            (Some(bucket), Some(access_key), Some(secret_key)) => Some(S3Config {
                endpoint: var("S3_ENDPOINT"),
                bucket,
                access_key,
                secret_key,
                region: var("S3_REGION").unwrap_or_else(|| "us-east-1".into()),
                public_url: var("S3_PUBLIC_URL"),
            }),
            _ => None,
        };

        Ok(Self {
            database_url,
            allowed_origins,
            session,
            upload_dir,
            s3,
        })
    }
}
