//! Image storage backends. One is chosen at start-up from the configuration:
//! S3-compatible object storage when credentials are present, otherwise the
//! local upload directory.

use std::{
    io::Cursor,
    path::PathBuf,
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};

use anyhow::Context;
use async_trait::async_trait;
use aws_config::{defaults, BehaviorVersion};
use aws_credential_types::Credentials;
use aws_sdk_s3::{
    config::{Builder as S3ConfigBuilder, Region},
    Client,
};
use aws_smithy_types::byte_stream::ByteStream;
use bytes::Bytes;
use image::{imageops::FilterType, ImageFormat, ImageReader};
use rand::Rng;
use tracing::{debug, info, warn};

use crate::config::{AppConfig, S3Config};

/// Longest edge, in pixels, of images kept in object storage.
const REMOTE_MAX_EDGE: u32 = 800;

#[async_trait]
pub trait ImageStorage: Send + Sync {
    /// Stores the bytes and returns the reference saved on the product: a
    /// site-relative path or an absolute URL.
    async fn put_image(&self, body: Bytes, extension: &str, content_type: &str) -> anyhow::Result<String>;

    fn backend(&self) -> &'static str;
}

/// `<unix-millis>-<random>.<ext>`
pub fn unique_file_name(extension: &str) -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    let suffix: u32 = rand::thread_rng().gen_range(0..1_000_000_000);
    format!("{millis}-{suffix}.{extension}")
}

pub async fn storage_from_config(config: &AppConfig) -> anyhow::Result<Arc<dyn ImageStorage>> {
    let storage: Arc<dyn ImageStorage> = match &config.s3 {
        Some(s3) => Arc::new(S3Storage::new(s3).await?),
        None => Arc::new(LocalDiskStorage::new(config.upload_dir.clone(), "/images")),
    };
    info!(backend = storage.backend(), "image storage ready");
    Ok(storage)
}

#[derive(Debug, Clone)]
pub struct LocalDiskStorage {
    dir: PathBuf,
    public_prefix: String,
}

impl LocalDiskStorage {
    pub fn new(dir: PathBuf, public_prefix: &str) -> Self {
        Self {
            dir,
            public_prefix: public_prefix.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ImageStorage for LocalDiskStorage {
    async fn put_image(&self, body: Bytes, extension: &str, _content_type: &str) -> anyhow::Result<String> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("create upload dir {}", self.dir.display()))?;

        let file_name = unique_file_name(extension);
        let path = self.dir.join(&file_name);
        tokio::fs::write(&path, &body)
            .await
            .with_context(|| format!("write {}", path.display()))?;

        debug!(path = %path.display(), bytes = body.len(), "image written");
        Ok(format!("{}/{}", self.public_prefix, file_name))
    }

    fn backend(&self) -> &'static str {
        "local"
    }
}

#[derive(Clone)]
pub struct S3Storage {
    client: Client,
    bucket: String,
    public_base: String,
}

impl S3Storage {
    pub async fn new(cfg: &S3Config) -> anyhow::Result<Self> {
        let mut loader = defaults(BehaviorVersion::latest())
            .region(Region::new(cfg.region.clone()))
            .credentials_provider(Credentials::new(
                &cfg.access_key,
                &cfg.secret_key,
                None,
                None,
                "static",
            ));
        if let Some(endpoint) = &cfg.endpoint {
            loader = loader.endpoint_url(endpoint);
        }
        let shared = loader.load().await;

        let mut conf = S3ConfigBuilder::from(&shared);
        if cfg.endpoint.is_some() {
            // MinIO and friends want path-style addressing.
            conf = conf.force_path_style(true);
        }

        let public_base = match (&cfg.public_url, &cfg.endpoint) {
            (Some(url), _) => url.trim_end_matches('/').to_string(),
            (None, Some(endpoint)) => format!("{}/{}", endpoint.trim_end_matches('/'), cfg.bucket),
            (None, None) => format!("https://{}.s3.{}.amazonaws.com", cfg.bucket, cfg.region),
        };

        Ok(Self {
            client: Client::from_conf(conf.build()),
            bucket: cfg.bucket.clone(),
            public_base,
        })
    }
}

#[async_trait]
impl ImageStorage for S3Storage {
    async fn put_image(&self, body: Bytes, extension: &str, content_type: &str) -> anyhow::Result<String> {
        let body = tokio::task::spawn_blocking(move || shrink_or_original(body, REMOTE_MAX_EDGE))
            .await
            .context("resize task")?;

        let key = format!("products/{}", unique_file_name(extension));
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(ByteStream::from(body))
            .content_type(content_type)
            .send()
            .await
            .with_context(|| format!("s3 put_object {key}"))?;

        Ok(format!("{}/{}", self.public_base, key))
    }

    fn backend(&self) -> &'static str {
        "s3"
    }
}

/// [`limit_resize`], falling back to the uploaded bytes when they cannot be
/// decoded or re-encoded.
pub fn shrink_or_original(body: Bytes, max_edge: u32) -> Bytes {
    match limit_resize(&body, max_edge) {
        Ok(Some(resized)) => Bytes::from(resized),
        Ok(None) => body,
        Err(e) => {
            warn!(error = %e, bytes = body.len(), "image not resized, storing as uploaded");
            body
        }
    }
}

/// Shrinks the image to fit within `max_edge`×`max_edge`, keeping its aspect
/// ratio and its format, which is read from the bytes themselves. Returns
/// `None` when the image already fits or is a GIF (resizing would drop its
/// animation).
pub fn limit_resize(body: &[u8], max_edge: u32) -> anyhow::Result<Option<Vec<u8>>> {
    let reader = ImageReader::new(Cursor::new(body))
        .with_guessed_format()
        .context("read image header")?;
    let format = reader.format().context("unrecognised image format")?;
    if format == ImageFormat::Gif {
        return Ok(None);
    }

    let img = reader.decode().context("decode image")?;
    if img.width() <= max_edge && img.height() <= max_edge {
        return Ok(None);
    }

    let resized = img.resize(max_edge, max_edge, FilterType::Lanczos3);
    let mut out = Cursor::new(Vec::new());
    resized.write_to(&mut out, format).context("encode resized image")?;
    Ok(Some(out.into_inner()))
}
