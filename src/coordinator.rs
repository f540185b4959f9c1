//! Request coordination: from a request path to reply bytes.
//!
//! [`RequestCoordinator`] owns the long-lived pieces (configuration, path
//! resolver, derivative cache, resize engine) and exposes one method per
//! route. It is `Send + Sync` and shared behind an `Arc` by every worker;
//! it holds no lock across requests, so unrelated requests never wait on
//! each other. Same-key derivative requests are collapsed by the cache.
//!
//! Results are transport-neutral: handlers return typed values or a
//! [`ServeError`], and [`Reply`] turns either into status, headers and body
//! for whichever server loop is driving.

use crate::cache::{CacheError, DerivativeCache, Fetched};
use crate::config::ServerConfig;
use crate::imaging::{CropMode, DerivativeSpec, ResizeEngine, ResizeError, build_engine};
use crate::listing::{self, DirContents};
use crate::pages;
use crate::resolve::{PathResolver, ResolveError, SourceImage};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, error, info};

pub const CACHE_CONTROL: &str = "public, max-age=86400";
pub const HTML: &str = "text/html; charset=utf-8";
pub const TEXT: &str = "text/plain; charset=utf-8";
pub const JPEG: &str = "image/jpeg";

#[derive(Error, Debug)]
pub enum ServeError {
    #[error("Invalid path: {0}")]
    InvalidPath(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Failed to generate {spec}: {source}")]
    Resize {
        spec: DerivativeSpec,
        source: Arc<ResizeError>,
    },
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl ServeError {
    /// HTTP status for this error.
    pub fn status(&self) -> u16 {
        match self {
            ServeError::InvalidPath(_) => 400,
            ServeError::NotFound(_) => 404,
            ServeError::Resize { .. } | ServeError::Io(_) => 500,
        }
    }
}

impl From<ResolveError> for ServeError {
    fn from(e: ResolveError) -> Self {
        match e {
            ResolveError::InvalidPath(p) => ServeError::InvalidPath(p),
            ResolveError::NotFound(p) => ServeError::NotFound(p),
            ResolveError::Io(e) => ServeError::Io(e),
        }
    }
}

/// The two derivative routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Variant {
    Thumb,
    Small,
}

impl Variant {
    /// Maximum dimension and crop mode configured for this variant.
    pub fn params(self, config: &ServerConfig) -> (u32, CropMode) {
        match self {
            Variant::Thumb => (config.thumb_size, config.thumb_crop),
            Variant::Small => (config.view_size, config.view_crop),
        }
    }
}

/// Reply body.
#[derive(Debug, Clone)]
pub enum Body {
    Bytes(Arc<Vec<u8>>),
    /// Stream a file from disk (originals).
    File(PathBuf),
    Html(String),
    Text(String),
    Empty,
}

/// A transport-neutral HTTP reply.
#[derive(Debug, Clone)]
pub struct Reply {
    pub status: u16,
    pub content_type: Option<&'static str>,
    pub cache_control: Option<&'static str>,
    pub location: Option<String>,
    pub body: Body,
}

impl Reply {
    fn new(status: u16, content_type: Option<&'static str>, body: Body) -> Self {
        Self {
            status,
            content_type,
            cache_control: None,
            location: None,
            body,
        }
    }

    pub fn jpeg(bytes: Arc<Vec<u8>>) -> Self {
        Self {
            cache_control: Some(CACHE_CONTROL),
            ..Self::new(200, Some(JPEG), Body::Bytes(bytes))
        }
    }

    pub fn file(source: &SourceImage) -> Self {
        Self {
            cache_control: Some(CACHE_CONTROL),
            ..Self::new(
                200,
                Some(content_type_for(&source.path)),
                Body::File(source.path.clone()),
            )
        }
    }

    pub fn html(markup: String) -> Self {
        Self::new(200, Some(HTML), Body::Html(markup))
    }

    pub fn text(status: u16, message: impl Into<String>) -> Self {
        Self::new(status, Some(TEXT), Body::Text(message.into()))
    }

    pub fn redirect(location: impl Into<String>) -> Self {
        Self {
            location: Some(location.into()),
            ..Self::new(301, None, Body::Empty)
        }
    }

    /// Client-facing message: 4xx show the error, 5xx stay generic.
    pub fn error(err: &ServeError) -> Self {
        let status = err.status();
        let message = if status >= 500 {
            "Internal Server Error".to_string()
        } else {
            err.to_string()
        };
        Self::text(status, message)
    }

    pub fn from_result<T>(result: Result<T, ServeError>, ok: impl FnOnce(T) -> Reply) -> Self {
        match result {
            Ok(value) => ok(value),
            Err(e) => Self::error(&e),
        }
    }
}

/// Content type of an original, by extension.
pub fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("jpg" | "jpeg") => JPEG,
        Some("tif" | "tiff") => "image/tiff",
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}

/// Shared per-process request handler.
pub struct RequestCoordinator {
    config: Arc<ServerConfig>,
    resolver: PathResolver,
    cache: DerivativeCache,
    engine: Arc<dyn ResizeEngine>,
}

impl RequestCoordinator {
    /// Coordinator using the engine selected by configuration.
    pub fn new(config: Arc<ServerConfig>) -> Result<Self, ServeError> {
        let engine = build_engine(&config);
        Self::with_engine(config, engine)
    }

    pub fn with_engine(
        config: Arc<ServerConfig>,
        engine: Arc<dyn ResizeEngine>,
    ) -> Result<Self, ServeError> {
        let resolver = PathResolver::new(&config.base_dir)?;
        let cache = DerivativeCache::open(&config.cache_dir)?;
        Ok(Self {
            config,
            resolver,
            cache,
            engine,
        })
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    pub fn cache(&self) -> &DerivativeCache {
        &self.cache
    }

    pub fn engine_name(&self) -> &'static str {
        self.engine.name()
    }

    fn spec_for(&self, variant: Variant, source: &Path) -> DerivativeSpec {
        let (max_dim, crop) = variant.params(&self.config);
        DerivativeSpec {
            source: source.to_path_buf(),
            max_dim,
            crop,
        }
    }

    /// Derivative bytes for `request_path`, from cache or freshly generated.
    pub fn derivative(&self, variant: Variant, request_path: &str) -> Result<Fetched, ServeError> {
        let source = self.resolver.resolve_source(request_path)?;
        let spec = self.spec_for(variant, &source.path);
        let key = self.cache.key(&spec.source, spec.max_dim, spec.crop);

        let fetched = self.cache.fetch(&key, || {
            info!("Generating {} ({} bytes source)", spec, source.size);
            let start = Instant::now();
            let bytes = self.engine.generate(&spec)?;
            info!(
                "Generated {} -> {} bytes in {:.0?}",
                spec,
                bytes.len(),
                start.elapsed()
            );
            Ok(bytes)
        });

        fetched.map_err(|e| match e {
            CacheError::Generate(source) => {
                error!(
                    "Failed to generate {} with {} engine: {}",
                    spec,
                    self.engine.name(),
                    source
                );
                ServeError::Resize { spec, source }
            }
            CacheError::Read { path, source } => {
                error!("Failed to read cache entry {}: {}", path.display(), source);
                ServeError::Io(source)
            }
        })
    }

    /// Cache file a derivative request maps to. Does not generate.
    pub fn cache_entry(&self, variant: Variant, request_path: &str) -> Result<PathBuf, ServeError> {
        let source = self.resolver.resolve_source(request_path)?;
        let spec = self.spec_for(variant, &source.path);
        let key = self.cache.key(&spec.source, spec.max_dim, spec.crop);
        Ok(self.cache.entry_path(&key))
    }

    /// The untouched source file.
    pub fn original(&self, request_path: &str) -> Result<SourceImage, ServeError> {
        Ok(self.resolver.resolve_source(request_path)?)
    }

    /// Directory listing for `request_path`.
    pub fn listing(&self, request_path: &str) -> Result<DirContents, ServeError> {
        let cache_dir = self.cache.dir().canonicalize().ok();
        Ok(listing::scan_dir(
            &self.resolver,
            request_path,
            cache_dir.as_deref(),
        )?)
    }

    /// Rendered gallery page.
    pub fn gallery(&self, request_path: &str) -> Result<String, ServeError> {
        let contents = self.listing(request_path)?;
        Ok(pages::render_gallery(&contents).into_string())
    }

    /// Rendered single-image page.
    pub fn view(&self, request_path: &str) -> Result<String, ServeError> {
        let (parent, name) = listing::split_parent(request_path);
        let contents = self.listing(&parent)?;
        if !contents.images.iter().any(|i| i == name) {
            return Err(ServeError::NotFound(request_path.to_string()));
        }
        Ok(pages::render_view(&contents, name).into_string())
    }

    // Reply wrappers used by the server loop.

    pub fn reply_derivative(&self, variant: Variant, request_path: &str) -> Reply {
        let reply = Reply::from_result(self.derivative(variant, request_path), |f| {
            Reply::jpeg(f.bytes)
        });
        log_reply(request_path, &reply);
        reply
    }

    pub fn reply_original(&self, request_path: &str) -> Reply {
        let reply = Reply::from_result(self.original(request_path), |s| Reply::file(&s));
        log_reply(request_path, &reply);
        reply
    }

    pub fn reply_gallery(&self, request_path: &str) -> Reply {
        let reply = Reply::from_result(self.gallery(request_path), Reply::html);
        log_reply(request_path, &reply);
        reply
    }

    pub fn reply_view(&self, request_path: &str) -> Reply {
        let reply = Reply::from_result(self.view(request_path), Reply::html);
        log_reply(request_path, &reply);
        reply
    }
}

fn log_reply(request_path: &str, reply: &Reply) {
    if reply.status >= 400 {
        debug!("{} -> {}", request_path, reply.status);
    }
}
