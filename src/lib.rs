//! # Proofsheet
//!
//! An on-demand thumbnail server for a directory of photos. Point it at a
//! tree of JPEGs (or PNG/TIFF/WebP) and browse it: every thumbnail and
//! preview is generated the first time it is asked for and served from a
//! disk cache afterwards.
//!
//! # Request Pipeline
//!
//! ```text
//! /thumb/2024/a.jpg
//!   → resolve     request path → canonical source under base_dir (or 400/404)
//!   → key         SHA-256(cache_dir, source, max_dim, crop) → {hex}.jpg
//!   → cache       file exists? serve it
//!   → coordinate  first miss generates, concurrent misses wait for it
//!   → engine      decode, resize (fit or square), encode JPEG
//!   → persist     temp file + rename into cache_dir
//! ```
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`config`] | `proofsheet.json` loading, defaults, validation, persist-back |
//! | [`resolve`] | Maps request paths into the base directory; rejects traversal |
//! | [`cache`] | Cache keys, on-disk derivative store, per-key generation coordination |
//! | [`imaging`] | Resize engines: native (`image` crate) and external (ImageMagick) |
//! | [`coordinator`] | One handler per route; errors mapped to HTTP status |
//! | [`listing`] | Directory listing for the gallery pages |
//! | [`pages`] | Gallery and single-image HTML rendered with Maud |
//! | [`http`] | Route parsing and the `tiny_http` server loop |
//! | [`warm`] | Pre-generates derivatives for a whole tree in parallel |
//!
//! # Design Decisions
//!
//! ## Existence Is Authoritative
//!
//! A cache file is trusted as long as it exists. There is no freshness check
//! against the source and no eviction; the cache directory is the operator's
//! to prune. Keys depend only on configuration and the source path, so a
//! restart finds every earlier derivative.
//!
//! ## One Generation Per Key
//!
//! Decoding a camera JPEG dominates request cost. When a page of thumbnails
//! loads, the browser fires dozens of requests at once, and reloads repeat
//! them before the first round finishes. The cache keeps an in-flight entry
//! per key so duplicates wait for the running generation instead of starting
//! their own. Distinct keys never wait on each other.
//!
//! ## Pluggable Engines
//!
//! [`imaging::ResizeEngine`] has two implementations. The native engine needs
//! nothing installed. The external engine shells out to ImageMagick, whose
//! JPEG shrink-on-load is faster for very large sources.

pub mod cache;
pub mod config;
pub mod coordinator;
pub mod http;
pub mod imaging;
pub mod listing;
pub mod pages;
pub mod resolve;
pub mod warm;

#[cfg(test)]
pub(crate) mod test_helpers;
