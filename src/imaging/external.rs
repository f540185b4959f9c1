//! Resize engine that delegates to ImageMagick.
//!
//! Useful where ImageMagick's JPEG shrink-on-load (`-define jpeg:size=`) makes
//! first-request latency on very large sources noticeably lower than a full
//! in-process decode. The two crop modes map onto geometry flags:
//!
//! | Mode | Geometry |
//! |---|---|
//! | Square | `-thumbnail MxM^ -gravity center -extent MxM` |
//! | Fit | `-thumbnail MxM>` (shrink only) |
//!
//! Output is written to stdout as `jpg:-` and captured, so the cache layer
//! handles persistence exactly as it does for the native engine.

use super::engine::{CropMode, DerivativeSpec, ResizeEngine, ResizeError};
use super::params::Quality;
use std::process::{Command, Stdio};
use tracing::debug;

/// Engine shelling out to an ImageMagick-compatible `convert` binary.
#[derive(Debug, Clone)]
pub struct ExternalEngine {
    command: String,
    quality: Quality,
}

impl ExternalEngine {
    pub fn new(command: impl Into<String>, quality: Quality) -> Self {
        Self {
            command: command.into(),
            quality,
        }
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    /// Build the argument list for a spec without running anything.
    pub fn plan_args(&self, spec: &DerivativeSpec) -> Vec<String> {
        let m = spec.max_dim;
        // Decode hint: libjpeg may shrink by powers of two down to at least this size.
        let hint = m.saturating_mul(2);

        let mut args = vec![
            "-define".to_string(),
            format!("jpeg:size={hint}x{hint}"),
            spec.source.to_string_lossy().into_owned(),
            "-auto-orient".to_string(),
        ];

        match spec.crop {
            CropMode::Square => args.extend([
                "-thumbnail".to_string(),
                format!("{m}x{m}^"),
                "-gravity".to_string(),
                "center".to_string(),
                "-extent".to_string(),
                format!("{m}x{m}"),
            ]),
            CropMode::Fit => args.extend(["-thumbnail".to_string(), format!("{m}x{m}>")]),
        }

        args.extend([
            "-quality".to_string(),
            self.quality.value().to_string(),
            "jpg:-".to_string(),
        ]);
        args
    }

    fn tool_error(&self, reason: impl Into<String>) -> ResizeError {
        ResizeError::ExternalTool {
            command: self.command.clone(),
            reason: reason.into(),
        }
    }
}

impl ResizeEngine for ExternalEngine {
    fn name(&self) -> &'static str {
        "external"
    }

    fn generate(&self, spec: &DerivativeSpec) -> Result<Vec<u8>, ResizeError> {
        let args = self.plan_args(spec);
        debug!("Running {} {:?}", self.command, args);

        let output = Command::new(&self.command)
            .args(&args)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => {
                    self.tool_error("binary not found on PATH".to_string())
                }
                _ => self.tool_error(e.to_string()),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(self.tool_error(format!("{}: {}", output.status, stderr.trim())));
        }
        if output.stdout.is_empty() {
            return Err(self.tool_error("produced no output"));
        }
        Ok(output.stdout)
    }
}
