//! Document format conversion through pandoc.
//!
//! Converted output is written back into the file store next to the source
//! file, with the target format as its extension.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info};
use uuid::Uuid;

use folio_core::defaults::PANDOC_TIMEOUT_SECS;
use folio_core::{validate_storage_path, DocumentStore, Error, FileStore, Result};

/// Formats pandoc reports it can read and write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AvailableFormats {
    pub input_formats: Vec<String>,
    pub output_formats: Vec<String>,
}

pub struct PandocConverter {
    pandoc_path: String,
    timeout: Duration,
    documents: Arc<dyn DocumentStore>,
    files: Arc<dyn FileStore>,
}

impl PandocConverter {
    pub fn new(
        pandoc_path: impl Into<String>,
        documents: Arc<dyn DocumentStore>,
        files: Arc<dyn FileStore>,
    ) -> Self {
        let pandoc_path = pandoc_path.into();
        Self {
            pandoc_path: if pandoc_path.is_empty() {
                "pandoc".to_string()
            } else {
                pandoc_path
            },
            timeout: Duration::from_secs(PANDOC_TIMEOUT_SECS),
            documents,
            files,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn pandoc_path(&self) -> &str {
        &self.pandoc_path
    }

    /// True when the pandoc executable runs.
    pub async fn is_available(&self) -> bool {
        match Command::new(&self.pandoc_path).arg("--version").output().await {
            Ok(output) => output.status.success(),
            Err(_) => false,
        }
    }

    /// Convert a local file with pandoc.
    pub async fn convert_file(&self, input: &Path, output: &Path, from: &str, to: &str) -> Result<()> {
        check_format(from)?;
        check_format(to)?;

        let mut cmd = Command::new(&self.pandoc_path);
        cmd.arg(input)
            .args(["-f", from, "-t", to, "-o"])
            .arg(output);
        self.run(&mut cmd).await?;
        Ok(())
    }

    /// Convert the file attached to document `id`, returning the stored
    /// path of the converted copy.
    ///
    /// When `from` is absent the input format is inferred from the attached
    /// file's extension.
    pub async fn convert_document(&self, id: Uuid, from: Option<&str>, to: &str) -> Result<String> {
        let metadata = self.documents.read_metadata(id).await?;
        if metadata.path.is_empty() {
            return Err(Error::Validation(format!(
                "document {} has no attached file",
                id
            )));
        }
        self.convert_path(&metadata.path, from, to).await
    }

    /// Convert a stored file by its relative path.
    pub async fn convert_path(&self, path: &str, from: Option<&str>, to: &str) -> Result<String> {
        validate_storage_path(path)?;
        let from = match from {
            Some(f) if !f.is_empty() => f.to_string(),
            _ => input_format_for(path)
                .ok_or_else(|| {
                    Error::Validation(format!(
                        "cannot infer input format for {}, specify \"from\"",
                        path
                    ))
                })?
                .to_string(),
        };
        check_format(&from)?;
        check_format(to)?;

        let start = Instant::now();
        let output_path = converted_path(path, to);

        let scratch = tempfile::tempdir()?;
        let input = scratch.path().join(scratch_name("input", path));
        let output = scratch.path().join(format!("output.{}", to));

        let mut source = self.files.get_file(path).await?;
        let mut staged = tokio::fs::File::create(&input).await?;
        tokio::io::copy(&mut source, &mut staged).await?;
        staged.flush().await?;
        drop(staged);

        self.convert_file(&input, &output, &from, to).await?;

        let mut converted = tokio::fs::File::open(&output).await?;
        let bytes = self.files.save_file(&output_path, &mut converted).await?;

        info!(
            subsystem = "convert",
            op = "convert",
            path = %path,
            output_path = %output_path,
            from = %from,
            to = %to,
            bytes = bytes,
            duration_ms = start.elapsed().as_millis() as u64,
            "Conversion complete"
        );
        Ok(output_path)
    }

    /// Query pandoc for its supported input and output formats.
    pub async fn available_formats(&self) -> Result<AvailableFormats> {
        Ok(AvailableFormats {
            input_formats: self.list_formats("--list-input-formats").await?,
            output_formats: self.list_formats("--list-output-formats").await?,
        })
    }

    async fn list_formats(&self, flag: &str) -> Result<Vec<String>> {
        let mut cmd = Command::new(&self.pandoc_path);
        cmd.arg(flag);
        let stdout = self.run(&mut cmd).await?;
        Ok(parse_format_list(&stdout))
    }

    async fn run(&self, cmd: &mut Command) -> Result<String> {
        debug!(subsystem = "convert", pandoc = %self.pandoc_path, "Running pandoc");
        cmd.kill_on_drop(true);
        let output = tokio::time::timeout(self.timeout, cmd.output())
            .await
            .map_err(|_| {
                Error::Internal(format!(
                    "pandoc timed out after {}s",
                    self.timeout.as_secs()
                ))
            })?
            .map_err(|e| Error::Internal(format!("Failed to execute pandoc: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Internal(format!(
                "pandoc failed ({}): {}",
                output.status,
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Pandoc reader name for a file extension, if one is obvious.
pub fn input_format_for(path: &str) -> Option<&'static str> {
    let ext = Path::new(path).extension()?.to_str()?.to_ascii_lowercase();
    let format = match ext.as_str() {
        "md" | "markdown" | "txt" => "markdown",
        "html" | "htm" => "html",
        "docx" => "docx",
        "odt" => "odt",
        "rst" => "rst",
        "tex" | "latex" => "latex",
        "org" => "org",
        "epub" => "epub",
        "json" => "json",
        "csv" => "csv",
        _ => return None,
    };
    Some(format)
}

/// `dir/name.ext` becomes `dir/name.<to>`.
fn converted_path(path: &str, to: &str) -> String {
    let p = Path::new(path);
    match p.extension() {
        Some(ext) => {
            let base = &path[..path.len() - ext.len() - 1];
            format!("{}.{}", base, to)
        }
        None => format!("{}.{}", path, to),
    }
}

/// Scratch file name keeping the source extension, which some pandoc
/// readers sniff.
fn scratch_name(stem: &str, source: &str) -> String {
    match Path::new(source).extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{}.{}", stem, ext),
        None => stem.to_string(),
    }
}

fn check_format(format: &str) -> Result<()> {
    let valid = !format.is_empty()
        && !format.starts_with('-')
        && format
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '+'));
    if valid {
        Ok(())
    } else {
        Err(Error::Validation(format!("invalid format name: {:?}", format)))
    }
}

fn parse_format_list(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
