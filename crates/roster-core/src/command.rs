//! Descriptor extractor backed by an external recognition program.
//!
//! Protocol:
//! - `<program> --probe` loads the models and prints the descriptor
//!   dimension (e.g. `128`) on stdout.
//! - `<program>` with a PNG frame on stdin prints either a JSON array of
//!   numbers (the descriptor) or `null` when no face was found.

use crate::extractor::{DescriptorExtractor, ExtractorError};
use crate::types::Descriptor;
use async_trait::async_trait;
use image::{ImageFormat, RgbImage};
use std::ffi::OsString;
use std::io::Cursor;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

pub struct CommandExtractor {
    program: PathBuf,
    /// Leading arguments passed on every invocation, before `--probe`.
    args: Vec<OsString>,
    /// Descriptor dimension reported by the probe; `None` until loaded.
    dimension: Option<usize>,
}

impl CommandExtractor {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            dimension: None,
        }
    }

    /// Append a leading argument, e.g. the script path for an interpreter.
    pub fn with_arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    fn command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.args);
        command
    }

    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }
}

#[async_trait]
impl DescriptorExtractor for CommandExtractor {
    async fn load(&mut self) -> Result<(), ExtractorError> {
        let output = self
            .command()
            .arg("--probe")
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                ExtractorError::LoadFailed(format!("{}: {e}", self.program.display()))
            })?;

        if !output.status.success() {
            return Err(ExtractorError::LoadFailed(format!(
                "{} --probe exited with {}: {}",
                self.program.display(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let dimension = parse_dimension(&output.stdout)?;
        tracing::info!(program = %self.program.display(), dimension, "descriptor program ready");
        self.dimension = Some(dimension);
        Ok(())
    }

    async fn extract(
        &self,
        rgb: &[u8],
        width: u32,
        height: u32,
    ) -> Result<Option<Descriptor>, ExtractorError> {
        let png = encode_png(rgb, width, height)?;

        let mut child = self
            .command()
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ExtractorError::ExtractionFailed(format!("spawn: {e}")))?;

        // A program that exits early closes the pipe; its status and stderr
        // explain why better than the broken pipe does.
        let write_error = match child.stdin.take() {
            Some(mut stdin) => stdin.write_all(&png).await.err(),
            None => None,
        };

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| ExtractorError::ExtractionFailed(format!("wait: {e}")))?;

        if !output.status.success() {
            return Err(ExtractorError::ExtractionFailed(format!(
                "exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        if let Some(e) = write_error {
            return Err(ExtractorError::ExtractionFailed(format!("write frame: {e}")));
        }

        let descriptor = parse_descriptor(&output.stdout)?;
        if let (Some(expected), Some(d)) = (self.dimension, &descriptor) {
            if d.len() != expected {
                return Err(ExtractorError::UnexpectedDimension {
                    expected,
                    actual: d.len(),
                });
            }
        }
        Ok(descriptor)
    }
}

fn parse_dimension(stdout: &[u8]) -> Result<usize, ExtractorError> {
    let text = String::from_utf8_lossy(stdout);
    match text.trim().parse::<usize>() {
        Ok(0) | Err(_) => Err(ExtractorError::LoadFailed(format!(
            "probe printed {:?}, expected a descriptor dimension",
            text.trim()
        ))),
        Ok(n) => Ok(n),
    }
}

fn parse_descriptor(stdout: &[u8]) -> Result<Option<Descriptor>, ExtractorError> {
    serde_json::from_slice::<Option<Vec<f32>>>(stdout)
        .map(|values| values.map(Descriptor::new))
        .map_err(|e| ExtractorError::ExtractionFailed(format!("bad descriptor output: {e}")))
}

fn encode_png(rgb: &[u8], width: u32, height: u32) -> Result<Vec<u8>, ExtractorError> {
    let expected = (width as usize) * (height as usize) * 3;
    let image = RgbImage::from_raw(width, height, rgb.to_vec()).ok_or_else(|| {
        ExtractorError::ExtractionFailed(format!(
            "frame buffer too short: expected {expected}, got {}",
            rgb.len()
        ))
    })?;

    let mut png = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .map_err(|e| ExtractorError::ExtractionFailed(format!("png encode: {e}")))?;
    Ok(png)
}
