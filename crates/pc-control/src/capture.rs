//! Screen capture pipeline
//!
//! `raw capture -> (passthrough | JPEG transcode) -> persist -> base64`.
//!
//! The raw capture always lands as a PNG at a random temporary path held as a
//! [`tempfile::TempPath`], which deletes it on drop. That covers the success path
//! and every early return. The rotating `screenshot_NN.<ext>` output is kept on disk.

use crate::drivers::ScreenCapturer;
use crate::errors::AutomationError;
use crate::types::{CaptureFormat, Region};
use base64::{engine::general_purpose, Engine as _};
use image::codecs::jpeg::JpegEncoder;
use image::{ExtendedColorType, ImageEncoder};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempPath;
use tracing::{debug, info, warn};

/// Number of rotating output slots
pub const DEFAULT_ROTATION_WINDOW: u32 = 20;

const TEMP_PREFIX: &str = "pc_control_capture_";

/// Hands out `screenshot_01`, `screenshot_02`, ... wrapping after `window` names.
///
/// The counter sits behind a mutex so concurrent captures never share a slot
/// within one lap of the window.
#[derive(Debug)]
pub struct ArtifactRotation {
    window: u32,
    next: Mutex<u32>,
}

impl ArtifactRotation {
    pub fn new(window: u32) -> Self {
        Self {
            window: window.max(1),
            next: Mutex::new(0),
        }
    }

    pub fn window(&self) -> u32 {
        self.window
    }

    pub fn next_name(&self, extension: &str) -> String {
        let mut next = self.next.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let slot = *next + 1;
        *next = (*next + 1) % self.window;
        format!("screenshot_{slot:02}.{extension}")
    }
}

impl Default for ArtifactRotation {
    fn default() -> Self {
        Self::new(DEFAULT_ROTATION_WINDOW)
    }
}

/// Final output of one capture.
#[derive(Debug, Clone)]
pub struct CaptureArtifact {
    pub file_name: String,
    pub path: PathBuf,
    pub format: CaptureFormat,
    pub data: Vec<u8>,
}

impl CaptureArtifact {
    /// Manifest line followed by the image as a data URL.
    pub fn payload(&self) -> String {
        let manifest = match self.format {
            CaptureFormat::Png => format!("File saved as {} (PNG).", self.file_name),
            CaptureFormat::Jpeg { quality } => format!(
                "File saved as {} (JPEG quality: {}).",
                self.file_name, quality
            ),
        };
        format!(
            "{manifest} Image data: data:{};base64,{}",
            self.format.mime_type(),
            general_purpose::STANDARD.encode(&self.data)
        )
    }
}

pub struct CapturePipeline {
    capturer: Arc<dyn ScreenCapturer>,
    output_dir: PathBuf,
    temp_dir: PathBuf,
    rotation: ArtifactRotation,
}

impl CapturePipeline {
    pub fn new(
        capturer: Arc<dyn ScreenCapturer>,
        output_dir: PathBuf,
        temp_dir: PathBuf,
        rotation: ArtifactRotation,
    ) -> Self {
        Self {
            capturer,
            output_dir,
            temp_dir,
            rotation,
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub async fn capture(
        &self,
        region: Option<Region>,
        format: CaptureFormat,
    ) -> Result<CaptureArtifact, AutomationError> {
        tokio::fs::create_dir_all(&self.temp_dir)
            .await
            .map_err(|e| AutomationError::io("creating temporary capture directory", e))?;

        let temp = temp_capture_path(&self.temp_dir)?;
        let raw_path = temp.to_path_buf();
        debug!("capturing to {}", raw_path.display());

        let capturer = Arc::clone(&self.capturer);
        let dest = raw_path.clone();
        tokio::task::spawn_blocking(move || capturer.capture_to_file(region, &dest))
            .await
            .map_err(|e| AutomationError::Pipeline(format!("capture task failed: {e}")))??;

        // The placeholder exists from the start, so an empty file means nothing was written.
        let produced = match tokio::fs::metadata(&raw_path).await {
            Ok(meta) => meta.len() > 0,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
            Err(e) => return Err(AutomationError::io("checking raw capture", e)),
        };
        if !produced {
            return Err(AutomationError::CaptureNoOutput(raw_path));
        }

        let raw = tokio::fs::read(&raw_path)
            .await
            .map_err(|e| AutomationError::io("reading raw capture", e))?;
        let data = match format {
            CaptureFormat::Png => raw,
            CaptureFormat::Jpeg { quality } => {
                tokio::task::spawn_blocking(move || transcode_to_jpeg(&raw, quality))
                    .await
                    .map_err(|e| AutomationError::Pipeline(format!("transcode task failed: {e}")))??
            }
        };

        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .map_err(|e| AutomationError::io("creating output directory", e))?;
        let file_name = self.rotation.next_name(format.extension());
        let path = self.output_dir.join(&file_name);
        tokio::fs::write(&path, &data)
            .await
            .map_err(|e| AutomationError::io(format!("writing {file_name}"), e))?;

        info!(
            "saved capture {} ({} bytes, {:?})",
            path.display(),
            data.len(),
            format
        );
        if let Err(e) = temp.close() {
            warn!("failed to remove temporary capture {}: {}", raw_path.display(), e);
        }

        Ok(CaptureArtifact {
            file_name,
            path,
            format,
            data,
        })
    }
}

/// Empty placeholder the capturer overwrites, removed when the returned path drops.
fn temp_capture_path(dir: &Path) -> Result<TempPath, AutomationError> {
    tempfile::Builder::new()
        .prefix(TEMP_PREFIX)
        .suffix(".png")
        .tempfile_in(dir)
        .map(|file| file.into_temp_path())
        .map_err(|e| AutomationError::io("creating temporary capture file", e))
}

fn transcode_to_jpeg(png: &[u8], quality: u8) -> Result<Vec<u8>, AutomationError> {
    let decoded = image::load_from_memory_with_format(png, image::ImageFormat::Png)
        .map_err(|e| AutomationError::image("decoding raw capture", e))?;
    // JPEG has no alpha channel.
    let rgb = decoded.to_rgb8();
    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, quality)
        .write_image(rgb.as_raw(), rgb.width(), rgb.height(), ExtendedColorType::Rgb8)
        .map_err(|e| AutomationError::image("encoding JPEG", e))?;
    Ok(out)
}
