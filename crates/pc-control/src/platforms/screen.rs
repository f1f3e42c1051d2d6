//! Primary-monitor capture through xcap

use crate::drivers::ScreenCapturer;
use crate::errors::AutomationError;
use crate::types::Region;
use image::RgbaImage;
use std::path::Path;
use tracing::debug;
use xcap::Monitor;

#[derive(Debug, Default, Clone, Copy)]
pub struct XcapCapturer;

impl XcapCapturer {
    pub fn new() -> Self {
        Self
    }

    fn primary_monitor(&self) -> Result<Monitor, AutomationError> {
        let monitors = Monitor::all()
            .map_err(|e| AutomationError::Pipeline(format!("failed to list monitors: {e}")))?;
        let mut fallback = None;
        for monitor in monitors {
            if monitor.is_primary().unwrap_or(false) {
                return Ok(monitor);
            }
            fallback.get_or_insert(monitor);
        }
        fallback.ok_or_else(|| AutomationError::Pipeline("no monitor found".to_string()))
    }
}

impl ScreenCapturer for XcapCapturer {
    fn capture_to_file(&self, region: Option<Region>, dest: &Path) -> Result<(), AutomationError> {
        let monitor = self.primary_monitor()?;
        let captured = monitor
            .capture_image()
            .map_err(|e| AutomationError::Pipeline(format!("failed to capture monitor: {e}")))?;

        // Rebuild through raw bytes so our `image` version need not match xcap's.
        let (width, height) = (captured.width(), captured.height());
        let full = RgbaImage::from_raw(width, height, captured.into_raw()).ok_or_else(|| {
            AutomationError::Pipeline(format!("capture buffer does not match {width}x{height}"))
        })?;

        let image = match region {
            None => full,
            Some(r) => {
                if r.left.saturating_add(r.width) > width || r.top.saturating_add(r.height) > height
                {
                    return Err(AutomationError::Pipeline(format!(
                        "region {}x{} at ({}, {}) exceeds screen {}x{}",
                        r.width, r.height, r.left, r.top, width, height
                    )));
                }
                image::imageops::crop_imm(&full, r.left, r.top, r.width, r.height).to_image()
            }
        };

        debug!(
            "captured {}x{} to {}",
            image.width(),
            image.height(),
            dest.display()
        );
        image
            .save_with_format(dest, image::ImageFormat::Png)
            .map_err(|e| AutomationError::image("writing raw capture", e))
    }
}
