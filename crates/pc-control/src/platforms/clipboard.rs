use super::blocking;
use crate::drivers::ClipboardDriver;
use crate::errors::AutomationError;
use crate::types::ClipboardImage;
use arboard::Clipboard;
use image::{ImageEncoder, RgbaImage};

/// OS clipboard through arboard. A new handle is opened per call.
#[derive(Debug, Default, Clone, Copy)]
pub struct ArboardClipboard;

impl ArboardClipboard {
    pub fn new() -> Self {
        Self
    }

    fn open(&self) -> Result<Clipboard, AutomationError> {
        Clipboard::new()
            .map_err(|e| AutomationError::Clipboard(format!("failed to open clipboard: {e}")))
    }

    fn read_image(&self) -> Result<Option<ClipboardImage>, AutomationError> {
        let data = match self.open()?.get_image() {
            Ok(data) => data,
            Err(arboard::Error::ContentNotAvailable) => return Ok(None),
            Err(e) => return Err(AutomationError::Clipboard(e.to_string())),
        };

        let width = data.width as u32;
        let height = data.height as u32;
        let rgba = RgbaImage::from_raw(width, height, data.bytes.into_owned()).ok_or_else(|| {
            AutomationError::Clipboard(format!(
                "clipboard image buffer does not match {width}x{height}"
            ))
        })?;

        let mut png_data = Vec::new();
        image::codecs::png::PngEncoder::new(&mut png_data)
            .write_image(rgba.as_raw(), width, height, image::ExtendedColorType::Rgba8)
            .map_err(|e| AutomationError::image("encoding clipboard image", e))?;

        Ok(Some(ClipboardImage {
            width,
            height,
            png_data,
        }))
    }
}

impl ClipboardDriver for ArboardClipboard {
    fn get_text(&self) -> Result<String, AutomationError> {
        blocking(|| match self.open()?.get_text() {
            Ok(text) => Ok(text),
            // An empty clipboard reads back as the empty string.
            Err(arboard::Error::ContentNotAvailable) => Ok(String::new()),
            Err(e) => Err(AutomationError::Clipboard(e.to_string())),
        })
    }

    fn set_text(&self, text: &str) -> Result<(), AutomationError> {
        blocking(|| {
            self.open()?
                .set_text(text)
                .map_err(|e| AutomationError::Clipboard(e.to_string()))
        })
    }

    fn get_image(&self) -> Result<Option<ClipboardImage>, AutomationError> {
        blocking(|| self.read_image())
    }
}
