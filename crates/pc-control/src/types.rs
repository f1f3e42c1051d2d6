//! Common value types shared by the capability modules

use serde::{Deserialize, Serialize};
use std::fmt;

/// Default JPEG quality when the caller does not supply one
pub const DEFAULT_JPEG_QUALITY: u8 = 80;

/// Screen coordinate in physical pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Capture or window rectangle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub left: u32,
    pub top: u32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    pub fn new(left: u32, top: u32, width: u32, height: u32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }
}

/// Dimensions of the primary display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenSize {
    pub width: u32,
    pub height: u32,
}

impl ScreenSize {
    /// Inclusive bounds check: a point on the right or bottom edge is accepted.
    pub fn contains(&self, point: Point) -> bool {
        point.x >= 0
            && point.y >= 0
            && i64::from(point.x) <= i64::from(self.width)
            && i64::from(point.y) <= i64::from(self.height)
    }
}

impl fmt::Display for ScreenSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "schemars", derive(schemars::JsonSchema))]
#[serde(rename_all = "lowercase")]
pub enum MouseButton {
    #[default]
    Left,
    Middle,
    Right,
}

impl MouseButton {
    pub fn as_str(&self) -> &'static str {
        match self {
            MouseButton::Left => "left",
            MouseButton::Middle => "middle",
            MouseButton::Right => "right",
        }
    }
}

impl fmt::Display for MouseButton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "schemars", derive(schemars::JsonSchema))]
#[serde(rename_all = "lowercase")]
pub enum ScrollDirection {
    Up,
    Down,
}

impl fmt::Display for ScrollDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScrollDirection::Up => f.write_str("up"),
            ScrollDirection::Down => f.write_str("down"),
        }
    }
}

/// Wire-level image format selector (`png` / `jpeg`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "schemars", derive(schemars::JsonSchema))]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    #[default]
    Png,
    Jpeg,
}

/// Output encoding of a capture. JPEG carries its quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureFormat {
    Png,
    Jpeg { quality: u8 },
}

impl CaptureFormat {
    /// Resolve the wire format and optional quality. Quality is clamped into [1, 100]
    /// and ignored for PNG.
    pub fn from_request(format: Option<ImageFormat>, quality: Option<u32>) -> Self {
        match format.unwrap_or_default() {
            ImageFormat::Png => CaptureFormat::Png,
            ImageFormat::Jpeg => CaptureFormat::Jpeg {
                quality: clamp_quality(quality.unwrap_or(u32::from(DEFAULT_JPEG_QUALITY))),
            },
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            CaptureFormat::Png => "png",
            CaptureFormat::Jpeg { .. } => "jpeg",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            CaptureFormat::Png => "image/png",
            CaptureFormat::Jpeg { .. } => "image/jpeg",
        }
    }

    pub fn quality(&self) -> Option<u8> {
        match self {
            CaptureFormat::Png => None,
            CaptureFormat::Jpeg { quality } => Some(*quality),
        }
    }
}

pub fn clamp_quality(quality: u32) -> u8 {
    quality.clamp(1, 100) as u8
}

/// Platform family, used to pick the copy/paste modifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    MacOs,
    Other,
}

impl Platform {
    pub fn current() -> Self {
        if cfg!(target_os = "macos") {
            Platform::MacOs
        } else {
            Platform::Other
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Platform::MacOs => f.write_str("macos"),
            Platform::Other => f.write_str(std::env::consts::OS),
        }
    }
}

/// Image read from the clipboard, already encoded as PNG
#[derive(Debug, Clone)]
pub struct ClipboardImage {
    pub width: u32,
    pub height: u32,
    pub png_data: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_screen_bounds_are_inclusive() {
        let size = ScreenSize {
            width: 1920,
            height: 1080,
        };
        assert!(size.contains(Point::new(0, 0)));
        assert!(size.contains(Point::new(1920, 1080)));
        assert!(!size.contains(Point::new(1921, 0)));
        assert!(!size.contains(Point::new(0, 1081)));
        assert!(!size.contains(Point::new(-1, 5)));
        assert!(!size.contains(Point::new(5, -1)));
    }

    #[test]
    fn test_capture_format_defaults_and_clamping() {
        assert_eq!(CaptureFormat::from_request(None, None), CaptureFormat::Png);
        assert_eq!(CaptureFormat::from_request(None, Some(10)), CaptureFormat::Png);
        assert_eq!(
            CaptureFormat::from_request(Some(ImageFormat::Jpeg), None),
            CaptureFormat::Jpeg { quality: 80 }
        );
        assert_eq!(
            CaptureFormat::from_request(Some(ImageFormat::Jpeg), Some(0)),
            CaptureFormat::Jpeg { quality: 1 }
        );
        assert_eq!(
            CaptureFormat::from_request(Some(ImageFormat::Jpeg), Some(400)),
            CaptureFormat::Jpeg { quality: 100 }
        );
    }

    #[test]
    fn test_wire_names() {
        assert_eq!(
            serde_json::from_str::<MouseButton>("\"middle\"").unwrap(),
            MouseButton::Middle
        );
        assert_eq!(
            serde_json::from_str::<ScrollDirection>("\"down\"").unwrap(),
            ScrollDirection::Down
        );
        assert_eq!(
            serde_json::from_str::<ImageFormat>("\"jpeg\"").unwrap(),
            ImageFormat::Jpeg
        );
        assert!(serde_json::from_str::<ImageFormat>("\"gif\"").is_err());
    }
}
