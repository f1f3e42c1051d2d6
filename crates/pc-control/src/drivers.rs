//! Narrow interfaces over the OS collaborators
//!
//! Capability functions only ever see these traits. The native backends live in
//! [`crate::platforms`]; recording doubles live in `mock` behind the `test-util`
//! feature.

use crate::errors::AutomationError;
use crate::keys::Key;
use crate::types::{ClipboardImage, MouseButton, Point, Region, ScreenSize, ScrollDirection};
use crate::ui_automation::{ElementAction, ElementInfo, ElementQuery};
use async_trait::async_trait;
use std::path::Path;

/// Mouse and keyboard injection plus the screen geometry needed to bounds-check it.
pub trait InputDriver: Send + Sync {
    fn screen_size(&self) -> Result<ScreenSize, AutomationError>;
    fn mouse_position(&self) -> Result<Point, AutomationError>;
    fn move_mouse(&self, to: Point) -> Result<(), AutomationError>;
    fn button_down(&self, button: MouseButton) -> Result<(), AutomationError>;
    fn button_up(&self, button: MouseButton) -> Result<(), AutomationError>;
    fn click(&self, button: MouseButton) -> Result<(), AutomationError>;
    fn double_click(&self, button: MouseButton) -> Result<(), AutomationError>;
    /// Scroll by `amount` wheel clicks.
    fn scroll(&self, direction: ScrollDirection, amount: u32) -> Result<(), AutomationError>;
    fn key_down(&self, key: Key) -> Result<(), AutomationError>;
    fn key_up(&self, key: Key) -> Result<(), AutomationError>;
    fn type_text(&self, text: &str) -> Result<(), AutomationError>;
}

pub trait ClipboardDriver: Send + Sync {
    fn get_text(&self) -> Result<String, AutomationError>;
    fn set_text(&self, text: &str) -> Result<(), AutomationError>;
    /// `Ok(None)` when the clipboard holds no image.
    fn get_image(&self) -> Result<Option<ClipboardImage>, AutomationError>;
}

pub trait ScreenCapturer: Send + Sync {
    /// Capture the primary display, or a sub-rectangle of it, as a PNG at `dest`.
    ///
    /// Implementations are not trusted to actually write the file; the pipeline
    /// checks for it afterwards.
    fn capture_to_file(&self, region: Option<Region>, dest: &Path) -> Result<(), AutomationError>;
}

/// Inspects and drives UI elements of other applications.
#[async_trait]
pub trait UiAutomationProvider: Send + Sync {
    async fn query_element(&self, query: &ElementQuery) -> Result<ElementInfo, AutomationError>;
    /// Returns the provider's success message.
    async fn invoke_action(&self, action: &ElementAction) -> Result<String, AutomationError>;
}
