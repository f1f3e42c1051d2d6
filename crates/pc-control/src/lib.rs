//! Desktop automation primitives: mouse, keyboard, clipboard, screen capture and
//! UI element inspection.
//!
//! [`Desktop`] is the entry point. It owns one backend per [`drivers`] trait and
//! exposes every capability as an async method. Failures are returned as
//! [`AutomationError`]; nothing here panics on a failed OS call.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

pub mod capture;
pub mod child_process;
pub mod clipboard;
pub mod drivers;
pub mod errors;
pub mod keyboard;
pub mod keys;
pub mod mouse;
pub mod platforms;
pub mod types;
pub mod ui_automation;

#[cfg(any(test, feature = "test-util"))]
pub mod mock;

pub use capture::{ArtifactRotation, CaptureArtifact, CapturePipeline, DEFAULT_ROTATION_WINDOW};
pub use drivers::{ClipboardDriver, InputDriver, ScreenCapturer, UiAutomationProvider};
pub use errors::AutomationError;
pub use keys::{Key, KeyCombination, MAX_COMBINATION_KEYS};
pub use types::{
    CaptureFormat, ClipboardImage, ImageFormat, MouseButton, Platform, Point, Region, ScreenSize,
    ScrollDirection, DEFAULT_JPEG_QUALITY,
};
pub use ui_automation::{ElementAction, ElementInfo, ElementQuery, ScriptBridge, ScriptHost, UiAction};

/// Where captures and scripts live.
#[derive(Debug, Clone)]
pub struct DesktopConfig {
    /// Directory receiving the rotating `screenshot_NN` files.
    pub output_dir: PathBuf,
    /// Directory for the intermediate raw capture.
    pub temp_dir: PathBuf,
    pub rotation_window: u32,
    /// Directory containing the two UI automation scripts.
    pub script_dir: PathBuf,
    pub script_host: ScriptHost,
}

impl Default for DesktopConfig {
    fn default() -> Self {
        Self {
            output_dir: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            temp_dir: std::env::temp_dir().join("pc-control"),
            rotation_window: DEFAULT_ROTATION_WINDOW,
            script_dir: PathBuf::from("scripts"),
            script_host: ScriptHost::default(),
        }
    }
}

pub struct Desktop {
    input: Arc<dyn InputDriver>,
    clipboard: Arc<dyn ClipboardDriver>,
    capture: CapturePipeline,
    ui: Arc<dyn UiAutomationProvider>,
    platform: Platform,
}

impl Desktop {
    /// Native backends: enigo, arboard, xcap and the PowerShell script bridge.
    pub fn new(config: DesktopConfig) -> Self {
        let ui = ScriptBridge::from_dir(config.script_host.clone(), &config.script_dir);
        info!(
            "Desktop created (output_dir: {}, scripts: {})",
            config.output_dir.display(),
            config.script_dir.display()
        );
        Self::with_backends(
            config,
            Arc::new(platforms::EnigoInput::new()),
            Arc::new(platforms::ArboardClipboard::new()),
            Arc::new(platforms::XcapCapturer::new()),
            Arc::new(ui),
        )
    }

    pub fn with_backends(
        config: DesktopConfig,
        input: Arc<dyn InputDriver>,
        clipboard: Arc<dyn ClipboardDriver>,
        capturer: Arc<dyn ScreenCapturer>,
        ui: Arc<dyn UiAutomationProvider>,
    ) -> Self {
        let capture = CapturePipeline::new(
            capturer,
            config.output_dir,
            config.temp_dir,
            ArtifactRotation::new(config.rotation_window),
        );
        Self {
            input,
            clipboard,
            capture,
            ui,
            platform: Platform::current(),
        }
    }

    /// Overrides the detected platform, which decides the copy/paste modifier.
    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn capture_pipeline(&self) -> &CapturePipeline {
        &self.capture
    }

    // Screen

    pub async fn screen_size(&self) -> Result<ScreenSize, AutomationError> {
        self.input.screen_size()
    }

    pub async fn capture_screen(
        &self,
        format: CaptureFormat,
    ) -> Result<CaptureArtifact, AutomationError> {
        self.capture.capture(None, format).await
    }

    pub async fn capture_region(
        &self,
        region: Region,
        format: CaptureFormat,
    ) -> Result<CaptureArtifact, AutomationError> {
        self.capture.capture(Some(region), format).await
    }

    // Mouse

    pub async fn move_mouse(&self, to: Point) -> Result<(), AutomationError> {
        mouse::move_mouse(self.input.as_ref(), to).await
    }

    pub async fn mouse_position(&self) -> Result<Point, AutomationError> {
        mouse::mouse_position(self.input.as_ref()).await
    }

    pub async fn click(&self, button: MouseButton) -> Result<(), AutomationError> {
        mouse::click(self.input.as_ref(), button).await
    }

    pub async fn click_at(&self, at: Point, button: MouseButton) -> Result<(), AutomationError> {
        mouse::click_at(self.input.as_ref(), at, button).await
    }

    pub async fn double_click(&self) -> Result<(), AutomationError> {
        mouse::double_click(self.input.as_ref()).await
    }

    pub async fn double_click_at(&self, at: Point) -> Result<(), AutomationError> {
        mouse::double_click_at(self.input.as_ref(), at).await
    }

    pub async fn scroll(
        &self,
        direction: ScrollDirection,
        amount: u32,
    ) -> Result<(), AutomationError> {
        mouse::scroll(self.input.as_ref(), direction, amount).await
    }

    pub async fn drag_to(&self, target: Point) -> Result<(), AutomationError> {
        mouse::drag_to(self.input.as_ref(), target).await
    }

    pub async fn drag_from_to(&self, start: Point, end: Point) -> Result<(), AutomationError> {
        mouse::drag_from_to(self.input.as_ref(), start, end).await
    }

    // Keyboard

    pub async fn type_text(&self, text: &str) -> Result<(), AutomationError> {
        keyboard::type_text(self.input.as_ref(), text).await
    }

    pub async fn type_text_with_delay(
        &self,
        text: &str,
        delay: Duration,
    ) -> Result<(), AutomationError> {
        keyboard::type_text_with_delay(self.input.as_ref(), text, delay).await
    }

    pub async fn press_key(&self, key: Key) -> Result<(), AutomationError> {
        keyboard::press_key(self.input.as_ref(), key).await
    }

    pub async fn press_shortcut(&self, combination: &KeyCombination) -> Result<(), AutomationError> {
        keyboard::press_shortcut(self.input.as_ref(), combination).await
    }

    pub async fn hold_key(&self, key: Key) -> Result<(), AutomationError> {
        keyboard::hold_key(self.input.as_ref(), key).await
    }

    pub async fn release_key(&self, key: Key) -> Result<(), AutomationError> {
        keyboard::release_key(self.input.as_ref(), key).await
    }

    // Clipboard

    pub async fn clipboard_text(&self) -> Result<String, AutomationError> {
        clipboard::get_text(self.clipboard.as_ref()).await
    }

    pub async fn set_clipboard_text(&self, text: &str) -> Result<(), AutomationError> {
        clipboard::set_text(self.clipboard.as_ref(), text).await
    }

    pub async fn copy_selected_text(&self) -> Result<String, AutomationError> {
        clipboard::copy_selected_text(self.input.as_ref(), self.clipboard.as_ref(), self.platform)
            .await
    }

    pub async fn paste_text(&self, text: &str) -> Result<(), AutomationError> {
        clipboard::paste_text(
            self.input.as_ref(),
            self.clipboard.as_ref(),
            self.platform,
            text,
        )
        .await
    }

    pub async fn clipboard_image(&self) -> Result<Option<ClipboardImage>, AutomationError> {
        clipboard::get_image(self.clipboard.as_ref()).await
    }

    // UI elements

    pub async fn element_info(&self, query: &ElementQuery) -> Result<ElementInfo, AutomationError> {
        self.ui.query_element(query).await
    }

    pub async fn invoke_element_action(
        &self,
        action: &ElementAction,
    ) -> Result<String, AutomationError> {
        self.ui.invoke_action(action).await
    }
}
