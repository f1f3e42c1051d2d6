//! Clipboard capabilities
//!
//! Copy and paste go through the keyboard shortcut of the running platform. The
//! clipboard is populated asynchronously by the OS, so a fixed settle delay sits
//! between the shortcut and the clipboard access. Under load this can still race.

use crate::drivers::{ClipboardDriver, InputDriver};
use crate::errors::AutomationError;
use crate::keyboard::press_shortcut;
use crate::keys::{copy_shortcut, paste_shortcut};
use crate::types::{ClipboardImage, Platform};
use std::time::Duration;

pub const CLIPBOARD_SETTLE_DELAY: Duration = Duration::from_millis(100);

pub async fn get_text(clipboard: &dyn ClipboardDriver) -> Result<String, AutomationError> {
    clipboard.get_text()
}

pub async fn set_text(clipboard: &dyn ClipboardDriver, text: &str) -> Result<(), AutomationError> {
    clipboard.set_text(text)
}

/// Copy the current selection and return what landed on the clipboard.
pub async fn copy_selected_text(
    input: &dyn InputDriver,
    clipboard: &dyn ClipboardDriver,
    platform: Platform,
) -> Result<String, AutomationError> {
    press_shortcut(input, &copy_shortcut(platform)).await?;
    tokio::time::sleep(CLIPBOARD_SETTLE_DELAY).await;
    clipboard.get_text()
}

pub async fn paste_text(
    input: &dyn InputDriver,
    clipboard: &dyn ClipboardDriver,
    platform: Platform,
    text: &str,
) -> Result<(), AutomationError> {
    clipboard.set_text(text)?;
    tokio::time::sleep(CLIPBOARD_SETTLE_DELAY).await;
    press_shortcut(input, &paste_shortcut(platform)).await
}

/// `Ok(None)` when the clipboard holds no image.
pub async fn get_image(
    clipboard: &dyn ClipboardDriver,
) -> Result<Option<ClipboardImage>, AutomationError> {
    clipboard.get_image()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::Key;
    use crate::mock::{InputEvent, MemoryClipboard, RecordingInput};

    #[tokio::test]
    async fn test_text_round_trip() {
        let clipboard = MemoryClipboard::new();
        for s in ["", "hello", "日本語 🚀", "line1\nline2"] {
            set_text(&clipboard, s).await.unwrap();
            assert_eq!(get_text(&clipboard).await.unwrap(), s);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_copy_uses_command_on_macos_and_waits() {
        let input = RecordingInput::new(100, 100);
        let clipboard = MemoryClipboard::with_text("selected");
        let started = tokio::time::Instant::now();
        let copied = copy_selected_text(&input, &clipboard, Platform::MacOs)
            .await
            .unwrap();
        assert_eq!(copied, "selected");
        assert!(started.elapsed() >= CLIPBOARD_SETTLE_DELAY);
        assert_eq!(input.events()[0], InputEvent::KeyDown(Key::Command));
    }

    #[tokio::test(start_paused = true)]
    async fn test_paste_sets_clipboard_before_shortcut() {
        let input = RecordingInput::new(100, 100);
        let clipboard = MemoryClipboard::new();
        paste_text(&input, &clipboard, Platform::Other, "payload")
            .await
            .unwrap();
        assert_eq!(clipboard.get_text().unwrap(), "payload");
        assert_eq!(
            input.events(),
            vec![
                InputEvent::KeyDown(Key::Control),
                InputEvent::KeyDown(Key::V),
                InputEvent::KeyUp(Key::V),
                InputEvent::KeyUp(Key::Control),
            ]
        );
    }

    #[tokio::test]
    async fn test_empty_image_clipboard_is_not_an_error() {
        let clipboard = MemoryClipboard::new();
        assert!(get_image(&clipboard).await.unwrap().is_none());
    }
}
