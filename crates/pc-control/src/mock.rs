//! In-memory doubles for the driver traits
//!
//! Available to this crate's tests and, through the `test-util` feature, to
//! dependent crates.

use crate::drivers::{ClipboardDriver, InputDriver, ScreenCapturer, UiAutomationProvider};
use crate::errors::AutomationError;
use crate::keys::Key;
use crate::types::{ClipboardImage, MouseButton, Point, Region, ScreenSize, ScrollDirection};
use crate::ui_automation::{ElementAction, ElementInfo, ElementQuery};
use async_trait::async_trait;
use image::{Rgba, RgbaImage};
use std::path::Path;
use std::sync::Mutex;

/// One injected input action, in the order it was issued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    Move(Point),
    ButtonDown(MouseButton),
    ButtonUp(MouseButton),
    Click(MouseButton),
    DoubleClick(MouseButton),
    Scroll(ScrollDirection, u32),
    KeyDown(Key),
    KeyUp(Key),
    Type(String),
}

type FailurePredicate = Box<dyn Fn(&InputEvent) -> bool + Send + Sync>;

/// Input driver that records every action and can be told to fail on some of them.
///
/// A failing action is still recorded, since it was attempted.
pub struct RecordingInput {
    screen: ScreenSize,
    position: Mutex<Point>,
    events: Mutex<Vec<InputEvent>>,
    fail_when: Mutex<Option<FailurePredicate>>,
}

impl RecordingInput {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            screen: ScreenSize { width, height },
            position: Mutex::new(Point::new(0, 0)),
            events: Mutex::new(Vec::new()),
            fail_when: Mutex::new(None),
        }
    }

    pub fn with_position(self, position: Point) -> Self {
        *self.position.lock().unwrap() = position;
        self
    }

    pub fn fail_when(&self, predicate: impl Fn(&InputEvent) -> bool + Send + Sync + 'static) {
        *self.fail_when.lock().unwrap() = Some(Box::new(predicate));
    }

    pub fn events(&self) -> Vec<InputEvent> {
        self.events.lock().unwrap().clone()
    }

    fn record(&self, event: InputEvent) -> Result<(), AutomationError> {
        let fails = self
            .fail_when
            .lock()
            .unwrap()
            .as_ref()
            .is_some_and(|p| p(&event));
        let description = format!("{event:?}");
        if let InputEvent::Move(p) = &event {
            if !fails {
                *self.position.lock().unwrap() = *p;
            }
        }
        self.events.lock().unwrap().push(event);
        if fails {
            Err(AutomationError::Driver(format!("injected failure on {description}")))
        } else {
            Ok(())
        }
    }
}

impl InputDriver for RecordingInput {
    fn screen_size(&self) -> Result<ScreenSize, AutomationError> {
        Ok(self.screen)
    }

    fn mouse_position(&self) -> Result<Point, AutomationError> {
        Ok(*self.position.lock().unwrap())
    }

    fn move_mouse(&self, to: Point) -> Result<(), AutomationError> {
        self.record(InputEvent::Move(to))
    }

    fn button_down(&self, button: MouseButton) -> Result<(), AutomationError> {
        self.record(InputEvent::ButtonDown(button))
    }

    fn button_up(&self, button: MouseButton) -> Result<(), AutomationError> {
        self.record(InputEvent::ButtonUp(button))
    }

    fn click(&self, button: MouseButton) -> Result<(), AutomationError> {
        self.record(InputEvent::Click(button))
    }

    fn double_click(&self, button: MouseButton) -> Result<(), AutomationError> {
        self.record(InputEvent::DoubleClick(button))
    }

    fn scroll(&self, direction: ScrollDirection, amount: u32) -> Result<(), AutomationError> {
        self.record(InputEvent::Scroll(direction, amount))
    }

    fn key_down(&self, key: Key) -> Result<(), AutomationError> {
        self.record(InputEvent::KeyDown(key))
    }

    fn key_up(&self, key: Key) -> Result<(), AutomationError> {
        self.record(InputEvent::KeyUp(key))
    }

    fn type_text(&self, text: &str) -> Result<(), AutomationError> {
        self.record(InputEvent::Type(text.to_string()))
    }
}

#[derive(Default)]
pub struct MemoryClipboard {
    text: Mutex<String>,
    image: Mutex<Option<ClipboardImage>>,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(text: &str) -> Self {
        let clipboard = Self::new();
        *clipboard.text.lock().unwrap() = text.to_string();
        clipboard
    }

    pub fn put_image(&self, image: ClipboardImage) {
        *self.image.lock().unwrap() = Some(image);
    }
}

impl ClipboardDriver for MemoryClipboard {
    fn get_text(&self) -> Result<String, AutomationError> {
        Ok(self.text.lock().unwrap().clone())
    }

    fn set_text(&self, text: &str) -> Result<(), AutomationError> {
        *self.text.lock().unwrap() = text.to_string();
        Ok(())
    }

    fn get_image(&self) -> Result<Option<ClipboardImage>, AutomationError> {
        Ok(self.image.lock().unwrap().clone())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CaptureBehavior {
    Write,
    Silent,
    Fail,
}

/// Writes a gradient PNG of the requested size instead of grabbing the screen.
pub struct SyntheticCapturer {
    screen: ScreenSize,
    behavior: CaptureBehavior,
}

impl SyntheticCapturer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            screen: ScreenSize { width, height },
            behavior: CaptureBehavior::Write,
        }
    }

    /// Reports success without writing anything.
    pub fn silent(width: u32, height: u32) -> Self {
        Self {
            behavior: CaptureBehavior::Silent,
            ..Self::new(width, height)
        }
    }

    /// Writes the file and then reports failure.
    pub fn failing_after_write(width: u32, height: u32) -> Self {
        Self {
            behavior: CaptureBehavior::Fail,
            ..Self::new(width, height)
        }
    }
}

impl ScreenCapturer for SyntheticCapturer {
    fn capture_to_file(&self, region: Option<Region>, dest: &Path) -> Result<(), AutomationError> {
        if self.behavior == CaptureBehavior::Silent {
            return Ok(());
        }
        let (width, height) = match region {
            Some(r) => (r.width, r.height),
            None => (self.screen.width, self.screen.height),
        };
        let image = RgbaImage::from_fn(width, height, |x, y| {
            Rgba([(x % 256) as u8, (y % 256) as u8, 128, 255])
        });
        image
            .save_with_format(dest, image::ImageFormat::Png)
            .map_err(|e| AutomationError::image("writing synthetic capture", e))?;
        match self.behavior {
            CaptureBehavior::Fail => Err(AutomationError::Pipeline(
                "synthetic capture failure".to_string(),
            )),
            _ => Ok(()),
        }
    }
}

/// UI provider returning canned outcomes and remembering what it was asked.
pub struct ScriptedUiProvider {
    query_outcome: Mutex<Option<Result<ElementInfo, AutomationError>>>,
    action_outcome: Mutex<Option<Result<String, AutomationError>>>,
    queries: Mutex<Vec<ElementQuery>>,
    actions: Mutex<Vec<ElementAction>>,
}

impl Default for ScriptedUiProvider {
    fn default() -> Self {
        Self {
            query_outcome: Mutex::new(None),
            action_outcome: Mutex::new(None),
            queries: Mutex::new(Vec::new()),
            actions: Mutex::new(Vec::new()),
        }
    }
}

impl ScriptedUiProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn answer_query(&self, outcome: Result<ElementInfo, AutomationError>) {
        *self.query_outcome.lock().unwrap() = Some(outcome);
    }

    pub fn answer_action(&self, outcome: Result<String, AutomationError>) {
        *self.action_outcome.lock().unwrap() = Some(outcome);
    }

    pub fn queries(&self) -> Vec<ElementQuery> {
        self.queries.lock().unwrap().clone()
    }

    pub fn actions(&self) -> Vec<ElementAction> {
        self.actions.lock().unwrap().clone()
    }
}

#[async_trait]
impl UiAutomationProvider for ScriptedUiProvider {
    async fn query_element(&self, query: &ElementQuery) -> Result<ElementInfo, AutomationError> {
        self.queries.lock().unwrap().push(query.clone());
        self.query_outcome
            .lock()
            .unwrap()
            .take()
            .unwrap_or(Ok(ElementInfo::Empty))
    }

    async fn invoke_action(&self, action: &ElementAction) -> Result<String, AutomationError> {
        self.actions.lock().unwrap().push(action.clone());
        self.action_outcome
            .lock()
            .unwrap()
            .take()
            .unwrap_or_else(|| Ok("Action completed successfully.".to_string()))
    }
}
