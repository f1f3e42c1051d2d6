//! Mouse and keyboard injection through enigo
//!
//! One `Enigo` connection lives on a dedicated input thread for the whole process
//! and every call is sent there as a job. enigo tracks held modifiers per
//! connection (on macOS they become the flags of later key events), so a
//! shortcut or a `hold_key` followed by another call must reach the same
//! instance. Keys are not released when the connection drops.

use super::blocking;
use crate::drivers::InputDriver;
use crate::errors::AutomationError;
use crate::keys::Key;
use crate::types::{MouseButton, Platform, Point, ScreenSize, ScrollDirection};
use enigo::{Axis, Button, Coordinate, Direction, Enigo, Keyboard, Mouse, Settings};
use std::sync::mpsc;
use std::thread;
use tracing::{debug, warn};

type Job = SlotJob<Enigo>;

#[derive(Debug)]
pub struct EnigoInput {
    jobs: mpsc::Sender<Job>,
}

impl EnigoInput {
    pub fn new() -> Self {
        let (jobs, queue) = mpsc::channel::<Job>();
        let spawned = thread::Builder::new()
            .name("pc-control-input".to_string())
            .spawn(move || serve(queue));
        if let Err(e) = spawned {
            warn!("failed to start input thread: {}", e);
        }
        Self { jobs }
    }

    /// Runs `action` against the shared connection and waits for its result.
    fn with_enigo<T, F>(&self, action: F) -> Result<T, AutomationError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Enigo) -> Result<T, AutomationError> + Send + 'static,
    {
        let (reply, answer) = mpsc::sync_channel(1);
        let job: Job = Box::new(move |connection| {
            let _ = reply.send(connect(connection).and_then(action));
        });
        blocking(|| {
            self.jobs
                .send(job)
                .map_err(|_| AutomationError::Driver("input thread is not running".to_string()))?;
            answer
                .recv()
                .map_err(|_| AutomationError::Driver("input thread stopped".to_string()))?
        })
    }

    fn press(&self, key: Key, direction: Direction) -> Result<(), AutomationError> {
        // Resolve before dispatching so an unmapped key never touches the OS.
        let physical = to_enigo_key(key)?;
        self.with_enigo(move |enigo| {
            enigo
                .key(physical, direction)
                .map_err(|e| AutomationError::Driver(format!("key '{key}' {direction:?} failed: {e}")))
        })
    }
}

impl Default for EnigoInput {
    fn default() -> Self {
        Self::new()
    }
}

type SlotJob<C> = Box<dyn FnOnce(&mut Option<C>) + Send>;

/// Input thread body. The connection slot is filled lazily by the first job
/// and reused until the sender side goes away.
fn serve<C>(queue: mpsc::Receiver<SlotJob<C>>) {
    let mut connection = None;
    for job in queue {
        job(&mut connection);
    }
}

fn connect(slot: &mut Option<Enigo>) -> Result<&mut Enigo, AutomationError> {
    if slot.is_none() {
        let settings = Settings {
            release_keys_when_dropped: false,
            ..Default::default()
        };
        let enigo = Enigo::new(&settings)
            .map_err(|e| AutomationError::Driver(format!("failed to open input connection: {e}")))?;
        debug!("opened input connection");
        *slot = Some(enigo);
    }
    slot.as_mut()
        .ok_or_else(|| AutomationError::Driver("input connection unavailable".to_string()))
}

fn driver_err(action: &'static str) -> impl FnOnce(enigo::InputError) -> AutomationError {
    move |e| AutomationError::Driver(format!("{action} failed: {e}"))
}

fn to_enigo_button(button: MouseButton) -> Button {
    match button {
        MouseButton::Left => Button::Left,
        MouseButton::Middle => Button::Middle,
        MouseButton::Right => Button::Right,
    }
}

fn unsupported(key: Key) -> AutomationError {
    AutomationError::UnsupportedKey {
        key: key.as_str().to_string(),
        platform: Platform::current().to_string(),
    }
}

/// Exhaustive logical-to-physical key table.
pub fn to_enigo_key(key: Key) -> Result<enigo::Key, AutomationError> {
    use enigo::Key as E;

    if let Some(c) = key.character() {
        return Ok(E::Unicode(c));
    }

    let mapped = match key {
        Key::Backspace => E::Backspace,
        Key::Tab => E::Tab,
        Key::Enter => E::Return,
        Key::Shift => E::Shift,
        Key::Control => E::Control,
        Key::Alt => E::Alt,
        Key::CapsLock => E::CapsLock,
        Key::Escape => E::Escape,
        Key::Space => E::Space,
        Key::PageUp => E::PageUp,
        Key::PageDown => E::PageDown,
        Key::End => E::End,
        Key::Home => E::Home,
        Key::LeftArrow => E::LeftArrow,
        Key::UpArrow => E::UpArrow,
        Key::RightArrow => E::RightArrow,
        Key::DownArrow => E::DownArrow,
        Key::Delete => E::Delete,
        Key::F1 => E::F1,
        Key::F2 => E::F2,
        Key::F3 => E::F3,
        Key::F4 => E::F4,
        Key::F5 => E::F5,
        Key::F6 => E::F6,
        Key::F7 => E::F7,
        Key::F8 => E::F8,
        Key::F9 => E::F9,
        Key::F10 => E::F10,
        Key::F11 => E::F11,
        Key::F12 => E::F12,
        Key::Command | Key::Windows => E::Meta,
        Key::Pause
        | Key::Insert
        | Key::PrintScreen
        | Key::Numpad0
        | Key::Numpad1
        | Key::Numpad2
        | Key::Numpad3
        | Key::Numpad4
        | Key::Numpad5
        | Key::Numpad6
        | Key::Numpad7
        | Key::Numpad8
        | Key::Numpad9
        | Key::NumpadMultiply
        | Key::NumpadAdd
        | Key::NumpadSubtract
        | Key::NumpadDecimal
        | Key::NumpadDivide => return platform_key(key),
        Key::Num0
        | Key::Num1
        | Key::Num2
        | Key::Num3
        | Key::Num4
        | Key::Num5
        | Key::Num6
        | Key::Num7
        | Key::Num8
        | Key::Num9
        | Key::A
        | Key::B
        | Key::C
        | Key::D
        | Key::E
        | Key::F
        | Key::G
        | Key::H
        | Key::I
        | Key::J
        | Key::K
        | Key::L
        | Key::M
        | Key::N
        | Key::O
        | Key::P
        | Key::Q
        | Key::R
        | Key::S
        | Key::T
        | Key::U
        | Key::V
        | Key::W
        | Key::X
        | Key::Y
        | Key::Z => return Err(AutomationError::InvalidKey(key.as_str().to_string())),
    };
    Ok(mapped)
}

#[cfg(target_os = "windows")]
fn platform_key(key: Key) -> Result<enigo::Key, AutomationError> {
    use enigo::Key as E;
    Ok(match key {
        Key::Pause => E::Pause,
        Key::Insert => E::Insert,
        Key::PrintScreen => E::PrintScr,
        Key::Numpad0 => E::Numpad0,
        Key::Numpad1 => E::Numpad1,
        Key::Numpad2 => E::Numpad2,
        Key::Numpad3 => E::Numpad3,
        Key::Numpad4 => E::Numpad4,
        Key::Numpad5 => E::Numpad5,
        Key::Numpad6 => E::Numpad6,
        Key::Numpad7 => E::Numpad7,
        Key::Numpad8 => E::Numpad8,
        Key::Numpad9 => E::Numpad9,
        Key::NumpadMultiply => E::Multiply,
        Key::NumpadAdd => E::Add,
        Key::NumpadSubtract => E::Subtract,
        Key::NumpadDecimal => E::Decimal,
        Key::NumpadDivide => E::Divide,
        other => return Err(unsupported(other)),
    })
}

// enigo has no keypad variants here; X11 keysyms (XK_KP_*) go through `Other`.
#[cfg(all(unix, not(target_os = "macos")))]
fn platform_key(key: Key) -> Result<enigo::Key, AutomationError> {
    use enigo::Key as E;
    let keysym: u32 = match key {
        Key::Pause => return Ok(E::Pause),
        Key::Insert => return Ok(E::Insert),
        Key::PrintScreen => return Ok(E::PrintScr),
        Key::Numpad0 => 0xffb0,
        Key::Numpad1 => 0xffb1,
        Key::Numpad2 => 0xffb2,
        Key::Numpad3 => 0xffb3,
        Key::Numpad4 => 0xffb4,
        Key::Numpad5 => 0xffb5,
        Key::Numpad6 => 0xffb6,
        Key::Numpad7 => 0xffb7,
        Key::Numpad8 => 0xffb8,
        Key::Numpad9 => 0xffb9,
        Key::NumpadMultiply => 0xffaa,
        Key::NumpadAdd => 0xffab,
        Key::NumpadSubtract => 0xffad,
        Key::NumpadDecimal => 0xffae,
        Key::NumpadDivide => 0xffaf,
        other => return Err(unsupported(other)),
    };
    Ok(E::Other(keysym))
}

// macOS virtual key codes (Carbon kVK_*).
#[cfg(target_os = "macos")]
fn platform_key(key: Key) -> Result<enigo::Key, AutomationError> {
    let code: u32 = match key {
        Key::Insert => 0x72, // kVK_Help sits where Insert is on PC keyboards
        Key::Numpad0 => 0x52,
        Key::Numpad1 => 0x53,
        Key::Numpad2 => 0x54,
        Key::Numpad3 => 0x55,
        Key::Numpad4 => 0x56,
        Key::Numpad5 => 0x57,
        Key::Numpad6 => 0x58,
        Key::Numpad7 => 0x59,
        Key::Numpad8 => 0x5B,
        Key::Numpad9 => 0x5C,
        Key::NumpadMultiply => 0x43,
        Key::NumpadAdd => 0x45,
        Key::NumpadSubtract => 0x4E,
        Key::NumpadDecimal => 0x41,
        Key::NumpadDivide => 0x4B,
        other => return Err(unsupported(other)),
    };
    Ok(enigo::Key::Other(code))
}

impl InputDriver for EnigoInput {
    fn screen_size(&self) -> Result<ScreenSize, AutomationError> {
        let (w, h) = self.with_enigo(|enigo| {
            enigo.main_display().map_err(driver_err("reading screen size"))
        })?;
        Ok(ScreenSize {
            width: w.max(0) as u32,
            height: h.max(0) as u32,
        })
    }

    fn mouse_position(&self) -> Result<Point, AutomationError> {
        let (x, y) = self.with_enigo(|enigo| {
            enigo.location().map_err(driver_err("reading mouse position"))
        })?;
        Ok(Point::new(x, y))
    }

    fn move_mouse(&self, to: Point) -> Result<(), AutomationError> {
        debug!("moving mouse to {}", to);
        self.with_enigo(move |enigo| {
            enigo
                .move_mouse(to.x, to.y, Coordinate::Abs)
                .map_err(driver_err("mouse move"))
        })
    }

    fn button_down(&self, button: MouseButton) -> Result<(), AutomationError> {
        self.with_enigo(move |enigo| {
            enigo
                .button(to_enigo_button(button), Direction::Press)
                .map_err(driver_err("mouse button press"))
        })
    }

    fn button_up(&self, button: MouseButton) -> Result<(), AutomationError> {
        self.with_enigo(move |enigo| {
            enigo
                .button(to_enigo_button(button), Direction::Release)
                .map_err(driver_err("mouse button release"))
        })
    }

    fn click(&self, button: MouseButton) -> Result<(), AutomationError> {
        self.with_enigo(move |enigo| {
            enigo
                .button(to_enigo_button(button), Direction::Click)
                .map_err(driver_err("mouse click"))
        })
    }

    fn double_click(&self, button: MouseButton) -> Result<(), AutomationError> {
        let b = to_enigo_button(button);
        self.with_enigo(move |enigo| {
            enigo.button(b, Direction::Click).map_err(driver_err("mouse click"))?;
            enigo.button(b, Direction::Click).map_err(driver_err("mouse click"))
        })
    }

    fn scroll(&self, direction: ScrollDirection, amount: u32) -> Result<(), AutomationError> {
        let clicks = i32::try_from(amount)
            .map_err(|_| AutomationError::Driver(format!("scroll amount {amount} too large")))?;
        // enigo treats positive vertical lengths as scrolling down.
        let length = match direction {
            ScrollDirection::Down => clicks,
            ScrollDirection::Up => -clicks,
        };
        self.with_enigo(move |enigo| {
            enigo
                .scroll(length, Axis::Vertical)
                .map_err(driver_err("mouse scroll"))
        })
    }

    fn key_down(&self, key: Key) -> Result<(), AutomationError> {
        self.press(key, Direction::Press)
    }

    fn key_up(&self, key: Key) -> Result<(), AutomationError> {
        self.press(key, Direction::Release)
    }

    fn type_text(&self, text: &str) -> Result<(), AutomationError> {
        let text = text.to_string();
        self.with_enigo(move |enigo| enigo.text(&text).map_err(driver_err("typing text")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_key_resolves_or_is_reported_unsupported() {
        for key in Key::ALL {
            match to_enigo_key(*key) {
                Ok(_) => {}
                Err(AutomationError::UnsupportedKey { key: name, .. }) => {
                    assert_eq!(name, key.as_str());
                }
                Err(other) => panic!("unexpected error for {key}: {other}"),
            }
        }
    }

    #[test]
    fn test_character_keys_map_to_unicode() {
        assert_eq!(to_enigo_key(Key::Q).unwrap(), enigo::Key::Unicode('q'));
        assert_eq!(to_enigo_key(Key::Num3).unwrap(), enigo::Key::Unicode('3'));
        assert_eq!(to_enigo_key(Key::Enter).unwrap(), enigo::Key::Return);
        assert_eq!(to_enigo_key(Key::Windows).unwrap(), enigo::Key::Meta);
    }

    #[cfg(target_os = "macos")]
    #[test]
    fn test_print_screen_is_unsupported_on_macos() {
        assert!(matches!(
            to_enigo_key(Key::PrintScreen),
            Err(AutomationError::UnsupportedKey { .. })
        ));
    }

    #[cfg(all(unix, not(target_os = "macos")))]
    #[test]
    fn test_every_key_resolves_on_linux() {
        for key in Key::ALL {
            assert!(to_enigo_key(*key).is_ok(), "{key} has no mapping");
        }
        assert_eq!(to_enigo_key(Key::Numpad0).unwrap(), enigo::Key::Other(0xffb0));
        assert_eq!(to_enigo_key(Key::Numpad9).unwrap(), enigo::Key::Other(0xffb9));
        assert_eq!(to_enigo_key(Key::NumpadDivide).unwrap(), enigo::Key::Other(0xffaf));
        assert_eq!(to_enigo_key(Key::NumpadDecimal).unwrap(), enigo::Key::Other(0xffae));
        assert_eq!(to_enigo_key(Key::PrintScreen).unwrap(), enigo::Key::PrintScr);
    }

    #[test]
    fn test_jobs_share_one_connection_slot() {
        let (jobs, queue) = mpsc::channel::<SlotJob<u32>>();
        let worker = thread::spawn(move || serve(queue));
        let (reply, answers) = mpsc::channel();
        for _ in 0..3 {
            let reply = reply.clone();
            jobs.send(Box::new(move |slot: &mut Option<u32>| {
                let opened = *slot.get_or_insert(7);
                *slot = Some(opened + 1);
                let _ = reply.send(opened);
            }))
            .unwrap();
        }
        drop(jobs);
        worker.join().unwrap();
        drop(reply);
        assert_eq!(answers.iter().collect::<Vec<_>>(), vec![7, 8, 9]);
    }

    #[test]
    fn test_stopped_input_thread_is_a_driver_error() {
        let (jobs, queue) = mpsc::channel::<Job>();
        drop(queue);
        let input = EnigoInput { jobs };
        let err = input.key_down(Key::Shift).unwrap_err();
        assert!(matches!(err, AutomationError::Driver(_)));
        assert!(err.to_string().contains("input thread is not running"));
    }
}
