//! Keyboard capabilities

use crate::drivers::InputDriver;
use crate::errors::AutomationError;
use crate::keys::{Key, KeyCombination};
use std::time::Duration;
use tracing::warn;

/// Pause between characters for `type_text_with_delay` when none is given.
pub const DEFAULT_TYPING_DELAY: Duration = Duration::from_millis(100);

pub async fn type_text(input: &dyn InputDriver, text: &str) -> Result<(), AutomationError> {
    input.type_text(text)
}

/// Types one character at a time, sleeping `delay` after each.
pub async fn type_text_with_delay(
    input: &dyn InputDriver,
    text: &str,
    delay: Duration,
) -> Result<(), AutomationError> {
    let mut buf = [0u8; 4];
    for c in text.chars() {
        input.type_text(c.encode_utf8(&mut buf))?;
        tokio::time::sleep(delay).await;
    }
    Ok(())
}

pub async fn press_key(input: &dyn InputDriver, key: Key) -> Result<(), AutomationError> {
    input.key_down(key)?;
    input.key_up(key)
}

/// Press every key in order, then release in reverse order.
///
/// If any step fails, all requested keys get a best-effort release before the
/// original error is returned.
pub async fn press_shortcut(
    input: &dyn InputDriver,
    combination: &KeyCombination,
) -> Result<(), AutomationError> {
    let outcome = press_then_release(input, combination);
    if outcome.is_err() {
        release_keys_best_effort(input, combination);
    }
    outcome
}

fn press_then_release(
    input: &dyn InputDriver,
    combination: &KeyCombination,
) -> Result<(), AutomationError> {
    for key in combination.press_order() {
        input.key_down(key)?;
    }
    for key in combination.release_order() {
        input.key_up(key)?;
    }
    Ok(())
}

/// Compensating step for a failed shortcut; failures are logged only.
pub fn release_keys_best_effort(input: &dyn InputDriver, combination: &KeyCombination) {
    for key in combination.release_order() {
        if let Err(e) = input.key_up(key) {
            warn!("best-effort release of key '{}' failed: {}", key, e);
        }
    }
}

/// Press without releasing. Pairing with [`release_key`] is up to the caller.
pub async fn hold_key(input: &dyn InputDriver, key: Key) -> Result<(), AutomationError> {
    input.key_down(key)
}

pub async fn release_key(input: &dyn InputDriver, key: Key) -> Result<(), AutomationError> {
    input.key_up(key)
}
