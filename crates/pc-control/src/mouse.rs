//! Mouse capabilities
//!
//! Every function is a strict sequence of driver calls. Coordinates are checked
//! against the screen size, queried fresh on each call, before anything moves.

use crate::drivers::InputDriver;
use crate::errors::AutomationError;
use crate::types::{MouseButton, Point, ScrollDirection};
use tracing::{debug, warn};

/// Button used for double-clicks and drags.
const PRIMARY: MouseButton = MouseButton::Left;

pub fn ensure_on_screen(input: &dyn InputDriver, point: Point) -> Result<(), AutomationError> {
    let size = input.screen_size()?;
    if size.contains(point) {
        Ok(())
    } else {
        Err(AutomationError::OutOfBounds {
            x: point.x,
            y: point.y,
            width: size.width,
            height: size.height,
        })
    }
}

pub async fn move_mouse(input: &dyn InputDriver, to: Point) -> Result<(), AutomationError> {
    ensure_on_screen(input, to)?;
    input.move_mouse(to)
}

pub async fn mouse_position(input: &dyn InputDriver) -> Result<Point, AutomationError> {
    input.mouse_position()
}

pub async fn click(input: &dyn InputDriver, button: MouseButton) -> Result<(), AutomationError> {
    input.click(button)
}

pub async fn click_at(
    input: &dyn InputDriver,
    at: Point,
    button: MouseButton,
) -> Result<(), AutomationError> {
    move_mouse(input, at).await?;
    input.click(button)
}

pub async fn double_click(input: &dyn InputDriver) -> Result<(), AutomationError> {
    input.double_click(PRIMARY)
}

pub async fn double_click_at(input: &dyn InputDriver, at: Point) -> Result<(), AutomationError> {
    move_mouse(input, at).await?;
    input.double_click(PRIMARY)
}

pub async fn scroll(
    input: &dyn InputDriver,
    direction: ScrollDirection,
    amount: u32,
) -> Result<(), AutomationError> {
    input.scroll(direction, amount)
}

/// Press at the current position, move to `target`, release.
pub async fn drag_to(input: &dyn InputDriver, target: Point) -> Result<(), AutomationError> {
    let from = input.mouse_position()?;
    debug!("dragging from {} to {}", from, target);
    let outcome = press_move_release(input, target).await;
    if outcome.is_err() {
        release_button_best_effort(input, PRIMARY);
    }
    outcome
}

/// Move to `start`, press, move to `end`, release.
pub async fn drag_from_to(
    input: &dyn InputDriver,
    start: Point,
    end: Point,
) -> Result<(), AutomationError> {
    let outcome = async {
        move_mouse(input, start).await?;
        press_move_release(input, end).await
    }
    .await;
    if outcome.is_err() {
        release_button_best_effort(input, PRIMARY);
    }
    outcome
}

async fn press_move_release(input: &dyn InputDriver, target: Point) -> Result<(), AutomationError> {
    input.button_down(PRIMARY)?;
    move_mouse(input, target).await?;
    input.button_up(PRIMARY)
}

/// Compensating step after a failed drag. Its own failure is logged, never returned,
/// so the caller still sees the error that caused the drag to fail.
pub fn release_button_best_effort(input: &dyn InputDriver, button: MouseButton) {
    if let Err(e) = input.button_up(button) {
        warn!("best-effort release of {} button failed: {}", button, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{InputEvent, RecordingInput};

    #[tokio::test]
    async fn test_out_of_bounds_issues_no_input() {
        let input = RecordingInput::new(1920, 1080);
        for p in [
            Point::new(-1, 0),
            Point::new(0, -1),
            Point::new(1921, 10),
            Point::new(10, 1081),
        ] {
            let err = move_mouse(&input, p).await.unwrap_err();
            assert!(matches!(err, AutomationError::OutOfBounds { .. }));
            let err = click_at(&input, p, MouseButton::Right).await.unwrap_err();
            assert!(matches!(err, AutomationError::OutOfBounds { .. }));
            assert!(double_click_at(&input, p).await.is_err());
        }
        assert!(input.events().is_empty());
    }

    #[tokio::test]
    async fn test_bounds_message() {
        let input = RecordingInput::new(800, 600);
        let err = move_mouse(&input, Point::new(900, 10)).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Coordinates (900, 10) out of bounds. Screen size is 800x600"
        );
    }

    #[tokio::test]
    async fn test_edge_coordinates_are_accepted() {
        let input = RecordingInput::new(800, 600);
        move_mouse(&input, Point::new(800, 600)).await.unwrap();
        assert_eq!(input.events(), vec![InputEvent::Move(Point::new(800, 600))]);
    }

    #[tokio::test]
    async fn test_click_at_is_move_then_click() {
        let input = RecordingInput::new(800, 600);
        click_at(&input, Point::new(5, 6), MouseButton::Middle)
            .await
            .unwrap();
        assert_eq!(
            input.events(),
            vec![
                InputEvent::Move(Point::new(5, 6)),
                InputEvent::Click(MouseButton::Middle)
            ]
        );
    }

    #[tokio::test]
    async fn test_click_failure_after_move_fails_whole_operation() {
        let input = RecordingInput::new(800, 600);
        input.fail_when(|e| matches!(e, InputEvent::DoubleClick(_)));
        assert!(double_click_at(&input, Point::new(1, 1)).await.is_err());
        assert_eq!(input.events().len(), 2);
    }

    #[tokio::test]
    async fn test_drag_sequence() {
        let input = RecordingInput::new(800, 600).with_position(Point::new(10, 10));
        drag_to(&input, Point::new(100, 200)).await.unwrap();
        assert_eq!(
            input.events(),
            vec![
                InputEvent::ButtonDown(MouseButton::Left),
                InputEvent::Move(Point::new(100, 200)),
                InputEvent::ButtonUp(MouseButton::Left),
            ]
        );
    }

    #[tokio::test]
    async fn test_failed_move_during_drag_releases_button() {
        let input = RecordingInput::new(800, 600);
        input.fail_when(|e| matches!(e, InputEvent::Move(_)));
        let err = drag_to(&input, Point::new(100, 200)).await.unwrap_err();
        assert!(err.to_string().contains("injected failure"));
        assert_eq!(
            input.events().last(),
            Some(&InputEvent::ButtonUp(MouseButton::Left))
        );
    }

    #[tokio::test]
    async fn test_out_of_bounds_drag_target_releases_button() {
        let input = RecordingInput::new(800, 600);
        let err = drag_from_to(&input, Point::new(1, 1), Point::new(5000, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, AutomationError::OutOfBounds { x: 5000, .. }));
        assert_eq!(
            input.events(),
            vec![
                InputEvent::Move(Point::new(1, 1)),
                InputEvent::ButtonDown(MouseButton::Left),
                InputEvent::ButtonUp(MouseButton::Left),
            ]
        );
    }

    #[tokio::test]
    async fn test_release_failure_does_not_mask_original_error() {
        let input = RecordingInput::new(800, 600);
        input.fail_when(|e| matches!(e, InputEvent::Move(_) | InputEvent::ButtonUp(_)));
        let err = drag_to(&input, Point::new(3, 3)).await.unwrap_err();
        assert!(err.to_string().contains("Move"));
    }
}
