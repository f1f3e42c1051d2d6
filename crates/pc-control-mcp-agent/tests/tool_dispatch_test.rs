use base64::{engine::general_purpose, Engine as _};
use pc_control::mock::{
    InputEvent, MemoryClipboard, RecordingInput, ScriptedUiProvider, SyntheticCapturer,
};
use pc_control::{
    AutomationError, ClipboardDriver, ClipboardImage, Desktop, DesktopConfig, ElementInfo, Key, MouseButton,
    Platform, Point, UiAction,
};
use pc_control_mcp_agent::envelope::{first_text, is_error, with_failure_kind};
use pc_control_mcp_agent::DesktopWrapper;
use rmcp::model::CallToolResult;
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;

struct Harness {
    root: TempDir,
    input: Arc<RecordingInput>,
    clipboard: Arc<MemoryClipboard>,
    ui: Arc<ScriptedUiProvider>,
    server: DesktopWrapper,
}

impl Harness {
    fn new() -> Self {
        let root = TempDir::new().unwrap();
        let input = Arc::new(RecordingInput::new(800, 600).with_position(Point::new(10, 10)));
        let clipboard = Arc::new(MemoryClipboard::new());
        let ui = Arc::new(ScriptedUiProvider::new());
        let config = DesktopConfig {
            output_dir: root.path().join("out"),
            temp_dir: root.path().join("tmp"),
            ..DesktopConfig::default()
        };
        let desktop = Desktop::with_backends(
            config,
            input.clone(),
            clipboard.clone(),
            Arc::new(SyntheticCapturer::new(800, 600)),
            ui.clone(),
        )
        .with_platform(Platform::Other);
        Self {
            root,
            input,
            clipboard,
            ui,
            server: DesktopWrapper::with_desktop(desktop),
        }
    }

    async fn call(&self, tool: &str, arguments: Value) -> CallToolResult {
        self.server
            .dispatch_tool(tool, &arguments)
            .await
            .expect("known tools never fail at the protocol level")
    }
}

fn text(result: &CallToolResult) -> &str {
    first_text(result).unwrap()
}

#[tokio::test]
async fn test_out_of_bounds_move_sends_no_input() {
    let h = Harness::new();
    let result = h.call("move_mouse", json!({"x": 900, "y": 10})).await;
    assert!(is_error(&result));
    assert_eq!(
        text(&result),
        "Error moving mouse: Coordinates (900, 10) out of bounds. Screen size is 800x600"
    );

    let result = h.call("click_at", json!({"x": -1, "y": 5})).await;
    assert!(is_error(&result));
    assert!(h.input.events().is_empty());
}

#[tokio::test]
async fn test_click_at_reports_position_and_button() {
    let h = Harness::new();
    let result = h
        .call("click_at", json!({"x": 800, "y": 600, "button": "right"}))
        .await;
    assert!(!is_error(&result));
    assert_eq!(
        text(&result),
        "Mouse clicked at position (800, 600) with right button"
    );
    assert_eq!(
        h.input.events(),
        vec![
            InputEvent::Move(Point::new(800, 600)),
            InputEvent::Click(MouseButton::Right)
        ]
    );
}

#[tokio::test]
async fn test_shortcut_releases_in_reverse_order() {
    let h = Harness::new();
    let result = h
        .call("press_key_shortcut", json!({"keys": ["control", "c"]}))
        .await;
    assert_eq!(text(&result), "Pressed key shortcut: control + c");
    assert_eq!(
        h.input.events(),
        vec![
            InputEvent::KeyDown(Key::Control),
            InputEvent::KeyDown(Key::C),
            InputEvent::KeyUp(Key::C),
            InputEvent::KeyUp(Key::Control),
        ]
    );
}

#[tokio::test]
async fn test_failed_drag_still_releases_button() {
    let h = Harness::new();
    h.input
        .fail_when(|e| matches!(e, InputEvent::Move(p) if *p == Point::new(50, 60)));
    let result = h.call("drag_mouse", json!({"x": 50, "y": 60})).await;
    assert!(is_error(&result));
    assert!(text(&result).starts_with("Error dragging mouse: Input driver error: injected failure"));
    assert_eq!(
        h.input.events().last(),
        Some(&InputEvent::ButtonUp(MouseButton::Left))
    );
}

#[tokio::test]
async fn test_jpeg_region_capture() {
    let h = Harness::new();
    let result = h
        .call(
            "capture_region",
            json!({"left": 0, "top": 0, "width": 100, "height": 50, "format": "jpeg", "quality": 50}),
        )
        .await;
    assert!(!is_error(&result));
    let prefix =
        "File saved as screenshot_01.jpeg (JPEG quality: 50). Image data: data:image/jpeg;base64,";
    let payload = text(&result);
    assert!(payload.starts_with(prefix));
    let bytes = general_purpose::STANDARD
        .decode(&payload[prefix.len()..])
        .unwrap();
    let decoded = image::load_from_memory(&bytes).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (100, 50));
    assert!(h.root.path().join("out/screenshot_01.jpeg").exists());
}

#[tokio::test]
async fn test_capture_screen_without_arguments_is_png() {
    let h = Harness::new();
    let result = h.call("capture_screen", json!({})).await;
    assert!(text(&result).starts_with("File saved as screenshot_01.png (PNG). Image data: data:image/png;base64,"));
    let result = h.call("capture_screen", json!({"format": "png"})).await;
    assert!(text(&result).starts_with("File saved as screenshot_02.png (PNG)."));
}

#[tokio::test]
async fn test_validation_failures_never_reach_drivers() {
    let h = Harness::new();
    for (tool, arguments) in [
        ("scroll_mouse", json!({"direction": "down", "amount": 0})),
        ("scroll_mouse", json!({"direction": "sideways"})),
        ("move_mouse", json!({"x": 1})),
        ("type_text", json!({"text": ""})),
        ("type_text_with_delay", json!({"text": "abc", "delayMs": 5000})),
        ("press_key", json!({"key": "hyper"})),
        ("press_key_shortcut", json!({"keys": []})),
        (
            "press_key_shortcut",
            json!({"keys": ["control", "shift", "alt", "a", "b", "c"]}),
        ),
        ("capture_region", json!({"left": 0, "top": 0, "width": 10, "height": 0})),
        ("capture_screen", json!({"format": "gif"})),
    ] {
        let result = h.call(tool, arguments).await;
        assert!(is_error(&result), "{tool} should have been rejected");
        assert!(
            text(&result).starts_with(&format!("Invalid arguments for {tool}: ")),
            "{}",
            text(&result)
        );
    }
    assert!(h.input.events().is_empty());
    assert!(!h.root.path().join("out").exists());
}

#[tokio::test]
async fn test_scroll_defaults_to_one_click() {
    let h = Harness::new();
    let result = h.call("scroll_mouse", json!({"direction": "up"})).await;
    assert_eq!(text(&result), "Mouse scrolled up by 1 clicks");
}

#[tokio::test]
async fn test_clipboard_round_trip() {
    let h = Harness::new();
    let result = h.call("set_clipboard_text", json!({"text": "héllo"})).await;
    assert_eq!(text(&result), "Text set to clipboard successfully");
    let result = h.call("get_clipboard_text", json!({})).await;
    assert_eq!(text(&result), "Clipboard content: héllo");
}

#[tokio::test(start_paused = true)]
async fn test_paste_uses_control_v() {
    let h = Harness::new();
    let result = h.call("paste_text", json!({"text": "payload"})).await;
    assert_eq!(text(&result), "Text pasted successfully");
    assert_eq!(h.clipboard.get_text().unwrap(), "payload");
    assert_eq!(h.input.events()[1], InputEvent::KeyDown(Key::V));
}

#[tokio::test]
async fn test_clipboard_image() {
    let h = Harness::new();
    let result = h.call("get_clipboard_image", json!({})).await;
    assert!(!is_error(&result));
    assert_eq!(text(&result), "No image found on the clipboard.");

    h.clipboard.put_image(ClipboardImage {
        width: 1,
        height: 1,
        png_data: vec![1, 2, 3],
    });
    let result = h.call("get_clipboard_image", json!({})).await;
    assert_eq!(
        text(&result),
        "Clipboard image retrieved successfully. Image data: data:image/png;base64,AQID"
    );
}

#[tokio::test]
async fn test_element_info_failure_is_error_result() {
    let h = Harness::new();
    h.ui.answer_query(Err(AutomationError::ProcessExit(
        "Failed to get UI element info: Window not found".to_string(),
    )));
    let result = h
        .call(
            "get_ui_element_info",
            json!({"windowTitle": "Untitled - Notepad", "automationId": "15"}),
        )
        .await;
    assert!(is_error(&result));
    assert!(text(&result).contains("Window not found"));
    assert_eq!(h.ui.queries()[0].automation_id.as_deref(), Some("15"));
}

#[tokio::test]
async fn test_element_info_json_is_returned_verbatim() {
    let h = Harness::new();
    h.ui.answer_query(Ok(ElementInfo::Json("{\"Name\":\"OK\"}".to_string())));
    let result = h
        .call(
            "get_ui_element_info",
            json!({"windowTitle": "Dialog", "elementName": "OK"}),
        )
        .await;
    assert_eq!(text(&result), "{\"Name\":\"OK\"}");
}

#[tokio::test]
async fn test_invoke_action_forwards_value() {
    let h = Harness::new();
    let result = h
        .call(
            "invoke_ui_element_action",
            json!({
                "windowTitle": "Calculator",
                "automationId": "display",
                "action": "SetValue",
                "valueToSet": "42"
            }),
        )
        .await;
    assert!(!is_error(&result));
    assert_eq!(text(&result), "Action completed successfully.");
    let action = &h.ui.actions()[0];
    assert_eq!(action.action, UiAction::SetValue);
    assert_eq!(action.value_to_set.as_deref(), Some("42"));
}

#[tokio::test]
async fn test_hold_and_release_key() {
    let h = Harness::new();
    assert_eq!(
        text(&h.call("hold_key", json!({"key": "shift"})).await),
        "Holding key: shift"
    );
    assert_eq!(
        text(&h.call("release_key", json!({"key": "shift"})).await),
        "Released key: shift"
    );
    assert_eq!(
        h.input.events(),
        vec![InputEvent::KeyDown(Key::Shift), InputEvent::KeyUp(Key::Shift)]
    );
}

#[tokio::test]
async fn test_failed_calls_report_error_category() {
    let h = Harness::new();
    let (result, kind) = with_failure_kind(h.call("move_mouse", json!({"x": 900, "y": 10}))).await;
    assert!(is_error(&result));
    assert_eq!(kind, Some("bounds"));

    let (_, kind) = with_failure_kind(h.call("move_mouse", json!({"x": "far"}))).await;
    assert_eq!(kind, Some("validation"));

    let (result, kind) = with_failure_kind(h.call("get_screen_size", json!({}))).await;
    assert!(!is_error(&result));
    assert_eq!(kind, None);
}
