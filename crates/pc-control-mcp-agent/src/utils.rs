use anyhow::Result;
use pc_control::{
    CaptureFormat, Desktop, ElementAction, ElementQuery, ImageFormat, Key, KeyCombination,
    MouseButton, Point, Region, ScrollDirection, UiAction,
};
use rmcp::{schemars, schemars::JsonSchema};
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

pub const DEFAULT_SCROLL_AMOUNT: u32 = 1;
pub const DEFAULT_TYPING_DELAY_MS: u64 = 100;

/// MCP handler state. Cheap to clone: the HTTP transport hands a clone to every session.
#[derive(Clone)]
pub struct DesktopWrapper {
    pub desktop: Arc<Desktop>,
    pub tool_router: rmcp::handler::server::router::tool::ToolRouter<Self>,
}

/// Argument value rejected before the tool runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub expected: String,
    pub actual: String,
}

impl ValidationError {
    pub fn new(field: &str, expected: &str, actual: &str) -> Self {
        Self {
            field: field.to_string(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Invalid value for '{}': expected {}, got {}",
            self.field, self.expected, self.actual
        )
    }
}

impl std::error::Error for ValidationError {}

/// Range and presence checks that the JSON schema alone does not enforce.
/// Types and enum membership are already settled by deserialization.
pub trait ToolArgs {
    fn validate(&self) -> Result<(), ValidationError> {
        Ok(())
    }
}

fn check_range<T>(field: &str, value: T, min: T, max: T) -> Result<(), ValidationError>
where
    T: PartialOrd + fmt::Display + Copy,
{
    if value < min || value > max {
        return Err(ValidationError::new(
            field,
            &format!("a value between {min} and {max}"),
            &value.to_string(),
        ));
    }
    Ok(())
}

fn check_optional_range<T>(
    field: &str,
    value: Option<T>,
    min: T,
    max: T,
) -> Result<(), ValidationError>
where
    T: PartialOrd + fmt::Display + Copy,
{
    match value {
        Some(v) => check_range(field, v, min, max),
        None => Ok(()),
    }
}

fn check_positive(field: &str, value: u32) -> Result<(), ValidationError> {
    if value == 0 {
        return Err(ValidationError::new(field, "a positive integer", "0"));
    }
    Ok(())
}

fn check_non_empty(field: &str, value: &str) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Err(ValidationError::new(field, "a non-empty string", "\"\""));
    }
    Ok(())
}

// ===== Screen =====

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct EmptyArgs {}

impl ToolArgs for EmptyArgs {}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CaptureScreenArgs {
    #[schemars(description = "Image format (png or jpeg)")]
    pub format: Option<ImageFormat>,
    #[schemars(description = "JPEG quality (1-100, default: 80)")]
    #[schemars(range(min = 1, max = 100))]
    pub quality: Option<u32>,
}

impl CaptureScreenArgs {
    pub fn capture_format(&self) -> CaptureFormat {
        CaptureFormat::from_request(self.format, self.quality)
    }
}

impl ToolArgs for CaptureScreenArgs {
    fn validate(&self) -> Result<(), ValidationError> {
        check_optional_range("quality", self.quality, 1, 100)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CaptureRegionArgs {
    #[schemars(description = "Left position of the region in pixels")]
    pub left: u32,
    #[schemars(description = "Top position of the region in pixels")]
    pub top: u32,
    #[schemars(description = "Width of the region in pixels", range(min = 1))]
    pub width: u32,
    #[schemars(description = "Height of the region in pixels", range(min = 1))]
    pub height: u32,
    #[schemars(description = "Image format (png or jpeg)")]
    pub format: Option<ImageFormat>,
    #[schemars(description = "JPEG quality (1-100, default: 80)")]
    #[schemars(range(min = 1, max = 100))]
    pub quality: Option<u32>,
}

impl CaptureRegionArgs {
    pub fn region(&self) -> Region {
        Region::new(self.left, self.top, self.width, self.height)
    }

    pub fn capture_format(&self) -> CaptureFormat {
        CaptureFormat::from_request(self.format, self.quality)
    }
}

impl ToolArgs for CaptureRegionArgs {
    fn validate(&self) -> Result<(), ValidationError> {
        check_positive("width", self.width)?;
        check_positive("height", self.height)?;
        check_optional_range("quality", self.quality, 1, 100)
    }
}

// ===== Mouse =====

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct MoveMouseArgs {
    #[schemars(description = "X coordinate in pixels")]
    pub x: i32,
    #[schemars(description = "Y coordinate in pixels")]
    pub y: i32,
}

impl MoveMouseArgs {
    pub fn point(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

impl ToolArgs for MoveMouseArgs {}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ClickMouseArgs {
    #[schemars(description = "Mouse button to click")]
    pub button: Option<MouseButton>,
}

impl ToolArgs for ClickMouseArgs {}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ClickAtArgs {
    #[schemars(description = "X coordinate in pixels")]
    pub x: i32,
    #[schemars(description = "Y coordinate in pixels")]
    pub y: i32,
    #[schemars(description = "Mouse button to click")]
    pub button: Option<MouseButton>,
}

impl ClickAtArgs {
    pub fn point(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

impl ToolArgs for ClickAtArgs {}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DoubleClickAtArgs {
    #[schemars(description = "X coordinate in pixels")]
    pub x: i32,
    #[schemars(description = "Y coordinate in pixels")]
    pub y: i32,
}

impl DoubleClickAtArgs {
    pub fn point(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

impl ToolArgs for DoubleClickAtArgs {}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ScrollMouseArgs {
    #[schemars(description = "Direction to scroll")]
    pub direction: ScrollDirection,
    #[schemars(description = "Amount to scroll (number of clicks)", range(min = 1, max = 10))]
    pub amount: Option<u32>,
}

impl ScrollMouseArgs {
    pub fn amount(&self) -> u32 {
        self.amount.unwrap_or(DEFAULT_SCROLL_AMOUNT)
    }
}

impl ToolArgs for ScrollMouseArgs {
    fn validate(&self) -> Result<(), ValidationError> {
        check_optional_range("amount", self.amount, 1, 10)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DragMouseArgs {
    #[schemars(description = "Target X coordinate in pixels")]
    pub x: i32,
    #[schemars(description = "Target Y coordinate in pixels")]
    pub y: i32,
}

impl DragMouseArgs {
    pub fn target(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

impl ToolArgs for DragMouseArgs {}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DragMouseFromToArgs {
    #[schemars(description = "Start X coordinate in pixels")]
    pub start_x: i32,
    #[schemars(description = "Start Y coordinate in pixels")]
    pub start_y: i32,
    #[schemars(description = "End X coordinate in pixels")]
    pub end_x: i32,
    #[schemars(description = "End Y coordinate in pixels")]
    pub end_y: i32,
}

impl DragMouseFromToArgs {
    pub fn start(&self) -> Point {
        Point::new(self.start_x, self.start_y)
    }

    pub fn end(&self) -> Point {
        Point::new(self.end_x, self.end_y)
    }
}

impl ToolArgs for DragMouseFromToArgs {}

// ===== Keyboard =====

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TypeTextArgs {
    #[schemars(description = "The text to type", length(min = 1))]
    pub text: String,
}

impl ToolArgs for TypeTextArgs {
    fn validate(&self) -> Result<(), ValidationError> {
        check_non_empty("text", &self.text)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TypeTextWithDelayArgs {
    #[schemars(description = "The text to type", length(min = 1))]
    pub text: String,
    #[schemars(description = "Delay between keystrokes in milliseconds", range(min = 10, max = 1000))]
    pub delay_ms: Option<u64>,
}

impl TypeTextWithDelayArgs {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms.unwrap_or(DEFAULT_TYPING_DELAY_MS))
    }
}

impl ToolArgs for TypeTextWithDelayArgs {
    fn validate(&self) -> Result<(), ValidationError> {
        check_non_empty("text", &self.text)?;
        check_optional_range("delayMs", self.delay_ms, 10, 1000)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PressKeyArgs {
    #[schemars(description = "The key to press")]
    pub key: Key,
}

impl ToolArgs for PressKeyArgs {}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct HoldKeyArgs {
    #[schemars(description = "The key to hold down")]
    pub key: Key,
}

impl ToolArgs for HoldKeyArgs {}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ReleaseKeyArgs {
    #[schemars(description = "The key to release")]
    pub key: Key,
}

impl ToolArgs for ReleaseKeyArgs {}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PressKeyShortcutArgs {
    #[schemars(
        description = "Array of keys to press simultaneously",
        length(min = 1, max = pc_control::MAX_COMBINATION_KEYS)
    )]
    pub keys: Vec<Key>,
}

impl PressKeyShortcutArgs {
    pub fn combination(&self) -> Result<KeyCombination, pc_control::AutomationError> {
        KeyCombination::new(self.keys.clone())
    }
}

impl ToolArgs for PressKeyShortcutArgs {
    fn validate(&self) -> Result<(), ValidationError> {
        let count = self.keys.len();
        if count == 0 || count > pc_control::MAX_COMBINATION_KEYS {
            return Err(ValidationError::new(
                "keys",
                &format!("between 1 and {} keys", pc_control::MAX_COMBINATION_KEYS),
                &format!("{count} keys"),
            ));
        }
        Ok(())
    }
}

// ===== Clipboard =====

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SetClipboardTextArgs {
    #[schemars(description = "The text to set to the clipboard")]
    pub text: String,
}

impl ToolArgs for SetClipboardTextArgs {}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PasteTextArgs {
    #[schemars(description = "The text to paste")]
    pub text: String,
}

impl ToolArgs for PasteTextArgs {}

// ===== UI elements =====

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GetUiElementInfoArgs {
    #[schemars(description = "Title of the window containing the element", length(min = 1))]
    pub window_title: String,
    #[schemars(description = "Name property of the element")]
    pub element_name: Option<String>,
    #[schemars(description = "AutomationId property of the element")]
    pub automation_id: Option<String>,
    #[schemars(description = "ClassName property of the element")]
    pub class_name: Option<String>,
}

impl GetUiElementInfoArgs {
    pub fn query(&self) -> ElementQuery {
        ElementQuery {
            window_title: self.window_title.clone(),
            element_name: self.element_name.clone(),
            automation_id: self.automation_id.clone(),
            class_name: self.class_name.clone(),
        }
    }
}

impl ToolArgs for GetUiElementInfoArgs {
    fn validate(&self) -> Result<(), ValidationError> {
        check_non_empty("windowTitle", &self.window_title)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct InvokeUiElementActionArgs {
    #[schemars(description = "Title of the window containing the element", length(min = 1))]
    pub window_title: String,
    #[schemars(description = "Name property of the element")]
    pub element_name: Option<String>,
    #[schemars(description = "AutomationId property of the element")]
    pub automation_id: Option<String>,
    #[schemars(description = "ClassName property of the element")]
    pub class_name: Option<String>,
    #[schemars(description = "Action to perform (Click, SetValue, Focus)")]
    pub action: UiAction,
    #[schemars(description = "Value to set (required for the SetValue action)")]
    pub value_to_set: Option<String>,
}

impl InvokeUiElementActionArgs {
    pub fn element_action(&self) -> ElementAction {
        ElementAction {
            query: ElementQuery {
                window_title: self.window_title.clone(),
                element_name: self.element_name.clone(),
                automation_id: self.automation_id.clone(),
                class_name: self.class_name.clone(),
            },
            action: self.action,
            value_to_set: self.value_to_set.clone(),
        }
    }
}

impl ToolArgs for InvokeUiElementActionArgs {
    fn validate(&self) -> Result<(), ValidationError> {
        check_non_empty("windowTitle", &self.window_title)
    }
}

// ===== Logging =====

fn log_level_from_env() -> Level {
    match env::var("LOG_LEVEL")
        .unwrap_or_default()
        .to_lowercase()
        .as_str()
    {
        "error" => Level::ERROR,
        "warn" => Level::WARN,
        "debug" => Level::DEBUG,
        "trace" => Level::TRACE,
        _ => Level::INFO,
    }
}

/// `PC_CONTROL_LOG_DIR`, else `<data_local_dir>/pc-control/logs`.
pub fn log_directory() -> PathBuf {
    if let Ok(dir) = env::var("PC_CONTROL_LOG_DIR") {
        return PathBuf::from(dir);
    }
    dirs::data_local_dir()
        .unwrap_or_else(env::temp_dir)
        .join("pc-control")
        .join("logs")
}

// Transport internals log every request at info level.
const QUIET_DIRECTIVES: &[&str] = &[
    "axum::serve=error",
    "h2::proto=error",
    "h2::codec=error",
    "h2::server=error",
    "h2::frame=error",
    "rmcp::transport=warn",
    "rmcp::transport::streamable_http_server=error",
    "rmcp::service=error",
    "hyper::proto=error",
];

fn env_filter(level: Level) -> EnvFilter {
    QUIET_DIRECTIVES
        .iter()
        .filter_map(|d| d.parse().ok())
        .fold(
            EnvFilter::from_default_env().add_directive(level.into()),
            |filter, directive| filter.add_directive(directive),
        )
}

/// Installs the global subscriber: stderr, a daily log file and, with the
/// `telemetry` feature, the OTLP bridge. Stdout is reserved for stdio JSON-RPC.
pub fn init_logging() -> Result<()> {
    let level = log_level_from_env();
    let log_dir = log_directory();
    std::fs::create_dir_all(&log_dir)?;
    let file_appender = tracing_appender::rolling::daily(&log_dir, "pc-control-mcp-agent.log");

    let registry = tracing_subscriber::registry();

    #[cfg(feature = "telemetry")]
    let registry = registry.with(crate::telemetry::create_otel_logs_layer());

    registry
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(false)
                .with_filter(env_filter(level)),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(file_appender)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true)
                .with_filter(env_filter(level)),
        )
        .try_init()?;

    tracing::info!("Logging to {}", log_dir.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_camel_case_wire_names() {
        let args: DragMouseFromToArgs =
            serde_json::from_value(json!({"startX": 1, "startY": 2, "endX": 3, "endY": 4}))
                .unwrap();
        assert_eq!(args.start(), Point::new(1, 2));
        assert_eq!(args.end(), Point::new(3, 4));

        let args: InvokeUiElementActionArgs = serde_json::from_value(json!({
            "windowTitle": "Calculator",
            "automationId": "num7Button",
            "action": "SetValue",
            "valueToSet": "7"
        }))
        .unwrap();
        let action = args.element_action();
        assert_eq!(action.query.automation_id.as_deref(), Some("num7Button"));
        assert_eq!(action.value_to_set.as_deref(), Some("7"));
    }

    #[test]
    fn test_quality_range() {
        let ok = CaptureScreenArgs {
            format: Some(ImageFormat::Jpeg),
            quality: Some(100),
        };
        assert!(ok.validate().is_ok());
        let err = CaptureScreenArgs {
            format: Some(ImageFormat::Jpeg),
            quality: Some(101),
        }
        .validate()
        .unwrap_err();
        assert_eq!(err.field, "quality");
        assert_eq!(
            err.to_string(),
            "Invalid value for 'quality': expected a value between 1 and 100, got 101"
        );
    }

    #[test]
    fn test_region_requires_positive_size() {
        let args: CaptureRegionArgs =
            serde_json::from_value(json!({"left": 0, "top": 0, "width": 0, "height": 5})).unwrap();
        assert_eq!(args.validate().unwrap_err().field, "width");
    }

    #[test]
    fn test_scroll_amount_bounds_and_default() {
        let args: ScrollMouseArgs = serde_json::from_value(json!({"direction": "up"})).unwrap();
        assert!(args.validate().is_ok());
        assert_eq!(args.amount(), 1);
        let args: ScrollMouseArgs =
            serde_json::from_value(json!({"direction": "down", "amount": 11})).unwrap();
        assert_eq!(args.validate().unwrap_err().field, "amount");
        assert!(serde_json::from_value::<ScrollMouseArgs>(json!({"direction": "left"})).is_err());
    }

    #[test]
    fn test_typing_delay_bounds() {
        let args: TypeTextWithDelayArgs =
            serde_json::from_value(json!({"text": "hi", "delayMs": 5})).unwrap();
        assert_eq!(args.validate().unwrap_err().field, "delayMs");
        let args: TypeTextWithDelayArgs = serde_json::from_value(json!({"text": "hi"})).unwrap();
        assert!(args.validate().is_ok());
        assert_eq!(args.delay(), Duration::from_millis(100));
    }

    #[test]
    fn test_shortcut_length_limits() {
        let empty = PressKeyShortcutArgs { keys: vec![] };
        assert_eq!(empty.validate().unwrap_err().actual, "0 keys");
        let six = PressKeyShortcutArgs {
            keys: vec![Key::Shift; 6],
        };
        assert!(six.validate().is_err());
        let args: PressKeyShortcutArgs =
            serde_json::from_value(json!({"keys": ["control", "shift", "escape"]})).unwrap();
        assert!(args.validate().is_ok());
        assert_eq!(args.combination().unwrap().to_string(), "control + shift + escape");
    }

    #[test]
    fn test_unknown_key_rejected_by_deserialization() {
        assert!(serde_json::from_value::<PressKeyArgs>(json!({"key": "hyper"})).is_err());
    }

    #[test]
    fn test_schema_advertises_validated_limits() {
        let quality = schemars::schema_for!(CaptureScreenArgs);
        let quality = &quality.as_value()["properties"]["quality"];
        assert_eq!(quality["minimum"], 1);
        assert_eq!(quality["maximum"], 100);

        let region = schemars::schema_for!(CaptureRegionArgs);
        assert_eq!(region.as_value()["properties"]["width"]["minimum"], 1);
        assert_eq!(region.as_value()["properties"]["height"]["minimum"], 1);

        let scroll = schemars::schema_for!(ScrollMouseArgs);
        assert_eq!(scroll.as_value()["properties"]["amount"]["maximum"], 10);

        let delay = schemars::schema_for!(TypeTextWithDelayArgs);
        let props = &delay.as_value()["properties"];
        assert_eq!(props["delayMs"]["minimum"], 10);
        assert_eq!(props["delayMs"]["maximum"], 1000);
        assert_eq!(props["text"]["minLength"], 1);

        let shortcut = schemars::schema_for!(PressKeyShortcutArgs);
        let keys = &shortcut.as_value()["properties"]["keys"];
        assert_eq!(keys["minItems"], 1);
        assert_eq!(keys["maxItems"], 5);

        let info = schemars::schema_for!(GetUiElementInfoArgs);
        assert_eq!(info.as_value()["properties"]["windowTitle"]["minLength"], 1);
    }

    #[test]
    fn test_blank_window_title_rejected() {
        let args: GetUiElementInfoArgs =
            serde_json::from_value(json!({"windowTitle": "", "elementName": "OK"})).unwrap();
        assert_eq!(args.validate().unwrap_err().field, "windowTitle");
    }
}
