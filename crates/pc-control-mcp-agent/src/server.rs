use crate::envelope::{first_text, is_error, parse_args, run_tool, with_failure_kind};
use crate::telemetry::StepSpan;
use crate::utils::{
    CaptureRegionArgs, CaptureScreenArgs, ClickAtArgs, ClickMouseArgs, DesktopWrapper,
    DoubleClickAtArgs, DragMouseArgs, DragMouseFromToArgs, EmptyArgs, GetUiElementInfoArgs,
    HoldKeyArgs, InvokeUiElementActionArgs, MoveMouseArgs, PasteTextArgs, PressKeyArgs,
    PressKeyShortcutArgs, ReleaseKeyArgs, ScrollMouseArgs, SetClipboardTextArgs, TypeTextArgs,
    TypeTextWithDelayArgs,
};
use base64::{engine::general_purpose, Engine as _};
use pc_control::{Desktop, DesktopConfig};
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{
    CallToolResult, Implementation, ProtocolVersion, ServerCapabilities, ServerInfo,
};
use rmcp::tool_router;
use rmcp::{tool, ErrorData as McpError, ServerHandler};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[tool_router]
impl DesktopWrapper {
    /// Native backends configured from `config`.
    pub fn new(config: DesktopConfig) -> Self {
        Self::with_desktop(Desktop::new(config))
    }

    pub fn with_desktop(desktop: Desktop) -> Self {
        Self {
            desktop: Arc::new(desktop),
            tool_router: Self::tool_router(),
        }
    }

    // ===== Screen =====

    #[tool(description = "Capture the entire screen as an image")]
    pub async fn capture_screen(
        &self,
        Parameters(args): Parameters<CaptureScreenArgs>,
    ) -> Result<CallToolResult, McpError> {
        Ok(run_tool("capture_screen", "Error capturing screen", args, move |args| async move {
            let artifact = self.desktop.capture_screen(args.capture_format()).await?;
            Ok(artifact.payload())
        })
        .await)
    }

    #[tool(description = "Capture a specific region of the screen")]
    pub async fn capture_region(
        &self,
        Parameters(args): Parameters<CaptureRegionArgs>,
    ) -> Result<CallToolResult, McpError> {
        Ok(run_tool(
            "capture_region",
            "Error capturing screen region",
            args,
            move |args| async move {
                let artifact = self
                    .desktop
                    .capture_region(args.region(), args.capture_format())
                    .await?;
                Ok(artifact.payload())
            },
        )
        .await)
    }

    #[tool(description = "Get the dimensions of the screen")]
    pub async fn get_screen_size(&self) -> Result<CallToolResult, McpError> {
        Ok(run_tool("get_screen_size", "Error getting screen size", EmptyArgs {}, move |_| async move {
            let size = self.desktop.screen_size().await?;
            Ok(format!("Screen dimensions: {size} pixels"))
        })
        .await)
    }

    // ===== Mouse =====

    #[tool(description = "Move the mouse cursor to a specific position")]
    pub async fn move_mouse(
        &self,
        Parameters(args): Parameters<MoveMouseArgs>,
    ) -> Result<CallToolResult, McpError> {
        Ok(run_tool("move_mouse", "Error moving mouse", args, move |args| async move {
            self.desktop.move_mouse(args.point()).await?;
            Ok(format!("Mouse moved to position: {}", args.point()))
        })
        .await)
    }

    #[tool(description = "Get the current position of the mouse cursor")]
    pub async fn get_mouse_position(&self) -> Result<CallToolResult, McpError> {
        Ok(run_tool(
            "get_mouse_position",
            "Error getting mouse position",
            EmptyArgs {},
            move |_| async move {
                let position = self.desktop.mouse_position().await?;
                Ok(format!("Current mouse position: {position}"))
            },
        )
        .await)
    }

    #[tool(description = "Click the mouse at the current position")]
    pub async fn click_mouse(
        &self,
        Parameters(args): Parameters<ClickMouseArgs>,
    ) -> Result<CallToolResult, McpError> {
        Ok(run_tool("click_mouse", "Error clicking mouse", args, move |args| async move {
            let button = args.button.unwrap_or_default();
            self.desktop.click(button).await?;
            Ok(format!("Mouse clicked with {button} button"))
        })
        .await)
    }

    #[tool(description = "Click the mouse at a specific position")]
    pub async fn click_at(
        &self,
        Parameters(args): Parameters<ClickAtArgs>,
    ) -> Result<CallToolResult, McpError> {
        Ok(run_tool("click_at", "Error clicking mouse at position", args, move |args| async move {
            let button = args.button.unwrap_or_default();
            self.desktop.click_at(args.point(), button).await?;
            Ok(format!(
                "Mouse clicked at position {} with {button} button",
                args.point()
            ))
        })
        .await)
    }

    #[tool(description = "Double-click the mouse at the current position")]
    pub async fn double_click(&self) -> Result<CallToolResult, McpError> {
        Ok(run_tool(
            "double_click",
            "Error double-clicking mouse",
            EmptyArgs {},
            move |_| async move {
                self.desktop.double_click().await?;
                Ok("Mouse double-clicked".to_string())
            },
        )
        .await)
    }

    #[tool(description = "Double-click the mouse at a specific position")]
    pub async fn double_click_at(
        &self,
        Parameters(args): Parameters<DoubleClickAtArgs>,
    ) -> Result<CallToolResult, McpError> {
        Ok(run_tool(
            "double_click_at",
            "Error double-clicking mouse at position",
            args,
            move |args| async move {
                self.desktop.double_click_at(args.point()).await?;
                Ok(format!("Mouse double-clicked at position {}", args.point()))
            },
        )
        .await)
    }

    #[tool(description = "Scroll the mouse wheel")]
    pub async fn scroll_mouse(
        &self,
        Parameters(args): Parameters<ScrollMouseArgs>,
    ) -> Result<CallToolResult, McpError> {
        Ok(run_tool("scroll_mouse", "Error scrolling mouse", args, move |args| async move {
            self.desktop.scroll(args.direction, args.amount()).await?;
            Ok(format!(
                "Mouse scrolled {} by {} clicks",
                args.direction,
                args.amount()
            ))
        })
        .await)
    }

    #[tool(description = "Drag the mouse from current position to target position")]
    pub async fn drag_mouse(
        &self,
        Parameters(args): Parameters<DragMouseArgs>,
    ) -> Result<CallToolResult, McpError> {
        Ok(run_tool("drag_mouse", "Error dragging mouse", args, move |args| async move {
            self.desktop.drag_to(args.target()).await?;
            Ok(format!("Mouse dragged to position {}", args.target()))
        })
        .await)
    }

    #[tool(description = "Drag the mouse from start position to end position")]
    pub async fn drag_mouse_from_to(
        &self,
        Parameters(args): Parameters<DragMouseFromToArgs>,
    ) -> Result<CallToolResult, McpError> {
        Ok(run_tool("drag_mouse_from_to", "Error dragging mouse", args, move |args| async move {
            self.desktop.drag_from_to(args.start(), args.end()).await?;
            Ok(format!(
                "Mouse dragged from position {} to {}",
                args.start(),
                args.end()
            ))
        })
        .await)
    }

    // ===== Keyboard =====

    #[tool(description = "Type text at the current cursor position")]
    pub async fn type_text(
        &self,
        Parameters(args): Parameters<TypeTextArgs>,
    ) -> Result<CallToolResult, McpError> {
        Ok(run_tool("type_text", "Error typing text", args, move |args| async move {
            self.desktop.type_text(&args.text).await?;
            Ok(format!("Typed: {}", args.text))
        })
        .await)
    }

    #[tool(description = "Type text with a delay between keystrokes")]
    pub async fn type_text_with_delay(
        &self,
        Parameters(args): Parameters<TypeTextWithDelayArgs>,
    ) -> Result<CallToolResult, McpError> {
        Ok(run_tool(
            "type_text_with_delay",
            "Error typing text with delay",
            args,
            move |args| async move {
                self.desktop
                    .type_text_with_delay(&args.text, args.delay())
                    .await?;
                Ok(format!("Typed with delay: {}", args.text))
            },
        )
        .await)
    }

    #[tool(description = "Press a keyboard key")]
    pub async fn press_key(
        &self,
        Parameters(args): Parameters<PressKeyArgs>,
    ) -> Result<CallToolResult, McpError> {
        Ok(run_tool("press_key", "Error pressing key", args, move |args| async move {
            self.desktop.press_key(args.key).await?;
            Ok(format!("Pressed key: {}", args.key))
        })
        .await)
    }

    #[tool(description = "Press a keyboard shortcut (combination of keys)")]
    pub async fn press_key_shortcut(
        &self,
        Parameters(args): Parameters<PressKeyShortcutArgs>,
    ) -> Result<CallToolResult, McpError> {
        Ok(run_tool(
            "press_key_shortcut",
            "Error pressing key shortcut",
            args,
            move |args| async move {
                let combination = args.combination()?;
                self.desktop.press_shortcut(&combination).await?;
                Ok(format!("Pressed key shortcut: {combination}"))
            },
        )
        .await)
    }

    #[tool(description = "Hold down a keyboard key")]
    pub async fn hold_key(
        &self,
        Parameters(args): Parameters<HoldKeyArgs>,
    ) -> Result<CallToolResult, McpError> {
        Ok(run_tool("hold_key", "Error holding key", args, move |args| async move {
            self.desktop.hold_key(args.key).await?;
            Ok(format!("Holding key: {}", args.key))
        })
        .await)
    }

    #[tool(description = "Release a held keyboard key")]
    pub async fn release_key(
        &self,
        Parameters(args): Parameters<ReleaseKeyArgs>,
    ) -> Result<CallToolResult, McpError> {
        Ok(run_tool("release_key", "Error releasing key", args, move |args| async move {
            self.desktop.release_key(args.key).await?;
            Ok(format!("Released key: {}", args.key))
        })
        .await)
    }

    // ===== Clipboard =====

    #[tool(description = "Get text from the clipboard")]
    pub async fn get_clipboard_text(&self) -> Result<CallToolResult, McpError> {
        Ok(run_tool(
            "get_clipboard_text",
            "Error getting clipboard text",
            EmptyArgs {},
            move |_| async move {
                let text = self.desktop.clipboard_text().await?;
                Ok(format!("Clipboard content: {text}"))
            },
        )
        .await)
    }

    #[tool(description = "Set text to the clipboard")]
    pub async fn set_clipboard_text(
        &self,
        Parameters(args): Parameters<SetClipboardTextArgs>,
    ) -> Result<CallToolResult, McpError> {
        Ok(run_tool(
            "set_clipboard_text",
            "Error setting clipboard text",
            args,
            move |args| async move {
                self.desktop.set_clipboard_text(&args.text).await?;
                Ok("Text set to clipboard successfully".to_string())
            },
        )
        .await)
    }

    #[tool(description = "Copy selected text to clipboard and return it")]
    pub async fn copy_selected_text(&self) -> Result<CallToolResult, McpError> {
        Ok(run_tool(
            "copy_selected_text",
            "Error copying selected text",
            EmptyArgs {},
            move |_| async move {
                let text = self.desktop.copy_selected_text().await?;
                Ok(format!("Copied text: {text}"))
            },
        )
        .await)
    }

    #[tool(description = "Paste text at current cursor position")]
    pub async fn paste_text(
        &self,
        Parameters(args): Parameters<PasteTextArgs>,
    ) -> Result<CallToolResult, McpError> {
        Ok(run_tool("paste_text", "Error pasting text", args, move |args| async move {
            self.desktop.paste_text(&args.text).await?;
            Ok("Text pasted successfully".to_string())
        })
        .await)
    }

    #[tool(description = "Get image from the clipboard (if available) as base64 data")]
    pub async fn get_clipboard_image(&self) -> Result<CallToolResult, McpError> {
        Ok(run_tool(
            "get_clipboard_image",
            "Error getting clipboard image",
            EmptyArgs {},
            move |_| async move {
                Ok(match self.desktop.clipboard_image().await? {
                    Some(image) => format!(
                        "Clipboard image retrieved successfully. Image data: data:image/png;base64,{}",
                        general_purpose::STANDARD.encode(&image.png_data)
                    ),
                    None => "No image found on the clipboard.".to_string(),
                })
            },
        )
        .await)
    }

    // ===== UI elements =====

    #[tool(
        description = "Finds a UI element within a specified window using UI Automation and returns its properties (Name, AutomationId, ClassName, ControlType, BoundingRectangle, IsEnabled, IsOffscreen, Value). Requires window title and at least one element identifier (name, automationId, or className)."
    )]
    pub async fn get_ui_element_info(
        &self,
        Parameters(args): Parameters<GetUiElementInfoArgs>,
    ) -> Result<CallToolResult, McpError> {
        Ok(run_tool(
            "get_ui_element_info",
            "Error getting UI element info",
            args,
            move |args| async move {
                let info = self.desktop.element_info(&args.query()).await?;
                Ok(info.message())
            },
        )
        .await)
    }

    #[tool(
        description = "Performs an action (Click, SetValue, Focus) on a specified UI element found via UI Automation. Requires window title, action, and at least one element identifier. Requires valueToSet for the SetValue action."
    )]
    pub async fn invoke_ui_element_action(
        &self,
        Parameters(args): Parameters<InvokeUiElementActionArgs>,
    ) -> Result<CallToolResult, McpError> {
        Ok(run_tool(
            "invoke_ui_element_action",
            "Error invoking UI element action",
            args,
            move |args| async move {
                self.desktop
                    .invoke_element_action(&args.element_action())
                    .await
            },
        )
        .await)
    }
}

impl DesktopWrapper {
    /// Routes a raw call to its tool. Argument errors come back as `isError`
    /// results; only an unknown tool name is a protocol error.
    pub async fn dispatch_tool(
        &self,
        tool_name: &str,
        arguments: &serde_json::Value,
    ) -> Result<CallToolResult, McpError> {
        let result = match tool_name {
            "capture_screen" => match parse_args(tool_name, arguments) {
                Ok(args) => self.capture_screen(Parameters(args)).await,
                Err(rejected) => Ok(rejected),
            },
            "capture_region" => match parse_args(tool_name, arguments) {
                Ok(args) => self.capture_region(Parameters(args)).await,
                Err(rejected) => Ok(rejected),
            },
            "get_screen_size" => self.get_screen_size().await,
            "move_mouse" => match parse_args(tool_name, arguments) {
                Ok(args) => self.move_mouse(Parameters(args)).await,
                Err(rejected) => Ok(rejected),
            },
            "get_mouse_position" => self.get_mouse_position().await,
            "click_mouse" => match parse_args(tool_name, arguments) {
                Ok(args) => self.click_mouse(Parameters(args)).await,
                Err(rejected) => Ok(rejected),
            },
            "click_at" => match parse_args(tool_name, arguments) {
                Ok(args) => self.click_at(Parameters(args)).await,
                Err(rejected) => Ok(rejected),
            },
            "double_click" => self.double_click().await,
            "double_click_at" => match parse_args(tool_name, arguments) {
                Ok(args) => self.double_click_at(Parameters(args)).await,
                Err(rejected) => Ok(rejected),
            },
            "scroll_mouse" => match parse_args(tool_name, arguments) {
                Ok(args) => self.scroll_mouse(Parameters(args)).await,
                Err(rejected) => Ok(rejected),
            },
            "drag_mouse" => match parse_args(tool_name, arguments) {
                Ok(args) => self.drag_mouse(Parameters(args)).await,
                Err(rejected) => Ok(rejected),
            },
            "drag_mouse_from_to" => match parse_args(tool_name, arguments) {
                Ok(args) => self.drag_mouse_from_to(Parameters(args)).await,
                Err(rejected) => Ok(rejected),
            },
            "type_text" => match parse_args(tool_name, arguments) {
                Ok(args) => self.type_text(Parameters(args)).await,
                Err(rejected) => Ok(rejected),
            },
            "type_text_with_delay" => match parse_args(tool_name, arguments) {
                Ok(args) => self.type_text_with_delay(Parameters(args)).await,
                Err(rejected) => Ok(rejected),
            },
            "press_key" => match parse_args(tool_name, arguments) {
                Ok(args) => self.press_key(Parameters(args)).await,
                Err(rejected) => Ok(rejected),
            },
            "press_key_shortcut" => match parse_args(tool_name, arguments) {
                Ok(args) => self.press_key_shortcut(Parameters(args)).await,
                Err(rejected) => Ok(rejected),
            },
            "hold_key" => match parse_args(tool_name, arguments) {
                Ok(args) => self.hold_key(Parameters(args)).await,
                Err(rejected) => Ok(rejected),
            },
            "release_key" => match parse_args(tool_name, arguments) {
                Ok(args) => self.release_key(Parameters(args)).await,
                Err(rejected) => Ok(rejected),
            },
            "get_clipboard_text" => self.get_clipboard_text().await,
            "set_clipboard_text" => match parse_args(tool_name, arguments) {
                Ok(args) => self.set_clipboard_text(Parameters(args)).await,
                Err(rejected) => Ok(rejected),
            },
            "copy_selected_text" => self.copy_selected_text().await,
            "paste_text" => match parse_args(tool_name, arguments) {
                Ok(args) => self.paste_text(Parameters(args)).await,
                Err(rejected) => Ok(rejected),
            },
            "get_clipboard_image" => self.get_clipboard_image().await,
            "get_ui_element_info" => match parse_args(tool_name, arguments) {
                Ok(args) => self.get_ui_element_info(Parameters(args)).await,
                Err(rejected) => Ok(rejected),
            },
            "invoke_ui_element_action" => match parse_args(tool_name, arguments) {
                Ok(args) => self.invoke_ui_element_action(Parameters(args)).await,
                Err(rejected) => Ok(rejected),
            },
            _ => Err(McpError::invalid_params(
                "Unknown tool called",
                Some(json!({"tool_name": tool_name})),
            )),
        };

        debug!("[{}] dispatched", tool_name);
        result
    }
}

// Manual implementation instead of #[tool_handler] so every call is logged and traced
impl ServerHandler for DesktopWrapper {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(crate::prompt::get_server_instructions()),
        }
    }

    async fn call_tool(
        &self,
        request: rmcp::model::CallToolRequestParam,
        _context: rmcp::service::RequestContext<rmcp::RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        let tool_name = request.name.to_string();
        // A call without arguments is treated as `{}` so optional-only tools parse.
        let arguments = request
            .arguments
            .map(serde_json::Value::Object)
            .unwrap_or_else(|| json!({}));

        let mut span = StepSpan::new(&tool_name, None);
        let start_time = std::time::Instant::now();

        let (result, failure_kind) =
            with_failure_kind(self.dispatch_tool(&tool_name, &arguments)).await;

        let duration_ms = start_time.elapsed().as_millis() as u64;
        match &result {
            Ok(call_result) if is_error(call_result) => {
                let message = first_text(call_result).unwrap_or("Failed");
                let kind = failure_kind.unwrap_or("tool");
                warn!(tool = %tool_name, duration_ms, kind, "tool returned an error: {}", message);
                span.set_attribute("error.type", kind.to_string());
                span.set_status(false, Some(message));
            }
            Ok(_) => {
                info!(tool = %tool_name, duration_ms, "tool completed");
                span.set_status(true, None);
            }
            Err(e) => {
                warn!(tool = %tool_name, duration_ms, "tool call rejected: {}", e.message);
                span.set_attribute("error.type", "unknown_tool".to_string());
                span.set_status(false, Some(&e.message));
            }
        }
        span.end();

        result
    }

    async fn list_tools(
        &self,
        _request: Option<rmcp::model::PaginatedRequestParam>,
        _context: rmcp::service::RequestContext<rmcp::RoleServer>,
    ) -> Result<rmcp::model::ListToolsResult, McpError> {
        Ok(rmcp::model::ListToolsResult::with_all_items(
            self.tool_router.list_all(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pc_control::mock::{MemoryClipboard, RecordingInput, ScriptedUiProvider, SyntheticCapturer};
    use std::collections::BTreeSet;

    fn wrapper() -> DesktopWrapper {
        let desktop = Desktop::with_backends(
            DesktopConfig::default(),
            Arc::new(RecordingInput::new(800, 600)),
            Arc::new(MemoryClipboard::new()),
            Arc::new(SyntheticCapturer::new(800, 600)),
            Arc::new(ScriptedUiProvider::new()),
        );
        DesktopWrapper::with_desktop(desktop)
    }

    #[test]
    fn test_router_matches_dispatch() {
        let routed: BTreeSet<String> = wrapper()
            .tool_router
            .list_all()
            .into_iter()
            .map(|t| t.name.to_string())
            .collect();
        let dispatched: BTreeSet<String> = env!("MCP_TOOLS")
            .split(',')
            .map(str::to_string)
            .collect();
        assert_eq!(routed.len(), 25);
        assert_eq!(routed, dispatched);
    }

    #[test]
    fn test_published_schema_uses_wire_names() {
        let tools = wrapper().tool_router.list_all();
        let drag = tools
            .iter()
            .find(|t| t.name == "drag_mouse_from_to")
            .unwrap();
        let properties = drag.input_schema.get("properties").unwrap();
        for field in ["startX", "startY", "endX", "endY"] {
            assert!(properties.get(field).is_some(), "missing {field}");
        }
    }

    #[test]
    fn test_published_schema_carries_limits() {
        let tools = wrapper().tool_router.list_all();
        let property = |tool: &str, field: &str| {
            let tool = tools.iter().find(|t| t.name == tool).unwrap();
            tool.input_schema.get("properties").unwrap()[field].clone()
        };
        assert_eq!(property("capture_screen", "quality")["maximum"], 100);
        assert_eq!(property("capture_region", "quality")["minimum"], 1);
        assert_eq!(property("press_key_shortcut", "keys")["minItems"], 1);
        assert_eq!(property("press_key_shortcut", "keys")["maxItems"], 5);
        assert_eq!(property("scroll_mouse", "amount")["maximum"], 10);
    }

    #[tokio::test]
    async fn test_unknown_tool_is_protocol_error() {
        let err = wrapper()
            .dispatch_tool("format_disk", &json!({}))
            .await
            .unwrap_err();
        assert_eq!(err.message, "Unknown tool called");
    }
}
