//! UI element inspection and actions through an external script host
//!
//! The default provider runs `GetUIElementInfo.ps1` / `InvokeUIElementAction.ps1`
//! under PowerShell. Each identifier is passed as its own argument, the process is
//! awaited to completion, and its exit status and captured output are classified
//! by the pure functions below. There is no retry and no timeout.

use crate::child_process::Registration;
use crate::drivers::UiAutomationProvider;
use crate::errors::AutomationError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, warn};

pub const INFO_SCRIPT_NAME: &str = "GetUIElementInfo.ps1";
pub const ACTION_SCRIPT_NAME: &str = "InvokeUIElementAction.ps1";

/// Locates one element inside a top-level window.
///
/// Identifiers are optional here. Whether at least one is required is up to the
/// provider; the PowerShell scripts reject a query with none.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ElementQuery {
    pub window_title: String,
    pub element_name: Option<String>,
    pub automation_id: Option<String>,
    pub class_name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "schemars", derive(schemars::JsonSchema))]
pub enum UiAction {
    Click,
    SetValue,
    Focus,
}

impl UiAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            UiAction::Click => "Click",
            UiAction::SetValue => "SetValue",
            UiAction::Focus => "Focus",
        }
    }
}

impl fmt::Display for UiAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementAction {
    pub query: ElementQuery,
    pub action: UiAction,
    /// Only forwarded for `SetValue`.
    pub value_to_set: Option<String>,
}

/// Successful query outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementInfo {
    /// Trimmed stdout, verified to be one JSON object.
    Json(String),
    /// Non-empty stdout that is not a JSON object.
    PlainText(String),
    Empty,
}

impl ElementInfo {
    pub fn message(&self) -> String {
        match self {
            ElementInfo::Json(json) => json.clone(),
            ElementInfo::PlainText(text) => format!(
                "Script executed successfully, but output was not valid JSON:\n{text}"
            ),
            ElementInfo::Empty => "Script executed successfully with no JSON output.".to_string(),
        }
    }
}

/// Collected result of one finished script process.
#[derive(Debug, Clone, Default)]
pub struct ScriptOutput {
    /// `None` when the process was terminated by a signal.
    pub status_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ScriptOutput {
    fn succeeded(&self) -> bool {
        self.status_code == Some(0)
    }

    /// stderr, else stdout, else a generic exit-code message.
    fn failure_detail(&self) -> String {
        let stderr = self.stderr.trim();
        if !stderr.is_empty() {
            return stderr.to_string();
        }
        let stdout = self.stdout.trim();
        if !stdout.is_empty() {
            return stdout.to_string();
        }
        match self.status_code {
            Some(code) => format!("Script exited with code {code}"),
            None => "Script was terminated before exiting".to_string(),
        }
    }
}

fn push_identifiers(args: &mut Vec<String>, query: &ElementQuery) {
    args.push("-WindowTitle".into());
    args.push(query.window_title.clone());
    for (flag, value) in [
        ("-ElementName", &query.element_name),
        ("-AutomationId", &query.automation_id),
        ("-ClassName", &query.class_name),
    ] {
        if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
            args.push(flag.into());
            args.push(value.to_string());
        }
    }
}

pub fn query_arguments(query: &ElementQuery) -> Vec<String> {
    let mut args = Vec::with_capacity(8);
    push_identifiers(&mut args, query);
    args
}

pub fn action_arguments(action: &ElementAction) -> Vec<String> {
    let mut args = Vec::with_capacity(12);
    push_identifiers(&mut args, &action.query);
    // -Action goes right after the window title.
    args.insert(2, "-Action".into());
    args.insert(3, action.action.as_str().into());
    if action.action == UiAction::SetValue {
        if let Some(value) = &action.value_to_set {
            args.push("-ValueToSet".into());
            args.push(value.clone());
        }
    }
    args
}

pub fn classify_query_output(output: &ScriptOutput) -> Result<ElementInfo, AutomationError> {
    if !output.succeeded() {
        return Err(AutomationError::ProcessExit(format!(
            "Failed to get UI element info: {}",
            output.failure_detail()
        )));
    }
    let trimmed = output.stdout.trim();
    if trimmed.is_empty() {
        return Ok(ElementInfo::Empty);
    }
    if trimmed.starts_with('{') && trimmed.ends_with('}') {
        return match serde_json::from_str::<serde_json::Value>(trimmed) {
            Ok(_) => Ok(ElementInfo::Json(trimmed.to_string())),
            Err(e) => Err(AutomationError::OutputParse(format!(
                "script succeeded but its JSON output is malformed: {e}\nOutput:\n{trimmed}"
            ))),
        };
    }
    Ok(ElementInfo::PlainText(trimmed.to_string()))
}

pub fn classify_action_output(output: &ScriptOutput) -> Result<String, AutomationError> {
    if !output.succeeded() {
        return Err(AutomationError::ProcessExit(format!(
            "Failed to invoke UI element action: {}",
            output.failure_detail()
        )));
    }
    let trimmed = output.stdout.trim();
    if trimmed.is_empty() {
        Ok("Action completed successfully.".to_string())
    } else {
        Ok(trimmed.to_string())
    }
}

/// Program plus the arguments that precede the script path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptHost {
    pub program: String,
    pub leading_args: Vec<String>,
}

impl ScriptHost {
    pub fn new(program: impl Into<String>, leading_args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            leading_args,
        }
    }

    /// `powershell.exe -NoProfile -ExecutionPolicy Bypass -File`
    pub fn powershell() -> Self {
        Self::new(
            "powershell.exe",
            ["-NoProfile", "-ExecutionPolicy", "Bypass", "-File"]
                .into_iter()
                .map(String::from)
                .collect(),
        )
    }
}

impl Default for ScriptHost {
    fn default() -> Self {
        Self::powershell()
    }
}

/// [`UiAutomationProvider`] backed by two scripts run under a [`ScriptHost`].
#[derive(Debug, Clone)]
pub struct ScriptBridge {
    host: ScriptHost,
    info_script: PathBuf,
    action_script: PathBuf,
}

impl ScriptBridge {
    pub fn new(host: ScriptHost, info_script: PathBuf, action_script: PathBuf) -> Self {
        Self {
            host,
            info_script,
            action_script,
        }
    }

    /// Uses the standard script names inside `script_dir`.
    pub fn from_dir(host: ScriptHost, script_dir: &Path) -> Self {
        Self::new(
            host,
            script_dir.join(INFO_SCRIPT_NAME),
            script_dir.join(ACTION_SCRIPT_NAME),
        )
    }

    pub async fn run_script(
        &self,
        script: &Path,
        args: &[String],
    ) -> Result<ScriptOutput, AutomationError> {
        debug!(
            "running {} {:?} {} {:?}",
            self.host.program,
            self.host.leading_args,
            script.display(),
            args
        );
        let child = Command::new(&self.host.program)
            .args(&self.host.leading_args)
            .arg(script)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| AutomationError::ProcessLaunch {
                program: self.host.program.clone(),
                source,
            })?;

        let label = script
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let _registration = Registration::new(child.id(), &label);

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| AutomationError::io(format!("waiting for {label}"), e))?;

        let result = ScriptOutput {
            status_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        if !result.succeeded() {
            warn!(
                "{} exited with {:?}: {}",
                label,
                result.status_code,
                result.stderr.trim()
            );
        }
        Ok(result)
    }
}

#[async_trait]
impl UiAutomationProvider for ScriptBridge {
    async fn query_element(&self, query: &ElementQuery) -> Result<ElementInfo, AutomationError> {
        let output = self
            .run_script(&self.info_script, &query_arguments(query))
            .await?;
        classify_query_output(&output)
    }

    async fn invoke_action(&self, action: &ElementAction) -> Result<String, AutomationError> {
        let output = self
            .run_script(&self.action_script, &action_arguments(action))
            .await?;
        classify_action_output(&output)
    }
}
