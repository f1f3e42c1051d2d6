//! Uniform tool response envelope
//!
//! Every tool runs through [`run_tool`]: arguments are validated, the capability is
//! invoked, and whatever happens comes back as a `CallToolResult` with a single text
//! item. Failures set `isError` and never propagate as protocol errors.

use crate::utils::ToolArgs;
use pc_control::AutomationError;
use rmcp::model::{CallToolResult, Content};
use serde::de::DeserializeOwned;
use std::cell::Cell;
use std::error::Error;
use std::fmt::{self, Write as _};
use std::future::Future;
use tracing::{debug, warn};

tokio::task_local! {
    static FAILURE_KIND: Cell<Option<&'static str>>;
}

fn record_failure_kind(kind: &'static str) {
    // Outside `with_failure_kind` there is nobody to report to.
    let _ = FAILURE_KIND.try_with(|slot| slot.set(Some(kind)));
}

/// Awaits `call` and returns its output together with the category of the last
/// failure a tool reported while it ran (`AutomationError::kind()` or `validation`).
pub async fn with_failure_kind<F: Future>(call: F) -> (F::Output, Option<&'static str>) {
    FAILURE_KIND
        .scope(Cell::new(None), async move {
            let output = call.await;
            (output, FAILURE_KIND.with(Cell::get))
        })
        .await
}

pub fn success(text: impl Into<String>) -> CallToolResult {
    CallToolResult::success(vec![Content::text(text.into())])
}

pub fn failure(text: impl Into<String>) -> CallToolResult {
    CallToolResult::error(vec![Content::text(text.into())])
}

/// `"<prefix>: <error>"` followed by one `Caused by:` line per source.
pub fn render_error(prefix: &str, err: &(dyn Error + 'static)) -> String {
    let mut message = format!("{prefix}: {err}");
    let mut source = err.source();
    while let Some(cause) = source {
        let _ = write!(message, "\nCaused by: {cause}");
        source = cause.source();
    }
    message
}

pub fn invalid_arguments(tool: &str, err: &dyn fmt::Display) -> CallToolResult {
    warn!("[{}] rejected arguments: {}", tool, err);
    record_failure_kind("validation");
    failure(format!("Invalid arguments for {tool}: {err}"))
}

/// Deserializes raw tool arguments, or returns the error response to send back.
pub fn parse_args<T: DeserializeOwned>(
    tool: &str,
    arguments: &serde_json::Value,
) -> Result<T, CallToolResult> {
    serde_json::from_value(arguments.clone()).map_err(|e| invalid_arguments(tool, &e))
}

/// Validate, invoke, normalize.
pub async fn run_tool<A, F, Fut>(
    tool: &str,
    error_prefix: &str,
    args: A,
    invoke: F,
) -> CallToolResult
where
    A: ToolArgs + fmt::Debug,
    F: FnOnce(A) -> Fut,
    Fut: Future<Output = Result<String, AutomationError>>,
{
    if let Err(e) = args.validate() {
        return invalid_arguments(tool, &e);
    }
    debug!("[{}] called with {:?}", tool, args);

    match invoke(args).await {
        Ok(text) => success(text),
        Err(e) => {
            warn!(kind = e.kind(), "[{}] failed: {}", tool, e);
            record_failure_kind(e.kind());
            failure(render_error(error_prefix, &e))
        }
    }
}

/// First text item of a response, used for logs and span status.
pub fn first_text(result: &CallToolResult) -> Option<&str> {
    result.content.iter().find_map(|c| match &c.raw {
        rmcp::model::RawContent::Text(text) => Some(text.text.as_str()),
        _ => None,
    })
}

pub fn is_error(result: &CallToolResult) -> bool {
    result.is_error.unwrap_or(false)
}
