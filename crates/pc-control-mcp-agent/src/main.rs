use anyhow::Result;
use axum::{routing::get, Router};
use clap::{Parser, ValueEnum};
use pc_control::{DesktopConfig, ScriptHost};
use pc_control_mcp_agent::DesktopWrapper;
use pc_control_mcp_agent::utils::init_logging;
use rmcp::{
    transport::stdio,
    transport::streamable_http_server::{
        session::local::LocalSessionManager, StreamableHttpService,
    },
    ServiceExt,
};
use std::net::SocketAddr;
use std::path::PathBuf;
use tower_http::cors::CorsLayer;
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "PC Control MCP Server - mouse, keyboard, clipboard, screen capture and UI element tools"
)]
struct Args {
    /// Transport mode to use
    #[arg(short, long, value_enum, default_value = "stdio")]
    transport: TransportMode,

    /// Port to listen on (only used for the HTTP transport)
    #[arg(short, long, default_value = "3000")]
    port: u16,

    /// Host to bind to (only used for the HTTP transport)
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Enable CORS for the HTTP transport
    #[arg(long)]
    cors: bool,

    /// Directory receiving screenshot_NN files (defaults to the working directory)
    #[arg(long, env = "PC_CONTROL_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    /// Number of rotating screenshot slots
    #[arg(long, default_value_t = pc_control::DEFAULT_ROTATION_WINDOW)]
    rotation_window: u32,

    /// Directory containing GetUIElementInfo.ps1 and InvokeUIElementAction.ps1
    #[arg(long, env = "PC_CONTROL_SCRIPT_DIR", default_value = "scripts")]
    script_dir: PathBuf,

    /// Program that runs the UI automation scripts (defaults to powershell.exe)
    #[arg(long, env = "PC_CONTROL_SCRIPT_HOST")]
    script_host: Option<String>,

    /// Argument placed before the script path, repeatable (only with --script-host)
    #[arg(long = "script-host-arg", allow_hyphen_values = true)]
    script_host_args: Vec<String>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum TransportMode {
    /// Standard I/O transport (default)
    Stdio,
    /// Streamable HTTP transport on /mcp
    Http,
}

impl Args {
    fn desktop_config(&self) -> DesktopConfig {
        let defaults = DesktopConfig::default();
        DesktopConfig {
            output_dir: self.output_dir.clone().unwrap_or(defaults.output_dir),
            rotation_window: self.rotation_window,
            script_dir: self.script_dir.clone(),
            script_host: match &self.script_host {
                Some(program) => ScriptHost::new(program.clone(), self.script_host_args.clone()),
                None => ScriptHost::powershell(),
            },
            ..defaults
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Never write to stdout during a panic, it carries the JSON-RPC stream
    std::panic::set_hook(Box::new(|panic_info| {
        if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            eprintln!("MCP Server Panic: {s}");
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            eprintln!("MCP Server Panic: {s}");
        } else {
            eprintln!("MCP Server Panic occurred");
        }
        if let Some(location) = panic_info.location() {
            eprintln!("Panic location: {}:{}", location.file(), location.line());
        }
    }));

    init_logging()?;
    pc_control_mcp_agent::telemetry::init_telemetry()?;

    info!("========================================");
    info!("PC Control MCP Server v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Build profile: {}",
        if cfg!(debug_assertions) {
            "debug"
        } else {
            "release"
        }
    );
    if let Some(git_hash) = option_env!("GIT_HASH") {
        info!("Git commit: {}", git_hash);
    }
    if let Some(git_branch) = option_env!("GIT_BRANCH") {
        info!("Git branch: {}", git_branch);
    }
    if let Some(build_time) = option_env!("BUILD_TIMESTAMP") {
        info!("Build timestamp: {}", build_time);
    }
    if let Some(tools) = option_env!("MCP_TOOLS") {
        info!("Tools: {}", tools);
    }
    info!("========================================");

    let config = args.desktop_config();
    info!("Transport mode: {:?}", args.transport);

    match args.transport {
        TransportMode::Stdio => {
            info!("Starting stdio transport...");
            let desktop = DesktopWrapper::new(config);

            let service = desktop.serve(stdio()).await.inspect_err(|e| {
                tracing::error!("Serving error: {:?}", e);
                eprintln!("Fatal: stdio communication error: {e}");
                std::process::exit(1);
            })?;

            tokio::select! {
                quit = service.waiting() => {
                    info!("stdio session ended: {:?}", quit?);
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Received shutdown signal");
                }
            }
        }
        TransportMode::Http => {
            let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
            info!("Starting streamable HTTP server on http://{}", addr);

            // One wrapper shared by every session so the screenshot rotation is process-wide
            let desktop = DesktopWrapper::new(config);
            let service = StreamableHttpService::new(
                move || Ok(desktop.clone()),
                LocalSessionManager::default().into(),
                Default::default(),
            );

            let mut router: Router = Router::new()
                .route("/health", get(health_check))
                .nest_service("/mcp", service);
            if args.cors {
                router = router.layer(CorsLayer::permissive());
            }

            let tcp_listener = tokio::net::TcpListener::bind(addr).await.inspect_err(|e| {
                eprintln!("Fatal: failed to bind {addr}: {e}");
                std::process::exit(1);
            })?;

            info!("MCP client endpoint: http://{addr}/mcp");
            info!("Health check: http://{addr}/health");
            if args.cors {
                info!("CORS enabled - accessible from web browsers");
            }
            info!("Press Ctrl+C to stop");

            axum::serve(tcp_listener, router)
                .with_graceful_shutdown(async {
                    tokio::signal::ctrl_c().await.ok();
                    info!("Received shutdown signal");
                })
                .await?;
        }
    }

    pc_control::child_process::kill_all();
    pc_control_mcp_agent::telemetry::shutdown_telemetry();
    info!("Shutdown complete");
    Ok(())
}

async fn health_check() -> impl axum::response::IntoResponse {
    (
        axum::http::StatusCode::OK,
        axum::Json(serde_json::json!({
            "status": "healthy",
            "version": env!("CARGO_PKG_VERSION"),
            "active_scripts": pc_control::child_process::active_count(),
            "timestamp": chrono::Utc::now().to_rfc3339()
        })),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_builds_desktop_config() {
        let args = Args::parse_from([
            "pc-control-mcp-agent",
            "--output-dir",
            "shots",
            "--rotation-window",
            "5",
            "--script-host",
            "pwsh",
            "--script-host-arg",
            "-NoProfile",
        ]);
        assert_eq!(args.transport, TransportMode::Stdio);
        let config = args.desktop_config();
        assert_eq!(config.output_dir, PathBuf::from("shots"));
        assert_eq!(config.rotation_window, 5);
        assert_eq!(config.script_host, ScriptHost::new("pwsh".to_string(), vec!["-NoProfile".to_string()]));
    }

    #[test]
    fn test_native_wrapper_publishes_every_tool() {
        let args = Args::parse_from(["pc-control-mcp-agent", "--transport", "http"]);
        let wrapper = DesktopWrapper::new(args.desktop_config());
        assert_eq!(wrapper.tool_router.list_all().len(), 25);
    }
}
