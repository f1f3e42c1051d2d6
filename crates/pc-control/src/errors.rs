use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AutomationError {
    #[error("Coordinates ({x}, {y}) out of bounds. Screen size is {width}x{height}")]
    OutOfBounds {
        x: i32,
        y: i32,
        width: u32,
        height: u32,
    },

    #[error("Input driver error: {0}")]
    Driver(String),

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Key '{key}' has no physical equivalent on {platform}")]
    UnsupportedKey { key: String, platform: String },

    #[error("Clipboard error: {0}")]
    Clipboard(String),

    #[error("Failed to start process '{program}'")]
    ProcessLaunch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{0}")]
    ProcessExit(String),

    #[error("Failed to parse process output: {0}")]
    OutputParse(String),

    #[error("Capture pipeline error: {0}")]
    Pipeline(String),

    #[error("Capture did not produce output at {}", .0.display())]
    CaptureNoOutput(PathBuf),

    #[error("I/O error while {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Image error while {context}")]
    Image {
        context: String,
        #[source]
        source: image::ImageError,
    },
}

impl AutomationError {
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        AutomationError::Io {
            context: context.into(),
            source,
        }
    }

    pub(crate) fn image(context: impl Into<String>, source: image::ImageError) -> Self {
        AutomationError::Image {
            context: context.into(),
            source,
        }
    }

    /// Short machine-readable category, used for log fields and span attributes.
    pub fn kind(&self) -> &'static str {
        match self {
            AutomationError::OutOfBounds { .. } => "bounds",
            AutomationError::Driver(_)
            | AutomationError::InvalidKey(_)
            | AutomationError::UnsupportedKey { .. }
            | AutomationError::Clipboard(_) => "driver",
            AutomationError::ProcessLaunch { .. } => "process_launch",
            AutomationError::ProcessExit(_) => "process_exit",
            AutomationError::OutputParse(_) => "output_parse",
            AutomationError::Pipeline(_)
            | AutomationError::CaptureNoOutput(_)
            | AutomationError::Io { .. }
            | AutomationError::Image { .. } => "pipeline",
        }
    }
}

pub type Result<T, E = AutomationError> = std::result::Result<T, E>;
