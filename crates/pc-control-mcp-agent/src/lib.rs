pub mod envelope;
pub mod prompt;
pub mod server;
pub mod telemetry;
pub mod utils;

pub use utils::DesktopWrapper;
