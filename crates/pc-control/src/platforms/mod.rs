//! Native backends for the driver traits

mod clipboard;
mod enigo_input;
mod screen;

pub use clipboard::ArboardClipboard;
pub use enigo_input::{to_enigo_key, EnigoInput};
pub use screen::XcapCapturer;

/// Runs a blocking OS call. On a multi-threaded runtime the worker is handed
/// off first so other tasks keep running; elsewhere the call runs in place.
pub(crate) fn blocking<T>(call: impl FnOnce() -> T) -> T {
    use tokio::runtime::{Handle, RuntimeFlavor};
    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(call)
        }
        _ => call(),
    }
}
