//! # Process exit and abort primitives.
//!
//! The interactive controller ends the process through [`ProcessControl`] so tests
//! can record the request instead of dying.

/// Exit/abort hooks used by the interactive controller.
pub trait ProcessControl: Send + Sync + 'static {
    /// Terminates the process with `code` (orderly exit).
    fn exit(&self, code: i32);

    /// Terminates the process abnormally.
    fn abort(&self);
}

/// [`ProcessControl`] backed by `std::process`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdProcess;

impl ProcessControl for StdProcess {
    fn exit(&self, code: i32) {
        tracing::info!(code, "exiting process on operator request");
        std::process::exit(code);
    }

    fn abort(&self) {
        tracing::warn!("aborting process on operator request");
        std::process::abort();
    }
}
