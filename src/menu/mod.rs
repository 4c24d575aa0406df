//! # Operator menu used by the interactive controller.
//!
//! The controller never renders anything itself: it hands a prompt and a list of
//! option labels to a [`Menu`] and gets back the selected index, or `None` when the
//! operator cancelled.
//!
//! - [`PromptMenu`] numbered options on stderr, choice read from stdin
//! - custom implementations (TUI widgets, scripted doubles in tests)

mod prompt;

pub use prompt::PromptMenu;

use async_trait::async_trait;
use thiserror::Error;

/// Errors produced by a [`Menu`] implementation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum MenuError {
    /// The input source is gone (EOF, closed terminal).
    #[error("menu input closed")]
    Closed,

    /// Reading or rendering failed.
    #[error("menu io error: {0}")]
    Io(String),
}

impl From<std::io::Error> for MenuError {
    fn from(err: std::io::Error) -> Self {
        MenuError::Io(err.to_string())
    }
}

/// Presents options and returns the operator's choice.
///
/// Returns `Ok(Some(i))` for `options[i]`, `Ok(None)` for cancel. Indices out of
/// range are treated as cancel by the caller.
#[async_trait]
pub trait Menu: Send + Sync + 'static {
    /// Shows `prompt` with `options` and waits for a selection.
    async fn choose(&self, prompt: &str, options: &[String]) -> Result<Option<usize>, MenuError>;
}
