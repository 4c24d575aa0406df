use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;

use super::{Menu, MenuError};

/// Terminal menu: numbered options on stderr, selection read line by line from stdin.
///
/// Empty input or `q` cancels. EOF yields [`MenuError::Closed`].
pub struct PromptMenu {
    input: Mutex<BufReader<tokio::io::Stdin>>,
}

impl PromptMenu {
    /// Creates a menu bound to the process stdin.
    #[must_use]
    pub fn new() -> Self {
        Self {
            input: Mutex::new(BufReader::new(tokio::io::stdin())),
        }
    }
}

impl Default for PromptMenu {
    fn default() -> Self {
        Self::new()
    }
}

/// Parses one input line into a selection; anything unparseable cancels.
pub(crate) fn parse_choice(line: &str, options: usize) -> Option<usize> {
    let line = line.trim();
    if line.is_empty() || line.eq_ignore_ascii_case("q") {
        return None;
    }
    match line.parse::<usize>() {
        Ok(n) if (1..=options).contains(&n) => Some(n - 1),
        _ => None,
    }
}

fn render(prompt: &str, options: &[String]) -> String {
    let mut out = format!("\n{prompt}\n");
    for (i, option) in options.iter().enumerate() {
        out.push_str(&format!("  [{}] {option}\n", i + 1));
    }
    out.push_str("> ");
    out
}

#[async_trait]
impl Menu for PromptMenu {
    async fn choose(&self, prompt: &str, options: &[String]) -> Result<Option<usize>, MenuError> {
        let mut err = tokio::io::stderr();
        err.write_all(render(prompt, options).as_bytes()).await?;
        err.flush().await?;

        let mut line = String::new();
        let read = self.input.lock().await.read_line(&mut line).await?;
        if read == 0 {
            return Err(MenuError::Closed);
        }
        Ok(parse_choice(&line, options.len()))
    }
}
