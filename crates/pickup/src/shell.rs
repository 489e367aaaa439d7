//! Line-oriented shell: one command per line, notices printed after each.

use std::io::Write;

use anyhow::{bail, Context, Result};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::{
    app::App,
    cli::{
        build_shell,
        handlers::{dispatch, Control},
    },
};

const PROMPT: &str = "pickup> ";

/// Read commands until end of input or `quit`.
///
/// # Errors
///
/// Returns an error only when input cannot be read or output cannot be
/// written. Command failures are printed and the shell keeps going.
pub async fn run<R, W>(app: &mut App, input: R, out: &mut W, prompt: bool) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut lines = input.lines();
    loop {
        if prompt {
            write!(out, "{PROMPT}")?;
            out.flush()?;
        }
        let Some(line) = lines.next_line().await.context("Failed to read command")? else {
            break;
        };

        let control = execute(app, &line, out).await?;
        print_notices(app, out)?;
        if control == Control::Quit {
            break;
        }
    }
    Ok(())
}

/// Parse and run one line.
///
/// # Errors
///
/// Returns an error only when output cannot be written.
pub async fn execute<W: Write>(app: &mut App, line: &str, out: &mut W) -> Result<Control> {
    let tokens = match split_line(line) {
        Ok(tokens) if tokens.is_empty() => return Ok(Control::Continue),
        Ok(tokens) => tokens,
        Err(e) => {
            writeln!(out, "error: {e}")?;
            return Ok(Control::Continue);
        }
    };

    let matches = match build_shell().try_get_matches_from(&tokens) {
        Ok(matches) => matches,
        Err(e) => {
            write!(out, "{}", e.render())?;
            return Ok(Control::Continue);
        }
    };

    match dispatch(app, &matches, out).await {
        Ok(control) => Ok(control),
        Err(e) => {
            if let Some(err) = e.downcast_ref::<pickup_core::Error>() {
                tracing::debug!(error = %err, "command failed");
                writeln!(out, "error: {}", err.user_message())?;
                return Ok(Control::Continue);
            }
            if e.downcast_ref::<std::io::Error>().is_some() {
                return Err(e);
            }
            writeln!(out, "error: {e}")?;
            Ok(Control::Continue)
        }
    }
}

fn print_notices<W: Write>(app: &App, out: &mut W) -> Result<()> {
    for notice in app.notices.drain() {
        writeln!(out, "[{}] {}", notice.level, notice.message)?;
    }
    Ok(())
}

/// Split a command line into words. Single or double quotes group words.
///
/// # Errors
///
/// Returns an error for an unterminated quote.
pub fn split_line(line: &str) -> Result<Vec<String>> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut quote: Option<char> = None;

    for c in line.chars() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), c) => current.push(c),
            (None, '"' | '\'') => {
                quote = Some(c);
                in_word = true;
            }
            (None, c) if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            (None, c) => {
                current.push(c);
                in_word = true;
            }
        }
    }

    if let Some(q) = quote {
        bail!("unterminated {q} quote");
    }
    if in_word {
        words.push(current);
    }
    Ok(words)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_plain_words() -> Result<()> {
        assert_eq!(split_line("  arrive   lane-1 ")?, vec!["arrive", "lane-1"]);
        assert!(split_line("   ")?.is_empty());
        Ok(())
    }

    #[test]
    fn test_split_quoted_words() -> Result<()> {
        assert_eq!(
            split_line(r#"student add "Ana María" '3 B'"#)?,
            vec!["student", "add", "Ana María", "3 B"]
        );
        assert_eq!(split_line(r#"login x """#)?, vec!["login", "x", ""]);
        Ok(())
    }

    #[test]
    fn test_split_unterminated_quote() {
        assert!(split_line("student add \"Ana").is_err());
    }
}
