//! Interactive question loop.

use clap::Args;
use std::io::Write;
use std::time::Duration;
use strictqa_core::{config::AppConfig, AppResult};
use strictqa_router::{ResolveOptions, Router};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

use super::documents::render_status;

const EXIT_WORDS: &[&str] = &["quit", "exit", "bye"];

/// Ask questions until `quit` or end of input
#[derive(Args, Debug, Default)]
pub struct InteractiveCommand {}

impl InteractiveCommand {
    pub async fn execute(&self, config: &AppConfig, router: &Router) -> AppResult<()> {
        let timeout = config.resolve_timeout_secs.map(Duration::from_secs);
        let stdin = BufReader::new(tokio::io::stdin());
        run_loop(router, stdin, std::io::stdout(), timeout).await
    }
}

pub(crate) async fn run_loop<R, W>(
    router: &Router,
    input: R,
    mut out: W,
    timeout: Option<Duration>,
) -> AppResult<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    writeln!(out, "strictqa interactive mode. Type 'quit' to leave.")?;
    let mut lines = input.lines();

    loop {
        write!(out, "\n> ")?;
        out.flush()?;

        let Some(line) = lines.next_line().await? else {
            writeln!(out)?;
            break;
        };
        let line = line.trim();

        match line.to_lowercase().as_str() {
            "" => continue,
            word if EXIT_WORDS.contains(&word) => break,
            "status" => match router.status() {
                Ok(status) => write!(out, "{}", render_status(&status))?,
                Err(e) => writeln!(out, "Error: {}", e)?,
            },
            "docs" => match router.list_documents() {
                Ok(docs) if docs.is_empty() => writeln!(out, "No documents indexed")?,
                Ok(docs) => {
                    for doc in docs {
                        writeln!(out, "  - {} ({} chunks)", doc.name, doc.chunks)?;
                    }
                }
                Err(e) => writeln!(out, "Error: {}", e)?,
            },
            "scan" => match router.scan_documents().await {
                Ok(added) => writeln!(out, "Added {} new document(s)", added)?,
                Err(e) => writeln!(out, "Error: {}", e)?,
            },
            _ => match super::resolve(router, line, ResolveOptions::default(), timeout).await {
                Ok(result) => {
                    writeln!(out, "{}", result.answer)?;
                    writeln!(out, "{}", super::provenance(&result))?;
                }
                Err(e) => writeln!(out, "Error: {}", e)?,
            },
        }
    }

    writeln!(out, "Goodbye")?;
    Ok(())
}
