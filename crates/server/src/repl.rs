use anyhow::Result;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::inference::SqlGenerator;

const PROMPT: &str = "Enter your question: ";

pub fn is_exit_command(line: &str) -> bool {
    matches!(
        line.trim().to_lowercase().as_str(),
        "exit" | "quit" | "bye"
    )
}

/// Reads questions line by line and prints the generated SQL until an exit
/// word or end of input.
pub async fn run<R, W>(generator: &SqlGenerator, input: R, mut output: W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();

    loop {
        output.write_all(PROMPT.as_bytes()).await?;
        output.flush().await?;

        let Some(line) = lines.next_line().await? else {
            output.write_all(b"\n").await?;
            break;
        };
        if is_exit_command(&line) {
            break;
        }

        let reply = match generator.generate_sql_query(&line).await {
            Ok(sql) => format!("SQL Query:\n{sql}\n"),
            Err(e) => format!("Error: {e}\n"),
        };
        output.write_all(reply.as_bytes()).await?;
    }

    output.flush().await?;
    Ok(())
}
