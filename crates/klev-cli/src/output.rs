//! Output renderers for CLI commands.
//!
//! Results go to standard output as indented JSON; errors go to standard error,
//! as indented JSON when the service returned a structured error document.

use std::io::{self, Write};

use anyhow::anyhow;
use serde::Serialize;

use crate::client::{CliError, CliResult};

/// Write `value` as one indented JSON document followed by a newline.
pub(crate) fn write_json<W, T>(writer: &mut W, value: &T) -> CliResult<()>
where
    W: Write + ?Sized,
    T: Serialize + ?Sized,
{
    let text = serde_json::to_string_pretty(value)
        .map_err(|err| CliError::failure(anyhow!("failed to format JSON: {err}")))?;
    writeln!(writer, "{text}")
        .and_then(|()| writer.flush())
        .map_err(|err| CliError::failure(anyhow!("failed to write output: {err}")))
}

/// Render a command result to standard output.
pub(crate) fn render_json<T: Serialize + ?Sized>(value: &T) -> CliResult<()> {
    write_json(&mut io::stdout().lock(), value)
}

/// Render a command failure to `writer`.
pub(crate) fn write_error<W: Write + ?Sized>(writer: &mut W, error: &CliError) -> io::Result<()> {
    match error {
        CliError::Remote { error, .. } => {
            let text = serde_json::to_string_pretty(error).map_err(io::Error::other)?;
            writeln!(writer, "{text}")
        }
        other => writeln!(writer, "error: {}", other.display_message()),
    }
}

/// Render a command failure to standard error.
pub(crate) fn render_error(error: &CliError) {
    let mut stderr = io::stderr().lock();
    if let Err(err) = write_error(&mut stderr, error) {
        tracing::debug!(error = %err, "failed to write error to stderr");
    }
}
