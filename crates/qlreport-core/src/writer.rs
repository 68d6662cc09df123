//! Budgeted streaming of a rendered table into an async sink.
//!
//! Backpressure comes from the sink itself: `write_all` suspends while the sink
//! is not ready and resumes once it drains. The sink is always shut down (and
//! thereby flushed) before returning, truncated or not.

use std::io;

use qlreport_types::{CompatibleQueryKinds, PLATFORM_MAX_CHARS, ResultSet};
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::entity::LinkContext;
use crate::table::{format_row, render_table, separator_row};

/// Written instead of the table when even its header does not fit.
pub const TABLE_TOO_LARGE_NOTICE: &str =
    "The results table is too large to display within the size limit.\n";

/// Written once, after the last row that fit.
pub const TRUNCATION_NOTICE: &str =
    "\n_This table has been truncated because it exceeded the size limit._\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WriteOutcome {
    /// Body rows written (header and separator excluded).
    pub rows_written: usize,
    /// Characters written, notices included.
    pub chars_written: usize,
    pub truncated: bool,
}

/// Streams header, separator and as many rows as fit into `sink`.
///
/// Header and separator are checked against `budget` together; if they do not
/// fit, only [`TABLE_TOO_LARGE_NOTICE`] is written. Body rows are admitted while
/// their running total stays within `budget` and the whole document, notice
/// included, stays within [`PLATFORM_MAX_CHARS`]. The first row that fails
/// either check is replaced by [`TRUNCATION_NOTICE`] and no further rows are
/// pulled.
pub async fn write_bounded_table<W, I>(
    sink: &mut W,
    header: &[String],
    rows: I,
    budget: usize,
) -> io::Result<WriteOutcome>
where
    W: AsyncWrite + Unpin,
    I: IntoIterator<Item = String>,
{
    let mut outcome = WriteOutcome::default();

    let header_row = format_row(header);
    let separator = separator_row(header.len());
    let header_chars = char_len(&header_row) + char_len(&separator);
    let notice_chars = char_len(TRUNCATION_NOTICE);

    if header_chars > budget || header_chars + notice_chars > PLATFORM_MAX_CHARS {
        write_chunk(sink, TABLE_TOO_LARGE_NOTICE, &mut outcome).await?;
        outcome.truncated = true;
        sink.shutdown().await?;
        return Ok(outcome);
    }

    write_chunk(sink, &header_row, &mut outcome).await?;
    write_chunk(sink, &separator, &mut outcome).await?;

    let mut body_chars = 0usize;
    for row in rows {
        let row_chars = char_len(&row);
        let document_chars = header_chars + body_chars + row_chars + notice_chars;
        if body_chars + row_chars > budget || document_chars > PLATFORM_MAX_CHARS {
            write_chunk(sink, TRUNCATION_NOTICE, &mut outcome).await?;
            outcome.truncated = true;
            break;
        }
        write_chunk(sink, &row, &mut outcome).await?;
        body_chars += row_chars;
        outcome.rows_written += 1;
    }

    sink.shutdown().await?;
    Ok(outcome)
}

/// Renders `result_set` and streams it into `sink` under `budget`.
pub async fn write_result_set<W>(
    sink: &mut W,
    result_set: &ResultSet,
    compatible: &CompatibleQueryKinds,
    ctx: &LinkContext,
    budget: usize,
) -> io::Result<WriteOutcome>
where
    W: AsyncWrite + Unpin,
{
    let render = render_table(result_set, compatible, ctx);
    write_bounded_table(sink, &render.header, render.rows, budget).await
}

/// A finished in-memory rendering: Markdown lines plus the truncation flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDocument {
    pub lines: Vec<String>,
    pub truncated: bool,
}

impl RenderedDocument {
    pub fn text(&self) -> String {
        let mut out = String::new();
        for line in &self.lines {
            out.push_str(line);
            out.push('\n');
        }
        out
    }
}

/// Renders `result_set` into a fresh [`RenderedDocument`].
pub async fn render_document(
    result_set: &ResultSet,
    compatible: &CompatibleQueryKinds,
    ctx: &LinkContext,
    budget: usize,
) -> io::Result<RenderedDocument> {
    let mut buf: Vec<u8> = Vec::new();
    let outcome = write_result_set(&mut buf, result_set, compatible, ctx, budget).await?;
    let text =
        String::from_utf8(buf).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

    Ok(RenderedDocument {
        lines: text.lines().map(str::to_string).collect(),
        truncated: outcome.truncated,
    })
}

async fn write_chunk<W>(sink: &mut W, chunk: &str, outcome: &mut WriteOutcome) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    sink.write_all(chunk.as_bytes()).await?;
    outcome.chars_written += char_len(chunk);
    Ok(())
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}
