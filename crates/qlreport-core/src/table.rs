//! Markdown table rendering for one result set.
//!
//! Rows are produced lazily, one per tuple, so the writer can interleave budget
//! checks without the whole table ever being materialized.

use std::slice;

use qlreport_types::{Cell, CompatibleQueryKinds, ResultSet};

use crate::entity::{LinkContext, escape_cell, resolve_cell};
use crate::message::compose_message;

/// Header label for an unnamed column (and the alert location column).
pub const ANONYMOUS_COLUMN: &str = "-";

const ALERT_MESSAGE_COLUMN: &str = "Message";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    /// Two columns: location and composed message.
    Alert,
    /// One column per result-set column.
    Raw,
}

impl RenderMode {
    /// Alert mode whenever the result admits a problem-style rendering.
    pub fn select(compatible: &CompatibleQueryKinds) -> Self {
        if compatible.admits_alerts() {
            RenderMode::Alert
        } else {
            RenderMode::Raw
        }
    }
}

/// A rendered header plus the pending body rows.
#[derive(Debug)]
pub struct TableRender<'a> {
    pub mode: RenderMode,
    pub header: Vec<String>,
    pub rows: TableRows<'a>,
}

/// Single-pass iterator over formatted body rows.
#[derive(Debug, Clone)]
pub struct TableRows<'a> {
    tuples: slice::Iter<'a, Vec<Cell>>,
    mode: RenderMode,
    ctx: &'a LinkContext,
}

impl Iterator for TableRows<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        let tuple = self.tuples.next()?;
        Some(match self.mode {
            RenderMode::Alert => render_alert_row(tuple, self.ctx),
            RenderMode::Raw => render_raw_row(tuple, self.ctx),
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.tuples.size_hint()
    }
}

impl ExactSizeIterator for TableRows<'_> {}

pub fn render_table<'a>(
    result_set: &'a ResultSet,
    compatible: &CompatibleQueryKinds,
    ctx: &'a LinkContext,
) -> TableRender<'a> {
    let mode = RenderMode::select(compatible);

    let header = match mode {
        RenderMode::Alert => vec![
            ANONYMOUS_COLUMN.to_string(),
            ALERT_MESSAGE_COLUMN.to_string(),
        ],
        RenderMode::Raw => result_set
            .columns
            .iter()
            .map(|c| c.name.clone().unwrap_or_else(|| ANONYMOUS_COLUMN.to_string()))
            .collect(),
    };

    TableRender {
        mode,
        header,
        rows: TableRows {
            tuples: result_set.tuples.iter(),
            mode,
            ctx,
        },
    }
}

/// `| a | b |\n`, with each cell escaped for table syntax.
pub fn format_row<S: AsRef<str>>(cells: &[S]) -> String {
    let escaped: Vec<_> = cells.iter().map(|c| escape_cell(c.as_ref())).collect();
    format!("| {} |\n", escaped.join(" | "))
}

/// The dashes row that follows the header.
pub fn separator_row(columns: usize) -> String {
    format_row(&vec!["---"; columns.max(1)])
}

fn render_alert_row(tuple: &[Cell], ctx: &LinkContext) -> String {
    let location = tuple
        .first()
        .map(|c| resolve_cell(c, ctx))
        .unwrap_or_default();
    let message = compose_message(tuple, ctx);
    format_row(&[location, message])
}

fn render_raw_row(tuple: &[Cell], ctx: &LinkContext) -> String {
    let cells: Vec<String> = tuple.iter().map(|c| resolve_cell(c, ctx)).collect();
    format_row(&cells)
}
