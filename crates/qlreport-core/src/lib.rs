//! Core engine: result rendering, bounded writing, SARIF classification and aggregation.

mod aggregate;
mod artifacts;
mod entity;
mod message;
mod sarif;
mod table;
mod writer;

pub use aggregate::{
    PublishError, PublishOptions, PublishReport, ResultPublisher, SummaryLine,
    build_result_index, publish_results, rank_result_index, render_summary_markdown,
};
pub use artifacts::{
    ArtifactDir, ArtifactError, collect_result_index, error_chain, list_artifacts,
    read_failure_artifact, read_success_artifact,
};
pub use entity::{LinkContext, escape_cell, normalize_source_prefix, resolve_cell};
pub use message::{PLACEHOLDER, compose_message};
pub use sarif::{
    BqrsCountError, QUERY_KIND_ALIASES, bqrs_result_count, classify_output_kind,
    inject_version_control_provenance, normalize_query_kind, resolve_result_count,
    sarif_output_kind, sarif_result_count,
};
pub use table::{
    ANONYMOUS_COLUMN, RenderMode, TableRender, TableRows, format_row, render_table,
    separator_row,
};
pub use writer::{
    RenderedDocument, TABLE_TOO_LARGE_NOTICE, TRUNCATION_NOTICE, WriteOutcome, render_document,
    write_bounded_table, write_result_set,
};
