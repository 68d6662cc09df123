//! Ranking per-repository outcomes and publishing them under a post cap.

use std::future::Future;
use std::time::Duration;

use qlreport_types::{
    DEFAULT_MAX_PROMOTED, DEFAULT_PACING_MS, FailureIndexItem, ResultIndex, ResultIndexItem,
};

use crate::entity::escape_cell;

/// Orders items by `results_count`, highest first. Ties keep input order.
pub fn build_result_index(mut items: Vec<ResultIndexItem>) -> Vec<ResultIndexItem> {
    // `sort_by` is stable.
    items.sort_by(|a, b| b.results_count.cmp(&a.results_count));
    items
}

/// Ranks the successes of `index` in place; failures keep their order.
pub fn rank_result_index(index: ResultIndex) -> ResultIndex {
    ResultIndex {
        successes: build_result_index(index.successes),
        failures: index.failures,
    }
}

/// The external side effect performed for each promoted repository.
///
/// Returns the link the summary should point at.
pub trait ResultPublisher {
    type Error: std::error::Error + Send + Sync + 'static;

    fn publish(
        &mut self,
        item: &ResultIndexItem,
    ) -> impl Future<Output = Result<String, Self::Error>>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishOptions {
    pub max_promoted: usize,
    /// Delay between two posts.
    pub pacing: Duration,
}

impl Default for PublishOptions {
    fn default() -> Self {
        Self {
            max_promoted: DEFAULT_MAX_PROMOTED,
            pacing: Duration::from_millis(DEFAULT_PACING_MS),
        }
    }
}

/// One row of the summary table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SummaryLine {
    NoResults {
        nwo: String,
    },
    Promoted {
        nwo: String,
        results_count: u64,
        link: String,
    },
    /// Had results, but the post cap was already used up.
    Inline {
        nwo: String,
        results_count: u64,
    },
}

impl SummaryLine {
    pub fn nwo(&self) -> &str {
        match self {
            SummaryLine::NoResults { nwo }
            | SummaryLine::Promoted { nwo, .. }
            | SummaryLine::Inline { nwo, .. } => nwo,
        }
    }

    pub fn to_markdown(&self) -> String {
        let repo = escape_cell(self.nwo());
        match self {
            SummaryLine::NoResults { .. } => format!("| {repo} | _No results_ |\n"),
            SummaryLine::Promoted {
                results_count,
                link,
                ..
            } => format!("| {repo} | [{results_count} result(s)]({link}) |\n"),
            SummaryLine::Inline { results_count, .. } => {
                format!("| {repo} | {results_count} result(s) |\n")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishReport {
    pub lines: Vec<SummaryLine>,
    pub promoted: usize,
    /// A repository with results was denied a post because of the cap.
    pub cap_reached: bool,
    pub max_promoted: usize,
}

#[derive(Debug, thiserror::Error)]
#[error("failed to publish results for {nwo}")]
pub struct PublishError<E: std::error::Error + 'static> {
    pub nwo: String,
    #[source]
    pub source: E,
}

/// Walks `items` in order, posting each repository with results until the cap
/// is used up.
///
/// Posts happen one at a time with `options.pacing` between consecutive posts.
/// A publisher error stops the pass.
pub async fn publish_results<P>(
    items: &[ResultIndexItem],
    publisher: &mut P,
    options: &PublishOptions,
) -> Result<PublishReport, PublishError<P::Error>>
where
    P: ResultPublisher,
{
    let mut lines = Vec::with_capacity(items.len());
    let mut promoted = 0usize;
    let mut cap_reached = false;

    for item in items {
        if item.results_count == 0 {
            lines.push(SummaryLine::NoResults {
                nwo: item.nwo.clone(),
            });
            continue;
        }

        if promoted >= options.max_promoted {
            cap_reached = true;
            lines.push(SummaryLine::Inline {
                nwo: item.nwo.clone(),
                results_count: item.results_count,
            });
            continue;
        }

        if promoted > 0 && !options.pacing.is_zero() {
            tokio::time::sleep(options.pacing).await;
        }

        let link = publisher
            .publish(item)
            .await
            .map_err(|source| PublishError {
                nwo: item.nwo.clone(),
                source,
            })?;
        promoted += 1;

        lines.push(SummaryLine::Promoted {
            nwo: item.nwo.clone(),
            results_count: item.results_count,
            link,
        });
    }

    Ok(PublishReport {
        lines,
        promoted,
        cap_reached,
        max_promoted: options.max_promoted,
    })
}

/// The final summary document.
pub fn render_summary_markdown(
    report: &PublishReport,
    query: Option<&str>,
    failures: &[FailureIndexItem],
) -> String {
    let mut out = String::new();

    if report.cap_reached {
        out.push_str(&format!(
            "> **Note:** only the first {} repositories with results were posted individually; the rest show their result count inline.\n\n",
            report.max_promoted
        ));
    }

    if let Some(query) = query {
        out.push_str("# Query\n<details>\n  <summary>Click to expand</summary>\n\n```ql\n");
        out.push_str(query.trim_end());
        out.push_str("\n```\n</details>\n\n");
    }

    out.push_str("# Results\n\n|Repository|Results|\n|---|---|\n");
    for line in &report.lines {
        out.push_str(&line.to_markdown());
    }

    if !failures.is_empty() {
        out.push_str("\n# Failures\n\n|Repository|Error|\n|---|---|\n");
        for failure in failures {
            out.push_str(&format!(
                "| {} | {} |\n",
                escape_cell(&failure.nwo),
                escape_cell(&failure.error)
            ));
        }
    }

    out
}
