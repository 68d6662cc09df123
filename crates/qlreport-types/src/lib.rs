//! Data types (decoded results, SARIF subset, result index, config) for qlreport.
//!
//! This crate is intentionally "dumb": pure DTOs with serde + schemars.

use std::collections::{BTreeMap, BTreeSet};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

// ── Frozen Vocabulary ──────────────────────────────────────────
/// Name of the result set a query's `select` clause produces.
pub const SELECT_RESULT_SET: &str = "#select";

/// Ref used for blob links when the analyzed ref is unknown.
pub const DEFAULT_GIT_REF: &str = "HEAD";

/// Suffix the query runner appends to artifacts of failed repositories.
pub const FAILURE_ARTIFACT_SUFFIX: &str = "-error";

// Artifact file names
pub const ARTIFACT_NWO_FILE: &str = "nwo.txt";
pub const ARTIFACT_SHA_FILE: &str = "sha.txt";
pub const ARTIFACT_RESULT_COUNT_FILE: &str = "resultcount.txt";
pub const ARTIFACT_BQRS_FILE: &str = "results.bqrs";
pub const ARTIFACT_SARIF_FILE: &str = "results.sarif";
pub const ARTIFACT_MARKDOWN_FILE: &str = "results.md";
pub const ARTIFACT_ERROR_FILE: &str = "error.txt";

// ── Limits ─────────────────────────────────────────────────────
/// Character budget for one rendered document.
pub const DEFAULT_MAX_CHARS: usize = 64_000;

/// Hard limit of the hosting platform for a single comment body.
pub const PLATFORM_MAX_CHARS: usize = 65_536;

/// Number of repositories that get an external post in a summary.
pub const DEFAULT_MAX_PROMOTED: usize = 50;

/// Delay between two external posts.
pub const DEFAULT_PACING_MS: u64 = 1_000;

// ── Decoded result sets ────────────────────────────────────────

/// Source range an entity points at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct EntityUrl {
    pub uri: String,
    pub start_line: u32,
    #[serde(default)]
    pub start_column: u32,
    #[serde(default)]
    pub end_line: u32,
    #[serde(default)]
    pub end_column: u32,
}

/// A source-code reference inside a result tuple.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Entity {
    pub id: i64,
    pub label: String,
    /// Absent for entities without a location (e.g. synthesized values).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<EntityUrl>,
}

/// One element of a result tuple.
///
/// Variant order matters for untagged deserialization: objects are tried as
/// entities first, integers before floats.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum Cell {
    Entity(Entity),
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
}

impl Cell {
    pub fn as_entity(&self) -> Option<&Entity> {
        match self {
            Cell::Entity(e) => Some(e),
            _ => None,
        }
    }
}

impl From<Entity> for Cell {
    fn from(e: Entity) -> Self {
        Cell::Entity(e)
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::String(s.to_string())
    }
}

impl From<String> for Cell {
    fn from(s: String) -> Self {
        Cell::String(s)
    }
}

impl From<i64> for Cell {
    fn from(n: i64) -> Self {
        Cell::Integer(n)
    }
}

impl From<bool> for Cell {
    fn from(b: bool) -> Self {
        Cell::Boolean(b)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Column {
    /// Absent for anonymous select expressions; rendered as `-`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ResultSet {
    /// Filled from the container key when read through [`DecodedResults`].
    #[serde(default)]
    pub name: String,
    pub columns: Vec<Column>,
    #[serde(default)]
    pub tuples: Vec<Vec<Cell>>,
}

/// Decoder output: result sets keyed by name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct DecodedResults(pub BTreeMap<String, ResultSet>);

impl DecodedResults {
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Removes the named result set, stamping the container key as its name.
    pub fn take(&mut self, name: &str) -> Option<ResultSet> {
        self.0.remove(name).map(|mut rs| {
            rs.name = name.to_string();
            rs
        })
    }
}

// ── Query metadata & kinds ─────────────────────────────────────

/// Subset of `resolve metadata` output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct QueryMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Semantic shape of a query, in its lowercase metadata spelling.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum QueryKind {
    Problem,
    PathProblem,
    Table,
    Diagnostic,
    /// Any other kind, kept verbatim.
    Other(String),
}

impl QueryKind {
    /// Parses an already alias-normalized metadata kind (`path-problem`, `table`, ...).
    pub fn parse(kind: &str) -> Self {
        match kind {
            "problem" => QueryKind::Problem,
            "path-problem" => QueryKind::PathProblem,
            "table" => QueryKind::Table,
            "diagnostic" => QueryKind::Diagnostic,
            other => QueryKind::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            QueryKind::Problem => "problem",
            QueryKind::PathProblem => "path-problem",
            QueryKind::Table => "table",
            QueryKind::Diagnostic => "diagnostic",
            QueryKind::Other(s) => s,
        }
    }

    /// The capitalized tag used in compatible-kind sets (`path-problem` -> `PathProblem`).
    pub fn compatible_tag(&self) -> String {
        self.as_str()
            .split('-')
            .filter(|part| !part.is_empty())
            .map(|part| {
                let mut chars = part.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                    None => String::new(),
                }
            })
            .collect()
    }

    /// Problem-style kinds render as two-column alert tables and have SARIF output.
    pub fn is_alert(&self) -> bool {
        matches!(self, QueryKind::Problem | QueryKind::PathProblem)
    }
}

impl std::fmt::Display for QueryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// Compatible-kind tags as reported by `bqrs info`.
pub const KIND_TAG_PROBLEM: &str = "Problem";
pub const KIND_TAG_PATH_PROBLEM: &str = "PathProblem";
pub const KIND_TAG_TABLE: &str = "Table";
pub const KIND_TAG_DIAGNOSTIC: &str = "Diagnostic";

/// Output shapes a decoded result admits.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct CompatibleQueryKinds(pub BTreeSet<String>);

impl CompatibleQueryKinds {
    pub fn contains_tag(&self, tag: &str) -> bool {
        self.0.contains(tag)
    }

    pub fn supports(&self, kind: &QueryKind) -> bool {
        self.contains_tag(&kind.compatible_tag())
    }

    /// True when the result can be shown as (location, message) alerts.
    pub fn admits_alerts(&self) -> bool {
        self.contains_tag(KIND_TAG_PROBLEM) || self.contains_tag(KIND_TAG_PATH_PROBLEM)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for CompatibleQueryKinds {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// Row count of one result set in `bqrs info` output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct BqrsResultSetInfo {
    pub name: String,
    pub rows: u64,
}

/// Subset of `bqrs info --format=json` output. Accepts kebab-case and camelCase keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct BqrsInfo {
    #[serde(rename = "result-sets", alias = "resultSets", default)]
    pub result_sets: Vec<BqrsResultSetInfo>,
    #[serde(
        rename = "compatible-query-kinds",
        alias = "compatibleQueryKinds",
        default
    )]
    pub compatible_query_kinds: CompatibleQueryKinds,
}

// ── SARIF subset ───────────────────────────────────────────────
//
// Only the pieces qlreport reads or writes are typed; everything else is
// carried through untouched in `extra`.

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Sarif {
    #[serde(default)]
    pub runs: Vec<SarifRun>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SarifRun {
    #[serde(default)]
    pub results: Vec<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_control_provenance: Option<Vec<VersionControlDetails>>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionControlDetails {
    pub repository_uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision_id: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

// ── Result index ───────────────────────────────────────────────

/// One successfully analyzed repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ResultIndexItem {
    pub nwo: String,
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha: Option<String>,
    pub results_count: u64,
    pub artifact_size_bytes: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sarif_size_bytes: Option<u64>,
}

/// One repository whose analysis (or artifact) failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct FailureIndexItem {
    pub nwo: String,
    pub id: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ResultIndex {
    pub successes: Vec<ResultIndexItem>,
    #[serde(default)]
    pub failures: Vec<FailureIndexItem>,
}

/// Per-repository run summary written next to the rendered outputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct QueryRunMetadata {
    pub nwo: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_location_prefix: Option<String>,
}

// ── Configuration ──────────────────────────────────────────────

/// What to do when one repository's artifact cannot be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ReadErrorPolicy {
    /// Fail the whole aggregation pass.
    Abort,
    /// Record the repository as a failure and continue.
    Skip,
}

impl ReadErrorPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            ReadErrorPolicy::Abort => "abort",
            ReadErrorPolicy::Skip => "skip",
        }
    }
}

/// The on-disk configuration file (`qlreport.toml`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ConfigFile {
    #[serde(default)]
    pub defaults: Defaults,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Defaults {
    /// Character budget for one rendered document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_chars: Option<usize>,

    /// Repositories that get an external post in the summary.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_promoted: Option<usize>,

    /// Delay between external posts, in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pacing_ms: Option<u64>,

    /// Ref used in blob links. `HEAD` when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git_ref: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_read_error: Option<ReadErrorPolicy>,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            max_chars: Some(DEFAULT_MAX_CHARS),
            max_promoted: Some(DEFAULT_MAX_PROMOTED),
            pacing_ms: Some(DEFAULT_PACING_MS),
            git_ref: None,
            on_read_error: Some(ReadErrorPolicy::Abort),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_deserializes_each_variant() {
        let json = r#"[
            {"id": 7, "label": "x", "url": {"uri": "file:/a.go", "startLine": 1, "startColumn": 2, "endLine": 1, "endColumn": 9}},
            "text",
            42,
            1.5,
            true
        ]"#;
        let cells: Vec<Cell> = serde_json::from_str(json).unwrap();
        assert!(matches!(cells[0], Cell::Entity(_)));
        assert_eq!(cells[1], Cell::String("text".to_string()));
        assert_eq!(cells[2], Cell::Integer(42));
        assert_eq!(cells[3], Cell::Float(1.5));
        assert_eq!(cells[4], Cell::Boolean(true));
    }

    #[test]
    fn entity_without_url_is_still_an_entity() {
        let cell: Cell = serde_json::from_str(r#"{"id": 1, "label": "synthetic"}"#).unwrap();
        let entity = cell.as_entity().expect("entity");
        assert_eq!(entity.label, "synthetic");
        assert!(entity.url.is_none());
    }

    #[test]
    fn decoded_results_take_stamps_name() {
        let json = r##"{"#select": {"columns": [{"kind": "String"}], "tuples": [["a"]]}}"##;
        let mut decoded: DecodedResults = serde_json::from_str(json).unwrap();
        let rs = decoded.take(SELECT_RESULT_SET).expect("select");
        assert_eq!(rs.name, "#select");
        assert_eq!(rs.columns[0].name, None);
        assert!(decoded.take(SELECT_RESULT_SET).is_none());
    }

    #[test]
    fn query_kind_compatible_tag_is_pascal_case() {
        assert_eq!(QueryKind::Problem.compatible_tag(), "Problem");
        assert_eq!(QueryKind::PathProblem.compatible_tag(), "PathProblem");
        assert_eq!(QueryKind::Table.compatible_tag(), "Table");
        assert_eq!(
            QueryKind::Other("metric-table".to_string()).compatible_tag(),
            "MetricTable"
        );
    }

    #[test]
    fn query_kind_parse_round_trips_known_kinds() {
        for kind in ["problem", "path-problem", "table", "diagnostic", "graph"] {
            assert_eq!(QueryKind::parse(kind).as_str(), kind);
        }
        assert!(QueryKind::parse("path-problem").is_alert());
        assert!(!QueryKind::parse("table").is_alert());
    }

    #[test]
    fn bqrs_info_accepts_kebab_and_camel_keys() {
        let kebab = r##"{"result-sets": [{"name": "#select", "rows": 3}], "compatible-query-kinds": ["Table", "Problem"]}"##;
        let camel = r##"{"resultSets": [{"name": "#select", "rows": 3}], "compatibleQueryKinds": ["Table", "Problem"]}"##;
        let a: BqrsInfo = serde_json::from_str(kebab).unwrap();
        let b: BqrsInfo = serde_json::from_str(camel).unwrap();
        assert_eq!(a, b);
        assert!(a.compatible_query_kinds.admits_alerts());
        assert!(a.compatible_query_kinds.supports(&QueryKind::Table));
    }

    #[test]
    fn sarif_round_trip_preserves_unknown_fields() {
        let json = r#"{
            "version": "2.1.0",
            "runs": [{"tool": {"driver": {"name": "x"}}, "results": [{"ruleId": "r"}]}]
        }"#;
        let sarif: Sarif = serde_json::from_str(json).unwrap();
        assert_eq!(sarif.runs[0].results.len(), 1);
        let back = serde_json::to_value(&sarif).unwrap();
        assert_eq!(back["version"], "2.1.0");
        assert_eq!(back["runs"][0]["tool"]["driver"]["name"], "x");
        assert!(back["runs"][0].get("versionControlProvenance").is_none());
    }

    #[test]
    fn query_run_metadata_serializes_camel_case() {
        let meta = QueryRunMetadata {
            nwo: "o/r".to_string(),
            result_count: Some(3),
            sha: None,
            source_location_prefix: Some("/src".to_string()),
        };
        let json = serde_json::to_string(&meta).unwrap();
        assert_eq!(
            json,
            r#"{"nwo":"o/r","resultCount":3,"sourceLocationPrefix":"/src"}"#
        );
    }

    #[test]
    fn config_defaults_parse_from_toml() {
        let cfg: ConfigFile = toml::from_str(
            r#"
[defaults]
max_chars = 1000
on_read_error = "skip"
"#,
        )
        .unwrap();
        assert_eq!(cfg.defaults.max_chars, Some(1000));
        assert_eq!(cfg.defaults.on_read_error, Some(ReadErrorPolicy::Skip));
        assert_eq!(cfg.defaults.max_promoted, None);
    }
}
