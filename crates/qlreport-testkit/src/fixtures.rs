//! Common test fixtures for qlreport.
//!
//! Decoder output, `bqrs info` output, SARIF and query metadata as they come
//! out of the query tool, plus helpers that lay out artifact directories.

// =============================================================================
// Sample query outputs
// =============================================================================

/// JSON documents shaped like the query tool's output.
pub mod sample_results {
    use qlreport_types::{BqrsInfo, DecodedResults, QueryMetadata, Sarif};

    pub const NWO: &str = "dsp-testing/qc-demo-github-certstore";
    pub const SOURCE_ROOT: &str =
        "/home/runner/work/qc-demo-github-certstore/qc-demo-github-certstore";

    /// A problem query's `#select` with one alert and one placeholder.
    pub const ALERT_RESULTS_JSON: &str = r##"{
  "#select": {
    "columns": [
      {"name": "c", "kind": "Entity"},
      {"kind": "String"},
      {"name": "f", "kind": "Entity"},
      {"kind": "String"}
    ],
    "tuples": [
      [
        {"id": 7661, "label": "call to Close", "url": {"uri": "file:/home/runner/work/qc-demo-github-certstore/qc-demo-github-certstore/certstore_linux.go", "startLine": 8, "startColumn": 2, "endLine": 8, "endColumn": 31}},
        "Result of $@ is ignored.",
        {"id": 812, "label": "Close", "url": {"uri": "file:/home/runner/work/qc-demo-github-certstore/qc-demo-github-certstore/certstore.go", "startLine": 40, "startColumn": 6, "endLine": 40, "endColumn": 10}},
        "Close"
      ],
      [
        {"id": 7702, "label": "call to Open", "url": {"uri": "file:/home/runner/work/qc-demo-github-certstore/qc-demo-github-certstore/main.go", "startLine": 21, "startColumn": 9, "endLine": 21, "endColumn": 20}},
        "Unchecked call | no handler",
        {"id": 1, "label": "unused", "url": {"uri": "file:/usr/lib/go/src/os/file.go", "startLine": 300, "startColumn": 1, "endLine": 300, "endColumn": 4}},
        "unused"
      ]
    ]
  }
}"##;

    /// A table query with an anonymous column and a non-`#select` set.
    pub const TABLE_RESULTS_JSON: &str = r##"{
  "#select": {
    "columns": [
      {"name": "fn", "kind": "Entity"},
      {"kind": "Integer"},
      {"name": "exported", "kind": "Boolean"}
    ],
    "tuples": [
      [{"id": 1, "label": "Open", "url": {"uri": "file:/home/runner/work/qc-demo-github-certstore/qc-demo-github-certstore/certstore.go", "startLine": 12, "startColumn": 6, "endLine": 12, "endColumn": 9}}, 3, true],
      [{"id": 2, "label": "helper"}, 1, false]
    ]
  },
  "edges": {
    "columns": [{"kind": "Entity"}, {"kind": "Entity"}],
    "tuples": []
  }
}"##;

    pub const PROBLEM_BQRS_INFO_JSON: &str = r##"{
  "resultSets": [
    {"name": "#select", "rows": 2}
  ],
  "compatibleQueryKinds": ["Problem", "Table"]
}"##;

    pub const TABLE_BQRS_INFO_JSON: &str = r##"{
  "result-sets": [
    {"name": "#select", "rows": 2},
    {"name": "edges", "rows": 0}
  ],
  "compatible-query-kinds": ["Table"]
}"##;

    pub const PROBLEM_METADATA_JSON: &str = r#"{
  "kind": "problem",
  "id": "go/unchecked-close",
  "name": "Unchecked close"
}"#;

    pub const LEGACY_ALERT_METADATA_JSON: &str = r#"{"kind": "alert"}"#;

    pub const SARIF_JSON: &str = r#"{
  "$schema": "https://json.schemastore.org/sarif-2.1.0.json",
  "version": "2.1.0",
  "runs": [
    {
      "tool": {"driver": {"name": "CodeQL", "rules": []}},
      "results": [
        {"ruleId": "go/unchecked-close", "message": {"text": "Result of Close is ignored."}},
        {"ruleId": "go/unchecked-close", "message": {"text": "Unchecked call"}}
      ]
    }
  ]
}"#;

    pub fn alert_results() -> DecodedResults {
        serde_json::from_str(ALERT_RESULTS_JSON).expect("alert fixture parses")
    }

    pub fn table_results() -> DecodedResults {
        serde_json::from_str(TABLE_RESULTS_JSON).expect("table fixture parses")
    }

    pub fn problem_bqrs_info() -> BqrsInfo {
        serde_json::from_str(PROBLEM_BQRS_INFO_JSON).expect("bqrs info fixture parses")
    }

    pub fn table_bqrs_info() -> BqrsInfo {
        serde_json::from_str(TABLE_BQRS_INFO_JSON).expect("bqrs info fixture parses")
    }

    pub fn problem_metadata() -> QueryMetadata {
        serde_json::from_str(PROBLEM_METADATA_JSON).expect("metadata fixture parses")
    }

    pub fn sarif() -> Sarif {
        serde_json::from_str(SARIF_JSON).expect("sarif fixture parses")
    }
}

// =============================================================================
// Artifact directories
// =============================================================================

/// Writers for downloaded artifact directories.
pub mod sample_artifacts {
    use std::fs;
    use std::io;
    use std::path::{Path, PathBuf};

    use qlreport_types::{
        ARTIFACT_BQRS_FILE, ARTIFACT_ERROR_FILE, ARTIFACT_MARKDOWN_FILE, ARTIFACT_NWO_FILE,
        ARTIFACT_RESULT_COUNT_FILE, ARTIFACT_SARIF_FILE, ARTIFACT_SHA_FILE,
        FAILURE_ARTIFACT_SUFFIX,
    };

    /// Artifact directory name for a repository (`owner/repo` -> `owner#repo`).
    pub fn artifact_name(nwo: &str) -> String {
        nwo.replacen('/', "#", 1)
    }

    /// A success artifact with a rendered `results.md`.
    pub fn write_success(
        root: &Path,
        nwo: &str,
        results_count: u64,
        sha: Option<&str>,
    ) -> io::Result<PathBuf> {
        let dir = root.join(artifact_name(nwo));
        fs::create_dir_all(&dir)?;
        fs::write(dir.join(ARTIFACT_NWO_FILE), format!("{nwo}\n"))?;
        fs::write(
            dir.join(ARTIFACT_RESULT_COUNT_FILE),
            format!("{results_count}\n"),
        )?;
        fs::write(dir.join(ARTIFACT_BQRS_FILE), vec![0u8; 64])?;
        fs::write(
            dir.join(ARTIFACT_MARKDOWN_FILE),
            format!("| - | Message |\n| --- | --- |\n| {nwo} | {results_count} |\n"),
        )?;
        if let Some(sha) = sha {
            fs::write(dir.join(ARTIFACT_SHA_FILE), format!("{sha}\n"))?;
        }
        Ok(dir)
    }

    /// Adds a `results.sarif` of `bytes` bytes to an existing artifact.
    pub fn add_sarif(dir: &Path, bytes: usize) -> io::Result<()> {
        fs::write(dir.join(ARTIFACT_SARIF_FILE), vec![b' '; bytes])
    }

    pub fn write_failure(root: &Path, nwo: &str, error: &str) -> io::Result<PathBuf> {
        let dir = root.join(format!("{}{}", artifact_name(nwo), FAILURE_ARTIFACT_SUFFIX));
        fs::create_dir_all(&dir)?;
        fs::write(dir.join(ARTIFACT_NWO_FILE), nwo)?;
        fs::write(dir.join(ARTIFACT_ERROR_FILE), format!("{error}\n"))?;
        Ok(dir)
    }
}
