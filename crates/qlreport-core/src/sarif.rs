//! Output-kind classification, result counting and provenance injection.

use std::collections::BTreeMap;

use qlreport_types::{
    BqrsInfo, CompatibleQueryKinds, QueryKind, QueryMetadata, SELECT_RESULT_SET, Sarif,
    VersionControlDetails,
};

/// Legacy metadata kinds and the kind they stand for.
pub const QUERY_KIND_ALIASES: &[(&str, &str)] =
    &[("alert", "problem"), ("path-alert", "path-problem")];

#[derive(Debug, thiserror::Error)]
pub enum BqrsCountError {
    #[error("no result set named #select")]
    MissingSelect,
}

/// Resolves a metadata kind through [`QUERY_KIND_ALIASES`].
pub fn normalize_query_kind(kind: &str) -> QueryKind {
    let canonical = QUERY_KIND_ALIASES
        .iter()
        .find(|(alias, _)| *alias == kind)
        .map_or(kind, |(_, target)| *target);
    QueryKind::parse(canonical)
}

/// The kind-specific rendering licensed for this result, if any.
///
/// `None` is an ordinary outcome: the metadata declares no kind, or the decoded
/// result cannot be shown in the declared shape.
pub fn classify_output_kind(
    metadata: &QueryMetadata,
    compatible: &CompatibleQueryKinds,
) -> Option<QueryKind> {
    let kind = normalize_query_kind(metadata.kind.as_deref()?);
    compatible.supports(&kind).then_some(kind)
}

/// Like [`classify_output_kind`], restricted to the kinds that produce SARIF.
pub fn sarif_output_kind(
    metadata: &QueryMetadata,
    compatible: &CompatibleQueryKinds,
) -> Option<QueryKind> {
    classify_output_kind(metadata, compatible).filter(QueryKind::is_alert)
}

/// Sum of `results` over every run.
pub fn sarif_result_count(sarif: &Sarif) -> u64 {
    sarif.runs.iter().map(|run| run.results.len() as u64).sum()
}

/// Row count of the `#select` result set.
pub fn bqrs_result_count(info: &BqrsInfo) -> Result<u64, BqrsCountError> {
    info.result_sets
        .iter()
        .find(|rs| rs.name == SELECT_RESULT_SET)
        .map(|rs| rs.rows)
        .ok_or(BqrsCountError::MissingSelect)
}

/// SARIF count when SARIF was produced, `#select` rows otherwise.
pub fn resolve_result_count(sarif: Option<&Sarif>, info: &BqrsInfo) -> Result<u64, BqrsCountError> {
    match sarif {
        Some(sarif) => Ok(sarif_result_count(sarif)),
        None => bqrs_result_count(info),
    }
}

/// Records the analyzed repository (and revision, when known) on every run.
///
/// Runs that already carry an identical entry are left untouched, so repeated
/// calls do not stack duplicates.
pub fn inject_version_control_provenance(sarif: &mut Sarif, nwo: &str, sha: Option<&str>) {
    let entry = VersionControlDetails {
        repository_uri: format!("https://github.com/{nwo}"),
        revision_id: sha.map(str::to_string),
        extra: BTreeMap::new(),
    };

    for run in &mut sarif.runs {
        let provenance = run.version_control_provenance.get_or_insert_with(Vec::new);
        if !provenance.contains(&entry) {
            provenance.push(entry.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qlreport_types::{BqrsResultSetInfo, SarifRun};
    use serde_json::json;

    fn meta(kind: Option<&str>) -> QueryMetadata {
        QueryMetadata {
            kind: kind.map(str::to_string),
            ..QueryMetadata::default()
        }
    }

    fn kinds(tags: &[&str]) -> CompatibleQueryKinds {
        tags.iter().copied().collect()
    }

    fn classified(kind: Option<&str>, tags: &[&str]) -> Option<String> {
        classify_output_kind(&meta(kind), &kinds(tags)).map(|k| k.as_str().to_string())
    }

    #[test]
    fn aliases_resolve_before_lookup() {
        assert_eq!(classified(Some("alert"), &["Problem"]).as_deref(), Some("problem"));
        assert_eq!(
            classified(Some("path-alert"), &["PathProblem"]).as_deref(),
            Some("path-problem")
        );
    }

    #[test]
    fn missing_kind_is_unclassified() {
        assert_eq!(classified(None, &["Problem", "Table"]), None);
    }

    #[test]
    fn incompatible_kind_is_unclassified() {
        assert_eq!(classified(Some("problem"), &["Table"]), None);
        assert_eq!(classified(Some("path-problem"), &["Problem"]), None);
    }

    #[test]
    fn non_alert_kinds_classify_but_have_no_sarif() {
        let m = meta(Some("table"));
        let k = kinds(&["Table"]);
        assert_eq!(classify_output_kind(&m, &k), Some(QueryKind::Table));
        assert_eq!(sarif_output_kind(&m, &k), None);

        let m = meta(Some("alert"));
        let k = kinds(&["Problem", "Table"]);
        assert_eq!(sarif_output_kind(&m, &k), Some(QueryKind::Problem));
    }

    fn sarif_with_runs(counts: &[usize]) -> Sarif {
        Sarif {
            runs: counts
                .iter()
                .map(|&n| SarifRun {
                    results: (0..n).map(|i| json!({ "ruleId": format!("r{i}") })).collect(),
                    ..SarifRun::default()
                })
                .collect(),
            ..Sarif::default()
        }
    }

    #[test]
    fn result_count_sums_runs() {
        assert_eq!(sarif_result_count(&sarif_with_runs(&[])), 0);
        assert_eq!(sarif_result_count(&sarif_with_runs(&[0])), 0);
        assert_eq!(sarif_result_count(&sarif_with_runs(&[2, 3, 0, 1])), 6);
    }

    #[test]
    fn bqrs_count_reads_select_rows() {
        let info = BqrsInfo {
            result_sets: vec![
                BqrsResultSetInfo {
                    name: "edges".to_string(),
                    rows: 40,
                },
                BqrsResultSetInfo {
                    name: "#select".to_string(),
                    rows: 7,
                },
            ],
            ..BqrsInfo::default()
        };
        assert_eq!(bqrs_result_count(&info).unwrap(), 7);
        assert_eq!(resolve_result_count(None, &info).unwrap(), 7);
        assert_eq!(
            resolve_result_count(Some(&sarif_with_runs(&[2])), &info).unwrap(),
            2
        );
    }

    #[test]
    fn bqrs_count_without_select_fails() {
        let err = bqrs_result_count(&BqrsInfo::default()).unwrap_err();
        assert_eq!(err.to_string(), "no result set named #select");
    }

    #[test]
    fn provenance_is_added_to_every_run() {
        let mut sarif = sarif_with_runs(&[1, 1]);
        inject_version_control_provenance(&mut sarif, "o/r", Some("abc123"));

        for run in &sarif.runs {
            let provenance = run.version_control_provenance.as_ref().unwrap();
            assert_eq!(provenance.len(), 1);
            assert_eq!(provenance[0].repository_uri, "https://github.com/o/r");
            assert_eq!(provenance[0].revision_id.as_deref(), Some("abc123"));
        }

        let json = serde_json::to_value(&sarif).unwrap();
        assert_eq!(
            json["runs"][0]["versionControlProvenance"][0],
            json!({ "repositoryUri": "https://github.com/o/r", "revisionId": "abc123" })
        );
    }

    #[test]
    fn provenance_without_sha_omits_revision() {
        let mut sarif = sarif_with_runs(&[1]);
        inject_version_control_provenance(&mut sarif, "o/r", None);

        let json = serde_json::to_value(&sarif).unwrap();
        assert_eq!(
            json["runs"][0]["versionControlProvenance"],
            json!([{ "repositoryUri": "https://github.com/o/r" }])
        );
    }

    #[test]
    fn provenance_injection_is_idempotent() {
        let mut sarif = sarif_with_runs(&[1]);
        inject_version_control_provenance(&mut sarif, "o/r", Some("abc"));
        inject_version_control_provenance(&mut sarif, "o/r", Some("abc"));
        let provenance = sarif.runs[0].version_control_provenance.as_ref().unwrap();
        assert_eq!(provenance.len(), 1);
    }

    #[test]
    fn provenance_keeps_existing_entries() {
        let mut sarif: Sarif = serde_json::from_value(json!({
            "runs": [{
                "results": [],
                "versionControlProvenance": [{ "repositoryUri": "https://example.com/x", "branch": "main" }]
            }]
        }))
        .unwrap();
        inject_version_control_provenance(&mut sarif, "o/r", None);

        let provenance = sarif.runs[0].version_control_provenance.as_ref().unwrap();
        assert_eq!(provenance.len(), 2);
        assert_eq!(provenance[0].extra["branch"], "main");
        assert_eq!(provenance[1].repository_uri, "https://github.com/o/r");
    }
}
