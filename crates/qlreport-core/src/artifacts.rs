//! Reading downloaded per-repository artifact directories into a result index.
//!
//! Layout of a success artifact:
//!
//! ```text
//! <artifacts>/<owner>#<repo>/
//!     nwo.txt            required
//!     sha.txt            optional
//!     resultcount.txt    required, base-10
//!     results.bqrs       required, only its size is read
//!     results.sarif      optional, only its size is read
//! ```
//!
//! A failure artifact is named `<owner>#<repo>-error` and holds `nwo.txt` and
//! `error.txt`.

use std::io;
use std::num::ParseIntError;
use std::path::{Path, PathBuf};

use qlreport_types::{
    ARTIFACT_BQRS_FILE, ARTIFACT_ERROR_FILE, ARTIFACT_NWO_FILE, ARTIFACT_RESULT_COUNT_FILE,
    ARTIFACT_SARIF_FILE, ARTIFACT_SHA_FILE, FAILURE_ARTIFACT_SUFFIX, FailureIndexItem,
    ReadErrorPolicy, ResultIndex, ResultIndexItem,
};

use crate::aggregate::build_result_index;

#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("failed to read {}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid result count {value:?} in {}", .path.display())]
    ResultCount {
        path: PathBuf,
        value: String,
        #[source]
        source: ParseIntError,
    },
}

impl ArtifactError {
    fn read(path: PathBuf, source: io::Error) -> Self {
        ArtifactError::Read { path, source }
    }
}

/// One downloaded artifact directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactDir {
    pub name: String,
    pub path: PathBuf,
}

impl ArtifactDir {
    pub fn is_failure(&self) -> bool {
        self.name.ends_with(FAILURE_ARTIFACT_SUFFIX)
    }

    /// The artifact name without the failure suffix.
    pub fn id(&self) -> &str {
        self.name
            .strip_suffix(FAILURE_ARTIFACT_SUFFIX)
            .unwrap_or(&self.name)
    }

    /// Repository name derived from the artifact name (`owner#repo` -> `owner/repo`).
    pub fn nwo_from_name(&self) -> String {
        self.id().replacen('#', "/", 1)
    }

    fn file(&self, name: &str) -> PathBuf {
        self.path.join(name)
    }
}

/// Subdirectories of `root`, sorted by name.
pub async fn list_artifacts(root: &Path) -> Result<Vec<ArtifactDir>, ArtifactError> {
    let mut entries = tokio::fs::read_dir(root)
        .await
        .map_err(|e| ArtifactError::read(root.to_path_buf(), e))?;

    let mut dirs = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| ArtifactError::read(root.to_path_buf(), e))?
    {
        let path = entry.path();
        let file_type = entry
            .file_type()
            .await
            .map_err(|e| ArtifactError::read(path.clone(), e))?;
        if !file_type.is_dir() {
            continue;
        }
        dirs.push(ArtifactDir {
            name: entry.file_name().to_string_lossy().into_owned(),
            path,
        });
    }

    dirs.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(dirs)
}

pub async fn read_success_artifact(dir: &ArtifactDir) -> Result<ResultIndexItem, ArtifactError> {
    let nwo = read_text(&dir.file(ARTIFACT_NWO_FILE)).await?;
    // A missing or unreadable sha only costs the revision in provenance.
    let sha = read_text(&dir.file(ARTIFACT_SHA_FILE))
        .await
        .ok()
        .filter(|s| !s.is_empty());

    let count_path = dir.file(ARTIFACT_RESULT_COUNT_FILE);
    let count_text = read_text(&count_path).await?;
    let results_count = count_text
        .parse::<u64>()
        .map_err(|source| ArtifactError::ResultCount {
            path: count_path,
            value: count_text.clone(),
            source,
        })?;

    let bqrs_path = dir.file(ARTIFACT_BQRS_FILE);
    let Some(artifact_size_bytes) = file_size(&bqrs_path).await? else {
        return Err(ArtifactError::read(bqrs_path, io::ErrorKind::NotFound.into()));
    };
    let sarif_size_bytes = file_size(&dir.file(ARTIFACT_SARIF_FILE)).await?;

    Ok(ResultIndexItem {
        nwo,
        id: dir.id().to_string(),
        sha,
        results_count,
        artifact_size_bytes,
        sarif_size_bytes,
    })
}

pub async fn read_failure_artifact(dir: &ArtifactDir) -> Result<FailureIndexItem, ArtifactError> {
    Ok(FailureIndexItem {
        nwo: read_text(&dir.file(ARTIFACT_NWO_FILE)).await?,
        id: dir.id().to_string(),
        error: read_text(&dir.file(ARTIFACT_ERROR_FILE)).await?,
    })
}

/// Reads every artifact under `root` into a ranked [`ResultIndex`].
///
/// Artifacts are visited one at a time in name order. With
/// [`ReadErrorPolicy::Skip`], an unreadable artifact becomes a failure item
/// carrying the error text instead of failing the pass.
pub async fn collect_result_index(
    root: &Path,
    policy: ReadErrorPolicy,
) -> Result<ResultIndex, ArtifactError> {
    let mut successes = Vec::new();
    let mut failures = Vec::new();

    for artifact in list_artifacts(root).await? {
        let outcome = if artifact.is_failure() {
            read_failure_artifact(&artifact).await.map(|f| failures.push(f))
        } else {
            read_success_artifact(&artifact).await.map(|s| successes.push(s))
        };

        if let Err(err) = outcome {
            match policy {
                ReadErrorPolicy::Abort => return Err(err),
                ReadErrorPolicy::Skip => failures.push(FailureIndexItem {
                    nwo: artifact.nwo_from_name(),
                    id: artifact.id().to_string(),
                    error: error_chain(&err),
                }),
            }
        }
    }

    Ok(ResultIndex {
        successes: build_result_index(successes),
        failures,
    })
}

/// `outer: inner: ...` for an error and its sources.
pub fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(inner) = source {
        out.push_str(": ");
        out.push_str(&inner.to_string());
        source = inner.source();
    }
    out
}

async fn read_text(path: &Path) -> Result<String, ArtifactError> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ArtifactError::read(path.to_path_buf(), e))?;
    Ok(text.trim_end().to_string())
}

async fn file_size(path: &Path) -> Result<Option<u64>, ArtifactError> {
    match tokio::fs::metadata(path).await {
        Ok(meta) => Ok(Some(meta.len())),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(ArtifactError::read(path.to_path_buf(), e)),
    }
}
