//! Publishing promoted repositories as Markdown files in a directory.

use std::io;
use std::path::{Path, PathBuf};

use qlreport_core::ResultPublisher;
use qlreport_types::{ARTIFACT_MARKDOWN_FILE, ResultIndexItem};
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum DirectoryPublishError {
    #[error("read rendered results {}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("write comment {}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Copies each promoted repository's `results.md` from its artifact into
/// `<comments_dir>/<file>.md` and links to it relative to `link_base`.
#[derive(Debug, Clone)]
pub struct DirectoryPublisher {
    artifacts_dir: PathBuf,
    comments_dir: PathBuf,
    link_base: String,
}

impl DirectoryPublisher {
    pub fn new(artifacts_dir: &Path, comments_dir: &Path, link_base: Option<&str>) -> Self {
        let link_base = link_base
            .map(|b| b.trim_end_matches('/').to_string())
            .unwrap_or_else(|| comments_dir.to_string_lossy().trim_end_matches('/').to_string());
        Self {
            artifacts_dir: artifacts_dir.to_path_buf(),
            comments_dir: comments_dir.to_path_buf(),
            link_base,
        }
    }
}

/// File name for a repository's comment. `#` would start a URL fragment, so it
/// becomes `__`, which cannot occur in an owner name.
pub fn comment_file_name(id: &str) -> String {
    format!("{}.md", id.replace('#', "__"))
}

impl ResultPublisher for DirectoryPublisher {
    type Error = DirectoryPublishError;

    async fn publish(&mut self, item: &ResultIndexItem) -> Result<String, DirectoryPublishError> {
        let markdown = self.artifacts_dir.join(&item.id).join(ARTIFACT_MARKDOWN_FILE);
        let body = tokio::fs::read_to_string(&markdown)
            .await
            .map_err(|e| DirectoryPublishError::Read {
                path: markdown.clone(),
                source: e,
            })?;

        let file_name = comment_file_name(&item.id);
        let dest = self.comments_dir.join(&file_name);
        tokio::fs::create_dir_all(&self.comments_dir)
            .await
            .map_err(|e| DirectoryPublishError::Write {
                path: self.comments_dir.clone(),
                source: e,
            })?;
        tokio::fs::write(&dest, body)
            .await
            .map_err(|e| DirectoryPublishError::Write {
                path: dest.clone(),
                source: e,
            })?;

        debug!("Published {} to {}", item.nwo, dest.display());
        Ok(format!("{}/{}", self.link_base, file_name))
    }
}
