//! Cell-to-text conversion, including relativization of entity locations into
//! browsable blob links.

use std::borrow::Cow;

use qlreport_types::{Cell, DEFAULT_GIT_REF, Entity};

/// Repository identity and path-remap parameters for one render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkContext {
    nwo: String,
    /// `file:` followed by the normalized source location prefix.
    file_prefix: String,
    git_ref: String,
}

impl LinkContext {
    /// `git_ref` defaults to `HEAD` when absent.
    pub fn new(nwo: &str, source_location_prefix: &str, git_ref: Option<&str>) -> Self {
        Self {
            nwo: nwo.to_string(),
            file_prefix: format!("file:{}", normalize_source_prefix(source_location_prefix)),
            git_ref: git_ref.unwrap_or(DEFAULT_GIT_REF).to_string(),
        }
    }

    /// Link target for a location, `None` when the entity carries no location.
    ///
    /// Locations under the source root become `https://github.com/{nwo}/blob/{ref}/...`;
    /// anything else keeps its original URI so the location is still shown.
    pub fn entity_target(&self, entity: &Entity) -> Option<String> {
        let url = entity.url.as_ref()?;
        let target = format!("{}#L{}", url.uri, url.start_line);

        let Some(relative) = target.strip_prefix(&self.file_prefix) else {
            return Some(target);
        };
        // `/a/b` must not claim `/a/bc/...`. A root prefix ends in `/` already.
        let at_boundary = self.file_prefix.ends_with('/') || relative.starts_with(['/', '#']);
        if !at_boundary {
            return Some(target);
        }

        let sep = if relative.starts_with('/') { "" } else { "/" };
        Some(format!(
            "https://github.com/{}/blob/{}{}{}",
            self.nwo, self.git_ref, sep, relative
        ))
    }
}

/// Backslashes become forward slashes, and the result has exactly one leading
/// slash and no trailing one (`C:\src\` -> `/C:/src`).
pub fn normalize_source_prefix(prefix: &str) -> String {
    let forward = prefix.replace('\\', "/");
    let trimmed = forward.trim_matches('/');
    format!("/{trimmed}")
}

/// Display text for one result cell.
///
/// Scalars are stringified as-is. Entities become `[label](target)`; an entity
/// without a location renders as its bare label.
pub fn resolve_cell(cell: &Cell, ctx: &LinkContext) -> String {
    match cell {
        Cell::Entity(entity) => match ctx.entity_target(entity) {
            Some(target) => format!("[{}]({})", entity.label, target),
            None => entity.label.clone(),
        },
        Cell::String(s) => s.clone(),
        Cell::Integer(n) => n.to_string(),
        Cell::Float(f) => f.to_string(),
        Cell::Boolean(b) => b.to_string(),
    }
}

/// Makes text safe to place inside a single Markdown table cell.
pub fn escape_cell(text: &str) -> Cow<'_, str> {
    if !text.contains(['|', '\n', '\r']) {
        return Cow::Borrowed(text);
    }

    let mut out = String::with_capacity(text.len() + 8);
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '|' => out.push_str("\\|"),
            '\r' => {
                if chars.peek() != Some(&'\n') {
                    out.push(' ');
                }
            }
            '\n' => out.push(' '),
            other => out.push(other),
        }
    }
    Cow::Owned(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use qlreport_types::EntityUrl;

    fn entity(label: &str, uri: &str, line: u32) -> Entity {
        Entity {
            id: 7661,
            label: label.to_string(),
            url: Some(EntityUrl {
                uri: uri.to_string(),
                start_line: line,
                start_column: 2,
                end_line: line,
                end_column: 31,
            }),
        }
    }

    #[test]
    fn relativizes_location_under_source_root() {
        let e = entity(
            "CERTSTORE_DOESNT_WORK_ON_LINIX",
            "file:/home/runner/work/qc-demo-github-certstore/qc-demo-github-certstore/certstore_linux.go",
            8,
        );
        let ctx = LinkContext::new(
            "dsp-testing/qc-demo-github-certstore",
            "/home/runner/work/qc-demo-github-certstore/qc-demo-github-certstore",
            None,
        );

        assert_eq!(
            resolve_cell(&Cell::Entity(e), &ctx),
            "[CERTSTORE_DOESNT_WORK_ON_LINIX](https://github.com/dsp-testing/qc-demo-github-certstore/blob/HEAD/certstore_linux.go#L8)"
        );
    }

    #[test]
    fn sibling_directory_sharing_the_prefix_is_not_relativized() {
        let e = entity("x", "file:/a/bc/x.go", 3);
        let ctx = LinkContext::new("o/r", "/a/b", Some("main"));

        assert_eq!(ctx.entity_target(&e).as_deref(), Some("file:/a/bc/x.go#L3"));
    }

    #[test]
    fn root_prefix_relativizes_everything_under_it() {
        let e = entity("x", "file:/a/bc/x.go", 3);
        let ctx = LinkContext::new("o/r", "/", Some("main"));

        assert_eq!(
            ctx.entity_target(&e).as_deref(),
            Some("https://github.com/o/r/blob/main/a/bc/x.go#L3")
        );
    }

    #[test]
    fn leaves_location_outside_source_root_alone() {
        let e = entity(
            "CERTSTORE_DOESNT_WORK_ON_LINIX",
            "file:/home/runner/work/qc-demo-github-certstore/qc-demo-github-certstore/certstore_linux.go",
            8,
        );
        let ctx = LinkContext::new("dsp-testing/qc-demo-github-certstore", "/tmp", None);

        assert_eq!(
            resolve_cell(&Cell::Entity(e), &ctx),
            "[CERTSTORE_DOESNT_WORK_ON_LINIX](file:/home/runner/work/qc-demo-github-certstore/qc-demo-github-certstore/certstore_linux.go#L8)"
        );
    }

    #[test]
    fn uses_explicit_ref() {
        let e = entity("X", "file:/a/b/c.go", 8);
        let ctx = LinkContext::new("o/r", "/a/b", Some("main"));
        assert_eq!(
            resolve_cell(&Cell::Entity(e), &ctx),
            "[X](https://github.com/o/r/blob/main/c.go#L8)"
        );
    }

    #[test]
    fn windows_prefix_is_normalized() {
        let e = entity("X", "file:/D:/a/repo/src/main.c", 3);
        let ctx = LinkContext::new("o/r", "D:\\a\\repo", Some("dev"));
        assert_eq!(
            resolve_cell(&Cell::Entity(e), &ctx),
            "[X](https://github.com/o/r/blob/dev/src/main.c#L3)"
        );
    }

    #[test]
    fn trailing_slash_on_prefix_does_not_drop_separator() {
        let e = entity("X", "file:/a/b/c.go", 1);
        let ctx = LinkContext::new("o/r", "/a/b/", None);
        assert_eq!(
            ctx.entity_target(&e).as_deref(),
            Some("https://github.com/o/r/blob/HEAD/c.go#L1")
        );
    }

    #[test]
    fn entity_without_location_renders_label() {
        let e = Entity {
            id: 1,
            label: "synthetic".to_string(),
            url: None,
        };
        let ctx = LinkContext::new("o/r", "/src", None);
        assert_eq!(resolve_cell(&Cell::Entity(e), &ctx), "synthetic");
    }

    #[test]
    fn scalars_are_stringified() {
        let ctx = LinkContext::new("o/r", "/src", None);
        assert_eq!(resolve_cell(&Cell::Integer(42), &ctx), "42");
        assert_eq!(resolve_cell(&Cell::Float(1.5), &ctx), "1.5");
        assert_eq!(resolve_cell(&Cell::Boolean(false), &ctx), "false");
        assert_eq!(resolve_cell(&Cell::from("as-is"), &ctx), "as-is");
    }

    #[test]
    fn normalize_source_prefix_cases() {
        assert_eq!(normalize_source_prefix("/a/b"), "/a/b");
        assert_eq!(normalize_source_prefix("a/b"), "/a/b");
        assert_eq!(normalize_source_prefix("//a/b//"), "/a/b");
        assert_eq!(normalize_source_prefix("C:\\src\\repo"), "/C:/src/repo");
        assert_eq!(normalize_source_prefix(""), "/");
    }

    #[test]
    fn escape_cell_handles_pipes_and_newlines() {
        assert!(matches!(escape_cell("plain"), Cow::Borrowed(_)));
        assert_eq!(escape_cell("a|b"), "a\\|b");
        assert_eq!(escape_cell("line1\nline2"), "line1 line2");
        assert_eq!(escape_cell("line1\r\nline2"), "line1 line2");
    }
}
