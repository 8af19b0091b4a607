use anyhow::{bail, Context, Result};
use colored::Colorize;
use fs_err as fs;
use std::path::{Component, Path, PathBuf};
use tempfile::NamedTempFile;

use crate::wire::GeneratedFile;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteKind {
    Created,
    Updated,
    Unchanged,
}

#[derive(Debug, Clone)]
pub struct WrittenFile {
    pub kind: WriteKind,
    pub path: PathBuf,
    pub bytes_before: Option<u64>,
    pub bytes_after: u64,
    pub placeholder: bool,
}

#[derive(Debug, Clone, Default)]
pub struct WriteSummary {
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub placeholders: usize,
    pub bytes_written: u64,
    pub details: Vec<WrittenFile>,
}

/// `path` joined under `root`, refusing absolute paths and `..` segments.
pub fn resolve_under(root: &Path, path: &str) -> Result<PathBuf> {
    let rel = Path::new(path);
    if path.trim().is_empty() {
        bail!("empty output path");
    }
    for c in rel.components() {
        match c {
            Component::Normal(_) | Component::CurDir => {}
            _ => bail!("refusing to write outside the output directory: {path}"),
        }
    }
    Ok(root.join(rel))
}

/// Writes each file through a temp file in its target directory. With
/// `dry` nothing touches the disk but the summary is still computed.
pub fn write_files(root: &Path, files: &[GeneratedFile], dry: bool) -> Result<WriteSummary> {
    let mut sum = WriteSummary::default();

    for f in files {
        let abs = resolve_under(root, &f.path)?;
        let existing = if abs.exists() { Some(fs::read_to_string(&abs)?) } else { None };
        let before = existing.as_ref().map(|s| s.len() as u64);
        let after = f.content.len() as u64;

        let kind = match &existing {
            None => WriteKind::Created,
            Some(old) if *old == f.content => WriteKind::Unchanged,
            Some(_) => WriteKind::Updated,
        };

        if !dry && kind != WriteKind::Unchanged {
            let parent = abs.parent().unwrap_or(root);
            fs::create_dir_all(parent)?;
            let tmp = NamedTempFile::new_in(parent)
                .with_context(|| format!("creating temp file in {}", parent.display()))?;
            fs::write(tmp.path(), &f.content)?;
            tmp.persist(&abs).with_context(|| format!("persisting {}", abs.display()))?;
            sum.bytes_written += after;
        }
        tracing::debug!(path = %abs.display(), ?kind, dry, "output file");

        match kind {
            WriteKind::Created => sum.created += 1,
            WriteKind::Updated => sum.updated += 1,
            WriteKind::Unchanged => sum.unchanged += 1,
        }
        if f.is_fallback() {
            sum.placeholders += 1;
        }
        sum.details.push(WrittenFile {
            kind,
            path: abs,
            bytes_before: before,
            bytes_after: after,
            placeholder: f.is_fallback(),
        });
    }
    Ok(sum)
}

/// Unified diff of `old` against `new`, empty when they are equal.
pub fn unified_diff(old: &str, new: &str, label: &str) -> String {
    let old_lines: Vec<String> = old.lines().map(|l| format!("{l}\n")).collect();
    let new_lines: Vec<String> = new.lines().map(|l| format!("{l}\n")).collect();
    let old_refs: Vec<&str> = old_lines.iter().map(String::as_str).collect();
    let new_refs: Vec<&str> = new_lines.iter().map(String::as_str).collect();

    difflib::unified_diff(
        &old_refs,
        &new_refs,
        &format!("a/{label}"),
        &format!("b/{label}"),
        "",
        "",
        3,
    )
    .concat()
}

/// Colors a unified diff line by line, truncating after `max_lines`.
pub fn colorize_diff(diff: &str, max_lines: usize) -> String {
    let mut out: Vec<String> = diff
        .lines()
        .take(max_lines)
        .map(|l| {
            if l.starts_with("+++") || l.starts_with("---") {
                l.bold().to_string()
            } else if l.starts_with('+') {
                l.green().to_string()
            } else if l.starts_with('-') {
                l.red().to_string()
            } else if l.starts_with("@@") {
                l.cyan().to_string()
            } else {
                l.to_string()
            }
        })
        .collect();
    if diff.lines().count() > max_lines {
        out.push("... (diff truncated)".dimmed().to_string());
    }
    out.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::FileOrigin;

    fn file(path: &str, content: &str) -> GeneratedFile {
        GeneratedFile::new(path, content.to_string(), "html".into(), FileOrigin::Generated)
    }

    #[test]
    fn rejects_escaping_paths() {
        let root = Path::new("/tmp/out");
        assert!(resolve_under(root, "../etc/passwd").is_err());
        assert!(resolve_under(root, "/etc/passwd").is_err());
        assert!(resolve_under(root, "").is_err());
        assert_eq!(resolve_under(root, "css/site.css").unwrap(), root.join("css/site.css"));
    }

    #[test]
    fn writes_then_reports_unchanged_and_updated() {
        let dir = tempfile::tempdir().unwrap();
        let first = write_files(dir.path(), &[file("index.html", "<p>a</p>"), file("pages/about.html", "b")], false)
            .unwrap();
        assert_eq!(first.created, 2);
        assert_eq!(fs::read_to_string(dir.path().join("pages/about.html")).unwrap(), "b");

        let second = write_files(dir.path(), &[file("index.html", "<p>a</p>"), file("pages/about.html", "c")], false)
            .unwrap();
        assert_eq!(second.unchanged, 1);
        assert_eq!(second.updated, 1);
        assert_eq!(second.bytes_written, 1);
    }

    #[test]
    fn dry_run_leaves_disk_alone() {
        let dir = tempfile::tempdir().unwrap();
        let sum = write_files(dir.path(), &[file("index.html", "x")], true).unwrap();
        assert_eq!(sum.created, 1);
        assert!(!dir.path().join("index.html").exists());
    }

    #[test]
    fn diff_marks_changed_lines() {
        let d = unified_diff("var x = 1\nfoo()\n", "const x = 1\nfoo()\n", "app.js");
        assert!(d.contains("--- a/app.js"));
        assert!(d.contains("-var x = 1"));
        assert!(d.contains("+const x = 1"));
        assert!(unified_diff("same\n", "same\n", "a").is_empty());
    }
}
