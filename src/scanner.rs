use anyhow::{Context, Result};
use ignore::overrides::{Override, OverrideBuilder};
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::config::NamespaceConfig;
use crate::profile::registry;

fn default_overrides(root: &Path, exclude_dir_names: &[String]) -> Result<Override> {
    let mut ob = OverrideBuilder::new(root);

    // Generated sources that would flood a namespace listing.
    ob.add("!**/*.min.js")?;
    ob.add("!**/*.designer.cs")?;
    ob.add("!**/*.g.cs")?;
    ob.add("!**/*.pb.go")?;

    // Directories: exclude the entry and its descendants, otherwise the walker still descends.
    for d in [
        ".git",
        "node_modules",
        "target",
        "dist",
        "build",
        "bin",
        "obj",
        "vendor",
        "coverage",
        ".next",
        ".vscode",
        "__pycache__",
        ".venv",
    ] {
        ob.add(&format!("!**/{d}"))?;
        ob.add(&format!("!**/{d}/**"))?;
    }

    for d in exclude_dir_names {
        let d = d.trim().trim_matches('/');
        if d.is_empty() {
            continue;
        }
        ob.add(&format!("!**/{d}"))?;
        ob.add(&format!("!**/{d}/**"))?;
    }

    Ok(ob.build()?)
}

#[derive(Debug, Clone)]
pub struct SourceFile {
    pub abs_path: PathBuf,
    pub rel_path: PathBuf,
    pub bytes: u64,
}

/// Source files under `root` that some language profile claims, sorted by relative path.
///
/// Stops at `max_files`; oversized and empty files are skipped.
pub fn scan_sources(root: &Path, opts: &NamespaceConfig) -> Result<Vec<SourceFile>> {
    let meta = std::fs::metadata(root)
        .with_context(|| format!("Workspace root does not exist: {}", root.display()))?;
    if !meta.is_dir() {
        anyhow::bail!("Workspace root is not a directory: {}", root.display());
    }

    let max_bytes = opts.effective_max_file_bytes();
    let overrides = default_overrides(root, &opts.exclude_dir_names)?;
    let walker = WalkBuilder::new(root)
        .standard_filters(true)
        .overrides(overrides)
        .build();

    let mut files = Vec::new();
    for item in walker {
        let dent = match item {
            Ok(d) => d,
            Err(_) => continue,
        };
        if !dent.file_type().map(|ft| ft.is_file()).unwrap_or(false) {
            continue;
        }

        let abs_path = dent.into_path();
        if registry().classify_path(&abs_path).is_none() {
            continue;
        }

        let bytes = match std::fs::metadata(&abs_path).map(|m| m.len()) {
            Ok(b) => b,
            Err(_) => continue,
        };
        if bytes == 0 || bytes > max_bytes {
            continue;
        }

        let rel_path = abs_path
            .strip_prefix(root)
            .with_context(|| format!("{} is not under {}", abs_path.display(), root.display()))?
            .to_path_buf();

        files.push(SourceFile {
            abs_path,
            rel_path,
            bytes,
        });
        if files.len() >= opts.max_files {
            debug!(limit = opts.max_files, "Source scan hit the file limit");
            break;
        }
    }

    files.sort_by(|a, b| a.rel_path.cmp(&b.rel_path));
    Ok(files)
}
