//! Dependency manifest discovery.

use crate::constants::{APP_FILE, GIT_DIR};
use crate::updaters::UPDATERS;
use anyhow::Context;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Walks `root` top-down and returns every manifest that sits next to an app file.
///
/// Returned paths are relative to `root`, grouped by directory in sorted order
/// and listed in updater table order within a directory. Symlinked directories
/// are not followed and unreadable subdirectories are skipped.
pub fn find_dependency_files(root: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut files_by_dir: BTreeMap<PathBuf, BTreeSet<String>> = BTreeMap::new();

    let walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.file_name() != GIT_DIR);

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.depth() == 0 => {
                return Err(e)
                    .with_context(|| format!("Failed to read source directory {}", root.display()));
            }
            Err(_) => continue,
        };
        if entry.file_type().is_dir() {
            continue;
        }
        let Some(name) = entry.file_name().to_str() else {
            continue;
        };
        let Some(parent) = entry.path().parent() else {
            continue;
        };
        let Ok(relative) = parent.strip_prefix(root) else {
            continue;
        };
        files_by_dir
            .entry(relative.to_path_buf())
            .or_default()
            .insert(name.to_string());
    }

    let found = files_by_dir
        .iter()
        .filter(|(_, files)| files.contains(APP_FILE))
        .flat_map(|(dir, files)| {
            UPDATERS
                .iter()
                .filter(|u| files.contains(u.manifest))
                .map(move |u| dir.join(u.manifest))
        })
        .collect();
    Ok(found)
}
