use std::fs;
use std::path::{Path, PathBuf};

use globset::GlobBuilder;
use walkdir::WalkDir;

use crate::error::DeviceFarmError;
use crate::prelude::*;

const GLOB_META_CHARACTERS: [char; 4] = ['*', '?', '[', '{'];

/// Splits a pattern into its literal leading directory and the glob remainder.
///
/// `app/build/**/*.apk` walks from `app/build` and matches `**/*.apk`. A pattern without
/// any glob character has an empty remainder and names a single file.
fn split_pattern(pattern: &str) -> (PathBuf, String) {
    let mut base = PathBuf::new();
    let mut remainder: Vec<&str> = vec![];

    for (index, component) in pattern.split('/').enumerate() {
        if !remainder.is_empty() || component.contains(GLOB_META_CHARACTERS) {
            remainder.push(component);
        } else if component.is_empty() {
            if index == 0 {
                base.push("/");
            }
        } else {
            base.push(component);
        }
    }

    (base, remainder.join("/"))
}

/// Files of the workspace matching `pattern`. Copies staged by earlier runs are never
/// matched by a glob.
fn find_matches(pattern: &str, workspace_root: &Path, staging_dir: &Path) -> Result<Vec<PathBuf>> {
    let (base, remainder) = split_pattern(pattern);
    let base = workspace_root.join(base);

    if remainder.is_empty() {
        return Ok(if base.is_file() { vec![base] } else { vec![] });
    }

    let matcher = GlobBuilder::new(&remainder)
        .literal_separator(true)
        .build()
        .map_err(|e| DeviceFarmError::configuration(format!("Invalid pattern '{pattern}': {e}")))?
        .compile_matcher();

    let staging_dir = staging_dir.canonicalize().ok();
    let mut matches: Vec<PathBuf> = WalkDir::new(&base)
        .follow_links(true)
        .into_iter()
        .filter_entry(|entry| {
            entry.depth() == 0
                || !entry.file_type().is_dir()
                || staging_dir.is_none()
                || entry.path().canonicalize().ok() != staging_dir
        })
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            entry
                .path()
                .strip_prefix(&base)
                .is_ok_and(|relative| matcher.is_match(relative))
        })
        .map(|entry| entry.into_path())
        .collect();
    matches.sort();

    Ok(matches)
}

/// Resolves `pattern` against the workspace to exactly one file and stages a copy of it.
///
/// The copy lands in `staging_dir` (created if missing) under the matched file's base name,
/// and its path is returned.
pub fn resolve(pattern: &str, workspace_root: &Path, staging_dir: &Path) -> Result<PathBuf> {
    if pattern.trim().is_empty() {
        return Err(DeviceFarmError::configuration("Artifact pattern must be set").into());
    }

    let mut matches = find_matches(pattern, workspace_root, staging_dir)?;
    let source = match matches.len() {
        0 => {
            return Err(DeviceFarmError::NotFound {
                pattern: pattern.to_owned(),
            }
            .into());
        }
        1 => matches.remove(0),
        _ => {
            return Err(DeviceFarmError::Ambiguous {
                pattern: pattern.to_owned(),
                matches,
            }
            .into());
        }
    };
    debug!("Pattern '{pattern}' matched {}", source.display());

    fs::create_dir_all(staging_dir).with_context(|| {
        format!(
            "Failed to create staging directory {}",
            staging_dir.display()
        )
    })?;
    let file_name = source
        .file_name()
        .with_context(|| format!("Matched path {} has no file name", source.display()))?;
    let destination = staging_dir.join(file_name);

    let already_staged = matches!(
        (source.canonicalize(), destination.canonicalize()),
        (Ok(from), Ok(to)) if from == to
    );
    if !already_staged {
        fs::copy(&source, &destination).with_context(|| {
            format!(
                "Failed to copy {} to {}",
                source.display(),
                destination.display()
            )
        })?;
    }

    Ok(destination)
}
