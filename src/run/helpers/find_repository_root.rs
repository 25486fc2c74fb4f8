use std::path::{Path, PathBuf};

/// Closest ancestor of `base_dir` holding a `.git` entry.
pub fn find_repository_root(base_dir: &Path) -> Option<PathBuf> {
    let current_dir = base_dir.canonicalize().ok()?;
    let root = current_dir
        .ancestors()
        .find(|ancestor| ancestor.join(".git").exists())
        .map(Path::to_path_buf);

    if root.is_none() {
        log::debug!("No repository root above {}", base_dir.display());
    }
    root
}
