use std::fs;
use std::path::Path;
use tracing::debug;
use walkdir::WalkDir;

use crate::error::{Error, Result};

/// Default template tree, compiled in as `(relative path, contents)`.
const BUILTIN: &[(&str, &str)] = &[
    ("README.md", include_str!("../templates/gitrepo/README.md")),
    ("nodes/.gitkeep", include_str!("../templates/gitrepo/nodes/.gitkeep")),
    ("roles/.gitkeep", include_str!("../templates/gitrepo/roles/.gitkeep")),
];

/// Write the compiled-in template tree into `dst`, overwriting files with the same
/// relative path.
pub fn write_builtin(dst: &Path) -> Result<usize> {
    for (rel, contents) in BUILTIN {
        let out = dst.join(rel);
        if let Some(parent) = out.parent() {
            fs::create_dir_all(parent).map_err(Error::fs("create directory", parent))?;
        }
        fs::write(&out, contents).map_err(Error::fs("write template file", &out))?;
    }
    debug!(dst = %dst.display(), written = BUILTIN.len(), "wrote builtin template tree");
    Ok(BUILTIN.len())
}

/// Install the template tree into `dst`: the directory from `config.toml` when one is
/// set, the compiled-in tree otherwise.
pub fn install_templates(templates_dir: Option<&Path>, dst: &Path) -> Result<usize> {
    match templates_dir {
        Some(src) => copy_tree(src, dst),
        None => write_builtin(dst),
    }
}

/// Recursively copy `src` into `dst`, overwriting files with the same relative path.
///
/// Files in `dst` that have no counterpart in `src` are left alone. Symlinks in the
/// template are followed and copied as regular files.
///
/// # Errors
/// - [`Error::Template`] if `src` is missing or cannot be walked.
/// - [`Error::Filesystem`] if a directory or file cannot be created.
pub fn copy_tree(src: &Path, dst: &Path) -> Result<usize> {
    let mut copied = 0;
    for entry in WalkDir::new(src).follow_links(true) {
        let entry = entry?;
        let rel = entry
            .path()
            .strip_prefix(src)
            .map_err(|e| Error::Config(format!("template path outside {}: {e}", src.display())))?;
        if rel.as_os_str().is_empty() {
            continue;
        }
        let out = dst.join(rel);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&out).map_err(Error::fs("create directory", &out))?;
        } else {
            fs::copy(entry.path(), &out).map_err(Error::fs("copy template file to", &out))?;
            copied += 1;
        }
    }
    debug!(src = %src.display(), dst = %dst.display(), copied, "copied template tree");
    Ok(copied)
}
