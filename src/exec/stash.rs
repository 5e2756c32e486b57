// src/exec/stash.rs

//! File bundles for moving sources between execution contexts.
//!
//! A bundle is a directory under the stash root named after the blake3
//! digest of its contents, so stashing identical files twice reuses the
//! existing bundle.

use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use blake3::Hasher;
use globset::{Glob, GlobSet, GlobSetBuilder};
use tracing::{debug, info};

use crate::exec::context::StashHandle;

/// Relative path (from the context root) of the default stash directory.
pub const STASH_DIR: &str = ".minici/stash";

/// Relative path (from the context root) of per-task work directories.
pub const WORK_DIR: &str = ".minici/work";

/// Directory names never included in a bundle.
const SKIPPED_DIRS: &[&str] = &[".git", ".minici"];

fn compile(pattern: &str) -> Result<GlobSet> {
    let glob = Glob::new(pattern).with_context(|| format!("invalid stash pattern {pattern:?}"))?;
    let mut builder = GlobSetBuilder::new();
    builder.add(glob);
    builder
        .build()
        .with_context(|| format!("building glob set for {pattern:?}"))
}

/// Relative paths of all files under `root` matching `pattern`, sorted.
pub fn collect_matching(root: &Path, pattern: &str, exclude: &Path) -> Result<Vec<PathBuf>> {
    let set = compile(pattern)?;
    let mut found = Vec::new();
    let mut stack = vec![root.to_path_buf()];

    while let Some(dir) = stack.pop() {
        for entry in fs::read_dir(&dir).with_context(|| format!("reading dir {:?}", dir))? {
            let entry = entry?;
            let path = entry.path();
            let file_type = entry.file_type()?;

            if file_type.is_dir() {
                let skipped = entry
                    .file_name()
                    .to_str()
                    .is_some_and(|name| SKIPPED_DIRS.contains(&name));
                if !skipped && !path.starts_with(exclude) {
                    stack.push(path);
                }
                continue;
            }

            if !file_type.is_file() {
                continue;
            }

            let rel = path.strip_prefix(root).unwrap_or(&path).to_path_buf();
            if set.is_match(&rel) {
                found.push(rel);
            }
        }
    }

    found.sort();
    Ok(found)
}

/// Compute the hash of a single file.
pub fn compute_file_hash(path: &Path) -> Result<String> {
    let mut hasher = Hasher::new();
    let mut file =
        File::open(path).with_context(|| format!("opening file for hashing: {:?}", path))?;
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize().to_hex().to_string())
}

/// Digest over relative paths and contents; `rel_paths` must be sorted.
pub fn bundle_digest(root: &Path, rel_paths: &[PathBuf]) -> Result<String> {
    let mut hasher = Hasher::new();
    for rel in rel_paths {
        hasher.update(rel.to_string_lossy().as_bytes());
        hasher.update(&[0]);
        hasher.update(compute_file_hash(&root.join(rel))?.as_bytes());
    }
    Ok(hasher.finalize().to_hex().to_string())
}

/// Copy every file under `root` matching `pattern` into a bundle under
/// `stash_root`.
pub fn create_bundle(root: &Path, stash_root: &Path, pattern: &str) -> Result<StashHandle> {
    let files = collect_matching(root, pattern, stash_root)?;
    let id = bundle_digest(root, &files)?;
    let bundle = stash_root.join(&id);

    if bundle.is_dir() {
        debug!(stash = %id, "bundle already present; reusing");
    } else {
        // Build into a scratch directory first so a half-written bundle is
        // never picked up under its final name.
        let scratch = stash_root.join(format!(".{id}.partial"));
        if scratch.exists() {
            fs::remove_dir_all(&scratch)?;
        }
        for rel in &files {
            copy_file(&root.join(rel), &scratch.join(rel))?;
        }
        fs::create_dir_all(&scratch)?;
        fs::rename(&scratch, &bundle)
            .with_context(|| format!("finalising bundle {:?}", bundle))?;
    }

    info!(stash = %id, files = files.len(), pattern = %pattern, "stashed files");
    Ok(StashHandle {
        id,
        path: bundle,
        files: files.len(),
    })
}

/// Copy the contents of a bundle into `dest`, returning the file count.
pub fn copy_bundle(handle: &StashHandle, dest: &Path) -> Result<usize> {
    if !handle.path.is_dir() {
        anyhow::bail!("stash {} not found at {:?}", handle.id, handle.path);
    }

    let mut copied = 0;
    let mut stack = vec![handle.path.clone()];
    while let Some(dir) = stack.pop() {
        for entry in fs::read_dir(&dir).with_context(|| format!("reading dir {:?}", dir))? {
            let entry = entry?;
            let path = entry.path();
            if entry.file_type()?.is_dir() {
                stack.push(path);
                continue;
            }
            let rel = path.strip_prefix(&handle.path).unwrap_or(&path);
            copy_file(&path, &dest.join(rel))?;
            copied += 1;
        }
    }

    info!(stash = %handle.id, files = copied, dest = ?dest, "unstashed files");
    Ok(copied)
}

fn copy_file(from: &Path, to: &Path) -> Result<()> {
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent).with_context(|| format!("creating dir {:?}", parent))?;
    }
    fs::copy(from, to).with_context(|| format!("copying {:?} to {:?}", from, to))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(root: &Path, rel: &str, contents: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn stash_and_unstash_round_trip() {
        let src = tempfile::tempdir().unwrap();
        let dest = tempfile::tempdir().unwrap();
        write(src.path(), "src/app.py", "print('hi')\n");
        write(src.path(), "README.md", "readme\n");
        write(src.path(), ".git/HEAD", "ref: main\n");

        let stash_root = src.path().join(STASH_DIR);
        let handle = create_bundle(src.path(), &stash_root, "*.py").unwrap();
        assert_eq!(handle.files, 1);

        let copied = copy_bundle(&handle, dest.path()).unwrap();
        assert_eq!(copied, 1);
        assert_eq!(
            fs::read_to_string(dest.path().join("src/app.py")).unwrap(),
            "print('hi')\n"
        );
        assert!(!dest.path().join("README.md").exists());
    }

    #[test]
    fn identical_content_reuses_bundle() {
        let src = tempfile::tempdir().unwrap();
        write(src.path(), "a.txt", "same");
        let stash_root = src.path().join(STASH_DIR);

        let first = create_bundle(src.path(), &stash_root, "*").unwrap();
        let second = create_bundle(src.path(), &stash_root, "*").unwrap();
        assert_eq!(first, second);

        write(src.path(), "a.txt", "changed");
        let third = create_bundle(src.path(), &stash_root, "*").unwrap();
        assert_ne!(first.id, third.id);
    }

    #[test]
    fn skips_vcs_and_stash_directories() {
        let src = tempfile::tempdir().unwrap();
        write(src.path(), "keep.txt", "x");
        write(src.path(), ".git/config", "y");
        let stash_root = src.path().join(STASH_DIR);
        create_bundle(src.path(), &stash_root, "*").unwrap();

        let files = collect_matching(src.path(), "*", &stash_root).unwrap();
        assert_eq!(files, vec![PathBuf::from("keep.txt")]);
    }
}
