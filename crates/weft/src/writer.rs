//! Validated, atomic output writing.
//!
//! The output directory is a shared sink for every concurrent task, and
//! filenames come from caller-supplied naming functions, so writes are
//! (a) validated against directory traversal and (b) atomic: content
//! goes to a temp file that is renamed into place, which means rapid
//! successive watch-mode writes to the same path race only on which
//! complete file wins, never on partial content.

use std::fs;
use std::path::{Path, PathBuf};

use path_clean::PathClean;

use crate::{Error, Result};

/// Write one buffered asset into `dir` under `filename`.
///
/// Creates the output directory (and any nested parents the filename
/// implies) as needed.
pub fn write_asset(dir: &Path, filename: &str, bytes: &[u8]) -> Result<()> {
    let target = validate_output_path(dir, filename)?;

    let parent = target.parent().unwrap_or(dir);
    fs::create_dir_all(parent).map_err(|e| {
        Error::WriteFailure(format!("failed to create directory '{}': {e}", parent.display()))
    })?;

    // Temp file next to the target so the rename stays on one filesystem.
    let temp = temp_path(&target);
    fs::write(&temp, bytes).map_err(|e| {
        Error::WriteFailure(format!("failed to write temporary file '{}': {e}", temp.display()))
    })?;

    fs::rename(&temp, &target).map_err(|e| {
        let _ = fs::remove_file(&temp);
        Error::WriteFailure(format!(
            "failed to rename '{}' to '{}': {e}",
            temp.display(),
            target.display()
        ))
    })
}

fn temp_path(target: &Path) -> PathBuf {
    let mut name = target.file_name().map_or_else(Default::default, |n| n.to_os_string());
    name.push(".tmp");
    target.with_file_name(name)
}

/// Validate that `filename` resolves to a path inside `base_dir`.
///
/// Rejects null bytes, absolute filenames, and any `..` traversal that
/// would escape the output directory.
pub fn validate_output_path(base_dir: &Path, filename: &str) -> Result<PathBuf> {
    if filename.contains('\0') {
        return Err(Error::InvalidOutputPath("filename contains null byte".to_string()));
    }

    let full_path = base_dir.join(Path::new(filename).clean()).clean();

    if !full_path.starts_with(base_dir) {
        return Err(Error::InvalidOutputPath(format!(
            "'{}' escapes output directory '{}' (resolved to '{}')",
            filename,
            base_dir.display(),
            full_path.display()
        )));
    }

    Ok(full_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_filename() {
        let base = Path::new("/tmp/out");
        assert_eq!(validate_output_path(base, "main.js").unwrap(), Path::new("/tmp/out/main.js"));
    }

    #[test]
    fn accepts_nested_filename() {
        let base = Path::new("/tmp/out");
        assert_eq!(
            validate_output_path(base, "js/app/main.js").unwrap(),
            Path::new("/tmp/out/js/app/main.js")
        );
    }

    #[test]
    fn rejects_traversal() {
        let base = Path::new("/tmp/out");
        assert!(matches!(
            validate_output_path(base, "../escape.js"),
            Err(Error::InvalidOutputPath(_))
        ));
        assert!(validate_output_path(base, "nested/../../../etc/passwd").is_err());
    }

    #[test]
    fn rejects_null_bytes() {
        let base = Path::new("/tmp/out");
        assert!(validate_output_path(base, "main\0.js").is_err());
    }

    #[test]
    fn temp_path_appends_suffix_to_full_name() {
        assert_eq!(temp_path(Path::new("/out/main.js")), Path::new("/out/main.js.tmp"));
        assert_eq!(temp_path(Path::new("/out/main.js.map")), Path::new("/out/main.js.map.tmp"));
    }

    #[test]
    fn write_asset_creates_directories_and_content() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("dist");

        write_asset(&out, "js/main.js", b"var x = 1;").unwrap();

        assert_eq!(fs::read(out.join("js/main.js")).unwrap(), b"var x = 1;");
        assert!(!out.join("js/main.js.tmp").exists());
    }

    #[test]
    fn write_asset_replaces_existing_content() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().to_path_buf();

        write_asset(&out, "main.js", b"first").unwrap();
        write_asset(&out, "main.js", b"second").unwrap();

        assert_eq!(fs::read(out.join("main.js")).unwrap(), b"second");
    }
}
