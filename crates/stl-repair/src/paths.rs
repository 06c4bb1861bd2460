//! Output and log file naming.

use std::path::{Path, PathBuf};

/// `<dir>/<stem><suffix><ext>` next to the input; `.stl` if the input has no extension.
pub fn derive_output(input: &Path, suffix: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = input
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_else(|| "stl".to_string());
    input.with_file_name(format!("{stem}{suffix}.{ext}"))
}

/// Replace any extension other than `stl` (case-insensitive) with `.stl`.
pub fn ensure_stl_extension(path: PathBuf) -> PathBuf {
    match path.extension() {
        Some(ext) if ext.eq_ignore_ascii_case("stl") => path,
        _ => path.with_extension("stl"),
    }
}

/// Output for `input`: the explicit path if given (suffix ignored), else derived.
pub fn resolve_output(input: &Path, explicit: Option<&Path>, suffix: &str) -> PathBuf {
    let output = match explicit {
        Some(path) => path.to_path_buf(),
        None => derive_output(input, suffix),
    };
    ensure_stl_extension(output)
}

/// Log file written next to an output, named after it.
pub fn log_file_path(output: &Path) -> PathBuf {
    output.with_extension("log")
}

/// Whether two paths name the same file, resolving them when they exist.
pub fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}
