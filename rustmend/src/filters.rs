use glob::Pattern;
use std::path::Path;

/// Checks one extension entry against a path. Entries support shell-style
/// wildcards (`ph*`, `BUILD*`) via [`glob::Pattern`].
///
/// Files with an extension match on the extension; extensionless files match
/// on the whole basename, so an entry can name specific files. An entry of
/// `BUILD` picks up files literally named `BUILD`.
pub fn matches_extension_entry(path: &Path, entry: &str) -> bool {
    let pattern = match Pattern::new(entry) {
        Ok(p) => p,
        Err(_) => return false,
    };
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => pattern.matches(ext),
        None => path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|name| pattern.matches(name)),
    }
}

pub fn is_extensionless(path: &Path) -> bool {
    path.extension().is_none() && path.file_name().is_some()
}

/// Extension-set decision for a path. `None` means every file qualifies.
pub fn has_candidate_extension(
    path: &Path,
    extensions: &Option<Vec<String>>,
    include_extensionless: bool,
) -> bool {
    match extensions {
        None => true,
        Some(entries) => {
            if include_extensionless && is_extensionless(path) {
                return true;
            }
            entries
                .iter()
                .any(|entry| matches_extension_entry(path, entry))
        }
    }
}

/// Filters out editor droppings that walk like source files: backup files
/// ending in `~` and ctags indexes.
pub fn looks_like_source_file(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    !name.ends_with('~') && name != "tags" && name != "TAGS"
}

/// Checks if a file is likely to be binary
pub fn is_likely_binary(path: &Path) -> bool {
    const BINARY_EXTENSIONS: &[&str] = &[
        "exe", "dll", "so", "dylib", "a", "o", "obj", "bin", "class", "jar", "pyc", "wasm", "png",
        "jpg", "jpeg", "gif", "bmp", "ico", "webp", "pdf", "zip", "tar", "gz", "bz2", "xz", "7z",
        "rar", "woff", "woff2", "ttf", "otf",
    ];

    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| {
            BINARY_EXTENSIONS
                .iter()
                .any(|bin_ext| bin_ext.eq_ignore_ascii_case(ext))
        })
}

/// Checks if a path matches any user-supplied exclude pattern. Build output
/// and VCS bookkeeping directories are always excluded.
pub fn is_excluded(path: &Path, exclude_patterns: &[String]) -> bool {
    let path_str = path.to_string_lossy();

    if path_str.contains("/target/") || path_str.contains("/.git/") {
        return true;
    }

    exclude_patterns.iter().any(|pattern| {
        if let Ok(p) = Pattern::new(pattern) {
            let normalized = path_str.replace('\\', "/");
            p.matches(&normalized)
        } else {
            false
        }
    })
}

/// Combined candidate decision for one file.
pub fn is_candidate_file(
    path: &Path,
    extensions: &Option<Vec<String>>,
    include_extensionless: bool,
    exclude_patterns: &[String],
) -> bool {
    looks_like_source_file(path)
        && !is_likely_binary(path)
        && has_candidate_extension(path, extensions, include_extensionless)
        && !is_excluded(path, exclude_patterns)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_extension_entry() {
        assert!(matches_extension_entry(Path::new("a.php"), "php"));
        assert!(matches_extension_entry(Path::new("a.phtml"), "ph*"));
        assert!(!matches_extension_entry(Path::new("a.txt"), "php"));
        // Case matters, as in shell globbing.
        assert!(!matches_extension_entry(Path::new("a.PHP"), "php"));
        // Extensionless files match on their basename.
        assert!(matches_extension_entry(Path::new("dir/BUILD"), "BUILD"));
        assert!(matches_extension_entry(Path::new("BUILD.bazel"), "bazel"));
        assert!(!matches_extension_entry(Path::new("dir/Makefile"), "BUILD"));
    }

    #[test]
    fn test_wildcard_matches_everything() {
        assert!(matches_extension_entry(Path::new("a.php"), "*"));
        assert!(matches_extension_entry(Path::new("Makefile"), "*"));
    }

    #[test]
    fn test_has_candidate_extension() {
        let exts = Some(vec!["php".to_string()]);

        assert!(has_candidate_extension(Path::new("a.php"), &exts, true));
        assert!(has_candidate_extension(Path::new("b"), &exts, true));
        assert!(!has_candidate_extension(Path::new("c.txt"), &exts, true));
        assert!(!has_candidate_extension(Path::new("b"), &exts, false));
        assert!(has_candidate_extension(Path::new("anything.xyz"), &None, false));
    }

    #[test]
    fn test_looks_like_source_file() {
        assert!(looks_like_source_file(Path::new("src/main.rs")));
        assert!(!looks_like_source_file(Path::new("src/main.rs~")));
        assert!(!looks_like_source_file(Path::new("src/tags")));
        assert!(!looks_like_source_file(Path::new("TAGS")));
        assert!(looks_like_source_file(Path::new("tags.txt")));
    }

    #[test]
    fn test_is_likely_binary() {
        assert!(is_likely_binary(Path::new("prog.exe")));
        assert!(is_likely_binary(Path::new("image.PNG")));
        assert!(!is_likely_binary(Path::new("main.rs")));
        assert!(!is_likely_binary(Path::new("README")));
    }

    #[test]
    fn test_is_excluded() {
        let patterns = vec!["**/vendor/**".to_string(), "**/*.min.js".to_string()];

        assert!(is_excluded(Path::new("web/vendor/lib.php"), &patterns));
        assert!(is_excluded(Path::new("js/app.min.js"), &patterns));
        assert!(is_excluded(Path::new("proj/target/debug/main.rs"), &patterns));
        assert!(is_excluded(Path::new("proj/.git/config"), &patterns));
        assert!(!is_excluded(Path::new("src/app.js"), &patterns));
    }

    #[test]
    fn test_is_candidate_file() {
        let exts = Some(vec!["php".to_string()]);
        let excludes = vec!["**/gen/**".to_string()];

        assert!(is_candidate_file(Path::new("src/a.php"), &exts, true, &excludes));
        assert!(is_candidate_file(Path::new("src/runme"), &exts, true, &excludes));
        assert!(!is_candidate_file(Path::new("src/a.php~"), &exts, true, &excludes));
        assert!(!is_candidate_file(Path::new("src/gen/a.php"), &exts, true, &excludes));
        assert!(!is_candidate_file(Path::new("logo.png"), &None, true, &excludes));
    }
}
