//! Path filtering using .gitignore-style patterns
//!
//! Architectural Principle: Service Layer - PathFilter decides which script files are checked
//! - Configured patterns are applied in order, later `!pattern` entries re-include
//! - `.styleignore` files found in a file's ancestor directories add their own patterns
//! - Only files with a configured script extension are considered

use crate::domain::violations::{StyleError, StyleResult};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Default name of per-directory ignore files
pub const DEFAULT_IGNORE_FILE: &str = ".styleignore";

/// Manages path filtering using .gitignore-style patterns
#[derive(Debug, Clone)]
pub struct PathFilter {
    patterns: Vec<FilterPattern>,
    /// Ignore file name to look for, if ignore files are honored
    ignore_filename: Option<String>,
    /// Lowercase extensions without the dot
    extensions: Vec<String>,
}

/// A single path filter pattern
#[derive(Debug, Clone)]
struct FilterPattern {
    pattern: glob::Pattern,
    /// `!pattern` re-includes what earlier patterns excluded
    is_include: bool,
    /// Pattern text without the `!` prefix
    original: String,
}

impl FilterPattern {
    fn parse(line: &str) -> Result<Self, glob::PatternError> {
        let (is_include, text) = match line.strip_prefix('!') {
            Some(stripped) => (true, stripped),
            None => (false, line),
        };
        let pattern = glob::Pattern::new(text.trim_start_matches('/').trim_end_matches('/'))?;
        Ok(Self { pattern, is_include, original: text.to_string() })
    }

    /// Match `relative` with gitignore conventions
    ///
    /// Patterns containing `/` are anchored to the filter root; bare patterns
    /// match any single path component. A trailing `/` matches a directory
    /// anywhere above the file.
    fn matches(&self, relative: &Path) -> bool {
        let components: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();

        if self.original.ends_with('/') {
            let directories = components.len().saturating_sub(1);
            return components[..directories].iter().any(|c| self.pattern.matches(c))
                || (1..=directories).any(|n| self.pattern.matches(&components[..n].join("/")));
        }

        if self.original.trim_start_matches('/').contains('/') {
            return self.pattern.matches(&components.join("/"));
        }

        components.iter().any(|c| self.pattern.matches(c))
    }
}

impl PathFilter {
    /// Create a filter from patterns, an optional ignore file name and script extensions
    pub fn new(
        patterns: Vec<String>,
        ignore_filename: Option<String>,
        extensions: Vec<String>,
    ) -> StyleResult<Self> {
        let patterns = patterns
            .iter()
            .map(|p| {
                FilterPattern::parse(p)
                    .map_err(|e| StyleError::pattern(format!("Invalid pattern '{p}': {e}")))
            })
            .collect::<StyleResult<Vec<_>>>()?;

        Ok(Self {
            patterns,
            ignore_filename,
            extensions: extensions
                .into_iter()
                .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
                .collect(),
        })
    }

    /// Skip the generated folders of a game project
    pub fn with_defaults() -> StyleResult<Self> {
        Self::new(
            default_exclusions(),
            Some(DEFAULT_IGNORE_FILE.to_string()),
            vec!["cs".to_string()],
        )
    }

    /// Whether `path` has a script extension
    pub fn has_script_extension(&self, path: &Path) -> bool {
        if self.extensions.is_empty() {
            return true;
        }
        path.extension()
            .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
            .is_some_and(|ext| self.extensions.contains(&ext))
    }

    /// Check a path relative to `root` against configured patterns and ignore files
    pub fn should_analyze(&self, root: &Path, path: &Path) -> StyleResult<bool> {
        if !self.has_script_extension(path) {
            return Ok(false);
        }

        let relative = path.strip_prefix(root).unwrap_or(path);
        let mut included = true;
        for pattern in &self.patterns {
            if pattern.matches(relative) {
                included = pattern.is_include;
            }
        }
        if !included {
            tracing::debug!("{} excluded by configured patterns", path.display());
            return Ok(false);
        }

        if self.is_ignored_by_files(path)? {
            tracing::debug!("{} excluded by an ignore file", path.display());
            return Ok(false);
        }

        Ok(true)
    }

    /// Walk up from `path` applying each ignore file found, nearest last
    fn is_ignored_by_files(&self, path: &Path) -> StyleResult<bool> {
        let Some(filename) = &self.ignore_filename else {
            return Ok(false);
        };

        let mut ancestors: Vec<&Path> = path.ancestors().skip(1).collect();
        ancestors.reverse();

        let mut ignored = false;
        for dir in ancestors {
            let ignore_file = dir.join(filename);
            if !ignore_file.is_file() {
                continue;
            }
            let Ok(relative) = path.strip_prefix(dir) else {
                continue;
            };
            for pattern in load_ignore_file(&ignore_file)? {
                if pattern.matches(relative) {
                    ignored = !pattern.is_include;
                }
            }
        }

        Ok(ignored)
    }

    /// All script files under `root`, sorted by path
    ///
    /// Unreadable directory entries are logged and skipped.
    pub fn find_files(&self, root: &Path) -> StyleResult<Vec<PathBuf>> {
        if root.is_file() {
            return Ok(if self.has_script_extension(root) { vec![root.to_path_buf()] } else { vec![] });
        }
        if !root.exists() {
            return Err(StyleError::Io {
                source: std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("path '{}' does not exist", root.display()),
                ),
            });
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(root).follow_links(false).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("Skipping unreadable entry under {}: {}", root.display(), e);
                    continue;
                }
            };
            if entry.file_type().is_file() && self.should_analyze(root, entry.path())? {
                files.push(entry.into_path());
            }
        }

        Ok(files)
    }

    /// Add a pattern after the configured ones
    pub fn add_pattern(&mut self, pattern: &str) -> StyleResult<()> {
        let parsed = FilterPattern::parse(pattern)
            .map_err(|e| StyleError::pattern(format!("Invalid pattern '{pattern}': {e}")))?;
        self.patterns.push(parsed);
        Ok(())
    }

    /// Stop honoring ignore files
    pub fn disable_ignore_files(&mut self) {
        self.ignore_filename = None;
    }

    /// Which patterns match `path`, for `--verbose` output
    pub fn debug_patterns(&self, root: &Path, path: &Path) -> Vec<String> {
        let relative = path.strip_prefix(root).unwrap_or(path);
        self.patterns
            .iter()
            .enumerate()
            .map(|(i, pattern)| {
                format!(
                    "Pattern {}: {}{} -> {}",
                    i,
                    if pattern.is_include { "!" } else { "" },
                    pattern.original,
                    if pattern.matches(relative) { "MATCH" } else { "no match" }
                )
            })
            .collect()
    }
}

/// Generated and third-party folders of a game project
pub fn default_exclusions() -> Vec<String> {
    ["Library/", "Temp/", "obj/", "Logs/", "Build/", "Builds/", "UserSettings/", "*.g.cs", "*.Designer.cs"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Parse an ignore file; invalid lines are logged and skipped
fn load_ignore_file(path: &Path) -> StyleResult<Vec<FilterPattern>> {
    let content = fs::read_to_string(path).map_err(|e| {
        StyleError::config(format!("Failed to read ignore file '{}': {}", path.display(), e))
    })?;

    let mut patterns = Vec::new();
    for line in content.lines().map(str::trim) {
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        match FilterPattern::parse(line) {
            Ok(pattern) => patterns.push(pattern),
            Err(e) => tracing::warn!("Invalid pattern '{}' in {}: {}", line, path.display(), e),
        }
    }
    Ok(patterns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn filter(patterns: &[&str]) -> PathFilter {
        PathFilter::new(patterns.iter().map(|s| s.to_string()).collect(), None, vec!["cs".into()])
            .unwrap()
    }

    #[test]
    fn test_extension_filter() {
        let filter = filter(&[]);
        let root = Path::new("");
        assert!(filter.should_analyze(root, Path::new("Assets/Player.cs")).unwrap());
        assert!(filter.should_analyze(root, Path::new("Assets/Player.CS")).unwrap());
        assert!(!filter.should_analyze(root, Path::new("Assets/Player.cs.meta")).unwrap());
        assert!(!filter.should_analyze(root, Path::new("Assets/readme.md")).unwrap());
    }

    #[test]
    fn test_directory_and_include_patterns() {
        let filter = filter(&["Library/", "Assets/Plugins/**", "!Assets/Plugins/Ours/**", "*.g.cs"]);
        let root = Path::new("/project");
        let check = |p: &str| filter.should_analyze(root, &Path::new("/project").join(p)).unwrap();

        assert!(check("Assets/Scripts/Player.cs"));
        assert!(!check("Library/PackageCache/Foo.cs"));
        assert!(!check("Assets/Plugins/Vendor/Lib.cs"));
        assert!(check("Assets/Plugins/Ours/Helper.cs"));
        assert!(!check("Assets/Scripts/Input.g.cs"));
    }

    #[test]
    fn test_invalid_pattern_is_rejected() {
        let result = PathFilter::new(vec!["[invalid".to_string()], None, vec![]);
        assert!(matches!(result, Err(StyleError::Pattern { .. })));
    }

    #[test]
    fn test_ignore_file_and_find_files() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join("Assets/Scripts")).unwrap();
        fs::create_dir_all(root.join("Assets/ThirdParty")).unwrap();
        fs::create_dir_all(root.join("Library")).unwrap();

        fs::write(root.join(".styleignore"), "# vendored\nThirdParty/\n!Patched.cs\n").unwrap();
        fs::write(root.join("Assets/Scripts/Player.cs"), "class Player {}").unwrap();
        fs::write(root.join("Assets/Scripts/Player.cs.meta"), "guid").unwrap();
        fs::write(root.join("Assets/ThirdParty/Tween.cs"), "class Tween {}").unwrap();
        fs::write(root.join("Assets/ThirdParty/Patched.cs"), "class Patched {}").unwrap();
        fs::write(root.join("Library/Cache.cs"), "class Cache {}").unwrap();

        let filter = PathFilter::with_defaults().unwrap();
        let files: Vec<_> = filter
            .find_files(root)
            .unwrap()
            .into_iter()
            .map(|p| p.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/"))
            .collect();

        assert_eq!(files, vec!["Assets/Scripts/Player.cs", "Assets/ThirdParty/Patched.cs"]);

        let mut without_ignore = PathFilter::with_defaults().unwrap();
        without_ignore.disable_ignore_files();
        assert_eq!(without_ignore.find_files(root).unwrap().len(), 3);
    }

    #[test]
    fn test_find_files_on_missing_path() {
        let result = filter(&[]).find_files(Path::new("/definitely/not/here"));
        assert!(matches!(result, Err(StyleError::Io { .. })));
    }

    #[test]
    fn test_debug_patterns() {
        let filter = filter(&["Temp/"]);
        let info = filter.debug_patterns(Path::new(""), Path::new("Temp/a.cs"));
        assert_eq!(info, vec!["Pattern 0: Temp/ -> MATCH"]);
    }
}
