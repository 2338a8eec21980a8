//! File name pattern matching
//!
//! Patterns are gitignore-style globs (`*.uf2`, `firmware-*.bin`) compiled
//! with the `ignore` crate. Only the file name is matched, since the watch
//! is never recursive.

use crate::error::{Result, WatchError};
use ignore::overrides::{Override, OverrideBuilder};
use std::path::Path;

/// Compiled glob pattern for the scan directory
#[derive(Debug, Clone)]
pub struct PatternFilter {
    pattern: String,
    matcher: Override,
}

impl PatternFilter {
    /// Compile `pattern`; matching ignores case unless `case_sensitive` is set
    pub fn new(pattern: &str, case_sensitive: bool) -> Result<Self> {
        let invalid = |source| WatchError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        };

        let mut builder = OverrideBuilder::new("");
        builder.case_insensitive(!case_sensitive).map_err(invalid)?;
        builder.add(pattern).map_err(invalid)?;
        let matcher = builder.build().map_err(invalid)?;

        Ok(Self {
            pattern: pattern.to_string(),
            matcher,
        })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Check whether the file name of `path` matches the pattern
    pub fn matches(&self, path: &Path) -> bool {
        let Some(name) = path.file_name() else {
            return false;
        };
        self.matcher.matched(Path::new(name), false).is_whitelist()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_pattern() {
        let filter = PatternFilter::new("*.uf2", false).unwrap();

        assert!(filter.matches(Path::new("/tmp/scan/firmware.uf2")));
        assert!(filter.matches(Path::new("blink.uf2")));
        assert!(!filter.matches(Path::new("/tmp/scan/firmware.uf2.crdownload")));
        assert!(!filter.matches(Path::new("/tmp/scan/notes.txt")));
        assert!(!filter.matches(Path::new("/")));
    }

    #[test]
    fn test_case_insensitive_by_default() {
        let filter = PatternFilter::new("*.uf2", false).unwrap();
        assert!(filter.matches(Path::new("/tmp/scan/FIRMWARE.UF2")));

        let strict = PatternFilter::new("*.uf2", true).unwrap();
        assert!(!strict.matches(Path::new("/tmp/scan/FIRMWARE.UF2")));
        assert!(strict.matches(Path::new("/tmp/scan/firmware.uf2")));
    }

    #[test]
    fn test_prefix_pattern() {
        let filter = PatternFilter::new("circuitplayground-*.uf2", false).unwrap();
        assert_eq!(filter.pattern(), "circuitplayground-*.uf2");

        assert!(filter.matches(Path::new("/dl/circuitplayground-blink.uf2")));
        assert!(!filter.matches(Path::new("/dl/microbit-blink.uf2")));
    }

    #[test]
    fn test_invalid_pattern() {
        let err = PatternFilter::new("[unclosed", false).unwrap_err();
        assert!(matches!(err, WatchError::InvalidPattern { .. }));
    }
}
