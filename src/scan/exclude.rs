use std::path::{Component, Path};

use globset::{GlobBuilder, GlobMatcher};
use snafu::{ResultExt, Snafu, ensure};

/// A single exclusion glob, matched from the right like a relative path:
/// a pattern of N components is tested against the last N components of a
/// candidate. A leading `/` anchors it to the whole path instead.
#[derive(Debug, Clone)]
struct ExcludePattern {
    matcher: GlobMatcher,
    components: usize,
    anchored: bool,
}

impl ExcludePattern {
    fn compile(pattern: &str) -> Result<Self, PatternError> {
        let anchored = pattern.starts_with('/');
        let parts: Vec<&str> = pattern.split('/').filter(|part| !part.is_empty()).collect();
        ensure!(
            !parts.is_empty(),
            EmptyPatternSnafu {
                pattern: pattern.to_string(),
            }
        );

        let glob = GlobBuilder::new(&parts.join("/"))
            .literal_separator(true)
            .build()
            .context(InvalidPatternSnafu {
                pattern: pattern.to_string(),
            })?;

        Ok(Self {
            matcher: glob.compile_matcher(),
            components: parts.len(),
            anchored,
        })
    }

    fn matches(&self, components: &[&str]) -> bool {
        if components.len() < self.components {
            return false;
        }
        if self.anchored && components.len() != self.components {
            return false;
        }

        let tail = components[components.len() - self.components..].join("/");
        self.matcher.is_match(tail)
    }
}

/// Decides which scanned entries are left out of the index.
///
/// Hidden entries (names starting with `.`) are always excluded.
#[derive(Debug, Clone, Default)]
pub struct ExcludeMatcher {
    patterns: Vec<ExcludePattern>,
}

impl ExcludeMatcher {
    /// Compiles every pattern up front so a bad one fails before scanning.
    pub fn new<I, S>(patterns: I) -> Result<Self, PatternError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|pattern| ExcludePattern::compile(pattern.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { patterns })
    }

    pub fn is_excluded(&self, path: &Path) -> bool {
        let Some(name) = path.file_name() else {
            return false;
        };
        if name.as_encoded_bytes().first() == Some(&b'.') {
            return true;
        }
        if self.patterns.is_empty() {
            return false;
        }

        let owned: Vec<_> = path
            .components()
            .filter_map(|component| match component {
                Component::Normal(part) => Some(part.to_string_lossy()),
                _ => None,
            })
            .collect();
        let components: Vec<&str> = owned.iter().map(|part| part.as_ref()).collect();

        self.patterns
            .iter()
            .any(|pattern| pattern.matches(&components))
    }
}

#[derive(Debug, Snafu)]
pub enum PatternError {
    #[snafu(display("Exclusion pattern '{}' is empty", pattern))]
    EmptyPatternError { pattern: String },
    #[snafu(display("Exclusion pattern '{}' is not a valid glob", pattern))]
    InvalidPatternError {
        pattern: String,
        source: globset::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("/res/.git")]
    #[case("/res/gfx/.hidden.png")]
    #[case(".DS_Store")]
    fn hidden_entries_are_always_excluded(#[case] path: &str) {
        let matcher = ExcludeMatcher::default();

        assert!(matcher.is_excluded(Path::new(path)));
    }

    #[rstest]
    #[case("*.psd", "/res/gfx/logo.psd", true)]
    #[case("*.psd", "/res/gfx/logo.png", false)]
    #[case("gfx/*.png", "/res/gfx/logo.png", true)]
    #[case("gfx/*.png", "/res/sfx/logo.png", false)]
    #[case("gfx/*.png", "/res/gfx/sub/logo.png", false)]
    #[case("src", "/res/shader/src", true)]
    #[case("src", "/res/shader/src.glsl", false)]
    #[case("*", "/res/anything", true)]
    #[case("/res/*", "/res/gfx", true)]
    #[case("/res/*", "/other/res/gfx", false)]
    #[case("a/b/c/d/e", "/b/c/d/e", false)]
    #[case("*.{wav,ogg}", "/res/sfx/boom.ogg", true)]
    fn patterns_match_from_the_right(
        #[case] pattern: &str,
        #[case] path: &str,
        #[case] excluded: bool,
    ) {
        let matcher = ExcludeMatcher::new([pattern]).expect("Pattern should compile");

        assert_eq!(matcher.is_excluded(Path::new(path)), excluded);
    }

    #[test]
    fn any_matching_pattern_excludes() {
        let matcher = ExcludeMatcher::new(["*.psd", "*.xcf"]).unwrap();

        assert!(matcher.is_excluded(Path::new("/res/a.xcf")));
        assert!(matcher.is_excluded(Path::new("/res/a.psd")));
        assert!(!matcher.is_excluded(Path::new("/res/a.png")));
    }

    #[rstest]
    #[case("")]
    #[case("/")]
    #[case("//")]
    fn empty_patterns_are_rejected(#[case] pattern: &str) {
        let result = ExcludeMatcher::new([pattern]);

        assert!(matches!(result, Err(PatternError::EmptyPatternError { .. })));
    }

    #[rstest]
    #[case("[unclosed")]
    #[case("{a,b")]
    fn invalid_globs_are_rejected(#[case] pattern: &str) {
        let result = ExcludeMatcher::new([pattern]);

        match result {
            Err(PatternError::InvalidPatternError { pattern: reported, .. }) => {
                assert_eq!(reported, pattern)
            }
            other => panic!("Expected InvalidPatternError, got {other:?}"),
        }
    }
}
