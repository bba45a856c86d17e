use crate::ConfigError;
use regex::RegexSet;

/// Compiled exclusion patterns
///
/// A link whose text matches any pattern is presumed fine: it is never fetched
/// and never reported. Patterns are unanchored regular expressions, so anchor
/// them with `^` to match on a prefix.
#[derive(Debug, Clone)]
pub struct ExclusionSet {
    patterns: RegexSet,
}

impl ExclusionSet {
    /// Compiles a list of patterns
    ///
    /// # Examples
    ///
    /// ```
    /// use linkrot::url::ExclusionSet;
    ///
    /// let set = ExclusionSet::new(&[r"^https://example\.com/ignore".to_string()]).unwrap();
    /// assert!(set.is_excluded("https://example.com/ignore/anything"));
    /// assert!(!set.is_excluded("https://example.com/keep"));
    /// ```
    pub fn new(patterns: &[String]) -> Result<Self, ConfigError> {
        let patterns =
            RegexSet::new(patterns).map_err(|e| ConfigError::InvalidPattern(e.to_string()))?;
        Ok(Self { patterns })
    }

    /// Checks if a link matches any exclusion pattern
    pub fn is_excluded(&self, link: &str) -> bool {
        self.patterns.is_match(link)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(patterns: &[&str]) -> ExclusionSet {
        let patterns: Vec<String> = patterns.iter().map(|p| p.to_string()).collect();
        ExclusionSet::new(&patterns).unwrap()
    }

    #[test]
    fn test_prefix_pattern() {
        let set = set(&[r"^https://example\.com/ignore"]);
        assert!(set.is_excluded("https://example.com/ignore"));
        assert!(set.is_excluded("https://example.com/ignore/anything"));
        assert!(!set.is_excluded("https://example.com/other"));
        assert!(!set.is_excluded("https://other.com/https://example.com/ignore"));
    }

    #[test]
    fn test_unanchored_pattern_matches_anywhere() {
        let set = set(&["linkedin"]);
        assert!(set.is_excluded("https://www.linkedin.com/in/someone"));
        assert!(!set.is_excluded("https://example.com/"));
    }

    #[test]
    fn test_any_of_many_patterns() {
        let set = set(&["^https://a\\.com", "^https://b\\.com"]);
        assert!(set.is_excluded("https://a.com/x"));
        assert!(set.is_excluded("https://b.com/y"));
        assert!(!set.is_excluded("https://c.com/z"));
    }

    #[test]
    fn test_empty_set_excludes_nothing() {
        let set = set(&[]);
        assert!(!set.is_excluded("https://example.com/"));
    }

    #[test]
    fn test_invalid_pattern() {
        let result = ExclusionSet::new(&["[".to_string()]);
        assert!(matches!(result, Err(ConfigError::InvalidPattern(_))));
    }
}
