//! Maps a request URL to how long its cached body stays fresh

use chrono::Duration;
use regex::Regex;

/// How an expiry rule recognizes a URL.
#[derive(Debug, Clone)]
pub enum Matcher {
    Substring(String),
    Pattern(Regex),
}

impl Matcher {
    pub fn substring(needle: impl Into<String>) -> Self {
        Self::Substring(needle.into())
    }

    pub fn pattern(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self::Pattern(Regex::new(pattern)?))
    }

    #[must_use]
    pub fn is_match(&self, url: &str) -> bool {
        match self {
            Matcher::Substring(needle) => url.contains(needle.as_str()),
            Matcher::Pattern(regex) => regex.is_match(url),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExpiryRule {
    pub matcher: Matcher,
    pub ttl: Duration,
}

impl ExpiryRule {
    #[must_use]
    pub fn new(matcher: Matcher, ttl_minutes: i64) -> Self {
        Self {
            matcher,
            ttl: Duration::minutes(ttl_minutes),
        }
    }
}

/// Ordered rule set; the first matching rule wins.
/// An empty set never serves from cache.
#[derive(Debug, Clone, Default)]
pub struct ExpiryRules {
    rules: Vec<ExpiryRule>,
}

impl ExpiryRules {
    #[must_use]
    pub fn new(rules: Vec<ExpiryRule>) -> Self {
        Self { rules }
    }

    /// TTL of the first rule matching `url`, `None` when caching is off for it.
    #[must_use]
    pub fn ttl_for(&self, url: &str) -> Option<Duration> {
        self.rules
            .iter()
            .find(|rule| rule.matcher.is_match(url))
            .map(|rule| rule.ttl)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules() -> ExpiryRules {
        ExpiryRules::new(vec![
            ExpiryRule::new(Matcher::substring("api.weather.gov/points"), 7 * 24 * 60),
            ExpiryRule::new(Matcher::pattern(r"api\.weather\.gov/gridpoints/.+/forecast").unwrap(), 60),
            ExpiryRule::new(Matcher::substring("api.weather.gov"), 30),
        ])
    }

    #[test]
    fn test_first_matching_rule_wins() {
        let rules = rules();
        assert_eq!(
            rules.ttl_for("https://api.weather.gov/points/39.8,-105.7"),
            Some(Duration::days(7))
        );
        assert_eq!(
            rules.ttl_for("https://api.weather.gov/gridpoints/BOU/1,2/forecast"),
            Some(Duration::minutes(60))
        );
        assert_eq!(
            rules.ttl_for("https://api.weather.gov/alerts"),
            Some(Duration::minutes(30))
        );
    }

    #[test]
    fn test_unmatched_url_is_not_cached() {
        assert_eq!(rules().ttl_for("https://api.open-meteo.com/v1/forecast"), None);
        assert_eq!(ExpiryRules::default().ttl_for("https://anything"), None);
        assert!(ExpiryRules::default().is_empty());
    }

    #[test]
    fn test_invalid_pattern_is_rejected() {
        assert!(Matcher::pattern("(unclosed").is_err());
    }
}
