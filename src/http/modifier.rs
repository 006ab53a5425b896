//! Optional URL rewriting applied right before dispatch

use regex::Regex;
use std::fmt;
use std::sync::Arc;

type Transform = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// Rewrites URLs matching `matcher`, e.g. to send a request to a mirrored host.
#[derive(Clone)]
pub struct UrlModifier {
    matcher: Regex,
    transform: Transform,
}

impl fmt::Debug for UrlModifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UrlModifier")
            .field("matcher", &self.matcher.as_str())
            .finish_non_exhaustive()
    }
}

impl UrlModifier {
    pub fn new(matcher: Regex, transform: impl Fn(&str) -> String + Send + Sync + 'static) -> Self {
        Self {
            matcher,
            transform: Arc::new(transform),
        }
    }

    /// Replaces the first match of `pattern` with `replacement` (`$1` style captures allowed).
    pub fn mirror(pattern: &str, replacement: &str) -> Result<Self, regex::Error> {
        let regex = Regex::new(pattern)?;
        let replace_with = regex.clone();
        let replacement = replacement.to_string();
        Ok(Self::new(regex, move |url| {
            replace_with.replace(url, replacement.as_str()).into_owned()
        }))
    }

    #[must_use]
    pub fn matches(&self, url: &str) -> bool {
        self.matcher.is_match(url)
    }

    #[must_use]
    pub fn apply(&self, url: &str) -> String {
        (self.transform)(url)
    }
}

/// Modifiers in registration order. Only the first matching one is applied.
#[derive(Debug, Clone, Default)]
pub struct UrlModifiers {
    modifiers: Vec<UrlModifier>,
}

impl UrlModifiers {
    #[must_use]
    pub fn new(modifiers: Vec<UrlModifier>) -> Self {
        Self { modifiers }
    }

    pub fn push(&mut self, modifier: UrlModifier) {
        self.modifiers.push(modifier);
    }

    #[must_use]
    pub fn apply(&self, url: &str) -> String {
        match self.modifiers.iter().find(|modifier| modifier.matches(url)) {
            Some(modifier) => {
                let rewritten = modifier.apply(url);
                tracing::debug!(from = url, to = %rewritten, "Rewrote request URL");
                rewritten
            }
            None => url.to_string(),
        }
    }
}
