//! HTTP access: expiry rules, URL rewriting, admission control and the retrying fetcher.

pub mod expiry;
pub mod fetcher;
pub mod modifier;
pub mod rate_limit;

pub use expiry::{ExpiryRule, ExpiryRules, Matcher};
pub use fetcher::{FetchRequest, Fetcher, RetryPolicy, Validator};
pub use modifier::{UrlModifier, UrlModifiers};
pub use rate_limit::RateLimiter;
