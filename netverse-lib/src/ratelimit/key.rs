use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of an independently throttled resource, e.g. `brave-api-images` or
/// `crawler`.
///
/// Keys are opaque and compared verbatim, so `Crawler` and `crawler` are two
/// separate keys with separate windows and queues.
///
/// # Examples
///
/// ```
/// use netverse_lib::ratelimit::GovernorKey;
///
/// let key = GovernorKey::from("brave-api-web");
/// assert_eq!(key.as_str(), "brave-api-web");
/// assert_ne!(key, GovernorKey::from("Brave-API-Web"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GovernorKey(String);

impl GovernorKey {
    /// Get the key as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Get the key as an owned String
    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for GovernorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for GovernorKey {
    fn from(key: String) -> Self {
        GovernorKey(key)
    }
}

impl From<&str> for GovernorKey {
    fn from(key: &str) -> Self {
        GovernorKey(key.to_owned())
    }
}

impl From<&GovernorKey> for GovernorKey {
    fn from(key: &GovernorKey) -> Self {
        key.clone()
    }
}
