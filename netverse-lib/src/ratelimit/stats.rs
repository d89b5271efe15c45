use std::collections::HashMap;

use serde::Serialize;

/// A [`HashMap`] mapping keys to their [`KeyStats`]
#[derive(Debug, Default, Serialize)]
pub struct KeyStatsMap(HashMap<String, KeyStats>);

impl KeyStatsMap {
    /// Sort key statistics by admitted operations (descending order),
    /// ties broken by key name
    #[must_use]
    pub fn sorted(&self) -> Vec<(String, KeyStats)> {
        let mut sorted_keys: Vec<_> = self
            .0
            .iter()
            .map(|(key, stats)| (key.clone(), *stats))
            .collect();
        sorted_keys.sort_by(|(a_key, a), (b_key, b)| {
            b.admitted.cmp(&a.admitted).then_with(|| a_key.cmp(b_key))
        });
        sorted_keys
    }

    /// Get the statistics of a single key
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&KeyStats> {
        self.0.get(key)
    }

    /// Number of keys with statistics
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no key has been used yet
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<HashMap<String, KeyStats>> for KeyStatsMap {
    fn from(value: HashMap<String, KeyStats>) -> Self {
        Self(value)
    }
}

/// Record and report what the governor did for a single key
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct KeyStats {
    /// Admission slots granted, inline and from the queue
    pub admitted: u64,
    /// Admission checks that found the window full
    pub throttled: u64,
    /// Inline retries after a backoff
    pub retries: u64,
    /// Failures of the operation tagged as upstream rate limiting
    pub rate_limit_signals: u64,
    /// Operations moved to the overflow queue
    pub queued: u64,
    /// Operations rejected because the queue was full
    pub rejected: u64,
    /// Operations run by the drain loop
    pub drained: u64,
    /// Operations that finished with an error, inline or from the queue
    pub failed: u64,
}

impl KeyStats {
    /// Share of admission checks that had to wait (0.0 to 1.0)
    #[must_use]
    pub fn throttle_rate(&self) -> f64 {
        let checks = self.admitted + self.throttled;
        if checks == 0 {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)]
        let rate = self.throttled as f64 / checks as f64;
        rate
    }

    /// Human-readable one-line summary
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "{} admitted, {} throttled ({:.0}%), {} retries, {} queued, {} drained, {} rejected, {} failed",
            self.admitted,
            self.throttled,
            self.throttle_rate() * 100.0,
            self.retries,
            self.queued,
            self.drained,
            self.rejected,
            self.failed,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_throttle_rate() {
        let stats = KeyStats::default();
        assert!((stats.throttle_rate() - 0.0).abs() < f64::EPSILON);

        let stats = KeyStats {
            admitted: 3,
            throttled: 1,
            ..KeyStats::default()
        };
        assert!((stats.throttle_rate() - 0.25).abs() < f64::EPSILON);
    }

    #[test]
    fn test_sorted_by_admitted() {
        let map: KeyStatsMap = HashMap::from([
            (
                "crawler".to_string(),
                KeyStats {
                    admitted: 2,
                    ..KeyStats::default()
                },
            ),
            (
                "brave-api-web".to_string(),
                KeyStats {
                    admitted: 5,
                    ..KeyStats::default()
                },
            ),
            (
                "brave-api-news".to_string(),
                KeyStats {
                    admitted: 2,
                    ..KeyStats::default()
                },
            ),
        ])
        .into();

        let keys: Vec<_> = map.sorted().into_iter().map(|(key, _)| key).collect();
        assert_eq!(keys, vec!["brave-api-web", "brave-api-news", "crawler"]);
    }

    #[test]
    fn test_summary() {
        let stats = KeyStats {
            admitted: 3,
            throttled: 1,
            queued: 1,
            drained: 1,
            ..KeyStats::default()
        };
        assert_eq!(
            stats.summary(),
            "3 admitted, 1 throttled (25%), 0 retries, 1 queued, 1 drained, 0 rejected, 0 failed"
        );
    }
}
