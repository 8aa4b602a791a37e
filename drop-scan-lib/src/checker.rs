//! Index presence checking across one or more engines.
//!
//! The `IndexChecker` asks every configured engine how many pages it holds
//! for a domain and folds the answers into a single three-valued
//! `IndexResult`. Calls to the same engine are spaced by a fixed delay.

use crate::error::ScanError;
use crate::protocols::WaybackEngine;
use crate::types::{IndexResult, ScanConfig};
use async_trait::async_trait;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

/// A search engine or archive that can estimate a domain's page count.
#[async_trait]
pub trait IndexEngine: Send + Sync {
    /// Short engine name, recorded as the record's `index_source`.
    fn name(&self) -> &str;

    /// Number of pages the engine holds for `domain` (0 = none).
    ///
    /// Blocked, malformed or timed-out responses are errors, never zero.
    async fn page_count(&self, domain: &str) -> Result<u64, ScanError>;
}

struct EngineSlot {
    engine: Box<dyn IndexEngine>,
    last_call: Option<Instant>,
}

/// Checks index presence for one domain at a time.
///
/// # Example
///
/// ```rust,no_run
/// use drop_scan_lib::{IndexChecker, ScanConfig};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let mut checker = IndexChecker::from_config(&ScanConfig::default())?;
///     let result = checker.check("example.se").await;
///     println!("indexed: {:?}, pages: {:?}", result.indexed, result.estimated_pages);
///     Ok(())
/// }
/// ```
pub struct IndexChecker {
    engines: Vec<EngineSlot>,
    delay: Duration,
}

impl IndexChecker {
    /// Create a checker over explicit engines.
    pub fn new(engines: Vec<Box<dyn IndexEngine>>, delay: Duration) -> Self {
        Self {
            engines: engines
                .into_iter()
                .map(|engine| EngineSlot {
                    engine,
                    last_call: None,
                })
                .collect(),
            delay,
        }
    }

    /// Create a checker with the engines named in `config.engines`.
    pub fn from_config(config: &ScanConfig) -> Result<Self, ScanError> {
        let mut engines: Vec<Box<dyn IndexEngine>> = Vec::new();

        for name in &config.engines {
            match name.as_str() {
                "wayback" => engines.push(Box::new(WaybackEngine::new(config)?)),
                #[cfg(feature = "commoncrawl")]
                "commoncrawl" => engines.push(Box::new(
                    crate::protocols::CommonCrawlEngine::new(config)?,
                )),
                other => {
                    return Err(ScanError::config(format!(
                        "Unknown index engine '{}'",
                        other
                    )))
                }
            }
        }

        if engines.is_empty() {
            return Err(ScanError::config("At least one index engine is required"));
        }

        Ok(Self::new(engines, config.index_delay))
    }

    /// Names of the engines, in query order.
    pub fn engine_names(&self) -> Vec<&str> {
        self.engines.iter().map(|slot| slot.engine.name()).collect()
    }

    /// Delay enforced between calls to the same engine.
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Query every engine for `domain` and combine the answers.
    ///
    /// One engine failing never aborts the check; only when all of them fail
    /// is the result unknown.
    pub async fn check(&mut self, domain: &str) -> IndexResult {
        let mut outcomes = Vec::with_capacity(self.engines.len());

        for slot in &mut self.engines {
            if let Some(last) = slot.last_call {
                let elapsed = last.elapsed();
                if elapsed < self.delay {
                    tokio::time::sleep(self.delay - elapsed).await;
                }
            }

            let result = slot.engine.page_count(domain).await;
            slot.last_call = Some(Instant::now());

            if let Err(e) = &result {
                warn!(domain, engine = slot.engine.name(), error = %e, "index engine failed");
            }
            outcomes.push((slot.engine.name().to_string(), result));
        }

        let result = combine_counts(outcomes);
        debug!(domain, ?result, "index check finished");
        result
    }
}

/// Fold per-engine page counts into one result.
///
/// - any engine with pages: indexed, with the largest count and its engine
///   (the earliest engine wins a tie)
/// - otherwise, any engine that answered: not indexed
/// - otherwise: unknown
pub fn combine_counts<I>(outcomes: I) -> IndexResult
where
    I: IntoIterator<Item = (String, Result<u64, ScanError>)>,
{
    let mut answered = false;
    let mut best: Option<(u64, String)> = None;

    for (engine, outcome) in outcomes {
        let Ok(pages) = outcome else { continue };
        answered = true;
        if pages == 0 {
            continue;
        }
        if best.as_ref().map_or(true, |(max, _)| pages > *max) {
            best = Some((pages, engine));
        }
    }

    match best {
        Some((pages, engine)) => IndexResult::indexed(pages, engine),
        None if answered => IndexResult::not_indexed(),
        None => IndexResult::unknown(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn failed() -> Result<u64, ScanError> {
        Err(ScanError::lookup("example.se", "HTTP 429"))
    }

    #[test]
    fn test_combine_picks_maximum() {
        let result = combine_counts(vec![
            ("wayback".to_string(), Ok(40)),
            ("commoncrawl".to_string(), Ok(150)),
        ]);
        assert_eq!(result, IndexResult::indexed(150, "commoncrawl"));
    }

    #[test]
    fn test_combine_tie_keeps_first_engine() {
        let result = combine_counts(vec![
            ("wayback".to_string(), Ok(7)),
            ("commoncrawl".to_string(), Ok(7)),
        ]);
        assert_eq!(result.source.as_deref(), Some("wayback"));
    }

    #[test]
    fn test_combine_failure_does_not_hide_other_engine() {
        let result = combine_counts(vec![
            ("wayback".to_string(), failed()),
            ("commoncrawl".to_string(), Ok(3)),
        ]);
        assert_eq!(result, IndexResult::indexed(3, "commoncrawl"));
    }

    #[test]
    fn test_combine_confirmed_zero_vs_unknown() {
        let zero = combine_counts(vec![
            ("wayback".to_string(), failed()),
            ("commoncrawl".to_string(), Ok(0)),
        ]);
        assert_eq!(zero, IndexResult::not_indexed());

        let unknown = combine_counts(vec![
            ("wayback".to_string(), failed()),
            ("commoncrawl".to_string(), failed()),
        ]);
        assert_eq!(unknown, IndexResult::unknown());
        assert_eq!(unknown.indexed, None);
    }

    struct RecordingEngine {
        calls: Arc<Mutex<Vec<Instant>>>,
        pages: u64,
    }

    #[async_trait]
    impl IndexEngine for RecordingEngine {
        fn name(&self) -> &str {
            "recording"
        }

        async fn page_count(&self, _domain: &str) -> Result<u64, ScanError> {
            self.calls.lock().unwrap().push(Instant::now());
            Ok(self.pages)
        }
    }

    #[tokio::test]
    async fn test_delay_between_calls_to_same_engine() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let engine = RecordingEngine {
            calls: calls.clone(),
            pages: 5,
        };
        let delay = Duration::from_millis(60);
        let mut checker = IndexChecker::new(vec![Box::new(engine)], delay);

        let first = checker.check("a.se").await;
        checker.check("b.se").await;
        checker.check("c.se").await;

        assert_eq!(first, IndexResult::indexed(5, "recording"));
        let calls = calls.lock().unwrap();
        assert_eq!(calls.len(), 3);
        for pair in calls.windows(2) {
            assert!(pair[1] - pair[0] >= delay);
        }
    }

    #[test]
    fn test_from_config_builds_named_engines() {
        let checker = IndexChecker::from_config(&ScanConfig::default()).unwrap();
        assert_eq!(checker.engine_names(), vec!["wayback"]);

        let config = ScanConfig::default().with_engines(vec!["altavista".to_string()]);
        assert!(IndexChecker::from_config(&config).is_err());

        let config = ScanConfig::default().with_engines(vec![]);
        assert!(IndexChecker::from_config(&config).is_err());
    }
}
