use crate::error::{Result, ScraperError};
use crate::exporter::Exporter;
use crate::fetcher::{profile_url, Fetcher};
use crate::parser::ProfileParser;
use crate::types::PlayerRecord;
use metrics::{counter, histogram};
use std::collections::HashSet;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Clone)]
pub struct PlayerFailure {
    pub player: String,
    pub error: String,
}

/// Outcome of one scrape run
#[derive(Debug)]
pub struct PipelineResult {
    pub total: usize,
    pub processed: usize,
    pub failed: Vec<PlayerFailure>,
    pub elapsed: Duration,
}

impl PipelineResult {
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.processed as f64 / self.total as f64 * 100.0
    }
}

/// Trimmed, non-blank names in first-seen order, each once.
pub fn unique_players(players: &[String]) -> Vec<&str> {
    let mut seen = HashSet::new();
    players
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty() && seen.insert(*p))
        .collect()
}

/// Fetch -> parse -> accumulate, one player at a time
pub struct Pipeline {
    fetcher: Box<dyn Fetcher>,
    parser: ProfileParser,
    profile_url_template: String,
}

impl Pipeline {
    pub fn new(fetcher: Box<dyn Fetcher>, parser: ProfileParser, profile_url_template: impl Into<String>) -> Self {
        Self {
            fetcher,
            parser,
            profile_url_template: profile_url_template.into(),
        }
    }

    #[instrument(skip(self))]
    pub async fn scrape_player(&self, player: &str) -> Result<PlayerRecord> {
        let url = profile_url(&self.profile_url_template, player);
        let html = self.fetcher.fetch(&url).await?;
        self.parser.parse(player, &url, &html)
    }

    /// Scrapes every player, skipping (and reporting) the ones that fail.
    /// Duplicate names are scraped once.
    pub async fn run(&self, players: &[String]) -> Result<(Exporter, PipelineResult)> {
        let queue = unique_players(players);
        if queue.is_empty() {
            return Err(ScraperError::Config("no players to scrape".into()));
        }

        let total = queue.len();
        info!("Starting scrape of {} players", total);
        let started = Instant::now();

        let mut exporter = Exporter::new(self.parser.field_names());
        let mut failed = Vec::new();

        for (i, player) in queue.into_iter().enumerate() {
            match self.scrape_player(player).await {
                Ok(record) => {
                    debug!("Scraped {} ({}/{})", player, i + 1, total);
                    exporter.push(record);
                }
                Err(e) => {
                    warn!("Failed to process {}: {}", player, e);
                    failed.push(PlayerFailure {
                        player: player.to_string(),
                        error: e.to_string(),
                    });
                }
            }
        }

        let elapsed = started.elapsed();
        let result = PipelineResult {
            total,
            processed: exporter.len(),
            failed,
            elapsed,
        };

        counter!("player_scraper_players_processed_total").increment(result.processed as u64);
        counter!("player_scraper_players_failed_total").increment(result.failed.len() as u64);
        histogram!("player_scraper_run_duration_seconds").record(elapsed.as_secs_f64());

        info!(
            "Scraping completed: {}/{} players processed ({:.1}%) in {:.2} seconds",
            result.processed,
            result.total,
            result.success_rate(),
            elapsed.as_secs_f64()
        );
        if !result.failed.is_empty() {
            let names: Vec<&str> = result.failed.iter().map(|f| f.player.as_str()).collect();
            warn!("Failed players: {}", names.join(", "));
        }

        Ok((exporter, result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FieldKind, FieldSpec, FieldValue};
    use async_trait::async_trait;
    use std::collections::HashMap;

    /// Serves canned pages keyed by URL
    struct MapFetcher {
        pages: HashMap<String, String>,
    }

    impl MapFetcher {
        fn new(pages: &[(&str, &str)]) -> Self {
            Self {
                pages: pages
                    .iter()
                    .map(|(u, b)| (u.to_string(), b.to_string()))
                    .collect(),
            }
        }
    }

    #[async_trait]
    impl Fetcher for MapFetcher {
        async fn fetch(&self, url: &str) -> Result<String> {
            self.pages.get(url).cloned().ok_or_else(|| ScraperError::Network {
                url: url.to_string(),
                status: Some(404),
                message: "not found".into(),
            })
        }
    }

    fn parser() -> ProfileParser {
        ProfileParser::new(&[
            FieldSpec {
                name: "username".into(),
                selector: "h1".into(),
                attr: None,
                kind: FieldKind::Text,
                required: true,
            },
            FieldSpec {
                name: "score".into(),
                selector: ".score".into(),
                attr: None,
                kind: FieldKind::Integer,
                required: true,
            },
        ])
        .unwrap()
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_run_skips_failures_and_continues() {
        let fetcher = MapFetcher::new(&[
            ("http://x.test/p/alice", "<h1>Alice</h1><span class='score'>10</span>"),
            ("http://x.test/p/broken", "<h1>Broken</h1>"),
            ("http://x.test/p/carol", "<h1>Carol</h1><span class='score'>3</span>"),
        ]);
        let pipeline = Pipeline::new(Box::new(fetcher), parser(), "http://x.test/p/{player}");

        let (exporter, result) = pipeline
            .run(&names(&["alice", "broken", "ghost", "carol"]))
            .await
            .unwrap();

        assert_eq!(result.total, 4);
        assert_eq!(result.processed, 2);
        assert_eq!(result.success_rate(), 50.0);
        let failed: Vec<&str> = result.failed.iter().map(|f| f.player.as_str()).collect();
        assert_eq!(failed, vec!["broken", "ghost"]);

        let players: Vec<&str> = exporter.records().iter().map(|r| r.player.as_str()).collect();
        assert_eq!(players, vec!["alice", "carol"]);
        assert_eq!(exporter.records()[0].get("score"), Some(&FieldValue::Integer(10)));
        assert_eq!(exporter.records()[1].source, "http://x.test/p/carol");
    }

    #[tokio::test]
    async fn test_run_dedupes_players() {
        let fetcher = MapFetcher::new(&[("http://x.test/p/alice", "<h1>Alice</h1><b class='score'>1</b>")]);
        let pipeline = Pipeline::new(Box::new(fetcher), parser(), "http://x.test/p/{player}");

        let (exporter, result) = pipeline
            .run(&names(&["alice", " alice ", "", "alice"]))
            .await
            .unwrap();
        assert_eq!(result.total, 1);
        assert_eq!(exporter.len(), 1);
    }

    #[test]
    fn test_unique_players_matches_run_total() {
        let list = names(&["bob", " alice", "", "bob ", "alice", "carol"]);
        assert_eq!(unique_players(&list), vec!["bob", "alice", "carol"]);
    }

    #[tokio::test]
    async fn test_exporter_carries_configured_fields() {
        let fetcher = MapFetcher::new(&[("http://x.test/p/alice", "<h1>Alice</h1><b class='score'>1</b>")]);
        let pipeline = Pipeline::new(Box::new(fetcher), parser(), "http://x.test/p/{player}");
        let (exporter, _) = pipeline.run(&names(&["alice", "ghost"])).await.unwrap();
        assert_eq!(exporter.fields(), &["username".to_string(), "score".to_string()]);
    }

    #[tokio::test]
    async fn test_run_requires_players() {
        let pipeline = Pipeline::new(Box::new(MapFetcher::new(&[])), parser(), "http://x.test/p/{player}");
        let err = pipeline.run(&names(&["  "])).await.unwrap_err();
        assert!(matches!(err, ScraperError::Config(_)));
    }
}
