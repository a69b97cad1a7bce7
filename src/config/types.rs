use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Main configuration structure for Ripple-Harvest
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    /// Seed URLs; bare hosts are accepted and assumed https
    #[serde(default)]
    pub seeds: Vec<String>,

    /// Free-text queries expanded into search result pages
    #[serde(default)]
    pub queries: Vec<String>,

    #[serde(default)]
    pub crawler: CrawlerConfig,

    #[serde(default)]
    pub user_agent: UserAgentConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

/// Crawl policy bundle adjusting page budget and courtesy delay
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Normal,
    Wide,
    Deep,
}

impl Mode {
    /// Maximum number of links enqueued from a single page
    pub fn link_limit(&self) -> usize {
        match self {
            Mode::Deep => 40,
            Mode::Wide => 120,
            Mode::Normal => 80,
        }
    }

    /// Minimum page budget forced by the mode
    pub fn min_pages(&self) -> Option<usize> {
        match self {
            Mode::Deep => Some(180),
            Mode::Wide => Some(120),
            Mode::Normal => None,
        }
    }

    /// Minimum per-domain spacing forced by the mode
    pub fn min_delay(&self) -> Option<Duration> {
        match self {
            Mode::Deep => Some(Duration::from_millis(450)),
            Mode::Wide => Some(Duration::from_millis(200)),
            Mode::Normal => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Normal => "normal",
            Mode::Wide => "wide",
            Mode::Deep => "deep",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "normal" => Ok(Mode::Normal),
            "wide" => Ok(Mode::Wide),
            "deep" => Ok(Mode::Deep),
            other => Err(format!(
                "unknown mode '{}', expected normal, wide or deep",
                other
            )),
        }
    }
}

/// Named parameter bundles offered on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preset {
    Quick,
    Standard,
    DeepDive,
    Survey,
}

impl Preset {
    /// Fills mode, page budget, concurrency and robots compliance
    pub fn apply(&self, crawler: &mut CrawlerConfig) {
        let (mode, max_pages, concurrency, respect_robots) = match self {
            Preset::Quick => (Mode::Normal, 20, 4, true),
            Preset::Standard => (Mode::Normal, 100, 6, true),
            Preset::DeepDive => (Mode::Deep, 250, 4, true),
            Preset::Survey => (Mode::Wide, 200, 10, true),
        };
        crawler.mode = mode;
        crawler.max_pages = max_pages;
        crawler.concurrency = concurrency;
        crawler.respect_robots = respect_robots;
    }
}

impl FromStr for Preset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "quick" => Ok(Preset::Quick),
            "standard" => Ok(Preset::Standard),
            "deep-dive" | "deepdive" => Ok(Preset::DeepDive),
            "survey" => Ok(Preset::Survey),
            other => Err(format!(
                "unknown preset '{}', expected quick, standard, deep-dive or survey",
                other
            )),
        }
    }
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct CrawlerConfig {
    /// Page budget; robots-skipped URLs do not count against it
    pub max_pages: usize,

    /// Maximum number of concurrent page fetches
    pub concurrency: usize,

    /// Minimum time between requests to the same host (milliseconds)
    pub per_domain_delay_ms: u64,

    pub mode: Mode,

    pub respect_robots: bool,

    pub verify_ssl: bool,

    /// Per-request timeout (seconds)
    pub request_timeout_secs: u64,

    /// Restore frontier and seen set from the checkpoint file if present
    pub resume: bool,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_pages: 50,
            concurrency: 4,
            per_domain_delay_ms: 250,
            mode: Mode::Normal,
            respect_robots: true,
            verify_ssl: true,
            request_timeout_secs: 20,
            resume: false,
        }
    }
}

impl CrawlerConfig {
    pub fn per_domain_delay(&self) -> Duration {
        Duration::from_millis(self.per_domain_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct UserAgentConfig {
    /// Name of the crawler, also the robots.txt product token
    pub crawler_name: String,

    /// Version of the crawler
    pub crawler_version: String,

    /// URL with information about the crawler
    pub contact_url: String,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: "RippleHarvest".to_string(),
            crawler_version: env!("CARGO_PKG_VERSION").to_string(),
            contact_url: "https://example.com/ripple-harvest".to_string(),
        }
    }
}

impl UserAgentConfig {
    /// Value of the User-Agent header: `Name/Version (+contact-url)`
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{})",
            self.crawler_name, self.crawler_version, self.contact_url
        )
    }

    /// Product token matched against robots.txt groups
    pub fn robots_token(&self) -> &str {
        &self.crawler_name
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct OutputConfig {
    /// JSON Lines file receiving one record per extracted page
    pub output_path: PathBuf,

    /// JSON file receiving the final report
    pub report_path: PathBuf,

    /// SQLite raw-page cache; disabled when absent
    pub cache_path: Option<PathBuf>,

    /// Checkpoint file; checkpointing disabled when absent
    pub checkpoint_path: Option<PathBuf>,

    /// Pages processed between two checkpoint writes
    pub checkpoint_every: usize,

    /// Directory of `<host>.toml` extraction plugins
    pub plugin_dir: Option<PathBuf>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            output_path: PathBuf::from("harvest.jsonl"),
            report_path: PathBuf::from("harvest-report.json"),
            cache_path: None,
            checkpoint_path: None,
            checkpoint_every: 10,
            plugin_dir: None,
        }
    }
}

impl Config {
    /// Raises page budget and spacing to the mode's floors
    ///
    /// Returns the per-page link limit for the mode. `normal` leaves the
    /// configured values untouched.
    pub fn apply_mode_policy(&mut self) -> usize {
        let mode = self.crawler.mode;

        if let Some(min_pages) = mode.min_pages() {
            self.crawler.max_pages = self.crawler.max_pages.max(min_pages);
        }
        if let Some(min_delay) = mode.min_delay() {
            let min_ms = min_delay.as_millis() as u64;
            self.crawler.per_domain_delay_ms = self.crawler.per_domain_delay_ms.max(min_ms);
        }

        mode.link_limit()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_from_str() {
        assert_eq!("deep".parse::<Mode>(), Ok(Mode::Deep));
        assert_eq!("WIDE".parse::<Mode>(), Ok(Mode::Wide));
        assert_eq!(" normal ".parse::<Mode>(), Ok(Mode::Normal));
        assert!("fast".parse::<Mode>().is_err());
    }

    #[test]
    fn test_link_limits() {
        assert_eq!(Mode::Deep.link_limit(), 40);
        assert_eq!(Mode::Wide.link_limit(), 120);
        assert_eq!(Mode::Normal.link_limit(), 80);
    }

    #[test]
    fn test_deep_mode_floors() {
        let mut config = Config::default();
        config.crawler.mode = Mode::Deep;
        config.crawler.max_pages = 10;
        config.crawler.per_domain_delay_ms = 100;

        assert_eq!(config.apply_mode_policy(), 40);
        assert_eq!(config.crawler.max_pages, 180);
        assert_eq!(config.crawler.per_domain_delay_ms, 450);
    }

    #[test]
    fn test_wide_mode_keeps_higher_values() {
        let mut config = Config::default();
        config.crawler.mode = Mode::Wide;
        config.crawler.max_pages = 500;
        config.crawler.per_domain_delay_ms = 1000;

        assert_eq!(config.apply_mode_policy(), 120);
        assert_eq!(config.crawler.max_pages, 500);
        assert_eq!(config.crawler.per_domain_delay_ms, 1000);
    }

    #[test]
    fn test_normal_mode_untouched() {
        let mut config = Config::default();
        config.crawler.max_pages = 1;
        config.crawler.per_domain_delay_ms = 0;

        assert_eq!(config.apply_mode_policy(), 80);
        assert_eq!(config.crawler.max_pages, 1);
        assert_eq!(config.crawler.per_domain_delay_ms, 0);
    }

    #[test]
    fn test_presets() {
        let mut crawler = CrawlerConfig::default();
        "deep-dive".parse::<Preset>().unwrap().apply(&mut crawler);
        assert_eq!(crawler.mode, Mode::Deep);
        assert_eq!(crawler.max_pages, 250);

        "survey".parse::<Preset>().unwrap().apply(&mut crawler);
        assert_eq!(crawler.mode, Mode::Wide);
        assert_eq!(crawler.concurrency, 10);

        assert!("bogus".parse::<Preset>().is_err());
    }

    #[test]
    fn test_user_agent_header() {
        let ua = UserAgentConfig {
            crawler_name: "TestBot".to_string(),
            crawler_version: "1.2".to_string(),
            contact_url: "https://example.com/bot".to_string(),
        };
        assert_eq!(ua.header_value(), "TestBot/1.2 (+https://example.com/bot)");
        assert_eq!(ua.robots_token(), "TestBot");
    }
}
