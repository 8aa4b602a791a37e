//! Configuration file parsing and management.
//!
//! This module handles loading configuration from TOML files and `DS_*`
//! environment variables, and layering them onto a `ScanConfig`.

use crate::error::ScanError;
use crate::types::ScanConfig;
use crate::utils::{is_valid_tld, parse_duration_string, split_list};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Configuration loaded from TOML files.
///
/// Every value is optional; only the keys present in a file override the
/// layer below it.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FileConfig {
    /// What to scan and where reports go
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scan: Option<ScanSection>,

    /// HTTP and DNS settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network: Option<NetworkSection>,

    /// Index engine settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<IndexSection>,

    /// Drop-list feed URL per TLD
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feeds: Option<HashMap<String, String>>,
}

/// `[scan]` section.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ScanSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tlds: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_dir: Option<PathBuf>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_indexed_pages: Option<u64>,

    /// Extra days after the target date to include
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lookahead_days: Option<u32>,
}

/// `[network]` section. Durations are strings such as "3s" or "500ms".
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct NetworkSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub feed_timeout: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub dns_timeout: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub index_timeout: Option<String>,
}

/// `[index]` section.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct IndexSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub engines: Option<Vec<String>>,

    /// Pause between calls to the same engine
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delay: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub wayback_url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub wayback_limit: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub commoncrawl_url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub commoncrawl_collection: Option<String>,
}

impl FileConfig {
    /// Lookahead days from `[scan]`, if set.
    pub fn lookahead_days(&self) -> Option<u32> {
        self.scan.as_ref().and_then(|s| s.lookahead_days)
    }

    /// Layer this file's values onto `config`.
    pub fn apply_to(&self, mut config: ScanConfig) -> Result<ScanConfig, ScanError> {
        if let Some(scan) = &self.scan {
            if let Some(tlds) = &scan.tlds {
                config.tlds = tlds.iter().map(|t| normalize_tld(t)).collect();
            }
            if let Some(dir) = &scan.report_dir {
                config.report_dir = dir.clone();
            }
            if let Some(min) = scan.min_indexed_pages {
                config.min_indexed_pages = min;
            }
        }

        if let Some(network) = &self.network {
            if let Some(ua) = &network.user_agent {
                config.user_agent = ua.clone();
            }
            if let Some(value) = &network.feed_timeout {
                config.feed_timeout = duration_setting("network.feed_timeout", value)?;
            }
            if let Some(value) = &network.dns_timeout {
                config.dns_timeout = duration_setting("network.dns_timeout", value)?;
            }
            if let Some(value) = &network.index_timeout {
                config.index_timeout = duration_setting("network.index_timeout", value)?;
            }
        }

        if let Some(index) = &self.index {
            if let Some(engines) = &index.engines {
                config.engines = engines.iter().map(|e| e.trim().to_lowercase()).collect();
            }
            if let Some(value) = &index.delay {
                config.index_delay = duration_setting("index.delay", value)?;
            }
            if let Some(url) = &index.wayback_url {
                config.wayback_url = url.clone();
            }
            if let Some(limit) = index.wayback_limit {
                config.wayback_limit = limit;
            }
            if let Some(url) = &index.commoncrawl_url {
                config.commoncrawl_url = url.clone();
            }
            if let Some(collection) = &index.commoncrawl_collection {
                config.commoncrawl_collection = collection.clone();
            }
        }

        if let Some(feeds) = &self.feeds {
            for (tld, url) in feeds {
                config.feed_urls.insert(normalize_tld(tld), url.clone());
            }
        }

        Ok(config)
    }
}

/// Configuration discovery and loading functionality.
#[derive(Debug, Default)]
pub struct ConfigManager;

impl ConfigManager {
    pub fn new() -> Self {
        Self
    }

    /// Load configuration from a specific file.
    ///
    /// # Returns
    ///
    /// The parsed configuration or an error if reading, parsing or
    /// validation fails.
    pub fn load_file<P: AsRef<Path>>(&self, path: P) -> Result<FileConfig, ScanError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ScanError::file_error(
                path.to_string_lossy(),
                "Configuration file not found",
            ));
        }

        let content = fs::read_to_string(path).map_err(|e| {
            ScanError::file_error(
                path.to_string_lossy(),
                format!("Failed to read configuration file: {}", e),
            )
        })?;

        let config: FileConfig = toml::from_str(&content).map_err(|e| {
            ScanError::config(format!(
                "Failed to parse TOML configuration {}: {}",
                path.display(),
                e
            ))
        })?;

        self.validate_config(&config)?;
        debug!(path = %path.display(), "configuration file loaded");

        Ok(config)
    }

    /// Discover and load configuration files in precedence order.
    ///
    /// XDG config, then the global file in `$HOME`, then the local file in
    /// the working directory; later files override earlier ones key by key.
    /// A file that exists but is broken is an error.
    pub fn discover_and_load(&self) -> Result<FileConfig, ScanError> {
        let mut merged_config = FileConfig::default();
        let mut loaded_files = Vec::new();

        let candidates = [
            self.get_xdg_config_path(),
            self.get_global_config_path(),
            self.get_local_config_path(),
        ];

        for path in candidates.into_iter().flatten() {
            let config = self.load_file(&path)?;
            merged_config = self.merge_configs(merged_config, config);
            loaded_files.push(path);
        }

        if loaded_files.len() > 1 {
            info!(
                files = ?loaded_files,
                "multiple config files found, later files take precedence"
            );
        }

        Ok(merged_config)
    }

    /// Get the local configuration file path.
    fn get_local_config_path(&self) -> Option<PathBuf> {
        ["./drop-scan.toml", "./.drop-scan.toml"]
            .iter()
            .map(Path::new)
            .find(|path| path.exists())
            .map(Path::to_path_buf)
    }

    /// Get the global configuration file path.
    fn get_global_config_path(&self) -> Option<PathBuf> {
        let home = env::var_os("HOME")?;
        [".drop-scan.toml", "drop-scan.toml"]
            .iter()
            .map(|candidate| Path::new(&home).join(candidate))
            .find(|path| path.exists())
    }

    /// Get the XDG configuration file path.
    fn get_xdg_config_path(&self) -> Option<PathBuf> {
        let config_dir = env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| env::var_os("HOME").map(|home| Path::new(&home).join(".config")))?;

        let path = config_dir.join("drop-scan").join("config.toml");
        path.exists().then_some(path)
    }

    /// Merge two configurations.
    ///
    /// Values from `higher` take precedence over values from `lower`.
    pub fn merge_configs(&self, lower: FileConfig, higher: FileConfig) -> FileConfig {
        FileConfig {
            scan: merge_section(lower.scan, higher.scan, |low, high| ScanSection {
                tlds: high.tlds.or(low.tlds),
                report_dir: high.report_dir.or(low.report_dir),
                min_indexed_pages: high.min_indexed_pages.or(low.min_indexed_pages),
                lookahead_days: high.lookahead_days.or(low.lookahead_days),
            }),
            network: merge_section(lower.network, higher.network, |low, high| NetworkSection {
                user_agent: high.user_agent.or(low.user_agent),
                feed_timeout: high.feed_timeout.or(low.feed_timeout),
                dns_timeout: high.dns_timeout.or(low.dns_timeout),
                index_timeout: high.index_timeout.or(low.index_timeout),
            }),
            index: merge_section(lower.index, higher.index, |low, high| IndexSection {
                engines: high.engines.or(low.engines),
                delay: high.delay.or(low.delay),
                wayback_url: high.wayback_url.or(low.wayback_url),
                wayback_limit: high.wayback_limit.or(low.wayback_limit),
                commoncrawl_url: high.commoncrawl_url.or(low.commoncrawl_url),
                commoncrawl_collection: high.commoncrawl_collection.or(low.commoncrawl_collection),
            }),
            feeds: merge_section(lower.feeds, higher.feeds, |mut low, high| {
                low.extend(high);
                low
            }),
        }
    }

    /// Validate a configuration for common issues.
    fn validate_config(&self, config: &FileConfig) -> Result<(), ScanError> {
        if let Some(scan) = &config.scan {
            if let Some(tlds) = &scan.tlds {
                if tlds.is_empty() {
                    return Err(ScanError::config("scan.tlds cannot be empty"));
                }
                for tld in tlds {
                    if !is_valid_tld(&normalize_tld(tld)) {
                        return Err(ScanError::config(format!(
                            "Invalid TLD '{}' in scan.tlds",
                            tld
                        )));
                    }
                }
            }
            if scan.min_indexed_pages == Some(0) {
                return Err(ScanError::config("scan.min_indexed_pages must be at least 1"));
            }
        }

        if let Some(network) = &config.network {
            for (key, value) in [
                ("network.feed_timeout", &network.feed_timeout),
                ("network.dns_timeout", &network.dns_timeout),
                ("network.index_timeout", &network.index_timeout),
            ] {
                if let Some(value) = value {
                    duration_setting(key, value)?;
                }
            }
        }

        if let Some(index) = &config.index {
            if let Some(engines) = &index.engines {
                let known = crate::types::known_engines();
                if engines.is_empty() {
                    return Err(ScanError::config("index.engines cannot be empty"));
                }
                for engine in engines {
                    if !known.contains(&engine.trim().to_lowercase().as_str()) {
                        return Err(ScanError::config(format!(
                            "Unknown index engine '{}' (known: {})",
                            engine,
                            known.join(", ")
                        )));
                    }
                }
            }
            if let Some(delay) = &index.delay {
                duration_setting("index.delay", delay)?;
            }
            if index.wayback_limit == Some(0) {
                return Err(ScanError::config("index.wayback_limit must be at least 1"));
            }
        }

        if let Some(feeds) = &config.feeds {
            for (tld, url) in feeds {
                if !is_valid_tld(&normalize_tld(tld)) {
                    return Err(ScanError::config(format!("Invalid TLD '{}' in [feeds]", tld)));
                }
                if url.trim().is_empty() {
                    return Err(ScanError::config(format!("Empty feed URL for '{}'", tld)));
                }
            }
        }

        Ok(())
    }
}

/// Environment variable configuration that mirrors CLI options.
///
/// This represents configuration values that can be set via DS_* environment variables.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnvConfig {
    pub config: Option<PathBuf>,
    pub tlds: Option<Vec<String>>,
    pub report_dir: Option<PathBuf>,
    pub min_pages: Option<u64>,
    pub index_delay: Option<Duration>,
    pub dns_timeout: Option<Duration>,
    pub index_timeout: Option<Duration>,
    pub engines: Option<Vec<String>>,
    pub user_agent: Option<String>,
    /// From `DS_FEED_URL_<TLD>`
    pub feed_urls: HashMap<String, String>,
}

impl EnvConfig {
    /// Parse `DS_*` variables out of `(name, value)` pairs.
    ///
    /// Invalid values are logged as warnings and ignored.
    pub fn from_vars<I>(vars: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut env_config = EnvConfig::default();

        for (name, value) in vars {
            let Some(key) = name.strip_prefix("DS_") else {
                continue;
            };
            let value = value.trim();
            if value.is_empty() {
                continue;
            }

            match key {
                "CONFIG" => env_config.config = Some(PathBuf::from(value)),
                "TLDS" => {
                    let tlds: Vec<String> = split_list(value).iter().map(|t| normalize_tld(t)).collect();
                    if !tlds.is_empty() && tlds.iter().all(|t| is_valid_tld(t)) {
                        env_config.tlds = Some(tlds);
                    } else {
                        warn!("Invalid DS_TLDS='{}', expected e.g. 'se,nu'", value);
                    }
                }
                "REPORT_DIR" => env_config.report_dir = Some(PathBuf::from(value)),
                "MIN_PAGES" => match value.parse::<u64>() {
                    Ok(min) if min > 0 => env_config.min_pages = Some(min),
                    _ => warn!("Invalid DS_MIN_PAGES='{}', must be a positive integer", value),
                },
                "INDEX_DELAY" => env_config.index_delay = env_duration(&name, value),
                "DNS_TIMEOUT" => env_config.dns_timeout = env_duration(&name, value),
                "INDEX_TIMEOUT" => env_config.index_timeout = env_duration(&name, value),
                "ENGINES" => {
                    let engines: Vec<String> =
                        split_list(value).iter().map(|e| e.to_lowercase()).collect();
                    if engines.is_empty() {
                        warn!("Invalid DS_ENGINES='{}'", value);
                    } else {
                        env_config.engines = Some(engines);
                    }
                }
                "USER_AGENT" => env_config.user_agent = Some(value.to_string()),
                _ => {
                    if let Some(tld) = key.strip_prefix("FEED_URL_") {
                        let tld = normalize_tld(tld);
                        if is_valid_tld(&tld) {
                            env_config.feed_urls.insert(tld, value.to_string());
                        } else {
                            warn!("Ignoring {}: '{}' is not a TLD", name, tld);
                        }
                    } else {
                        debug!(variable = name.as_str(), "unrecognized DS_ variable ignored");
                    }
                }
            }
        }

        env_config
    }

    /// Layer these values onto `config`.
    pub fn apply_to(&self, mut config: ScanConfig) -> ScanConfig {
        if let Some(tlds) = &self.tlds {
            config.tlds = tlds.clone();
        }
        if let Some(dir) = &self.report_dir {
            config.report_dir = dir.clone();
        }
        if let Some(min) = self.min_pages {
            config.min_indexed_pages = min;
        }
        if let Some(delay) = self.index_delay {
            config.index_delay = delay;
        }
        if let Some(timeout) = self.dns_timeout {
            config.dns_timeout = timeout;
        }
        if let Some(timeout) = self.index_timeout {
            config.index_timeout = timeout;
        }
        if let Some(engines) = &self.engines {
            config.engines = engines.clone();
        }
        if let Some(ua) = &self.user_agent {
            config.user_agent = ua.clone();
        }
        for (tld, url) in &self.feed_urls {
            config.feed_urls.insert(tld.clone(), url.clone());
        }
        config
    }
}

/// Load configuration from the process environment.
pub fn load_env_config() -> EnvConfig {
    let env_config = EnvConfig::from_vars(env::vars());
    debug!(?env_config, "environment configuration");
    env_config
}

fn merge_section<T, F>(lower: Option<T>, higher: Option<T>, merge: F) -> Option<T>
where
    F: FnOnce(T, T) -> T,
{
    match (lower, higher) {
        (Some(low), Some(high)) => Some(merge(low, high)),
        (low, high) => high.or(low),
    }
}

fn normalize_tld(tld: &str) -> String {
    tld.trim().trim_start_matches('.').to_lowercase()
}

fn duration_setting(key: &str, value: &str) -> Result<Duration, ScanError> {
    parse_duration_string(value).ok_or_else(|| {
        ScanError::config(format!(
            "Invalid duration '{}' for {}. Use a format like '500ms', '2.5s', '3', '1m'",
            value, key
        ))
    })
}

fn env_duration(name: &str, value: &str) -> Option<Duration> {
    let parsed = parse_duration_string(value);
    if parsed.is_none() {
        warn!("Invalid {}='{}', use a format like '500ms', '2.5s', '1m'", name, value);
    }
    parsed
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(content: &str) -> NamedTempFile {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(content.as_bytes()).unwrap();
        temp_file.flush().unwrap();
        temp_file
    }

    #[test]
    fn test_load_valid_config() {
        let temp_file = write_config(
            r#"
[scan]
tlds = ["se"]
report_dir = "/var/lib/drop-scan"
min_indexed_pages = 10

[network]
dns_timeout = "5s"

[index]
engines = ["wayback"]
delay = "500ms"

[feeds]
se = "http://localhost:8080/se.json"
"#,
        );

        let manager = ConfigManager::new();
        let file = manager.load_file(temp_file.path()).unwrap();
        let config = file.apply_to(ScanConfig::default()).unwrap();

        assert_eq!(config.tlds, vec!["se"]);
        assert_eq!(config.report_dir, PathBuf::from("/var/lib/drop-scan"));
        assert_eq!(config.min_indexed_pages, 10);
        assert_eq!(config.dns_timeout, Duration::from_secs(5));
        assert_eq!(config.index_delay, Duration::from_millis(500));
        assert_eq!(config.feed_url("se"), Some("http://localhost:8080/se.json"));
        // untouched keys keep their defaults
        assert_eq!(config.index_timeout, Duration::from_secs(20));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let manager = ConfigManager::new();

        for content in [
            "[scan]\nmin_indexed_pages = 0\n",
            "[scan]\ntlds = [\"s e\"]\n",
            "[network]\ndns_timeout = \"soon\"\n",
            "[index]\nengines = [\"altavista\"]\n",
            "[index]\nwayback_limit = 0\n",
            "[index]\ndelay = \"99999999999999999999999s\"\n",
            "[scan\n",
        ] {
            let temp_file = write_config(content);
            assert!(
                manager.load_file(temp_file.path()).is_err(),
                "accepted: {}",
                content
            );
        }
    }

    #[test]
    fn test_missing_file() {
        let result = ConfigManager::new().load_file("/nonexistent/drop-scan.toml");
        assert!(matches!(result, Err(ScanError::FileError { .. })));
    }

    #[test]
    fn test_merge_configs() {
        let manager = ConfigManager::new();

        let lower = FileConfig {
            scan: Some(ScanSection {
                tlds: Some(vec!["se".to_string()]),
                min_indexed_pages: Some(5),
                ..Default::default()
            }),
            feeds: Some(HashMap::from([("se".to_string(), "http://a/se".to_string())])),
            ..Default::default()
        };

        let higher = FileConfig {
            scan: Some(ScanSection {
                min_indexed_pages: Some(20),
                ..Default::default()
            }),
            feeds: Some(HashMap::from([("nu".to_string(), "http://b/nu".to_string())])),
            ..Default::default()
        };

        let merged = manager.merge_configs(lower, higher);
        let scan = merged.scan.unwrap();
        assert_eq!(scan.min_indexed_pages, Some(20)); // higher wins
        assert_eq!(scan.tlds, Some(vec!["se".to_string()])); // lower preserved

        let feeds = merged.feeds.unwrap();
        assert_eq!(feeds.len(), 2);
    }

    #[test]
    fn test_env_config_parsing() {
        let vars = vec![
            ("DS_TLDS".to_string(), ".SE, nu".to_string()),
            ("DS_MIN_PAGES".to_string(), "25".to_string()),
            ("DS_INDEX_DELAY".to_string(), "1.5s".to_string()),
            ("DS_DNS_TIMEOUT".to_string(), "never".to_string()),
            ("DS_FEED_URL_SE".to_string(), "http://mirror/se.json".to_string()),
            ("PATH".to_string(), "/usr/bin".to_string()),
        ];

        let env_config = EnvConfig::from_vars(vars);
        assert_eq!(env_config.tlds, Some(vec!["se".to_string(), "nu".to_string()]));
        assert_eq!(env_config.min_pages, Some(25));
        assert_eq!(env_config.index_delay, Some(Duration::from_millis(1500)));
        assert_eq!(env_config.dns_timeout, None);
        assert_eq!(
            env_config.feed_urls.get("se").map(String::as_str),
            Some("http://mirror/se.json")
        );

        let config = env_config.apply_to(ScanConfig::default());
        assert_eq!(config.min_indexed_pages, 25);
        assert_eq!(config.dns_timeout, Duration::from_secs(3));
        assert_eq!(config.feed_url("se"), Some("http://mirror/se.json"));
    }

    #[test]
    fn test_env_config_rejects_zero_min_pages() {
        let env_config =
            EnvConfig::from_vars(vec![("DS_MIN_PAGES".to_string(), "0".to_string())]);
        assert_eq!(env_config.min_pages, None);
    }

    #[test]
    fn test_env_config_ignores_oversized_duration() {
        let env_config = EnvConfig::from_vars(vec![(
            "DS_INDEX_TIMEOUT".to_string(),
            "99999999999999999999999s".to_string(),
        )]);
        assert_eq!(env_config.index_timeout, None);
    }
}
