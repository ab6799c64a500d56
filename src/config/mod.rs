use std::path::PathBuf;

pub const DEFAULT_STREAM_URL: &str = "https://stream-169.zeno.fm/uvdbygm6a48uv?zt=...";
pub const DEFAULT_LOG_FILE_NAME: &str = "yesudas-radio-log.txt";
pub const DEFAULT_STATION_NAME: &str = "KJ Yesudas Radio";
pub const DEFAULT_PLAYER: &str = "mpv";

/// Built-in values used for anything the operator leaves out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigDefaults {
    pub stream_url: String,
    pub log_path: PathBuf,
    pub station_name: String,
    pub player: String,
}

impl Default for ConfigDefaults {
    fn default() -> Self {
        // Without a home directory the log lands in the working directory.
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));

        Self {
            stream_url: DEFAULT_STREAM_URL.to_string(),
            log_path: home.join(DEFAULT_LOG_FILE_NAME),
            station_name: DEFAULT_STATION_NAME.to_string(),
            player: DEFAULT_PLAYER.to_string(),
        }
    }
}

/// Resolved settings for a single run. Never mutated after startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub stream_url: String,
    pub log_path: PathBuf,
    pub station_name: String,
    pub player: String,
}

impl Config {
    /// Merges operator input with `defaults`. The stream URL is passed
    /// through untouched; a malformed one only fails once the player runs.
    pub fn resolve(
        stream_url: Option<String>,
        log_path: Option<PathBuf>,
        defaults: &ConfigDefaults,
    ) -> Self {
        Self {
            stream_url: stream_url.unwrap_or_else(|| defaults.stream_url.clone()),
            log_path: log_path.unwrap_or_else(|| defaults.log_path.clone()),
            station_name: defaults.station_name.clone(),
            player: defaults.player.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_missing_values() {
        let defaults = ConfigDefaults::default();
        let config = Config::resolve(None, None, &defaults);

        assert_eq!(config.stream_url, DEFAULT_STREAM_URL);
        assert_eq!(config.log_path, defaults.log_path);
        assert_eq!(config.player, "mpv");
        assert!(config.log_path.ends_with(DEFAULT_LOG_FILE_NAME));
    }

    #[test]
    fn test_operator_values_win() {
        let defaults = ConfigDefaults::default();
        let config = Config::resolve(
            Some("http://example.com/live".to_string()),
            Some(PathBuf::from("/tmp/titles.txt")),
            &defaults,
        );

        assert_eq!(config.stream_url, "http://example.com/live");
        assert_eq!(config.log_path, PathBuf::from("/tmp/titles.txt"));
        assert_eq!(config.station_name, defaults.station_name);
    }

    #[test]
    fn test_malformed_url_passes_through() {
        let config = Config::resolve(Some("not a url".to_string()), None, &ConfigDefaults::default());
        assert_eq!(config.stream_url, "not a url");
    }
}
