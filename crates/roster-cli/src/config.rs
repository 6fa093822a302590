use roster_core::MATCH_THRESHOLD;
use std::path::PathBuf;

/// CLI configuration, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the SQLite player database.
    pub db_path: PathBuf,
    /// Program that turns a photo into a face descriptor.
    pub extractor_program: PathBuf,
    /// Euclidean distance below which `identify` reports a match.
    pub match_threshold: f32,
    /// Directory that `export` writes into.
    pub export_dir: PathBuf,
}

impl Config {
    /// Load configuration from `ROSTER_*` environment variables with defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Self {
        let data_dir = var("XDG_DATA_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|| {
                let home = var("HOME").unwrap_or_else(|| "/tmp".to_string());
                PathBuf::from(home).join(".local/share")
            })
            .join("roster");

        Self {
            db_path: var("ROSTER_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| data_dir.join("players.db")),
            extractor_program: var("ROSTER_EXTRACTOR_CMD")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("roster-face-descriptor")),
            match_threshold: var("ROSTER_MATCH_THRESHOLD")
                .and_then(|v| v.parse().ok())
                .unwrap_or(MATCH_THRESHOLD),
            export_dir: var("ROSTER_EXPORT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(".")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Config {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let c = config(&[("HOME", "/home/coach")]);
        assert_eq!(
            c.db_path,
            PathBuf::from("/home/coach/.local/share/roster/players.db")
        );
        assert_eq!(c.extractor_program, PathBuf::from("roster-face-descriptor"));
        assert_eq!(c.match_threshold, MATCH_THRESHOLD);
        assert_eq!(c.export_dir, PathBuf::from("."));
    }

    #[test]
    fn test_xdg_data_home() {
        let c = config(&[("XDG_DATA_HOME", "/data"), ("HOME", "/home/coach")]);
        assert_eq!(c.db_path, PathBuf::from("/data/roster/players.db"));
    }

    #[test]
    fn test_overrides() {
        let c = config(&[
            ("ROSTER_DB_PATH", "/srv/club.db"),
            ("ROSTER_EXTRACTOR_CMD", "/opt/face/describe"),
            ("ROSTER_MATCH_THRESHOLD", "0.5"),
            ("ROSTER_EXPORT_DIR", "/srv/exports"),
        ]);
        assert_eq!(c.db_path, PathBuf::from("/srv/club.db"));
        assert_eq!(c.extractor_program, PathBuf::from("/opt/face/describe"));
        assert_eq!(c.match_threshold, 0.5);
        assert_eq!(c.export_dir, PathBuf::from("/srv/exports"));
    }

    #[test]
    fn test_bad_threshold_falls_back() {
        let c = config(&[("ROSTER_MATCH_THRESHOLD", "close")]);
        assert_eq!(c.match_threshold, MATCH_THRESHOLD);
    }
}
