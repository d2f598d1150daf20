use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::errors::{Error, ErrorKind, Result};

pub const DEFAULT_CONFIG_PATH: &str = "config/osm_items.json";

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct UserConfig {
    /// The .osm (or .osm.xz) file to parse.
    pub data_path: String,
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Throw away cached results before running.
    #[serde(default)]
    pub refresh: bool,
}

fn default_output_dir() -> String {
    "output".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl UserConfig {
    pub fn load(path: &Path) -> Result<UserConfig> {
        let file = File::open(path).map_err(|err| {
            Error::new(ErrorKind::Config, format!("Could not open config file {}: {err}", path.display()))
        })?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }

    /// One directory per input file, so several extracts can share an output root.
    pub fn output_dir_for_input(&self) -> Result<PathBuf> {
        let input_fname = Path::new(&self.data_path)
            .file_name()
            .ok_or_else(|| Error::new(ErrorKind::Config, "Could not get input file name"))?;
        Ok(Path::new(&self.output_dir).join(input_fname))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::io::Write;

    #[rstest]
    fn fills_in_defaults() {
        let config: UserConfig = serde_json::from_str(r#"{"data_path": "data/map.osm"}"#)
            .expect("minimal config");
        assert_eq!(config.output_dir, "output");
        assert_eq!(config.log_level, "info");
        assert!(!config.refresh);
        assert_eq!(
            config.output_dir_for_input().expect("has a file name"),
            PathBuf::from("output/map.osm")
        );
    }

    #[rstest]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, r#"{{"data_path": "a.osm.xz", "output_dir": "out", "refresh": true}}"#)
            .expect("write config");
        let config = UserConfig::load(file.path()).expect("valid config");
        assert_eq!(config.output_dir, "out");
        assert!(config.refresh);
    }

    #[rstest]
    #[case::missing_file(None)]
    #[case::missing_data_path(Some(r#"{"output_dir": "out"}"#))]
    #[case::not_json(Some("data_path = 1"))]
    fn bad_config_is_a_config_error(#[case] contents: Option<&str>) {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("config.json");
        if let Some(contents) = contents {
            std::fs::write(&path, contents).expect("write config");
        }
        let err = UserConfig::load(&path).expect_err("invalid config");
        assert_eq!(err.kind, ErrorKind::Config);
    }
}
