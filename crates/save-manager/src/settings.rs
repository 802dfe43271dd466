use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use ps2_filetypes::PSU_MIN_SIZE;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

pub const SETTINGS_FILE: &str = "save-manager.toml";

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Where bulk exports land when the caller does not name a directory.
    pub output_dir: Option<PathBuf>,
    /// CBS title used when a save has no readable `icon.sys` title.
    pub cbs_title: Option<String>,
    pub resign_psv: bool,
    /// Fixed time for export file names instead of the current UTC time.
    pub timestamp: Option<NaiveDateTime>,
    /// Smallest file probing will consider a PSU.
    pub psu_min_size: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            output_dir: None,
            cbs_title: None,
            resign_psv: true,
            timestamp: None,
            psu_min_size: PSU_MIN_SIZE,
        }
    }
}

/// `timestamp` as `YYYY-MM-DD HH:MM:SS`, the form export names are built from.
mod export_time {
    use chrono::NaiveDateTime;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%d %H:%M:%S";

    pub fn serialize<S: Serializer>(
        value: &Option<NaiveDateTime>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(time) => serializer.collect_str(&time.format(FORMAT)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<NaiveDateTime>, D::Error> {
        Option::<String>::deserialize(deserializer)?
            .map(|text| NaiveDateTime::parse_from_str(&text, FORMAT).map_err(D::Error::custom))
            .transpose()
    }
}

fn default_resign() -> bool {
    true
}

fn default_psu_min_size() -> usize {
    PSU_MIN_SIZE
}

#[derive(Debug, Deserialize, Serialize)]
struct ConfigFile {
    config: ConfigSection,
}

#[derive(Debug, Deserialize, Serialize)]
struct ConfigSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    output_dir: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    cbs_title: Option<String>,
    #[serde(default = "default_resign")]
    resign_psv: bool,
    #[serde(default, with = "export_time", skip_serializing_if = "Option::is_none")]
    timestamp: Option<NaiveDateTime>,
    #[serde(default = "default_psu_min_size")]
    psu_min_size: usize,
}

impl From<ConfigFile> for Settings {
    fn from(file: ConfigFile) -> Self {
        let ConfigFile { config } = file;
        Self {
            output_dir: config.output_dir,
            cbs_title: config.cbs_title,
            resign_psv: config.resign_psv,
            timestamp: config.timestamp,
            psu_min_size: config.psu_min_size,
        }
    }
}

impl Settings {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config_file =
            toml::from_str::<ConfigFile>(text).map_err(|e| Error::ConfigError(e.to_string()))?;
        Ok(config_file.into())
    }

    pub fn to_toml_string(&self) -> std::result::Result<String, toml::ser::Error> {
        let config_file = ConfigFile {
            config: ConfigSection {
                output_dir: self.output_dir.clone(),
                cbs_title: self.cbs_title.clone(),
                resign_psv: self.resign_psv,
                timestamp: self.timestamp,
                psu_min_size: self.psu_min_size,
            },
        };
        toml::to_string_pretty(&config_file)
    }
}

/// Reads `save-manager.toml` from `folder`. A missing file gives defaults.
pub fn load_settings(folder: &Path) -> Result<Settings> {
    let settings_file = folder.join(SETTINGS_FILE);
    if !settings_file.exists() {
        return Ok(Settings::default());
    }
    let str = std::fs::read_to_string(&settings_file)?;
    Settings::from_toml_str(&str)
}
