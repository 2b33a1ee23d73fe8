use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use tablecraft_generate::GenerateOptions;

use crate::CliError;
use crate::logging::LogFormat;

pub const CONFIG_FILE: &str = "tablecraft.toml";
pub const DEFAULT_SCHEMA_DIR: &str = "schema";
pub const DEFAULT_OUT_DIR: &str = "output";

const ANCHOR_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Settings read from `tablecraft.toml`; every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TablecraftConfig {
    pub schema_dir: Option<PathBuf>,
    pub out_dir: Option<PathBuf>,
    pub seed: Option<u64>,
    pub anchor: Option<String>,
    pub strict: Option<bool>,
    pub log_format: Option<LogFormat>,
}

/// Command-line values that take precedence over the config file.
#[derive(Debug, Clone, Default)]
pub struct GenerateOverrides {
    pub out_dir: Option<PathBuf>,
    pub seed: Option<u64>,
    pub anchor: Option<NaiveDateTime>,
    pub strict: bool,
    pub no_report: bool,
}

/// Load an explicit config path, or `tablecraft.toml` from the working
/// directory when present.
pub fn load_config(explicit: Option<&Path>) -> Result<TablecraftConfig, CliError> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => {
            let default = PathBuf::from(CONFIG_FILE);
            if !default.exists() {
                return Ok(TablecraftConfig::default());
            }
            default
        }
    };

    let content = std::fs::read_to_string(&path)?;
    parse_config(&content)
}

pub fn parse_config(content: &str) -> Result<TablecraftConfig, CliError> {
    Ok(toml::from_str(content)?)
}

pub fn parse_anchor(text: &str) -> Result<NaiveDateTime, String> {
    NaiveDateTime::parse_from_str(text, ANCHOR_FORMAT)
        .map_err(|err| format!("invalid anchor '{text}' (expected {ANCHOR_FORMAT}): {err}"))
}

impl TablecraftConfig {
    pub fn schema_dir(&self, flag: Option<PathBuf>) -> PathBuf {
        flag.or_else(|| self.schema_dir.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SCHEMA_DIR))
    }

    pub fn strict(&self, flag: bool) -> bool {
        flag || self.strict.unwrap_or(false)
    }

    pub fn generate_options(&self, overrides: GenerateOverrides) -> Result<GenerateOptions, CliError> {
        let anchor = match (overrides.anchor, self.anchor.as_deref()) {
            (Some(anchor), _) => Some(anchor),
            (None, Some(text)) => Some(parse_anchor(text).map_err(CliError::InvalidConfig)?),
            (None, None) => None,
        };

        Ok(GenerateOptions {
            out_dir: overrides
                .out_dir
                .or_else(|| self.out_dir.clone())
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUT_DIR)),
            seed: overrides.seed.or(self.seed).unwrap_or(0),
            anchor,
            strict: self.strict(overrides.strict),
            write_report: !overrides.no_report,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config, TablecraftConfig::default());
        assert_eq!(config.schema_dir(None), PathBuf::from("schema"));

        let options = config.generate_options(GenerateOverrides::default()).unwrap();
        assert_eq!(options.out_dir, PathBuf::from("output"));
        assert_eq!(options.seed, 0);
        assert!(options.anchor.is_none());
        assert!(!options.strict);
        assert!(options.write_report);
    }

    #[test]
    fn flags_override_file_values() {
        let config = parse_config(
            r#"
schema_dir = "schemas/retail"
out_dir = "build/data"
seed = 9
anchor = "2024-02-29T08:00:00"
strict = true
log_format = "json"
"#,
        )
        .unwrap();
        assert_eq!(config.log_format, Some(LogFormat::Json));
        assert_eq!(
            config.schema_dir(Some(PathBuf::from("other"))),
            PathBuf::from("other")
        );

        let from_file = config.generate_options(GenerateOverrides::default()).unwrap();
        assert_eq!(from_file.out_dir, PathBuf::from("build/data"));
        assert_eq!(from_file.seed, 9);
        assert_eq!(from_file.anchor, Some(parse_anchor("2024-02-29T08:00:00").unwrap()));
        assert!(from_file.strict);

        let overridden = config
            .generate_options(GenerateOverrides {
                out_dir: Some(PathBuf::from("tmp")),
                seed: Some(1),
                anchor: Some(parse_anchor("2025-01-01T00:00:00").unwrap()),
                strict: false,
                no_report: true,
            })
            .unwrap();
        assert_eq!(overridden.out_dir, PathBuf::from("tmp"));
        assert_eq!(overridden.seed, 1);
        assert_eq!(overridden.anchor, Some(parse_anchor("2025-01-01T00:00:00").unwrap()));
        assert!(!overridden.write_report);
    }

    #[test]
    fn bad_values_are_rejected() {
        assert!(parse_config("colour = \"blue\"").is_err());
        assert!(parse_anchor("2024-02-29").is_err());

        let config = parse_config("anchor = \"yesterday\"").unwrap();
        let err = config
            .generate_options(GenerateOverrides::default())
            .unwrap_err();
        assert!(matches!(err, CliError::InvalidConfig(_)));
    }
}
