//! Configuration loading and validation.
//!
//! A [`Config`] comes from a YAML file, from two DSNs, or both: command-line
//! arguments and environment variables override file values.

mod types;
mod validation;

pub use types::*;

use std::path::Path;

use crate::drivers::detect::{detect, ConnectionDescriptor};
use crate::drivers::DatabaseKind;
use crate::error::Result;

/// Source DSN fallback when no positional argument is given.
pub const SOURCE_DSN_ENV: &str = "ONEAPI_SOURCE_SQL_DSN";

/// Destination DSN fallback when no positional argument is given.
pub const TARGET_DSN_ENV: &str = "ONEAPI_TARGET_SQL_DSN";

/// Opt-out switch for the abilities rebuild.
pub const REBUILD_ABILITIES_ENV: &str = "ONEAPI_REBUILD_ABILITIES";

impl Config {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Build a configuration from two DSNs with default migration settings.
    pub fn from_dsns(source: impl Into<String>, target: impl Into<String>) -> Result<Self> {
        let config = Config {
            source: DatabaseConfig::new(source),
            target: DatabaseConfig::new(target),
            migration: MigrationConfig::default(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        validation::validate(self)
    }
}

impl DatabaseConfig {
    /// Classify this side's DSN.
    ///
    /// An explicit `type` overrides detection. A `mysql://` URL is still
    /// normalized when the override agrees with it.
    pub fn descriptor(&self) -> Result<ConnectionDescriptor> {
        let detected = detect(&self.dsn);
        let Some(explicit) = &self.r#type else {
            return Ok(detected);
        };

        let kind: DatabaseKind = explicit.parse()?;
        if kind == detected.kind {
            return Ok(detected);
        }
        Ok(ConnectionDescriptor {
            dsn: detected.raw.clone(),
            raw: detected.raw,
            kind,
            degraded: None,
        })
    }
}

/// Interpret the rebuild opt-out switch.
///
/// `0`, `false`, `no` and `off` (any case, surrounding whitespace ignored)
/// disable the rebuild. Anything else, including unset or empty, enables it.
pub fn parse_switch(value: Option<&str>) -> bool {
    match value.map(|v| v.trim().to_ascii_lowercase()) {
        Some(v) => !matches!(v.as_str(), "0" | "false" | "no" | "off"),
        None => true,
    }
}

/// Read [`REBUILD_ABILITIES_ENV`] from the process environment.
pub fn rebuild_switch_from_env() -> bool {
    parse_switch(std::env::var(REBUILD_ABILITIES_ENV).ok().as_deref())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_yaml_with_defaults() {
        let yaml = r#"
source:
  dsn: "mysql://root:pw@db:3306/onehub"
target:
  dsn: "./one-api.db"
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.migration.tables.len(), 7);
        assert_eq!(config.migration.tables[0], "channels");
        assert_eq!(config.migration.tables[6], "abilities");
        assert!(config.migration.rebuild_abilities);
        assert_eq!(config.migration.ability_batch_rows, 500);
        assert_eq!(config.migration.progress_interval, 100);
    }

    #[test]
    fn test_from_yaml_overrides() {
        let yaml = r#"
source:
  dsn: "host=db user=u dbname=onehub"
target:
  dsn: "one-api.db"
  type: sqlite
migration:
  tables: [channels, tokens]
  rebuild_abilities: false
  ability_batch_rows: 100
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.migration.tables, vec!["channels", "tokens"]);
        assert!(!config.migration.rebuild_abilities);
        assert_eq!(config.migration.ability_batch_rows, 100);
        assert_eq!(config.target.r#type.as_deref(), Some("sqlite"));
    }

    #[test]
    fn test_from_yaml_rejects_unknown_type() {
        let yaml = r#"
source:
  dsn: "a.db"
  type: oracle
target:
  dsn: "b.db"
"#;
        assert!(Config::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_from_yaml_invalid_document() {
        let err = Config::from_yaml("source: [").unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_debug_redacts_passwords() {
        let config =
            Config::from_dsns("root:s3cret@tcp(db:3306)/onehub", "postgres://u:hunter2@pg/oneapi")
                .unwrap();
        let debug = format!("{:?}", config);
        assert!(!debug.contains("s3cret"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn test_descriptor_explicit_type_overrides_detection() {
        let mut db = DatabaseConfig::new("/data/user@host/db.sqlite");
        assert_eq!(db.descriptor().unwrap().kind, DatabaseKind::Mysql);

        db.r#type = Some("sqlite".into());
        let d = db.descriptor().unwrap();
        assert_eq!(d.kind, DatabaseKind::Sqlite);
        assert_eq!(d.dsn, "/data/user@host/db.sqlite");
    }

    #[test]
    fn test_descriptor_keeps_normalization_when_type_agrees() {
        let db = DatabaseConfig {
            dsn: "mysql://root:pw@db/onehub".into(),
            r#type: Some("mysql".into()),
        };
        assert_eq!(db.descriptor().unwrap().dsn, "root:pw@tcp(db:3306)/onehub");
    }

    #[test]
    fn test_parse_switch() {
        assert!(parse_switch(None));
        assert!(parse_switch(Some("")));
        assert!(parse_switch(Some("1")));
        assert!(parse_switch(Some("yes")));
        assert!(!parse_switch(Some("0")));
        assert!(!parse_switch(Some(" FALSE ")));
        assert!(!parse_switch(Some("No")));
        assert!(!parse_switch(Some("off")));
    }
}
