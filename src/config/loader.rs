//! Configuration loading functionality.
//!
//! This module provides the [`ConfigLoader`] type for loading engine
//! configuration and tax tables from YAML files.

use std::fs;
use std::path::Path;

use crate::calculation::{TaxTable, TaxTables};
use crate::error::{EngineError, EngineResult};

use super::types::{EngineConfig, TaxTableFile};

/// Loads and provides access to engine configuration.
///
/// # Directory Structure
///
/// ```text
/// config/default/
/// ├── engine.yaml     # Workweek, proration, attendance, ledger, bulk
/// └── tax/
///     └── NGN.yaml    # One progressive table per currency
/// ```
///
/// The `tax/` directory is optional; without it every currency is taxed at
/// zero.
///
/// # Example
///
/// ```no_run
/// use payroll_engine::config::ConfigLoader;
///
/// let loader = ConfigLoader::load("./config/default").unwrap();
/// println!("Workweek: {:?}", loader.config().workweek);
/// ```
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    config: EngineConfig,
}

impl ConfigLoader {
    /// Loads configuration from the specified directory.
    ///
    /// # Returns
    ///
    /// Returns a `ConfigLoader` instance on success, or an error if:
    /// - `engine.yaml` is missing (`ConfigNotFound`)
    /// - Any file contains invalid YAML (`ConfigParseError`)
    /// - A tax table or the assembled config is inconsistent (`InvalidConfig`)
    pub fn load<P: AsRef<Path>>(path: P) -> EngineResult<Self> {
        let path = path.as_ref();

        let engine_path = path.join("engine.yaml");
        let mut config = Self::load_yaml::<EngineConfig>(&engine_path)?;

        let tax_dir = path.join("tax");
        if tax_dir.is_dir() {
            Self::load_tax_tables(&tax_dir, &mut config.tax_tables)?;
        }

        config.validate()?;
        tracing::debug!(
            path = %path.display(),
            tax_tables = config.tax_tables.len(),
            "Loaded engine configuration"
        );

        Ok(Self { config })
    }

    /// Parses an `engine.yaml` document without touching the filesystem.
    ///
    /// # Example
    ///
    /// ```
    /// use payroll_engine::config::ConfigLoader;
    ///
    /// let loader = ConfigLoader::from_yaml_str("bulk:\n  max_concurrency: 4\n").unwrap();
    /// assert_eq!(loader.config().bulk.max_concurrency, 4);
    /// ```
    pub fn from_yaml_str(yaml: &str) -> EngineResult<Self> {
        let config: EngineConfig =
            serde_yaml::from_str(yaml).map_err(|e| EngineError::ConfigParseError {
                path: "<inline>".to_string(),
                message: e.to_string(),
            })?;
        config.validate()?;
        Ok(Self { config })
    }

    /// Parses a tax table document.
    pub fn parse_tax_table(yaml: &str) -> EngineResult<TaxTable> {
        let file: TaxTableFile =
            serde_yaml::from_str(yaml).map_err(|e| EngineError::ConfigParseError {
                path: "<inline>".to_string(),
                message: e.to_string(),
            })?;
        TaxTable::new(file.currency, file.brackets)
    }

    /// Loads and parses a YAML file.
    fn load_yaml<T: serde::de::DeserializeOwned>(path: &Path) -> EngineResult<T> {
        let path_str = path.display().to_string();

        let content = fs::read_to_string(path).map_err(|_| EngineError::ConfigNotFound {
            path: path_str.clone(),
        })?;

        serde_yaml::from_str(&content).map_err(|e| EngineError::ConfigParseError {
            path: path_str,
            message: e.to_string(),
        })
    }

    /// Loads all tax table files from the tax directory into `tables`.
    ///
    /// A currency defined twice is rejected; directory order is not stable,
    /// so neither definition can win.
    fn load_tax_tables(tax_dir: &Path, tables: &mut TaxTables) -> EngineResult<()> {
        let tax_dir_str = tax_dir.display().to_string();

        let entries = fs::read_dir(tax_dir).map_err(|_| EngineError::ConfigNotFound {
            path: tax_dir_str.clone(),
        })?;

        for entry in entries {
            let entry = entry.map_err(|_| EngineError::ConfigNotFound {
                path: tax_dir_str.clone(),
            })?;

            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "yaml") {
                let file = Self::load_yaml::<TaxTableFile>(&path)?;
                let table = TaxTable::new(file.currency, file.brackets)?;
                if tables.get(table.currency()).is_some() {
                    return Err(EngineError::InvalidConfig {
                        message: format!(
                            "tax table for currency '{}' is defined more than once ({})",
                            table.currency(),
                            path.display()
                        ),
                    });
                }
                tables.insert(table);
            }
        }

        Ok(())
    }

    /// Returns the loaded configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Consumes the loader, returning the configuration.
    pub fn into_config(self) -> EngineConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PaymentMethod;
    use chrono::Weekday;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn config_path() -> &'static str {
        "./config/default"
    }

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_load_valid_configuration() {
        let result = ConfigLoader::load(config_path());
        assert!(result.is_ok(), "Failed to load config: {:?}", result.err());

        let loader = result.unwrap();
        assert_eq!(loader.config().default_tax_currency.as_deref(), Some("NGN"));
        assert_eq!(loader.config().ledger.payment_method, PaymentMethod::BankTransfer);
    }

    #[test]
    fn test_tax_tables_loaded() {
        let loader = ConfigLoader::load(config_path()).unwrap();
        let table = loader.config().tax_tables.get("NGN").unwrap();
        assert_eq!(table.brackets().len(), 6);
        assert_eq!(table.brackets()[0].rate, dec("0.07"));
        assert!(table.brackets().last().unwrap().max.is_none());
    }

    #[test]
    fn test_workweek_loaded() {
        let loader = ConfigLoader::load(config_path()).unwrap();
        let workweek = &loader.config().workweek;
        assert!(workweek.contains(Weekday::Mon));
        assert!(workweek.contains(Weekday::Fri));
        assert!(!workweek.contains(Weekday::Sat));
    }

    #[test]
    fn test_load_missing_directory_returns_error() {
        let result = ConfigLoader::load("/nonexistent/path");

        match result {
            Err(EngineError::ConfigNotFound { path }) => {
                assert!(path.contains("engine.yaml"));
            }
            other => panic!("Expected ConfigNotFound error, got {:?}", other),
        }
    }

    fn write_config(dir: &Path, tax_files: &[(&str, &str)]) {
        fs::write(dir.join("engine.yaml"), "bulk:\n  max_concurrency: 2\n").unwrap();
        fs::create_dir(dir.join("tax")).unwrap();
        for (name, content) in tax_files {
            fs::write(dir.join("tax").join(name), content).unwrap();
        }
    }

    #[test]
    fn test_load_rejects_duplicate_tax_currency() {
        let dir = tempfile::tempdir().unwrap();
        let table = "currency: GHS\nbrackets:\n  - { min: \"0\", rate: \"0.1\" }\n";
        write_config(dir.path(), &[("GHS.yaml", table), ("GHS-2025.yaml", table)]);

        match ConfigLoader::load(dir.path()) {
            Err(EngineError::InvalidConfig { message }) => {
                assert!(message.contains("GHS"), "unexpected message: {}", message);
            }
            other => panic!("Expected InvalidConfig error, got {:?}", other),
        }
    }

    #[test]
    fn test_load_accepts_distinct_tax_currencies() {
        let dir = tempfile::tempdir().unwrap();
        write_config(
            dir.path(),
            &[
                ("GHS.yaml", "currency: GHS\nbrackets:\n  - { min: \"0\", rate: \"0.1\" }\n"),
                ("KES.yaml", "currency: KES\nbrackets:\n  - { min: \"0\", rate: \"0.2\" }\n"),
                ("notes.txt", "ignored"),
            ],
        );

        let loader = ConfigLoader::load(dir.path()).unwrap();
        assert_eq!(loader.config().tax_tables.len(), 2);
        assert_eq!(loader.config().bulk.max_concurrency, 2);
    }

    #[test]
    fn test_from_yaml_str_applies_defaults() {
        let loader = ConfigLoader::from_yaml_str("workweek: [Sun, Mon, Tue, Wed, Thu]").unwrap();
        let config = loader.config();
        assert!(config.workweek.contains(Weekday::Sun));
        assert!(!config.workweek.contains(Weekday::Fri));
        assert_eq!(config.attendance.max_deduction_percent, Decimal::ONE_HUNDRED);
        assert_eq!(config.bulk.max_concurrency, 1);
    }

    #[test]
    fn test_from_yaml_str_reports_parse_errors() {
        let result = ConfigLoader::from_yaml_str("bulk: [not, a, map]");
        assert!(matches!(result, Err(EngineError::ConfigParseError { .. })));
    }

    #[test]
    fn test_from_yaml_str_rejects_unknown_default_tax_currency() {
        let result = ConfigLoader::from_yaml_str("default_tax_currency: KES");
        assert!(matches!(result, Err(EngineError::InvalidConfig { .. })));
    }

    #[test]
    fn test_parse_tax_table() {
        let yaml = r#"
currency: GHS
brackets:
  - { min: "0", max: "5000", rate: "0" }
  - { min: "5000", rate: "0.1" }
"#;
        let table = ConfigLoader::parse_tax_table(yaml).unwrap();
        assert_eq!(table.currency(), "GHS");
        assert_eq!(table.brackets().len(), 2);
    }

    #[test]
    fn test_parse_tax_table_rejects_overlap() {
        let yaml = r#"
currency: GHS
brackets:
  - { min: "0", max: "5000", rate: "0" }
  - { min: "4000", rate: "0.1" }
"#;
        assert!(matches!(
            ConfigLoader::parse_tax_table(yaml),
            Err(EngineError::InvalidConfig { .. })
        ));
    }
}
