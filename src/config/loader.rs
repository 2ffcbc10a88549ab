//! Environment-aware configuration loading.
//!
//! Finds `ingest-config.yaml`, applies the overlay section matching the
//! detected environment (deep merge, scalars override), strips the
//! overlay sections, and deserializes into an immutable [`IngestConfig`]
//! snapshot.

use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_yaml::Value as YamlValue;
use tracing::debug;

use super::error::{ConfigResult, ConfigurationError};
use super::IngestConfig;

const CONFIG_FILE_NAMES: [&str; 2] = ["ingest-config.yaml", "ingest-config.yml"];
const ENVIRONMENT_SECTIONS: [&str; 3] = ["development", "test", "production"];

pub struct ConfigManager {
    config: IngestConfig,
    environment: String,
    config_directory: PathBuf,
}

impl ConfigManager {
    /// Load configuration with environment auto-detection.
    pub fn load() -> ConfigResult<Arc<ConfigManager>> {
        Self::load_from_directory(None)
    }

    pub fn load_from_directory(config_dir: Option<PathBuf>) -> ConfigResult<Arc<ConfigManager>> {
        let environment = Self::detect_environment();
        Self::load_from_directory_with_env(config_dir, &environment)
    }

    /// Explicit-environment variant, used by tests to avoid mutating
    /// process environment variables.
    pub fn load_from_directory_with_env(
        config_dir: Option<PathBuf>,
        environment: &str,
    ) -> ConfigResult<Arc<ConfigManager>> {
        let config_directory = config_dir.unwrap_or_else(|| PathBuf::from("config"));

        debug!(
            environment = environment,
            directory = %config_directory.display(),
            "loading configuration"
        );

        let config = Self::load_and_merge_config(&config_directory, environment)?;
        config.validate()?;

        Ok(Arc::new(ConfigManager {
            config,
            environment: environment.to_string(),
            config_directory,
        }))
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn config_directory(&self) -> &Path {
        &self.config_directory
    }

    fn detect_environment() -> String {
        env::var("INGEST_ENV")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string())
            .to_lowercase()
    }

    fn find_config_file(config_directory: &Path) -> ConfigResult<PathBuf> {
        let mut searched = Vec::new();
        for name in CONFIG_FILE_NAMES {
            let path = config_directory.join(name);
            if path.exists() {
                return Ok(path);
            }
            searched.push(path);
        }
        Err(ConfigurationError::config_file_not_found(searched))
    }

    fn load_and_merge_config(
        config_directory: &Path,
        environment: &str,
    ) -> ConfigResult<IngestConfig> {
        let config_file = Self::find_config_file(config_directory)?;

        let yaml_content = std::fs::read_to_string(&config_file)
            .map_err(|e| ConfigurationError::file_read_error(config_file.display().to_string(), e))?;

        let mut yaml_data: YamlValue = serde_yaml::from_str(&yaml_content)
            .map_err(|e| ConfigurationError::invalid_yaml(config_file.display().to_string(), e))?;

        if let Some(overrides) = yaml_data.get(environment).cloned() {
            debug!(environment = environment, "applying environment overlay");
            Self::merge_yaml_values(&mut yaml_data, overrides);
        }

        if let YamlValue::Mapping(ref mut map) = yaml_data {
            for section in ENVIRONMENT_SECTIONS {
                map.remove(YamlValue::String(section.to_string()));
            }
        }

        serde_yaml::from_value(yaml_data)
            .map_err(|e| ConfigurationError::invalid_yaml(config_file.display().to_string(), e))
    }

    /// Mappings merge recursively; anything else overrides the base value.
    fn merge_yaml_values(base: &mut YamlValue, override_value: YamlValue) {
        match (&mut *base, override_value) {
            (YamlValue::Mapping(base_map), YamlValue::Mapping(override_map)) => {
                for (key, value) in override_map {
                    if let Some(existing) = base_map.get_mut(&key) {
                        Self::merge_yaml_values(existing, value);
                    } else {
                        base_map.insert(key, value);
                    }
                }
            }
            (base_ref, override_val) => {
                *base_ref = override_val;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(dir: &Path, content: &str) {
        let mut file = std::fs::File::create(dir.join("ingest-config.yaml")).unwrap();
        file.write_all(content.as_bytes()).unwrap();
    }

    const BASE_CONFIG: &str = r#"
database:
  host: localhost
  port: 5432
  username: ingest
  password: secret
  database: manuscripta
  pool: 10
queues:
  import_queue: import_jobs
  result_queue: import_results
  poll_interval_ms: 250
  visibility_timeout_seconds: 7200
  batch_size: 10
import:
  job_timeout_seconds: 7200
  display_url_base: https://manuscripta.example.org/objects
authority:
  endpoint: http://localhost:9000/authority
  max_retries: 3
  attempt_timeout_ms: 5000
test:
  database:
    database: manuscripta_test
  queues:
    poll_interval_ms: 10
"#;

    #[test]
    fn test_loads_base_configuration() {
        let dir = tempfile::tempdir().unwrap();
        write_config(dir.path(), BASE_CONFIG);

        let manager = ConfigManager::load_from_directory_with_env(
            Some(dir.path().to_path_buf()),
            "development",
        )
        .unwrap();
        assert_eq!(manager.environment(), "development");
        assert_eq!(manager.config().database.database, "manuscripta");
        assert_eq!(manager.config().queues.poll_interval_ms, 250);
    }

    #[test]
    fn test_environment_overlay_deep_merges() {
        let dir = tempfile::tempdir().unwrap();
        write_config(dir.path(), BASE_CONFIG);

        let manager =
            ConfigManager::load_from_directory_with_env(Some(dir.path().to_path_buf()), "test")
                .unwrap();
        // Overlaid values replace, untouched siblings survive.
        assert_eq!(manager.config().database.database, "manuscripta_test");
        assert_eq!(manager.config().database.host, "localhost");
        assert_eq!(manager.config().queues.poll_interval_ms, 10);
        assert_eq!(manager.config().queues.batch_size, 10);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = ConfigManager::load_from_directory_with_env(
            Some(dir.path().to_path_buf()),
            "development",
        );
        assert!(matches!(
            result,
            Err(ConfigurationError::ConfigFileNotFound { .. })
        ));
    }

    #[test]
    fn test_invalid_values_rejected_at_load() {
        let dir = tempfile::tempdir().unwrap();
        write_config(
            dir.path(),
            "database:\n  pool: 0\n",
        );
        let result = ConfigManager::load_from_directory_with_env(
            Some(dir.path().to_path_buf()),
            "development",
        );
        assert!(result.is_err());
    }
}
