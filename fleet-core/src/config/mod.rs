//! Layered configuration loading.
//!
//! Every crate keeps a `config/base.yaml` next to its manifest. Values from
//! that file are overridden by `APP_`-prefixed environment variables, with
//! `__` separating nested keys (`APP_API__BASE_URL`).

use config::{Config, ConfigError, Environment, File};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

pub const ENV_PREFIX: &str = "APP";

/// Locate the `config` directory of a workspace member.
///
/// Works both when the process runs from the member directory and from the
/// workspace root.
pub fn config_directory(member: &str) -> Result<PathBuf, ConfigError> {
    let base_path = std::env::current_dir()
        .map_err(|e| ConfigError::Message(format!("Failed to determine current directory: {}", e)))?;

    if base_path.ends_with(member) {
        Ok(base_path.join("config"))
    } else {
        Ok(base_path.join(member).join("config"))
    }
}

/// Load `<dir>/base.yaml` plus environment overrides into `T`.
pub fn load_settings<T: DeserializeOwned>(configuration_directory: &Path) -> Result<T, ConfigError> {
    dotenvy::dotenv().ok();

    let settings = Config::builder()
        .add_source(File::from(configuration_directory.join("base.yaml")).required(true))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    settings.try_deserialize::<T>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::io::Write;

    #[derive(Debug, Deserialize)]
    struct Sample {
        name: String,
        nested: Nested,
    }

    #[derive(Debug, Deserialize)]
    struct Nested {
        port: u16,
    }

    #[test]
    fn loads_base_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = std::fs::File::create(dir.path().join("base.yaml")).unwrap();
        writeln!(file, "name: console\nnested:\n  port: 8080").unwrap();

        let sample: Sample = load_settings(dir.path()).unwrap();
        assert_eq!(sample.name, "console");
        assert_eq!(sample.nested.port, 8080);
    }

    #[test]
    fn missing_base_yaml_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result: Result<Sample, _> = load_settings(dir.path());
        assert!(result.is_err());
    }

    #[test]
    fn config_directory_appends_member() {
        let dir = config_directory("fleet-console").unwrap();
        assert!(dir.ends_with("config"));
    }
}
