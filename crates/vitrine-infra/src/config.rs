//! Pipeline configuration loader.
//!
//! Reads `vitrine.toml` and deserializes it into [`PipelineConfig`]. A
//! missing default file falls back to defaults, but an explicitly given
//! path must exist, and a file that fails to parse is an error rather than
//! a silent default -- this config carries connection targets, not tuning
//! hints. The API key is never read from the file; it arrives separately
//! via the environment.

use std::path::Path;

use vitrine_types::config::PipelineConfig;
use vitrine_types::error::ConfigError;

/// Default config file name, looked up in the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "vitrine.toml";

/// Load pipeline configuration.
///
/// - `Some(path)`: the file must exist and parse.
/// - `None`: `vitrine.toml` is tried; if absent, defaults are returned.
pub async fn load_config(path: Option<&Path>) -> Result<PipelineConfig, ConfigError> {
    let (path, required) = match path {
        Some(p) => (p.to_path_buf(), true),
        None => (Path::new(DEFAULT_CONFIG_PATH).to_path_buf(), false),
    };

    let content = match tokio::fs::read_to_string(&path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound && !required => {
            tracing::debug!("no {} found, using defaults", path.display());
            return Ok(PipelineConfig::default());
        }
        Err(err) => {
            return Err(ConfigError::Read {
                path: path.display().to_string(),
                reason: err.to_string(),
            });
        }
    };

    toml::from_str(&content).map_err(|err| ConfigError::Parse {
        path: path.display().to_string(),
        reason: err.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_explicit_path_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let missing = tmp.path().join("vitrine.toml");
        let err = load_config(Some(&missing)).await.unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[tokio::test]
    async fn test_valid_file_parses() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("vitrine.toml");
        tokio::fs::write(
            &path,
            r#"
            [embedding]
            model = "embedding-001"
            batch_size = 10

            [store]
            url = "postgres://app@db:5432/products"

            [catalog]
            path = "data/products.json"
            "#,
        )
        .await
        .unwrap();

        let config = load_config(Some(&path)).await.unwrap();
        assert_eq!(config.embedding.batch_size, 10);
        assert_eq!(config.store.url, "postgres://app@db:5432/products");
        assert_eq!(config.catalog.path, "data/products.json");
    }

    #[tokio::test]
    async fn test_invalid_toml_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("vitrine.toml");
        tokio::fs::write(&path, "this is not { valid toml !!!")
            .await
            .unwrap();

        let err = load_config(Some(&path)).await.unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
