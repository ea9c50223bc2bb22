use std::path::Path;

use serde::{Deserialize, Serialize};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use retention::RetentionConfig;

/// Configuration file picked up from the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "snapshot-lifecycle.toml";

/// Prefix for environment overrides, e.g. `SNAPSHOT_LIFECYCLE__RETENTION__DRY_RUN=true`.
pub const ENV_PREFIX: &str = "SNAPSHOT_LIFECYCLE__";

/// Where snapshots live.
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct StorageConfig {
    /// Bucket name, or a storage URL (`s3://`, `file://`, `memory://`)
    #[serde(default)]
    pub bucket: String,
    /// Bucket region
    #[serde(default)]
    pub region: String,
    /// Custom S3-compatible endpoint (MinIO, LocalStack)
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Permit plain HTTP to the endpoint
    #[serde(default)]
    pub allow_http: bool,
}

impl StorageConfig {
    pub fn is_configured(&self) -> bool {
        !self.bucket.is_empty()
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Configuration {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub retention: RetentionConfig,
}

impl Configuration {
    fn figment(path: &Path) -> Figment {
        Figment::from(Serialized::defaults(Configuration::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    pub fn load() -> Result<Self, Box<figment::Error>> {
        Self::load_from_path(Path::new(DEFAULT_CONFIG_FILE))
    }

    /// Load with `path` as the TOML layer. A missing file is not an error.
    pub fn load_from_path(path: &Path) -> Result<Self, Box<figment::Error>> {
        let config = Self::figment(path).extract().map_err(Box::new)?;

        Ok(config)
    }
}
