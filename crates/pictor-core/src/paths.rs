//! Well-known directories

use std::env;
use std::path::PathBuf;

use anyhow::anyhow;

/// Overrides the configuration directory
pub const CONFIG_DIR_ENV: &str = "PICTOR_CONFIG_DIR";

/// Overrides the directory generated images are written to
pub const OUTPUT_DIR_ENV: &str = "PICTOR_OUTPUT_DIR";

const APP_DIR: &str = "pictor";

/// Directories used by one process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paths {
    /// Holds `config.toml`
    pub config_dir: PathBuf,
    /// Provider-owned files such as credential blobs
    pub data_dir: PathBuf,
    /// Generated images
    pub output_dir: PathBuf,
}

impl Paths {
    /// Resolve from the environment and the OS user directories
    pub fn resolve() -> anyhow::Result<Self> {
        let config_dir = match env::var_os(CONFIG_DIR_ENV) {
            Some(dir) => PathBuf::from(dir),
            None => dirs::config_dir()
                .ok_or_else(|| anyhow!("Could not determine config directory"))?
                .join(APP_DIR),
        };

        let output_dir = match env::var_os(OUTPUT_DIR_ENV) {
            Some(dir) => PathBuf::from(dir),
            None => dirs::download_dir()
                .or_else(|| dirs::home_dir().map(|home| home.join("Downloads")))
                .ok_or_else(|| anyhow!("Could not determine downloads directory"))?
                .join(APP_DIR),
        };

        Ok(Self::under(config_dir, output_dir))
    }

    /// Paths rooted at explicit directories
    pub fn under(config_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        let config_dir = config_dir.into();
        Self {
            data_dir: config_dir.join("data"),
            config_dir,
            output_dir: output_dir.into(),
        }
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_under_derives_data_dir_and_config_file() {
        let paths = Paths::under("/tmp/cfg", "/tmp/out");
        assert_eq!(paths.data_dir, PathBuf::from("/tmp/cfg/data"));
        assert_eq!(paths.config_file(), PathBuf::from("/tmp/cfg/config.toml"));
        assert_eq!(paths.output_dir, PathBuf::from("/tmp/out"));
    }
}
