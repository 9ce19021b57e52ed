//! Configuration file and token file handling for mbdata

use anyhow::{Context, Result};
use mbdata_client::ClientConfig;
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Configuration file contents
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Developer account identifier (basic auth at the token endpoint)
    pub account: Option<String>,
    /// Vehicle identification number
    pub vin: Option<String>,
    /// Initial refresh token; superseded by the token file once it exists
    pub refresh_token: Option<String>,
    /// Where rotated refresh tokens are stored
    pub token_file: Option<PathBuf>,
    /// Provider endpoints and timeouts
    #[serde(default)]
    pub client: ClientConfig,
}

impl Config {
    /// Load configuration from the default config file
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Get the default config file path
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    fn config_dir() -> Result<PathBuf> {
        Ok(dirs::config_dir()
            .context("Could not determine config directory")?
            .join("mbdata"))
    }

    /// Merge CLI arguments over config file values and resolve the
    /// refresh token.
    ///
    /// Token precedence: `--refresh-token`, then the token file, then the
    /// config file.
    pub fn merge_with_args(
        self,
        account: Option<&str>,
        vin: Option<&str>,
        refresh_token: Option<&str>,
    ) -> Result<Settings> {
        let account = account
            .map(String::from)
            .or(self.account)
            .context("No account configured (use --account or set `account` in the config file)")?;
        let vin = vin
            .map(String::from)
            .or(self.vin)
            .context("No VIN configured (use --vin or set `vin` in the config file)")?;

        let token_file = match self.token_file {
            Some(path) => TokenFile::new(path),
            None => TokenFile::new(Self::config_dir()?.join("refresh_token")),
        };

        let refresh_token = match refresh_token {
            Some(token) => token.to_string(),
            None => token_file
                .load()?
                .or(self.refresh_token)
                .context("No refresh token available (use --refresh-token or set `refresh_token` in the config file)")?,
        };

        Ok(Settings {
            account,
            vin,
            refresh_token,
            token_file,
            client: self.client,
        })
    }
}

/// Fully resolved configuration after merging CLI args
#[derive(Debug)]
pub struct Settings {
    pub account: String,
    pub vin: String,
    pub refresh_token: String,
    pub token_file: TokenFile,
    pub client: ClientConfig,
}

/// Persisted refresh token
#[derive(Debug)]
pub struct TokenFile {
    path: PathBuf,
    saved: Option<String>,
}

impl TokenFile {
    pub fn new(path: PathBuf) -> Self {
        Self { path, saved: None }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the stored token; `None` when the file is missing or empty
    pub fn load(&self) -> Result<Option<String>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read token file: {}", self.path.display()))?;
        let token = content.trim();
        Ok((!token.is_empty()).then(|| token.to_string()))
    }

    /// Store `token` unless it is the one written last
    pub fn save(&mut self, token: &str) -> Result<()> {
        if self.saved.as_deref() == Some(token) {
            return Ok(());
        }

        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
        }
        write_private(&self.path, token)
            .with_context(|| format!("Failed to write token file: {}", self.path.display()))?;

        tracing::debug!(path = %self.path.display(), "Stored refresh token");
        self.saved = Some(token.to_string());
        Ok(())
    }
}

/// Write a file readable by the owner only (on unix)
fn write_private(path: &Path, content: &str) -> std::io::Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(path)?;
    // mode() only applies when the file is created
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
    }
    file.write_all(content.as_bytes())
}
