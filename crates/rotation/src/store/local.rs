//! Local filesystem secret store
//!
//! Each secret version is one JSON file named `<id>.secret` inside the
//! configured directory. Writes go to a temporary file first and are renamed
//! into place, so a crash never leaves a half-written record behind.

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use super::{SecretStore, latest_of};
use crate::error::{ConfigError, StoreError};
use crate::secret::{SecretValue, StoredSecret};

const FILE_EXTENSION: &str = "secret";
const CURRENT_VERSION: u32 = 1;
const MAX_ID_LEN: usize = 128;
const DIRECTORY: &str = "[directory]";

/// Local store configuration
///
/// # Examples
///
/// ```
/// use locksmith_rotation::store::LocalStoreConfig;
/// use std::collections::HashMap;
///
/// let params = HashMap::from([
///     ("path".to_string(), "/var/lib/locksmith".to_string()),
///     ("create_dir".to_string(), "false".to_string()),
/// ]);
/// let config = LocalStoreConfig::from_params(&params).unwrap();
/// assert!(!config.create_dir);
///
/// assert!(LocalStoreConfig::new("relative/dir").validate().is_err());
/// ```
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct LocalStoreConfig {
    /// Directory holding the secret files; must be absolute
    pub path: PathBuf,

    /// Whether to create the directory if it doesn't exist
    ///
    /// Default: true
    #[serde(default = "default_create_dir")]
    pub create_dir: bool,
}

fn default_create_dir() -> bool {
    true
}

impl LocalStoreConfig {
    /// Configuration for the given directory
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            create_dir: default_create_dir(),
        }
    }

    /// Set whether to create the directory if it doesn't exist
    pub fn with_create_dir(mut self, create_dir: bool) -> Self {
        self.create_dir = create_dir;
        self
    }

    /// Build from `setup` parameters (`path`, optional `create_dir`)
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let path = params
            .get("path")
            .filter(|p| !p.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingRequired {
                field: "path".to_string(),
            })?;

        let create_dir = match params.get("create_dir") {
            None => default_create_dir(),
            Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
                field: "create_dir".to_string(),
                reason: format!("expected 'true' or 'false', got '{raw}'"),
            })?,
        };

        let config = Self {
            path: PathBuf::from(path),
            create_dir,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.path.is_absolute() {
            return Err(ConfigError::InvalidValue {
                field: "path".to_string(),
                reason: format!("must be an absolute path, got '{}'", self.path.display()),
            });
        }
        Ok(())
    }
}

/// On-disk record format
#[derive(Serialize, Deserialize)]
struct SecretFile {
    version: u32,
    id: String,
    /// Base64 (standard alphabet) secret bytes
    value: String,
    created_at: DateTime<Utc>,
}

impl SecretFile {
    fn new(id: &str, value: &SecretValue, created_at: DateTime<Utc>) -> Self {
        Self {
            version: CURRENT_VERSION,
            id: id.to_string(),
            value: value.expose_secret(|bytes| STANDARD.encode(bytes)),
            created_at,
        }
    }

    fn into_stored(self, source: &str) -> Result<StoredSecret, StoreError> {
        if self.version != CURRENT_VERSION {
            return Err(StoreError::Corrupted {
                id: source.to_string(),
                reason: format!("unsupported record version {}", self.version),
            });
        }
        let bytes = STANDARD
            .decode(self.value.as_bytes())
            .map_err(|e| StoreError::Corrupted {
                id: source.to_string(),
                reason: format!("invalid base64 value: {e}"),
            })?;
        Ok(StoredSecret::new(
            self.id,
            SecretValue::new(bytes),
            self.created_at,
        ))
    }
}

/// Reject identifiers that could escape the store directory
fn validate_id(id: &str) -> Result<(), StoreError> {
    let reason = if id.is_empty() {
        Some("must not be empty")
    } else if id.len() > MAX_ID_LEN {
        Some("too long")
    } else if !id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        Some("only ASCII letters, digits, '-' and '_' are allowed")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(StoreError::InvalidId {
            id: id.to_string(),
            reason: reason.to_string(),
        }),
        None => Ok(()),
    }
}

/// Atomically write data to a file with owner-only permissions
///
/// Writes a temporary file in the same directory, then renames it over the
/// target. Either the full record lands or nothing changes.
async fn atomic_write(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let temp_path = path.with_file_name(format!(
        "{}.tmp.{}",
        path.file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("secret"),
        Uuid::new_v4()
    ));

    tokio::fs::write(&temp_path, data).await?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        if let Err(e) = tokio::fs::set_permissions(&temp_path, perms).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(e);
        }
    }

    if let Err(e) = tokio::fs::rename(&temp_path, path).await {
        let _ = tokio::fs::remove_file(&temp_path).await;
        return Err(e);
    }
    Ok(())
}

/// Secret store persisting each version as a JSON file
///
/// Construct with [`LocalSecretStore::new`], or start from
/// [`LocalSecretStore::default`] and configure through
/// [`SecretStore::setup`]. Operations on an unconfigured store fail with
/// `ConfigError::MissingRequired`.
#[derive(Debug, Clone, Default)]
pub struct LocalSecretStore {
    config: Option<LocalStoreConfig>,
}

impl LocalSecretStore {
    /// Create a configured store
    pub fn new(config: LocalStoreConfig) -> Result<Self, StoreError> {
        config.validate()?;
        Ok(Self {
            config: Some(config),
        })
    }

    /// Configured directory, if any
    pub fn path(&self) -> Option<&Path> {
        self.config.as_ref().map(|c| c.path.as_path())
    }

    fn config(&self) -> Result<&LocalStoreConfig, StoreError> {
        self.config.as_ref().ok_or_else(|| {
            StoreError::Config(ConfigError::MissingRequired {
                field: "path".to_string(),
            })
        })
    }

    fn file_path(&self, id: &str) -> Result<PathBuf, StoreError> {
        validate_id(id)?;
        Ok(self.config()?.path.join(format!("{id}.{FILE_EXTENSION}")))
    }

    /// Ensure the base directory exists with owner-only permissions
    async fn ensure_directory_exists(&self) -> Result<(), StoreError> {
        let config = self.config()?;
        let exists = tokio::fs::try_exists(&config.path)
            .await
            .map_err(|e| StoreError::ReadFailure {
                id: DIRECTORY.to_string(),
                source: e,
            })?;
        if exists {
            return Ok(());
        }

        if !config.create_dir {
            return Err(StoreError::WriteFailure {
                id: DIRECTORY.to_string(),
                source: std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!(
                        "directory does not exist and create_dir is false: {}",
                        config.path.display()
                    ),
                ),
            });
        }

        tokio::fs::create_dir_all(&config.path)
            .await
            .map_err(|e| StoreError::WriteFailure {
                id: DIRECTORY.to_string(),
                source: e,
            })?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o700);
            tokio::fs::set_permissions(&config.path, perms)
                .await
                .map_err(|e| StoreError::WriteFailure {
                    id: DIRECTORY.to_string(),
                    source: e,
                })?;
        }

        tracing::debug!(path = %config.path.display(), "Created secret store directory");
        Ok(())
    }

    async fn read_record(path: &Path, source: &str) -> Result<StoredSecret, StoreError> {
        let json = tokio::fs::read(path)
            .await
            .map_err(|e| StoreError::ReadFailure {
                id: source.to_string(),
                source: e,
            })?;
        let file: SecretFile =
            serde_json::from_slice(&json).map_err(|e| StoreError::Corrupted {
                id: source.to_string(),
                reason: e.to_string(),
            })?;
        file.into_stored(source)
    }
}

#[async_trait]
impl SecretStore for LocalSecretStore {
    async fn setup(&mut self, params: &HashMap<String, String>) -> Result<(), StoreError> {
        let config = LocalStoreConfig::from_params(params)?;
        tracing::debug!(path = %config.path.display(), "Configured local secret store");
        self.config = Some(config);
        self.ensure_directory_exists().await
    }

    async fn store(
        &self,
        id: &str,
        value: &SecretValue,
        created_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let path = self.file_path(id)?;
        self.ensure_directory_exists().await?;

        let json = serde_json::to_vec_pretty(&SecretFile::new(id, value, created_at)).map_err(
            |e| StoreError::WriteFailure {
                id: id.to_string(),
                source: std::io::Error::new(std::io::ErrorKind::InvalidData, e),
            },
        )?;

        atomic_write(&path, &json)
            .await
            .map_err(|e| StoreError::WriteFailure {
                id: id.to_string(),
                source: e,
            })
    }

    async fn get_latest(&self) -> Result<StoredSecret, StoreError> {
        latest_of(self.get_all().await?)
    }

    async fn get_all(&self) -> Result<Vec<StoredSecret>, StoreError> {
        self.ensure_directory_exists().await?;
        let base = &self.config()?.path;

        let mut entries = tokio::fs::read_dir(base)
            .await
            .map_err(|e| StoreError::ReadFailure {
                id: DIRECTORY.to_string(),
                source: e,
            })?;

        let mut records = Vec::new();
        while let Some(entry) =
            entries
                .next_entry()
                .await
                .map_err(|e| StoreError::ReadFailure {
                    id: DIRECTORY.to_string(),
                    source: e,
                })?
        {
            let path = entry.path();
            if path.extension().is_none_or(|ext| ext != FILE_EXTENSION) {
                continue;
            }
            let name = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or(DIRECTORY)
                .to_string();

            // One unreadable file must not hide the rest of the history
            match Self::read_record(&path, &name).await {
                Ok(record) => records.push(record),
                Err(error) => {
                    tracing::warn!(file = %name, %error, "Skipping unreadable secret record");
                }
            }
        }

        Ok(records)
    }

    async fn get(&self, id: &str) -> Result<StoredSecret, StoreError> {
        let path = self.file_path(id)?;
        match tokio::fs::try_exists(&path).await {
            Ok(true) => Self::read_record(&path, id).await,
            Ok(false) => Err(StoreError::NotFound { id: id.to_string() }),
            Err(e) => Err(StoreError::ReadFailure {
                id: id.to_string(),
                source: e,
            }),
        }
    }

    fn provider_name(&self) -> &'static str {
        "local"
    }
}
