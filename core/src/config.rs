use camino::{Utf8Path as Path, Utf8PathBuf as PathBuf};
use eyre::{bail, eyre, Context, Result};
use serde::Deserialize;
use std::time::Duration;

use crate::media::retry::RetryConfig;

pub const DEFAULT_FOLDER: &str = "photo_gallery";
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
struct TomlServer {
    address: Option<String>,
    port: Option<u16>,
    max_upload_bytes: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
struct TomlDataDir {
    path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
struct TomlAdmin {
    password: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum TomlMediaStoreKind {
    Cloudinary,
    Local,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Default)]
struct TomlCloudinary {
    cloud_name: Option<String>,
    api_key: Option<String>,
    api_secret: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
struct TomlLocalStore {
    path: String,
    public_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
struct TomlMediaStore {
    kind: Option<TomlMediaStoreKind>,
    folder: Option<String>,
    timeout_secs: Option<u64>,
    #[serde(rename = "Cloudinary")]
    cloudinary: Option<TomlCloudinary>,
    #[serde(rename = "Local")]
    local: Option<TomlLocalStore>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
struct TomlRetry {
    max_attempts: Option<u32>,
    base_delay_ms: Option<u64>,
    max_delay_ms: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
struct TomlConfig {
    #[serde(rename = "Server")]
    pub server: Option<TomlServer>,
    #[serde(rename = "DataDir")]
    pub data_dir: TomlDataDir,
    #[serde(rename = "Admin")]
    pub admin: Option<TomlAdmin>,
    #[serde(rename = "MediaStore")]
    pub media_store: Option<TomlMediaStore>,
    #[serde(rename = "Retry")]
    pub retry: Option<TomlRetry>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub address: String,
    pub port: u16,
    pub max_upload_bytes: usize,
}

#[derive(Clone, PartialEq, Eq)]
pub struct CloudinaryCredentials {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
}

impl std::fmt::Debug for CloudinaryCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudinaryCredentials")
            .field("cloud_name", &self.cloud_name)
            .field("api_key", &self.api_key)
            .field("api_secret", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaBackendConfig {
    Cloudinary(CloudinaryCredentials),
    Local {
        root: PathBuf,
        /// URL prefix the blobs are reachable under
        public_url: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaStoreConfig {
    pub backend: MediaBackendConfig,
    /// Folder (public_id prefix) all gallery objects live in
    pub folder: String,
    pub timeout: Duration,
}

#[derive(Clone, PartialEq, Eq)]
pub struct Config {
    pub server: ServerConfig,
    pub data_dir: PathBuf,
    pub admin_password: String,
    pub media_store: MediaStoreConfig,
    pub retry: RetryConfig,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("server", &self.server)
            .field("data_dir", &self.data_dir)
            .field("admin_password", &"<redacted>")
            .field("media_store", &self.media_store)
            .field("retry", &self.retry)
            .finish()
    }
}

impl Config {
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("galleria.db")
    }
}

pub async fn read_config(path: &Path) -> Result<Config> {
    let toml_str = tokio::fs::read_to_string(path)
        .await
        .context(format!("Error reading config file {}", path))?;
    let base_dir = path.parent().unwrap_or(Path::new("."));
    parse_config(&toml_str, base_dir, |key| std::env::var(key).ok())
}

/// Parses the TOML config and applies environment overrides looked up
/// through `env`. Relative paths are resolved against `base_dir`.
pub fn parse_config(
    toml_str: &str,
    base_dir: &Path,
    env: impl Fn(&str) -> Option<String>,
) -> Result<Config> {
    let toml_config: TomlConfig = toml::from_str(toml_str).context("Error parsing config file")?;
    let resolve = |p: &str| -> PathBuf {
        let p = PathBuf::from(p);
        if p.is_absolute() {
            p
        } else {
            base_dir.join(p)
        }
    };

    let server = {
        let toml_server = toml_config.server.unwrap_or(TomlServer {
            address: None,
            port: None,
            max_upload_bytes: None,
        });
        ServerConfig {
            address: toml_server
                .address
                .unwrap_or_else(|| "127.0.0.1".to_owned()),
            port: toml_server.port.unwrap_or(DEFAULT_PORT),
            max_upload_bytes: toml_server
                .max_upload_bytes
                .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES),
        }
    };

    let data_dir = resolve(&toml_config.data_dir.path);

    let admin_password = env("GALLERIA_ADMIN_PASSWORD")
        .or(toml_config.admin.and_then(|admin| admin.password))
        .filter(|password| !password.is_empty())
        .ok_or_else(|| {
            eyre!("no admin password configured, set Admin.password or GALLERIA_ADMIN_PASSWORD")
        })?;

    let media_store = {
        let toml_media = toml_config.media_store.unwrap_or(TomlMediaStore {
            kind: None,
            folder: None,
            timeout_secs: None,
            cloudinary: None,
            local: None,
        });
        let folder = toml_media
            .folder
            .map(|folder| folder.trim_matches('/').to_owned())
            .unwrap_or_else(|| DEFAULT_FOLDER.to_owned());
        if folder.is_empty() {
            bail!("MediaStore.folder must not be empty");
        }
        let backend = match toml_media.kind.unwrap_or(TomlMediaStoreKind::Cloudinary) {
            TomlMediaStoreKind::Cloudinary => MediaBackendConfig::Cloudinary(
                cloudinary_credentials(toml_media.cloudinary.unwrap_or_default(), &env)?,
            ),
            TomlMediaStoreKind::Local => {
                let Some(local) = toml_media.local else {
                    bail!("MediaStore.kind is local but section MediaStore.Local is missing");
                };
                MediaBackendConfig::Local {
                    root: resolve(&local.path),
                    public_url: local
                        .public_url
                        .map(|url| url.trim_end_matches('/').to_owned())
                        .unwrap_or_else(|| "/media".to_owned()),
                }
            }
        };
        MediaStoreConfig {
            backend,
            folder,
            timeout: Duration::from_secs(toml_media.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)),
        }
    };

    let retry = {
        let default = RetryConfig::default();
        match toml_config.retry {
            None => default,
            Some(toml_retry) => RetryConfig {
                max_attempts: toml_retry.max_attempts.unwrap_or(default.max_attempts),
                base_delay: toml_retry
                    .base_delay_ms
                    .map(Duration::from_millis)
                    .unwrap_or(default.base_delay),
                max_delay: toml_retry
                    .max_delay_ms
                    .map(Duration::from_millis)
                    .unwrap_or(default.max_delay),
            },
        }
    };
    if retry.max_attempts == 0 {
        bail!("Retry.max_attempts must be at least 1");
    }

    Ok(Config {
        server,
        data_dir,
        admin_password,
        media_store,
        retry,
    })
}

/// Precedence, lowest first: config file, `CLOUDINARY_URL`, the individual
/// `CLOUDINARY_*` variables.
fn cloudinary_credentials(
    from_file: TomlCloudinary,
    env: &impl Fn(&str) -> Option<String>,
) -> Result<CloudinaryCredentials> {
    let mut cloud_name = from_file.cloud_name;
    let mut api_key = from_file.api_key;
    let mut api_secret = from_file.api_secret;
    if let Some(url) = env("CLOUDINARY_URL") {
        let parsed = parse_cloudinary_url(&url)?;
        cloud_name = Some(parsed.cloud_name);
        api_key = Some(parsed.api_key);
        api_secret = Some(parsed.api_secret);
    }
    cloud_name = env("CLOUDINARY_CLOUD_NAME").or(cloud_name);
    api_key = env("CLOUDINARY_API_KEY").or(api_key);
    api_secret = env("CLOUDINARY_API_SECRET").or(api_secret);
    match (cloud_name, api_key, api_secret) {
        (Some(cloud_name), Some(api_key), Some(api_secret))
            if !cloud_name.is_empty() && !api_key.is_empty() && !api_secret.is_empty() =>
        {
            Ok(CloudinaryCredentials {
                cloud_name,
                api_key,
                api_secret,
            })
        }
        _ => bail!(
            "incomplete Cloudinary credentials, set MediaStore.Cloudinary or CLOUDINARY_URL or CLOUDINARY_CLOUD_NAME/CLOUDINARY_API_KEY/CLOUDINARY_API_SECRET"
        ),
    }
}

/// Parses `cloudinary://<api_key>:<api_secret>@<cloud_name>`.
fn parse_cloudinary_url(url: &str) -> Result<CloudinaryCredentials> {
    let Some(rest) = url.trim().strip_prefix("cloudinary://") else {
        bail!("CLOUDINARY_URL must start with cloudinary://");
    };
    let (key_secret, cloud_name) = rest
        .rsplit_once('@')
        .ok_or_else(|| eyre!("CLOUDINARY_URL is missing the cloud name"))?;
    let (api_key, api_secret) = key_secret
        .split_once(':')
        .ok_or_else(|| eyre!("CLOUDINARY_URL is missing the api secret"))?;
    Ok(CloudinaryCredentials {
        cloud_name: cloud_name.trim_end_matches('/').to_owned(),
        api_key: api_key.to_owned(),
        api_secret: api_secret.to_owned(),
    })
}
