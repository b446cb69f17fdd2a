//! Profile storage in `~/.atko`
//!
//! Non-secret settings live in `config.yaml`, secrets in `credentials.yaml`, both keyed by
//! profile name:
//!
//! ```yaml
//! default:
//!   base_url: https://acme.okta.com
//!   api_mode: oauth
//!   oauth_flow: pkce
//! ```
//!
//! Reads go through the `config` crate so that `ATKO__<PROFILE>__<KEY>` environment variables
//! override file values. Writes only ever persist what the files contained plus the change.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use atko_auth::{OAuthClient, OAuthConfig, PrintUrl, SystemBrowser, TokenCache, TokenLifecycleManager};
use atko_client::{Credentials, OktaClient};
use config::{Config, Environment, File, FileFormat};
use secrecy::SecretString;
use tracing::debug;

use crate::cli::ApiModeArg;
use crate::error::{CliError, CliResult};

/// Settings of a single profile
pub type Settings = BTreeMap<String, String>;

type ProfileMap = BTreeMap<String, Settings>;

/// Keys accepted in a profile
pub const PROFILE_KEYS: &[&str] = &[
    "base_url",
    "api_mode",
    "api_token",
    "oauth_flow",
    "auth_server_id",
    "client_id",
    "client_secret",
    "redirect_uri",
    "userid",
    "password",
    "private_key",
    "signing_algorithm",
    "key_id",
];

/// Keys stored in `credentials.yaml` and masked on display
pub const SECRET_KEYS: &[&str] = &["api_token", "client_secret", "password"];

const CONFIG_FILE: &str = "config.yaml";
const CREDENTIALS_FILE: &str = "credentials.yaml";
const CACHE_FILE: &str = "cache.json";
const ENV_PREFIX: &str = "ATKO";

/// How requests authenticate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiMode {
    Token,
    OAuth,
}

impl ApiMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Token => "token",
            Self::OAuth => "oauth",
        }
    }
}

impl fmt::Display for ApiMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<ApiModeArg> for ApiMode {
    fn from(arg: ApiModeArg) -> Self {
        match arg {
            ApiModeArg::Token => Self::Token,
            ApiModeArg::Oauth => Self::OAuth,
        }
    }
}

impl FromStr for ApiMode {
    type Err = CliError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "token" => Ok(Self::Token),
            "oauth" => Ok(Self::OAuth),
            other => Err(CliError::InvalidArguments(format!(
                "api_mode must be 'token' or 'oauth', got '{other}'"
            ))),
        }
    }
}

/// A named set of settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub name: String,
    pub settings: Settings,
}

impl Profile {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_lowercase(),
            settings: Settings::new(),
        }
    }

    /// Non-empty value of `key`
    pub fn get(&self, key: &str) -> Option<&str> {
        self.settings
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }

    /// Set `key`, or clear it when `value` is empty
    ///
    /// # Errors
    ///
    /// [`CliError::InvalidArguments`] for keys a profile does not have.
    pub fn set(&mut self, key: &str, value: impl Into<String>) -> CliResult<()> {
        if !PROFILE_KEYS.contains(&key) {
            return Err(CliError::InvalidArguments(format!(
                "'{key}' is not a profile setting"
            )));
        }
        let value = value.into();
        if value.is_empty() {
            self.settings.remove(key);
        } else {
            self.settings.insert(key.to_string(), value);
        }
        Ok(())
    }

    /// Authentication mode, `token` when unset
    ///
    /// # Errors
    ///
    /// Unknown modes.
    pub fn api_mode(&self) -> CliResult<ApiMode> {
        self.get("api_mode").map_or(Ok(ApiMode::Token), str::parse)
    }

    /// Org URL without a trailing slash
    ///
    /// # Errors
    ///
    /// [`CliError::InvalidArguments`] when the profile has no usable URL.
    pub fn base_url(&self) -> CliResult<&str> {
        let url = self.get("base_url").ok_or_else(|| {
            CliError::InvalidArguments(format!("profile '{}' has no base_url", self.name))
        })?;
        if !(url.starts_with("https://") || url.starts_with("http://")) {
            return Err(CliError::InvalidArguments(format!(
                "base_url '{url}' must start with https://"
            )));
        }
        Ok(url.trim_end_matches('/'))
    }

    /// OAuth configuration built from the flow settings
    ///
    /// # Errors
    ///
    /// Configuration errors for unknown flows or missing parameters.
    pub fn oauth_config(&self) -> CliResult<OAuthConfig> {
        let settings: HashMap<String, String> = self
            .settings
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Ok(OAuthConfig::from_settings(&settings)?)
    }

    /// Settings with secrets masked
    pub fn masked(&self) -> Settings {
        self.settings
            .iter()
            .map(|(k, v)| {
                let shown = if SECRET_KEYS.contains(&k.as_str()) {
                    mask(v)
                } else {
                    v.clone()
                };
                (k.clone(), shown)
            })
            .collect()
    }
}

fn mask(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 8 {
        return "********".to_string();
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("********{tail}")
}

/// Profile files under one directory
#[derive(Debug, Clone)]
pub struct ProfileStore {
    dir: PathBuf,
    env: Option<config::Map<String, String>>,
}

impl ProfileStore {
    /// `~/.atko`
    ///
    /// # Errors
    ///
    /// When the home directory cannot be determined.
    pub fn default_location() -> CliResult<Self> {
        let home = dirs::home_dir()
            .ok_or_else(|| CliError::Other("Could not find home directory".to_string()))?;
        Ok(Self::at(home.join(".atko")))
    }

    pub fn at(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            env: None,
        }
    }

    /// Use `vars` instead of the process environment for overrides
    pub fn with_env(mut self, vars: config::Map<String, String>) -> Self {
        self.env = Some(vars);
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn config_path(&self) -> PathBuf {
        self.dir.join(CONFIG_FILE)
    }

    pub fn credentials_path(&self) -> PathBuf {
        self.dir.join(CREDENTIALS_FILE)
    }

    pub fn cache_path(&self) -> PathBuf {
        self.dir.join(CACHE_FILE)
    }

    /// Every profile with environment overrides applied
    ///
    /// # Errors
    ///
    /// Unreadable or malformed profile files.
    pub fn load_all(&self) -> CliResult<BTreeMap<String, Profile>> {
        let config_path = self.config_path();
        let credentials_path = self.credentials_path();
        let merged: ProfileMap = Config::builder()
            .add_source(File::new(&path_str(&config_path), FileFormat::Yaml).required(false))
            .add_source(File::new(&path_str(&credentials_path), FileFormat::Yaml).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .source(self.env.clone()),
            )
            .build()?
            .try_deserialize()?;

        Ok(merged
            .into_iter()
            .map(|(name, settings)| {
                let name = name.to_lowercase();
                (name.clone(), Profile { name, settings })
            })
            .collect())
    }

    /// The profile called `name`
    ///
    /// # Errors
    ///
    /// [`CliError::ProfileNotFound`] when it is not configured.
    pub fn load(&self, name: &str) -> CliResult<Profile> {
        let name = name.to_lowercase();
        self.load_all()?
            .remove(&name)
            .ok_or(CliError::ProfileNotFound(name))
    }

    /// The profile called `name`, or an empty one
    ///
    /// # Errors
    ///
    /// Unreadable or malformed profile files.
    pub fn load_or_new(&self, name: &str) -> CliResult<Profile> {
        match self.load(name) {
            Err(CliError::ProfileNotFound(_)) => Ok(Profile::new(name)),
            other => other,
        }
    }

    /// Configured profile names
    ///
    /// # Errors
    ///
    /// Unreadable or malformed profile files.
    pub fn names(&self) -> CliResult<Vec<String>> {
        Ok(self.load_all()?.into_keys().collect())
    }

    /// Write `profile`, splitting secrets into the credentials file
    ///
    /// # Errors
    ///
    /// I/O and YAML errors.
    pub fn save(&self, profile: &Profile) -> CliResult<()> {
        let (mut config, mut credentials) = self.read_files()?;
        let (secrets, plain): (Settings, Settings) = profile
            .settings
            .clone()
            .into_iter()
            .partition(|(k, _)| SECRET_KEYS.contains(&k.as_str()));

        config.insert(profile.name.clone(), plain);
        if secrets.is_empty() {
            credentials.remove(&profile.name);
        } else {
            credentials.insert(profile.name.clone(), secrets);
        }
        self.write_files(&config, &credentials)?;
        debug!(profile = %profile.name, "saved profile");
        Ok(())
    }

    /// Delete the profile called `name`
    ///
    /// # Errors
    ///
    /// [`CliError::ProfileNotFound`] when neither file has it; I/O and YAML errors.
    pub fn remove(&self, name: &str) -> CliResult<()> {
        let name = name.to_lowercase();
        let (mut config, mut credentials) = self.read_files()?;
        let found = config.remove(&name).is_some() | credentials.remove(&name).is_some();
        if !found {
            return Err(CliError::ProfileNotFound(name));
        }
        self.write_files(&config, &credentials)?;
        debug!(profile = %name, "removed profile");
        Ok(())
    }

    /// Token lifecycle manager for an OAuth profile, backed by the shared cache file
    ///
    /// # Errors
    ///
    /// Configuration errors, a corrupt cache file.
    pub fn manager(&self, profile: &Profile, print_url: bool) -> CliResult<TokenLifecycleManager> {
        let oauth = OAuthClient::new(profile.base_url()?, profile.oauth_config()?)?;
        let cache = TokenCache::load(self.cache_path())?;
        let manager = TokenLifecycleManager::new(profile.name.clone(), oauth, cache);
        Ok(if print_url {
            manager.with_browser(PrintUrl)
        } else {
            manager.with_browser(SystemBrowser)
        })
    }

    /// REST client authenticated the way `profile` says
    ///
    /// # Errors
    ///
    /// Missing base URL or API token, OAuth configuration errors.
    pub fn connect(&self, profile: &Profile, verbose: bool) -> CliResult<OktaClient> {
        let base_url = profile.base_url()?;
        let credentials = match profile.api_mode()? {
            ApiMode::Token => {
                let token = profile.get("api_token").ok_or_else(|| {
                    CliError::InvalidArguments(format!(
                        "profile '{}' has no api_token",
                        profile.name
                    ))
                })?;
                Credentials::ApiToken(SecretString::new(token.to_string()))
            }
            ApiMode::OAuth => Credentials::OAuth(Arc::new(self.manager(profile, false)?)),
        };
        Ok(OktaClient::new(base_url, credentials)?.verbose(verbose))
    }

    fn read_files(&self) -> CliResult<(ProfileMap, ProfileMap)> {
        Ok((
            read_yaml(&self.config_path())?,
            read_yaml(&self.credentials_path())?,
        ))
    }

    fn write_files(&self, config: &ProfileMap, credentials: &ProfileMap) -> CliResult<()> {
        std::fs::create_dir_all(&self.dir)?;
        std::fs::write(self.config_path(), serde_yaml::to_string(config)?)?;

        let credentials_path = self.credentials_path();
        std::fs::write(&credentials_path, serde_yaml::to_string(credentials)?)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&credentials_path, std::fs::Permissions::from_mode(0o600))?;
        }
        Ok(())
    }
}

fn read_yaml(path: &Path) -> CliResult<ProfileMap> {
    match std::fs::read_to_string(path) {
        Ok(text) if text.trim().is_empty() => Ok(ProfileMap::new()),
        Ok(text) => Ok(serde_yaml::from_str::<Option<ProfileMap>>(&text)?.unwrap_or_default()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ProfileMap::new()),
        Err(e) => Err(e.into()),
    }
}

fn path_str(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
