// Tabletkbd Config
// TOML configuration with defaults matching a stock keyd setup

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::device::{
    DeviceResolver, EvdevResolver, FixedResolver, LibinputResolver, TABLET_SWITCH_MARKER,
};
use crate::lock::{AnyLock, LockMode};
use crate::policy::{CommandReloader, DirFs, FailurePolicy, PolicyLayout, Toggler};

/// System-wide config location, consulted after the per-user one
pub const SYSTEM_CONFIG_PATH: &str = "/etc/tabletkbd/config.toml";

/// Errors that can occur when loading the config
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("TOML parse error: {0}")]
    TomlParse(String),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Root of the TOML document
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub policy: PolicyConfig,

    #[serde(default)]
    pub lock: LockConfig,

    #[serde(default)]
    pub device: DeviceConfig,

    #[serde(default)]
    pub reload: ReloadConfig,

    /// File the config was loaded from, if any
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

/// `[policy]` section
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct PolicyConfig {
    /// Directory holding the policy files
    pub dir: PathBuf,
    pub blocking_name: String,
    pub active_ext: String,
    pub inactive_ext: String,
    pub on_error: FailurePolicy,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        let layout = PolicyLayout::default();
        Self {
            dir: PathBuf::from("/etc/keyd"),
            blocking_name: layout.blocking_name,
            active_ext: layout.active_ext,
            inactive_ext: layout.inactive_ext,
            on_error: FailurePolicy::default(),
        }
    }
}

impl PolicyConfig {
    pub fn layout(&self) -> PolicyLayout {
        PolicyLayout {
            blocking_name: self.blocking_name.clone(),
            active_ext: self.active_ext.clone(),
            inactive_ext: self.inactive_ext.clone(),
        }
    }
}

/// `[lock]` section
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct LockConfig {
    pub mode: LockMode,
    /// Lock file name inside the policy directory
    pub file: String,
    pub max_attempts: u32,
    pub retry_delay_ms: u64,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            mode: LockMode::default(),
            file: "gimmeasec.lock".to_string(),
            max_attempts: 10,
            retry_delay_ms: 1000,
        }
    }
}

impl LockConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

/// How the switch device is located
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceSource {
    /// Parse `libinput list-devices`
    #[default]
    Libinput,
    /// Enumerate `/dev/input` for the SW_TABLET_MODE capability
    Evdev,
}

/// `[device]` section
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct DeviceConfig {
    pub source: DeviceSource,
    /// Label substring identifying the switch in the inventory
    pub marker: String,
    /// Skip resolution and use this device node
    pub path: Option<PathBuf>,
    pub inventory_command: Vec<String>,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            source: DeviceSource::default(),
            marker: TABLET_SWITCH_MARKER.to_string(),
            path: None,
            inventory_command: vec!["libinput".to_string(), "list-devices".to_string()],
        }
    }
}

/// `[reload]` section
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ReloadConfig {
    pub command: Vec<String>,
    /// Treat a non-zero exit of the reload command as a failed transition
    pub check_status: bool,
}

impl Default for ReloadConfig {
    fn default() -> Self {
        Self {
            command: vec!["keyd".to_string(), "reload".to_string()],
            check_status: true,
        }
    }
}

impl Config {
    /// Load and validate a config file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml(&content)?;
        config.source_path = Some(path.to_path_buf());
        Ok(config)
    }

    /// Parse and validate a TOML string
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config =
            toml::from_str(content).map_err(|e| ConfigError::TomlParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Per-user config path (~/.config/tabletkbd/config.toml)
    pub fn user_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("tabletkbd").join("config.toml"))
    }

    /// Load from the first existing default location, or built-in defaults
    pub fn load_default() -> Result<Self, ConfigError> {
        let candidates = Self::user_path()
            .into_iter()
            .chain(std::iter::once(PathBuf::from(SYSTEM_CONFIG_PATH)));

        for path in candidates {
            if path.exists() {
                return Self::from_file(path);
            }
        }
        Ok(Self::default())
    }

    /// Load `path` if given, otherwise search the default locations
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None => Self::load_default(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let policy = &self.policy;

        if policy.blocking_name.is_empty() {
            return Err(ConfigError::Invalid("policy.blocking_name is empty".to_string()));
        }
        if policy.active_ext.is_empty() || policy.inactive_ext.is_empty() {
            return Err(ConfigError::Invalid("policy extensions must not be empty".to_string()));
        }
        if policy.active_ext == policy.inactive_ext {
            return Err(ConfigError::Invalid(format!(
                "policy.active_ext and policy.inactive_ext are both '{}'",
                policy.active_ext
            )));
        }
        if self.lock.file.is_empty() || self.lock.file.contains('/') {
            return Err(ConfigError::Invalid(format!(
                "lock.file must be a bare file name, got '{}'",
                self.lock.file
            )));
        }
        for ext in [&policy.active_ext, &policy.inactive_ext] {
            if self.lock.file.ends_with(&format!(".{}", ext)) {
                return Err(ConfigError::Invalid(format!(
                    "lock.file '{}' would be treated as a keymap",
                    self.lock.file
                )));
            }
        }
        if self.device.source == DeviceSource::Libinput && self.device.inventory_command.is_empty() {
            return Err(ConfigError::Invalid("device.inventory_command is empty".to_string()));
        }
        if self.device.marker.is_empty() {
            return Err(ConfigError::Invalid("device.marker is empty".to_string()));
        }
        if self.reload.command.is_empty() {
            return Err(ConfigError::Invalid("reload.command is empty".to_string()));
        }
        Ok(())
    }
}

impl Config {
    /// Toggler over the configured policy directory
    pub fn build_toggler(&self) -> Toggler<DirFs, CommandReloader> {
        let reloader = CommandReloader::new(self.reload.command.clone())
            .with_check_status(self.reload.check_status);
        Toggler::new(DirFs::new(&self.policy.dir), reloader, self.policy.layout())
            .with_failure_policy(self.policy.on_error)
    }

    /// Lock of the configured mode, living in the policy directory
    pub fn build_lock(&self) -> AnyLock<DirFs> {
        AnyLock::new(
            self.lock.mode,
            DirFs::new(&self.policy.dir),
            &self.policy.dir,
            &self.lock.file,
            self.lock.max_attempts,
            self.lock.retry_delay(),
        )
    }

    /// Resolver for the configured source; an explicit path wins
    pub fn build_resolver(&self) -> Box<dyn DeviceResolver> {
        if let Some(path) = &self.device.path {
            return Box::new(FixedResolver(path.clone()));
        }
        match self.device.source {
            DeviceSource::Libinput => Box::new(LibinputResolver::new(
                self.device.inventory_command.clone(),
                self.device.marker.clone(),
            )),
            DeviceSource::Evdev => Box::new(EvdevResolver),
        }
    }
}

/// Annotated config matching the built-in defaults
pub fn default_config_content() -> &'static str {
    r#"# Tabletkbd Config
# Place this file at: /etc/tabletkbd/config.toml

[policy]
# Directory the policy engine loads *.conf files from
dir = "/etc/keyd"
# Keyboard-blocking policy base name (off.conf = blocked, off.nope = parked)
blocking_name = "off"
active_ext = "conf"
inactive_ext = "nope"
# "abort" stops at the first failed rename; "continue" attempts them all
on_error = "abort"

[lock]
# "sentinel" (file presence) or "exclusive" (flock)
mode = "sentinel"
file = "gimmeasec.lock"
max_attempts = 10
retry_delay_ms = 1000

[device]
# "libinput" or "evdev"
source = "libinput"
marker = "Tablet Mode Switch"
# path = "/dev/input/event7"
inventory_command = ["libinput", "list-devices"]

[reload]
command = ["keyd", "reload"]
check_status = true
"#
}
