//! Operator configuration stored as YAML.
//!
//! # Storage layout
//!
//! ```text
//! ~/.chefsync/
//!   config.yaml   (mode 0600, written by `chefsync init`)
//! ```
//!
//! # API pattern
//!
//! Every function touching the filesystem has two forms:
//! - `fn_at(home: &Path, …)` — explicit home; used in tests with `TempDir`
//! - `fn(…)` — derives home from `dirs::home_dir()`, delegates to `_at`

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const DEFAULT_LOCKFILE: &str = "/tmp/restore_chef.lock";
pub const DEFAULT_IGNORE_FILE: &str = ".pd-ignore";
pub const DEFAULT_STANDARD_BRANCH: &str = "master";
pub const DEFAULT_ORIGIN_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_LOCK_WARNING_DELAY_SECS: u64 = 5;

// ---------------------------------------------------------------------------
// Config struct
// ---------------------------------------------------------------------------

/// Everything a sync run needs to know about its environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// URL of the configuration-management server.
    pub server_url: String,
    /// Acting user. Falls back to the OS user name when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_name: Option<String>,
    /// Directory holding vendored cookbooks. Its parent is the repository root.
    pub vendor_dir: PathBuf,
    /// Directory backing the server's cookbook, data bag, role and environment store.
    pub server_root: PathBuf,
    #[serde(default = "default_lockfile")]
    pub lockfile: PathBuf,
    /// Ignore-pattern file. Relative paths resolve against the repository root.
    #[serde(default = "default_ignore_file")]
    pub ignore_file: PathBuf,
    #[serde(default = "default_standard_branch")]
    pub standard_branch: String,
    #[serde(default = "default_origin_timeout_secs")]
    pub origin_timeout_secs: u64,
    #[serde(default = "default_lock_warning_delay_secs")]
    pub lock_warning_delay_secs: u64,
}

fn default_lockfile() -> PathBuf {
    PathBuf::from(DEFAULT_LOCKFILE)
}

fn default_ignore_file() -> PathBuf {
    PathBuf::from(DEFAULT_IGNORE_FILE)
}

fn default_standard_branch() -> String {
    DEFAULT_STANDARD_BRANCH.to_string()
}

fn default_origin_timeout_secs() -> u64 {
    DEFAULT_ORIGIN_TIMEOUT_SECS
}

fn default_lock_warning_delay_secs() -> u64 {
    DEFAULT_LOCK_WARNING_DELAY_SECS
}

impl SyncConfig {
    /// Build a config with defaults for everything but the three required locations.
    pub fn new(server_url: impl Into<String>, vendor_dir: PathBuf, server_root: PathBuf) -> Self {
        Self {
            server_url: server_url.into(),
            node_name: None,
            vendor_dir,
            server_root,
            lockfile: default_lockfile(),
            ignore_file: default_ignore_file(),
            standard_branch: default_standard_branch(),
            origin_timeout_secs: DEFAULT_ORIGIN_TIMEOUT_SECS,
            lock_warning_delay_secs: DEFAULT_LOCK_WARNING_DELAY_SECS,
        }
    }

    /// Host part of `server_url`.
    pub fn server_hostname(&self) -> Result<String, ConfigError> {
        host_of(&self.server_url).ok_or_else(|| ConfigError::InvalidServerUrl {
            url: self.server_url.clone(),
        })
    }

    /// The acting user: `node_name`, else the OS user, else `"unknown"`.
    pub fn user(&self) -> String {
        if let Some(name) = self.node_name.as_deref().map(str::trim) {
            if !name.is_empty() {
                return name.to_string();
            }
        }
        let os_user = whoami::username();
        if os_user.trim().is_empty() {
            "unknown".to_string()
        } else {
            os_user
        }
    }

    /// Repository root: the parent of the vendor directory.
    pub fn repo_dir(&self) -> PathBuf {
        self.vendor_dir
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn data_bag_dir(&self) -> PathBuf {
        self.repo_dir().join("data_bags")
    }

    pub fn role_dir(&self) -> PathBuf {
        self.repo_dir().join("roles")
    }

    pub fn environment_dir(&self) -> PathBuf {
        self.repo_dir().join("environments")
    }

    pub fn ignore_file_path(&self) -> PathBuf {
        if self.ignore_file.is_absolute() {
            self.ignore_file.clone()
        } else {
            self.repo_dir().join(&self.ignore_file)
        }
    }

    pub fn origin_timeout(&self) -> Duration {
        Duration::from_secs(self.origin_timeout_secs)
    }

    pub fn lock_warning_delay(&self) -> Duration {
        Duration::from_secs(self.lock_warning_delay_secs)
    }
}

/// Extract the host from a URL such as `https://chef01.example.com:443/organizations/ops`.
fn host_of(url: &str) -> Option<String> {
    let rest = url.split_once("://").map_or(url, |(_, rest)| rest);
    let authority = rest.split(['/', '?', '#']).next().unwrap_or_default();
    let host_port = authority.rsplit_once('@').map_or(authority, |(_, host)| host);
    let host = match host_port.strip_prefix('[') {
        // IPv6 literal: `[::1]:443`
        Some(bracketed) => bracketed.split_once(']').map_or("", |(addr, _)| addr),
        None => host_port.split(':').next().unwrap_or_default(),
    };
    if host.is_empty() {
        None
    } else {
        Some(host.to_string())
    }
}

// ---------------------------------------------------------------------------
// Paths
// ---------------------------------------------------------------------------

/// `<home>/.chefsync/config.yaml` — pure, no I/O.
pub fn config_path_at(home: &Path) -> PathBuf {
    home.join(".chefsync").join("config.yaml")
}

// ---------------------------------------------------------------------------
// Load
// ---------------------------------------------------------------------------

/// Load the config from `<home>/.chefsync/config.yaml`.
///
/// Returns `ConfigError::NotFound` if absent,
/// `ConfigError::Parse` (with path + line context) if malformed YAML.
pub fn load_at(home: &Path) -> Result<SyncConfig, ConfigError> {
    let path = config_path_at(home);
    if !path.exists() {
        return Err(ConfigError::NotFound { path });
    }
    let contents = std::fs::read_to_string(&path)?;
    serde_yaml::from_str(&contents).map_err(|e| ConfigError::Parse { path, source: e })
}

/// `load_at` convenience wrapper.
pub fn load() -> Result<SyncConfig, ConfigError> {
    load_at(&home()?)
}

// ---------------------------------------------------------------------------
// Save (atomic)
// ---------------------------------------------------------------------------

/// Atomically save the config.
///
/// Write flow: serialize → `config.yaml.tmp` sibling → `chmod 0600` → `rename`.
pub fn save_at(home: &Path, config: &SyncConfig) -> Result<PathBuf, ConfigError> {
    let path = config_path_at(home);
    if let Some(dir) = path.parent() {
        if !dir.exists() {
            std::fs::create_dir_all(dir)?;
            set_dir_permissions(dir)?;
        }
    }
    let tmp_path = path.with_file_name("config.yaml.tmp");

    let yaml = serde_yaml::to_string(config)?;
    std::fs::write(&tmp_path, yaml)?;
    set_file_permissions(&tmp_path)?;
    std::fs::rename(&tmp_path, &path)?;
    Ok(path)
}

/// `save_at` convenience wrapper.
pub fn save(config: &SyncConfig) -> Result<PathBuf, ConfigError> {
    save_at(&home()?, config)
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

fn home() -> Result<PathBuf, ConfigError> {
    dirs::home_dir().ok_or(ConfigError::HomeNotFound)
}

#[cfg(unix)]
fn set_dir_permissions(path: &Path) -> Result<(), ConfigError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700))?;
    Ok(())
}
#[cfg(not(unix))]
fn set_dir_permissions(_path: &Path) -> Result<(), ConfigError> {
    Ok(())
}

#[cfg(unix)]
fn set_file_permissions(path: &Path) -> Result<(), ConfigError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    Ok(())
}
#[cfg(not(unix))]
fn set_file_permissions(_path: &Path) -> Result<(), ConfigError> {
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tempfile::TempDir;

    fn sample() -> SyncConfig {
        SyncConfig::new(
            "https://chef01.example.com/organizations/ops",
            PathBuf::from("/repo/chef/vendor"),
            PathBuf::from("/srv/chef-server"),
        )
    }

    #[test]
    fn config_path_is_correct() {
        let home = TempDir::new().expect("tempdir");
        assert!(config_path_at(home.path()).ends_with(".chefsync/config.yaml"));
    }

    #[test]
    fn save_and_load_roundtrip() {
        let home = TempDir::new().expect("tempdir");
        let mut cfg = sample();
        cfg.node_name = Some("jenkins".to_string());
        save_at(home.path(), &cfg).expect("save");
        let loaded = load_at(home.path()).expect("load");
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn save_cleans_up_tmp_and_restricts_permissions() {
        let home = TempDir::new().expect("tempdir");
        let path = save_at(home.path(), &sample()).expect("save");
        assert!(!path.with_file_name("config.yaml.tmp").exists());
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&path).unwrap().permissions().mode() & 0o777;
            assert_eq!(mode, 0o600);
        }
    }

    #[test]
    fn load_missing_returns_not_found() {
        let home = TempDir::new().expect("tempdir");
        let err = load_at(home.path()).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound { .. }));
        assert!(err.to_string().contains("chefsync init"));
    }

    #[test]
    fn load_corrupt_yaml_reports_path() {
        let home = TempDir::new().expect("tempdir");
        let path = config_path_at(home.path());
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "- not: [a mapping").unwrap();
        let err = load_at(home.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }), "got: {err}");
        assert!(err.to_string().contains("config.yaml"));
    }

    #[test]
    fn minimal_yaml_fills_defaults() {
        let yaml = "server_url: https://chef.example.com\nvendor_dir: /repo/vendor\nserver_root: /srv\n";
        let cfg: SyncConfig = serde_yaml::from_str(yaml).expect("parse");
        assert_eq!(cfg.lockfile, PathBuf::from(DEFAULT_LOCKFILE));
        assert_eq!(cfg.standard_branch, "master");
        assert_eq!(cfg.origin_timeout(), Duration::from_secs(5));
        assert_eq!(cfg.lock_warning_delay(), Duration::from_secs(5));
        assert!(cfg.node_name.is_none());
    }

    #[rstest]
    #[case("https://chef01.example.com/organizations/ops", Some("chef01.example.com"))]
    #[case("https://chef01.example.com:8443", Some("chef01.example.com"))]
    #[case("http://admin@ci02:80/", Some("ci02"))]
    #[case("chef02.internal", Some("chef02.internal"))]
    #[case("https://[::1]:443/organizations/ops", Some("::1"))]
    #[case("https://[fe80::2]", Some("fe80::2"))]
    #[case("https://[::1", None)]
    #[case("https:///nohost", None)]
    fn host_extraction(#[case] url: &str, #[case] expected: Option<&str>) {
        assert_eq!(host_of(url).as_deref(), expected);
    }

    #[test]
    fn repository_directories_hang_off_vendor_parent() {
        let cfg = sample();
        assert_eq!(cfg.repo_dir(), PathBuf::from("/repo/chef"));
        assert_eq!(cfg.data_bag_dir(), PathBuf::from("/repo/chef/data_bags"));
        assert_eq!(cfg.role_dir(), PathBuf::from("/repo/chef/roles"));
        assert_eq!(cfg.environment_dir(), PathBuf::from("/repo/chef/environments"));
        assert_eq!(cfg.ignore_file_path(), PathBuf::from("/repo/chef/.pd-ignore"));
    }

    #[test]
    fn user_prefers_node_name() {
        let mut cfg = sample();
        cfg.node_name = Some("  MyManJenkins ".to_string());
        assert_eq!(cfg.user(), "MyManJenkins");
        cfg.node_name = Some("   ".to_string());
        assert!(!cfg.user().is_empty());
    }

    #[test]
    fn invalid_server_url_is_reported() {
        let mut cfg = sample();
        cfg.server_url = "https://".to_string();
        assert!(matches!(
            cfg.server_hostname(),
            Err(ConfigError::InvalidServerUrl { .. })
        ));
    }
}
