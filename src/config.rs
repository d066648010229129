// xiqctl - bulk VLAN / user profile tool for ExtremeCloud IQ
// Copyright (C) 2024 Mathias Uhl <mathiasuhl@gmx.de>
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use crate::workflow::ProtectLists;
use anyhow::{Context, Result};
use dirs::config_dir;
use serde::{Deserialize, Serialize};
use std::{
    env, fs,
    path::{Path, PathBuf},
};
use thiserror::Error;

pub const DEFAULT_BASE_URL: &str = "https://api.extremecloudiq.com";

/// Platform default VLAN profiles.
pub const DEFAULT_VLAN_PROTECT: [u64; 2] = [40000, 40001];

/// Platform default user profiles.
pub const DEFAULT_USER_PROFILE_PROTECT: [u64; 2] = [36000, 36001];

pub const USERNAME_ENV: &str = "XIQ_USERNAME";
pub const PASSWORD_ENV: &str = "XIQ_PASSWORD";
pub const CONFIG_DIR_ENV: &str = "XIQCTL_CONFIG_DIR";

#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vlan_protect: Option<Vec<u64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_profile_protect: Option<Vec<u64>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Local,
    User,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not locate a writable config directory for the current user")]
    MissingConfigDir,
}

/// Values a run actually uses. Credentials may still be missing here; the
/// caller prompts for them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectiveConfig {
    pub base_url: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub protect: ProtectLists,
}

#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub base_url: Option<String>,
    pub username: Option<String>,
}

pub fn config_path(scope: Scope, cwd: &Path) -> Result<PathBuf> {
    match scope {
        Scope::Local => Ok(cwd.join(".xiqctl.yaml")),
        Scope::User => {
            if let Ok(custom) = env::var(CONFIG_DIR_ENV) {
                return Ok(PathBuf::from(custom).join("config.yaml"));
            }
            let base = config_dir().ok_or(ConfigError::MissingConfigDir)?;
            Ok(base.join("xiqctl").join("config.yaml"))
        }
    }
}

pub fn load(cwd: &Path) -> Result<Config> {
    let user = read_if_exists(&config_path(Scope::User, cwd)?)?.unwrap_or_default();
    let local = read_if_exists(&config_path(Scope::Local, cwd)?)?.unwrap_or_default();
    Ok(merge(user, local))
}

pub fn load_scope(scope: Scope, cwd: &Path) -> Result<Config> {
    Ok(read_if_exists(&config_path(scope, cwd)?)?.unwrap_or_default())
}

pub fn save(scope: Scope, config: &Config, cwd: &Path) -> Result<PathBuf> {
    let path = config_path(scope, cwd)?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("creating {:?}", parent))?;
    }
    let serialized = serde_yaml::to_string(config).context("serializing config")?;
    fs::write(&path, serialized).with_context(|| format!("writing {:?}", path))?;
    Ok(path)
}

/// Flags beat environment, environment beats files, local file beats user file.
pub fn resolve(cwd: &Path, overrides: Overrides) -> Result<EffectiveConfig> {
    let merged = load(cwd)?;

    let base_url = overrides
        .base_url
        .or(merged.base_url)
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

    let username = overrides
        .username
        .or_else(|| non_empty_env(USERNAME_ENV))
        .or(merged.username)
        .map(|u| u.trim().to_string());

    let password = non_empty_env(PASSWORD_ENV).or(merged.password);

    let protect = ProtectLists::new(
        merged
            .vlan_protect
            .unwrap_or_else(|| DEFAULT_VLAN_PROTECT.to_vec()),
        merged
            .user_profile_protect
            .unwrap_or_else(|| DEFAULT_USER_PROFILE_PROTECT.to_vec()),
    );

    Ok(EffectiveConfig {
        base_url,
        username,
        password,
        protect,
    })
}

fn non_empty_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn read_if_exists(path: &Path) -> Result<Option<Config>> {
    if !path.exists() {
        return Ok(None);
    }

    let contents = fs::read_to_string(path).with_context(|| format!("reading {:?}", path))?;
    let config = serde_yaml::from_str(&contents).with_context(|| format!("parsing {:?}", path))?;
    Ok(Some(config))
}

fn merge(user: Config, local: Config) -> Config {
    Config {
        base_url: local.base_url.or(user.base_url),
        username: local.username.or(user.username),
        password: local.password.or(user.password),
        vlan_protect: local.vlan_protect.or(user.vlan_protect),
        user_profile_protect: local.user_profile_protect.or(user.user_profile_protect),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Mutex, MutexGuard, OnceLock};
    use tempfile::{TempDir, tempdir};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn isolated() -> (MutexGuard<'static, ()>, TempDir) {
        let guard = ENV_LOCK
            .get_or_init(|| Mutex::new(()))
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let cwd = tempdir().unwrap();
        unsafe {
            env::set_var(CONFIG_DIR_ENV, cwd.path().join("config"));
            env::remove_var(USERNAME_ENV);
            env::remove_var(PASSWORD_ENV);
        }
        fs::create_dir_all(cwd.path().join("config")).unwrap();
        (guard, cwd)
    }

    #[test]
    fn defaults_without_any_file() {
        let (_guard, cwd) = isolated();

        let effective = resolve(cwd.path(), Overrides::default()).unwrap();
        assert_eq!(effective.base_url, DEFAULT_BASE_URL);
        assert_eq!(effective.username, None);
        assert_eq!(effective.password, None);
        assert_eq!(
            effective.protect,
            ProtectLists::new([40000, 40001], [36000, 36001])
        );
    }

    #[test]
    fn merges_user_and_local_and_overrides() {
        let (_guard, cwd) = isolated();

        let user_cfg = Config {
            base_url: Some("https://user.example.test".into()),
            username: Some("user@example.test".into()),
            password: Some("user-pass".into()),
            vlan_protect: Some(vec![1, 2]),
            user_profile_protect: None,
        };
        save(Scope::User, &user_cfg, cwd.path()).unwrap();

        let local_cfg = Config {
            username: Some("local@example.test".into()),
            vlan_protect: Some(vec![40000, 40001, 40002]),
            ..Config::default()
        };
        save(Scope::Local, &local_cfg, cwd.path()).unwrap();

        let effective = resolve(cwd.path(), Overrides::default()).unwrap();
        assert_eq!(effective.base_url, "https://user.example.test");
        assert_eq!(effective.username.as_deref(), Some("local@example.test"));
        assert_eq!(effective.password.as_deref(), Some("user-pass"));
        assert_eq!(
            effective.protect.vlan_profiles.iter().copied().collect::<Vec<_>>(),
            vec![40000, 40001, 40002]
        );
        assert!(effective.protect.user_profiles.contains(&36000));

        let overridden = resolve(
            cwd.path(),
            Overrides {
                base_url: Some("https://flag.example.test".into()),
                username: Some("flag@example.test".into()),
            },
        )
        .unwrap();
        assert_eq!(overridden.base_url, "https://flag.example.test");
        assert_eq!(overridden.username.as_deref(), Some("flag@example.test"));
    }

    #[test]
    fn environment_beats_files() {
        let (_guard, cwd) = isolated();
        save(
            Scope::Local,
            &Config {
                username: Some("file@example.test".into()),
                password: Some("file-pass".into()),
                ..Config::default()
            },
            cwd.path(),
        )
        .unwrap();
        unsafe {
            env::set_var(USERNAME_ENV, "env@example.test");
            env::set_var(PASSWORD_ENV, "env-pass");
        }

        let effective = resolve(cwd.path(), Overrides::default()).unwrap();
        unsafe {
            env::remove_var(USERNAME_ENV);
            env::remove_var(PASSWORD_ENV);
        }

        assert_eq!(effective.username.as_deref(), Some("env@example.test"));
        assert_eq!(effective.password.as_deref(), Some("env-pass"));
    }

    #[test]
    fn rejects_malformed_file() {
        let (_guard, cwd) = isolated();
        fs::write(cwd.path().join(".xiqctl.yaml"), "vlan_protect: [not-a-number").unwrap();

        let err = resolve(cwd.path(), Overrides::default()).unwrap_err();
        assert!(format!("{err:#}").contains("parsing"));
    }
}
