use std::env;
use std::fs;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "docchat";
/// Data dir used by debug builds, relative to the project root.
const DEV_DATA_DIR: &str = ".docchat";

/// Where the backend reads config and writes secrets and logs.
///
/// `project_root` holds the shipped `config.yml`; `user_data_dir` holds
/// `secrets.yaml`, an optional user `config.yml` and `logs/`.
#[derive(Debug, Clone)]
pub struct AppPaths {
    pub project_root: PathBuf,
    pub user_data_dir: PathBuf,
    pub log_dir: PathBuf,
    pub secrets_path: PathBuf,
}

impl AppPaths {
    /// Resolve from `DOCCHAT_ROOT` / `DOCCHAT_DATA_DIR`, falling back to the
    /// working directory and the platform data dir.
    pub fn new() -> Self {
        let (project_root, user_data_dir) = resolve_dirs(|key| env::var(key).ok());
        Self::from_dirs(project_root, user_data_dir)
    }

    pub fn from_dirs(project_root: PathBuf, user_data_dir: PathBuf) -> Self {
        let log_dir = user_data_dir.join("logs");
        if let Err(err) = fs::create_dir_all(&log_dir) {
            tracing::warn!("Failed to create {}: {}", log_dir.display(), err);
        }

        AppPaths {
            secrets_path: user_data_dir.join("secrets.yaml"),
            project_root,
            user_data_dir,
            log_dir,
        }
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}

fn resolve_dirs(lookup: impl Fn(&str) -> Option<String>) -> (PathBuf, PathBuf) {
    let project_root = lookup("DOCCHAT_ROOT")
        .filter(|v| !v.trim().is_empty())
        .map(PathBuf::from)
        .or_else(|| env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."));

    let user_data_dir = match lookup("DOCCHAT_DATA_DIR").filter(|v| !v.trim().is_empty()) {
        Some(dir) => PathBuf::from(dir),
        None if cfg!(debug_assertions) => project_root.join(DEV_DATA_DIR),
        None => platform_data_dir(&lookup).join(APP_DIR),
    };

    (project_root, user_data_dir)
}

fn platform_data_dir(lookup: &impl Fn(&str) -> Option<String>) -> PathBuf {
    let home = || {
        lookup("HOME")
            .or_else(|| lookup("USERPROFILE"))
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."))
    };

    if cfg!(target_os = "windows") {
        return lookup("LOCALAPPDATA")
            .or_else(|| lookup("APPDATA"))
            .map(PathBuf::from)
            .unwrap_or_else(home);
    }
    if cfg!(target_os = "macos") {
        return home().join(Path::new("Library/Application Support"));
    }
    lookup("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| home().join(".local/share"))
}
