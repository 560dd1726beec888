use std::path::PathBuf;

use crate::constants::{CONFIG_FILE_NAME, SHORTCUTS_FILE_NAME};

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("com", "pianogrid", "pianogrid")
}

pub fn config_root_dir() -> PathBuf {
    match project_dirs() {
        Some(dirs) => dirs.config_dir().to_path_buf(),
        None => PathBuf::from("./config"),
    }
}

pub fn config_path() -> PathBuf {
    config_root_dir().join(CONFIG_FILE_NAME)
}

pub fn shortcuts_path() -> PathBuf {
    config_root_dir().join(SHORTCUTS_FILE_NAME)
}
