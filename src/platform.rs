// tagshelf platform paths
//
//            config                                   data
// Linux:     $XDG_CONFIG_HOME/tagshelf                $XDG_DATA_HOME/tagshelf
// macOS:     ~/Library/Application Support/tagshelf   (same)
// Windows:   %APPDATA%\tagshelf                       (same)
//
// `TAGSHELF_DATA_DIR` overrides the data directory on every platform.

use std::env;
use std::path::PathBuf;

const APP_DIR: &str = "tagshelf";

fn home_dir() -> PathBuf {
    PathBuf::from(env::var("HOME").unwrap_or_else(|_| String::from("/tmp")))
}

/// Resolves `$var/tagshelf`, or `fallback/tagshelf` when the variable is unset or empty.
fn dir_from_env(var: &str, fallback: PathBuf) -> PathBuf {
    env::var(var)
        .ok()
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .unwrap_or(fallback)
        .join(APP_DIR)
}

/// Returns the directory holding `settings.json`.
pub fn get_config_dir() -> PathBuf {
    if cfg!(target_os = "windows") {
        dir_from_env("APPDATA", PathBuf::from("C:\\Users\\Default\\AppData\\Roaming"))
    } else if cfg!(target_os = "macos") {
        home_dir().join("Library").join("Application Support").join(APP_DIR)
    } else {
        dir_from_env("XDG_CONFIG_HOME", home_dir().join(".config"))
    }
}

/// Returns the directory for the SQLite database and other local data.
pub fn get_data_dir() -> PathBuf {
    if let Some(dir) = env::var("TAGSHELF_DATA_DIR").ok().filter(|d| !d.is_empty()) {
        return PathBuf::from(dir);
    }
    if cfg!(target_os = "linux") {
        dir_from_env("XDG_DATA_HOME", home_dir().join(".local").join("share"))
    } else {
        get_config_dir()
    }
}
