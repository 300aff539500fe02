use std::{env, io, path::PathBuf};

use anyhow::Result;

const APPLICATION_DIR: &str = "worktick";

/// Resolves (and creates if needed) the default application directory. On Windows it sits under
/// %APPDATA%, elsewhere under XDG_STATE_HOME with ~/.local/state as the fallback.
pub fn create_application_default_path() -> Result<PathBuf> {
    let mut path = state_root();
    path.push(APPLICATION_DIR);
    match std::fs::create_dir_all(&path) {
        Ok(()) => Ok(path),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(path),
        Err(e) => Err(e.into()),
    }
}

#[cfg(windows)]
fn state_root() -> PathBuf {
    PathBuf::from(env::var("APPDATA").expect("APPDATA should be present on Windows"))
}

#[cfg(not(windows))]
fn state_root() -> PathBuf {
    env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .or_else(|_| {
            env::var("HOME").map(|home| {
                let mut path = PathBuf::from(home);
                path.push(".local/state");
                path
            })
        })
        .expect("Couldn't find neither XDG_STATE_HOME nor HOME")
}
