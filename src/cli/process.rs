use std::{env, path::Path, process::Stdio};

use anyhow::Result;
use sysinfo::{get_current_pid, Process, Signal, System};

/// Terminates every other process running the same executable. Used by `up` before spawning a
/// fresh daemon and by `down` on its own. Returns how many processes were stopped.
pub fn kill_previous_daemons(name: &Path) -> usize {
    let system = System::new_all();
    let current_id = get_current_pid().unwrap();
    let mut killed = 0;
    for process in system.processes().values() {
        if process.pid() == current_id || process.parent() == Some(current_id) {
            continue;
        }
        if !runs_executable(process, name) {
            continue;
        }

        // Windows has no Term equivalent, so the fallback kill is forceful there.
        if process.kill_with(Signal::Term).is_none() {
            process.kill();
        }
        process.wait();
        killed += 1;
    }
    killed
}

fn runs_executable(process: &Process, name: &Path) -> bool {
    process.exe().is_some_and(|exe| exe.exists() && exe == name)
}

/// Replaces any running daemon with a freshly spawned one. Currently for simplicity sake it
/// operates using a detached process running `serve`.
pub fn restart_daemon(database_url: Option<&str>) -> Result<()> {
    // Whatever executable is running right now also serves as the daemon binary.
    let exe = env::current_exe().expect("Can't operate without an executable");
    kill_previous_daemons(&exe);

    let mut command = std::process::Command::new(exe);
    command.arg("serve");
    if let Some(url) = database_url {
        command.args(["--database-url", url]);
    }

    #[cfg(windows)]
    {
        use std::os::windows::process::CommandExt;
        // DETACHED_PROCESS, so the daemon survives the console closing.
        command.creation_flags(0x0000_0008);
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        command.process_group(0);
        command.stdin(Stdio::null());
        command.stdout(Stdio::null());
    }

    println!("Spawning the daemon");
    #[allow(clippy::zombie_processes)]
    let _ = command.spawn()?;
    println!("Daemon is up");
    Ok(())
}
