//! Helpers for spawning external programs.

use std::{
    env,
    ffi::OsStr,
    io::{self, BufRead, BufReader, Read, Write},
    os::unix::fs::PermissionsExt,
    path::Path,
    process::{Command, Output, Stdio},
    thread,
};

use tracing::debug;

/// Program and arguments of `cmd`, space separated.
pub fn command_line(cmd: &Command) -> String {
    std::iter::once(cmd.get_program())
        .chain(cmd.get_args())
        .map(OsStr::to_string_lossy)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Whether an executable named `bin` is on `PATH`.
pub fn which(bin: &str) -> bool {
    let Some(paths) = env::var_os("PATH") else {
        return false;
    };
    env::split_paths(&paths).any(|dir| is_executable(&dir.join(bin)))
}

fn is_executable(path: &Path) -> bool {
    path.metadata()
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

/// Runs `cmd` with output captured. `None` if it could not be spawned.
pub fn run_captured(cmd: &mut Command) -> Option<Output> {
    debug!("{}", command_line(cmd));
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .map_err(|err| debug!("failed to spawn {:?}: {err}", cmd.get_program()))
        .ok()
}

/// Runs `cmd` attached to the terminal and returns its exit code.
pub fn run_interactive(cmd: &mut Command) -> Option<i32> {
    debug!("{}", command_line(cmd));
    cmd.stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .map_err(|err| debug!("failed to spawn {:?}: {err}", cmd.get_program()))
        .ok()
        .and_then(|status| status.code())
}

/// Runs `cmd`, echoing its output to the terminal while also collecting it.
///
/// Stdin stays attached so the program can still prompt (for example for a sudo password).
pub fn run_tee(cmd: &mut Command) -> io::Result<(Option<i32>, String)> {
    debug!("{}", command_line(cmd));
    let mut child = cmd
        .stdin(Stdio::inherit())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    let stderr = child.stderr.take();
    let stderr_thread = thread::spawn(move || {
        stderr
            .map(|pipe| tee(pipe, io::stderr()))
            .unwrap_or_default()
    });

    let mut collected = child
        .stdout
        .take()
        .map(|pipe| tee(pipe, io::stdout()))
        .unwrap_or_default();
    collected.push_str(&stderr_thread.join().unwrap_or_default());

    let status = child.wait()?;
    Ok((status.code(), collected))
}

fn tee<R: Read, W: Write>(source: R, mut sink: W) -> String {
    let mut reader = BufReader::new(source);
    let mut collected = String::new();
    let mut line = Vec::new();

    while let Ok(n) = reader.read_until(b'\n', &mut line) {
        if n == 0 {
            break;
        }
        let _ = sink.write_all(&line);
        collected.push_str(&String::from_utf8_lossy(&line));
        line.clear();
    }
    let _ = sink.flush();
    collected
}
