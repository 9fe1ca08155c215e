use std::{path::Path, process::Command};

use super::{
    process::{run_captured, run_interactive},
    PackageManager,
};

/// `pacman`, escalated with `sudo` for transactions.
pub struct SystemPackageManager;

fn pacman_query(args: &[&str]) -> Option<String> {
    let mut cmd = Command::new("pacman");
    cmd.args(args).current_dir("/");
    let out = run_captured(&mut cmd)?;
    out.status
        .success()
        .then(|| String::from_utf8_lossy(&out.stdout).into_owned())
}

/// Version column of a `pacman -Q <name>` line.
fn parse_query_version(line: &str) -> Option<String> {
    line.split_whitespace().nth(1).map(str::to_string)
}

impl PackageManager for SystemPackageManager {
    fn query(&self, name: &str) -> bool {
        pacman_query(&["-Q", name]).is_some()
    }

    fn installed_version(&self, name: &str) -> Option<String> {
        pacman_query(&["-Q", name]).and_then(|out| parse_query_version(out.lines().next()?))
    }

    fn commit_install(&self, artifact: &Path) -> Option<i32> {
        let mut cmd = Command::new("sudo");
        cmd.args(["pacman", "-U"]).arg(artifact);
        if let Some(dir) = artifact.parent().filter(|p| !p.as_os_str().is_empty()) {
            cmd.current_dir(dir);
        }
        run_interactive(&mut cmd)
    }

    fn commit_removal(&self, name: &str) -> Option<i32> {
        let mut cmd = Command::new("sudo");
        cmd.args(["pacman", "-Rns", name]).current_dir("/");
        run_interactive(&mut cmd)
    }

    fn info(&self, name: &str) -> Option<String> {
        pacman_query(&["-Qi", name])
    }
}
