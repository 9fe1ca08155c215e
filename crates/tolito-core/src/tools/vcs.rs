use std::{path::Path, process::Command};

use super::{
    process::{run_captured, run_interactive, which},
    Vcs,
};

/// `git` on `PATH`.
pub struct SystemVcs;

impl SystemVcs {
    fn git_in(repo: &Path) -> Command {
        let mut cmd = Command::new("git");
        cmd.arg("-C").arg(repo).current_dir(repo);
        cmd
    }

    fn succeeds(cmd: &mut Command) -> bool {
        run_captured(cmd).is_some_and(|out| out.status.success())
    }
}

fn parent_or_self(path: &Path) -> &Path {
    path.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("/"))
}

impl Vcs for SystemVcs {
    fn is_available(&self) -> bool {
        which("git")
    }

    fn clone_repo(&self, url: &str, dest: &Path) -> bool {
        let mut cmd = Command::new("git");
        cmd.arg("clone")
            .arg(url)
            .arg(dest)
            .current_dir(parent_or_self(dest));
        run_interactive(&mut cmd) == Some(0)
    }

    fn clone_sparse(&self, url: &str, dest: &Path) -> bool {
        let mut cmd = Command::new("git");
        cmd.args(["clone", "--depth", "1", "--filter=blob:none", "--sparse"])
            .arg(url)
            .arg(dest)
            .current_dir(parent_or_self(dest));
        Self::succeeds(&mut cmd)
    }

    fn is_sparse_initialized(&self, repo: &Path) -> bool {
        run_captured(Self::git_in(repo).args(["config", "core.sparseCheckout"])).is_some_and(
            |out| out.status.success() && String::from_utf8_lossy(&out.stdout).trim() == "true",
        )
    }

    fn sparse_init(&self, repo: &Path) -> bool {
        Self::succeeds(Self::git_in(repo).args(["sparse-checkout", "init", "--cone"]))
    }

    fn sparse_set(&self, repo: &Path, path: &str) -> bool {
        Self::succeeds(Self::git_in(repo).args(["sparse-checkout", "set", path]))
    }

    fn clean(&self, repo: &Path) -> bool {
        Self::succeeds(Self::git_in(repo).args(["clean", "-fd"]))
    }

    fn remote_exists(&self, url: &str) -> bool {
        let mut cmd = Command::new("git");
        cmd.args(["ls-remote", "--exit-code", url])
            .env("GIT_TERMINAL_PROMPT", "0")
            .current_dir("/");
        Self::succeeds(&mut cmd)
    }
}
