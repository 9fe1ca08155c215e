use std::{path::Path, process::Command};

use tracing::warn;

use super::{
    process::{run_captured, run_tee, which},
    BuildOutput, PackageBuilder,
};

/// `makepkg` on `PATH`.
pub struct SystemBuilder;

impl PackageBuilder for SystemBuilder {
    fn is_available(&self) -> bool {
        which("makepkg")
    }

    fn build(&self, cwd: &Path) -> BuildOutput {
        let mut cmd = Command::new("makepkg");
        cmd.args(["-s", "--noconfirm"]).current_dir(cwd);

        match run_tee(&mut cmd) {
            Ok((code, output)) => {
                BuildOutput {
                    success: code == Some(0),
                    code,
                    output,
                }
            }
            Err(err) => {
                warn!("Failed to run makepkg: {err}");
                BuildOutput::default()
            }
        }
    }

    fn print_srcinfo(&self, cwd: &Path) -> Option<String> {
        let mut cmd = Command::new("makepkg");
        cmd.arg("--printsrcinfo").current_dir(cwd);
        let out = run_captured(&mut cmd)?;
        out.status
            .success()
            .then(|| String::from_utf8_lossy(&out.stdout).into_owned())
    }
}
