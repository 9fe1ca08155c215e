use std::{cmp::Ordering, process::Command};

use tracing::trace;

use super::{process::run_captured, VersionCompare};

/// pacman's `vercmp`, falling back to plain string order when it cannot be run.
pub struct SystemVersionCompare;

/// Plain string ordering, used when `vercmp` is unavailable.
pub fn lexical_compare(a: &str, b: &str) -> Ordering {
    a.cmp(b)
}

fn parse_vercmp(stdout: &str) -> Option<Ordering> {
    let value: i32 = stdout.trim().parse().ok()?;
    Some(value.cmp(&0))
}

impl VersionCompare for SystemVersionCompare {
    fn compare(&self, a: &str, b: &str) -> Ordering {
        if a == b {
            return Ordering::Equal;
        }

        let mut cmd = Command::new("vercmp");
        cmd.args([a, b]).current_dir("/");
        run_captured(&mut cmd)
            .filter(|out| out.status.success())
            .and_then(|out| parse_vercmp(&String::from_utf8_lossy(&out.stdout)))
            .unwrap_or_else(|| {
                trace!("vercmp unavailable, comparing {a} and {b} lexically");
                lexical_compare(a, b)
            })
    }
}
