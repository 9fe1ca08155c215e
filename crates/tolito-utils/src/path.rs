//! Expansion of `$VAR`, `${VAR}` and a leading `~` in configured paths.

use std::{env, path::PathBuf};

use nix::unistd::{Uid, User};

use crate::error::{PathError, PathResult};

/// `$HOME`, falling back to the passwd entry of the current user.
pub fn home_dir() -> PathBuf {
    if let Some(home) = env::var_os("HOME") {
        return PathBuf::from(home);
    }

    User::from_uid(Uid::current())
        .ok()
        .flatten()
        .map(|user| user.dir)
        .unwrap_or_else(|| PathBuf::from("/"))
}

/// `$XDG_CONFIG_HOME`, defaulting to `~/.config`.
pub fn xdg_config_home() -> PathBuf {
    env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| home_dir().join(".config"))
}

/// `$XDG_CACHE_HOME`, defaulting to `~/.cache`.
pub fn xdg_cache_home() -> PathBuf {
    env::var_os("XDG_CACHE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| home_dir().join(".cache"))
}

fn system_var(name: &str) -> Option<String> {
    let path = match name {
        "HOME" => home_dir(),
        "XDG_CONFIG_HOME" => xdg_config_home(),
        "XDG_CACHE_HOME" => xdg_cache_home(),
        "USER" => {
            return env::var("USER").ok().or_else(|| {
                User::from_uid(Uid::current())
                    .ok()
                    .flatten()
                    .map(|user| user.name)
            });
        }
        _ => return env::var(name).ok(),
    };
    Some(path.to_string_lossy().into_owned())
}

/// Expands variables in `input`, resolving names through `lookup`.
///
/// `~` is only expanded as the whole input or before the first `/`. A `$` not followed by a
/// name is kept literally.
pub fn expand_vars_with<F>(input: &str, lookup: F) -> PathResult<String>
where
    F: Fn(&str) -> Option<String>,
{
    let resolve = |name: &str| {
        lookup(name).ok_or_else(|| PathError::UnsetVariable {
            var: name.to_string(),
            input: input.to_string(),
        })
    };

    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    if let Some(tail) = rest.strip_prefix('~') {
        if tail.is_empty() || tail.starts_with('/') {
            out.push_str(&resolve("HOME")?);
            rest = tail;
        }
    }

    while let Some(pos) = rest.find('$') {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];

        let (name, remainder) = match after.strip_prefix('{') {
            Some(braced) => {
                let end = braced
                    .find('}')
                    .ok_or_else(|| PathError::UnterminatedVariable {
                        input: input.to_string(),
                    })?;
                (&braced[..end], &braced[end + 1..])
            }
            None => {
                let end = after
                    .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                    .unwrap_or(after.len());
                (&after[..end], &after[end..])
            }
        };

        if name.is_empty() {
            out.push('$');
            rest = after;
        } else {
            out.push_str(&resolve(name)?);
            rest = remainder;
        }
    }
    out.push_str(rest);

    Ok(out)
}

/// Expands variables against the process environment.
pub fn expand_vars(input: &str) -> PathResult<String> {
    expand_vars_with(input, system_var)
}

/// Expands `path` and anchors relative results at the working directory.
pub fn resolve_path(path: &str) -> PathResult<PathBuf> {
    let path = path.trim();
    if path.is_empty() {
        return Err(PathError::Empty);
    }

    let expanded = PathBuf::from(expand_vars(path)?);
    if expanded.is_absolute() {
        return Ok(expanded);
    }

    env::current_dir()
        .map(|cwd| cwd.join(expanded))
        .map_err(PathError::WorkingDir)
}
