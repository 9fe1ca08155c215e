/// Runs `f` with the given variables set (`Some`) or unset (`None`), restoring them afterwards.
///
/// Callers mutate process-wide state, so tests using this must be `#[serial]`.
pub fn with_env<F>(vars: &[(&str, Option<&str>)], f: F)
where
    F: FnOnce(),
{
    let saved: Vec<_> = vars
        .iter()
        .map(|(key, _)| (*key, std::env::var(key).ok()))
        .collect();

    for (key, value) in vars {
        match value {
            Some(value) => std::env::set_var(key, value),
            None => std::env::remove_var(key),
        }
    }

    f();

    for (key, old_value) in saved {
        match old_value {
            Some(v) => std::env::set_var(key, v),
            None => std::env::remove_var(key),
        }
    }
}
