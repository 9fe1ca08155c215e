//! Version extraction from `makepkg --printsrcinfo` output.

/// Full version (`[epoch:]pkgver-pkgrel`) declared in the `pkgbase` section.
///
/// Returns `None` if `pkgver` or `pkgrel` is missing.
pub fn version_from_srcinfo(srcinfo: &str) -> Option<String> {
    let mut pkgver = None;
    let mut pkgrel = None;
    let mut epoch = None;

    for line in srcinfo.lines() {
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let (key, value) = (key.trim(), value.trim());

        match key {
            // split packages repeat overrides per pkgname; the base section is authoritative
            "pkgname" => break,
            "pkgver" => pkgver = Some(value),
            "pkgrel" => pkgrel = Some(value),
            "epoch" => epoch = Some(value),
            _ => {}
        }
    }

    let version = format!("{}-{}", pkgver?, pkgrel?);
    Some(match epoch.filter(|e| !e.is_empty() && *e != "0") {
        Some(epoch) => format!("{epoch}:{version}"),
        None => version,
    })
}
