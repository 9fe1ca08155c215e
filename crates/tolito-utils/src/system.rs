/// Returns the machine architecture as pacman spells it in `$arch`.
///
/// Rust reports `x86` for 32-bit Intel, which Arch-family mirrors publish as `i686`.
pub fn arch() -> &'static str {
    match std::env::consts::ARCH {
        "x86" => "i686",
        other => other,
    }
}
