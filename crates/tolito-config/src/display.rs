use documented::{Documented, DocumentedFields};
use serde::{Deserialize, Serialize};

/// Display settings for CLI output formatting
#[derive(Clone, Debug, Default, Deserialize, Serialize, Documented, DocumentedFields)]
pub struct DisplaySettings {
    /// Colorize log prefixes and prompts.
    /// Default: true
    pub color: Option<bool>,

    /// Draw download bars with pacman's "candy" characters instead of the plain bar.
    /// Default: false
    pub candy_bar: Option<bool>,

    /// Progress style: "bar" for live progress bars, "text" for periodic one-line reports
    /// (percentage, size, speed, ETA).
    /// Default: "bar"
    pub progress_style: Option<ProgressStyle>,

    /// Remove the transfer timeout on downloads (the connect timeout still applies).
    /// Default: false
    pub disable_timeout: Option<bool>,
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProgressStyle {
    #[default]
    Bar,
    Text,
}

impl DisplaySettings {
    pub fn color(&self) -> bool {
        self.color.unwrap_or(true)
    }

    pub fn candy_bar(&self) -> bool {
        self.candy_bar.unwrap_or(false)
    }

    pub fn progress_style(&self) -> ProgressStyle {
        self.progress_style.unwrap_or_default()
    }

    pub fn disable_timeout(&self) -> bool {
        self.disable_timeout.unwrap_or(false)
    }
}
