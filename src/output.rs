//! # Output Configuration
//!
//! Utilities for controlling CLI output appearance, including color and
//! emoji support based on terminal capabilities and user preferences.
//!
//! The module respects the following environment variables and flags:
//! - `--color=never|always|auto` - CLI flag for color control
//! - `NO_COLOR` - Disables colors when set (per https://no-color.org/)
//! - `CLICOLOR=0` - Disables colors
//! - `CLICOLOR_FORCE=1` - Forces colors even in non-TTY
//! - `TERM=dumb` - Disables colors for dumb terminals
//!
//! ```rust,ignore
//! use operator_repo::output::{severity_label, OutputConfig};
//!
//! let config = OutputConfig::from_env_and_flag("auto");
//! println!("{} check_upgrade(Operator(hello)): Success", severity_label(&config, Severity::Success));
//! ```

use std::env;

use console::style;

use crate::checks::Severity;

/// Output configuration for controlling colors and emojis.
#[derive(Debug, Clone)]
pub struct OutputConfig {
    /// Whether colors and emojis should be used in output.
    pub use_color: bool,
}

impl OutputConfig {
    /// Create an output configuration from environment and CLI flag.
    ///
    /// `color_flag` is the value of `--color`: "always" forces colors on
    /// (overriding `NO_COLOR`), "never" forces them off, anything else
    /// detects support from the environment.
    pub fn from_env_and_flag(color_flag: &str) -> Self {
        let use_color = match color_flag.to_lowercase().as_str() {
            "always" => true,
            "never" => false,
            _ => Self::detect_color_support(),
        };

        Self { use_color }
    }

    fn detect_color_support() -> bool {
        // The presence of NO_COLOR (even if empty) disables colors
        if env::var_os("NO_COLOR").is_some() {
            return false;
        }

        if env::var("CLICOLOR").is_ok_and(|v| v == "0") {
            return false;
        }

        if env::var("CLICOLOR_FORCE").is_ok_and(|v| v != "0" && !v.is_empty()) {
            return true;
        }

        if env::var("TERM").is_ok_and(|v| v == "dumb") {
            return false;
        }

        console::Term::stdout().features().colors_supported()
    }

    /// Create a configuration with colors always enabled.
    #[cfg(test)]
    pub fn with_color() -> Self {
        Self { use_color: true }
    }

    /// Create a configuration with colors always disabled.
    #[cfg(test)]
    pub fn without_color() -> Self {
        Self { use_color: false }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self::from_env_and_flag("auto")
    }
}

/// Returns the emoji when colors are enabled, the plain text otherwise.
pub fn emoji<'a>(config: &OutputConfig, emoji_str: &'a str, plain: &'a str) -> &'a str {
    if config.use_color {
        emoji_str
    } else {
        plain
    }
}

/// Label printed in front of a check result
///
/// Without colors this is the bare severity name, so piped output stays
/// stable.
pub fn severity_label(config: &OutputConfig, severity: Severity) -> String {
    if !config.use_color {
        return severity.to_string();
    }
    let (marker, styled) = match severity {
        Severity::Success => ("\u{2705}", style(severity.as_str()).green()),
        Severity::Warning => ("\u{26a0}\u{fe0f}", style(severity.as_str()).yellow()),
        Severity::Error => ("\u{274c}", style(severity.as_str()).red().bold()),
    };
    format!("{} {}", emoji(config, marker, ""), styled.force_styling(true))
}
