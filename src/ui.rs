//! Terminal output helpers
//!
//! Status output goes to stderr so that `--dry-run` output on stdout can be
//! redirected into a file untouched.

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use parking_lot::Mutex;
use std::time::Duration;

/// RGB tuples for `colored`'s `.truecolor()`
pub mod rgb {
    pub const NEON_CYAN: (u8, u8, u8) = (128, 255, 234);
    pub const CORAL: (u8, u8, u8) = (255, 106, 193);
    pub const DIM_SEPARATOR: (u8, u8, u8) = (60, 60, 70);
}

/// Track quiet mode state
static QUIET_MODE: std::sync::LazyLock<Mutex<bool>> =
    std::sync::LazyLock::new(|| Mutex::new(false));

/// Enable or disable quiet mode
pub fn set_quiet_mode(enabled: bool) {
    *QUIET_MODE.lock() = enabled;
}

/// Check if quiet mode is enabled
pub fn is_quiet_mode() -> bool {
    *QUIET_MODE.lock()
}

pub fn create_spinner(message: &str) -> ProgressBar {
    if is_quiet_mode() {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
            .template("{spinner:.bright_cyan.bold} {msg}")
            .expect("Could not set spinner style"),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

pub fn print_info(message: &str) {
    if !is_quiet_mode() {
        eprintln!("{}", message.cyan().bold());
    }
}

pub fn print_warning(message: &str) {
    if !is_quiet_mode() {
        eprintln!("{}", message.yellow().bold());
    }
}

pub fn print_error(message: &str) {
    // Always print errors, even in quiet mode
    eprintln!("{}", message.red().bold());
}

pub fn print_success(message: &str) {
    if !is_quiet_mode() {
        eprintln!("{}", message.green().bold());
    }
}

pub fn print_version(version: &str) {
    if !is_quiet_mode() {
        let (r, g, b) = rgb::CORAL;
        println!(
            "{} {} {}",
            "docs-changelog".truecolor(r, g, b).bold(),
            "version".cyan(),
            version.green()
        );
    }
}

/// Print content between separators on stdout
///
/// Used for dry-run output, so it is printed even in quiet mode.
pub fn print_bordered_content(content: &str) {
    let (r, g, b) = rgb::DIM_SEPARATOR;
    eprintln!("{}", "━".repeat(50).truecolor(r, g, b));
    println!("{content}");
    eprintln!("{}", "━".repeat(50).truecolor(r, g, b));
}

/// Greeting shown once the token has been verified
pub fn print_greeting(name: &str) {
    if !is_quiet_mode() {
        let (r, g, b) = rgb::NEON_CYAN;
        eprintln!("Hello, {}\n", name.truecolor(r, g, b).bold());
    }
}
