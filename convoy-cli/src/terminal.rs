// ============================================================================
// convoy-cli/src/terminal.rs
// ============================================================================
//
// TERMINAL OUTPUT: UI Components and Styling
//
// Consistent styling for everything the CLI prints to stdout: section
// headers, status lines, processing steps, success and error messages.
// Diagnostics go through the `log` macros instead and end up on stderr and
// in the run log.
//
// Visual hierarchy:
//
// 1. Sections (===== SECTION =====)
// 2. Processing steps (» Step description)
// 3. Status items (  Label:          Value)
// 4. Success / error lines (✓ / ✗)

use console::style;

/// Styling constants for terminal output
pub mod styling {
    pub const SUCCESS_SYMBOL: &str = "✓";
    pub const PROCESSING_SYMBOL: &str = "»";
    pub const SKIPPED_SYMBOL: &str = "–";
    pub const ERROR_SYMBOL: &str = "✗";

    pub const SECTION_PREFIX: &str = "===== ";
    pub const SECTION_SUFFIX: &str = " =====";

    pub const STATUS_INDENT: &str = "  ";
    pub const SUB_ITEM_INDENT: &str = "    ";

    /// Width the status labels are padded to.
    pub const LABEL_WIDTH: usize = 15;
}

/// Enables or disables colors for stdout and stderr.
pub fn set_color(enable: bool) {
    console::set_colors_enabled(enable);
    console::set_colors_enabled_stderr(enable);
}

/// Print a section header for major workflow phases
pub fn print_section(title: &str) {
    println!();
    println!(
        "{}{}{}",
        styling::SECTION_PREFIX,
        style(title.to_uppercase()).cyan().bold(),
        styling::SECTION_SUFFIX
    );
    println!();
}

/// Formats a status line; the label is padded so values line up.
#[must_use]
pub fn format_status(label: &str, value: &str) -> String {
    let label = format!("{label}:");
    format!(
        "{}{:<width$} {}",
        styling::STATUS_INDENT,
        label,
        value,
        width = styling::LABEL_WIDTH
    )
}

/// Print a status line (key-value pair), optionally with the value in bold
pub fn print_status(label: &str, value: &str, highlight: bool) {
    if highlight {
        println!("{}", format_status(label, &style(value).bold().to_string()));
    } else {
        println!("{}", format_status(label, value));
    }
}

pub fn print_processing(message: &str) {
    println!();
    println!("{}{} {}", styling::STATUS_INDENT, styling::PROCESSING_SYMBOL, style(message).bold());
}

pub fn print_sub_item(message: &str) {
    println!("{}{}", styling::SUB_ITEM_INDENT, message);
}

pub fn print_success(message: &str) {
    println!("{}{} {}", styling::STATUS_INDENT, style(styling::SUCCESS_SYMBOL).green(), message);
}

pub fn print_skipped(message: &str) {
    println!("{}{} {}", styling::STATUS_INDENT, style(styling::SKIPPED_SYMBOL).yellow(), message);
}

/// Print an error message with context and an optional suggestion
pub fn print_error(title: &str, message: &str, suggestion: Option<&str>) {
    eprintln!();
    eprintln!("{} {}", styling::ERROR_SYMBOL, style(title).red().bold());
    eprintln!("  Message:    {message}");
    if let Some(suggestion) = suggestion {
        eprintln!("  Suggestion: {suggestion}");
    }
}
