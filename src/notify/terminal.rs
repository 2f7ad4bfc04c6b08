//! Styled terminal notifications with a progress bar.

use console::Style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::runner::WorkflowSnapshot;

use super::Notifier;

/// Visual theme for terminal notifications.
#[derive(Debug, Clone)]
pub struct Theme {
    /// Style for success messages (green).
    pub success: Style,
    /// Style for warning messages (orange).
    pub warning: Style,
    /// Style for error messages (red bold).
    pub error: Style,
    /// Style for informational messages (magenta).
    pub info: Style,
    /// Style for secondary text.
    pub dim: Style,
}

impl Default for Theme {
    fn default() -> Self {
        Self::new()
    }
}

impl Theme {
    /// Create the default colored theme.
    pub fn new() -> Self {
        Self {
            success: Style::new().green(),
            warning: Style::new().color256(208),
            error: Style::new().red().bold(),
            info: Style::new().magenta(),
            dim: Style::new().dim(),
        }
    }

    /// Create a theme without colors (for non-TTY or --no-color).
    pub fn plain() -> Self {
        Self {
            success: Style::new(),
            warning: Style::new(),
            error: Style::new(),
            info: Style::new(),
            dim: Style::new(),
        }
    }

    /// Format a success message (icon + text in green).
    pub fn format_success(&self, msg: &str) -> String {
        format!("{}", self.success.apply_to(format!("✓ {}", msg)))
    }

    /// Format a warning message (icon + text in orange).
    pub fn format_warning(&self, msg: &str) -> String {
        format!("{}", self.warning.apply_to(format!("⚠ {}", msg)))
    }

    /// Format an error message (icon + text in red bold).
    pub fn format_error(&self, msg: &str) -> String {
        format!("{}", self.error.apply_to(format!("✗ {}", msg)))
    }

    /// Format an informational message.
    pub fn format_info(&self, msg: &str) -> String {
        format!("{}", self.info.apply_to(format!("› {}", msg)))
    }
}

/// Notifier that prints styled lines above a step progress bar.
pub struct TerminalNotifier {
    theme: Theme,
    bar: ProgressBar,
}

impl TerminalNotifier {
    /// Create a terminal notifier.
    pub fn new(colors: bool) -> Self {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{bar:24.magenta/dim} {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );

        Self {
            theme: if colors { Theme::new() } else { Theme::plain() },
            bar,
        }
    }

    fn emit(&self, line: String) {
        // A hidden bar (non-TTY) swallows println, so write directly.
        if self.bar.is_hidden() {
            println!("{}", line);
        } else {
            self.bar.println(line);
        }
    }
}

impl Notifier for TerminalNotifier {
    fn on_success(&self, msg: &str) {
        self.emit(self.theme.format_success(msg));
    }

    fn on_error(&self, msg: &str) {
        self.emit(self.theme.format_error(msg));
    }

    fn on_info(&self, msg: &str) {
        self.emit(self.theme.format_info(msg));
    }

    fn on_warning(&self, msg: &str) {
        self.emit(self.theme.format_warning(msg));
    }

    fn on_progress(&self, snapshot: &WorkflowSnapshot) {
        self.bar.set_length(snapshot.total_steps as u64);
        self.bar.set_position(snapshot.completed_count as u64);

        let running = snapshot
            .running_step()
            .map(|step| format!(" · {}", step.label()))
            .unwrap_or_default();
        let mode = if snapshot.auto_progress { " · auto" } else { "" };
        self.bar
            .set_message(format!("{}{}{}", snapshot.kind, running, mode));

        if snapshot.is_complete() {
            self.bar.finish_and_clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_theme_has_no_escape_codes() {
        let theme = Theme::plain();
        assert_eq!(theme.format_success("done"), "✓ done");
        assert_eq!(theme.format_error("bad"), "✗ bad");
        assert_eq!(theme.format_warning("hmm"), "⚠ hmm");
        assert_eq!(theme.format_info("fyi"), "› fyi");
    }

    #[test]
    fn colored_theme_keeps_message_text() {
        let theme = Theme::new();
        assert!(theme.format_success("done").contains("done"));
    }
}
