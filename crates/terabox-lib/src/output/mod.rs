//! Classified console output for the uploader binaries.
//!
//! `Formatter` prints one colorized line per message through a fixed
//! severity-to-color mapping. Escape sequences are plain constants, so
//! there is no global color state to initialize or reset.

use chrono::Local;

const BRIGHT: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

const RED: &str = "\x1b[31m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const MAGENTA: &str = "\x1b[35m";
const CYAN: &str = "\x1b[36m";

/// Width of the upper-cased subject column.
const SUBJECT_WIDTH: usize = 12;

/// Message classification, each bound to one foreground color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
    Success,
    Info,
    Debug,
}

impl Severity {
    const fn color(self) -> &'static str {
        match self {
            Severity::Error => RED,
            Severity::Warning => YELLOW,
            Severity::Success => GREEN,
            Severity::Info => CYAN,
            Severity::Debug => MAGENTA,
        }
    }
}

/// Console formatter for classified, optionally timestamped messages.
///
/// Construct once at startup; every severity method writes exactly one
/// line to stdout and leaves the terminal style reset afterwards.
#[derive(Debug, Clone, Copy, Default)]
pub struct Formatter {
    timestamps: bool,
}

impl Formatter {
    /// Create a formatter. When `timestamps` is true, every line carries
    /// the current local time as `[YYYY-MM-DD HH:MM:SS]`.
    pub fn new(timestamps: bool) -> Self {
        Self { timestamps }
    }

    /// The bracketed frame prepended to every line.
    ///
    /// Reads the flag and the wall clock but never prints. With
    /// timestamps disabled the brackets enclose an empty string.
    pub fn timestamp_prefix(&self) -> String {
        let timestamp = if self.timestamps {
            Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
        } else {
            String::new()
        };
        format!("{BRIGHT}[{timestamp}]{RESET}")
    }

    /// Print an error message in red.
    pub fn error(&self, subject: &str, message: &str) {
        println!("{}", self.line(Severity::Error, subject, message));
    }

    /// Print a warning message in yellow.
    pub fn warning(&self, subject: &str, message: &str) {
        println!("{}", self.line(Severity::Warning, subject, message));
    }

    /// Print a success message in green.
    pub fn success(&self, subject: &str, message: &str) {
        println!("{}", self.line(Severity::Success, subject, message));
    }

    /// Print an info message in cyan.
    pub fn info(&self, subject: &str, message: &str) {
        println!("{}", self.line(Severity::Info, subject, message));
    }

    /// Print a debug message in magenta.
    pub fn debug(&self, subject: &str, message: &str) {
        println!("{}", self.line(Severity::Debug, subject, message));
    }

    /// Render one line: bracketed prefix, highlighted subject column,
    /// then the message verbatim after the style reset.
    ///
    /// Subjects are upper-cased and left-justified to the column width;
    /// longer subjects render in full and push the colon right.
    fn line(&self, severity: Severity, subject: &str, message: &str) -> String {
        format!(
            "{}{BRIGHT}{} {:<width$}: {RESET}{}",
            self.timestamp_prefix(),
            severity.color(),
            subject.to_uppercase(),
            message,
            width = SUBJECT_WIDTH,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// Strips every escape sequence the formatter can emit.
    fn visible(line: &str) -> String {
        [BRIGHT, RESET, RED, GREEN, YELLOW, MAGENTA, CYAN]
            .iter()
            .fold(line.to_string(), |s, code| s.replace(code, ""))
    }

    #[test]
    fn test_subject_is_uppercased_and_padded_to_column() {
        let f = Formatter::new(false);
        let line = f.line(Severity::Error, "upload", "failed");
        assert_eq!(visible(&line), "[] UPLOAD      : failed");
    }

    #[test]
    fn test_long_subject_is_never_truncated() {
        let f = Formatter::new(false);
        let line = f.line(Severity::Info, "authentication", "token expired");
        assert_eq!(visible(&line), "[] AUTHENTICATION: token expired");
    }

    #[test]
    fn test_empty_message_still_renders_the_frame() {
        let f = Formatter::new(false);
        let line = f.line(Severity::Success, "status", "");
        assert_eq!(visible(&line), "[] STATUS      : ");
    }

    #[test]
    fn test_escape_sequence_layout_is_exact() {
        let f = Formatter::new(false);
        let line = f.line(Severity::Error, "upload", "failed");
        assert_eq!(
            line,
            format!("{BRIGHT}[]{RESET}{BRIGHT}{RED} UPLOAD      : {RESET}failed")
        );
    }

    #[test]
    fn test_each_severity_uses_its_own_color() {
        let f = Formatter::new(false);
        let cases = [
            (Severity::Error, RED),
            (Severity::Warning, YELLOW),
            (Severity::Success, GREEN),
            (Severity::Info, CYAN),
            (Severity::Debug, MAGENTA),
        ];
        for (severity, color) in cases {
            assert!(f.line(severity, "subject", "message").contains(color));
        }
    }

    #[test]
    fn test_rendering_is_stateless() {
        let f = Formatter::new(false);
        let first = f.line(Severity::Warning, "retry", "attempt 2");
        let second = f.line(Severity::Warning, "retry", "attempt 2");
        assert_eq!(first, second);
    }

    #[test]
    fn test_disabled_timestamps_give_an_empty_frame() {
        let f = Formatter::new(false);
        assert_eq!(f.timestamp_prefix(), "\x1b[1m[]\x1b[0m");
    }

    #[test]
    fn test_default_formatter_has_timestamps_off() {
        assert_eq!(Formatter::default().timestamp_prefix(), "\x1b[1m[]\x1b[0m");
    }

    #[test]
    fn test_enabled_timestamps_carry_the_current_local_time() {
        let f = Formatter::new(true);
        let prefix = f.timestamp_prefix();
        let inner = prefix
            .strip_prefix("\x1b[1m[")
            .and_then(|rest| rest.strip_suffix("]\x1b[0m"))
            .unwrap();
        let parsed = chrono::NaiveDateTime::parse_from_str(inner, "%Y-%m-%d %H:%M:%S").unwrap();
        let drift = Local::now().naive_local() - parsed;
        assert!(drift.num_seconds().abs() <= 2);
    }

    #[test]
    fn test_timestamped_line_embeds_the_clock() {
        let f = Formatter::new(true);
        let line = f.line(Severity::Debug, "upload", "chunk 3 of 7");
        let inner = line.strip_prefix("\x1b[1m[").unwrap();
        let end = inner.find(']').unwrap();
        let parsed =
            chrono::NaiveDateTime::parse_from_str(&inner[..end], "%Y-%m-%d %H:%M:%S");
        assert!(parsed.is_ok());
    }

    #[test]
    fn test_print_methods_do_not_panic() {
        let f = Formatter::new(false);
        f.error("upload", "failed");
        f.warning("quota", "nearly full");
        f.success("upload", "done");
        f.info("session", "refreshed");
        f.debug("chunk", "64 KiB");
    }

    #[test]
    fn test_timestamped_print_does_not_panic() {
        Formatter::new(true).info("startup", "ready");
    }

    proptest! {
        #[test]
        fn test_visible_text_matches_the_column_layout(
            subject in "[a-zA-Z0-9_ -]{0,32}",
            message in "[ -~]{0,64}",
        ) {
            let line = Formatter::new(false).line(Severity::Info, &subject, &message);
            prop_assert_eq!(
                visible(&line),
                format!("[] {:<12}: {}", subject.to_uppercase(), message)
            );
        }

        #[test]
        fn test_long_subjects_render_in_full(subject in "[a-z]{13,40}") {
            let line = Formatter::new(false).line(Severity::Error, &subject, "x");
            prop_assert!(visible(&line).contains(&subject.to_uppercase()));
        }
    }
}
