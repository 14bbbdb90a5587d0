//! ANSI styling for terminal diagnostics.
//!
//! Thin escape-code wrappers used by the human-readable diagnostic renderer.
//! Every helper resets the style at the end of the string.

pub struct Style;

impl Style {
    pub const RESET: &'static str = "\x1b[0m";
    pub const BOLD: &'static str = "\x1b[1m";
    pub const RED: &'static str = "\x1b[31m";
    pub const GREEN: &'static str = "\x1b[32m";
    pub const YELLOW: &'static str = "\x1b[33m";
    pub const BLUE: &'static str = "\x1b[34m";
    pub const CYAN: &'static str = "\x1b[36m";

    pub fn red(s: &str) -> String {
        format!("{}{}{}", Self::RED, s, Self::RESET)
    }

    pub fn green(s: &str) -> String {
        format!("{}{}{}", Self::GREEN, s, Self::RESET)
    }

    pub fn yellow(s: &str) -> String {
        format!("{}{}{}", Self::YELLOW, s, Self::RESET)
    }

    pub fn blue(s: &str) -> String {
        format!("{}{}{}", Self::BLUE, s, Self::RESET)
    }

    pub fn cyan(s: &str) -> String {
        format!("{}{}{}", Self::CYAN, s, Self::RESET)
    }

    pub fn bold(s: &str) -> String {
        format!("{}{}{}", Self::BOLD, s, Self::RESET)
    }

    pub fn bold_red(s: &str) -> String {
        format!("{}{}{}{}", Self::BOLD, Self::RED, s, Self::RESET)
    }

    pub fn bold_yellow(s: &str) -> String {
        format!("{}{}{}{}", Self::BOLD, Self::YELLOW, s, Self::RESET)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn red_wraps_and_resets() {
        let out = Style::red("precondition failed");
        assert!(out.starts_with("\x1b[31m"));
        assert!(out.ends_with("\x1b[0m"));
        assert!(out.contains("precondition failed"));
    }

    #[test]
    fn bold_red_stacks_codes() {
        let out = Style::bold_red("error");
        assert!(out.contains("\x1b[1m"));
        assert!(out.contains("\x1b[31m"));
    }
}
