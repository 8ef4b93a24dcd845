//! Error message formatting with actionable suggestions.

use std::error::Error;

use souk_core::error::SoukError;

use super::colors::ColorSupport;

/// Error formatter with suggestions
pub struct ErrorFormatter {
    colors: ColorSupport,
}

impl ErrorFormatter {
    pub fn new() -> Self {
        Self::with_colors(ColorSupport::detect())
    }

    pub fn with_colors(colors: ColorSupport) -> Self {
        Self { colors }
    }

    /// Format an error with its HTTP status, suggestion and cause chain
    pub fn format_error(&self, error: &SoukError) -> String {
        let mut output = String::new();

        output.push_str(&self.colors.red("error"));
        if let Some(status) = error.status() {
            output.push_str(&format!("[{}]", status));
        }
        output.push_str(": ");
        output.push_str(&error.to_string());
        output.push('\n');

        if let Some(suggestion) = error.suggestion() {
            output.push('\n');
            output.push_str(&self.colors.dim("help"));
            output.push_str(": ");
            output.push_str(suggestion);
            output.push('\n');
        }

        let mut source = error.source();
        while let Some(err) = source {
            output.push_str(&self.colors.dim("caused by"));
            output.push_str(": ");
            output.push_str(&err.to_string());
            output.push('\n');
            source = err.source();
        }

        output
    }
}

impl Default for ErrorFormatter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_rate_limited() {
        let formatter = ErrorFormatter::with_colors(ColorSupport::disabled());
        let err = SoukError::RateLimited {
            endpoint: "/search".to_string(),
            retry_after_seconds: 60,
        };

        let formatted = formatter.format_error(&err);
        assert!(formatted.starts_with("error[429]: "));
        assert!(formatted.contains("60 seconds"));
        assert!(formatted.contains("help: Wait for the indicated time"));
    }

    #[test]
    fn test_format_includes_cause() {
        let formatter = ErrorFormatter::with_colors(ColorSupport::disabled());
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "souk.toml missing");
        let err = SoukError::io("Failed to read souk.toml".to_string(), io);

        let formatted = formatter.format_error(&err);
        assert!(formatted.starts_with("error: "));
        assert!(formatted.contains("caused by: souk.toml missing"));
    }
}
