//! Terminal output formatting and utilities.

pub mod colors;
pub mod errors;

use serde_json::Value;

use crate::commands::request::RunSummary;

/// Output handler for consistent terminal formatting
pub struct OutputHandler {
    colors: colors::ColorSupport,
}

impl OutputHandler {
    pub fn new() -> Self {
        Self {
            colors: colors::ColorSupport::detect(),
        }
    }

    /// Print an info message
    pub fn info(&self, message: &str) {
        println!("{}", self.colors.dim(message));
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        println!("{} {}", self.colors.green("✓"), message);
    }

    /// Print a warning message
    pub fn warn(&self, message: &str) {
        println!("{} {}", self.colors.yellow("⚠"), message);
    }

    /// Print an error message
    pub fn error(&self, message: &str) {
        eprintln!("{} {}", self.colors.red("✗"), message);
    }

    /// Print a labelled step, e.g. the HTTP method and URL
    pub fn step(&self, label: &str, message: &str) {
        println!("{} {}", self.colors.bold(&self.colors.cyan(label)), message);
    }

    /// Print a document verbatim, without styling
    pub fn document(&self, text: &str) {
        print!("{}", text);
    }

    /// Pretty-print a JSON response body
    pub fn json(&self, value: &Value) {
        match serde_json::to_string_pretty(value) {
            Ok(pretty) => println!("{}", pretty),
            Err(_) => println!("{}", value),
        }
    }

    /// Print request counts and cache accounting for a load run
    pub fn summary(&self, summary: &RunSummary) {
        let stats = &summary.stats;
        self.info("");
        self.info(&format!(
            "{} request(s) in {} ms",
            summary.requests,
            summary.elapsed.as_millis()
        ));
        self.info(&format!(
            "cache: {} entries, {} hits, {} misses, hit rate {:.1}%",
            stats.cache_size,
            stats.hits,
            stats.misses,
            stats.hit_rate * 100.0
        ));
    }
}

impl Default for OutputHandler {
    fn default() -> Self {
        Self::new()
    }
}
