//! # Utilities Module
//!
//! ## Purpose
//! Common helpers used across the search core: operation timing and small
//! text transformations shared by the parser and dispatcher.

use std::time::Instant;

/// Performance timer for measuring operation duration
pub struct Timer {
    start: Instant,
    name: String,
}

impl Timer {
    /// Start a new timer with a name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            start: Instant::now(),
            name: name.into(),
        }
    }

    /// Get elapsed time in milliseconds
    pub fn elapsed_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    /// Stop timer and log duration
    pub fn stop(self) -> u64 {
        let elapsed = self.elapsed_ms();
        tracing::debug!("Timer '{}' completed in {}ms", self.name, elapsed);
        elapsed
    }
}

/// Text processing utilities
pub struct TextUtils;

impl TextUtils {
    /// Title-case each whitespace-separated word ("sidi bel abbes" -> "Sidi Bel Abbes")
    pub fn title_case(text: &str) -> String {
        text.split_whitespace()
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Truncate text to specified length with ellipsis
    pub fn truncate(text: &str, max_length: usize) -> String {
        if text.chars().count() <= max_length {
            text.to_string()
        } else {
            let kept: String = text.chars().take(max_length.saturating_sub(3)).collect();
            format!("{}...", kept)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_case() {
        assert_eq!(TextUtils::title_case("algiers"), "Algiers");
        assert_eq!(TextUtils::title_case("sidi bel abbes"), "Sidi Bel Abbes");
        assert_eq!(TextUtils::title_case(""), "");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(TextUtils::truncate("short", 20), "short");
        assert_eq!(TextUtils::truncate("This is a very long text", 10), "This is...");
    }
}
