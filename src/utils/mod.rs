//! Common utilities and helper functions
//!
//! This module provides shared utilities used across the application.

pub mod error;

/// Truncate text to at most `max_chars` characters, appending `...`
///
/// Vendor and Telegram error bodies can be whole HTML pages; log lines keep
/// only the head.
pub fn truncate_text(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let kept: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{kept}...")
}

/// Mask a secret for display, keeping a short prefix
pub fn mask_secret(secret: &str) -> String {
    let secret = secret.trim();
    if secret.chars().count() <= 8 {
        return "****".to_string();
    }
    let prefix: String = secret.chars().take(4).collect();
    format!("{prefix}****")
}
