//! Utilities module for logging, error handling, and formatting helpers

pub mod error;
pub mod logging;

pub use error::{GraspError, Result};
pub use logging::{init_logging, LogConfig, LogLevel, ProgressLogger};

/// Format a number with thousands separator, used for parameter counts
pub fn format_number(n: usize) -> String {
    let s = n.to_string();
    let mut result = String::new();
    let chars: Vec<char> = s.chars().collect();

    for (i, c) in chars.iter().enumerate() {
        if i > 0 && (chars.len() - i) % 3 == 0 {
            result.push(',');
        }
        result.push(*c);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(1_864_068), "1,864,068");
        assert_eq!(format_number(42), "42");
    }
}
