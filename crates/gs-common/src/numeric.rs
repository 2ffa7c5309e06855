//! Numeric literal lexeme classification.

/// Classifies a numeric literal lexeme as `int` or `float`.
///
/// Per the engine's literal-typing rule: any lexeme containing `.`, `e`, or
/// `E` is `float`; hex/binary/octal-prefixed and plain digit lexemes are
/// `int`. Underscores are digit separators and do not affect the result.
pub fn is_float_lexeme(text: &str) -> bool {
    if text.len() > 2 {
        let prefix = &text[0..2];
        if prefix.eq_ignore_ascii_case("0x")
            || prefix.eq_ignore_ascii_case("0b")
            || prefix.eq_ignore_ascii_case("0o")
        {
            return false;
        }
    }
    text.bytes().any(|b| matches!(b, b'.' | b'e' | b'E'))
}

/// Parses a numeric literal lexeme into an `f64`, honoring `0x`/`0b`/`0o`
/// prefixes and `_` digit separators. Used by lazy initializer inference
/// when the initializer's concrete value (not just its type) matters, e.g.
/// resolving a literal dictionary key.
pub fn parse_numeric_literal_value(text: &str) -> Option<f64> {
    if text.is_empty() {
        return None;
    }
    if text.len() > 2 {
        let prefix = &text[0..2];
        if prefix.eq_ignore_ascii_case("0x") {
            return parse_radix_digits(&text[2..], 16);
        } else if prefix.eq_ignore_ascii_case("0b") {
            return parse_radix_digits(&text[2..], 2);
        } else if prefix.eq_ignore_ascii_case("0o") {
            return parse_radix_digits(&text[2..], 8);
        }
    }
    if text.contains('_') {
        let cleaned: String = text.chars().filter(|&c| c != '_').collect();
        return cleaned.parse::<f64>().ok();
    }
    text.parse::<f64>().ok()
}

fn parse_radix_digits(text: &str, base: u32) -> Option<f64> {
    if text.is_empty() {
        return None;
    }
    let mut value = 0.0;
    let base_float = base as f64;
    for byte in text.bytes() {
        if byte == b'_' {
            continue;
        }
        let digit = match byte {
            b'0'..=b'9' => (byte - b'0') as u32,
            b'a'..=b'f' => (byte - b'a' + 10) as u32,
            b'A'..=b'F' => (byte - b'A' + 10) as u32,
            _ => return None,
        };
        if digit >= base {
            return None;
        }
        value = value * base_float + digit as f64;
    }
    Some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_int_is_not_float() {
        assert!(!is_float_lexeme("42"));
        assert!(!is_float_lexeme("1_000"));
    }

    #[test]
    fn dotted_or_exponent_is_float() {
        assert!(is_float_lexeme("4.2"));
        assert!(is_float_lexeme("1e10"));
        assert!(is_float_lexeme("1E-3"));
    }

    #[test]
    fn hex_literal_is_int_even_with_e_digit() {
        assert!(!is_float_lexeme("0xFE"));
    }

    #[test]
    fn parses_prefixed_and_separated_literals() {
        assert_eq!(parse_numeric_literal_value("0x10"), Some(16.0));
        assert_eq!(parse_numeric_literal_value("1_000"), Some(1000.0));
        assert_eq!(parse_numeric_literal_value("0b101"), Some(5.0));
    }
}
