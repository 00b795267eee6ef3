//! Amount parsing and en-US dollar formatting.
//!
//! Parsing follows the lenient decimal rules a browser applies when it reads a
//! number out of free text: leading whitespace is skipped and the longest
//! numeric prefix wins. Formatting mirrors the en-US currency style for USD.

use serde_json::Value;

const CURRENCY_SYMBOL: &str = "$";
const NAN_TEXT: &str = "NaN";
const INFINITY_TEXT: &str = "∞";

fn is_leading_space(c: char) -> bool {
    c.is_whitespace() || c == '\u{feff}'
}

/// Parse the longest decimal prefix of `input`, or NaN if there is none.
pub fn parse_float(input: &str) -> f64 {
    let s = input.trim_start_matches(is_leading_space);
    let bytes = s.as_bytes();
    let len = bytes.len();
    let mut pos = 0;

    let negative = match bytes.first() {
        Some(b'-') => {
            pos = 1;
            true
        }
        Some(b'+') => {
            pos = 1;
            false
        }
        _ => false,
    };

    if s[pos..].starts_with("Infinity") {
        return if negative {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        };
    }

    let int_start = pos;
    while pos < len && bytes[pos].is_ascii_digit() {
        pos += 1;
    }
    let int_digits = &s[int_start..pos];

    let mut frac_digits = "";
    if pos < len && bytes[pos] == b'.' {
        let frac_start = pos + 1;
        let mut end = frac_start;
        while end < len && bytes[end].is_ascii_digit() {
            end += 1;
        }
        // A lone "." is not part of the number.
        if !int_digits.is_empty() || end > frac_start {
            frac_digits = &s[frac_start..end];
            pos = end;
        }
    }

    if int_digits.is_empty() && frac_digits.is_empty() {
        return f64::NAN;
    }

    let mut exponent = "";
    if pos < len && (bytes[pos] == b'e' || bytes[pos] == b'E') {
        let mut end = pos + 1;
        if end < len && (bytes[end] == b'+' || bytes[end] == b'-') {
            end += 1;
        }
        let digits_start = end;
        while end < len && bytes[end].is_ascii_digit() {
            end += 1;
        }
        if end > digits_start {
            exponent = &s[pos..end];
        }
    }

    let normalized = format!(
        "{}{}.{}{}",
        if negative { "-" } else { "" },
        if int_digits.is_empty() { "0" } else { int_digits },
        if frac_digits.is_empty() { "0" } else { frac_digits },
        exponent
    );
    normalized.parse().unwrap_or(f64::NAN)
}

/// Coerce a row value to a number: strings are parsed, numbers pass through,
/// everything else (including a missing value) is NaN.
pub fn parse_amount(value: Option<&Value>) -> f64 {
    match value {
        Some(Value::String(s)) => parse_float(s),
        Some(Value::Number(n)) => n.as_f64().unwrap_or(f64::NAN),
        _ => f64::NAN,
    }
}

/// Format `value` as US dollars with two fraction digits and thousands groups.
pub fn format_usd(value: f64) -> String {
    if value.is_nan() {
        return NAN_TEXT.to_string();
    }

    let sign = if value.is_sign_negative() { "-" } else { "" };
    if value.is_infinite() {
        return format!("{sign}{CURRENCY_SYMBOL}{INFINITY_TEXT}");
    }

    // Display for f64 is the shortest round-trip form and never uses exponents.
    let repr = value.abs().to_string();
    let (int_part, frac_part) = repr.split_once('.').unwrap_or((repr.as_str(), ""));
    let (int_part, cents) = round_to_cents(int_part, frac_part);

    format!("{sign}{CURRENCY_SYMBOL}{}.{cents}", group_thousands(&int_part))
}

/// Round a decimal string to two fraction digits, half away from zero.
fn round_to_cents(int_part: &str, frac_part: &str) -> (String, String) {
    let mut digits: Vec<u8> = int_part.bytes().collect();
    let mut frac = frac_part.bytes().chain(std::iter::repeat(b'0'));
    digits.push(frac.next().unwrap_or(b'0'));
    digits.push(frac.next().unwrap_or(b'0'));

    let round_up = frac_part.as_bytes().get(2).is_some_and(|d| *d >= b'5');
    if round_up {
        let mut carry = true;
        for digit in digits.iter_mut().rev() {
            if *digit == b'9' {
                *digit = b'0';
            } else {
                *digit += 1;
                carry = false;
                break;
            }
        }
        if carry {
            digits.insert(0, b'1');
        }
    }

    let split = digits.len() - 2;
    let cents = String::from_utf8_lossy(&digits[split..]).into_owned();
    let int_part = String::from_utf8_lossy(&digits[..split]).into_owned();
    (int_part, cents)
}

fn group_thousands(int_part: &str) -> String {
    let len = int_part.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, c) in int_part.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fmt(s: &str) -> String {
        format_usd(parse_float(s))
    }

    #[test]
    fn formats_documented_examples() {
        assert_eq!(fmt("1234.5"), "$1,234.50");
        assert_eq!(fmt("0"), "$0.00");
        assert_eq!(fmt("-42.1"), "-$42.10");
        assert_eq!(fmt("abc"), "NaN");
        assert_eq!(fmt(""), "NaN");
    }

    #[test]
    fn groups_every_three_digits() {
        assert_eq!(fmt("1234567.891"), "$1,234,567.89");
        assert_eq!(fmt("100"), "$100.00");
        assert_eq!(fmt("1000"), "$1,000.00");
        assert_eq!(fmt("-9876543210"), "-$9,876,543,210.00");
    }

    #[test]
    fn rounds_half_away_from_zero() {
        assert_eq!(fmt("0.005"), "$0.01");
        assert_eq!(fmt("0.125"), "$0.13");
        assert_eq!(fmt("2.344"), "$2.34");
        assert_eq!(fmt("-2.345"), "-$2.35");
        assert_eq!(fmt("999.995"), "$1,000.00");
        assert_eq!(fmt("9.999"), "$10.00");
    }

    #[test]
    fn negative_zero_keeps_its_sign() {
        assert_eq!(format_usd(-0.0), "-$0.00");
        assert_eq!(fmt("-0.001"), "-$0.00");
    }

    #[test]
    fn infinity_uses_the_infinity_sign() {
        assert_eq!(format_usd(f64::INFINITY), "$∞");
        assert_eq!(fmt("-Infinity"), "-$∞");
        assert_eq!(fmt("1e400"), "$∞");
    }

    #[test]
    fn parse_takes_the_longest_numeric_prefix() {
        assert_eq!(parse_float("  12abc"), 12.0);
        assert_eq!(parse_float("\n\t3.5 USD"), 3.5);
        assert_eq!(parse_float("+7"), 7.0);
        assert_eq!(parse_float(".5"), 0.5);
        assert_eq!(parse_float("5."), 5.0);
        assert_eq!(parse_float("-.25"), -0.25);
        assert_eq!(parse_float("1e3"), 1000.0);
        assert_eq!(parse_float("2.5E-1x"), 0.25);
        assert_eq!(parse_float("1e"), 1.0);
        assert_eq!(parse_float("1e+"), 1.0);
        assert_eq!(parse_float("1,234"), 1.0);
    }

    #[test]
    fn parse_without_digits_is_nan() {
        for input in ["", " ", ".", "-", "+.", "e5", "$12", "NaN", "infinity"] {
            assert!(parse_float(input).is_nan(), "expected NaN for {input:?}");
        }
    }

    #[test]
    fn parse_amount_by_value_kind() {
        assert_eq!(parse_amount(Some(&json!("19.99"))), 19.99);
        assert_eq!(parse_amount(Some(&json!(42))), 42.0);
        assert_eq!(parse_amount(Some(&json!(-0.5))), -0.5);
        assert!(parse_amount(Some(&json!(null))).is_nan());
        assert!(parse_amount(Some(&json!(true))).is_nan());
        assert!(parse_amount(Some(&json!({"amount": 1}))).is_nan());
        assert!(parse_amount(None).is_nan());
    }

    #[test]
    fn formatting_is_repeatable() {
        let first = fmt("31415.926");
        let second = fmt("31415.926");
        assert_eq!(first, "$31,415.93");
        assert_eq!(first, second);
    }

    #[test]
    fn valid_amounts_have_symbol_and_two_fraction_digits() {
        for input in ["0.1", "12", "123456.7", "-5", "1e6", "0.000001"] {
            let formatted = fmt(input);
            let unsigned = formatted.trim_start_matches('-');
            assert!(unsigned.starts_with('$'), "{formatted}");
            let (_, cents) = unsigned.rsplit_once('.').unwrap();
            assert_eq!(cents.len(), 2, "{formatted}");
        }
    }
}
