//! ECMAScript number-to-string conversion

/// Format a number the way `String(n)` does
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n == 0.0 {
        return "0".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if n < 0.0 {
        return format!("-{}", format_number(-n));
    }

    // shortest round-trip digits and decimal exponent
    let sci = format!("{:e}", n);
    let (mantissa, exponent) = match sci.split_once('e') {
        Some(parts) => parts,
        None => return sci,
    };
    let digits: String = mantissa.chars().filter(|c| *c != '.').collect();
    let exponent: i32 = exponent.parse().unwrap_or(0);
    let k = digits.len() as i32;
    let point = exponent + 1;

    if k <= point && point <= 21 {
        let mut out = digits;
        out.extend(std::iter::repeat('0').take((point - k) as usize));
        out
    } else if 0 < point && point <= 21 {
        let (int, frac) = digits.split_at(point as usize);
        format!("{}.{}", int, frac)
    } else if -6 < point && point <= 0 {
        format!("0.{}{}", "0".repeat((-point) as usize), digits)
    } else {
        let sign = if point - 1 < 0 { '-' } else { '+' };
        let (first, rest) = digits.split_at(1);
        if rest.is_empty() {
            format!("{}e{}{}", first, sign, (point - 1).abs())
        } else {
            format!("{}.{}e{}{}", first, rest, sign, (point - 1).abs())
        }
    }
}

/// Canonical property key for a numeric literal key
pub fn number_key(n: f64) -> String {
    format_number(n)
}

/// Whether `n` is an integer that can index an array
pub fn as_index(n: f64) -> Option<usize> {
    if n >= 0.0 && n.fract() == 0.0 && n < 4_294_967_295.0 {
        Some(n as usize)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integers() {
        assert_eq!(format_number(2.0), "2");
        assert_eq!(format_number(-0.0), "0");
        assert_eq!(format_number(-42.0), "-42");
        assert_eq!(format_number(1e20), "100000000000000000000");
    }

    #[test]
    fn test_fractions() {
        assert_eq!(format_number(0.1 + 0.2), "0.30000000000000004");
        assert_eq!(format_number(1.5), "1.5");
        assert_eq!(format_number(0.000001), "0.000001");
    }

    #[test]
    fn test_exponent_forms() {
        assert_eq!(format_number(1e21), "1e+21");
        assert_eq!(format_number(1.5e-7), "1.5e-7");
        assert_eq!(format_number(1e-7), "1e-7");
    }

    #[test]
    fn test_special_values() {
        assert_eq!(format_number(f64::NAN), "NaN");
        assert_eq!(format_number(f64::INFINITY), "Infinity");
        assert_eq!(format_number(f64::NEG_INFINITY), "-Infinity");
    }

    #[test]
    fn test_as_index() {
        assert_eq!(as_index(3.0), Some(3));
        assert_eq!(as_index(-1.0), None);
        assert_eq!(as_index(1.5), None);
    }
}
