/// Stringify a result: integral values print without a fraction, the
/// non-finite values print as `Infinity`, `-Infinity` and `NaN`, and
/// magnitudes outside `[1e-6, 1e21)` switch to exponent form (`1e+21`,
/// `1.5e-7`).
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n == f64::INFINITY {
        "Infinity".to_string()
    } else if n == f64::NEG_INFINITY {
        "-Infinity".to_string()
    } else if n == 0.0 {
        // covers -0
        "0".to_string()
    } else if n.abs() >= 1e21 || n.abs() < 1e-6 {
        exponent_form(n)
    } else {
        format!("{}", n)
    }
}

fn exponent_form(n: f64) -> String {
    let s = format!("{:e}", n);
    match s.split_once('e') {
        Some((mantissa, exp)) if !exp.starts_with('-') => format!("{}e+{}", mantissa, exp),
        _ => s,
    }
}

/// The two-line record shown per evaluation:
///
/// ```text
/// >>> input
/// output
/// ```
pub fn format_record(input: &str, output: &str) -> String {
    format!(">>> {}\n{}", input, output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integral_values() {
        assert_eq!(format_number(14.0), "14");
        assert_eq!(format_number(-3.0), "-3");
        assert_eq!(format_number(-0.0), "0");
    }

    #[test]
    fn fractional_values() {
        assert_eq!(format_number(0.75), "0.75");
        assert_eq!(format_number(0.1 + 0.2), "0.30000000000000004");
    }

    #[test]
    fn large_values_switch_to_exponent_at_1e21() {
        assert_eq!(format_number(1e20), "100000000000000000000");
        assert_eq!(format_number(999999999999999900000.0), "999999999999999900000");
        assert_eq!(format_number(1e21), "1e+21");
        assert_eq!(format_number(-1e21), "-1e+21");
        assert_eq!(format_number(1.5e300), "1.5e+300");
        assert_eq!(format_number(f64::MAX), "1.7976931348623157e+308");
    }

    #[test]
    fn small_values_switch_to_exponent_below_1e_6() {
        assert_eq!(format_number(0.000001), "0.000001");
        assert_eq!(format_number(0.0000015), "0.0000015");
        assert_eq!(format_number(1e-7), "1e-7");
        assert_eq!(format_number(-2.5e-7), "-2.5e-7");
        assert_eq!(format_number(5e-324), "5e-324");
    }

    #[test]
    fn non_finite_values() {
        assert_eq!(format_number(f64::INFINITY), "Infinity");
        assert_eq!(format_number(f64::NEG_INFINITY), "-Infinity");
        assert_eq!(format_number(f64::NAN), "NaN");
    }

    #[test]
    fn record_layout() {
        assert_eq!(format_record("2 + 2", "4"), ">>> 2 + 2\n4");
        assert_eq!(format_record("y", "Unable to parse input"), ">>> y\nUnable to parse input");
    }
}
