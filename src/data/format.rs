use serde::Deserialize;

/// Number formatting used by tooltips and legend labels
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NumberFormat {
    /// Thousands separators, up to 12 significant digits ("1,234,567")
    #[default]
    Grouped,
    /// Compact SI suffix ("1.2M")
    Si,
    /// Fixed number of decimals with thousands separators
    Fixed(u8),
}

impl NumberFormat {
    pub fn format(&self, value: f64) -> String {
        if !value.is_finite() {
            return "0".to_string();
        }
        match *self {
            NumberFormat::Grouped => grouped(&significant(value, 12)),
            NumberFormat::Fixed(decimals) => {
                grouped(&format!("{:.*}", decimals as usize, value))
            }
            NumberFormat::Si => si(value),
        }
    }
}

/// Render with at most `digits` significant digits, trailing zeros trimmed
fn significant(value: f64, digits: i32) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    let magnitude = value.abs().log10().floor() as i32;
    let decimals = (digits - 1 - magnitude).max(0) as usize;
    trim_zeros(format!("{:.*}", decimals, value))
}

fn trim_zeros(s: String) -> String {
    if !s.contains('.') {
        return s;
    }
    s.trim_end_matches('0').trim_end_matches('.').to_string()
}

/// Insert thousands separators into the integer part of a decimal string
fn grouped(s: &str) -> String {
    let (sign, unsigned) = match s.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", s),
    };
    let (int, frac) = match unsigned.split_once('.') {
        Some((int, frac)) => (int, Some(frac)),
        None => (unsigned, None),
    };

    let mut out = String::with_capacity(s.len() + int.len() / 3);
    out.push_str(sign);
    for (i, ch) in int.chars().enumerate() {
        if i > 0 && (int.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    if let Some(frac) = frac {
        out.push('.');
        out.push_str(frac);
    }
    out
}

fn si(value: f64) -> String {
    const PREFIXES: [(f64, &str); 5] = [
        (1e12, "T"),
        (1e9, "G"),
        (1e6, "M"),
        (1e3, "k"),
        (1.0, ""),
    ];
    let abs = value.abs();
    for (base, suffix) in PREFIXES {
        if abs >= base {
            return format!("{}{}", significant(value / base, 3), suffix);
        }
    }
    significant(value, 3)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grouped_integers() {
        let f = NumberFormat::Grouped;
        assert_eq!(f.format(0.0), "0");
        assert_eq!(f.format(999.0), "999");
        assert_eq!(f.format(1000.0), "1,000");
        assert_eq!(f.format(1_234_567.0), "1,234,567");
        assert_eq!(f.format(-45_000.0), "-45,000");
    }

    #[test]
    fn test_grouped_fraction() {
        assert_eq!(NumberFormat::Grouped.format(1234.5), "1,234.5");
    }

    #[test]
    fn test_fixed() {
        assert_eq!(NumberFormat::Fixed(2).format(12345.678), "12,345.68");
        assert_eq!(NumberFormat::Fixed(0).format(12.4), "12");
    }

    #[test]
    fn test_si() {
        let f = NumberFormat::Si;
        assert_eq!(f.format(1_200_000.0), "1.2M");
        assert_eq!(f.format(1_400_000_000.0), "1.4G");
        assert_eq!(f.format(500.0), "500");
        assert_eq!(f.format(20_000.0), "20k");
    }

    #[test]
    fn test_non_finite_is_zero() {
        assert_eq!(NumberFormat::Grouped.format(f64::NAN), "0");
    }
}
