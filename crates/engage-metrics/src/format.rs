//! Display formatting for magnitudes and rates.
//!
//! Output is lossy and meant for humans only; nothing downstream parses it.

const MILLION: f64 = 1_000_000.0;
const THOUSAND: f64 = 1_000.0;

/// A magnitude to be rendered by [`format_count`].
///
/// Whole counts (followers) and means (averages, reach) render identically
/// above one thousand but differently below it: `Whole(75)` prints `"75"`
/// while `Mean(75.0)` prints `"75.0"`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Count {
    Whole(u64),
    Mean(f64),
}

impl Count {
    #[allow(clippy::cast_precision_loss)]
    fn as_f64(self) -> f64 {
        match self {
            Count::Whole(n) => n as f64,
            Count::Mean(x) => x,
        }
    }
}

impl From<u64> for Count {
    fn from(value: u64) -> Self {
        Count::Whole(value)
    }
}

impl From<f64> for Count {
    fn from(value: f64) -> Self {
        Count::Mean(value)
    }
}

/// Abbreviates a count with a `K` or `M` suffix.
///
/// - `>= 1_000_000` → millions, one decimal, `M`
/// - `>= 1_000` → thousands, one decimal, `K`
/// - otherwise the plain value
///
/// ```
/// use engage_metrics::format_count;
///
/// assert_eq!(format_count(999_u64), "999");
/// assert_eq!(format_count(1_500_u64), "1.5K");
/// assert_eq!(format_count(2_300_000_u64), "2.3M");
/// assert_eq!(format_count(77.5), "77.5");
/// ```
#[must_use]
pub fn format_count(count: impl Into<Count>) -> String {
    let count = count.into();
    let value = count.as_f64();

    if value >= MILLION {
        format!("{:.1}M", value / MILLION)
    } else if value >= THOUSAND {
        format!("{:.1}K", value / THOUSAND)
    } else {
        match count {
            Count::Whole(n) => n.to_string(),
            Count::Mean(x) => format_mean(x),
        }
    }
}

/// Shortest round-trip rendering of a float, with the trailing `.0` kept on
/// integral values and exponents written as a sign plus at least two digits
/// (`1e-05`, `1.5e+16`).
fn format_mean(x: f64) -> String {
    let repr = format!("{x:?}");
    let Some((mantissa, exponent)) = repr.split_once('e') else {
        return repr;
    };
    let (sign, digits) = match exponent.strip_prefix('-') {
        Some(digits) => ('-', digits),
        None => ('+', exponent),
    };
    format!("{mantissa}e{sign}{digits:0>2}")
}

/// Renders a ratio as a percentage with two decimals, e.g. `0.0123` → `"1.23%"`.
#[must_use]
pub fn format_percentage(ratio: f64) -> String {
    format!("{:.2}%", ratio * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whole_counts_below_a_thousand_are_plain() {
        assert_eq!(format_count(0_u64), "0");
        assert_eq!(format_count(999_u64), "999");
    }

    #[test]
    fn thousands_get_k_suffix() {
        assert_eq!(format_count(1_000_u64), "1.0K");
        assert_eq!(format_count(1_500_u64), "1.5K");
        assert_eq!(format_count(999_949_u64), "999.9K");
    }

    #[test]
    fn millions_get_m_suffix() {
        assert_eq!(format_count(1_000_000_u64), "1.0M");
        assert_eq!(format_count(2_300_000_u64), "2.3M");
        assert_eq!(format_count(2_450_000_u64), "2.5M");
    }

    #[test]
    fn means_below_a_thousand_keep_their_fraction() {
        assert_eq!(format_count(77.5), "77.5");
        assert_eq!(format_count(75.0), "75.0");
        assert_eq!(format_count(0.0), "0.0");
    }

    #[test]
    fn tiny_means_use_two_digit_exponents() {
        assert_eq!(format_count(1.0 / 100_000.0), "1e-05");
        assert_eq!(format_count(0.000_015), "1.5e-05");
        assert_eq!(format_count(0.0001), "0.0001");
        assert_eq!(format_mean(1.0e-123), "1e-123");
        assert_eq!(format_mean(2.0e16), "2e+16");
    }

    #[test]
    fn means_above_a_thousand_are_abbreviated() {
        assert_eq!(format_count(1_234.56), "1.2K");
        assert_eq!(format_count(3_675_000.0), "3.7M");
    }

    #[test]
    fn percentage_has_two_decimals() {
        assert_eq!(format_percentage(0.0), "0.00%");
        assert_eq!(format_percentage(0.012_345), "1.23%");
        assert_eq!(format_percentage(1.5), "150.00%");
    }
}
