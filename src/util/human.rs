use crate::error::QuotaError;
use crate::models::scaled::{ScaledValue, Unit};
use regex::Regex;
use std::sync::LazyLock;

/// `1,234.5G`, `23.09T`, `0k`, `165144313856`
static SCALED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<num>\d{1,3}(?:,\d{3})+(?:\.\d+)?|\d+(?:\.\d+)?)(?P<unit>[kKMGTP])?$")
        .expect("static regex")
});

/// Parse a quota tool number with an optional one-letter binary unit.
pub fn parse_scaled(text: &str) -> Result<ScaledValue, QuotaError> {
    let text = text.trim();
    let caps = SCALED_RE
        .captures(text)
        .ok_or_else(|| QuotaError::InvalidScaled(text.to_string()))?;

    let magnitude: f64 = caps["num"]
        .replace(',', "")
        .parse()
        .map_err(|_| QuotaError::InvalidScaled(text.to_string()))?;

    let unit = caps
        .name("unit")
        .and_then(|m| m.as_str().chars().next())
        .and_then(Unit::from_letter)
        .unwrap_or(Unit::None);

    Ok(ScaledValue::new(magnitude, unit))
}

/// Render with exactly `precision` decimals, promoting the unit while the
/// integer part would need more than 5 digits.
///
/// `format!` never consults the locale, so the separator is always a dot.
pub fn format_scaled(value: ScaledValue, precision: usize) -> String {
    if value.is_zero() {
        return format!("{:.*}", precision, 0.0);
    }

    let mut v = value;
    loop {
        let rendered = format!("{:.*}", precision, v.magnitude);
        let int_digits = rendered.split('.').next().map(str::len).unwrap_or(0);
        if int_digits <= 5 {
            return format!("{}{}", rendered, v.unit.suffix());
        }
        match v.unit.next() {
            Some(unit) => v = ScaledValue::new(v.magnitude / 1024.0, unit),
            None       => return format!("{}{}", rendered, v.unit.suffix()),
        }
    }
}

/// Rescale to `target`, e.g. everything to tebibytes for the `-t` report.
pub fn convert_to_unit(value: ScaledValue, target: Unit) -> ScaledValue {
    let shift = value.unit.rank() - target.rank();
    ScaledValue::new(value.magnitude * 1024f64.powi(shift), target)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_and_scaled_numbers() {
        assert_eq!(parse_scaled("165144313856").unwrap(), ScaledValue::raw(165144313856.0));
        assert_eq!(parse_scaled("23.09T").unwrap(), ScaledValue::new(23.09, Unit::T));
        assert_eq!(parse_scaled("0k").unwrap(), ScaledValue::new(0.0, Unit::K));
        assert_eq!(parse_scaled("512K").unwrap(), ScaledValue::new(512.0, Unit::K));
        assert_eq!(parse_scaled("1,234.5G").unwrap(), ScaledValue::new(1234.5, Unit::G));
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_scaled("").is_err());
        assert!(parse_scaled("unlimited").is_err());
        assert!(parse_scaled("12X").is_err());
        assert!(parse_scaled("1,23").is_err());
        assert!(parse_scaled("-5G").is_err());
    }

    #[test]
    fn formats_with_one_decimal() {
        assert_eq!(format_scaled(ScaledValue::new(1.5, Unit::G), 1), "1.5G");
        assert_eq!(format_scaled(ScaledValue::raw(1346.0), 1), "1346.0");
        assert_eq!(format_scaled(ScaledValue::new(20.0, Unit::T), 2), "20.00T");
    }

    #[test]
    fn zero_is_never_promoted() {
        assert_eq!(format_scaled(ScaledValue::new(0.0, Unit::G), 1), "0.0");
        assert_eq!(format_scaled(ScaledValue::raw(0.0), 1), "0.0");
    }

    #[test]
    fn promotes_until_five_integer_digits() {
        assert_eq!(format_scaled(ScaledValue::raw(2048000000.0), 1), "1953.1M");
        assert_eq!(format_scaled(ScaledValue::raw(99999.0), 1), "99999.0");
        assert_eq!(format_scaled(ScaledValue::raw(100000.0), 1), "97.7k");
        // rounding up to 100000.0 counts as six digits
        assert_eq!(format_scaled(ScaledValue::raw(99999.96), 1), "97.7k");
        for raw in [1.0, 512.0, 1e6, 3.3e9, 7.7e12, 1e15, 5e17] {
            let out = format_scaled(ScaledValue::raw(raw), 1);
            let int_part = out.split('.').next().unwrap();
            assert!(int_part.len() <= 5, "{out}");
        }
    }

    #[test]
    fn promotion_stops_at_peta() {
        let out = format_scaled(ScaledValue::new(200000.0, Unit::P), 1);
        assert_eq!(out, "200000.0P");
    }

    #[test]
    fn already_small_values_are_left_alone() {
        let v = ScaledValue::new(812.3, Unit::M);
        assert_eq!(format_scaled(v, 1), format_scaled(parse_scaled("812.3M").unwrap(), 1));
    }

    #[test]
    fn converts_to_tebibytes() {
        let t = convert_to_unit(ScaledValue::new(2048.0, Unit::G), Unit::T);
        assert_eq!(format_scaled(t, 1), "2.0T");
        let t = convert_to_unit(ScaledValue::new(512.0, Unit::M), Unit::T);
        assert_eq!(format_scaled(t, 1), "0.0T");
        let t = convert_to_unit(ScaledValue::raw(165144313856.0), Unit::T);
        assert_eq!(format_scaled(t, 1), "0.2T");
    }

    #[test]
    fn conversion_round_trips() {
        let samples = [
            ScaledValue::new(812.3, Unit::M),
            ScaledValue::new(23.09, Unit::T),
            ScaledValue::raw(165144313856.0),
            ScaledValue::new(1.0, Unit::P),
        ];
        for v in samples {
            for target in [Unit::None, Unit::K, Unit::G, Unit::T, Unit::P] {
                let back = convert_to_unit(convert_to_unit(v, target), v.unit);
                assert_eq!(back.unit, v.unit);
                assert!((back.magnitude - v.magnitude).abs() < 0.1, "{v:?} via {target:?}");
            }
        }
    }
}
