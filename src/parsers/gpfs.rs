//! Output of `mmlsquota -j FILESET --block-size G DEVICE`:
//!
//! ```text
//!                          Block Limits                                    |     File Limits
//! Filesystem Fileset    type      GB   quota   limit in_doubt    grace |    files   quota    limit in_doubt    grace  Remarks
//! gpfs1      prm01      FILESET  123     200     250        0     none |    12345       0        0        0     none
//! ```

use super::{count_error, Attempt, ParseContext};
use crate::error::QuotaError;
use crate::models::quota::{GraceValue, Label, Limit, QuotaKind, QuotaPair, QuotaRecord, Usage};
use crate::models::scaled::{ScaledValue, Unit};
use crate::status::parse_day_count;
use crate::util::human::{convert_to_unit, parse_scaled};

const BACKEND: &str = "gpfs";
const FIELDS: usize = 14;

pub fn parse(_entity: &str, raw: &str, ctx: &ParseContext) -> Vec<Attempt> {
    raw.lines()
        .filter(|line| {
            let t = line.trim();
            !t.is_empty() && !t.contains("Block Limits") && !t.starts_with("Filesystem")
        })
        .map(|line| parse_line(line, ctx))
        .collect()
}

fn parse_line(line: &str, ctx: &ParseContext) -> Attempt {
    let fields = join_grace_words(line.split_whitespace().collect());
    if fields.len() < FIELDS {
        return Err(count_error(BACKEND, FIELDS, fields.len()));
    }
    if fields[8] != "|" {
        return Err(QuotaError::parse(BACKEND, "missing block/file separator"));
    }

    let space = QuotaPair {
        used:  Usage::new(to_tebibytes_if_large(parse_gib(&fields[3])?)),
        soft:  Limit::Value(to_tebibytes_if_large(parse_gib(&fields[4])?)),
        hard:  Limit::Value(to_tebibytes_if_large(parse_gib(&fields[5])?)),
        grace: parse_grace(&fields[7]),
    };
    let files = QuotaPair {
        used:  Usage::new(parse_count(&fields[9])?),
        soft:  Limit::Value(parse_count(&fields[10])?),
        hard:  Limit::Value(parse_count(&fields[11])?),
        grace: parse_grace(&fields[13]),
    };

    let label = match ctx.path {
        Some(path) => path.to_string(),
        None => format!("{}/{}", fields[0], fields[1]),
    };
    Ok(Some(QuotaRecord::new(QuotaKind::Fileset, Label::plain(label), space, files)))
}

/// `6 days` and `2 hours` arrive as two tokens; glue them back together.
fn join_grace_words(tokens: Vec<&str>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tokens.len());
    for token in tokens {
        let is_word = matches!(token, "day" | "days" | "hour" | "hours" | "minute" | "minutes");
        match out.last_mut() {
            Some(prev) if is_word && prev.chars().all(|c| c.is_ascii_digit()) => {
                prev.push(' ');
                prev.push_str(token);
            }
            _ => out.push(token.to_string()),
        }
    }
    out
}

fn parse_gib(token: &str) -> Result<ScaledValue, QuotaError> {
    let v = parse_scaled(token).map_err(|e| QuotaError::parse(BACKEND, e.to_string()))?;
    if v.unit != Unit::None {
        return Err(QuotaError::parse(BACKEND, format!("expected plain GiB count, got {}", token)));
    }
    Ok(ScaledValue::new(v.magnitude, Unit::G))
}

fn parse_count(token: &str) -> Result<ScaledValue, QuotaError> {
    parse_scaled(token).map_err(|e| QuotaError::parse(BACKEND, e.to_string()))
}

fn to_tebibytes_if_large(v: ScaledValue) -> ScaledValue {
    if v.magnitude > 1024.0 { convert_to_unit(v, Unit::T) } else { v }
}

fn parse_grace(token: &str) -> GraceValue {
    match token {
        "none" | "-" => GraceValue::None,
        "expired" => GraceValue::Days(0),
        t if t.ends_with("hours") || t.ends_with("hour") || t.contains("minute") => GraceValue::Days(0),
        t => parse_day_count(t).map(GraceValue::Days).unwrap_or(GraceValue::Unknown),
    }
}
