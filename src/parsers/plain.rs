//! Output of the generic Linux `quota -v -w -s` tool:
//!
//! ```text
//! Disk quotas for group umcg-gcc (gid 55100050):
//!      Filesystem   space   quota   limit   grace   files   quota   limit   grace
//!       /dev/sdb1   2048M*  2000M   2500M   6days    1234       0       0
//! ```
//!
//! The grace column of a pair only appears while its used value carries `*`.

use super::{count_error, parse_limit, Attempt, ParseContext};
use crate::error::QuotaError;
use crate::models::quota::{GraceValue, Label, QuotaPair, QuotaRecord, Usage};
use crate::status::parse_day_count;
use crate::util::human::parse_scaled;

const BACKEND: &str = "plain";
const FIELDS: usize = 9;

pub fn parse(_entity: &str, raw: &str, ctx: &ParseContext) -> Vec<Attempt> {
    let mut attempts = Vec::new();
    let mut pending_fs: Option<&str> = None;

    for line in raw.lines() {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.is_empty() || line.trim_start().starts_with("Disk quotas") || tokens[0] == "Filesystem" {
            continue;
        }
        // long device names wrap onto their own line
        if tokens.len() == 1 {
            pending_fs = Some(tokens[0]);
            continue;
        }
        let mut full = Vec::with_capacity(FIELDS);
        if let Some(fs) = pending_fs.take() {
            full.push(fs);
        }
        full.extend(tokens);
        attempts.push(parse_block(&full, ctx));
    }
    attempts
}

fn parse_block(tokens: &[&str], ctx: &ParseContext) -> Attempt {
    let fields = normalize(tokens).ok_or_else(|| count_error(BACKEND, FIELDS, tokens.len()))?;
    if fields.len() != FIELDS {
        return Err(count_error(BACKEND, FIELDS, fields.len()));
    }

    let label = ctx.path.unwrap_or(fields[0]);
    let space = parse_pair(&fields[1..5])?;
    let files = parse_pair(&fields[5..9])?;

    Ok(Some(QuotaRecord::new(ctx.kind.quota_kind(), Label::plain(label), space, files)))
}

/// Insert a `-` grace for every pair that is not over quota.
fn normalize<'a>(tokens: &[&'a str]) -> Option<Vec<&'a str>> {
    if tokens.len() == FIELDS {
        return Some(tokens.to_vec());
    }
    let (fs, rest) = tokens.split_first()?;
    let mut out = vec![*fs];
    let mut i = 0;
    for _ in 0..2 {
        let used = rest.get(i)?;
        out.extend_from_slice(rest.get(i..i + 3)?);
        if used.ends_with('*') {
            out.push(rest.get(i + 3)?);
            i += 4;
        } else {
            out.push("-");
            i += 3;
        }
    }
    (i == rest.len()).then_some(out)
}

fn parse_pair(f: &[&str]) -> Result<QuotaPair, QuotaError> {
    let over = f[0].ends_with('*');
    let used = parse_scaled(f[0].trim_end_matches('*'))
        .map_err(|e| QuotaError::parse(BACKEND, e.to_string()))?;
    Ok(QuotaPair {
        used:  Usage { value: used, over },
        soft:  parse_limit(BACKEND, f[1])?,
        hard:  parse_limit(BACKEND, f[2])?,
        grace: parse_grace(f[3], over),
    })
}

fn parse_grace(token: &str, over: bool) -> GraceValue {
    match token {
        "" | "-" => GraceValue::None,
        // quota prints "none" once the grace period has run out
        "none" if over => GraceValue::Days(0),
        "none" => GraceValue::None,
        t if t.contains(':') => GraceValue::Days(0),
        t => parse_day_count(t).map(GraceValue::Days).unwrap_or(GraceValue::Unknown),
    }
}
