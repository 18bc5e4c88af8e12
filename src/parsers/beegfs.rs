//! Output of `beegfs-ctl --getquota --csv --gid GID --mount=PATH`:
//!
//! ```text
//! name,id,size,hard,files,hard
//! umcg-depad,55100128,165144313856,unlimited,1346,unlimited
//! ```
//!
//! BeeGFS knows no soft limits and no grace, so both are `Unknown`.

use super::{count_error, parse_limit, Attempt, ParseContext};
use crate::error::QuotaError;
use crate::models::quota::{GraceValue, Label, Limit, QuotaPair, QuotaRecord, Usage};
use crate::util::human::parse_scaled;

const BACKEND: &str = "beegfs";
const FIELDS: usize = 6;

pub fn parse(_entity: &str, raw: &str, ctx: &ParseContext) -> Vec<Attempt> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with("name,"))
        .map(|line| parse_line(line, ctx))
        .collect()
}

fn parse_line(line: &str, ctx: &ParseContext) -> Attempt {
    let f: Vec<&str> = line.split(',').map(str::trim).collect();
    if f.len() != FIELDS {
        return Err(count_error(BACKEND, FIELDS, f.len()));
    }

    let space = pair(f[2], f[3])?;
    let files = pair(f[4], f[5])?;
    let label = ctx.path.unwrap_or(f[0]);

    Ok(Some(QuotaRecord::new(ctx.kind.quota_kind(), Label::plain(label), space, files)))
}

fn pair(used: &str, hard: &str) -> Result<QuotaPair, QuotaError> {
    let used = parse_scaled(used).map_err(|e| QuotaError::parse(BACKEND, e.to_string()))?;
    Ok(QuotaPair {
        used:  Usage::new(used),
        soft:  Limit::Unknown,
        hard:  parse_limit(BACKEND, hard)?,
        grace: GraceValue::Unknown,
    })
}
