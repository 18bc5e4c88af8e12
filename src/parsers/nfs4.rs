//! Isilon directory quotas exported over NFS4 have no quota tool; the
//! quota shows up as the size of the mount. Input is
//! `df --block-size=1 --output=target,size,used,itotal,iused PATH`:
//!
//! ```text
//! Mounted on             1B-blocks         Used  Inodes  IUsed
//! /groups/umcg-gcc/dat01 10995116277760 5497558138880 1000000 12345
//! ```

use super::{count_error, parse_limit, Attempt, ParseContext};
use crate::error::QuotaError;
use crate::models::quota::{GraceValue, Label, Limit, QuotaKind, QuotaPair, QuotaRecord, Usage};
use crate::models::scaled::ScaledValue;
use crate::util::human::parse_scaled;

const BACKEND: &str = "nfs4";
const FIELDS: usize = 5;

pub fn parse(_entity: &str, raw: &str, ctx: &ParseContext) -> Vec<Attempt> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with("Mounted on"))
        .map(|line| parse_line(line, ctx))
        .collect()
}

fn parse_line(line: &str, ctx: &ParseContext) -> Attempt {
    let f: Vec<&str> = line.split_whitespace().collect();
    if f.len() != FIELDS {
        return Err(count_error(BACKEND, FIELDS, f.len()));
    }
    // df on a plain sub-directory reports the parent mount: no directory quota
    if let Some(path) = ctx.path {
        if f[0].trim_end_matches('/') != path.trim_end_matches('/') {
            log::trace!("{} is served by {}, not a directory quota", path, f[0]);
            return Ok(None);
        }
    }

    let space = pair(f[2], f[1])?;
    let files = pair(f[4], f[3])?;

    Ok(Some(QuotaRecord::new(QuotaKind::Fileset, Label::plain(f[0]), space, files)))
}

fn pair(used: &str, hard: &str) -> Result<QuotaPair, QuotaError> {
    let used = match used {
        "-" => ScaledValue::raw(0.0),
        u => parse_scaled(u).map_err(|e| QuotaError::parse(BACKEND, e.to_string()))?,
    };
    Ok(QuotaPair {
        used:  Usage::new(used),
        soft:  Limit::Unknown,
        hard:  parse_limit(BACKEND, hard)?,
        grace: GraceValue::Unknown,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::quota::Status;
    use crate::parsers::{Backend, EntityKind};

    const DF: &str = "Mounted on             1B-blocks         Used  Inodes  IUsed\n/groups/umcg-gcc/dat01 10995116277760 5497558138880 1000000 12345\n";

    #[test]
    fn distinct_mount_gives_fileset_record() {
        let ctx = ParseContext::new(EntityKind::RegularGroup, "alice").with_path("/groups/umcg-gcc/dat01");
        let records = Backend::Nfs4.parse("umcg-gcc", DF, &ctx);
        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.kind, QuotaKind::Fileset);
        assert_eq!(r.label.text, "/groups/umcg-gcc/dat01");
        assert_eq!(r.space.hard, Limit::Value(ScaledValue::raw(10995116277760.0)));
        assert_eq!(r.space.used.value, ScaledValue::raw(5497558138880.0));
        assert_eq!(r.space.soft, Limit::Unknown);
        assert_eq!(r.files.used.value, ScaledValue::raw(12345.0));
        assert_eq!(r.status, Status::Unknown);
    }

    #[test]
    fn parent_mount_yields_nothing() {
        let ctx = ParseContext::new(EntityKind::RegularGroup, "alice").with_path("/groups/umcg-gcc/dat02");
        assert!(Backend::Nfs4.parse("umcg-gcc", DF, &ctx).is_empty());
    }

    #[test]
    fn full_directory_is_exceeded() {
        let raw = "/home/alice 1000 1000 - -\n";
        let ctx = ParseContext::new(EntityKind::User, "alice").with_path("/home/alice/");
        let r = &Backend::Nfs4.parse("alice", raw, &ctx)[0];
        assert_eq!(r.files.hard, Limit::Unlimited);
        assert_eq!(r.status, Status::Exceeded);
    }
}
