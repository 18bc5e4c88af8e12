//! Output of `lfs quota -q -h -g GROUP PATH`:
//!
//! ```text
//! Disk quotas for grp umcg-gcc (gid 55100050):
//!      Filesystem    used   quota   limit   grace   files   quota   limit   grace
//! /groups/umcg-gcc/tmp01
//!                 23.09T*     20T     25T 6d23h59m59s  1234       0       0       -
//! ```

use super::{count_error, parse_limit, Attempt, EntityKind, ParseContext};
use crate::error::QuotaError;
use crate::models::quota::{GraceValue, Label, QuotaKind, QuotaPair, QuotaRecord, Usage};
use crate::util::human::parse_scaled;
use regex::Regex;
use std::sync::LazyLock;

const BACKEND: &str = "lustre";
const FIELDS: usize = 9;

static GID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(gid (\d+)\)").expect("static regex"));

/// `6d23h59m59s`, `23h10m`, `59m59s`
static LFS_GRACE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:(\d+)w)?(?:(\d+)d)?(?:\d+h)?(?:\d+m)?(?:\d+s)?$").expect("static regex")
});

pub fn parse(entity: &str, raw: &str, ctx: &ParseContext) -> Vec<Attempt> {
    let mut gid = ctx.gid;
    let mut tokens: Vec<&str> = Vec::new();

    for line in raw.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with("Disk quotas") {
            if gid.is_none() {
                gid = GID_RE.captures(trimmed).and_then(|c| c[1].parse().ok());
            }
            continue;
        }
        if trimmed.starts_with("Filesystem") {
            continue;
        }
        // blocks are a path followed by numbers; lfs also prints prose
        // such as "Some errors happened when getting quota info."
        let numeric = |t: &str| t.starts_with(|c: char| c.is_ascii_digit() || c == '[');
        match trimmed.split_whitespace().next() {
            Some(first) if first.starts_with('/') || numeric(first) => {}
            Some(_) => {
                log::trace!("lfs: ignoring {:?}", trimmed);
                continue;
            }
            None => continue,
        }
        tokens.extend(trimmed.split_whitespace());
    }

    // every block starts with the filesystem path
    let mut blocks: Vec<Vec<&str>> = Vec::new();
    for token in tokens {
        match blocks.last_mut() {
            Some(block) if !token.starts_with('/') => block.push(token),
            _ => blocks.push(vec![token]),
        }
    }

    let kind = classify(entity, ctx, gid);
    blocks
        .iter()
        .map(|block| parse_block(entity, block, kind, ctx))
        .collect()
}

/// Private when the GID is below the private range limit or the group is
/// named after the invoking user.
fn classify(entity: &str, ctx: &ParseContext, gid: Option<u32>) -> QuotaKind {
    if !ctx.kind.is_group() {
        return QuotaKind::User;
    }
    let private = entity == ctx.invoking_user
        || gid.map(|g| g < ctx.private_gid_max).unwrap_or(ctx.kind == EntityKind::PrivateGroup);
    if private { QuotaKind::PrivateGroup } else { QuotaKind::RegularGroup }
}

fn parse_block(entity: &str, block: &[&str], kind: QuotaKind, ctx: &ParseContext) -> Attempt {
    if block.len() != FIELDS {
        return Err(count_error(BACKEND, FIELDS, block.len()));
    }
    if !block[0].starts_with('/') {
        return Err(QuotaError::parse(BACKEND, format!("not a filesystem path: {}", block[0])));
    }
    let fields: Vec<&str> = block
        .iter()
        .map(|t| t.trim_start_matches('[').trim_end_matches(']'))
        .collect();

    let space = parse_pair(&fields[1..5])?;
    let files = parse_pair(&fields[5..9])?;
    let label = sub_group_label(entity, fields[0], ctx);

    Ok(Some(QuotaRecord::new(kind, label, space, files)))
}

/// `umcg-gcc-rar2` queried on `/groups/umcg-gcc/prm03` is shown as
/// `/groups/umcg-gcc-rar2/prm03` with `-rar2` highlighted.
fn sub_group_label(entity: &str, path: &str, ctx: &ParseContext) -> Label {
    let caps = match ctx.sub_group.and_then(|re| re.captures(entity)) {
        Some(c) => c,
        None => return Label::plain(path),
    };
    let (main, sub) = match (caps.name("main"), caps.name("sub")) {
        (Some(m), Some(s)) => (m.as_str(), s.as_str()),
        _ => return Label::plain(path),
    };

    let segment = format!("/{}", main);
    let at = path.match_indices(&segment).find_map(|(i, _)| {
        let end = i + segment.len();
        (end == path.len() || path[end..].starts_with('/')).then_some(end)
    });
    match at {
        Some(end) => {
            let inserted = format!("-{}", sub);
            let text = format!("{}{}{}", &path[..end], inserted, &path[end..]);
            Label { text, highlight: Some(end..end + inserted.len()) }
        }
        None => Label::plain(path),
    }
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
        "-" | "" => GraceValue::None,
        "none" if over => GraceValue::Days(0),
        "none" => GraceValue::None,
        "expired" => GraceValue::Days(0),
        t => match LFS_GRACE_RE.captures(t) {
            Some(c) => {
                let count = |i: usize| c.get(i).map_or(Some(0), |m| m.as_str().parse::<u32>().ok());
                count(1)
                    .and_then(|weeks| weeks.checked_mul(7))
                    .zip(count(2))
                    .and_then(|(weeks, days)| weeks.checked_add(days))
                    .map(GraceValue::Days)
                    .unwrap_or(GraceValue::Unknown)
            }
            None => GraceValue::Unknown,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::quota::{Limit, Status};
    use crate::models::scaled::{ScaledValue, Unit};
    use crate::parsers::Backend;

    const OVER: &str = "Disk quotas for grp umcg-gcc (gid 50100050):\n     Filesystem    used   quota   limit   grace   files   quota   limit   grace\n/groups/umcg-gcc/tmp01\n                23.09T*     20T     25T 6d23h59m59s  1234       0       0       -\n";

    fn sub_group_re() -> Regex {
        Regex::new(crate::config::DEFAULT_SUB_GROUP_PATTERN).unwrap()
    }

    #[test]
    fn asterisk_marks_space_exceeded() {
        let ctx = ParseContext::new(EntityKind::RegularGroup, "alice");
        let records = Backend::Lustre.parse("umcg-gcc", OVER, &ctx);
        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.label.text, "/groups/umcg-gcc/tmp01");
        assert_eq!(r.space.used.value, ScaledValue::new(23.09, Unit::T));
        assert!(r.space.used.over);
        assert_eq!(r.space.hard, Limit::Value(ScaledValue::new(25.0, Unit::T)));
        assert_eq!(r.space.grace, GraceValue::Days(6));
        assert_eq!(r.files.grace, GraceValue::None);
        assert_eq!(r.status, Status::Exceeded);
    }

    #[test]
    fn gid_range_decides_private_vs_regular() {
        let ctx = ParseContext::new(EntityKind::RegularGroup, "alice");
        let r = &Backend::Lustre.parse("umcg-gcc", OVER, &ctx)[0];
        assert_eq!(r.kind, QuotaKind::PrivateGroup);

        let regular = OVER.replace("50100050", "55100128");
        let r = &Backend::Lustre.parse("umcg-gcc", &regular, &ctx)[0];
        assert_eq!(r.kind, QuotaKind::RegularGroup);

        // context GID wins over the header
        let ctx = ctx.with_gid(Some(55200000));
        let r = &Backend::Lustre.parse("umcg-gcc", OVER, &ctx)[0];
        assert_eq!(r.kind, QuotaKind::RegularGroup);
    }

    #[test]
    fn group_named_after_user_is_private() {
        let ctx = ParseContext::new(EntityKind::RegularGroup, "umcg-gcc").with_gid(Some(60000000));
        let r = &Backend::Lustre.parse("umcg-gcc", OVER, &ctx)[0];
        assert_eq!(r.kind, QuotaKind::PrivateGroup);
    }

    #[test]
    fn quiet_output_with_several_filesystems() {
        let raw = "/groups/umcg-gcc/prm01 1.2G 10G 12G - 100 0 0 -\n/groups/umcg-gcc/tmp01 [0] 0k 0k - 0 [0] [0] -\n";
        let ctx = ParseContext::new(EntityKind::RegularGroup, "alice").with_gid(Some(55100128));
        let records = Backend::Lustre.parse("umcg-gcc", raw, &ctx);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].status, Status::Ok);
        assert_eq!(records[1].label.text, "/groups/umcg-gcc/tmp01");
        assert_eq!(records[1].space.used.value, ScaledValue::raw(0.0));
    }

    #[test]
    fn truncated_block_is_dropped() {
        let raw = "/groups/umcg-gcc/prm01 1.2G 10G 12G -\n/groups/umcg-gcc/tmp01 1k 0k 0k - 0 0 0 -\n";
        let ctx = ParseContext::new(EntityKind::RegularGroup, "alice");
        let records = Backend::Lustre.parse("umcg-gcc", raw, &ctx);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].label.text, "/groups/umcg-gcc/tmp01");
    }

    #[test]
    fn sub_group_segment_is_highlighted() {
        let re = sub_group_re();
        let mut ctx = ParseContext::new(EntityKind::RegularGroup, "alice");
        ctx.sub_group = Some(&re);
        let raw = "/groups/umcg-gcc/prm03 1G 2G 3G - 1 0 0 -\n";
        let r = &Backend::Lustre.parse("umcg-gcc-rar2", raw, &ctx)[0];
        assert_eq!(r.label.text, "/groups/umcg-gcc-rar2/prm03");
        let range = r.label.highlight.clone().unwrap();
        assert_eq!(&r.label.text[range], "-rar2");
    }

    #[test]
    fn unrelated_path_keeps_plain_label() {
        let re = sub_group_re();
        let mut ctx = ParseContext::new(EntityKind::RegularGroup, "alice");
        ctx.sub_group = Some(&re);
        let raw = "/groups/umcg-gccx/prm03 1G 2G 3G - 1 0 0 -\n";
        let r = &Backend::Lustre.parse("umcg-gcc-rar2", raw, &ctx)[0];
        assert_eq!(r.label, Label::plain("/groups/umcg-gccx/prm03"));
    }

    #[test]
    fn grace_spellings() {
        assert_eq!(parse_grace("-", true), GraceValue::None);
        assert_eq!(parse_grace("none", true), GraceValue::Days(0));
        assert_eq!(parse_grace("none", false), GraceValue::None);
        assert_eq!(parse_grace("expired", false), GraceValue::Days(0));
        assert_eq!(parse_grace("23h10m", true), GraceValue::Days(0));
        assert_eq!(parse_grace("1w2d3h", true), GraceValue::Days(9));
        assert_eq!(parse_grace("soon", true), GraceValue::Unknown);
    }

    #[test]
    fn oversized_grace_is_unknown() {
        assert_eq!(parse_grace("999999999w", true), GraceValue::Unknown);
        assert_eq!(parse_grace("99999999999d", true), GraceValue::Unknown);
        assert_eq!(parse_grace("613566756w6d", true), GraceValue::Unknown);
    }

    #[test]
    fn trailing_lfs_warning_keeps_the_record() {
        let raw = "/groups/umcg-gcc/tmp01 [1.2T] 20T 25T - 1234 0 0 -\n\
Some errors happened when getting quota info. Some devices may be not working or deactivated. The data in \"[]\" is inaccurate.\n";
        let ctx = ParseContext::new(EntityKind::RegularGroup, "alice").with_gid(Some(55100128));
        let records = Backend::Lustre.parse("umcg-gcc", raw, &ctx);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].space.used.value, ScaledValue::new(1.2, Unit::T));
        assert_eq!(records[0].status, Status::Ok);
    }

    #[test]
    fn user_quota_is_user_kind() {
        let ctx = ParseContext::new(EntityKind::User, "alice");
        let raw = "/home 1G 2G 3G - 1 0 0 -\n";
        assert_eq!(Backend::Lustre.parse("alice", raw, &ctx)[0].kind, QuotaKind::User);
    }
}
