use crate::models::quota::{GraceValue, Limit, QuotaPair, QuotaRecord, Status};

/// Day counts this large come from an upstream timer wrap: once the grace
/// timer expires the tool reports ~49697 days and counts down from there.
/// Workaround for a tool defect; drop it once the tool is patched.
const WRAPPED_GRACE_DAYS: u32 = 10_000;

/// Finalize a freshly parsed record: fix known grace defects and derive the
/// per-pair and record status.
pub fn resolve(mut record: QuotaRecord) -> QuotaRecord {
    record.space = resolve_pair(record.space);
    record.files = resolve_pair(record.files);
    record.status = pair_status(&record.space).max(pair_status(&record.files));
    record
}

fn resolve_pair(mut pair: QuotaPair) -> QuotaPair {
    pair.grace = unwrap_grace(pair.grace);
    if pair.used.over && pair.grace == GraceValue::None && has_soft_limit(&pair.soft) {
        pair.grace = GraceValue::Unknown;
    }
    pair
}

pub fn unwrap_grace(grace: GraceValue) -> GraceValue {
    match grace {
        GraceValue::Days(n) if n >= WRAPPED_GRACE_DAYS => GraceValue::Days(0),
        other => other,
    }
}

fn has_soft_limit(soft: &Limit) -> bool {
    matches!(soft, Limit::Value(v) if !v.is_zero())
}

/// Status contributed by one pair. `Status` is ordered Ok < Unknown <
/// Exceeded so the record status is the max over its pairs.
pub fn pair_status(pair: &QuotaPair) -> Status {
    let hard_reached = match pair.hard {
        Limit::Value(hard) if !hard.is_zero() => pair.used.value.to_raw() >= hard.to_raw(),
        _ => false,
    };
    if pair.used.over || hard_reached || matches!(pair.grace, GraceValue::Days(_)) {
        return Status::Exceeded;
    }
    if pair.soft == Limit::Unknown || pair.grace == GraceValue::Unknown {
        return Status::Unknown;
    }
    Status::Ok
}

/// Grace column text; day counts always carry a space before the word.
pub fn grace_label(grace: GraceValue) -> String {
    match grace {
        GraceValue::None    => "none".to_string(),
        GraceValue::Unknown => "?".to_string(),
        GraceValue::Days(n) => format!("{} days", n),
    }
}

/// `5days`, `5day`, `5 days`, `49696days`
pub fn parse_day_count(token: &str) -> Option<u32> {
    let digits = token.trim_end_matches("days").trim_end_matches("day").trim();
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}
