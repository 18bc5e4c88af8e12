use crate::models::quota::{Limit, QuotaKind, QuotaPair, QuotaRecord};
use crate::models::scaled::{ScaledValue, Unit};
use crate::status::grace_label;
use crate::util::human::{convert_to_unit, format_scaled};
use crate::util::style;

const COL: usize = 9;
const PAIR: usize = 4 * COL + 3;
const PRECISION: usize = 1;

#[derive(Debug, Clone, Copy, Default)]
pub struct ReportOptions {
    /// No escape codes at all
    pub plain_text:             bool,
    /// Space columns in tebibytes; file counts are never converted
    pub normalize_to_tebibytes: bool,
}

/// Layout shared by every line of one report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportContext {
    pub label_width: usize,
}

impl ReportContext {
    pub fn new(records: &[QuotaRecord]) -> Self {
        let label_width = records.iter().map(|r| r.label.width()).max().unwrap_or(0);
        Self { label_width }
    }

    /// `(u) ` plus the label column
    fn lead_width(&self) -> usize {
        4 + self.label_width
    }

    fn line_width(&self) -> usize {
        self.lead_width() + 3 + PAIR + 3 + PAIR + 3 + "EXCEEDED!".len()
    }
}

/// Render the whole report: header, one line per record in input order,
/// separators between kinds.
pub fn render(records: &[QuotaRecord], opts: &ReportOptions) -> Vec<String> {
    let ctx = ReportContext::new(records);
    let width = ctx.line_width();
    let mut out = Vec::with_capacity(records.len() + 6);

    out.push("=".repeat(width));
    out.push(format!(
        "{:<lead$} | {:^PAIR$} | {:^PAIR$} |",
        "",
        "Total size of files and folders",
        "Total number of files and folders",
        lead = ctx.lead_width(),
    ));
    out.push(format!(
        "{:<lead$} | {} | {} | {}",
        header_label(ctx.lead_width()),
        header_pair(),
        header_pair(),
        "status",
        lead = ctx.lead_width(),
    ));
    out.push("-".repeat(width));

    let mut prev_kind: Option<QuotaKind> = None;
    for record in records {
        if prev_kind.is_some_and(|k| k != record.kind) {
            out.push("-".repeat(width));
        }
        out.push(render_line(record, &ctx, opts));
        prev_kind = Some(record.kind);
    }

    out.push("=".repeat(width));
    out
}

/// `(kind) label | used quota limit grace | used quota limit grace | status`
pub fn render_line(record: &QuotaRecord, ctx: &ReportContext, opts: &ReportOptions) -> String {
    let pad = ctx.label_width.saturating_sub(record.label.width());
    format!(
        "{} {}{} | {} | {} | {}",
        record.kind.tag(),
        style::label(&record.label, opts.plain_text),
        " ".repeat(pad),
        pair_columns(&record.space, opts.normalize_to_tebibytes),
        pair_columns(&record.files, false),
        style::status(record.status, opts.plain_text),
    )
}

fn pair_columns(pair: &QuotaPair, tebibytes: bool) -> String {
    let scale = |v: ScaledValue| if tebibytes { convert_to_unit(v, Unit::T) } else { v };
    let limit = |l: Limit| match l {
        Limit::Value(v)  => format_scaled(scale(v), PRECISION),
        Limit::Unlimited => "unlimited".to_string(),
        Limit::Unknown   => "?".to_string(),
    };
    format!(
        "{:>COL$} {:>COL$} {:>COL$} {:>COL$}",
        format_scaled(scale(pair.used.value), PRECISION),
        limit(pair.soft),
        limit(pair.hard),
        grace_label(pair.grace),
    )
}

fn header_pair() -> String {
    format!("{:>COL$} {:>COL$} {:>COL$} {:>COL$}", "used", "quota", "limit", "grace")
}

fn header_label(lead: usize) -> &'static str {
    ["(t) Path/Filesystem", "Path/Filesystem", "Path"]
        .into_iter()
        .find(|h| h.len() <= lead)
        .unwrap_or("")
}
