use crate::models::scaled::ScaledValue;
use serde::Serialize;
use std::ops::Range;

/// Which quota semantics a report line carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum QuotaKind {
    User,
    PrivateGroup,
    RegularGroup,
    Fileset,
}

impl QuotaKind {
    pub fn tag(&self) -> &'static str {
        match self {
            QuotaKind::User         => "(u)",
            QuotaKind::PrivateGroup => "(p)",
            QuotaKind::RegularGroup => "(r)",
            QuotaKind::Fileset      => "(f)",
        }
    }
}

/// Display label of a record. `highlight` is a byte range into `text`
/// marking a sub-group segment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Label {
    pub text:      String,
    #[serde(skip)]
    pub highlight: Option<Range<usize>>,
}

impl Label {
    pub fn plain(text: impl Into<String>) -> Self {
        Self { text: text.into(), highlight: None }
    }

    /// Visible width in terminal columns.
    pub fn width(&self) -> usize {
        self.text.chars().count()
    }
}

/// A used value together with the over-quota marker (`*`) of the source.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Usage {
    pub value: ScaledValue,
    pub over:  bool,
}

impl Usage {
    pub fn new(value: ScaledValue) -> Self {
        Self { value, over: false }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum Limit {
    Value(ScaledValue),
    Unlimited,
    /// The backend has no way to report this limit.
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GraceValue {
    None,
    Unknown,
    Days(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Status {
    Ok,
    Unknown,
    Exceeded,
}

impl Status {
    pub fn label(&self) -> &'static str {
        match self {
            Status::Ok       => "Ok",
            Status::Unknown  => "Unknown",
            Status::Exceeded => "EXCEEDED!",
        }
    }
}

/// used / soft / hard / grace for either space or file count.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct QuotaPair {
    pub used:  Usage,
    pub soft:  Limit,
    pub hard:  Limit,
    pub grace: GraceValue,
}

/// One report line. Built by a backend parser, finalized by
/// `status::resolve` and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuotaRecord {
    pub kind:   QuotaKind,
    pub label:  Label,
    pub space:  QuotaPair,
    pub files:  QuotaPair,
    pub status: Status,
}

impl QuotaRecord {
    /// Status stays `Unknown` until the resolver has run.
    pub fn new(kind: QuotaKind, label: Label, space: QuotaPair, files: QuotaPair) -> Self {
        Self { kind, label, space, files, status: Status::Unknown }
    }
}
