pub mod beegfs;
pub mod gpfs;
pub mod lustre;
pub mod nfs4;
pub mod plain;

use crate::error::QuotaError;
use crate::models::quota::{Limit, QuotaKind, QuotaRecord};
use crate::status;
use crate::util::human::parse_scaled;
use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// The quota sources the engine knows how to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Backend {
    Plain,
    Lustre,
    Gpfs,
    BeeGfs,
    Nfs4,
}

impl Backend {
    pub fn name(&self) -> &'static str {
        match self {
            Backend::Plain  => "plain",
            Backend::Lustre => "lustre",
            Backend::Gpfs   => "gpfs",
            Backend::BeeGfs => "beegfs",
            Backend::Nfs4   => "nfs4",
        }
    }

    /// Parse one tool output into resolved records. Blocks that do not
    /// match the backend's layout are logged and skipped.
    pub fn parse(&self, entity: &str, raw: &str, ctx: &ParseContext) -> Vec<QuotaRecord> {
        let attempts = match self {
            Backend::Plain  => plain::parse(entity, raw, ctx),
            Backend::Lustre => lustre::parse(entity, raw, ctx),
            Backend::Gpfs   => gpfs::parse(entity, raw, ctx),
            Backend::BeeGfs => beegfs::parse(entity, raw, ctx),
            Backend::Nfs4   => nfs4::parse(entity, raw, ctx),
        };

        attempts
            .into_iter()
            .filter_map(|attempt| match attempt {
                Ok(Some(record)) => Some(status::resolve(record)),
                Ok(None) => None,
                Err(err) => {
                    log::debug!("skipping block for {}: {}", entity, err);
                    None
                }
            })
            .collect()
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Backend {
    type Err = QuotaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "plain" | "quota" => Ok(Backend::Plain),
            "lustre"          => Ok(Backend::Lustre),
            "gpfs"            => Ok(Backend::Gpfs),
            "beegfs"          => Ok(Backend::BeeGfs),
            "nfs4" | "isilon" => Ok(Backend::Nfs4),
            _                 => Err(QuotaError::UnsupportedBackend(s.to_string())),
        }
    }
}

/// Classification hint the dispatcher has for an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EntityKind {
    User,
    PrivateGroup,
    RegularGroup,
    AdminGroup,
}

impl EntityKind {
    pub fn quota_kind(&self) -> QuotaKind {
        match self {
            EntityKind::User         => QuotaKind::User,
            EntityKind::PrivateGroup => QuotaKind::PrivateGroup,
            EntityKind::RegularGroup |
            EntityKind::AdminGroup   => QuotaKind::RegularGroup,
        }
    }

    pub fn is_group(&self) -> bool {
        !matches!(self, EntityKind::User)
    }
}

/// Everything a parser may need besides the raw text.
#[derive(Debug, Clone)]
pub struct ParseContext<'a> {
    pub kind:            EntityKind,
    pub invoking_user:   &'a str,
    pub gid:             Option<u32>,
    /// Directory the query was made for; label override and NFS4 mount check.
    pub path:            Option<&'a str>,
    pub private_gid_max: u32,
    pub sub_group:       Option<&'a Regex>,
}

impl<'a> ParseContext<'a> {
    pub fn new(kind: EntityKind, invoking_user: &'a str) -> Self {
        Self {
            kind,
            invoking_user,
            gid: None,
            path: None,
            private_gid_max: crate::config::DEFAULT_PRIVATE_GID_MAX,
            sub_group: None,
        }
    }

    pub fn with_gid(mut self, gid: Option<u32>) -> Self {
        self.gid = gid;
        self
    }

    pub fn with_path(mut self, path: &'a str) -> Self {
        self.path = Some(path);
        self
    }
}

pub(crate) type Attempt = Result<Option<QuotaRecord>, QuotaError>;

/// A limit column: a number, or one of the spellings tools use for "no limit".
pub(crate) fn parse_limit(backend: &'static str, token: &str) -> Result<Limit, QuotaError> {
    match token {
        "unlimited" | "none" | "-" => Ok(Limit::Unlimited),
        _ => parse_scaled(token)
            .map(Limit::Value)
            .map_err(|e| QuotaError::parse(backend, e.to_string())),
    }
}

pub(crate) fn count_error(backend: &'static str, want: usize, got: usize) -> QuotaError {
    QuotaError::parse(backend, format!("expected {} fields, got {}", want, got))
}
