use crate::parsers::EntityKind;
use anyhow::{Context, Result};
use nix::unistd::{getgrouplist, getuid, Group, User};
use std::ffi::CString;

/// The account a report is produced for. Its home directory comes from
/// `groups.home_template`, not the passwd entry.
#[derive(Debug, Clone)]
pub struct Identity {
    pub user:   String,
    pub groups: Vec<GroupEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupEntry {
    pub name: String,
    pub gid:  u32,
}

/// The invoking user.
pub fn current() -> Result<Identity> {
    let user = User::from_uid(getuid())
        .context("user database lookup failed")?
        .ok_or_else(|| anyhow::anyhow!("no passwd entry for uid {}", getuid()))?;
    from_user(user)
}

pub fn lookup(name: &str) -> Result<Identity> {
    let user = User::from_name(name)
        .with_context(|| format!("user database lookup for {} failed", name))?
        .ok_or_else(|| anyhow::anyhow!("unknown user {}", name))?;
    from_user(user)
}

fn from_user(user: User) -> Result<Identity> {
    let cname = CString::new(user.name.as_str())?;
    let gids = getgrouplist(&cname, user.gid)
        .with_context(|| format!("cannot list groups of {}", user.name))?;

    let mut groups: Vec<GroupEntry> = Vec::with_capacity(gids.len());
    for gid in gids {
        match Group::from_gid(gid) {
            Ok(Some(g)) => {
                if !groups.iter().any(|e| e.gid == gid.as_raw()) {
                    groups.push(GroupEntry { name: g.name, gid: gid.as_raw() });
                }
            }
            Ok(None) => log::debug!("gid {} has no group entry", gid),
            Err(err) => log::warn!("group lookup for gid {} failed: {}", gid, err),
        }
    }

    Ok(Identity { user: user.name, groups })
}

/// Resolve a group named on the command line.
pub fn group(name: &str) -> Result<Option<GroupEntry>> {
    let g = Group::from_name(name).with_context(|| format!("group lookup for {} failed", name))?;
    Ok(g.map(|g| GroupEntry { name: g.name, gid: g.gid.as_raw() }))
}

/// Private when the group carries the user's name or sits in the private
/// GID range.
pub fn classify(group: &GroupEntry, user: &str, private_gid_max: u32) -> EntityKind {
    if group.name == user || group.gid < private_gid_max {
        EntityKind::PrivateGroup
    } else {
        EntityKind::RegularGroup
    }
}
