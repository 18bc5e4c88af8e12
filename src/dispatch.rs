//! Decides which quota tool to ask about which (entity, mount) pair and
//! feeds the answers through the backend parsers.

use crate::collectors::identity::GroupEntry;
use crate::collectors::mounts::{is_mount_point, owning_mount, MountEntry};
use crate::config::Config;
use crate::error::QuotaError;
use crate::models::quota::QuotaRecord;
use crate::parsers::{Backend, EntityKind, ParseContext};
use regex::Regex;
use std::path::{Path, PathBuf};

/// One external query and the parser its output goes to.
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    pub entity:  String,
    pub kind:    EntityKind,
    pub gid:     Option<u32>,
    pub backend: Backend,
    pub path:    Option<String>,
    pub argv:    Vec<String>,
}

pub struct Planner<'a> {
    pub cfg:       &'a Config,
    pub mounts:    &'a [MountEntry],
    pub sub_group: &'a Regex,
}

impl<'a> Planner<'a> {
    /// Jobs in report order: the user first, then each group.
    pub fn plan(
        &self,
        user: &str,
        groups: &[(GroupEntry, EntityKind)],
        list_dir: &dyn Fn(&Path) -> Vec<PathBuf>,
    ) -> Result<Vec<Job>, QuotaError> {
        let mut jobs: Vec<Job> = Vec::new();
        let has_plain = self.has_backend(Backend::Plain)?;

        if has_plain {
            push_unique(&mut jobs, Job {
                entity:  user.to_string(),
                kind:    EntityKind::User,
                gid:     None,
                backend: Backend::Plain,
                path:    None,
                argv:    self.quota_argv("-u", user),
            });
        }
        let home = PathBuf::from(self.cfg.home_dir(user));
        if let Some(job) = self.nfs4_job(user, EntityKind::User, None, &home)? {
            push_unique(&mut jobs, job);
        }

        for (group, kind) in groups {
            if has_plain {
                push_unique(&mut jobs, Job {
                    entity:  group.name.clone(),
                    kind:    *kind,
                    gid:     Some(group.gid),
                    backend: Backend::Plain,
                    path:    None,
                    argv:    self.quota_argv("-g", &group.name),
                });
            }

            let main = self
                .sub_group
                .captures(&group.name)
                .and_then(|c| c.name("main"))
                .map(|m| m.as_str())
                .unwrap_or(group.name.as_str());
            let group_dir = self.cfg.groups.root.join(main);

            for dir in list_dir(&group_dir) {
                if let Some(job) = self.dir_job(group, *kind, main, &dir)? {
                    push_unique(&mut jobs, job);
                }
            }
        }

        log::debug!("planned {} quota queries", jobs.len());
        Ok(jobs)
    }

    fn has_backend(&self, backend: Backend) -> Result<bool, QuotaError> {
        for m in self.mounts {
            if self.cfg.backend_for(&m.fstype)? == Some(backend) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn dir_job(&self, group: &GroupEntry, kind: EntityKind, main: &str, dir: &Path) -> Result<Option<Job>, QuotaError> {
        let mount = match owning_mount(self.mounts, dir) {
            Some(m) => m,
            None => return Ok(None),
        };
        let backend = match self.cfg.backend_for(&mount.fstype)? {
            Some(b) => b,
            None => {
                log::trace!("{}: fstype {} has no quota backend", dir.display(), mount.fstype);
                return Ok(None);
            }
        };
        let tools = &self.cfg.tools;
        let dir_str = dir.to_string_lossy().into_owned();

        let argv: Vec<String> = match backend {
            // covered by the per-group quota call
            Backend::Plain => return Ok(None),
            Backend::Nfs4 => return self.nfs4_job(&group.name, kind, Some(group.gid), dir),
            Backend::Lustre => vec![
                tools.lfs.clone(), "quota".into(), "-q".into(), "-h".into(),
                "-g".into(), group.name.clone(), dir_str.clone(),
            ],
            Backend::Gpfs => {
                let dir_name = dir.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
                let fileset = self
                    .cfg
                    .gpfs
                    .fileset_template
                    .replace("{group}", main)
                    .replace("{dir}", &dir_name);
                vec![
                    tools.mmlsquota.clone(), "-j".into(), fileset,
                    "--block-size".into(), "G".into(), mount.source.clone(),
                ]
            }
            Backend::BeeGfs => vec![
                tools.beegfs.clone(), "--getquota".into(), "--csv".into(),
                "--gid".into(), group.gid.to_string(), format!("--mount={}", mount.target),
            ],
        };

        // lfs prints the queried path itself; the others need it for the label
        let path = if backend == Backend::Lustre { None } else { Some(dir_str) };
        Ok(Some(Job { entity: group.name.clone(), kind, gid: Some(group.gid), backend, path, argv }))
    }

    fn nfs4_job(&self, entity: &str, kind: EntityKind, gid: Option<u32>, dir: &Path) -> Result<Option<Job>, QuotaError> {
        if !is_mount_point(self.mounts, dir) {
            return Ok(None);
        }
        let fstype = owning_mount(self.mounts, dir).map(|m| m.fstype.as_str()).unwrap_or("");
        if self.cfg.backend_for(fstype)? != Some(Backend::Nfs4) {
            return Ok(None);
        }
        let dir_str = dir.to_string_lossy().into_owned();
        Ok(Some(Job {
            entity:  entity.to_string(),
            kind,
            gid,
            backend: Backend::Nfs4,
            path:    Some(dir_str.clone()),
            argv:    vec![
                self.cfg.tools.df.clone(),
                "--block-size=1".into(),
                "--output=target,size,used,itotal,iused".into(),
                dir_str,
            ],
        }))
    }

    fn quota_argv(&self, flag: &str, name: &str) -> Vec<String> {
        vec![
            self.cfg.tools.quota.clone(), "-v".into(), "-w".into(), "-s".into(),
            flag.into(), name.into(),
        ]
    }
}

fn push_unique(jobs: &mut Vec<Job>, job: Job) {
    if !jobs.iter().any(|j| j.argv == job.argv) {
        jobs.push(job);
    }
}

/// Sub-directories of a group directory, sorted; missing dirs are empty.
pub fn list_group_dirs(dir: &Path) -> Vec<PathBuf> {
    let mut dirs: Vec<PathBuf> = match std::fs::read_dir(dir) {
        Ok(entries) => entries
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().map(|t| t.is_dir()).unwrap_or(false))
            .map(|e| e.path())
            .collect(),
        Err(err) => {
            log::trace!("{}: {}", dir.display(), err);
            Vec::new()
        }
    };
    dirs.sort();
    dirs
}

/// Execute jobs in order and parse their output into resolved records.
pub fn run(
    jobs: &[Job],
    invoking_user: &str,
    cfg: &Config,
    sub_group: &Regex,
    exec: &dyn Fn(&[String]) -> Option<String>,
) -> Vec<QuotaRecord> {
    let mut records = Vec::new();
    for job in jobs {
        log::trace!("running {:?}", job.argv);
        let raw = match exec(&job.argv) {
            Some(raw) => raw,
            None => continue,
        };
        let mut ctx = ParseContext::new(job.kind, invoking_user).with_gid(job.gid);
        ctx.private_gid_max = cfg.groups.private_gid_max;
        ctx.sub_group = Some(sub_group);
        if let Some(path) = job.path.as_deref() {
            ctx = ctx.with_path(path);
        }
        let parsed = job.backend.parse(&job.entity, &raw, &ctx);
        if parsed.is_empty() {
            log::debug!("{} query for {} gave no records", job.backend, job.entity);
        }
        records.extend(parsed);
    }
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collectors::mounts::parse_mounts;
    use crate::models::quota::{QuotaKind, Status};

    const MOUNTS: &str = "\
/dev/sda1 / ext4 rw 0 0
isilon:/ifs/home/alice /home/alice nfs4 rw 0 0
10.0.0.1@tcp:/umcgst10 /groups/umcg-gcc/tmp01 lustre rw 0 0
gpfs1 /groups/umcg-gcc/prm01 gpfs rw 0 0
beegfs_nodev /groups/umcg-gcc/scr01 beegfs rw 0 0
isilon:/ifs/umcg-gcc/dat01 /groups/umcg-gcc/dat01 nfs4 rw 0 0
";

    fn fixture() -> (Config, Vec<MountEntry>, Regex) {
        let cfg = Config::default();
        let re = cfg.sub_group_regex().unwrap();
        (cfg, parse_mounts(MOUNTS), re)
    }

    fn gcc_dirs(dir: &Path) -> Vec<PathBuf> {
        if dir == Path::new("/groups/umcg-gcc") {
            ["dat01", "prm01", "scr01", "tmp01", "tmp02"]
                .iter()
                .map(|d| dir.join(d))
                .collect()
        } else {
            Vec::new()
        }
    }

    fn groups() -> Vec<(GroupEntry, EntityKind)> {
        vec![
            (GroupEntry { name: "umcg-gcc".into(), gid: 55100050 }, EntityKind::RegularGroup),
            (GroupEntry { name: "umcg-gcc-rar1".into(), gid: 55100051 }, EntityKind::RegularGroup),
        ]
    }

    #[test]
    fn plans_jobs_in_discovery_order() {
        let (cfg, mounts, re) = fixture();
        let planner = Planner { cfg: &cfg, mounts: &mounts, sub_group: &re };
        let jobs = planner.plan("alice", &groups(), &gcc_dirs).unwrap();

        let summary: Vec<(Backend, &str)> = jobs.iter().map(|j| (j.backend, j.entity.as_str())).collect();
        assert_eq!(
            summary,
            vec![
                (Backend::Plain, "alice"),
                (Backend::Nfs4, "alice"),
                (Backend::Plain, "umcg-gcc"),
                (Backend::Nfs4, "umcg-gcc"),
                (Backend::Gpfs, "umcg-gcc"),
                (Backend::BeeGfs, "umcg-gcc"),
                (Backend::Lustre, "umcg-gcc"),
                // df and mmlsquota answers do not depend on the group
                (Backend::Plain, "umcg-gcc-rar1"),
                (Backend::BeeGfs, "umcg-gcc-rar1"),
                (Backend::Lustre, "umcg-gcc-rar1"),
            ]
        );

        let gpfs = &jobs[4];
        assert_eq!(gpfs.argv, ["/usr/lpp/mmfs/bin/mmlsquota", "-j", "prm01", "--block-size", "G", "gpfs1"]);
        assert_eq!(gpfs.path.as_deref(), Some("/groups/umcg-gcc/prm01"));
        let lustre = &jobs[9];
        assert_eq!(lustre.argv, ["lfs", "quota", "-q", "-h", "-g", "umcg-gcc-rar1", "/groups/umcg-gcc/tmp01"]);
        assert_eq!(jobs[5].argv[4], "55100050");
    }

    #[test]
    fn unknown_backend_tag_aborts_planning() {
        let (mut cfg, mounts, re) = fixture();
        cfg.backends.fstypes.insert("gpfs".into(), "spectrum".into());
        let planner = Planner { cfg: &cfg, mounts: &mounts, sub_group: &re };
        let err = planner.plan("alice", &groups(), &gcc_dirs).unwrap_err();
        assert_eq!(err, QuotaError::UnsupportedBackend("spectrum".into()));
    }

    #[test]
    fn runs_jobs_and_skips_silent_tools() {
        let (cfg, mounts, re) = fixture();
        let planner = Planner { cfg: &cfg, mounts: &mounts, sub_group: &re };
        let jobs = planner.plan("alice", &groups(), &gcc_dirs).unwrap();

        let exec = |argv: &[String]| -> Option<String> {
            let cmd = argv.join(" ");
            if cmd == "quota -v -w -s -u alice" {
                Some("/dev/sda1 1024M 2000M 2500M 1234 0 0\n".into())
            } else if cmd.starts_with("lfs") && cmd.contains("-g umcg-gcc ") {
                Some("/groups/umcg-gcc/tmp01 23.09T* 20T 25T 6d 1234 0 0 -\n".into())
            } else if cmd.starts_with("lfs") {
                Some("/groups/umcg-gcc/tmp01 1T 0k 0k - 10 0 0 -\n".into())
            } else {
                None
            }
        };
        let records = run(&jobs, "alice", &cfg, &re, &exec);
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].kind, QuotaKind::User);
        assert_eq!(records[0].status, Status::Ok);
        assert_eq!(records[1].kind, QuotaKind::RegularGroup);
        assert_eq!(records[1].status, Status::Exceeded);
        assert_eq!(records[2].label.text, "/groups/umcg-gcc-rar1/tmp01");
        assert!(records[2].label.highlight.is_some());
    }
}
