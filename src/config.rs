use crate::error::QuotaError;
use crate::parsers::Backend;
use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Groups with a GID below this are private (one-user) groups.
pub const DEFAULT_PRIVATE_GID_MAX: u32 = 55_100_000;

/// Sub-groups share the parent group's directories: `umcg-gcc-rar2`.
pub const DEFAULT_SUB_GROUP_PATTERN: &str = r"^(?P<main>.+)-(?P<sub>rar\d+)$";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub groups: GroupsConfig,

    #[serde(default)]
    pub backends: BackendsConfig,

    #[serde(default)]
    pub gpfs: GpfsConfig,

    #[serde(default)]
    pub tools: ToolsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// No terminal escapes, byte-stable output for logs
    pub plain_text: bool,
    /// Report all space values in tebibytes
    pub tebibytes:  bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupsConfig {
    /// Parent of the per-group directories, e.g. /groups/umcg-gcc/prm01
    pub root:              PathBuf,
    pub private_gid_max:   u32,
    /// Regex with `main` and `sub` captures
    pub sub_group_pattern: String,
    /// `{user}` is replaced by the user name
    pub home_template:     String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendsConfig {
    /// Mount fstype → backend tag (plain, lustre, gpfs, beegfs, nfs4)
    pub fstypes: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GpfsConfig {
    /// `{group}` and `{dir}` are replaced; dir is the sub-directory name
    pub fileset_template: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub quota:     String,
    pub lfs:       String,
    pub mmlsquota: String,
    pub beegfs:    String,
    pub df:        String,
}

// ── Defaults ─────────────────────────────────────────────────────────

impl Default for Config {
    fn default() -> Self {
        Self {
            general:  GeneralConfig::default(),
            groups:   GroupsConfig::default(),
            backends: BackendsConfig::default(),
            gpfs:     GpfsConfig::default(),
            tools:    ToolsConfig::default(),
        }
    }
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self { plain_text: false, tebibytes: false }
    }
}

impl Default for GroupsConfig {
    fn default() -> Self {
        Self {
            root:              PathBuf::from("/groups"),
            private_gid_max:   DEFAULT_PRIVATE_GID_MAX,
            sub_group_pattern: DEFAULT_SUB_GROUP_PATTERN.to_string(),
            home_template:     "/home/{user}".to_string(),
        }
    }
}

impl Default for BackendsConfig {
    fn default() -> Self {
        let fstypes = [
            ("ext4", "plain"),
            ("xfs", "plain"),
            ("lustre", "lustre"),
            ("gpfs", "gpfs"),
            ("beegfs", "beegfs"),
            ("nfs4", "nfs4"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        Self { fstypes }
    }
}

impl Default for GpfsConfig {
    fn default() -> Self {
        Self { fileset_template: "{dir}".to_string() }
    }
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            quota:     "quota".into(),
            lfs:       "lfs".into(),
            mmlsquota: "/usr/lpp/mmfs/bin/mmlsquota".into(),
            beegfs:    "beegfs-ctl".into(),
            df:        "df".into(),
        }
    }
}

// ── Load / Save ───────────────────────────────────────────────────────

impl Config {
    /// Load the user's config, falling back to defaults when there is none.
    pub fn load() -> Self {
        match try_load() {
            Ok(c)  => c,
            Err(err) => {
                log::debug!("using default config: {:#}", err);
                // Write defaults on first run (best-effort)
                let _ = try_write_defaults();
                Config::default()
            }
        }
    }

    /// Load an explicitly named config file; errors are reported.
    pub fn load_from(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("cannot read config {}", path.display()))?;
        let cfg: Config = toml::from_str(&text)
            .with_context(|| format!("invalid config {}", path.display()))?;
        Ok(cfg)
    }

    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("quota-report").join("quota-report.toml"))
    }

    /// Backend for a mount fstype, `None` when the fstype has no quotas.
    /// An unknown backend tag in the map is a configuration contract error.
    pub fn backend_for(&self, fstype: &str) -> Result<Option<Backend>, QuotaError> {
        self.backends
            .fstypes
            .get(fstype)
            .map(|tag| tag.parse())
            .transpose()
    }

    pub fn sub_group_regex(&self) -> Result<Regex> {
        Regex::new(&self.groups.sub_group_pattern)
            .with_context(|| format!("invalid sub_group_pattern {:?}", self.groups.sub_group_pattern))
    }

    /// Reject configurations that can never produce a report.
    pub fn validate(&self) -> Result<()> {
        for tag in self.backends.fstypes.values() {
            tag.parse::<Backend>()?;
        }
        let re = self.sub_group_regex()?;
        anyhow::ensure!(
            re.capture_names().flatten().any(|n| n == "main")
                && re.capture_names().flatten().any(|n| n == "sub"),
            "sub_group_pattern needs `main` and `sub` capture groups"
        );
        anyhow::ensure!(
            self.groups.home_template.contains("{user}"),
            "home_template must contain {{user}}"
        );
        Ok(())
    }

    pub fn home_dir(&self, user: &str) -> String {
        self.groups.home_template.replace("{user}", user)
    }
}

fn try_load() -> Result<Config> {
    let path = Config::config_path().ok_or_else(|| anyhow::anyhow!("no config dir"))?;
    Config::load_from(&path)
}

fn try_write_defaults() -> Result<()> {
    let path = Config::config_path().ok_or_else(|| anyhow::anyhow!("no config dir"))?;
    if path.exists() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let text = toml::to_string_pretty(&Config::default())?;
    fs::write(path, format!("# quota-report configuration\n# Generated on first run, edit freely\n\n{}", text))?;
    Ok(())
}
