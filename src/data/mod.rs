//! On-disk layout of the simulation output consumed by the dashboard.
//!
//! `data/<batch>/<allocation>/` holds one set of files per replicate:
//! `model_vars_rep_<r>.csv`, `roi_rep_<r>.json`, `network_rep_<r>.json`
//! and, for older batches, `network_rep_<r>_timestep_<t>.adjlist`.

pub mod catalog;
pub mod loader;
pub mod table;

use sha2::{Digest, Sha256};
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::params::Parameters;

#[derive(Debug, Clone)]
pub struct DataLayout {
    root: PathBuf,
}

impl DataLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn batch_dir(&self, params: &Parameters) -> PathBuf {
        self.root.join(params.batch_name())
    }

    pub fn run_dir(&self, params: &Parameters) -> PathBuf {
        self.batch_dir(params).join(params.team_allocation.dir_name())
    }

    pub fn model_vars_path(&self, params: &Parameters) -> PathBuf {
        self.run_dir(params)
            .join(format!("model_vars_rep_{}.csv", params.replicate))
    }

    pub fn roi_path(&self, params: &Parameters) -> PathBuf {
        self.run_dir(params)
            .join(format!("roi_rep_{}.json", params.replicate))
    }

    pub fn network_diff_path(&self, params: &Parameters) -> PathBuf {
        self.run_dir(params)
            .join(format!("network_rep_{}.json", params.replicate))
    }

    pub fn adjlist_path(&self, params: &Parameters, timestep: usize) -> PathBuf {
        self.run_dir(params).join(format!(
            "network_rep_{}_timestep_{}.adjlist",
            params.replicate, timestep
        ))
    }
}

/// File names the dashboard reads, classified by what they hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunFile {
    ModelVars { replicate: u32 },
    Roi { replicate: u32 },
    NetworkDiff { replicate: u32 },
    Adjlist { replicate: u32, timestep: usize },
}

impl RunFile {
    pub fn parse(file_name: &str) -> Option<Self> {
        if let Some(rest) = file_name.strip_prefix("model_vars_rep_") {
            let r = rest.strip_suffix(".csv")?.parse().ok()?;
            return Some(RunFile::ModelVars { replicate: r });
        }
        if let Some(rest) = file_name.strip_prefix("roi_rep_") {
            let r = rest.strip_suffix(".json")?.parse().ok()?;
            return Some(RunFile::Roi { replicate: r });
        }
        let rest = file_name.strip_prefix("network_rep_")?;
        if let Some(r) = rest.strip_suffix(".json") {
            return Some(RunFile::NetworkDiff { replicate: r.parse().ok()? });
        }
        let rest = rest.strip_suffix(".adjlist")?;
        let (r, t) = rest.split_once("_timestep_")?;
        Some(RunFile::Adjlist {
            replicate: r.parse().ok()?,
            timestep: t.parse().ok()?,
        })
    }

    pub fn replicate(&self) -> u32 {
        match *self {
            RunFile::ModelVars { replicate }
            | RunFile::Roi { replicate }
            | RunFile::NetworkDiff { replicate }
            | RunFile::Adjlist { replicate, .. } => replicate,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoadError {
    Missing { path: String },
    Malformed { path: String, msg: String },
}

impl LoadError {
    pub fn missing(path: &Path) -> Self {
        LoadError::Missing { path: path.display().to_string() }
    }

    pub fn malformed(path: &Path, msg: impl Into<String>) -> Self {
        LoadError::Malformed {
            path: path.display().to_string(),
            msg: msg.into(),
        }
    }

    pub fn path(&self) -> &str {
        match self {
            LoadError::Missing { path } | LoadError::Malformed { path, .. } => path,
        }
    }

    /// Message shown to the user in place of the charts.
    pub fn notice(&self) -> String {
        format!(
            "Sorry, we do not currently have data for that parameter combination. \
             Please change your parameter selection. ({})",
            self.path()
        )
    }
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::Missing { path } => write!(f, "missing data file: {}", path),
            LoadError::Malformed { path, msg } => write!(f, "malformed data file {}: {}", path, msg),
        }
    }
}

impl std::error::Error for LoadError {}

pub(crate) fn open_or_missing(path: &Path) -> Result<File, LoadError> {
    File::open(path).map_err(|err| match err.kind() {
        std::io::ErrorKind::NotFound => LoadError::missing(path),
        _ => LoadError::malformed(path, err.to_string()),
    })
}

pub fn file_sha256(path: &Path) -> Result<String, String> {
    let mut file = File::open(path).map_err(|e| e.to_string())?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf).map_err(|e| e.to_string())?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::TeamAllocation;

    #[test]
    fn test_paths_follow_batch_convention() {
        let layout = DataLayout::new("data");
        let p = Parameters {
            team_allocation: TeamAllocation::Optimised,
            replicate: 4,
            ..Parameters::default()
        };
        let path = layout.model_vars_path(&p);
        assert_eq!(
            path,
            PathBuf::from("data/pps_3_sd_0.990_dw_0.1_tl_0.1_tf_1_tb_0_bf_1_010921_v1.1/Basin/model_vars_rep_4.csv")
        );
        assert!(layout
            .adjlist_path(&p, 7)
            .ends_with("Basin/network_rep_4_timestep_7.adjlist"));
    }

    #[test]
    fn test_run_file_parse() {
        assert_eq!(RunFile::parse("model_vars_rep_3.csv"), Some(RunFile::ModelVars { replicate: 3 }));
        assert_eq!(RunFile::parse("roi_rep_0.json"), Some(RunFile::Roi { replicate: 0 }));
        assert_eq!(RunFile::parse("network_rep_12.json"), Some(RunFile::NetworkDiff { replicate: 12 }));
        assert_eq!(
            RunFile::parse("network_rep_2_timestep_45.adjlist"),
            Some(RunFile::Adjlist { replicate: 2, timestep: 45 })
        );
        assert_eq!(RunFile::parse("agents_rep_2.csv"), None);
        assert_eq!(RunFile::parse("model_vars_rep_x.csv"), None);
    }

    #[test]
    fn test_notice_names_path() {
        let err = LoadError::missing(Path::new("data/x/model_vars_rep_0.csv"));
        assert!(err.notice().contains("data/x/model_vars_rep_0.csv"));
        assert!(err.notice().starts_with("Sorry"));
    }
}
