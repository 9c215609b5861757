//! Copy simulation output into the dashboard's data directory.
//!
//! A batch is copied whole, then stripped of everything the dashboard never
//! reads: the `Niter0`/`Basic` runs, per-agent and per-project dumps,
//! per-timestep network dumps, adjlists made redundant by a diff file, and
//! replicates above the configured maximum.

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::json;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::data::RunFile;
use crate::logging::{info, obj, v_str, warn, Domain, ProfileScope};
use crate::params::{Parameters, PROJECT_COUNTS};

const STRIPPED_DIRS: [&str; 2] = ["Niter0", "Basic"];
const STRIPPED_PREFIXES: [&str; 3] = ["agents", "project", "network_timestep"];

#[derive(Debug, Clone, Copy)]
pub struct TransferOptions {
    pub overwrite: bool,
    pub max_rep: u32,
    /// Also map the first data release (v1.0) into its legacy batch names.
    pub legacy: bool,
}

impl Default for TransferOptions {
    fn default() -> Self {
        Self { overwrite: true, max_rep: 9, legacy: false }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferJob {
    pub batch: String,
    pub source: PathBuf,
    pub dest: PathBuf,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct StripReport {
    pub removed_dirs: usize,
    pub removed_files: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TransferReport {
    pub copied: Vec<String>,
    pub skipped_existing: Vec<String>,
    pub missing: Vec<String>,
    pub files_copied: u64,
    pub removed_dirs: usize,
    pub removed_files: usize,
}

/// The skill-decay and training sweep run for preset E.
pub fn preset_e_combinations() -> Vec<Parameters> {
    [(0.95, 0.1), (0.99, 0.1), (0.995, 0.1), (0.995, 0.0), (0.995, 0.3), (0.995, 2.0)]
        .into_iter()
        .map(|(skill_decay, train_load)| Parameters {
            project_count: 3,
            dept_workload: 0.1,
            budget_func: true,
            skill_decay,
            train_load,
            ..Parameters::default()
        })
        .collect()
}

/// Every batch the dashboard can display, plus the preset E sweep.
pub fn plan(sim_io: &Path, data_dir: &Path, opts: &TransferOptions) -> Vec<TransferJob> {
    let mut seen = BTreeSet::new();
    let mut jobs = Vec::new();
    let mut push = |source_name: String, dest_name: String| {
        if seen.insert(dest_name.clone()) {
            jobs.push(TransferJob {
                source: sim_io.join(&source_name),
                dest: data_dir.join(&dest_name),
                batch: dest_name,
            });
        }
    };

    for params in Parameters::all_combinations() {
        let name = params.batch_name();
        push(name.clone(), name);
    }
    for params in preset_e_combinations() {
        let name = params.preset_e_batch_name();
        push(name.clone(), name);
    }
    if opts.legacy {
        for &pps in &PROJECT_COUNTS {
            let params = Parameters { project_count: pps, ..Parameters::default() };
            push(
                format!("project_per_step_{}_230521_v1.0", pps),
                params.legacy_batch_name(),
            );
        }
    }
    jobs
}

/// Recursive copy; returns the number of files written.
pub fn copy_tree(src: &Path, dst: &Path) -> Result<u64> {
    fs::create_dir_all(dst).with_context(|| format!("create {}", dst.display()))?;
    let mut count = 0;
    for entry in fs::read_dir(src).with_context(|| format!("read {}", src.display()))? {
        let entry = entry?;
        let from = entry.path();
        let to = dst.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            count += copy_tree(&from, &to)?;
        } else {
            fs::copy(&from, &to).with_context(|| format!("copy {}", from.display()))?;
            count += 1;
        }
    }
    Ok(count)
}

/// Replicate index embedded in a file name as `rep_<n>`.
pub fn replicate_of(file_name: &str) -> Option<u32> {
    let (_, rest) = file_name.split_once("rep_")?;
    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}

fn should_strip(name: &str, diff_replicates: &BTreeSet<u32>, max_rep: u32) -> bool {
    if STRIPPED_PREFIXES.iter().any(|p| name.starts_with(p)) {
        return true;
    }
    if let Some(RunFile::Adjlist { replicate, timestep }) = RunFile::parse(name) {
        if timestep > 1 && diff_replicates.contains(&replicate) {
            return true;
        }
    }
    matches!(replicate_of(name), Some(r) if r > max_rep)
}

/// Remove what the dashboard does not read from a copied batch directory.
pub fn strip_unwanted(batch_dir: &Path, max_rep: u32) -> Result<StripReport> {
    let mut report = StripReport::default();
    for name in STRIPPED_DIRS {
        let dir = batch_dir.join(name);
        if dir.is_dir() {
            fs::remove_dir_all(&dir).with_context(|| format!("remove {}", dir.display()))?;
            report.removed_dirs += 1;
        }
    }

    for entry in fs::read_dir(batch_dir)? {
        let alloc_dir = entry?.path();
        if !alloc_dir.is_dir() {
            continue;
        }
        let names: Vec<String> = fs::read_dir(&alloc_dir)?
            .filter_map(|e| e.ok())
            .filter(|e| e.path().is_file())
            .filter_map(|e| e.file_name().to_str().map(str::to_string))
            .collect();
        let diff_replicates: BTreeSet<u32> = names
            .iter()
            .filter_map(|n| match RunFile::parse(n) {
                Some(RunFile::NetworkDiff { replicate }) => Some(replicate),
                _ => None,
            })
            .collect();
        for name in names.iter().filter(|n| should_strip(n, &diff_replicates, max_rep)) {
            fs::remove_file(alloc_dir.join(name))?;
            report.removed_files += 1;
        }
    }
    Ok(report)
}

/// Copy and strip every job. Missing sources are reported, not fatal.
pub fn run(jobs: &[TransferJob], opts: &TransferOptions) -> Result<TransferReport> {
    let _scope = ProfileScope::with_context("transfer", &[("jobs", json!(jobs.len()))]);
    let mut report = TransferReport::default();

    for job in jobs {
        if !job.source.is_dir() {
            warn(
                Domain::Transfer,
                "source_missing",
                obj(&[("batch", v_str(&job.batch)), ("path", v_str(&job.source.to_string_lossy()))]),
            );
            report.missing.push(job.batch.clone());
            continue;
        }
        if job.dest.is_dir() {
            if !opts.overwrite {
                report.skipped_existing.push(job.batch.clone());
                continue;
            }
            fs::remove_dir_all(&job.dest).with_context(|| format!("remove {}", job.dest.display()))?;
        }

        let files = copy_tree(&job.source, &job.dest)?;
        let stripped = strip_unwanted(&job.dest, opts.max_rep)?;
        info(
            Domain::Transfer,
            "batch_copied",
            obj(&[
                ("batch", v_str(&job.batch)),
                ("files", json!(files)),
                ("removed_files", json!(stripped.removed_files)),
                ("removed_dirs", json!(stripped.removed_dirs)),
            ]),
        );
        report.files_copied += files;
        report.removed_files += stripped.removed_files;
        report.removed_dirs += stripped.removed_dirs;
        report.copied.push(job.batch.clone());
    }
    Ok(report)
}
