//! Inventory of the batches and replicates present under the data directory.

use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use super::{file_sha256, DataLayout, RunFile};
use crate::logging::ProfileScope;
use crate::params::{Parameters, TeamAllocation};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunEntry {
    pub replicate: u32,
    pub has_model_vars: bool,
    pub model_vars_sha256: Option<String>,
    pub has_roi: bool,
    pub has_network_diff: bool,
    pub adjlist_timesteps: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AllocationEntry {
    pub dir: String,
    pub runs: Vec<RunEntry>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchEntry {
    pub name: String,
    pub allocations: Vec<AllocationEntry>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DataCatalog {
    pub root: String,
    pub batches: Vec<BatchEntry>,
    pub warnings: Vec<String>,
    pub generated_at: String,
}

impl DataCatalog {
    pub fn run_count(&self) -> usize {
        self.batches
            .iter()
            .flat_map(|b| b.allocations.iter())
            .map(|a| a.runs.len())
            .sum()
    }

    pub fn find_batch(&self, name: &str) -> Option<&BatchEntry> {
        self.batches.iter().find(|b| b.name == name)
    }
}

fn sorted_dirs(path: &Path) -> Result<Vec<PathBuf>, String> {
    let mut dirs: Vec<PathBuf> = fs::read_dir(path)
        .map_err(|e| format!("{}: {}", path.display(), e))?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .collect();
    dirs.sort();
    Ok(dirs)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_string()
}

pub fn scan(root: &Path, with_hashes: bool) -> Result<DataCatalog, String> {
    let _scope = ProfileScope::new("catalog_scan");
    let mut catalog = DataCatalog {
        root: root.display().to_string(),
        generated_at: crate::logging::ts_now(),
        ..DataCatalog::default()
    };

    for batch_dir in sorted_dirs(root)? {
        let mut batch = BatchEntry {
            name: file_name(&batch_dir),
            allocations: Vec::new(),
        };
        for alloc_dir in sorted_dirs(&batch_dir)? {
            let entry = scan_allocation(&alloc_dir, with_hashes, &mut catalog.warnings)?;
            if entry.runs.is_empty() {
                catalog
                    .warnings
                    .push(format!("no runs in {}", alloc_dir.display()));
            }
            batch.allocations.push(entry);
        }
        catalog.batches.push(batch);
    }
    Ok(catalog)
}

fn scan_allocation(
    dir: &Path,
    with_hashes: bool,
    warnings: &mut Vec<String>,
) -> Result<AllocationEntry, String> {
    let mut runs: BTreeMap<u32, RunEntry> = BTreeMap::new();
    let read = fs::read_dir(dir).map_err(|e| format!("{}: {}", dir.display(), e))?;
    for item in read.filter_map(|e| e.ok()) {
        let path = item.path();
        let Some(kind) = RunFile::parse(&file_name(&path)) else {
            continue;
        };
        let run = runs.entry(kind.replicate()).or_insert_with(|| RunEntry {
            replicate: kind.replicate(),
            ..RunEntry::default()
        });
        match kind {
            RunFile::ModelVars { .. } => {
                run.has_model_vars = true;
                if with_hashes {
                    match file_sha256(&path) {
                        Ok(h) => run.model_vars_sha256 = Some(h),
                        Err(err) => warnings.push(format!("hash failed: {}", err)),
                    }
                }
            }
            RunFile::Roi { .. } => run.has_roi = true,
            RunFile::NetworkDiff { .. } => run.has_network_diff = true,
            RunFile::Adjlist { .. } => run.adjlist_timesteps += 1,
        }
    }

    for run in runs.values() {
        if !run.has_model_vars {
            warnings.push(format!(
                "replicate {} in {} has no model_vars table",
                run.replicate,
                dir.display()
            ));
        }
    }

    Ok(AllocationEntry {
        dir: file_name(dir),
        runs: runs.into_values().collect(),
    })
}

/// Replicates with a metric table for this combination, ascending.
pub fn available_replicates(layout: &DataLayout, params: &Parameters) -> Vec<u32> {
    let dir = layout.run_dir(params);
    let Ok(read) = fs::read_dir(&dir) else {
        return Vec::new();
    };
    let mut reps: Vec<u32> = read
        .filter_map(|e| e.ok())
        .filter_map(|e| RunFile::parse(&file_name(&e.path())))
        .filter_map(|f| match f {
            RunFile::ModelVars { replicate } => Some(replicate),
            _ => None,
        })
        .collect();
    reps.sort_unstable();
    reps.dedup();
    reps
}

/// A replicate other than `current`, chosen at random from those on disk.
pub fn random_other_replicate(available: &[u32], current: u32) -> Option<u32> {
    let others: Vec<u32> = available.iter().copied().filter(|r| *r != current).collect();
    others.choose(&mut rand::thread_rng()).copied()
}

/// Allocation directories present for a batch, in display order.
pub fn available_allocations(layout: &DataLayout, params: &Parameters) -> Vec<TeamAllocation> {
    TeamAllocation::ALL
        .iter()
        .copied()
        .filter(|a| layout.batch_dir(params).join(a.dir_name()).is_dir())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_other_replicate_excludes_current() {
        for _ in 0..20 {
            let r = random_other_replicate(&[0, 1, 2], 1).unwrap();
            assert_ne!(r, 1);
        }
        assert_eq!(random_other_replicate(&[3], 3), None);
        assert_eq!(random_other_replicate(&[], 0), None);
    }
}
