//! Loading one simulation run (metrics, ROI, networks) for display.

use serde_json::json;
use std::path::Path;

use super::table::MetricTable;
use super::{DataLayout, LoadError};
use crate::logging::{log_load, log_missing, obj, v_str, warn, Domain, ProfileScope};
use crate::network::{adjlist, Graph, NetworkDiff};
use crate::params::Parameters;
use crate::presets::Preset;
use crate::smoothing::moving_average;

pub const ROI_COLUMN: &str = "Roi";

#[derive(Debug, Clone, Copy)]
pub struct LoadOptions {
    pub duration: usize,
    pub roi_window: usize,
    pub roi_look_back: usize,
    pub with_networks: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            duration: 100,
            roi_window: 10,
            roi_look_back: 2,
            with_networks: true,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SimulationData {
    pub model_vars: Option<MetricTable>,
    /// One graph per displayed timestep.
    pub networks: Option<Vec<Graph>>,
    /// User-facing message when the run could not be loaded.
    pub notice: Option<String>,
}

impl SimulationData {
    pub fn is_loaded(&self) -> bool {
        self.model_vars.is_some()
    }

    pub fn network_at(&self, timestep: usize) -> Option<&Graph> {
        self.networks.as_ref().and_then(|n| n.get(timestep))
    }
}

pub fn load_models(layout: &DataLayout, params: &Parameters, opts: &LoadOptions) -> SimulationData {
    let _scope = ProfileScope::with_context("load_models", &[("batch", v_str(&params.batch_name()))]);

    let path = layout.model_vars_path(params);
    let mut table = match MetricTable::from_csv(&path) {
        Ok(t) => t,
        Err(err) => {
            log_missing(err.path());
            if let LoadError::Malformed { msg, .. } = &err {
                warn(Domain::Data, "model_vars_malformed", obj(&[("msg", v_str(msg))]));
            }
            return SimulationData {
                model_vars: None,
                networks: None,
                notice: Some(err.notice()),
            };
        }
    };

    let roi = load_roi(&layout.roi_path(params));
    let has_roi = roi.is_some();
    let roi_column = match roi {
        Some(values) => {
            let mut smoothed = moving_average(&values, opts.roi_window, true, opts.roi_look_back);
            smoothed.resize(table.len(), 0.0);
            smoothed
        }
        None => vec![0.0; table.len()],
    };
    if let Err(msg) = table.push_column(ROI_COLUMN, roi_column) {
        warn(Domain::Data, "roi_column_rejected", obj(&[("msg", v_str(&msg))]));
    }

    let networks = if opts.with_networks {
        load_networks(layout, params, opts.duration)
    } else {
        None
    };
    log_load(
        &params.batch_name(),
        params.replicate,
        table.len(),
        networks.as_ref().map(Vec::len).unwrap_or(0),
        has_roi,
    );

    SimulationData {
        model_vars: Some(table),
        networks,
        notice: None,
    }
}

/// ROI series computed after the simulations were run; absent for older batches.
fn load_roi(path: &Path) -> Option<Vec<f64>> {
    let text = std::fs::read_to_string(path).ok()?;
    match serde_json::from_str::<Vec<f64>>(&text) {
        Ok(v) => Some(v),
        Err(err) => {
            warn(
                Domain::Data,
                "roi_malformed",
                obj(&[("path", v_str(&path.display().to_string())), ("msg", v_str(&err.to_string()))]),
            );
            None
        }
    }
}

/// Diff file first; otherwise one adjacency list per timestep `1..=duration`
/// stored at index `t - 1`.
pub fn load_networks(layout: &DataLayout, params: &Parameters, duration: usize) -> Option<Vec<Graph>> {
    match NetworkDiff::read(&layout.network_diff_path(params)) {
        Ok(diff) => {
            if diff.skipped() > 0 {
                warn(
                    Domain::Replay,
                    "diff_records_skipped",
                    obj(&[("count", json!(diff.skipped()))]),
                );
            }
            return Some(diff.snapshots(duration));
        }
        Err(LoadError::Missing { .. }) => {}
        Err(err) => {
            warn(Domain::Replay, "diff_unreadable", obj(&[("msg", v_str(&err.to_string()))]));
        }
    }

    if !layout.adjlist_path(params, 1).exists() {
        return None;
    }
    let graphs = (1..=duration)
        .map(|t| {
            adjlist::read(&layout.adjlist_path(params, t)).unwrap_or_else(|err| {
                warn(Domain::Data, "adjlist_unreadable", obj(&[("msg", v_str(&err))]));
                Graph::new()
            })
        })
        .collect();
    Some(graphs)
}

#[derive(Debug, Clone)]
pub struct ComparisonRun {
    pub preset: Preset,
    pub data: SimulationData,
}

/// Runs for every preset, for the comparison page.
pub fn load_comparison(layout: &DataLayout, presets: &[Preset], opts: &LoadOptions) -> Vec<ComparisonRun> {
    let opts = LoadOptions { with_networks: false, ..*opts };
    presets
        .iter()
        .map(|preset| ComparisonRun {
            preset: preset.clone(),
            data: load_models(layout, &preset.params, &opts),
        })
        .collect()
}
