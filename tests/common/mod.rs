#![allow(dead_code)]

use std::fs;
use std::path::Path;

use superscript_explorer::data::DataLayout;
use superscript_explorer::params::Parameters;

pub const MODEL_VARS_HEADER: &str =
    ",ActiveProjects,SuccessfulProjects,FailedProjects,ProjectLoad,TrainingLoad,DeptLoad,Slack,AverageWorkerOvr,AverageTeamOvr";

pub fn write(path: &Path, body: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, body).unwrap();
}

/// Metric table with `rows` timesteps; ActiveProjects counts up from zero.
pub fn model_vars(rows: usize) -> String {
    let mut out = String::from(MODEL_VARS_HEADER);
    out.push('\n');
    for t in 0..rows {
        out.push_str(&format!(
            "{t},{t},{s},0,0.5,0.1,0.1,0.3,{ovr},{team}\n",
            t = t,
            s = t % 2,
            ovr = 40.0 + t as f64,
            team = 45.0 + t as f64
        ));
    }
    out
}

pub const DIFF: &str = r#"{
    "initial": {"nodes": [1, 2, 3], "edges": [[1, 2]]},
    "diffs": [
        {"nodes_add": [4], "edges_add": [[3, 4]]},
        {"nodes_remove": [2]},
        {"edges_increment": [[3, 4, 2.0]]},
        "not a record"
    ]
}"#;

/// A complete run (table, ROI, diff) for `params` under `root`.
pub fn write_run(root: &Path, params: &Parameters, rows: usize) {
    let layout = DataLayout::new(root);
    write(&layout.model_vars_path(params), &model_vars(rows));
    let roi: Vec<f64> = vec![1.0; rows];
    write(&layout.roi_path(params), &serde_json::to_string(&roi).unwrap());
    write(&layout.network_diff_path(params), DIFF);
}
