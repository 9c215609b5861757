mod common;

use superscript_explorer::data::catalog::{available_allocations, available_replicates, scan};
use superscript_explorer::data::loader::{load_comparison, load_models, LoadOptions, ROI_COLUMN};
use superscript_explorer::data::DataLayout;
use superscript_explorer::params::{Parameters, TeamAllocation};
use superscript_explorer::presets;
use tempfile::TempDir;

use common::{model_vars, write, write_run};

fn opts(duration: usize) -> LoadOptions {
    LoadOptions { duration, ..LoadOptions::default() }
}

#[test]
fn loads_table_roi_and_diff_networks() {
    let dir = TempDir::new().unwrap();
    let params = Parameters::default();
    write_run(dir.path(), &params, 5);

    let data = load_models(&DataLayout::new(dir.path()), &params, &opts(5));
    assert!(data.notice.is_none());
    let table = data.model_vars.as_ref().unwrap();
    assert_eq!(table.len(), 5);
    assert_eq!(table.column("ActiveProjects").unwrap(), &[0.0, 1.0, 2.0, 3.0, 4.0]);
    assert_eq!(table.column(ROI_COLUMN).unwrap(), &[1.0; 5]);

    let networks = data.networks.as_ref().unwrap();
    assert_eq!(networks.len(), 5);
    assert_eq!(networks[0].node_count(), 3);
    assert_eq!(networks[1].node_count(), 4);
    assert!(!networks[2].has_node("2"));
    assert_eq!(networks[3].weight("3", "4"), Some(3.0));
    // the malformed fourth record leaves the graph unchanged
    assert_eq!(networks[4], networks[3]);
}

#[test]
fn missing_table_gives_notice_and_no_networks() {
    let dir = TempDir::new().unwrap();
    let params = Parameters { project_count: 10, ..Parameters::default() };
    let data = load_models(&DataLayout::new(dir.path()), &params, &opts(5));
    assert!(data.model_vars.is_none());
    assert!(data.networks.is_none());
    let notice = data.notice.unwrap();
    assert!(notice.starts_with("Sorry, we do not currently have data for that parameter combination."));
    assert!(notice.contains("model_vars_rep_0.csv"));
}

#[test]
fn missing_roi_becomes_zeros() {
    let dir = TempDir::new().unwrap();
    let params = Parameters::default();
    let layout = DataLayout::new(dir.path());
    write(&layout.model_vars_path(&params), &model_vars(4));

    let data = load_models(&layout, &params, &opts(4));
    assert_eq!(data.model_vars.unwrap().column(ROI_COLUMN).unwrap(), &[0.0; 4]);
    assert!(data.networks.is_none());
}

#[test]
fn roi_longer_than_table_is_cut_to_table_length() {
    let dir = TempDir::new().unwrap();
    let params = Parameters::default();
    let layout = DataLayout::new(dir.path());
    write(&layout.model_vars_path(&params), &model_vars(4));
    write(&layout.roi_path(&params), &serde_json::to_string(&vec![2.0; 30]).unwrap());

    let data = load_models(&layout, &params, &opts(4));
    assert_eq!(data.model_vars.unwrap().column(ROI_COLUMN).unwrap(), &[2.0; 4]);
}

#[test]
fn adjlists_fill_in_without_a_diff() {
    let dir = TempDir::new().unwrap();
    let params = Parameters::default();
    let layout = DataLayout::new(dir.path());
    write(&layout.model_vars_path(&params), &model_vars(3));
    write(&layout.adjlist_path(&params, 1), "# t=1\n1 1\n2 {'weight': 2}\n2 0\n");
    write(&layout.adjlist_path(&params, 2), "1 2\n2 {}\n3 {'weight': 5}\n");

    let data = load_models(&layout, &params, &opts(3));
    let networks = data.networks.unwrap();
    assert_eq!(networks.len(), 3);
    assert_eq!(networks[0].weight("1", "2"), Some(2.0));
    assert_eq!(networks[1].edge_count(), 2);
    assert!(networks[2].is_empty());
}

#[test]
fn comparison_loads_every_preset_without_networks() {
    let dir = TempDir::new().unwrap();
    let all = presets::all();
    write_run(dir.path(), &all[0].params, 30);

    let runs = load_comparison(&DataLayout::new(dir.path()), &all, &opts(30));
    assert_eq!(runs.len(), all.len());
    assert!(runs[0].data.is_loaded());
    assert!(runs[0].data.networks.is_none());
    assert!(runs[1..].iter().all(|r| r.data.notice.is_some()));
}

#[test]
fn catalog_lists_runs_on_disk() {
    let dir = TempDir::new().unwrap();
    let params = Parameters::default();
    write_run(dir.path(), &params, 3);
    write_run(dir.path(), &Parameters { replicate: 2, ..params.clone() }, 3);
    let flex = Parameters { team_allocation: TeamAllocation::FlexibleStartTime, ..params.clone() };
    write(&DataLayout::new(dir.path()).roi_path(&flex), "[]");

    let layout = DataLayout::new(dir.path());
    assert_eq!(available_replicates(&layout, &params), vec![0, 2]);
    assert_eq!(
        available_allocations(&layout, &params),
        vec![TeamAllocation::Random, TeamAllocation::FlexibleStartTime]
    );

    let catalog = scan(dir.path(), true).unwrap();
    let batch = catalog.find_batch(&params.batch_name()).unwrap();
    assert_eq!(batch.allocations.len(), 2);
    assert_eq!(catalog.run_count(), 3);
    let random = batch.allocations.iter().find(|a| a.dir == "Random").unwrap();
    assert!(random.runs.iter().all(|r| r.has_roi && r.has_network_diff));
    assert_eq!(random.runs[0].model_vars_sha256.as_ref().map(String::len), Some(64));
    // the flexible-start run has ROI but no table
    assert!(catalog.warnings.iter().any(|w| w.contains("no model_vars table")));
}
