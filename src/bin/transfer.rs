//! Copy simulation output into the dashboard's data directory.
//!
//! usage: transfer <path_to_simulation_io> [--data DIR] [--keep-existing] [--legacy] [--max-rep N]

use std::env;
use std::path::PathBuf;
use std::process;

use superscript_explorer::config::Config;
use superscript_explorer::transfer::{plan, run, TransferOptions};

fn usage() -> ! {
    eprintln!(
        "usage: transfer <path_to_simulation_io> [--data DIR] [--keep-existing] [--legacy] [--max-rep N]"
    );
    process::exit(1);
}

fn main() {
    let cfg = Config::from_env();
    let mut data_dir = cfg.data_dir.clone();
    let mut opts = TransferOptions { max_rep: cfg.max_rep, ..TransferOptions::default() };
    let mut sim_io: Option<PathBuf> = None;

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--data" => match args.next() {
                Some(d) => data_dir = PathBuf::from(d),
                None => usage(),
            },
            "--max-rep" => match args.next().and_then(|v| v.parse().ok()) {
                Some(n) => opts.max_rep = n,
                None => usage(),
            },
            "--keep-existing" => opts.overwrite = false,
            "--legacy" => opts.legacy = true,
            "-h" | "--help" => usage(),
            _ if sim_io.is_none() => sim_io = Some(PathBuf::from(arg)),
            _ => usage(),
        }
    }
    let Some(sim_io) = sim_io else { usage() };

    let jobs = plan(&sim_io, &data_dir, &opts);
    let report = match run(&jobs, &opts) {
        Ok(r) => r,
        Err(err) => {
            eprintln!("transfer failed: {:#}", err);
            process::exit(2);
        }
    };
    for batch in &report.missing {
        println!("Could not find simulation data for batch: {}", batch);
    }
    println!(
        "copied {} batches ({} files), {} missing, {} kept, removed {} files and {} directories",
        report.copied.len(),
        report.files_copied,
        report.missing.len(),
        report.skipped_existing.len(),
        report.removed_files,
        report.removed_dirs
    );
}
