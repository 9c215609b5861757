//! Scan the data directory and write a JSON catalog of the runs present.
//!
//! usage: catalog [data_dir] [--hashes] [--out PATH]

use std::env;
use std::fs;
use std::path::PathBuf;
use std::process;

use superscript_explorer::config::Config;
use superscript_explorer::data::catalog::scan;

fn main() {
    let mut data_dir = Config::from_env().data_dir;
    let mut with_hashes = false;
    let mut out_path: Option<PathBuf> = None;

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--hashes" => with_hashes = true,
            "--out" => match args.next() {
                Some(p) => out_path = Some(PathBuf::from(p)),
                None => {
                    eprintln!("--out needs a path");
                    process::exit(1);
                }
            },
            _ => data_dir = PathBuf::from(arg),
        }
    }

    let catalog = match scan(&data_dir, with_hashes) {
        Ok(c) => c,
        Err(err) => {
            eprintln!("scan failed: {}", err);
            process::exit(2);
        }
    };
    for w in &catalog.warnings {
        eprintln!("warning: {}", w);
    }

    let out_path = out_path.unwrap_or_else(|| data_dir.join("catalog.json"));
    let body = match serde_json::to_string_pretty(&catalog) {
        Ok(b) => b,
        Err(err) => {
            eprintln!("serialize failed: {}", err);
            process::exit(3);
        }
    };
    if let Err(err) = fs::write(&out_path, body) {
        eprintln!("failed to write {}: {}", out_path.display(), err);
        process::exit(4);
    }
    println!(
        "wrote catalog {} ({} batches, {} runs)",
        out_path.display(),
        catalog.batches.len(),
        catalog.run_count()
    );
}
