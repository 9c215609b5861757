//! Replay the network diff of one run.
//!
//! usage: replay <network_rep_N.json> [--at T] [--duration N]
//!
//! Without `--at` prints one JSON line per timestep with graph sizes; with it
//! prints the full graph at that timestep.

use serde_json::json;
use std::env;
use std::path::PathBuf;
use std::process;

use superscript_explorer::config::Config;
use superscript_explorer::network::{NetworkDiff, Replay};

fn usage() -> ! {
    eprintln!("usage: replay <network_rep_N.json> [--at T] [--duration N]");
    process::exit(1);
}

fn main() {
    let mut args = env::args().skip(1);
    let mut path: Option<PathBuf> = None;
    let mut at: Option<usize> = None;
    let mut duration = Config::from_env().duration;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--at" => match args.next().and_then(|v| v.parse().ok()) {
                Some(t) => at = Some(t),
                None => usage(),
            },
            "--duration" => match args.next().and_then(|v| v.parse().ok()) {
                Some(d) => duration = d,
                None => usage(),
            },
            "-h" | "--help" => usage(),
            _ if path.is_none() => path = Some(PathBuf::from(arg)),
            _ => usage(),
        }
    }
    let Some(path) = path else { usage() };

    let diff = match NetworkDiff::read(&path) {
        Ok(d) => d,
        Err(err) => {
            eprintln!("{}", err);
            process::exit(2);
        }
    };
    if diff.skipped() > 0 {
        eprintln!("skipped {} malformed diff records", diff.skipped());
    }

    let mut replay = Replay::new(&diff);
    match at {
        Some(t) => {
            let graph = replay.graph_at(t);
            let out = json!({
                "timestep": t,
                "nodes": graph.nodes().collect::<Vec<_>>(),
                "edges": graph.edges().collect::<Vec<_>>(),
            });
            println!("{}", out);
        }
        None => {
            for t in 0..duration {
                let graph = replay.graph_at(t);
                let total_weight: f64 = graph.edges().map(|e| e.weight).sum();
                println!(
                    "{}",
                    json!({
                        "timestep": t,
                        "nodes": graph.node_count(),
                        "edges": graph.edge_count(),
                        "total_weight": total_weight,
                    })
                );
            }
        }
    }
}
