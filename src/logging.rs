//! Structured logging for the dashboard.
//!
//! Every record is one JSON line carrying a run id, a sequence number, a
//! level and a domain. Records go to stdout and to a per-run directory so a
//! session can be replayed or audited afterwards.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fs::{create_dir_all, File};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::process;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, OnceLock};
use std::time::Instant;

/// Severity, lowest first. `LOG_LEVEL` sets the threshold (default `info`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

const LEVELS: [(Level, &str); 5] = [
    (Level::Trace, "trace"),
    (Level::Debug, "debug"),
    (Level::Info, "info"),
    (Level::Warn, "warn"),
    (Level::Error, "error"),
];

impl Level {
    pub fn parse(name: &str) -> Option<Self> {
        LEVELS
            .iter()
            .find(|(_, n)| n.eq_ignore_ascii_case(name.trim()))
            .map(|(l, _)| *l)
    }

    pub fn from_env() -> Self {
        std::env::var("LOG_LEVEL")
            .ok()
            .and_then(|v| Self::parse(&v))
            .unwrap_or(Level::Info)
    }

    pub fn as_str(&self) -> &'static str {
        LEVELS
            .iter()
            .find(|(l, _)| l == self)
            .map(|(_, n)| *n)
            .unwrap_or("info")
    }
}

/// Subsystem tag; `LOG_DOMAINS=data,replay` keeps only those.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    Data,
    Replay,
    Session,
    Playback,
    Server,
    Transfer,
    System,
    Profile,
}

impl Domain {
    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Data => "data",
            Domain::Replay => "replay",
            Domain::Session => "session",
            Domain::Playback => "playback",
            Domain::Server => "server",
            Domain::Transfer => "transfer",
            Domain::System => "system",
            Domain::Profile => "profile",
        }
    }

    pub fn is_enabled(&self) -> bool {
        let Ok(list) = std::env::var("LOG_DOMAINS") else {
            return true;
        };
        list == "all" || list.split(',').map(str::trim).any(|d| d == self.as_str())
    }
}

static SEQ: AtomicU64 = AtomicU64::new(0);
static SINKS: OnceLock<Sinks> = OnceLock::new();

fn next_seq() -> u64 {
    SEQ.fetch_add(1, Ordering::Relaxed)
}

type Sink = Option<Mutex<BufWriter<File>>>;

/// Per-process log destination: `<LOG_DIR>/<run_id>/{events,trace}.jsonl`.
#[derive(Debug)]
struct Sinks {
    run_id: String,
    events: Sink,
    trace: Sink,
}

impl Sinks {
    fn stdout_only(run_id: String) -> Self {
        Self { run_id, events: None, trace: None }
    }

    fn open() -> Self {
        let run_id = std::env::var("RUN_ID")
            .unwrap_or_else(|_| format!("ss-{}-{}", ts_epoch_ms(), process::id()));

        // LOG_DIR=off: stdout only
        let base = std::env::var("LOG_DIR").unwrap_or_else(|_| "out/runs".to_string());
        if base == "off" {
            return Self::stdout_only(run_id);
        }

        let dir = PathBuf::from(base).join(&run_id);
        if let Err(err) = create_dir_all(&dir) {
            eprintln!("[log] cannot create {}: {}", dir.display(), err);
            return Self::stdout_only(run_id);
        }

        let manifest = json!({
            "run_id": run_id,
            "started": ts_now(),
            "pid": process::id(),
            "binary": std::env::args().next().unwrap_or_default(),
            "data_dir": std::env::var("DATA_DIR").unwrap_or_else(|_| "data".to_string()),
        });
        let _ = std::fs::write(dir.join("manifest.json"), manifest.to_string());

        let sink = |name: &str| -> Sink {
            File::create(dir.join(name))
                .map(|f| Mutex::new(BufWriter::new(f)))
                .map_err(|err| eprintln!("[log] cannot create {}: {}", name, err))
                .ok()
        };
        Self {
            events: sink("events.jsonl"),
            trace: sink("trace.jsonl"),
            run_id,
        }
    }
}

fn sinks() -> &'static Sinks {
    SINKS.get_or_init(Sinks::open)
}

fn split_fields(mut fields: Map<String, Value>) -> (Map<String, Value>, Map<String, Value>) {
    let mut top = Map::new();
    for key in ["batch", "replicate", "timestep", "path", "msg"] {
        if let Some(value) = fields.remove(key) {
            top.insert(key.to_string(), value);
        }
    }
    (top, fields)
}

fn append(sink: &Sink, line: &str) {
    let Some(sink) = sink else { return };
    if let Ok(mut w) = sink.lock() {
        let _ = writeln!(w, "{}", line).and_then(|_| w.flush());
    }
}

/// RFC3339, millisecond precision, UTC.
pub fn ts_now() -> String {
    Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

pub fn ts_epoch_ms() -> u64 {
    Utc::now().timestamp_millis().max(0) as u64
}

pub fn run_id() -> String {
    sinks().run_id.clone()
}

/// Build one JSON-lines record: envelope, lifted keys, then the rest under `data`.
fn record(level: Level, domain: Domain, event: &str, fields: Map<String, Value>) -> Value {
    let (lifted, data) = split_fields(fields);
    let mut rec = json!({
        "ts": ts_now(),
        "run_id": sinks().run_id,
        "seq": next_seq(),
        "lvl": level.as_str(),
        "domain": domain.as_str(),
        "event": event,
    });
    if let Value::Object(map) = &mut rec {
        map.extend(lifted);
        map.insert("data".to_string(), Value::Object(data));
    }
    rec
}

pub fn log(level: Level, domain: Domain, event: &str, fields: Map<String, Value>) {
    if level < Level::from_env() || !domain.is_enabled() {
        return;
    }
    let line = record(level, domain, event, fields).to_string();
    let ctx = sinks();
    if level >= Level::Info {
        append(&ctx.events, &line);
    } else {
        append(&ctx.trace, &line);
    }
    println!("{}", line);
}

pub fn info(domain: Domain, event: &str, fields: Map<String, Value>) {
    log(Level::Info, domain, event, fields);
}

pub fn warn(domain: Domain, event: &str, fields: Map<String, Value>) {
    log(Level::Warn, domain, event, fields);
}

pub fn debug(domain: Domain, event: &str, fields: Map<String, Value>) {
    log(Level::Debug, domain, event, fields);
}

pub fn log_load(batch: &str, replicate: u32, rows: usize, networks: usize, roi: bool) {
    info(
        Domain::Data,
        "models_loaded",
        obj(&[
            ("batch", v_str(batch)),
            ("replicate", json!(replicate)),
            ("rows", json!(rows)),
            ("networks", json!(networks)),
            ("roi", json!(roi)),
        ]),
    );
}

pub fn log_missing(path: &str) {
    warn(
        Domain::Data,
        "data_missing",
        obj(&[("path", v_str(path))]),
    );
}

pub fn log_skipped_diff(index: usize, reason: &str) {
    debug(
        Domain::Replay,
        "diff_skipped",
        obj(&[("index", json!(index)), ("reason", v_str(reason))]),
    );
}

pub fn log_frame(timestep: usize, nodes: usize, edges: usize) {
    log(
        Level::Trace,
        Domain::Playback,
        "frame",
        obj(&[
            ("timestep", json!(timestep)),
            ("nodes", json!(nodes)),
            ("edges", json!(edges)),
        ]),
    );
}

pub fn log_request(method: &str, target: &str, status: u16) {
    debug(
        Domain::Server,
        "request",
        obj(&[
            ("method", v_str(method)),
            ("target", v_str(target)),
            ("status", json!(status)),
        ]),
    );
}

pub fn obj(pairs: &[(&str, Value)]) -> Map<String, Value> {
    pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
}

pub fn v_str(s: &str) -> Value {
    Value::from(s)
}

pub fn v_num(n: f64) -> Value {
    json!(n)
}

/// Profiling scope that emits structured timing on drop.
pub struct ProfileScope {
    label: &'static str,
    context: Map<String, Value>,
    started: Instant,
}

impl ProfileScope {
    pub fn new(label: &'static str) -> Self {
        Self::with_context(label, &[])
    }

    pub fn with_context(label: &'static str, fields: &[(&str, Value)]) -> Self {
        Self {
            label,
            context: obj(fields),
            started: Instant::now(),
        }
    }
}

impl Drop for ProfileScope {
    fn drop(&mut self) {
        let elapsed_ms = self.started.elapsed().as_secs_f64() * 1000.0;
        let mut fields = std::mem::take(&mut self.context);
        fields.insert("label".to_string(), v_str(self.label));
        fields.insert("elapsed_ms".to_string(), v_num(elapsed_ms));
        log(Level::Trace, Domain::Profile, "profile", fields);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_parse_and_order() {
        assert_eq!(Level::parse("WARN"), Some(Level::Warn));
        assert_eq!(Level::parse("verbose"), None);
        assert!(Level::Debug < Level::Info);
        assert_eq!(Level::Error.as_str(), "error");
    }

    #[test]
    fn test_record_lifts_correlation_keys() {
        let rec = record(
            Level::Info,
            Domain::Data,
            "models_loaded",
            obj(&[("batch", v_str("b")), ("msg", v_str("ok")), ("rows", v_num(3.0))]),
        );
        assert_eq!(rec["batch"], "b");
        assert_eq!(rec["msg"], "ok");
        assert_eq!(rec["domain"], "data");
        assert_eq!(rec["data"]["rows"], 3.0);
    }

    #[test]
    fn test_split_fields_lifts_correlation_keys() {
        let m = obj(&[("batch", v_str("b")), ("rows", json!(3))]);
        let (top, data) = split_fields(m);
        assert!(top.contains_key("batch"));
        assert!(data.contains_key("rows"));
        assert!(!data.contains_key("batch"));
    }

    #[test]
    fn test_seq_increments() {
        let s1 = next_seq();
        let s2 = next_seq();
        assert!(s2 > s1);
    }
}
