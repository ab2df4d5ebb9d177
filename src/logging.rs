//! Structured logging for the dashboard client.
//!
//! Every record is a single JSON line on stderr, so rendered cards on stdout
//! stay clean. Setting `LOG_DIR` also appends records to
//! `<LOG_DIR>/<run_id>/events.jsonl` for later inspection.
//!
//! `LOG_LEVEL` (default `info`) and `LOG_DOMAINS` (comma list or `all`) are
//! read once, on the first record.

use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::fs::{self, File, OpenOptions};
use std::io::{LineWriter, Write};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, OnceLock};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Level {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
}

impl Level {
    const ALL: [Level; 6] = [
        Level::Trace,
        Level::Debug,
        Level::Info,
        Level::Warn,
        Level::Error,
        Level::Fatal,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Level::Trace => "trace",
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
            Level::Fatal => "fatal",
        }
    }

    /// Case-insensitive; unknown names fall back to `Info`.
    fn parse_or_info(raw: Option<&str>) -> Self {
        raw.map(str::trim)
            .and_then(|r| Self::ALL.into_iter().find(|l| l.name().eq_ignore_ascii_case(r)))
            .unwrap_or(Level::Info)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    Http,
    Retry,
    Dashboard,
    Export,
    System,
}

impl Domain {
    const ALL: [Domain; 5] = [
        Domain::Http,
        Domain::Retry,
        Domain::Dashboard,
        Domain::Export,
        Domain::System,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Domain::Http => "http",
            Domain::Retry => "retry",
            Domain::Dashboard => "dashboard",
            Domain::Export => "export",
            Domain::System => "system",
        }
    }
}

/// Which records get written.
#[derive(Debug, Clone, PartialEq)]
struct Filter {
    min: Level,
    /// `None` means every domain.
    domains: Option<Vec<Domain>>,
}

impl Filter {
    fn new(level: Option<&str>, domains: Option<&str>) -> Self {
        let domains = match domains.map(str::trim) {
            None | Some("") | Some("all") => None,
            Some(list) => Some(
                list.split(',')
                    .filter_map(|d| Domain::ALL.into_iter().find(|x| x.name() == d.trim()))
                    .collect(),
            ),
        };
        Filter {
            min: Level::parse_or_info(level),
            domains,
        }
    }

    fn allows(&self, level: Level, domain: Domain) -> bool {
        level >= self.min
            && self
                .domains
                .as_ref()
                .map_or(true, |list| list.contains(&domain))
    }
}

struct Sink {
    run_id: String,
    filter: Filter,
    file: Option<Mutex<LineWriter<File>>>,
}

static SEQ: AtomicU64 = AtomicU64::new(1);
static SINK: OnceLock<Sink> = OnceLock::new();

fn sink() -> &'static Sink {
    SINK.get_or_init(|| {
        let run_id = std::env::var("RUN_ID")
            .unwrap_or_else(|_| format!("brentdash-{}-{}", ts_epoch_ms(), std::process::id()));
        let filter = Filter::new(
            std::env::var("LOG_LEVEL").ok().as_deref(),
            std::env::var("LOG_DOMAINS").ok().as_deref(),
        );
        let file = std::env::var_os("LOG_DIR").and_then(|dir| match open_events_file(Path::new(&dir), &run_id) {
            Ok(f) => Some(Mutex::new(LineWriter::new(f))),
            Err(err) => {
                eprintln!("[log] events file disabled: {}", err);
                None
            }
        });
        Sink { run_id, filter, file }
    })
}

fn open_events_file(dir: &Path, run_id: &str) -> std::io::Result<File> {
    let run_dir = dir.join(run_id);
    fs::create_dir_all(&run_dir)?;
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(run_dir.join("events.jsonl"))
}

const SENSITIVE_KEYS: [&str; 4] = ["authorization", "api_key", "token", "cookie"];
const PROMOTED_KEYS: [&str; 4] = ["msg", "url", "endpoint", "operation"];

/// RFC3339 timestamp with milliseconds
pub fn ts_now() -> String {
    Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

pub fn ts_epoch_ms() -> u64 {
    Utc::now().timestamp_millis().max(0) as u64
}

/// Write one record if the level and domain pass the env filter.
pub fn log(level: Level, domain: Domain, event: &str, fields: Map<String, Value>) {
    let sink = sink();
    if !sink.filter.allows(level, domain) {
        return;
    }
    let line = record(&sink.run_id, SEQ.fetch_add(1, Ordering::Relaxed), level, domain, event, fields).to_string();
    if let Some(file) = &sink.file {
        if let Ok(mut w) = file.lock() {
            let _ = writeln!(w, "{}", line);
        }
    }
    eprintln!("{}", line);
}

/// Lay out a record: fixed header keys, then `msg`/`url`/`endpoint`/`operation`
/// at top level, everything else under `data` with secrets masked.
fn record(run_id: &str, seq: u64, level: Level, domain: Domain, event: &str, mut fields: Map<String, Value>) -> Value {
    for (key, value) in fields.iter_mut() {
        if SENSITIVE_KEYS.iter().any(|s| key.eq_ignore_ascii_case(s)) {
            *value = json!("[REDACTED]");
        }
    }

    let mut rec = json!({
        "ts": ts_now(),
        "run_id": run_id,
        "seq": seq,
        "level": level,
        "domain": domain,
        "event": event,
    });
    if let Some(top) = rec.as_object_mut() {
        for key in PROMOTED_KEYS {
            if let Some(v) = fields.remove(key) {
                top.insert(key.to_string(), v);
            }
        }
        top.insert("data".to_string(), Value::Object(fields));
    }
    rec
}

pub fn log_request(method: &str, url: &str) {
    log(
        Level::Debug,
        Domain::Http,
        "request",
        obj(&[("method", v_str(method)), ("url", v_str(url))]),
    );
}

pub fn log_response(status: u16, url: &str) {
    log(
        Level::Debug,
        Domain::Http,
        "response",
        obj(&[("status", json!(status)), ("url", v_str(url))]),
    );
}

/// Failed call: `kind` is the error class, `detail` the body or transport message.
pub fn log_response_error(kind: &str, detail: &str, url: &str) {
    log(
        Level::Error,
        Domain::Http,
        "response_error",
        obj(&[("kind", v_str(kind)), ("msg", v_str(detail)), ("url", v_str(url))]),
    );
}

pub fn log_retry(operation: &str, attempt: u32, max_attempts: u32, delay_ms: u64, error: &str) {
    log(
        Level::Warn,
        Domain::Retry,
        "retry",
        obj(&[
            ("operation", v_str(operation)),
            ("attempt", json!(attempt)),
            ("max", json!(max_attempts)),
            ("delay_ms", json!(delay_ms)),
            ("msg", v_str(error)),
        ]),
    );
}

pub fn obj(pairs: &[(&str, Value)]) -> Map<String, Value> {
    pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
}

pub fn v_str(s: &str) -> Value {
    json!(s)
}

pub fn v_num(n: f64) -> Value {
    json!(n)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_names_parse_back() {
        for level in Level::ALL {
            assert_eq!(Level::parse_or_info(Some(level.name())), level);
        }
        assert_eq!(Level::parse_or_info(Some(" WARN ")), Level::Warn);
        assert_eq!(Level::parse_or_info(Some("verbose")), Level::Info);
        assert_eq!(Level::parse_or_info(None), Level::Info);
    }

    #[test]
    fn test_filter_by_level_and_domain() {
        let f = Filter::new(Some("warn"), Some("http, retry"));
        assert!(f.allows(Level::Error, Domain::Http));
        assert!(f.allows(Level::Warn, Domain::Retry));
        assert!(!f.allows(Level::Info, Domain::Http));
        assert!(!f.allows(Level::Error, Domain::Dashboard));

        let all = Filter::new(None, Some("all"));
        assert!(all.allows(Level::Info, Domain::Export));
        assert!(!all.allows(Level::Debug, Domain::Export));
    }

    #[test]
    fn test_record_masks_secrets_and_promotes_keys() {
        let fields = obj(&[
            ("url", v_str("http://x/api/health")),
            ("Authorization", v_str("Bearer secret")),
            ("status", json!(200)),
            ("msg", v_str("ok")),
            ("ratio", v_num(0.5)),
        ]);
        let rec = record("run-1", 7, Level::Info, Domain::Http, "response", fields);
        assert_eq!(rec["seq"], 7);
        assert_eq!(rec["level"], "INFO");
        assert_eq!(rec["domain"], "http");
        assert_eq!(rec["url"], "http://x/api/health");
        assert_eq!(rec["msg"], "ok");
        assert_eq!(rec["data"]["Authorization"], "[REDACTED]");
        assert_eq!(rec["data"]["status"], 200);
        assert_eq!(rec["data"]["ratio"], 0.5);
        assert!(rec["data"].get("url").is_none());
    }

    #[test]
    fn test_events_file_lands_under_run_dir() {
        let dir = tempfile::tempdir().unwrap();
        let mut f = open_events_file(dir.path(), "run-42").unwrap();
        writeln!(f, "{{}}").unwrap();
        assert!(dir.path().join("run-42").join("events.jsonl").exists());
    }
}
