//! Readable rendering of the JSON log format (`LOG_FORMAT=json`), used by
//! `userhub logs`.

use std::io::{self, BufRead, Write};

use serde_json::{Map, Value};

/// Fields printed on every line, in this order, when present.
const SUMMARY: [&str; 5] = ["method", "path", "status", "latency_ms", "request_id"];

/// Envelope keys of the JSON formatter. They are never printed as fields.
const ENVELOPE: [&str; 7] = [
    "timestamp", "level", "message", "fields", "span", "spans", "target",
];

/// Renders one log line. Anything that is not a JSON object comes back
/// unchanged.
pub fn format_line(line: &str, verbose: bool) -> String {
    let Ok(Value::Object(entry)) = serde_json::from_str::<Value>(line) else {
        return line.to_string();
    };
    let fields = collect_fields(&entry);

    let mut out = format!(
        "{} {:<5} {}",
        text(entry.get("timestamp")).unwrap_or("-"),
        text(entry.get("level")).unwrap_or("-"),
        fields.get("message").map(render).unwrap_or_default(),
    );
    for key in SUMMARY {
        if let Some(value) = fields.get(key) {
            out.push_str(&format!(" {key}={}", render(value)));
        }
    }
    if verbose {
        for (key, value) in &fields {
            if key != "message" && !SUMMARY.contains(&key.as_str()) {
                out.push_str(&format!(" {key}={}", render(value)));
            }
        }
    }
    out
}

/// Formats every line of `input` into `out`.
pub fn read_logs(input: impl BufRead, mut out: impl Write, verbose: bool) -> io::Result<()> {
    for line in input.lines() {
        writeln!(out, "{}", format_line(&line?, verbose))?;
    }
    out.flush()
}

// Outer spans first, then the current span, then the event's own fields, so
// the innermost value wins on a name clash.
fn collect_fields(entry: &Map<String, Value>) -> Map<String, Value> {
    let mut merged = Map::new();
    for (key, value) in entry {
        if !ENVELOPE.contains(&key.as_str()) {
            merged.insert(key.clone(), value.clone());
        }
    }
    let spans = entry
        .get("spans")
        .and_then(Value::as_array)
        .into_iter()
        .flatten();
    for span in spans.chain(entry.get("span")).chain(entry.get("fields")) {
        if let Some(map) = span.as_object() {
            for (key, value) in map {
                if key != "name" {
                    merged.insert(key.clone(), value.clone());
                }
            }
        }
    }
    if let Some(message) = entry.get("message") {
        merged.entry("message").or_insert_with(|| message.clone());
    }
    merged
}

fn text(value: Option<&Value>) -> Option<&str> {
    value.and_then(Value::as_str)
}

fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
