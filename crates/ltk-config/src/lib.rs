//! ltk-config
//!
//! Layered YAML configuration for the reconciler.
//!
//! - Docs are merged in order; later docs override earlier ones key by key.
//! - The merged document is hashed (SHA-256 over canonical JSON) so a run's
//!   log line pins exactly which configuration it ran with.
//! - Literal secrets are refused; config stores env var NAMES only.
//! - [`report_unused_keys`] flags keys nothing reads.
//! - [`ReconcilerConfig`] is the typed view the runtime consumes.

mod consumption;
mod reconciler;

use anyhow::{bail, Context, Result};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs;

pub use consumption::{
    consumed_pointers, leaf_pointers, report_unused_keys, UnusedKeyPolicy, UnusedKeyReport,
};
pub use reconciler::{ReconcilerConfig, SourceConfig};

/// Leaf string values starting with one of these abort loading with
/// CONFIG_SECRET_DETECTED.
const SECRET_PREFIXES: &[&str] = &[
    "sk-",
    "sk_live",
    "sk_test",
    "AKIA",
    "-----BEGIN",
    "ghp_",
    "glpat-",
    "xoxb-",
    "postgres://",
    "postgresql://",
];

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config_hash: String,
    pub canonical_json: String,
    pub config_json: Value,
}

impl LoadedConfig {
    /// Typed reconciler settings from the merged document.
    pub fn reconciler(&self) -> Result<ReconcilerConfig> {
        ReconcilerConfig::from_config_json(&self.config_json)
    }
}

pub fn load_layered_yaml(paths: &[&str]) -> Result<LoadedConfig> {
    let mut docs: Vec<String> = Vec::new();
    for p in paths {
        let raw =
            fs::read_to_string(p).with_context(|| format!("failed to read yaml path: {p}"))?;
        docs.push(raw);
    }

    let doc_refs: Vec<&str> = docs.iter().map(|s| s.as_str()).collect();
    load_layered_yaml_from_strings(&doc_refs)
}

pub fn load_layered_yaml_from_strings(yaml_docs: &[&str]) -> Result<LoadedConfig> {
    let mut merged = serde_json::json!({});
    for raw in yaml_docs {
        let v_yaml: serde_yaml::Value = serde_yaml::from_str(raw).context("invalid yaml")?;
        let v_json = serde_json::to_value(v_yaml).context("yaml->json conversion failed")?;
        // An empty YAML doc parses to null; treat it as "no overrides".
        if v_json.is_null() {
            continue;
        }
        merged = deep_merge(merged, v_json);
    }

    enforce_no_secret_literals(&merged)?;

    let canonical_json = canonicalize_json(&merged)?;
    let config_hash = sha256_hex(canonical_json.as_bytes());
    Ok(LoadedConfig {
        config_hash,
        canonical_json,
        config_json: merged,
    })
}

fn deep_merge(a: Value, b: Value) -> Value {
    match (a, b) {
        (Value::Object(mut a_map), Value::Object(b_map)) => {
            for (k, b_val) in b_map {
                let a_val = a_map.remove(&k).unwrap_or(Value::Null);
                a_map.insert(k, deep_merge(a_val, b_val));
            }
            Value::Object(a_map)
        }
        (_, b_other) => b_other,
    }
}

/// Serialize with keys sorted at every level, so key order in the YAML
/// never changes the hash.
fn canonicalize_json(v: &Value) -> Result<String> {
    let sorted = sort_keys(v);
    serde_json::to_string(&sorted).context("canonical json serialize failed")
}

fn sort_keys(v: &Value) -> Value {
    match v {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut out = serde_json::Map::new();
            for k in keys {
                if let Some(child) = map.get(k) {
                    out.insert(k.clone(), sort_keys(child));
                }
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(sort_keys).collect()),
        other => other.clone(),
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

fn enforce_no_secret_literals(v: &Value) -> Result<()> {
    for ptr in leaf_pointers(v) {
        let is_secret = v
            .pointer(&ptr)
            .and_then(Value::as_str)
            .is_some_and(looks_like_secret);
        if is_secret {
            bail!("CONFIG_SECRET_DETECTED leaf={ptr} value=REDACTED");
        }
    }
    Ok(())
}

fn looks_like_secret(s: &str) -> bool {
    let t = s.trim();
    if t.len() < 8 {
        return false;
    }
    SECRET_PREFIXES.iter().any(|p| t.starts_with(p))
}
