use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

pub const SCHEMA_VERSION: &str = "subaudit.v1";

#[derive(Debug, Clone, Serialize, Default)]
pub struct Meta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u128>,
    /// Where the snapshot, ledger and side logs were read from / written to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<String>,
}

/// Plan (dry run) or result (after `--apply`); serialized as a `plan` or `result` key.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Body {
    Plan(Value),
    Result(Value),
}

/// The single document a `subaudit` invocation prints to stdout.
#[derive(Debug, Clone, Serialize)]
pub struct Envelope {
    pub schema_version: &'static str,
    pub time: DateTime<Utc>,
    /// Same id as the `run_id` on this invocation's log lines.
    pub run_id: Uuid,
    pub op: &'static str,
    pub apply: bool,
    #[serde(flatten)]
    pub body: Body,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
}

impl Envelope {
    pub fn new(run_id: Uuid, op: &'static str, body: Body, meta: Option<Meta>) -> Self {
        let apply = matches!(body, Body::Result(_));
        Envelope { schema_version: SCHEMA_VERSION, time: Utc::now(), run_id, op, apply, body, meta }
    }

    pub fn plan<T: Serialize>(run_id: Uuid, op: &'static str, plan: &T, meta: Option<Meta>) -> Result<Self, serde_json::Error> {
        Ok(Self::new(run_id, op, Body::Plan(serde_json::to_value(plan)?), meta))
    }

    pub fn result<T: Serialize>(run_id: Uuid, op: &'static str, result: &T, meta: Option<Meta>) -> Result<Self, serde_json::Error> {
        Ok(Self::new(run_id, op, Body::Result(serde_json::to_value(result)?), meta))
    }

    pub fn payload(&self) -> &Value {
        match &self.body {
            Body::Plan(v) | Body::Result(v) => v,
        }
    }
}
