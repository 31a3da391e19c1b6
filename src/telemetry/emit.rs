use anyhow::Result;
use serde::Serialize;

use crate::output::config::{OutputConfig, OutputFormat};
use crate::output::types::{Envelope, Meta};
use crate::output::Emitter;

use super::config;

fn emitter() -> Emitter {
    let mut cfg = OutputConfig::from_env();
    if config::json_mode() { cfg.format = OutputFormat::Json; }
    Emitter::from_config(cfg)
}

pub fn print_plan<T: Serialize>(op: &'static str, plan: &T, meta: Option<Meta>) -> Result<()> {
    let env = Envelope::plan(config::run_id(), op, plan, meta)?;
    emitter().emit(&env)?;
    Ok(())
}

pub fn print_result<T: Serialize>(op: &'static str, result: &T, meta: Option<Meta>) -> Result<()> {
    let env = Envelope::result(config::run_id(), op, result, meta)?;
    emitter().emit(&env)?;
    Ok(())
}
