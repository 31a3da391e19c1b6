use std::io::{self, Write};

use serde_json::Value;

use super::config::{OutputConfig, OutputFormat};
use super::types::{Body, Envelope};

pub trait Presenter: Send + Sync {
    fn emit(&self, env: &Envelope, w: &mut dyn Write) -> io::Result<()>;
}

pub struct JsonPresenter { pub pretty: bool }
impl Presenter for JsonPresenter {
    fn emit(&self, env: &Envelope, w: &mut dyn Write) -> io::Result<()> {
        if self.pretty { serde_json::to_writer_pretty(&mut *w, env).map_err(to_io)? } else { serde_json::to_writer(&mut *w, env).map_err(to_io)? }
        writeln!(w)
    }
}

/// One `key: value` line per top-level field of the plan/result body.
pub struct TextPresenter { pub pretty: bool }
impl Presenter for TextPresenter {
    fn emit(&self, env: &Envelope, w: &mut dyn Write) -> io::Result<()> {
        let label = match env.body { Body::Plan(_) => "Plan", Body::Result(_) => "Result" };
        writeln!(w, "{}: {} (run {})", label, env.op, env.run_id)?;
        match env.payload() {
            Value::Object(map) => {
                for (k, v) in map {
                    match v {
                        Value::String(s) => writeln!(w, "  {}: {}", k, s)?,
                        Value::Array(_) | Value::Object(_) if self.pretty => {
                            writeln!(w, "  {}:", k)?;
                            serde_json::to_writer_pretty(&mut *w, v).map_err(to_io)?;
                            writeln!(w)?;
                        }
                        other => writeln!(w, "  {}: {}", k, other)?,
                    }
                }
            }
            other => writeln!(w, "  {}", other)?,
        }
        Ok(())
    }
}

pub struct Emitter {
    presenter: Box<dyn Presenter>,
}

impl Emitter {
    pub fn from_config(cfg: OutputConfig) -> Self {
        let presenter: Box<dyn Presenter> = match cfg.format {
            OutputFormat::Json => Box::new(JsonPresenter { pretty: cfg.pretty }),
            OutputFormat::Text => Box::new(TextPresenter { pretty: cfg.pretty }),
        };
        Emitter { presenter }
    }

    pub fn emit(&self, env: &Envelope) -> io::Result<()> {
        let mut out = io::stdout();
        self.presenter.emit(env, &mut out)?;
        out.flush()
    }
}

fn to_io(e: serde_json::Error) -> io::Error { io::Error::new(io::ErrorKind::Other, e) }
