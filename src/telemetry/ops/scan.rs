use tracing::Span;
use tracing::info_span;

use crate::telemetry::ctx::{OpMarker, PhaseSpan};

#[derive(Copy, Clone, Debug)]
pub struct Scan;

#[derive(Copy, Clone, Debug)]
pub enum Phase { Plan, LoadLedger, FetchList, Probe, Classify, Flush }

impl PhaseSpan for Phase {
    fn name(&self) -> &'static str { match self {
        Phase::Plan => "plan",
        Phase::LoadLedger => "load_ledger",
        Phase::FetchList => "fetch_list",
        Phase::Probe => "probe",
        Phase::Classify => "classify",
        Phase::Flush => "flush",
    }}
    fn span(&self) -> Span { match self {
        Phase::Plan => info_span!("plan"),
        Phase::LoadLedger => info_span!("load_ledger"),
        Phase::FetchList => info_span!("fetch_list"),
        Phase::Probe => info_span!("probe"),
        Phase::Classify => info_span!("classify"),
        Phase::Flush => info_span!("flush"),
    }}
}

impl OpMarker for Scan {
    const NAME: &'static str = "scan";
    type Phase = Phase;
    fn root_span() -> Span { info_span!("scan") }
}
