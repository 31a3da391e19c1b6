use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;

fn iso_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^P(?:(\d+)D)?(?:T(?:(\d+)H)?(?:(\d+)M)?(?:(\d+)S)?)?$").expect("static regex")
    })
}

// Parse the ISO-8601 durations the videos endpoint returns ("PT1M", "PT45S", "P1DT2H").
// Returns None for anything else, including the bare "P" / "PT" forms and totals that overflow.
pub fn parse_iso8601(s: &str) -> Option<Duration> {
    let s = s.trim();
    if s == "P" || s.ends_with('T') { return None; }
    let caps = iso_re().captures(s)?;
    let mut secs: u64 = 0;
    for (i, unit) in [(1, 86_400u64), (2, 3_600), (3, 60), (4, 1)] {
        let Some(m) = caps.get(i) else { continue };
        let n: u64 = m.as_str().parse().ok()?;
        secs = secs.checked_add(n.checked_mul(unit)?)?;
    }
    Some(Duration::from_secs(secs))
}
