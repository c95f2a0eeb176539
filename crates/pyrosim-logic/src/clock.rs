//! Simulated wall-clock formatting for operator logs.

/// Format simulated seconds as a 24-hour `HH:MM:SS` clock.
pub fn format_clock(sim_secs: f64) -> String {
    let total = if sim_secs.is_finite() && sim_secs > 0.0 {
        sim_secs.floor() as u64
    } else {
        0
    };
    let h = (total / 3600) % 24;
    let m = (total / 60) % 60;
    let s = total % 60;
    format!("{:02}:{:02}:{:02}", h, m, s)
}
