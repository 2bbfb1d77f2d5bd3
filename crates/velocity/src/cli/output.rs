//! Output formatting for CLI commands.

use comfy_table::{presets::UTF8_FULL_CONDENSED, Cell, Color, ContentArrangement, Table};

/// Standard table shape used by list commands.
pub fn table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(headers.iter().map(|h| Cell::new(h)).collect::<Vec<_>>());
    table
}

/// Green/red status cell.
pub fn status_cell(ok: bool) -> Cell {
    if ok {
        Cell::new("ok").fg(Color::Green)
    } else {
        Cell::new("failed").fg(Color::Red)
    }
}

/// Severity gets its own color scale in change listings.
pub fn severity_cell(severity: &str) -> Cell {
    match severity {
        "critical" => Cell::new(severity).fg(Color::Red),
        "moderate" => Cell::new(severity).fg(Color::Yellow),
        _ => Cell::new(severity),
    }
}

pub fn format_duration_secs(secs: f64) -> String {
    if secs >= 60.0 {
        format!("{}m{:02.0}s", (secs / 60.0) as u64, secs % 60.0)
    } else {
        format!("{:.1}s", secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn durations_humanize() {
        assert_eq!(format_duration_secs(12.34), "12.3s");
        assert_eq!(format_duration_secs(95.0), "1m35s");
    }
}
