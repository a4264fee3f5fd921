//! User-facing report text

use export::ExportOutcome;
use std::time::Duration;

/// Phase durations measured with `--profile`
#[derive(Debug, Clone, Copy, Default)]
pub struct Timings {
    pub collection: Duration,
    pub export: Duration,
}

/// `HH:MM:SS.mmm`
pub fn format_duration(duration: Duration) -> String {
    let millis = duration.as_millis();
    let secs = millis / 1000;
    format!(
        "{:02}:{:02}:{:02}.{:03}",
        secs / 3600,
        secs / 60 % 60,
        secs % 60,
        millis % 1000
    )
}

pub fn summary(layers: usize, visible: usize) -> String {
    format!("{layers} layers, {visible} visible")
}

/// Closing message of a run
pub fn final_message(outcome: &ExportOutcome, cancelled: bool, timings: Option<&Timings>) -> String {
    let mut message = String::new();
    if cancelled {
        message.push_str("Export cancelled!\n\n");
    }
    message.push_str(&format!("Saved {} files.", outcome.succeeded));
    if let Some(timings) = timings {
        message.push_str(&format!(
            "\n\nExport function took {} + {} to perform.",
            format_duration(timings.collection),
            format_duration(timings.export)
        ));
    }
    if outcome.any_failure {
        message.push_str("\n\nSome layers failed to export! (Are there many layers with the same name?)");
    }
    message
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn durations() {
        assert_eq!(format_duration(Duration::ZERO), "00:00:00.000");
        assert_eq!(format_duration(Duration::from_millis(61_005)), "00:01:01.005");
        assert_eq!(format_duration(Duration::from_secs(3 * 3600 + 7)), "03:00:07.000");
    }

    #[test]
    fn plain_success() {
        let outcome = ExportOutcome {
            succeeded: 4,
            ..Default::default()
        };
        assert_eq!(final_message(&outcome, false, None), "Saved 4 files.");
        assert_eq!(summary(7, 4), "7 layers, 4 visible");
    }

    #[test]
    fn cancelled_with_failures_and_timings() {
        let outcome = ExportOutcome {
            succeeded: 1,
            any_failure: true,
            failed: vec!["dup".to_string()],
            written: Vec::new(),
        };
        let timings = Timings {
            collection: Duration::from_millis(12),
            export: Duration::from_millis(1500),
        };
        assert_eq!(
            final_message(&outcome, true, Some(&timings)),
            "Export cancelled!\n\nSaved 1 files.\n\n\
             Export function took 00:00:00.012 + 00:00:01.500 to perform.\n\n\
             Some layers failed to export! (Are there many layers with the same name?)"
        );
    }
}
