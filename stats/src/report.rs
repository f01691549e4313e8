// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Final report rendering.

use crate::StageStats;
use classify::AppLabel;
use net::packet::DissectErrorKind;
use strum::IntoEnumIterator;

/// The end-of-run report printed to stdout.
///
/// Applications are listed by descending packet count (label name breaks
/// ties so two runs over the same capture render identically); an
/// application any of whose packets were dropped is annotated `(BLOCKED)`.
#[derive(Debug, Clone)]
pub struct Report {
    stats: StageStats,
}

impl Report {
    /// Wrap merged pipeline counters.
    #[must_use]
    pub fn new(stats: StageStats) -> Report {
        Report { stats }
    }

    /// The merged counters behind the report.
    #[must_use]
    pub const fn stats(&self) -> &StageStats {
        &self.stats
    }

    fn breakdown(&self) -> Vec<(AppLabel, u64, bool)> {
        let mut rows: Vec<(AppLabel, u64, bool)> = AppLabel::iter()
            .filter_map(|app| {
                let total = self.stats.app_total(app);
                (total > 0).then(|| (app, total, self.stats.app_dropped(app) > 0))
            })
            .collect();
        rows.sort_by(|(app_a, count_a, _), (app_b, count_b, _)| {
            count_b
                .cmp(count_a)
                .then_with(|| app_a.to_string().cmp(&app_b.to_string()))
        });
        rows
    }
}

impl core::fmt::Display for Report {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        writeln!(f, "Total Packets: {}", self.stats.total_packets())?;
        writeln!(f, "Forwarded: {}", self.stats.forwarded)?;
        writeln!(f, "Dropped: {}", self.stats.dropped)?;
        writeln!(f, "Pass-through: {}", self.stats.pass_through)?;
        writeln!(f, "Application Breakdown:")?;
        for (app, count, blocked) in self.breakdown() {
            if blocked {
                writeln!(f, "  {app}  {count} (BLOCKED)")?;
            } else {
                writeln!(f, "  {app}  {count}")?;
            }
        }
        let l7_errors = self.stats.malformed_tls + self.stats.malformed_http;
        let dissect_errors: u64 = self.stats.dissect_errors.iter().sum();
        if dissect_errors + l7_errors > 0 {
            writeln!(f, "Parse Errors:")?;
            for kind in DissectErrorKind::iter() {
                let count = self.stats.dissect_errors(kind);
                if count > 0 {
                    writeln!(f, "  {kind}  {count}")?;
                }
            }
            if self.stats.malformed_tls > 0 {
                writeln!(f, "  MalformedTls  {}", self.stats.malformed_tls)?;
            }
            if self.stats.malformed_http > 0 {
                writeln!(f, "  MalformedHttp  {}", self.stats.malformed_http)?;
            }
        }
        Ok(())
    }
}

#[allow(clippy::unwrap_used)] // valid in test code
#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn renders_sorted_breakdown_with_block_annotation() {
        let mut stats = StageStats::default();
        for _ in 0..5 {
            stats.record_forwarded(AppLabel::Https);
        }
        for _ in 0..3 {
            stats.record_forwarded(AppLabel::YouTube);
        }
        for _ in 0..4 {
            stats.record_dropped(AppLabel::YouTube);
        }
        stats.record_pass_through(None);

        let rendered = Report::new(stats).to_string();
        assert_eq!(
            rendered,
            "Total Packets: 13\n\
             Forwarded: 8\n\
             Dropped: 4\n\
             Pass-through: 1\n\
             Application Breakdown:\n\
             \x20 YouTube  7 (BLOCKED)\n\
             \x20 Https  5\n"
        );
    }

    #[test]
    fn parse_error_tail_renders_only_when_present() {
        let mut stats = StageStats::default();
        stats.record_forwarded(AppLabel::Dns);
        assert!(!Report::new(stats.clone()).to_string().contains("Parse Errors"));

        stats.record_pass_through(Some(DissectErrorKind::FragmentedUnsupported));
        stats.malformed_tls = 2;
        let rendered = Report::new(stats).to_string();
        assert!(rendered.contains("Parse Errors:\n"));
        assert!(rendered.contains("  FragmentedUnsupported  1\n"));
        assert!(rendered.contains("  MalformedTls  2\n"));
    }

    #[test]
    fn identical_stats_render_identically() {
        let mut stats = StageStats::default();
        stats.record_forwarded(AppLabel::Google);
        stats.record_forwarded(AppLabel::Facebook);
        let first = Report::new(stats.clone()).to_string();
        let second = Report::new(stats).to_string();
        assert_eq!(first, second);
        // equal counts fall back to name order
        let facebook = first.find("Facebook").unwrap();
        let google = first.find("Google").unwrap();
        assert!(facebook < google);
    }
}
