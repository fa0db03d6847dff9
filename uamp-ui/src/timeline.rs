//! Receipt timeline rendering
//!
//! Maps the gateway's receipt sequence onto display steps through a fixed
//! lookup table. Rendering is a pure projection: receipts are borrowed,
//! never reordered or modified.

use std::fmt;
use uamp_common::api::Receipt;
use uamp_common::time::format_timestamp;

/// Step tag whose presence as the final receipt shows the completion banner
pub const SETTLEMENT_STEP: &str = "SETTLEMENT_REACHED";

/// Step tag marking a receipt as verified on-chain
pub const ANCHORED_STEP: &str = "ANCHOR_COMPLETE";

/// Color family of a step marker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Info,
    Progress,
    Warning,
    Success,
    Failure,
    Neutral,
}

impl Tone {
    /// ANSI SGR color code
    pub fn ansi(&self) -> &'static str {
        match self {
            Tone::Info => "34",
            Tone::Progress => "35",
            Tone::Warning => "33",
            Tone::Success => "32",
            Tone::Failure => "31",
            Tone::Neutral => "90",
        }
    }
}

/// Presentation of one pipeline step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepStyle {
    pub label: &'static str,
    pub marker: &'static str,
    pub tone: Tone,
}

const STEP_TABLE: &[(&str, StepStyle)] = &[
    ("INTAKE_V1", StepStyle { label: "Intake", marker: "📥", tone: Tone::Info }),
    ("SEARCH_INIT", StepStyle { label: "Search Initialized", marker: "🔍", tone: Tone::Info }),
    ("SEARCH_COMPLETE", StepStyle { label: "Search Complete", marker: "✓", tone: Tone::Progress }),
    ("NEGOTIATION_START", StepStyle { label: "Negotiation Started", marker: "🤝", tone: Tone::Warning }),
    ("NASH_COMPUTED", StepStyle { label: "Nash Equilibrium", marker: "⚖️", tone: Tone::Warning }),
    ("SETTLEMENT_REACHED", StepStyle { label: "Settlement", marker: "✅", tone: Tone::Success }),
    ("ANCHOR_PENDING", StepStyle { label: "Anchoring", marker: "⏳", tone: Tone::Neutral }),
    ("ANCHOR_COMPLETE", StepStyle { label: "Anchored", marker: "🔗", tone: Tone::Success }),
    ("ERROR", StepStyle { label: "Error", marker: "❌", tone: Tone::Failure }),
];

const FALLBACK_MARKER: &str = "•";

/// Look up the presentation of a known step tag
pub fn step_style(step: &str) -> Option<&'static StepStyle> {
    STEP_TABLE
        .iter()
        .find(|(tag, _)| *tag == step)
        .map(|(_, style)| style)
}

/// One rendered receipt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelineEntry<'a> {
    pub receipt: &'a Receipt,
    /// Table label, or the raw step tag for unknown steps
    pub label: &'a str,
    pub marker: &'static str,
    pub tone: Tone,
    pub timestamp: String,
    pub verified_on_chain: bool,
    pub is_last: bool,
}

/// Rendered timeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimelineView<'a> {
    /// No receipts yet
    Empty,
    Steps {
        entries: Vec<TimelineEntry<'a>>,
        settlement_banner: bool,
    },
}

/// Project a receipt sequence onto timeline entries
pub fn render_timeline(receipts: &[Receipt]) -> TimelineView<'_> {
    let Some(last) = receipts.last() else {
        return TimelineView::Empty;
    };

    let entries = receipts
        .iter()
        .enumerate()
        .map(|(index, receipt)| {
            let (label, marker, tone) = match step_style(&receipt.step) {
                Some(style) => (style.label, style.marker, style.tone),
                None => (receipt.step.as_str(), FALLBACK_MARKER, Tone::Neutral),
            };
            TimelineEntry {
                receipt,
                label,
                marker,
                tone,
                timestamp: format_timestamp(&receipt.ts),
                verified_on_chain: receipt.step == ANCHORED_STEP,
                is_last: index + 1 == receipts.len(),
            }
        })
        .collect();

    TimelineView::Steps {
        entries,
        settlement_banner: last.step == SETTLEMENT_STEP,
    }
}

impl fmt::Display for TimelineView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (entries, settlement_banner) = match self {
            TimelineView::Empty => {
                writeln!(f, "  No receipts yet")?;
                return writeln!(
                    f,
                    "  Receipts will appear here as your dispute is processed"
                );
            }
            TimelineView::Steps {
                entries,
                settlement_banner,
            } => (entries, *settlement_banner),
        };

        for entry in entries {
            writeln!(
                f,
                "  {} {}  [{}]  {}",
                entry.marker, entry.label, entry.receipt.receipt_id, entry.timestamp
            )?;
            writeln!(f, "  │   Inputs:  {}", entry.receipt.hashes.inputs_hash)?;
            writeln!(f, "  │   Outputs: {}", entry.receipt.hashes.outputs_hash)?;
            if entry.verified_on_chain {
                writeln!(f, "  │   ✔ Verified on-chain")?;
            }
            if !entry.is_last {
                writeln!(f, "  │")?;
            }
        }

        if settlement_banner {
            writeln!(f)?;
            writeln!(f, "  ✔ Dispute Resolution Complete")?;
            writeln!(
                f,
                "    All parties have reached a settlement through the Nash equilibrium negotiation process."
            )?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uamp_common::api::ReceiptHashes;

    fn receipt(id: &str, step: &str) -> Receipt {
        Receipt {
            receipt_id: id.to_string(),
            step: step.to_string(),
            hashes: ReceiptHashes {
                inputs_hash: format!("in-{}", id),
                outputs_hash: format!("out-{}", id),
            },
            ts: "2024-03-14T09:26:53Z".to_string(),
        }
    }

    fn labels<'a>(view: &'a TimelineView<'a>) -> Vec<&'a str> {
        match view {
            TimelineView::Empty => Vec::new(),
            TimelineView::Steps { entries, .. } => entries.iter().map(|e| e.label).collect(),
        }
    }

    #[test]
    fn test_empty_receipts_render_empty_state() {
        let view = render_timeline(&[]);
        assert_eq!(view, TimelineView::Empty);
        assert!(view.to_string().contains("No receipts yet"));
    }

    #[test]
    fn test_known_steps_use_table_labels() {
        let receipts = vec![receipt("r1", "INTAKE_V1"), receipt("r2", "NASH_COMPUTED")];
        let view = render_timeline(&receipts);
        assert_eq!(labels(&view), vec!["Intake", "Nash Equilibrium"]);
    }

    #[test]
    fn test_unknown_step_falls_back_to_raw_tag() {
        let receipts = vec![receipt("r1", "CUSTOM_AUDIT")];
        let view = render_timeline(&receipts);

        let TimelineView::Steps { entries, .. } = &view else {
            panic!("expected steps");
        };
        assert_eq!(entries[0].label, "CUSTOM_AUDIT");
        assert_eq!(entries[0].marker, FALLBACK_MARKER);
        assert_eq!(entries[0].tone, Tone::Neutral);
    }

    #[test]
    fn test_order_preserved_and_last_flagged() {
        let receipts = vec![
            receipt("r3", "SEARCH_COMPLETE"),
            receipt("r1", "INTAKE_V1"),
            receipt("r2", "SEARCH_INIT"),
        ];
        let view = render_timeline(&receipts);

        let TimelineView::Steps { entries, .. } = &view else {
            panic!("expected steps");
        };
        let ids: Vec<&str> = entries.iter().map(|e| e.receipt.receipt_id.as_str()).collect();
        assert_eq!(ids, vec!["r3", "r1", "r2"]);
        assert_eq!(
            entries.iter().map(|e| e.is_last).collect::<Vec<_>>(),
            vec![false, false, true]
        );
    }

    #[test]
    fn test_rendering_twice_is_identical() {
        let receipts = vec![
            receipt("r1", "INTAKE_V1"),
            receipt("r2", "MYSTERY"),
            receipt("r3", "SETTLEMENT_REACHED"),
        ];
        let snapshot = receipts.clone();

        let first = render_timeline(&receipts);
        let second = render_timeline(&receipts);

        assert_eq!(first, second);
        assert_eq!(labels(&first), labels(&second));
        assert_eq!(receipts, snapshot);
    }

    #[test]
    fn test_settlement_banner_only_when_last() {
        let ends_settled = vec![receipt("r1", "NASH_COMPUTED"), receipt("r2", "SETTLEMENT_REACHED")];
        let view = render_timeline(&ends_settled);
        assert!(matches!(view, TimelineView::Steps { settlement_banner: true, .. }));
        assert!(view.to_string().contains("Dispute Resolution Complete"));

        let anchored_after = vec![
            receipt("r1", "SETTLEMENT_REACHED"),
            receipt("r2", "ANCHOR_COMPLETE"),
        ];
        let view = render_timeline(&anchored_after);
        assert!(matches!(view, TimelineView::Steps { settlement_banner: false, .. }));
    }

    #[test]
    fn test_anchor_complete_marked_verified() {
        let receipts = vec![receipt("r1", "ANCHOR_PENDING"), receipt("r2", "ANCHOR_COMPLETE")];
        let view = render_timeline(&receipts);

        let TimelineView::Steps { entries, .. } = &view else {
            panic!("expected steps");
        };
        assert!(!entries[0].verified_on_chain);
        assert!(entries[1].verified_on_chain);
        assert!(view.to_string().contains("Verified on-chain"));
    }

    #[test]
    fn test_text_rendering_includes_hashes_and_time() {
        let receipts = vec![receipt("r1", "INTAKE_V1")];
        let text = render_timeline(&receipts).to_string();

        assert!(text.contains("in-r1"));
        assert!(text.contains("out-r1"));
        assert!(text.contains("3/14/24, 9:26:53 AM"));
    }

    #[test]
    fn test_step_table_lookup() {
        assert_eq!(step_style("ERROR").map(|s| s.tone), Some(Tone::Failure));
        assert!(step_style("intake_v1").is_none());
    }
}
