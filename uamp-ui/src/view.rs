//! Terminal rendering of controller state
//!
//! Produces the text shown after each state change: banners, the status
//! panel, the receipt timeline and the privacy budget panel.

use std::fmt::Write;
use uamp_common::api::{EpsBudget, Phase, StatusResponse};

use crate::controller::{ControllerPhase, ControllerState};
use crate::probe::Reachability;
use crate::timeline::{render_timeline, Tone};

const BUDGET_BAR_WIDTH: usize = 30;

/// Color family of a phase badge
pub fn phase_tone(phase: Phase) -> Tone {
    match phase {
        Phase::Complete => Tone::Success,
        Phase::Error => Tone::Failure,
        Phase::Negotiating => Tone::Warning,
        Phase::Searching => Tone::Info,
        Phase::Intake => Tone::Neutral,
    }
}

fn paint(text: &str, tone: Tone, color: bool) -> String {
    if color {
        format!("\x1b[{}m{}\x1b[0m", tone.ansi(), text)
    } else {
        text.to_string()
    }
}

/// One-line connection indicator
pub fn render_reachability(reachability: Reachability, gateway: &str) -> String {
    match reachability {
        Reachability::Unknown => format!("○ Checking gateway at {}...", gateway),
        Reachability::Reachable => format!("● Connected to gateway at {}", gateway),
        Reachability::Unreachable => format!("✖ Disconnected from gateway at {}", gateway),
    }
}

/// Privacy budget panel with a usage bar
pub fn render_budget(budget: &EpsBudget) -> String {
    let filled = (budget.usage_ratio() * BUDGET_BAR_WIDTH as f64).round() as usize;
    let mut out = String::new();
    let _ = writeln!(out, "Privacy Budget");
    let _ = writeln!(out, "  Tenant: {}", budget.tenant_id);
    let _ = writeln!(out, "  Spent:  {:.2} ε", budget.spent);
    let _ = writeln!(out, "  Budget: {:.2} ε", budget.budget);
    let _ = writeln!(
        out,
        "  [{}{}]",
        "█".repeat(filled),
        "░".repeat(BUDGET_BAR_WIDTH - filled)
    );
    out
}

fn render_status_header(out: &mut String, status: &StatusResponse, color: bool) {
    let _ = writeln!(
        out,
        "Dispute Status  [{}]",
        paint(status.phase.as_str(), phase_tone(status.phase), color)
    );
}

/// Full view of the controller state
pub fn render_state(state: &ControllerState, color: bool) -> String {
    let mut out = String::new();

    if let Some(error) = &state.error {
        let _ = writeln!(out, "{}", paint(&format!("✖ {}", error), Tone::Failure, color));
    }

    if let Some(network_error) = &state.network_error {
        let line = if state.phase == ControllerPhase::ConnectionLost {
            paint(&format!("✖ {}", network_error), Tone::Failure, color)
        } else {
            paint(&format!("⚠ {}", network_error), Tone::Warning, color)
        };
        let _ = writeln!(out, "{}", line);
    }

    let Some(dispute_id) = &state.dispute_id else {
        return out;
    };

    if !out.is_empty() {
        out.push('\n');
    }

    let polling = state.phase == ControllerPhase::Polling;
    match &state.status {
        Some(status) => render_status_header(&mut out, status, color),
        None if polling => {
            let _ = writeln!(out, "Dispute Status  (fetching status...)");
        }
        None => {
            let _ = writeln!(out, "Dispute Status");
        }
    }

    let _ = writeln!(out, "  Dispute ID: {}", dispute_id);
    if let Some(anchor_uri) = state.anchor_uri.as_deref().filter(|a| !a.is_empty()) {
        let _ = writeln!(out, "  Anchor:     {}", anchor_uri);
    }
    if let Some(anchor) = state.status.as_ref().and_then(|s| s.anchor_tx.as_ref()) {
        let _ = writeln!(
            out,
            "  On-chain:   {} • Block #{} • {}...",
            anchor.network,
            anchor.block,
            anchor.short_tx()
        );
    }

    out.push('\n');
    match &state.status {
        Some(status) => {
            let live = polling && !status.receipts.is_empty();
            let _ = writeln!(
                out,
                "Processing Timeline{}",
                if live { "  ● Live" } else { "" }
            );
            let _ = write!(out, "{}", render_timeline(&status.receipts));
        }
        None => {
            let _ = writeln!(out, "Processing Timeline");
            let _ = writeln!(out, "  Waiting for receipts...");
        }
    }

    if let Some(budget) = state.status.as_ref().and_then(|s| s.eps_budget.as_ref()) {
        out.push('\n');
        out.push_str(&render_budget(budget));
    }

    out
}
