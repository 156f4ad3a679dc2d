#!/usr/bin/env rust-script
//! Coherence Simulator - deterministic turn scenarios over scripted agents
//!
//! Usage:
//!   coherence_sim --scenario calm
//!   coherence_sim --scenario escalation
//!   coherence_sim --scenario contradiction
//!   coherence_sim --scenario analyst-failure
//!   coherence_sim --scenario all
//!
//! Drives the real turn pipeline over fake agent clients, so every run is
//! reproducible without a model backend. Outputs machine-readable JSON
//! reports to ./artifacts/simulations/

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use sera_common::{AgentRole, AgentUpdate, ProviderError, RegulationMode, MAX_REPAIRS};
use serad::config::SeraConfig;
use serad::engine::{CoherenceEngine, FakeAgentClient, FakeAgentClientBuilder, StepOutcome};
use serad::persistence::MemoryStore;

// ============================================================================
// REPORT TYPES
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CheckOutcome {
    name: String,
    passed: bool,
    detail: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SimulationReport {
    scenario: String,
    turns_run: usize,
    final_regulation: String,
    final_trust: f64,
    repair_count: u8,
    fallback_calls: usize,
    checks: Vec<CheckOutcome>,
    success: bool,
    notes: String,
}

fn check(checks: &mut Vec<CheckOutcome>, name: &str, passed: bool, detail: String) {
    checks.push(CheckOutcome {
        name: name.to_string(),
        passed,
        detail,
    });
}

// ============================================================================
// SIMULATOR LOGIC
// ============================================================================

/// Run every input through one session and return the last turn's outcome.
async fn drive(client: Arc<FakeAgentClient>, inputs: &[&str]) -> StepOutcome {
    let store = Arc::new(MemoryStore::new());
    let engine = CoherenceEngine::new(client, store, SeraConfig::default());
    let session_id = engine.create_session().await;

    let mut last = None;
    for input in inputs {
        last = Some(engine.step(session_id, input).await.unwrap());
    }
    last.unwrap()
}

fn report_from(
    scenario: &str,
    turns: usize,
    outcome: &StepOutcome,
    checks: Vec<CheckOutcome>,
    notes: String,
) -> SimulationReport {
    let success = checks.iter().all(|c| c.passed);
    SimulationReport {
        scenario: scenario.to_string(),
        turns_run: turns,
        final_regulation: outcome.state.regulation.label().to_string(),
        final_trust: outcome.state.trust_tau,
        repair_count: outcome.state.repair_count,
        fallback_calls: outcome.trace.fallback_count(),
        checks,
        success,
        notes,
    }
}

/// Unremarkable input over healthy agents: one pass, no regulation.
async fn simulate_calm() -> SimulationReport {
    let client = Arc::new(FakeAgentClient::calm());
    let inputs = ["good morning", "thanks, that was helpful"];
    let outcome = drive(client, &inputs).await;

    let mut checks = Vec::new();
    check(
        &mut checks,
        "regulation_normal",
        outcome.state.regulation == RegulationMode::Normal,
        format!("regulation settled at {}", outcome.state.regulation.label()),
    );
    check(
        &mut checks,
        "trust_high",
        outcome.state.trust_tau > 0.9,
        format!("trust tau {:.3}", outcome.state.trust_tau),
    );
    check(
        &mut checks,
        "no_repairs",
        outcome.state.repair_count == 0,
        format!("{} repair passes", outcome.state.repair_count),
    );
    check(
        &mut checks,
        "no_fallbacks",
        outcome.trace.fallback_count() == 0,
        format!("{} fallback calls", outcome.trace.fallback_count()),
    );
    check(
        &mut checks,
        "response_produced",
        !outcome.response_text.is_empty(),
        format!("{} chars of response text", outcome.response_text.len()),
    );

    report_from(
        "calm",
        inputs.len(),
        &outcome,
        checks,
        "Calm input settles on the initial pass; no regulation, repairs, or fallbacks.".to_string(),
    )
}

/// Analyst keeps reporting tension 0.9: repairs run to the cap and the
/// turn ends in slow-down with the budget exhausted.
async fn simulate_escalation() -> SimulationReport {
    let client = Arc::new(
        FakeAgentClientBuilder::new()
            .score_response(AgentRole::Analyst, AgentUpdate::tension(0.9))
            .build(),
    );
    let inputs = ["everything is going sideways at once"];
    let outcome = drive(client, &inputs).await;

    let mut checks = Vec::new();
    check(
        &mut checks,
        "regulation_slow_down",
        outcome.state.regulation == RegulationMode::SlowDown,
        format!("regulation settled at {}", outcome.state.regulation.label()),
    );
    check(
        &mut checks,
        "repair_budget_exhausted",
        outcome.state.repair_count == MAX_REPAIRS && outcome.trace.repairs_exhausted,
        format!(
            "{} of {} repair passes used",
            outcome.state.repair_count, MAX_REPAIRS
        ),
    );
    check(
        &mut checks,
        "one_initial_plus_repair_passes",
        outcome.trace.passes.len() == 1 + MAX_REPAIRS as usize,
        format!("{} scoring passes recorded", outcome.trace.passes.len()),
    );
    check(
        &mut checks,
        "tension_spills_into_contradiction",
        (outcome.state.contradiction - 0.15).abs() < 1e-9,
        format!("contradiction {:.3}", outcome.state.contradiction),
    );
    check(
        &mut checks,
        "trust_degraded",
        outcome.state.trust_tau < 0.7,
        format!("trust tau {:.3}", outcome.state.trust_tau),
    );
    check(
        &mut checks,
        "response_produced",
        !outcome.response_text.is_empty(),
        format!("{} chars of response text", outcome.response_text.len()),
    );

    report_from(
        "escalation",
        inputs.len(),
        &outcome,
        checks,
        "Sustained tension 0.9 holds slow-down through every repair pass; the cap stops the loop."
            .to_string(),
    )
}

/// The user reverses position between turns: polarity flips plus a
/// contrast marker push contradiction past the slow-down threshold.
async fn simulate_contradiction() -> SimulationReport {
    let client = Arc::new(FakeAgentClient::calm());
    let inputs = ["yes, I agree with the plan", "no, but I disagree"];
    let outcome = drive(client, &inputs).await;

    let mut checks = Vec::new();
    check(
        &mut checks,
        "contradiction_detected",
        outcome.state.contradiction > 0.7,
        format!("contradiction {:.3}", outcome.state.contradiction),
    );
    check(
        &mut checks,
        "regulation_slow_down",
        outcome.state.regulation == RegulationMode::SlowDown,
        format!("regulation settled at {}", outcome.state.regulation.label()),
    );
    check(
        &mut checks,
        "repair_budget_exhausted",
        outcome.trace.repairs_exhausted,
        format!("{} repair passes used", outcome.state.repair_count),
    );
    check(
        &mut checks,
        "trust_degraded",
        outcome.state.trust_tau < 0.8,
        format!("trust tau {:.3}", outcome.state.trust_tau),
    );

    report_from(
        "contradiction",
        inputs.len(),
        &outcome,
        checks,
        "Position reversal across turns scores two polarity flips and a contrast marker; \
         repairs cannot rewrite history, so the budget runs out."
            .to_string(),
    )
}

/// Analyst provider down: documented fallback delta applies and the turn
/// still completes normally.
async fn simulate_analyst_failure() -> SimulationReport {
    let client = Arc::new(
        FakeAgentClientBuilder::new()
            .score_error(
                AgentRole::Analyst,
                ProviderError::Network("connection refused".to_string()),
            )
            .build(),
    );
    let inputs = ["tell me about your day"];
    let outcome = drive(client, &inputs).await;

    let mut checks = Vec::new();
    check(
        &mut checks,
        "one_fallback_call",
        outcome.trace.fallback_count() == 1,
        format!("{} fallback calls", outcome.trace.fallback_count()),
    );
    check(
        &mut checks,
        "fallback_delta_applied",
        (outcome.state.tension - 0.10).abs() < 1e-9,
        format!("tension {:.3}", outcome.state.tension),
    );
    check(
        &mut checks,
        "regulation_normal",
        outcome.state.regulation == RegulationMode::Normal,
        format!("regulation settled at {}", outcome.state.regulation.label()),
    );
    check(
        &mut checks,
        "response_produced",
        !outcome.response_text.is_empty(),
        format!("{} chars of response text", outcome.response_text.len()),
    );

    report_from(
        "analyst-failure",
        inputs.len(),
        &outcome,
        checks,
        "Analyst outage degrades to the fixed tension delta; the turn completes on the \
         remaining agents."
            .to_string(),
    )
}

// ============================================================================
// MAIN
// ============================================================================

#[tokio::main]
async fn main() {
    let args: Vec<String> = std::env::args().collect();

    // Parse arguments
    let mut scenario = "calm".to_string();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--scenario" => {
                if i + 1 < args.len() {
                    scenario = args[i + 1].clone();
                    i += 2;
                } else {
                    eprintln!("Error: --scenario requires a value");
                    std::process::exit(1);
                }
            }
            "--help" | "-h" => {
                println!("Coherence Simulator");
                println!();
                println!("Usage:");
                println!("  coherence_sim --scenario <scenario>");
                println!();
                println!("Options:");
                println!("  --scenario <scenario> Scenario: calm, escalation, contradiction,");
                println!("                        analyst-failure, all (default: calm)");
                println!();
                println!("Examples:");
                println!("  coherence_sim --scenario calm");
                println!("  coherence_sim --scenario escalation");
                println!("  coherence_sim --scenario all");
                std::process::exit(0);
            }
            _ => {
                eprintln!("Error: Unknown argument: {}", args[i]);
                eprintln!("Run with --help for usage");
                std::process::exit(1);
            }
        }
    }

    // Run simulation(s)
    let reports = match scenario.as_str() {
        "calm" => vec![simulate_calm().await],
        "escalation" => vec![simulate_escalation().await],
        "contradiction" => vec![simulate_contradiction().await],
        "analyst-failure" => vec![simulate_analyst_failure().await],
        "all" => vec![
            simulate_calm().await,
            simulate_escalation().await,
            simulate_contradiction().await,
            simulate_analyst_failure().await,
        ],
        _ => {
            eprintln!("Error: Unknown scenario: {}", scenario);
            eprintln!("Valid scenarios: calm, escalation, contradiction, analyst-failure, all");
            std::process::exit(1);
        }
    };

    // Create output directory
    let output_dir = PathBuf::from("./artifacts/simulations");
    fs::create_dir_all(&output_dir).unwrap();

    let mut all_passed = true;
    for report in &reports {
        // Write report
        let output_file = output_dir.join(format!("{}.json", report.scenario));
        let json = serde_json::to_string_pretty(&report).unwrap();
        fs::write(&output_file, json).unwrap();

        // Print summary
        println!("\n=== Coherence Simulation: {} ===\n", report.scenario);
        println!("Turns:                {}", report.turns_run);
        println!("Final Regulation:     {}", report.final_regulation);
        println!("Trust (tau):          {:.3}", report.final_trust);
        println!("Repair Passes:        {}", report.repair_count);
        println!("Fallback Calls:       {}", report.fallback_calls);
        println!();

        for c in &report.checks {
            let mark = if c.passed { "[ok]  " } else { "[FAIL]" };
            println!("  {} {:<36} {}", mark, c.name, c.detail);
        }

        println!("\nNotes: {}", report.notes);
        println!("\nReport saved to: {}", output_file.display());

        all_passed &= report.success;
    }
    println!();

    if all_passed {
        std::process::exit(0);
    } else {
        std::process::exit(1);
    }
}
