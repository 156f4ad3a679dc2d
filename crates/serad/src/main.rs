//! Sera daemon - coherence-first conversation engine.
//!
//! Interactive front end over the turn pipeline: reads user lines from
//! stdin, runs each through the engine, prints the response with a
//! one-line state readout.

use std::env;
use std::io::{self, BufRead, Write};
use std::sync::Arc;

use anyhow::Result;
use owo_colors::OwoColorize;
use serad::config::SeraConfig;
use serad::engine::{CoherenceEngine, OllamaClient};
use serad::persistence::JsonFileStore;
use sera_common::InternalState;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(true)
        .with_level(true)
        .without_time()
        .init();

    info!("serad v{} starting", env!("CARGO_PKG_VERSION"));

    let config = SeraConfig::load();
    let client = Arc::new(OllamaClient::new(&config));
    info!(
        "[+]  models: scorer {}, verifier {}, responder {} (keep_alive {})",
        client.scorer_model(),
        client.verifier_model(),
        client.responder_model(),
        client.keep_alive()
    );
    if !client.is_available().await {
        warn!(
            "[!]  no model provider at {}; agent calls will run on fallbacks",
            config.llm.ollama_url
        );
    }
    let store = Arc::new(JsonFileStore::new(config.engine.data_dir.clone()));
    let engine = CoherenceEngine::new(client, store, config);

    let session_id = engine.create_session().await;
    info!("session {} ready", session_id);

    println!();
    println!("sera - type to talk. 'trace' toggles turn traces, 'quit' exits.");
    println!();

    let mut verbose = false;
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        print!("> ");
        io::stdout().flush()?;

        let input = match lines.next() {
            Some(Ok(line)) => line.trim().to_string(),
            Some(Err(e)) => {
                warn!("[!]  error reading input: {}", e);
                continue;
            }
            None => break, // EOF
        };

        if input.is_empty() {
            continue;
        }
        if input == "quit" || input == "exit" {
            println!("bye.");
            break;
        }
        if input == "trace" {
            verbose = !verbose;
            println!("turn traces {}", if verbose { "on" } else { "off" });
            continue;
        }

        match engine.step(session_id, &input).await {
            Ok(outcome) => {
                println!();
                println!("{}", outcome.response_text);
                println!();
                println!("{}", status_line(&outcome.state));
                if verbose {
                    println!();
                    println!("{}", outcome.trace.to_narrative());
                }
                println!();
            }
            Err(e) => {
                eprintln!();
                eprintln!("[ERROR] {}", e.to_string().red());
                eprintln!();
            }
        }
    }

    Ok(())
}

/// One-line state readout, colored by session trust.
fn status_line(state: &InternalState) -> String {
    let tau = format!("{:.2}", state.trust_tau);
    let tau_colored = if state.trust_tau >= 0.9 {
        tau.bright_green().to_string()
    } else if state.trust_tau >= 0.7 {
        tau.yellow().to_string()
    } else {
        tau.bright_red().to_string()
    };

    format!(
        "[tau {}]  regulation: {}  repairs: {}",
        tau_colored,
        state.regulation.label(),
        state.repair_count
    )
}
