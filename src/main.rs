//! Admission Console
//!
//! Drives an `AdmissionEngine` from stdin so the policies can be exercised
//! by hand: evaluate channels, feed load outcomes, flip lifecycle,
//! entitlement and playback, and watch the upsell signal.
//!
//! Usage: promo_admission [config.yaml|config.json]

use anyhow::{Context, Result};
use std::io::{self, Write};
use std::sync::Arc;
use tracing::info;

use promo_admission::admission::{EntitlementFlag, PlaybackFlag};
use promo_admission::{telemetry, AdmissionConfig, AdmissionEngine, Channel, ScopeKey};

// ──────────────────────────────────────────────────────────────────────────────
// CONFIGURATION
// ──────────────────────────────────────────────────────────────────────────────

fn load_config() -> Result<AdmissionConfig> {
    match std::env::args().nth(1) {
        Some(path) => AdmissionConfig::load(&path).with_context(|| format!("Failed to load config from {}", path)),
        None => Ok(AdmissionConfig::default()),
    }
}

const HELP: &str = "\
Commands:
  banner [occluded]                 evaluate banner
  native <key> <size> [idle]        evaluate native (engaged unless 'idle')
  interstitial                      evaluate interstitial
  admit                             evaluate interstitial and count it if permitted
  ok <channel> <load_ms>            record load success
  fail <channel> <code> <message>   record load failure
  show <channel> [key]              record impression
  hide                              banner removed from screen
  bg | fg                           lifecycle
  play | pause                      host playback
  premium on|off                    entitlement
  ack                               acknowledge upsell
  reset [channel]                   reset a failure streak, or the whole session
  stats                             dump state snapshot
  quit";

// ──────────────────────────────────────────────────────────────────────────────
// MAIN ENTRY POINT
// ──────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    telemetry::init_tracing();

    let config = load_config()?;
    let entitlement = Arc::new(EntitlementFlag::new(false));
    let playback = Arc::new(PlaybackFlag::new(false));
    let engine = Arc::new(
        AdmissionEngine::new(config, entitlement.clone(), playback.clone())
            .context("Failed to build admission engine")?,
    );

    let mut upsell = engine.upsell_signal();
    tokio::spawn(async move {
        while upsell.changed().await.is_ok() {
            if *upsell.borrow_and_update() {
                println!("\n💎 Upsell: user has seen enough promos, offer premium ('ack' to dismiss)");
            }
        }
    });

    println!("\n{}", "═".repeat(60));
    println!("🛡️  Promotional Admission Console v{}", env!("CARGO_PKG_VERSION"));
    println!("{}", "═".repeat(60));
    println!("{}\n", HELP);

    loop {
        print!("📣 > ");
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            break;
        }
        let parts: Vec<&str> = input.split_whitespace().collect();
        let Some((&command, args)) = parts.split_first() else {
            continue;
        };

        match command.to_lowercase().as_str() {
            "quit" | "exit" | "q" => {
                println!("\n👋 Goodbye!\n");
                break;
            }
            "help" | "?" => println!("{}", HELP),
            "banner" => {
                let occluded = args.first() == Some(&"occluded");
                println!("{}", engine.evaluate_banner(occluded));
            }
            "native" => match (args.first(), args.get(1).and_then(|s| s.parse::<i64>().ok())) {
                (Some(key), Some(size)) => {
                    let engaged = args.get(2) != Some(&"idle");
                    println!("{}", engine.evaluate_native(&ScopeKey::from(*key), size, engaged));
                }
                _ => println!("usage: native <key> <size> [idle]"),
            },
            "interstitial" => println!("{}", engine.evaluate_interstitial()),
            "admit" => println!("{}", engine.admit_interstitial()),
            "ok" => match (parse_channel(args.first()), args.get(1).and_then(|s| s.parse::<i64>().ok())) {
                (Some(channel), Some(ms)) => engine.record_success(channel, ms),
                _ => println!("usage: ok <channel> <load_ms>"),
            },
            "fail" => match (parse_channel(args.first()), args.get(1).and_then(|s| s.parse::<i32>().ok())) {
                (Some(channel), Some(code)) => {
                    let message = args.get(2..).map(|rest| rest.join(" ")).unwrap_or_default();
                    engine.record_failure(channel, code, &message);
                }
                _ => println!("usage: fail <channel> <code> <message>"),
            },
            "show" => match parse_channel(args.first()) {
                Some(channel) => engine.record_impression(channel, args.get(1).map(|k| ScopeKey::from(*k))),
                None => println!("usage: show <channel> [key]"),
            },
            "hide" => engine.record_banner_hidden(),
            "bg" => engine.on_background(),
            "fg" => engine.on_foreground(),
            "play" => playback.set(true),
            "pause" => playback.set(false),
            "premium" => match args.first() {
                Some(&"on") => entitlement.set(true),
                Some(&"off") => entitlement.set(false),
                _ => println!("usage: premium on|off"),
            },
            "ack" => engine.acknowledge_upsell(),
            "reset" => match args.first() {
                Some(_) => match parse_channel(args.first()) {
                    Some(channel) => engine.reset_failures(channel),
                    None => println!("usage: reset [channel]"),
                },
                None => engine.reset_session(),
            },
            "stats" => {
                let snapshot = engine.snapshot();
                println!("{}", serde_json::to_string_pretty(&snapshot)?);
                println!(
                    "avg load {}ms{}",
                    engine.average_load_time_ms(),
                    if engine.is_load_latency_high() { " (HIGH)" } else { "" }
                );
            }
            other => println!("unknown command '{}', try 'help'", other),
        }
    }

    info!("Admission console exiting");
    Ok(())
}

fn parse_channel(arg: Option<&&str>) -> Option<Channel> {
    arg.and_then(|s| s.parse().ok())
}
