//! `dealwatch watch` — run one monitoring session.

use clap::Args;
use dealwatch_agent::{ControlLoop, SessionOutcome, SessionReport, build_policy};
use dealwatch_config::AppConfig;
use dealwatch_core::event::{DomainEvent, EventBus};
use dealwatch_core::state::{SessionParams, SessionState};
use dealwatch_market::build_capabilities;
use dealwatch_providers::build_from_config;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Item to watch for
    pub item: String,

    /// Seconds between polls that found nothing new
    #[arg(long)]
    pub poll_seconds: Option<u64>,

    /// Maximum completed searches (0 = unbounded)
    #[arg(long)]
    pub max_polls: Option<u32>,

    /// Region filter for current listings
    #[arg(long)]
    pub region: Option<String>,

    /// Action-selection policy: rules | llm
    #[arg(long)]
    pub policy: Option<String>,

    /// Stop the session after this many seconds
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Print the final report as JSON
    #[arg(long)]
    pub json: bool,
}

/// CLI flags override the `[session]` and `[policy]` tables.
fn apply_overrides(config: &mut AppConfig, args: &WatchArgs) {
    if let Some(secs) = args.poll_seconds {
        config.session.poll_seconds = secs;
    }
    if let Some(max) = args.max_polls {
        config.session.max_polls = max;
    }
    if let Some(region) = &args.region {
        config.session.region = Some(region.clone());
    }
    if let Some(kind) = &args.policy {
        config.policy.kind = kind.clone();
    }
    if let Some(secs) = args.timeout_secs {
        config.session.timeout_secs = Some(secs);
    }
}

fn session_params(item: &str, config: &AppConfig) -> SessionParams {
    let params = SessionParams::new(item)
        .with_poll_seconds(config.session.poll_seconds)
        .with_max_polls(config.session.max_polls);
    match &config.session.region {
        Some(region) => params.with_region(region),
        None => params,
    }
}

pub async fn run(args: WatchArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    apply_overrides(&mut config, &args);
    config.validate()?;

    for (role, provider) in config.roles_missing_key() {
        warn!(
            role,
            provider,
            "No API key configured; set OPENAI_API_KEY or DEALWATCH_API_KEY"
        );
    }

    let router = build_from_config(&config);
    let capabilities = build_capabilities(&config, &router)?;
    let policy = build_policy(&config, &router)?;

    let cancel = CancellationToken::new();
    spawn_interrupt(cancel.clone());
    if let Some(secs) = config.session.timeout_secs {
        spawn_timeout(cancel.clone(), Duration::from_secs(secs));
    }

    let event_bus = Arc::new(EventBus::default());
    spawn_progress(&event_bus);

    let looper = ControlLoop::new(policy, capabilities, event_bus)
        .with_max_steps(config.session.max_steps)
        .with_max_consecutive_skips(config.session.max_consecutive_skips)
        .with_price_ceiling(config.policy.enforce_price_ceiling)
        .with_cancellation(cancel);

    let mut state = SessionState::new(session_params(&args.item, &config));
    let report = looper.run(&mut state).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&args.item, &report);
    }

    Ok(())
}

/// Cancel the session on Ctrl-C.
fn spawn_interrupt(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received; stopping");
            cancel.cancel();
        }
    });
}

fn spawn_timeout(cancel: CancellationToken, after: Duration) {
    tokio::spawn(async move {
        tokio::select! {
            _ = tokio::time::sleep(after) => {
                info!(secs = after.as_secs(), "Session timeout reached; stopping");
                cancel.cancel();
            }
            _ = cancel.cancelled() => {}
        }
    });
}

/// Print a one-line marker for waits and completed searches.
fn spawn_progress(event_bus: &EventBus) {
    let mut rx = event_bus.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = rx.recv().await {
            match event.as_ref() {
                DomainEvent::PollWaiting { seconds, .. } => {
                    println!("⏳ Nothing new; next poll in {seconds}s");
                }
                DomainEvent::SessionFinished { .. } => break,
                _ => {}
            }
        }
    });
}

fn print_report(item: &str, report: &SessionReport) {
    println!();
    match report.outcome {
        SessionOutcome::DealReady => println!("✅ Deal found for '{item}'"),
        SessionOutcome::BudgetExhausted => {
            println!("❌ No deal for '{item}' within {} polls", report.polls_completed)
        }
        SessionOutcome::Interrupted => println!("⏹  Stopped before a deal was found"),
        SessionOutcome::StepLimit => println!("⚠️  Gave up after {} decision steps", report.steps),
    }

    if let Some(price) = report.reference_price {
        println!("   Reference price: {price:.0}");
    }
    if let Some(deal) = &report.deal {
        println!("   Listing:         {} ({:.0})", deal.name, deal.price);
        if !deal.url.is_empty() {
            println!("   URL:             {}", deal.url);
        }
    }
    if let Some(inquiry) = &report.inquiry {
        println!("\n📨 Inquiry:\n{inquiry}");
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> WatchArgs {
        WatchArgs {
            item: "iPad".into(),
            poll_seconds: None,
            max_polls: None,
            region: None,
            policy: None,
            timeout_secs: None,
            json: false,
        }
    }

    #[test]
    fn flags_override_config() {
        let mut config = AppConfig::default();
        let args = WatchArgs {
            poll_seconds: Some(30),
            max_polls: Some(0),
            region: Some("Busan".into()),
            policy: Some("llm".into()),
            timeout_secs: Some(600),
            ..args()
        };
        apply_overrides(&mut config, &args);

        assert_eq!(config.session.poll_seconds, 30);
        assert_eq!(config.session.max_polls, 0);
        assert_eq!(config.session.region.as_deref(), Some("Busan"));
        assert_eq!(config.policy.kind, "llm");
        assert_eq!(config.session.timeout_secs, Some(600));
    }

    #[test]
    fn absent_flags_keep_config() {
        let mut config = AppConfig::default();
        apply_overrides(&mut config, &args());
        assert_eq!(config.session.poll_seconds, 10);
        assert_eq!(config.session.max_polls, 120);
        assert_eq!(config.policy.kind, "rules");
    }

    #[test]
    fn params_follow_config() {
        let mut config = AppConfig::default();
        config.session.region = Some("Seoul".into());
        let params = session_params("iPad", &config);
        assert_eq!(params.item_name, "iPad");
        assert_eq!(params.poll_seconds, 10);
        assert_eq!(params.region.as_deref(), Some("Seoul"));
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_cancels_the_token() {
        let cancel = CancellationToken::new();
        spawn_timeout(cancel.clone(), Duration::from_secs(5));
        tokio::time::timeout(Duration::from_secs(10), cancel.cancelled())
            .await
            .unwrap();
    }
}
