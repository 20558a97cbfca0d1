//! Check command - evaluate the configured expiration policy for a session.

use std::path::PathBuf;

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::Args;
use console::{Style, style};
use serde::Serialize;
use stint_expiry::{
    ExpirationAttributes, ExpirationDecision, ExpirationPolicy, NativeExpirationAction,
};

use super::{Context, read_session};

/// Arguments for the check command.
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Session JSON file (`-` for stdin)
    pub session: PathBuf,

    /// Evaluate at this instant (RFC 3339) instead of now
    #[arg(long)]
    pub at: Option<DateTime<Utc>>,
}

/// Check result for JSON output.
#[derive(Debug, Serialize)]
struct CheckOutput {
    session_id: String,
    evaluated_at: DateTime<Utc>,
    decision: &'static str,
    remaining_secs: Option<i64>,
    timeout_secs: Option<u32>,
    action: Option<NativeExpirationAction>,
    evicted_on_read: bool,
}

/// Run the check command.
pub fn run(args: CheckArgs, ctx: &Context) -> Result<()> {
    let loaded = ctx.load_config()?;
    let config = &loaded.config;
    let session = read_session(&args.session)?;
    let now = args.at.unwrap_or_else(Utc::now);

    let policy = config.expiry_policy()?;
    let decision = policy.decide_at(&session, now);
    let attributes = decision
        .remaining()
        .map(|remaining| ExpirationAttributes::new(remaining, policy.action().into()));

    // What the lazy decorator would do on the next read.
    let evicted_on_read = config
        .lazy_policy()?
        .is_some_and(|lazy| lazy.decide_at(&session, now).is_expired());

    let output = CheckOutput {
        session_id: session.id().to_string(),
        evaluated_at: now,
        decision: decision_name(&decision),
        remaining_secs: decision.remaining().map(|d| d.num_seconds()),
        timeout_secs: attributes.map(|a| a.timeout_secs()),
        action: attributes.map(|a| a.action()),
        evicted_on_read,
    };

    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    let dim = Style::new().dim();
    let verdict = match decision {
        ExpirationDecision::Expired(_) => Style::new().red(),
        ExpirationDecision::ExpiresIn(_) => Style::new().green(),
        ExpirationDecision::Defer => Style::new().yellow(),
    };

    println!();
    println!("{}", style(format!("Session {}", output.session_id)).bold());
    println!("{}", dim.apply_to("─".repeat(40)));
    println!("  {} {}", dim.apply_to("Decision:"), verdict.apply_to(decision));
    match attributes {
        Some(a) => println!(
            "  {} {}s, {}",
            dim.apply_to("Native expiry:"),
            a.timeout_secs(),
            a.action()
        ),
        None => println!(
            "  {} store idle timeout applies",
            dim.apply_to("Native expiry:")
        ),
    }
    if config.has_fixed_duration() {
        let note = if evicted_on_read { "evicted" } else { "kept" };
        println!("  {} {}", dim.apply_to("Next read:"), note);
    }
    if ctx.verbose {
        println!("  {} {}", dim.apply_to("Evaluated at:"), now.to_rfc3339());
    }
    println!();

    Ok(())
}

fn decision_name(decision: &ExpirationDecision) -> &'static str {
    match decision {
        ExpirationDecision::Expired(_) => "expired",
        ExpirationDecision::ExpiresIn(_) => "expires-in",
        ExpirationDecision::Defer => "defer",
    }
}
