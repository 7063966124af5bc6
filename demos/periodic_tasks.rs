//! # Example: periodic_tasks
//!
//! A task-only bot driven entirely by the cooperative scheduler.
//!
//! Demonstrates how to:
//! - Declare periodic tasks with [`TaskInfo::every`] and explicit
//!   [`PeriodTrigger`] values.
//! - Fire a task immediately at startup with `with_run_at_start`.
//! - Inject handler parameters through the bot's provider registry.
//! - Tune the scheduler tick via [`Config`].
//!
//! ## Flow
//! ```text
//! TickScheduler (one runtime unit beside the bots)
//!     loop every tick {
//!       ├─► select tasks whose period elapsed (registration order)
//!       ├─► run them one at a time, yielding in between
//!       └─► control errors (ExitApplication, ...) abort the run
//!     }
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example periodic_tasks
//! ```

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use botvisor::{Bot, BotApp, BotError, Config, HandlerFn, Payload, PeriodTrigger, TaskInfo};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // 1. Runtime configuration: check for due tasks twice a second.
    let mut cfg = Config::default();
    cfg.tick = Duration::from_millis(500);

    // 2. A heartbeat task: every two seconds, stop after four beats.
    let beats = Arc::new(AtomicU32::new(0));
    let counter = beats.clone();
    let heartbeat = HandlerFn::arc(&["task"], move |_ctx, args: Payload| {
        let beats = counter.clone();
        async move {
            let n = beats.fetch_add(1, Ordering::Relaxed) + 1;
            println!("[tasks] {} beat #{n}", args.str("task").unwrap_or_default());
            if n >= 4 {
                return Err(BotError::exit_application("four beats are enough"));
            }
            Ok(Value::Null)
        }
    });

    // 3. A snapshot task with an explicit trigger and an injected value.
    let snapshot = HandlerFn::arc(&["store"], |_ctx, args: Payload| async move {
        println!(
            "[tasks] snapshot to {}",
            args.str("store").unwrap_or_default()
        );
        Ok(Value::Null)
    });
    let snapshot_info = TaskInfo::new(
        "snapshot",
        snapshot,
        vec![Arc::new(PeriodTrigger::of(0.0, 0.0, 5.0)?)],
    )
    .with_run_at_start(true);

    // 4. Task-only bots get a stub listener; the scheduler does the work.
    let curator = Bot::builder("curator")
        .with_task(TaskInfo::every(
            "heartbeat",
            heartbeat,
            Duration::from_secs(2),
        ))
        .with_task(snapshot_info)
        .with_provider_value("store", "s3://backups/curator")
        .build()?;

    BotApp::new()
        .with_config(cfg)
        .add_bot(curator)?
        .run()
        .await?;
    println!("[tasks] scheduler stopped");
    Ok(())
}
