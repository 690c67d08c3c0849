use std::time::Duration;

use anyhow::Context;

use learnhub::session::{STARTER_CSS, STARTER_HTML, STARTER_JS};
use learnhub::{EditorSession, SessionEvent, SourceBundle};

/// How long to wait for the realm to settle before reporting.
const SETTLE_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    println!("=== LearnHub Playground ===\n");

    let args: Vec<String> = std::env::args().skip(1).collect();
    let html = read_or(args.first(), STARTER_HTML)?;
    let css = read_or(args.get(1), STARTER_CSS)?;
    let js = read_or(args.get(2), STARTER_JS)?;

    let mut session = EditorSession::builder()
        .source(SourceBundle::new(html, css, js))
        .build()
        .context("Failed to create editor session")?;

    let result = session.run();
    if result.immediate_error_found {
        if let Some(diagnostic) = &result.diagnostic {
            println!("[BLOCKED] {}", diagnostic);
        }
    } else {
        println!("[OK] Realm launched");
        let waited = tokio::time::timeout(SETTLE_TIMEOUT, async {
            loop {
                match session.next_event().await {
                    SessionEvent::Settled => break,
                    SessionEvent::Fault(d) => println!("[ERROR] {}", d),
                    SessionEvent::Console(line) => println!("[{}] {}", line.level, line.message),
                    SessionEvent::AutoRun(_) => {}
                }
            }
        })
        .await;
        if waited.is_err() {
            println!("[WARN] Realm did not settle within {:?}", SETTLE_TIMEOUT);
        }
    }

    let counters = session.counters();
    println!(
        "\n=== {:?} (runs={}, mistakes={}) ===",
        session.state(),
        counters.run_count,
        counters.mistake_count
    );
    Ok(())
}

fn read_or(path: Option<&String>, fallback: &str) -> anyhow::Result<String> {
    match path {
        Some(path) => {
            std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path))
        }
        None => Ok(fallback.to_string()),
    }
}
