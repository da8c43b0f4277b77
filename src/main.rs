use std::sync::Arc;

use docugen::channels::{Channel, CliChannel, TelegramChannel};
use docugen::config::BotConfig;
use docugen::dispatcher::Dispatcher;
use docugen::render::TextAssembler;
use docugen::store::MemoryStore;
use docugen::tax::TaxTables;
use docugen::wizard::{SessionStore, WizardMachine, session};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = BotConfig::from_env()?;

    eprintln!("📄 Docugen v{}", env!("CARGO_PKG_VERSION"));
    eprintln!(
        "   Session timeout: {}s",
        config.session_idle_timeout.as_secs()
    );
    eprintln!("   History limit: {}", config.history_limit);

    let sessions = Arc::new(SessionStore::new());
    let store = Arc::new(MemoryStore::new());
    let assembler = Arc::new(TextAssembler::new());
    let machine = WizardMachine::new(TaxTables::year_2024());

    // Set up channels
    let mut channels: Vec<Arc<dyn Channel>> = vec![Arc::new(CliChannel::new())];
    let mut active_channels = vec!["cli"];

    if let Some(token) = config.telegram_token.clone() {
        eprintln!(
            "   Telegram: enabled (allowed: {})",
            if config.allowed_users.iter().any(|u| u == "*") {
                "everyone".to_string()
            } else {
                config.allowed_users.join(", ")
            }
        );
        channels.push(Arc::new(TelegramChannel::new(
            token,
            config.allowed_users.clone(),
        )));
        active_channels.push("telegram");
    }

    eprintln!("   Channels: {}\n", active_channels.join(", "));
    eprintln!("   Type /start to begin (CLI: prefix button values with @).\n");

    // Idle sessions are pruned in the background; pruning equals cancel.
    let _sweep = session::spawn_idle_sweep(Arc::clone(&sessions), config.session_idle_timeout);

    let dispatcher = Arc::new(Dispatcher::new(
        machine,
        sessions,
        assembler,
        store,
        config.history_limit,
    ));
    dispatcher.run(channels).await?;

    Ok(())
}
