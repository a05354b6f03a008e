use std::sync::Arc;

use futures::StreamExt;
use program_advisor::advisor::AdvisorService;
use program_advisor::channels::{Channel, OutgoingResponse, TelegramChannel};
use program_advisor::config::AdvisorConfig;
use program_advisor::llm::{LlmBackend, LlmConfig, create_provider};
use program_advisor::scraper::{HttpContentFetcher, refresh_programs};
use program_advisor::store::{Database, LibSqlBackend};

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

    // Read required tokens from environment
    let bot_token = std::env::var("TELEGRAM_BOT_TOKEN").unwrap_or_else(|_| {
        eprintln!("Error: TELEGRAM_BOT_TOKEN not set");
        eprintln!("  export TELEGRAM_BOT_TOKEN=123456:ABC-...");
        std::process::exit(1);
    });

    let api_key = std::env::var("OPENAI_API_KEY").unwrap_or_else(|_| {
        eprintln!("Error: OPENAI_API_KEY not set");
        eprintln!("  export OPENAI_API_KEY=sk-...");
        std::process::exit(1);
    });

    let model = std::env::var("ADVISOR_MODEL").unwrap_or_else(|_| "gpt-4o".to_string());

    eprintln!("🎓 Program Advisor v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Model: {}", model);

    // Create LLM provider
    let llm_config = LlmConfig {
        backend: LlmBackend::OpenAi,
        api_key: secrecy::SecretString::from(api_key),
        model: model.clone(),
    };
    let llm = create_provider(&llm_config)?;

    // ── Database ─────────────────────────────────────────────────────────
    let db_path =
        std::env::var("ADVISOR_DB_PATH").unwrap_or_else(|_| "./data/program-advisor.db".to_string());

    let db_path_ref = std::path::Path::new(&db_path);
    let db: Arc<dyn Database> = Arc::new(
        LibSqlBackend::new_local(db_path_ref)
            .await
            .unwrap_or_else(|e| {
                eprintln!("Error: Failed to open database at {}: {}", db_path, e);
                std::process::exit(1);
            }),
    );

    eprintln!("   Database: {}", db_path);

    // ── Program extraction ──────────────────────────────────────────────
    // Fetch and extract both program pages once at startup. Failures are
    // non-fatal: previously stored data keeps serving until the next run.
    {
        let fetcher = HttpContentFetcher::new();
        let stored = refresh_programs(&db, &fetcher).await;
        eprintln!("   Programs: {} extracted", stored);
    }

    // ── Advisor + Telegram loop ─────────────────────────────────────────
    let config = AdvisorConfig {
        model,
        ..Default::default()
    };
    let advisor = AdvisorService::new(config, Arc::clone(&db), llm);

    let channel = TelegramChannel::new(bot_token);
    let mut stream = channel.start().await?;

    eprintln!("   Listening on Telegram. Ctrl-C to exit.\n");

    while let Some(msg) = stream.next().await {
        let username = msg
            .metadata
            .get("username")
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string();

        tracing::info!(user_id = %msg.sender_id, "Inbound message");

        let response = advisor
            .handle_message(&msg.sender_id, &username, &msg.content)
            .await;

        if let Err(e) = channel.respond(&msg, OutgoingResponse::new(response)).await {
            tracing::warn!(user_id = %msg.sender_id, error = %e, "Failed to send response");
        }
    }

    Ok(())
}
