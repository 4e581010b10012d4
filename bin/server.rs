// Golden Hour - Web Server
// REST API + single-page intake form (axum)

use anyhow::{Context, Result};
use golden_hour::api::{router, spawn_session_reaper, AppState};
use golden_hour::{create_transcriber, init_tracing, AppConfig, Transcriber};
use std::sync::Arc;
use std::time::Duration;

/// How often idle sessions are swept
const REAPER_INTERVAL: Duration = Duration::from_secs(60);

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing()?;

    let config = AppConfig::load()?;
    tracing::info!(
        vocabulary = config.vocabulary.as_str(),
        voice = config.transcription.endpoint.is_some(),
        "configuration loaded"
    );

    // The blocking speech client must be created and dropped outside the runtime
    let transcriber: Arc<dyn Transcriber> = Arc::from(create_transcriber(&config.transcription));
    let state = AppState::new(&config, Arc::clone(&transcriber));

    let runtime = tokio::runtime::Runtime::new().context("Failed to start tokio runtime")?;
    runtime.block_on(serve(config.server.bind_addr.clone(), state))?;
    drop(runtime);

    drop(transcriber);
    Ok(())
}

async fn serve(addr: String, state: AppState) -> Result<()> {
    spawn_session_reaper(state.clone(), REAPER_INTERVAL);
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    println!("🌐 Golden Hour - Web Server");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("\n🚀 Server running on http://{}", addr);
    println!("   API: http://{}/api/checklist", addr);
    println!("\n   Press Ctrl+C to stop\n");

    axum::serve(listener, app)
        .await
        .context("Server error")?;

    Ok(())
}
