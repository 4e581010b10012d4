// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;

use anyhow::{Context, Result};
use std::env;
use std::fs;

// Use library instead of local modules
use golden_hour::{create_transcriber, init_tracing, AppConfig, Assessment, IntakeSession};

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    let config = AppConfig::load()?;

    match args.get(1).map(String::as_str) {
        Some("assess") => {
            init_tracing()?;
            run_assess(&config, &args[2..].join(" "))?;
        }
        Some("transcribe") => {
            init_tracing()?;
            let path = args.get(2).context("Usage: golden-hour transcribe <recording.wav>")?;
            run_transcribe(&config, path)?;
        }
        Some("checklist") => {
            for label in config.checklist_labels() {
                println!("{}", label);
            }
        }
        Some(other) => {
            eprintln!("❌ Unknown command: {}", other);
            eprintln!("   Usage: golden-hour [assess <text> | transcribe <file.wav> | checklist]");
            std::process::exit(2);
        }
        // UI mode (default)
        None => run_ui_mode(config)?,
    }

    Ok(())
}

fn run_assess(config: &AppConfig, text: &str) -> Result<()> {
    println!("🚨 Golden Hour - Emergency Assessment");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let mut session = IntakeSession::new();
    session.add_text(text);
    print_assessment(config, &session);

    Ok(())
}

fn run_transcribe(config: &AppConfig, path: &str) -> Result<()> {
    println!("🎙️  Golden Hour - Voice Assessment");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let wav = fs::read(path).with_context(|| format!("Failed to read recording: {}", path))?;
    let transcriber = create_transcriber(&config.transcription);

    let mut session = IntakeSession::new();
    match session.add_voice(transcriber.as_ref(), wav) {
        Ok(_) => {
            println!("\n📝 Heard: {}", session.voice_text().unwrap_or_default());
            print_assessment(config, &session);
        }
        Err(warning) => {
            println!("\n⚠️  {}", warning);
        }
    }

    Ok(())
}

fn print_assessment(config: &AppConfig, session: &IntakeSession) {
    let assessment = session.assess(&config.classifier(), &config.guidance());

    match assessment {
        Some(assessment) => print_report(&assessment),
        None => println!("\n⚠️  No symptoms found. Describe what happened, e.g. \"chest pain and dizziness\"."),
    }
}

fn print_report(assessment: &Assessment) {
    println!("\n📋 Symptoms:");
    for symptom in &assessment.symptoms {
        let marker = if assessment.severe_symptoms.contains(symptom) { "🔴" } else { "🟠" };
        println!("   {} {}", marker, symptom);
    }

    println!("\n{} {}", if assessment.severity.is_severe() { "🔴" } else { "🟠" }, assessment.guidance.headline);
    for action in &assessment.guidance.actions {
        println!("   • {}", action);
    }

    println!("\n🧭 Navigate: {}", assessment.guidance.maps_link);
}

#[cfg(feature = "tui")]
fn run_ui_mode(config: AppConfig) -> Result<()> {
    let transcriber = create_transcriber(&config.transcription);

    let mut app = ui::App::new(config, transcriber);
    ui::run_ui(&mut app)?;

    println!("\n✅ Stay safe.");

    Ok(())
}

#[cfg(not(feature = "tui"))]
fn run_ui_mode(_config: AppConfig) -> Result<()> {
    eprintln!("❌ TUI mode not available!");
    eprintln!("   Rebuild with: cargo build --features tui");
    eprintln!("   Or use web UI: cargo run --bin golden-hour-server --features server");
    std::process::exit(1);
}
