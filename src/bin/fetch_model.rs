//! `fetch-model` — interactive downloader for the model catalog.
//!
//! Usage:
//!   fetch-model        Pick a model by number; it lands in `models/`
//!                      (or `$MODELS_DIR`), where `llm-server` finds it.

use dialoguer::{Confirm, Input};
use indicatif::{ProgressBar, ProgressStyle};
use local_llm_lib::llm::model_manager::{
    fetch_model, format_progress, format_size, model_path, models_dir, FetchOutcome,
};
use local_llm_lib::llm::model_registry::{available_models, select_by_number};
use std::path::Path;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Keep info logs from tearing through the progress bar.
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let models = available_models();
    println!("{}", "=".repeat(60));
    println!("LLM model downloader");
    println!("{}", "=".repeat(60));
    println!("\nAvailable models:");
    for (i, m) in models.iter().enumerate() {
        println!("{}. {}", i + 1, m.id);
        println!("   Description: {}", m.description);
        println!("   Size: ~{}", format_size(m.size_bytes));
        println!();
    }

    let choice = Input::<String>::new()
        .with_prompt(format!("Select a model to download (1-{})", models.len()))
        .allow_empty(true)
        .interact_text()?;

    let Some(model) = select_by_number(&choice) else {
        println!("Invalid selection.");
        return Ok(());
    };

    let dir = models_dir();
    println!("\nModel: {}", model.id);
    println!("URL: {}", model.url);
    println!("Destination: {}", model_path(&dir, model).display());

    let client = reqwest::Client::builder()
        .user_agent(concat!("local-llm-server/", env!("CARGO_PKG_VERSION")))
        .build()?;

    let bar_style = ProgressStyle::with_template("{spinner:.green} [{bar:40.cyan/blue}] {msg}")?
        .progress_chars("=> ");
    let spinner_style = ProgressStyle::with_template("{spinner:.green} {msg}")?;
    let bar = ProgressBar::new_spinner().with_style(spinner_style);

    let confirm_overwrite = |path: &Path| {
        println!("\nModel file already exists: {}", path.display());
        Confirm::new()
            .with_prompt("Overwrite?")
            .default(false)
            .interact()
            .unwrap_or(false)
    };

    let progress = |downloaded: u64, total: Option<u64>| {
        if let Some(total) = total {
            if bar.length() != Some(total) {
                bar.set_length(total);
                bar.set_style(bar_style.clone());
            }
        }
        bar.set_position(downloaded);
        bar.set_message(format_progress(downloaded, total));
    };

    match fetch_model(&client, model, &dir, confirm_overwrite, progress).await {
        Ok(FetchOutcome::Cancelled { .. }) => {
            println!("Download cancelled.");
        }
        Ok(FetchOutcome::Downloaded { path, bytes }) => {
            bar.finish();
            let absolute = std::fs::canonicalize(&path).unwrap_or_else(|_| path.clone());
            println!("\nModel downloaded successfully ({}).", format_size(bytes));
            println!("Path: {}", absolute.display());
            println!("\nAdd this line to your .env file:");
            println!("MODEL_PATH={}", path.display());
        }
        Err(e) => {
            bar.abandon();
            eprintln!("\nDownload failed: {}", e);
            std::process::exit(1);
        }
    }

    Ok(())
}
