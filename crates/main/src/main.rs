use std::time::Duration;

use chew::{Chew, Chunk};
use clap::Parser;
use color_eyre::eyre::{self, WrapErr};
use tracing::info;

mod cli;
mod errors;

use cli::{Cli, Command, ProcessArgs, TranscribeArgs};

#[tokio::main]
async fn main() -> eyre::Result<()> {
    errors::set_error_hook();
    errors::install_tracing();

    let cli = Cli::parse();
    match cli.command {
        Command::Process(args) => process(args).await,
        Command::Transcribe(args) => transcribe(args).await,
    }
}

async fn process(args: ProcessArgs) -> eyre::Result<()> {
    let config = args.config()?;
    let chew = Chew::new(config).wrap_err("Could not set up client")?;

    let work = chew.process(&args.inputs);
    let chunks = match args.timeout_secs.map(Duration::from_secs) {
        Some(timeout) => tokio::time::timeout(timeout, work)
            .await
            .wrap_err("Operation timed out")?,
        None => work.await,
    }
    .wrap_err("Error processing inputs")?;
    info!("extracted {} chunks", chunks.len());

    if args.json {
        println!("{}", serde_json::to_string_pretty(&chunks)?);
    } else {
        print!("{}", as_text(&chunks));
    }
    Ok(())
}

fn as_text(chunks: &[Chunk]) -> String {
    chunks
        .iter()
        .map(|chunk| format!("Source: {}\nContent: {}\n\n", chunk.source, chunk.content))
        .collect()
}

async fn transcribe(args: TranscribeArgs) -> eyre::Result<()> {
    let opts = args.options()?;
    let transcripts = transcribe::transcribe(&args.files, &opts)
        .await
        .wrap_err("Transcription failed")?;

    for file in &args.files {
        if let Some(transcript) = transcripts.get(file) {
            println!("{}:\n{transcript}\n", file.display());
        }
    }
    Ok(())
}
