//! cloudspeak main entry point
//!
//! Synthesizes one piece of text and reports how it went:
//! 1. load settings (file, environment, command line)
//! 2. run the synthesis workflow against the Azure Speech service
//! 3. print the outcome
//!
//! Synthesis failures are reported on the console and do not change the exit
//! status; only a failure to start the async runtime does.

use anyhow::Context;
use cloudspeak::console::Console;
use cloudspeak::settings::{Settings, DEFAULT_TEXT};
use cloudspeak::speech::AzureSpeechService;
use cloudspeak::workflow::SynthesisWorkflow;
use log::{debug, error, info};
use std::process;

fn main() {
    // Parse command line arguments
    let args: Vec<String> = std::env::args().collect();
    let debug_mode = args.iter().any(|arg| arg == "--debug" || arg == "-d");

    // Initialize logger
    if debug_mode {
        // Debug mode: write to cloudspeak.log file
        use std::fs::OpenOptions;
        match OpenOptions::new()
            .create(true)
            .append(true)
            .open("cloudspeak.log")
        {
            Ok(log_file) => {
                env_logger::Builder::new()
                    .filter_level(log::LevelFilter::Debug)
                    .target(env_logger::Target::Pipe(Box::new(log_file)))
                    .init();
            }
            Err(e) => {
                eprintln!("Warning: Failed to open cloudspeak.log for debug logging: {}", e);
                eprintln!("Continuing without file logging...");
                env_logger::Builder::new()
                    .filter_level(log::LevelFilter::Warn)
                    .init();
            }
        }

        info!(
            "cloudspeak version {} starting (debug mode, logging to cloudspeak.log)",
            cloudspeak::VERSION
        );
    } else {
        // Normal mode: errors only unless RUST_LOG says otherwise
        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Error)
            .parse_default_env()
            .init();
    }

    if let Err(e) = run() {
        error!("Fatal error: {:#}", e);
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    // Everything after the program name that isn't a flag is the text to speak
    let text: Vec<String> = std::env::args()
        .skip(1)
        .filter(|arg| arg != "--debug" && arg != "-d")
        .collect();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start the async runtime")?;

    let console = Console::stdout();
    let service = AzureSpeechService::new();

    let report = match Settings::load() {
        Ok(mut settings) => {
            if !text.is_empty() {
                settings.set_override("text", &text.join(" "));
            }
            debug!("Settings loaded from {}", settings.path().display());

            let mut workflow =
                SynthesisWorkflow::new(service, console).with_timeout(settings.timeout());
            runtime.block_on(workflow.run(&settings))
        }
        Err(e) => {
            let text = if text.is_empty() {
                DEFAULT_TEXT.to_string()
            } else {
                text.join(" ")
            };
            let mut workflow = SynthesisWorkflow::new(service, console);
            runtime.block_on(workflow.run_with(Err(e), &text))
        }
    };
    info!("Workflow finished: {}", report.outcome);

    // Don't wait for abandoned synthesis tasks
    runtime.shutdown_background();
    Ok(())
}
