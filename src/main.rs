use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::Parser;
use signup_wizard::adapters::console::{parse_command, render_text, Command, HELP};
use signup_wizard::core::RateProvider;
use signup_wizard::domain::ports::ViewSink;
use signup_wizard::utils::{logger, validation::Validate};
use signup_wizard::{
    CliConfig, Dispatch, FixedRateProvider, HttpRateProvider, JsonViewSink, OutputFormat,
    Projection, RefreshQueue, SignupWizard, TextViewSink, WizardConfig,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    if cli.json_logs {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(cli.verbose);
    }
    tracing::debug!("CLI config: {:?}", cli);

    let config = match &cli.config {
        Some(path) => WizardConfig::from_file(path)
            .with_context(|| format!("Failed to load config file '{}'", path.display()))?,
        None => WizardConfig::default(),
    };

    if let Err(e) = config.validate() {
        tracing::error!("Configuration validation failed: {}", e);
        eprintln!("❌ {}", e);
        eprintln!("💡 {}", e.recovery_suggestion());
        std::process::exit(1);
    }

    let provider: Arc<dyn RateProvider> = if cli.offline {
        tracing::info!("Offline mode, serving fixed rates");
        Arc::new(FixedRateProvider::new(config.fixed_rates()))
    } else {
        Arc::new(HttpRateProvider::new(&config.rates.endpoint, config.request_timeout())?)
    };
    let mut refreshes = RefreshQueue::new(provider);

    let mut wizard = SignupWizard::new(&config)?;
    let sink: Box<dyn ViewSink> = match cli.output {
        OutputFormat::Text => Box::new(TextViewSink::new(std::io::stdout())),
        OutputFormat::Json => Box::new(JsonViewSink::new(std::io::stdout())),
    };
    wizard.subscribe(sink);
    show(cli.output, wizard.projection())?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let notice_deadline = wizard.state().notice.as_ref().map(|n| n.expires_at);

        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match parse_command(&line) {
                    Ok(None) => {}
                    Ok(Some(Command::Quit)) => break,
                    Ok(Some(Command::Help)) => println!("{}", HELP),
                    Ok(Some(Command::Show)) => show(cli.output, wizard.projection())?,
                    Ok(Some(Command::Event(event))) => match wizard.dispatch(event) {
                        Ok(Dispatch::RefreshRequested(request)) => refreshes.spawn(request),
                        Ok(dispatch) => tracing::debug!("Dispatch result: {:?}", dispatch),
                        Err(e) => {
                            tracing::warn!("Event rejected: {}", e);
                            eprintln!("❌ {}", e);
                            eprintln!("💡 {}", e.recovery_suggestion());
                        }
                    },
                    Err(e) => eprintln!("❌ {} (type 'help' for commands)", e),
                }
            }
            Some((request, outcome)) = refreshes.next(), if !refreshes.is_empty() => {
                let status = wizard.complete_refresh(&request, outcome)?;
                tracing::debug!("Refresh #{} completed: {:?}", request.id, status);
            }
            _ = wait_until(notice_deadline) => {
                wizard.dismiss_expired_notice(Utc::now())?;
            }
        }
    }

    tracing::info!("Wizard closed at step {}", wizard.state().current_step);
    Ok(())
}

fn show(format: OutputFormat, projection: &Projection) -> anyhow::Result<()> {
    match format {
        OutputFormat::Text => print!("{}", render_text(projection)),
        OutputFormat::Json => println!("{}", serde_json::to_string(projection)?),
    }
    Ok(())
}

async fn wait_until(deadline: Option<DateTime<Utc>>) {
    match deadline {
        Some(deadline) => {
            let remaining = (deadline - Utc::now()).to_std().unwrap_or(Duration::ZERO);
            tokio::time::sleep(remaining).await;
        }
        None => std::future::pending::<()>().await,
    }
}
