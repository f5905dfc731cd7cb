//! DocMailer command line
//!
//! Loads the configuration, wires the CSV store, SMTP mailer and PDF service
//! into a campaign runner and executes one command.

mod logging;

use anyhow::{Context, Result};
use clap::{Arg, ArgAction, ArgMatches, Command};
use docmailer_core::{
    AttemptStatus, CampaignRunner, CampaignSettings, ConfigurationCheck, CsvRecipientStore,
    DocMailerConfig, PdfService, RunReport, SmtpMailer, TargetOutcome,
};
use docmailer_types::SelectionMode;
use std::path::Path;
use std::sync::Arc;

fn cli() -> Command {
    let email_arg = || {
        Arg::new("email")
            .value_name("EMAIL")
            .help("Recipient email address")
            .required(true)
    };

    Command::new("docmailer")
        .version(env!("CARGO_PKG_VERSION"))
        .about("DocMailer - personalized document and email campaigns")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .value_name("FILE")
                .help("Configuration file path")
                .default_value("config.json")
                .global(true),
        )
        .arg(
            Arg::new("dry-run")
                .long("dry-run")
                .help("Simulate operations without sending emails or updating files")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .subcommand(Command::new("send-all").about("Send to all active recipients"))
        .subcommand(
            Command::new("send-unsent")
                .alias("send-not-sent")
                .about("Send only to recipients not previously sent"),
        )
        .subcommand(
            Command::new("send-unresponded")
                .alias("send-not-responded")
                .about("Send only to recipients who have not responded"),
        )
        .subcommand(
            Command::new("send-test")
                .about("Send only to test recipients (name or email contains 'test')"),
        )
        .subcommand(
            Command::new("send-to")
                .about("Send to a single recipient")
                .arg(email_arg()),
        )
        .subcommand(
            Command::new("send-thankyou").about("Send the thank-you email to everyone who responded"),
        )
        .subcommand(
            Command::new("send-thankyou-to")
                .about("Send the thank-you email to a single recipient who responded")
                .arg(email_arg()),
        )
        .subcommand(
            Command::new("test-configuration")
                .alias("test")
                .about("Test configuration by sending a test email"),
        )
        .subcommand(Command::new("show-stats").about("Show campaign statistics"))
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli().get_matches();

    let config_path = matches
        .get_one::<String>("config")
        .map(String::as_str)
        .unwrap_or("config.json");
    let dry_run = matches.get_flag("dry-run");

    let config = match DocMailerConfig::load_with_env(config_path) {
        Ok(config) => {
            logging::init(config.log_file.as_deref())?;
            config
        }
        Err(e) => {
            logging::init(None)?;
            log::error!("Failed to load configuration from {}: {}", config_path, e);
            return Err(e).context("Configuration error");
        }
    };
    log::info!("Loaded configuration from {}", config_path);

    if dry_run {
        println!("🔍 DRY RUN MODE - Simulating operations without sending emails or updating files");
        println!();
    }

    let runner = build_runner(&config, dry_run)?;

    if let Err(e) = execute(&runner, &matches).await {
        log::error!("{:#}", e);
        return Err(e);
    }

    Ok(())
}

fn build_runner(config: &DocMailerConfig, dry_run: bool) -> Result<CampaignRunner> {
    let store = Arc::new(CsvRecipientStore::new(config.recipients_path.clone()));
    let mailer = Arc::new(SmtpMailer::new(config.email.clone()).context("Failed to set up SMTP")?);
    let documents =
        Arc::new(PdfService::new(config.pdf_service.clone()).context("Failed to set up PDF service")?);

    log::info!("Initialized recipient store, mailer and PDF service");

    Ok(CampaignRunner::new(store, mailer, documents, CampaignSettings::from_config(config))
        .with_dry_run(dry_run))
}

async fn execute(runner: &CampaignRunner, matches: &ArgMatches) -> Result<()> {
    match matches.subcommand() {
        Some(("send-all", _)) => run_mode(runner, SelectionMode::All).await,
        Some(("send-unsent", _)) => run_mode(runner, SelectionMode::NotSent).await,
        Some(("send-unresponded", _)) => run_mode(runner, SelectionMode::NotResponded).await,
        Some(("send-test", _)) => run_mode(runner, SelectionMode::Test).await,
        Some(("send-thankyou", _)) => run_mode(runner, SelectionMode::Thankyou).await,
        Some(("send-to", sub)) => {
            let email = required_email(sub)?;
            let outcome = runner.send_to(email).await?;
            print_target_outcome(&outcome);
            Ok(())
        }
        Some(("send-thankyou-to", sub)) => {
            let email = required_email(sub)?;
            let outcome = runner.send_thankyou_to(email).await?;
            print_target_outcome(&outcome);
            Ok(())
        }
        Some(("test-configuration", _)) => {
            let check = runner.test_configuration().await?;
            print_configuration_check(&check);
            Ok(())
        }
        Some(("show-stats", _)) => {
            let stats = runner.stats()?;
            println!("=== Campaign statistics ===");
            print!("{}", stats);
            Ok(())
        }
        Some((other, _)) => anyhow::bail!("Unknown command: {}", other),
        None => anyhow::bail!("No command specified. Use --help for options."),
    }
}

fn required_email(matches: &ArgMatches) -> Result<&str> {
    matches
        .get_one::<String>("email")
        .map(String::as_str)
        .context("An email address is required")
}

async fn run_mode(runner: &CampaignRunner, mode: SelectionMode) -> Result<()> {
    let report = runner
        .run(mode.clone())
        .await
        .with_context(|| format!("{} run failed", mode))?;
    print_report(&report);
    Ok(())
}

fn print_target_outcome(outcome: &TargetOutcome) {
    match outcome {
        TargetOutcome::Skipped { reason, .. } => println!("⚠️  {}", reason),
        TargetOutcome::Completed(report) => print_report(report),
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn print_report(report: &RunReport) {
    if report.selected == 0 {
        println!("No recipients to process ({} of {} loaded).", report.mode, report.loaded);
        return;
    }

    if report.dry_run {
        for result in &report.results {
            println!("Processing: {} ({})", result.name, result.email);
            if let Some(document) = &result.document {
                println!("  📄 Would generate: {}", file_name(document));
            }
            match &result.status {
                AttemptStatus::Failed(message) => println!("  ❌ Would record error: {}", message),
                _ => {
                    println!("  📧 Would send to: {}", result.email);
                    if let Some(subject) = &result.subject {
                        println!("     Subject: {}", subject);
                    }
                    if let Some(from) = &result.from {
                        println!("     From: {}", from);
                    }
                }
            }
        }

        println!();
        println!(
            "🔍 Dry run summary: {} would succeed, {} would have errors",
            report.succeeded(),
            report.failed()
        );
        println!("   No files were created or modified.");
        return;
    }

    for result in &report.results {
        match &result.status {
            AttemptStatus::Failed(message) => {
                println!("❌ {} ({}): {}", result.name, result.email, message)
            }
            _ => println!("✅ {} ({})", result.name, result.email),
        }
    }

    println!();
    println!(
        "Processing completed. Successes: {}, Errors: {}",
        report.succeeded(),
        report.failed()
    );
}

fn print_configuration_check(check: &ConfigurationCheck) {
    if check.dry_run {
        println!("🔍 Configuration test (DRY RUN):");
        println!("  📧 Would send test email to: {}", check.to_email);
        println!("     Subject: {}", check.subject);
        println!("     SMTP Server: {}", check.transport);
    } else {
        println!("Configuration test:");
        println!("  📧 Test email to: {}", check.to_email);
        println!("     Subject: {}", check.subject);
        println!("     SMTP Server: {}", check.transport);
    }

    match &check.delivery {
        AttemptStatus::WouldSend => println!("   Test email would be sent successfully!"),
        AttemptStatus::Sent => println!("   ✅ Test email sent successfully!"),
        AttemptStatus::Failed(message) => println!("   ❌ Configuration test failed: {}", message),
    }

    if check.smtp_reachable {
        println!("   ✅ SMTP server is reachable");
    } else {
        println!("   ⚠️  SMTP server is not reachable");
    }

    if check.pdf_service_healthy {
        println!("   ✅ PDF service is reachable");
    } else {
        println!("   ⚠️  PDF service is not reachable");
    }
}
