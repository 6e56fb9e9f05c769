use clap::Parser;
use iteration_sync::domain::model::RunSummary;
use iteration_sync::utils::logger;
use iteration_sync::{AzureDevOpsClient, CliArgs, ProjectDriver, SyncError};

#[tokio::main]
async fn main() {
    let args = CliArgs::parse();

    logger::init_cli_logger(args.verbose, args.log_json);

    tracing::info!("Starting iteration-sync");

    if let Err(e) = run(args).await {
        tracing::error!(
            "❌ Iteration sync failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 {}", e.recovery_suggestion());

        std::process::exit(e.exit_code().max(1));
    }
}

async fn run(args: CliArgs) -> Result<(), SyncError> {
    let settings = args.load_config()?.resolve()?;
    tracing::info!(
        "✅ Configuration loaded: {} project(s), prefix `{}`, {} day iterations",
        settings.projects.len(),
        settings.iteration_name_prefix,
        settings.iteration_length
    );

    // Sampled once so a long backfill cannot drift across midnight.
    let today = args
        .today
        .unwrap_or_else(|| chrono::Local::now().date_naive());

    let client = AzureDevOpsClient::from_config(&settings)?;
    let driver = ProjectDriver::new(client, settings, today).with_dry_run(args.dry_run);

    let summary = driver.run().await?;
    print_summary(&summary);

    if summary.has_failures() {
        std::process::exit(1);
    }
    Ok(())
}

fn print_summary(summary: &RunSummary) {
    if summary.dry_run {
        println!("🔍 DRY RUN - nothing was created");
    }

    for report in &summary.projects {
        println!("📁 {}", report.project);
        if let Some(error) = &report.error {
            println!("   ❌ {}", error);
        }
        if !report.backfilled.is_empty() {
            println!("   backfilled: {}", report.backfilled.join(", "));
        }
        if !report.created.is_empty() {
            println!("   created:    {}", report.created.join(", "));
        }
        if !report.skipped.is_empty() {
            println!("   existing:   {}", report.skipped.join(", "));
        }
        if report.error.is_none() && report.backfilled.is_empty() && report.created.is_empty() {
            println!("   up to date");
        }
        for failure in &report.failed_assignments {
            println!(
                "   ⚠️  {} not assigned to team {}",
                failure.iteration, failure.team
            );
        }
    }

    println!("✅ Iteration sync completed");
}
