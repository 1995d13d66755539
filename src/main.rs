use calclock::components::alarms;
use calclock::startup;
use tracing::info;

#[tokio::main]
async fn main() -> miette::Result<()> {
    // Initialize logging
    startup::init_logging()?;

    info!("Starting calclock");

    // Load configuration
    let config = startup::load_config()?;
    if config.dry_run {
        info!("Dry run, no events will be created");
    }

    let alarms_added = alarms::run(&config).await?;
    println!("{} alarms added", alarms_added);

    Ok(())
}
