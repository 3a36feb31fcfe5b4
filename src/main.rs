use anyhow::{Context, Result};
use clap::Parser;
use dotenv::dotenv;
use sunset_sky::logging::logging;
use sunset_sky::{Args, City, Config, DisplaySink, Scheduler, SunCalcClock, WebcamFetcher};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let args = Args::parse();
    let config = Config::from_args(args)?;
    logging::init(config.verbose);

    let client = reqwest::Client::new();
    let fetcher = WebcamFetcher::with_proxy(client.clone(), &config.proxy);
    let sink = DisplaySink::new(client.clone(), config.targets.clone(), config.fade_frames);

    let mut scheduler = Scheduler::new(SunCalcClock, fetcher, sink, config.intervals).on_change(
        Box::new(|city: Option<&City>| match city {
            Some(city) => println!("Watching the sunset in {}", city.name),
            None => println!("Waiting for the next sunset"),
        }),
    );

    if config.once {
        let outcome = scheduler
            .run_once(&config.source, &client)
            .await
            .context("Could not load city list")?;
        tracing::info!(?outcome, state = %scheduler.state(), "debug run finished");
        if let Some(css) = scheduler.sink().describe() {
            println!("{css}");
        }
        return Ok(());
    }

    scheduler
        .run(&config.source, &client)
        .await
        .context("Could not load city list")?;
    Ok(())
}
