use anyhow::{Context, Result};
use log::info;
use tokio::signal;

mod api;
mod config;
mod dashboard;
mod feed;

use dashboard::Dashboard;
use feed::{MemoryFeed, PollingFeed};

#[actix_web::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = config::Config::from_env().context("reading configuration")?;
    let dashboard = Dashboard::shared();

    // without a feed url the snapshot lives in memory and is pushed over HTTP
    let (memory_feed, subscription) = match &config.feed_url {
        Some(url) => {
            info!("Polling {} every {:?}", url, config.poll_interval);
            let feed = PollingFeed::new(url.clone(), config.poll_interval, config.request_timeout)
                .context("building http client")?;
            (None, Dashboard::attach(&dashboard, &feed))
        }
        None => {
            info!("No SENSOR_FEED_URL set, accepting snapshots on PUT /api/sensor_readings");
            let feed = MemoryFeed::new();
            let subscription = Dashboard::attach(&dashboard, &feed);
            (Some(feed), subscription)
        }
    };

    tokio::select! {
        res = api::new_http_server(&config, dashboard, memory_feed) => {
            res.context("running http server")?;
        }
        Ok(()) = signal::ctrl_c() => {
            info!("Shutting down");
        }
    }
    subscription.unsubscribe();

    Ok(())
}
