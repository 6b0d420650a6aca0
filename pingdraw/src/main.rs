use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use tokio::signal;

use args::Args;
use image::Image;
use render::{Region, RenderScheduler};
use transport::RawIcmpv6Socket;

mod args;
mod image;
mod pulse;
mod render;
mod transport;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            // Help, unknown flags and a missing image all end the same way
            let _ = e.print();
            std::process::exit(1);
        }
    };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let socket = RawIcmpv6Socket::open()?;

    let image = Image::open(&args.image)?;
    let region = Region::clamp(image.width(), image.height(), args.offset_x, args.offset_y);

    info!(
        "draw {}x{} at {},{}",
        region.width, region.height, region.offset_x, region.offset_y
    );

    let mut scheduler = RenderScheduler::new(image, region, args.fps, socket);
    let mut ctrl_c_error = None;
    scheduler
        .run(async {
            if let Err(e) = signal::ctrl_c().await {
                ctrl_c_error = Some(e);
            }
        })
        .await;
    if let Some(e) = ctrl_c_error {
        return Err(e).context("Failed to listen for Ctrl-C");
    }

    let totals = scheduler.totals();
    info!(
        "Exiting after {} pulses ({} dropped)",
        totals.sent, totals.dropped
    );

    Ok(())
}
