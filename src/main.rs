use std::path::Path;

use anyhow::{Result, anyhow};
use clap::Parser;

use hotwheels_dataset::cli::{Args, Command};
use hotwheels_dataset::dataset::{self, SynthConfig};
use hotwheels_dataset::downloader::ScrapeJob;
use hotwheels_dataset::finder;
use hotwheels_dataset::segment::{self, MaskParams};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    match args.command {
        Command::Scrape(args) => {
            if args.start_year > args.end_year {
                return Err(anyhow!(
                    "Invalid year range: {}-{}",
                    args.start_year,
                    args.end_year
                ));
            }
            if args.workers == 0 {
                return Err(anyhow!("At least one download worker is required"));
            }
            let pages = finder::year_pages(args.start_year, args.end_year);
            println!("Scraping {} list pages into {}", pages.len(), args.output);

            let job = ScrapeJob::new(&args.output, args.workers)?;
            job.run(&pages).await?;
        }
        Command::Rois(args) => {
            let params = MaskParams {
                blur_sigma: args.blur_sigma,
                morph_radius: args.morph_radius,
                min_area: args.min_area,
            };
            segment::split_rois(Path::new(&args.input), Path::new(&args.output), &params)?;
        }
        Command::Cutout(args) => {
            let params = MaskParams {
                blur_sigma: args.blur_sigma,
                morph_radius: args.morph_radius,
                ..MaskParams::default()
            };
            segment::remove_background(Path::new(&args.input), Path::new(&args.output), &params)?;
        }
        Command::Synth(args) => {
            let config = SynthConfig {
                backgrounds_dir: args.backgrounds.into(),
                objects_dir: args.objects.into(),
                output_dir: args.output.into(),
                train_count: args.train_count,
                val_count: args.val_count,
                objects_per_image: args.objects_per_image,
                width: args.width,
                height: args.height,
            };
            dataset::synthesize(&config)?;
        }
    }

    Ok(())
}
