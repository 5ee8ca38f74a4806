use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "hotwheels-dataset")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Download tagged car images from the wiki year lists
    Scrape(ScrapeArgs),
    /// Cut each car out of multi-car sheet photos
    Rois(RoisArgs),
    /// Replace photo backgrounds with plain white
    Cutout(CutoutArgs),
    /// Compose cutouts onto backgrounds and write YOLO labels
    Synth(SynthArgs),
}

#[derive(clap::Args, Debug)]
pub struct ScrapeArgs {
    /// First list year (inclusive)
    #[arg(long, default_value = "1968")]
    pub start_year: u16,

    /// Last list year (inclusive)
    #[arg(long, default_value = "2025")]
    pub end_year: u16,

    /// Output directory
    #[arg(short, long, default_value = "downloaded_relevant_images")]
    pub output: String,

    /// Number of concurrent download workers
    #[arg(short, long, default_value = "500")]
    pub workers: usize,
}

#[derive(clap::Args, Debug)]
pub struct RoisArgs {
    /// Directory of sheet photos
    pub input: String,

    /// Output directory for the crops
    #[arg(short, long, default_value = "output_rois")]
    pub output: String,

    /// Gaussian blur sigma applied before thresholding
    #[arg(long, default_value = "2.0")]
    pub blur_sigma: f32,

    /// Radius of the square structuring element
    #[arg(long, default_value = "2")]
    pub morph_radius: u8,

    /// Ignore components smaller than this many pixels
    #[arg(long, default_value = "64")]
    pub min_area: u32,
}

#[derive(clap::Args, Debug)]
pub struct CutoutArgs {
    /// Directory of single-car photos
    pub input: String,

    /// Output directory for the masked images
    #[arg(short, long, default_value = "output")]
    pub output: String,

    /// Gaussian blur sigma applied before thresholding
    #[arg(long, default_value = "2.0")]
    pub blur_sigma: f32,

    /// Radius of the square structuring element
    #[arg(long, default_value = "2")]
    pub morph_radius: u8,
}

#[derive(clap::Args, Debug)]
pub struct SynthArgs {
    /// Directory of background images
    #[arg(long, default_value = "backgroundSrc")]
    pub backgrounds: String,

    /// Directory of white-background cutouts
    #[arg(long, default_value = "imagesSrc")]
    pub objects: String,

    /// Dataset output directory
    #[arg(short, long, default_value = "hotwheels")]
    pub output: String,

    /// Number of training images
    #[arg(long, default_value = "180")]
    pub train_count: usize,

    /// Number of validation images
    #[arg(long, default_value = "20")]
    pub val_count: usize,

    /// Objects pasted per image
    #[arg(long, default_value = "3")]
    pub objects_per_image: usize,

    /// Canvas width
    #[arg(long, default_value = "1024")]
    pub width: u32,

    /// Canvas height
    #[arg(long, default_value = "768")]
    pub height: u32,
}
