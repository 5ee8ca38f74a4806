use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use image::imageops::FilterType;
use image::{Rgb, RgbImage, imageops};
use indicatif::{ProgressBar, ProgressStyle};
use rand::Rng;

use crate::models::YoloBox;
use crate::segment::list_images;

const CLASS_ID: u32 = 0;
const CLASS_NAME: &str = "hotwheels";
const WHITE_CUTOFF: u8 = 250;

/// Volume and layout knobs for the synthesizer.
#[derive(Debug, Clone)]
pub struct SynthConfig {
    pub backgrounds_dir: PathBuf,
    pub objects_dir: PathBuf,
    pub output_dir: PathBuf,
    pub train_count: usize,
    pub val_count: usize,
    pub objects_per_image: usize,
    pub width: u32,
    pub height: u32,
}

pub fn synthesize(config: &SynthConfig) -> Result<usize> {
    synthesize_with(config, &mut rand::thread_rng())
}

/// Generation with a caller-supplied RNG so runs can be made repeatable.
/// Returns the number of labeled boxes written.
pub fn synthesize_with<R: Rng>(config: &SynthConfig, rng: &mut R) -> Result<usize> {
    let backgrounds = load_pool(&config.backgrounds_dir)?;
    let objects = load_pool(&config.objects_dir)?;

    for kind in ["images", "labels"] {
        for split in ["train", "val"] {
            let dir = config.output_dir.join(kind).join(split);
            fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create directory {}", dir.display()))?;
        }
    }

    let total = config.train_count + config.val_count;
    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{msg:16} {bar:40} {pos}/{len}")
            .unwrap()
            .progress_chars("=>-"),
    );

    let mut boxes = 0usize;
    for (split, count) in [("train", config.train_count), ("val", config.val_count)] {
        boxes += generate_split(config, &backgrounds, &objects, split, count, rng, &pb)?;
    }

    write_data_yaml(config)?;
    pb.finish_with_message("Dataset written");

    println!(
        "\nDone: {} images ({} train, {} val), {} labeled boxes",
        total, config.train_count, config.val_count, boxes
    );
    Ok(boxes)
}

fn generate_split<R: Rng>(
    config: &SynthConfig,
    backgrounds: &[RgbImage],
    objects: &[RgbImage],
    split: &str,
    count: usize,
    rng: &mut R,
    pb: &ProgressBar,
) -> Result<usize> {
    let image_dir = config.output_dir.join("images").join(split);
    let label_dir = config.output_dir.join("labels").join(split);

    let mut boxes = 0usize;
    for i in 0..count {
        pb.set_message(format!("{split} {i:03}"));

        let background = &backgrounds[rng.gen_range(0..backgrounds.len())];
        let mut canvas = if background.dimensions() == (config.width, config.height) {
            background.clone()
        } else {
            imageops::resize(background, config.width, config.height, FilterType::Triangle)
        };

        let mut labels = Vec::new();
        for _ in 0..config.objects_per_image {
            let object = &objects[rng.gen_range(0..objects.len())];
            if object.width() > config.width || object.height() > config.height {
                eprintln!(
                    "Warning: object {}x{} does not fit the {}x{} canvas, skipping",
                    object.width(),
                    object.height(),
                    config.width,
                    config.height
                );
                continue;
            }
            let x = rng.gen_range(0..=config.width - object.width());
            let y = rng.gen_range(0..=config.height - object.height());
            paste_object(&mut canvas, object, x, y);
            labels.push(YoloBox::from_paste(
                CLASS_ID,
                x,
                y,
                object.width(),
                object.height(),
                config.width,
                config.height,
            ));
        }

        let image_path = image_dir.join(format!("image_{i:03}.png"));
        canvas
            .save(&image_path)
            .with_context(|| format!("Failed to write {}", image_path.display()))?;

        let mut contents = String::new();
        for label in &labels {
            contents.push_str(&label.label_line());
            contents.push('\n');
        }
        let label_path = label_dir.join(format!("image_{i:03}.txt"));
        fs::write(&label_path, contents)
            .with_context(|| format!("Failed to write {}", label_path.display()))?;

        boxes += labels.len();
        pb.inc(1);
    }
    Ok(boxes)
}

/// Copies `object` onto `canvas` at (x, y); near-white object pixels count
/// as transparent. Placements are chosen so the object fits the canvas.
pub fn paste_object(canvas: &mut RgbImage, object: &RgbImage, x: u32, y: u32) {
    for (ox, oy, pixel) in object.enumerate_pixels() {
        let Rgb([r, g, b]) = *pixel;
        if r >= WHITE_CUTOFF && g >= WHITE_CUTOFF && b >= WHITE_CUTOFF {
            continue;
        }
        if x + ox < canvas.width() && y + oy < canvas.height() {
            canvas.put_pixel(x + ox, y + oy, *pixel);
        }
    }
}

fn load_pool(dir: &Path) -> Result<Vec<RgbImage>> {
    let mut pool = Vec::new();
    for path in list_images(dir)? {
        match image::open(&path) {
            Ok(img) => pool.push(img.to_rgb8()),
            Err(e) => eprintln!("Warning: could not read {}: {e}", path.display()),
        }
    }
    if pool.is_empty() {
        return Err(anyhow!("No readable images in {}", dir.display()));
    }
    Ok(pool)
}

fn write_data_yaml(config: &SynthConfig) -> Result<()> {
    let dataset = config
        .output_dir
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("dataset");
    let yaml = format!(
        "path: ../../datasets/{dataset}\n\ntrain: images/train\nval: images/val\n\nnames:\n   0: {CLASS_NAME}"
    );
    fs::write(config.output_dir.join("data.yaml"), yaml).context("Failed to write data.yaml")
}
