use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use image::{GrayImage, Luma, Rgb, RgbImage, imageops};
use imageproc::contrast::{ThresholdType, otsu_level, threshold};
use imageproc::distance_transform::Norm;
use imageproc::filter::gaussian_blur_f32;
use imageproc::morphology::{close, dilate, erode};
use imageproc::region_labelling::{Connectivity, connected_components};
use indicatif::{ProgressBar, ProgressStyle};

const IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "bmp", "tiff"];

/// Knobs for the foreground mask. The defaults match the sheet-photo setup:
/// a heavy blur to flatten paper texture, then a 5x5 square element.
#[derive(Debug, Clone, Copy)]
pub struct MaskParams {
    pub blur_sigma: f32,
    pub morph_radius: u8,
    pub min_area: u32,
}

impl Default for MaskParams {
    fn default() -> Self {
        Self {
            blur_sigma: 2.0,
            morph_radius: 2,
            min_area: 64,
        }
    }
}

/// Axis-aligned bounding box of one connected foreground component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub area: u32,
}

/// Binary car-vs-background mask. Cars are dark on a light sheet, so the
/// grayscale is inverted before Otsu picks the split point.
pub fn foreground_mask(gray: &GrayImage, params: &MaskParams) -> GrayImage {
    let mut inverted = gray.clone();
    imageops::invert(&mut inverted);
    let blurred = gaussian_blur_f32(&inverted, params.blur_sigma);
    let level = otsu_level(&blurred);
    let mut mask = threshold(&blurred, level, ThresholdType::Binary);

    let k = params.morph_radius;
    if k > 0 {
        mask = dilate(&mask, Norm::LInf, k);
        mask = close(&mask, Norm::LInf, k);
        mask = erode(&mask, Norm::LInf, k);
    }
    mask
}

/// Bounding boxes of 8-connected mask components, largest first. Components
/// under `min_area` pixels are dropped.
pub fn labeled_regions(mask: &GrayImage, min_area: u32) -> Vec<Region> {
    let labels = connected_components(mask, Connectivity::Eight, Luma([0u8]));

    let mut bounds: HashMap<u32, (u32, u32, u32, u32, u32)> = HashMap::new();
    for (x, y, pixel) in labels.enumerate_pixels() {
        let label = pixel[0];
        if label == 0 {
            continue;
        }
        let entry = bounds.entry(label).or_insert((x, y, x, y, 0));
        entry.0 = entry.0.min(x);
        entry.1 = entry.1.min(y);
        entry.2 = entry.2.max(x);
        entry.3 = entry.3.max(y);
        entry.4 += 1;
    }

    let mut regions: Vec<Region> = bounds
        .into_values()
        .filter(|&(_, _, _, _, count)| count >= min_area)
        .map(|(min_x, min_y, max_x, max_y, count)| Region {
            x: min_x,
            y: min_y,
            width: max_x - min_x + 1,
            height: max_y - min_y + 1,
            area: count,
        })
        .collect();
    regions.sort_by(|a, b| b.area.cmp(&a.area).then(a.y.cmp(&b.y)).then(a.x.cmp(&b.x)));
    regions
}

/// Zeroes every mask pixel outside the largest connected component.
pub fn keep_largest_component(mask: &GrayImage) -> GrayImage {
    let labels = connected_components(mask, Connectivity::Eight, Luma([0u8]));

    let mut counts: HashMap<u32, u32> = HashMap::new();
    for pixel in labels.pixels() {
        let label = pixel[0];
        if label != 0 {
            *counts.entry(label).or_insert(0) += 1;
        }
    }

    let mut kept = GrayImage::from_pixel(mask.width(), mask.height(), Luma([0u8]));
    let Some((largest, _)) = counts
        .into_iter()
        .max_by_key(|&(label, count)| (count, std::cmp::Reverse(label)))
    else {
        return kept;
    };
    for (x, y, pixel) in labels.enumerate_pixels() {
        if pixel[0] == largest {
            kept.put_pixel(x, y, Luma([255u8]));
        }
    }
    kept
}

/// Image files directly inside `dir`, sorted by name.
pub fn list_images(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let entries =
        fs::read_dir(dir).with_context(|| format!("Failed to read directory {}", dir.display()))?;
    for entry in entries {
        let path = entry?.path();
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            continue;
        };
        let ext = ext.to_ascii_lowercase();
        if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Cuts every labeled region out of every image in `input_dir`, saving each
/// crop as `{stem}_roi_{i}.png`. Returns the number of crops written.
pub fn split_rois(input_dir: &Path, output_dir: &Path, params: &MaskParams) -> Result<usize> {
    let files = list_images(input_dir)?;
    if files.is_empty() {
        return Err(anyhow!("No images found in {}", input_dir.display()));
    }
    fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create directory {}", output_dir.display()))?;

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{msg:20} {bar:40} {pos}/{len}")
            .unwrap()
            .progress_chars("=>-"),
    );

    let mut total = 0usize;
    for path in &files {
        pb.set_message(file_stem(path));
        let img = match image::open(path) {
            Ok(img) => img,
            Err(e) => {
                pb.println(format!("Warning: could not read {}: {e}", path.display()));
                pb.inc(1);
                continue;
            }
        };

        let mask = foreground_mask(&img.to_luma8(), params);
        let regions = labeled_regions(&mask, params.min_area);
        let stem = file_stem(path);
        for (i, region) in regions.iter().enumerate() {
            let crop = img.crop_imm(region.x, region.y, region.width, region.height);
            let out = output_dir.join(format!("{}_roi_{}.png", stem, i + 1));
            crop.save(&out)
                .with_context(|| format!("Failed to write {}", out.display()))?;
        }
        pb.println(format!("{}: {} regions", path.display(), regions.len()));
        total += regions.len();
        pb.inc(1);
    }
    pb.finish_with_message("All images processed");

    println!("\nDone: {} regions from {} images", total, files.len());
    Ok(total)
}

/// Replaces everything outside the largest foreground component with plain
/// white, saving each result as `{stem}_masked.png`. Returns the number of
/// images written.
pub fn remove_background(input_dir: &Path, output_dir: &Path, params: &MaskParams) -> Result<usize> {
    let files = list_images(input_dir)?;
    if files.is_empty() {
        return Err(anyhow!("No images found in {}", input_dir.display()));
    }
    fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create directory {}", output_dir.display()))?;

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{msg:20} {bar:40} {pos}/{len} ({eta})")
            .unwrap()
            .progress_chars("=>-"),
    );

    let mut masked = 0usize;
    for path in &files {
        pb.set_message(file_stem(path));
        let img = match image::open(path) {
            Ok(img) => img,
            Err(e) => {
                pb.println(format!("Warning: could not read {}: {e}", path.display()));
                pb.inc(1);
                continue;
            }
        };

        let rgb = img.to_rgb8();
        let mask = keep_largest_component(&foreground_mask(&img.to_luma8(), params));

        let mut composite = RgbImage::from_pixel(rgb.width(), rgb.height(), Rgb([255, 255, 255]));
        for (x, y, pixel) in rgb.enumerate_pixels() {
            if mask.get_pixel(x, y)[0] != 0 {
                composite.put_pixel(x, y, *pixel);
            }
        }

        let out = output_dir.join(format!("{}_masked.png", file_stem(path)));
        composite
            .save(&out)
            .with_context(|| format!("Failed to write {}", out.display()))?;
        masked += 1;
        pb.inc(1);
    }
    pb.finish_with_message("All images masked");

    println!("\nDone: {} of {} images masked", masked, files.len());
    Ok(masked)
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("image")
        .to_string()
}
