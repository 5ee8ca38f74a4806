use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

use url::Url;

/// One accepted image reference, queued for a download worker.
#[derive(Debug, Clone)]
pub struct DownloadTask {
    pub source_url: Url,
    pub dest_path: PathBuf,
    pub display_name: String,
}

/// Process-wide tallies shared by the finder and the workers.
#[derive(Debug, Default)]
pub struct ScrapeCounters {
    pub processed: AtomicUsize,
    pub downloaded: AtomicUsize,
    pub skipped: AtomicUsize,
    pub failed: AtomicUsize,
}

impl ScrapeCounters {
    /// Totals as of now. `enqueued` is tracked by whoever drives the finder,
    /// not by the shared counters.
    pub fn snapshot(&self, enqueued: usize) -> ScrapeTotals {
        ScrapeTotals {
            processed: self.processed.load(Ordering::Relaxed),
            enqueued,
            downloaded: self.downloaded.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrapeTotals {
    pub processed: usize,
    pub enqueued: usize,
    pub downloaded: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// One pasted object in YOLO label terms: class id plus box center and size
/// normalized to the canvas dimensions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct YoloBox {
    pub class_id: u32,
    pub cx: f64,
    pub cy: f64,
    pub w: f64,
    pub h: f64,
}

impl YoloBox {
    pub fn from_paste(
        class_id: u32,
        x: u32,
        y: u32,
        obj_w: u32,
        obj_h: u32,
        canvas_w: u32,
        canvas_h: u32,
    ) -> Self {
        Self {
            class_id,
            cx: (x as f64 + obj_w as f64 / 2.0) / canvas_w as f64,
            cy: (y as f64 + obj_h as f64 / 2.0) / canvas_h as f64,
            w: obj_w as f64 / canvas_w as f64,
            h: obj_h as f64 / canvas_h as f64,
        }
    }

    pub fn label_line(&self) -> String {
        format!(
            "{} {:.6} {:.6} {:.6} {:.6}",
            self.class_id, self.cx, self.cy, self.w, self.h
        )
    }
}
