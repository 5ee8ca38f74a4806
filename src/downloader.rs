use std::fs::{self, File};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use futures::future::join_all;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::Client;
use tokio::sync::Mutex;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::task;

use crate::finder::PageFinder;
use crate::models::{DownloadTask, ScrapeCounters, ScrapeTotals};

/// Spoofed browser user agent; some hosts refuse the default client one.
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                              (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

const PAGE_TIMEOUT: Duration = Duration::from_secs(30);
const IMAGE_TIMEOUT: Duration = Duration::from_secs(120);

pub fn build_client() -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(PAGE_TIMEOUT)
        .build()
        .context("Failed to build HTTP client")
}

/// One scrape run: a sequential page scan feeding a fixed pool of download
/// workers over a shared queue.
pub struct ScrapeJob {
    client: Client,
    output_dir: PathBuf,
    workers: usize,
    counters: Arc<ScrapeCounters>,
}

impl ScrapeJob {
    pub fn new(output_dir: &str, workers: usize) -> Result<Self> {
        let output_path = PathBuf::from(output_dir);
        if !output_path.exists() {
            fs::create_dir_all(&output_path)
                .with_context(|| format!("Failed to create directory {}", output_path.display()))?;
        }

        Ok(Self {
            client: build_client()?,
            output_dir: output_path,
            workers,
            counters: Arc::new(ScrapeCounters::default()),
        })
    }

    /// Scans every page in order while the pool downloads in the background,
    /// then closes the queue, waits for it to drain, and prints the totals.
    pub async fn run(&self, pages: &[String]) -> Result<ScrapeTotals> {
        let pages: Vec<&str> = pages
            .iter()
            .map(|page| page.trim())
            .filter(|page| page.starts_with("http://") || page.starts_with("https://"))
            .collect();
        if pages.is_empty() {
            return Err(anyhow!("No valid page URLs to process"));
        }

        let (queue, receiver) = mpsc::unbounded_channel();
        let receiver = Arc::new(Mutex::new(receiver));

        let mut handles = Vec::new();
        for _ in 0..self.workers {
            let client = self.client.clone();
            let receiver = Arc::clone(&receiver);
            let counters = Arc::clone(&self.counters);
            handles.push(task::spawn(worker_loop(client, receiver, counters)));
        }

        let finder = PageFinder::new(
            self.client.clone(),
            self.output_dir.clone(),
            Arc::clone(&self.counters),
            queue,
        );

        let pb = ProgressBar::new(pages.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{msg:20} {bar:40} {pos}/{len}")
                .unwrap()
                .progress_chars("=>-"),
        );
        pb.set_message("Scanning pages");

        let mut enqueued = 0usize;
        for page in &pages {
            match finder.scan_page(page).await {
                Ok(scan) => {
                    enqueued += scan.enqueued;
                    pb.println(format!(
                        "{page}: {} matched, {} queued",
                        scan.matched, scan.enqueued
                    ));
                }
                Err(e) => pb.println(format!("Skipping {page}: {e}")),
            }
            pb.inc(1);
        }
        pb.finish_with_message("Pages scanned");

        // Dropping the finder drops the only queue sender; each worker keeps
        // pulling until the closed queue is empty, then exits.
        drop(finder);

        for joined in join_all(handles).await {
            if let Err(e) = joined {
                eprintln!("Worker task error: {e}");
            }
        }

        let totals = self.counters.snapshot(enqueued);
        println!(
            "\nDone: {} matched, {} downloaded, {} skipped, {} failed",
            totals.processed, totals.downloaded, totals.skipped, totals.failed
        );
        Ok(totals)
    }
}

async fn worker_loop(
    client: Client,
    receiver: Arc<Mutex<UnboundedReceiver<DownloadTask>>>,
    counters: Arc<ScrapeCounters>,
) {
    loop {
        let task = receiver.lock().await.recv().await;
        let Some(task) = task else { break };

        match fetch_image(&client, &task).await {
            Ok(()) => {
                counters.downloaded.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                counters.failed.fetch_add(1, Ordering::Relaxed);
                eprintln!("Failed to download {}: {e:#}", task.display_name);
            }
        }
    }
}

async fn fetch_image(client: &Client, task: &DownloadTask) -> Result<()> {
    let mut response = client
        .get(task.source_url.clone())
        .timeout(IMAGE_TIMEOUT)
        .send()
        .await
        .context("GET request failed")?;

    if !response.status().is_success() {
        return Err(anyhow!("HTTP request failed: {}", response.status()));
    }

    if let Some(parent) = task.dest_path.parent() {
        fs::create_dir_all(parent).context("Failed to create output directory")?;
    }

    let mut file = File::create(&task.dest_path)
        .with_context(|| format!("Failed to create {}", task.dest_path.display()))?;

    while let Some(chunk) = response.chunk().await? {
        file.write_all(&chunk)?;
    }

    Ok(())
}
