mod common;

use std::collections::HashMap;
use std::fs;

use anyhow::Result;
use common::StubServer;
use hotwheels_dataset::downloader::ScrapeJob;

const PAGE: &str = r#"<html><body>
    <a class="image image-thumbnail" href="/files/red_baron.png">
        <img data-relevant="1" data-image-name="Red Baron.png" src="/t/rb.jpg"></a>
    <a class="image image-thumbnail" href="/files/twin_mill.png">
        <img data-relevant="0" src="/t/tm.jpg"></a>
    <a class="image image-thumbnail" href="/files/beatnik.png">
        <img data-relevant="1" src="/t/bb.jpg"></a>
    <a class="image" href="/files/not_a_gallery.png">
        <img data-relevant="1" src="/t/ng.jpg"></a>
    <img data-relevant="1" src="/t/stray.jpg">
</body></html>"#;

fn page_routes() -> HashMap<String, (u16, Vec<u8>)> {
    let mut routes = HashMap::new();
    routes.insert("/wiki/cars".to_string(), (200, PAGE.as_bytes().to_vec()));
    routes.insert("/files/red_baron.png".to_string(), (200, b"red baron bytes".to_vec()));
    routes.insert("/files/twin_mill.png".to_string(), (200, b"twin mill bytes".to_vec()));
    routes.insert("/files/beatnik.png".to_string(), (200, b"beatnik bytes".to_vec()));
    routes
}

#[tokio::test]
async fn existing_file_skips_and_the_rest_download() -> Result<()> {
    let server = StubServer::start(page_routes()).await?;
    let dir = tempfile::TempDir::new()?;
    let out = dir.path().join("images");
    fs::create_dir_all(&out)?;
    fs::write(out.join("beatnik.png"), b"already on disk")?;

    let job = ScrapeJob::new(out.to_str().unwrap(), 4)?;
    let totals = job.run(&[server.url("/wiki/cars")]).await?;

    assert_eq!(totals.processed, 3);
    assert_eq!(totals.enqueued, 2);
    assert_eq!(totals.skipped, 1);
    assert_eq!(totals.downloaded, 2);
    assert_eq!(totals.failed, 0);
    assert_eq!(totals.downloaded + totals.failed, totals.enqueued);

    assert_eq!(fs::read(out.join("Red_Baron.png"))?, b"red baron bytes");
    assert_eq!(fs::read(out.join("twin_mill.png"))?, b"twin mill bytes");
    assert_eq!(fs::read(out.join("beatnik.png"))?, b"already on disk");
    Ok(())
}

#[tokio::test]
async fn second_run_enqueues_nothing() -> Result<()> {
    let server = StubServer::start(page_routes()).await?;
    let dir = tempfile::TempDir::new()?;
    let out = dir.path().join("images");
    let pages = vec![server.url("/wiki/cars")];

    let first = ScrapeJob::new(out.to_str().unwrap(), 4)?;
    let totals = first.run(&pages).await?;
    assert_eq!(totals.enqueued, 3);
    assert_eq!(totals.downloaded, 3);

    let second = ScrapeJob::new(out.to_str().unwrap(), 4)?;
    let totals = second.run(&pages).await?;
    assert_eq!(totals.processed, 3);
    assert_eq!(totals.enqueued, 0);
    assert_eq!(totals.skipped, 3);
    assert_eq!(totals.downloaded, 0);
    assert_eq!(totals.failed, 0);
    Ok(())
}

#[tokio::test]
async fn missing_image_counts_as_failed_without_a_file() -> Result<()> {
    let page = r#"<html><body>
        <a class="image image-thumbnail" href="/files/ghost.png">
            <img data-relevant="1" src="/t/g.jpg"></a>
    </body></html>"#;
    let mut routes = HashMap::new();
    routes.insert("/wiki/cars".to_string(), (200, page.as_bytes().to_vec()));
    let server = StubServer::start(routes).await?;

    let dir = tempfile::TempDir::new()?;
    let out = dir.path().join("images");
    let job = ScrapeJob::new(out.to_str().unwrap(), 2)?;
    let totals = job.run(&[server.url("/wiki/cars")]).await?;

    assert_eq!(totals.processed, 1);
    assert_eq!(totals.enqueued, 1);
    assert_eq!(totals.downloaded, 0);
    assert_eq!(totals.failed, 1);
    assert!(!out.join("ghost.png").exists());
    Ok(())
}

#[tokio::test]
async fn queue_drains_fully_with_fewer_workers_than_tasks() -> Result<()> {
    let mut routes = HashMap::new();
    let mut page = String::from("<html><body>");
    for i in 0..12 {
        page.push_str(&format!(
            r#"<a class="image image-thumbnail" href="/files/car_{i}.png"><img data-relevant="1" src="/t/{i}.jpg"></a>"#
        ));
        routes.insert(
            format!("/files/car_{i}.png"),
            (200, format!("car {i}").into_bytes()),
        );
    }
    page.push_str("</body></html>");
    routes.insert("/wiki/fleet".to_string(), (200, page.into_bytes()));
    let server = StubServer::start(routes).await?;

    let dir = tempfile::TempDir::new()?;
    let out = dir.path().join("dl");
    let job = ScrapeJob::new(out.to_str().unwrap(), 3)?;
    let totals = job.run(&[server.url("/wiki/fleet")]).await?;

    assert_eq!(totals.enqueued, 12);
    assert_eq!(totals.downloaded, 12);
    assert_eq!(totals.failed, 0);
    assert_eq!(totals.downloaded + totals.failed, totals.enqueued);
    for i in 0..12 {
        assert!(out.join(format!("car_{i}.png")).exists());
    }
    Ok(())
}

#[tokio::test]
async fn unfetchable_page_is_skipped_not_fatal() -> Result<()> {
    let server = StubServer::start(HashMap::new()).await?;

    let dir = tempfile::TempDir::new()?;
    let out = dir.path().join("images");
    let job = ScrapeJob::new(out.to_str().unwrap(), 2)?;
    let totals = job.run(&[server.url("/wiki/nowhere")]).await?;

    assert_eq!(totals.processed, 0);
    assert_eq!(totals.enqueued, 0);
    assert_eq!(totals.downloaded, 0);
    assert_eq!(totals.failed, 0);
    Ok(())
}

#[tokio::test]
async fn no_valid_page_urls_is_fatal() -> Result<()> {
    let dir = tempfile::TempDir::new()?;
    let out = dir.path().join("images");
    let job = ScrapeJob::new(out.to_str().unwrap(), 2)?;

    assert!(job.run(&[]).await.is_err());
    assert!(job.run(&["ftp://elsewhere/list".to_string()]).await.is_err());
    assert!(job.run(&["   ".to_string()]).await.is_err());
    Ok(())
}
