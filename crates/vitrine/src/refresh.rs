use std::future::Future;
use std::path::Path;
use std::time::{Duration, Instant};

use crate::catalog::{CatalogError, build_catalog, refresh_static_file};
use crate::ocr::OcrEngine;
use crate::scraper::{ScraperError, VitrineScraper};

#[derive(Debug, thiserror::Error)]
pub enum RefreshError {
    #[error("Vitrine unreachable, page left untouched: {0}")]
    Scrape(#[from] ScraperError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

// A vitrine that cannot be fetched leaves the page as it is instead of
// publishing only the consultancy card.
pub async fn refresh_from_scraper<O: OcrEngine>(
    scraper: &VitrineScraper<O>,
    path: &Path,
    with_consultancy: bool,
) -> Result<usize, RefreshError> {
    let start = Instant::now();
    let packages = scraper.try_scrape_vitrine().await?;
    let entries = build_catalog(packages, with_consultancy);
    let written = refresh_static_file(path, &entries).await?;
    log::info!(
        "Vitrine refreshed in {:.2}s, {} card(s) written to {}",
        start.elapsed().as_secs_f64(),
        written,
        path.display()
    );
    Ok(written)
}

/// Refreshes `path` every `period` until `shutdown` resolves. A failed run is
/// logged and the next one still happens. Returns the number of runs.
pub async fn watch_static_file<O: OcrEngine>(
    scraper: &VitrineScraper<O>,
    path: &Path,
    with_consultancy: bool,
    period: Duration,
    shutdown: impl Future<Output = ()>,
) -> usize {
    let mut interval = tokio::time::interval(period.max(Duration::from_millis(1)));
    tokio::pin!(shutdown);

    let mut runs = 0;
    loop {
        tokio::select! {
            _ = interval.tick() => {
                runs += 1;
                if let Err(e) = refresh_from_scraper(scraper, path, with_consultancy).await {
                    log::error!("Scheduled refresh failed: {}", e);
                }
                let next = chrono::TimeDelta::from_std(period)
                    .ok()
                    .and_then(|delta| chrono::Local::now().checked_add_signed(delta));
                if let Some(next) = next {
                    log::info!("Next refresh at {}", next.format("%Y-%m-%d %H:%M:%S"));
                }
            }
            _ = &mut shutdown => {
                log::info!("Stopping watch after {} run(s)", runs);
                break;
            }
        }
    }
    runs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScraperConfig;
    use crate::ocr::TesseractOcr;
    use axum::Router;
    use axum::routing::get;
    use std::fs;

    const PAGE: &str = "<script>\nconst DADOS_ESTATICOS_ATUALIZAVEIS = [\n  { \"id\": 1 }\n];\n</script>";

    fn scraper_for(url: &str) -> VitrineScraper<Option<TesseractOcr>> {
        let config = ScraperConfig {
            timeout: Duration::from_secs(5),
            ..Default::default()
        }
        .with_listing_url(url);
        VitrineScraper::with_ocr(config, None).unwrap()
    }

    async fn serve_listing() -> String {
        let listing = fs::read_to_string("fixtures/vitrine_listing.html").unwrap();
        let router = Router::new().route(
            "/vitrine",
            get(move || async move { axum::response::Html(listing) }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let root = format!("http://{}", listener.local_addr().unwrap());
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        root
    }

    #[tokio::test]
    async fn test_unreachable_vitrine_leaves_page_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.html");
        fs::write(&path, PAGE).unwrap();

        let scraper = scraper_for("http://127.0.0.1:9/vitrine");
        let err = refresh_from_scraper(&scraper, &path, true)
            .await
            .unwrap_err();

        assert!(matches!(err, RefreshError::Scrape(_)));
        assert_eq!(fs::read(&path).unwrap(), PAGE.as_bytes());
    }

    #[tokio::test]
    async fn test_refresh_writes_catalog() {
        let root = serve_listing().await;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.html");
        fs::write(&path, PAGE).unwrap();

        let scraper = scraper_for(&format!("{}/vitrine", root));
        let written = refresh_from_scraper(&scraper, &path, true).await.unwrap();

        // Paris, Gramado and Egito plus the consultancy card.
        assert_eq!(written, 4);
        let html = fs::read_to_string(&path).unwrap();
        assert!(html.contains("Egito Clássico"));
        assert!(html.contains("Consultoria Personalizada"));
    }

    #[tokio::test]
    async fn test_refresh_missing_block_is_catalog_error() {
        let root = serve_listing().await;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.html");
        fs::write(&path, "<html></html>").unwrap();

        let scraper = scraper_for(&format!("{}/vitrine", root));
        let err = refresh_from_scraper(&scraper, &path, false)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            RefreshError::Catalog(CatalogError::BlockNotFound)
        ));
    }

    #[tokio::test]
    async fn test_watch_keeps_running_after_failures() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.html");
        fs::write(&path, PAGE).unwrap();

        let scraper = scraper_for("http://127.0.0.1:9/vitrine");
        let runs = watch_static_file(
            &scraper,
            &path,
            true,
            Duration::from_millis(50),
            tokio::time::sleep(Duration::from_millis(400)),
        )
        .await;

        assert!(runs >= 2, "only {runs} run(s)");
        assert_eq!(fs::read(&path).unwrap(), PAGE.as_bytes());
    }
}
