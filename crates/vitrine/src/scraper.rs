use reqwest::Client;
use url::Url;

use crate::config::ScraperConfig;
use crate::ocr::{OcrEngine, OcrError, TesseractOcr};
use crate::parser::{parse_detail_page, parse_listing};
use crate::price::{NumberLocale, parse_ocr_prices};
use crate::types::{DetailLink, Package, Prices};
use crate::utils::PackageStats;

#[derive(Debug, thiserror::Error)]
pub enum ScraperError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("OCR error: {0}")]
    OcrError(#[from] OcrError),
}

#[derive(Debug, Clone)]
pub struct VitrineScraper<O = TesseractOcr> {
    client: Client,
    config: ScraperConfig,
    base_url: Url,
    ocr: O,
}

impl VitrineScraper<TesseractOcr> {
    pub fn new() -> Result<Self, ScraperError> {
        Self::with_config(ScraperConfig::default())
    }

    pub fn with_config(config: ScraperConfig) -> Result<Self, ScraperError> {
        let ocr = TesseractOcr::new(config.ocr.clone());
        Self::with_ocr(config, ocr)
    }
}

impl<O: OcrEngine> VitrineScraper<O> {
    pub fn with_ocr(config: ScraperConfig, ocr: O) -> Result<Self, ScraperError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()?;
        let base_url = Url::parse(&config.base_url)?;

        Ok(Self {
            client,
            config,
            base_url,
            ocr,
        })
    }

    pub fn config(&self) -> &ScraperConfig {
        &self.config
    }

    pub async fn scrape_vitrine(&self) -> Vec<Package> {
        self.try_scrape_vitrine().await.unwrap_or_else(|e| {
            log::error!("Error fetching vitrine {}: {}", self.config.listing_url, e);
            Vec::new()
        })
    }

    /// Like [`scrape_vitrine`](Self::scrape_vitrine) but surfaces a failed
    /// listing fetch, so an unreachable source can be told apart from an
    /// empty one.
    pub async fn try_scrape_vitrine(&self) -> Result<Vec<Package>, ScraperError> {
        log::info!("Fetching vitrine from {}...", self.config.listing_url);
        let html = self.get_html(&self.config.listing_url).await?;
        let cards = parse_listing(&html, &self.config, &self.base_url);
        log::debug!("Found {} card(s) on the vitrine", cards.len());

        let mut packages = Vec::with_capacity(cards.len());
        for card in cards {
            if card.detail.is_missing() && self.config.skip_unresolved {
                log::debug!("Skipping '{}': no usable lâmina link", card.nome);
                continue;
            }

            let prices = self.fetch_prices(&card.detail).await;
            let opcoes = prices
                .to_option(&self.config.duration_placeholder)
                .into_iter()
                .collect();
            packages.push(card.into_package(opcoes));
        }

        let stats = PackageStats::from_packages(&packages);
        log::info!(
            "Scraped {} package(s), {} with prices",
            stats.total,
            stats.priced
        );

        Ok(packages)
    }

    pub async fn fetch_prices(&self, link: &DetailLink) -> Prices {
        match link {
            DetailLink::HtmlPage(url) => match self.get_html(url.as_str()).await {
                Ok(html) => parse_detail_page(&html),
                Err(e) => {
                    log::error!("Error fetching lâmina {}: {}", url, e);
                    Prices::default()
                }
            },
            DetailLink::ImageAsset(url) => match self.get_bytes(url.as_str()).await {
                Ok(bytes) => self.recognize_prices(&bytes).await.unwrap_or_else(|e| {
                    log::warn!("OCR skipped for {}: {}", url, e);
                    Prices::default()
                }),
                Err(e) => {
                    log::error!("Error downloading lâmina {}: {}", url, e);
                    Prices::default()
                }
            },
            DetailLink::PdfAsset(url) => {
                log::info!("Lâmina {} is a PDF, prices left for manual follow-up", url);
                Prices::default()
            }
            DetailLink::Missing => Prices::default(),
        }
    }

    pub async fn recognize_prices(&self, image: &[u8]) -> Result<Prices, OcrError> {
        let text = self.ocr.recognize(image).await?;
        log::debug!("OCR text: {:?}", text);
        Ok(parse_ocr_prices(&text, NumberLocale::PtBr))
    }

    async fn get_html(&self, url: &str) -> Result<String, ScraperError> {
        Ok(self
            .client
            .get(url)
            .send()
            .await
            .inspect_err(|e| log::debug!("HTTP error: {e:?}"))?
            .error_for_status()?
            .text()
            .await
            .inspect_err(|e| log::debug!("Decode error: {e:?}"))?)
    }

    async fn get_bytes(&self, url: &str) -> Result<Vec<u8>, ScraperError> {
        Ok(self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?
            .to_vec())
    }
}
