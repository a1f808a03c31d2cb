pub mod catalog;
pub mod config;
pub mod ocr;
pub mod parser;
pub mod price;
pub mod refresh;
pub mod scraper;
pub mod types;
pub mod utils;

pub use config::{ScraperConfig, VITRINE_URL};
pub use scraper::{ScraperError, VitrineScraper};
