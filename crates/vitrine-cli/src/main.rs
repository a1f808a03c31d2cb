use std::path::PathBuf;
use std::process;
use std::str::FromStr;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};
use log::LevelFilter;
use tokio::io::AsyncReadExt;
use vitrine::catalog::{PackageKind, build_catalog};
use vitrine::config::{CardLayout, LinkPolicy, OcrConfig, ScraperConfig};
use vitrine::ocr::{TesseractOcr, is_image};
use vitrine::price::{NumberLocale, parse_ocr_prices};
use vitrine::refresh::{refresh_from_scraper, watch_static_file};
use vitrine::types::{Currency, Prices};
use vitrine::utils::{PackageFilter, PackageStats};
use vitrine::{ScraperError, VITRINE_URL, VitrineScraper};

type Scraper = VitrineScraper<Option<TesseractOcr>>;

#[derive(Parser)]
#[command(name = "vitrine")]
#[command(about = "A travel package vitrine scraper", long_about = None)]
struct Cli {
    #[arg(
        short = 'l',
        long = "log-level",
        value_enum,
        default_value = "info",
        global = true,
        help = "Set the logging level"
    )]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => LevelFilter::Off,
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

#[derive(Debug, Clone, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Args)]
struct ScrapeArgs {
    #[arg(
        long,
        help = "Vitrine URL to scrape [default: $VITRINE_URL or the Incomum vitrine]"
    )]
    url: Option<String>,

    #[arg(long, default_value_t = 15, help = "Per-request timeout in seconds")]
    timeout: u64,

    #[arg(
        long,
        value_parser = CardLayout::from_str,
        default_value = "card",
        help = "Package container on the vitrine page ('card' or 'card-body')"
    )]
    layout: CardLayout,

    #[arg(
        long,
        value_parser = LinkPolicy::from_str,
        default_value = "lamina",
        help = "How the lâmina link is picked ('lamina' or 'first-href')"
    )]
    link_policy: LinkPolicy,

    #[arg(long, help = "Keep packages whose lâmina link cannot be resolved")]
    keep_unresolved: bool,

    #[arg(long, help = "Skip OCR of image lâminas")]
    no_ocr: bool,

    #[arg(long, default_value = "tesseract", help = "Tesseract binary to run")]
    tesseract: String,

    #[arg(long, default_value = "por", help = "Tesseract language model")]
    ocr_lang: String,

    #[arg(long, help = "Let OCR read letters too, not only digits and currency marks")]
    no_whitelist: bool,
}

impl ScrapeArgs {
    fn config(&self) -> ScraperConfig {
        let url = self
            .url
            .clone()
            .or_else(|| std::env::var("VITRINE_URL").ok())
            .unwrap_or_else(|| VITRINE_URL.to_string());

        let defaults = ScraperConfig::default();
        let mut config = if url == defaults.listing_url {
            defaults
        } else {
            defaults.with_listing_url(url)
        };

        config.timeout = Duration::from_secs(self.timeout);
        config.layout = self.layout;
        config.link_policy = self.link_policy;
        config.skip_unresolved = !self.keep_unresolved;
        let whitelist = if self.no_whitelist {
            None
        } else {
            config.ocr.whitelist.clone()
        };
        config.ocr = OcrConfig {
            program: self.tesseract.clone(),
            language: self.ocr_lang.clone(),
            whitelist,
            timeout: config.timeout,
        };
        config
    }

    fn scraper(&self) -> Scraper {
        let config = self.config();
        let ocr = (!self.no_ocr).then(|| TesseractOcr::new(config.ocr.clone()));
        VitrineScraper::with_ocr(config, ocr).unwrap_or_else(|e| {
            log::error!("Error creating scraper: {}", e);
            process::exit(1);
        })
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape the vitrine and list its packages with optional filtering
    List {
        #[command(flatten)]
        scrape: ScrapeArgs,

        #[arg(
            long,
            help = "Maximum number of results to return",
            value_parser = clap::value_parser!(u16).range(1..)
        )]
        limit: Option<u16>,

        #[arg(
            long,
            help = "Number of results to skip from the beginning",
            value_parser = clap::value_parser!(u16).range(1..)
        )]
        offset: Option<u16>,

        #[arg(long, value_parser = PackageKind::from_str, help = "Filter by 'nacional' or 'internacional'")]
        kind: Option<PackageKind>,

        #[arg(long, value_parser = parse_currency, help = "Filter by price currency ('brl' or 'usd')")]
        currency: Option<Currency>,

        #[arg(long, help = "Only packages with at least one price option")]
        priced_only: bool,

        #[arg(long, help = "Emit catalog entries (tipo, imgKey and the consultancy card)")]
        catalog: bool,

        #[arg(
            short = 'o',
            long = "output",
            value_enum,
            default_value = "text",
            help = "Output format"
        )]
        format: OutputFormat,
    },
    /// Scrape the vitrine once and rewrite the static data block of a page
    Refresh {
        #[command(flatten)]
        scrape: ScrapeArgs,

        #[arg(long, default_value = "templates/index.html", help = "Page holding the data block")]
        file: PathBuf,

        #[arg(long, help = "Do not append the consultancy card")]
        no_consultancy: bool,
    },
    /// Refresh the static data block on a fixed interval until interrupted
    Watch {
        #[command(flatten)]
        scrape: ScrapeArgs,

        #[arg(long, default_value = "templates/index.html", help = "Page holding the data block")]
        file: PathBuf,

        #[arg(
            long,
            default_value_t = 72,
            value_parser = clap::value_parser!(u64).range(1..=8760),
            help = "Hours between refreshes (at most a year)"
        )]
        hours: u64,

        #[arg(long, help = "Do not append the consultancy card")]
        no_consultancy: bool,
    },
    /// Extract prices from a lâmina image, or from OCR text ('-' reads stdin)
    Prices {
        #[command(flatten)]
        scrape: ScrapeArgs,

        #[arg(help = "Image or text file")]
        path: String,

        #[arg(
            short = 'o',
            long = "output",
            value_enum,
            default_value = "text",
            help = "Output format"
        )]
        format: OutputFormat,
    },
}

fn parse_currency(s: &str) -> Result<Currency, String> {
    Currency::from_str(s).map_err(|e| e.to_string())
}

fn serialize_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            log::error!("Error serializing to JSON: {}", e);
            process::exit(1);
        }
    }
}

async fn read_input(path: &str) -> std::io::Result<Vec<u8>> {
    if path == "-" {
        let mut buf = Vec::new();
        tokio::io::stdin().read_to_end(&mut buf).await?;
        Ok(buf)
    } else {
        tokio::fs::read(path).await
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(cli.log_level.clone().into())
        .init();

    match cli.command {
        Commands::List {
            scrape,
            limit,
            offset,
            kind,
            currency,
            priced_only,
            catalog,
            format,
        } => {
            let filter = PackageFilter {
                kind,
                currency,
                priced_only,
                limit: limit.map(usize::from),
                offset: offset.map(usize::from),
            };

            let filter = filter.validate().unwrap_or_else(|e| {
                log::error!("Invalid args: {e}");
                process::exit(1);
            });

            let scraper = scrape.scraper();
            let packages = filter.apply(scraper.scrape_vitrine().await);

            match (format, catalog) {
                (OutputFormat::Json, true) => serialize_json(&build_catalog(packages, true)),
                (OutputFormat::Json, false) => serialize_json(&packages),
                (OutputFormat::Text, true) => {
                    for entry in build_catalog(packages, true) {
                        println!("{}", entry);
                    }
                }
                (OutputFormat::Text, false) => {
                    if packages.is_empty() {
                        println!("No packages to display.");
                    } else {
                        for package in &packages {
                            println!("{}", package);
                        }
                        print!("{}", PackageStats::from_packages(&packages));
                    }
                }
            }
        }

        Commands::Refresh {
            scrape,
            file,
            no_consultancy,
        } => {
            let scraper = scrape.scraper();
            if let Err(e) = refresh_from_scraper(&scraper, &file, !no_consultancy).await {
                log::error!("Error refreshing {}: {}", file.display(), e);
                process::exit(1);
            }
        }

        Commands::Watch {
            scrape,
            file,
            hours,
            no_consultancy,
        } => {
            let scraper = scrape.scraper();
            let period = Duration::from_secs(hours * 3600);

            log::info!("Refreshing {} every {} hour(s)", file.display(), hours);

            let shutdown = async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    log::error!("Error listening for ctrl-c: {}", e);
                    std::future::pending::<()>().await;
                }
                log::info!("Interrupted, stopping watch");
            };
            watch_static_file(&scraper, &file, !no_consultancy, period, shutdown).await;
        }

        Commands::Prices {
            scrape,
            path,
            format,
        } => {
            let input = read_input(&path).await.unwrap_or_else(|e| {
                log::error!("Error reading {}: {}", path, e);
                process::exit(1);
            });

            let prices: Prices = if is_image(&input) {
                let scraper = scrape.scraper();
                scraper
                    .recognize_prices(&input)
                    .await
                    .map_err(ScraperError::from)
                    .unwrap_or_else(|e| {
                        log::error!("Error reading prices from {}: {}", path, e);
                        process::exit(1);
                    })
            } else {
                match String::from_utf8(input) {
                    Ok(text) => parse_ocr_prices(&text, NumberLocale::PtBr),
                    Err(_) => {
                        log::error!("{} is neither text nor a known image format", path);
                        process::exit(1);
                    }
                }
            };

            match format {
                OutputFormat::Json => serialize_json(&prices),
                OutputFormat::Text => println!("{}", prices),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn watch_hours(hours: &str) -> Result<u64, clap::Error> {
        let cli = Cli::try_parse_from(["vitrine", "watch", "--hours", hours])?;
        match cli.command {
            Commands::Watch { hours, .. } => Ok(hours),
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_watch_hours_bounds() {
        assert_eq!(watch_hours("72").unwrap(), 72);
        assert_eq!(watch_hours("8760").unwrap(), 8760);
        assert!(watch_hours("0").is_err());
        assert!(watch_hours("8761").is_err());
        assert!(watch_hours("10000000000000").is_err());
    }

    #[test]
    fn test_watch_defaults() {
        let cli = Cli::try_parse_from(["vitrine", "watch"]).unwrap();
        match cli.command {
            Commands::Watch {
                hours,
                file,
                no_consultancy,
                ..
            } => {
                assert_eq!(hours, 72);
                assert_eq!(file, PathBuf::from("templates/index.html"));
                assert!(!no_consultancy);
            }
            _ => unreachable!(),
        }
    }
}
