use rmcp::{
    ServerHandler,
    handler::server::{tool::ToolRouter, wrapper::Parameters},
    model::{ErrorData as McpError, ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use vitrine::ScraperConfig;
use vitrine::VitrineScraper;
use vitrine::catalog::build_catalog;
use vitrine::price::{NumberLocale, parse_ocr_prices};
use vitrine::utils::PackageFilter;

#[derive(Debug, Clone)]
pub struct McpServer {
    scraper: VitrineScraper,
    tool_router: ToolRouter<Self>,
}

fn to_json<T: Serialize>(value: &T, what: &str) -> Result<String, McpError> {
    serde_json::to_string_pretty(value)
        .inspect_err(|e| log::error!("Serialization error: {e:?}"))
        .map_err(|e| McpError::internal_error(format!("Failed to serialize {what}: {e}"), None))
}

#[tool_router]
impl McpServer {
    pub fn new() -> Result<Self, anyhow::Error> {
        let config = match std::env::var("VITRINE_URL") {
            Ok(url) => ScraperConfig::default().with_listing_url(url),
            Err(_) => ScraperConfig::default(),
        };

        Ok(Self {
            scraper: VitrineScraper::with_config(config)?,
            tool_router: Self::tool_router(),
        })
    }

    #[tool(
        name = "list_packages",
        description = "Scrape the travel package vitrine and list its packages with prices read from each package's lâmina. Supports filtering by kind, currency, priced-only, limit and offset. Set `catalog` to include tipo/imgKey tags and the consultancy card."
    )]
    pub async fn list_packages(
        &self,
        Parameters(params): Parameters<ListPackagesParams>,
    ) -> Result<String, McpError> {
        let filter = params
            .filter
            .validate()
            .inspect_err(|e| log::error!("Invalid params: {e:?}"))
            .map_err(|e| McpError::invalid_params(e, None))?;

        let packages = if params.keep_unresolved {
            let config = ScraperConfig {
                skip_unresolved: false,
                ..self.scraper.config().clone()
            };
            VitrineScraper::with_config(config)
                .map_err(|e| {
                    McpError::internal_error(format!("Failed to create scraper: {e}"), None)
                })?
                .scrape_vitrine()
                .await
        } else {
            self.scraper.scrape_vitrine().await
        };

        let packages = filter.apply(packages);
        if params.catalog {
            to_json(&build_catalog(packages, true), "catalog")
        } else {
            to_json(&packages, "packages")
        }
    }

    #[tool(
        name = "extract_prices",
        description = "Extract installment price, cash price, currency and duration from OCR text of a promotional travel image. Numbers use Brazilian formatting (1.234,56)."
    )]
    pub async fn extract_prices(
        &self,
        Parameters(params): Parameters<ExtractPricesParams>,
    ) -> Result<String, McpError> {
        let prices = parse_ocr_prices(&params.text, NumberLocale::PtBr);
        to_json(&prices, "prices")
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ListPackagesParams {
    #[serde(flatten)]
    filter: PackageFilter,
    #[serde(default)]
    keep_unresolved: bool,
    #[serde(default)]
    catalog: bool,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ExtractPricesParams {
    text: String,
}

#[tool_handler]
impl ServerHandler for McpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            instructions: Some(include_str!("./instructions.md").to_string()),
            ..Default::default()
        }
    }
}
