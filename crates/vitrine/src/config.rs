use std::{fmt::Display, str::FromStr, time::Duration};

pub const VITRINE_URL: &str = "https://materiais.incomumviagens.com.br/vitrine";
pub const BASE_URL: &str = "https://materiais.incomumviagens.com.br";

pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CardLayout {
    #[default]
    Card,
    CardBody,
}

impl CardLayout {
    pub fn selector(&self) -> &'static str {
        match self {
            CardLayout::Card => "div.card",
            CardLayout::CardBody => "div.card-body",
        }
    }
}

impl FromStr for CardLayout {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "card" => Ok(CardLayout::Card),
            "card-body" | "card_body" => Ok(CardLayout::CardBody),
            _ => Err(format!(
                "Invalid layout '{s}'. Accepted values: 'card', 'card-body'"
            )),
        }
    }
}

impl Display for CardLayout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.selector())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LinkPolicy {
    #[default]
    LaminaAnchor,
    FirstHref,
}

impl FromStr for LinkPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "lamina" => Ok(LinkPolicy::LaminaAnchor),
            "first-href" | "first_href" => Ok(LinkPolicy::FirstHref),
            _ => Err(format!(
                "Invalid link policy '{s}'. Accepted values: 'lamina', 'first-href'"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OcrConfig {
    pub program: String,
    pub language: String,
    pub whitelist: Option<String>,
    pub timeout: Duration,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            program: "tesseract".to_string(),
            language: "por".to_string(),
            whitelist: Some("0123456789R$US.,".to_string()),
            timeout: Duration::from_secs(15),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScraperConfig {
    pub listing_url: String,
    pub base_url: String,
    pub timeout: Duration,
    pub user_agent: String,
    pub layout: CardLayout,
    pub link_policy: LinkPolicy,
    pub skip_unresolved: bool,
    pub departure_placeholder: String,
    pub duration_placeholder: String,
    pub description_placeholder: String,
    pub ocr: OcrConfig,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            listing_url: VITRINE_URL.to_string(),
            base_url: BASE_URL.to_string(),
            timeout: Duration::from_secs(15),
            user_agent: BROWSER_USER_AGENT.to_string(),
            layout: CardLayout::default(),
            link_policy: LinkPolicy::default(),
            skip_unresolved: true,
            departure_placeholder: "Consulte".to_string(),
            duration_placeholder: "Consulte".to_string(),
            description_placeholder: "Entre em contato para mais detalhes.".to_string(),
            ocr: OcrConfig::default(),
        }
    }
}

impl ScraperConfig {
    pub fn with_listing_url(mut self, url: impl Into<String>) -> Self {
        let url = url.into();
        self.base_url = url.clone();
        self.listing_url = url;
        self
    }
}
