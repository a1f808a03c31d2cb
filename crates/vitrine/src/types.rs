use std::{fmt::Display, str::FromStr};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use url::Url;

#[derive(Debug, thiserror::Error)]
#[error("Invalid currency '{0}'. Accepted values: 'brl', 'r$', 'usd', 'us$'")]
pub struct CurrencyParseError(String);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum Currency {
    #[default]
    #[serde(rename = "R$")]
    Brl,
    #[serde(rename = "USD")]
    Usd,
}

impl Currency {
    pub fn symbol(&self) -> &'static str {
        match self {
            Currency::Brl => "R$",
            Currency::Usd => "US$",
        }
    }
}

impl FromStr for Currency {
    type Err = CurrencyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "brl" | "r$" => Ok(Currency::Brl),
            "usd" | "us$" => Ok(Currency::Usd),
            _ => Err(CurrencyParseError(s.to_string())),
        }
    }
}

impl Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Currency::Brl => write!(f, "R$"),
            Currency::Usd => write!(f, "USD"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PriceOption {
    pub preco: u64,
    pub preco_total: u64,
    pub noites: String,
    pub moeda: Currency,
}

impl Display for PriceOption {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} parcelado / {} {} à vista ({})",
            self.moeda.symbol(),
            self.preco,
            self.moeda.symbol(),
            self.preco_total,
            self.noites
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Package {
    pub id: u32,
    pub nome: String,
    pub saida: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub descricao_completa: Option<String>,
    pub opcoes: Vec<PriceOption>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lamina_url: Option<String>,
}

impl Package {
    pub fn is_priced(&self) -> bool {
        !self.opcoes.is_empty()
    }
}

impl Display for Package {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {} | saída: {}", self.id, self.nome, self.saida)?;
        match self.opcoes.first() {
            Some(option) => write!(f, " | {}", option),
            None => write!(f, " | sem preço"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetailLink {
    HtmlPage(Url),
    ImageAsset(Url),
    PdfAsset(Url),
    Missing,
}

const IMAGE_EXTENSIONS: [&str; 6] = ["png", "jpg", "jpeg", "webp", "gif", "bmp"];

impl DetailLink {
    pub fn classify(url: Url) -> Self {
        let extension = url
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .and_then(|last| last.rsplit_once('.'))
            .map(|(_, ext)| ext.to_ascii_lowercase());

        match extension.as_deref() {
            Some("pdf") => DetailLink::PdfAsset(url),
            Some(ext) if IMAGE_EXTENSIONS.contains(&ext) => DetailLink::ImageAsset(url),
            _ => DetailLink::HtmlPage(url),
        }
    }

    pub fn url(&self) -> Option<&Url> {
        match self {
            DetailLink::HtmlPage(url) | DetailLink::ImageAsset(url) | DetailLink::PdfAsset(url) => {
                Some(url)
            }
            DetailLink::Missing => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, DetailLink::Missing)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Prices {
    pub installment: Option<u64>,
    pub cash: Option<u64>,
    pub currency: Option<Currency>,
    pub duration: Option<String>,
}

impl Prices {
    pub fn is_empty(&self) -> bool {
        self.installment.is_none() && self.cash.is_none()
    }

    pub fn to_option(&self, duration_placeholder: &str) -> Option<PriceOption> {
        let (preco, preco_total) = (self.installment?, self.cash?);
        Some(PriceOption {
            preco,
            preco_total,
            noites: self
                .duration
                .clone()
                .unwrap_or_else(|| duration_placeholder.to_string()),
            moeda: self.currency.unwrap_or_default(),
        })
    }
}

impl Display for Prices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let symbol = self.currency.unwrap_or_default().symbol();
        let show = |value: Option<u64>| match value {
            Some(v) => format!("{} {}", symbol, v),
            None => "-".to_string(),
        };
        writeln!(f, "Parcela:  {}", show(self.installment))?;
        writeln!(f, "À vista:  {}", show(self.cash))?;
        writeln!(
            f,
            "Moeda:    {}",
            self.currency.map(|c| c.to_string()).unwrap_or("-".into())
        )?;
        write!(f, "Duração:  {}", self.duration.as_deref().unwrap_or("-"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_classify_detail_link() {
        assert!(matches!(
            DetailLink::classify(url("https://x.com/laminas/paris.JPG")),
            DetailLink::ImageAsset(_)
        ));
        assert!(matches!(
            DetailLink::classify(url("https://x.com/laminas/paris.pdf?v=2")),
            DetailLink::PdfAsset(_)
        ));
        assert!(matches!(
            DetailLink::classify(url("https://x.com/pacotes/paris/")),
            DetailLink::HtmlPage(_)
        ));
        assert!(matches!(
            DetailLink::classify(url("https://x.com/pacote.php?id=3")),
            DetailLink::HtmlPage(_)
        ));
    }

    #[test]
    fn test_prices_to_option_requires_both_figures() {
        let prices = Prices {
            installment: Some(150),
            cash: None,
            currency: Some(Currency::Brl),
            duration: None,
        };
        assert_eq!(prices.to_option("Consulte"), None);

        let prices = Prices {
            cash: Some(1400),
            ..prices
        };
        let option = prices.to_option("Consulte").unwrap();
        assert_eq!(option.preco, 150);
        assert_eq!(option.preco_total, 1400);
        assert_eq!(option.noites, "Consulte");
        assert_eq!(option.moeda, Currency::Brl);
    }

    #[test]
    fn test_currency_serializes_as_tag() {
        assert_eq!(serde_json::to_string(&Currency::Brl).unwrap(), "\"R$\"");
        assert_eq!(serde_json::to_string(&Currency::Usd).unwrap(), "\"USD\"");
        assert_eq!("US$".parse::<Currency>().unwrap(), Currency::Usd);
        assert!("eur".parse::<Currency>().is_err());
    }

    #[test]
    fn test_package_skips_absent_fields() {
        let package = Package {
            id: 1,
            nome: "Gramado".into(),
            saida: "Consulte".into(),
            desc: None,
            descricao_completa: None,
            opcoes: Vec::new(),
            lamina_url: None,
        };
        let json = serde_json::to_value(&package).unwrap();
        assert!(json.get("desc").is_none());
        assert!(json.get("lamina_url").is_none());
        assert_eq!(json["opcoes"], serde_json::json!([]));
    }
}
