use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::config::{LinkPolicy, ScraperConfig};
use crate::price::{NumberLocale, clean_number, extract_duration};
use crate::types::{Currency, DetailLink, Package, PriceOption, Prices};

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Missing required field: {0}")]
    MissingField(String),
    #[error("Unusable link '{href}': {reason}")]
    UnusableLink { href: String, reason: String },
}

const SHORT_DESCRIPTION_LIMIT: usize = 150;

static RE_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{1,2}/\d{1,2}/\d{4}").expect("invalid regex: date"));

static RE_DASH_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+[-–—]\s+").expect("invalid regex: dash suffix"));

static RE_DEPARTURE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:sa[íi]da\s+de|sa[íi]da|bloqueio)\s*:\s*([^\n|]+?)\s*(?:\.\s|\n|\||$)")
        .expect("invalid regex: departure")
});

static RE_LAMINA: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)l[âa]mina\s+(?:de\s+)?divulga[çc][ãa]o").expect("invalid regex: lamina")
});

static TITLE_SELECTORS: LazyLock<[Selector; 2]> = LazyLock::new(|| {
    [
        Selector::parse(".card-title").unwrap(),
        Selector::parse("h1, h2, h3, h4, h5, h6").unwrap(),
    ]
});

static DESCRIPTION_SELECTORS: LazyLock<[Selector; 2]> = LazyLock::new(|| {
    [
        Selector::parse("p.card-text").unwrap(),
        Selector::parse("p").unwrap(),
    ]
});

static ANCHOR_SELECTOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a[href]").unwrap());

fn elem_text(element: ElementRef) -> String {
    element.text().collect::<String>()
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn first_match<'a>(element: ElementRef<'a>, selectors: &[Selector]) -> Option<ElementRef<'a>> {
    selectors
        .iter()
        .find_map(|selector| element.select(selector).next())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingCard {
    pub id: u32,
    pub nome: String,
    pub saida: String,
    pub desc: String,
    pub descricao_completa: Option<String>,
    pub detail: DetailLink,
}

impl ListingCard {
    pub fn into_package(self, opcoes: Vec<PriceOption>) -> Package {
        Package {
            id: self.id,
            nome: self.nome,
            saida: self.saida,
            desc: Some(self.desc),
            descricao_completa: self.descricao_completa,
            opcoes,
            lamina_url: self.detail.url().map(Url::to_string),
        }
    }
}

pub fn clean_package_name(raw: &str) -> String {
    let mut name = normalize_whitespace(raw);

    if let Some(pos) = name.find('|') {
        name.truncate(pos);
    }
    if let Some(m) = RE_DATE.find(&name) {
        name.truncate(m.start());
    }
    if let Some(m) = RE_DASH_SUFFIX.find(&name) {
        name.truncate(m.start());
    }

    name.trim()
        .trim_end_matches(['-', '–', '—', '|', ',', ':'])
        .trim()
        .to_string()
}

pub fn extract_departure(text: Option<&str>, placeholder: &str) -> String {
    text.and_then(|t| RE_DEPARTURE.captures(t))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().trim_end_matches('.').trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| placeholder.to_string())
}

pub fn short_description(full: &str) -> Option<String> {
    let full = normalize_whitespace(full);
    if full.is_empty() {
        return None;
    }

    let sentence = match full.find('.') {
        Some(pos) => &full[..=pos],
        None => full.as_str(),
    };

    if sentence.chars().count() > SHORT_DESCRIPTION_LIMIT {
        let cut: String = sentence.chars().take(SHORT_DESCRIPTION_LIMIT).collect();
        Some(format!("{}...", cut.trim_end()))
    } else {
        Some(sentence.to_string())
    }
}

fn resolve_href(href: &str, base: &Url) -> Result<Url, ParseError> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return Err(ParseError::UnusableLink {
            href: href.to_string(),
            reason: "empty or fragment-only".to_string(),
        });
    }

    let url = base.join(href).map_err(|e| ParseError::UnusableLink {
        href: href.to_string(),
        reason: e.to_string(),
    })?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(ParseError::UnusableLink {
            href: href.to_string(),
            reason: format!("unsupported scheme '{}'", scheme),
        }),
    }
}

pub fn resolve_detail_link(card: ElementRef, policy: LinkPolicy, base: &Url) -> DetailLink {
    let mut anchors = card.select(&ANCHOR_SELECTOR);
    let href = match policy {
        LinkPolicy::LaminaAnchor => anchors
            .find(|a| RE_LAMINA.is_match(&normalize_whitespace(&elem_text(*a))))
            .and_then(|a| a.value().attr("href")),
        LinkPolicy::FirstHref => anchors
            .filter_map(|a| a.value().attr("href"))
            .find(|href| !href.trim().is_empty() && !href.trim().starts_with('#')),
    };

    let Some(href) = href else {
        return DetailLink::Missing;
    };

    match resolve_href(href, base) {
        Ok(url) => DetailLink::classify(url),
        Err(e) => {
            log::debug!("Ignoring lâmina link: {}", e);
            DetailLink::Missing
        }
    }
}

fn parse_card(
    card: ElementRef,
    id: u32,
    config: &ScraperConfig,
    base: &Url,
) -> Result<ListingCard, ParseError> {
    let nome = first_match(card, TITLE_SELECTORS.as_slice())
        .map(|e| clean_package_name(&elem_text(e)))
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ParseError::MissingField(format!("title of card {}", id)))?;

    let raw_description = first_match(card, DESCRIPTION_SELECTORS.as_slice()).map(elem_text);

    let saida = extract_departure(raw_description.as_deref(), &config.departure_placeholder);

    let descricao_completa = raw_description
        .as_deref()
        .map(normalize_whitespace)
        .filter(|s| !s.is_empty());

    let desc = descricao_completa
        .as_deref()
        .and_then(short_description)
        .unwrap_or_else(|| config.description_placeholder.clone());

    let detail = resolve_detail_link(card, config.link_policy, base);

    Ok(ListingCard {
        id,
        nome,
        saida,
        desc,
        descricao_completa,
        detail,
    })
}

/// Every card of the vitrine in document order, ids starting at 1.
///
/// Ids follow the card's position on the page, so a card dropped for a
/// missing title leaves a gap.
pub fn parse_listing(html: &str, config: &ScraperConfig, base: &Url) -> Vec<ListingCard> {
    let document = Html::parse_document(html);
    let Ok(card_selector) = Selector::parse(config.layout.selector()) else {
        log::error!("Invalid card selector: {}", config.layout.selector());
        return Vec::new();
    };

    let mut cards = Vec::new();
    for (index, element) in document.select(&card_selector).enumerate() {
        let id = index as u32 + 1;
        match parse_card(element, id, config, base) {
            Ok(card) => cards.push(card),
            Err(e) => log::debug!("Skipping card {}: {}", id, e),
        }
    }

    cards
}

pub fn parse_detail_page(html: &str) -> Prices {
    let document = Html::parse_document(html);
    let box_sel = Selector::parse("div.pacote-price-box").unwrap();
    let installment_sel = Selector::parse("span.main-price").unwrap();
    let cash_sel = Selector::parse("span.price-total-cash").unwrap();
    let duration_sel = Selector::parse(".card-duracao").unwrap();

    let Some(price_box) = document.select(&box_sel).next() else {
        log::debug!("Lâmina page has no price box");
        return Prices::default();
    };

    let installment_text = price_box.select(&installment_sel).next().map(elem_text);
    let cash_text = price_box.select(&cash_sel).next().map(elem_text);

    let currency = match cash_text.as_deref() {
        Some(text) if text.contains("US$") => Currency::Usd,
        _ => Currency::Brl,
    };

    let duration = document
        .select(&duration_sel)
        .next()
        .and_then(|e| extract_duration(&elem_text(e)));

    Prices {
        installment: clean_number(installment_text.as_deref(), NumberLocale::PtBr),
        cash: clean_number(cash_text.as_deref(), NumberLocale::PtBr),
        currency: Some(currency),
        duration,
    }
}
