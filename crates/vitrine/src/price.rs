use std::sync::LazyLock;

use regex::Regex;

use crate::types::{Currency, Prices};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NumberLocale {
    #[default]
    PtBr,
    EnUs,
}

impl NumberLocale {
    fn decimal_separator(&self) -> char {
        match self {
            NumberLocale::PtBr => ',',
            NumberLocale::EnUs => '.',
        }
    }
}

static RE_CASH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)(?:[àa]\s*vista|total)\D*?(?:R\$|US\$)\s*(\d[\d.,]*)")
        .expect("invalid regex: cash price")
});

static RE_INSTALLMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\d+\s*x\s*(?:de\s+)?(?:R\$|US\$)\s*(\d[\d.,]*)")
        .expect("invalid regex: installment price")
});

static RE_NUMERIC_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d[\d.,]*").expect("invalid regex: numeric run"));

static RE_DURATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+)\s*(noites|dias)").expect("invalid regex: duration")
});

/// Whole currency units of a formatted price, cents discarded.
///
/// Everything but digits and the locale's decimal separator is dropped, so
/// thousands separators vanish. Returns `None` when no digits precede the
/// decimal separator.
pub fn clean_number(text: Option<&str>, locale: NumberLocale) -> Option<u64> {
    let separator = locale.decimal_separator();
    let kept: String = text?
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == separator)
        .collect();

    let integer = kept.split(separator).next().unwrap_or("");
    if integer.is_empty() {
        return None;
    }
    integer.parse().ok()
}

pub fn detect_currency(text: &str) -> Currency {
    let upper = text.to_uppercase();
    if upper.contains("US$") || upper.contains("DÓLAR") || upper.contains("DOLAR") {
        Currency::Usd
    } else {
        Currency::Brl
    }
}

pub fn extract_duration(text: &str) -> Option<String> {
    RE_DURATION.find(text).map(|m| m.as_str().to_string())
}

/// Recovers installment and cash prices from OCR output of a lâmina.
///
/// Labelled patterns ("10x R$ 150,00", "à vista R$ 1.400,00") win. When
/// neither is present the first two numeric runs of three or more digits
/// are taken as installment and cash, in that order.
pub fn parse_ocr_prices(text: &str, locale: NumberLocale) -> Prices {
    let cash = RE_CASH
        .captures(text)
        .and_then(|caps| clean_number(caps.get(1).map(|m| m.as_str()), locale));
    let installment = RE_INSTALLMENT
        .captures(text)
        .and_then(|caps| clean_number(caps.get(1).map(|m| m.as_str()), locale));

    let (installment, cash) = if installment.is_none() && cash.is_none() {
        log::debug!("No labelled prices in OCR text, falling back to numeric runs");
        let mut runs = RE_NUMERIC_RUN
            .find_iter(text)
            .map(|m| m.as_str())
            .filter(|run| run.chars().filter(char::is_ascii_digit).count() >= 3)
            .filter_map(|run| clean_number(Some(run), locale));
        (runs.next(), runs.next())
    } else {
        (installment, cash)
    };

    Prices {
        installment,
        cash,
        currency: Some(detect_currency(text)),
        duration: extract_duration(text),
    }
}
