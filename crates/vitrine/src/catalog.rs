use std::path::Path;
use std::sync::LazyLock;
use std::{fmt::Display, str::FromStr};

use regex::{NoExpand, Regex};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::ser::{PrettyFormatter, Serializer};

use crate::types::{Package, PriceOption};

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Static data block not found")]
    BlockNotFound,
    #[error("Failed to serialize catalog: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub const STATIC_BLOCK_NAME: &str = "DADOS_ESTATICOS_ATUALIZAVEIS";

const INTERNATIONAL_KEYWORDS: [&str; 15] = [
    "tailândia",
    "egito",
    "turquia",
    "europa",
    "orlando",
    "caribe",
    "cancun",
    "dubai",
    "asia",
    "américas",
    "méxico",
    "chile",
    "peru",
    "argentina",
    "colômbia",
];

const IMG_KEYS: [(&str, &str); 8] = [
    ("lençóis maranhenses", "Lençóis Maranhenses"),
    ("tailândia", "Tailândia"),
    ("gramado", "Gramado"),
    ("porto de galinhas", "Porto de Galinhas"),
    ("maragogi", "Porto de Galinhas"),
    ("salvador", "Salvador"),
    ("egito", "Egito"),
    ("turquia", "Turquia"),
];

pub const DEFAULT_IMG_KEY: &str = "Customizado";

pub const CONSULTANCY_ID: i64 = -1;

static RE_STATIC_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?s)const\s+{}\s*=\s*\[.*?\]\s*;",
        STATIC_BLOCK_NAME
    ))
    .expect("invalid regex: static block")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum PackageKind {
    Nacional,
    Internacional,
    Consultoria,
}

impl FromStr for PackageKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "nacional" => Ok(PackageKind::Nacional),
            "internacional" => Ok(PackageKind::Internacional),
            "consultoria" => Ok(PackageKind::Consultoria),
            _ => Err(format!(
                "Invalid kind '{s}'. Accepted values: 'nacional', 'internacional', 'consultoria'"
            )),
        }
    }
}

impl Display for PackageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PackageKind::Nacional => write!(f, "NACIONAL"),
            PackageKind::Internacional => write!(f, "INTERNACIONAL"),
            PackageKind::Consultoria => write!(f, "CONSULTORIA"),
        }
    }
}

pub fn classify_package(nome: &str) -> PackageKind {
    let lower = nome.to_lowercase();
    if INTERNATIONAL_KEYWORDS.iter().any(|k| lower.contains(k)) {
        PackageKind::Internacional
    } else {
        PackageKind::Nacional
    }
}

pub fn img_key(nome: &str) -> &'static str {
    let lower = nome.to_lowercase();
    IMG_KEYS
        .iter()
        .find(|(keyword, _)| lower.contains(keyword))
        .map(|(_, key)| *key)
        .unwrap_or(DEFAULT_IMG_KEY)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CatalogEntry {
    pub id: i64,
    pub nome: String,
    pub saida: String,
    pub tipo: PackageKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub descricao_completa: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opcoes: Option<Vec<PriceOption>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lamina_url: Option<String>,
    #[serde(rename = "imgKey")]
    pub img_key: String,
}

impl From<Package> for CatalogEntry {
    fn from(package: Package) -> Self {
        Self {
            id: i64::from(package.id),
            tipo: classify_package(&package.nome),
            img_key: img_key(&package.nome).to_string(),
            nome: package.nome,
            saida: package.saida,
            desc: package.desc,
            descricao_completa: package.descricao_completa,
            opcoes: Some(package.opcoes),
            lamina_url: package.lamina_url,
        }
    }
}

impl Display for CatalogEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {} ({}, {})", self.id, self.nome, self.tipo, self.img_key)
    }
}

pub fn consultancy_entry() -> CatalogEntry {
    CatalogEntry {
        id: CONSULTANCY_ID,
        nome: "Consultoria Personalizada / Outro Destino".to_string(),
        saida: "Seu aeroporto de preferência".to_string(),
        tipo: PackageKind::Consultoria,
        desc: Some(
            "✨ Destino Sob Medida: Crie seu roteiro do zero e garanta seu Desconto VIP na primeira compra com nossa consultoria especializada."
                .to_string(),
        ),
        descricao_completa: None,
        opcoes: None,
        lamina_url: None,
        img_key: DEFAULT_IMG_KEY.to_string(),
    }
}

pub fn build_catalog(packages: Vec<Package>, with_consultancy: bool) -> Vec<CatalogEntry> {
    let mut entries: Vec<CatalogEntry> = packages.into_iter().map(CatalogEntry::from).collect();
    if with_consultancy {
        entries.push(consultancy_entry());
    }
    entries
}

pub fn render_static_block(entries: &[CatalogEntry]) -> Result<String, CatalogError> {
    let mut buf = Vec::new();
    let mut serializer =
        Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"        "));
    entries.serialize(&mut serializer)?;
    // serde_json only ever writes UTF-8.
    let json = String::from_utf8_lossy(&buf);
    Ok(format!("const {} = {};", STATIC_BLOCK_NAME, json))
}

pub fn replace_static_block(html: &str, entries: &[CatalogEntry]) -> Result<String, CatalogError> {
    if !RE_STATIC_BLOCK.is_match(html) {
        return Err(CatalogError::BlockNotFound);
    }
    let block = render_static_block(entries)?;
    Ok(RE_STATIC_BLOCK
        .replace(html, NoExpand(&block))
        .into_owned())
}

pub async fn refresh_static_file(
    path: impl AsRef<Path>,
    entries: &[CatalogEntry],
) -> Result<usize, CatalogError> {
    let path = path.as_ref();
    let html = tokio::fs::read_to_string(path).await?;
    let updated = replace_static_block(&html, entries)?;
    tokio::fs::write(path, updated).await?;
    log::debug!(
        "Wrote {} catalog entries to {}",
        entries.len(),
        path.display()
    );
    Ok(entries.len())
}
