use schemars::JsonSchema;
use serde::Deserialize;

use crate::catalog::{PackageKind, classify_package};
use crate::types::{Currency, Package};

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct PackageFilter {
    pub kind: Option<PackageKind>,
    pub currency: Option<Currency>,
    #[serde(default)]
    pub priced_only: bool,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl PackageFilter {
    pub fn apply(self, mut packages: Vec<Package>) -> Vec<Package> {
        if let Some(kind) = self.kind {
            packages.retain(|p| classify_package(&p.nome) == kind);
        }
        if let Some(currency) = self.currency {
            packages.retain(|p| p.opcoes.iter().any(|o| o.moeda == currency));
        }
        if self.priced_only {
            packages.retain(Package::is_priced);
        }
        if let Some(off) = self.offset {
            packages = packages.into_iter().skip(off).collect();
        }
        if let Some(lim) = self.limit {
            packages.truncate(lim);
        }
        packages
    }

    pub fn validate(self) -> Result<Self, String> {
        if self.kind == Some(PackageKind::Consultoria) {
            return Err("Scraped packages are never of kind 'consultoria'".to_string());
        }
        if self.offset.is_some_and(|o| o == 0) {
            return Err("Offset must be greater than 0".to_string());
        }
        if self.limit.is_some_and(|l| l == 0) {
            return Err("Limit must be greater than 0".to_string());
        }
        Ok(self)
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct PackageStats {
    pub national: usize,
    pub international: usize,
    pub priced: usize,
    pub total: usize,
}

impl PackageStats {
    pub fn from_packages(packages: &[Package]) -> PackageStats {
        let international = packages
            .iter()
            .filter(|p| classify_package(&p.nome) == PackageKind::Internacional)
            .count();
        PackageStats {
            national: packages.len() - international,
            international,
            priced: packages.iter().filter(|p| p.is_priced()).count(),
            total: packages.len(),
        }
    }
}

impl std::fmt::Display for PackageStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "\nStatistics:")?;
        writeln!(f, "  Nacionais:       {}", self.national)?;
        writeln!(f, "  Internacionais:  {}", self.international)?;
        writeln!(f, "  Com preço:       {}", self.priced)?;
        writeln!(f, "  Total:           {}", self.total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PriceOption;

    fn package(id: u32, nome: &str, moeda: Option<Currency>) -> Package {
        Package {
            id,
            nome: nome.to_string(),
            saida: "Consulte".to_string(),
            desc: None,
            descricao_completa: None,
            opcoes: moeda
                .map(|moeda| PriceOption {
                    preco: 100,
                    preco_total: 1000,
                    noites: "Consulte".to_string(),
                    moeda,
                })
                .into_iter()
                .collect(),
            lamina_url: None,
        }
    }

    fn sample() -> Vec<Package> {
        vec![
            package(1, "Gramado", Some(Currency::Brl)),
            package(2, "Orlando Parques", Some(Currency::Usd)),
            package(3, "Egito Clássico", None),
            package(4, "Salvador", None),
        ]
    }

    #[test]
    fn test_filter_by_kind_and_price() {
        let filter = PackageFilter {
            kind: Some(PackageKind::Internacional),
            priced_only: true,
            ..Default::default()
        };
        let ids: Vec<u32> = filter.apply(sample()).iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![2]);
    }

    #[test]
    fn test_filter_by_currency() {
        let filter = PackageFilter {
            currency: Some(Currency::Brl),
            ..Default::default()
        };
        let ids: Vec<u32> = filter.apply(sample()).iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![1]);
    }

    #[test]
    fn test_filter_offset_and_limit() {
        let filter = PackageFilter {
            offset: Some(1),
            limit: Some(2),
            ..Default::default()
        };
        let ids: Vec<u32> = filter.apply(sample()).iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![2, 3]);
    }

    #[test]
    fn test_filter_validate() {
        assert!(PackageFilter::default().validate().is_ok());
        assert!(
            PackageFilter {
                limit: Some(0),
                ..Default::default()
            }
            .validate()
            .is_err()
        );
        assert!(
            PackageFilter {
                kind: Some(PackageKind::Consultoria),
                ..Default::default()
            }
            .validate()
            .is_err()
        );
    }

    #[test]
    fn test_stats() {
        let stats = PackageStats::from_packages(&sample());
        assert_eq!(
            stats,
            PackageStats {
                national: 2,
                international: 2,
                priced: 2,
                total: 4,
            }
        );
    }
}
