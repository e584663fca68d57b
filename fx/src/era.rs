//! Currency eras: which codes a complete quote must carry on a given date.
//!
//! The service has added currencies over time, so an "all rates" quote from
//! an early date legitimately lacks codes that later quotes include. Eras are
//! kept as ordered data; a new era is appended, never coded as a branch.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use fxquote_common::{constants, known_currencies, Currency};

use crate::error::{FxError, FxResult};

/// A date range, open-ended until the next era, over which the quoted set is fixed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrencyEra {
    /// First date the era applies to.
    pub starts_on: NaiveDate,
    /// Known codes the service did not quote yet.
    pub excluded: Vec<Currency>,
}

impl CurrencyEra {
    pub fn new(starts_on: NaiveDate, excluded: &[&str]) -> Self {
        Self {
            starts_on,
            excluded: excluded.iter().map(Currency::new).collect(),
        }
    }
}

/// Chronologically ordered era rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EraTable {
    eras: Vec<CurrencyEra>,
}

impl EraTable {
    /// The service's published history: ILS joined on 2011-01-03, ISK on 2018-02-01.
    pub fn standard() -> Self {
        let mut eras = vec![CurrencyEra::new(constants::min_date(), &["ISK", "ILS"])];
        if let Some(ils) = NaiveDate::from_ymd_opt(2011, 1, 3) {
            eras.push(CurrencyEra::new(ils, &["ISK"]));
        }
        if let Some(isk) = NaiveDate::from_ymd_opt(2018, 2, 1) {
            eras.push(CurrencyEra::new(isk, &[]));
        }
        Self { eras }
    }

    /// Build a table from rules that must be in strictly ascending order.
    pub fn new(eras: Vec<CurrencyEra>) -> FxResult<Self> {
        let mut table = Self { eras: Vec::with_capacity(eras.len()) };
        for era in eras {
            table.push(era)?;
        }
        Ok(table)
    }

    /// Append an era starting after every existing one.
    pub fn push(&mut self, era: CurrencyEra) -> FxResult<()> {
        if let Some(last) = self.eras.last() {
            if era.starts_on <= last.starts_on {
                return Err(FxError::Configuration(format!(
                    "era starting {} must follow the era starting {}",
                    era.starts_on, last.starts_on
                )));
            }
        }
        self.eras.push(era);
        Ok(())
    }

    /// The era in force on `date`. Dates before the first era use the first.
    pub fn era_for(&self, date: NaiveDate) -> Option<&CurrencyEra> {
        let idx = self.eras.partition_point(|era| era.starts_on <= date);
        self.eras.get(idx.saturating_sub(1))
    }

    /// Codes a complete "all rates" quote for `base` must contain on `date`.
    pub fn complete_set(&self, date: NaiveDate, base: &Currency) -> BTreeSet<Currency> {
        let excluded: &[Currency] = self
            .era_for(date)
            .map(|era| era.excluded.as_slice())
            .unwrap_or(&[]);

        known_currencies()
            .filter(|code| code != base && !excluded.contains(code))
            .collect()
    }

    pub fn eras(&self) -> &[CurrencyEra] {
        &self.eras
    }
}

impl Default for EraTable {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_standard_eras() {
        let table = EraTable::standard();
        let usd = Currency::usd();

        let early = table.complete_set(day(2010, 12, 31), &usd);
        assert!(!early.contains(&Currency::new("ISK")));
        assert!(!early.contains(&Currency::new("ILS")));
        assert!(!early.contains(&usd));
        assert_eq!(early.len(), 30);

        let middle = table.complete_set(day(2011, 1, 3), &usd);
        assert!(middle.contains(&Currency::new("ILS")));
        assert!(!middle.contains(&Currency::new("ISK")));

        let late = table.complete_set(day(2018, 2, 1), &usd);
        assert!(late.contains(&Currency::new("ISK")));
        assert_eq!(late.len(), 32);
    }

    #[test]
    fn test_before_first_era_uses_first() {
        let table = EraTable::standard();
        let era = table.era_for(day(1990, 1, 1)).unwrap();
        assert_eq!(era.starts_on, day(1999, 1, 4));
    }

    #[test]
    fn test_push_appends_later_era() {
        let mut table = EraTable::standard();
        table
            .push(CurrencyEra::new(day(2030, 1, 1), &["HRK"]))
            .unwrap();

        let set = table.complete_set(day(2031, 6, 1), &Currency::eur());
        assert!(!set.contains(&Currency::new("HRK")));
        assert!(set.contains(&Currency::new("ISK")));
    }

    #[test]
    fn test_push_rejects_out_of_order() {
        let mut table = EraTable::standard();
        let result = table.push(CurrencyEra::new(day(2015, 1, 1), &[]));
        assert!(matches!(result, Err(FxError::Configuration(_))));
        assert_eq!(table.eras().len(), 3);
    }
}
