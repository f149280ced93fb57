use std::ops::RangeInclusive;

use crate::Error;
use crate::Result;

/// First end year with an "Enrollment by Building" workbook.
pub const MIN_YEAR: u16 = 2011;
/// Most recent published end year.
pub const MAX_YEAR: u16 = 2025;

/// The inclusive range of end years that can be fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct AvailableYears {
    pub min_year: u16,
    pub max_year: u16,
}

impl Default for AvailableYears {
    fn default() -> Self {
        Self {
            min_year: MIN_YEAR,
            max_year: MAX_YEAR,
        }
    }
}

impl AvailableYears {
    pub fn new(min_year: u16, max_year: u16) -> Result<Self> {
        if min_year > max_year {
            return Err(Error::Config(format!(
                "year range {min_year}-{max_year} is empty"
            )));
        }
        Ok(Self { min_year, max_year })
    }

    pub fn contains(&self, year: u16) -> bool {
        self.range().contains(&year)
    }

    pub fn range(&self) -> RangeInclusive<u16> {
        self.min_year..=self.max_year
    }

    /// Years in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = u16> {
        self.range()
    }

    pub fn to_vec(&self) -> Vec<u16> {
        self.iter().collect()
    }

    /// Checks that `year` can be fetched.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidYear`] if `year` lies outside the range.
    pub fn validate(&self, year: u16) -> Result<u16> {
        if self.contains(year) {
            Ok(year)
        } else {
            Err(Error::InvalidYear {
                year,
                min: self.min_year,
                max: self.max_year,
            })
        }
    }
}

/// The default catalog of published years.
pub fn available_years() -> AvailableYears {
    AvailableYears::default()
}

/// Renders an end year as its school year label, `2024` -> `"2023-24"`.
pub fn school_year_label(end_year: u16) -> String {
    format!("{}-{:02}", end_year.saturating_sub(1), end_year % 100)
}
