use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;

/// Which kind of entity a row describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Level {
    State,
    District,
    School,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::State => "State",
            Level::District => "District",
            Level::School => "School",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Level {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "state" => Ok(Level::State),
            "district" => Ok(Level::District),
            "school" | "campus" | "building" => Ok(Level::School),
            other => Err(format!("unknown level {other:?}")),
        }
    }
}

/// Grade levels reported in the enrollment workbooks.
///
/// The declaration order is the output order of tidy data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Grade {
    PreK,
    Kindergarten,
    G01,
    G02,
    G03,
    G04,
    G05,
    G06,
    G07,
    G08,
    G09,
    G10,
    G11,
    G12,
    Total,
}

impl Grade {
    pub const ALL: [Grade; 15] = [
        Grade::PreK,
        Grade::Kindergarten,
        Grade::G01,
        Grade::G02,
        Grade::G03,
        Grade::G04,
        Grade::G05,
        Grade::G06,
        Grade::G07,
        Grade::G08,
        Grade::G09,
        Grade::G10,
        Grade::G11,
        Grade::G12,
        Grade::Total,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            Grade::PreK => "PK",
            Grade::Kindergarten => "K",
            Grade::G01 => "01",
            Grade::G02 => "02",
            Grade::G03 => "03",
            Grade::G04 => "04",
            Grade::G05 => "05",
            Grade::G06 => "06",
            Grade::G07 => "07",
            Grade::G08 => "08",
            Grade::G09 => "09",
            Grade::G10 => "10",
            Grade::G11 => "11",
            Grade::G12 => "12",
            Grade::Total => "TOTAL",
        }
    }

    fn from_number(n: u8) -> Option<Grade> {
        match n {
            1..=12 => Some(Grade::ALL[usize::from(n) + 1]),
            _ => None,
        }
    }

    fn from_name(name: &str) -> Option<Grade> {
        match name {
            "pk" | "prek" | "preschool" | "prekindergarten" => Some(Grade::PreK),
            "k" | "kg" | "kindergarten" | "kinder" => Some(Grade::Kindergarten),
            "total" | "totalenrollment" | "grandtotal" | "totalk12" | "enrollment" => {
                Some(Grade::Total)
            }
            _ => None,
        }
    }

    /// Interprets a workbook column header as a grade.
    ///
    /// Accepts forms like `"Pre-K"`, `"Kindergarten"`, `"1st Grade"`,
    /// `"Grade 01"`, `"Grade K"`, `"12"` and `"Total Enrollment"`.
    pub fn from_header(header: &str) -> Option<Grade> {
        let h: String = header
            .trim()
            .to_ascii_lowercase()
            .chars()
            .filter(|c| !matches!(c, '-' | ' ' | '_' | '.'))
            .collect();

        if let Some(grade) = Grade::from_name(&h) {
            return Some(grade);
        }

        let stripped = h
            .strip_prefix("grade")
            .or_else(|| h.strip_prefix("gr"))
            .or_else(|| h.strip_suffix("grade"))
            .unwrap_or(&h);
        if let Some(grade) = Grade::from_name(stripped).filter(|g| *g != Grade::Total) {
            return Some(grade);
        }
        let digits = stripped
            .trim_end_matches("st")
            .trim_end_matches("nd")
            .trim_end_matches("rd")
            .trim_end_matches("th");
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        digits.parse::<u8>().ok().and_then(Grade::from_number)
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl Serialize for Grade {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.code())
    }
}

/// Idaho charter LEAs are numbered from 451 upward.
pub const FIRST_CHARTER_DISTRICT: u32 = 451;

pub fn is_charter_district(district_id: Option<&str>) -> bool {
    district_id
        .and_then(|id| id.parse::<u32>().ok())
        .is_some_and(|n| n >= FIRST_CHARTER_DISTRICT)
}

/// One entity per row, one count per grade.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WideRecord {
    pub end_year: u16,
    #[serde(rename = "type")]
    pub level: Level,
    pub district_id: Option<String>,
    pub district_name: Option<String>,
    pub school_id: Option<String>,
    pub school_name: Option<String>,
    pub counts: BTreeMap<Grade, u64>,
}

impl WideRecord {
    pub fn new(end_year: u16, level: Level) -> Self {
        Self {
            end_year,
            level,
            district_id: None,
            district_name: None,
            school_id: None,
            school_name: None,
            counts: BTreeMap::new(),
        }
    }

    /// The reported total, or the sum of the grade counts when no total
    /// column was present.
    pub fn total(&self) -> u64 {
        self.counts.get(&Grade::Total).copied().unwrap_or_else(|| {
            self.counts
                .iter()
                .filter(|(g, _)| **g != Grade::Total)
                .map(|(_, n)| n)
                .sum()
        })
    }

    /// Adds every count in `other` to this record.
    ///
    /// The `Total` entry always receives `other.total()`, so the sum stays
    /// correct when some rows only report grade columns.
    pub fn accumulate(&mut self, other: &WideRecord) {
        for (grade, n) in other.counts.iter().filter(|(g, _)| **g != Grade::Total) {
            *self.counts.entry(*grade).or_insert(0) += n;
        }
        *self.counts.entry(Grade::Total).or_insert(0) += other.total();
    }
}

/// One entity and grade per row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrollmentRecord {
    pub end_year: u16,
    #[serde(rename = "type")]
    pub level: Level,
    pub district_id: Option<String>,
    pub district_name: Option<String>,
    pub school_id: Option<String>,
    pub school_name: Option<String>,
    pub subgroup: &'static str,
    pub grade_level: Grade,
    pub n_students: u64,
    pub pct: f64,
    pub is_state: bool,
    pub is_district: bool,
    pub is_school: bool,
    pub is_charter: bool,
}

/// Fetched enrollment in either layout.
#[derive(Debug, Clone, PartialEq)]
pub enum Enrollment {
    Tidy(Vec<EnrollmentRecord>),
    Wide(Vec<WideRecord>),
}

impl Enrollment {
    pub fn len(&self) -> usize {
        match self {
            Enrollment::Tidy(rows) => rows.len(),
            Enrollment::Wide(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
