//! Reading "Enrollment by Building" workbooks into [`WideRecord`]s.
//!
//! The published files carry a few title rows above the real header and
//! occasionally trailing notes or total rows, so the header row is searched
//! for rather than assumed.

use std::io::Cursor;

use calamine::Data;
use calamine::Reader;
use calamine::Xlsx;

use crate::Error;
use crate::Grade;
use crate::Level;
use crate::Result;
use crate::WideRecord;

/// How many leading rows may precede the header.
const HEADER_SEARCH_ROWS: usize = 25;

/// A spreadsheet cell, reduced to what enrollment parsing needs.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
}

impl Cell {
    fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            Cell::Number(_) => false,
        }
    }

    fn text(&self) -> Option<String> {
        match self {
            Cell::Empty => None,
            Cell::Text(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
            Cell::Number(n) if n.fract() == 0.0 => Some(format!("{n:.0}")),
            Cell::Number(n) => Some(n.to_string()),
        }
    }

    /// A student count, or `None` for blank and suppressed cells.
    fn count(&self) -> Option<u64> {
        match self {
            Cell::Empty => None,
            Cell::Number(n) if *n >= 0.0 && n.is_finite() => Some(n.round() as u64),
            Cell::Number(_) => None,
            Cell::Text(s) => {
                let cleaned: String = s.trim().chars().filter(|c| *c != ',').collect();
                match cleaned.to_ascii_lowercase().as_str() {
                    "" | "*" | "-" | "n/a" | "na" | "." => None,
                    other => match other.parse::<f64>() {
                        Ok(n) if n >= 0.0 && n.is_finite() => Some(n.round() as u64),
                        _ => {
                            log::debug!("ignoring non-numeric count {s:?}");
                            None
                        }
                    },
                }
            }
        }
    }
}

impl From<&Data> for Cell {
    fn from(data: &Data) -> Self {
        match data {
            Data::Empty => Cell::Empty,
            Data::String(s) if s.trim().is_empty() => Cell::Empty,
            Data::String(s) => Cell::Text(s.clone()),
            Data::Float(f) => Cell::Number(*f),
            Data::Int(i) => Cell::Number(*i as f64),
            other => Cell::Text(other.to_string()),
        }
    }
}

/// Reads the first worksheet of an `.xlsx` workbook.
///
/// # Errors
///
/// Returns [`Error::Workbook`] if the bytes are not a workbook or it has no
/// worksheets.
pub fn read_workbook(bytes: Vec<u8>) -> Result<Vec<Vec<Cell>>> {
    let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| Error::Workbook("workbook has no worksheets".to_string()))??;
    Ok(range
        .rows()
        .map(|row| row.iter().map(Cell::from).collect())
        .collect())
}

#[derive(Debug, Default)]
struct Columns {
    district_id: Option<usize>,
    district_name: Option<usize>,
    school_id: Option<usize>,
    school_name: Option<usize>,
    grades: Vec<(usize, Grade)>,
}

fn is_id_word(h: &str) -> bool {
    ["number", "num", " id", "#", " no", "code"]
        .iter()
        .any(|w| h.contains(w))
        || h.ends_with("id")
}

impl Columns {
    fn detect(row: &[Cell]) -> Option<Columns> {
        let mut columns = Columns::default();
        for (idx, cell) in row.iter().enumerate() {
            let Some(header) = cell.text() else { continue };
            let h = header.to_ascii_lowercase();
            let district = h.contains("district") || h.starts_with("lea");
            let school = h.contains("school") || h.contains("building");

            if school && h.contains("name") {
                columns.school_name.get_or_insert(idx);
            } else if school && is_id_word(&h) {
                columns.school_id.get_or_insert(idx);
            } else if district && h.contains("name") {
                columns.district_name.get_or_insert(idx);
            } else if district && is_id_word(&h) {
                columns.district_id.get_or_insert(idx);
            } else if let Some(grade) = Grade::from_header(&header) {
                if !columns.grades.iter().any(|(_, g)| *g == grade) {
                    columns.grades.push((idx, grade));
                }
            }
        }
        (columns.district_id.is_some() && !columns.grades.is_empty()).then_some(columns)
    }
}

fn pad_id(raw: String, width: usize) -> String {
    if raw.chars().all(|c| c.is_ascii_digit()) {
        format!("{raw:0>width$}")
    } else {
        raw
    }
}

/// True for labels such as "Total", "State Total" or "Boise District Totals".
fn is_total_label(value: Option<&str>) -> bool {
    value.is_some_and(|v| {
        v.split(|c: char| !c.is_ascii_alphanumeric())
            .any(|word| word.eq_ignore_ascii_case("total") || word.eq_ignore_ascii_case("totals"))
    })
}

fn cell_at(row: &[Cell], idx: Option<usize>) -> Option<&Cell> {
    idx.and_then(|i| row.get(i))
}

/// Converts worksheet rows into one [`WideRecord`] per district or school.
///
/// Rows labelled as totals are skipped; aggregates are rebuilt by
/// [`crate::tidy::aggregate`].
///
/// # Errors
///
/// Returns [`Error::Parse`] if no header row is found.
pub fn parse_rows(end_year: u16, rows: &[Vec<Cell>]) -> Result<Vec<WideRecord>> {
    let (header_idx, columns) = rows
        .iter()
        .take(HEADER_SEARCH_ROWS)
        .enumerate()
        .find_map(|(i, row)| Columns::detect(row).map(|c| (i, c)))
        .ok_or_else(|| Error::Parse {
            year: end_year,
            reason: format!(
                "no header row with a district number and grade columns in the first {HEADER_SEARCH_ROWS} rows"
            ),
        })?;

    let mut records = Vec::new();
    for row in &rows[header_idx + 1..] {
        if row.iter().all(Cell::is_empty) {
            continue;
        }
        let district_id = cell_at(row, columns.district_id).and_then(Cell::text);
        let district_name = cell_at(row, columns.district_name).and_then(Cell::text);
        let school_id = cell_at(row, columns.school_id).and_then(Cell::text);
        let school_name = cell_at(row, columns.school_name).and_then(Cell::text);

        if district_id.is_none()
            || is_total_label(district_id.as_deref())
            || is_total_label(district_name.as_deref())
            || is_total_label(school_name.as_deref())
        {
            continue;
        }

        let level = if school_id.is_some() {
            Level::School
        } else {
            Level::District
        };
        let mut record = WideRecord::new(end_year, level);
        record.district_id = district_id.map(|id| pad_id(id, 3));
        record.district_name = district_name;
        record.school_id = school_id.map(|id| pad_id(id, 4));
        record.school_name = school_name;
        for (idx, grade) in &columns.grades {
            if let Some(n) = row.get(*idx).and_then(Cell::count) {
                record.counts.insert(*grade, n);
            }
        }
        // Footnotes land in the id column and carry no counts.
        if record.counts.is_empty() {
            continue;
        }
        records.push(record);
    }

    log::debug!(
        "parsed {} rows for {end_year} (header at row {header_idx})",
        records.len()
    );
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Cell {
        Cell::Text(s.to_string())
    }

    fn num(n: f64) -> Cell {
        Cell::Number(n)
    }

    fn sheet() -> Vec<Vec<Cell>> {
        vec![
            vec![text("Idaho State Department of Education")],
            vec![text("Enrollment by Building, 2023-2024")],
            vec![],
            vec![
                text("District Number"),
                text("District Name"),
                text("School Number"),
                text("School Name"),
                text("Pre-K"),
                text("Kindergarten"),
                text("1st Grade"),
                text("2nd Grade"),
                text("Total"),
            ],
            vec![
                num(1.0),
                text("Boise Independent District"),
                num(12.0),
                text("Adams Elementary"),
                text("*"),
                num(40.0),
                num(42.0),
                text("1,001"),
                num(1083.0),
            ],
            vec![
                num(1.0),
                text("Boise Independent District"),
                num(13.0),
                text("Cole Valley"),
                Cell::Empty,
                num(20.0),
                num(21.0),
                num(19.0),
                num(60.0),
            ],
            vec![Cell::Empty, Cell::Empty],
            vec![
                num(451.0),
                text("Victory Charter School"),
                text("0501"),
                text("Victory Charter School"),
                num(0.0),
                num(10.0),
                text("N/A"),
                num(11.0),
                num(21.0),
            ],
            vec![
                text("Total"),
                Cell::Empty,
                Cell::Empty,
                Cell::Empty,
                num(0.0),
                num(70.0),
                num(63.0),
                num(1031.0),
                num(1164.0),
            ],
            vec![text("Note: counts as of the first Friday in November")],
        ]
    }

    #[test]
    fn finds_header_below_titles() {
        let records = parse_rows(2024, &sheet()).unwrap();
        assert_eq!(records.len(), 3);
        assert!(records.iter().all(|r| r.level == Level::School));
        assert!(records.iter().all(|r| r.end_year == 2024));
    }

    #[test]
    fn ids_are_padded() {
        let records = parse_rows(2024, &sheet()).unwrap();
        assert_eq!(records[0].district_id.as_deref(), Some("001"));
        assert_eq!(records[0].school_id.as_deref(), Some("0012"));
        assert_eq!(records[2].district_id.as_deref(), Some("451"));
        assert_eq!(records[2].school_id.as_deref(), Some("0501"));
    }

    #[test]
    fn suppressed_and_formatted_counts() {
        let records = parse_rows(2024, &sheet()).unwrap();
        let adams = &records[0];
        assert_eq!(adams.counts.get(&Grade::PreK), None);
        assert_eq!(adams.counts.get(&Grade::G02), Some(&1001));
        assert_eq!(adams.counts.get(&Grade::Total), Some(&1083));

        let victory = &records[2];
        assert_eq!(victory.counts.get(&Grade::PreK), Some(&0));
        assert_eq!(victory.counts.get(&Grade::G01), None);
    }

    #[test]
    fn notes_and_totals_are_skipped() {
        let records = parse_rows(2024, &sheet()).unwrap();
        assert!(
            records
                .iter()
                .all(|r| r.district_id.as_deref() != Some("Total"))
        );
    }

    #[test]
    fn trailing_total_labels_are_skipped() {
        let rows = vec![
            vec![text("District Number"), text("District Name"), text("K"), text("Total")],
            vec![num(1.0), text("Boise Independent District"), num(10.0), num(10.0)],
            vec![num(1.0), text("Boise Independent District Total"), num(10.0), num(10.0)],
            vec![num(999.0), text("State Total"), num(10.0), num(10.0)],
            vec![num(2.0), text("West Ada TOTALS"), num(5.0), num(5.0)],
            vec![num(3.0), text("Totally Real Academy"), num(7.0), num(7.0)],
        ];
        let records = parse_rows(2024, &rows).unwrap();
        let names: Vec<_> = records
            .iter()
            .map(|r| r.district_name.as_deref().unwrap_or_default())
            .collect();
        assert_eq!(names, vec!["Boise Independent District", "Totally Real Academy"]);
    }

    #[test]
    fn district_only_sheet() {
        let rows = vec![
            vec![text("LEA Number"), text("LEA Name"), text("K"), text("12")],
            vec![num(2.0), text("West Ada"), num(2500.0), num(2900.0)],
        ];
        let records = parse_rows(2020, &rows).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].level, Level::District);
        assert_eq!(records[0].district_id.as_deref(), Some("002"));
        assert_eq!(records[0].district_name.as_deref(), Some("West Ada"));
        assert_eq!(records[0].total(), 5400);
    }

    #[test]
    fn missing_header_is_an_error() {
        let rows = vec![vec![text("nothing"), text("to see")]];
        match parse_rows(2024, &rows) {
            Err(Error::Parse { year, .. }) => assert_eq!(year, 2024),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn garbage_bytes_are_not_a_workbook() {
        assert!(matches!(
            read_workbook(b"not a zip archive".to_vec()),
            Err(Error::Workbook(_))
        ));
    }
}
