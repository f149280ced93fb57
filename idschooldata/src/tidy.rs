//! Aggregation and long-format reshaping.

use std::collections::BTreeMap;

use crate::EnrollmentRecord;
use crate::Grade;
use crate::Level;
use crate::WideRecord;
use crate::models::is_charter_district;

/// The only subgroup published in the building-level files.
pub const SUBGROUP_TOTAL: &str = "total_enrollment";

/// Adds missing district and state rows and orders the result.
///
/// District rows already present are kept as given. A district row is built
/// for every district that only appears through its schools. The state row
/// sums the districts, or the schools when there are no districts at all.
pub fn aggregate(records: Vec<WideRecord>) -> Vec<WideRecord> {
    let Some(end_year) = records.first().map(|r| r.end_year) else {
        return records;
    };

    let mut state: Vec<WideRecord> = Vec::new();
    let mut districts: BTreeMap<Option<String>, WideRecord> = BTreeMap::new();
    let mut schools: Vec<WideRecord> = Vec::new();
    for record in records {
        match record.level {
            Level::State => state.push(record),
            Level::District => {
                districts.insert(record.district_id.clone(), record);
            }
            Level::School => schools.push(record),
        }
    }

    let mut built: BTreeMap<Option<String>, WideRecord> = BTreeMap::new();
    for school in &schools {
        if districts.contains_key(&school.district_id) {
            continue;
        }
        built
            .entry(school.district_id.clone())
            .or_insert_with(|| {
                let mut district = WideRecord::new(end_year, Level::District);
                district.district_id = school.district_id.clone();
                district.district_name = school.district_name.clone();
                district
            })
            .accumulate(school);
    }
    districts.extend(built);

    if state.is_empty() {
        let mut total = WideRecord::new(end_year, Level::State);
        if districts.is_empty() {
            schools.iter().for_each(|s| total.accumulate(s));
        } else {
            districts.values().for_each(|d| total.accumulate(d));
        }
        state.push(total);
    }

    schools.sort_by(|a, b| {
        (&a.district_id, &a.school_id).cmp(&(&b.district_id, &b.school_id))
    });

    state
        .into_iter()
        .chain(districts.into_values())
        .chain(schools)
        .collect()
}

/// Pivots wide records to one row per entity and grade.
pub fn tidy_enr(wide: &[WideRecord]) -> Vec<EnrollmentRecord> {
    let mut out = Vec::with_capacity(wide.len() * Grade::ALL.len());
    for record in wide {
        let total = record.total();
        let is_charter = record.level != Level::State
            && is_charter_district(record.district_id.as_deref());
        for grade in Grade::ALL {
            let n_students = match grade {
                Grade::Total => total,
                _ => match record.counts.get(&grade) {
                    Some(n) => *n,
                    None => continue,
                },
            };
            let pct = if total == 0 {
                0.0
            } else {
                n_students as f64 / total as f64
            };
            out.push(EnrollmentRecord {
                end_year: record.end_year,
                level: record.level,
                district_id: record.district_id.clone(),
                district_name: record.district_name.clone(),
                school_id: record.school_id.clone(),
                school_name: record.school_name.clone(),
                subgroup: SUBGROUP_TOTAL,
                grade_level: grade,
                n_students,
                pct,
                is_state: record.level == Level::State,
                is_district: record.level == Level::District,
                is_school: record.level == Level::School,
                is_charter,
            });
        }
    }
    out
}

/// Keeps only the rows at `level`.
pub fn filter_level(records: Vec<EnrollmentRecord>, level: Level) -> Vec<EnrollmentRecord> {
    records.into_iter().filter(|r| r.level == level).collect()
}

#[cfg(test)]
mod tests {
    use more_asserts::assert_le;

    use super::*;

    fn school(district: &str, id: &str, counts: &[(Grade, u64)]) -> WideRecord {
        let mut record = WideRecord::new(2024, Level::School);
        record.district_id = Some(district.to_string());
        record.district_name = Some(format!("District {district}"));
        record.school_id = Some(id.to_string());
        record.school_name = Some(format!("School {id}"));
        record.counts = counts.iter().copied().collect();
        record
    }

    fn sample() -> Vec<WideRecord> {
        vec![
            school("451", "0501", &[(Grade::Kindergarten, 10), (Grade::G01, 11)]),
            school("001", "0013", &[(Grade::Kindergarten, 20), (Grade::G01, 21), (Grade::Total, 41)]),
            school("001", "0012", &[(Grade::Kindergarten, 40), (Grade::G01, 42)]),
        ]
    }

    #[test]
    fn aggregates_are_sums_of_schools() {
        let wide = aggregate(sample());
        let levels: Vec<_> = wide.iter().map(|r| r.level).collect();
        assert_eq!(
            levels,
            vec![
                Level::State,
                Level::District,
                Level::District,
                Level::School,
                Level::School,
                Level::School
            ]
        );

        let state = &wide[0];
        assert_eq!(state.total(), 21 + 41 + 82);
        assert_eq!(state.counts.get(&Grade::Kindergarten), Some(&70));

        let boise = &wide[1];
        assert_eq!(boise.district_id.as_deref(), Some("001"));
        assert_eq!(boise.district_name.as_deref(), Some("District 001"));
        assert_eq!(boise.total(), 41 + 82);

        assert_eq!(wide[3].school_id.as_deref(), Some("0012"));
        assert_eq!(wide[4].school_id.as_deref(), Some("0013"));
    }

    #[test]
    fn reported_districts_are_kept() {
        let mut district = WideRecord::new(2024, Level::District);
        district.district_id = Some("001".to_string());
        district.counts.insert(Grade::Total, 999);
        let mut records = sample();
        records.push(district);

        let wide = aggregate(records);
        let boise = wide
            .iter()
            .find(|r| r.level == Level::District && r.district_id.as_deref() == Some("001"))
            .unwrap();
        assert_eq!(boise.total(), 999);
        assert_eq!(wide[0].total(), 999 + 21);
    }

    #[test]
    fn empty_input_stays_empty() {
        assert!(aggregate(Vec::new()).is_empty());
        assert!(tidy_enr(&[]).is_empty());
    }

    #[test]
    fn tidy_percentages_and_flags() {
        let tidy = tidy_enr(&aggregate(sample()));

        for row in tidy.iter().filter(|r| r.grade_level == Grade::Total) {
            assert_eq!(row.pct, 1.0);
        }
        for row in &tidy {
            assert_le!(row.pct, 1.0);
            let flags = [row.is_state, row.is_district, row.is_school];
            assert_eq!(flags.iter().filter(|f| **f).count(), 1);
            assert_eq!(row.subgroup, SUBGROUP_TOTAL);
        }

        let state_grades: f64 = tidy
            .iter()
            .filter(|r| r.is_state && r.grade_level != Grade::Total)
            .map(|r| r.pct)
            .sum();
        assert!((state_grades - 1.0).abs() < 1e-9);

        let charter: Vec<_> = tidy.iter().filter(|r| r.is_charter).collect();
        assert!(!charter.is_empty());
        assert!(charter.iter().all(|r| r.district_id.as_deref() == Some("451")));
        assert!(tidy.iter().filter(|r| r.is_state).all(|r| !r.is_charter));
    }

    #[test]
    fn zero_total_has_zero_pct() {
        let tidy = tidy_enr(&[school("002", "0100", &[(Grade::G05, 0)])]);
        assert_eq!(tidy.len(), 2);
        assert!(tidy.iter().all(|r| r.pct == 0.0));
    }

    #[test]
    fn filter_by_level() {
        let tidy = tidy_enr(&aggregate(sample()));
        let districts = filter_level(tidy, Level::District);
        assert!(!districts.is_empty());
        assert!(districts.iter().all(|r| r.is_district));
    }
}
