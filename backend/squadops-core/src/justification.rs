// src/justification.rs

use std::collections::HashMap;

use chrono::NaiveDate;

use crate::model::Justification;

/// Boundary-inclusive on both ends: start <= date <= end.
pub fn window_covers(justification: &Justification, date: NaiveDate) -> bool {
    justification.start_date <= date && date <= justification.end_date
}

/// Lookup structure answering "does this person have an approved absence
/// covering this date". Built fresh from the full justification row set on
/// every aggregation; nothing is cached between requests.
pub struct JustificationIndex {
    by_member: HashMap<String, Vec<Justification>>,
}

impl JustificationIndex {
    pub fn build(justifications: &[Justification]) -> Self {
        let mut by_member: HashMap<String, Vec<Justification>> = HashMap::new();
        for justification in justifications {
            by_member
                .entry(justification.military_id.clone())
                .or_default()
                .push(justification.clone());
        }
        Self { by_member }
    }

    /// First window covering `date` for the given person, if any.
    pub fn covering(&self, military_id: &str, date: NaiveDate) -> Option<&Justification> {
        self.by_member
            .get(military_id)?
            .iter()
            .find(|justification| window_covers(justification, date))
    }

    pub fn is_covered(&self, military_id: &str, date: NaiveDate) -> bool {
        self.covering(military_id, date).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn justification(id: &str, military_id: &str, start: &str, end: &str) -> Justification {
        Justification {
            id: id.to_string(),
            military_id: military_id.to_string(),
            military_name: "FULANO".to_string(),
            reason: "dispensa médica".to_string(),
            start_date: start.parse().unwrap(),
            end_date: end.parse().unwrap(),
            created_at: None,
        }
    }

    fn day(raw: &str) -> NaiveDate {
        raw.parse().unwrap()
    }

    #[test]
    fn window_is_inclusive_on_both_ends() {
        let j = justification("j1", "m1", "2024-01-05", "2024-01-15");
        assert!(window_covers(&j, day("2024-01-05")), "start boundary");
        assert!(window_covers(&j, day("2024-01-15")), "end boundary");
        assert!(window_covers(&j, day("2024-01-10")), "interior");
        assert!(!window_covers(&j, day("2024-01-04")), "before start");
        assert!(!window_covers(&j, day("2024-01-16")), "after end");
    }

    #[test]
    fn single_day_window_covers_only_that_day() {
        let j = justification("j1", "m1", "2024-03-08", "2024-03-08");
        assert!(window_covers(&j, day("2024-03-08")));
        assert!(!window_covers(&j, day("2024-03-07")));
        assert!(!window_covers(&j, day("2024-03-09")));
    }

    #[test]
    fn index_answers_per_member() {
        let index = JustificationIndex::build(&[
            justification("j1", "m1", "2024-01-05", "2024-01-15"),
            justification("j2", "m2", "2024-02-01", "2024-02-02"),
        ]);
        assert!(index.is_covered("m1", day("2024-01-10")));
        assert!(!index.is_covered("m1", day("2024-02-01")));
        assert!(index.is_covered("m2", day("2024-02-01")));
        assert!(!index.is_covered("m3", day("2024-01-10")), "unknown member");
    }

    #[test]
    fn covering_returns_the_matching_window() {
        let index = JustificationIndex::build(&[
            justification("j1", "m1", "2024-01-01", "2024-01-02"),
            justification("j2", "m1", "2024-01-10", "2024-01-20"),
        ]);
        let found = index.covering("m1", day("2024-01-12")).unwrap();
        assert_eq!(found.id, "j2");
    }
}
