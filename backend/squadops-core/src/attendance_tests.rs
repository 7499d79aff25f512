// src/attendance_tests.rs

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use crate::attendance::{aggregate, presence_percentage, JUSTIFIED_LABEL};
    use crate::justification::JustificationIndex;
    use crate::model::{AttendanceRecord, AttendanceStatus, Justification, Personnel, Rank};

    fn day(raw: &str) -> NaiveDate {
        raw.parse().unwrap()
    }

    fn member(id: &str, name: &str, seniority: i64) -> Personnel {
        Personnel {
            id: id.to_string(),
            rank: Rank::TerceiroSargento,
            name: name.to_string(),
            seniority: Some(seniority),
            created_at: None,
        }
    }

    fn record(military_id: &str, date: &str, status: AttendanceStatus) -> AttendanceRecord {
        AttendanceRecord {
            id: format!("rec-{}", military_id),
            military_id: military_id.to_string(),
            military_name: "X".to_string(),
            rank: Rank::TerceiroSargento,
            call_type: "ALVORADA".to_string(),
            date: day(date),
            status,
            justification_id: None,
            created_at: None,
        }
    }

    fn justification(
        military_id: &str,
        reason: &str,
        start: &str,
        end: &str,
    ) -> Justification {
        Justification {
            id: format!("j-{}", military_id),
            military_id: military_id.to_string(),
            military_name: "X".to_string(),
            reason: reason.to_string(),
            start_date: day(start),
            end_date: day(end),
            created_at: None,
        }
    }

    fn empty_index() -> JustificationIndex {
        JustificationIndex::build(&[])
    }

    // Reference implementation check for the percentage formula.
    #[test]
    fn percentage_matches_reference_for_all_small_pairs() {
        for total in 0..=40usize {
            for present in 0..=total {
                let expected = if total == 0 {
                    0
                } else {
                    ((present as f64 / total as f64) * 100.0).round() as u32
                };
                assert_eq!(
                    presence_percentage(present, total),
                    expected,
                    "present={} total={}",
                    present,
                    total
                );
            }
        }
    }

    #[test]
    fn empty_roster_yields_zero_percentage() {
        assert_eq!(presence_percentage(0, 0), 0);
        let (lines, summary) = aggregate(&[], &[], &empty_index(), day("2024-01-10"));
        assert!(lines.is_empty());
        assert_eq!(summary.total, 0);
        assert_eq!(summary.percentage, 0);
    }

    // The end-to-end scenario from the design record: three members, one
    // present record, one justification window, one member with nothing.
    #[test]
    fn three_member_scenario_tallies_as_expected() {
        let roster = vec![
            member("a", "ALFA", 1),
            member("b", "BRAVO", 2),
            member("c", "CHARLIE", 3),
        ];
        let records = vec![record("a", "2024-01-10", AttendanceStatus::Present)];
        let index = JustificationIndex::build(&[justification(
            "b",
            "missão externa",
            "2024-01-05",
            "2024-01-15",
        )]);

        let (lines, summary) = aggregate(&roster, &records, &index, day("2024-01-10"));

        assert_eq!(summary.total, 3);
        assert_eq!(summary.present, 1);
        assert_eq!(summary.justified, 1);
        assert_eq!(summary.absent, 1, "member without a record counts as absent");
        assert_eq!(summary.percentage, 33);

        assert_eq!(lines[0].status, "PRESENTE");
        assert_eq!(lines[1].status, JUSTIFIED_LABEL);
        assert_eq!(lines[1].observation, "missão externa");
        assert_eq!(lines[2].status, "AUSENTE");
        assert!(lines[2].observation.is_empty());
    }

    // A present member under an overlapping window shows JUSTIFICADO but
    // still counts in the present tally. The asymmetry is deliberate.
    #[test]
    fn justification_overrides_display_but_not_the_present_tally() {
        let roster = vec![member("a", "ALFA", 1)];
        let records = vec![record("a", "2024-01-10", AttendanceStatus::Present)];
        let index = JustificationIndex::build(&[justification(
            "a",
            "dispensa médica",
            "2024-01-10",
            "2024-01-10",
        )]);

        let (lines, summary) = aggregate(&roster, &records, &index, day("2024-01-10"));

        assert_eq!(lines[0].status, JUSTIFIED_LABEL);
        assert_eq!(lines[0].raw_status, Some(AttendanceStatus::Present));
        assert!(lines[0].is_justified);
        assert_eq!(summary.present, 1);
        assert_eq!(summary.justified, 1);
        assert_eq!(summary.absent, 0);
    }

    #[test]
    fn blank_justification_reason_falls_back_to_the_literal_label() {
        let roster = vec![member("a", "ALFA", 1)];
        let index =
            JustificationIndex::build(&[justification("a", "   ", "2024-01-01", "2024-01-31")]);
        let (lines, _) = aggregate(&roster, &[], &index, day("2024-01-10"));
        assert_eq!(lines[0].observation, JUSTIFIED_LABEL);
    }

    #[test]
    fn late_and_other_statuses_count_neither_present_nor_absent() {
        let roster = vec![member("a", "ALFA", 1), member("b", "BRAVO", 2)];
        let records = vec![
            record("a", "2024-01-10", AttendanceStatus::Late),
            record("b", "2024-01-10", AttendanceStatus::Other),
        ];
        let (lines, summary) = aggregate(&roster, &records, &empty_index(), day("2024-01-10"));
        assert_eq!(summary.present, 0);
        assert_eq!(summary.absent, 0);
        assert_eq!(summary.justified, 0);
        assert_eq!(lines[0].status, "ATRASADO");
        assert_eq!(lines[1].status, "OUTRO");
    }

    #[test]
    fn justified_absent_member_is_not_in_the_absent_tally() {
        let roster = vec![member("a", "ALFA", 1)];
        let records = vec![record("a", "2024-01-10", AttendanceStatus::Absent)];
        let index = JustificationIndex::build(&[justification(
            "a",
            "núpcias",
            "2024-01-09",
            "2024-01-12",
        )]);
        let (_, summary) = aggregate(&roster, &records, &index, day("2024-01-10"));
        assert_eq!(summary.absent, 0);
        assert_eq!(summary.justified, 1);
    }

    #[test]
    fn window_boundaries_decide_justified_status() {
        let roster = vec![member("a", "ALFA", 1)];
        let index = JustificationIndex::build(&[justification(
            "a",
            "curso",
            "2024-01-05",
            "2024-01-15",
        )]);

        let (_, at_start) = aggregate(&roster, &[], &index, day("2024-01-05"));
        assert_eq!(at_start.justified, 1);
        let (_, at_end) = aggregate(&roster, &[], &index, day("2024-01-15"));
        assert_eq!(at_end.justified, 1);
        let (lines, outside) = aggregate(&roster, &[], &index, day("2024-01-16"));
        assert_eq!(outside.justified, 0);
        assert_eq!(lines[0].status, "AUSENTE");
        assert_eq!(outside.absent, 1);
    }

    #[test]
    fn lines_follow_roster_order() {
        let roster = vec![
            member("c", "CHARLIE", 1),
            member("a", "ALFA", 2),
            member("b", "BRAVO", 3),
        ];
        let (lines, _) = aggregate(&roster, &[], &empty_index(), day("2024-01-10"));
        let names: Vec<&str> = lines.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["CHARLIE", "ALFA", "BRAVO"]);
    }

    // Rounding edges of the percentage formula.
    #[test]
    fn percentage_rounds_half_up_at_the_midpoint() {
        assert_eq!(presence_percentage(1, 3), 33);
        assert_eq!(presence_percentage(2, 3), 67);
        assert_eq!(presence_percentage(1, 2), 50);
        assert_eq!(presence_percentage(1, 8), 13);
        assert_eq!(presence_percentage(29, 30), 97);
        assert_eq!(presence_percentage(30, 30), 100);
    }
}
