// src/roster_tests.rs

#[cfg(test)]
mod tests {
    use crate::model::{Personnel, Rank};
    use crate::roster::{
        new_member_payload, next_seniority, plan_reorder, sort_roster, ReorderDirection,
        ReorderError, ReorderOutcome,
    };

    fn member(id: &str, name: &str, seniority: Option<i64>) -> Personnel {
        Personnel {
            id: id.to_string(),
            rank: Rank::PrimeiroSargento,
            name: name.to_string(),
            seniority,
            created_at: None,
        }
    }

    fn ids(roster: &[Personnel]) -> Vec<&str> {
        roster.iter().map(|m| m.id.as_str()).collect()
    }

    #[test]
    fn sort_orders_by_seniority_with_nulls_last() {
        let mut roster = vec![
            member("d", "DELTA", None),
            member("b", "BRAVO", Some(2)),
            member("a", "ALFA", Some(1)),
            member("c", "CHARLIE", Some(3)),
        ];
        sort_roster(&mut roster);
        assert_eq!(ids(&roster), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn sort_breaks_ties_by_name() {
        let mut roster = vec![
            member("x", "ZULU", None),
            member("y", "ALFA", None),
            member("b", "BRAVO", Some(1)),
            member("a", "ALFA", Some(1)),
        ];
        sort_roster(&mut roster);
        assert_eq!(ids(&roster), vec!["a", "b", "y", "x"]);
    }

    #[test]
    fn next_seniority_is_max_plus_one() {
        let roster = vec![
            member("a", "ALFA", Some(1)),
            member("b", "BRAVO", Some(7)),
            member("c", "CHARLIE", None),
        ];
        assert_eq!(next_seniority(&roster), 8);
    }

    #[test]
    fn next_seniority_on_empty_roster_is_one() {
        assert_eq!(next_seniority(&[]), 1);
    }

    #[test]
    fn new_member_is_uppercased_and_appended_to_the_order() {
        let roster = vec![member("a", "ALFA", Some(4))];
        let payload = new_member_payload(&roster, Rank::Cabo, "  da silva ");
        assert_eq!(payload.name, "DA SILVA");
        assert_eq!(payload.seniority, 5);
        assert_eq!(payload.rank, Rank::Cabo);
    }

    #[test]
    fn reorder_up_at_the_top_is_a_noop() {
        let roster = vec![member("a", "ALFA", Some(1)), member("b", "BRAVO", Some(2))];
        let outcome = plan_reorder(&roster, "a", ReorderDirection::Up, None).unwrap();
        assert_eq!(outcome, ReorderOutcome::Noop);
    }

    #[test]
    fn reorder_down_at_the_bottom_is_a_noop() {
        let roster = vec![member("a", "ALFA", Some(1)), member("b", "BRAVO", Some(2))];
        let outcome = plan_reorder(&roster, "b", ReorderDirection::Down, None).unwrap();
        assert_eq!(outcome, ReorderOutcome::Noop);
    }

    #[test]
    fn reorder_with_active_filter_is_rejected() {
        let roster = vec![member("a", "ALFA", Some(1)), member("b", "BRAVO", Some(2))];
        let result = plan_reorder(&roster, "b", ReorderDirection::Up, Some("silva"));
        assert_eq!(result, Err(ReorderError::FilterActive));
    }

    #[test]
    fn blank_filter_text_does_not_block_reorder() {
        let roster = vec![member("a", "ALFA", Some(1)), member("b", "BRAVO", Some(2))];
        let outcome = plan_reorder(&roster, "b", ReorderDirection::Up, Some("   ")).unwrap();
        assert_eq!(
            outcome,
            ReorderOutcome::Swap {
                member_id: "b".to_string(),
                neighbor_id: "a".to_string(),
            }
        );
    }

    #[test]
    fn unknown_member_is_an_error() {
        let roster = vec![member("a", "ALFA", Some(1))];
        let result = plan_reorder(&roster, "ghost", ReorderDirection::Up, None);
        assert_eq!(result, Err(ReorderError::UnknownMember("ghost".to_string())));
    }

    // The two-record swap scenario: [A(1), B(2), C(3)], move B up. The store
    // procedure exchanges the two seniority values; simulating that exchange
    // here must leave C untouched and reorder the list to [B, A, C].
    #[test]
    fn moving_b_up_swaps_only_a_and_b() {
        let mut roster = vec![
            member("a", "ALFA", Some(1)),
            member("b", "BRAVO", Some(2)),
            member("c", "CHARLIE", Some(3)),
        ];
        sort_roster(&mut roster);

        let outcome = plan_reorder(&roster, "b", ReorderDirection::Up, None).unwrap();
        let (member_id, neighbor_id) = match outcome {
            ReorderOutcome::Swap {
                member_id,
                neighbor_id,
            } => (member_id, neighbor_id),
            other => panic!("Expected a swap but got: {:?}", other),
        };
        assert_eq!(member_id, "b");
        assert_eq!(neighbor_id, "a");

        // What the swap_seniority procedure does on the store side.
        let member_index = roster.iter().position(|m| m.id == member_id).unwrap();
        let neighbor_index = roster.iter().position(|m| m.id == neighbor_id).unwrap();
        let member_value = roster[member_index].seniority;
        roster[member_index].seniority = roster[neighbor_index].seniority;
        roster[neighbor_index].seniority = member_value;

        sort_roster(&mut roster);
        assert_eq!(ids(&roster), vec!["b", "a", "c"]);
        let by_id = |id: &str| roster.iter().find(|m| m.id == id).unwrap().seniority;
        assert_eq!(by_id("b"), Some(1));
        assert_eq!(by_id("a"), Some(2));
        assert_eq!(by_id("c"), Some(3), "third record is untouched");
    }

    #[test]
    fn reorder_down_swaps_with_the_next_member() {
        let roster = vec![
            member("a", "ALFA", Some(1)),
            member("b", "BRAVO", Some(2)),
            member("c", "CHARLIE", Some(3)),
        ];
        let outcome = plan_reorder(&roster, "a", ReorderDirection::Down, None).unwrap();
        assert_eq!(
            outcome,
            ReorderOutcome::Swap {
                member_id: "a".to_string(),
                neighbor_id: "b".to_string(),
            }
        );
    }
}
