use crate::calendar::{build_target_days_by_month, format_date, is_ahead, parse_target_date, plan, CalendarPlan};
use proptest::prelude::*;
use std::collections::BTreeSet;

fn day_set() -> impl Strategy<Value = BTreeSet<u32>> {
    prop::collection::btree_set(1u32..=31, 0..12)
}

proptest! {
    #[test]
    fn valid_dates_land_in_their_month(day in 1u32..=31, month in 1u32..=12) {
        let date = format_date(day, month);
        prop_assert_eq!(parse_target_date(&date), Some((day, month)));
        let map = build_target_days_by_month([date.as_str()]);
        prop_assert!(map[&month].contains(&day));
        prop_assert_eq!(map.len(), 1);
    }

    #[test]
    fn out_of_range_dates_are_dropped(day in 32u32..100, month in 13u32..100) {
        let map = build_target_days_by_month([format!("{day}.05"), format!("10.{month}")]);
        prop_assert!(map.is_empty());
    }

    #[test]
    fn grouping_ignores_input_order(dates in prop::collection::vec((1u32..=31, 1u32..=12), 0..20)) {
        let forward: Vec<String> = dates.iter().map(|(d, m)| format_date(*d, *m)).collect();
        let mut backward = forward.clone();
        backward.reverse();
        prop_assert_eq!(build_target_days_by_month(&forward), build_target_days_by_month(&backward));
    }

    #[test]
    fn plan_picks_smallest_free_target_day(
        targets in day_set(),
        available in day_set(),
        taken in day_set(),
        booked in day_set(),
        other_month_ahead in any::<bool>(),
    ) {
        let month = 3;
        let mut dates: Vec<String> = targets.iter().map(|d| format_date(*d, month)).collect();
        if other_month_ahead {
            dates.push(format_date(2, 4));
        }
        let map = build_target_days_by_month(&dates);
        let booked_dates: BTreeSet<String> = booked.iter().map(|d| format_date(*d, month)).collect();

        let expected: Vec<u32> = targets
            .iter()
            .filter(|d| available.contains(d) && !taken.contains(d) && !booked.contains(d))
            .copied()
            .collect();

        match plan(&map, month, &available, &taken, &booked_dates) {
            CalendarPlan::Select(days) => {
                prop_assert_eq!(days.first(), expected.iter().min());
                prop_assert_eq!(days, expected);
            }
            CalendarPlan::AdvanceMonth => {
                prop_assert!(expected.is_empty());
                prop_assert!(other_month_ahead);
            }
            CalendarPlan::Exit => {
                prop_assert!(expected.is_empty());
                prop_assert!(!other_month_ahead);
            }
        }
    }

    #[test]
    fn later_target_month_pages_forward(displayed in 1u32..=12, target in 1u32..=12, day in 1u32..=28) {
        let map = build_target_days_by_month([format_date(day, target)]);
        let none = BTreeSet::new();
        let decision = plan(&map, displayed, &none, &none, &BTreeSet::new());
        prop_assert_eq!(decision == CalendarPlan::AdvanceMonth, target > displayed);
        prop_assert_eq!(is_ahead(displayed, target), target > displayed);
    }
}
