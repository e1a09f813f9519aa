use proptest::prelude::*;

use printshop_api::services::checkout::{distribute_discount, PricedLine};

fn arb_lines() -> impl Strategy<Value = Vec<PricedLine>> {
    prop::collection::vec(
        (1i64..=20_000, 1i64..=10).prop_map(|(unit, qty)| PricedLine::new(unit, qty)),
        1..6,
    )
}

proptest! {
    /// The applied total never exceeds the authorized amount, and no unit
    /// price ever drops below zero.
    #[test]
    fn applied_is_bounded_and_units_stay_nonnegative(
        mut lines in arb_lines(),
        discount in 0i64..=1_000_000,
    ) {
        let applied = distribute_discount(&mut lines, discount);

        prop_assert!(applied >= 0);
        prop_assert!(applied <= discount);
        for line in &lines {
            prop_assert!(line.discounted_unit_cents >= 0);
            prop_assert!(line.discounted_unit_cents <= line.unit_cents);
        }
    }

    /// Applied cents equal the drop in the repriced subtotal exactly.
    #[test]
    fn applied_matches_the_subtotal_delta(
        mut lines in arb_lines(),
        discount in 0i64..=1_000_000,
    ) {
        let before: i64 = lines.iter().map(|l| l.unit_cents * l.quantity).sum();
        let applied = distribute_discount(&mut lines, discount);
        let after: i64 = lines.iter().map(|l| l.discounted_unit_cents * l.quantity).sum();

        prop_assert_eq!(before - after, applied);
    }

    /// When the authorized amount fits inside the subtotal, the
    /// undistributed slack stays below the total unit count: per-unit floor
    /// division can strand at most `quantity - 1` cents per line.
    #[test]
    fn slack_is_bounded_by_quantities(mut lines in arb_lines()) {
        let subtotal: i64 = lines.iter().map(|l| l.unit_cents * l.quantity).sum();
        let discount = subtotal / 10;
        let slack_bound: i64 = lines.iter().map(|l| l.quantity - 1).sum();

        let applied = distribute_discount(&mut lines, discount);

        prop_assert!(discount - applied <= slack_bound);
    }

    /// Discounting the full subtotal zeroes every unit with no slack.
    #[test]
    fn full_discount_zeroes_everything(mut lines in arb_lines()) {
        let subtotal: i64 = lines.iter().map(|l| l.unit_cents * l.quantity).sum();
        let applied = distribute_discount(&mut lines, subtotal);

        prop_assert_eq!(applied, subtotal);
        for line in &lines {
            prop_assert_eq!(line.discounted_unit_cents, 0);
        }
    }
}
