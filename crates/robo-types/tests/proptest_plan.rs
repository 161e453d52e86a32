//! Property-based tests for plan tier parsing
//!
//! Only the three known tier names are accepted, in any ASCII case.

use proptest::prelude::*;
use robo_types::PlanType;

fn arb_known_tier() -> impl Strategy<Value = (String, PlanType)> {
    prop_oneof![
        Just(("basic".to_string(), PlanType::Basic)),
        Just(("premium".to_string(), PlanType::Premium)),
        Just(("enterprise".to_string(), PlanType::Enterprise)),
    ]
}

fn scramble_case(s: &str, mask: &[bool]) -> String {
    s.chars()
        .zip(mask.iter().cycle())
        .map(|(c, upper)| if *upper { c.to_ascii_uppercase() } else { c })
        .collect()
}

proptest! {
    #[test]
    fn known_tiers_parse_in_any_case(
        (name, tier) in arb_known_tier(),
        mask in prop::collection::vec(any::<bool>(), 1..12),
    ) {
        let input = scramble_case(&name, &mask);
        prop_assert_eq!(input.parse::<PlanType>().unwrap(), tier);
    }

    #[test]
    fn unknown_names_never_parse(s in "[a-z]{1,12}") {
        prop_assume!(!["basic", "premium", "enterprise"].contains(&s.as_str()));
        prop_assert!(s.parse::<PlanType>().is_err());
    }

    #[test]
    fn display_round_trips(tier in prop::sample::select(PlanType::ALL.to_vec())) {
        prop_assert_eq!(tier.to_string().parse::<PlanType>().unwrap(), tier);
    }
}
