use proptest::prelude::*;
use stylepack_types::{ConfigValue, OsBuild};

proptest! {
    #[test]
    fn build_distance_is_symmetric(a in any::<u32>(), b in any::<u32>()) {
        let (a, b) = (OsBuild(a), OsBuild(b));
        prop_assert_eq!(a.distance(b), b.distance(a));
        prop_assert_eq!(a.distance(b) == 0, a == b);
    }

    #[test]
    fn dotted_versions_parse_to_last_component(major in 0u32..20, build in any::<u32>()) {
        let text = format!("{major}.0.{build}");
        prop_assert_eq!(text.parse::<OsBuild>().unwrap(), OsBuild(build));
    }

    #[test]
    fn json_integers_keep_their_scalar_form(n in any::<i64>()) {
        let value = ConfigValue::from_json(&serde_json::json!(n)).unwrap();
        prop_assert_eq!(value.scalar_form(), Some(n.to_string()));
    }
}
