//! Property tests for the document editor and identifiers.

use platsdk_bridge::{Identifier, Value};
use platsdk_testkit::prelude::*;
use platsdk_value::{get_at_path, set_at_path};
use proptest::prelude::*;

proptest! {
    #![proptest_config(PropTestConfig::quick().to_proptest_config())]

    #[test]
    fn set_property_matches_local_model(
        properties in note_properties_strategy(),
        path in path_strategy(),
        value in value_strategy(),
    ) {
        let platform = TestPlatform::new();
        let mut note = platform.note(&properties);

        let mut model = properties.clone();
        let expected = set_at_path(&mut model, &path, value.clone());
        let actual = note.set_property(&path, value.clone());

        match expected {
            Ok(_) => {
                prop_assert!(actual.is_ok(), "core rejected {}: {:?}", path, actual);
                prop_assert_eq!(note.data().unwrap(), &model);
                prop_assert_eq!(note.get_property(&path).unwrap(), Some(value));
            }
            Err(_) => {
                prop_assert!(actual.is_err());
                prop_assert_eq!(note.data().unwrap(), &properties);
            }
        }
    }

    #[test]
    fn remove_property_keeps_siblings(
        properties in note_properties_strategy(),
        path in path_strategy(),
    ) {
        let platform = TestPlatform::new();
        let mut note = platform.note(&properties);

        note.remove_property(&path).unwrap();
        prop_assert_eq!(note.get_property(&path).unwrap(), None);
        for (key, original) in &properties {
            if !path.split('.').next().is_some_and(|first| first == key) {
                let got = note.get(key).unwrap();
                prop_assert_eq!(got.as_ref(), Some(original));
            }
        }
    }

    #[test]
    fn identifiers_parse_in_either_case(id in identifier_strategy()) {
        let lower = id.to_hex();
        prop_assert_eq!(Identifier::from_hex(&lower).unwrap(), id);
        prop_assert_eq!(Identifier::from_hex(&lower.to_uppercase()).unwrap(), id);
        prop_assert_eq!(lower.parse::<Identifier>().unwrap(), id);
    }

    #[test]
    fn stored_values_read_back_numerically(n in any::<i64>()) {
        let platform = TestPlatform::new();
        let mut note = platform.note_json(r#"{"message":"n"}"#);
        note.set_property("score", Value::Text(n.to_string())).unwrap();
        prop_assert_eq!(note.get_number("score").unwrap(), Some(n as f64));
    }
}

#[test]
fn get_at_path_agrees_with_the_document() {
    init_test_tracing();
    let platform = TestPlatform::new();
    let mut note = platform.note_json(r#"{"message":"m","a":{"b":[1,{"c":2}]}}"#);
    let data = note.data().unwrap().clone();

    for path in ["a.b.0", "a.b.1.c", "a.b.2", "message.x"] {
        assert_eq!(
            note.get_property(path).unwrap(),
            get_at_path(&data, path).cloned(),
            "path {path}"
        );
    }
}
