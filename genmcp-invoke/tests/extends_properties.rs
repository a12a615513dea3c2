//! Property-based checks over extends composition

use genmcp_defs::ExtendsSpec;
use genmcp_invoke::resolve_extends;
use proptest::prelude::*;
use serde_json::{json, Value};

fn spec(extend: Option<Value>, override_with: Option<Value>, remove: Option<Value>) -> ExtendsSpec {
    ExtendsSpec {
        from: "base".to_string(),
        extend,
        override_with,
        remove,
    }
}

fn element() -> impl Strategy<Value = String> {
    "[a-z0-9-]{1,8}"
}

proptest! {
    /// Extending a list with elements and then removing those elements
    /// restores the original list, whatever the lists contain.
    #[test]
    fn extend_then_remove_is_identity_on_lists(
        base_items in prop::collection::vec(element(), 0..5),
        added in prop::collection::vec(element(), 1..4),
    ) {
        // Elements already present would be deleted too; keep them distinct
        prop_assume!(added.iter().all(|a| !base_items.contains(a)));

        let base = json!({"args": base_items});
        let added_json = json!(added);

        let extended = resolve_extends(
            &base,
            &spec(Some(json!({"args": added_json.clone()})), None, None),
        ).unwrap();

        let removed = resolve_extends(
            &extended,
            &spec(None, None, Some(json!({"args": added_json}))),
        ).unwrap();

        prop_assert_eq!(removed, base);
    }

    /// Override is last-writer-wins regardless of the values involved.
    #[test]
    fn override_twice_keeps_last(first in element(), second in element()) {
        let base = json!({"method": "GET"});

        let once = resolve_extends(&base, &spec(None, Some(json!({"method": first})), None)).unwrap();
        let twice = resolve_extends(&once, &spec(None, Some(json!({"method": second.clone()})), None)).unwrap();

        prop_assert_eq!(&twice["method"], &json!(second));
    }

    /// String extension concatenates in operand order.
    #[test]
    fn string_extend_concatenates(prefix in element(), suffix in element()) {
        let base = json!({"url": prefix.clone()});
        let extended = resolve_extends(&base, &spec(Some(json!({"url": suffix.clone()})), None, None)).unwrap();
        prop_assert_eq!(&extended["url"], &json!(format!("{}{}", prefix, suffix)));
    }
}
