use leadbook_core::buyer::*;
use leadbook_core::{BuyerId, FieldValue, HistoryEntry, Timestamp, UserId, diff, replay, validate};
use proptest::prelude::*;
use proptest::sample::select;

fn budgets() -> impl Strategy<Value = (Option<i64>, Option<i64>)> {
    (
        proptest::option::of(1_i64..50_000_000),
        proptest::option::of(1_i64..50_000_000),
    )
        .prop_map(|(a, b)| match (a, b) {
            (Some(a), Some(b)) => (Some(a.min(b)), Some(a.max(b))),
            other => other,
        })
}

prop_compose! {
    fn valid_fields()(
        full_name in "[A-Za-z][A-Za-z .']{1,40}",
        email in proptest::option::of("[a-z]{1,8}@[a-z]{2,8}\\.(com|in|org)"),
        phone in "[0-9]{10,15}",
        city in select(City::ALL),
        property_type in select(PropertyType::ALL),
        bhk in select(Bhk::ALL),
        purpose in select(Purpose::ALL),
        (budget_min, budget_max) in budgets(),
        timeline in select(Timeline::ALL),
        source in select(Source::ALL),
        notes in proptest::option::of("[ -~]{0,60}"),
        tags in proptest::collection::btree_set("[a-z]{1,6}", 0..4),
        status in select(Status::ALL),
    ) -> BuyerFields {
        BuyerFields {
            full_name,
            email,
            phone,
            city,
            property_type,
            bhk: property_type.requires_bhk().then_some(bhk),
            purpose,
            budget_min,
            budget_max,
            timeline,
            source,
            notes,
            tags: tags.into_iter().collect(),
            status,
        }
    }
}

proptest! {
    #[test]
    fn valid_fields_survive_validation(fields in valid_fields()) {
        let raw = fields.to_raw();
        prop_assert_eq!(validate(&raw), Ok(fields));
    }

    #[test]
    fn apartments_and_villas_need_bhk(fields in valid_fields()) {
        let mut raw = fields.to_raw();
        raw.remove(BHK);
        let result = validate(&raw);
        if fields.property_type.requires_bhk() {
            let errors = result.unwrap_err();
            prop_assert!(errors.contains(BHK));
        } else {
            prop_assert!(result.is_ok());
        }
    }

    #[test]
    fn inverted_budget_fails_on_budget_max(
        fields in valid_fields(),
        low in 1_i64..1_000_000,
        gap in 1_i64..1_000_000,
    ) {
        let raw = fields
            .to_raw()
            .with(BUDGET_MIN, low + gap)
            .with(BUDGET_MAX, low);
        let errors = validate(&raw).unwrap_err();
        prop_assert_eq!(errors.get(BUDGET_MAX), ["budgetMax must be >= budgetMin".to_string()]);
        prop_assert_eq!(errors.len(), 1);
    }

    #[test]
    fn equal_budgets_are_valid(fields in valid_fields(), amount in 1_i64..100_000_000) {
        let raw = fields.to_raw().with(BUDGET_MIN, amount).with(BUDGET_MAX, amount);
        prop_assert!(validate(&raw).is_ok());
    }

    #[test]
    fn diff_lists_exactly_the_changed_fields(a in valid_fields(), b in valid_fields()) {
        let changes = diff(&a, &b);
        for name in FIELD_NAMES {
            let before = a.field_value(name);
            let after = b.field_value(name);
            prop_assert_eq!(changes.contains_key(name), before != after, "{}", name);
        }
        prop_assert!(diff(&a, &a).is_empty());
    }

    #[test]
    fn replaying_a_trail_yields_the_last_state(
        states in proptest::collection::vec(valid_fields(), 1..6),
    ) {
        let buyer = BuyerId::new();
        let user = UserId::new();
        let mut trail = vec![HistoryEntry::created(
            buyer,
            user,
            Timestamp::from_nanos(1),
            states[0].clone(),
        )];
        for (i, pair) in states.windows(2).enumerate() {
            trail.push(HistoryEntry::updated(
                buyer,
                user,
                Timestamp::from_nanos(2 + i as i64),
                diff(&pair[0], &pair[1]),
            ));
        }
        let rebuilt = replay(&trail).unwrap();
        prop_assert_eq!(&rebuilt, states.last().unwrap());
    }

    #[test]
    fn reordered_tags_replay_in_their_new_order(
        fields in valid_fields(),
        tags in proptest::collection::btree_set("[a-z]{1,6}", 2..5),
    ) {
        let before = BuyerFields { tags: tags.iter().cloned().collect(), ..fields.clone() };
        let after = BuyerFields { tags: tags.iter().rev().cloned().collect(), ..fields };
        let buyer = BuyerId::new();
        let user = UserId::new();
        let trail = vec![
            HistoryEntry::created(buyer, user, Timestamp::from_nanos(1), before.clone()),
            HistoryEntry::updated(buyer, user, Timestamp::from_nanos(2), diff(&before, &after)),
        ];
        prop_assert_eq!(replay(&trail).unwrap(), after);
    }

    #[test]
    fn non_text_names_are_type_errors(value in any::<i64>()) {
        let raw = BuyerFields::to_raw(&sample()).with(FULL_NAME, FieldValue::Integer(value));
        let errors = validate(&raw).unwrap_err();
        prop_assert_eq!(errors.get(FULL_NAME), ["Expected string, received number".to_string()]);
    }
}

fn sample() -> BuyerFields {
    BuyerFields {
        full_name: "Asha Verma".into(),
        email: None,
        phone: "9876543210".into(),
        city: City::Mohali,
        property_type: PropertyType::Plot,
        bhk: None,
        purpose: Purpose::Buy,
        budget_min: None,
        budget_max: None,
        timeline: Timeline::Exploring,
        source: Source::Website,
        notes: None,
        tags: Vec::new(),
        status: Status::New,
    }
}
