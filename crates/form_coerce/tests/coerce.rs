use std::sync::LazyLock;

use assert_matches::assert_matches;
use form_coerce::{coerce, coerce_with, transform, CoerceOptions, CoercionMemo};
use form_schema::{FileBlob, IssueCode, Schema, SchemaKind, Value};
use pretty_assertions::assert_eq;
use time::macros::datetime;

fn form<const N: usize>(fields: [(&str, Value); N]) -> Value {
    Value::object(fields)
}

#[tokio::test]
async fn numeric_strings_become_numbers() {
    let schema = coerce(&Schema::object([("count", Schema::number())]));
    let parsed = schema
        .parse_async(form([("count", Value::from("42"))]))
        .await
        .expect("numeric string coerces");
    assert_eq!(parsed, form([("count", Value::Number(42.0))]));
}

#[tokio::test]
async fn empty_string_is_absent() {
    let required = coerce(&Schema::object([("count", Schema::number())]));
    let error = required
        .parse_async(form([("count", Value::from(""))]))
        .await
        .expect_err("empty string without default is missing");
    assert!(error.has_issue_at(&["count"]));
    assert_eq!(error.issues()[0].message, "Required");

    let defaulted = coerce(&Schema::object([(
        "count",
        Schema::number().default_value(5),
    )]));
    let parsed = defaulted
        .parse_async(form([("count", Value::from(""))]))
        .await
        .expect("default applies to empty string");
    assert_eq!(parsed, form([("count", Value::Number(5.0))]));
}

#[tokio::test]
async fn unparseable_number_fails_with_schema_message() {
    let schema = coerce(&Schema::number());
    let error = schema
        .parse_async(Value::from("abc"))
        .await
        .expect_err("NaN fails the number node");
    assert_eq!(error.issues()[0].code, IssueCode::InvalidType);
    assert_eq!(error.issues()[0].message, "Expected number, received nan");
}

#[tokio::test]
async fn single_value_becomes_array() {
    let schema = coerce(&Schema::object([("tags", Schema::array(Schema::string()))]));
    let parsed = schema
        .parse_async(form([("tags", Value::from("a"))]))
        .await
        .expect("single tag coerces");
    assert_eq!(parsed, form([("tags", Value::Array(vec![Value::from("a")]))]));

    let empty = schema
        .parse_async(form([]))
        .await
        .expect("missing tags become empty");
    assert_eq!(empty, form([("tags", Value::Array(vec![]))]));
}

#[tokio::test]
async fn array_elements_are_coerced() {
    let schema = coerce(&Schema::array(Schema::number()));
    let parsed = schema
        .parse_async(Value::Array(vec![Value::from("1"), Value::from("2")]))
        .await
        .expect("elements coerce");
    assert_eq!(
        parsed,
        Value::Array(vec![Value::Number(1.0), Value::Number(2.0)])
    );
}

#[tokio::test]
async fn checkbox_on_is_true_and_other_strings_fail() {
    let schema = coerce(&Schema::object([("flag", Schema::boolean())]));
    let parsed = schema
        .parse_async(form([("flag", Value::from("on"))]))
        .await
        .expect("on is true");
    assert_eq!(parsed, form([("flag", Value::Bool(true))]));

    let error = schema
        .parse_async(form([("flag", Value::from("off"))]))
        .await
        .expect_err("off stays a string");
    assert_eq!(
        error.issues()[0].message,
        "Expected boolean, received string"
    );
}

#[tokio::test]
async fn dates_and_bigints_are_parsed() {
    let schema = coerce(&Schema::object([
        ("at", Schema::date()),
        ("big", Schema::bigint()),
    ]));
    let parsed = schema
        .parse_async(form([
            ("at", Value::from("2024-01-02")),
            ("big", Value::from("99999999999999999999")),
        ]))
        .await
        .expect("date and bigint coerce");
    assert_eq!(
        parsed,
        form([
            ("at", Value::Date(datetime!(2024-01-02 0:00 UTC))),
            ("big", Value::BigInt(99_999_999_999_999_999_999)),
        ])
    );

    let error = schema
        .parse_async(form([
            ("at", Value::from("tomorrow")),
            ("big", Value::from("1")),
        ]))
        .await
        .expect_err("bad date keeps the string");
    assert_eq!(error.issues()[0].message, "Expected date, received string");
}

#[tokio::test]
async fn optional_fields_treat_empty_input_as_absent() {
    let schema = coerce(&Schema::object([
        ("nickname", Schema::string().optional()),
        ("avatar", Schema::file().optional()),
    ]));
    let parsed = schema
        .parse_async(form([
            ("nickname", Value::from("")),
            ("avatar", Value::File(FileBlob::empty())),
        ]))
        .await
        .expect("empty optional input is absent");
    assert_eq!(parsed, form([]));
}

#[tokio::test]
async fn optional_and_default_normalize_file_and_array_inners() {
    let schema = coerce(&Schema::object([
        ("uploads", Schema::array(Schema::file()).optional()),
        (
            "tags",
            Schema::array(Schema::string()).default_value(vec![Value::from("general")]),
        ),
    ]));

    let parsed = schema
        .parse_async(form([
            ("uploads", Value::File(FileBlob::empty())),
            ("tags", Value::from("")),
        ]))
        .await
        .expect("empty inputs fall back");
    assert_eq!(
        parsed,
        form([("tags", Value::Array(vec![Value::from("general")]))])
    );

    let upload = Value::File(FileBlob::new("a.png", 3));
    let parsed = schema
        .parse_async(form([
            ("uploads", upload.clone()),
            ("tags", Value::from("news")),
        ]))
        .await
        .expect("single values are wrapped");
    assert_eq!(
        parsed,
        form([
            ("tags", Value::Array(vec![Value::from("news")])),
            ("uploads", Value::Array(vec![upload])),
        ])
    );
}

#[tokio::test]
async fn file_leaf_accepts_uploads_and_rejects_empty_ones() {
    let schema = coerce(&Schema::object([("upload", Schema::file())]));
    let upload = Value::File(FileBlob::new("cv.pdf", 12).with_content_type("application/pdf"));
    let parsed = schema
        .parse_async(form([("upload", upload.clone())]))
        .await
        .expect("real upload passes");
    assert_eq!(parsed, form([("upload", upload)]));

    let error = schema
        .parse_async(form([("upload", Value::File(FileBlob::empty()))]))
        .await
        .expect_err("empty upload is missing");
    assert!(error.has_issue_at(&["upload"]));
}

#[tokio::test]
async fn file_normalization_is_skipped_without_file_inputs() {
    let options = CoerceOptions::new().with_file_inputs(false);
    let schema = coerce_with(&Schema::object([("upload", Schema::file())]), &options);
    let empty = Value::File(FileBlob::empty());
    let parsed = schema
        .parse_async(form([("upload", empty.clone())]))
        .await
        .expect("empty upload passes through untouched");
    assert_eq!(parsed, form([("upload", empty)]));
}

#[tokio::test]
async fn discriminated_union_options_are_coerced() {
    let schema = Schema::discriminated_union(
        "kind",
        vec![
            Schema::object([("kind", Schema::literal("age")), ("value", Schema::number())]),
            Schema::object([("kind", Schema::literal("name")), ("value", Schema::string())]),
        ],
    )
    .expect("union builds");
    let parsed = coerce(&schema)
        .parse_async(form([
            ("kind", Value::from("age")),
            ("value", Value::from("30")),
        ]))
        .await
        .expect("age option coerces");
    assert_eq!(parsed.get("value"), Some(&Value::Number(30.0)));
}

#[tokio::test]
async fn nested_wrappers_are_coerced() {
    let schema = coerce(&Schema::object([
        ("pair", Schema::tuple(vec![Schema::number(), Schema::boolean()])),
        ("maybe", Schema::number().nullable()),
        ("either", Schema::union(vec![Schema::number(), Schema::boolean()])),
        ("fallback", Schema::number().catch(-1)),
        (
            "piped",
            Schema::string().pipe(Schema::string()),
        ),
    ]));
    let parsed = schema
        .parse_async(form([
            (
                "pair",
                Value::Array(vec![Value::from("1"), Value::from("on")]),
            ),
            ("maybe", Value::Null),
            ("either", Value::from("on")),
            ("fallback", Value::from("x")),
            ("piped", Value::from("p")),
        ]))
        .await
        .expect("nested nodes coerce");
    assert_eq!(
        parsed,
        form([
            ("either", Value::Bool(true)),
            ("fallback", Value::Number(-1.0)),
            ("maybe", Value::Null),
            (
                "pair",
                Value::Array(vec![Value::Number(1.0), Value::Bool(true)])
            ),
            ("piped", Value::from("p")),
        ])
    );
}

#[tokio::test]
async fn intersection_sides_are_coerced_independently() {
    let schema = coerce(&Schema::intersection(
        Schema::object([("a", Schema::number())]),
        Schema::object([("b", Schema::boolean())]),
    ));
    let parsed = schema
        .parse_async(form([("a", Value::from("1")), ("b", Value::from("on"))]))
        .await
        .expect("both sides coerce");
    assert_eq!(
        parsed,
        form([("a", Value::Number(1.0)), ("b", Value::Bool(true))])
    );

    let error = schema
        .parse_async(form([("a", Value::from("1")), ("b", Value::from("off"))]))
        .await
        .expect_err("right side still rejects off");
    assert!(error.has_issue_at(&["b"]));
}

static CATEGORY: LazyLock<Schema> = LazyLock::new(|| {
    Schema::object([
        ("name", Schema::string()),
        ("depth", Schema::number()),
        ("children", Schema::array(Schema::lazy(|| CATEGORY.clone()))),
    ])
});

#[tokio::test]
async fn cyclic_lazy_schema_terminates_and_coerces_every_level() {
    let schema = coerce(&CATEGORY);
    let input = form([
        ("name", Value::from("root")),
        ("depth", Value::from("0")),
        (
            "children",
            form([
                ("name", Value::from("child")),
                ("depth", Value::from("1")),
            ]),
        ),
    ]);

    let parsed = schema.parse_async(input).await.expect("tree coerces");
    let child = form([
        ("children", Value::Array(vec![])),
        ("depth", Value::Number(1.0)),
        ("name", Value::from("child")),
    ]);
    assert_eq!(
        parsed,
        form([
            ("children", Value::Array(vec![child])),
            ("depth", Value::Number(0.0)),
            ("name", Value::from("root")),
        ])
    );
}

/// Builds a new lazy node on every call, unlike `CATEGORY`.
fn tree() -> Schema {
    Schema::object([
        ("name", Schema::string()),
        ("depth", Schema::number()),
        ("children", Schema::array(Schema::lazy(tree)).optional()),
    ])
}

#[tokio::test]
async fn recursive_producer_is_expanded_only_as_deep_as_the_input() {
    let schema = coerce(&tree());
    let input = form([
        ("name", Value::from("root")),
        ("depth", Value::from("0")),
        (
            "children",
            form([
                ("name", Value::from("leaf")),
                ("depth", Value::from("1")),
                (
                    "children",
                    form([
                        ("name", Value::from("deepest")),
                        ("depth", Value::from("2")),
                    ]),
                ),
            ]),
        ),
    ]);

    let parsed = schema.parse_async(input).await.expect("tree coerces");
    let deepest = form([
        ("depth", Value::Number(2.0)),
        ("name", Value::from("deepest")),
    ]);
    let leaf = form([
        ("children", Value::Array(vec![deepest])),
        ("depth", Value::Number(1.0)),
        ("name", Value::from("leaf")),
    ]);
    assert_eq!(
        parsed,
        form([
            ("children", Value::Array(vec![leaf])),
            ("depth", Value::Number(0.0)),
            ("name", Value::from("root")),
        ])
    );
}

#[test]
fn memo_maps_each_source_node_to_one_counterpart() {
    let shared = Schema::number();
    let schema = Schema::object([("a", shared.clone()), ("b", shared.clone())]);

    let memo = CoercionMemo::new();
    let coerced = transform(&schema, &memo, &CoerceOptions::default());
    let shape = coerced.object_shape().expect("object stays an object");
    let a = shape.field("a").expect("a is kept");
    let b = shape.field("b").expect("b is kept");

    assert!(a.same_node(b));
    assert!(memo.get(&shared).expect("shared node memoized").same_node(a));
    assert_eq!(memo.len(), 2);
}

#[test]
fn identity_kinds_are_returned_unchanged() {
    let any = Schema::any();
    let memo = CoercionMemo::new();
    let coerced = transform(&any, &memo, &CoerceOptions::default());
    assert!(coerced.same_node(&any));
    assert!(memo.is_empty());
}

#[test]
fn cyclic_schema_maps_to_single_counterpart() {
    let memo = CoercionMemo::new();
    let coerced = transform(&CATEGORY, &memo, &CoerceOptions::default());

    let children = coerced
        .object_shape()
        .and_then(|shape| shape.field("children"))
        .expect("children field");
    let array = assert_matches!(children.kind(), SchemaKind::Effects { inner, .. } => inner.clone());
    let element = assert_matches!(array.kind(), SchemaKind::Array(element) => element.clone());
    assert_matches!(element.kind(), SchemaKind::Lazy(lazy) if !lazy.is_resolved());
    let target = assert_matches!(element.kind(), SchemaKind::Lazy(lazy) => lazy.resolve().clone());
    assert!(target.same_node(&coerced));
}

#[tokio::test]
async fn coercing_twice_keeps_validation_behavior() {
    let schema = Schema::object([
        ("count", Schema::number()),
        ("tags", Schema::array(Schema::string())),
        ("flag", Schema::boolean().optional()),
        ("upload", Schema::file().optional()),
    ]);
    let once = coerce(&schema);
    let twice = coerce(&once);

    let inputs = [
        form([("count", Value::from("3")), ("tags", Value::from("x"))]),
        form([("count", Value::from("")), ("flag", Value::from("on"))]),
        form([
            ("count", Value::from("1")),
            ("flag", Value::from("off")),
            ("upload", Value::File(FileBlob::empty())),
        ]),
        form([("count", Value::Number(2.0)), ("tags", Value::Array(vec![]))]),
    ];

    for input in inputs {
        let first = once.parse_async(input.clone()).await;
        let second = twice.parse_async(input).await;
        assert_eq!(first, second);
    }
}
