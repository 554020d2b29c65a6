use connect_query_core::{
    InfiniteData, InfiniteUpdate, InfiniteUpdateError, InfiniteUpdater, MessageInit,
    MessageInitError, Updater,
    create_protobuf_safe_infinite_updater, create_protobuf_safe_updater, is_message,
};
use eliza_service::message;
use prost_reflect::{DynamicMessage, MessageDescriptor, Value};
use serde_json::json;

fn from_json(desc: &MessageDescriptor, json: serde_json::Value) -> DynamicMessage {
    MessageInit::Json(json)
        .into_message(desc)
        .expect("Invalid test message")
}

#[test]
fn test_json_partial_becomes_valid_instance() {
    let schema = message("pagination.v1.ListResponse");
    let prev = from_json(&schema, json!({ "page": "1", "items": ["a"], "nextPage": "2" }));

    let next = create_protobuf_safe_updater(&schema, json!({ "items": ["b", "c"] }).into())(
        Some(&prev),
    )
    .unwrap()
    .unwrap();

    assert!(is_message(&next, &schema));
    assert_eq!(
        next.get_field_by_name("items").unwrap().as_list().unwrap(),
        &[Value::String("b".into()), Value::String("c".into())]
    );
    // Layered over the defaults, not over `prev`.
    assert_eq!(next.get_field_by_name("page").unwrap().as_i64(), Some(0));
    assert!(!next.has_field_by_name("next_page"));
}

#[test]
fn test_valid_instance_is_returned_unchanged() {
    let schema = message("connectrpc.eliza.v1.SayResponse");
    let value = from_json(&schema, json!({ "sentence": "hello" }));

    let next = create_protobuf_safe_updater(&schema, value.clone().into())(None)
        .unwrap()
        .unwrap();

    assert_eq!(next, value);
}

#[test]
fn test_clear_removes_value() {
    let schema = message("connectrpc.eliza.v1.SayResponse");
    let prev = from_json(&schema, json!({ "sentence": "hello" }));

    let next = create_protobuf_safe_updater(&schema, Updater::Clear)(Some(&prev)).unwrap();

    assert_eq!(next, None);
}

#[test]
fn test_fn_updater_sees_previous_value() {
    let schema = message("connectrpc.eliza.v1.SayResponse");
    let prev = from_json(&schema, json!({ "sentence": "hello" }));

    let updater = Updater::from_fn(|prev| {
        let sentence = prev?.get_field_by_name("sentence")?.as_str()?.to_uppercase();
        Some(json!({ "sentence": sentence }).into())
    });
    let next = create_protobuf_safe_updater(&schema, updater)(Some(&prev))
        .unwrap()
        .unwrap();

    assert_eq!(
        next.get_field_by_name("sentence").unwrap().as_str(),
        Some("HELLO")
    );
}

#[test]
fn test_fn_updater_gets_none_on_first_population() {
    let schema = message("connectrpc.eliza.v1.SayResponse");
    let mut seen = None;

    let updater = Updater::from_fn(|prev| {
        seen = Some(prev.is_none());
        None
    });
    let next = create_protobuf_safe_updater(&schema, updater)(None).unwrap();

    assert_eq!(next, None);
    assert_eq!(seen, Some(true));
}

#[test]
fn test_invalid_json_is_rejected() {
    let schema = message("connectrpc.eliza.v1.SayResponse");

    let result = create_protobuf_safe_updater(&schema, json!({ "unknown": 1 }).into())(None);
    match result {
        Err(MessageInitError::InvalidJson { message, .. }) => {
            assert_eq!(message, "connectrpc.eliza.v1.SayResponse")
        }
        other => panic!("Expected an invalid JSON error, got {other:?}"),
    }

    let result = create_protobuf_safe_updater(&schema, json!({ "sentence": 5 }).into())(None);
    assert!(matches!(result, Err(MessageInitError::InvalidJson { .. })));
}

#[test]
fn test_other_message_type_is_converted() {
    let request = from_json(
        &message("connectrpc.eliza.v1.SayRequest"),
        json!({ "sentence": "hi" }),
    );
    let schema = message("connectrpc.eliza.v1.SayResponse");

    let next = create_protobuf_safe_updater(&schema, request.into())(None)
        .unwrap()
        .unwrap();

    assert!(is_message(&next, &schema));
    assert_eq!(next.get_field_by_name("sentence").unwrap().as_str(), Some("hi"));
}

#[test]
fn test_incompatible_message_type_is_rejected() {
    let request = from_json(
        &message("connectrpc.eliza.v1.IntroduceRequest"),
        json!({ "name": "Eliza" }),
    );
    let schema = message("connectrpc.eliza.v1.SayResponse");

    let result = create_protobuf_safe_updater(&schema, request.into())(None);

    match result {
        Err(MessageInitError::Conversion { from, to, .. }) => {
            assert_eq!(from, "connectrpc.eliza.v1.IntroduceRequest");
            assert_eq!(to, "connectrpc.eliza.v1.SayResponse");
        }
        other => panic!("Expected a conversion error, got {other:?}"),
    }
}

#[test]
fn test_infinite_pages_are_revalidated() {
    let schema = message("pagination.v1.ListResponse");
    let page = from_json(&schema, json!({ "page": "0", "items": ["a"] }));

    let update = InfiniteUpdate::new(
        [
            MessageInit::Message(page.clone()),
            MessageInit::Json(json!({ "page": "1" })),
        ],
        [Value::I64(0), Value::I64(1)],
    );
    let next = create_protobuf_safe_infinite_updater(&schema, update.into())(None)
        .unwrap()
        .unwrap();

    assert_eq!(next.pages.len(), 2);
    assert_eq!(next.pages[0], page);
    assert!(next.pages.iter().all(|page| is_message(page, &schema)));
    assert_eq!(next.pages[1].get_field_by_name("page").unwrap().as_i64(), Some(1));
    assert_eq!(next.page_params, vec![Value::I64(0), Value::I64(1)]);
}

#[test]
fn test_infinite_page_params_are_kept_or_replaced() {
    let schema = message("pagination.v1.ListResponse");
    let prev = InfiniteData {
        pages: vec![from_json(&schema, json!({ "page": "0" }))],
        page_params: vec![Value::I64(0)],
    };

    let kept = create_protobuf_safe_infinite_updater(
        &schema,
        InfiniteUpdate::pages([json!({ "page": "0", "items": ["x"] })]).into(),
    )(Some(&prev))
    .unwrap()
    .unwrap();
    assert_eq!(kept.page_params, vec![Value::I64(0)]);

    let replaced = create_protobuf_safe_infinite_updater(
        &schema,
        InfiniteUpdater::from_fn(|prev| {
            let prev = prev?;
            let mut pages: Vec<MessageInit> =
                prev.pages.iter().cloned().map(MessageInit::from).collect();
            pages.push(json!({ "page": "1" }).into());
            let mut page_params = prev.page_params.clone();
            page_params.push(Value::I64(1));
            Some(InfiniteUpdate {
                pages,
                page_params: Some(page_params),
            })
        }),
    )(Some(&prev))
    .unwrap()
    .unwrap();
    assert_eq!(replaced.pages.len(), 2);
    assert_eq!(replaced.page_params, vec![Value::I64(0), Value::I64(1)]);
}

#[test]
fn test_infinite_invalid_page_rejects_whole_update() {
    let schema = message("pagination.v1.ListResponse");

    let update = InfiniteUpdate::new(
        [json!({ "page": "0" }), json!({ "bogus": true })],
        [Value::I64(0), Value::I64(1)],
    );
    let result = create_protobuf_safe_infinite_updater(&schema, update.into())(None);

    assert!(matches!(
        result,
        Err(InfiniteUpdateError::InvalidPage(MessageInitError::InvalidJson { .. }))
    ));
}

#[test]
fn test_infinite_appended_page_needs_page_param() {
    let schema = message("pagination.v1.ListResponse");
    let prev = InfiniteData {
        pages: vec![from_json(&schema, json!({ "page": "0" }))],
        page_params: vec![Value::I64(0)],
    };

    let result = create_protobuf_safe_infinite_updater(
        &schema,
        InfiniteUpdater::from_fn(|prev| {
            let mut pages: Vec<MessageInit> =
                prev?.pages.iter().cloned().map(MessageInit::from).collect();
            pages.push(json!({ "page": "1" }).into());
            Some(InfiniteUpdate::pages(pages))
        }),
    )(Some(&prev));

    match result {
        Err(InfiniteUpdateError::PageParamsMismatch { pages, page_params }) => {
            assert_eq!((pages, page_params), (2, 1))
        }
        other => panic!("Expected a page params mismatch, got {other:?}"),
    }
}

#[test]
fn test_infinite_first_population_needs_page_params() {
    let schema = message("pagination.v1.ListResponse");

    let update = InfiniteUpdate::pages([json!({ "page": "0" })]);
    let result = create_protobuf_safe_infinite_updater(&schema, update.into())(None);

    assert!(matches!(
        result,
        Err(InfiniteUpdateError::PageParamsMismatch {
            pages: 1,
            page_params: 0
        })
    ));

    let empty = create_protobuf_safe_infinite_updater(&schema, InfiniteUpdate::default().into())(
        None,
    )
    .unwrap()
    .unwrap();
    assert_eq!(empty, InfiniteData::default());
}

#[test]
fn test_infinite_clear() {
    let schema = message("pagination.v1.ListResponse");
    let prev = InfiniteData::default();

    let next = create_protobuf_safe_infinite_updater(&schema, InfiniteUpdater::Clear)(Some(&prev))
        .unwrap();

    assert_eq!(next, None);
}
