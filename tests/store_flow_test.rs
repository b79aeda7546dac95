use potion_client::store::search;
use potion_client::{
    ClientConfig, FetchOptions, Method, MockTransport, PotionClient, PotionError, QueryOptions,
    Resource,
};
use serde_json::json;
use std::sync::Arc;

struct Widget;

impl Resource for Widget {
    const URI: &'static str = "/widget";
    const READONLY: &'static [&'static str] = &["createdAt"];
}

struct Owner;

impl Resource for Owner {
    const URI: &'static str = "/owner";
}

fn setup(mock: &MockTransport) -> PotionClient {
    let client =
        PotionClient::with_config(mock.clone(), ClientConfig::default().with_prefix("/api"));
    client.register_as::<Widget>();
    client.register_as::<Owner>();
    client
}

/// Full flow through a store: paginated query with shared references,
/// local edits saved back, a new item created and one destroyed.
#[tokio::test]
async fn test_widget_lifecycle_through_store() {
    let mock = MockTransport::new();
    mock.expect(Method::Get, "/api/widget")
        .with_total_count(2)
        .return_ok(json!([
            {
                "$uri": "/api/widget/1",
                "name": "one",
                "owner": {"$ref": "/api/owner/9"},
                "created_at": {"$date": 1_500_000_000_000i64}
            },
            {"$uri": "/api/widget/2", "name": "two", "owner": {"$ref": "/api/owner/9"}}
        ]));
    mock.expect(Method::Get, "/api/owner/9")
        .return_ok(json!({"$uri": "/api/owner/9", "full_name": "Ada"}));
    mock.expect(Method::Patch, "/api/widget/1")
        .return_ok(json!({"$uri": "/api/widget/1", "name": "renamed"}));
    mock.expect(Method::Post, "/api/widget")
        .return_ok(json!({"$uri": "/api/widget/3", "name": "three"}));
    mock.expect(Method::Delete, "/api/widget/3").return_ok(json!(null));

    let client = setup(&mock);
    let widgets = client.store_of::<Widget>().expect("Widget is registered");

    // Query
    let page = widgets
        .query(None, QueryOptions::paginated())
        .await
        .expect("Failed to query widgets")
        .into_page()
        .expect("Paginated query returns a page");
    assert_eq!(page.total(), 2);
    assert_eq!(page.pages(), 1);

    let items: Vec<_> = page.iter().filter_map(|v| v.into_item()).collect();
    assert_eq!(items.len(), 2);
    let first = items[0].clone();

    // Both widgets share the one owner instance, fetched once
    let owner_a = first.get("owner").and_then(|v| v.into_item()).unwrap();
    let owner_b = items[1].get("owner").and_then(|v| v.into_item()).unwrap();
    assert!(Arc::ptr_eq(&owner_a, &owner_b));
    assert_eq!(owner_a.get_as::<String>("fullName").unwrap().as_deref(), Some("Ada"));
    assert_eq!(
        first.get("createdAt").and_then(|v| v.as_date().map(|d| d.timestamp_millis())),
        Some(1_500_000_000_000)
    );

    // Update: read-only properties stay local, links go out as stubs
    first.set("name", "renamed");
    let saved = first.save().await.expect("Failed to save widget");
    assert!(Arc::ptr_eq(&saved, &first));
    assert_eq!(
        mock.calls()[2].options.data,
        Some(json!({"name": "renamed", "owner": {"$ref": "/api/owner/9"}}))
    );

    // Create
    let draft = widgets.create(search([("name", "three")]));
    assert!(draft.uri().is_none());
    let created = draft.save().await.expect("Failed to create widget");
    assert_eq!(created.uri().as_deref(), Some("/widget/3"));
    assert!(Arc::ptr_eq(&created, &client.cached("/widget/3").unwrap()));

    // Destroy
    created.destroy().await.expect("Failed to destroy widget");
    assert!(client.cached("/api/widget/3").is_none());

    assert_eq!(mock.call_count(), 5);
    mock.verify();
}

/// Custom routes decode like any other response, and `$ref`s to cached
/// items are answered without a request.
#[tokio::test]
async fn test_item_route_uses_cached_references() {
    let mock = MockTransport::new();
    mock.expect(Method::Get, "/api/widget")
        .return_ok(json!([{"$uri": "/api/widget/1"}, {"$uri": "/api/widget/2"}]));
    mock.expect(Method::Get, "/api/widget/1/siblings")
        .return_ok(json!([{"$ref": "/api/widget/2"}]));

    let client = setup(&mock);
    let widgets = client.store_of::<Widget>().unwrap();
    let all = widgets
        .query(None, QueryOptions::default())
        .await
        .unwrap()
        .into_value();
    let first = all.as_array().unwrap()[0].as_item().unwrap().clone();

    let siblings = first
        .route(Method::Get, "siblings", FetchOptions::default())
        .await
        .expect("Failed to call route")
        .into_value();
    let sibling = siblings.as_array().unwrap()[0].as_item().unwrap();
    assert_eq!(sibling.uri().as_deref(), Some("/widget/2"));
    assert_eq!(mock.call_count(), 2);
    mock.verify();
}

/// Transport failures surface as normalized errors and leave the client usable.
#[tokio::test]
async fn test_transport_failure_is_scoped_to_the_call() {
    let mock = MockTransport::new();
    mock.expect(Method::Get, "/api/widget/5")
        .return_err(potion_client::TransportError::Other);
    mock.expect(Method::Get, "/api/widget/5")
        .return_ok(json!({"$uri": "/api/widget/5"}));

    let client = setup(&mock);
    let widgets = client.store_of::<Widget>().unwrap();

    let err = widgets.fetch(5, false).await.unwrap_err();
    assert_eq!(
        err,
        PotionError::Request {
            uri: "/api/widget/5".into(),
            message: "could not retrieve resource from /api/widget/5".into(),
        }
    );

    let item = widgets.fetch(5, false).await.expect("Retry should succeed");
    assert_eq!(item.id().map(|id| id.to_string()).as_deref(), Some("5"));
    mock.verify();
}

/// Items and stores outlive their client only as far as reads go.
#[tokio::test]
async fn test_dropped_client_closes_items() {
    let mock = MockTransport::new();
    mock.expect(Method::Get, "/api/widget/1")
        .return_ok(json!({"$uri": "/api/widget/1", "name": "one"}));

    let client = setup(&mock);
    let item = client
        .store_of::<Widget>()
        .unwrap()
        .fetch(1, false)
        .await
        .unwrap();
    drop(client);

    assert_eq!(item.get("name").and_then(|v| v.as_str().map(str::to_string)).as_deref(), Some("one"));
    assert_eq!(item.save().await.unwrap_err(), PotionError::ClientClosed);
}
