//! HTTP tests: the router driven in-process over the in-memory repository.

use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use chrono::Utc;
use serde_json::{json, Value};
use tower::ServiceExt;

use nextkala::api::{router, AppState};
use nextkala::persistence::MenuRecord;
use nextkala::{DepthLimit, InMemoryMenuRepository, ItemPayload, Label, MenuItem, MenuItemId, MenuRepository};

fn item(id: &str, parent: Option<&str>, order: usize, label: &str) -> MenuItem {
    MenuItem::new(MenuItemId::from(id), parent.map(MenuItemId::from), order, ItemPayload::new(Label::new(label).unwrap()))
}

/// `main` menu: خانه, فروشگاه (-> مردانه, زنانه), تماس
async fn seeded() -> (InMemoryMenuRepository, Router) {
    let repo = InMemoryMenuRepository::new();
    let now = Utc::now();
    let record = MenuRecord { id: "main".into(), name: "منوی اصلی".into(), slug: "main".into(), created_at: now, updated_at: now };
    repo.insert_menu(
        record,
        vec![
            item("home", None, 0, "خانه"),
            item("shop", None, 1, "فروشگاه"),
            item("men", Some("shop"), 0, "مردانه"),
            item("women", Some("shop"), 1, "زنانه"),
            item("contact", None, 2, "تماس"),
        ],
    )
    .await;
    let app = router(AppState::new(repo.clone(), DepthLimit::new(3)));
    (repo, app)
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder.header("content-type", "application/json").body(Body::from(body.to_string())).unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
    (status, value)
}

async fn stored_shape(repo: &InMemoryMenuRepository) -> Vec<(String, Option<String>, usize)> {
    let mut items: Vec<_> = repo
        .load_items("main")
        .await
        .unwrap()
        .into_iter()
        .map(|item| (item.id.to_string(), item.parent_id.map(|p| p.to_string()), item.order))
        .collect();
    items.sort();
    items
}

#[tokio::test]
async fn test_health() {
    let (_, app) = seeded().await;
    let (status, body) = send(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_create_and_list_menus() {
    let (_, app) = seeded().await;
    let (status, body) = send(&app, Method::POST, "/api/v1/menus", Some(json!({"name": "Footer Links"}))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["slug"], "footer-links");

    let (status, _) = send(&app, Method::POST, "/api/v1/menus", Some(json!({"name": "Footer links", "slug": "footer-links"}))).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(&app, Method::POST, "/api/v1/menus", Some(json!({"name": ""}))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (_, body) = send(&app, Method::GET, "/api/v1/menus", None).await;
    assert_eq!(body.as_array().map(Vec::len), Some(2));
}

#[tokio::test]
async fn test_tree_exposes_depth_per_row() {
    let (_, app) = seeded().await;
    let (status, body) = send(&app, Method::GET, "/api/v1/menus/main/tree", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["levels"], 2);
    assert_eq!(body["max_levels"], 3);
    assert_eq!(body["dirty"], false);
    assert!(body["updated_at"].is_string());
    assert_eq!(body["items"][1]["children"][1]["id"], "women");
    let rows: Vec<(String, u64)> = body["rows"]
        .as_array()
        .unwrap()
        .iter()
        .map(|row| (row["id"].as_str().unwrap().to_string(), row["depth"].as_u64().unwrap()))
        .collect();
    assert_eq!(
        rows,
        vec![("home".into(), 0), ("shop".into(), 0), ("men".into(), 1), ("women".into(), 1), ("contact".into(), 0)]
    );
}

#[tokio::test]
async fn test_unknown_menu_is_404() {
    let (_, app) = seeded().await;
    let (status, _) = send(&app, Method::GET, "/api/v1/menus/nope/tree", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_create_item_appends_to_parent() {
    let (repo, app) = seeded().await;
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/v1/menus/main/items",
        Some(json!({"label": "بچگانه", "parent_id": "shop", "url": "/shop/kids"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["parent_id"], "shop");
    assert_eq!(body["order"], 2);
    assert_eq!(body["payload"]["link_kind"], "custom");
    assert_eq!(repo.load_items("main").await.unwrap().len(), 6);

    let (status, _) = send(&app, Method::POST, "/api/v1/menus/main/items", Some(json!({"label": "x", "parent_id": "ghost"}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, Method::POST, "/api/v1/menus/main/items", Some(json!({"label": "  "}))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = send(&app, Method::POST, "/api/v1/menus/main/items", Some(json!({"label": "محصول", "link_kind": "product"}))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_update_item_keeps_position() {
    let (repo, app) = seeded().await;
    let before = stored_shape(&repo).await;
    let (status, body) = send(
        &app,
        Method::PUT,
        "/api/v1/menus/main/items/contact",
        Some(json!({"label": "تماس با ما", "target_window": "_blank"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["payload"]["label"], "تماس با ما");
    assert_eq!(stored_shape(&repo).await, before);

    let (status, _) = send(&app, Method::PUT, "/api/v1/menus/main/items/ghost", Some(json!({"label": "x"}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_removes_subtree_and_renumbers() {
    let (repo, app) = seeded().await;
    let (status, body) = send(&app, Method::DELETE, "/api/v1/menus/main/items/shop", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["removed"], json!(["shop", "men", "women"]));
    assert_eq!(stored_shape(&repo).await, vec![("contact".into(), None, 1), ("home".into(), None, 0)]);
}

#[tokio::test]
async fn test_move_is_previewed_not_persisted() {
    let (repo, app) = seeded().await;
    let before = stored_shape(&repo).await;
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/v1/menus/main/moves",
        Some(json!({"source": "contact", "target": {"type": "container", "parent": "shop"}})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "moved");
    assert_eq!(body["plan"]["affordance"], json!({"action": "nest", "parent": "shop"}));
    assert_eq!(body["items"][1]["children"][2]["id"], "contact");
    assert_eq!(stored_shape(&repo).await, before);
}

#[tokio::test]
async fn test_move_into_own_subtree_is_rejected() {
    let (_, app) = seeded().await;
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/v1/menus/main/moves",
        Some(json!({"source": "shop", "target": {"type": "container", "parent": "men"}})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body, Value::String("cannot move item into its own subtree".into()));
}

#[tokio::test]
async fn test_move_onto_self_is_unchanged() {
    let (_, app) = seeded().await;
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/v1/menus/main/moves",
        Some(json!({"source": "home", "target": {"type": "sibling", "item": "home", "placement": "before"}})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"outcome": "unchanged", "reason": "dropped_on_self"}));
}

#[tokio::test]
async fn test_save_ordering_persists_full_ordering() {
    let (repo, app) = seeded().await;
    let ordering = json!({"items": [
        {"id": "contact", "parent_id": null, "order": 0},
        {"id": "home", "parent_id": null, "order": 1},
        {"id": "shop", "parent_id": "home", "order": 0},
        {"id": "men", "parent_id": "shop", "order": 0},
        {"id": "women", "parent_id": "shop", "order": 1},
    ]});
    let (status, body) = send(&app, Method::PUT, "/api/v1/menus/main/ordering", Some(ordering)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["dirty"], false);
    assert_eq!(body["levels"], 3);
    assert_eq!(
        stored_shape(&repo).await,
        vec![
            ("contact".into(), None, 0),
            ("home".into(), None, 1),
            ("men".into(), Some("shop".into()), 0),
            ("shop".into(), Some("home".into()), 0),
            ("women".into(), Some("shop".into()), 1),
        ]
    );
}

#[tokio::test]
async fn test_save_ordering_rejects_partial_cyclic_or_too_deep() {
    let (repo, app) = seeded().await;
    let before = stored_shape(&repo).await;

    let partial = json!({"items": [{"id": "home", "parent_id": null, "order": 0}]});
    let (status, _) = send(&app, Method::PUT, "/api/v1/menus/main/ordering", Some(partial)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let cyclic = json!({"items": [
        {"id": "home", "parent_id": null, "order": 0},
        {"id": "shop", "parent_id": "men", "order": 0},
        {"id": "men", "parent_id": "shop", "order": 0},
        {"id": "women", "parent_id": "shop", "order": 1},
        {"id": "contact", "parent_id": null, "order": 1},
    ]});
    let (status, _) = send(&app, Method::PUT, "/api/v1/menus/main/ordering", Some(cyclic)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let too_deep = json!({"items": [
        {"id": "home", "parent_id": null, "order": 0},
        {"id": "shop", "parent_id": "home", "order": 0},
        {"id": "men", "parent_id": "shop", "order": 0},
        {"id": "women", "parent_id": "men", "order": 0},
        {"id": "contact", "parent_id": null, "order": 1},
    ]});
    let (status, body) = send(&app, Method::PUT, "/api/v1/menus/main/ordering", Some(too_deep)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body, Value::String("menu cannot be nested deeper than 3 levels".into()));

    assert_eq!(stored_shape(&repo).await, before);
}

#[tokio::test]
async fn test_menu_stored_deeper_than_the_limit_is_lifted_and_saveable() {
    let (repo, _) = seeded().await;
    let flat = router(AppState::new(repo.clone(), DepthLimit::new(1)));
    let (status, body) = send(&flat, Method::GET, "/api/v1/menus/main/tree", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["dirty"], true);
    assert_eq!(body["levels"], 1);
    let ids: Vec<&str> = body["items"].as_array().unwrap().iter().map(|node| node["id"].as_str().unwrap()).collect();
    assert_eq!(ids, vec!["home", "shop", "contact", "men", "women"]);

    let ordering: Vec<Value> = body["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|node| json!({"id": node["id"], "parent_id": node["parent_id"], "order": node["order"]}))
        .collect();
    let (status, body) = send(&flat, Method::PUT, "/api/v1/menus/main/ordering", Some(json!({"items": ordering}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["dirty"], false);
    assert!(stored_shape(&repo).await.iter().all(|(_, parent, _)| parent.is_none()));
}

#[tokio::test]
async fn test_storage_failure_is_500() {
    let (repo, app) = seeded().await;
    repo.set_unavailable(true);
    let ordering = json!({"items": [
        {"id": "home", "parent_id": null, "order": 0},
        {"id": "shop", "parent_id": null, "order": 1},
        {"id": "men", "parent_id": "shop", "order": 0},
        {"id": "women", "parent_id": "shop", "order": 1},
        {"id": "contact", "parent_id": null, "order": 2},
    ]});
    let (status, _) = send(&app, Method::PUT, "/api/v1/menus/main/ordering", Some(ordering)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}
