#![cfg(feature = "http_api")]

use std::sync::Arc;

use axum::{
    body::{self, Body},
    http::{Request, StatusCode},
    response::Response,
};
use order_split::{
    AllocationOutcome, AllocationPolicy, AllocationResult, Contract, ExportBundle,
    MemoryCatalogStore, OrderSession, Resource, ResourceRegistry, http_api,
};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tower::util::ServiceExt;

fn new_router() -> axum::Router {
    let registry = ResourceRegistry::new(vec![
        Resource::new("A", "Alpha", false),
        Resource::new("B", "Beta", false),
        Resource::new("C", "Gamma", false),
    ])
    .unwrap();
    let session = OrderSession::new(registry, AllocationPolicy::default());
    let state = http_api::AppState::new(session, Arc::new(MemoryCatalogStore::new()));
    http_api::router(state)
}

async fn send(app: &axum::Router, method: &str, uri: &str, payload: Option<Value>) -> Response {
    let body = match payload {
        Some(value) => Body::from(serde_json::to_vec(&value).unwrap()),
        None => Body::empty(),
    };
    app.clone()
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .header("content-type", "application/json")
                .body(body)
                .unwrap(),
        )
        .await
        .unwrap()
}

async fn read_json<T: DeserializeOwned>(response: Response) -> T {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn create_and_stage(app: &axum::Router) -> Contract {
    let response = send(
        app,
        "POST",
        "/contracts",
        Some(json!({
            "name": "Cesta Básica",
            "items": [
                { "name": "Arroz", "unit": "kg", "unit_price": 10.0, "eligible_resources": ["A", "B", "C"] },
                { "name": "Feijão", "unit": "kg", "unit_price": 7.35, "eligible_resources": ["A", "B"] }
            ]
        })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let contract: Contract = read_json(response).await;

    let response = send(
        app,
        "PUT",
        "/session/contract",
        Some(json!({ "contract_id": contract.id })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(
        app,
        "PUT",
        "/session/quantities",
        Some(json!({ "quantities": [ { "item_id": contract.items[0].id, "quantity": 10 } ] })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(
        app,
        "PUT",
        "/session/resources",
        Some(json!({ "resources": ["A", "B", "C"] })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    contract
}

#[tokio::test]
async fn health_and_resources() {
    let app = new_router();
    let response = send(&app, "GET", "/health", None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(&app, "GET", "/resources", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let resources: Vec<Resource> = read_json(response).await;
    let ids: Vec<&str> = resources.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["A", "B", "C"]);
}

#[tokio::test]
async fn order_lifecycle_via_http_api() {
    let app = new_router();
    let contract = create_and_stage(&app).await;
    let rice = contract.items[0].id;

    let response = send(&app, "POST", "/session/allocation", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let outcome: AllocationOutcome = read_json(response).await;
    let result = outcome.result.expect("allocation result");
    assert_eq!(result.quantity_of("A", rice), 4);
    assert_eq!(result.quantity_of("B", rice), 3);
    assert_eq!(result.quantity_of("C", rice), 3);

    let response = send(
        &app,
        "POST",
        "/session/transfer",
        Some(json!({ "item_id": rice, "quantity": 2, "from": "A", "to": "B" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let moved: AllocationResult = read_json(response).await;
    assert_eq!(moved.quantity_of("A", rice), 2);
    assert_eq!(moved.quantity_of("B", rice), 5);

    let response = send(&app, "GET", "/session/allocation", None).await;
    let current: AllocationResult = read_json(response).await;
    assert_eq!(current, moved);

    let response = send(&app, "GET", "/session/export?date=2026-10-16", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let bundle: ExportBundle = read_json(response).await;
    assert_eq!(
        bundle.file_stem,
        "PEDIDOS CESTA BÁSICA - OUTUBRO DE 2026 - CONFERIR"
    );
    assert_eq!(bundle.sheets.len(), 3);
    assert!(bundle.consolidated.is_some());
}

#[tokio::test]
async fn rejected_transfer_returns_unprocessable_entity() {
    let app = new_router();
    let contract = create_and_stage(&app).await;
    let beans = contract.items[1].id;

    send(&app, "PUT", "/session/quantities", Some(json!({ "quantities": [ { "item_id": beans, "quantity": 4 } ] }))).await;
    send(&app, "POST", "/session/allocation", None).await;

    let response = send(
        &app,
        "POST",
        "/session/transfer",
        Some(json!({ "item_id": beans, "quantity": 1, "from": "A", "to": "C" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = read_json(response).await;
    assert_eq!(body["error"], "transfer_rejected");
}

#[tokio::test]
async fn unknown_item_quantity_leaves_staging_untouched() {
    let app = new_router();
    let contract = create_and_stage(&app).await;
    let rice = contract.items[0].id;

    let response = send(
        &app,
        "PUT",
        "/session/quantities",
        Some(json!({ "quantities": [
            { "item_id": rice, "quantity": 99 },
            { "item_id": 12345, "quantity": 1 }
        ] })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = send(&app, "POST", "/session/allocation", None).await;
    let outcome: AllocationOutcome = read_json(response).await;
    assert_eq!(outcome.result.unwrap().total_quantity_of(rice), 10);
}

#[tokio::test]
async fn deleting_a_contract_clears_the_session() {
    let app = new_router();
    let contract = create_and_stage(&app).await;
    send(&app, "POST", "/session/allocation", None).await;

    let uri = format!("/contracts/{}", contract.id);
    let response = send(&app, "DELETE", &uri, None).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = send(&app, "GET", &uri, None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = send(&app, "GET", "/session/allocation", None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = send(&app, "GET", "/contracts", None).await;
    let contracts: Vec<Contract> = read_json(response).await;
    assert!(contracts.is_empty());
}

#[tokio::test]
async fn invalid_contract_is_a_bad_request() {
    let app = new_router();
    let response = send(
        &app,
        "POST",
        "/contracts",
        Some(json!({
            "name": "Sem recursos",
            "items": [ { "name": "Sal", "unit": "kg", "unit_price": 2.0, "eligible_resources": ["Z"] } ]
        })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
