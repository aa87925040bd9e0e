use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use serde_json::{Value, json};
use tower::ServiceExt;

use leadsift::construct::{NewContact, PersistenceMode, TenantId};
use leadsift::filter::FilterPolicy;
use leadsift::interface::ContactInterface;
use leadsift::persist::Persistor;
use leadsift::server::{self, TENANT_HEADER};

fn app(expose_details: bool) -> (Router, Arc<ContactInterface>) {
    let tenant = TenantId::new("org_1");
    let persistor = Persistor::new(PersistenceMode::InMemory).unwrap();
    persistor
        .add_contact(&tenant, &NewContact::new("c1").email("a@x.com").lead_status("NEW"))
        .unwrap();
    persistor
        .add_contact(&tenant, &NewContact::new("c2").email("b@x.com").lead_status("NEW"))
        .unwrap();
    persistor.add_workflow_state("c2", "onboarding").unwrap();
    persistor.tag_contact(&tenant, "c1", "vip").unwrap();
    let interface = Arc::new(ContactInterface::new(persistor, FilterPolicy::Lenient));
    (server::router(Arc::clone(&interface), expose_details), interface)
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn list(query: &str) -> Request<Body> {
    Request::builder()
        .uri(format!("/v1/contacts{query}"))
        .header(TENANT_HEADER, "org_1")
        .body(Body::empty())
        .unwrap()
}

fn bulk_delete(body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/v1/contacts/bulk-delete")
        .header(TENANT_HEADER, "org_1")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn remaining(interface: &ContactInterface) -> Vec<String> {
    let persistor = interface.persistor();
    let persistor = persistor.lock().unwrap();
    persistor.contact_ids(&TenantId::new("org_1")).unwrap()
}

#[tokio::test]
async fn health_is_open() {
    let (app, _) = app(false);
    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn missing_tenant_is_unauthenticated() {
    let (app, _) = app(false);
    let request = Request::builder()
        .uri("/v1/contacts")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(app, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], json!("UNAUTHENTICATED"));
}

#[tokio::test]
async fn malformed_tenant_is_unauthenticated() {
    let (app, interface) = app(false);
    let request = Request::builder()
        .method("POST")
        .uri("/v1/contacts/bulk-delete")
        .header(TENANT_HEADER, "x".repeat(129))
        .header("content-type", "application/json")
        .body(Body::from(json!({"contactIds": ["c1"]}).to_string()))
        .unwrap();
    let (status, _) = send(app, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(remaining(&interface), vec!["c1", "c2"]);
}

#[tokio::test]
async fn opaque_tenant_ids_are_accepted_and_scoped() {
    let (app, _) = app(false);
    let request = Request::builder()
        .uri("/v1/contacts")
        .header(TENANT_HEADER, "acme.eu:tenant@1' or '1'='1")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));

    let (app, _) = self::app(false);
    let request = Request::builder()
        .uri("/v1/contacts")
        .header(TENANT_HEADER, "   ")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(app, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn list_without_filters_returns_every_contact() {
    let (app, _) = app(false);
    let (status, body) = send(app, list("")).await;
    assert_eq!(status, StatusCode::OK);
    let rows = body.as_array().unwrap();
    assert_eq!(rows.len(), 2);
    for row in rows {
        assert!(row["tags"].is_array());
    }
}

#[tokio::test]
async fn list_applies_url_encoded_filters_and_search() {
    let filters = json!({
        "conditions": [{"field": "email", "operator": "contains", "value": "a@"}],
        "logicalOperator": "AND"
    });
    let query = format!("?filters={}", urlencoding::encode(&filters.to_string()));
    let (app, _) = app(false);
    let (status, body) = send(app, list(&query)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["id"], json!("c1"));
    assert_eq!(body[0]["tags"], json!(["vip"]));

    let (app, _) = self::app(false);
    let (_, body) = send(app, list("?search=b%40x")).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["id"], json!("c2"));
}

#[tokio::test]
async fn list_ignores_unparsable_filters() {
    let (app, _) = app(false);
    let (status, body) = send(app, list("?filters=%7Bnope")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn bulk_delete_requires_ids_or_select_all() {
    let (app, _) = app(false);
    let (status, body) = send(app, bulk_delete(json!({"contactIds": []}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], json!("VALIDATION_FAILED"));

    let (app, _) = self::app(false);
    let (status, _) = send(app, bulk_delete(json!({"force": true}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn bulk_delete_rejects_malformed_json() {
    let (app, _) = app(false);
    let request = Request::builder()
        .method("POST")
        .uri("/v1/contacts/bulk-delete")
        .header(TENANT_HEADER, "org_1")
        .header("content-type", "application/json")
        .body(Body::from("{\"contactIds\": [1,"))
        .unwrap();
    let (status, body) = send(app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], json!("VALIDATION_FAILED"));
}

#[tokio::test]
async fn dependency_conflict_lists_the_blocking_contacts() {
    let (app, interface) = app(false);
    let (status, body) = send(app, bulk_delete(json!({"contactIds": ["c1", "c2"]}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], json!("DEPENDENCY_CONFLICT"));
    assert_eq!(body["contactIds"], json!(["c2"]));
    assert_eq!(remaining(&interface), vec!["c1", "c2"]);
}

#[tokio::test]
async fn forced_delete_succeeds_then_reruns_as_a_no_op() {
    let (app, interface) = app(false);
    let request = json!({"contactIds": ["c1", "c2", "ghost"], "force": true});
    let (status, body) = send(app.clone(), bulk_delete(request.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "message": "Successfully deleted 2 contacts",
            "deletedCount": 2,
            "invalidCount": 1
        })
    );
    assert!(remaining(&interface).is_empty());

    let (status, body) = send(app, bulk_delete(request)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "message": "Successfully deleted 0 contacts",
            "deletedCount": 0,
            "invalidCount": 0
        })
    );
}

#[tokio::test]
async fn select_all_without_matches_is_not_found() {
    let (app, interface) = app(false);
    let request = json!({
        "isSelectAllMatchingActive": true,
        "filterState": {
            "conditions": [{"field": "email", "operator": "equals", "value": null}]
        },
        "force": true
    });
    let (status, body) = send(app, bulk_delete(request)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], json!("NOT_FOUND"));
    assert_eq!(remaining(&interface), vec!["c1", "c2"]);
}

#[tokio::test]
async fn select_all_with_an_unknown_operator_is_rejected() {
    let (app, interface) = app(false);
    let request = json!({
        "isSelectAllMatchingActive": true,
        "filterState": {
            "conditions": [{"field": "email", "operator": "equal", "value": "a@x.com"}]
        },
        "force": true
    });
    let (status, body) = send(app, bulk_delete(request)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], json!("VALIDATION_FAILED"));
    assert_eq!(remaining(&interface), vec!["c1", "c2"]);
}

#[tokio::test]
async fn list_rejects_unknown_operators() {
    let filters = json!({
        "conditions": [{"field": "email", "operator": "like", "value": "a@"}]
    });
    let query = format!("?filters={}", urlencoding::encode(&filters.to_string()));
    let (app, _) = app(false);
    let (status, body) = send(app, list(&query)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], json!("VALIDATION_FAILED"));
}

#[tokio::test]
async fn select_all_matching_uses_the_body_filter() {
    let (app, interface) = app(false);
    let request = json!({
        "isSelectAllMatchingActive": true,
        "filterState": {
            "conditions": [{"field": "tags", "operator": "equals", "value": "vip"}],
            "logicalOperator": "AND"
        },
        "searchTerm": ""
    });
    let (status, body) = send(app, bulk_delete(request)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deletedCount"], json!(1));
    assert_eq!(body["invalidCount"], json!(0));
    assert_eq!(remaining(&interface), vec!["c2"]);
}

#[tokio::test]
async fn constraint_violations_are_client_errors() {
    let (app, interface) = app(true);
    let request = json!({"isSelectAllMatchingActive": true});
    let (status, body) = send(app, bulk_delete(request)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], json!("CONSTRAINT_VIOLATION"));
    assert!(body.get("details").is_none());
    assert_eq!(remaining(&interface), vec!["c1", "c2"]);
}
