use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use salary_engine::api::{build_router, AppState};
use salary_engine::catalog::ComponentCatalog;
use salary_engine::config::OrganizationSettings;
use serde_json::{json, Value};
use tower::ServiceExt;

fn router() -> Router {
    build_router(AppState::new(
        ComponentCatalog::new(),
        OrganizationSettings::default(),
    ))
}

async fn send(router: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let body = match body {
        Some(value) => Body::from(value.to_string()),
        None => Body::empty(),
    };
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(body)
        .expect("request builds");
    let response = router.clone().oneshot(request).await.expect("router responds");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body reads");
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json body")
    };
    (status, value)
}

async fn seed_standard_structure(router: &Router) -> u64 {
    let (status, hra) = send(
        router,
        Method::POST,
        "/api/components",
        Some(json!({
            "name": "House Rent Allowance",
            "code": "HRA",
            "component_type": "earning",
            "calculation_type": "percentage",
            "percentage_of": "BASIC",
            "percentage_value": "40"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, pf) = send(
        router,
        Method::POST,
        "/api/components",
        Some(json!({
            "name": "Provident Fund",
            "code": "PF",
            "component_type": "deduction",
            "calculation_type": "percentage",
            "percentage_value": 12
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, structure) = send(
        router,
        Method::POST,
        "/api/structures",
        Some(json!({
            "name": "Standard",
            "components": [
                {"component_id": hra["id"]},
                {"component_id": pf["id"]}
            ]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    structure["id"].as_u64().expect("structure id")
}

#[tokio::test]
async fn component_lifecycle() {
    let router = router();
    let (status, bonus) = send(
        &router,
        Method::POST,
        "/api/components",
        Some(json!({
            "name": "Bonus",
            "code": "BONUS",
            "component_type": "earning",
            "calculation_type": "fixed",
            "amount": "250.00"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = bonus["id"].as_u64().expect("component id");
    assert_eq!(bonus["amount"], json!(250.0));

    let (status, body) = send(
        &router,
        Method::POST,
        "/api/components",
        Some(json!({
            "name": "Another bonus",
            "code": "bonus",
            "component_type": "earning",
            "calculation_type": "fixed"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap_or_default().contains("already in use"));

    let (status, copy) = send(&router, Method::POST, &format!("/api/components/{id}/clone"), None).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(copy["code"], "BONUS_CLONE");

    let (status, listed) = send(&router, Method::GET, "/api/components", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().map(Vec::len), Some(2));

    let (status, _) = send(&router, Method::DELETE, &format!("/api/components/{id}"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&router, Method::GET, &format!("/api/components/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn preview_then_edit_assignment() {
    let router = router();
    let structure_id = seed_standard_structure(&router).await;

    let (status, preview) = send(
        &router,
        Method::POST,
        "/api/assignments/preview",
        Some(json!({"structure_id": structure_id, "basic_amount": "5000"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(preview["totals"]["total_earnings"], json!(2000.0));
    assert_eq!(preview["totals"]["total_deductions"], json!(600.0));
    assert_eq!(preview["totals"]["net_salary"], json!(6400.0));

    let (status, edited) = send(
        &router,
        Method::POST,
        "/api/assignments/edit",
        Some(json!({
            "draft": preview["draft"],
            "edit": {"type": "component_edited", "code": "HRA", "amount": 1500}
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, rebased) = send(
        &router,
        Method::POST,
        "/api/assignments/edit",
        Some(json!({
            "draft": edited["draft"],
            "edit": {"type": "basic_amount_changed", "amount": 6000}
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(rebased["totals"]["net_salary"], json!(6780.0));
    assert_eq!(rebased["totals"]["total_deductions"], json!(720.0));
}

#[tokio::test]
async fn inactive_structure_cannot_be_previewed() {
    let router = router();
    let structure_id = seed_standard_structure(&router).await;
    let (_, structure) = send(&router, Method::GET, &format!("/api/structures/{structure_id}"), None).await;

    let mut inactive = structure.clone();
    inactive["is_active"] = json!(false);
    let (status, _) = send(
        &router,
        Method::PUT,
        &format!("/api/structures/{structure_id}"),
        Some(inactive),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &router,
        Method::POST,
        "/api/assignments/preview",
        Some(json!({"structure_id": structure_id, "basic_amount": 5000})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].as_str().unwrap_or_default().contains("not active"));
}

#[tokio::test]
async fn generate_and_summarise_payslips() {
    let router = router();
    let structure_id = seed_standard_structure(&router).await;
    let (_, preview) = send(
        &router,
        Method::POST,
        "/api/assignments/preview",
        Some(json!({"structure_id": structure_id, "basic_amount": 5000})),
    )
    .await;
    let components = preview["draft"]["components"].clone();

    let (status, run) = send(
        &router,
        Method::POST,
        "/api/payslips/generate",
        Some(json!({
            "period": {"month": 3, "year": 2025},
            "assignments": [
                {"employee_id": 7, "structure_id": structure_id, "basic_amount": "5000",
                 "effective_from": "2025-01-01", "is_current": true, "components": components},
                {"employee_id": "8", "structure_id": structure_id, "basic_amount": 5000,
                 "effective_from": "2025-02-01", "is_current": true, "components": components}
            ]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let payslips = run["payslips"].as_array().expect("payslips").clone();
    assert_eq!(payslips.len(), 2);
    assert_eq!(payslips[0]["gross_salary"], json!(7000.0));
    assert_eq!(payslips[0]["net_salary"], json!(6400.0));
    assert_eq!(payslips[0]["status"], "pending");

    let (status, summary) = send(
        &router,
        Method::POST,
        "/api/payslips/summary",
        Some(json!({
            "period": {"month": 3, "year": 2025},
            "records": {"results": payslips, "count": 2, "next": null, "previous": null}
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["total_employees"], 2);
    assert_eq!(summary["total_gross"], json!(14000.0));
    assert_eq!(summary["total_deductions"], json!(1200.0));
    assert_eq!(summary["total_net"], json!(12800.0));
}

#[tokio::test]
async fn summary_of_nothing_is_zero() {
    let router = router();
    let (status, summary) = send(
        &router,
        Method::POST,
        "/api/payslips/summary",
        Some(json!({"records": []})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["total_employees"], 0);
    assert_eq!(summary["total_net"], json!(0.0));

    let (status, _) = send(
        &router,
        Method::POST,
        "/api/payslips/summary",
        Some(json!({"period": {"month": 13, "year": 2025}, "records": []})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
