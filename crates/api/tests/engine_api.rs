//! End-to-end transition tests: start, approve, send-back, dynamic
//! approver resolution, and the inbox views.

mod common;

use axum::http::StatusCode;
use axum::Router;
use common::{
    body_json, get_auth, post_json_auth, put_json_auth, ROLE_ADMIN, ROLE_EMPLOYEE, ROLE_HR,
    ROLE_MANAGER,
};
use greenlight_db::models::user::User;
use sqlx::PgPool;

struct People {
    submitter: User,
    submitter_token: String,
    manager: User,
    manager_token: String,
    hr: User,
    hr_token: String,
    admin_token: String,
}

async fn seed_people(pool: &PgPool) -> People {
    let (admin, _) = common::create_user(pool, "admin1", ROLE_ADMIN).await;
    let (submitter, _) = common::create_user(pool, "alice", ROLE_EMPLOYEE).await;
    let (manager, _) = common::create_user(pool, "bob", ROLE_MANAGER).await;
    let (hr, _) = common::create_user(pool, "carol", ROLE_HR).await;
    People {
        submitter_token: common::token_for(&submitter, "employee"),
        submitter,
        manager_token: common::token_for(&manager, "manager"),
        manager,
        hr_token: common::token_for(&hr, "hr"),
        hr,
        admin_token: common::token_for(&admin, "admin"),
    }
}

/// Create, populate, and activate a workflow; returns its id.
async fn setup_workflow(
    app: Router,
    admin_token: &str,
    code: &str,
    steps: serde_json::Value,
) -> i64 {
    let body = serde_json::json!({ "code": code, "name": "Leave request approval" });
    let response = post_json_auth(app.clone(), "/api/workflows", admin_token, body).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let id = body_json(response).await["data"]["id"].as_i64().unwrap();

    let response = put_json_auth(
        app.clone(),
        &format!("/api/workflows/{id}/steps"),
        admin_token,
        steps,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = post_json_auth(
        app,
        &format!("/api/workflows/{id}/activate"),
        admin_token,
        serde_json::json!({}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    id
}

fn leave_request_steps() -> serde_json::Value {
    serde_json::json!([
        {
            "step_key": "SUBMIT",
            "order": 1,
            "name": "Submit",
            "approver_strategy": "USER",
            "approver_value": "SUBMITTER"
        },
        {
            "step_key": "MANAGER_APPROVAL",
            "order": 2,
            "name": "Manager approval",
            "approver_strategy": "ROLE",
            "approver_value": "manager",
            "can_send_back": true
        },
        {
            "step_key": "HR_APPROVAL",
            "order": 3,
            "name": "HR approval",
            "approver_strategy": "ROLE",
            "approver_value": "hr",
            "can_send_back": true,
            "is_terminal": true
        }
    ])
}

async fn start_instance(app: Router, token: &str, code: &str, ref_id: &str) -> serde_json::Value {
    let body = serde_json::json!({
        "workflow_code": code,
        "ref_type": "leave_request",
        "ref_id": ref_id
    });
    let response = post_json_auth(app, "/api/instances", token, body).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await
}

/// The id of the single PENDING step instance of an instance.
async fn pending_step_id(app: Router, token: &str, instance_id: i64) -> i64 {
    let response = get_auth(app, &format!("/api/instances/{instance_id}"), token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    json["data"]["steps"]
        .as_array()
        .unwrap()
        .iter()
        .find(|s| s["status"] == "PENDING")
        .expect("instance should have a pending step")["id"]
        .as_i64()
        .unwrap()
}

async fn approve(app: Router, token: &str, step_instance_id: i64) -> serde_json::Value {
    let response = post_json_auth(
        app,
        &format!("/api/step-instances/{step_instance_id}/approve"),
        token,
        serde_json::json!({}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await
}

// ---------------------------------------------------------------------------
// Happy path and routing
// ---------------------------------------------------------------------------

/// Scenario: submit, manager approves, HR approves; the instance completes
/// and the action log records the full journey in order.
#[sqlx::test(migrations = "../../db/migrations")]
async fn test_full_approval_chain(pool: PgPool) {
    let people = seed_people(&pool).await;
    let app = common::build_test_app(pool);
    setup_workflow(
        app.clone(),
        &people.admin_token,
        "leave_request",
        leave_request_steps(),
    )
    .await;

    let started = start_instance(app.clone(), &people.submitter_token, "leave_request", "req-1").await;
    let instance_id = started["data"]["instance_id"].as_i64().unwrap();
    assert_eq!(started["data"]["status"], "IN_PROGRESS");
    assert_eq!(started["data"]["current_step"], "MANAGER_APPROVAL");
    assert_eq!(
        started["data"]["assignees"],
        serde_json::json!([people.manager.id])
    );

    let step = pending_step_id(app.clone(), &people.manager_token, instance_id).await;
    let json = approve(app.clone(), &people.manager_token, step).await;
    assert_eq!(json["data"]["status"], "IN_PROGRESS");
    assert_eq!(json["data"]["next_step"], "HR_APPROVAL");
    assert_eq!(json["data"]["assignees"], serde_json::json!([people.hr.id]));

    let step = pending_step_id(app.clone(), &people.hr_token, instance_id).await;
    let json = approve(app.clone(), &people.hr_token, step).await;
    assert_eq!(json["data"]["status"], "COMPLETED");

    let response = get_auth(
        app.clone(),
        &format!("/api/instances/{instance_id}"),
        &people.submitter_token,
    )
    .await;
    let json = body_json(response).await;
    assert_eq!(json["data"]["instance"]["status"], "APPROVED");
    assert!(json["data"]["instance"]["current_step_id"].is_null());

    let response = get_auth(
        app,
        &format!("/api/instances/{instance_id}/log"),
        &people.submitter_token,
    )
    .await;
    let json = body_json(response).await;
    let actions: Vec<&str> = json["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["action"].as_str().unwrap())
        .collect();
    assert_eq!(actions, vec!["SUBMIT", "APPROVE", "APPROVE"]);
}

/// Scenario: from HR, send back with a comment; the HR step instance ends
/// REJECTED and a fresh MANAGER_APPROVAL step instance opens.
#[sqlx::test(migrations = "../../db/migrations")]
async fn test_send_back_routes_to_previous_step(pool: PgPool) {
    let people = seed_people(&pool).await;
    let app = common::build_test_app(pool);
    setup_workflow(
        app.clone(),
        &people.admin_token,
        "leave_request",
        leave_request_steps(),
    )
    .await;

    let started = start_instance(app.clone(), &people.submitter_token, "leave_request", "req-1").await;
    let instance_id = started["data"]["instance_id"].as_i64().unwrap();
    let step = pending_step_id(app.clone(), &people.manager_token, instance_id).await;
    approve(app.clone(), &people.manager_token, step).await;

    let hr_step = pending_step_id(app.clone(), &people.hr_token, instance_id).await;
    let response = post_json_auth(
        app.clone(),
        &format!("/api/step-instances/{hr_step}/send-back"),
        &people.hr_token,
        serde_json::json!({ "comment": "missing receipts" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["status"], "SENT_BACK");
    assert_eq!(json["data"]["target_step"], "MANAGER_APPROVAL");

    let response = get_auth(
        app,
        &format!("/api/instances/{instance_id}"),
        &people.submitter_token,
    )
    .await;
    let json = body_json(response).await;
    assert_eq!(json["data"]["instance"]["status"], "IN_PROGRESS");

    let steps = json["data"]["steps"].as_array().unwrap();
    let hr_row = steps.iter().find(|s| s["id"].as_i64() == Some(hr_step)).unwrap();
    assert_eq!(hr_row["status"], "REJECTED");
    assert_eq!(hr_row["comment"], "missing receipts");

    // A second visit to MANAGER_APPROVAL: two step instances for that step
    // id, the newer one PENDING.
    let pending: Vec<_> = steps.iter().filter(|s| s["status"] == "PENDING").collect();
    assert_eq!(pending.len(), 1);
    assert_eq!(
        pending[0]["assigned_to"],
        serde_json::json!([people.manager.id])
    );
}

/// Scenario: a second start for the same business record fails with
/// Conflict regardless of caller.
#[sqlx::test(migrations = "../../db/migrations")]
async fn test_duplicate_start_conflicts(pool: PgPool) {
    let people = seed_people(&pool).await;
    let app = common::build_test_app(pool);
    setup_workflow(
        app.clone(),
        &people.admin_token,
        "leave_request",
        leave_request_steps(),
    )
    .await;

    start_instance(app.clone(), &people.submitter_token, "leave_request", "req-1").await;

    let body = serde_json::json!({
        "workflow_code": "leave_request",
        "ref_type": "leave_request",
        "ref_id": "req-1"
    });
    let response = post_json_auth(app, "/api/instances", &people.manager_token, body).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_start_unknown_code_is_404(pool: PgPool) {
    let people = seed_people(&pool).await;
    let app = common::build_test_app(pool);

    let body = serde_json::json!({
        "workflow_code": "nonexistent",
        "ref_type": "leave_request",
        "ref_id": "req-1"
    });
    let response = post_json_auth(app, "/api/instances", &people.submitter_token, body).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Guards
// ---------------------------------------------------------------------------

/// A user outside `assigned_to` gets Forbidden on approve and send-back,
/// whatever their role.
#[sqlx::test(migrations = "../../db/migrations")]
async fn test_unassigned_user_is_forbidden(pool: PgPool) {
    let people = seed_people(&pool).await;
    let app = common::build_test_app(pool);
    setup_workflow(
        app.clone(),
        &people.admin_token,
        "leave_request",
        leave_request_steps(),
    )
    .await;

    let started = start_instance(app.clone(), &people.submitter_token, "leave_request", "req-1").await;
    let instance_id = started["data"]["instance_id"].as_i64().unwrap();
    let step = pending_step_id(app.clone(), &people.submitter_token, instance_id).await;

    let response = post_json_auth(
        app.clone(),
        &format!("/api/step-instances/{step}/approve"),
        &people.hr_token,
        serde_json::json!({}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = post_json_auth(
        app,
        &format!("/api/step-instances/{step}/send-back"),
        &people.hr_token,
        serde_json::json!({ "comment": "nope" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

/// Approving the same step instance twice succeeds at most once.
#[sqlx::test(migrations = "../../db/migrations")]
async fn test_double_approve_conflicts(pool: PgPool) {
    let people = seed_people(&pool).await;
    let app = common::build_test_app(pool);
    setup_workflow(
        app.clone(),
        &people.admin_token,
        "leave_request",
        leave_request_steps(),
    )
    .await;

    let started = start_instance(app.clone(), &people.submitter_token, "leave_request", "req-1").await;
    let instance_id = started["data"]["instance_id"].as_i64().unwrap();
    let step = pending_step_id(app.clone(), &people.manager_token, instance_id).await;

    approve(app.clone(), &people.manager_token, step).await;

    let response = post_json_auth(
        app,
        &format!("/api/step-instances/{step}/approve"),
        &people.manager_token,
        serde_json::json!({}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

/// Send-back from a step with `can_send_back = false` is Forbidden.
#[sqlx::test(migrations = "../../db/migrations")]
async fn test_send_back_disallowed_by_step(pool: PgPool) {
    let people = seed_people(&pool).await;
    let app = common::build_test_app(pool);

    let mut steps = leave_request_steps();
    steps[1]["can_send_back"] = serde_json::json!(false);
    setup_workflow(app.clone(), &people.admin_token, "leave_request", steps).await;

    let started = start_instance(app.clone(), &people.submitter_token, "leave_request", "req-1").await;
    let instance_id = started["data"]["instance_id"].as_i64().unwrap();
    let step = pending_step_id(app.clone(), &people.manager_token, instance_id).await;

    let response = post_json_auth(
        app,
        &format!("/api/step-instances/{step}/send-back"),
        &people.manager_token,
        serde_json::json!({ "comment": "trying anyway" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

/// Send-back requires a comment.
#[sqlx::test(migrations = "../../db/migrations")]
async fn test_send_back_requires_comment(pool: PgPool) {
    let people = seed_people(&pool).await;
    let app = common::build_test_app(pool);
    setup_workflow(
        app.clone(),
        &people.admin_token,
        "leave_request",
        leave_request_steps(),
    )
    .await;

    let started = start_instance(app.clone(), &people.submitter_token, "leave_request", "req-1").await;
    let instance_id = started["data"]["instance_id"].as_i64().unwrap();
    let step = pending_step_id(app.clone(), &people.manager_token, instance_id).await;

    let response = post_json_auth(
        app,
        &format!("/api/step-instances/{step}/send-back"),
        &people.manager_token,
        serde_json::json!({ "comment": "   " }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ---------------------------------------------------------------------------
// Resolution failures
// ---------------------------------------------------------------------------

/// ROLE resolution against an empty role aborts the whole start; no
/// instance row survives, so a later start for the same ref succeeds.
#[sqlx::test(migrations = "../../db/migrations")]
async fn test_empty_role_aborts_transition(pool: PgPool) {
    let (admin, _) = common::create_user(&pool, "admin1", ROLE_ADMIN).await;
    let admin_token = common::token_for(&admin, "admin");
    let (submitter, _) = common::create_user(&pool, "alice", ROLE_EMPLOYEE).await;
    let submitter_token = common::token_for(&submitter, "employee");
    // Deliberately no manager user.

    let app = common::build_test_app(pool.clone());
    setup_workflow(
        app.clone(),
        &admin_token,
        "leave_request",
        leave_request_steps(),
    )
    .await;

    let body = serde_json::json!({
        "workflow_code": "leave_request",
        "ref_type": "leave_request",
        "ref_id": "req-1"
    });
    let response = post_json_auth(app.clone(), "/api/instances", &submitter_token, body.clone()).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_json(response).await;
    assert_eq!(json["code"], "RESOLUTION_FAILED");

    // The failed start left no partial state: the same ref can start once
    // the role has a member.
    common::create_user(&pool, "bob", ROLE_MANAGER).await;
    let response = post_json_auth(app, "/api/instances", &submitter_token, body).await;
    assert_eq!(response.status(), StatusCode::CREATED);
}

// ---------------------------------------------------------------------------
// Dynamic and multi strategies
// ---------------------------------------------------------------------------

/// A DYNAMIC SELECTED_PIC step assigns the user named in the previous
/// action's metadata.
#[sqlx::test(migrations = "../../db/migrations")]
async fn test_dynamic_selected_pic(pool: PgPool) {
    let people = seed_people(&pool).await;
    let app = common::build_test_app(pool);

    let mut steps = leave_request_steps();
    steps[2] = serde_json::json!({
        "step_key": "PIC_APPROVAL",
        "order": 3,
        "name": "Selected PIC approval",
        "approver_strategy": "DYNAMIC",
        "approver_value": "SELECTED_PIC",
        "is_terminal": true
    });
    setup_workflow(app.clone(), &people.admin_token, "leave_request", steps).await;

    let started = start_instance(app.clone(), &people.submitter_token, "leave_request", "req-1").await;
    let instance_id = started["data"]["instance_id"].as_i64().unwrap();
    let step = pending_step_id(app.clone(), &people.manager_token, instance_id).await;

    let response = post_json_auth(
        app.clone(),
        &format!("/api/step-instances/{step}/approve"),
        &people.manager_token,
        serde_json::json!({ "metadata": { "selected_pic": people.hr.id } }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["next_step"], "PIC_APPROVAL");
    assert_eq!(json["data"]["assignees"], serde_json::json!([people.hr.id]));
}

/// Approving into a SELECTED_PIC step without the metadata fails and rolls
/// the approval back: the manager step stays PENDING.
#[sqlx::test(migrations = "../../db/migrations")]
async fn test_dynamic_missing_metadata_rolls_back(pool: PgPool) {
    let people = seed_people(&pool).await;
    let app = common::build_test_app(pool);

    let mut steps = leave_request_steps();
    steps[2] = serde_json::json!({
        "step_key": "PIC_APPROVAL",
        "order": 3,
        "name": "Selected PIC approval",
        "approver_strategy": "DYNAMIC",
        "approver_value": "SELECTED_PIC",
        "is_terminal": true
    });
    setup_workflow(app.clone(), &people.admin_token, "leave_request", steps).await;

    let started = start_instance(app.clone(), &people.submitter_token, "leave_request", "req-1").await;
    let instance_id = started["data"]["instance_id"].as_i64().unwrap();
    let step = pending_step_id(app.clone(), &people.manager_token, instance_id).await;

    let response = post_json_auth(
        app.clone(),
        &format!("/api/step-instances/{step}/approve"),
        &people.manager_token,
        serde_json::json!({}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_json(response).await;
    assert_eq!(json["code"], "RESOLUTION_FAILED");

    // Rolled back: the manager step is still pending and can be approved
    // correctly afterwards.
    let still_pending = pending_step_id(app.clone(), &people.manager_token, instance_id).await;
    assert_eq!(still_pending, step);
}

/// A DYNAMIC PREVIOUS_ACTOR step assigns whoever acted last.
#[sqlx::test(migrations = "../../db/migrations")]
async fn test_dynamic_previous_actor(pool: PgPool) {
    let people = seed_people(&pool).await;
    let app = common::build_test_app(pool);

    let mut steps = leave_request_steps();
    steps[2] = serde_json::json!({
        "step_key": "CONFIRMATION",
        "order": 3,
        "name": "Actor confirmation",
        "approver_strategy": "DYNAMIC",
        "approver_value": "PREVIOUS_ACTOR",
        "is_terminal": true
    });
    setup_workflow(app.clone(), &people.admin_token, "leave_request", steps).await;

    let started = start_instance(app.clone(), &people.submitter_token, "leave_request", "req-1").await;
    let instance_id = started["data"]["instance_id"].as_i64().unwrap();
    let step = pending_step_id(app.clone(), &people.manager_token, instance_id).await;

    let json = approve(app, &people.manager_token, step).await;
    assert_eq!(
        json["data"]["assignees"],
        serde_json::json!([people.manager.id])
    );
}

/// MULTI resolves each entry and unions the results without duplicates.
#[sqlx::test(migrations = "../../db/migrations")]
async fn test_multi_strategy_union(pool: PgPool) {
    let people = seed_people(&pool).await;
    let app = common::build_test_app(pool);

    let steps = serde_json::json!([
        {
            "step_key": "SUBMIT",
            "order": 1,
            "name": "Submit",
            "approver_strategy": "USER",
            "approver_value": "SUBMITTER"
        },
        {
            "step_key": "JOINT_APPROVAL",
            "order": 2,
            "name": "Joint approval",
            "approver_strategy": "MULTI",
            "approver_value": format!("ROLE:manager, USER:{}", people.hr.id),
            "is_terminal": true
        }
    ]);
    setup_workflow(app.clone(), &people.admin_token, "leave_request", steps).await;

    let started = start_instance(app, &people.submitter_token, "leave_request", "req-1").await;
    assert_eq!(
        started["data"]["assignees"],
        serde_json::json!([people.manager.id, people.hr.id])
    );
}

// ---------------------------------------------------------------------------
// Inbox
// ---------------------------------------------------------------------------

/// The pending inbox shows assigned open work; the history inbox shows
/// what the user has acted on.
#[sqlx::test(migrations = "../../db/migrations")]
async fn test_inbox_pending_and_history(pool: PgPool) {
    let people = seed_people(&pool).await;
    let app = common::build_test_app(pool);
    setup_workflow(
        app.clone(),
        &people.admin_token,
        "leave_request",
        leave_request_steps(),
    )
    .await;

    let started = start_instance(app.clone(), &people.submitter_token, "leave_request", "req-1").await;
    let instance_id = started["data"]["instance_id"].as_i64().unwrap();

    let response = get_auth(app.clone(), "/api/inbox", &people.manager_token).await;
    let json = body_json(response).await;
    let items = json["data"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["step_key"], "MANAGER_APPROVAL");
    assert_eq!(items[0]["requested_by"], "alice");
    assert_eq!(items[0]["ref_id"], "req-1");

    // HR has nothing pending yet.
    let response = get_auth(app.clone(), "/api/inbox?mode=pending", &people.hr_token).await;
    let json = body_json(response).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 0);

    let step = pending_step_id(app.clone(), &people.manager_token, instance_id).await;
    approve(app.clone(), &people.manager_token, step).await;

    // Acted work moves from pending to history.
    let response = get_auth(app.clone(), "/api/inbox", &people.manager_token).await;
    let json = body_json(response).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 0);

    let response = get_auth(app, "/api/inbox?mode=history", &people.manager_token).await;
    let json = body_json(response).await;
    let items = json["data"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["step_key"], "MANAGER_APPROVAL");
    assert_eq!(items[0]["status"], "APPROVED");
}

// ---------------------------------------------------------------------------
// SPECIFIC send-back routing
// ---------------------------------------------------------------------------

/// A SPECIFIC reject target skips intermediate steps.
#[sqlx::test(migrations = "../../db/migrations")]
async fn test_specific_send_back_target(pool: PgPool) {
    let people = seed_people(&pool).await;
    let app = common::build_test_app(pool);

    let mut steps = leave_request_steps();
    steps[2]["reject_target_type"] = serde_json::json!("SPECIFIC");
    steps[2]["reject_target_step_key"] = serde_json::json!("SUBMIT");
    setup_workflow(app.clone(), &people.admin_token, "leave_request", steps).await;

    let started = start_instance(app.clone(), &people.submitter_token, "leave_request", "req-1").await;
    let instance_id = started["data"]["instance_id"].as_i64().unwrap();
    let step = pending_step_id(app.clone(), &people.manager_token, instance_id).await;
    approve(app.clone(), &people.manager_token, step).await;

    let hr_step = pending_step_id(app.clone(), &people.hr_token, instance_id).await;
    let response = post_json_auth(
        app.clone(),
        &format!("/api/step-instances/{hr_step}/send-back"),
        &people.hr_token,
        serde_json::json!({ "comment": "restart from submission" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["target_step"], "SUBMIT");
    // The SUBMIT step's approver is the submitter.
    assert_eq!(
        json["data"]["assignees"],
        serde_json::json!([people.submitter.id])
    );
}
