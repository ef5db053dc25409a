mod common;

use common::{admin, error_code, exec_as};
use serde_json::json;
use uuid::Uuid;

const ADD: &str = r#"
    mutation Add($input: EmployeeInput!) {
        addEmployee(input: $input) {
            id
            name
            email
            employeeNo
            age
            class
            subjects
            attendance { date status }
        }
    }
"#;

#[tokio::test]
async fn add_and_fetch_employee() {
    let ctx = common::setup().await;
    let resp = exec_as(
        &ctx,
        admin(),
        ADD,
        json!({
            "input": {
                "name": "Ada Lovelace",
                "email": "Ada@Records.Test",
                "password": "s3cret",
                "employeeNo": 1001,
                "age": 28,
                "class": "Mathematics",
                "subjects": ["Analysis", "Mechanics"]
            }
        }),
    )
    .await;
    assert!(resp.errors.is_empty(), "errors: {:?}", resp.errors);
    let data = resp.data.into_json().unwrap();
    let created = &data["addEmployee"];
    assert_eq!(created["name"], "Ada Lovelace");
    // Emails are normalized at the boundary.
    assert_eq!(created["email"], "ada@records.test");
    assert_eq!(created["employeeNo"], 1001);
    assert_eq!(created["age"], 28);
    assert_eq!(created["class"], "Mathematics");
    assert_eq!(created["subjects"], json!(["Analysis", "Mechanics"]));
    assert_eq!(created["attendance"], json!([]));
    let id = created["id"].as_str().unwrap();

    let fetch = r#"query Fetch($id: ID!) { employee(id: $id) { id name email subjects } }"#;
    let resp = exec_as(&ctx, admin(), fetch, json!({ "id": id })).await;
    assert!(resp.errors.is_empty(), "errors: {:?}", resp.errors);
    let fetched = resp.data.into_json().unwrap();
    assert_eq!(fetched["employee"]["id"], id);
    assert_eq!(fetched["employee"]["name"], "Ada Lovelace");
}

#[tokio::test]
async fn fetch_missing_employee_is_not_found() {
    let ctx = common::setup().await;
    let fetch = r#"query Fetch($id: ID!) { employee(id: $id) { id } }"#;
    let resp = exec_as(&ctx, admin(), fetch, json!({ "id": Uuid::new_v4() })).await;
    assert_eq!(error_code(&resp).as_deref(), Some("NOT_FOUND"));
}

#[tokio::test]
async fn duplicate_email_is_distinguishable() {
    let ctx = common::setup().await;
    let input = |name: &str| {
        json!({
            "input": {
                "name": name,
                "email": "shared@records.test",
                "password": "pw",
                "age": 30
            }
        })
    };
    let resp = exec_as(&ctx, admin(), ADD, input("First In")).await;
    assert!(resp.errors.is_empty(), "errors: {:?}", resp.errors);
    let first_id = resp.data.into_json().unwrap()["addEmployee"]["id"]
        .as_str()
        .unwrap()
        .to_string();

    let resp = exec_as(&ctx, admin(), ADD, input("Second In")).await;
    assert_eq!(error_code(&resp).as_deref(), Some("DUPLICATE_EMAIL"));
    assert_eq!(resp.errors[0].message, "Email already exists");

    // The first record is unaffected.
    let fetch = r#"query Fetch($id: ID!) { employee(id: $id) { name } }"#;
    let resp = exec_as(&ctx, admin(), fetch, json!({ "id": first_id })).await;
    assert!(resp.errors.is_empty(), "errors: {:?}", resp.errors);
    assert_eq!(resp.data.into_json().unwrap()["employee"]["name"], "First In");

    let list = exec_as(
        &ctx,
        admin(),
        "query { employees { totalCount } }",
        json!({}),
    )
    .await;
    assert_eq!(
        list.data.into_json().unwrap()["employees"]["totalCount"],
        1
    );
}

#[tokio::test]
async fn update_employee_is_partial() {
    let ctx = common::setup().await;
    let id = common::create_employee(&ctx, "Before Update", "update@records.test", "pw").await;

    let update = r#"
        mutation Update($id: ID!, $input: EmployeeUpdateInput!) {
            updateEmployee(id: $id, input: $input) { name age class subjects }
        }
    "#;
    let resp = exec_as(
        &ctx,
        admin(),
        update,
        json!({ "id": id, "input": { "age": 31, "subjects": ["History"] } }),
    )
    .await;
    assert!(resp.errors.is_empty(), "errors: {:?}", resp.errors);
    let updated = resp.data.into_json().unwrap();
    assert_eq!(updated["updateEmployee"]["name"], "Before Update");
    assert_eq!(updated["updateEmployee"]["age"], 31);
    assert_eq!(updated["updateEmployee"]["subjects"], json!(["History"]));

    let resp = exec_as(
        &ctx,
        admin(),
        update,
        json!({ "id": Uuid::new_v4(), "input": { "age": 40 } }),
    )
    .await;
    assert_eq!(error_code(&resp).as_deref(), Some("NOT_FOUND"));
}

#[tokio::test]
async fn pagination_reports_next_page() {
    let ctx = common::setup().await;
    for n in 0..15 {
        common::create_employee(
            &ctx,
            &format!("Employee {:02}", n),
            &format!("employee{:02}@records.test", n),
            "pw",
        )
        .await;
    }

    let list = r#"
        query List($page: Int, $limit: Int) {
            employees(page: $page, limit: $limit, sortBy: "name", sortOrder: "asc") {
                employees { name }
                totalCount
                hasNextPage
            }
        }
    "#;
    let resp = exec_as(&ctx, admin(), list, json!({ "page": 1, "limit": 10 })).await;
    assert!(resp.errors.is_empty(), "errors: {:?}", resp.errors);
    let page1 = resp.data.into_json().unwrap();
    assert_eq!(page1["employees"]["totalCount"], 15);
    assert_eq!(page1["employees"]["employees"].as_array().unwrap().len(), 10);
    assert_eq!(page1["employees"]["hasNextPage"], true);
    assert_eq!(page1["employees"]["employees"][0]["name"], "Employee 00");

    let resp = exec_as(&ctx, admin(), list, json!({ "page": 2, "limit": 10 })).await;
    assert!(resp.errors.is_empty(), "errors: {:?}", resp.errors);
    let page2 = resp.data.into_json().unwrap();
    assert_eq!(page2["employees"]["employees"].as_array().unwrap().len(), 5);
    assert_eq!(page2["employees"]["hasNextPage"], false);
    assert_eq!(page2["employees"]["employees"][0]["name"], "Employee 10");
}
