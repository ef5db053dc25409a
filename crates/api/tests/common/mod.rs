#![allow(dead_code)]

use std::sync::Arc;

use api::auth::{AuthConfig, Identity, Role};
use api::schema::{build_schema, AppSchema};
use async_graphql::{Request, Response, Variables};
use sea_orm::{ConnectionTrait, Database, DatabaseBackend, DatabaseConnection, Statement};
use serde_json::Value;
use uuid::Uuid;

pub struct TestContext {
    pub db: Arc<DatabaseConnection>,
    pub schema: async_graphql::Schema<
        api::schema::QueryRoot,
        api::schema::MutationRoot,
        async_graphql::EmptySubscription,
    >,
    pub auth: Arc<AuthConfig>,
}

pub fn test_auth_config() -> AuthConfig {
    AuthConfig {
        jwt_secret: "test-secret".into(),
        admin_username: "admin".into(),
        admin_password: "hunter2".into(),
        token_ttl_hours: 24,
    }
}

pub async fn setup() -> TestContext {
    let conn = Database::connect("sqlite::memory:").await.unwrap();
    let db = Arc::new(conn);
    bootstrap_sqlite(db.as_ref()).await;
    let auth = Arc::new(test_auth_config());
    let AppSchema(schema) = build_schema(db.clone(), auth.clone());
    TestContext { db, schema, auth }
}

pub fn admin() -> Identity {
    Identity {
        id: None,
        role: Role::Admin,
    }
}

pub fn employee(id: Uuid) -> Identity {
    Identity {
        id: Some(id),
        role: Role::Employee,
    }
}

pub async fn exec(ctx: &TestContext, query: &str, vars: Value) -> Response {
    ctx.schema
        .execute(Request::new(query).variables(Variables::from_json(vars)))
        .await
}

pub async fn exec_as(
    ctx: &TestContext,
    identity: Identity,
    query: &str,
    vars: Value,
) -> Response {
    ctx.schema
        .execute(
            Request::new(query)
                .variables(Variables::from_json(vars))
                .data(identity),
        )
        .await
}

pub fn error_code(resp: &Response) -> Option<String> {
    let value = serde_json::to_value(resp).ok()?;
    value["errors"][0]["extensions"]["code"]
        .as_str()
        .map(|code| code.to_string())
}

pub async fn create_employee(ctx: &TestContext, name: &str, email: &str, password: &str) -> Uuid {
    let mutation = r#"
        mutation Add($input: EmployeeInput!) {
            addEmployee(input: $input) { id }
        }
    "#;
    let resp = exec_as(
        ctx,
        admin(),
        mutation,
        serde_json::json!({
            "input": {
                "name": name,
                "email": email,
                "password": password,
                "age": 30
            }
        }),
    )
    .await;
    assert!(
        resp.errors.is_empty(),
        "unexpected errors: {:?}",
        resp.errors
    );
    let data = resp.data.into_json().unwrap();
    Uuid::parse_str(data["addEmployee"]["id"].as_str().unwrap()).unwrap()
}

async fn bootstrap_sqlite(db: &DatabaseConnection) {
    db.execute(Statement::from_string(
        DatabaseBackend::Sqlite,
        "PRAGMA foreign_keys = ON;",
    ))
    .await
    .unwrap();

    db.execute(Statement::from_string(
        DatabaseBackend::Sqlite,
        r#"
        CREATE TABLE employee (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            email TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            employee_no INTEGER,
            age INTEGER NOT NULL,
            class_name TEXT,
            subjects TEXT NOT NULL DEFAULT '[]',
            created_at TEXT NOT NULL
        );
        "#,
    ))
    .await
    .unwrap();

    db.execute(Statement::from_string(
        DatabaseBackend::Sqlite,
        r#"
        CREATE TABLE attendance (
            id TEXT PRIMARY KEY,
            employee_id TEXT NOT NULL,
            date TEXT NOT NULL,
            status TEXT NOT NULL,
            recorded_at TEXT NOT NULL,
            FOREIGN KEY(employee_id) REFERENCES employee(id) ON DELETE CASCADE
        );
        "#,
    ))
    .await
    .unwrap();
}
