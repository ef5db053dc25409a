use crate::auth::{issue_token, AuthConfig, Identity, Role};
use crate::authz::AuthGate;
use std::{collections::HashMap, sync::Arc};

use argon2::password_hash::{
    rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
};
use argon2::Argon2;
use async_graphql::{
    Context, EmptySubscription, Enum, Error, ErrorExtensions, InputObject, Object, Schema,
    SimpleObject, ID,
};
use chrono::{DateTime, NaiveDate, Utc};
use entity::{attendance, employee};
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, DbErr, EntityTrait,
    Order, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, SqlErr,
};
use tracing::info_span;
use uuid::Uuid;

pub struct AppSchema(pub Schema<QueryRoot, MutationRoot, EmptySubscription>);

pub fn build_schema(db: Arc<DatabaseConnection>, auth: Arc<AuthConfig>) -> AppSchema {
    let schema = Schema::build(QueryRoot, MutationRoot, EmptySubscription)
        .extension(AuthGate)
        .data(db)
        .data(auth)
        .finish();
    AppSchema(schema)
}

pub struct QueryRoot;
pub struct MutationRoot;

const DEFAULT_PAGE_LIMIT: i32 = 10;
const MAX_PAGE_LIMIT: i32 = 100;

#[derive(Enum, Copy, Clone, Debug, Eq, PartialEq)]
pub enum AttendanceStatus {
    #[graphql(name = "present")]
    Present,
    #[graphql(name = "absent")]
    Absent,
}

impl From<attendance::Status> for AttendanceStatus {
    fn from(value: attendance::Status) -> Self {
        match value {
            attendance::Status::Present => AttendanceStatus::Present,
            attendance::Status::Absent => AttendanceStatus::Absent,
        }
    }
}

impl From<AttendanceStatus> for attendance::Status {
    fn from(value: AttendanceStatus) -> Self {
        match value {
            AttendanceStatus::Present => attendance::Status::Present,
            AttendanceStatus::Absent => attendance::Status::Absent,
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
#[graphql(name = "Attendance")]
pub struct AttendanceEntry {
    pub date: NaiveDate,
    pub status: AttendanceStatus,
}

impl From<attendance::Model> for AttendanceEntry {
    fn from(model: attendance::Model) -> Self {
        Self {
            date: model.date,
            status: model.status.into(),
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
#[graphql(name = "Employee")]
pub struct EmployeeNode {
    pub id: ID,
    pub name: String,
    pub email: String,
    #[graphql(name = "employeeNo")]
    pub employee_no: Option<i32>,
    pub age: i32,
    pub class: Option<String>,
    pub subjects: Vec<String>,
    pub attendance: Vec<AttendanceEntry>,
    #[graphql(name = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl EmployeeNode {
    fn from_model(model: employee::Model, attendance: Vec<attendance::Model>) -> Self {
        Self {
            id: ID::from(model.id.to_string()),
            name: model.name,
            email: model.email,
            employee_no: model.employee_no,
            age: model.age,
            class: model.class_name,
            subjects: serde_json::from_value(model.subjects).unwrap_or_default(),
            attendance: attendance.into_iter().map(AttendanceEntry::from).collect(),
            created_at: model.created_at.into(),
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
pub struct UserType {
    pub id: Option<ID>,
    pub role: String,
    pub email: Option<String>,
}

#[derive(Clone, Debug, SimpleObject)]
pub struct AuthPayload {
    pub token: String,
    pub user: UserType,
}

#[derive(Clone, Debug, SimpleObject)]
pub struct PaginatedEmployees {
    pub employees: Vec<EmployeeNode>,
    #[graphql(name = "totalCount")]
    pub total_count: i32,
    #[graphql(name = "hasNextPage")]
    pub has_next_page: bool,
}

#[derive(Clone, Debug, InputObject)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

#[derive(Clone, Debug, InputObject)]
pub struct EmployeeInput {
    pub name: String,
    pub email: String,
    pub password: String,
    #[graphql(name = "employeeNo")]
    pub employee_no: Option<i32>,
    pub age: i32,
    pub class: Option<String>,
    pub subjects: Option<Vec<String>>,
}

#[derive(Clone, Debug, InputObject)]
pub struct EmployeeUpdateInput {
    pub name: Option<String>,
    pub age: Option<i32>,
    #[graphql(name = "employeeNo")]
    pub employee_no: Option<i32>,
    pub class: Option<String>,
    pub subjects: Option<Vec<String>>,
}

#[Object(name = "Query")]
impl QueryRoot {
    async fn employees(
        &self,
        ctx: &Context<'_>,
        page: Option<i32>,
        limit: Option<i32>,
        #[graphql(name = "sortBy")] sort_by: Option<String>,
        #[graphql(name = "sortOrder")] sort_order: Option<String>,
    ) -> async_graphql::Result<PaginatedEmployees> {
        require_role(ctx, Role::Admin)?;
        let db = database(ctx)?;
        let page = page.unwrap_or(1).max(1);
        let limit = limit.unwrap_or(DEFAULT_PAGE_LIMIT).clamp(1, MAX_PAGE_LIMIT);
        let skip = ((page - 1) * limit) as u64;
        let (sort_column, sort_tag) = resolve_sort_column(sort_by.as_deref());
        let (order, order_tag) = match sort_order.as_deref() {
            Some("asc") => (Order::Asc, "asc"),
            _ => (Order::Desc, "desc"),
        };
        let span = info_span!(
            "employees.list",
            page = page,
            limit = limit,
            sort = sort_tag,
            order = order_tag
        );
        let _guard = span.enter();

        let total_count = employee::Entity::find()
            .count(db.as_ref())
            .await
            .map_err(db_error)?;
        let records = employee::Entity::find()
            .order_by(sort_column, order)
            .limit(limit as u64)
            .offset(skip)
            .all(db.as_ref())
            .await
            .map_err(db_error)?;
        let returned = records.len() as u64;
        let employees = with_attendance(db.as_ref(), records).await?;
        Ok(PaginatedEmployees {
            employees,
            total_count: total_count as i32,
            has_next_page: skip + returned < total_count,
        })
    }

    async fn employee(&self, ctx: &Context<'_>, id: ID) -> async_graphql::Result<EmployeeNode> {
        require_role(ctx, Role::Admin)?;
        let db = database(ctx)?;
        let employee_id = parse_uuid(&id)?;
        load_employee(db.as_ref(), employee_id).await
    }

    #[graphql(name = "myProfile")]
    async fn my_profile(&self, ctx: &Context<'_>) -> async_graphql::Result<EmployeeNode> {
        let db = database(ctx)?;
        let employee_id = require_subject(ctx)?;
        load_employee(db.as_ref(), employee_id).await
    }

    #[graphql(name = "myAttendance")]
    async fn my_attendance(
        &self,
        ctx: &Context<'_>,
    ) -> async_graphql::Result<Vec<AttendanceEntry>> {
        let db = database(ctx)?;
        let employee_id = require_subject(ctx)?;
        employee::Entity::find_by_id(employee_id)
            .one(db.as_ref())
            .await
            .map_err(db_error)?
            .ok_or_else(|| error_with_code("NOT_FOUND", "Employee not found"))?;
        let rows = attendance_for(db.as_ref(), employee_id).await?;
        Ok(rows.into_iter().map(AttendanceEntry::from).collect())
    }
}

#[Object(name = "Mutation")]
impl MutationRoot {
    #[graphql(name = "adminLogin")]
    async fn admin_login(
        &self,
        ctx: &Context<'_>,
        username: String,
        password: String,
    ) -> async_graphql::Result<AuthPayload> {
        let auth = auth_config(ctx)?;
        if username != auth.admin_username || password != auth.admin_password {
            return Err(error_with_code(
                "INVALID_CREDENTIALS",
                "Invalid admin credentials",
            ));
        }
        let token = issue_token(None, Role::Admin, &auth)
            .map_err(|_| error_with_code("INTERNAL", "Failed to issue token"))?;
        Ok(AuthPayload {
            token,
            user: UserType {
                id: None,
                role: Role::Admin.as_str().to_string(),
                email: None,
            },
        })
    }

    async fn login(
        &self,
        ctx: &Context<'_>,
        input: LoginInput,
    ) -> async_graphql::Result<AuthPayload> {
        let auth = auth_config(ctx)?;
        let db = database(ctx)?;
        let email = normalize_email(&input.email)?;
        let record = employee::Entity::find()
            .filter(employee::Column::Email.eq(email))
            .one(db.as_ref())
            .await
            .map_err(db_error)?;
        let Some(record) = record else {
            return Err(error_with_code("INVALID_CREDENTIALS", "Invalid credentials"));
        };
        let parsed_hash = PasswordHash::new(&record.password_hash)
            .map_err(|_| error_with_code("INTERNAL", "Invalid password hash"))?;
        if Argon2::default()
            .verify_password(input.password.as_bytes(), &parsed_hash)
            .is_err()
        {
            return Err(error_with_code("INVALID_CREDENTIALS", "Invalid credentials"));
        }
        let token = issue_token(Some(record.id), Role::Employee, &auth)
            .map_err(|_| error_with_code("INTERNAL", "Failed to issue token"))?;
        Ok(AuthPayload {
            token,
            user: UserType {
                id: Some(ID::from(record.id.to_string())),
                role: Role::Employee.as_str().to_string(),
                email: Some(record.email),
            },
        })
    }

    #[graphql(name = "addEmployee")]
    async fn add_employee(
        &self,
        ctx: &Context<'_>,
        input: EmployeeInput,
    ) -> async_graphql::Result<EmployeeNode> {
        require_role(ctx, Role::Admin)?;
        let db = database(ctx)?;
        let name = validate_name(&input.name)?;
        let email = normalize_email(&input.email)?;
        if input.age < 0 {
            return Err(error_with_code("BAD_REQUEST", "age must be non-negative"));
        }
        let password_hash = hash_password(&input.password)
            .map_err(|_| error_with_code("INTERNAL", "Failed to hash password"))?;
        let now: DateTimeWithTimeZone = Utc::now().into();
        let subjects = input.subjects.unwrap_or_default();
        let inserted = employee::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name),
            email: Set(email),
            password_hash: Set(password_hash),
            employee_no: Set(input.employee_no),
            age: Set(input.age),
            class_name: Set(input.class),
            subjects: Set(serde_json::json!(subjects)),
            created_at: Set(now),
        }
        .insert(db.as_ref())
        .await
        .map_err(|err| match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => {
                error_with_code("DUPLICATE_EMAIL", "Email already exists")
            }
            _ => db_error(err),
        })?;
        Ok(EmployeeNode::from_model(inserted, vec![]))
    }

    #[graphql(name = "updateEmployee")]
    async fn update_employee(
        &self,
        ctx: &Context<'_>,
        id: ID,
        input: EmployeeUpdateInput,
    ) -> async_graphql::Result<EmployeeNode> {
        require_role(ctx, Role::Admin)?;
        let db = database(ctx)?;
        let employee_id = parse_uuid(&id)?;
        let record = employee::Entity::find_by_id(employee_id)
            .one(db.as_ref())
            .await
            .map_err(db_error)?
            .ok_or_else(|| error_with_code("NOT_FOUND", "Employee not found"))?;
        let mut active: employee::ActiveModel = record.into();
        if let Some(name) = &input.name {
            active.name = Set(validate_name(name)?);
        }
        if let Some(age) = input.age {
            if age < 0 {
                return Err(error_with_code("BAD_REQUEST", "age must be non-negative"));
            }
            active.age = Set(age);
        }
        if let Some(employee_no) = input.employee_no {
            active.employee_no = Set(Some(employee_no));
        }
        if let Some(class) = input.class {
            active.class_name = Set(Some(class));
        }
        if let Some(subjects) = input.subjects {
            active.subjects = Set(serde_json::json!(subjects));
        }
        let updated = active.update(db.as_ref()).await.map_err(db_error)?;
        let rows = attendance_for(db.as_ref(), employee_id).await?;
        Ok(EmployeeNode::from_model(updated, rows))
    }

    #[graphql(name = "markAttendance")]
    async fn mark_attendance(
        &self,
        ctx: &Context<'_>,
        #[graphql(name = "employeeId")] employee_id: ID,
        date: String,
        status: AttendanceStatus,
    ) -> async_graphql::Result<AttendanceEntry> {
        require_role(ctx, Role::Admin)?;
        let db = database(ctx)?;
        let employee_id = parse_uuid(&employee_id)?;
        let date = NaiveDate::parse_from_str(&date, "%Y-%m-%d")
            .map_err(|_| error_with_code("BAD_REQUEST", "Invalid date, expected YYYY-MM-DD"))?;
        employee::Entity::find_by_id(employee_id)
            .one(db.as_ref())
            .await
            .map_err(db_error)?
            .ok_or_else(|| error_with_code("NOT_FOUND", "Employee not found"))?;
        let inserted = attendance::ActiveModel {
            id: Set(Uuid::new_v4()),
            employee_id: Set(employee_id),
            date: Set(date),
            status: Set(status.into()),
            recorded_at: Set(Utc::now().into()),
        }
        .insert(db.as_ref())
        .await
        .map_err(db_error)?;
        Ok(inserted.into())
    }
}

fn resolve_sort_column(sort_by: Option<&str>) -> (employee::Column, &'static str) {
    match sort_by {
        Some("name") => (employee::Column::Name, "name"),
        Some("email") => (employee::Column::Email, "email"),
        Some("age") => (employee::Column::Age, "age"),
        Some("employeeNo") => (employee::Column::EmployeeNo, "employeeNo"),
        _ => (employee::Column::CreatedAt, "createdAt"),
    }
}

async fn load_employee(
    db: &DatabaseConnection,
    employee_id: Uuid,
) -> async_graphql::Result<EmployeeNode> {
    let record = employee::Entity::find_by_id(employee_id)
        .one(db)
        .await
        .map_err(db_error)?
        .ok_or_else(|| error_with_code("NOT_FOUND", "Employee not found"))?;
    let rows = attendance_for(db, employee_id).await?;
    Ok(EmployeeNode::from_model(record, rows))
}

async fn attendance_for(
    db: &DatabaseConnection,
    employee_id: Uuid,
) -> async_graphql::Result<Vec<attendance::Model>> {
    attendance::Entity::find()
        .filter(attendance::Column::EmployeeId.eq(employee_id))
        .order_by_asc(attendance::Column::RecordedAt)
        .all(db)
        .await
        .map_err(db_error)
}

async fn with_attendance(
    db: &DatabaseConnection,
    records: Vec<employee::Model>,
) -> async_graphql::Result<Vec<EmployeeNode>> {
    let ids: Vec<Uuid> = records.iter().map(|r| r.id).collect();
    let mut grouped: HashMap<Uuid, Vec<attendance::Model>> = HashMap::new();
    if !ids.is_empty() {
        let rows = attendance::Entity::find()
            .filter(attendance::Column::EmployeeId.is_in(ids))
            .order_by_asc(attendance::Column::RecordedAt)
            .all(db)
            .await
            .map_err(db_error)?;
        for row in rows {
            grouped.entry(row.employee_id).or_default().push(row);
        }
    }
    Ok(records
        .into_iter()
        .map(|model| {
            let rows = grouped.remove(&model.id).unwrap_or_default();
            EmployeeNode::from_model(model, rows)
        })
        .collect())
}

pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default()
        .hash_password(password.as_bytes(), &salt)?
        .to_string())
}

fn validate_name(name: &str) -> async_graphql::Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(error_with_code("BAD_REQUEST", "name must not be empty"));
    }
    Ok(trimmed.to_string())
}

fn normalize_email(email: &str) -> async_graphql::Result<String> {
    let normalized = email.trim().to_lowercase();
    if normalized.is_empty() || !normalized.contains('@') {
        return Err(error_with_code("BAD_REQUEST", "Invalid email"));
    }
    Ok(normalized)
}

fn database(ctx: &Context<'_>) -> async_graphql::Result<Arc<DatabaseConnection>> {
    ctx.data::<Arc<DatabaseConnection>>()
        .cloned()
        .map_err(|_| error_with_code("INTERNAL", "Missing database connection"))
}

fn auth_config(ctx: &Context<'_>) -> async_graphql::Result<Arc<AuthConfig>> {
    ctx.data::<Arc<AuthConfig>>()
        .cloned()
        .map_err(|_| error_with_code("INTERNAL", "Missing auth configuration"))
}

fn current_identity(ctx: &Context<'_>) -> async_graphql::Result<Identity> {
    ctx.data::<Identity>()
        .cloned()
        .map_err(|_| error_with_code("UNAUTHENTICATED", "Not authenticated"))
}

/// Defensive check inside resolvers; the field gate has already enforced
/// the same requirement for gated fields.
fn require_role(ctx: &Context<'_>, role: Role) -> async_graphql::Result<Identity> {
    let identity = current_identity(ctx)?;
    if identity.role.satisfies(role) {
        Ok(identity)
    } else {
        let message = match role {
            Role::Admin => "Admin access required",
            Role::Employee => "Employee access required",
        };
        Err(error_with_code("FORBIDDEN", message))
    }
}

fn require_subject(ctx: &Context<'_>) -> async_graphql::Result<Uuid> {
    let identity = current_identity(ctx)?;
    identity
        .id
        .ok_or_else(|| error_with_code("UNAUTHENTICATED", "Not authenticated"))
}

fn parse_uuid(id: &ID) -> async_graphql::Result<Uuid> {
    Uuid::parse_str(id.as_str()).map_err(|_| error_with_code("BAD_REQUEST", "Invalid ID"))
}

fn db_error(err: DbErr) -> Error {
    error_with_code("INTERNAL", format!("Database error: {}", err))
}

fn error_with_code(code: &'static str, message: impl Into<String>) -> Error {
    Error::new(message).extend_with(|_, e| e.set("code", code))
}

pub async fn seed_demo(db: &DatabaseConnection) -> Result<(), DbErr> {
    let seeded_at: DateTimeWithTimeZone = Utc::now().into();
    let ada = insert_seed_employee(
        db,
        "Ada Lovelace",
        "ada@records.test",
        "adapass",
        Some(1001),
        28,
        Some("Mathematics"),
        &["Analysis", "Mechanics"],
        seeded_at,
    )
    .await?;
    insert_seed_employee(
        db,
        "Charles Babbage",
        "charles@records.test",
        "charliepass",
        Some(1002),
        36,
        Some("Engineering"),
        &["Mechanics"],
        seeded_at,
    )
    .await?;

    for (offset, status) in [(2, attendance::Status::Present), (1, attendance::Status::Absent)] {
        attendance::ActiveModel {
            id: Set(Uuid::new_v4()),
            employee_id: Set(ada),
            date: Set(Utc::now().date_naive() - chrono::Duration::days(offset)),
            status: Set(status),
            recorded_at: Set(Utc::now().into()),
        }
        .insert(db)
        .await?;
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn insert_seed_employee(
    db: &DatabaseConnection,
    name: &str,
    email: &str,
    password: &str,
    employee_no: Option<i32>,
    age: i32,
    class: Option<&str>,
    subjects: &[&str],
    seeded_at: DateTimeWithTimeZone,
) -> Result<Uuid, DbErr> {
    let password_hash = hash_password(password)
        .map_err(|err| DbErr::Custom(format!("password hash failed: {}", err)))?;
    let id = Uuid::new_v4();
    employee::ActiveModel {
        id: Set(id),
        name: Set(name.to_string()),
        email: Set(email.to_string()),
        password_hash: Set(password_hash),
        employee_no: Set(employee_no),
        age: Set(age),
        class_name: Set(class.map(|c| c.to_string())),
        subjects: Set(serde_json::json!(subjects)),
        created_at: Set(seeded_at),
    }
    .insert(db)
    .await?;
    Ok(id)
}
