use std::sync::Arc;

use async_graphql::extensions::{
    Extension, ExtensionContext, ExtensionFactory, NextResolve, ResolveInfo,
};
use async_graphql::{ServerError, ServerResult, Value};

use crate::auth::{Identity, Role};

/// Root fields and the minimum role required to execute them. Fields absent
/// from this table are never intercepted and resolve as normal.
const FIELD_GATES: &[(&str, &str, Role)] = &[
    ("Query", "employees", Role::Admin),
    ("Query", "employee", Role::Admin),
    ("Query", "myProfile", Role::Employee),
    ("Query", "myAttendance", Role::Employee),
    ("Mutation", "addEmployee", Role::Admin),
    ("Mutation", "updateEmployee", Role::Admin),
    ("Mutation", "markAttendance", Role::Admin),
];

pub fn required_role(parent_type: &str, field: &str) -> Option<Role> {
    FIELD_GATES
        .iter()
        .find(|(parent, name, _)| *parent == parent_type && *name == field)
        .map(|(_, _, role)| *role)
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum AccessDenied {
    Unauthenticated,
    Forbidden(Role),
}

impl AccessDenied {
    pub fn code(self) -> &'static str {
        match self {
            AccessDenied::Unauthenticated => "UNAUTHENTICATED",
            AccessDenied::Forbidden(_) => "FORBIDDEN",
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            AccessDenied::Unauthenticated => "Not authenticated",
            AccessDenied::Forbidden(Role::Admin) => "Admin access required",
            AccessDenied::Forbidden(Role::Employee) => "Employee access required",
        }
    }
}

/// Check a caller identity against one field's declared requirement.
pub fn check_access(identity: Option<&Identity>, required: Role) -> Result<(), AccessDenied> {
    let Some(identity) = identity else {
        return Err(AccessDenied::Unauthenticated);
    };
    if identity.role.satisfies(required) {
        Ok(())
    } else {
        Err(AccessDenied::Forbidden(required))
    }
}

/// Schema extension enforcing [`FIELD_GATES`] before any gated resolver
/// runs. Ungated fields pass straight through; results and resolver errors
/// propagate unmodified.
pub struct AuthGate;

impl ExtensionFactory for AuthGate {
    fn create(&self) -> Arc<dyn Extension> {
        Arc::new(AuthGateExtension)
    }
}

struct AuthGateExtension;

#[async_trait::async_trait]
impl Extension for AuthGateExtension {
    async fn resolve(
        &self,
        ctx: &ExtensionContext<'_>,
        info: ResolveInfo<'_>,
        next: NextResolve<'_>,
    ) -> ServerResult<Option<Value>> {
        if let Some(required) = required_role(info.parent_type, info.name) {
            let identity = ctx.data_opt::<Identity>();
            if let Err(denied) = check_access(identity, required) {
                let mut error = ServerError::new(denied.message(), None);
                error
                    .extensions
                    .get_or_insert_with(Default::default)
                    .set("code", denied.code());
                return Err(error);
            }
        }
        next.run(ctx, info).await
    }
}
