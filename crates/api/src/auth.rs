use chrono::{Duration, Utc};
use jsonwebtoken::{errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub admin_username: String,
    pub admin_password: String,
    pub token_ttl_hours: i64,
}

impl AuthConfig {
    pub fn encoding_key(&self) -> EncodingKey {
        EncodingKey::from_secret(self.jwt_secret.as_bytes())
    }

    pub fn decoding_key(&self) -> DecodingKey {
        DecodingKey::from_secret(self.jwt_secret.as_bytes())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<Uuid>,
    pub role: String,
    pub exp: usize,
    pub iat: usize,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Role {
    Admin,
    Employee,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Employee => "EMPLOYEE",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "ADMIN" => Some(Role::Admin),
            "EMPLOYEE" => Some(Role::Employee),
            _ => None,
        }
    }

    /// Whether a caller holding this role clears a gate requiring `required`.
    /// Admins clear employee-level gates; the reverse does not hold.
    pub fn satisfies(self, required: Role) -> bool {
        match required {
            Role::Admin => self == Role::Admin,
            Role::Employee => matches!(self, Role::Employee | Role::Admin),
        }
    }
}

/// Verified caller identity attached to request-scoped GraphQL data.
/// Admin tokens carry no subject id; employee tokens carry the record id.
#[derive(Debug, Clone)]
pub struct Identity {
    pub id: Option<Uuid>,
    pub role: Role,
}

pub fn issue_token(
    id: Option<Uuid>,
    role: Role,
    config: &AuthConfig,
) -> jsonwebtoken::errors::Result<String> {
    let now = Utc::now();
    let exp = now
        .checked_add_signed(Duration::hours(config.token_ttl_hours))
        .unwrap_or(now)
        .timestamp() as usize;
    let claims = Claims {
        sub: id,
        role: role.as_str().to_string(),
        exp,
        iat: now.timestamp() as usize,
    };
    jsonwebtoken::encode(&Header::default(), &claims, &config.encoding_key())
}

pub fn decode_token(
    token: &str,
    config: &AuthConfig,
) -> jsonwebtoken::errors::Result<Identity> {
    let claims = jsonwebtoken::decode::<Claims>(
        token,
        &config.decoding_key(),
        &Validation::default(),
    )
    .map(|data| data.claims)?;
    let role = Role::from_str(&claims.role).ok_or(ErrorKind::InvalidToken)?;
    Ok(Identity {
        id: claims.sub,
        role,
    })
}
