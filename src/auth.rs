use std::env;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::request::Parts,
    response::{IntoResponse, Response},
    RequestPartsExt,
};
use jsonwebtoken::{DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};

use crate::services::{Role, UserInfo};

/// JWT claims expected from the platform's identity service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthClaims {
    pub sub: String,
    pub exp: i64,
    pub iat: i64,
    pub session_id: Option<String>,
    pub role: Option<String>,
    pub agency_id: Option<i64>,
}

impl AuthClaims {
    pub fn panel_role(&self) -> Role {
        match self.role.as_deref() {
            Some("admin") => Role::Admin,
            _ => Role::Agency,
        }
    }

    pub fn user_info(&self) -> UserInfo {
        UserInfo {
            id: self.sub.parse().unwrap_or(0),
            is_guest: false,
            role: self.panel_role(),
            agency_id: self.agency_id,
            name: self.sub.clone(),
            ..UserInfo::default()
        }
    }
}

/// Rejection type returned when auth fails.
#[derive(Debug)]
pub enum AuthError {
    MissingToken,
    InvalidToken,
    MissingSecret,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        use axum::http::StatusCode;
        let status = match self {
            AuthError::MissingToken => StatusCode::UNAUTHORIZED,
            AuthError::InvalidToken => StatusCode::UNAUTHORIZED,
            AuthError::MissingSecret => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let msg = match self {
            AuthError::MissingToken => "missing bearer token",
            AuthError::InvalidToken => "invalid token",
            AuthError::MissingSecret => "server jwt secret not configured",
        };
        (status, msg).into_response()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthClaims
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        use axum_extra::{
            TypedHeader,
            headers::{Authorization, authorization::Bearer},
        };
        let TypedHeader(Authorization(bearer)) = parts
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await
            .map_err(|_| AuthError::MissingToken)?;

        let secret = env::var("JWT_SECRET").map_err(|_| AuthError::MissingSecret)?;

        let token_data = decode::<AuthClaims>(
            bearer.token(),
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|_| AuthError::InvalidToken)?;

        Ok(token_data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(role: Option<&str>, agency_id: Option<i64>) -> AuthClaims {
        AuthClaims {
            sub: "42".into(),
            exp: 0,
            iat: 0,
            session_id: None,
            role: role.map(str::to_string),
            agency_id,
        }
    }

    #[test]
    fn only_an_explicit_admin_claim_opens_the_admin_panel() {
        assert_eq!(claims(Some("admin"), None).panel_role(), Role::Admin);
        assert_eq!(claims(Some("agency"), Some(1)).panel_role(), Role::Agency);
        assert_eq!(claims(Some("superuser"), None).panel_role(), Role::Agency);
        assert_eq!(claims(None, None).panel_role(), Role::Agency);
    }

    #[test]
    fn user_info_carries_the_token_binding() {
        let info = claims(Some("agency"), Some(7)).user_info();
        assert!(!info.is_guest);
        assert_eq!(info.id, 42);
        assert_eq!(info.agency_id, Some(7));
        assert_eq!(info.name, "42");
    }

    #[test]
    fn non_numeric_subjects_do_not_forge_an_actor_id() {
        let mut odd = claims(None, None);
        odd.sub = "svc-reporting".into();
        let info = odd.user_info();
        assert_eq!(info.id, 0);
        assert_eq!(info.name, "svc-reporting");
    }
}
