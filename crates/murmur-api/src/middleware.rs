use axum::{
    extract::OptionalFromRequestParts,
    http::{header, request::Parts},
};
use chrono::Utc;
use murmur_core::AppState;
use murmur_db::accounts::AccountRow;
use murmur_models::scopes::Scopes;

use crate::error::ApiError;

/// A validated OAuth access token. `account` is `None` for client-credential
/// tokens that act on behalf of an application only.
#[derive(Debug, Clone)]
pub struct AccessToken {
    pub token_id: i64,
    pub scopes: Scopes,
    pub account: Option<AccountRow>,
}

impl AccessToken {
    /// Reject the request unless the token grants `required`.
    pub fn require_scope(&self, required: Scopes) -> Result<(), ApiError> {
        if self.scopes.grants(required) {
            Ok(())
        } else {
            tracing::debug!(token_id = self.token_id, ?required, "token outside scopes");
            Err(ApiError::OutsideScopes)
        }
    }
}

/// The auth scheme name is case-insensitive.
fn bearer_token(parts: &Parts) -> Option<Result<&str, ApiError>> {
    let raw = parts.headers.get(header::AUTHORIZATION)?;
    let token = raw
        .to_str()
        .ok()
        .and_then(|v| v.trim().split_once(' '))
        .filter(|(scheme, _)| scheme.eq_ignore_ascii_case("bearer"))
        .map(|(_, token)| token.trim())
        .filter(|t| !t.is_empty())
        .ok_or(ApiError::Unauthorized);
    Some(token)
}

async fn validate_token(token: &str, state: &AppState) -> Result<AccessToken, ApiError> {
    let row = murmur_db::oauth_tokens::get_active_token(&state.db, token, Utc::now())
        .await?
        .ok_or(ApiError::Unauthorized)?;

    let account = match row.resource_owner_id {
        None => None,
        Some(user_id) => {
            let user = murmur_db::users::get_user_by_id(&state.db, user_id)
                .await?
                .ok_or(ApiError::Unauthorized)?;
            let account = murmur_db::accounts::get_account(&state.db, user.account_id)
                .await?
                .ok_or(ApiError::Unauthorized)?;
            if user.disabled || account.is_suspended() {
                tracing::debug!(user_id, account_id = account.id, "login disabled");
                return Err(ApiError::Forbidden);
            }
            Some(account)
        }
    };

    Ok(AccessToken {
        token_id: row.id,
        scopes: Scopes::parse(&row.scopes),
        account,
    })
}

/// Requests without an `Authorization` header are served anonymously; a
/// header that is present must still carry a valid bearer token.
impl OptionalFromRequestParts<AppState> for AccessToken {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Option<Self>, Self::Rejection> {
        match bearer_token(parts) {
            None => Ok(None),
            Some(token) => validate_token(token?, state).await.map(Some),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts(authorization: Option<&str>) -> Parts {
        let mut builder = Request::builder();
        if let Some(value) = authorization {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn bearer_scheme_is_case_insensitive() {
        for header in ["Bearer abc", "bearer abc", "BEARER   abc "] {
            let parts = parts(Some(header));
            assert_eq!(bearer_token(&parts).unwrap().unwrap(), "abc", "{header}");
        }
    }

    #[test]
    fn missing_header_is_anonymous_and_other_schemes_are_rejected() {
        assert!(bearer_token(&parts(None)).is_none());
        for header in ["Basic abc", "Bearer", "Bearer   "] {
            let parts = parts(Some(header));
            assert!(matches!(bearer_token(&parts), Some(Err(ApiError::Unauthorized))), "{header}");
        }
    }
}
