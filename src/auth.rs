//! Explicit authentication context.
//!
//! Handlers that need a caller take an [`AuthUser`] argument instead of
//! reaching into request-scoped globals. Session issuance belongs to the
//! platform's auth service; this module only resolves bearer tokens.

use std::sync::Arc;

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use rusqlite::OptionalExtension;
use uuid::Uuid;

use crate::{db::GameDb, error::AppError, models::now_ms, state::State};

/// The authenticated caller, resolved from `Authorization: Bearer <token>`.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
}

impl FromRequestParts<Arc<State>> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<State>,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or(AppError::AuthenticationRequired)?;

        lookup_session(&state.db, token)?
            .map(|user_id| AuthUser { user_id })
            .ok_or(AppError::AuthenticationRequired)
    }
}

pub fn lookup_session(db: &GameDb, token: &str) -> Result<Option<String>, AppError> {
    let conn = db.conn();
    let user_id = conn
        .query_row(
            "SELECT user_id FROM sessions WHERE token = ?1",
            [token],
            |row| row.get(0),
        )
        .optional()?;

    Ok(user_id)
}

/// Create a session token for a user. Bootstrap helper only; real sessions
/// come from the platform's auth service writing the same table.
pub fn issue_session(db: &GameDb, user_id: &str) -> Result<String, AppError> {
    let token = Uuid::new_v4().to_string();

    db.conn().execute(
        "INSERT INTO sessions (token, user_id, created_at) VALUES (?1, ?2, ?3)",
        rusqlite::params![token, user_id, now_ms()],
    )?;

    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use axum::http::Request;

    fn test_state() -> Arc<State> {
        Arc::new(State {
            config: Config {
                port: 0,
                db_path: String::new(),
            },
            db: GameDb::open_in_memory().unwrap(),
        })
    }

    fn parts_with(header: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/games/stats");
        if let Some(value) = header {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[tokio::test]
    async fn test_extractor_rejects_missing_or_malformed_header() {
        let state = test_state();

        for header in [None, Some("raw-token"), Some("Basic abc")] {
            let mut parts = parts_with(header);
            let err = AuthUser::from_request_parts(&mut parts, &state)
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::AuthenticationRequired));
        }
    }

    #[tokio::test]
    async fn test_extractor_rejects_unknown_token() {
        let state = test_state();

        let mut parts = parts_with(Some("Bearer not-a-session"));
        let err = AuthUser::from_request_parts(&mut parts, &state)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::AuthenticationRequired));
    }

    #[tokio::test]
    async fn test_extractor_resolves_valid_token() {
        let state = test_state();
        let token = issue_session(&state.db, "etudiant-1").unwrap();

        let mut parts = parts_with(Some(&format!("Bearer {token}")));
        let user = AuthUser::from_request_parts(&mut parts, &state)
            .await
            .unwrap();

        assert_eq!(user.user_id, "etudiant-1");
    }

    #[test]
    fn test_issue_and_lookup() {
        let db = GameDb::open_in_memory().unwrap();

        let token = issue_session(&db, "etudiant-1").unwrap();
        let user = lookup_session(&db, &token).unwrap();

        assert_eq!(user.as_deref(), Some("etudiant-1"));
    }

    #[test]
    fn test_unknown_token() {
        let db = GameDb::open_in_memory().unwrap();

        assert!(lookup_session(&db, "nope").unwrap().is_none());
    }
}
