//! Registration, login, and session lifecycle tests against a real database
//!
//! Run with a disposable Postgres instance:
//! `TEST_DATABASE_URL=postgres://localhost/tradeloop_test cargo test -- --ignored`

#[cfg(test)]
mod tests {
    use sqlx::PgPool;
    use uuid::Uuid;

    use tradeloop_server::auth::{verify_token, AuthError, AuthService};
    use tradeloop_server::models::{LoginRequest, RegisterRequest};

    const JWT_SECRET: &str = "auth-test-secret";
    const ACCESS_TTL_SECONDS: i64 = 900;
    const REFRESH_TTL_DAYS: i64 = 7;

    /// Helper to create a test database pool with migrations applied
    async fn setup_test_db() -> PgPool {
        let database_url = std::env::var("TEST_DATABASE_URL")
            .unwrap_or_else(|_| "postgres://localhost/tradeloop_test".to_string());

        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(5)
            .connect(&database_url)
            .await
            .expect("Failed to connect to test database");

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("Failed to run migrations");

        pool
    }

    fn test_service(pool: &PgPool) -> AuthService {
        AuthService::new(
            pool.clone(),
            JWT_SECRET.to_string(),
            ACCESS_TTL_SECONDS,
            REFRESH_TTL_DAYS,
        )
    }

    fn unique_email() -> String {
        format!("{}@example.test", Uuid::new_v4())
    }

    fn register_request(email: &str) -> RegisterRequest {
        RegisterRequest {
            name: "Test User".to_string(),
            email: email.to_string(),
            password: "correct-horse-battery".to_string(),
        }
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_register_then_login_normalizes_email() {
        let pool = setup_test_db().await;
        let auth = test_service(&pool);

        let email = format!("MiXeD.{}@Example.TEST", Uuid::new_v4());

        let registered = auth
            .register(register_request(&email), None, None, None)
            .await
            .expect("Register should succeed");
        assert!(!registered.access_token.is_empty());
        assert!(!registered.refresh_token.is_empty());
        assert_eq!(registered.token_type, "Bearer");
        assert_eq!(registered.user.email, email.trim().to_lowercase());

        // Login with the lowercased form hits the same account
        let logged_in = auth
            .login(
                LoginRequest {
                    email: email.to_lowercase(),
                    password: "correct-horse-battery".to_string(),
                },
                None,
                None,
                None,
            )
            .await
            .expect("Login should succeed");
        assert_eq!(logged_in.user.id, registered.user.id);
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_duplicate_register_is_conflict() {
        let pool = setup_test_db().await;
        let auth = test_service(&pool);

        let email = unique_email();
        auth.register(register_request(&email), None, None, None)
            .await
            .expect("First register should succeed");

        let second = auth
            .register(register_request(&email), None, None, None)
            .await;
        assert!(matches!(second, Err(AuthError::EmailTaken)));
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_login_failures_are_indistinguishable() {
        let pool = setup_test_db().await;
        let auth = test_service(&pool);

        let email = unique_email();
        auth.register(register_request(&email), None, None, None)
            .await
            .expect("Register should succeed");

        let wrong_password = auth
            .login(
                LoginRequest {
                    email: email.clone(),
                    password: "not-the-password".to_string(),
                },
                None,
                None,
                None,
            )
            .await;
        assert!(matches!(wrong_password, Err(AuthError::InvalidCredentials)));

        let unknown_email = auth
            .login(
                LoginRequest {
                    email: unique_email(),
                    password: "correct-horse-battery".to_string(),
                },
                None,
                None,
                None,
            )
            .await;
        assert!(matches!(unknown_email, Err(AuthError::InvalidCredentials)));
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_refresh_rotates_the_session() {
        let pool = setup_test_db().await;
        let auth = test_service(&pool);

        let registered = auth
            .register(register_request(&unique_email()), None, None, None)
            .await
            .expect("Register should succeed");

        let refreshed = auth
            .refresh_tokens(&registered.refresh_token)
            .await
            .expect("Refresh should succeed");
        assert_ne!(refreshed.access_token, registered.access_token);
        assert_ne!(refreshed.refresh_token, registered.refresh_token);

        // Rotation invalidates the old refresh token
        let replayed = auth.refresh_tokens(&registered.refresh_token).await;
        assert!(matches!(replayed, Err(AuthError::SessionNotFound)));

        // The rotated one keeps working
        auth.refresh_tokens(&refreshed.refresh_token)
            .await
            .expect("Rotated refresh token should work");
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_access_token_is_refused_as_refresh_token() {
        let pool = setup_test_db().await;
        let auth = test_service(&pool);

        let registered = auth
            .register(register_request(&unique_email()), None, None, None)
            .await
            .expect("Register should succeed");

        let result = auth.refresh_tokens(&registered.access_token).await;
        assert!(matches!(result, Err(AuthError::InvalidRefreshToken)));
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_logout_revokes_the_session() {
        let pool = setup_test_db().await;
        let auth = test_service(&pool);

        let registered = auth
            .register(register_request(&unique_email()), None, None, None)
            .await
            .expect("Register should succeed");

        let claims = verify_token(&registered.access_token, JWT_SECRET)
            .expect("Access token should verify");
        assert_eq!(claims.token_type, "access");

        auth.verify_session(&claims.jti)
            .await
            .expect("Fresh session should verify");

        auth.revoke_session(&claims.jti)
            .await
            .expect("Logout should succeed");

        let after = auth.verify_session(&claims.jti).await;
        assert!(matches!(after, Err(AuthError::SessionNotFound)));

        // Revoking an already-revoked session is an error, not a no-op
        let again = auth.revoke_session(&claims.jti).await;
        assert!(matches!(again, Err(AuthError::SessionNotFound)));
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_logout_all_revokes_every_session() {
        let pool = setup_test_db().await;
        let auth = test_service(&pool);

        let email = unique_email();
        let registered = auth
            .register(register_request(&email), None, None, None)
            .await
            .expect("Register should succeed");

        // Two more devices
        for _ in 0..2 {
            auth.login(
                LoginRequest {
                    email: email.clone(),
                    password: "correct-horse-battery".to_string(),
                },
                Some("phone".to_string()),
                None,
                None,
            )
            .await
            .expect("Login should succeed");
        }

        let revoked = auth
            .revoke_all_sessions(registered.user.id)
            .await
            .expect("Logout-all should succeed");
        assert_eq!(revoked, 3);

        let claims = verify_token(&registered.access_token, JWT_SECRET)
            .expect("Access token should verify");
        let session = auth.verify_session(&claims.jti).await;
        assert!(matches!(session, Err(AuthError::SessionNotFound)));
    }
}
