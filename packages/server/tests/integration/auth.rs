use serde_json::json;

use crate::common::{TestApp, routes};

mod registration {
    use super::*;

    #[tokio::test]
    async fn new_user_can_register_with_valid_credentials() {
        let app = TestApp::spawn().await;

        let res = app
            .post_without_token(
                routes::REGISTER,
                &json!({"username": "ola", "email": "Ola@Example.com", "password": "securepass"}),
            )
            .await;

        assert_eq!(res.status, 201, "{}", res.text);
        assert!(res.body["id"].is_number());
        assert_eq!(res.body["username"], "ola");
        assert_eq!(res.body["email"], "ola@example.com");
        assert!(res.body.get("password").is_none());
    }

    #[tokio::test]
    async fn cannot_register_with_an_already_taken_username() {
        let app = TestApp::spawn().await;
        let first = app
            .post_without_token(
                routes::REGISTER,
                &json!({"username": "ola", "email": "ola@example.com", "password": "securepass"}),
            )
            .await;
        assert_eq!(first.status, 201);

        let second = app
            .post_without_token(
                routes::REGISTER,
                &json!({"username": "ola", "email": "other@example.com", "password": "securepass"}),
            )
            .await;
        assert_eq!(second.status, 409);
        assert_eq!(second.code(), "USERNAME_TAKEN");
    }

    #[tokio::test]
    async fn cannot_register_with_an_already_used_email() {
        let app = TestApp::spawn().await;
        let first = app
            .post_without_token(
                routes::REGISTER,
                &json!({"username": "ola", "email": "ola@example.com", "password": "securepass"}),
            )
            .await;
        assert_eq!(first.status, 201);

        let second = app
            .post_without_token(
                routes::REGISTER,
                &json!({"username": "ola2", "email": "OLA@example.com", "password": "securepass"}),
            )
            .await;
        assert_eq!(second.status, 409);
        assert_eq!(second.code(), "EMAIL_TAKEN");
    }

    #[tokio::test]
    async fn short_password_is_rejected() {
        let app = TestApp::spawn().await;

        let res = app
            .post_without_token(
                routes::REGISTER,
                &json!({"username": "ola", "email": "ola@example.com", "password": "short"}),
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.code(), "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn malformed_json_is_a_validation_error() {
        let app = TestApp::spawn().await;

        let res = app
            .post_without_token(routes::REGISTER, &json!({"username": "ola"}))
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.code(), "VALIDATION_ERROR");
    }
}

mod login {
    use super::*;

    #[tokio::test]
    async fn registered_user_can_log_in_by_email() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("marek", "password123").await;

        assert!(!token.is_empty());
    }

    #[tokio::test]
    async fn login_response_includes_user() {
        let app = TestApp::spawn().await;
        app.create_authenticated_user("marek", "password123").await;

        let res = app
            .post_without_token(
                routes::LOGIN,
                &json!({"email": "MAREK@example.com", "password": "password123"}),
            )
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["user"]["username"], "marek");
    }

    #[tokio::test]
    async fn wrong_password_is_rejected() {
        let app = TestApp::spawn().await;
        app.create_authenticated_user("marek", "password123").await;

        let res = app
            .post_without_token(
                routes::LOGIN,
                &json!({"email": "marek@example.com", "password": "wrongpassword"}),
            )
            .await;

        assert_eq!(res.status, 401);
        assert_eq!(res.code(), "INVALID_CREDENTIALS");
    }

    #[tokio::test]
    async fn unknown_email_is_rejected_the_same_way() {
        let app = TestApp::spawn().await;

        let res = app
            .post_without_token(
                routes::LOGIN,
                &json!({"email": "nobody@example.com", "password": "password123"}),
            )
            .await;

        assert_eq!(res.status, 401);
        assert_eq!(res.code(), "INVALID_CREDENTIALS");
    }
}

mod authenticated_access {
    use super::*;

    #[tokio::test]
    async fn me_returns_the_current_user() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("zosia", "password123").await;

        let res = app.get_with_token(routes::ME, &token).await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body["username"], "zosia");
        assert_eq!(res.body["email"], "zosia@example.com");
    }

    #[tokio::test]
    async fn me_without_token_is_rejected() {
        let app = TestApp::spawn().await;

        let res = app.get_without_token(routes::ME).await;

        assert_eq!(res.status, 401);
        assert_eq!(res.code(), "TOKEN_MISSING");
    }

    #[tokio::test]
    async fn me_with_garbage_token_is_rejected() {
        let app = TestApp::spawn().await;

        let res = app.get_with_token(routes::ME, "not-a-jwt").await;

        assert_eq!(res.status, 401);
        assert_eq!(res.code(), "TOKEN_INVALID");
    }
}
