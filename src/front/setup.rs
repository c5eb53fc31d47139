//! Onboarding endpoints called by the embedded signup frontend.

use super::{AppState, parse_json_body};
use crate::{
    api, consts,
    models::setup::{
        AuthCodeRequest, SetupResponse, TemplatesResponse, TestMessageRequest,
        TestMessageResponse, TokenInfo,
    },
};
use ntex::{util::Bytes, web};

#[web::post("/setup")]
pub async fn embedded_signup(
    body: Bytes,
    app_state: web::types::State<AppState>,
) -> Result<impl web::Responder, web::Error> {
    let request: AuthCodeRequest = parse_json_body(&body)?;
    let expose_full_token = app_state.config.expose_full_token;

    let outcome = api::onboarding::run_embedded_signup(
        &app_state.graph,
        &app_state.repo,
        &request,
        &app_state.config.facebook_redirect_uri,
        app_state.onboarding_deadline(),
    )
    .await?;

    let business_info = if expose_full_token {
        outcome.account.clone()
    } else {
        outcome.account.without_access_token()
    };

    Ok(web::HttpResponse::Ok().json(&SetupResponse {
        success: true,
        message: Some(consts::SETUP_SUCCESS_MESSAGE.to_string()),
        business_info: Some(business_info),
        setup_status: Some(outcome.setup_status.to_string()),
        next_steps: outcome.next_steps,
        token_info: Some(TokenInfo::new(
            &outcome.token,
            outcome.token_created_at,
            expose_full_token,
        )),
    }))
}

#[web::post("/templates")]
pub async fn list_templates(
    body: Bytes,
    app_state: web::types::State<AppState>,
) -> Result<impl web::Responder, web::Error> {
    let request: AuthCodeRequest = parse_json_body(&body)?;

    let outcome =
        api::templates::fetch_templates(&app_state.graph, &request, app_state.onboarding_deadline())
            .await?;

    Ok(web::HttpResponse::Ok().json(&TemplatesResponse {
        success: true,
        token_info: Some(TokenInfo::new(
            &outcome.token,
            outcome.token_created_at,
            app_state.config.expose_full_token,
        )),
        templates: outcome.templates,
    }))
}

#[web::post("/test-message")]
pub async fn send_test_message(
    body: Bytes,
    app_state: web::types::State<AppState>,
) -> Result<impl web::Responder, web::Error> {
    let request: TestMessageRequest = parse_json_body(&body)?;

    let message_ids = api::messages::send_test_message(
        &app_state.graph,
        &app_state.repo,
        &request,
        app_state.onboarding_deadline(),
    )
    .await?;

    Ok(web::HttpResponse::Ok().json(&TestMessageResponse {
        success: true,
        message_ids,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        front::{
            routes,
            test_utils::{test_config, test_state},
        },
        models::graph::{AccessToken, RemotePhoneNumber},
        services::MockGraphService,
    };
    use ntex::{http, web::test};
    use serde_json::{Value, json};

    fn signup_graph() -> MockGraphService {
        let mut graph = MockGraphService::new();
        graph
            .expect_exchange_token()
            .withf(|code, redirect_uri| {
                code == "auth-code" && redirect_uri == "https://app.example.com/cb"
            })
            .returning(|_, _| {
                Ok(AccessToken {
                    access_token: "EAAGm0PX4ZCpsBAKZCZAZBexampletoken".into(),
                    token_type: "bearer".into(),
                    expires_in: 5_183_944,
                })
            });
        graph
            .expect_get_business_accounts()
            .returning(|_| Ok(vec![]));
        graph.expect_get_phone_numbers().returning(|_, _| {
            Ok(vec![RemotePhoneNumber {
                id: "1066".into(),
                display_phone_number: "+52 55 1234 5678".into(),
                verified_name: "Acme".into(),
                quality_rating: "GREEN".into(),
                status: "CONNECTED".into(),
                code_verification_status: "VERIFIED".into(),
            }])
        });
        graph
            .expect_subscribe_webhooks()
            .returning(|_, _| Ok(()));
        graph
            .expect_get_business_profile()
            .returning(|_, _| Ok(serde_json::Map::new()));
        graph
    }

    async fn post(state: AppState, uri: &str, body: &'static str) -> (http::StatusCode, Value) {
        let app = test::init_service(
            web::App::new()
                .state(state)
                .configure(routes::whatsapp),
        )
        .await;
        let req = test::TestRequest::post()
            .uri(uri)
            .header("content-type", "application/json")
            .set_payload(body)
            .to_request();

        let resp = test::call_service(&app, req).await;
        let status = resp.status();
        let body = test::read_body(resp).await;

        (status, serde_json::from_slice(&body).unwrap())
    }

    #[ntex::test]
    async fn test_setup_hides_token_by_default() {
        let state = test_state(signup_graph(), test_config(&[]));
        let repo = state.repo.clone();

        let (status, body) = post(
            state,
            "/api/whatsapp/setup",
            r#"{"authorization_code":"auth-code","waba_id":"waba-1"}"#,
        )
        .await;

        assert_eq!(status, http::StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["message"], consts::SETUP_SUCCESS_MESSAGE);
        assert_eq!(body["setup_status"], "complete");
        assert_eq!(body["next_steps"].as_array().unwrap().len(), 3);
        assert_eq!(body["business_info"]["waba_id"], "waba-1");
        assert!(body["business_info"].get("access_token").is_none());
        assert_eq!(body["token_info"]["access_token_length"], 34);
        assert_eq!(
            body["token_info"]["access_token_preview"],
            "EAAGm0PX4ZCpsBAKZCZA..."
        );
        assert!(body["token_info"].get("full_access_token").is_none());
        assert!(body.get("error").is_none());

        let stored = repo.get("waba-1").await.unwrap();
        assert_eq!(stored.access_token, "EAAGm0PX4ZCpsBAKZCZAZBexampletoken");
    }

    #[ntex::test]
    async fn test_setup_exposes_token_when_enabled() {
        let state = test_state(
            signup_graph(),
            test_config(&[("EXPOSE_FULL_TOKEN", "true")]),
        );

        let (_, body) = post(
            state,
            "/api/whatsapp/setup",
            r#"{"authorization_code":"auth-code","waba_id":"waba-1"}"#,
        )
        .await;

        assert_eq!(
            body["token_info"]["full_access_token"],
            "EAAGm0PX4ZCpsBAKZCZAZBexampletoken"
        );
        assert_eq!(
            body["business_info"]["access_token"],
            "EAAGm0PX4ZCpsBAKZCZAZBexampletoken"
        );
    }

    #[ntex::test]
    async fn test_setup_rejects_invalid_body() {
        let state = test_state(MockGraphService::new(), test_config(&[]));

        let (status, body) = post(state, "/api/whatsapp/setup", "{oops").await;

        assert_eq!(status, http::StatusCode::BAD_REQUEST);
        assert_eq!(
            body,
            json!({"success": false, "error": "Invalid request body"})
        );
    }

    #[ntex::test]
    async fn test_setup_without_code_is_bad_request() {
        let state = test_state(MockGraphService::new(), test_config(&[]));

        let (status, body) = post(state, "/api/whatsapp/setup", r#"{"waba_id":"waba-1"}"#).await;

        assert_eq!(status, http::StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Authorization code is required");
    }

    #[ntex::test]
    async fn test_setup_exchange_failure_is_bad_request() {
        let mut graph = MockGraphService::new();
        graph.expect_exchange_token().returning(|_, _| {
            Err(anyhow::anyhow!(
                "all token exchange strategies failed, last error: strategy 3 failed: expired"
            ))
        });
        let state = test_state(graph, test_config(&[]));

        let (status, body) = post(
            state,
            "/api/whatsapp/setup",
            r#"{"authorization_code":"auth-code"}"#,
        )
        .await;

        assert_eq!(status, http::StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert!(
            body["error"]
                .as_str()
                .unwrap()
                .starts_with("Token exchange failed: all token exchange strategies failed")
        );
    }

    #[ntex::test]
    async fn test_templates_requires_waba_id() {
        let state = test_state(MockGraphService::new(), test_config(&[]));

        let (status, body) = post(
            state,
            "/api/whatsapp/templates",
            r#"{"authorization_code":"auth-code"}"#,
        )
        .await;

        assert_eq!(status, http::StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "WABA ID is required");
    }

    #[ntex::test]
    async fn test_templates_upstream_failure_is_bad_gateway() {
        let mut graph = MockGraphService::new();
        graph.expect_exchange_token().returning(|_, _| {
            Ok(AccessToken {
                access_token: "EAAG".into(),
                token_type: "bearer".into(),
                expires_in: 0,
            })
        });
        graph
            .expect_list_templates()
            .returning(|_, _| Err(anyhow::anyhow!("templates failed (500)")));
        let state = test_state(graph, test_config(&[]));

        let (status, body) = post(
            state,
            "/api/whatsapp/templates",
            r#"{"authorization_code":"auth-code","waba_id":"waba-1"}"#,
        )
        .await;

        assert_eq!(status, http::StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"], "Failed to fetch templates: templates failed (500)");
    }
}
