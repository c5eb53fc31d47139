//! # Embedded Signup Onboarding
//!
//! Turns the authorization code produced by the embedded signup popup into a
//! persisted [`Account`]. The run is linear:
//!
//! 1. Exchange the code for an access token
//! 2. Discover the business account, falling back to the `waba_id` reported
//!    by the popup when the platform does not list it yet
//! 3. List the account's phone numbers
//! 4. Subscribe the app to webhooks (best-effort)
//! 5. Fetch the business profile of the first number (best-effort)
//! 6. Save the account in the registry
//!
//! Best-effort steps downgrade the outcome instead of failing it. Every call
//! races the optional deadline; steps already completed are not rolled back.

use super::within_deadline;
use crate::{
    consts,
    front::errors::ApiError,
    metric,
    models::{
        account::{Account, AccountMetadata, PhoneNumberRecord},
        graph::{AccessToken, RemoteBusinessAccount},
        setup::AuthCodeRequest,
    },
    repo, services,
};
use chrono::{DateTime, TimeDelta, Utc};
use tokio::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

const NO_BUSINESS_ACCOUNTS: &str = "No WhatsApp Business Accounts found and no WABA ID provided. \
     Please ensure you completed the embedded signup flow and check the message event \
     with WABA details.";
const NO_PHONE_NUMBERS: &str = "No phone numbers found for this business account";

/// Result of a completed onboarding run
#[derive(Debug)]
pub struct SetupOutcome {
    /// Account as stored by the registry
    pub account: Account,
    pub token: AccessToken,
    pub token_created_at: DateTime<Utc>,
    pub setup_status: &'static str,
    pub next_steps: Vec<String>,
}

impl SetupOutcome {
    pub fn webhooks_enabled(&self) -> bool {
        self.account.webhooks_enabled
    }
}

/// Runs the whole onboarding sequence for one authorization code.
///
/// # Arguments
/// * `graph` - Graph API client
/// * `repo` - Account registry the result is saved to
/// * `request` - Body sent by the signup frontend
/// * `default_redirect_uri` - Used when the request carries no `redirect_uri`
/// * `deadline` - Upper bound for the whole run
///
/// # Errors
/// * [`ApiError::Validation`] when the code is missing
/// * [`ApiError::Upstream`] when a required Graph call fails
/// * [`ApiError::NotFound`] when no account or phone number can be found
/// * [`ApiError::Persistence`] when the registry rejects the save
/// * [`ApiError::DeadlineExceeded`] when `deadline` passes mid-run
pub async fn run_embedded_signup(
    graph: &services::ImplGraphService,
    repo: &repo::ImplAccountRepo,
    request: &AuthCodeRequest,
    default_redirect_uri: &str,
    deadline: Option<Instant>,
) -> Result<SetupOutcome, ApiError> {
    let result = embedded_signup(graph, repo, request, default_redirect_uri, deadline)
        .instrument(logfire::span!("embedded_signup"))
        .await;

    match &result {
        Ok(_) => metric::incr_onboarding_outcome_statds(consts::SETUP_STATUS_COMPLETE),
        Err(e) => metric::incr_onboarding_outcome_statds(e.kind()),
    }

    result
}

async fn embedded_signup(
    graph: &services::ImplGraphService,
    repo: &repo::ImplAccountRepo,
    request: &AuthCodeRequest,
    default_redirect_uri: &str,
    deadline: Option<Instant>,
) -> Result<SetupOutcome, ApiError> {
    let code = request.authorization_code.trim();
    if code.is_empty() {
        return Err(ApiError::Validation(
            "Authorization code is required".to_string(),
        ));
    }

    let redirect_uri = request.redirect_uri().unwrap_or(default_redirect_uri);
    logfire::info!(
        "Signup event reported waba={waba_id} phone_number={phone_number_id} business={business_id}",
        waba_id = request.waba_id.clone().unwrap_or_default(),
        phone_number_id = request.phone_number_id.clone().unwrap_or_default(),
        business_id = request.business_id.clone().unwrap_or_default()
    );

    logfire::info!("Step 1: exchanging authorization code for access token");
    let token = within_deadline(
        deadline,
        "exchanging the authorization code",
        graph.exchange_token(code, redirect_uri),
    )
    .await?
    .map_err(|e| ApiError::Upstream {
        detail: format!("Token exchange failed: {e:#}"),
        caller_input: true,
    })?;
    let token_created_at = Utc::now();

    logfire::info!("Step 2: fetching business accounts");
    let businesses = within_deadline(
        deadline,
        "fetching business accounts",
        graph.get_business_accounts(&token.access_token),
    )
    .await?
    .map_err(|e| upstream(format!("Failed to fetch business accounts: {e:#}")))?;

    let business = match businesses.into_iter().next() {
        Some(business) => business,
        None => {
            let Some(waba_id) = request.waba_id() else {
                return Err(ApiError::NotFound(NO_BUSINESS_ACCOUNTS.to_string()));
            };
            logfire::info!(
                "No business account listed yet, using signup waba {waba_id}",
                waba_id = waba_id.to_string()
            );
            RemoteBusinessAccount {
                id: waba_id.to_string(),
                name: consts::EMBEDDED_SIGNUP_ACCOUNT_NAME.to_string(),
                verification_status: consts::PENDING_VERIFICATION_STATUS.to_string(),
                profile_picture_uri: String::new(),
            }
        }
    };

    logfire::info!(
        "Step 3: fetching phone numbers for waba {waba_id}",
        waba_id = business.id.clone()
    );
    let phones = within_deadline(
        deadline,
        "fetching phone numbers",
        graph.get_phone_numbers(&token.access_token, &business.id),
    )
    .await?
    .map_err(|e| upstream(format!("Failed to fetch phone numbers: {e:#}")))?;

    let Some(first_phone) = phones.first() else {
        return Err(ApiError::NotFound(NO_PHONE_NUMBERS.to_string()));
    };

    logfire::info!("Step 4: subscribing webhooks");
    let webhooks_enabled = match within_deadline(
        deadline,
        "subscribing webhooks",
        graph.subscribe_webhooks(&token.access_token, &business.id),
    )
    .await?
    {
        Ok(()) => true,
        Err(e) => {
            logfire::warn!(
                "Failed to setup webhooks: {error}",
                error = format!("{e:#}")
            );
            false
        }
    };

    logfire::info!("Step 5: fetching business profile");
    let profile_info = within_deadline(
        deadline,
        "fetching the business profile",
        graph.get_business_profile(&token.access_token, &first_phone.id),
    )
    .await?
    .unwrap_or_else(|e| {
        logfire::warn!(
            "Failed to get business profile: {error}",
            error = format!("{e:#}")
        );
        serde_json::Map::new()
    });

    let token_expires_at = TimeDelta::try_seconds(token.expires_in)
        .and_then(|ttl| token_created_at.checked_add_signed(ttl))
        .unwrap_or(token_created_at);

    let account = Account {
        id: format!("ba_{}", Uuid::new_v4()),
        external_account_id: business.id.clone(),
        business_name: business.name,
        phone_numbers: phones.iter().map(PhoneNumberRecord::from).collect(),
        access_token: token.access_token.clone(),
        token_expires_at,
        webhooks_enabled,
        setup_complete: true,
        created_at: None,
        updated_at: None,
        metadata: AccountMetadata {
            verification_status: business.verification_status,
            profile_info,
            setup_source: consts::EMBEDDED_SIGNUP_SOURCE.to_string(),
            redirect_uri: redirect_uri.to_string(),
        },
    };

    logfire::info!("Step 6: saving business account");
    let account = within_deadline(deadline, "saving the business account", repo.save(account))
        .await?
        .map_err(|e| ApiError::Persistence(format!("Failed to save business account: {e}")))?;

    let mut next_steps: Vec<String> = consts::NEXT_STEPS.iter().map(|s| s.to_string()).collect();
    if !webhooks_enabled {
        next_steps.push(consts::NEXT_STEP_MANUAL_WEBHOOKS.to_string());
    }

    logfire::info!(
        "Setup completed for waba {waba_id}",
        waba_id = account.external_account_id.clone()
    );

    Ok(SetupOutcome {
        account,
        token,
        token_created_at,
        setup_status: consts::SETUP_STATUS_COMPLETE,
        next_steps,
    })
}

fn upstream(detail: String) -> ApiError {
    ApiError::Upstream {
        detail,
        caller_input: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::graph::{RemotePhoneNumber, Template},
        repo::{MockAccountRepo, RepoError},
        services::{GraphService, MockGraphService},
    };
    use async_trait::async_trait;
    use std::{sync::Arc, time::Duration};

    fn token() -> AccessToken {
        AccessToken {
            access_token: "EAAG-onboarding-token".into(),
            token_type: "bearer".into(),
            expires_in: 3600,
        }
    }

    fn phone(id: &str) -> RemotePhoneNumber {
        RemotePhoneNumber {
            id: id.into(),
            display_phone_number: "+52 55 1234 5678".into(),
            verified_name: "Acme".into(),
            quality_rating: "GREEN".into(),
            status: "CONNECTED".into(),
            code_verification_status: "VERIFIED".into(),
        }
    }

    fn request(waba_id: Option<&str>) -> AuthCodeRequest {
        AuthCodeRequest {
            authorization_code: "auth-code".into(),
            waba_id: waba_id.map(String::from),
            ..Default::default()
        }
    }

    /// Graph mock where every step succeeds and no business account is listed
    fn happy_graph() -> MockGraphService {
        let mut graph = MockGraphService::new();
        graph
            .expect_exchange_token()
            .returning(|_, _| Ok(token()));
        graph
            .expect_get_business_accounts()
            .returning(|_| Ok(vec![]));
        graph
            .expect_get_phone_numbers()
            .returning(|_, _| Ok(vec![phone("1066"), phone("2077")]));
        graph
            .expect_subscribe_webhooks()
            .returning(|_, _| Ok(()));
        graph.expect_get_business_profile().returning(|_, _| {
            let mut profile = serde_json::Map::new();
            profile.insert("about".into(), "Tacos".into());
            Ok(profile)
        });
        graph
    }

    fn echo_repo() -> MockAccountRepo {
        let mut repo = MockAccountRepo::new();
        repo.expect_save().times(1).returning(|mut account| {
            account.created_at = Some(Utc::now());
            account.updated_at = account.created_at;
            Ok(account)
        });
        repo
    }

    async fn run(
        graph: MockGraphService,
        repo: MockAccountRepo,
        request: AuthCodeRequest,
    ) -> Result<SetupOutcome, ApiError> {
        let graph: services::ImplGraphService = Arc::new(graph);
        let repo: repo::ImplAccountRepo = Arc::new(repo);
        run_embedded_signup(&graph, &repo, &request, "https://app.example.com/cb", None).await
    }

    #[ntex::test]
    async fn test_signup_synthesizes_pending_account_from_waba_id() {
        let outcome = run(happy_graph(), echo_repo(), request(Some("waba-77")))
            .await
            .unwrap();
        let account = &outcome.account;

        assert!(account.id.starts_with("ba_"));
        assert_eq!(account.external_account_id, "waba-77");
        assert_eq!(account.business_name, consts::EMBEDDED_SIGNUP_ACCOUNT_NAME);
        assert_eq!(account.metadata.verification_status, "pending");
        assert_eq!(account.metadata.setup_source, "embedded_signup");
        assert_eq!(account.metadata.redirect_uri, "https://app.example.com/cb");
        assert_eq!(account.metadata.profile_info["about"], "Tacos");
        assert_eq!(account.phone_numbers.len(), 2);
        assert!(account.phone_numbers.iter().all(|p| p.is_verified));
        assert_eq!(account.access_token, "EAAG-onboarding-token");
        assert!(account.setup_complete);
        assert!(account.webhooks_enabled);
        assert!(account.created_at.is_some());
        assert_eq!(
            account.token_expires_at,
            outcome.token_created_at + TimeDelta::seconds(3600)
        );
        assert_eq!(outcome.setup_status, "complete");
        assert_eq!(outcome.next_steps, consts::NEXT_STEPS.to_vec());
    }

    #[ntex::test]
    async fn test_signup_uses_first_listed_business_account() {
        let mut graph = MockGraphService::new();
        graph
            .expect_exchange_token()
            .withf(|code, redirect_uri| {
                code == "auth-code" && redirect_uri == "https://signup.example.com/done"
            })
            .returning(|_, _| Ok(token()));
        graph.expect_get_business_accounts().returning(|_| {
            Ok(vec![
                RemoteBusinessAccount {
                    id: "111".into(),
                    name: "Acme".into(),
                    verification_status: "verified".into(),
                    profile_picture_uri: String::new(),
                },
                RemoteBusinessAccount {
                    id: "222".into(),
                    name: "Other".into(),
                    verification_status: "verified".into(),
                    profile_picture_uri: String::new(),
                },
            ])
        });
        graph
            .expect_get_phone_numbers()
            .withf(|token, waba_id| token == "EAAG-onboarding-token" && waba_id == "111")
            .returning(|_, _| Ok(vec![phone("1066")]));
        graph
            .expect_subscribe_webhooks()
            .withf(|_, waba_id| waba_id == "111")
            .returning(|_, _| Ok(()));
        graph
            .expect_get_business_profile()
            .withf(|_, phone_number_id| phone_number_id == "1066")
            .returning(|_, _| Ok(serde_json::Map::new()));

        let request = AuthCodeRequest {
            redirect_uri: Some("https://signup.example.com/done".into()),
            ..request(Some("ignored-waba"))
        };
        let outcome = run(graph, echo_repo(), request).await.unwrap();

        assert_eq!(outcome.account.external_account_id, "111");
        assert_eq!(outcome.account.business_name, "Acme");
        assert_eq!(outcome.account.metadata.verification_status, "verified");
        assert_eq!(
            outcome.account.metadata.redirect_uri,
            "https://signup.example.com/done"
        );
    }

    #[ntex::test]
    async fn test_signup_without_accounts_or_waba_id_is_not_found() {
        let mut graph = MockGraphService::new();
        graph
            .expect_exchange_token()
            .returning(|_, _| Ok(token()));
        graph
            .expect_get_business_accounts()
            .returning(|_| Ok(vec![]));
        graph.expect_get_phone_numbers().never();
        let mut repo = MockAccountRepo::new();
        repo.expect_save().never();

        let err = run(graph, repo, request(None)).await.unwrap_err();

        assert_eq!(err, ApiError::NotFound(NO_BUSINESS_ACCOUNTS.to_string()));
    }

    #[ntex::test]
    async fn test_signup_requires_authorization_code() {
        let mut graph = MockGraphService::new();
        graph.expect_exchange_token().never();
        let mut repo = MockAccountRepo::new();
        repo.expect_save().never();

        let err = run(
            graph,
            repo,
            AuthCodeRequest {
                authorization_code: "   ".into(),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();

        assert_eq!(
            err,
            ApiError::Validation("Authorization code is required".into())
        );
    }

    #[ntex::test]
    async fn test_token_exchange_failure_is_attributed_to_caller() {
        let mut graph = MockGraphService::new();
        graph.expect_exchange_token().returning(|_, _| {
            Err(anyhow::anyhow!(
                "all token exchange strategies failed, last error: strategy 2 failed: bad code"
            ))
        });
        graph.expect_get_business_accounts().never();

        let err = run(graph, MockAccountRepo::new(), request(Some("waba-1")))
            .await
            .unwrap_err();

        assert_eq!(
            err,
            ApiError::Upstream {
                detail: "Token exchange failed: all token exchange strategies failed, \
                         last error: strategy 2 failed: bad code"
                    .into(),
                caller_input: true,
            }
        );
    }

    #[ntex::test]
    async fn test_webhook_failure_downgrades_outcome() {
        let mut graph = MockGraphService::new();
        graph
            .expect_exchange_token()
            .returning(|_, _| Ok(token()));
        graph
            .expect_get_business_accounts()
            .returning(|_| Ok(vec![]));
        graph
            .expect_get_phone_numbers()
            .returning(|_, _| Ok(vec![phone("1066")]));
        graph
            .expect_subscribe_webhooks()
            .returning(|_, _| Err(anyhow::anyhow!("webhook callback URL not configured")));
        graph
            .expect_get_business_profile()
            .returning(|_, _| Err(anyhow::anyhow!("business profile failed (500)")));

        let outcome = run(graph, echo_repo(), request(Some("waba-1")))
            .await
            .unwrap();

        assert!(!outcome.webhooks_enabled());
        assert!(outcome.account.setup_complete);
        assert!(outcome.account.metadata.profile_info.is_empty());
        assert_eq!(outcome.next_steps.len(), 4);
        assert_eq!(
            outcome.next_steps.last().map(String::as_str),
            Some(consts::NEXT_STEP_MANUAL_WEBHOOKS)
        );
    }

    #[ntex::test]
    async fn test_signup_without_phone_numbers_is_not_found() {
        let mut graph = MockGraphService::new();
        graph
            .expect_exchange_token()
            .returning(|_, _| Ok(token()));
        graph
            .expect_get_business_accounts()
            .returning(|_| Ok(vec![]));
        graph
            .expect_get_phone_numbers()
            .returning(|_, _| Ok(vec![]));
        graph.expect_subscribe_webhooks().never();
        let mut repo = MockAccountRepo::new();
        repo.expect_save().never();

        let err = run(graph, repo, request(Some("waba-1"))).await.unwrap_err();

        assert_eq!(err, ApiError::NotFound(NO_PHONE_NUMBERS.to_string()));
    }

    #[ntex::test]
    async fn test_phone_listing_failure_is_upstream() {
        let mut graph = MockGraphService::new();
        graph
            .expect_exchange_token()
            .returning(|_, _| Ok(token()));
        graph
            .expect_get_business_accounts()
            .returning(|_| Ok(vec![]));
        graph
            .expect_get_phone_numbers()
            .returning(|_, _| Err(anyhow::anyhow!("phone numbers failed (400)")));

        let err = run(graph, MockAccountRepo::new(), request(Some("waba-1")))
            .await
            .unwrap_err();

        assert_eq!(
            err,
            ApiError::Upstream {
                detail: "Failed to fetch phone numbers: phone numbers failed (400)".into(),
                caller_input: false,
            }
        );
    }

    #[ntex::test]
    async fn test_persistence_failure_is_reported() {
        let mut repo = MockAccountRepo::new();
        repo.expect_save()
            .returning(|_| Err(RepoError::Storage("account store lock poisoned".into())));

        let err = run(happy_graph(), repo, request(Some("waba-1")))
            .await
            .unwrap_err();

        assert_eq!(
            err,
            ApiError::Persistence(
                "Failed to save business account: account storage failure: \
                 account store lock poisoned"
                    .into()
            )
        );
    }

    /// Graph client whose phone listing never answers in time
    struct StalledPhonesGraph;

    #[async_trait]
    impl GraphService for StalledPhonesGraph {
        async fn exchange_token(&self, _: &str, _: &str) -> anyhow::Result<AccessToken> {
            Ok(token())
        }

        async fn get_business_accounts(
            &self,
            _: &str,
        ) -> anyhow::Result<Vec<RemoteBusinessAccount>> {
            Ok(vec![])
        }

        async fn get_phone_numbers(
            &self,
            _: &str,
            _: &str,
        ) -> anyhow::Result<Vec<RemotePhoneNumber>> {
            tokio::time::sleep(Duration::from_secs(120)).await;
            Ok(vec![phone("1066")])
        }

        async fn validate_token(&self, _: &str) -> anyhow::Result<bool> {
            Ok(true)
        }

        async fn subscribe_webhooks(&self, _: &str, _: &str) -> anyhow::Result<()> {
            Ok(())
        }

        async fn get_business_profile(
            &self,
            _: &str,
            _: &str,
        ) -> anyhow::Result<serde_json::Map<String, serde_json::Value>> {
            Ok(serde_json::Map::new())
        }

        async fn list_templates(&self, _: &str, _: &str) -> anyhow::Result<Vec<Template>> {
            Ok(vec![])
        }

        async fn send_text_message(
            &self,
            _: &str,
            _: &str,
            _: &str,
            _: &str,
        ) -> anyhow::Result<Vec<String>> {
            Ok(vec![])
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_aborts_run_before_persisting() {
        let graph: services::ImplGraphService = Arc::new(StalledPhonesGraph);
        let mut repo = MockAccountRepo::new();
        repo.expect_save().never();
        let repo: repo::ImplAccountRepo = Arc::new(repo);
        let deadline = Instant::now() + Duration::from_secs(60);

        let err = run_embedded_signup(&graph, &repo, &request(Some("waba-1")), "", Some(deadline))
            .await
            .unwrap_err();

        assert_eq!(
            err,
            ApiError::DeadlineExceeded("fetching phone numbers".into())
        );
    }
}
