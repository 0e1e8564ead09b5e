/*
[INPUT]:  Verification requests and the session cookie
[OUTPUT]: Identity projections and wallet binding confirmations
[POS]:    HTTP layer - identity endpoints (auth, user profile, wallet update)
[UPDATE]: When adding new identity endpoints or changing payloads
*/

use async_trait::async_trait;
use reqwest::{Method, Url};
use tracing::{debug, info};

use crate::auth::{BackendReply, IdentityBackend, SessionCredential};
use crate::http::client::{decode_body, issued_credential};
use crate::http::{IdentityClient, Result};
use crate::types::{ApiEnvelope, IdentityProfile, VerificationRequest};

impl IdentityClient {
    /// Sign in with a signed challenge and keep the issued session
    ///
    /// POST /v1/auth/register
    pub async fn register(&self, request: &VerificationRequest) -> Result<IdentityProfile> {
        let reply = self.submit_register(request).await?;
        if let Some(credential) = &reply.credential {
            self.store_session(credential);
        }
        Ok(reply.data)
    }

    /// Rebind the signed-in account's wallet
    ///
    /// POST /v1/user/update
    ///
    /// Any 2xx confirms the rebind; the identity is returned when the server
    /// echoes it.
    pub async fn update_wallet(
        &self,
        request: &VerificationRequest,
    ) -> Result<Option<IdentityProfile>> {
        let reply = self.submit_update(request).await?;
        if let Some(credential) = &reply.credential {
            self.store_session(credential);
        }
        Ok(reply.data)
    }

    async fn submit_register(
        &self,
        request: &VerificationRequest,
    ) -> Result<BackendReply<IdentityProfile>> {
        let builder = self
            .request(Method::POST, "/v1/auth/register")?
            .json(request);
        let response = self.execute(builder, Some(&request.pub_key)).await?;
        let credential = issued_credential(&response);
        let body = response.text().await?;
        let envelope: ApiEnvelope<IdentityProfile> = decode_body(&body)?;

        info!(
            identity = %envelope.data.id,
            pub_key = %request.pub_key,
            session_issued = credential.is_some(),
            "registered wallet"
        );
        Ok(BackendReply::new(envelope.data, credential))
    }

    async fn submit_update(
        &self,
        request: &VerificationRequest,
    ) -> Result<BackendReply<Option<IdentityProfile>>> {
        let builder = self
            .request(Method::POST, "/v1/user/update")?
            .json(request);
        let response = self.execute(builder, Some(&request.pub_key)).await?;
        let credential = issued_credential(&response);
        let body = response.text().await?;

        let identity = serde_json::from_str::<ApiEnvelope<IdentityProfile>>(&body)
            .ok()
            .map(|envelope| envelope.data);
        if identity.is_none() {
            debug!(body_len = body.len(), "wallet update confirmed without identity body");
        }

        info!(pub_key = %request.pub_key, "wallet rebound");
        Ok(BackendReply::new(identity, credential))
    }

    /// Query the signed-in profile
    ///
    /// GET /v1/user/profile
    pub async fn profile(&self) -> Result<IdentityProfile> {
        let builder = self.request(Method::GET, "/v1/user/profile")?;
        let envelope: ApiEnvelope<IdentityProfile> = self.send_json(builder).await?;
        Ok(envelope.data)
    }

    /// Query the signed-in user record
    ///
    /// GET /v1/user/
    pub async fn current_user(&self) -> Result<IdentityProfile> {
        let builder = self.request(Method::GET, "/v1/user/")?;
        let envelope: ApiEnvelope<IdentityProfile> = self.send_json(builder).await?;
        Ok(envelope.data)
    }

    /// Entry URL of the GitHub login redirect
    ///
    /// GET /v1/auth/github
    pub fn github_login_url(&self) -> Result<Url> {
        self.url("/v1/auth/github")
    }
}

#[async_trait]
impl IdentityBackend for IdentityClient {
    fn has_session(&self) -> bool {
        IdentityClient::has_session(self)
    }

    async fn register(
        &self,
        request: &VerificationRequest,
    ) -> Result<BackendReply<IdentityProfile>> {
        self.submit_register(request).await
    }

    async fn update_wallet(
        &self,
        request: &VerificationRequest,
    ) -> Result<BackendReply<Option<IdentityProfile>>> {
        self.submit_update(request).await
    }

    fn store_session(&self, credential: &SessionCredential) {
        IdentityClient::store_session(self, credential)
    }
}

#[cfg(test)]
mod tests {
    use crate::auth::IdentityBackend;
    use crate::http::{AuthError, ClientConfig, IdentityClient};
    use crate::types::VerificationRequest;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request() -> VerificationRequest {
        VerificationRequest {
            pub_key: "Wallet111".to_string(),
            signature: "c2ln".to_string(),
            message: "http://localhost:3000 wants you to sign and verify your account for Wallet111"
                .to_string(),
        }
    }

    async fn client(server: &MockServer) -> IdentityClient {
        IdentityClient::with_config_and_base_url(ClientConfig::default(), &server.uri()).unwrap()
    }

    #[tokio::test]
    async fn test_register_stores_session_cookie() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/auth/register"))
            .and(body_json(serde_json::json!({
                "pubKey": "Wallet111",
                "signature": "c2ln",
                "message": "http://localhost:3000 wants you to sign and verify your account for Wallet111",
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("set-cookie", "session=s3cr3t; Path=/; HttpOnly")
                    .set_body_json(serde_json::json!({
                        "data": {"id": "acct-1", "account_addr": "Wallet111"}
                    })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = client(&server).await;
        let identity = client.register(&request()).await.unwrap();

        assert_eq!(identity.id, "acct-1");
        assert_eq!(client.session_cookie().as_deref(), Some("session=s3cr3t"));
    }

    #[tokio::test]
    async fn test_backend_register_returns_cookie_without_storing_it() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/auth/register"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("set-cookie", "session=held; Path=/; HttpOnly")
                    .set_body_json(serde_json::json!({
                        "data": {"id": "acct-1", "account_addr": "Wallet111"}
                    })),
            )
            .mount(&server)
            .await;

        let client = client(&server).await;
        let reply = IdentityBackend::register(&client, &request()).await.unwrap();

        assert!(!client.has_session());
        let credential = reply.credential.expect("cookie issued");
        IdentityBackend::store_session(&client, &credential);
        assert_eq!(client.session_cookie().as_deref(), Some("session=held"));
    }

    #[tokio::test]
    async fn test_update_sends_cookie_and_accepts_empty_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/user/update"))
            .and(header("cookie", "session=s3cr3t"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let client = client(&server).await;
        client.set_session_cookie("session=s3cr3t");

        let identity = client.update_wallet(&request()).await.unwrap();
        assert!(identity.is_none());
    }

    #[tokio::test]
    async fn test_register_message_mismatch() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/auth/register"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": "message_mismatch",
                "message": "message does not match challenge",
            })))
            .mount(&server)
            .await;

        let client = client(&server).await;
        let err = client.register(&request()).await.unwrap_err();
        assert!(matches!(err, AuthError::MessageMismatch));
        assert!(!client.has_session());
    }

    #[tokio::test]
    async fn test_profile_unwraps_envelope() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/user/profile"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": {
                    "id": "acct-1",
                    "login": "octocat",
                    "name": "The Octocat",
                    "avatar_url": "https://avatars.githubusercontent.com/u/583231"
                }
            })))
            .mount(&server)
            .await;

        let client = client(&server).await;
        let profile = client.profile().await.unwrap();
        assert_eq!(profile.login.as_deref(), Some("octocat"));
        assert!(!profile.has_wallet());
    }

    #[tokio::test]
    async fn test_profile_plain_text_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/user/"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let client = client(&server).await;
        match client.current_user().await.unwrap_err() {
            AuthError::Api { code, message } => {
                assert_eq!(code, 500);
                assert_eq!(message, "boom");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_github_login_url() {
        let client =
            IdentityClient::with_config_and_base_url(ClientConfig::default(), "https://api.example")
                .unwrap();
        assert_eq!(
            client.github_login_url().unwrap().as_str(),
            "https://api.example/v1/auth/github"
        );
    }
}
