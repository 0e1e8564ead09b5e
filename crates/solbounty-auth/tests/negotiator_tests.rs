/*
[INPUT]:  Keypair wallets, mock wallets and the in-process verifier
[OUTPUT]: Test results for the end-to-end negotiation flow
[POS]:    Integration tests - session negotiator
[UPDATE]: When flow steps, intents or cancellation rules change
*/

mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use common::{TEST_ORIGIN, local_backend, negotiator_config, reference_verifier, test_wallet};
use solbounty_auth::auth::MockSignBehavior;
use solbounty_auth::{
    AuthError,
    BackendReply,
    FailureKind,
    FlowStage,
    IdentityBackend,
    IdentityProfile,
    Intent,
    KeypairWallet,
    LocalBackend,
    MockWallet,
    NegotiatorConfig,
    NegotiatorState,
    Result,
    SessionCredential,
    SessionNegotiator,
    VerificationRequest,
    WalletAdapter,
};
use tokio::sync::Notify;
use tokio_test::assert_ok;

/// Holds the first register call until released
struct GatedBackend {
    inner: LocalBackend,
    entered: Notify,
    release: Notify,
    calls: AtomicUsize,
}

impl GatedBackend {
    fn new(inner: LocalBackend) -> Self {
        Self {
            inner,
            entered: Notify::new(),
            release: Notify::new(),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl IdentityBackend for GatedBackend {
    fn has_session(&self) -> bool {
        self.inner.has_session()
    }

    async fn register(
        &self,
        request: &VerificationRequest,
    ) -> Result<BackendReply<IdentityProfile>> {
        if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
            self.entered.notify_one();
            self.release.notified().await;
        }
        self.inner.register(request).await
    }

    async fn update_wallet(
        &self,
        request: &VerificationRequest,
    ) -> Result<BackendReply<Option<IdentityProfile>>> {
        self.inner.update_wallet(request).await
    }

    fn store_session(&self, credential: &SessionCredential) {
        self.inner.store_session(credential)
    }
}

/// Rewrites the signed message before forwarding it
struct TamperingBackend {
    inner: LocalBackend,
}

#[async_trait]
impl IdentityBackend for TamperingBackend {
    fn has_session(&self) -> bool {
        self.inner.has_session()
    }

    async fn register(
        &self,
        request: &VerificationRequest,
    ) -> Result<BackendReply<IdentityProfile>> {
        let mut tampered = request.clone();
        tampered.message = tampered.message.replace(TEST_ORIGIN, "https://evil.test");
        self.inner.register(&tampered).await
    }

    async fn update_wallet(
        &self,
        request: &VerificationRequest,
    ) -> Result<BackendReply<Option<IdentityProfile>>> {
        self.inner.update_wallet(request).await
    }

    fn store_session(&self, credential: &SessionCredential) {
        self.inner.store_session(credential)
    }
}

#[tokio::test]
async fn test_login_end_to_end_against_reference_verifier() {
    let verifier = reference_verifier();
    let backend = Arc::new(local_backend(&verifier));
    let wallet = Arc::new(test_wallet());
    let negotiator = assert_ok!(SessionNegotiator::new(
        negotiator_config(),
        backend.clone(),
        wallet.clone(),
    ));

    let outcome = assert_ok!(negotiator.login().await);

    assert_eq!(outcome.public_key, wallet.address());
    assert_eq!(outcome.redirect, Some("/dashboard"));
    let identity = outcome.identity.expect("register returns the identity");
    assert_eq!(identity.wallet_address.as_deref(), Some(wallet.address()));
    assert_eq!(
        negotiator.session().identity().map(|identity| identity.id),
        Some(identity.id)
    );
    assert!(backend.has_session());
    assert_eq!(verifier.registry().identity_count(), 1);
}

#[tokio::test]
async fn test_second_login_resolves_same_identity() {
    let verifier = reference_verifier();
    let wallet = Arc::new(test_wallet());

    let first = SessionNegotiator::new(
        negotiator_config(),
        Arc::new(local_backend(&verifier)),
        wallet.clone(),
    )
    .unwrap();
    let second = SessionNegotiator::new(
        negotiator_config(),
        Arc::new(local_backend(&verifier)),
        wallet.clone(),
    )
    .unwrap();

    let a = first.login().await.unwrap().identity.unwrap();
    let b = second.login().await.unwrap().identity.unwrap();

    assert_eq!(a.id, b.id);
    assert_eq!(verifier.registry().identity_count(), 1);
}

#[tokio::test]
async fn test_tampered_message_rejected_without_side_effects() {
    let verifier = reference_verifier();
    let backend = Arc::new(TamperingBackend {
        inner: local_backend(&verifier),
    });
    let negotiator =
        SessionNegotiator::new(negotiator_config(), backend.clone(), Arc::new(test_wallet()))
            .unwrap();

    let err = negotiator.login().await.unwrap_err();

    assert!(matches!(err, AuthError::MessageMismatch));
    assert_eq!(
        negotiator.state(),
        NegotiatorState::Failed {
            reason: FailureKind::MessageMismatch
        }
    );
    assert!(!negotiator.session().is_authenticated());
    assert!(!backend.has_session());
    assert_eq!(verifier.registry().identity_count(), 0);
    assert_eq!(verifier.registry().session_count(), 0);
}

#[tokio::test]
async fn test_origin_mismatch_between_client_and_server() {
    let verifier = reference_verifier();
    let backend = Arc::new(local_backend(&verifier));
    let negotiator = SessionNegotiator::new(
        NegotiatorConfig {
            origin: "https://other.test".to_string(),
            ..NegotiatorConfig::default()
        },
        backend,
        Arc::new(test_wallet()),
    )
    .unwrap();

    let err = negotiator.login().await.unwrap_err();
    assert!(matches!(err, AuthError::MessageMismatch));
    assert_eq!(verifier.registry().identity_count(), 0);
}

#[tokio::test]
async fn test_github_session_then_wallet_update() {
    let verifier = reference_verifier();
    let (account, grant) = verifier
        .registry()
        .link_github("octocat", Some("The Octocat"), None);
    let backend = Arc::new(local_backend(&verifier).with_session(grant.token));
    let wallet = Arc::new(test_wallet());
    let negotiator =
        SessionNegotiator::new(negotiator_config(), backend, wallet.clone()).unwrap();

    let outcome = assert_ok!(negotiator.update_wallet().await);

    assert_eq!(outcome.intent, Intent::UpdateWallet);
    assert_eq!(outcome.redirect, None);
    let identity = outcome.identity.expect("local backend echoes the identity");
    assert_eq!(identity.id, account.id.to_string());
    assert_eq!(identity.login.as_deref(), Some("octocat"));
    assert_eq!(
        verifier
            .registry()
            .find_by_wallet(wallet.address())
            .map(|identity| identity.id),
        Some(account.id)
    );
}

#[tokio::test]
async fn test_rebinding_foreign_wallet_is_rejected() {
    let verifier = reference_verifier();
    let wallet = Arc::new(test_wallet());

    // wallet already signed up on its own
    SessionNegotiator::new(
        negotiator_config(),
        Arc::new(local_backend(&verifier)),
        wallet.clone(),
    )
    .unwrap()
    .login()
    .await
    .unwrap();

    let (_, grant) = verifier.registry().link_github("octocat", None, None);
    let negotiator = SessionNegotiator::new(
        negotiator_config(),
        Arc::new(local_backend(&verifier).with_session(grant.token)),
        wallet,
    )
    .unwrap();

    let err = negotiator.update_wallet().await.unwrap_err();
    assert!(matches!(err, AuthError::WalletAlreadyLinked { .. }));
    assert_eq!(
        negotiator.state(),
        NegotiatorState::Failed {
            reason: FailureKind::WalletAlreadyLinked
        }
    );
}

#[tokio::test]
async fn test_stale_attempt_is_superseded() {
    let verifier = reference_verifier();
    let backend = Arc::new(GatedBackend::new(local_backend(&verifier)));
    let negotiator =
        SessionNegotiator::new(negotiator_config(), backend.clone(), Arc::new(test_wallet()))
            .unwrap();

    let stale = negotiator.login();
    let fresh = async {
        backend.entered.notified().await;
        assert_eq!(negotiator.state(), NegotiatorState::AwaitingServerVerification);
        let result = negotiator.login().await;
        let token = backend.inner.session_token();
        backend.release.notify_one();
        (result, token)
    };
    let (stale, (fresh, fresh_token)) = tokio::join!(stale, fresh);

    assert!(matches!(stale, Err(AuthError::Superseded)));
    assert_ok!(fresh);
    assert_eq!(negotiator.generation(), 2);
    // the stale reply was issued last but must not replace the fresh token
    assert_eq!(verifier.registry().session_count(), 2);
    assert!(fresh_token.is_some());
    assert_eq!(backend.inner.session_token(), fresh_token);
    assert_eq!(
        negotiator.state(),
        NegotiatorState::Authenticated {
            intent: Intent::Register
        }
    );
}

#[tokio::test]
async fn test_cancel_discards_in_flight_result() {
    let verifier = reference_verifier();
    let backend = Arc::new(GatedBackend::new(local_backend(&verifier)));
    let negotiator =
        SessionNegotiator::new(negotiator_config(), backend.clone(), Arc::new(test_wallet()))
            .unwrap();

    let attempt = negotiator.login();
    let cancel = async {
        backend.entered.notified().await;
        negotiator.cancel();
        backend.release.notify_one();
    };
    let (result, ()) = tokio::join!(attempt, cancel);

    assert!(matches!(result, Err(AuthError::Superseded)));
    assert_eq!(negotiator.state(), NegotiatorState::Idle);
    assert!(!negotiator.session().is_authenticated());
    // the server answered, but the abandoned attempt keeps no credential
    assert_eq!(verifier.registry().session_count(), 1);
    assert!(!backend.has_session());

    let err = negotiator.update_wallet().await.unwrap_err();
    assert!(matches!(err, AuthError::SessionRequired));
}

#[tokio::test]
async fn test_loading_flag_tracks_suspension_points() {
    let verifier = reference_verifier();
    let backend = Arc::new(GatedBackend::new(local_backend(&verifier)));
    let negotiator = SessionNegotiator::new(
        negotiator_config(),
        backend.clone(),
        Arc::new(KeypairWallet::from_secret_key(&[2u8; 32])),
    )
    .unwrap();
    let mut states = negotiator.subscribe();
    assert!(!negotiator.is_loading());

    let attempt = negotiator.login();
    let observer = async {
        backend.entered.notified().await;
        assert!(negotiator.is_loading());
        assert!(states.borrow_and_update().is_loading());
        backend.release.notify_one();
    };
    let (result, ()) = tokio::join!(attempt, observer);

    assert_ok!(result);
    assert!(!negotiator.is_loading());
    assert!(states.has_changed().unwrap());
    assert!(states.borrow_and_update().is_terminal());
}

#[tokio::test(start_paused = true)]
async fn test_unanswered_signature_prompt_times_out() {
    let verifier = reference_verifier();
    let wallet = Arc::new(
        MockWallet::new("Wallet111", b"sig")
            .connected()
            .with_behavior(MockSignBehavior::Hang),
    );
    let negotiator = SessionNegotiator::new(
        NegotiatorConfig {
            sign_timeout: Duration::from_secs(5),
            ..negotiator_config()
        },
        Arc::new(local_backend(&verifier)),
        wallet,
    )
    .unwrap();

    match negotiator.login().await.unwrap_err() {
        AuthError::Timeout { stage, duration } => {
            assert_eq!(stage, FlowStage::Signature);
            assert_eq!(duration, 5);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(
        negotiator.state(),
        NegotiatorState::Failed {
            reason: FailureKind::Timeout
        }
    );
}

#[tokio::test]
async fn test_wallet_without_signing_fails_before_prompt() {
    let verifier = reference_verifier();
    let wallet = Arc::new(MockWallet::new("Wallet111", b"sig").without_signing());
    let negotiator =
        SessionNegotiator::new(negotiator_config(), Arc::new(local_backend(&verifier)), wallet.clone())
            .unwrap();

    let err = negotiator.login().await.unwrap_err();

    assert!(matches!(err, AuthError::NoWalletConnected));
    assert!(wallet.public_key().is_some());
    assert_eq!(wallet.sign_calls(), 0);
    assert_eq!(verifier.registry().identity_count(), 0);
}

#[tokio::test]
async fn test_refused_connect_prompt_fails_without_backend_call() {
    let verifier = reference_verifier();
    let backend = Arc::new(GatedBackend::new(local_backend(&verifier)));
    let wallet = Arc::new(MockWallet::new("Wallet111", b"sig").refusing_connect());
    let negotiator =
        SessionNegotiator::new(negotiator_config(), backend.clone(), wallet.clone()).unwrap();
    let mut states = negotiator.subscribe();

    let err = negotiator.login().await.unwrap_err();

    assert!(matches!(err, AuthError::NoWalletConnected));
    assert_eq!(
        negotiator.state(),
        NegotiatorState::Failed {
            reason: FailureKind::NoWalletConnected
        }
    );
    assert!(states.has_changed().unwrap());
    assert_eq!(wallet.sign_calls(), 0);
    assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    assert!(!backend.has_session());
}

#[tokio::test(start_paused = true)]
async fn test_unanswered_connect_prompt_times_out() {
    let verifier = reference_verifier();
    let backend = Arc::new(GatedBackend::new(local_backend(&verifier)));
    let wallet = Arc::new(MockWallet::new("Wallet111", b"sig").hanging_connect());
    let negotiator = SessionNegotiator::new(
        NegotiatorConfig {
            connect_timeout: Duration::from_secs(10),
            ..negotiator_config()
        },
        backend.clone(),
        wallet.clone(),
    )
    .unwrap();

    let attempt = negotiator.login();
    let observer = async {
        tokio::task::yield_now().await;
        assert_eq!(negotiator.state(), NegotiatorState::AwaitingWalletConnect);
        assert!(negotiator.is_loading());
    };
    let (result, ()) = tokio::join!(attempt, observer);

    match result.unwrap_err() {
        AuthError::Timeout { stage, duration } => {
            assert_eq!(stage, FlowStage::WalletConnect);
            assert_eq!(duration, 10);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(
        negotiator.state(),
        NegotiatorState::Failed {
            reason: FailureKind::Timeout
        }
    );
    assert_eq!(wallet.sign_calls(), 0);
    assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
}
