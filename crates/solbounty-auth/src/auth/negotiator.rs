/*
[INPUT]:  Wallet capability, identity backend, origin and timeouts
[OUTPUT]: Authenticated session or a classified failure
[POS]:    Auth layer - orchestrates the challenge/sign/verify flow
[UPDATE]: When flow steps, intents or cancellation rules change
*/

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::auth::challenge::{canonical_origin, compose};
use crate::auth::session::{SessionCredential, SessionTracker};
use crate::auth::signer::SignerAdapter;
use crate::auth::state::{FlowEvent, FlowStateMachine, Intent, NegotiatorState};
use crate::auth::wallet::WalletAdapter;
use crate::http::{AuthError, FlowStage, Result};
use crate::types::{IdentityProfile, VerificationRequest};

/// Server answer plus any session credential it issued
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendReply<T> {
    pub data: T,
    pub credential: Option<SessionCredential>,
}

impl<T> BackendReply<T> {
    pub fn new(data: T, credential: Option<SessionCredential>) -> Self {
        Self { data, credential }
    }
}

/// Server side of the flow as seen by the negotiator
///
/// `register` and `update_wallet` must not install the credential they
/// receive; the negotiator hands it to `store_session` when the attempt
/// commits.
#[async_trait]
pub trait IdentityBackend: Send + Sync {
    /// Whether the caller currently holds a session credential
    fn has_session(&self) -> bool;

    /// `POST /v1/auth/register`
    async fn register(
        &self,
        request: &VerificationRequest,
    ) -> Result<BackendReply<IdentityProfile>>;

    /// `POST /v1/user/update`; the server may or may not echo the identity
    async fn update_wallet(
        &self,
        request: &VerificationRequest,
    ) -> Result<BackendReply<Option<IdentityProfile>>>;

    /// Install a credential issued to a committed attempt
    fn store_session(&self, credential: &SessionCredential);
}

/// Negotiator configuration
#[derive(Debug, Clone)]
pub struct NegotiatorConfig {
    /// Scheme and host of the calling client
    pub origin: String,
    pub connect_timeout: Duration,
    pub sign_timeout: Duration,
    pub verify_timeout: Duration,
}

impl Default for NegotiatorConfig {
    fn default() -> Self {
        Self {
            origin: "http://localhost:3000".to_string(),
            connect_timeout: Duration::from_secs(120),
            sign_timeout: Duration::from_secs(120),
            verify_timeout: Duration::from_secs(30),
        }
    }
}

/// Result of a successful attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowOutcome {
    pub intent: Intent,
    pub public_key: String,
    pub identity: Option<IdentityProfile>,
    /// Route the UI should navigate to
    pub redirect: Option<&'static str>,
}

/// Drives one wallet verification attempt at a time
///
/// Each attempt gets a generation number. Starting a new attempt or calling
/// [`SessionNegotiator::cancel`] retires the previous generation, and a
/// retired attempt can no longer change state or the session projection.
pub struct SessionNegotiator {
    backend: Arc<dyn IdentityBackend>,
    wallet: Arc<dyn WalletAdapter>,
    signer: SignerAdapter,
    origin: String,
    connect_timeout: Duration,
    verify_timeout: Duration,
    generation: AtomicU64,
    machine: Mutex<FlowStateMachine>,
    state_tx: watch::Sender<NegotiatorState>,
    session: SessionTracker,
}

impl SessionNegotiator {
    pub fn new(
        config: NegotiatorConfig,
        backend: Arc<dyn IdentityBackend>,
        wallet: Arc<dyn WalletAdapter>,
    ) -> Result<Self> {
        let origin = canonical_origin(&config.origin)?;
        let (state_tx, _) = watch::channel(NegotiatorState::Idle);

        Ok(Self {
            backend,
            wallet,
            signer: SignerAdapter::new(config.sign_timeout),
            origin,
            connect_timeout: config.connect_timeout,
            verify_timeout: config.verify_timeout,
            generation: AtomicU64::new(0),
            machine: Mutex::new(FlowStateMachine::new()),
            state_tx,
            session: SessionTracker::new(),
        })
    }

    /// Share a session projection with other components
    pub fn with_session(mut self, session: SessionTracker) -> Self {
        self.session = session;
        self
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn state(&self) -> NegotiatorState {
        *self.state_tx.borrow()
    }

    /// Loading flag for rendering pending UI
    pub fn is_loading(&self) -> bool {
        self.state().is_loading()
    }

    /// Watch state changes
    pub fn subscribe(&self) -> watch::Receiver<NegotiatorState> {
        self.state_tx.subscribe()
    }

    pub fn session(&self) -> &SessionTracker {
        &self.session
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Sign in with the wallet (`POST /v1/auth/register`)
    pub async fn login(&self) -> Result<FlowOutcome> {
        self.run(Intent::Register).await
    }

    /// Rebind the wallet of the signed-in account (`POST /v1/user/update`)
    pub async fn update_wallet(&self) -> Result<FlowOutcome> {
        self.run(Intent::UpdateWallet).await
    }

    /// Abandon the in-flight attempt and return to `Idle`
    pub fn cancel(&self) {
        let generation = self.begin();
        debug!(generation, "authentication attempt cancelled");
    }

    /// Run a full attempt for `intent`, superseding any attempt in flight
    pub async fn run(&self, intent: Intent) -> Result<FlowOutcome> {
        let generation = self.begin();
        info!(?intent, generation, origin = %self.origin, wallet = self.wallet.name(), "starting wallet verification");

        match self.drive(generation, intent).await {
            Ok(outcome) => {
                info!(
                    ?intent,
                    generation,
                    public_key = %outcome.public_key,
                    "wallet verification succeeded"
                );
                Ok(outcome)
            }
            Err(AuthError::Superseded) => {
                debug!(?intent, generation, "stale attempt discarded");
                Err(AuthError::Superseded)
            }
            Err(err) => match self.advance(generation, FlowEvent::Fail(err.kind())) {
                Ok(_) => {
                    warn!(?intent, generation, kind = ?err.kind(), error = %err, "wallet verification failed");
                    Err(err)
                }
                Err(_) => Err(AuthError::Superseded),
            },
        }
    }

    async fn drive(&self, generation: u64, intent: Intent) -> Result<FlowOutcome> {
        if intent == Intent::UpdateWallet && !self.backend.has_session() {
            return Err(AuthError::SessionRequired);
        }

        let public_key = match self.wallet.public_key() {
            Some(key) => {
                self.advance(generation, FlowEvent::WalletReady)?;
                key
            }
            None => {
                self.advance(generation, FlowEvent::RequestConnect)?;
                let key = with_timeout(
                    FlowStage::WalletConnect,
                    self.connect_timeout,
                    self.wallet.connect(),
                )
                .await?;
                self.advance(generation, FlowEvent::WalletReady)?;
                key
            }
        };

        let message = compose(&self.origin, &public_key)?;
        let signed = self
            .signer
            .request_signature(self.wallet.as_ref(), message)
            .await?;
        self.advance(generation, FlowEvent::SignatureReady)?;

        let request = VerificationRequest::from(signed);
        debug!(?intent, endpoint = intent.endpoint(), pub_key = %request.pub_key, "submitting verification");

        let reply = match intent {
            Intent::Register => with_timeout(
                FlowStage::ServerVerification,
                self.verify_timeout,
                self.backend.register(&request),
            )
            .await
            .map(|reply| BackendReply::new(Some(reply.data), reply.credential))?,
            Intent::UpdateWallet => {
                with_timeout(
                    FlowStage::ServerVerification,
                    self.verify_timeout,
                    self.backend.update_wallet(&request),
                )
                .await?
            }
        };
        let identity = reply.data.clone();

        self.commit(generation, intent, &request.pub_key, reply)?;

        Ok(FlowOutcome {
            intent,
            public_key: request.pub_key,
            identity,
            redirect: intent.redirect_path(),
        })
    }

    fn lock_machine(&self) -> MutexGuard<'_, FlowStateMachine> {
        self.machine.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn begin(&self) -> u64 {
        let mut machine = self.lock_machine();
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        *machine = FlowStateMachine::new();
        self.state_tx.send_replace(machine.state());
        generation
    }

    fn ensure_current(&self, generation: u64) -> Result<()> {
        if self.generation.load(Ordering::SeqCst) == generation {
            Ok(())
        } else {
            Err(AuthError::Superseded)
        }
    }

    fn advance(&self, generation: u64, event: FlowEvent) -> Result<NegotiatorState> {
        let mut machine = self.lock_machine();
        self.ensure_current(generation)?;
        let state = machine.transition(event)?;
        self.state_tx.send_replace(state);
        Ok(state)
    }

    /// Apply a server success atomically with the generation check
    ///
    /// The issued credential and the session projection are written here and
    /// nowhere else, so a retired attempt leaves both untouched.
    fn commit(
        &self,
        generation: u64,
        intent: Intent,
        public_key: &str,
        reply: BackendReply<Option<IdentityProfile>>,
    ) -> Result<()> {
        let mut machine = self.lock_machine();
        self.ensure_current(generation)?;
        let state = machine.transition(FlowEvent::Verified(intent))?;

        if let Some(credential) = &reply.credential {
            self.backend.store_session(credential);
        }
        match (intent, reply.data) {
            (Intent::Register, Some(identity)) => self.session.establish(identity),
            (Intent::UpdateWallet, identity) if self.session.is_authenticated() => {
                self.session.rebind_wallet(public_key, identity)
            }
            (Intent::UpdateWallet, Some(identity)) => self.session.establish(identity),
            _ => {}
        }

        self.state_tx.send_replace(state);
        Ok(())
    }
}

async fn with_timeout<T>(
    stage: FlowStage,
    limit: Duration,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| AuthError::Timeout {
            stage,
            duration: limit.as_secs(),
        })?
}
