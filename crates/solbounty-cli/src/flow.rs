/*
[INPUT]:  CLI configuration, local wallet label, shutdown token
[OUTPUT]: Completed wallet verification flows and persisted sessions
[POS]:    Application layer - wires wallet, client and negotiator together
[UPDATE]: When adding new flow-driven commands
*/

use std::sync::Arc;

use anyhow::{Context, Result, anyhow, bail};
use solbounty_auth::auth::SessionTracker;
use solbounty_auth::{
    FlowOutcome,
    IdentityBackend,
    IdentityClient,
    IdentityProfile,
    IdentityRegistry,
    Intent,
    KeypairWallet,
    LocalBackend,
    NegotiatorState,
    ReferenceVerifier,
    SessionNegotiator,
    WalletKeyStore,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::session_store::{SessionStore, StoredSession};

/// Identity client with the persisted session restored
pub async fn restored_client(config: &AppConfig) -> Result<(IdentityClient, SessionStore)> {
    let (client, store, _) = restore(config).await?;
    Ok((client, store))
}

/// Restore the cookie and return the identity cached alongside it
async fn restore(
    config: &AppConfig,
) -> Result<(IdentityClient, SessionStore, Option<IdentityProfile>)> {
    let client = IdentityClient::with_config_and_base_url(config.client_config(), &config.api_url)
        .context("create identity client")?;
    let store = SessionStore::new(config.session_file()?);

    let mut identity = None;
    if let Some(session) = store.load().await? {
        if session.restore_into(&client) {
            debug!(saved_at = %session.saved_at, "restored session cookie");
            identity = session.identity;
        }
    }
    Ok((client, store, identity))
}

/// Load (or create) the local wallet named `label`
pub fn local_wallet(config: &AppConfig, label: &str) -> Result<KeypairWallet> {
    let store = WalletKeyStore::new(config.key_dir()?);
    store
        .get_or_create_wallet(label)
        .with_context(|| format!("load wallet {label:?}"))
}

/// Run `intent` against the configured identity API
///
/// Cancelling `shutdown` abandons the attempt and resets the negotiator.
pub async fn run_remote(
    config: &AppConfig,
    intent: Intent,
    wallet_label: &str,
    shutdown: CancellationToken,
) -> Result<FlowOutcome> {
    let (client, store, cached) = restore(config).await?;
    let client = Arc::new(client);
    let wallet = Arc::new(local_wallet(config, wallet_label)?);

    let session = SessionTracker::new();
    if let Some(identity) = cached {
        session.establish(identity);
    }
    let negotiator = SessionNegotiator::new(config.negotiator_config(), client.clone(), wallet)
        .context("create session negotiator")?
        .with_session(session);

    let outcome = drive(&negotiator, intent, shutdown).await?;

    let identity = outcome
        .identity
        .clone()
        .or_else(|| negotiator.session().identity());
    match StoredSession::capture(&client, identity) {
        Some(session) => store.save(&session).await?,
        None => warn!("server did not issue a session cookie"),
    }
    Ok(outcome)
}

/// Run one attempt, racing it against `shutdown`
pub async fn drive(
    negotiator: &SessionNegotiator,
    intent: Intent,
    shutdown: CancellationToken,
) -> Result<FlowOutcome> {
    let mut states = negotiator.subscribe();
    let watcher = async {
        while states.changed().await.is_ok() {
            let state = *states.borrow_and_update();
            debug!(?state, loading = state.is_loading(), "negotiator state");
        }
    };

    tokio::select! {
        biased;
        _ = shutdown.cancelled() => {
            negotiator.cancel();
            Err(anyhow!("cancelled by user"))
        }
        result = negotiator.run(intent) => result.map_err(|err| {
            anyhow::Error::new(err).context(format!("{} failed", intent.endpoint()))
        }),
        _ = watcher => Err(anyhow!("negotiator state channel closed")),
    }
}

/// Report of an in-process simulation
#[derive(Debug)]
pub struct SimulationReport {
    pub login: FlowOutcome,
    /// Whether the wallet was linked to the simulated GitHub account
    pub linked_to_github: bool,
    pub update: Option<FlowOutcome>,
    pub final_state: NegotiatorState,
    pub identities: usize,
}

/// Full flow against the in-process reference verifier
///
/// With `github_login` the account starts from a GitHub session and the
/// wallet is linked through the register flow; a second wallet is then
/// bound with the update flow.
pub async fn simulate(
    config: &AppConfig,
    github_login: Option<&str>,
    shutdown: CancellationToken,
) -> Result<SimulationReport> {
    let verifier = Arc::new(ReferenceVerifier::new(Arc::new(IdentityRegistry::default())));
    let mut backend = LocalBackend::new(verifier.clone(), &config.origin)?;
    let mut github_identity = None;
    if let Some(login) = github_login {
        let (identity, grant) = verifier.registry().link_github(login, None, None);
        info!(identity = %identity.id, login, "simulated GitHub login");
        github_identity = Some(identity.id.to_string());
        backend = backend.with_session(grant.token);
    }
    let backend = Arc::new(backend);
    let session = SessionTracker::new();

    let first = Arc::new(KeypairWallet::generate());
    let negotiator =
        SessionNegotiator::new(config.negotiator_config(), backend.clone(), first.clone())?
            .with_session(session.clone());
    let login = drive(&negotiator, Intent::Register, shutdown.clone()).await?;
    let linked_to_github = github_identity.is_some()
        && login.identity.as_ref().map(|identity| &identity.id) == github_identity.as_ref();
    let mut final_state = negotiator.state();

    let update = if backend.has_session() {
        let second = Arc::new(KeypairWallet::generate());
        let negotiator =
            SessionNegotiator::new(config.negotiator_config(), backend.clone(), second.clone())?
                .with_session(session.clone());
        let outcome = drive(&negotiator, Intent::UpdateWallet, shutdown).await?;
        info!(from = %first.address(), to = %second.address(), "simulated wallet rebind");
        final_state = negotiator.state();
        Some(outcome)
    } else {
        None
    };

    if !session.is_authenticated() {
        bail!("simulation finished without an authenticated session");
    }

    Ok(SimulationReport {
        login,
        linked_to_github,
        update,
        final_state,
        identities: verifier.registry().identity_count(),
    })
}
