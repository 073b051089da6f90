//! SMART EHR-launch orchestration.
//!
//! Drives `Initial -> Authorizing -> Authorized | Error`:
//! 1. A launch (`iss` + `launch`) discovers the server, generates PKCE and a
//!    fresh state, stores them, and navigates to the authorization endpoint.
//! 2. The callback (`code` + `state`) validates the state, exchanges the
//!    code, and loads the patient and their observations.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use smartlaunch_common::auth::{
    generate_state, validate_state, OAuthClient, OAuthClientTrait, OAuthConfig, PKCEChallenge,
    SessionContext, SessionKey, SessionStore,
};
use smartlaunch_domain::{
    group_by_category, Config, LaunchParams, LaunchStatus, LaunchTrigger, ObservationDraft,
    ObservationGroups, PatientSummary, Result, SmartError,
};
use tracing::{debug, error, info, instrument, warn};
use url::Url;

use super::navigator::Navigator;
use crate::auth::{AuthenticatedExecutor, TokenRefreshCallback};
use crate::errors::{authorization_error, discovery_error, exchange_error};
use crate::fhir::{observations_from_bundle, FhirClient};
use crate::http::HttpClient;

/// What the orchestrator knows once authorization succeeded
#[derive(Debug, Clone)]
pub struct AuthorizedSession {
    /// FHIR base URL (the launching issuer)
    pub fhir_base: String,
    pub patient_id: String,
    pub encounter_id: Option<String>,
    pub patient: Value,
    pub observations: ObservationGroups,
}

impl AuthorizedSession {
    pub fn patient_summary(&self) -> PatientSummary {
        PatientSummary::from_resource(&self.patient)
    }
}

/// Coordinates discovery, PKCE, redirect, callback, token exchange and the
/// initial resource fetch.
pub struct LaunchOrchestrator<C, S, N> {
    oauth: Arc<C>,
    store: Arc<S>,
    navigator: N,
    fhir: FhirClient<C, S>,
    launch_claimed: AtomicBool,
    callback_claimed: AtomicBool,
    status: RwLock<LaunchStatus>,
    access_token: Arc<RwLock<Option<String>>>,
    session: RwLock<Option<AuthorizedSession>>,
    last_launch: Mutex<Option<(String, String)>>,
}

impl<S, N> LaunchOrchestrator<OAuthClient, S, N>
where
    S: SessionStore,
    N: Navigator,
{
    /// Build an orchestrator backed by the real OAuth and HTTP clients.
    pub fn from_config(config: &Config, store: Arc<S>, navigator: N) -> Result<Self> {
        let oauth_config = OAuthConfig::new(
            config.client.client_id.clone(),
            config.client.redirect_uri.clone(),
            config.client.scopes.clone(),
        );
        let oauth = Arc::new(OAuthClient::with_timeout(oauth_config, config.http.timeout()));
        let http = HttpClient::from_config(&config.http)?;
        Ok(Self::new(oauth, store, navigator, http))
    }
}

impl<C, S, N> LaunchOrchestrator<C, S, N>
where
    C: OAuthClientTrait,
    S: SessionStore,
    N: Navigator,
{
    pub fn new(oauth: Arc<C>, store: Arc<S>, navigator: N, http: HttpClient) -> Self {
        let executor = AuthenticatedExecutor::new(Arc::clone(&oauth), Arc::clone(&store));
        Self {
            oauth,
            store,
            navigator,
            fhir: FhirClient::new(http, executor),
            launch_claimed: AtomicBool::new(false),
            callback_claimed: AtomicBool::new(false),
            status: RwLock::new(LaunchStatus::Initial),
            access_token: Arc::new(RwLock::new(None)),
            session: RwLock::new(None),
            last_launch: Mutex::new(None),
        }
    }

    pub fn status(&self) -> LaunchStatus {
        self.status.read().clone()
    }

    /// Current access token; replaced in place whenever a refresh happens.
    pub fn access_token(&self) -> Option<String> {
        self.access_token.read().clone()
    }

    pub fn session(&self) -> Option<AuthorizedSession> {
        self.session.read().clone()
    }

    pub fn observations(&self) -> Option<ObservationGroups> {
        self.session.read().as_ref().map(|session| session.observations.clone())
    }

    pub fn fhir(&self) -> &FhirClient<C, S> {
        &self.fhir
    }

    /// Route a location the app was opened at.
    ///
    /// Locations without launch or callback parameters leave the
    /// orchestrator in its current state.
    pub async fn handle_location(&self, location: &str) -> Result<()> {
        let url = Url::parse(location)
            .map_err(|e| SmartError::InvalidInput(format!("invalid location {location}: {e}")))?;
        let params = LaunchParams::from_pairs(url.query_pairs());

        match params.trigger() {
            Some(LaunchTrigger::Launch { iss, launch }) => self.begin_launch(&iss, &launch).await,
            Some(LaunchTrigger::Callback { code, state }) => {
                self.complete_callback(&code, &state).await
            }
            None => {
                debug!("location carries no launch parameters");
                Ok(())
            }
        }
    }

    /// Start an EHR launch; a second launch on the same instance is ignored.
    #[instrument(skip(self, launch))]
    pub async fn begin_launch(&self, iss: &str, launch: &str) -> Result<()> {
        if !claim(&self.launch_claimed) {
            debug!("launch already processed by this instance");
            return Ok(());
        }
        *self.last_launch.lock() = Some((iss.to_string(), launch.to_string()));
        self.run_launch(iss, launch).await
    }

    /// Re-run the most recent launch after an error.
    pub async fn retry_launch(&self) -> Result<()> {
        let last = self.last_launch.lock().clone();
        let Some((iss, launch)) = last else {
            return Err(SmartError::MissingContext("no launch to retry".into()));
        };
        info!(%iss, "retrying launch");
        self.run_launch(&iss, &launch).await
    }

    async fn run_launch(&self, iss: &str, launch: &str) -> Result<()> {
        self.set_status(LaunchStatus::Authorizing);
        let result = self.authorize(iss, launch).await;
        if let Err(err) = &result {
            self.fail("Failed to start authorization", err);
        }
        result
    }

    async fn authorize(&self, iss: &str, launch: &str) -> Result<()> {
        let smart = self.oauth.discover(iss).await.map_err(|e| discovery_error(iss, e))?;
        if !smart.supports_s256() {
            warn!(%iss, "server does not advertise S256 PKCE; sending it anyway");
        }

        let pkce = PKCEChallenge::generate();
        let state = generate_state();

        SessionContext {
            issuer: iss.to_string(),
            token_endpoint: smart.token_endpoint.clone(),
            code_verifier: pkce.code_verifier.clone(),
            state: state.clone(),
        }
        .save(self.store.as_ref());

        let authorization_url = self
            .oauth
            .authorization_url(
                &smart.authorization_endpoint,
                iss,
                launch,
                &pkce.code_challenge,
                &state,
            )
            .map_err(authorization_error)?;

        info!(endpoint = %smart.authorization_endpoint, "redirecting to authorization server");
        self.navigator.navigate_to(&authorization_url);
        Ok(())
    }

    /// Finish authorization from the redirect; processed at most once.
    #[instrument(skip(self, code, state))]
    pub async fn complete_callback(&self, code: &str, state: &str) -> Result<()> {
        if !claim(&self.callback_claimed) {
            debug!("callback already processed by this instance");
            return Ok(());
        }

        self.set_status(LaunchStatus::Authorizing);
        match self.exchange_and_load(code, state).await {
            Ok(session) => {
                info!(
                    patient = %session.patient_id,
                    categories = session.observations.len(),
                    "launch authorized"
                );
                *self.session.write() = Some(session);
                SessionContext::clear_one_time(self.store.as_ref());
                self.set_status(LaunchStatus::Authorized);
                self.navigator.replace_location(&strip_query(self.oauth.redirect_uri()));
                Ok(())
            }
            Err(err) => {
                self.fail("Authorization failed", &err);
                Err(err)
            }
        }
    }

    async fn exchange_and_load(&self, code: &str, state: &str) -> Result<AuthorizedSession> {
        let expected = self.store.get(SessionKey::State).ok_or_else(|| {
            SmartError::MissingContext("no launch state stored; please launch again".into())
        })?;
        if !validate_state(&expected, state) {
            warn!("state parameter does not match the stored launch");
            return Err(SmartError::InvalidState);
        }

        let context = SessionContext::load(self.store.as_ref()).ok_or_else(|| {
            SmartError::MissingContext("code verifier, issuer or token endpoint missing".into())
        })?;

        let tokens = self
            .oauth
            .exchange_code(&context.token_endpoint, code, &context.code_verifier)
            .await
            .map_err(exchange_error)?;

        if let Some(refresh_token) = tokens.refresh_token.as_deref() {
            self.store.set(SessionKey::RefreshToken, refresh_token);
        }
        if let Some(encounter) = tokens.encounter.as_deref() {
            self.store.set(SessionKey::EncounterId, encounter);
        }
        *self.access_token.write() = Some(tokens.access_token.clone());

        let patient_id = tokens.patient.clone().ok_or_else(|| {
            SmartError::MissingContext("token response did not include a patient".into())
        })?;
        let fhir_base = context.issuer;
        let on_refresh = self.refresh_callback();

        let patient = self
            .fhir
            .get_patient(&fhir_base, &patient_id, &tokens.access_token, Some(&on_refresh))
            .await?;
        let observations = self.fetch_observations(&fhir_base, &patient_id, &on_refresh).await?;

        Ok(AuthorizedSession {
            fhir_base,
            patient_id,
            encounter_id: tokens.encounter,
            patient,
            observations,
        })
    }

    /// Re-fetch and regroup the authorized patient's observations.
    pub async fn refresh_observations(&self) -> Result<ObservationGroups> {
        let (fhir_base, patient_id) = self.authorized_target()?;
        let on_refresh = self.refresh_callback();
        let observations = self.fetch_observations(&fhir_base, &patient_id, &on_refresh).await?;

        if let Some(session) = self.session.write().as_mut() {
            session.observations = observations.clone();
        }
        Ok(observations)
    }

    /// Apply `changes` to an observation of the authorized patient.
    pub async fn update_observation(&self, observation_id: &str, changes: &Value) -> Result<Value> {
        let (fhir_base, _) = self.authorized_target()?;
        let token = self.current_token()?;
        let on_refresh = self.refresh_callback();
        self.fhir
            .update_observation(&fhir_base, observation_id, changes, &token, Some(&on_refresh))
            .await
    }

    /// Create an observation for the authorized patient from a draft, filed
    /// under the launch encounter when there is one.
    pub async fn create_observation(&self, draft: ObservationDraft) -> Result<Value> {
        let (fhir_base, patient_id) = self.authorized_target()?;
        let encounter = self.store.get(SessionKey::EncounterId);
        let resource = draft.into_resource(&patient_id, encounter.as_deref(), Utc::now())?;
        let token = self.current_token()?;
        let on_refresh = self.refresh_callback();
        self.fhir.create_observation(&fhir_base, &resource, &token, Some(&on_refresh)).await
    }

    async fn fetch_observations(
        &self,
        fhir_base: &str,
        patient_id: &str,
        on_refresh: &TokenRefreshCallback,
    ) -> Result<ObservationGroups> {
        let token = self.current_token()?;
        let bundle =
            self.fhir.get_observations(fhir_base, patient_id, &token, Some(on_refresh)).await?;
        Ok(group_by_category(observations_from_bundle(&bundle)))
    }

    fn authorized_target(&self) -> Result<(String, String)> {
        self.session
            .read()
            .as_ref()
            .map(|session| (session.fhir_base.clone(), session.patient_id.clone()))
            .ok_or_else(|| SmartError::MissingContext("launch is not authorized".into()))
    }

    fn current_token(&self) -> Result<String> {
        self.access_token()
            .ok_or_else(|| SmartError::MissingContext("no access token available".into()))
    }

    fn refresh_callback(&self) -> TokenRefreshCallback {
        let slot = Arc::clone(&self.access_token);
        Arc::new(move |token: &str| {
            debug!("access token replaced after refresh");
            *slot.write() = Some(token.to_string());
        })
    }

    fn set_status(&self, status: LaunchStatus) {
        debug!(?status, "launch status changed");
        *self.status.write() = status;
    }

    fn fail(&self, context: &str, err: &SmartError) {
        error!(error = %err, category = ?err.category(), "{context}");
        self.set_status(LaunchStatus::Error(format!("{context}: {err}")));
    }
}

fn claim(flag: &AtomicBool) -> bool {
    flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst).is_ok()
}

fn strip_query(location: &str) -> String {
    match Url::parse(location) {
        Ok(mut url) => {
            url.set_query(None);
            url.set_fragment(None);
            url.to_string()
        }
        Err(_) => location.split(['?', '#']).next().unwrap_or(location).to_string(),
    }
}
