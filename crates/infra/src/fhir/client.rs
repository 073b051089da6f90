//! FHIR REST client for Patient and Observation resources.
//!
//! Every call runs through [`AuthenticatedExecutor`], so an expired access
//! token is refreshed once transparently.

use reqwest::header::{ACCEPT, IF_MATCH};
use reqwest::Method;
use serde_json::Value;
use smartlaunch_common::auth::{OAuthClientTrait, SessionStore};
use smartlaunch_domain::{if_match_header, merge_for_update, Result, SmartError};
use tracing::{debug, instrument};

use crate::auth::{AuthenticatedExecutor, TokenRefreshCallback};
use crate::errors::InfraError;
use crate::http::HttpClient;

const FHIR_JSON: &str = "application/json";

/// Typed reads and writes against a FHIR server
#[derive(Debug, Clone)]
pub struct FhirClient<C, S> {
    http: HttpClient,
    executor: AuthenticatedExecutor<C, S>,
}

impl<C, S> FhirClient<C, S>
where
    C: OAuthClientTrait,
    S: SessionStore,
{
    pub fn new(http: HttpClient, executor: AuthenticatedExecutor<C, S>) -> Self {
        Self { http, executor }
    }

    pub fn executor(&self) -> &AuthenticatedExecutor<C, S> {
        &self.executor
    }

    /// `GET {base}/Patient/{id}`
    #[instrument(skip(self, access_token, on_refresh))]
    pub async fn get_patient(
        &self,
        base_url: &str,
        patient_id: &str,
        access_token: &str,
        on_refresh: Option<&TokenRefreshCallback>,
    ) -> Result<Value> {
        let url = resource_url(base_url, "Patient", patient_id);
        self.executor
            .execute(access_token, on_refresh, |token| {
                let url = &url;
                async move { self.send(Method::GET, url, &token, None, None).await }
            })
            .await
    }

    /// `PUT {base}/Patient/{id}` with the full Patient document
    #[instrument(skip(self, patient, access_token, on_refresh))]
    pub async fn update_patient(
        &self,
        base_url: &str,
        patient_id: &str,
        patient: &Value,
        access_token: &str,
        on_refresh: Option<&TokenRefreshCallback>,
    ) -> Result<Value> {
        let url = resource_url(base_url, "Patient", patient_id);
        let if_match = if_match_header(patient);
        self.executor
            .execute(access_token, on_refresh, |token| {
                let (url, if_match) = (&url, if_match.as_deref());
                async move { self.send(Method::PUT, url, &token, Some(patient), if_match).await }
            })
            .await
    }

    /// `GET {base}/Observation?patient={id}`; returns the search Bundle
    #[instrument(skip(self, access_token, on_refresh))]
    pub async fn get_observations(
        &self,
        base_url: &str,
        patient_id: &str,
        access_token: &str,
        on_refresh: Option<&TokenRefreshCallback>,
    ) -> Result<Value> {
        let url = format!(
            "{}/Observation?patient={}",
            base_url.trim_end_matches('/'),
            urlencoding::encode(patient_id)
        );
        self.executor
            .execute(access_token, on_refresh, |token| {
                let url = &url;
                async move { self.send(Method::GET, url, &token, None, None).await }
            })
            .await
    }

    /// `POST {base}/Observation`
    #[instrument(skip(self, observation, access_token, on_refresh))]
    pub async fn create_observation(
        &self,
        base_url: &str,
        observation: &Value,
        access_token: &str,
        on_refresh: Option<&TokenRefreshCallback>,
    ) -> Result<Value> {
        let url = format!("{}/Observation", base_url.trim_end_matches('/'));
        self.executor
            .execute(access_token, on_refresh, |token| {
                let url = &url;
                async move { self.send(Method::POST, url, &token, Some(observation), None).await }
            })
            .await
    }

    /// Read-modify-write of `Observation/{id}`.
    ///
    /// The current resource is fetched for its `meta.versionId`; `changes`
    /// is merged onto it (a full Observation replaces it, keeping `id` and
    /// `meta`) and sent with `If-Match`. The read is repeated on a token
    /// retry so the version is never stale.
    #[instrument(skip(self, changes, access_token, on_refresh))]
    pub async fn update_observation(
        &self,
        base_url: &str,
        observation_id: &str,
        changes: &Value,
        access_token: &str,
        on_refresh: Option<&TokenRefreshCallback>,
    ) -> Result<Value> {
        let url = resource_url(base_url, "Observation", observation_id);
        self.executor
            .execute(access_token, on_refresh, |token| {
                let url = &url;
                async move {
                    let current = self.send(Method::GET, url, &token, None, None).await?;
                    let updated = merge_for_update(&current, changes);
                    let if_match = if_match_header(&current);
                    debug!(if_match = if_match.as_deref().unwrap_or_default(), "updating observation");
                    self.send(Method::PUT, url, &token, Some(&updated), if_match.as_deref()).await
                }
            })
            .await
    }

    async fn send(
        &self,
        method: Method,
        url: &str,
        access_token: &str,
        body: Option<&Value>,
        if_match: Option<&str>,
    ) -> Result<Value> {
        let mut builder =
            self.http.request(method, url).bearer_auth(access_token).header(ACCEPT, FHIR_JSON);
        if let Some(body) = body {
            builder = builder.json(body);
        }
        if let Some(version) = if_match {
            builder = builder.header(IF_MATCH, version);
        }

        let response = self.http.send(builder).await?;
        let status = response.status();
        let text = response.text().await.map_err(|err| SmartError::from(InfraError::from(err)))?;

        if !status.is_success() {
            debug!(status = status.as_u16(), %url, "FHIR request failed");
            return Err(SmartError::from_status(status.as_u16(), url, text));
        }

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }
}

/// Resources carried in a search Bundle's `entry[].resource`.
pub fn observations_from_bundle(bundle: &Value) -> Vec<Value> {
    bundle
        .get("entry")
        .and_then(Value::as_array)
        .map(|entries| entries.iter().filter_map(|entry| entry.get("resource")).cloned().collect())
        .unwrap_or_default()
}

fn resource_url(base_url: &str, resource_type: &str, id: &str) -> String {
    format!("{}/{resource_type}/{}", base_url.trim_end_matches('/'), urlencoding::encode(id))
}
