//! Institution validators: the HTTP client for the institution service
//! and a static table for tests and local runs.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use eduid_core::error::EduIdResult;
use eduid_core::gateway::InstitutionValidator;
use eduid_core::models::institution::InstitutionStatus;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::IdpError;

const SERVICE: &str = "institution-service";

/// Wire body of `GET /validate-institutions/{id}`.
#[derive(Debug, Deserialize)]
struct ValidationBody {
    name: Option<String>,
    exists: Option<bool>,
    active: Option<bool>,
    status: Option<String>,
    error: Option<String>,
}

impl From<ValidationBody> for InstitutionStatus {
    fn from(body: ValidationBody) -> Self {
        Self {
            name: body.name,
            exists: body.exists.unwrap_or(false),
            active: body.active.unwrap_or(false),
            status: body.status,
            error: body.error,
        }
    }
}

/// Client of the institution service.
///
/// A 404 answer reads as a non-existent institution. Transport errors
/// and other non-success statuses surface as upstream failures; the
/// caller decides whether to retry.
#[derive(Clone)]
pub struct HttpInstitutionValidator {
    client: Client,
    base_url: Url,
}

impl HttpInstitutionValidator {
    pub fn new(base_url: &str, request_timeout: Duration) -> Result<Self, IdpError> {
        let base_url = Url::parse(base_url).map_err(|e| IdpError::InvalidEndpoint {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;
        if base_url.cannot_be_a_base() {
            return Err(IdpError::InvalidEndpoint {
                url: base_url.to_string(),
                reason: "not a base URL".into(),
            });
        }

        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| http_error(format!("failed to create HTTP client: {e}")))?;

        Ok(Self { client, base_url })
    }

    fn validation_url(&self, institution_id: &str) -> Result<Url, IdpError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| IdpError::InvalidEndpoint {
                url: self.base_url.to_string(),
                reason: "not a base URL".into(),
            })?
            .pop_if_empty()
            .extend(["validate-institutions", institution_id]);
        Ok(url)
    }

    async fn fetch(&self, institution_id: &str) -> Result<InstitutionStatus, IdpError> {
        let url = self.validation_url(institution_id)?;
        debug!(%url, "Requesting institution validation");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| http_error(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(InstitutionStatus::default());
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(http_error(format!("HTTP {status} - {body}")));
        }

        let body: ValidationBody = response
            .json()
            .await
            .map_err(|e| http_error(format!("failed to parse validation body: {e}")))?;
        Ok(body.into())
    }
}

fn http_error(reason: String) -> IdpError {
    IdpError::Http {
        service: SERVICE.into(),
        reason,
    }
}

impl InstitutionValidator for HttpInstitutionValidator {
    async fn validate(&self, institution_id: &str) -> EduIdResult<InstitutionStatus> {
        let status = self.fetch(institution_id).await?;
        info!(
            institution_id = %institution_id,
            exists = status.exists,
            active = status.active,
            name = status.name.as_deref().unwrap_or(""),
            "Institution validated"
        );
        if let Some(error) = &status.error {
            warn!(institution_id = %institution_id, %error, "Institution service reported an error");
        }
        Ok(status)
    }
}

/// Fixed institution table.
///
/// Unknown ids read as non-existent. Counts lookups so callers can
/// assert when validation was skipped.
#[derive(Clone, Default)]
pub struct StaticInstitutionValidator {
    institutions: Arc<HashMap<String, InstitutionStatus>>,
    lookups: Arc<AtomicUsize>,
}

impl StaticInstitutionValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_institution(self, id: &str, name: &str, active: bool) -> Self {
        self.with_status(
            id,
            InstitutionStatus {
                name: Some(name.to_string()),
                exists: true,
                active,
                status: Some(if active { "A" } else { "I" }.to_string()),
                error: None,
            },
        )
    }

    pub fn with_status(self, id: &str, status: InstitutionStatus) -> Self {
        let mut institutions = (*self.institutions).clone();
        institutions.insert(id.to_string(), status);
        Self {
            institutions: Arc::new(institutions),
            lookups: self.lookups,
        }
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

impl InstitutionValidator for StaticInstitutionValidator {
    async fn validate(&self, institution_id: &str) -> EduIdResult<InstitutionStatus> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .institutions
            .get(institution_id)
            .cloned()
            .unwrap_or_default())
    }
}
