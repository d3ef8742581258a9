//! Shared setup for the orchestrator integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use eduid_auth::config::IdentityConfig;
use eduid_auth::notify::fields;
use eduid_auth::roles::CallerContext;
use eduid_auth::service::{CreateIdentityInput, IdentityOrchestrator};
use eduid_core::attributes::AttributePatch;
use eduid_core::error::{EduIdError, EduIdResult};
use eduid_core::gateway::IdentityGateway;
use eduid_core::models::identity::{IdentityChanges, IdentityRecord, NewIdentity};
use eduid_core::models::notification::{Notification, NotificationKind};
use eduid_idp::{InMemoryIdentityGateway, OutboxNotificationGateway, StaticInstitutionValidator};

pub const INSTITUTION: &str = "INST-1";
pub const OTHER_INSTITUTION: &str = "INST-2";
pub const CLOSED_INSTITUTION: &str = "INST-9";

pub type Orchestrator = IdentityOrchestrator<InMemoryIdentityGateway, StaticInstitutionValidator>;

pub struct Harness {
    pub svc: Orchestrator,
    pub idp: InMemoryIdentityGateway,
    pub institutions: StaticInstitutionValidator,
    pub outbox: OutboxNotificationGateway,
}

pub fn institutions() -> StaticInstitutionValidator {
    StaticInstitutionValidator::new()
        .with_institution(INSTITUTION, "Colegio Central", true)
        .with_institution(OTHER_INSTITUTION, "Colegio del Valle", true)
        .with_institution(CLOSED_INSTITUTION, "Colegio Cerrado", false)
}

pub fn setup() -> Harness {
    setup_with_outbox(OutboxNotificationGateway::new())
}

pub fn setup_with_outbox(outbox: OutboxNotificationGateway) -> Harness {
    let idp = InMemoryIdentityGateway::new();
    let institutions = institutions();
    let svc = IdentityOrchestrator::new(
        idp.clone(),
        institutions.clone(),
        outbox.clone(),
        IdentityConfig::default(),
    );
    Harness {
        svc,
        idp,
        institutions,
        outbox,
    }
}

pub fn admin() -> CallerContext {
    CallerContext::new("admin-0", ["ADMIN"], None)
}

pub fn director_of(institution: &str) -> CallerContext {
    CallerContext::new("director-0", ["DIRECTOR"], Some(institution.to_string()))
}

pub fn input(username: &str, document_number: &str, roles: &[&str]) -> CreateIdentityInput {
    CreateIdentityInput {
        username: username.into(),
        email: format!("{username}@school.edu"),
        first_name: Some("Maria".into()),
        last_name: Some("Quispe".into()),
        document_number: document_number.into(),
        phone: Some("987654321".into()),
        roles: roles.iter().map(|r| r.to_string()).collect(),
        ..Default::default()
    }
}

/// Wait until the outbox holds at least `count` notifications.
pub async fn wait_for_outbox(outbox: &OutboxNotificationGateway, count: usize) -> Vec<Notification> {
    for _ in 0..300 {
        let sent = outbox.sent().await;
        if sent.len() >= count {
            return sent;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!(
        "expected {count} notifications, got {}",
        outbox.sent().await.len()
    );
}

/// Reset token carried by the latest notification of `kind` to `email`.
pub async fn latest_token(outbox: &OutboxNotificationGateway, kind: NotificationKind, email: &str) -> String {
    outbox
        .sent()
        .await
        .iter()
        .rev()
        .find(|n| n.kind == kind && n.to_email == email)
        .and_then(|n| n.template_data.get(fields::RESET_TOKEN).cloned())
        .expect("no reset token sent")
}

/// Identity provider that can be told to fail credential writes or
/// reads, delegating everything else to the in-memory realm.
#[derive(Clone)]
pub struct FlakyGateway {
    pub inner: InMemoryIdentityGateway,
    credential_failures: Arc<AtomicUsize>,
    reads_left: Arc<AtomicUsize>,
}

impl FlakyGateway {
    pub fn new() -> Self {
        Self {
            inner: InMemoryIdentityGateway::new(),
            credential_failures: Arc::new(AtomicUsize::new(0)),
            reads_left: Arc::new(AtomicUsize::new(usize::MAX)),
        }
    }

    /// Fail the next `count` calls to `set_credential`.
    pub fn fail_credential_writes(&self, count: usize) {
        self.credential_failures.store(count, Ordering::SeqCst);
    }

    /// Allow `count` more `get` calls, then fail every one after.
    pub fn allow_reads(&self, count: usize) {
        self.reads_left.store(count, Ordering::SeqCst);
    }

    fn outage(operation: &str) -> EduIdError {
        EduIdError::Upstream {
            service: "identity-provider".into(),
            reason: format!("{operation}: 503 Service Unavailable"),
        }
    }
}

impl IdentityGateway for FlakyGateway {
    async fn create(&self, input: NewIdentity) -> EduIdResult<String> {
        self.inner.create(input).await
    }

    async fn get(&self, id: &str) -> EduIdResult<IdentityRecord> {
        let allowed = self
            .reads_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if !allowed {
            return Err(Self::outage("get"));
        }
        self.inner.get(id).await
    }

    async fn get_by_username(&self, username: &str) -> EduIdResult<IdentityRecord> {
        self.inner.get_by_username(username).await
    }

    async fn get_by_email(&self, email: &str) -> EduIdResult<IdentityRecord> {
        self.inner.get_by_email(email).await
    }

    async fn list_all(&self) -> EduIdResult<Vec<IdentityRecord>> {
        self.inner.list_all().await
    }

    async fn update_names(&self, id: &str, changes: IdentityChanges) -> EduIdResult<()> {
        self.inner.update_names(id, changes).await
    }

    async fn set_enabled(&self, id: &str, enabled: bool) -> EduIdResult<()> {
        self.inner.set_enabled(id, enabled).await
    }

    async fn set_credential(&self, id: &str, value: &str, temporary: bool) -> EduIdResult<()> {
        let failing = self
            .credential_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(Self::outage("set_credential"));
        }
        self.inner.set_credential(id, value, temporary).await
    }

    async fn verify_credential(&self, id: &str, claim: &str) -> EduIdResult<bool> {
        self.inner.verify_credential(id, claim).await
    }

    async fn replace_realm_roles(&self, id: &str, roles: &[String]) -> EduIdResult<()> {
        self.inner.replace_realm_roles(id, roles).await
    }

    async fn patch_attributes(&self, id: &str, patch: &AttributePatch) -> EduIdResult<()> {
        self.inner.patch_attributes(id, patch).await
    }

    async fn compare_and_clear_attribute(
        &self,
        id: &str,
        key: &str,
        expected: &str,
    ) -> EduIdResult<bool> {
        self.inner.compare_and_clear_attribute(id, key, expected).await
    }

    async fn delete(&self, id: &str) -> EduIdResult<()> {
        self.inner.delete(id).await
    }
}

pub struct FlakyHarness {
    pub svc: IdentityOrchestrator<FlakyGateway, StaticInstitutionValidator>,
    pub idp: FlakyGateway,
    pub outbox: OutboxNotificationGateway,
}

pub fn setup_flaky() -> FlakyHarness {
    let idp = FlakyGateway::new();
    let outbox = OutboxNotificationGateway::new();
    let config = IdentityConfig {
        read_retry_base_delay_ms: 1,
        ..IdentityConfig::default()
    };
    let svc = IdentityOrchestrator::new(idp.clone(), institutions(), outbox.clone(), config);
    FlakyHarness { svc, idp, outbox }
}
