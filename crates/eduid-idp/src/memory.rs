//! In-memory implementation of [`IdentityGateway`].
//!
//! Stands in for the external identity provider in tests and local
//! runs. Data is lost on restart.
//!
//! Credentials are hashed with Argon2id using OWASP-recommended
//! parameters (memory: 19 MiB, iterations: 2, parallelism: 1) on the
//! blocking pool. An optional pepper can be provided at construction
//! time. Usernames and emails are stored lowercased, as the provider
//! does.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use chrono::Utc;
use eduid_core::attributes::{AttributePatch, first_value};
use eduid_core::error::EduIdResult;
use eduid_core::gateway::IdentityGateway;
use eduid_core::models::identity::{IdentityChanges, IdentityRecord, NewIdentity};
use eduid_core::models::role::Role;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::IdpError;

/// Realm roles every realm carries besides the domain roles.
const BUILTIN_REALM_ROLES: [&str; 2] = ["offline_access", "uma_authorization"];

#[derive(Debug)]
struct StoredIdentity {
    seq: u64,
    record: IdentityRecord,
    credential_hash: Option<String>,
    credential_temporary: bool,
}

#[derive(Debug, Default)]
struct Realm {
    identities: HashMap<String, StoredIdentity>,
    next_seq: u64,
}

impl Realm {
    fn find(&self, id: &str) -> Result<&StoredIdentity, IdpError> {
        self.identities.get(id).ok_or_else(|| not_found(id))
    }

    fn find_mut(&mut self, id: &str) -> Result<&mut StoredIdentity, IdpError> {
        self.identities.get_mut(id).ok_or_else(|| not_found(id))
    }

    fn find_by(&self, pred: impl Fn(&IdentityRecord) -> bool) -> Option<&StoredIdentity> {
        self.identities.values().find(|s| pred(&s.record))
    }
}

fn not_found(id: &str) -> IdpError {
    IdpError::NotFound {
        entity: "identity".into(),
        id: id.to_string(),
    }
}

fn normalize(value: &str) -> String {
    value.trim().to_lowercase()
}

fn peppered(value: &str, pepper: Option<&str>) -> Vec<u8> {
    match pepper {
        Some(p) => format!("{p}{value}").into_bytes(),
        None => value.as_bytes().to_vec(),
    }
}

fn hash_credential(value: &str, pepper: Option<&str>) -> Result<String, IdpError> {
    // OWASP ASVS recommended: m=19456 (19 MiB), t=2, p=1
    let params = argon2::Params::new(19456, 2, 1, None)
        .map_err(|e| IdpError::Hashing(format!("argon2 params error: {e}")))?;
    let argon2 = Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, params);

    let salt = SaltString::generate(&mut argon2::password_hash::rand_core::OsRng);
    let hash = argon2
        .hash_password(&peppered(value, pepper), &salt)
        .map_err(|e| IdpError::Hashing(format!("credential hash error: {e}")))?;

    Ok(hash.to_string())
}

fn verify_credential_hash(claim: &str, hash: &str, pepper: Option<&str>) -> Result<bool, IdpError> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| IdpError::Hashing(format!("invalid hash format: {e}")))?;
    match Argon2::default().verify_password(&peppered(claim, pepper), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(IdpError::Hashing(format!("verify error: {e}"))),
    }
}

/// In-memory identity provider.
///
/// Cloning yields a handle onto the same realm.
#[derive(Clone)]
pub struct InMemoryIdentityGateway {
    realm: Arc<RwLock<Realm>>,
    realm_roles: Arc<BTreeSet<String>>,
    pepper: Option<String>,
}

impl InMemoryIdentityGateway {
    pub fn new() -> Self {
        let realm_roles = Role::ALL
            .iter()
            .map(|r| r.as_str().to_string())
            .chain(BUILTIN_REALM_ROLES.iter().map(|r| r.to_string()))
            .collect();
        Self {
            realm: Arc::new(RwLock::new(Realm::default())),
            realm_roles: Arc::new(realm_roles),
            pepper: None,
        }
    }

    pub fn with_pepper(pepper: String) -> Self {
        Self {
            pepper: Some(pepper),
            ..Self::new()
        }
    }

    /// Whether the stored credential was flagged temporary when set.
    pub async fn credential_flagged_temporary(&self, id: &str) -> EduIdResult<bool> {
        let realm = self.realm.read().await;
        Ok(realm.find(id)?.credential_temporary)
    }

    async fn hash(&self, value: &str) -> Result<String, IdpError> {
        let value = value.to_string();
        let pepper = self.pepper.clone();
        tokio::task::spawn_blocking(move || hash_credential(&value, pepper.as_deref())).await?
    }
}

impl Default for InMemoryIdentityGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentityGateway for InMemoryIdentityGateway {
    async fn create(&self, input: NewIdentity) -> EduIdResult<String> {
        let username = normalize(&input.username);
        let email = normalize(&input.email);

        let mut realm = self.realm.write().await;
        if realm.find_by(|r| r.username == username).is_some() {
            return Err(IdpError::Duplicate { field: "username" }.into());
        }
        if realm
            .find_by(|r| r.email.as_deref() == Some(email.as_str()))
            .is_some()
        {
            return Err(IdpError::Duplicate { field: "email" }.into());
        }

        let id = Uuid::new_v4().to_string();
        let seq = realm.next_seq;
        realm.next_seq += 1;
        realm.identities.insert(
            id.clone(),
            StoredIdentity {
                seq,
                record: IdentityRecord {
                    id: id.clone(),
                    username: username.clone(),
                    email: Some(email),
                    first_name: input.first_name,
                    last_name: input.last_name,
                    enabled: input.enabled,
                    created_timestamp: Some(Utc::now().timestamp_millis()),
                    attributes: input.attributes,
                    realm_roles: Vec::new(),
                },
                credential_hash: None,
                credential_temporary: false,
            },
        );

        info!(user_id = %id, username = %username, "Identity created");
        Ok(id)
    }

    async fn get(&self, id: &str) -> EduIdResult<IdentityRecord> {
        let realm = self.realm.read().await;
        Ok(realm.find(id)?.record.clone())
    }

    async fn get_by_username(&self, username: &str) -> EduIdResult<IdentityRecord> {
        let wanted = normalize(username);
        let realm = self.realm.read().await;
        realm
            .find_by(|r| r.username == wanted)
            .map(|s| s.record.clone())
            .ok_or_else(|| {
                IdpError::NotFound {
                    entity: "identity".into(),
                    id: username.to_string(),
                }
                .into()
            })
    }

    async fn get_by_email(&self, email: &str) -> EduIdResult<IdentityRecord> {
        let wanted = normalize(email);
        let realm = self.realm.read().await;
        realm
            .find_by(|r| r.email.as_deref() == Some(wanted.as_str()))
            .map(|s| s.record.clone())
            .ok_or_else(|| {
                IdpError::NotFound {
                    entity: "identity".into(),
                    id: email.to_string(),
                }
                .into()
            })
    }

    async fn list_all(&self) -> EduIdResult<Vec<IdentityRecord>> {
        let realm = self.realm.read().await;
        let mut stored: Vec<&StoredIdentity> = realm.identities.values().collect();
        stored.sort_by_key(|s| s.seq);
        Ok(stored.into_iter().map(|s| s.record.clone()).collect())
    }

    async fn update_names(&self, id: &str, changes: IdentityChanges) -> EduIdResult<()> {
        let mut realm = self.realm.write().await;
        if let Some(email) = changes.email.as_deref().map(normalize) {
            let taken = realm
                .find_by(|r| r.id != id && r.email.as_deref() == Some(email.as_str()))
                .is_some();
            if taken {
                return Err(IdpError::Duplicate { field: "email" }.into());
            }
            realm.find_mut(id)?.record.email = Some(email);
        }

        let stored = realm.find_mut(id)?;
        if let Some(first) = changes.first_name {
            stored.record.first_name = Some(first);
        }
        if let Some(last) = changes.last_name {
            stored.record.last_name = Some(last);
        }
        Ok(())
    }

    async fn set_enabled(&self, id: &str, enabled: bool) -> EduIdResult<()> {
        let mut realm = self.realm.write().await;
        realm.find_mut(id)?.record.enabled = enabled;
        debug!(user_id = %id, enabled, "Identity enabled flag set");
        Ok(())
    }

    async fn set_credential(&self, id: &str, value: &str, temporary: bool) -> EduIdResult<()> {
        // Fail fast before spending a hash on an unknown identity.
        self.realm.read().await.find(id)?;
        let hash = self.hash(value).await?;

        let mut realm = self.realm.write().await;
        let stored = realm.find_mut(id)?;
        stored.credential_hash = Some(hash);
        stored.credential_temporary = temporary;
        debug!(user_id = %id, temporary, "Credential replaced");
        Ok(())
    }

    async fn verify_credential(&self, id: &str, claim: &str) -> EduIdResult<bool> {
        let hash = {
            let realm = self.realm.read().await;
            match realm.find(id)?.credential_hash.clone() {
                Some(hash) => hash,
                None => return Ok(false),
            }
        };
        let claim = claim.to_string();
        let pepper = self.pepper.clone();
        let valid = tokio::task::spawn_blocking(move || {
            verify_credential_hash(&claim, &hash, pepper.as_deref())
        })
        .await
        .map_err(IdpError::from)??;
        Ok(valid)
    }

    async fn replace_realm_roles(&self, id: &str, roles: &[String]) -> EduIdResult<()> {
        if let Some(unknown) = roles.iter().find(|r| !self.realm_roles.contains(*r)) {
            return Err(IdpError::UnknownRealmRole(unknown.clone()).into());
        }

        let mut assigned: Vec<String> = Vec::with_capacity(roles.len());
        for role in roles {
            if !assigned.contains(role) {
                assigned.push(role.clone());
            }
        }

        let mut realm = self.realm.write().await;
        realm.find_mut(id)?.record.realm_roles = assigned;
        Ok(())
    }

    async fn patch_attributes(&self, id: &str, patch: &AttributePatch) -> EduIdResult<()> {
        let mut realm = self.realm.write().await;
        patch.apply_to(&mut realm.find_mut(id)?.record.attributes);
        Ok(())
    }

    async fn compare_and_clear_attribute(
        &self,
        id: &str,
        key: &str,
        expected: &str,
    ) -> EduIdResult<bool> {
        let mut realm = self.realm.write().await;
        let attributes = &mut realm.find_mut(id)?.record.attributes;
        if first_value(attributes, key) == Some(expected) {
            attributes.remove(key);
            Ok(true)
        } else {
            Ok(false)
        }
    }

    async fn delete(&self, id: &str) -> EduIdResult<()> {
        let mut realm = self.realm.write().await;
        realm.identities.remove(id).ok_or_else(|| not_found(id))?;
        info!(user_id = %id, "Identity deleted");
        Ok(())
    }
}
