// ── Credential store ──
//
// One bearer token per principal, all issued by logging in with the
// shared tenant service account. Tokens carry no local expiry: a token
// is valid until the platform rejects it, at which point a caller
// refreshes and retries exactly once through `authorized`.

use std::future::Future;
use std::sync::Arc;

use antitheft_api::PlatformClient;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use secrecy::SecretString;
use tracing::{debug, info, warn};

use crate::config::ServiceAccount;
use crate::error::CoreError;
use crate::model::PrincipalId;

/// A bearer token issued for one principal.
#[derive(Debug)]
pub struct Credential {
    pub principal: PrincipalId,
    pub token: SecretString,
    pub issued_at: DateTime<Utc>,
}

/// Holds the current credential of every principal.
///
/// Each credential sits behind an `Arc` and is replaced wholesale, so
/// concurrent readers always see either the old or the new token.
/// Racing refreshes are allowed; the last writer wins.
pub struct CredentialStore {
    api: PlatformClient,
    account: ServiceAccount,
    credentials: DashMap<PrincipalId, Arc<Credential>>,
}

impl CredentialStore {
    pub fn new(api: PlatformClient, account: ServiceAccount) -> Self {
        Self {
            api,
            account,
            credentials: DashMap::new(),
        }
    }

    /// Current token for `principal`. Never performs I/O.
    pub fn get_token(&self, principal: &PrincipalId) -> Result<SecretString, CoreError> {
        self.credential(principal)
            .map(|c| c.token.clone())
            .ok_or_else(|| CoreError::Unauthenticated {
                principal: principal.clone(),
            })
    }

    /// Current credential for `principal`, if any.
    pub fn credential(&self, principal: &PrincipalId) -> Option<Arc<Credential>> {
        self.credentials.get(principal).map(|r| Arc::clone(r.value()))
    }

    /// Log in with the service account and replace the principal's token.
    pub async fn refresh(&self, principal: &PrincipalId) -> Result<SecretString, CoreError> {
        debug!(principal = %principal, "refreshing credential");
        let token = self
            .api
            .login(&self.account.username, &self.account.password)
            .await
            .map_err(|e| {
                warn!(principal = %principal, error = %e, "credential refresh failed");
                CoreError::from(e)
            })?;

        self.install(principal, token.clone());
        info!(principal = %principal, "credential refreshed");
        Ok(token)
    }

    /// Install an externally issued token without contacting the platform.
    pub fn seed(&self, principal: &PrincipalId, token: SecretString) {
        debug!(principal = %principal, "seeding credential");
        self.install(principal, token);
    }

    /// Forget the principal's credential. Returns `true` if one existed.
    pub fn revoke(&self, principal: &PrincipalId) -> bool {
        self.credentials.remove(principal).is_some()
    }

    fn install(&self, principal: &PrincipalId, token: SecretString) {
        let credential = Credential {
            principal: principal.clone(),
            token,
            issued_at: Utc::now(),
        };
        self.credentials
            .insert(principal.clone(), Arc::new(credential));
    }

    /// Run `op` with the principal's token, refreshing and retrying once
    /// if the platform rejects it.
    ///
    /// A second rejection after the refresh is returned as
    /// [`CoreError::AuthFailed`] without another refresh. Every other
    /// outcome of `op` is passed through unchanged.
    pub async fn authorized<T, F, Fut>(
        &self,
        principal: &PrincipalId,
        mut op: F,
    ) -> Result<T, CoreError>
    where
        F: FnMut(SecretString) -> Fut,
        Fut: Future<Output = Result<T, CoreError>>,
    {
        let token = self.get_token(principal)?;
        match op(token).await {
            Err(e) if e.is_unauthorized() => {
                debug!(principal = %principal, "token rejected, refreshing and retrying once");
            }
            other => return other,
        }

        let token = self.refresh(principal).await?;
        match op(token).await {
            Err(e) if e.is_unauthorized() => Err(CoreError::AuthFailed {
                message: format!("token for {principal} rejected again after refresh"),
            }),
            other => other,
        }
    }
}
