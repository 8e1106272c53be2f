//! Account management functionality

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::{Arc, Mutex};
use tokio::sync::OwnedMutexGuard;
use tracing::info;

use crate::ledger::audit::AuditTrail;
use crate::traits::*;
use crate::types::*;
use crate::utils::clock::Clock;

type LockTable = Arc<Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>>;

/// One async mutex per account id.
///
/// Anything that reads an account's recent history and then writes against
/// that account holds the account's guard for the whole read-then-write.
/// An entry lives only while someone holds or waits for it.
#[derive(Debug, Clone, Default)]
pub struct AccountLocks {
    locks: LockTable,
}

impl AccountLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to an account
    pub async fn acquire(&self, account_id: &str) -> LedgerResult<AccountGuard> {
        let lock = {
            let mut locks = self
                .locks
                .lock()
                .map_err(|_| LedgerError::Storage("account lock table poisoned".to_string()))?;
            locks.entry(account_id.to_string()).or_default().clone()
        };
        let guard = lock.clone().lock_owned().await;
        Ok(AccountGuard {
            account_id: account_id.to_string(),
            table: self.locks.clone(),
            lock,
            _guard: guard,
        })
    }

    /// Accounts with a holder or a waiter
    pub fn len(&self) -> usize {
        self.locks.lock().map(|locks| locks.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Exclusive access to one account, released on drop
#[derive(Debug)]
pub struct AccountGuard {
    account_id: String,
    table: LockTable,
    lock: Arc<tokio::sync::Mutex<()>>,
    _guard: OwnedMutexGuard<()>,
}

impl Drop for AccountGuard {
    fn drop(&mut self) {
        let Ok(mut locks) = self.table.lock() else {
            return;
        };
        // Table, this handle and the owned guard; anything more is a waiter
        if Arc::strong_count(&self.lock) <= 3 {
            locks.remove(&self.account_id);
        }
    }
}

/// Account manager for lookups and freeze/unfreeze actions
pub struct AccountManager<S: LedgerStorage + AuditStore> {
    storage: S,
    audit: AuditTrail<S>,
    locks: AccountLocks,
    clock: Arc<dyn Clock>,
}

impl<S: LedgerStorage + AuditStore> AccountManager<S> {
    /// Create a new account manager
    pub fn new(storage: S, audit: AuditTrail<S>, locks: AccountLocks, clock: Arc<dyn Clock>) -> Self {
        Self {
            storage,
            audit,
            locks,
            clock,
        }
    }

    /// Get an account by ID
    pub async fn get_account(&self, account_id: &str) -> LedgerResult<Option<Account>> {
        self.storage.get_account(account_id).await
    }

    /// Get an account by ID, returning an error if not found
    pub async fn get_account_required(&self, account_id: &str) -> LedgerResult<Account> {
        self.storage
            .get_account(account_id)
            .await?
            .ok_or_else(|| LedgerError::AccountNotFound(account_id.to_string()))
    }

    /// List the accounts of an organization
    pub async fn list_accounts(&self, organization_id: &str) -> LedgerResult<Vec<Account>> {
        self.storage.list_accounts(organization_id).await
    }

    /// Freeze an account so it can neither originate nor receive transactions
    pub async fn freeze(
        &self,
        account_id: &str,
        user_id: Option<&str>,
        reason: &str,
        remote_address: IpAddr,
    ) -> LedgerResult<Account> {
        self.set_frozen(account_id, true, user_id, reason, remote_address)
            .await
    }

    /// Lift a freeze
    pub async fn unfreeze(
        &self,
        account_id: &str,
        user_id: Option<&str>,
        reason: &str,
        remote_address: IpAddr,
    ) -> LedgerResult<Account> {
        self.set_frozen(account_id, false, user_id, reason, remote_address)
            .await
    }

    async fn set_frozen(
        &self,
        account_id: &str,
        frozen: bool,
        user_id: Option<&str>,
        reason: &str,
        remote_address: IpAddr,
    ) -> LedgerResult<Account> {
        let _guard = self.locks.acquire(account_id).await?;
        let mut account = self.get_account_required(account_id).await?;

        if account.frozen == frozen {
            return Err(LedgerError::PreconditionFailed(format!(
                "account {} is already {}",
                account_id,
                if frozen { "frozen" } else { "unfrozen" }
            )));
        }

        let previous = account.clone();
        account.frozen = frozen;
        self.storage.update_account(&account).await?;

        let action = if frozen { "account_frozen" } else { "account_unfrozen" };
        let changes = serde_json::json!({
            "frozen": [previous.frozen, account.frozen],
            "reason": reason,
        });
        if let Err(e) = self
            .audit
            .record(
                AuditableRef::new(AuditableKind::Account, account_id),
                action,
                changes,
                user_id,
                remote_address,
                self.clock.now(),
            )
            .await
        {
            tracing::error!(account_id, error = %e, "Audit write failed, restoring account");
            self.storage.update_account(&previous).await?;
            return Err(e);
        }

        info!(account_id, frozen, "Account freeze state changed");
        Ok(account)
    }
}
