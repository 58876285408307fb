use std::sync::{Arc, Mutex, PoisonError};

use dashmap::DashMap;
use tracing::{debug, info, instrument};

use cipherbank_core::UserId;

use crate::error::{LedgerError, Result};
use crate::types::{Account, Balances, TransferDirection};

/// In-process store of per-user accounts.
///
/// Each account lives behind its own `Mutex`, so a transfer holds exclusive
/// access to exactly one user's balances. The outer `DashMap` is only
/// touched long enough to clone the account handle; different users never
/// wait on each other.
pub struct AccountLedger {
    accounts: DashMap<UserId, Arc<Mutex<Account>>>,
    opening: Balances,
}

impl AccountLedger {
    pub fn new(opening: Balances) -> Self {
        Self {
            accounts: DashMap::new(),
            opening,
        }
    }

    /// Open an account with the opening balances unless one already exists.
    ///
    /// Returns `true` when this call created the account.
    #[instrument(skip(self, user_id), fields(user_id = %user_id))]
    pub fn ensure(&self, user_id: &UserId) -> bool {
        if self.accounts.contains_key(user_id) {
            return false;
        }

        let mut created = false;
        self.accounts.entry(user_id.clone()).or_insert_with(|| {
            created = true;
            Arc::new(Mutex::new(Account {
                user_id: user_id.clone(),
                balances: self.opening,
                transfers: 0,
            }))
        });

        if created {
            info!(
                checking = self.opening.checking,
                savings = self.opening.savings,
                "account opened"
            );
        }
        created
    }

    /// Current balances for a user.
    pub fn read(&self, user_id: &UserId) -> Result<Balances> {
        let account = self.account(user_id)?;
        let guard = account.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(guard.balances)
    }

    /// Move `amount` from the source to the destination account.
    ///
    /// There is no overdraft check: the source balance may go negative.
    #[instrument(skip(self, user_id, direction), fields(user_id = %user_id, direction = %direction))]
    pub fn apply_transfer(
        &self,
        user_id: &UserId,
        direction: TransferDirection,
        amount: f64,
    ) -> Result<Balances> {
        if !amount.is_finite() {
            return Err(LedgerError::InvalidAmount(amount));
        }

        let account = self.account(user_id)?;
        let mut guard = account.lock().unwrap_or_else(PoisonError::into_inner);
        let balances = &mut guard.balances;
        match direction {
            TransferDirection::CheckingToSavings => {
                balances.checking -= amount;
                balances.savings += amount;
            }
            TransferDirection::SavingsToChecking => {
                balances.savings -= amount;
                balances.checking += amount;
            }
        }
        let after = *balances;
        guard.transfers += 1;

        debug!(
            checking = after.checking,
            savings = after.savings,
            "transfer applied"
        );
        Ok(after)
    }

    /// Transfers applied across all accounts since startup.
    pub fn transfer_count(&self) -> u64 {
        self.accounts
            .iter()
            .map(|entry| {
                let transfers = entry
                    .value()
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .transfers;
                transfers
            })
            .sum()
    }

    /// Number of open accounts.
    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    fn account(&self, user_id: &UserId) -> Result<Arc<Mutex<Account>>> {
        self.accounts
            .get(user_id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| LedgerError::UnknownAccount {
                user_id: user_id.to_string(),
            })
    }
}

impl Default for AccountLedger {
    fn default() -> Self {
        Self::new(Balances::new(
            cipherbank_core::config::OPENING_CHECKING,
            cipherbank_core::config::OPENING_SAVINGS,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> UserId {
        UserId::from("alice")
    }

    #[test]
    fn ensure_opens_with_default_balances() {
        let ledger = AccountLedger::default();
        assert!(ledger.ensure(&alice()));
        assert_eq!(ledger.read(&alice()).unwrap(), Balances::new(1000.0, 500.0));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn ensure_is_idempotent_and_never_resets() {
        let ledger = AccountLedger::default();
        ledger.ensure(&alice());
        ledger
            .apply_transfer(&alice(), TransferDirection::CheckingToSavings, 200.0)
            .unwrap();
        for _ in 0..5 {
            assert!(!ledger.ensure(&alice()));
        }
        assert_eq!(ledger.read(&alice()).unwrap(), Balances::new(800.0, 700.0));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn checking_to_savings_conserves_total() {
        let ledger = AccountLedger::default();
        ledger.ensure(&alice());
        let before = ledger.read(&alice()).unwrap();
        let after = ledger
            .apply_transfer(&alice(), TransferDirection::CheckingToSavings, 250.0)
            .unwrap();
        assert_eq!(after.checking, before.checking - 250.0);
        assert_eq!(after.savings, before.savings + 250.0);
        assert_eq!(after.total(), before.total());
    }

    #[test]
    fn savings_to_checking_conserves_total() {
        let ledger = AccountLedger::default();
        ledger.ensure(&alice());
        let before = ledger.read(&alice()).unwrap();
        let after = ledger
            .apply_transfer(&alice(), TransferDirection::SavingsToChecking, 125.5)
            .unwrap();
        assert_eq!(after.savings, before.savings - 125.5);
        assert_eq!(after.checking, before.checking + 125.5);
        assert_eq!(after.total(), before.total());
    }

    #[test]
    fn overdraft_is_allowed() {
        let ledger = AccountLedger::default();
        ledger.ensure(&alice());
        let after = ledger
            .apply_transfer(&alice(), TransferDirection::SavingsToChecking, 900.0)
            .unwrap();
        assert_eq!(after.savings, -400.0);
        assert_eq!(after.checking, 1900.0);
    }

    #[test]
    fn transfer_without_account_fails() {
        let ledger = AccountLedger::default();
        let err = ledger
            .apply_transfer(&alice(), TransferDirection::CheckingToSavings, 1.0)
            .unwrap_err();
        assert!(matches!(err, LedgerError::UnknownAccount { .. }));
        assert!(ledger.read(&alice()).is_err());
    }

    #[test]
    fn non_finite_amount_leaves_balances_untouched() {
        let ledger = AccountLedger::default();
        ledger.ensure(&alice());
        assert!(ledger
            .apply_transfer(&alice(), TransferDirection::CheckingToSavings, f64::NAN)
            .is_err());
        assert_eq!(ledger.read(&alice()).unwrap(), Balances::new(1000.0, 500.0));
    }

    #[test]
    fn users_are_independent() {
        let ledger = AccountLedger::new(Balances::new(10.0, 20.0));
        let bob = UserId::from("bob");
        ledger.ensure(&alice());
        ledger.ensure(&bob);
        ledger
            .apply_transfer(&alice(), TransferDirection::SavingsToChecking, 5.0)
            .unwrap();
        assert_eq!(ledger.read(&bob).unwrap(), Balances::new(10.0, 20.0));
        assert_eq!(ledger.read(&alice()).unwrap(), Balances::new(15.0, 15.0));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_transfers_for_one_user_are_not_lost() {
        let ledger = Arc::new(AccountLedger::default());
        ledger.ensure(&alice());

        let tasks = (0..200).map(|_| {
            let ledger = Arc::clone(&ledger);
            tokio::spawn(async move {
                ledger
                    .apply_transfer(&alice(), TransferDirection::CheckingToSavings, 1.0)
                    .unwrap();
            })
        });
        for result in futures_util::future::join_all(tasks).await {
            result.unwrap();
        }

        assert_eq!(ledger.read(&alice()).unwrap(), Balances::new(800.0, 700.0));
        assert_eq!(ledger.transfer_count(), 200);
    }

    #[test]
    fn transfer_count_spans_users_and_skips_rejected_amounts() {
        let ledger = AccountLedger::default();
        let bob = UserId::from("bob");
        ledger.ensure(&alice());
        ledger.ensure(&bob);
        assert_eq!(ledger.transfer_count(), 0);

        ledger
            .apply_transfer(&alice(), TransferDirection::CheckingToSavings, 10.0)
            .unwrap();
        ledger
            .apply_transfer(&bob, TransferDirection::SavingsToChecking, 10.0)
            .unwrap();
        assert!(ledger
            .apply_transfer(&bob, TransferDirection::SavingsToChecking, f64::INFINITY)
            .is_err());

        assert_eq!(ledger.transfer_count(), 2);
    }
}
