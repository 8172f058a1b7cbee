//! Funds Vault
//!
//! Account balances kept in an in-memory EVM account database. Every
//! mutation returns a journal entry so a failed settlement can be undone.

use alloy_primitives::{Address, U256};
use revm::db::{CacheDB, EmptyDB};
use revm::primitives::AccountInfo;

use crate::models::errors::{LedgerResult, PaymentFailure};

/// Reversible balance change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VaultOp {
    Credit { account: Address, amount: U256 },
    Debit { account: Address, amount: U256 },
}

/// Balance store backed by `CacheDB<EmptyDB>`
#[derive(Debug, Clone)]
pub struct Vault {
    db: CacheDB<EmptyDB>,
}

impl Default for Vault {
    fn default() -> Self {
        Self::new()
    }
}

impl Vault {
    pub fn new() -> Self {
        Self {
            db: CacheDB::new(EmptyDB::default()),
        }
    }

    pub fn balance_of(&self, account: &Address) -> U256 {
        self.db
            .accounts
            .get(account)
            .map(|a| a.info.balance)
            .unwrap_or_default()
    }

    /// Sum over every known account
    pub fn total_balance(&self) -> U256 {
        self.db
            .accounts
            .values()
            .fold(U256::ZERO, |acc, a| acc.saturating_add(a.info.balance))
    }

    pub fn account_count(&self) -> usize {
        self.db.accounts.len()
    }

    pub fn credit(&mut self, account: Address, amount: U256) -> LedgerResult<VaultOp> {
        let balance = self
            .balance_of(&account)
            .checked_add(amount)
            .ok_or(PaymentFailure::Overflow)?;
        self.set_balance(account, balance);
        Ok(VaultOp::Credit { account, amount })
    }

    pub fn debit(&mut self, account: Address, amount: U256) -> LedgerResult<VaultOp> {
        let balance = self.balance_of(&account);
        let remaining = balance
            .checked_sub(amount)
            .ok_or(PaymentFailure::InsufficientBalance {
                account,
                balance,
                required: amount,
            })?;
        self.set_balance(account, remaining);
        Ok(VaultOp::Debit { account, amount })
    }

    /// Undo journal entries, newest first
    pub fn revert(&mut self, journal: &[VaultOp]) {
        for op in journal.iter().rev() {
            match *op {
                VaultOp::Credit { account, amount } => {
                    let balance = self.balance_of(&account).saturating_sub(amount);
                    self.set_balance(account, balance);
                }
                VaultOp::Debit { account, amount } => {
                    let balance = self.balance_of(&account).saturating_add(amount);
                    self.set_balance(account, balance);
                }
            }
        }
    }

    fn set_balance(&mut self, account: Address, balance: U256) {
        let info = match self.db.accounts.get(&account) {
            Some(existing) => AccountInfo {
                balance,
                ..existing.info.clone()
            },
            None => AccountInfo::from_balance(balance),
        };
        self.db.insert_account_info(account, info);
    }
}
