//! Payment Settlement
//!
//! Fee computation and the transfer plan for a purchase. Executing the plan
//! against the vault is the ledger's job.

use alloy_primitives::{Address, U256};

use crate::models::errors::{LedgerResult, PaymentFailure};
use crate::models::types::TransferKind;
use crate::utils::constants::FEE_DENOMINATOR;

/// Price split between platform and creator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeSplit {
    pub fee: U256,
    pub creator_payment: U256,
}

/// `fee = floor(price * fee_bps / 1000)`, creator gets the rest
pub fn split_price(price: U256, fee_bps: u64) -> LedgerResult<FeeSplit> {
    let fee = price
        .checked_mul(U256::from(fee_bps))
        .ok_or(PaymentFailure::Overflow)?
        / U256::from(FEE_DENOMINATOR);
    let creator_payment = price.checked_sub(fee).ok_or(PaymentFailure::Overflow)?;
    Ok(FeeSplit {
        fee,
        creator_payment,
    })
}

/// One credit issued by a settlement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transfer {
    pub to: Address,
    pub amount: U256,
    pub kind: TransferKind,
}

/// Everything a purchase will move, fixed before the first transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettlementPlan {
    pub buyer: Address,
    /// Escrowed from the buyer up front
    pub payment: U256,
    pub price: U256,
    pub split: FeeSplit,
    pub refund: U256,
    pub transfers: Vec<Transfer>,
}

impl SettlementPlan {
    /// Build the plan; fails with `Insufficient` when `payment < price`
    pub fn new(
        buyer: Address,
        creator: Address,
        owner: Address,
        price: U256,
        payment: U256,
        fee_bps: u64,
    ) -> LedgerResult<Self> {
        if payment < price {
            return Err(PaymentFailure::Insufficient {
                price,
                attached: payment,
            }
            .into());
        }

        let split = split_price(price, fee_bps)?;
        let refund = payment - price;

        let transfers = [
            Transfer {
                to: creator,
                amount: split.creator_payment,
                kind: TransferKind::CreatorPayment,
            },
            Transfer {
                to: owner,
                amount: split.fee,
                kind: TransferKind::PlatformFee,
            },
            Transfer {
                to: buyer,
                amount: refund,
                kind: TransferKind::Refund,
            },
        ]
        .into_iter()
        .filter(|t| !t.amount.is_zero())
        .collect();

        Ok(Self {
            buyer,
            payment,
            price,
            split,
            refund,
            transfers,
        })
    }

    /// Sum of all credits; always equals the escrowed payment
    pub fn total_outflow(&self) -> U256 {
        self.transfers
            .iter()
            .fold(U256::ZERO, |acc, t| acc.saturating_add(t.amount))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::errors::LedgerError;
    use alloy_primitives::address;

    const BUYER: Address = address!("00000000000000000000000000000000000000b1");
    const CREATOR: Address = address!("00000000000000000000000000000000000000c1");
    const OWNER: Address = address!("00000000000000000000000000000000000000aa");

    #[test]
    fn test_default_fee_split() {
        let split = split_price(U256::from(1000), 25).unwrap();
        assert_eq!(split.fee, U256::from(25));
        assert_eq!(split.creator_payment, U256::from(975));
    }

    #[test]
    fn test_split_always_sums_to_price() {
        for price in [1u64, 7, 39, 40, 999, 1000, 123_456_789] {
            for fee_bps in [0u64, 1, 25, 99, 100] {
                let split = split_price(U256::from(price), fee_bps).unwrap();
                assert_eq!(split.fee + split.creator_payment, U256::from(price));
            }
        }
    }

    #[test]
    fn test_fee_truncates() {
        // 39 * 25 / 1000 = 0.975
        let split = split_price(U256::from(39), 25).unwrap();
        assert_eq!(split.fee, U256::ZERO);
        assert_eq!(split.creator_payment, U256::from(39));
    }

    #[test]
    fn test_split_overflow() {
        assert_eq!(
            split_price(U256::MAX, 25).unwrap_err(),
            LedgerError::Payment(PaymentFailure::Overflow)
        );
    }

    #[test]
    fn test_overpayment_refund() {
        let plan =
            SettlementPlan::new(BUYER, CREATOR, OWNER, U256::from(1000), U256::from(1100), 25).unwrap();
        assert_eq!(plan.refund, U256::from(100));
        assert_eq!(plan.total_outflow(), U256::from(1100));
        assert_eq!(plan.transfers.len(), 3);
        assert_eq!(plan.transfers[2].kind, TransferKind::Refund);
    }

    #[test]
    fn test_exact_payment_skips_refund() {
        let plan =
            SettlementPlan::new(BUYER, CREATOR, OWNER, U256::from(1000), U256::from(1000), 25).unwrap();
        assert_eq!(plan.refund, U256::ZERO);
        assert_eq!(plan.transfers.len(), 2);
        assert_eq!(plan.total_outflow(), plan.payment);
    }

    #[test]
    fn test_underpayment_rejected() {
        let err = SettlementPlan::new(BUYER, CREATOR, OWNER, U256::from(1000), U256::from(999), 25)
            .unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Payment(PaymentFailure::Insufficient { .. })
        ));
    }
}
