//! Marketplace ABI
//!
//! Solidity interface of the marketplace: calldata is decoded and routed to
//! the ledger, results are ABI-encoded, and ledger events are encoded as EVM
//! logs so standard tooling can watch them.

use alloy_primitives::{Address, Bytes, LogData, U256};
use alloy_sol_types::{sol, SolEvent, SolInterface, SolValue};
use tracing::debug;

use crate::core::ledger::Ledger;
use crate::models::errors::{LedgerError, LedgerResult};
use crate::models::types::{LedgerEvent, ModuleId};

sol! {
    interface IModuleMarketplace {
        event ModuleCreated(uint256 indexed id, address indexed creator, string metadata, uint256 price);
        event ModulePurchased(uint256 indexed id, address indexed buyer, uint256 price);
        event ModuleRated(uint256 indexed id, address indexed rater, uint8 rating);
        event ModulePriceUpdated(uint256 indexed id, uint256 oldPrice, uint256 newPrice);
        event ModuleDeactivated(uint256 indexed id);
        event PlatformFeeUpdated(uint256 oldFee, uint256 newFee);

        function createModule(string metadata, uint256 price) external returns (uint256);
        function purchaseModule(uint256 moduleId) external payable;
        function rateModule(uint256 moduleId, uint8 rating) external;
        function updateModulePrice(uint256 moduleId, uint256 newPrice) external;
        function deactivateModule(uint256 moduleId) external;
        function setPlatformFee(uint256 newFee) external;
        function platformFee() external view returns (uint256);
        function owner() external view returns (address);
        function getModule(uint256 moduleId) external view returns (
            address creator,
            string metadata,
            uint256 price,
            bool isActive,
            uint256 rating,
            uint256 numRatings
        );
    }
}

use IModuleMarketplace::IModuleMarketplaceCalls as Call;

/// Calldata router for the marketplace interface
pub struct MarketplaceAbi;

impl MarketplaceAbi {
    /// Decode `calldata` and run it against `ledger` as `caller` with
    /// `value` attached. Only `purchaseModule` accepts value.
    pub fn execute(ledger: &Ledger, caller: Address, value: U256, calldata: &[u8]) -> LedgerResult<Bytes> {
        let call = Call::abi_decode(calldata, true)
            .map_err(|e| LedgerError::validation(format!("undecodable calldata: {}", e)))?;

        let payable = matches!(call, Call::purchaseModule(_));
        if !payable && !value.is_zero() {
            return Err(LedgerError::validation("function is not payable"));
        }

        debug!(caller = %caller, function = Self::function_name(&call), "Dispatching calldata");

        let output = match call {
            Call::createModule(c) => {
                let id = ledger.create_module(caller, c.metadata, c.price)?;
                U256::from(id).abi_encode()
            }
            Call::purchaseModule(c) => {
                ledger.purchase_module(caller, to_module_id(c.moduleId)?, value)?;
                Vec::new()
            }
            Call::rateModule(c) => {
                ledger.rate_module(caller, to_module_id(c.moduleId)?, c.rating)?;
                Vec::new()
            }
            Call::updateModulePrice(c) => {
                ledger.update_module_price(caller, to_module_id(c.moduleId)?, c.newPrice)?;
                Vec::new()
            }
            Call::deactivateModule(c) => {
                ledger.deactivate_module(caller, to_module_id(c.moduleId)?)?;
                Vec::new()
            }
            Call::setPlatformFee(c) => {
                // Out-of-range values saturate and fail the fee cap.
                let fee_bps = u64::try_from(c.newFee).unwrap_or(u64::MAX);
                ledger.set_platform_fee(caller, fee_bps)?;
                Vec::new()
            }
            Call::platformFee(_) => U256::from(ledger.platform_fee_bps()).abi_encode(),
            Call::owner(_) => ledger.owner().abi_encode(),
            Call::getModule(c) => {
                let module = ledger.get_module(to_module_id(c.moduleId)?)?;
                (
                    module.creator,
                    module.metadata,
                    module.price,
                    module.is_active,
                    U256::from(module.rating),
                    U256::from(module.num_ratings),
                )
                    .abi_encode_params()
            }
        };

        Ok(Bytes::from(output))
    }

    fn function_name(call: &Call) -> &'static str {
        match call {
            Call::createModule(_) => "createModule",
            Call::purchaseModule(_) => "purchaseModule",
            Call::rateModule(_) => "rateModule",
            Call::updateModulePrice(_) => "updateModulePrice",
            Call::deactivateModule(_) => "deactivateModule",
            Call::setPlatformFee(_) => "setPlatformFee",
            Call::platformFee(_) => "platformFee",
            Call::owner(_) => "owner",
            Call::getModule(_) => "getModule",
        }
    }

    /// Encode a ledger event as an EVM log (topics + data)
    pub fn encode_event(event: &LedgerEvent) -> LogData {
        use IModuleMarketplace as abi;

        match event {
            LedgerEvent::ModuleCreated {
                id,
                creator,
                metadata,
                price,
            } => abi::ModuleCreated {
                id: U256::from(*id),
                creator: *creator,
                metadata: metadata.clone(),
                price: *price,
            }
            .encode_log_data(),
            LedgerEvent::ModulePurchased { id, buyer, price } => abi::ModulePurchased {
                id: U256::from(*id),
                buyer: *buyer,
                price: *price,
            }
            .encode_log_data(),
            LedgerEvent::ModuleRated { id, rater, rating } => abi::ModuleRated {
                id: U256::from(*id),
                rater: *rater,
                rating: *rating,
            }
            .encode_log_data(),
            LedgerEvent::ModulePriceUpdated {
                id,
                old_price,
                new_price,
            } => abi::ModulePriceUpdated {
                id: U256::from(*id),
                oldPrice: *old_price,
                newPrice: *new_price,
            }
            .encode_log_data(),
            LedgerEvent::ModuleDeactivated { id } => abi::ModuleDeactivated {
                id: U256::from(*id),
            }
            .encode_log_data(),
            LedgerEvent::PlatformFeeUpdated {
                old_fee_bps,
                new_fee_bps,
            } => abi::PlatformFeeUpdated {
                oldFee: U256::from(*old_fee_bps),
                newFee: U256::from(*new_fee_bps),
            }
            .encode_log_data(),
        }
    }
}

fn to_module_id(raw: U256) -> LedgerResult<ModuleId> {
    u64::try_from(raw).map_err(|_| LedgerError::validation(format!("module id {} out of range", raw)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{address, B256};
    use alloy_sol_types::SolCall;
    use IModuleMarketplace as abi;

    const OWNER: Address = address!("00000000000000000000000000000000000000aa");
    const CREATOR: Address = address!("00000000000000000000000000000000000000c1");

    #[test]
    fn test_create_via_calldata() {
        let ledger = Ledger::new(OWNER);
        let calldata = abi::createModuleCall {
            metadata: "ipfs://module".to_string(),
            price: U256::from(1000),
        }
        .abi_encode();

        let out = MarketplaceAbi::execute(&ledger, CREATOR, U256::ZERO, &calldata).unwrap();
        assert_eq!(out.len(), 32);
        assert_eq!(U256::from_be_slice(&out), U256::from(1));
        assert_eq!(ledger.get_module(1).unwrap().creator, CREATOR);
    }

    #[test]
    fn test_value_rejected_for_non_payable() {
        let ledger = Ledger::new(OWNER);
        let calldata = abi::createModuleCall {
            metadata: "m".to_string(),
            price: U256::from(1),
        }
        .abi_encode();
        assert!(matches!(
            MarketplaceAbi::execute(&ledger, CREATOR, U256::from(1), &calldata),
            Err(LedgerError::Validation(_))
        ));
        assert_eq!(ledger.module_count(), 0);
    }

    #[test]
    fn test_garbage_calldata() {
        let ledger = Ledger::new(OWNER);
        assert!(matches!(
            MarketplaceAbi::execute(&ledger, CREATOR, U256::ZERO, &[0xde, 0xad]),
            Err(LedgerError::Validation(_))
        ));
    }

    #[test]
    fn test_oversized_module_id() {
        let ledger = Ledger::new(OWNER);
        let calldata = abi::deactivateModuleCall {
            moduleId: U256::MAX,
        }
        .abi_encode();
        assert!(matches!(
            MarketplaceAbi::execute(&ledger, CREATOR, U256::ZERO, &calldata),
            Err(LedgerError::Validation(_))
        ));
    }

    #[test]
    fn test_fee_views() {
        let ledger = Ledger::new(OWNER);
        let out = MarketplaceAbi::execute(
            &ledger,
            CREATOR,
            U256::ZERO,
            &abi::platformFeeCall {}.abi_encode(),
        )
        .unwrap();
        assert_eq!(U256::from_be_slice(&out), U256::from(25));

        let set = abi::setPlatformFeeCall {
            newFee: U256::from(u128::MAX),
        }
        .abi_encode();
        assert!(MarketplaceAbi::execute(&ledger, OWNER, U256::ZERO, &set).is_err());
    }

    #[test]
    fn test_module_created_log() {
        let log = MarketplaceAbi::encode_event(&LedgerEvent::ModuleCreated {
            id: 1,
            creator: CREATOR,
            metadata: "ipfs://x".to_string(),
            price: U256::from(1000),
        });

        let topics = log.topics();
        assert_eq!(topics.len(), 3);
        assert_eq!(topics[0], abi::ModuleCreated::SIGNATURE_HASH);
        assert_eq!(topics[1], B256::from(U256::from(1).to_be_bytes::<32>()));
        assert_eq!(topics[2], CREATOR.into_word());

        let decoded = abi::ModuleCreated::decode_log_data(&log, true).unwrap();
        assert_eq!(decoded.metadata, "ipfs://x");
        assert_eq!(decoded.price, U256::from(1000));
    }

    #[test]
    fn test_fee_event_has_no_indexed_args() {
        let log = MarketplaceAbi::encode_event(&LedgerEvent::PlatformFeeUpdated {
            old_fee_bps: 25,
            new_fee_bps: 50,
        });
        assert_eq!(log.topics().len(), 1);
        assert_eq!(log.data.len(), 64);
    }
}
