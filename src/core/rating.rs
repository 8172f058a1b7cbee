//! Rating Aggregator
//!
//! Running average with integer truncation at every step:
//! `avg' = floor((avg * n + rating) / (n + 1))`.
//!
//! The recurrence is order-dependent and drifts below the exact mean over
//! long histories.

use crate::models::errors::{LedgerError, LedgerResult};
use crate::models::types::Module;
use crate::utils::constants::{is_valid_rating, MAX_RATING, MIN_RATING};

/// Reject ratings outside 1..=5
pub fn validate_rating(rating: u8) -> LedgerResult<()> {
    if !is_valid_rating(rating) {
        return Err(LedgerError::validation(format!(
            "rating must be between {} and {}, got {}",
            MIN_RATING, MAX_RATING, rating
        )));
    }
    Ok(())
}

/// Next value of the running average
pub fn next_average(average: u64, count: u64, rating: u8) -> LedgerResult<u64> {
    let total = u128::from(average) * u128::from(count) + u128::from(rating);
    let next = total / (u128::from(count) + 1);
    u64::try_from(next).map_err(|_| LedgerError::validation("rating average overflow"))
}

/// Fold one rating into a module's aggregate
pub fn apply_rating(module: &mut Module, rating: u8) -> LedgerResult<()> {
    validate_rating(rating)?;
    let count = module
        .num_ratings
        .checked_add(1)
        .ok_or_else(|| LedgerError::validation("rating count overflow"))?;
    module.rating = next_average(module.rating, module.num_ratings, rating)?;
    module.num_ratings = count;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{Address, U256};

    fn fresh() -> Module {
        Module::new(1, Address::ZERO, "m".into(), U256::from(1))
    }

    #[test]
    fn test_reference_sequence() {
        let mut module = fresh();
        let mut seen = Vec::new();
        for rating in [5u8, 3, 4] {
            apply_rating(&mut module, rating).unwrap();
            seen.push((module.rating, module.num_ratings));
        }
        assert_eq!(seen, vec![(5, 1), (4, 2), (4, 3)]);
    }

    #[test]
    fn test_out_of_range_leaves_module_untouched() {
        let mut module = fresh();
        assert!(apply_rating(&mut module, 0).is_err());
        assert!(apply_rating(&mut module, 6).is_err());
        assert_eq!(module.rating, 0);
        assert_eq!(module.num_ratings, 0);
    }

    #[test]
    fn test_first_rating_is_taken_verbatim() {
        for rating in 1..=5u8 {
            assert_eq!(next_average(0, 0, rating).unwrap(), u64::from(rating));
        }
    }

    #[test]
    fn test_truncation_drift_against_exact_mean() {
        // [1, 5, 5, 5]: exact mean is 4, the recurrence settles at 3
        let ratings = [1u8, 5, 5, 5];
        let mut module = fresh();
        for rating in ratings {
            apply_rating(&mut module, rating).unwrap();
        }
        let exact = ratings.iter().map(|r| u64::from(*r)).sum::<u64>() / ratings.len() as u64;
        assert_eq!(exact, 4);
        assert_eq!(module.rating, 3);
        assert_eq!(module.num_ratings, 4);
    }

    #[test]
    fn test_order_dependence() {
        let mut forward = fresh();
        let mut backward = fresh();
        for rating in [1u8, 5, 5, 5] {
            apply_rating(&mut forward, rating).unwrap();
        }
        for rating in [5u8, 5, 5, 1] {
            apply_rating(&mut backward, rating).unwrap();
        }
        // 5, 5, 5, floor(16/4) = 4
        assert_eq!(backward.rating, 4);
        assert_ne!(forward.rating, backward.rating);
    }
}
