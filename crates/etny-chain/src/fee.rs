use ethers_core::types::U256;

use crate::error::ChainError;

/// A chosen gas price for one `send`, already validated against the
/// configured ceiling (spec.md §4.3 "Fee policy").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GasPrice {
    Eip1559 { max_fee_per_gas: U256, max_priority_fee_per_gas: U256 },
    Legacy { gas_price: U256 },
}

/// `maxFeePerGas = ceil(baseFee * 1.1) + priority`, rejected if it
/// exceeds `ceiling_wei` (spec.md §4.3).
pub fn eip1559_fee(
    base_fee: U256,
    priority_fee: U256,
    ceiling_wei: u128,
) -> Result<GasPrice, ChainError> {
    // ceil(base_fee * 1.1) without floating point: ceil(base_fee*11 / 10).
    let scaled = base_fee.saturating_mul(U256::from(11u64));
    let ten = U256::from(10u64);
    let bumped = (scaled + ten - U256::from(1u64)) / ten;
    let max_fee_per_gas = bumped.saturating_add(priority_fee);

    if max_fee_per_gas > U256::from(ceiling_wei) {
        return Err(ChainError::FeeTooHigh {
            computed: max_fee_per_gas.as_u128(),
            ceiling: ceiling_wei,
        });
    }
    Ok(GasPrice::Eip1559 { max_fee_per_gas, max_priority_fee_per_gas: priority_fee })
}

/// `gasPrice = gas_price_value * gas_price_measure` (spec.md §4.3, legacy
/// mode; `gas_price_measure` is the wei/gwei scaling unit).
pub fn legacy_fee(gas_price_value: u64, gas_price_measure: u64) -> GasPrice {
    GasPrice::Legacy { gas_price: U256::from(gas_price_value) * U256::from(gas_price_measure) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eip1559_rounds_base_fee_bump_up() {
        let fee = eip1559_fee(U256::from(100u64), U256::from(2u64), 1_000_000).unwrap();
        // ceil(100 * 1.1) = 110, + priority 2 = 112.
        assert_eq!(fee, GasPrice::Eip1559 {
            max_fee_per_gas: U256::from(112u64),
            max_priority_fee_per_gas: U256::from(2u64),
        });
    }

    #[test]
    fn eip1559_fee_above_ceiling_errors() {
        let err = eip1559_fee(U256::from(1_000_000u64), U256::from(0u64), 1).unwrap_err();
        assert!(matches!(err, ChainError::FeeTooHigh { .. }));
    }

    #[test]
    fn legacy_fee_multiplies_value_by_measure() {
        let fee = legacy_fee(50, 1_000_000_000);
        assert_eq!(fee, GasPrice::Legacy { gas_price: U256::from(50_000_000_000u64) });
    }
}
