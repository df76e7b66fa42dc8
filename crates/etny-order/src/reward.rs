use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use etny_config::{FeeModel, RewardType};

/// Computes the operator's reward for a closed order (spec.md §4.6
/// "Reward formula"). `rust_decimal` keeps the 2-decimal rounding exact;
/// `f64` alone does not reliably reproduce `153.00` / `156.52`.
pub fn compute_reward(price: u64, duration: u64, fee_model: &FeeModel) -> Decimal {
    let total = Decimal::from(price) * Decimal::from(duration);
    let network_fee_pct = Decimal::from(fee_model.network_fee_pct);
    let enclave_fee_pct = Decimal::from(fee_model.enclave_fee_pct);

    let reward = match fee_model.reward_type {
        RewardType::Net => {
            let net = total * network_fee_pct / dec!(100);
            let enc = total * enclave_fee_pct / dec!(100);
            total - net - enc
        }
        RewardType::GrossedUp => {
            let base = total * dec!(100) / (dec!(100) + network_fee_pct + enclave_fee_pct);
            let net = base * network_fee_pct / dec!(100);
            let enc = base * enclave_fee_pct / dec!(100);
            total - net - enc
        }
    };
    reward.round_dp(2)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fee_model(reward_type: RewardType) -> FeeModel {
        FeeModel { network_fee_pct: 5, enclave_fee_pct: 10, reward_type }
    }

    /// spec.md §8 scenario S2.
    #[test]
    fn s2_reward_type_net() {
        let reward = compute_reward(3, 60, &fee_model(RewardType::Net));
        assert_eq!(reward, dec!(153.00));
    }

    /// spec.md §8 scenario S3.
    #[test]
    fn s3_reward_type_grossed_up() {
        let reward = compute_reward(3, 60, &fee_model(RewardType::GrossedUp));
        assert_eq!(reward, dec!(156.52));
    }

    #[test]
    fn zero_fees_return_the_full_total_under_either_formula() {
        let zero_fees = FeeModel { network_fee_pct: 0, enclave_fee_pct: 0, reward_type: RewardType::Net };
        assert_eq!(compute_reward(10, 10, &zero_fees), dec!(100.00));
        let zero_fees = FeeModel { network_fee_pct: 0, enclave_fee_pct: 0, reward_type: RewardType::GrossedUp };
        assert_eq!(compute_reward(10, 10, &zero_fees), dec!(100.00));
    }

}
