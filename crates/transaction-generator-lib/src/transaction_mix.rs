// Copyright © Aptos Foundation
// SPDX-License-Identifier: Apache-2.0

use rand::Rng;
use stress_types::transaction::TransactionType;
use thiserror::Error;

/// Draws are taken from `[0, MIX_TOTAL)`.
pub const MIX_TOTAL: u8 = 100;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MixError {
    #[error("transaction mix weights must sum to 100, got {0}")]
    InvalidTotal(u32),
    #[error("transaction type {0} appears more than once in the mix")]
    DuplicateType(TransactionType),
}

/// Maps a percentage draw onto a transaction type.
///
/// The weights, in insertion order, partition `[0, 100)` into consecutive
/// half-open ranges. A zero weight yields an empty range that is never drawn.
#[derive(Clone, Debug)]
pub struct TransactionMix {
    /// (type, exclusive upper bound of its range)
    partitions: Vec<(TransactionType, u8)>,
}

impl TransactionMix {
    pub fn new(
        weights: impl IntoIterator<Item = (TransactionType, u8)>,
    ) -> Result<Self, MixError> {
        let mut partitions: Vec<(TransactionType, u8)> = Vec::new();
        let mut total: u32 = 0;
        for (txn_type, weight) in weights {
            if partitions.iter().any(|(existing, _)| *existing == txn_type) {
                return Err(MixError::DuplicateType(txn_type));
            }
            total += weight as u32;
            // saturates, totals above 100 are rejected below
            partitions.push((txn_type, total.min(MIX_TOTAL as u32) as u8));
        }
        if total != MIX_TOTAL as u32 {
            return Err(MixError::InvalidTotal(total));
        }
        Ok(Self { partitions })
    }

    /// Returns the type whose range contains `draw`. `draw` must be below 100.
    pub fn select(&self, draw: u8) -> TransactionType {
        debug_assert!(draw < MIX_TOTAL, "draw {} out of range", draw);
        self.partitions
            .iter()
            .find(|(_, upper)| draw < *upper)
            .or_else(|| self.partitions.last())
            .map(|(txn_type, _)| *txn_type)
            .unwrap_or(TransactionType::Transfer)
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> TransactionType {
        self.select(rng.gen_range(0, MIX_TOTAL))
    }

    pub fn types(&self) -> impl Iterator<Item = TransactionType> + '_ {
        self.partitions.iter().map(|(txn_type, _)| *txn_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use claims::{assert_err, assert_ok};
    use rand::{SeedableRng, rngs::StdRng};
    use std::collections::HashMap;
    use stress_types::transaction::TransactionType::*;

    #[test]
    fn test_rejects_bad_totals() {
        assert_eq!(
            TransactionMix::new([(Transfer, 70), (TriggerContract, 20)]).unwrap_err(),
            MixError::InvalidTotal(90)
        );
        assert_eq!(
            TransactionMix::new([(Transfer, 100), (TriggerContract, 100)]).unwrap_err(),
            MixError::InvalidTotal(200)
        );
        assert_err!(TransactionMix::new(Vec::<(TransactionType, u8)>::new()));
        assert_eq!(
            TransactionMix::new([(Transfer, 50), (Transfer, 50)]).unwrap_err(),
            MixError::DuplicateType(Transfer)
        );
    }

    #[test]
    fn test_select_is_total_and_follows_insertion_order() {
        let mix = assert_ok!(TransactionMix::new([
            (TriggerContract, 10),
            (Transfer, 70),
            (TransferFungibleAsset, 20),
        ]));
        for draw in 0..MIX_TOTAL {
            let expected = match draw {
                0..=9 => TriggerContract,
                10..=79 => Transfer,
                _ => TransferFungibleAsset,
            };
            assert_eq!(mix.select(draw), expected, "draw {}", draw);
            // pure
            assert_eq!(mix.select(draw), mix.select(draw));
        }
    }

    #[test]
    fn test_zero_weight_never_selected() {
        let mix = assert_ok!(TransactionMix::new([
            (Transfer, 0),
            (TriggerContract, 100),
            (TransferFungibleAsset, 0),
        ]));
        assert!((0..MIX_TOTAL).all(|draw| mix.select(draw) == TriggerContract));
    }

    #[test]
    fn test_sampled_distribution() {
        let mix = assert_ok!(TransactionMix::new([
            (Transfer, 70),
            (TransferFungibleAsset, 20),
            (TriggerContract, 10),
        ]));
        let mut rng = StdRng::seed_from_u64(42);
        let samples = 10_000;
        let mut counts: HashMap<TransactionType, usize> = HashMap::new();
        for _ in 0..samples {
            *counts.entry(mix.sample(&mut rng)).or_default() += 1;
        }
        for (txn_type, percent) in [
            (Transfer, 70.0),
            (TransferFungibleAsset, 20.0),
            (TriggerContract, 10.0),
        ] {
            let observed = counts[&txn_type] as f64 * 100.0 / samples as f64;
            assert!(
                (observed - percent).abs() <= 5.0,
                "{} observed {}%, expected {}%",
                txn_type,
                observed,
                percent
            );
        }
    }
}
