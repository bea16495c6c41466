use serde::{Deserialize, Serialize};

use superlotto_db::models::{Combination, PrizeTier, Verification};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PrizeRule {
    pub front_hits: u8,
    pub back_hits: u8,
    pub tier: PrizeTier,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TierPayout {
    pub tier: PrizeTier,
    pub amount: u64,
}

/// Table des rangs et des gains, injectée dans la vérification et le backtest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrizeTable {
    pub rules: Vec<PrizeRule>,
    pub payouts: Vec<TierPayout>,
    pub cost_per_combination: u64,
}

impl Default for PrizeTable {
    fn default() -> Self {
        let rule = |front_hits, back_hits, tier| PrizeRule { front_hits, back_hits, tier };
        let pay = |tier, amount| TierPayout { tier, amount };
        Self {
            rules: vec![
                rule(5, 2, PrizeTier::Tier1),
                rule(5, 1, PrizeTier::Tier2),
                rule(5, 0, PrizeTier::Tier3),
                rule(4, 2, PrizeTier::Tier3),
                rule(4, 1, PrizeTier::Tier4),
                rule(4, 0, PrizeTier::Tier5),
                rule(3, 2, PrizeTier::Tier5),
                rule(3, 1, PrizeTier::Tier6),
                rule(2, 2, PrizeTier::Tier6),
                rule(3, 0, PrizeTier::Tier7),
                rule(2, 1, PrizeTier::Tier7),
                rule(1, 2, PrizeTier::Tier7),
                rule(0, 2, PrizeTier::Tier7),
            ],
            payouts: vec![
                pay(PrizeTier::Tier1, 10_000_000),
                pay(PrizeTier::Tier2, 200_000),
                pay(PrizeTier::Tier3, 10_000),
                pay(PrizeTier::Tier4, 3_000),
                pay(PrizeTier::Tier5, 300),
                pay(PrizeTier::Tier6, 200),
                pay(PrizeTier::Tier7, 5),
            ],
            cost_per_combination: 2,
        }
    }
}

impl PrizeTable {
    pub fn tier(&self, front_hits: u8, back_hits: u8) -> PrizeTier {
        self.rules
            .iter()
            .find(|r| r.front_hits == front_hits && r.back_hits == back_hits)
            .map(|r| r.tier)
            .unwrap_or(PrizeTier::NoPrize)
    }

    pub fn payout(&self, tier: PrizeTier) -> u64 {
        self.payouts
            .iter()
            .find(|p| p.tier == tier)
            .map(|p| p.amount)
            .unwrap_or(0)
    }

    /// Compare une grille au tirage réel.
    pub fn evaluate(&self, predicted: &Combination, actual: &Combination) -> Verification {
        let (front_hits, back_hits) = predicted.hits_against(actual);
        Verification {
            front_hits,
            back_hits,
            tier: self.tier(front_hits, back_hits),
        }
    }
}
