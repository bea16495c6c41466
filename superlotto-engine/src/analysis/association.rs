use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::Serialize;

use superlotto_db::models::{Draw, Zone};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleKind {
    Front,
    Back,
    FrontSeq,
    BackSeq,
}

impl RuleKind {
    fn same_draw(zone: Zone) -> Self {
        match zone {
            Zone::Front => RuleKind::Front,
            Zone::Back => RuleKind::Back,
        }
    }

    fn sequential(zone: Zone) -> Self {
        match zone {
            Zone::Front => RuleKind::FrontSeq,
            Zone::Back => RuleKind::BackSeq,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            RuleKind::Front => "FRONT",
            RuleKind::Back => "BACK",
            RuleKind::FrontSeq => "FRONT_SEQ",
            RuleKind::BackSeq => "BACK_SEQ",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssociationRule {
    pub antecedent: BTreeSet<u8>,
    pub consequent: BTreeSet<u8>,
    pub support: f64,
    pub confidence: f64,
    pub lift: f64,
    pub kind: RuleKind,
}

impl AssociationRule {
    fn single(antecedent: u8, consequent: u8, support: f64, confidence: f64, lift: f64, kind: RuleKind) -> Self {
        Self {
            antecedent: BTreeSet::from([antecedent]),
            consequent: BTreeSet::from([consequent]),
            support,
            confidence,
            lift,
            kind,
        }
    }

    pub fn is_strong(&self, min_support: f64, min_confidence: f64) -> bool {
        self.support >= min_support && self.confidence >= min_confidence && self.lift > 1.0
    }

    pub fn description(&self) -> String {
        self.to_string()
    }
}

fn format_set(set: &BTreeSet<u8>) -> String {
    set.iter().map(|n| format!("{:02}", n)).collect::<Vec<_>>().join(", ")
}

impl fmt::Display for AssociationRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] -> [{}] (support {:.2}%, confiance {:.2}%, lift {:.2})",
            format_set(&self.antecedent),
            format_set(&self.consequent),
            self.support * 100.0,
            self.confidence * 100.0,
            self.lift
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NetworkNode {
    pub number: u8,
    pub name: String,
    pub frequency: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NetworkLink {
    pub source: String,
    pub target: String,
    pub lift: f64,
    pub confidence: f64,
    pub support: f64,
}

/// Graphe des règles les plus fortes, prêt à être sérialisé.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssociationNetwork {
    pub nodes: Vec<NetworkNode>,
    pub links: Vec<NetworkLink>,
    pub rules: Vec<String>,
}

/// Tri par lift décroissant ; antécédent puis conséquent départagent les égalités.
fn sort_by_lift(rules: &mut [AssociationRule]) {
    rules.sort_by(|a, b| {
        b.lift
            .partial_cmp(&a.lift)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.antecedent.cmp(&b.antecedent))
            .then_with(|| a.consequent.cmp(&b.consequent))
    });
}

#[derive(Debug, Clone)]
pub struct AssociationMiner {
    pub window: usize,
    pub min_support: f64,
    pub min_confidence: f64,
}

impl AssociationMiner {
    pub fn new(window: usize, min_support: f64, min_confidence: f64) -> Self {
        Self { window, min_support, min_confidence }
    }

    fn recent<'a>(&self, draws: &'a [Draw]) -> &'a [Draw] {
        &draws[..self.window.min(draws.len())]
    }

    /// Règles a -> b entre numéros sortis dans le même tirage.
    pub fn mine(&self, draws: &[Draw], zone: Zone) -> Vec<AssociationRule> {
        let window = self.recent(draws);
        let total = window.len();
        if total == 0 {
            return Vec::new();
        }

        let mut single = vec![0u32; zone.size() + 1];
        let mut pairs: BTreeMap<(u8, u8), u32> = BTreeMap::new();
        for draw in window {
            let numbers = draw.zone(zone);
            for &n in numbers {
                single[n as usize] += 1;
            }
            for i in 0..numbers.len() {
                for j in (i + 1)..numbers.len() {
                    let key = (numbers[i].min(numbers[j]), numbers[i].max(numbers[j]));
                    *pairs.entry(key).or_insert(0) += 1;
                }
            }
        }

        let kind = RuleKind::same_draw(zone);
        let mut rules = Vec::new();
        for (&(a, b), &co) in &pairs {
            let support = co as f64 / total as f64;
            if support < self.min_support {
                continue;
            }
            for (from, to) in [(a, b), (b, a)] {
                let from_count = single[from as usize];
                if from_count == 0 {
                    continue;
                }
                let confidence = co as f64 / from_count as f64;
                if confidence < self.min_confidence {
                    continue;
                }
                let expected = single[to as usize] as f64 / total as f64;
                let lift = if expected > 0.0 { confidence / expected } else { 0.0 };
                if lift > 1.0 {
                    rules.push(AssociationRule::single(from, to, support, confidence, lift, kind));
                }
            }
        }

        sort_by_lift(&mut rules);
        log::debug!("{} : {} règles d'association", zone.label(), rules.len());
        rules
    }

    /// Règles décalées : numéro du tirage t+1 (plus ancien) -> numéro du tirage t.
    /// Le lift se mesure contre la probabilité théorique pick_count / taille.
    pub fn mine_sequential(&self, draws: &[Draw], zone: Zone) -> Vec<AssociationRule> {
        let window = self.recent(draws);
        if window.len() < 2 {
            return Vec::new();
        }
        let total = window.len() - 1;

        let mut prev_count = vec![0u32; zone.size() + 1];
        let mut transitions: BTreeMap<(u8, u8), u32> = BTreeMap::new();
        for pair in window.windows(2) {
            let (newer, older) = (&pair[0], &pair[1]);
            for &prev in older.zone(zone) {
                prev_count[prev as usize] += 1;
                for &curr in newer.zone(zone) {
                    *transitions.entry((prev, curr)).or_insert(0) += 1;
                }
            }
        }

        let expected = zone.pick_count() as f64 / zone.size() as f64;
        let kind = RuleKind::sequential(zone);
        let mut rules = Vec::new();
        for (&(prev, curr), &co) in &transitions {
            let support = co as f64 / total as f64;
            if support < self.min_support {
                continue;
            }
            let p = prev_count[prev as usize];
            if p == 0 {
                continue;
            }
            let confidence = co as f64 / p as f64;
            if confidence < self.min_confidence {
                continue;
            }
            let lift = confidence / expected;
            if lift > 1.0 {
                rules.push(AssociationRule::single(prev, curr, support, confidence, lift, kind));
            }
        }

        sort_by_lift(&mut rules);
        log::debug!("{} : {} règles séquentielles", zone.label(), rules.len());
        rules
    }

    /// Conséquents des règles partant de `number`, par lift décroissant, sans doublon.
    pub fn related_numbers(&self, draws: &[Draw], number: u8, zone: Zone, top_n: usize) -> Vec<u8> {
        let mut related: Vec<u8> = Vec::new();
        for rule in self.mine(draws, zone).iter().filter(|r| r.antecedent.contains(&number)) {
            for &n in &rule.consequent {
                if !related.contains(&n) {
                    related.push(n);
                }
            }
        }
        related.truncate(top_n);
        related
    }

    pub fn network(&self, draws: &[Draw], zone: Zone, top_n: usize) -> AssociationNetwork {
        let mut rules = self.mine(draws, zone);
        rules.truncate(top_n);

        let involved: BTreeSet<u8> = rules
            .iter()
            .flat_map(|r| r.antecedent.iter().chain(r.consequent.iter()).copied())
            .collect();

        let mut frequency = vec![0u32; zone.size() + 1];
        for draw in self.recent(draws) {
            for &n in draw.zone(zone) {
                frequency[n as usize] += 1;
            }
        }

        let nodes = involved
            .iter()
            .map(|&number| NetworkNode {
                number,
                name: format!("{:02}", number),
                frequency: frequency[number as usize],
            })
            .collect();

        let mut links = Vec::new();
        for rule in &rules {
            for source in &rule.antecedent {
                for target in &rule.consequent {
                    links.push(NetworkLink {
                        source: format!("{:02}", source),
                        target: format!("{:02}", target),
                        lift: rule.lift,
                        confidence: rule.confidence,
                        support: rule.support,
                    });
                }
            }
        }

        AssociationNetwork {
            nodes,
            links,
            rules: rules.iter().map(|r| r.description()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::make_test_draws;
    use superlotto_db::models::Combination;

    fn draw(issue: usize, front: [u8; 5], back: [u8; 2]) -> Draw {
        Draw::new(format!("{}", 26000 + issue), "2026-01-01", Combination::new(front, back).unwrap())
    }

    /// 3 et 17 sortent ensemble un tirage sur deux ; le reste tourne.
    fn paired_history(n: usize) -> Vec<Draw> {
        (0..n)
            .map(|i| {
                let front = if i % 2 == 0 {
                    [3, 17, 20 + (i % 5) as u8, 26 + (i % 4) as u8, 31 + (i % 3) as u8]
                } else {
                    [1 + (i % 2) as u8, 5 + (i % 7) as u8, 13 + (i % 3) as u8, 21 + (i % 5) as u8, 32]
                };
                draw(n - i, front, [1 + (i % 6) as u8, 7 + (i % 6) as u8])
            })
            .collect()
    }

    #[test]
    fn test_every_rule_is_strong() {
        let miner = AssociationMiner::new(200, 0.02, 0.3);
        for draws in [make_test_draws(150), paired_history(120)] {
            for zone in Zone::ALL {
                for rule in miner.mine(&draws, zone).iter().chain(miner.mine_sequential(&draws, zone).iter()) {
                    assert!(rule.is_strong(0.02, 0.3), "règle faible : {}", rule);
                }
            }
        }
    }

    #[test]
    fn test_sorted_by_lift() {
        let miner = AssociationMiner::new(200, 0.02, 0.3);
        let rules = miner.mine(&paired_history(100), Zone::Front);
        assert!(!rules.is_empty());
        assert!(rules.windows(2).all(|w| w[0].lift >= w[1].lift));
    }

    #[test]
    fn test_pair_detected_both_directions() {
        let miner = AssociationMiner::new(200, 0.02, 0.3);
        let rules = miner.mine(&paired_history(100), Zone::Front);
        let has = |a: u8, b: u8| {
            rules.iter().any(|r| r.antecedent.contains(&a) && r.consequent.contains(&b))
        };
        assert!(has(3, 17));
        assert!(has(17, 3));
        let rule = rules
            .iter()
            .find(|r| r.antecedent.contains(&3) && r.consequent.contains(&17))
            .unwrap();
        assert!((rule.support - 0.5).abs() < 1e-12);
        assert!((rule.confidence - 1.0).abs() < 1e-12);
        assert!((rule.lift - 2.0).abs() < 1e-12);
        assert_eq!(rule.kind, RuleKind::Front);
    }

    #[test]
    fn test_sequential_baseline() {
        // 3 au tirage plus ancien est toujours suivi de 32 : confiance 1, lift = 35/5.
        let miner = AssociationMiner::new(200, 0.02, 0.3);
        let rules = miner.mine_sequential(&paired_history(100), Zone::Front);
        let rule = rules
            .iter()
            .find(|r| r.antecedent.contains(&3) && r.consequent.contains(&32))
            .unwrap();
        assert!((rule.confidence - 1.0).abs() < 1e-12);
        assert!((rule.lift - 7.0).abs() < 1e-9);
        assert_eq!(rule.kind, RuleKind::FrontSeq);
    }

    #[test]
    fn test_related_numbers() {
        let miner = AssociationMiner::new(200, 0.02, 0.3);
        let draws = paired_history(100);
        let related = miner.related_numbers(&draws, 3, Zone::Front, 5);
        assert!(related.len() <= 5);
        assert!(related.contains(&17));
        let mut dedup = related.clone();
        dedup.sort_unstable();
        dedup.dedup();
        assert_eq!(dedup.len(), related.len());
    }

    #[test]
    fn test_empty_history() {
        let miner = AssociationMiner::new(200, 0.02, 0.3);
        assert!(miner.mine(&[], Zone::Front).is_empty());
        assert!(miner.mine_sequential(&make_test_draws(1), Zone::Front).is_empty());
    }

    #[test]
    fn test_network() {
        let miner = AssociationMiner::new(200, 0.02, 0.3);
        let network = miner.network(&paired_history(100), Zone::Front, 5);
        assert!(network.rules.len() <= 5);
        assert_eq!(network.links.len(), network.rules.len());
        let names: Vec<&str> = network.nodes.iter().map(|n| n.name.as_str()).collect();
        for link in &network.links {
            assert!(names.contains(&link.source.as_str()));
            assert!(names.contains(&link.target.as_str()));
        }
        let json = serde_json::to_string(&network).unwrap();
        assert!(json.contains("\"links\""));
    }
}
