use comfy_table::{Cell, Color, ContentArrangement, Table, presets::UTF8_FULL};

use crate::import::ImportResult;
use superlotto_db::models::{Draw, MethodWeight, PredictionCandidate, PrizeTier, Zone};
use superlotto_engine::analysis::association::AssociationRule;
use superlotto_engine::analysis::frequency::NumberFrequency;
use superlotto_engine::analysis::missing::NumberGap;
use superlotto_engine::analysis::trend::TrendPoint;
use superlotto_engine::analysis::statistics::{
    band_distribution, consecutive_distribution, odd_even_distribution, repeated_combinations,
    sum_distribution,
};
use superlotto_engine::backtest::BacktestResult;
use superlotto_engine::config::EngineConfig;
use superlotto_engine::verify::{AccuracyStats, HistoryEntry, VerificationReport};

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

fn join_numbers(numbers: &[u8]) -> String {
    numbers
        .iter()
        .map(|n| format!("{:02}", n))
        .collect::<Vec<_>>()
        .join(" - ")
}

fn tier_color(tier: PrizeTier) -> Color {
    if tier.is_high() {
        Color::Green
    } else if tier.is_prize() {
        Color::Yellow
    } else {
        Color::White
    }
}

pub fn display_draws(draws: &[Draw]) {
    if draws.is_empty() {
        println!("Aucun tirage à afficher.");
        return;
    }

    let mut table = new_table(vec!["Tirage", "Date", "Zone avant", "Zone arrière", "Somme", "Impairs", "AC"]);
    for draw in draws {
        let stats = draw.stats();
        table.add_row(vec![
            draw.issue().to_string(),
            draw.date().to_string(),
            join_numbers(draw.numbers().front()),
            join_numbers(draw.numbers().back()),
            stats.front_sum.to_string(),
            format!("{}:{}", stats.front_odd, 5 - stats.front_odd),
            stats.ac_value.to_string(),
        ]);
    }
    println!("{table}");
}

pub fn display_import_summary(result: &ImportResult) {
    println!("Import terminé :");
    println!("  Total lignes lues : {}", result.total_records);
    println!("  Insérés           : {}", result.inserted);
    println!("  Doublons ignorés  : {}", result.skipped);
    if result.errors > 0 {
        println!("  Erreurs           : {}", result.errors);
    }
}

pub fn display_frequency(zone: Zone, freqs: &[NumberFrequency], gaps: &[NumberGap], window: usize) {
    println!("\n── {} ({} derniers tirages) ──", zone.label(), window);
    let mut table = new_table(vec!["Numéro", "Sorties", "Fréquence", "Retard", "Retard moyen", "Retard max"]);

    let mut sorted = freqs.to_vec();
    sorted.sort_by(|a, b| b.count.cmp(&a.count).then(a.number.cmp(&b.number)));

    for f in &sorted {
        let gap = gaps.iter().find(|g| g.number == f.number);
        table.add_row(vec![
            format!("{:02}", f.number),
            f.count.to_string(),
            format!("{:.1}%", f.percentage * 100.0),
            gap.map(|g| g.current_gap.to_string()).unwrap_or_default(),
            gap.map(|g| format!("{:.1}", g.avg_gap)).unwrap_or_default(),
            gap.map(|g| g.max_gap.to_string()).unwrap_or_default(),
        ]);
    }
    println!("{table}");
}

pub fn display_distributions(draws: &[Draw]) {
    println!("\n── Répartitions (zone avant, {} tirages) ──", draws.len());

    let mut table = new_table(vec!["Impairs:pairs", "Tirages"]);
    for (label, count) in odd_even_distribution(draws) {
        table.add_row(vec![label, count.to_string()]);
    }
    println!("{table}");

    let mut table = new_table(vec!["Somme", "Tirages"]);
    for (label, count) in sum_distribution(draws) {
        table.add_row(vec![label.to_string(), count.to_string()]);
    }
    println!("{table}");

    let mut table = new_table(vec!["Paires consécutives", "Tirages"]);
    for (pairs, count) in consecutive_distribution(draws) {
        table.add_row(vec![pairs.to_string(), count.to_string()]);
    }
    println!("{table}");

    let mut table = new_table(vec!["Bande", "0", "1", "2", "3", "4", "5"]);
    for (band, counts) in band_distribution(draws) {
        let mut row = vec![band.to_string()];
        row.extend(counts.iter().map(|c| c.to_string()));
        table.add_row(row);
    }
    println!("{table}");

    let repeated = repeated_combinations(draws);
    if repeated.is_empty() {
        println!("Aucune combinaison sortie deux fois.");
    } else {
        let mut table = new_table(vec!["Combinaison", "Tirages"]);
        for r in &repeated {
            table.add_row(vec![r.numbers.to_string(), r.issues.join(", ")]);
        }
        println!("{table}");
    }
}

pub fn display_rules(zone: Zone, rules: &[AssociationRule]) {
    if rules.is_empty() {
        println!("Aucune règle forte pour la {}.", zone.label().to_lowercase());
        return;
    }

    println!("\n🔗 Règles d'association ({})\n", rules[0].kind.code());
    let mut table = new_table(vec!["Si", "Alors", "Support", "Confiance", "Lift"]);
    for rule in rules {
        let set = |s: &std::collections::BTreeSet<u8>| s.iter().map(|n| format!("{:02}", n)).collect::<Vec<_>>().join(", ");
        table.add_row(vec![
            set(&rule.antecedent),
            set(&rule.consequent),
            format!("{:.2}%", rule.support * 100.0),
            format!("{:.2}%", rule.confidence * 100.0),
            format!("{:.2}", rule.lift),
        ]);
    }
    println!("{table}");
}

pub fn display_predictions(candidates: &[PredictionCandidate], config: &EngineConfig) {
    if candidates.is_empty() {
        println!("Aucune grille générée.");
        return;
    }

    println!("\n🎲 Grilles pour le tirage {}\n", candidates[0].target_issue);
    let mut table = new_table(vec!["#", "Méthode", "Zone avant", "Zone arrière"]);
    for (i, c) in candidates.iter().enumerate() {
        table.add_row(vec![
            (i + 1).to_string(),
            config.label(c.method),
            join_numbers(c.numbers.front()),
            join_numbers(c.numbers.back()),
        ]);
    }
    println!("{table}");
}

pub fn display_verification(report: &VerificationReport, config: &EngineConfig) {
    let Some(actual) = report.actual else {
        println!("Tirage {} : aucune prédiction en attente.", report.issue);
        return;
    };

    println!("\n✅ Tirage {} : {}\n", report.issue, actual);
    let mut table = new_table(vec!["Méthode", "Grille", "Avant", "Arrière", "Rang"]);
    for c in &report.results {
        let Some(v) = c.verification else {
            continue;
        };
        table.add_row(vec![
            Cell::new(config.label(c.method)),
            Cell::new(c.numbers.to_string()),
            Cell::new(v.front_hits),
            Cell::new(v.back_hits),
            Cell::new(v.tier.label()).fg(tier_color(v.tier)),
        ]);
    }
    println!("{table}");
    println!("{} grilles gagnantes sur {}", report.winners().count(), report.results.len());
}

pub fn display_accuracy(stats: &[AccuracyStats], config: &EngineConfig) {
    if stats.is_empty() {
        println!("Aucune prédiction vérifiée pour l'instant.");
        return;
    }

    println!("\n🏆 Précision des méthodes\n");
    let mut table = new_table(vec![
        "Rang", "Méthode", "Grilles", "Moy. avant", "Moy. arrière", "Taux de gain", "Gros lots", "Score",
    ]);
    for s in stats {
        table.add_row(vec![
            s.rank.to_string(),
            config.label(s.method),
            s.total_predictions.to_string(),
            format!("{:.2}", s.front_avg_hit),
            format!("{:.2}", s.back_avg_hit),
            format!("{:.2}%", s.prize_rate),
            s.high_prize_count.to_string(),
            format!("{:.2}", s.composite_score),
        ]);
    }
    println!("{table}");
}

pub fn display_weights(rows: &[MethodWeight], config: &EngineConfig) {
    println!("\n⚖️  Poids des méthodes\n");
    let mut table = new_table(vec!["Méthode", "Poids", "Taux EMA", "Grilles", "Touchées", "Taux réel"]);
    for w in rows {
        table.add_row(vec![
            config.label(w.method),
            format!("{:.4}", w.weight),
            format!("{:.4}", w.hit_rate),
            w.total_predictions.to_string(),
            w.total_hits.to_string(),
            format!("{:.2}%", w.actual_hit_rate() * 100.0),
        ]);
    }
    println!("{table}");
}

pub fn display_backtest(results: &[BacktestResult], config: &EngineConfig) {
    if results.is_empty() {
        println!("Aucun résultat de backtest.");
        return;
    }

    println!("\n📈 Backtest\n");
    let mut table = new_table(vec![
        "Méthode", "Grilles", "Moy. avant", "Moy. arrière", "Gains", "Gros lots", "Coût", "Gain total", "ROI", "Meilleur rang",
    ]);
    for r in results {
        let roi_color = if r.roi > 0.0 { Color::Green } else { Color::Red };
        table.add_row(vec![
            Cell::new(config.label(r.method)),
            Cell::new(r.total_predictions),
            Cell::new(format!("{:.2}", r.avg_front_hit)),
            Cell::new(format!("{:.2}", r.avg_back_hit)),
            Cell::new(r.total_prize_count),
            Cell::new(r.high_prize_count),
            Cell::new(r.total_cost),
            Cell::new(r.total_payout),
            Cell::new(format!("{:.1}%", r.roi)).fg(roi_color),
            Cell::new(r.best_tier.label()).fg(tier_color(r.best_tier)),
        ]);
    }
    println!("{table}");

    for r in results {
        println!("{} : {}", config.label(r.method), r.evaluation());
    }
}

pub fn display_trend(points: &[TrendPoint]) {
    if points.is_empty() {
        println!("Aucun tirage à afficher.");
        return;
    }

    println!("\n📉 Tendance sur {} tirages (du plus ancien au plus récent)\n", points.len());
    let mut table = new_table(vec![
        "Tirage", "Date", "Zone avant", "Zone arrière", "Somme avant", "Somme arrière", "Impairs", "Consécutifs",
    ]);
    for p in points {
        table.add_row(vec![
            p.issue.clone(),
            p.date.clone(),
            join_numbers(&p.front),
            join_numbers(&p.back),
            p.front_sum.to_string(),
            p.back_sum.to_string(),
            format!("{}:{}", p.front_odd, 5 - p.front_odd),
            p.front_consecutive.to_string(),
        ]);
    }
    println!("{table}");
}

/// Une case par tirage : `●` sorti, `·` absent.
pub fn display_number_trend(zone: Zone, number: u8, presence: &[bool]) {
    let line: String = presence.iter().map(|&hit| if hit { '●' } else { '·' }).collect();
    let hits = presence.iter().filter(|&&hit| hit).count();
    println!(
        "{:02} ({}) : {}  {} sorties sur {}",
        number,
        zone.label().to_lowercase(),
        line,
        hits,
        presence.len()
    );
}

pub fn display_sum_trend(zone: Zone, sums: &[u32]) {
    if sums.is_empty() {
        return;
    }
    let avg = sums.iter().sum::<u32>() as f64 / sums.len() as f64;
    let series = sums.iter().map(|s| s.to_string()).collect::<Vec<_>>().join(" ");
    println!("Sommes {} : {}", zone.label().to_lowercase(), series);
    println!("Moyenne : {:.1}", avg);
}

pub fn display_history(entries: &[HistoryEntry], config: &EngineConfig) {
    if entries.is_empty() {
        println!("Aucune prédiction enregistrée.");
        return;
    }

    println!("\n🗂️  Historique des prédictions\n");
    let mut table = new_table(vec!["Tirage", "Méthode", "Grille", "Tirage réel", "Avant", "Arrière", "Rang"]);
    for e in entries {
        let c = &e.prediction;
        let actual = e.actual.map(|a| a.to_string()).unwrap_or_else(|| "-".to_string());
        let row = match c.verification {
            Some(v) => vec![
                Cell::new(&c.target_issue),
                Cell::new(config.label(c.method)),
                Cell::new(c.numbers.to_string()),
                Cell::new(actual),
                Cell::new(v.front_hits),
                Cell::new(v.back_hits),
                Cell::new(v.tier.label()).fg(tier_color(v.tier)),
            ],
            None => vec![
                Cell::new(&c.target_issue),
                Cell::new(config.label(c.method)),
                Cell::new(c.numbers.to_string()),
                Cell::new(actual),
                Cell::new("-"),
                Cell::new("-"),
                Cell::new("en attente"),
            ],
        };
        table.add_row(row);
    }
    println!("{table}");
}
