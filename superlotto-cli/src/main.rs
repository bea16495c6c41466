mod display;
mod import;

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};

use superlotto_db::db::{SqliteStore, db_path};
use superlotto_db::models::{Combination, Draw, Method, Zone};
use superlotto_db::repository::DrawRepository;
use superlotto_engine::Engine;
use superlotto_engine::backtest::DEFAULT_METHODS;
use superlotto_engine::config::{EngineConfig, load_config, save_config};
use superlotto_engine::error::parse_method;
use superlotto_engine::sampler::date_seed;
use superlotto_engine::verify::{HistoryFilter, SortKey};

use crate::display::{
    display_accuracy, display_backtest, display_distributions, display_draws, display_frequency,
    display_history, display_import_summary, display_number_trend, display_predictions,
    display_rules, display_sum_trend, display_trend, display_verification, display_weights,
};
use crate::import::{parse_date, parse_numbers};

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum ZoneArg {
    #[default]
    Front,
    Back,
}

impl From<ZoneArg> for Zone {
    fn from(arg: ZoneArg) -> Self {
        match arg {
            ZoneArg::Front => Zone::Front,
            ZoneArg::Back => Zone::Back,
        }
    }
}

#[derive(Parser)]
#[command(name = "superlotto", about = "Analyse et prédiction du Super Lotto, avec apprentissage des poids")]
struct Cli {
    /// Fichier de configuration JSON (valeurs par défaut si absent)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Importer les tirages depuis un fichier CSV (issue;date;5 avant;2 arrière)
    Import {
        /// Chemin vers le fichier CSV
        #[arg(short, long, default_value = "assets/superlotto.csv")]
        file: PathBuf,
    },

    /// Afficher le chemin de la base de données
    DbPath,

    /// Écrire la configuration par défaut
    InitConfig {
        #[arg(short, long, default_value = "superlotto.json")]
        output: PathBuf,
    },

    /// Lister les derniers tirages
    List {
        /// Nombre de tirages à afficher
        #[arg(short, long, default_value = "10")]
        last: usize,
    },

    /// Ajouter un tirage manuellement
    Add,

    /// Statistiques : fréquences, retards et répartitions
    Stats {
        /// Fenêtre d'analyse (nombre de tirages)
        #[arg(short, long, default_value = "100")]
        window: usize,
    },

    /// Règles d'association entre numéros
    Associations {
        #[arg(short, long, default_value = "front")]
        zone: ZoneArg,

        /// Règles d'un tirage au suivant
        #[arg(long)]
        sequential: bool,

        /// Numéros les plus liés à ce numéro
        #[arg(short, long)]
        number: Option<u8>,

        /// Nombre de règles à conserver
        #[arg(short, long, default_value = "20")]
        top: usize,

        /// Réseau d'associations au format JSON
        #[arg(long)]
        json: bool,
    },

    /// Lister les méthodes de prédiction
    Methods,

    /// Générer et enregistrer des grilles pour le prochain tirage
    Predict {
        /// Code de méthode (défaut : les cinq méthodes en ligne)
        #[arg(short, long)]
        method: Option<String>,

        /// Nombre de grilles par méthode
        #[arg(short, long, default_value = "5")]
        count: usize,

        /// Tirage visé (défaut : dernier tirage + 1)
        #[arg(short, long)]
        issue: Option<String>,

        /// Seed pour la reproductibilité (défaut: date du jour YYYYMMDD)
        #[arg(long)]
        seed: Option<u64>,

        /// Une seule grille par méthode, la mieux notée parmi `candidates`
        #[arg(long)]
        best: bool,

        #[arg(long, default_value = "10")]
        candidates: usize,
    },

    /// Vérifier les prédictions d'un tirage (défaut : tous les tirages en attente)
    Verify {
        issue: Option<String>,
    },

    /// Historique des prédictions enregistrées (défaut : les plus récentes)
    History {
        /// Toutes les grilles d'un tirage
        #[arg(short, long, conflicts_with = "method")]
        issue: Option<String>,

        /// Grilles vérifiées d'une méthode
        #[arg(short, long)]
        method: Option<String>,

        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Classement des méthodes par précision
    Accuracy {
        /// composite, hit, prize ou high
        #[arg(short, long, default_value = "composite")]
        sort: String,

        /// Tri croissant
        #[arg(long)]
        asc: bool,
    },

    /// Évolution des derniers tirages, du plus ancien au plus récent
    Trend {
        /// Nombre de tirages (défaut : configuration)
        #[arg(short, long)]
        last: Option<usize>,

        #[arg(short, long, value_enum, default_value_t)]
        zone: ZoneArg,

        /// Suivre la présence d'un numéro
        #[arg(short, long)]
        number: Option<u8>,
    },

    /// Afficher ou réinitialiser les poids appris
    Weights {
        #[arg(long)]
        reset: bool,
    },

    /// Rejouer des méthodes sur les tirages passés
    Backtest {
        /// Codes de méthodes (répétable ; défaut : huit méthodes)
        #[arg(short, long)]
        method: Vec<String>,

        /// Nombre de tirages rejoués
        #[arg(short, long, default_value = "50")]
        issues: usize,

        /// Grilles par tirage
        #[arg(short, long, default_value = "5")]
        per_issue: usize,

        #[arg(long)]
        seed: Option<u64>,

        /// Résultats au format JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    if let Command::InitConfig { output } = &cli.command {
        save_config(&EngineConfig::default(), output)?;
        println!("Configuration par défaut écrite dans {}", output.display());
        return Ok(());
    }

    let config = resolve_config(cli.config.as_deref())?;
    let path = db_path();
    let store = SqliteStore::open(&path)?;
    let engine = Engine::new(&store, config)?;

    match cli.command {
        Command::Import { file } => cmd_import(&store, &file),
        Command::DbPath => {
            println!("{}", path.display());
            Ok(())
        }
        Command::InitConfig { .. } => Ok(()),
        Command::List { last } => cmd_list(&store, last),
        Command::Add => cmd_add(&store),
        Command::Stats { window } => cmd_stats(&store, &engine, window),
        Command::Associations { zone, sequential, number, top, json } => {
            cmd_associations(&store, &engine, zone.into(), sequential, number, top, json)
        }
        Command::Methods => cmd_methods(engine.config()),
        Command::Predict { method, count, issue, seed, best, candidates } => {
            cmd_predict(&engine, method.as_deref(), count, issue.as_deref(), seed, best, candidates)
        }
        Command::Verify { issue } => cmd_verify(&engine, issue.as_deref()),
        Command::History { issue, method, limit } => {
            cmd_history(&engine, issue, method.as_deref(), limit)
        }
        Command::Trend { last, zone, number } => cmd_trend(&store, &engine, last, zone.into(), number),
        Command::Accuracy { sort, asc } => cmd_accuracy(&engine, &sort, asc),
        Command::Weights { reset } => cmd_weights(&engine, reset),
        Command::Backtest { method, issues, per_issue, seed, json } => {
            cmd_backtest(&store, &engine, &method, issues, per_issue, seed, json)
        }
    }
}

fn resolve_config(path: Option<&Path>) -> Result<EngineConfig> {
    match path {
        Some(p) if p.exists() => load_config(p),
        Some(p) => {
            log::warn!("Configuration {:?} introuvable, valeurs par défaut", p);
            Ok(EngineConfig::default())
        }
        None => Ok(EngineConfig::default()),
    }
}

fn ensure_history(store: &SqliteStore) -> Result<bool> {
    if store.count_draws()? == 0 {
        println!("Base vide. Lancez d'abord : superlotto import");
        return Ok(false);
    }
    Ok(true)
}

fn cmd_import(store: &SqliteStore, file: &Path) -> Result<()> {
    let result = import::import_csv(store, file)?;
    display_import_summary(&result);
    Ok(())
}

fn cmd_list(store: &SqliteStore, last: usize) -> Result<()> {
    if !ensure_history(store)? {
        return Ok(());
    }
    let draws = store.fetch_recent_draws(last)?;
    display_draws(&draws);
    Ok(())
}

fn cmd_stats(store: &SqliteStore, engine: &Engine<'_, SqliteStore>, window: usize) -> Result<()> {
    if !ensure_history(store)? {
        return Ok(());
    }
    let history = engine.history()?;
    let effective_window = window.min(history.len());

    println!("\n📊 Statistiques sur les {} derniers tirages", effective_window);
    for zone in Zone::ALL {
        let freqs = engine.frequency_table(zone, Some(effective_window))?;
        let gaps = engine.missing_table(zone)?;
        display_frequency(zone, &freqs, &gaps, effective_window);
    }
    display_distributions(&history[..effective_window]);
    Ok(())
}

fn cmd_associations(
    store: &SqliteStore,
    engine: &Engine<'_, SqliteStore>,
    zone: Zone,
    sequential: bool,
    number: Option<u8>,
    top: usize,
    json: bool,
) -> Result<()> {
    if !ensure_history(store)? {
        return Ok(());
    }

    if let Some(n) = number {
        if !zone.numbers().contains(&n) {
            bail!("{} hors de la {} (1-{})", n, zone.label().to_lowercase(), zone.size());
        }
        let related = engine.related_numbers(zone, n, top)?;
        if related.is_empty() {
            println!("Aucun numéro lié à {:02}.", n);
        } else {
            let list = related.iter().map(|r| format!("{:02}", r)).collect::<Vec<_>>().join(", ");
            println!("Numéros liés à {:02} : {}", n, list);
        }
        return Ok(());
    }

    if json {
        let network = engine.association_network(zone, top)?;
        println!("{}", serde_json::to_string_pretty(&network)?);
        return Ok(());
    }

    let mut rules = engine.association_rules(zone, sequential)?;
    rules.truncate(top);
    display_rules(zone, &rules);
    Ok(())
}

fn cmd_methods(config: &EngineConfig) -> Result<()> {
    for m in Method::ALL {
        println!("{:<15} {:<22} {}", m.code(), config.label(m), m.description());
    }
    Ok(())
}

fn cmd_predict(
    engine: &Engine<'_, SqliteStore>,
    method: Option<&str>,
    count: usize,
    issue: Option<&str>,
    seed: Option<u64>,
    best: bool,
    candidates: usize,
) -> Result<()> {
    let seed = seed.unwrap_or_else(date_seed);

    let saved = if best {
        if method.is_some() {
            log::warn!("--best utilise les méthodes en ligne, --method ignoré");
        }
        engine.generate_best(candidates, issue, seed)?
    } else {
        let method = method.map(parse_method).transpose()?;
        engine.generate(method, count, issue, seed)?
    };

    display_predictions(&saved, engine.config());
    println!("Seed : {}", seed);
    Ok(())
}

fn cmd_verify(engine: &Engine<'_, SqliteStore>, issue: Option<&str>) -> Result<()> {
    let reports = match issue {
        Some(issue) => vec![engine.verify(issue)?],
        None => engine.verify_pending()?,
    };
    if reports.is_empty() {
        println!("Aucun tirage publié n'a de prédictions en attente.");
    }
    for report in &reports {
        display_verification(report, engine.config());
    }
    Ok(())
}

fn cmd_history(
    engine: &Engine<'_, SqliteStore>,
    issue: Option<String>,
    method: Option<&str>,
    limit: usize,
) -> Result<()> {
    let filter = match (issue, method) {
        (Some(issue), _) => HistoryFilter::Issue(issue),
        (None, Some(code)) => HistoryFilter::Method(parse_method(code)?),
        (None, None) => HistoryFilter::Recent,
    };
    display_history(&engine.prediction_history(&filter, limit)?, engine.config());
    Ok(())
}

fn cmd_trend(
    store: &SqliteStore,
    engine: &Engine<'_, SqliteStore>,
    last: Option<usize>,
    zone: Zone,
    number: Option<u8>,
) -> Result<()> {
    if !ensure_history(store)? {
        return Ok(());
    }
    if last == Some(0) {
        bail!("Le nombre de tirages doit être > 0");
    }

    if let Some(n) = number {
        if !zone.numbers().contains(&n) {
            bail!("{} hors de la {} (1-{})", n, zone.label().to_lowercase(), zone.size());
        }
        display_number_trend(zone, n, &engine.number_trend(zone, n, last)?);
        return Ok(());
    }

    display_trend(&engine.trend(last)?);
    display_sum_trend(zone, &engine.sum_trend(zone, last)?);
    Ok(())
}

fn cmd_accuracy(engine: &Engine<'_, SqliteStore>, sort: &str, asc: bool) -> Result<()> {
    let stats = engine.accuracy_rankings(SortKey::from_code(sort), asc)?;
    display_accuracy(&stats, engine.config());
    Ok(())
}

fn cmd_weights(engine: &Engine<'_, SqliteStore>, reset: bool) -> Result<()> {
    if reset {
        let confirm = prompt("Remettre tous les poids à zéro ? (o/n) : ")?;
        if confirm.to_lowercase() != "o" {
            println!("Réinitialisation annulée.");
            return Ok(());
        }
        engine.reset_weights()?;
        println!("Poids réinitialisés.");
    }
    display_weights(&engine.method_weight_rows()?, engine.config());
    Ok(())
}

fn cmd_backtest(
    store: &SqliteStore,
    engine: &Engine<'_, SqliteStore>,
    codes: &[String],
    issues: usize,
    per_issue: usize,
    seed: Option<u64>,
    json: bool,
) -> Result<()> {
    if !ensure_history(store)? {
        return Ok(());
    }
    let methods: Vec<Method> = if codes.is_empty() {
        DEFAULT_METHODS.to_vec()
    } else {
        codes.iter().map(|c| parse_method(c)).collect::<Result<_, _>>()?
    };
    let seed = seed.unwrap_or_else(date_seed);

    println!(
        "Backtest de {} méthodes sur {} tirages ({} grilles par tirage, seed {})...",
        methods.len(),
        issues,
        per_issue,
        seed
    );

    let pb = ProgressBar::new(methods.len() as u64);
    pb.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
        )
        .context("Gabarit de barre de progression invalide")?
        .progress_chars("=> "),
    );

    let results = engine.backtest(&methods, issues, per_issue, seed, |r| {
        pb.set_message(r.method.code());
        pb.inc(1);
    })?;
    pb.finish_and_clear();

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else {
        display_backtest(&results, engine.config());
    }
    Ok(())
}

fn cmd_add(store: &SqliteStore) -> Result<()> {
    println!("Ajout d'un tirage manuellement\n");

    let issue = prompt("Numéro du tirage (ex: 26014) : ")?;
    if issue.is_empty() || !issue.chars().all(|c| c.is_ascii_digit()) {
        bail!("Numéro de tirage invalide");
    }
    let date = parse_date(&prompt("Date (JJ/MM/AAAA ou AAAA-MM-JJ) : ")?)?;

    let front = prompt_zone(Zone::Front)?;
    let back = prompt_zone(Zone::Back)?;
    let numbers = Combination::from_slices(&front, &back)?;
    let draw = Draw::new(issue, date, numbers);

    println!("\nTirage à insérer :");
    display_draws(std::slice::from_ref(&draw));

    let confirm = prompt("\nConfirmer l'insertion ? (o/n) : ")?;
    if confirm.to_lowercase() == "o" {
        if store.insert_draw(&draw)? {
            println!("Tirage inséré avec succès.");
        } else {
            println!("Ce tirage existe déjà (doublon ignoré).");
        }
    } else {
        println!("Insertion annulée.");
    }

    Ok(())
}

fn prompt(msg: &str) -> Result<String> {
    print!("{}", msg);
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin()
        .read_line(&mut input)
        .context("Erreur de lecture")?;
    Ok(input.trim().to_string())
}

fn prompt_zone(zone: Zone) -> Result<Vec<u8>> {
    let msg = format!(
        "{} : {} numéros (séparés par des espaces, 1-{}) : ",
        zone.label(),
        zone.pick_count(),
        zone.size()
    );
    loop {
        match parse_numbers(&prompt(&msg)?) {
            Ok(v) if v.len() == zone.pick_count() => {
                let in_range = v.iter().all(|n| zone.numbers().contains(n));
                let distinct = v.iter().enumerate().all(|(i, n)| !v[..i].contains(n));
                if in_range && distinct {
                    return Ok(v);
                }
                println!("Numéros invalides (1-{}, pas de doublons). Réessayez.", zone.size());
            }
            _ => println!("Entrez exactement {} numéros. Réessayez.", zone.pick_count()),
        }
    }
}
