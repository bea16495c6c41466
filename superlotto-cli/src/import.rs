use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use std::path::Path;

use superlotto_db::db::{SqliteStore, insert_draw};
use superlotto_db::models::{Combination, Draw};

/// Accepte `AAAA-MM-JJ` ou `JJ/MM/AAAA`, renvoie toujours `AAAA-MM-JJ`.
pub fn parse_date(raw: &str) -> Result<String> {
    let raw = raw.trim();
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%d/%m/%Y"))
        .with_context(|| format!("Format de date invalide: '{}'", raw))?;
    Ok(date.format("%Y-%m-%d").to_string())
}

/// Numéros séparés par des espaces, des virgules ou des tirets.
pub fn parse_numbers(raw: &str) -> Result<Vec<u8>> {
    raw.split(|c: char| c.is_whitespace() || c == ',' || c == '-' || c == '+')
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<u8>()
                .with_context(|| format!("Numéro invalide: '{}'", s))
        })
        .collect()
}

/// Ligne : `issue;date;avant1;…;avant5;arrière1;arrière2`.
fn parse_record(record: &csv::StringRecord) -> Result<Draw> {
    let get = |idx: usize| -> Result<String> {
        record
            .get(idx)
            .map(|s| s.trim().to_string())
            .with_context(|| format!("Champ manquant à l'index {}", idx))
    };

    let get_u8 = |idx: usize| -> Result<u8> {
        let s = get(idx)?;
        s.parse::<u8>()
            .with_context(|| format!("Impossible de parser '{}' (index {})", s, idx))
    };

    let issue = get(0)?;
    if issue.is_empty() || !issue.chars().all(|c| c.is_ascii_digit()) {
        bail!("Numéro de tirage invalide: '{}'", issue);
    }
    let date = parse_date(&get(1)?)?;

    let front = [get_u8(2)?, get_u8(3)?, get_u8(4)?, get_u8(5)?, get_u8(6)?];
    let back = [get_u8(7)?, get_u8(8)?];
    let numbers = Combination::new(front, back)
        .with_context(|| format!("Tirage {} : numéros invalides", issue))?;

    Ok(Draw::new(issue, date, numbers))
}

pub struct ImportResult {
    pub total_records: u32,
    pub inserted: u32,
    pub skipped: u32,
    pub errors: u32,
}

pub fn import_csv(store: &SqliteStore, path: &Path) -> Result<ImportResult> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b';')
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Impossible d'ouvrir {:?}", path))?;

    let tx = store.conn().unchecked_transaction()
        .context("Impossible de démarrer la transaction")?;

    let mut result = ImportResult {
        total_records: 0,
        inserted: 0,
        skipped: 0,
        errors: 0,
    };

    for record_result in reader.records() {
        result.total_records += 1;
        let draw = match record_result {
            Ok(record) => parse_record(&record),
            Err(e) => {
                log::warn!("Erreur lecture ligne {}: {}", result.total_records, e);
                result.errors += 1;
                continue;
            }
        };
        match draw {
            Ok(draw) => match insert_draw(&tx, &draw) {
                Ok(true) => result.inserted += 1,
                Ok(false) => result.skipped += 1,
                Err(e) => {
                    log::warn!("Erreur insertion tirage {}: {:#}", draw.issue(), e);
                    result.errors += 1;
                }
            },
            Err(e) => {
                log::warn!("Erreur parsing ligne {}: {:#}", result.total_records, e);
                result.errors += 1;
            }
        }
    }

    tx.commit().context("Échec du commit")?;
    log::info!(
        "Import de {:?} : {} insérés, {} doublons, {} erreurs",
        path,
        result.inserted,
        result.skipped,
        result.errors
    );
    Ok(result)
}
