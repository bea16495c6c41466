use anyhow::{bail, Context, Result};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

use crate::models::{Combination, Draw, Method, MethodWeight, PredictionCandidate, PrizeTier, Verification};
use crate::repository::{DrawRepository, PredictionStore, WeightStore};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS draws (
    issue     TEXT PRIMARY KEY,
    date      TEXT NOT NULL,
    front_1   INTEGER NOT NULL,
    front_2   INTEGER NOT NULL,
    front_3   INTEGER NOT NULL,
    front_4   INTEGER NOT NULL,
    front_5   INTEGER NOT NULL,
    back_1    INTEGER NOT NULL,
    back_2    INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS predictions (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    target_issue  TEXT NOT NULL,
    method        TEXT NOT NULL,
    front_1       INTEGER NOT NULL,
    front_2       INTEGER NOT NULL,
    front_3       INTEGER NOT NULL,
    front_4       INTEGER NOT NULL,
    front_5       INTEGER NOT NULL,
    back_1        INTEGER NOT NULL,
    back_2        INTEGER NOT NULL,
    score         REAL,
    verified      INTEGER NOT NULL DEFAULT 0,
    front_hits    INTEGER,
    back_hits     INTEGER,
    prize_tier    TEXT,
    created_at    TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_predictions_issue ON predictions (target_issue, verified);

CREATE TABLE IF NOT EXISTS method_weights (
    method             TEXT PRIMARY KEY,
    weight             REAL NOT NULL,
    hit_rate           REAL NOT NULL DEFAULT 0.0,
    total_predictions  INTEGER NOT NULL DEFAULT 0,
    total_hits         INTEGER NOT NULL DEFAULT 0,
    updated_at         TEXT NOT NULL DEFAULT (datetime('now'))
);
";

const DRAW_COLUMNS: &str = "issue, date, front_1, front_2, front_3, front_4, front_5, back_1, back_2";

const PREDICTION_COLUMNS: &str = "id, target_issue, method, front_1, front_2, front_3, front_4, front_5, back_1, back_2,
     score, verified, front_hits, back_hits, prize_tier";

pub fn db_path() -> std::path::PathBuf {
    let mut path = std::env::current_dir().unwrap_or_default();
    path.push("data");
    path.push("superlotto.db");
    path
}

pub fn open_db(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Impossible de créer le répertoire {:?}", parent))?;
    }
    let conn = Connection::open(path)
        .with_context(|| format!("Impossible d'ouvrir la base {:?}", path))?;
    Ok(conn)
}

pub fn migrate(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)
        .context("Échec de la migration")?;
    Ok(())
}

pub fn insert_draw(conn: &Connection, draw: &Draw) -> Result<bool> {
    let f = draw.numbers().front();
    let b = draw.numbers().back();
    let changed = conn.execute(
        &format!("INSERT OR IGNORE INTO draws ({DRAW_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"),
        params![draw.issue(), draw.date(), f[0], f[1], f[2], f[3], f[4], b[0], b[1]],
    ).context("Échec de l'insertion du tirage")?;
    Ok(changed > 0)
}

pub fn count_draws(conn: &Connection) -> Result<u32> {
    let count: u32 = conn.query_row("SELECT COUNT(*) FROM draws", [], |row| row.get(0))?;
    Ok(count)
}

type RawDraw = (String, String, [u8; 5], [u8; 2]);

fn read_draw(row: &Row) -> rusqlite::Result<RawDraw> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        [
            row.get::<_, u8>(2)?,
            row.get::<_, u8>(3)?,
            row.get::<_, u8>(4)?,
            row.get::<_, u8>(5)?,
            row.get::<_, u8>(6)?,
        ],
        [row.get::<_, u8>(7)?, row.get::<_, u8>(8)?],
    ))
}

fn into_draw((issue, date, front, back): RawDraw) -> Result<Draw> {
    let numbers = Combination::new(front, back)
        .with_context(|| format!("Tirage {} corrompu en base", issue))?;
    Ok(Draw::new(issue, date, numbers))
}

struct RawPrediction {
    id: i64,
    target_issue: String,
    method: String,
    front: [u8; 5],
    back: [u8; 2],
    score: Option<f64>,
    verified: bool,
    front_hits: Option<u8>,
    back_hits: Option<u8>,
    prize_tier: Option<String>,
}

fn read_prediction(row: &Row) -> rusqlite::Result<RawPrediction> {
    Ok(RawPrediction {
        id: row.get(0)?,
        target_issue: row.get(1)?,
        method: row.get(2)?,
        front: [
            row.get::<_, u8>(3)?,
            row.get::<_, u8>(4)?,
            row.get::<_, u8>(5)?,
            row.get::<_, u8>(6)?,
            row.get::<_, u8>(7)?,
        ],
        back: [row.get::<_, u8>(8)?, row.get::<_, u8>(9)?],
        score: row.get(10)?,
        verified: row.get(11)?,
        front_hits: row.get(12)?,
        back_hits: row.get(13)?,
        prize_tier: row.get(14)?,
    })
}

fn into_candidate(raw: RawPrediction) -> Result<PredictionCandidate> {
    let method = match Method::from_code(&raw.method) {
        Some(m) => m,
        None => bail!("Prédiction {} : méthode inconnue '{}'", raw.id, raw.method),
    };
    let numbers = Combination::new(raw.front, raw.back)
        .with_context(|| format!("Prédiction {} corrompue en base", raw.id))?;
    let verification = if raw.verified {
        let code = raw.prize_tier.unwrap_or_default();
        let tier = match PrizeTier::from_code(&code) {
            Some(t) => t,
            None => bail!("Prédiction {} : rang inconnu '{}'", raw.id, code),
        };
        Some(Verification {
            front_hits: raw.front_hits.unwrap_or(0),
            back_hits: raw.back_hits.unwrap_or(0),
            tier,
        })
    } else {
        None
    };
    Ok(PredictionCandidate {
        id: Some(raw.id),
        target_issue: raw.target_issue,
        method,
        numbers,
        score: raw.score,
        verification,
    })
}

fn update_verification(conn: &Connection, candidate: &PredictionCandidate) -> Result<()> {
    let Some(id) = candidate.id else {
        bail!("Prédiction sans identifiant : impossible de la marquer vérifiée");
    };
    let Some(v) = &candidate.verification else {
        bail!("Prédiction {} sans résultat de vérification", id);
    };
    let changed = conn.execute(
        "UPDATE predictions SET verified = 1, front_hits = ?1, back_hits = ?2, prize_tier = ?3 WHERE id = ?4",
        params![v.front_hits, v.back_hits, v.tier.code(), id],
    )?;
    if changed == 0 {
        bail!("Prédiction {} introuvable", id);
    }
    Ok(())
}

/// Stockage SQLite de l'historique, des prédictions et des poids.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn new(conn: Connection) -> Result<Self> {
        migrate(&conn)?;
        Ok(Self { conn })
    }

    pub fn open(path: &Path) -> Result<Self> {
        Self::new(open_db(path)?)
    }

    pub fn in_memory() -> Result<Self> {
        Self::new(Connection::open_in_memory()?)
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    pub fn insert_draw(&self, draw: &Draw) -> Result<bool> {
        insert_draw(&self.conn, draw)
    }

    pub fn count_draws(&self) -> Result<u32> {
        count_draws(&self.conn)
    }

    fn query_draws(&self, sql: &str, limit: Option<usize>) -> Result<Vec<Draw>> {
        let mut stmt = self.conn.prepare(sql)?;
        let raws = match limit {
            Some(limit) => stmt.query_map([limit as i64], read_draw)?.collect::<Result<Vec<_>, _>>()?,
            None => stmt.query_map([], read_draw)?.collect::<Result<Vec<_>, _>>()?,
        };
        raws.into_iter().map(into_draw).collect()
    }

    fn query_predictions(&self, sql: &str, param: Option<&str>) -> Result<Vec<PredictionCandidate>> {
        let mut stmt = self.conn.prepare(sql)?;
        let raws = match param {
            Some(p) => stmt.query_map([p], read_prediction)?.collect::<Result<Vec<_>, _>>()?,
            None => stmt.query_map([], read_prediction)?.collect::<Result<Vec<_>, _>>()?,
        };
        raws.into_iter().map(into_candidate).collect()
    }
}

impl DrawRepository for SqliteStore {
    fn fetch_recent_draws(&self, limit: usize) -> Result<Vec<Draw>> {
        self.query_draws(
            &format!("SELECT {DRAW_COLUMNS} FROM draws ORDER BY CAST(issue AS INTEGER) DESC LIMIT ?1"),
            Some(limit),
        )
    }

    fn fetch_draw_by_issue(&self, issue: &str) -> Result<Option<Draw>> {
        let raw = self
            .conn
            .query_row(
                &format!("SELECT {DRAW_COLUMNS} FROM draws WHERE issue = ?1"),
                [issue],
                read_draw,
            )
            .optional()?;
        raw.map(into_draw).transpose()
    }

    fn fetch_all_draws(&self) -> Result<Vec<Draw>> {
        self.query_draws(&format!("SELECT {DRAW_COLUMNS} FROM draws"), None)
    }
}

impl WeightStore for SqliteStore {
    fn load_method_weights(&self) -> Result<Vec<MethodWeight>> {
        let mut stmt = self.conn.prepare(
            "SELECT method, weight, hit_rate, total_predictions, total_hits FROM method_weights ORDER BY method",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, f64>(1)?,
                    row.get::<_, f64>(2)?,
                    row.get::<_, u32>(3)?,
                    row.get::<_, u32>(4)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut weights = Vec::with_capacity(rows.len());
        for (code, weight, hit_rate, total_predictions, total_hits) in rows {
            let method = match Method::from_code(&code) {
                Some(m) => m,
                None => bail!("Poids enregistré pour une méthode inconnue : '{}'", code),
            };
            weights.push(MethodWeight {
                method,
                weight,
                hit_rate,
                total_predictions,
                total_hits,
            });
        }
        Ok(weights)
    }

    fn save_method_weights(&self, rows: &[MethodWeight]) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        for w in rows {
            tx.execute(
                "INSERT INTO method_weights (method, weight, hit_rate, total_predictions, total_hits, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, datetime('now'))
                 ON CONFLICT(method) DO UPDATE SET
                    weight = excluded.weight,
                    hit_rate = excluded.hit_rate,
                    total_predictions = excluded.total_predictions,
                    total_hits = excluded.total_hits,
                    updated_at = excluded.updated_at",
                params![w.method.code(), w.weight, w.hit_rate, w.total_predictions, w.total_hits],
            ).with_context(|| format!("Échec de l'écriture du poids {}", w.method))?;
        }
        tx.commit().context("Échec du commit des poids")?;
        Ok(())
    }
}

impl PredictionStore for SqliteStore {
    fn load_unverified_predictions(&self, issue: &str) -> Result<Vec<PredictionCandidate>> {
        self.query_predictions(
            &format!("SELECT {PREDICTION_COLUMNS} FROM predictions WHERE target_issue = ?1 AND verified = 0 ORDER BY id"),
            Some(issue),
        )
    }

    fn save_prediction(&self, candidate: &PredictionCandidate) -> Result<i64> {
        let f = candidate.numbers.front();
        let b = candidate.numbers.back();
        let (verified, front_hits, back_hits, tier) = match &candidate.verification {
            Some(v) => (true, Some(v.front_hits), Some(v.back_hits), Some(v.tier.code())),
            None => (false, None, None, None),
        };
        self.conn.execute(
            "INSERT INTO predictions (target_issue, method, front_1, front_2, front_3, front_4, front_5, back_1, back_2,
                                      score, verified, front_hits, back_hits, prize_tier)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            params![
                candidate.target_issue,
                candidate.method.code(),
                f[0], f[1], f[2], f[3], f[4],
                b[0], b[1],
                candidate.score,
                verified,
                front_hits,
                back_hits,
                tier,
            ],
        ).context("Échec de l'enregistrement de la prédiction")?;
        Ok(self.conn.last_insert_rowid())
    }

    fn mark_verified(&self, candidate: &PredictionCandidate) -> Result<()> {
        update_verification(&self.conn, candidate)
    }

    fn mark_verified_all(&self, candidates: &[PredictionCandidate]) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        for candidate in candidates {
            update_verification(&tx, candidate)?;
        }
        tx.commit().context("Échec du commit des vérifications")?;
        Ok(())
    }

    fn load_predictions_by_issue(&self, issue: &str) -> Result<Vec<PredictionCandidate>> {
        self.query_predictions(
            &format!("SELECT {PREDICTION_COLUMNS} FROM predictions WHERE target_issue = ?1 ORDER BY id"),
            Some(issue),
        )
    }

    fn load_recent_predictions(&self, limit: usize) -> Result<Vec<PredictionCandidate>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {PREDICTION_COLUMNS} FROM predictions ORDER BY id DESC LIMIT ?1"))?;
        let raws = stmt
            .query_map([limit as i64], read_prediction)?
            .collect::<Result<Vec<_>, _>>()?;
        raws.into_iter().map(into_candidate).collect()
    }

    fn load_verified_predictions(&self, method: Option<Method>) -> Result<Vec<PredictionCandidate>> {
        match method {
            Some(m) => self.query_predictions(
                &format!("SELECT {PREDICTION_COLUMNS} FROM predictions WHERE verified = 1 AND method = ?1 ORDER BY id"),
                Some(m.code()),
            ),
            None => self.query_predictions(
                &format!("SELECT {PREDICTION_COLUMNS} FROM predictions WHERE verified = 1 ORDER BY id"),
                None,
            ),
        }
    }

    fn unverified_issues(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT target_issue FROM predictions WHERE verified = 0 ORDER BY CAST(target_issue AS INTEGER)",
        )?;
        let issues = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(issues)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_draw(issue: &str, front: [u8; 5], back: [u8; 2]) -> Draw {
        Draw::new(issue, "2026-01-01", Combination::new(front, back).unwrap())
    }

    #[test]
    fn test_insert_and_count() {
        let store = SqliteStore::in_memory().unwrap();
        assert_eq!(store.count_draws().unwrap(), 0);

        assert!(store.insert_draw(&test_draw("26001", [1, 2, 3, 4, 5], [1, 2])).unwrap());
        assert_eq!(store.count_draws().unwrap(), 1);
    }

    #[test]
    fn test_insert_duplicate_ignored() {
        let store = SqliteStore::in_memory().unwrap();
        let draw = test_draw("26001", [1, 2, 3, 4, 5], [1, 2]);
        assert!(store.insert_draw(&draw).unwrap());
        assert!(!store.insert_draw(&draw).unwrap());
        assert_eq!(store.count_draws().unwrap(), 1);
    }

    #[test]
    fn test_migrate_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        migrate(&conn).unwrap();
    }

    #[test]
    fn test_fetch_recent_numeric_order() {
        let store = SqliteStore::in_memory().unwrap();
        store.insert_draw(&test_draw("9999", [1, 2, 3, 4, 5], [1, 2])).unwrap();
        store.insert_draw(&test_draw("10001", [6, 7, 8, 9, 10], [3, 4])).unwrap();
        store.insert_draw(&test_draw("10000", [11, 12, 13, 14, 15], [5, 6])).unwrap();

        let draws = store.fetch_recent_draws(2).unwrap();
        assert_eq!(draws.len(), 2);
        assert_eq!(draws[0].issue(), "10001");
        assert_eq!(draws[1].issue(), "10000");
        assert_eq!(draws[0].stats().front_sum, 40);
    }

    #[test]
    fn test_fetch_draw_by_issue() {
        let store = SqliteStore::in_memory().unwrap();
        store.insert_draw(&test_draw("26001", [3, 9, 17, 25, 33], [2, 11])).unwrap();

        let found = store.fetch_draw_by_issue("26001").unwrap().unwrap();
        assert_eq!(found.numbers().front(), &[3, 9, 17, 25, 33]);
        assert!(store.fetch_draw_by_issue("26002").unwrap().is_none());
        assert_eq!(store.fetch_all_draws().unwrap().len(), 1);
    }

    #[test]
    fn test_prediction_lifecycle() {
        let store = SqliteStore::in_memory().unwrap();
        let numbers = Combination::new([1, 2, 3, 4, 5], [1, 2]).unwrap();
        let mut candidate = PredictionCandidate::new("26002", Method::Markov, numbers);
        candidate.score = Some(0.5);

        let id = store.save_prediction(&candidate).unwrap();
        assert_eq!(store.unverified_issues().unwrap(), vec!["26002".to_string()]);

        let mut pending = store.load_unverified_predictions("26002").unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, Some(id));
        assert_eq!(pending[0].method, Method::Markov);
        assert_eq!(pending[0].score, Some(0.5));

        pending[0].verification = Some(Verification {
            front_hits: 5,
            back_hits: 2,
            tier: PrizeTier::Tier1,
        });
        store.mark_verified(&pending[0]).unwrap();

        assert!(store.load_unverified_predictions("26002").unwrap().is_empty());
        let verified = store.load_verified_predictions(Some(Method::Markov)).unwrap();
        assert_eq!(verified.len(), 1);
        assert_eq!(verified[0].verification.unwrap().tier, PrizeTier::Tier1);
        assert!(store.load_verified_predictions(Some(Method::Hot)).unwrap().is_empty());
        assert!(store.unverified_issues().unwrap().is_empty());
    }

    #[test]
    fn test_mark_verified_requires_id() {
        let store = SqliteStore::in_memory().unwrap();
        let numbers = Combination::new([1, 2, 3, 4, 5], [1, 2]).unwrap();
        let mut candidate = PredictionCandidate::new("26002", Method::Hot, numbers);
        candidate.verification = Some(Verification {
            front_hits: 0,
            back_hits: 0,
            tier: PrizeTier::NoPrize,
        });
        assert!(store.mark_verified(&candidate).is_err());
    }

    #[test]
    fn test_mark_verified_all_is_atomic() {
        let store = SqliteStore::in_memory().unwrap();
        let numbers = Combination::new([1, 2, 3, 4, 5], [1, 2]).unwrap();
        store.save_prediction(&PredictionCandidate::new("26002", Method::Hot, numbers)).unwrap();
        store.save_prediction(&PredictionCandidate::new("26002", Method::Ml, numbers)).unwrap();

        let mut pending = store.load_unverified_predictions("26002").unwrap();
        for c in pending.iter_mut() {
            c.verification = Some(Verification { front_hits: 1, back_hits: 0, tier: PrizeTier::NoPrize });
        }
        pending[1].id = Some(999);

        assert!(store.mark_verified_all(&pending).is_err());
        assert_eq!(store.load_unverified_predictions("26002").unwrap().len(), 2, "aucune ligne marquée");

        pending[1].id = Some(2);
        store.mark_verified_all(&pending).unwrap();
        assert!(store.load_unverified_predictions("26002").unwrap().is_empty());
        assert_eq!(store.load_verified_predictions(None).unwrap().len(), 2);
    }

    #[test]
    fn test_prediction_listings() {
        let store = SqliteStore::in_memory().unwrap();
        let numbers = Combination::new([1, 2, 3, 4, 5], [1, 2]).unwrap();
        store.save_prediction(&PredictionCandidate::new("26002", Method::Hot, numbers)).unwrap();
        store.save_prediction(&PredictionCandidate::new("26003", Method::Ml, numbers)).unwrap();
        store.save_prediction(&PredictionCandidate::new("26002", Method::Markov, numbers)).unwrap();

        let by_issue = store.load_predictions_by_issue("26002").unwrap();
        assert_eq!(by_issue.iter().map(|c| c.method).collect::<Vec<_>>(), vec![Method::Hot, Method::Markov]);

        let recent = store.load_recent_predictions(2).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].method, Method::Markov);
        assert_eq!(recent[1].method, Method::Ml);
    }

    #[test]
    fn test_weights_upsert() {
        let store = SqliteStore::in_memory().unwrap();
        assert!(store.load_method_weights().unwrap().is_empty());

        let rows = vec![MethodWeight::new(Method::Hot, 0.5), MethodWeight::new(Method::Markov, 0.5)];
        store.save_method_weights(&rows).unwrap();

        let mut updated = rows.clone();
        updated[0].weight = 0.7;
        updated[0].total_predictions = 3;
        updated[0].total_hits = 1;
        store.save_method_weights(&updated[..1]).unwrap();

        let loaded = store.load_method_weights().unwrap();
        assert_eq!(loaded.len(), 2);
        let hot = loaded.iter().find(|w| w.method == Method::Hot).unwrap();
        assert!((hot.weight - 0.7).abs() < 1e-12);
        assert_eq!(hot.total_predictions, 3);
        assert_eq!(hot.total_hits, 1);
    }
}
