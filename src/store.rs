//! The tabular store behind the pipeline. Every pass reads a snapshot at
//! entry, appends whole rows, and rewrites single cells, so the store
//! doubles as the checkpoint that makes reruns resumable.

use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::{params, Connection};

// ── Row vocabulary ──

/// Reachability confirmation as stored in the `verified` cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verified {
    /// Blank cell, not yet checked.
    Pending,
    Yes,
    No,
}

impl Verified {
    pub fn as_cell(self) -> &'static str {
        match self {
            Verified::Pending => "",
            Verified::Yes => "YES",
            Verified::No => "NO",
        }
    }

    pub fn from_cell(cell: &str) -> Self {
        match cell {
            "YES" => Verified::Yes,
            "NO" => Verified::No,
            _ => Verified::Pending,
        }
    }
}

/// Where a row's URL came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    ModelGenerated,
    ModelCorrected,
    Scraped,
    ScrapedCorrected,
}

impl Source {
    pub fn as_cell(self) -> &'static str {
        match self {
            Source::ModelGenerated => "model-generated",
            Source::ModelCorrected => "model-corrected",
            Source::Scraped => "scraped",
            Source::ScrapedCorrected => "scraped+corrected",
        }
    }
}

/// Which collection an entity belongs to, and the noun prompts use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Accelerator,
    Startup,
}

impl EntityKind {
    pub fn noun(self) -> &'static str {
        match self {
            EntityKind::Accelerator => "accelerator",
            EntityKind::Startup => "startup",
        }
    }
}

#[derive(Debug, Clone)]
pub struct AcceleratorRow {
    pub website: String,
    pub name: String,
    pub country: String,
    pub verified: Verified,
    pub source: String,
}

#[derive(Debug, Clone)]
pub struct StartupRow {
    pub website: String,
    pub name: String,
    pub country: String,
    pub accelerator_website: String,
    pub value_proposition: String,
    pub verified: Verified,
    pub relationship_proof: String,
    pub value_source: String,
}

// ── Store trait ──

pub trait Store {
    fn accelerators(&self) -> Result<Vec<AcceleratorRow>>;
    fn startups(&self) -> Result<Vec<StartupRow>>;
    fn append_accelerator(&self, row: &AcceleratorRow) -> Result<()>;
    fn append_startup(&self, row: &StartupRow) -> Result<()>;
    fn set_accelerator_verified(&self, website: &str, verified: Verified) -> Result<()>;
    fn set_startup_verified(&self, website: &str, verified: Verified) -> Result<()>;
    fn set_value_proposition(&self, website: &str, proposition: &str, source: &str) -> Result<()>;
}

// ── SQLite implementation ──

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(path: &str) -> Result<Self> {
        if let Some(dir) = Path::new(path).parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir)
                    .with_context(|| format!("creating {}", dir.display()))?;
            }
        }
        let conn = Connection::open(path).with_context(|| format!("opening {path}"))?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        let store = Self {
            conn: Connection::open_in_memory()?,
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS accelerators (
                website    TEXT PRIMARY KEY,
                name       TEXT NOT NULL,
                country    TEXT NOT NULL DEFAULT '',
                verified   TEXT NOT NULL DEFAULT '' CHECK(verified IN ('YES','NO','')),
                source     TEXT NOT NULL DEFAULT '',
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            );
            CREATE UNIQUE INDEX IF NOT EXISTS idx_accelerators_name
                ON accelerators(name COLLATE NOCASE);

            CREATE TABLE IF NOT EXISTS startups (
                website             TEXT PRIMARY KEY,
                name                TEXT NOT NULL,
                country             TEXT NOT NULL DEFAULT '',
                accelerator_website TEXT NOT NULL DEFAULT '',
                value_proposition   TEXT NOT NULL DEFAULT '',
                verified            TEXT NOT NULL DEFAULT '' CHECK(verified IN ('YES','NO','')),
                relationship_proof  TEXT NOT NULL DEFAULT '',
                value_source        TEXT NOT NULL DEFAULT '',
                created_at          TEXT NOT NULL DEFAULT (datetime('now'))
            );
            CREATE UNIQUE INDEX IF NOT EXISTS idx_startups_name
                ON startups(name COLLATE NOCASE);
            CREATE INDEX IF NOT EXISTS idx_startups_accelerator
                ON startups(accelerator_website);
            ",
        )?;
        Ok(())
    }
}

impl Store for SqliteStore {
    fn accelerators(&self) -> Result<Vec<AcceleratorRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT website, name, country, verified, source
             FROM accelerators ORDER BY rowid",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(AcceleratorRow {
                    website: row.get(0)?,
                    name: row.get(1)?,
                    country: row.get(2)?,
                    verified: Verified::from_cell(&row.get::<_, String>(3)?),
                    source: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn startups(&self) -> Result<Vec<StartupRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT website, name, country, accelerator_website, value_proposition,
                    verified, relationship_proof, value_source
             FROM startups ORDER BY rowid",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(StartupRow {
                    website: row.get(0)?,
                    name: row.get(1)?,
                    country: row.get(2)?,
                    accelerator_website: row.get(3)?,
                    value_proposition: row.get(4)?,
                    verified: Verified::from_cell(&row.get::<_, String>(5)?),
                    relationship_proof: row.get(6)?,
                    value_source: row.get(7)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn append_accelerator(&self, row: &AcceleratorRow) -> Result<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO accelerators (website, name, country, verified, source)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                row.website,
                row.name,
                row.country,
                row.verified.as_cell(),
                row.source
            ],
        )?;
        Ok(())
    }

    fn append_startup(&self, row: &StartupRow) -> Result<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO startups
             (website, name, country, accelerator_website, value_proposition,
              verified, relationship_proof, value_source)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                row.website,
                row.name,
                row.country,
                row.accelerator_website,
                row.value_proposition,
                row.verified.as_cell(),
                row.relationship_proof,
                row.value_source
            ],
        )?;
        Ok(())
    }

    fn set_accelerator_verified(&self, website: &str, verified: Verified) -> Result<()> {
        self.conn.execute(
            "UPDATE accelerators SET verified = ?1 WHERE website = ?2",
            params![verified.as_cell(), website],
        )?;
        Ok(())
    }

    fn set_startup_verified(&self, website: &str, verified: Verified) -> Result<()> {
        self.conn.execute(
            "UPDATE startups SET verified = ?1 WHERE website = ?2",
            params![verified.as_cell(), website],
        )?;
        Ok(())
    }

    fn set_value_proposition(&self, website: &str, proposition: &str, source: &str) -> Result<()> {
        self.conn.execute(
            "UPDATE startups SET value_proposition = ?1, value_source = ?2 WHERE website = ?3",
            params![proposition, source, website],
        )?;
        Ok(())
    }
}

// ── Stats ──

pub struct StoreStats {
    pub accelerators: usize,
    pub accelerators_verified: usize,
    pub accelerators_pending: usize,
    pub startups: usize,
    pub startups_verified: usize,
    pub with_proposition: usize,
}

impl StoreStats {
    pub fn compute(accelerators: &[AcceleratorRow], startups: &[StartupRow]) -> Self {
        Self {
            accelerators: accelerators.len(),
            accelerators_verified: accelerators
                .iter()
                .filter(|r| r.verified == Verified::Yes)
                .count(),
            accelerators_pending: accelerators
                .iter()
                .filter(|r| r.verified == Verified::Pending)
                .count(),
            startups: startups.len(),
            startups_verified: startups
                .iter()
                .filter(|r| r.verified == Verified::Yes)
                .count(),
            with_proposition: startups
                .iter()
                .filter(|r| !r.value_proposition.trim().is_empty())
                .count(),
        }
    }

    pub fn print(&self) {
        println!("Accelerators:       {}", self.accelerators);
        println!("  verified:         {}", self.accelerators_verified);
        println!("  pending:          {}", self.accelerators_pending);
        println!("Startups:           {}", self.startups);
        println!("  verified:         {}", self.startups_verified);
        println!("  with proposition: {}", self.with_proposition);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn accelerator(website: &str, name: &str) -> AcceleratorRow {
        AcceleratorRow {
            website: website.to_string(),
            name: name.to_string(),
            country: "Germany".to_string(),
            verified: Verified::Yes,
            source: Source::ModelGenerated.as_cell().to_string(),
        }
    }

    fn startup(website: &str, name: &str) -> StartupRow {
        StartupRow {
            website: website.to_string(),
            name: name.to_string(),
            country: "France".to_string(),
            accelerator_website: "https://acc.com".to_string(),
            value_proposition: String::new(),
            verified: Verified::Pending,
            relationship_proof: "Listed on portfolio page".to_string(),
            value_source: String::new(),
        }
    }

    #[test]
    fn round_trips_rows() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .append_accelerator(&accelerator("https://acc.com", "Acc"))
            .unwrap();
        store.append_startup(&startup("https://s.com", "S")).unwrap();

        let accs = store.accelerators().unwrap();
        assert_eq!(accs.len(), 1);
        assert_eq!(accs[0].name, "Acc");
        assert_eq!(accs[0].verified, Verified::Yes);

        let startups = store.startups().unwrap();
        assert_eq!(startups[0].accelerator_website, "https://acc.com");
        assert_eq!(startups[0].verified, Verified::Pending);
    }

    #[test]
    fn duplicate_appends_are_ignored() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .append_accelerator(&accelerator("https://acc.com", "Acc"))
            .unwrap();
        store
            .append_accelerator(&accelerator("https://acc.com", "Other Name"))
            .unwrap();
        store
            .append_accelerator(&accelerator("https://other.com", "ACC"))
            .unwrap();
        // Same website, then same name under NOCASE: both ignored.
        assert_eq!(store.accelerators().unwrap().len(), 1);
    }

    #[test]
    fn cell_updates_stick() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.append_startup(&startup("https://s.com", "S")).unwrap();
        store
            .set_startup_verified("https://s.com", Verified::Yes)
            .unwrap();
        store
            .set_value_proposition("https://s.com", "S helps teams ship.", "Based on homepage")
            .unwrap();

        let rows = store.startups().unwrap();
        assert_eq!(rows[0].verified, Verified::Yes);
        assert_eq!(rows[0].value_proposition, "S helps teams ship.");
        assert_eq!(rows[0].value_source, "Based on homepage");
    }

    #[test]
    fn verified_cell_round_trip() {
        for v in [Verified::Pending, Verified::Yes, Verified::No] {
            assert_eq!(Verified::from_cell(v.as_cell()), v);
        }
        assert_eq!(Verified::from_cell("garbage"), Verified::Pending);
    }

    #[test]
    fn stats_count_the_right_rows() {
        let mut s1 = startup("https://a.com", "A");
        s1.verified = Verified::Yes;
        s1.value_proposition = "A helps people.".to_string();
        let s2 = startup("https://b.com", "B");

        let mut a1 = accelerator("https://x.com", "X");
        a1.verified = Verified::Pending;
        let a2 = accelerator("https://y.com", "Y");

        let stats = StoreStats::compute(&[a1, a2], &[s1, s2]);
        assert_eq!(stats.accelerators, 2);
        assert_eq!(stats.accelerators_verified, 1);
        assert_eq!(stats.accelerators_pending, 1);
        assert_eq!(stats.startups, 2);
        assert_eq!(stats.startups_verified, 1);
        assert_eq!(stats.with_proposition, 1);
    }
}
