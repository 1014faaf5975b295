//! Source registry: which export files hold which (pharmacy, year) period.
//!
//! The registry is a pinned, ordered table. Candidate discovery never
//! enumerates directories, so the order candidates reach the deduplicator
//! (and therefore the tie-break) is the table order on every platform.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::debug;

use vrac_shared::{Dialect, MappingHints, PeriodKey, PharmacyId, Result, SourceEntry, VracError};

// ---------------------------------------------------------------------------
// Built-in table
// ---------------------------------------------------------------------------

/// `(file, subdir, dialect, pharmacy, year)` rows of the built-in registry.
const BUILTIN_MAPPINGS: &[(&str, &str, Dialect, PharmacyId, i32)] = &[
    ("ETAT_2080QTE1.csv", "PROLIFE/2080", Dialect::RankLimited, PharmacyId::Prolife, 2025),
    ("ETAT_2080QTE2.csv", "PROLIFE/2080", Dialect::RankLimited, PharmacyId::Prolife, 2024),
    ("ETAT_2080QTE3.csv", "PROLIFE/2080", Dialect::RankLimited, PharmacyId::Prolife, 2023),
    ("ETAT_2080QTE4.csv", "PROLIFE/2080", Dialect::RankLimited, PharmacyId::Prolife, 2022),
    ("ETAT_2080QTE5.csv", "TANDA/2080", Dialect::RankLimited, PharmacyId::Tanda, 2025),
    ("ETAT_2080QTE6.csv", "TANDA/2080", Dialect::RankLimited, PharmacyId::Tanda, 2024),
    ("ETAT_2080QTE7.csv", "TANDA/2080", Dialect::RankLimited, PharmacyId::Tanda, 2023),
    ("ETAT_2080QTE8.csv", "TANDA/2080", Dialect::RankLimited, PharmacyId::Tanda, 2022),
    ("ETAT_ListeProduitsVendus1.csv", "TANDA", Dialect::FullCatalog, PharmacyId::Tanda, 2025),
    ("ETAT_ListeProduitsVendus2.csv", "TANDA", Dialect::FullCatalog, PharmacyId::Tanda, 2024),
    ("ETAT_ListeProduitsVendus3.csv", "TANDA", Dialect::FullCatalog, PharmacyId::Tanda, 2023),
    ("ETAT_ListeProduitsVendus4.csv", "TANDA", Dialect::FullCatalog, PharmacyId::Tanda, 2022),
];

/// Label of the August–December reporting window.
pub fn default_period_label(year: i32) -> String {
    format!("Aug–Dec {year}")
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One file mapping in the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceMapping {
    pub file: String,
    pub subdir: Option<String>,
    pub dialect: Dialect,
    pub pharmacy_id: PharmacyId,
    pub period_label: String,
    pub year: i32,
}

impl SourceMapping {
    pub fn key(&self) -> PeriodKey {
        PeriodKey {
            pharmacy_id: self.pharmacy_id,
            year: self.year,
        }
    }

    pub fn hints(&self) -> MappingHints {
        MappingHints {
            pharmacy_id: self.pharmacy_id,
            period_label: self.period_label.clone(),
            year: self.year,
        }
    }

    /// Paths to try, in preference order: subdirectory first, then root.
    pub fn candidate_paths(&self, root: &Path) -> Vec<PathBuf> {
        let root_level = root.join(&self.file);
        match &self.subdir {
            Some(subdir) => vec![root.join(subdir).join(&self.file), root_level],
            None => vec![root_level],
        }
    }
}

impl From<SourceEntry> for SourceMapping {
    fn from(entry: SourceEntry) -> Self {
        Self {
            file: entry.file,
            subdir: entry.subdir.filter(|s| !s.trim().is_empty()),
            dialect: entry.dialect,
            pharmacy_id: entry.pharmacy_id,
            period_label: entry.period_label,
            year: entry.year,
        }
    }
}

/// A registry mapping resolved against an input root.
#[derive(Debug, Clone)]
pub struct SourceCandidate {
    /// Position in registry order. Downstream tie-breaks rely on it.
    pub order: usize,
    pub key: PeriodKey,
    pub dialect: Dialect,
    /// Paths to try, most preferred first. The first one that exists wins.
    pub paths: Vec<PathBuf>,
    pub hints: MappingHints,
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Ordered table of source mappings.
#[derive(Debug, Clone)]
pub struct SourceRegistry {
    mappings: Vec<SourceMapping>,
}

impl SourceRegistry {
    /// The built-in table: rank-limited files first, then full-catalog files.
    pub fn builtin() -> Self {
        let mappings = BUILTIN_MAPPINGS
            .iter()
            .map(|&(file, subdir, dialect, pharmacy_id, year)| SourceMapping {
                file: file.to_string(),
                subdir: Some(subdir.to_string()),
                dialect,
                pharmacy_id,
                period_label: default_period_label(year),
                year,
            })
            .collect();
        Self { mappings }
    }

    /// Build a registry from explicit mappings, keeping their order.
    ///
    /// Rejects duplicate `(dialect, subdir, file)` rows.
    pub fn from_mappings(mappings: Vec<SourceMapping>) -> Result<Self> {
        let mut seen = HashSet::new();
        for m in &mappings {
            if m.file.trim().is_empty() {
                return Err(VracError::config("source mapping with empty file name"));
            }
            if !seen.insert((m.dialect, m.subdir.clone(), m.file.clone())) {
                return Err(VracError::config(format!(
                    "duplicate source mapping: {} {}/{}",
                    m.dialect,
                    m.subdir.as_deref().unwrap_or("."),
                    m.file
                )));
            }
        }
        Ok(Self { mappings })
    }

    /// Use the configured `[[sources]]` entries, or the built-in table when none are set.
    pub fn from_config(entries: &[SourceEntry]) -> Result<Self> {
        if entries.is_empty() {
            debug!("no [[sources]] configured, using built-in registry");
            return Ok(Self::builtin());
        }
        Self::from_mappings(entries.iter().cloned().map(SourceMapping::from).collect())
    }

    pub fn mappings(&self) -> &[SourceMapping] {
        &self.mappings
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    /// Every mapping resolved against `root`, in registry order.
    pub fn candidates(&self, root: &Path) -> Vec<SourceCandidate> {
        self.mappings
            .iter()
            .enumerate()
            .map(|(order, m)| SourceCandidate {
                order,
                key: m.key(),
                dialect: m.dialect,
                paths: m.candidate_paths(root),
                hints: m.hints(),
            })
            .collect()
    }

    /// Candidates for a single key, in registry order.
    pub fn lookup(&self, key: PeriodKey, root: &Path) -> Vec<SourceCandidate> {
        self.candidates(root)
            .into_iter()
            .filter(|c| c.key == key)
            .collect()
    }

    /// All distinct keys the registry knows about, in first-appearance order.
    pub fn keys(&self) -> Vec<PeriodKey> {
        let mut seen = HashSet::new();
        self.mappings
            .iter()
            .map(SourceMapping::key)
            .filter(|k| seen.insert(*k))
            .collect()
    }
}

impl Default for SourceRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
