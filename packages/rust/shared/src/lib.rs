//! Shared types, error model, and configuration for the VRAC pipeline.
//!
//! This crate is the foundation depended on by all other VRAC crates.
//! It provides:
//! - [`VracError`]: the unified error type
//! - Domain types ([`PeriodRecord`], [`ProductSale`], [`PharmacyProfile`], [`HealthIndexPoint`])
//! - Locale-aware numeric helpers ([`normalize_quantity`])
//! - Configuration ([`AppConfig`], [`ParseOptions`], config loading)

pub mod config;
pub mod error;
pub mod numeric;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DEFAULT_RANK_WINDOW, DefaultsConfig, ParseOptions, ParsingConfig, SourceEntry,
    config_dir, config_file_path, init_config, load_config, load_config_from, validate_config,
};
pub use error::{Result, VracError};
pub use numeric::{normalize_quantity, parse_export_date, parse_optional_number};
pub use types::{
    CategorySale, Dialect, HealthIndexPoint, MappingHints, OutputDocument, PHARMACY_PROFILES,
    PeriodKey, PeriodRecord, PharmacyId, PharmacyProfile, ProductSale, RegionId,
    TherapeuticCategory,
};
