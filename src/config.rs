//! Application configuration loaded from the environment.
//!
//! Variables (a `.env` file is read first when present):
//! - ADVISOR_DATABASE_URL (defaults to `sqlite:./advisor.db?mode=rwc`)
//! - ADVISOR_POLICY_FILE (optional JSON risk policy)
//! - ADVISOR_PROTECTED_ASSET
//! - ADVISOR_RESERVE_AMOUNT
//! - ADVISOR_MAJOR_PAIRS (comma separated)
//! - ADVISOR_MAX_RISK_PER_TRADE
//!
//! Single-value variables override the policy file.

use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};
use rust_decimal::Decimal;

use crate::advisor::RiskPolicy;

pub const DEFAULT_DATABASE_URL: &str = "sqlite:./advisor.db?mode=rwc";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub policy_file: Option<PathBuf>,
    pub policy: RiskPolicy,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            policy_file: None,
            policy: RiskPolicy::default(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        // Missing .env is fine
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from any key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let database_url =
            get("ADVISOR_DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());
        let policy_file = get("ADVISOR_POLICY_FILE").map(PathBuf::from);

        let mut policy = match &policy_file {
            Some(path) => RiskPolicy::from_file(path)?,
            None => RiskPolicy::default(),
        };

        if let Some(asset) = get("ADVISOR_PROTECTED_ASSET") {
            policy.protected_asset = asset.trim().to_uppercase();
        }
        if let Some(raw) = get("ADVISOR_RESERVE_AMOUNT") {
            policy.reserve_amount = parse_decimal("ADVISOR_RESERVE_AMOUNT", &raw)?;
        }
        if let Some(raw) = get("ADVISOR_MAJOR_PAIRS") {
            policy.major_pairs = raw
                .split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(raw) = get("ADVISOR_MAX_RISK_PER_TRADE") {
            policy.max_risk_per_trade = parse_decimal("ADVISOR_MAX_RISK_PER_TRADE", &raw)?;
        }

        policy
            .validate()
            .context("Risk policy from environment is invalid")?;

        Ok(Self {
            database_url,
            policy_file,
            policy,
        })
    }
}

fn parse_decimal(key: &str, raw: &str) -> Result<Decimal> {
    Decimal::from_str(raw.trim()).with_context(|| format!("Invalid {}: {}", key, raw))
}
