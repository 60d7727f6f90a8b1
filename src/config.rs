use serde::Deserialize;
use std::path::Path;

use crate::metrics::{HealthScoreRules, LeadScoringRules};
use crate::validation;

/// Tunable scoring constants. Sections missing from the rules file keep
/// their defaults.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub lead: LeadScoringRules,
    pub health: HealthScoreRules,
}

impl ScoringConfig {
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("cannot read scoring rules {}: {}", path.display(), e))?;
        Self::from_json(&raw)
            .map_err(|e| anyhow::anyhow!("invalid scoring rules in {}: {}", path.display(), e))
    }

    pub fn from_json(raw: &str) -> anyhow::Result<Self> {
        let config: Self = serde_json::from_str(raw)?;
        config.check()?;
        Ok(config)
    }

    fn check(&self) -> anyhow::Result<()> {
        let lead = &self.lead;
        if lead.warm_threshold > lead.hot_threshold {
            anyhow::bail!(
                "lead.warm_threshold ({}) must not exceed lead.hot_threshold ({})",
                lead.warm_threshold,
                lead.hot_threshold
            );
        }
        let descending = |steps: &[crate::metrics::Threshold]| {
            steps.windows(2).all(|w| w[0].above >= w[1].above)
        };
        for (name, steps) in [
            ("revenue_steps", &lead.revenue_steps),
            ("visit_steps", &lead.visit_steps),
            ("open_steps", &lead.open_steps),
            ("click_steps", &lead.click_steps),
            ("interaction_steps", &lead.interaction_steps),
        ] {
            if !descending(steps) {
                anyhow::bail!("lead.{} must be ordered from the highest threshold down", name);
            }
        }
        if !lead.recency_bands.windows(2).all(|w| w[0].within_days <= w[1].within_days) {
            anyhow::bail!("lead.recency_bands must be ordered from the most recent band");
        }
        if self.health.revenue_divisor <= 0 {
            anyhow::bail!("health.revenue_divisor must be positive");
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    /// Currency assumed for new money records that do not name one.
    pub default_currency: String,
    pub scoring: ScoringConfig,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            database_url: std::env::var("DB_URL")
                .or_else(|_| std::env::var("DATABASE_URL"))
                .map_err(|_| {
                    anyhow::anyhow!("DB_URL or DATABASE_URL environment variable required")
                })
                .and_then(|url| {
                    if url.trim().is_empty() {
                        anyhow::bail!("DB_URL cannot be empty");
                    }
                    if !url.starts_with("postgresql://") && !url.starts_with("postgres://") {
                        anyhow::bail!("DB_URL must start with postgresql:// or postgres://");
                    }
                    Ok(url)
                })?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            default_currency: std::env::var("DEFAULT_CURRENCY")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(|s| s.trim().to_string())
                .unwrap_or_else(|| "USD".to_string()),
            scoring: match std::env::var("SCORING_RULES_PATH")
                .ok()
                .filter(|s| !s.trim().is_empty())
            {
                Some(path) => ScoringConfig::from_file(path.trim())?,
                None => ScoringConfig::default(),
            },
        };

        if validation::currency_code(&config.default_currency).is_err() {
            anyhow::bail!(
                "DEFAULT_CURRENCY must be a three-letter ISO 4217 code, got '{}'",
                config.default_currency
            );
        }

        // Log successful configuration load (without sensitive values)
        tracing::info!("Configuration loaded successfully");
        tracing::debug!(
            "Database URL: {}...",
            &config.database_url[..20.min(config.database_url.len())]
        );
        tracing::debug!("Server Port: {}", config.port);
        tracing::debug!("Default currency: {}", config.default_currency);
        if config.scoring != ScoringConfig::default() {
            tracing::info!("Custom scoring rules loaded");
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_rules_file_is_defaults() {
        assert_eq!(ScoringConfig::from_json("{}").unwrap(), ScoringConfig::default());
    }

    #[test]
    fn partial_override() {
        let cfg = ScoringConfig::from_json(
            r#"{"lead": {"warm_threshold": 40}, "health": {"revenue_cap": 10}}"#,
        )
        .unwrap();
        assert_eq!(cfg.lead.warm_threshold, 40);
        assert_eq!(cfg.lead.hot_threshold, 80);
        assert_eq!(cfg.health.revenue_cap, 10);
        assert_eq!(cfg.health.engagement_cap, 40);
    }

    #[test]
    fn inverted_quality_thresholds_rejected() {
        let err = ScoringConfig::from_json(r#"{"lead": {"warm_threshold": 90}}"#).unwrap_err();
        assert!(err.to_string().contains("warm_threshold"));
    }

    #[test]
    fn ascending_step_table_rejected() {
        let raw = r#"{"lead": {"visit_steps": [{"above": 0, "points": 5}, {"above": 10, "points": 15}]}}"#;
        assert!(ScoringConfig::from_json(raw).is_err());
    }

    #[test]
    fn zero_revenue_divisor_rejected() {
        assert!(ScoringConfig::from_json(r#"{"health": {"revenue_divisor": 0}}"#).is_err());
    }
}
