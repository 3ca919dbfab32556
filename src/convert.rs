//! Final budget conversion from USD.
//!
//! Two entry points with different failure contracts:
//!
//! - [`CurrencyConverter::convert_to_ttd`] only touches allowlisted projects and
//!   never fails. When the live rate is unavailable it uses
//!   [`TTD_FALLBACK_RATE`].
//! - [`CurrencyConverter::convert_to_currency`] converts any project to any
//!   currency and reports every rate failure to the caller.

use crate::core::currency::{RateError, RateSource};
use crate::core::project::{ProjectRecord, to_money};
use futures::future::{join_all, try_join_all};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};

pub const TTD: &str = "TTD";

/// Name of the derived field on the allowlist path.
pub const FINAL_BUDGET_TTD: &str = "finalBudgetTtd";

/// USD to TTD rate used when the live rate cannot be fetched.
pub const TTD_FALLBACK_RATE: Decimal = Decimal::from_parts(68, 0, 0, false, 1);

#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("Failed to convert currency to {currency}: {source}")]
    Rate {
        currency: String,
        #[source]
        source: RateError,
    },
    #[error("Converted amount overflows for {currency}")]
    Overflow { currency: String },
}

/// Project names that always get a TTD figure. Built once at startup and
/// read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct TtdAllowlist {
    names: Arc<HashSet<String>>,
}

impl TtdAllowlist {
    pub fn contains(&self, project_name: &str) -> bool {
        self.names.contains(project_name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for TtdAllowlist {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        TtdAllowlist {
            names: Arc::new(iter.into_iter().map(Into::into).collect()),
        }
    }
}

/// A stored project plus any amounts derived at read time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConvertedProject {
    #[serde(flatten)]
    pub project: ProjectRecord,
    #[serde(flatten)]
    pub derived: BTreeMap<String, Decimal>,
}

impl ConvertedProject {
    pub fn unchanged(project: ProjectRecord) -> Self {
        ConvertedProject {
            project,
            derived: BTreeMap::new(),
        }
    }

    fn with_amount(project: ProjectRecord, field: String, amount: Decimal) -> Self {
        let mut derived = BTreeMap::new();
        derived.insert(field, amount);
        ConvertedProject { project, derived }
    }

    pub fn derived_amount(&self, field: &str) -> Option<Decimal> {
        self.derived.get(field).copied()
    }
}

/// Field that carries the final budget converted to `currency`. The code is
/// used exactly as given.
pub fn derived_field_name(currency: &str) -> String {
    format!("finalBudget{currency}")
}

fn convert_amount(usd: Decimal, rate: Decimal) -> Option<Decimal> {
    usd.checked_mul(rate).map(to_money)
}

#[derive(Clone)]
pub struct CurrencyConverter {
    rate_source: Arc<dyn RateSource>,
    allowlist: TtdAllowlist,
}

impl CurrencyConverter {
    pub fn new(rate_source: Arc<dyn RateSource>, allowlist: TtdAllowlist) -> Self {
        CurrencyConverter {
            rate_source,
            allowlist,
        }
    }

    pub fn allowlist(&self) -> &TtdAllowlist {
        &self.allowlist
    }

    /// Adds `finalBudgetTtd` to allowlisted projects. Rate failures fall back
    /// to [`TTD_FALLBACK_RATE`]; other projects come back unchanged.
    pub async fn convert_to_ttd(&self, project: ProjectRecord) -> ConvertedProject {
        if !self.allowlist.contains(&project.project_name) {
            debug!(project = %project.project_name, "Project not in TTD allowlist");
            return ConvertedProject::unchanged(project);
        }

        info!(project = %project.project_name, "Converting project to TTD");
        let rate = match self.rate_source.fetch_rate(TTD).await {
            Ok(rate) => rate,
            Err(e) => {
                warn!(
                    project = %project.project_name,
                    error = %e,
                    "Using fallback TTD rate {}",
                    TTD_FALLBACK_RATE
                );
                TTD_FALLBACK_RATE
            }
        };

        match convert_amount(project.final_budget_usd, rate) {
            Some(amount) => {
                debug!(%amount, "TTD conversion done");
                ConvertedProject::with_amount(project, FINAL_BUDGET_TTD.to_string(), amount)
            }
            None => {
                error!(project = %project.project_name, "TTD amount overflows, skipping conversion");
                ConvertedProject::unchanged(project)
            }
        }
    }

    /// Adds `finalBudget<currency>` to any project. Rate failures are
    /// returned to the caller.
    pub async fn convert_to_currency(
        &self,
        project: ProjectRecord,
        currency: &str,
    ) -> Result<ConvertedProject, ConversionError> {
        let rate = self
            .rate_source
            .fetch_rate(currency)
            .await
            .map_err(|source| ConversionError::Rate {
                currency: currency.to_string(),
                source,
            })?;

        let amount = convert_amount(project.final_budget_usd, rate).ok_or_else(|| {
            ConversionError::Overflow {
                currency: currency.to_string(),
            }
        })?;
        debug!(project = %project.project_name, %currency, %amount, "Currency conversion done");
        Ok(ConvertedProject::with_amount(
            project,
            derived_field_name(currency),
            amount,
        ))
    }

    /// Converts all projects concurrently. Each one falls back on its own.
    pub async fn convert_all_to_ttd(&self, projects: Vec<ProjectRecord>) -> Vec<ConvertedProject> {
        join_all(projects.into_iter().map(|p| self.convert_to_ttd(p))).await
    }

    /// Converts all projects concurrently. The first failure fails the batch.
    pub async fn convert_all_to_currency(
        &self,
        projects: Vec<ProjectRecord>,
        currency: &str,
    ) -> Result<Vec<ConvertedProject>, ConversionError> {
        try_join_all(
            projects
                .into_iter()
                .map(|p| self.convert_to_currency(p, currency)),
        )
        .await
    }
}
