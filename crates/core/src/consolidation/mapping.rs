//! Account-code to consolidation-category mapping.
//!
//! The table is data: the default PCG rules can be replaced by a TOML file
//! without touching the engine. Matching is by longest account-code prefix.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consolidation::types::ConsolidationCategory;

/// One prefix rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingRule {
    /// Account-code prefix (digits only).
    pub prefix: String,
    /// Category assigned to matching accounts.
    pub category: ConsolidationCategory,
    /// Marks revenue accounts.
    #[serde(default)]
    pub is_revenue: bool,
    /// False for capitalised acquisitions.
    #[serde(default = "default_affects_result")]
    pub affects_result: bool,
    /// Caption of the account class.
    pub label: String,
}

fn default_affects_result() -> bool {
    true
}

/// Errors raised while loading a mapping table.
#[derive(Debug, Error)]
pub enum MappingError {
    /// TOML could not be parsed.
    #[error("Invalid mapping file: {0}")]
    Parse(String),

    /// A rule is inconsistent.
    #[error("Invalid mapping rule '{prefix}': {reason}")]
    InvalidRule {
        /// Offending prefix.
        prefix: String,
        /// What is wrong with it.
        reason: String,
    },

    /// Two rules share a prefix.
    #[error("Duplicate mapping prefix '{0}'")]
    DuplicatePrefix(String),
}

#[derive(Deserialize)]
struct MappingFile {
    rules: Vec<MappingRule>,
}

fn rule(
    prefix: &str,
    category: ConsolidationCategory,
    affects_result: bool,
    label: &str,
) -> MappingRule {
    MappingRule {
        prefix: prefix.to_string(),
        category,
        is_revenue: category == ConsolidationCategory::Revenue,
        affects_result,
        label: label.to_string(),
    }
}

static PCG_RULES: Lazy<Vec<MappingRule>> = Lazy::new(|| {
    use ConsolidationCategory::{Capex, Operating, Personnel, Revenue};
    vec![
        rule("20", Capex, false, "Immobilisations incorporelles"),
        rule("21", Capex, false, "Immobilisations corporelles"),
        rule("23", Capex, false, "Immobilisations en cours"),
        rule("60", Operating, true, "Achats"),
        rule("61", Operating, true, "Services extérieurs"),
        rule("62", Operating, true, "Autres services extérieurs"),
        rule("63", Operating, true, "Impôts, taxes et versements assimilés"),
        rule("64", Personnel, true, "Charges de personnel"),
        rule("65", Operating, true, "Autres charges de gestion courante"),
        rule("66", Operating, true, "Charges financières"),
        rule("67", Operating, true, "Charges exceptionnelles"),
        rule("68", Capex, true, "Dotations aux amortissements"),
        rule("70", Revenue, true, "Ventes de prestations de services"),
        rule("71", Revenue, true, "Production stockée"),
        rule("72", Revenue, true, "Production immobilisée"),
        rule("73", Revenue, true, "Produits nets partiels"),
        rule("74", Revenue, true, "Subventions d'exploitation"),
        rule("75", Revenue, true, "Autres produits de gestion courante"),
        rule("76", Revenue, true, "Produits financiers"),
        rule("77", Revenue, true, "Produits exceptionnels"),
    ]
});

/// Ordered set of prefix rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountMapping {
    rules: Vec<MappingRule>,
}

impl Default for AccountMapping {
    fn default() -> Self {
        Self::pcg()
    }
}

impl AccountMapping {
    /// The default French chart-of-accounts table.
    #[must_use]
    pub fn pcg() -> Self {
        Self {
            rules: PCG_RULES.clone(),
        }
    }

    /// Builds a table from explicit rules.
    ///
    /// # Errors
    ///
    /// Rejects empty or non-numeric prefixes, duplicate prefixes,
    /// revenue flags that disagree with the category, and capitalised
    /// rules outside CAPEX.
    pub fn from_rules(rules: Vec<MappingRule>) -> Result<Self, MappingError> {
        let mut seen = std::collections::HashSet::new();
        for rule in &rules {
            let invalid = |reason: &str| MappingError::InvalidRule {
                prefix: rule.prefix.clone(),
                reason: reason.to_string(),
            };
            if rule.prefix.is_empty() || !rule.prefix.chars().all(|c| c.is_ascii_digit()) {
                return Err(invalid("prefix must be a non-empty string of digits"));
            }
            if rule.is_revenue != (rule.category == ConsolidationCategory::Revenue) {
                return Err(invalid("is_revenue must be set exactly for REVENUE rules"));
            }
            if !rule.affects_result && rule.category != ConsolidationCategory::Capex {
                return Err(invalid("only CAPEX accounts can be capitalised"));
            }
            if !seen.insert(rule.prefix.as_str()) {
                return Err(MappingError::DuplicatePrefix(rule.prefix.clone()));
            }
        }
        Ok(Self { rules })
    }

    /// Parses a TOML table of `[[rules]]`.
    pub fn from_toml_str(source: &str) -> Result<Self, MappingError> {
        let file: MappingFile =
            toml::from_str(source).map_err(|e| MappingError::Parse(e.to_string()))?;
        Self::from_rules(file.rules)
    }

    /// Longest-prefix match for an account code.
    #[must_use]
    pub fn classify(&self, account_code: &str) -> Option<&MappingRule> {
        self.rules
            .iter()
            .filter(|rule| account_code.starts_with(&rule.prefix))
            .max_by_key(|rule| rule.prefix.len())
    }

    /// All rules in declaration order.
    #[must_use]
    pub fn rules(&self) -> &[MappingRule] {
        &self.rules
    }
}
