//! Pricing configuration: locale-resolved unit cost and tax, token prices.

use serde::{Deserialize, Serialize};

/// Billing locale. Resolves the two externally visible numeric parameters
/// the core must honor: daily unit cost and tax rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    Jpy,
    Usd,
}

/// Pricing parameters.
///
/// Unit cost and tax rate are configuration inputs, never computed here.
/// Token prices feed the cost ledger (defaults are gpt-4o-mini rates).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingConfig {
    pub locale: Locale,

    /// Cost of one person-day in the locale currency.
    pub daily_unit_cost: f64,

    /// Tax rate applied to the subtotal (0.0 - 0.10).
    pub tax_rate: f64,

    /// USD per 1M input tokens.
    pub price_per_1m_input_tokens: f64,

    /// USD per 1M output tokens.
    pub price_per_1m_output_tokens: f64,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self::for_locale(Locale::Jpy)
    }
}

impl PricingConfig {
    /// Locale defaults: JPY bills 40,000 yen/person-day with 10% consumption
    /// tax; USD bills 400 dollars/person-day untaxed.
    pub fn for_locale(locale: Locale) -> Self {
        let (daily_unit_cost, tax_rate) = match locale {
            Locale::Jpy => (40_000.0, 0.10),
            Locale::Usd => (400.0, 0.0),
        };
        Self {
            locale,
            daily_unit_cost,
            tax_rate,
            price_per_1m_input_tokens: 0.15,
            price_per_1m_output_tokens: 0.60,
        }
    }

    /// Validate configuration at startup.
    pub fn validate(&self) -> Result<(), String> {
        if self.daily_unit_cost <= 0.0 {
            return Err("daily_unit_cost must be > 0".to_string());
        }
        if !(0.0..=0.10).contains(&self.tax_rate) {
            return Err("tax_rate must be within 0.0 - 0.10".to_string());
        }
        if self.price_per_1m_input_tokens < 0.0 || self.price_per_1m_output_tokens < 0.0 {
            return Err("token prices must be >= 0".to_string());
        }
        Ok(())
    }
}
