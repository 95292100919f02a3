//! Tax withholding for generated payslips.
//!
//! Tax is only withheld when the organisation has tax management
//! switched on (see [`OrganizationSettings`]).  The [`TaxCalculator`]
//! trait lets a deployment plug in its own rules; the crate ships a
//! flat-rate implementation driven by the settings.

use crate::config::OrganizationSettings;

/// Determines how much tax to withhold from a gross amount.
///
/// Tax calculators must be thread-safe (`Send + Sync`) because the
/// pay run evaluates employees concurrently.
pub trait TaxCalculator: Send + Sync {
    /// Short label used in logs.
    fn name(&self) -> &str;
    /// Tax withheld for `employee_id` on `gross` for one period.
    fn calculate(&self, employee_id: &str, gross: f64) -> f64;
}

/// Withholds a fixed percentage of gross pay.
#[derive(Debug, Clone, Copy)]
pub struct FlatRateCalculator {
    /// Percentage, e.g. `10.0` for 10%.
    pub rate: f64,
}

impl FlatRateCalculator {
    pub fn from_settings(settings: &OrganizationSettings) -> Self {
        Self {
            rate: settings.tax_rate,
        }
    }
}

impl TaxCalculator for FlatRateCalculator {
    fn name(&self) -> &str {
        "flat-rate"
    }

    fn calculate(&self, _employee_id: &str, gross: f64) -> f64 {
        if gross <= 0.0 || self.rate <= 0.0 {
            return 0.0;
        }
        gross * self.rate / 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_rate_applies_percentage_of_gross() {
        let settings = OrganizationSettings {
            enable_tax_management: true,
            tax_rate: 10.0,
            ..OrganizationSettings::default()
        };
        let calc = FlatRateCalculator::from_settings(&settings);
        assert_eq!(calc.calculate("E1", 7000.0), 700.0);
        assert_eq!(calc.calculate("E1", -5.0), 0.0);
    }
}
