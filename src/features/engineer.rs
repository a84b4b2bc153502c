//! Engineered ratio features.

use crate::error::ArithmeticError;
use crate::types::application::LoanApplication;

/// Ratios computed from the raw numeric attributes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DerivedFeatures {
    /// (CreditScore / InterestRate) * DTIRatio
    pub risk_score: f64,
    /// LoanAmount / Income
    pub lti: f64,
}

/// Computes the engineered features the classifier was trained with.
#[derive(Debug, Default, Clone, Copy)]
pub struct FeatureEngineer;

impl FeatureEngineer {
    pub fn new() -> Self {
        Self
    }

    /// Derive `RiskScore` and `LTI`.
    ///
    /// A zero divisor is an error rather than an infinity, which would
    /// otherwise flow silently into the scaler.
    pub fn derive(&self, app: &LoanApplication) -> Result<DerivedFeatures, ArithmeticError> {
        let lti = ratio(app.loan_amount, app.income, "LTI", "Income")?;
        let risk_score = ratio(app.credit_score as f64, app.interest_rate, "RiskScore", "InterestRate")?
            * app.dti_ratio;

        if !risk_score.is_finite() {
            return Err(ArithmeticError::NonFinite {
                feature: "RiskScore",
            });
        }

        Ok(DerivedFeatures { risk_score, lti })
    }
}

fn ratio(
    numerator: f64,
    denominator: f64,
    feature: &'static str,
    divisor: &'static str,
) -> Result<f64, ArithmeticError> {
    if denominator == 0.0 {
        return Err(ArithmeticError::DivisionByZero { feature, divisor });
    }
    let value = numerator / denominator;
    if !value.is_finite() {
        return Err(ArithmeticError::NonFinite { feature });
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn application(income: f64, loan_amount: f64, credit_score: u32, interest_rate: f64, dti_ratio: f64) -> LoanApplication {
        LoanApplication {
            age: 30,
            income,
            loan_amount,
            credit_score,
            months_employed: 12,
            num_credit_lines: 2,
            interest_rate,
            loan_term: 60,
            dti_ratio,
            education: "Master's".to_string(),
            employment_type: "Part-time".to_string(),
            marital_status: "Single".to_string(),
            has_mortgage: false,
            has_dependents: true,
            loan_purpose: "Home".to_string(),
            has_co_signer: true,
        }
    }

    #[test]
    fn test_lti_and_risk_score() {
        let engineer = FeatureEngineer::new();

        let derived = engineer.derive(&application(50000.0, 10000.0, 700, 10.0, 0.4)).unwrap();
        assert!((derived.lti - 0.2).abs() < 1e-12);
        assert!((derived.risk_score - 28.0).abs() < 1e-12);
    }

    #[test]
    fn test_zero_income_is_rejected() {
        let engineer = FeatureEngineer::new();

        let err = engineer.derive(&application(0.0, 10000.0, 700, 10.0, 0.4)).unwrap_err();
        assert_eq!(
            err,
            ArithmeticError::DivisionByZero {
                feature: "LTI",
                divisor: "Income"
            }
        );
    }

    #[test]
    fn test_zero_interest_rate_is_rejected() {
        let engineer = FeatureEngineer::new();

        let err = engineer.derive(&application(50000.0, 10000.0, 700, 0.0, 0.4)).unwrap_err();
        assert_eq!(
            err,
            ArithmeticError::DivisionByZero {
                feature: "RiskScore",
                divisor: "InterestRate"
            }
        );
    }

    #[test]
    fn test_overflow_is_rejected() {
        let engineer = FeatureEngineer::new();

        let err = engineer.derive(&application(1e-320, f64::MAX, 700, 10.0, 0.4)).unwrap_err();
        assert_eq!(err, ArithmeticError::NonFinite { feature: "LTI" });
    }

    #[test]
    fn test_zero_loan_amount_is_fine() {
        let engineer = FeatureEngineer::new();

        let derived = engineer.derive(&application(50000.0, 0.0, 700, 10.0, 0.0)).unwrap();
        assert_eq!(derived.lti, 0.0);
        assert_eq!(derived.risk_score, 0.0);
    }
}
