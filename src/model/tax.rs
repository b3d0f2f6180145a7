//! Progressive income tax estimation for miscellaneous income.
//!
//! Crypto trading gains are taxed as miscellaneous income (雑所得) under the
//! Japanese national income tax's progressive schedule. The liability for a
//! band is `income × rate − deduction`, where the deduction makes the bands
//! continuous.

/// One band of the progressive schedule. Bounds are inclusive.
#[derive(Clone, Copy, Debug)]
pub struct TaxBracket {
    pub min: f64,
    pub max: f64,
    pub rate: f64,
    pub deduction: f64,
}

/// National income tax schedule, in JPY.
pub const TAX_BRACKETS: [TaxBracket; 7] = [
    TaxBracket {
        min: 0.0,
        max: 1_949_000.0,
        rate: 0.05,
        deduction: 0.0,
    },
    TaxBracket {
        min: 1_950_000.0,
        max: 3_299_000.0,
        rate: 0.10,
        deduction: 97_500.0,
    },
    TaxBracket {
        min: 3_300_000.0,
        max: 6_949_000.0,
        rate: 0.20,
        deduction: 427_500.0,
    },
    TaxBracket {
        min: 6_950_000.0,
        max: 8_999_000.0,
        rate: 0.23,
        deduction: 636_000.0,
    },
    TaxBracket {
        min: 9_000_000.0,
        max: 17_999_000.0,
        rate: 0.33,
        deduction: 1_536_000.0,
    },
    TaxBracket {
        min: 18_000_000.0,
        max: 39_999_000.0,
        rate: 0.40,
        deduction: 2_796_000.0,
    },
    TaxBracket {
        min: 40_000_000.0,
        max: f64::INFINITY,
        rate: 0.45,
        deduction: 4_796_000.0,
    },
];

fn bracket_for(income: f64) -> Option<&'static TaxBracket> {
    if income <= 0.0 {
        return None;
    }
    TAX_BRACKETS
        .iter()
        .find(|b| income >= b.min && income <= b.max)
}

/// Estimated tax liability for a signed income amount. 0 for non-positive
/// income or when no band matches.
pub fn estimate_tax(income: f64) -> f64 {
    bracket_for(income)
        .map(|b| income * b.rate - b.deduction)
        .unwrap_or(0.0)
}

/// The applicable band's rate, for display. 0 for non-positive income.
pub fn marginal_rate(income: f64) -> f64 {
    bracket_for(income).map(|b| b.rate).unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn middle_bracket() {
        // ¥5,000,000 lands in the 20% band with a ¥427,500 deduction.
        assert_eq!(estimate_tax(5_000_000.0), 572_500.0);
        assert_eq!(marginal_rate(5_000_000.0), 0.20);
    }

    #[test]
    fn lowest_bracket_has_no_deduction() {
        assert_eq!(estimate_tax(1_000_000.0), 50_000.0);
        assert_eq!(marginal_rate(1_000_000.0), 0.05);
    }

    #[test]
    fn top_bracket_is_unbounded() {
        assert_eq!(estimate_tax(100_000_000.0), 100_000_000.0 * 0.45 - 4_796_000.0);
        assert_eq!(marginal_rate(100_000_000.0), 0.45);
    }

    #[test]
    fn non_positive_income_owes_nothing() {
        assert_eq!(estimate_tax(0.0), 0.0);
        assert_eq!(estimate_tax(-123_456.0), 0.0);
        assert_eq!(marginal_rate(-1.0), 0.0);
    }

    #[test]
    fn band_boundaries() {
        assert_eq!(marginal_rate(1_949_000.0), 0.05);
        assert_eq!(marginal_rate(1_950_000.0), 0.10);
        assert_eq!(marginal_rate(40_000_000.0), 0.45);
    }
}
