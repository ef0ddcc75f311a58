//! Installment math for a fixed-rate amortizing loan.

/// Periodic (monthly) rate for a nominal annual percentage, e.g. `29.95`.
pub fn monthly_rate(annual_rate_percent: f64) -> f64 {
    annual_rate_percent / 12.0 / 100.0
}

/// Fixed periodic payment for `principal` repaid over `periods` at `periodic_rate`.
///
/// Uses the standard amortization formula
/// `P * r * (1 + r)^n / ((1 + r)^n - 1)` and rounds to the nearest whole
/// currency unit. A zero denominator (zero rate) yields `0`.
pub fn compute_installment(principal: u64, periods: u32, periodic_rate: f64) -> u64 {
    let growth = (1.0 + periodic_rate).powf(f64::from(periods));
    let numerator = principal as f64 * periodic_rate * growth;
    let denominator = growth - 1.0;
    if denominator == 0.0 {
        return 0;
    }
    let installment = (numerator / denominator).round();
    if installment.is_finite() && installment > 0.0 {
        installment as u64
    } else {
        0
    }
}

/// Total repaid over the life of the loan.
pub fn compute_total(installment: u64, periods: u32) -> u64 {
    installment.saturating_mul(u64::from(periods))
}

#[cfg(test)]
mod tests {
    use super::*;

    const RATE: f64 = 29.95;

    #[test]
    fn test_reference_installments() {
        let r = monthly_rate(RATE);
        assert_eq!(compute_installment(20_000, 3, r), 7002);
        assert_eq!(compute_installment(20_000, 6, r), 3630);
        assert_eq!(compute_installment(20_000, 9, r), 2509);
        assert_eq!(compute_installment(10_000, 3, r), 3501);
        assert_eq!(compute_installment(50_000, 9, r), 6272);
    }

    #[test]
    fn test_total_is_installment_times_periods() {
        let r = monthly_rate(RATE);
        let emi = compute_installment(20_000, 3, r);
        assert_eq!(compute_total(emi, 3), 21_006);
    }

    #[test]
    fn test_zero_rate_yields_zero() {
        for principal in [0, 1, 10_000, 50_000] {
            for months in [1, 3, 6, 9, 360] {
                assert_eq!(compute_installment(principal, months, 0.0), 0);
            }
        }
    }

    #[test]
    fn test_zero_principal() {
        assert_eq!(compute_installment(0, 6, monthly_rate(RATE)), 0);
    }

    #[test]
    fn test_total_never_below_installment() {
        let r = monthly_rate(RATE);
        for principal in (10_000..=50_000).step_by(997) {
            for months in [3, 6, 9] {
                let emi = compute_installment(principal, months, r);
                assert!(compute_total(emi, months) >= emi);
            }
        }
    }

    #[test]
    fn test_monotonic_in_principal() {
        let r = monthly_rate(RATE);
        for months in [3, 6, 9] {
            let mut last = 0;
            for principal in 10_000..=50_000 {
                let emi = compute_installment(principal, months, r);
                assert!(emi >= last, "{} months: {} < {} at {}", months, emi, last, principal);
                last = emi;
            }
        }
    }

    #[test]
    fn test_longer_tenure_lowers_installment() {
        let r = monthly_rate(RATE);
        for principal in (10_000..=50_000).step_by(1_000) {
            let three = compute_installment(principal, 3, r);
            let six = compute_installment(principal, 6, r);
            let nine = compute_installment(principal, 9, r);
            assert!(three >= six && six >= nine);
        }
    }
}
