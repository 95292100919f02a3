//! Month-level payslip totals for the payroll dashboard.

use crate::models::{round_currency, PayPeriod, PayslipRecord, PayslipStatus, PayslipSummary};
use std::collections::HashSet;

/// Totals a set of payslips.  No input means all-zero totals.
pub fn summarize<'a, I>(records: I) -> PayslipSummary
where
    I: IntoIterator<Item = &'a PayslipRecord>,
{
    let mut employees = HashSet::new();
    let mut summary = PayslipSummary::default();
    for record in records {
        employees.insert(record.employee_id.as_str());
        summary.total_gross += record.gross_salary;
        summary.total_deductions += record.total_deductions;
        summary.total_net += record.net_salary;
        match record.status {
            PayslipStatus::Paid => summary.paid_count += 1,
            PayslipStatus::Pending => summary.pending_count += 1,
            PayslipStatus::Draft | PayslipStatus::Other => {}
        }
    }
    summary.total_employees = employees.len();
    summary.total_gross = round_currency(summary.total_gross);
    summary.total_deductions = round_currency(summary.total_deductions);
    summary.total_net = round_currency(summary.total_net);
    summary
}

/// Totals only the payslips belonging to `period`.
pub fn summarize_period(records: &[PayslipRecord], period: PayPeriod) -> PayslipSummary {
    let summary = summarize(records.iter().filter(|record| period.contains(record)));
    tracing::debug!(
        month = period.month,
        year = period.year,
        employees = summary.total_employees,
        "payslips summarised"
    );
    summary
}
