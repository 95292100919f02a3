//! Payslip generation.
//!
//! The `payrun` module turns saved salary assignments into one
//! [`PayslipRecord`] per employee for a pay period.  Employees are
//! processed in parallel with [`rayon`].  When attendance for the
//! period is supplied, automatic attendance-based components and the
//! automatic percentages derived from them are recomputed before
//! totalling; everything else is taken from the assignment snapshot
//! as saved.

use crate::aggregator::{AssignmentDraft, AssignmentEdit};
use crate::config::OrganizationSettings;
use crate::error::EngineError;
use crate::models::{
    round_currency, Attendance, PayPeriod, PayslipRecord, PayslipStatus, SalaryAssignment,
};
use crate::tax::TaxCalculator;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Input to a pay run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayRunInput {
    pub period: PayPeriod,
    /// Assignments for the population, current and historical.
    pub assignments: Vec<SalaryAssignment>,
    /// Attendance per employee id.  Employees without an entry keep
    /// the attendance amounts stored on their assignment.
    #[serde(default)]
    pub attendance: HashMap<String, Attendance>,
}

/// An employee left out of the pay run, and why.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedEmployee {
    pub employee_id: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayRunResult {
    pub period: PayPeriod,
    /// Sorted by employee id.
    pub payslips: Vec<PayslipRecord>,
    #[serde(default)]
    pub skipped: Vec<SkippedEmployee>,
}

/// Picks the current assignment of every employee: the one flagged
/// current with the latest `effective_from`.  Employees with several
/// current assignments are logged; the latest still wins.
pub fn select_current(assignments: &[SalaryAssignment]) -> BTreeMap<&str, &SalaryAssignment> {
    let mut current: BTreeMap<&str, &SalaryAssignment> = BTreeMap::new();
    for assignment in assignments.iter().filter(|assignment| assignment.is_current) {
        let replace = match current.get(assignment.employee_id.as_str()) {
            Some(existing) => {
                tracing::warn!(
                    employee_id = %assignment.employee_id,
                    "employee has more than one current salary assignment"
                );
                assignment.effective_from > existing.effective_from
            }
            None => true,
        };
        if replace {
            current.insert(&assignment.employee_id, assignment);
        }
    }
    current
}

fn payslip(
    period: PayPeriod,
    assignment: &SalaryAssignment,
    attendance: Option<&Attendance>,
    settings: &OrganizationSettings,
    calculator: &dyn TaxCalculator,
) -> Result<PayslipRecord, EngineError> {
    let totals = match attendance {
        Some(attendance) => {
            let mut draft = AssignmentDraft::from_assignment(assignment, *attendance)?;
            draft.apply(AssignmentEdit::AttendanceChanged {
                attendance: *attendance,
            })?
        }
        None => assignment.totals(),
    };

    let gross = assignment.basic_amount + totals.total_earnings;
    let tax = if settings.enable_tax_management {
        calculator.calculate(&assignment.employee_id, gross)
    } else {
        0.0
    };
    let deductions = totals.total_deductions + tax;

    Ok(PayslipRecord {
        employee_id: assignment.employee_id.clone(),
        month: period.month,
        year: period.year,
        gross_salary: round_currency(gross),
        total_deductions: round_currency(deductions),
        net_salary: round_currency(gross - deductions),
        status: PayslipStatus::Pending,
    })
}

/// Generates payslips for every employee with a current assignment.
pub fn run_payroll(
    input: &PayRunInput,
    settings: &OrganizationSettings,
    calculator: &dyn TaxCalculator,
) -> Result<PayRunResult, EngineError> {
    input.period.validate()?;
    let period = input.period;

    let current = select_current(&input.assignments);
    let mut skipped: Vec<SkippedEmployee> = input
        .assignments
        .iter()
        .filter(|assignment| !current.contains_key(assignment.employee_id.as_str()))
        .map(|assignment| assignment.employee_id.as_str())
        .collect::<std::collections::BTreeSet<_>>()
        .into_iter()
        .map(|employee_id| SkippedEmployee {
            employee_id: employee_id.to_string(),
            reason: "no current salary assignment".to_string(),
        })
        .collect();

    let outcomes: Vec<Result<PayslipRecord, SkippedEmployee>> = current
        .into_iter()
        .collect::<Vec<_>>()
        .into_par_iter()
        .map(|(employee_id, assignment)| {
            payslip(
                period,
                assignment,
                input.attendance.get(employee_id),
                settings,
                calculator,
            )
            .map_err(|err| SkippedEmployee {
                employee_id: employee_id.to_string(),
                reason: err.to_string(),
            })
        })
        .collect();

    let mut payslips = Vec::with_capacity(outcomes.len());
    for outcome in outcomes {
        match outcome {
            Ok(record) => payslips.push(record),
            Err(skip) => skipped.push(skip),
        }
    }
    payslips.sort_by(|a, b| a.employee_id.cmp(&b.employee_id));
    skipped.sort_by(|a, b| a.employee_id.cmp(&b.employee_id));

    for skip in &skipped {
        tracing::warn!(employee_id = %skip.employee_id, reason = %skip.reason, "employee skipped in pay run");
    }
    tracing::info!(
        month = period.month,
        year = period.year,
        payslips = payslips.len(),
        skipped = skipped.len(),
        tax = calculator.name(),
        "pay run completed"
    );
    Ok(PayRunResult {
        period,
        payslips,
        skipped,
    })
}
