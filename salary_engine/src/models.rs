//! Data models for the Salary Engine.
//!
//! The `models` module defines the serialisable structs and enums
//! describing salary components, structures, evaluated assignments
//! and payslips.  They derive `Serialize` and `Deserialize` so they
//! can be exchanged with the payroll backend as JSON.  Monetary
//! fields coming from the backend go through the lenient parsers in
//! [`crate::wire`], so a malformed amount degrades to zero instead of
//! failing the whole payload.

use crate::aggregator;
use crate::error::EngineError;
use crate::wire::{lenient_f64, lenient_id, lenient_opt_f64};
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

/// Reference code that always resolves to the employee's basic
/// amount, whether or not a component with that code exists.
pub const BASIC_SENTINEL: &str = "BASIC";

pub type ComponentId = u64;
pub type StructureId = u64;

/// Rounds a monetary value to cent precision.
pub fn round_currency(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Whether a component adds to or subtracts from pay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentType {
    Earning,
    Deduction,
}

/// The rule used to turn a component definition into an amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalculationType {
    /// The resolved amount, unconditionally.
    Fixed,
    /// A percentage of the basic amount or of another component.
    Percentage,
    /// The resolved amount scaled by present days over working days.
    #[serde(alias = "attendanceProrated")]
    AttendanceProrated,
    /// The resolved amount for every day present.
    #[serde(alias = "perDay")]
    PerDay,
}

/// A salary component as configured by an administrator.
///
/// Exactly one of `amount` and `percentage_value` is meaningful,
/// depending on `calculation_type`; the other is ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalaryComponentDefinition {
    /// Assigned by the catalog; zero in payloads that create a
    /// component.
    #[serde(default)]
    pub id: ComponentId,
    pub name: String,
    /// Short symbolic identifier such as `"HRA"`.  Unique within a
    /// catalog, compared case-insensitively.
    pub code: String,
    pub component_type: ComponentType,
    pub calculation_type: CalculationType,
    #[serde(
        default,
        deserialize_with = "lenient_opt_f64",
        skip_serializing_if = "Option::is_none"
    )]
    pub amount: Option<f64>,
    /// Code of the component the percentage applies to.  Absent or
    /// [`BASIC_SENTINEL`] means the basic amount.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percentage_of: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_opt_f64",
        skip_serializing_if = "Option::is_none"
    )]
    pub percentage_value: Option<f64>,
    #[serde(default)]
    pub description: String,
}

impl SalaryComponentDefinition {
    fn bare(
        code: &str,
        name: &str,
        component_type: ComponentType,
        calculation_type: CalculationType,
    ) -> Self {
        Self {
            id: 0,
            name: name.to_string(),
            code: code.to_string(),
            component_type,
            calculation_type,
            amount: None,
            percentage_of: None,
            percentage_value: None,
            description: String::new(),
        }
    }

    pub fn fixed(code: &str, name: &str, component_type: ComponentType, amount: f64) -> Self {
        Self {
            amount: Some(amount),
            ..Self::bare(code, name, component_type, CalculationType::Fixed)
        }
    }

    pub fn percentage(
        code: &str,
        name: &str,
        component_type: ComponentType,
        percentage: f64,
        percentage_of: &str,
    ) -> Self {
        Self {
            percentage_value: Some(percentage),
            percentage_of: Some(percentage_of.to_string()),
            ..Self::bare(code, name, component_type, CalculationType::Percentage)
        }
    }

    pub fn attendance_prorated(
        code: &str,
        name: &str,
        component_type: ComponentType,
        amount: f64,
    ) -> Self {
        Self {
            amount: Some(amount),
            ..Self::bare(code, name, component_type, CalculationType::AttendanceProrated)
        }
    }

    pub fn per_day(code: &str, name: &str, component_type: ComponentType, amount: f64) -> Self {
        Self {
            amount: Some(amount),
            ..Self::bare(code, name, component_type, CalculationType::PerDay)
        }
    }
}

/// One entry of a structure: a component reference plus optional
/// per-structure overrides.  An override only takes effect when it
/// is present and greater than zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructureComponent {
    pub component_id: ComponentId,
    #[serde(
        default,
        deserialize_with = "lenient_opt_f64",
        skip_serializing_if = "Option::is_none"
    )]
    pub amount: Option<f64>,
    #[serde(
        default,
        deserialize_with = "lenient_opt_f64",
        skip_serializing_if = "Option::is_none"
    )]
    pub percentage: Option<f64>,
}

impl StructureComponent {
    pub fn new(component_id: ComponentId) -> Self {
        Self {
            component_id,
            amount: None,
            percentage: None,
        }
    }
}

/// A named, ordered bundle of components that can be assigned to
/// employees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalaryStructure {
    #[serde(default)]
    pub id: StructureId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Only active structures may be assigned.
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub components: Vec<StructureComponent>,
}

fn default_true() -> bool {
    true
}

/// Attendance figures for one employee over one period.  Supplied
/// by the attendance system; this crate never derives them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Attendance {
    #[serde(default, deserialize_with = "lenient_f64")]
    pub present_days: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub working_days: f64,
}

impl Attendance {
    pub fn new(present_days: f64, working_days: f64) -> Self {
        Self {
            present_days,
            working_days,
        }
    }

    /// Full attendance over `working_days`.
    pub fn full(working_days: f64) -> Self {
        Self::new(working_days, working_days)
    }
}

/// The effective rule of a component after applying the structure
/// override.  Kept on every evaluated component so it can be
/// recomputed without going back to the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedRule {
    #[serde(default, deserialize_with = "lenient_f64")]
    pub amount: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub percentage: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percentage_of: Option<String>,
}

impl ResolvedRule {
    /// The component code this rule's percentage applies to, or
    /// `None` when it applies to the basic amount.
    pub fn base_reference(&self) -> Option<&str> {
        self.percentage_of
            .as_deref()
            .map(str::trim)
            .filter(|code| !code.is_empty() && !code.eq_ignore_ascii_case(BASIC_SENTINEL))
    }
}

/// Where an evaluated amount came from.
///
/// `Auto` amounts follow the component's rule and are recomputed as
/// inputs change.  `Manual` amounts were typed in by a person and
/// stay put until an explicit reset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "mode", content = "amount", rename_all = "lowercase")]
pub enum ComponentValue {
    Auto(f64),
    Manual(f64),
}

#[derive(Deserialize)]
#[serde(rename_all = "lowercase")]
enum ValueMode {
    Auto,
    Manual,
}

#[derive(Deserialize)]
struct ValueRepr {
    mode: ValueMode,
    #[serde(default, deserialize_with = "lenient_f64")]
    amount: f64,
}

impl<'de> Deserialize<'de> for ComponentValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let ValueRepr { mode, amount } = ValueRepr::deserialize(deserializer)?;
        Ok(match mode {
            ValueMode::Auto => ComponentValue::Auto(amount),
            ValueMode::Manual => ComponentValue::Manual(amount),
        })
    }
}

impl ComponentValue {
    pub fn amount(&self) -> f64 {
        match *self {
            ComponentValue::Auto(amount) | ComponentValue::Manual(amount) => amount,
        }
    }

    pub fn is_manual(&self) -> bool {
        matches!(self, ComponentValue::Manual(_))
    }
}

/// A component evaluated for one employee at one point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluatedComponent {
    pub component_id: ComponentId,
    pub code: String,
    pub name: String,
    pub component_type: ComponentType,
    pub calculation_type: CalculationType,
    pub rule: ResolvedRule,
    pub value: ComponentValue,
}

impl EvaluatedComponent {
    pub fn auto(definition: &SalaryComponentDefinition, rule: ResolvedRule, amount: f64) -> Self {
        Self {
            component_id: definition.id,
            code: definition.code.clone(),
            name: definition.name.clone(),
            component_type: definition.component_type,
            calculation_type: definition.calculation_type,
            rule,
            value: ComponentValue::Auto(amount),
        }
    }

    /// Full-precision amount.
    pub fn amount(&self) -> f64 {
        self.value.amount()
    }

    /// Amount rounded to cents, for display.
    pub fn display_amount(&self) -> f64 {
        round_currency(self.amount())
    }

    pub fn is_manual(&self) -> bool {
        self.value.is_manual()
    }

    /// True for components that follow the basic amount: automatic,
    /// percentage based, with a non-zero percentage.
    pub fn tracks_percentage(&self) -> bool {
        !self.is_manual()
            && self.calculation_type == CalculationType::Percentage
            && self.rule.percentage != 0.0
    }

    /// True for automatic components whose amount depends on
    /// attendance.
    pub fn tracks_attendance(&self) -> bool {
        !self.is_manual()
            && matches!(
                self.calculation_type,
                CalculationType::AttendanceProrated | CalculationType::PerDay
            )
    }
}

/// The headline figures of an assignment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AssignmentTotals {
    pub total_earnings: f64,
    pub total_deductions: f64,
    pub net_salary: f64,
}

/// A structure assigned to an employee with a given basic amount,
/// as persisted by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalaryAssignment {
    #[serde(deserialize_with = "lenient_id")]
    pub employee_id: String,
    pub structure_id: StructureId,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub basic_amount: f64,
    pub effective_from: NaiveDate,
    /// At most one assignment per employee is expected to be current.
    /// This is a convention, not an enforced invariant.
    #[serde(default)]
    pub is_current: bool,
    /// Snapshot of the evaluated components at save time.
    #[serde(default)]
    pub components: Vec<EvaluatedComponent>,
}

impl SalaryAssignment {
    pub fn totals(&self) -> AssignmentTotals {
        aggregator::aggregate(self.basic_amount, &self.components)
    }
}

/// A calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PayPeriod {
    pub month: u32,
    pub year: i32,
}

impl PayPeriod {
    pub fn new(month: u32, year: i32) -> Result<Self, EngineError> {
        let period = Self { month, year };
        period.validate()?;
        Ok(period)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if (1..=12).contains(&self.month) {
            Ok(())
        } else {
            Err(EngineError::InvalidPeriod {
                month: self.month,
                year: self.year,
            })
        }
    }

    pub fn contains(&self, record: &PayslipRecord) -> bool {
        record.month == self.month && record.year == self.year
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayslipStatus {
    Paid,
    #[default]
    Pending,
    Draft,
    #[serde(other)]
    Other,
}

/// A payslip for one employee and one month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayslipRecord {
    #[serde(deserialize_with = "lenient_id")]
    pub employee_id: String,
    pub month: u32,
    pub year: i32,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub gross_salary: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub total_deductions: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub net_salary: f64,
    #[serde(default)]
    pub status: PayslipStatus,
}

/// Dashboard totals for a set of payslips.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PayslipSummary {
    pub total_employees: usize,
    pub total_gross: f64,
    pub total_deductions: f64,
    pub total_net: f64,
    pub paid_count: usize,
    pub pending_count: usize,
}
