//! Assignment totals and the editable assignment draft.
//!
//! [`aggregate`] is the pure part: basic amount plus evaluated
//! components in, earnings/deductions/net out.  [`AssignmentDraft`]
//! holds the state behind the assignment form and funnels every
//! change through [`AssignmentDraft::apply`], so a basic-amount edit
//! and a manual component edit are always applied one after the
//! other in the order they were received.
//!
//! Editing the basic amount only recomputes automatic percentage
//! components.  Fixed components and anything a person typed in stay
//! as they are until [`AssignmentEdit::ResetAutoCalc`].

use crate::catalog::ComponentCatalog;
use crate::error::EngineError;
use crate::evaluator::{self, EvaluationPlan, ValidationWarning};
use crate::models::{
    round_currency, AssignmentTotals, Attendance, ComponentType, ComponentValue,
    EvaluatedComponent, SalaryAssignment, SalaryStructure, StructureId,
};
use crate::wire::lenient_f64;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Computes the headline figures of an assignment.  Sums are kept at
/// full precision and rounded to cents once at the end.
pub fn aggregate(basic_amount: f64, components: &[EvaluatedComponent]) -> AssignmentTotals {
    let (earnings, deductions) =
        components
            .iter()
            .fold((0.0, 0.0), |(earnings, deductions), component| {
                match component.component_type {
                    ComponentType::Earning => (earnings + component.amount(), deductions),
                    ComponentType::Deduction => (earnings, deductions + component.amount()),
                }
            });
    AssignmentTotals {
        total_earnings: round_currency(earnings),
        total_deductions: round_currency(deductions),
        net_salary: round_currency(basic_amount + earnings - deductions),
    }
}

/// A single change to an assignment draft.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AssignmentEdit {
    BasicAmountChanged {
        #[serde(default, deserialize_with = "lenient_f64")]
        amount: f64,
    },
    ComponentEdited {
        code: String,
        #[serde(default, deserialize_with = "lenient_f64")]
        amount: f64,
    },
    AttendanceChanged {
        attendance: Attendance,
    },
    ResetAutoCalc,
}

/// The working state of an assignment being edited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignmentDraft {
    #[serde(default, deserialize_with = "lenient_f64")]
    basic_amount: f64,
    attendance: Attendance,
    components: Vec<EvaluatedComponent>,
}

impl AssignmentDraft {
    /// Wraps already evaluated components.  Fails if their
    /// percentage references form a cycle.
    pub fn new(
        basic_amount: f64,
        attendance: Attendance,
        components: Vec<EvaluatedComponent>,
    ) -> Result<Self, EngineError> {
        EvaluationPlan::build(&components)?;
        Ok(Self {
            basic_amount,
            attendance,
            components,
        })
    }

    /// Starts a draft from a structure selection.
    pub fn from_structure(
        catalog: &ComponentCatalog,
        structure: &SalaryStructure,
        basic_amount: f64,
        attendance: Attendance,
    ) -> Result<(Self, Vec<ValidationWarning>), EngineError> {
        let evaluation =
            evaluator::evaluate_structure(catalog, structure, basic_amount, &attendance)?;
        let draft = Self {
            basic_amount,
            attendance,
            components: evaluation.components,
        };
        Ok((draft, evaluation.warnings))
    }

    /// Resumes editing a persisted assignment.
    pub fn from_assignment(
        assignment: &SalaryAssignment,
        attendance: Attendance,
    ) -> Result<Self, EngineError> {
        Self::new(
            assignment.basic_amount,
            attendance,
            assignment.components.clone(),
        )
    }

    pub fn basic_amount(&self) -> f64 {
        self.basic_amount
    }

    pub fn attendance(&self) -> &Attendance {
        &self.attendance
    }

    pub fn components(&self) -> &[EvaluatedComponent] {
        &self.components
    }

    pub fn component(&self, code: &str) -> Option<&EvaluatedComponent> {
        self.components
            .iter()
            .find(|component| component.code.eq_ignore_ascii_case(code))
    }

    pub fn totals(&self) -> AssignmentTotals {
        aggregate(self.basic_amount, &self.components)
    }

    /// Applies one edit and returns the new totals.
    pub fn apply(&mut self, edit: AssignmentEdit) -> Result<AssignmentTotals, EngineError> {
        tracing::debug!(?edit, "applying assignment edit");
        match edit {
            AssignmentEdit::BasicAmountChanged { amount } => {
                self.basic_amount = amount;
                self.recompute(EvaluatedComponent::tracks_percentage)?;
            }
            AssignmentEdit::ComponentEdited { code, amount } => {
                let component = self
                    .components
                    .iter_mut()
                    .find(|component| component.code.eq_ignore_ascii_case(&code))
                    .ok_or(EngineError::UnknownComponentCode { code })?;
                component.value = ComponentValue::Manual(amount);
                // Automatic percentages of other components follow the edit.
                self.recompute(tracks_component)?;
            }
            AssignmentEdit::AttendanceChanged { attendance } => {
                self.attendance = attendance;
                self.recompute(|component| {
                    component.tracks_attendance() || tracks_component(component)
                })?;
            }
            AssignmentEdit::ResetAutoCalc => {
                self.recompute(|_| true)?;
            }
        }
        Ok(self.totals())
    }

    fn recompute<F>(&mut self, should_update: F) -> Result<(), EngineError>
    where
        F: FnMut(&EvaluatedComponent) -> bool,
    {
        let plan = EvaluationPlan::build(&self.components)?;
        plan.apply(
            &mut self.components,
            self.basic_amount,
            &self.attendance,
            should_update,
        );
        Ok(())
    }

    /// Snapshots the draft into an assignment ready to persist.
    pub fn into_assignment(
        self,
        employee_id: impl Into<String>,
        structure_id: StructureId,
        effective_from: NaiveDate,
        is_current: bool,
    ) -> SalaryAssignment {
        SalaryAssignment {
            employee_id: employee_id.into(),
            structure_id,
            basic_amount: self.basic_amount,
            effective_from,
            is_current,
            components: self.components,
        }
    }
}

/// Automatic percentages of another component rather than of the
/// basic amount.
fn tracks_component(component: &EvaluatedComponent) -> bool {
    component.tracks_percentage() && component.rule.base_reference().is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::resolve_rule;
    use crate::models::ComponentType::{Deduction, Earning};
    use crate::models::SalaryComponentDefinition;

    fn auto(definition: SalaryComponentDefinition) -> EvaluatedComponent {
        let rule = resolve_rule(&definition, None);
        EvaluatedComponent::auto(&definition, rule, 0.0)
    }

    fn draft(basic: f64) -> AssignmentDraft {
        let mut draft = AssignmentDraft::new(
            basic,
            Attendance::new(22.0, 22.0),
            vec![
                auto(SalaryComponentDefinition::fixed("CONV", "Conveyance", Earning, 800.0)),
                auto(SalaryComponentDefinition::percentage("HRA", "HRA", Earning, 40.0, "BASIC")),
                auto(SalaryComponentDefinition::percentage("PF", "PF", Deduction, 12.0, "BASIC")),
                auto(SalaryComponentDefinition::per_day("MEAL", "Meals", Earning, 10.0)),
            ],
        )
        .unwrap();
        draft.apply(AssignmentEdit::ResetAutoCalc).unwrap();
        draft
    }

    #[test]
    fn aggregate_of_nothing_is_the_basic_amount() {
        let totals = aggregate(4200.0, &[]);
        assert_eq!(totals.total_earnings, 0.0);
        assert_eq!(totals.total_deductions, 0.0);
        assert_eq!(totals.net_salary, 4200.0);
    }

    #[test]
    fn aggregate_is_idempotent() {
        let draft = draft(5000.0);
        let first = aggregate(draft.basic_amount(), draft.components());
        let second = aggregate(draft.basic_amount(), draft.components());
        assert_eq!(first, second);
        assert_eq!(first.total_earnings, 800.0 + 2000.0 + 220.0);
        assert_eq!(first.total_deductions, 600.0);
        assert_eq!(first.net_salary, 5000.0 + 3020.0 - 600.0);
    }

    #[test]
    fn basic_change_only_moves_automatic_percentages() {
        let mut draft = draft(5000.0);
        draft
            .apply(AssignmentEdit::ComponentEdited {
                code: "conv".into(),
                amount: 500.0,
            })
            .unwrap();
        draft
            .apply(AssignmentEdit::BasicAmountChanged { amount: 10000.0 })
            .unwrap();

        assert_eq!(draft.component("CONV").unwrap().value, ComponentValue::Manual(500.0));
        assert_eq!(draft.component("HRA").unwrap().amount(), 4000.0);
        assert_eq!(draft.component("PF").unwrap().amount(), 1200.0);
        assert_eq!(draft.component("MEAL").unwrap().amount(), 220.0);
    }

    #[test]
    fn attendance_change_moves_only_attendance_components() {
        let mut draft = draft(5000.0);
        draft
            .apply(AssignmentEdit::AttendanceChanged {
                attendance: Attendance::new(11.0, 22.0),
            })
            .unwrap();
        assert_eq!(draft.component("MEAL").unwrap().amount(), 110.0);
        assert_eq!(draft.component("HRA").unwrap().amount(), 2000.0);
    }

    #[test]
    fn editing_an_unknown_code_fails() {
        let mut draft = draft(5000.0);
        let err = draft
            .apply(AssignmentEdit::ComponentEdited {
                code: "NOPE".into(),
                amount: 1.0,
            })
            .unwrap_err();
        assert!(matches!(err, EngineError::UnknownComponentCode { code } if code == "NOPE"));
    }

    #[test]
    fn manual_edit_flows_into_chained_percentage() {
        let mut draft = AssignmentDraft::new(
            5000.0,
            Attendance::full(22.0),
            vec![
                auto(SalaryComponentDefinition::percentage("HRA", "HRA", Earning, 40.0, "BASIC")),
                auto(SalaryComponentDefinition::percentage("HRA_TAX", "HRA tax", Deduction, 10.0, "HRA")),
            ],
        )
        .unwrap();
        draft.apply(AssignmentEdit::ResetAutoCalc).unwrap();
        assert_eq!(draft.component("HRA_TAX").unwrap().amount(), 200.0);

        draft
            .apply(AssignmentEdit::ComponentEdited {
                code: "HRA".into(),
                amount: 1500.0,
            })
            .unwrap();
        assert_eq!(draft.component("HRA_TAX").unwrap().amount(), 150.0);
    }

    #[test]
    fn attendance_change_flows_into_percentage_of_prorated_component() {
        let components = vec![
            auto(SalaryComponentDefinition::attendance_prorated("TA", "Transport", Earning, 1000.0)),
            auto(SalaryComponentDefinition::percentage("ESI", "ESI", Deduction, 10.0, "TA")),
        ];
        let mut draft =
            AssignmentDraft::new(5000.0, Attendance::full(20.0), components.clone()).unwrap();
        draft.apply(AssignmentEdit::ResetAutoCalc).unwrap();
        assert_eq!(draft.component("ESI").unwrap().amount(), 100.0);

        let half = Attendance::new(10.0, 20.0);
        draft
            .apply(AssignmentEdit::AttendanceChanged { attendance: half })
            .unwrap();

        let mut fresh = AssignmentDraft::new(5000.0, half, components).unwrap();
        fresh.apply(AssignmentEdit::ResetAutoCalc).unwrap();
        assert_eq!(draft.component("TA").unwrap().amount(), 500.0);
        assert_eq!(draft.component("ESI").unwrap().amount(), 50.0);
        assert_eq!(draft.totals(), fresh.totals());
    }

    #[test]
    fn snapshot_keeps_manual_flags_and_totals() {
        let mut draft = draft(5000.0);
        draft
            .apply(AssignmentEdit::ComponentEdited {
                code: "HRA".into(),
                amount: 1999.999,
            })
            .unwrap();
        let expected = draft.totals();
        let assignment = draft.into_assignment(
            "E-17",
            3,
            NaiveDate::from_ymd_opt(2025, 4, 1).unwrap(),
            true,
        );
        assert_eq!(assignment.totals(), expected);
        let hra = assignment
            .components
            .iter()
            .find(|component| component.code == "HRA")
            .unwrap();
        assert!(hra.is_manual());
        assert_eq!(hra.display_amount(), 2000.0);
    }

    #[test]
    fn edits_deserialize_from_tagged_json() {
        let edit: AssignmentEdit = serde_json::from_str(
            r#"{"type": "component_edited", "code": "HRA", "amount": "1500.00"}"#,
        )
        .unwrap();
        assert_eq!(
            edit,
            AssignmentEdit::ComponentEdited {
                code: "HRA".into(),
                amount: 1500.0
            }
        );
        let reset: AssignmentEdit = serde_json::from_str(r#"{"type": "reset_auto_calc"}"#).unwrap();
        assert_eq!(reset, AssignmentEdit::ResetAutoCalc);
    }
}
