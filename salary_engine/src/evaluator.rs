//! Salary component evaluation.
//!
//! The `evaluator` module turns component definitions into amounts.
//! A single definition is evaluated with [`evaluate`]; a whole
//! structure is evaluated with [`evaluate_structure`], which also
//! resolves percentages that refer to other components of the same
//! structure.  Such references are evaluated in dependency order and
//! a cycle between them is reported as a configuration error.
//!
//! Missing amounts and percentages are treated as zero.  They are
//! reported as [`ValidationWarning`]s so callers can show them, but
//! they never stop an evaluation.

use crate::catalog::ComponentCatalog;
use crate::error::EngineError;
use crate::models::{
    Attendance, CalculationType, ComponentValue, EvaluatedComponent, ResolvedRule,
    SalaryComponentDefinition, SalaryStructure, StructureComponent,
};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

/// A non-fatal problem found while evaluating or auditing components.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationWarning {
    MissingAmount { code: String },
    MissingPercentage { code: String },
    UnresolvedReference { code: String, reference: String },
    NoWorkingDays { code: String },
    UnknownComponent { structure: String, component_id: u64 },
    PercentageCycle { structure: String, chain: Vec<String> },
}

impl fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationWarning::MissingAmount { code } => {
                write!(f, "{code}: no amount configured, using 0")
            }
            ValidationWarning::MissingPercentage { code } => {
                write!(f, "{code}: no percentage configured, using 0%")
            }
            ValidationWarning::UnresolvedReference { code, reference } => write!(
                f,
                "{code}: percentage refers to '{reference}', which is not in the structure"
            ),
            ValidationWarning::NoWorkingDays { code } => {
                write!(f, "{code}: period has no working days, prorated amount is 0")
            }
            ValidationWarning::UnknownComponent {
                structure,
                component_id,
            } => write!(
                f,
                "structure '{structure}' references missing component {component_id}"
            ),
            ValidationWarning::PercentageCycle { structure, chain } => write!(
                f,
                "structure '{structure}' has a percentage cycle: {}",
                chain.join(" -> ")
            ),
        }
    }
}

/// The evaluated components of a structure plus anything worth
/// telling the user about.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StructureEvaluation {
    pub components: Vec<EvaluatedComponent>,
    pub warnings: Vec<ValidationWarning>,
}

fn override_amount(
    definition: &SalaryComponentDefinition,
    override_: Option<&StructureComponent>,
) -> Option<f64> {
    override_
        .and_then(|entry| entry.amount)
        .filter(|amount| *amount > 0.0)
        .or(definition.amount)
}

fn override_percentage(
    definition: &SalaryComponentDefinition,
    override_: Option<&StructureComponent>,
) -> Option<f64> {
    override_
        .and_then(|entry| entry.percentage)
        .filter(|percentage| *percentage > 0.0)
        .or(definition.percentage_value)
}

/// Applies a structure override on top of a definition.  Override
/// values win only when present and greater than zero.
pub fn resolve_rule(
    definition: &SalaryComponentDefinition,
    override_: Option<&StructureComponent>,
) -> ResolvedRule {
    ResolvedRule {
        amount: override_amount(definition, override_).unwrap_or(0.0),
        percentage: override_percentage(definition, override_).unwrap_or(0.0),
        percentage_of: definition.percentage_of.clone(),
    }
}

/// Computes the raw amount of a rule.  `base` is what a percentage
/// applies to.  Full precision; round only for display.
pub fn compute(
    calculation_type: CalculationType,
    rule: &ResolvedRule,
    base: f64,
    attendance: &Attendance,
) -> f64 {
    match calculation_type {
        CalculationType::Fixed => rule.amount,
        CalculationType::Percentage => base * rule.percentage / 100.0,
        CalculationType::AttendanceProrated => {
            if attendance.working_days > 0.0 {
                rule.amount * attendance.present_days / attendance.working_days
            } else {
                0.0
            }
        }
        CalculationType::PerDay => rule.amount * attendance.present_days,
    }
}

/// Evaluates one component against the basic amount.
pub fn evaluate(
    definition: &SalaryComponentDefinition,
    override_: Option<&StructureComponent>,
    basic_amount: f64,
    attendance: &Attendance,
) -> EvaluatedComponent {
    let rule = resolve_rule(definition, override_);
    let amount = compute(definition.calculation_type, &rule, basic_amount, attendance);
    EvaluatedComponent::auto(definition, rule, amount)
}

/// Lists the values a definition needs but does not have.
pub fn rule_warnings(
    definition: &SalaryComponentDefinition,
    override_: Option<&StructureComponent>,
    attendance: &Attendance,
) -> Vec<ValidationWarning> {
    let code = definition.code.clone();
    let mut warnings = Vec::new();
    match definition.calculation_type {
        CalculationType::Percentage => {
            if override_percentage(definition, override_).is_none() {
                warnings.push(ValidationWarning::MissingPercentage { code });
            }
        }
        CalculationType::Fixed | CalculationType::PerDay => {
            if override_amount(definition, override_).is_none() {
                warnings.push(ValidationWarning::MissingAmount { code });
            }
        }
        CalculationType::AttendanceProrated => {
            if override_amount(definition, override_).is_none() {
                warnings.push(ValidationWarning::MissingAmount { code: code.clone() });
            }
            if attendance.working_days <= 0.0 {
                warnings.push(ValidationWarning::NoWorkingDays { code });
            }
        }
    }
    warnings
}

/// Evaluates every component of an active structure, in structure
/// order.
pub fn evaluate_structure(
    catalog: &ComponentCatalog,
    structure: &SalaryStructure,
    basic_amount: f64,
    attendance: &Attendance,
) -> Result<StructureEvaluation, EngineError> {
    if !structure.is_active {
        return Err(EngineError::InactiveStructure { id: structure.id });
    }

    let mut warnings = Vec::new();
    let mut components = Vec::with_capacity(structure.components.len());
    for entry in &structure.components {
        let definition = catalog
            .component(entry.component_id)
            .ok_or(EngineError::UnknownComponent {
                id: entry.component_id,
            })?;
        warnings.extend(rule_warnings(definition, Some(entry), attendance));
        components.push(EvaluatedComponent::auto(
            definition,
            resolve_rule(definition, Some(entry)),
            0.0,
        ));
    }

    let plan = EvaluationPlan::build(&components)?;
    warnings.extend(plan.unresolved_references(&components));
    plan.apply(&mut components, basic_amount, attendance, |_| true);

    for warning in &warnings {
        tracing::debug!(structure = %structure.name, %warning, "evaluation warning");
    }
    Ok(StructureEvaluation {
        components,
        warnings,
    })
}

/// Checks a structure's configuration without evaluating amounts.
pub fn audit_structure(
    catalog: &ComponentCatalog,
    structure: &SalaryStructure,
) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();
    let mut components = Vec::with_capacity(structure.components.len());
    for entry in &structure.components {
        match catalog.component(entry.component_id) {
            Some(definition) => components.push(EvaluatedComponent::auto(
                definition,
                resolve_rule(definition, Some(entry)),
                0.0,
            )),
            None => warnings.push(ValidationWarning::UnknownComponent {
                structure: structure.name.clone(),
                component_id: entry.component_id,
            }),
        }
    }

    match EvaluationPlan::build(&components) {
        Ok(plan) => warnings.extend(plan.unresolved_references(&components)),
        Err(EngineError::PercentageCycle { chain }) => {
            warnings.push(ValidationWarning::PercentageCycle {
                structure: structure.name.clone(),
                chain,
            })
        }
        Err(_) => {}
    }
    warnings
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Base {
    Basic,
    Component(usize),
    Unresolved,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Mark {
    New,
    Active,
    Done,
}

/// Evaluation order for a list of components: every percentage
/// component comes after the component its percentage applies to.
#[derive(Debug)]
pub(crate) struct EvaluationPlan {
    order: Vec<usize>,
    bases: Vec<Base>,
}

impl EvaluationPlan {
    pub(crate) fn build(components: &[EvaluatedComponent]) -> Result<Self, EngineError> {
        // A repeated code resolves to its first entry, the same one a
        // manual edit by code lands on.
        let mut index: HashMap<String, usize> = HashMap::with_capacity(components.len());
        for (position, component) in components.iter().enumerate() {
            index
                .entry(component.code.to_ascii_uppercase())
                .or_insert(position);
        }

        let bases: Vec<Base> = components
            .iter()
            .map(|component| {
                if component.calculation_type != CalculationType::Percentage {
                    return Base::Basic;
                }
                match component.rule.base_reference() {
                    None => Base::Basic,
                    Some(code) => index
                        .get(&code.to_ascii_uppercase())
                        .map_or(Base::Unresolved, |&position| Base::Component(position)),
                }
            })
            .collect();

        // Each component depends on at most one other, so a walk along
        // the reference chain is enough to order them.
        let mut marks = vec![Mark::New; components.len()];
        let mut order = Vec::with_capacity(components.len());
        for start in 0..components.len() {
            let mut path = Vec::new();
            let mut cursor = Some(start);
            while let Some(position) = cursor {
                match marks[position] {
                    Mark::Done => break,
                    Mark::Active => {
                        let begin = path.iter().position(|&p| p == position).unwrap_or(0);
                        let mut chain: Vec<String> = path[begin..]
                            .iter()
                            .map(|&p: &usize| components[p].code.clone())
                            .collect();
                        chain.push(components[position].code.clone());
                        return Err(EngineError::PercentageCycle { chain });
                    }
                    Mark::New => {
                        marks[position] = Mark::Active;
                        path.push(position);
                        cursor = match bases[position] {
                            Base::Component(dependency) => Some(dependency),
                            Base::Basic | Base::Unresolved => None,
                        };
                    }
                }
            }
            for &position in path.iter().rev() {
                marks[position] = Mark::Done;
                order.push(position);
            }
        }

        Ok(Self { order, bases })
    }

    pub(crate) fn unresolved_references(
        &self,
        components: &[EvaluatedComponent],
    ) -> Vec<ValidationWarning> {
        components
            .iter()
            .zip(&self.bases)
            .filter(|(_, base)| **base == Base::Unresolved)
            .map(|(component, _)| ValidationWarning::UnresolvedReference {
                code: component.code.clone(),
                reference: component.rule.base_reference().unwrap_or_default().to_string(),
            })
            .collect()
    }

    /// Recomputes, in dependency order, every component accepted by
    /// `should_update`.  Recomputed components become `Auto`.
    pub(crate) fn apply<F>(
        &self,
        components: &mut [EvaluatedComponent],
        basic_amount: f64,
        attendance: &Attendance,
        mut should_update: F,
    ) where
        F: FnMut(&EvaluatedComponent) -> bool,
    {
        for &position in &self.order {
            if !should_update(&components[position]) {
                continue;
            }
            let base = match self.bases[position] {
                Base::Basic => basic_amount,
                Base::Component(dependency) => components[dependency].amount(),
                Base::Unresolved => 0.0,
            };
            let component = &components[position];
            let amount = compute(component.calculation_type, &component.rule, base, attendance);
            components[position].value = ComponentValue::Auto(amount);
        }
    }
}
