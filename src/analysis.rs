//! Compatibility analysis
//!
//! Decides, for every pair of interpreted launch files, under which
//! condition both can run at the same time without two of their nodes (or,
//! optionally, parameters) claiming the same name.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, warn};

use crate::logic::{LogicValue, LogicVariable, NamingContext, VariableData};
use crate::models::{LaunchModel, Parameter, ProcessEntity};
use crate::names::RosName;

/// Interpreted launch files by path
pub type LaunchData = BTreeMap<String, LaunchModel>;

/// For each file, the condition under which it is compatible with each
/// other file
pub type CompatibilityMap = BTreeMap<String, BTreeMap<String, LogicValue>>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnalysisOptions {
    /// Parameters with the same name also clash, unless their values agree
    pub params_collide: bool,
}

/// Something that occupies a name while its condition holds
pub trait Resource {
    fn name(&self) -> &RosName;

    fn condition(&self) -> &LogicValue;
}

impl Resource for ProcessEntity {
    fn name(&self) -> &RosName {
        &self.name
    }

    fn condition(&self) -> &LogicValue {
        &self.condition
    }
}

impl Resource for Parameter {
    fn name(&self) -> &RosName {
        &self.name
    }

    fn condition(&self) -> &LogicValue {
        &self.condition
    }
}

/// Files that no other file in `files` includes
pub fn filter_top_level_files(files: &LaunchData) -> LaunchData {
    let included: BTreeSet<String> = files
        .values()
        .flat_map(|model| model.included_files.iter())
        .map(|path| path.display().to_string())
        .collect();
    files
        .iter()
        .filter(|(file, _)| !included.contains(*file))
        .map(|(file, model)| (file.clone(), model.clone()))
        .collect()
}

/// Pairwise compatibility of `files`. A file is never compatible with
/// itself.
pub fn list_compatible_files(
    files: &LaunchData,
    options: &AnalysisOptions,
    naming: &mut NamingContext,
) -> CompatibilityMap {
    let mut compatibility: CompatibilityMap = files
        .keys()
        .map(|file| {
            let row = files
                .keys()
                .map(|other| (other.clone(), LogicValue::from(file != other)))
                .collect();
            (file.clone(), row)
        })
        .collect();

    let entries: Vec<(&String, &LaunchModel)> = files.iter().collect();
    for (i, (file, model)) in entries.iter().enumerate() {
        for (other_file, other) in &entries[i + 1..] {
            let condition = compatible_condition(model, other, options, naming);
            debug!("{} / {}: {}", file, other_file, condition);
            if let Some(row) = compatibility.get_mut(*file) {
                row.insert((*other_file).clone(), condition.clone());
            }
            if let Some(row) = compatibility.get_mut(*other_file) {
                row.insert((*file).clone(), condition);
            }
        }
    }
    compatibility
}

fn compatible_condition(
    model: &LaunchModel,
    other: &LaunchModel,
    options: &AnalysisOptions,
    naming: &mut NamingContext,
) -> LogicValue {
    let nodes = resource_compatibility(&model.nodes, &other.nodes, naming, |_, _, _| {
        LogicValue::True
    });
    if nodes.is_false() || !options.params_collide {
        return nodes;
    }
    let params = resource_compatibility(
        &model.parameters,
        &other.parameters,
        naming,
        param_values_clash,
    );
    if params.is_false() {
        return params;
    }
    nodes.join(params).simplify()
}

/// Condition under which no resource of `mine` clashes with one of
/// `theirs`. `check` adds a further requirement for two same-named
/// resources to clash.
fn resource_compatibility<R: Resource>(
    mine: &[R],
    theirs: &[R],
    naming: &mut NamingContext,
    check: impl Fn(&R, &R, &mut NamingContext) -> LogicValue,
) -> LogicValue {
    let mut compatible = LogicValue::True;
    for resource in mine.iter().filter(|r| is_not_absent(*r)) {
        for other in theirs.iter().filter(|r| is_not_absent(*r)) {
            let Some(same_name) = name_clash(resource.name(), other.name(), naming) else {
                continue;
            };
            let clashing = same_name
                .join(resource.condition().clone())
                .join(other.condition().clone())
                .join(check(resource, other, naming))
                .simplify();
            if clashing.is_true() {
                debug!("{} always clashes with {}", resource.name(), other.name());
                return LogicValue::False;
            }
            compatible = compatible.join(clashing.negate());
        }
    }
    compatible.simplify()
}

/// Condition under which two names are the same; `None` if they never are
fn name_clash(
    this: &RosName,
    other: &RosName,
    naming: &mut NamingContext,
) -> Option<LogicValue> {
    match (this.is_unknown(), other.is_unknown()) {
        (false, false) => (this == other).then_some(LogicValue::True),
        (false, true) => unknown_similar(this, other, naming),
        (true, false) => unknown_similar(other, this, naming),
        (true, true) if this == other => Some(LogicValue::True),
        (true, true) => Some(equality(this, other, naming)),
    }
}

/// Whether `unknown` could stand for the known name `name`
fn unknown_similar(
    name: &RosName,
    unknown: &RosName,
    naming: &mut NamingContext,
) -> Option<LogicValue> {
    match unknown.to_regex() {
        Ok(regex) if regex.is_match(name.full()) => Some(equality(name, unknown, naming)),
        Ok(_) => None,
        Err(err) => {
            warn!("cannot match {}: {}", unknown, err);
            Some(equality(name, unknown, naming))
        }
    }
}

fn param_values_clash(
    param: &Parameter,
    other: &Parameter,
    naming: &mut NamingContext,
) -> LogicValue {
    if param.param_type != other.param_type {
        return LogicValue::True;
    }
    match (param.value.value(), other.value.value()) {
        (Some(a), Some(b)) => LogicValue::from(a != b),
        _ => equality(&param.value, &other.value, naming).negate(),
    }
}

fn equality(
    one: &impl std::fmt::Display,
    other: &impl std::fmt::Display,
    naming: &mut NamingContext,
) -> LogicValue {
    let (left, right) = (one.to_string(), other.to_string());
    let text = format!("{} == {}", left, right);
    LogicVariable::fresh(naming, text, VariableData::Equality { left, right }).into()
}

fn is_not_absent(resource: &impl Resource) -> bool {
    !resource.condition().simplify().is_false()
}

/// Compatibility map with conditions rendered as text
pub fn render_compatibility(map: &CompatibilityMap) -> BTreeMap<String, BTreeMap<String, String>> {
    map.iter()
        .map(|(file, row)| {
            let row = row
                .iter()
                .map(|(other, condition)| (other.clone(), condition.to_string()))
                .collect();
            (file.clone(), row)
        })
        .collect()
}
