//! Dependency resolution.
//!
//! Formulas pin exact versions, so resolution is a graph walk rather than a
//! version search: collect every formula reachable through the dependencies
//! that apply on the current platform, stop at kegs that are already
//! installed, and order the result so each formula comes after everything it
//! depends on.

pub mod errors;

pub use errors::ResolveError;

use std::collections::{HashMap, HashSet, VecDeque};

use anyhow::Result;
use petgraph::algo::{kosaraju_scc, toposort};
use petgraph::graph::{DiGraph, NodeIndex};

use crate::core::dependency::DepKind;
use crate::core::formula::Formula;
use crate::core::platform::Platform;
use crate::sources::FormulaSource;

/// What the installer has to do for one plan entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepAction {
    /// Build and install from source
    Install,
    /// Already installed; nothing to do
    Satisfied,
}

/// One formula in an install plan.
#[derive(Debug, Clone)]
pub struct PlanStep {
    pub name: String,
    /// Loaded for every step that needs installing
    pub formula: Option<Formula>,
    pub action: StepAction,
    /// Runtime if any dependent needs it at runtime
    pub kind: DepKind,
    /// First formula that pulled this one in; `None` for the root
    pub required_by: Option<String>,
}

impl PlanStep {
    pub fn is_satisfied(&self) -> bool {
        self.action == StepAction::Satisfied
    }
}

/// A topologically ordered install plan. The root formula is last.
#[derive(Debug, Clone)]
pub struct InstallPlan {
    steps: Vec<PlanStep>,
}

impl InstallPlan {
    /// Every entry, dependencies before dependents.
    pub fn steps(&self) -> &[PlanStep] {
        &self.steps
    }

    /// The formula the plan was built for.
    pub fn root(&self) -> &PlanStep {
        // resolve() always pushes the root
        &self.steps[self.steps.len() - 1]
    }

    /// Dependencies only, in install order.
    pub fn dependencies(&self) -> &[PlanStep] {
        &self.steps[..self.steps.len() - 1]
    }

    /// Entries that still need installing.
    pub fn pending(&self) -> impl Iterator<Item = &PlanStep> {
        self.steps.iter().filter(|s| !s.is_satisfied())
    }

    pub fn names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Builds install plans from a formula source.
pub struct Resolver<'a, S: FormulaSource + ?Sized> {
    source: &'a S,
    platform: Platform,
    installed: HashSet<String>,
}

impl<'a, S: FormulaSource + ?Sized> Resolver<'a, S> {
    pub fn new(source: &'a S, platform: Platform) -> Self {
        Resolver {
            source,
            platform,
            installed: HashSet::new(),
        }
    }

    /// Names of kegs that are already installed.
    pub fn with_installed(mut self, installed: impl IntoIterator<Item = String>) -> Self {
        self.installed.extend(installed);
        self
    }

    /// Resolve the plan for `root`.
    ///
    /// The root is always part of the plan and always traversed, even when
    /// it is installed, so that a forced reinstall still sees its
    /// dependencies.
    pub fn resolve(&self, root: Formula) -> Result<InstallPlan> {
        let mut graph: DiGraph<String, ()> = DiGraph::new();
        let mut nodes: HashMap<String, NodeIndex> = HashMap::new();
        let mut steps: HashMap<String, PlanStep> = HashMap::new();
        let mut queue = VecDeque::new();

        let root_name = root.name.clone();
        nodes.insert(root_name.clone(), graph.add_node(root_name.clone()));
        steps.insert(
            root_name.clone(),
            PlanStep {
                name: root_name.clone(),
                action: if self.installed.contains(&root_name) {
                    StepAction::Satisfied
                } else {
                    StepAction::Install
                },
                formula: None,
                kind: DepKind::Runtime,
                required_by: None,
            },
        );
        queue.push_back(root);

        while let Some(formula) = queue.pop_front() {
            let dependent = nodes[&formula.name];

            for dep in formula.dependencies_for(&self.platform) {
                let name = dep.name();

                if let Some(&node) = nodes.get(name) {
                    graph.update_edge(node, dependent, ());
                    if let Some(step) = steps.get_mut(name) {
                        if dep.kind() == DepKind::Runtime {
                            step.kind = DepKind::Runtime;
                        }
                    }
                    continue;
                }

                let node = graph.add_node(name.to_string());
                nodes.insert(name.to_string(), node);
                graph.add_edge(node, dependent, ());

                let mut step = PlanStep {
                    name: name.to_string(),
                    formula: None,
                    action: StepAction::Satisfied,
                    kind: dep.kind(),
                    required_by: Some(formula.name.clone()),
                };

                if self.installed.contains(name) {
                    tracing::debug!("{} is already installed", name);
                    steps.insert(name.to_string(), step);
                    continue;
                }

                let Some(dep_formula) = self.source.load(name)? else {
                    return Err(ResolveError::PackageNotFound {
                        package: name.to_string(),
                        required_by: formula.name.clone(),
                    }
                    .into());
                };

                step.action = StepAction::Install;
                step.formula = Some(dep_formula.clone());
                steps.insert(name.to_string(), step);
                queue.push_back(dep_formula);
            }

            if let Some(step) = steps.get_mut(&formula.name) {
                step.formula = Some(formula);
            }
        }

        let order = toposort(&graph, None).map_err(|cycle| {
            let members = kosaraju_scc(&graph)
                .into_iter()
                .find(|scc| scc.contains(&cycle.node_id()))
                .unwrap_or_else(|| vec![cycle.node_id()]);
            let mut packages: Vec<String> = members.iter().map(|&n| graph[n].clone()).collect();
            packages.sort();
            ResolveError::CycleDetected { packages }
        })?;

        // The root has no dependents, so a valid order can always end with it
        let mut ordered: Vec<PlanStep> = order
            .into_iter()
            .filter(|&n| graph[n] != root_name)
            .filter_map(|n| steps.remove(&graph[n]))
            .collect();
        if let Some(root_step) = steps.remove(&root_name) {
            ordered.push(root_step);
        }

        tracing::debug!(
            "install plan: {}",
            ordered.iter().map(|s| s.name.as_str()).collect::<Vec<_>>().join(" -> ")
        );

        Ok(InstallPlan { steps: ordered })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::platform::{Arch, Os};
    use crate::test_support::{formula_with_deps, MemorySource};

    fn linux() -> Platform {
        Platform::new(Os::Linux, Arch::X86_64)
    }

    fn position(plan: &InstallPlan, name: &str) -> usize {
        plan.names().iter().position(|n| *n == name).unwrap()
    }

    #[test]
    fn test_dependencies_come_first() {
        let source = MemorySource::new()
            .with(formula_with_deps("app", r#"["libb", { name = "tool", kind = "build" }]"#))
            .with(formula_with_deps("libb", r#"["liba"]"#))
            .with(formula_with_deps("liba", "[]"))
            .with(formula_with_deps("tool", r#"["liba"]"#));

        let root = source.get("app");
        let plan = Resolver::new(&source, linux()).resolve(root).unwrap();

        assert_eq!(plan.len(), 4);
        assert_eq!(plan.root().name, "app");
        assert!(position(&plan, "liba") < position(&plan, "libb"));
        assert!(position(&plan, "liba") < position(&plan, "tool"));
        assert!(position(&plan, "tool") < position(&plan, "app"));

        let tool = &plan.steps()[position(&plan, "tool")];
        assert_eq!(tool.kind, DepKind::Build);
        let liba = &plan.steps()[position(&plan, "liba")];
        assert_eq!(liba.kind, DepKind::Runtime);
        assert!(plan.steps().iter().all(|s| s.formula.is_some()));
    }

    #[test]
    fn test_platform_filtered_dependencies() {
        let source = MemorySource::new()
            .with(formula_with_deps(
                "app",
                r#"[{ name = "linux-pam", platform = "linux" }, { name = "libxml2", uses_from_macos = true }]"#,
            ))
            .with(formula_with_deps("linux-pam", "[]"))
            .with(formula_with_deps("libxml2", "[]"));

        let mac = Platform::new(Os::Macos, Arch::Arm64).with_macos_version(14);
        let plan = Resolver::new(&source, mac).resolve(source.get("app")).unwrap();
        assert_eq!(plan.names(), vec!["app"]);

        let plan = Resolver::new(&source, linux()).resolve(source.get("app")).unwrap();
        assert_eq!(plan.len(), 3);
    }

    #[test]
    fn test_installed_dependencies_are_not_traversed() {
        // `liba` is installed, and its own dependency is not even available
        let source = MemorySource::new()
            .with(formula_with_deps("app", r#"["liba"]"#))
            .with(formula_with_deps("liba", r#"["ghost"]"#));

        let plan = Resolver::new(&source, linux())
            .with_installed(vec!["liba".to_string()])
            .resolve(source.get("app"))
            .unwrap();

        assert_eq!(plan.names(), vec!["liba", "app"]);
        assert!(plan.steps()[0].is_satisfied());
        assert_eq!(plan.pending().count(), 1);
    }

    #[test]
    fn test_missing_dependency_names_requirer() {
        let source = MemorySource::new()
            .with(formula_with_deps("app", r#"["liba"]"#))
            .with(formula_with_deps("liba", r#"["ghost"]"#));

        let err = Resolver::new(&source, linux())
            .resolve(source.get("app"))
            .unwrap_err();
        match err.downcast_ref::<ResolveError>() {
            Some(ResolveError::PackageNotFound { package, required_by }) => {
                assert_eq!(package, "ghost");
                assert_eq!(required_by, "liba");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_cycle_lists_members() {
        let source = MemorySource::new()
            .with(formula_with_deps("app", r#"["a"]"#))
            .with(formula_with_deps("a", r#"["b"]"#))
            .with(formula_with_deps("b", r#"["a"]"#));

        let err = Resolver::new(&source, linux())
            .resolve(source.get("app"))
            .unwrap_err();
        match err.downcast_ref::<ResolveError>() {
            Some(ResolveError::CycleDetected { packages }) => {
                assert_eq!(packages, &vec!["a".to_string(), "b".to_string()]);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
