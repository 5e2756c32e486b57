// src/dag/graph.rs

use std::collections::{BTreeMap, BTreeSet};

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::dag::task_info::{CompletionPolicy, TaskName, TaskSpec};
use crate::errors::{MiniciError, Result};

/// Internal node structure: stores immediate predecessors and dependents.
#[derive(Debug, Clone)]
struct DagNode {
    spec: TaskSpec,
    /// Direct dependents: tasks that list this one in their `after`.
    dependents: Vec<TaskName>,
}

/// Validated, immutable task graph for one run.
///
/// Construction through [`TaskGraph::build`] guarantees every predecessor
/// exists and the graph is acyclic.
#[derive(Debug, Clone)]
pub struct TaskGraph {
    nodes: BTreeMap<TaskName, DagNode>,
    /// Task names in a valid topological order.
    order: Vec<TaskName>,
}

impl TaskGraph {
    /// Validate the declared tasks and build the graph.
    ///
    /// Fails with [`MiniciError::MissingDependency`] when a predecessor is not
    /// declared and with [`MiniciError::Cycle`] when the dependencies loop.
    pub fn build<I>(tasks: I) -> Result<Self>
    where
        I: IntoIterator<Item = TaskSpec>,
    {
        let mut nodes: BTreeMap<TaskName, DagNode> = BTreeMap::new();

        for spec in tasks {
            if nodes.contains_key(&spec.name) {
                return Err(MiniciError::Config(format!(
                    "task '{}' is declared more than once",
                    spec.name
                )));
            }
            nodes.insert(
                spec.name.clone(),
                DagNode {
                    spec,
                    dependents: Vec::new(),
                },
            );
        }

        // Second pass: check references and populate dependents.
        let names: Vec<TaskName> = nodes.keys().cloned().collect();
        for name in &names {
            let deps = nodes
                .get(name)
                .map(|n| n.spec.after.clone())
                .unwrap_or_default();

            for dep in deps {
                match nodes.get_mut(&dep) {
                    Some(dep_node) => dep_node.dependents.push(name.clone()),
                    None => {
                        return Err(MiniciError::MissingDependency {
                            task: name.clone(),
                            dependency: dep,
                        });
                    }
                }
            }
        }

        let order = topological_order(&nodes)?;
        Ok(Self { nodes, order })
    }

    /// Return all task names in a topological order.
    pub fn tasks(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    pub fn spec(&self, name: &str) -> Option<&TaskSpec> {
        self.nodes.get(name).map(|n| &n.spec)
    }

    pub fn policy_of(&self, name: &str) -> CompletionPolicy {
        self.spec(name).map(|s| s.policy).unwrap_or_default()
    }

    /// Immediate predecessors of a task (the tasks listed in its `after`).
    pub fn dependencies_of(&self, name: &str) -> &[TaskName] {
        self.nodes
            .get(name)
            .map(|n| n.spec.after.as_slice())
            .unwrap_or(&[])
    }

    /// Immediate dependents of a task.
    pub fn dependents_of(&self, name: &str) -> &[TaskName] {
        self.nodes
            .get(name)
            .map(|n| n.dependents.as_slice())
            .unwrap_or(&[])
    }

    /// Every task `name` transitively waits for.
    pub fn ancestors_of(&self, name: &str) -> BTreeSet<&str> {
        let mut seen = BTreeSet::new();
        let mut stack: Vec<&str> = self.dependencies_of(name).iter().map(String::as_str).collect();
        while let Some(task) = stack.pop() {
            if seen.insert(task) {
                stack.extend(self.dependencies_of(task).iter().map(String::as_str));
            }
        }
        seen
    }

    /// Tasks that `name` does not transitively wait for, excluding itself.
    pub fn not_awaited_by(&self, name: &str) -> Vec<&str> {
        let ancestors = self.ancestors_of(name);
        self.tasks()
            .filter(|task| *task != name && !ancestors.contains(task))
            .collect()
    }
}

fn topological_order(nodes: &BTreeMap<TaskName, DagNode>) -> Result<Vec<TaskName>> {
    // Edge direction: dep -> task. A topological sort fails on a cycle.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for name in nodes.keys() {
        graph.add_node(name.as_str());
    }
    for (name, node) in nodes.iter() {
        for dep in node.spec.after.iter() {
            graph.add_edge(dep.as_str(), name.as_str(), ());
        }
    }

    match toposort(&graph, None) {
        Ok(order) => Ok(order.into_iter().map(str::to_string).collect()),
        Err(cycle) => Err(MiniciError::Cycle(cycle.node_id().to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ci_graph() -> TaskGraph {
        TaskGraph::build([
            TaskSpec::new("setup"),
            TaskSpec::new("build").after("setup"),
            TaskSpec::new("lint").after("build"),
            TaskSpec::new("typecheck").after("build"),
            TaskSpec::new("finally")
                .after("lint")
                .after("typecheck")
                .run_always(),
        ])
        .unwrap()
    }

    #[test]
    fn order_respects_dependencies() {
        let graph = ci_graph();
        let order: Vec<&str> = graph.tasks().collect();
        let pos = |n: &str| order.iter().position(|t| *t == n).unwrap();

        assert_eq!(order.len(), 5);
        assert!(pos("setup") < pos("build"));
        assert!(pos("build") < pos("lint"));
        assert!(pos("build") < pos("typecheck"));
        assert!(pos("lint") < pos("finally"));
        assert!(pos("typecheck") < pos("finally"));
    }

    #[test]
    fn adjacency_is_tracked_both_ways() {
        let graph = ci_graph();
        let mut dependents = graph.dependents_of("build").to_vec();
        dependents.sort();
        assert_eq!(dependents, vec!["lint", "typecheck"]);
        assert_eq!(graph.dependencies_of("finally"), ["lint", "typecheck"]);
        assert_eq!(graph.policy_of("finally"), CompletionPolicy::Always);
        assert!(graph.dependencies_of("unknown").is_empty());
    }

    #[test]
    fn ancestors_are_transitive() {
        let graph = ci_graph();
        let ancestors: Vec<&str> = graph.ancestors_of("lint").into_iter().collect();
        assert_eq!(ancestors, vec!["build", "setup"]);
        assert!(graph.not_awaited_by("finally").is_empty());
        assert_eq!(graph.not_awaited_by("lint"), vec!["typecheck"]);
    }

    #[test]
    fn cycle_is_rejected() {
        let err = TaskGraph::build([
            TaskSpec::new("a").after("c"),
            TaskSpec::new("b").after("a"),
            TaskSpec::new("c").after("b"),
        ])
        .unwrap_err();
        assert!(matches!(err, MiniciError::Cycle(_)), "got {err:?}");
    }

    #[test]
    fn self_dependency_is_a_cycle() {
        let err = TaskGraph::build([TaskSpec::new("a").after("a")]).unwrap_err();
        assert!(matches!(err, MiniciError::Cycle(ref n) if n == "a"), "got {err:?}");
    }

    #[test]
    fn missing_dependency_is_rejected() {
        let err = TaskGraph::build([TaskSpec::new("lint").after("build")]).unwrap_err();
        match err {
            MiniciError::MissingDependency { task, dependency } => {
                assert_eq!(task, "lint");
                assert_eq!(dependency, "build");
            }
            other => panic!("expected MissingDependency, got {other:?}"),
        }
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let err = TaskGraph::build([TaskSpec::new("a"), TaskSpec::new("a")]).unwrap_err();
        assert!(matches!(err, MiniciError::Config(_)));
    }
}
