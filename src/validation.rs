//! Open-time validation of the dependency graph.
//!
//! Validation never constructs anything. It walks the declared dependencies
//! of every definition and reports:
//!
//! - **Missing dependencies**: a Single or ScopedProxy edge with no candidate
//! - **Cycles**: a loop of construction-time edges
//!
//! Edges taken through a scoped proxy or an object provider are resolved at
//! call time, so they never close a cycle. Ambiguity is left to resolution,
//! where the caller's context (primary, qualifier) is applied.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::definition::{ComponentDefinition, DependencyKind};
use crate::error::{DiError, DiResult};
use crate::registration::Registry;
use crate::resolver::{DependencyResolver, Selection};

/// Graph problems found by validation.
///
/// # Examples
///
/// ```rust
/// use ferrous_ioc::{ComponentCollection, ComponentDefinition, Dependency};
///
/// struct Repository;
/// struct Service;
///
/// let mut components = ComponentCollection::new();
/// components
///     .register(
///         ComponentDefinition::builder::<Service>("service")
///             .depends_on(Dependency::on::<Repository>())
///             .factory(|_| Ok(Service)),
///     )
///     .unwrap();
///
/// let report = components.validate();
/// assert!(!report.is_valid());
/// assert_eq!(report.errors().len(), 1);
/// assert!(report.to_string().contains("Missing dependency"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    errors: Vec<DiError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &[DiError] {
        &self.errors
    }

    pub fn missing(&self) -> impl Iterator<Item = &DiError> {
        self.errors
            .iter()
            .filter(|e| matches!(e, DiError::MissingDependency { .. }))
    }

    pub fn cycles(&self) -> impl Iterator<Item = &DiError> {
        self.errors
            .iter()
            .filter(|e| matches!(e, DiError::CyclicDependency { .. }))
    }

    /// `Ok` when valid, otherwise the first problem found.
    pub fn into_result(self) -> DiResult<()> {
        match self.errors.into_iter().next() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.errors.is_empty() {
            return f.write_str("component graph is valid");
        }
        writeln!(f, "{} problem(s) in component graph:", self.errors.len())?;
        for err in &self.errors {
            writeln!(f, "  - {}", err)?;
        }
        Ok(())
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Visiting,
    Done,
}

pub(crate) fn validate(registry: &Registry) -> ValidationReport {
    let resolver = DependencyResolver::new(registry);
    let mut report = ValidationReport::default();
    let mut edges: HashMap<&str, Vec<&Arc<ComponentDefinition>>> = HashMap::new();

    for def in registry.iter() {
        let mut targets = Vec::new();
        for dep in def.all_dependencies() {
            let key = dep.key();
            match dep.kind() {
                DependencyKind::Map | DependencyKind::List => targets.extend(resolver.candidates(&key)),
                DependencyKind::Provider => {}
                kind => match resolver.select(&key, dep.qualifier()) {
                    Selection::One(target) if !kind.is_deferred() => targets.push(target),
                    Selection::None if !kind.allows_absent() => {
                        report.errors.push(DiError::MissingDependency {
                            required: dep.to_string(),
                            path: vec![def.id().to_string()],
                        });
                    }
                    _ => {}
                },
            }
        }
        edges.insert(def.id(), targets);
    }

    let mut marks: HashMap<&str, Mark> = HashMap::new();
    let mut stack: Vec<&str> = Vec::new();
    for def in registry.iter() {
        visit(def.id(), &edges, &mut marks, &mut stack, &mut report);
    }
    report
}

fn visit<'a>(
    id: &'a str,
    edges: &HashMap<&'a str, Vec<&'a Arc<ComponentDefinition>>>,
    marks: &mut HashMap<&'a str, Mark>,
    stack: &mut Vec<&'a str>,
    report: &mut ValidationReport,
) {
    match marks.get(id) {
        Some(Mark::Done) => return,
        Some(Mark::Visiting) => {
            if let Some(start) = stack.iter().position(|&s| s == id) {
                let mut cycle: Vec<String> = stack[start..].iter().map(|s| s.to_string()).collect();
                cycle.push(id.to_string());
                report.errors.push(DiError::CyclicDependency { cycle });
            }
            return;
        }
        None => {}
    }

    marks.insert(id, Mark::Visiting);
    stack.push(id);
    for &target in edges.get(id).into_iter().flatten() {
        visit(target.id(), edges, marks, stack, report);
    }
    stack.pop();
    marks.insert(id, Mark::Done);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::Dependency;
    use crate::registration::RegistrationSource;

    struct A;
    struct B;
    struct C;

    fn registry(defs: Vec<ComponentDefinition>) -> Registry {
        let mut registry = Registry::new(false);
        for def in defs {
            registry.register(def, RegistrationSource::Manual).unwrap();
        }
        registry
    }

    #[test]
    fn reports_the_full_cycle() {
        let registry = registry(vec![
            ComponentDefinition::builder::<A>("a")
                .depends_on(Dependency::on::<B>())
                .factory(|_| Ok(A)),
            ComponentDefinition::builder::<B>("b")
                .depends_on(Dependency::on::<C>())
                .factory(|_| Ok(B)),
            ComponentDefinition::builder::<C>("c")
                .depends_on(Dependency::on::<A>())
                .factory(|_| Ok(C)),
        ]);

        let report = validate(&registry);
        let cycles: Vec<_> = report.cycles().collect();
        assert_eq!(cycles.len(), 1);
        match cycles[0] {
            DiError::CyclicDependency { cycle } => assert_eq!(cycle, &["a", "b", "c", "a"]),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn proxy_and_provider_edges_do_not_close_cycles() {
        let registry = registry(vec![
            ComponentDefinition::builder::<A>("a")
                .depends_on(Dependency::scoped_proxy::<B>())
                .factory(|_| Ok(A)),
            ComponentDefinition::builder::<B>("b")
                .custom_scope("request")
                .depends_on(Dependency::provider::<A>())
                .depends_on(Dependency::on::<A>())
                .factory(|_| Ok(B)),
        ]);
        assert!(validate(&registry).is_valid());
    }

    #[test]
    fn optional_and_collection_edges_may_be_empty() {
        let registry = registry(vec![ComponentDefinition::builder::<A>("a")
            .depends_on(Dependency::optional::<B>())
            .depends_on(Dependency::list_of::<C>())
            .depends_on(Dependency::map_of::<C>())
            .factory(|_| Ok(A))]);
        assert!(validate(&registry).is_valid());
    }

    #[test]
    fn self_dependency_is_a_cycle() {
        let registry = registry(vec![ComponentDefinition::builder::<A>("a")
            .depends_on(Dependency::on::<A>())
            .factory(|_| Ok(A))]);
        let err = validate(&registry).into_result().unwrap_err();
        assert!(matches!(err, DiError::CyclicDependency { ref cycle } if cycle == &["a", "a"]));
    }
}
