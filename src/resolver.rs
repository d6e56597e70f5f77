//! Candidate selection and wiring plans.

use std::sync::Arc;

use crate::definition::{ComponentDefinition, Dependency, DependencyKind};
use crate::error::{DiError, DiResult};
use crate::key::TypeKey;
use crate::registration::Registry;

/// Outcome of choosing among the candidates for a type.
#[derive(Debug)]
pub(crate) enum Selection<'r> {
    None,
    One(&'r Arc<ComponentDefinition>),
    Ambiguous(Vec<String>),
}

/// How one constructor or setter slot will be filled.
pub(crate) enum PlannedArg<'r> {
    /// Resolve this definition and expose it as `key`
    Component {
        def: &'r Arc<ComponentDefinition>,
        key: TypeKey,
    },
    /// Optional slot without a candidate
    Absent,
    /// Every candidate for `key` in registration order
    Collection {
        defs: Vec<&'r Arc<ComponentDefinition>>,
        key: TypeKey,
    },
    /// Handle bound to `def`, resolved when called
    Deferred {
        def: &'r Arc<ComponentDefinition>,
        key: TypeKey,
    },
    /// Lookup handle performing selection on each call
    Lookup {
        key: TypeKey,
        qualifier: Option<String>,
    },
}

/// Wiring plan for one definition.
pub(crate) struct DependencyPlan<'r> {
    pub(crate) constructor: Vec<PlannedArg<'r>>,
    pub(crate) setters: Vec<PlannedArg<'r>>,
}

/// Resolves dependency declarations against the registry.
///
/// Selection for a type `T` with optional qualifier `q`:
///
/// 1. candidates are the definitions exposing `T`, in registration order
/// 2. none: the dependency is missing (or absent, if its kind allows)
/// 3. exactly one: that candidate
/// 4. several with `q`: the single candidate whose tag or id equals `q`,
///    otherwise ambiguous
/// 5. several without `q`: the single primary candidate; zero or several
///    primaries are ambiguous
///
/// Collection kinds bypass steps 2-5 and take every candidate.
#[derive(Clone, Copy)]
pub(crate) struct DependencyResolver<'r> {
    registry: &'r Registry,
}

impl<'r> DependencyResolver<'r> {
    pub(crate) fn new(registry: &'r Registry) -> Self {
        Self { registry }
    }

    pub(crate) fn candidates(&self, key: &TypeKey) -> Vec<&'r Arc<ComponentDefinition>> {
        self.registry.all_by_type(key)
    }

    pub(crate) fn select(&self, key: &TypeKey, qualifier: Option<&str>) -> Selection<'r> {
        select_from(self.candidates(key), qualifier)
    }

    /// Selection as a facade lookup: a single instance or an error.
    pub(crate) fn select_required(
        &self,
        key: &TypeKey,
        qualifier: Option<&str>,
    ) -> DiResult<&'r Arc<ComponentDefinition>> {
        match self.select(key, qualifier) {
            Selection::One(def) => Ok(def),
            Selection::None => Err(DiError::NoSuchComponent {
                what: describe(key, qualifier),
            }),
            Selection::Ambiguous(candidates) => Err(DiError::AmbiguousComponent {
                requested: describe(key, qualifier),
                candidates,
            }),
        }
    }

    /// Plans every constructor and setter slot of `def`.
    ///
    /// `path` is the chain of ids under construction, used for diagnostics.
    pub(crate) fn plan(&self, def: &ComponentDefinition, path: &[String]) -> DiResult<DependencyPlan<'r>> {
        let constructor = def
            .dependencies()
            .iter()
            .map(|dep| self.plan_one(dep, path))
            .collect::<DiResult<Vec<_>>>()?;
        let setters = def
            .setter_dependencies()
            .map(|dep| self.plan_one(dep, path))
            .collect::<DiResult<Vec<_>>>()?;
        Ok(DependencyPlan { constructor, setters })
    }

    fn plan_one(&self, dep: &Dependency, path: &[String]) -> DiResult<PlannedArg<'r>> {
        let key = dep.key();
        match dep.kind() {
            DependencyKind::Map | DependencyKind::List => Ok(PlannedArg::Collection {
                defs: self.candidates(&key),
                key,
            }),
            DependencyKind::Provider => Ok(PlannedArg::Lookup {
                key,
                qualifier: dep.qualifier().map(str::to_string),
            }),
            kind => match self.select(&key, dep.qualifier()) {
                Selection::One(def) if kind == DependencyKind::ScopedProxy => {
                    Ok(PlannedArg::Deferred { def, key })
                }
                Selection::One(def) => Ok(PlannedArg::Component { def, key }),
                Selection::None if kind.allows_absent() => Ok(PlannedArg::Absent),
                Selection::None => Err(DiError::MissingDependency {
                    required: dep.to_string(),
                    path: path.to_vec(),
                }),
                Selection::Ambiguous(candidates) => Err(DiError::AmbiguousComponent {
                    requested: dep.to_string(),
                    candidates,
                }),
            },
        }
    }
}

fn select_from<'r>(candidates: Vec<&'r Arc<ComponentDefinition>>, qualifier: Option<&str>) -> Selection<'r> {
    match candidates.as_slice() {
        [] => return Selection::None,
        [only] => return Selection::One(*only),
        _ => {}
    }

    let preferred: Vec<&'r Arc<ComponentDefinition>> = match qualifier {
        Some(q) => candidates.iter().copied().filter(|d| d.matches_qualifier(q)).collect(),
        None => candidates.iter().copied().filter(|d| d.is_primary()).collect(),
    };

    match preferred.as_slice() {
        [winner] => Selection::One(*winner),
        [] => Selection::Ambiguous(candidates.iter().map(|d| d.id().to_string()).collect()),
        several => Selection::Ambiguous(several.iter().map(|d| d.id().to_string()).collect()),
    }
}

fn describe(key: &TypeKey, qualifier: Option<&str>) -> String {
    match qualifier {
        Some(q) => format!("{} @{}", key, q),
        None => key.to_string(),
    }
}
