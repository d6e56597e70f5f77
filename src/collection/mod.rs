//! Component collection: the registration side of the container.
//!
//! Definitions are registered here on a single thread, validated as a graph,
//! and then frozen into a [`Container`] by [`ComponentCollection::open`].

use tracing::{debug, warn};

use crate::config::ContainerOptions;
use crate::definition::ComponentDefinition;
use crate::descriptors::ComponentDescriptor;
use crate::error::DiResult;
use crate::provider::Container;
use crate::registration::{RegistrationSource, Registry};
use crate::validation::{self, ValidationReport};

pub mod module_system;
pub use module_system::*;

/// Registry of component definitions awaiting [`open`](Self::open).
///
/// # Examples
///
/// ```rust
/// use ferrous_ioc::{ComponentCollection, ComponentDefinition, Dependency, Resolver};
/// use std::sync::Arc;
///
/// trait MemberRepository: Send + Sync {
///     fn find(&self, id: u64) -> Option<String>;
/// }
///
/// struct MemoryMemberRepository;
/// impl MemberRepository for MemoryMemberRepository {
///     fn find(&self, id: u64) -> Option<String> {
///         (id == 1).then(|| "memberA".to_string())
///     }
/// }
///
/// struct MemberService {
///     repository: Arc<dyn MemberRepository>,
/// }
///
/// let mut components = ComponentCollection::new();
/// components
///     .register(ComponentDefinition::builder::<MemoryMemberRepository>("memberRepository")
///         .exposes(|r| r as Arc<dyn MemberRepository>)
///         .factory(|_| Ok(MemoryMemberRepository)))
///     .unwrap()
///     .register(ComponentDefinition::builder::<MemberService>("memberService")
///         .depends_on(Dependency::on::<dyn MemberRepository>())
///         .factory(|args| Ok(MemberService { repository: args.required(0)? })))
///     .unwrap();
///
/// let container = components.open().unwrap();
/// let service = container.get::<MemberService>().unwrap();
/// assert_eq!(service.repository.find(1).as_deref(), Some("memberA"));
/// ```
pub struct ComponentCollection {
    registry: Registry,
    options: ContainerOptions,
    source: RegistrationSource,
}

impl ComponentCollection {
    /// Creates a new empty collection with default options.
    pub fn new() -> Self {
        Self::with_options(ContainerOptions::default())
    }

    pub fn with_options(options: ContainerOptions) -> Self {
        Self {
            registry: Registry::new(options.allow_overriding),
            options,
            source: RegistrationSource::Manual,
        }
    }

    pub fn options(&self) -> &ContainerOptions {
        &self.options
    }

    /// Replaces the options. Applies to registrations made afterwards.
    pub fn set_options(&mut self, options: ContainerOptions) -> &mut Self {
        self.registry.set_allow_overriding(options.allow_overriding);
        self.options = options;
        self
    }

    /// Registers a definition.
    ///
    /// Fails with `DuplicateRegistration` if the id exists and overriding is
    /// off. Inside [`scan`](Self::scan) the definition is recorded as
    /// scanned; a manual definition with the same id takes precedence
    /// whichever arrives first.
    pub fn register(&mut self, definition: ComponentDefinition) -> DiResult<&mut Self> {
        self.registry.register(definition, self.source)?;
        Ok(self)
    }

    /// Registers several definitions, stopping at the first failure.
    pub fn register_all<I>(&mut self, definitions: I) -> DiResult<&mut Self>
    where
        I: IntoIterator<Item = ComponentDefinition>,
    {
        for definition in definitions {
            self.register(definition)?;
        }
        Ok(self)
    }

    /// Runs a bulk registration pass; its definitions yield to manual ones.
    pub fn scan<M: ComponentModule>(&mut self, module: M) -> DiResult<&mut Self> {
        let previous = std::mem::replace(&mut self.source, RegistrationSource::Scanned);
        let before = self.registry.len();
        let result = module.register_components(self);
        self.source = previous;
        result?;
        debug!(added = self.registry.len() - before, "component scan finished");
        Ok(self)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.registry.contains(id)
    }

    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.len() == 0
    }

    /// Component ids in registration order.
    pub fn definition_names(&self) -> Vec<String> {
        self.registry.iter().map(|d| d.id().to_string()).collect()
    }

    pub fn descriptors(&self) -> Vec<ComponentDescriptor> {
        self.registry
            .iter()
            .map(|d| ComponentDescriptor::describe(d, &self.registry))
            .collect()
    }

    /// Checks the graph for missing dependencies and construction cycles.
    pub fn validate(&self) -> ValidationReport {
        validation::validate(&self.registry)
    }

    /// Validates the graph and opens the container.
    ///
    /// Singletons are built lazily on first lookup unless
    /// [`ContainerOptions::eager_singletons`] is set, in which case they are
    /// built now in registration order and the first failure closes the
    /// container and is returned.
    pub fn open(self) -> DiResult<Container> {
        let report = self.validate();
        if !report.is_valid() {
            warn!(problems = report.errors().len(), "component graph rejected");
            report.into_result()?;
        }

        let eager = self.options.eager_singletons;
        let components = self.registry.len();
        let container = Container::new(self.registry, self.options);
        debug!(components, "container opened");

        if eager {
            if let Err(err) = container.instantiate_singletons() {
                container.close();
                return Err(err);
            }
        }
        Ok(container)
    }
}

impl Default for ComponentCollection {
    fn default() -> Self {
        Self::new()
    }
}
