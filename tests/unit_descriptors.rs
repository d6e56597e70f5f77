use ferrous_ioc::{
    ComponentCollection, ComponentDefinition, Dependency, DependencyKind, RegistrationSource, ScopePolicy, TypeKey,
    REQUEST_SCOPE,
};
use std::sync::Arc;

// ===== Component Descriptor Tests =====

trait Clock: Send + Sync {}
struct SystemClock;
impl Clock for SystemClock {}

struct Session;
struct Reporter;

fn components() -> ComponentCollection {
    let mut components = ComponentCollection::new();
    components
        .register(
            ComponentDefinition::builder::<SystemClock>("clock")
                .exposes(|c| c as Arc<dyn Clock>)
                .primary()
                .qualifier("system")
                .factory(|_| Ok(SystemClock)),
        )
        .unwrap()
        .register(
            ComponentDefinition::builder::<Session>("session")
                .custom_scope(REQUEST_SCOPE)
                .on_destroy(|_| {})
                .factory(|_| Ok(Session)),
        )
        .unwrap()
        .register(
            ComponentDefinition::builder::<Reporter>("reporter")
                .prototype()
                .depends_on(Dependency::on::<dyn Clock>())
                .depends_on(Dependency::scoped_proxy::<Session>())
                .depends_on(Dependency::map_of::<dyn Clock>())
                .setter::<Session, _>(|_, _| {})
                .factory(|_| Ok(Reporter)),
        )
        .unwrap();
    components
}

#[test]
fn test_descriptors_in_registration_order() {
    let descriptors = components().descriptors();
    let ids: Vec<_> = descriptors.iter().map(|d| d.id.as_str()).collect();
    assert_eq!(ids, vec!["clock", "session", "reporter"]);
    assert!(descriptors.iter().all(|d| d.source == RegistrationSource::Manual));
}

#[test]
fn test_descriptor_exposure_and_markers() {
    let descriptors = components().descriptors();
    let clock = &descriptors[0];

    assert_eq!(clock.implementation_type, TypeKey::of::<SystemClock>());
    assert_eq!(clock.exposed_types[0], TypeKey::of::<SystemClock>());
    assert!(clock.exposes(&TypeKey::of::<dyn Clock>()));
    assert!(!clock.exposes(&TypeKey::of::<Session>()));
    assert!(clock.primary);
    assert!(clock.is_qualified());
    assert_eq!(clock.qualifier.as_deref(), Some("system"));
    assert!(clock.type_name().ends_with("SystemClock"));
    assert!(!clock.has_init_hook);
    assert!(!clock.has_destroy_hook);
}

#[test]
fn test_descriptor_scopes_and_dependencies() {
    let descriptors = components().descriptors();
    let session = &descriptors[1];
    let reporter = &descriptors[2];

    assert_eq!(session.scope, ScopePolicy::custom(REQUEST_SCOPE));
    assert!(session.has_destroy_hook);
    assert_eq!(reporter.scope, ScopePolicy::Prototype);

    let kinds: Vec<_> = reporter.dependencies.iter().map(|d| d.kind()).collect();
    assert_eq!(
        kinds,
        vec![
            DependencyKind::Single,
            DependencyKind::ScopedProxy,
            DependencyKind::Map,
            DependencyKind::Optional,
        ]
    );
    assert_eq!(reporter.dependencies[0].key(), TypeKey::of::<dyn Clock>());
}

#[test]
fn test_container_descriptor_lookup() {
    let container = components().open().unwrap();
    assert!(container.descriptor("reporter").is_some());
    assert!(container.descriptor("nobody").is_none());
    assert_eq!(container.descriptors().len(), 3);
}
