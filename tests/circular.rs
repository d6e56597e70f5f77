use ferrous_ioc::{
    ComponentCollection, ComponentDefinition, ContainerOptions, Dependency, DiError, ObjectProvider, Resolver,
    ScopedProxy, REQUEST_SCOPE,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

struct A;
struct B;
struct C;

fn constructed() -> Arc<AtomicUsize> {
    Arc::new(AtomicUsize::new(0))
}

#[test]
fn test_two_node_cycle_fails_open_before_construction() {
    let built = constructed();
    let (a_built, b_built) = (built.clone(), built.clone());
    let mut components = ComponentCollection::new();
    components
        .register(
            ComponentDefinition::builder::<A>("a")
                .depends_on(Dependency::on::<B>())
                .factory(move |_| {
                    a_built.fetch_add(1, Ordering::SeqCst);
                    Ok(A)
                }),
        )
        .unwrap()
        .register(
            ComponentDefinition::builder::<B>("b")
                .depends_on(Dependency::on::<A>())
                .factory(move |_| {
                    b_built.fetch_add(1, Ordering::SeqCst);
                    Ok(B)
                }),
        )
        .unwrap();

    match components.open() {
        Err(DiError::CyclicDependency { cycle }) => assert_eq!(cycle, vec!["a", "b", "a"]),
        other => panic!("unexpected result: {other:?}"),
    }
    assert_eq!(built.load(Ordering::SeqCst), 0);
}

#[test]
fn test_three_node_cycle_reports_full_path() {
    let mut components = ComponentCollection::new();
    components
        .register(ComponentDefinition::builder::<A>("a").depends_on(Dependency::on::<B>()).factory(|_| Ok(A)))
        .unwrap()
        .register(ComponentDefinition::builder::<B>("b").depends_on(Dependency::on::<C>()).factory(|_| Ok(B)))
        .unwrap()
        .register(ComponentDefinition::builder::<C>("c").depends_on(Dependency::on::<A>()).factory(|_| Ok(C)))
        .unwrap();

    let report = components.validate();
    let cycles: Vec<_> = report.cycles().collect();
    assert_eq!(cycles.len(), 1);
    assert_eq!(cycles[0].to_string(), "Cyclic dependency: a -> b -> c -> a");
}

#[test]
fn test_self_dependency() {
    let mut components = ComponentCollection::new();
    components
        .register(ComponentDefinition::builder::<A>("a").depends_on(Dependency::on::<A>()).factory(|_| Ok(A)))
        .unwrap();
    assert!(matches!(
        components.open(),
        Err(DiError::CyclicDependency { cycle }) if cycle == vec!["a", "a"]
    ));
}

#[test]
fn test_optional_edges_count_towards_cycles() {
    let mut components = ComponentCollection::new();
    components
        .register(ComponentDefinition::builder::<A>("a").depends_on(Dependency::optional::<B>()).factory(|_| Ok(A)))
        .unwrap()
        .register(ComponentDefinition::builder::<B>("b").depends_on(Dependency::list_of::<A>()).factory(|_| Ok(B)))
        .unwrap();
    assert!(!components.validate().is_valid());
}

#[test]
fn test_provider_breaks_construction_cycle() {
    struct Parent {
        child: ObjectProvider<Child>,
    }
    struct Child {
        parent: Arc<Parent>,
    }

    let mut components = ComponentCollection::new();
    components
        .register(
            ComponentDefinition::builder::<Parent>("parent")
                .depends_on(Dependency::provider::<Child>())
                .factory(|args| Ok(Parent { child: args.provider(0)? })),
        )
        .unwrap()
        .register(
            ComponentDefinition::builder::<Child>("child")
                .depends_on(Dependency::on::<Parent>())
                .factory(|args| Ok(Child { parent: args.required(0)? })),
        )
        .unwrap();
    let container = components.open().unwrap();

    let parent = container.get::<Parent>().unwrap();
    let child = parent.child.get().unwrap();
    assert!(Arc::ptr_eq(&child.parent, &parent));
}

#[test]
fn test_scoped_proxy_breaks_construction_cycle() {
    struct Session {
        request: ScopedProxy<Request>,
    }
    struct Request {
        session: Arc<Session>,
    }

    let mut components = ComponentCollection::new();
    components
        .register(
            ComponentDefinition::builder::<Session>("session")
                .depends_on(Dependency::scoped_proxy::<Request>())
                .factory(|args| Ok(Session { request: args.scoped_proxy(0)? })),
        )
        .unwrap()
        .register(
            ComponentDefinition::builder::<Request>("request")
                .custom_scope(REQUEST_SCOPE)
                .depends_on(Dependency::on::<Session>())
                .factory(|args| Ok(Request { session: args.required(0)? })),
        )
        .unwrap();
    let container = components.open().unwrap();

    let session = container.get::<Session>().unwrap();
    let context = container.enter_scope(REQUEST_SCOPE).unwrap();
    let request = session.request.get().unwrap();
    assert!(Arc::ptr_eq(&request.session, &session));
    assert!(Arc::ptr_eq(&request, &session.request.get().unwrap()));
    context.close();
}

#[test]
fn test_eager_lookup_through_provider_is_caught_at_runtime() {
    struct Parent;
    struct Child;

    let mut components = ComponentCollection::new();
    components
        .register(
            ComponentDefinition::builder::<Parent>("parent")
                .depends_on(Dependency::provider::<Child>())
                .factory(|args| {
                    // Pulling the child during construction closes the loop.
                    args.provider::<Child>(0)?.get()?;
                    Ok(Parent)
                }),
        )
        .unwrap()
        .register(
            ComponentDefinition::builder::<Child>("child")
                .depends_on(Dependency::on::<Parent>())
                .factory(|_| Ok(Child)),
        )
        .unwrap();
    let container = components.open().unwrap();

    match container.get::<Parent>() {
        Err(DiError::CyclicDependency { cycle }) => assert_eq!(cycle, vec!["parent", "child", "parent"]),
        other => panic!("unexpected result: {:?}", other.map(|_| ())),
    }
    assert_eq!(container.singleton_count(), 0);
}

#[test]
fn test_depth_limit() {
    struct Level0;
    struct Level1;
    struct Level2;

    let mut components = ComponentCollection::with_options(ContainerOptions::default().max_depth(2));
    components
        .register(ComponentDefinition::builder::<Level2>("level2").prototype().factory(|_| Ok(Level2)))
        .unwrap()
        .register(
            ComponentDefinition::builder::<Level1>("level1")
                .prototype()
                .depends_on(Dependency::on::<Level2>())
                .factory(|_| Ok(Level1)),
        )
        .unwrap()
        .register(
            ComponentDefinition::builder::<Level0>("level0")
                .depends_on(Dependency::on::<Level1>())
                .factory(|_| Ok(Level0)),
        )
        .unwrap();
    let container = components.open().unwrap();

    assert!(container.get::<Level1>().is_ok());
    assert!(matches!(container.get::<Level0>(), Err(DiError::DepthExceeded(2))));
}
