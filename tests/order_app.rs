/// Full application integration tests
///
/// A small member/order domain wired through the container: repositories,
/// services, competing discount policies and a request-scoped audit log.
use ferrous_ioc::{
    ComponentCollection, ComponentDefinition, Container, Dependency, DiError, Resolver, REQUEST_SCOPE,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

// ===== Domain =====

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Grade {
    Basic,
    Vip,
}

#[derive(Debug, Clone)]
struct Member {
    id: u64,
    name: String,
    grade: Grade,
}

#[derive(Debug, Clone, PartialEq)]
struct Order {
    member_id: u64,
    item_name: String,
    item_price: u32,
    discount_price: u32,
}

impl Order {
    fn calculate_price(&self) -> u32 {
        self.item_price - self.discount_price
    }
}

trait MemberRepository: Send + Sync {
    fn save(&self, member: Member);
    fn find_by_id(&self, id: u64) -> Option<Member>;
}

#[derive(Default)]
struct MemoryMemberRepository {
    store: Mutex<HashMap<u64, Member>>,
}

impl MemberRepository for MemoryMemberRepository {
    fn save(&self, member: Member) {
        self.store.lock().insert(member.id, member);
    }

    fn find_by_id(&self, id: u64) -> Option<Member> {
        self.store.lock().get(&id).cloned()
    }
}

trait DiscountPolicy: Send + Sync {
    fn discount(&self, member: &Member, price: u32) -> u32;
}

struct FixDiscountPolicy;

impl DiscountPolicy for FixDiscountPolicy {
    fn discount(&self, member: &Member, _price: u32) -> u32 {
        match member.grade {
            Grade::Vip => 1000,
            Grade::Basic => 0,
        }
    }
}

struct RateDiscountPolicy {
    percent: u32,
}

impl DiscountPolicy for RateDiscountPolicy {
    fn discount(&self, member: &Member, price: u32) -> u32 {
        match member.grade {
            Grade::Vip => price * self.percent / 100,
            Grade::Basic => 0,
        }
    }
}

struct MemberService {
    repository: Arc<dyn MemberRepository>,
}

impl MemberService {
    fn join(&self, member: Member) {
        self.repository.save(member);
    }

    fn find_member(&self, id: u64) -> Option<Member> {
        self.repository.find_by_id(id)
    }
}

struct OrderService {
    repository: Arc<dyn MemberRepository>,
    policy: Arc<dyn DiscountPolicy>,
}

impl OrderService {
    fn create_order(&self, member_id: u64, item_name: &str, item_price: u32) -> Option<Order> {
        let member = self.repository.find_by_id(member_id)?;
        Some(Order {
            member_id,
            item_name: item_name.to_string(),
            item_price,
            discount_price: self.policy.discount(&member, item_price),
        })
    }
}

#[derive(Default)]
struct AuditLog {
    lines: Mutex<Vec<String>>,
}

impl AuditLog {
    fn record(&self, line: impl Into<String>) {
        self.lines.lock().push(line.into());
    }

    fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }
}

// ===== Wiring =====

fn app_components() -> ComponentCollection {
    let mut components = ComponentCollection::new();
    components
        .register(
            ComponentDefinition::builder::<MemoryMemberRepository>("memberRepository")
                .exposes(|r| r as Arc<dyn MemberRepository>)
                .factory(|_| Ok(MemoryMemberRepository::default())),
        )
        .unwrap()
        .register(
            ComponentDefinition::builder::<FixDiscountPolicy>("fixDiscountPolicy")
                .exposes(|p| p as Arc<dyn DiscountPolicy>)
                .qualifier("fixed")
                .factory(|_| Ok(FixDiscountPolicy)),
        )
        .unwrap()
        .register(
            ComponentDefinition::builder::<RateDiscountPolicy>("rateDiscountPolicy")
                .exposes(|p| p as Arc<dyn DiscountPolicy>)
                .qualifier("rate")
                .factory(|_| Ok(RateDiscountPolicy { percent: 10 })),
        )
        .unwrap()
        .register(
            ComponentDefinition::builder::<MemberService>("memberService")
                .depends_on(Dependency::on::<dyn MemberRepository>())
                .factory(|args| Ok(MemberService { repository: args.required(0)? })),
        )
        .unwrap()
        .register(
            ComponentDefinition::builder::<OrderService>("orderService")
                .depends_on(Dependency::on::<dyn MemberRepository>())
                .depends_on(Dependency::on::<dyn DiscountPolicy>().qualified("rate"))
                .factory(|args| {
                    Ok(OrderService {
                        repository: args.required(0)?,
                        policy: args.required(1)?,
                    })
                }),
        )
        .unwrap()
        .register(
            ComponentDefinition::builder::<AuditLog>("auditLog")
                .custom_scope(REQUEST_SCOPE)
                .factory(|_| Ok(AuditLog::default())),
        )
        .unwrap();
    components
}

fn open_app() -> Container {
    app_components().open().unwrap()
}

fn vip(id: u64) -> Member {
    Member {
        id,
        name: format!("member{id}"),
        grade: Grade::Vip,
    }
}

// ===== Orders =====

#[test]
fn test_vip_order_uses_rate_discount() {
    let container = open_app();
    let members = container.get::<MemberService>().unwrap();
    let orders = container.get::<OrderService>().unwrap();

    members.join(vip(1));
    let order = orders.create_order(1, "itemA", 10000).unwrap();

    assert_eq!(order.discount_price, 1000);
    assert_eq!(order.calculate_price(), 9000);
    assert_eq!(order.item_name, "itemA");
    assert_eq!(order.member_id, 1);
    container.close();
}

#[test]
fn test_basic_member_gets_no_discount() {
    let container = open_app();
    let members = container.get::<MemberService>().unwrap();
    members.join(Member {
        id: 2,
        name: "memberB".into(),
        grade: Grade::Basic,
    });

    let order = container
        .get::<OrderService>()
        .unwrap()
        .create_order(2, "itemB", 20000)
        .unwrap();
    assert_eq!(order.discount_price, 0);
    assert_eq!(members.find_member(2).unwrap().name, "memberB");
}

#[test]
fn test_services_share_the_singleton_repository() {
    let container = open_app();
    let members = container.get::<MemberService>().unwrap();
    let orders = container.get::<OrderService>().unwrap();
    let repository = container.get::<dyn MemberRepository>().unwrap();

    assert!(Arc::ptr_eq(&members.repository, &orders.repository));
    assert!(Arc::ptr_eq(&members.repository, &repository));

    members.join(vip(7));
    assert!(orders.create_order(7, "itemC", 5000).is_some());
    assert!(orders.create_order(8, "itemC", 5000).is_none());
}

#[test]
fn test_discount_policies_by_qualifier_and_collection() {
    let container = open_app();

    let err = container.get::<dyn DiscountPolicy>().err().unwrap();
    match err {
        DiError::AmbiguousComponent { candidates, .. } => {
            assert_eq!(candidates, vec!["fixDiscountPolicy", "rateDiscountPolicy"]);
        }
        other => panic!("unexpected error: {other}"),
    }

    let member = vip(3);
    let fixed = container.get_qualified::<dyn DiscountPolicy>("fixed").unwrap();
    let rate = container.get_qualified::<dyn DiscountPolicy>("rate").unwrap();
    assert_eq!(fixed.discount(&member, 20000), 1000);
    assert_eq!(rate.discount(&member, 20000), 2000);

    let all = container.get_all::<dyn DiscountPolicy>().unwrap();
    let total: u32 = all.iter().map(|(_, p)| p.discount(&member, 20000)).sum();
    assert_eq!(all.len(), 2);
    assert_eq!(total, 3000);
}

// ===== Requests =====

#[test]
fn test_each_request_gets_its_own_audit_log() {
    let container = open_app();
    container.get::<MemberService>().unwrap().join(vip(1));
    let orders = container.get::<OrderService>().unwrap();

    let handle_request = |item: &str| {
        let request = container.enter_scope(REQUEST_SCOPE).unwrap();
        let log = container.get::<AuditLog>().unwrap();
        let order = orders.create_order(1, item, 10000).unwrap();
        log.record(format!("{} -> {}", order.item_name, order.calculate_price()));
        container.get::<AuditLog>().unwrap().record("done");
        let lines = log.lines();
        request.close();
        lines
    };

    assert_eq!(handle_request("itemA"), vec!["itemA -> 9000", "done"]);
    assert_eq!(handle_request("itemB"), vec!["itemB -> 9000", "done"]);
    assert!(matches!(container.get::<AuditLog>(), Err(DiError::NoActiveScope { .. })));
}

#[test]
fn test_graph_introspection() {
    let components = app_components();
    assert!(components.validate().is_valid());
    assert_eq!(
        components.definition_names(),
        vec![
            "memberRepository",
            "fixDiscountPolicy",
            "rateDiscountPolicy",
            "memberService",
            "orderService",
            "auditLog",
        ]
    );

    let container = components.open().unwrap();
    let order = container.descriptor("orderService").unwrap();
    assert_eq!(order.dependencies.len(), 2);
    assert_eq!(order.dependencies[1].qualifier(), Some("rate"));
    assert_eq!(container.singleton_count(), 0);
    container.get::<OrderService>().unwrap();
    assert_eq!(container.singleton_count(), 3);
}
