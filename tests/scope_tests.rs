//! 数据范围解析单元测试
//!
//! 用字面量的用户/角色/部门夹具验证解析优先级与部门集合物化规则。

use rbac_system::models::department::{DepartmentTree, DeptNode};
use rbac_system::models::scope::{resolve_scope, DataScope, DepartmentSet};
use rbac_system::models::user::CurrentUser;
use std::collections::BTreeSet;
use uuid::Uuid;

fn node(id: Uuid, parent: Option<Uuid>, level: i32) -> DeptNode {
    DeptNode {
        id,
        parent_id: parent,
        level,
        sort_order: 0,
        is_active: true,
    }
}

/// 根部门 + 两个子部门(d1, d2) + d1 的子部门 d1a
struct Fixture {
    tree: DepartmentTree,
    root: Uuid,
    d1: Uuid,
    d1a: Uuid,
    d2: Uuid,
}

fn fixture() -> Fixture {
    let root = Uuid::new_v4();
    let d1 = Uuid::new_v4();
    let d1a = Uuid::new_v4();
    let d2 = Uuid::new_v4();

    let tree = DepartmentTree::from_nodes([
        node(root, None, 1),
        node(d1, Some(root), 2),
        node(d1a, Some(d1), 3),
        node(d2, Some(root), 2),
    ]);

    Fixture { tree, root, d1, d1a, d2 }
}

fn user_in(department: Option<Uuid>) -> CurrentUser {
    CurrentUser {
        id: Some(Uuid::new_v4()),
        username: "u1".to_string(),
        is_authenticated: true,
        is_superuser: false,
        department_id: department,
        scope_override: None,
    }
}

/// 测试未认证主体降级为本人数据 + 空部门集合
#[test]
fn test_anonymous_resolves_to_self_only() {
    let fx = fixture();
    let decision = resolve_scope(&CurrentUser::anonymous(), &[DataScope::All], &fx.tree);

    assert_eq!(decision.scope, DataScope::SelfOnly);
    assert_eq!(decision.departments, DepartmentSet::Ids(BTreeSet::new()));
}

/// 测试超级用户始终解析为全部数据，覆盖与角色都被忽略
#[test]
fn test_superuser_resolves_to_all() {
    let fx = fixture();
    let mut admin = user_in(Some(fx.d1));
    admin.is_superuser = true;
    admin.scope_override = Some(DataScope::SelfOnly);

    let decision = resolve_scope(&admin, &[DataScope::SelfOnly], &fx.tree);

    assert_eq!(decision.scope, DataScope::All);
    assert_eq!(decision.departments, DepartmentSet::All);
}

/// 测试自定义覆盖优先于角色授予的范围
#[test]
fn test_override_takes_precedence_over_roles() {
    let fx = fixture();
    let mut u2 = user_in(Some(fx.d1));
    u2.scope_override = Some(DataScope::Subtree);

    // 角色只给了本人数据，但覆盖提升到本部门及以下
    let decision = resolve_scope(&u2, &[DataScope::SelfOnly], &fx.tree);

    assert_eq!(decision.scope, DataScope::Subtree);
    let expected: BTreeSet<Uuid> = [fx.d1, fx.d1a].into_iter().collect();
    assert_eq!(decision.departments, DepartmentSet::Ids(expected));
}

/// 测试零角色且有覆盖的用户仍按覆盖解析（场景 B）
#[test]
fn test_override_without_roles() {
    let fx = fixture();
    let mut u2 = user_in(Some(fx.root));
    u2.scope_override = Some(DataScope::Subtree);

    let decision = resolve_scope(&u2, &[], &fx.tree);

    assert_eq!(decision.scope, DataScope::Subtree);
    let expected: BTreeSet<Uuid> = [fx.root, fx.d1, fx.d1a, fx.d2].into_iter().collect();
    assert_eq!(decision.departments, DepartmentSet::Ids(expected));
}

/// 测试多角色取数值最小（最宽）的数据范围
#[test]
fn test_multiple_roles_most_permissive_wins() {
    let fx = fixture();
    let u1 = user_in(Some(fx.d1));

    let decision = resolve_scope(
        &u1,
        &[DataScope::SelfOnly, DataScope::OwnDepartment, DataScope::Subtree],
        &fx.tree,
    );

    assert_eq!(decision.scope, DataScope::Subtree);
}

/// 测试无角色无覆盖默认为本人数据
#[test]
fn test_default_is_self_only() {
    let fx = fixture();
    let decision = resolve_scope(&user_in(Some(fx.d1)), &[], &fx.tree);

    assert_eq!(decision.scope, DataScope::SelfOnly);
}

/// 测试关键极性：部门范围但用户无部门时得到空集合（匹配不到任何部门数据），
/// 而不是不受限制
#[test]
fn test_no_department_means_empty_set_not_unrestricted() {
    let fx = fixture();
    let homeless = user_in(None);

    for scope in [DataScope::Subtree, DataScope::OwnDepartment] {
        let decision = resolve_scope(&homeless, &[scope], &fx.tree);
        assert_eq!(decision.departments, DepartmentSet::Ids(BTreeSet::new()));
        assert!(!decision.departments.contains(fx.d1));
    }
}

/// 测试本部门范围只物化出自己的部门
#[test]
fn test_own_department_materialization() {
    let fx = fixture();
    let decision = resolve_scope(&user_in(Some(fx.d1)), &[DataScope::OwnDepartment], &fx.tree);

    assert_eq!(decision.scope, DataScope::OwnDepartment);
    assert_eq!(
        decision.departments,
        DepartmentSet::Ids([fx.d1].into_iter().collect())
    );
    // 子部门不在本部门范围内
    assert!(!decision.departments.contains(fx.d1a));
}

/// 测试范围单调性：OwnDepartment ⊆ Subtree ⊆ All 的部门集合
#[test]
fn test_scope_monotonicity() {
    let fx = fixture();
    let u1 = user_in(Some(fx.d1));

    let own = resolve_scope(&u1, &[DataScope::OwnDepartment], &fx.tree);
    let subtree = resolve_scope(&u1, &[DataScope::Subtree], &fx.tree);
    let all = resolve_scope(&u1, &[DataScope::All], &fx.tree);

    let DepartmentSet::Ids(own_ids) = &own.departments else {
        panic!("own department scope should materialize ids");
    };
    let DepartmentSet::Ids(subtree_ids) = &subtree.departments else {
        panic!("subtree scope should materialize ids");
    };

    // 本部门集合是子树集合的子集
    assert!(own_ids.is_subset(subtree_ids));
    // 子树集合的每个成员在全部数据下也可见
    for id in subtree_ids {
        assert!(all.departments.contains(*id));
    }
    // 兄弟部门只在全部数据下可见
    assert!(!subtree_ids.contains(&fx.d2));
    assert!(all.departments.contains(fx.d2));
}
