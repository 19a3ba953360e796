//! 行级过滤谓词单元测试
//!
//! 用一个实现了受控实体特征的夹具类型验证谓词语义，
//! 覆盖公开数据子句、部门集合为空的极性和本人数据分支。

use rbac_system::models::department::{DepartmentTree, DeptNode};
use rbac_system::models::scope::{
    build_predicate, resolve_scope, DataScope, GovernedEntity, RowPredicate,
};
use rbac_system::models::user::CurrentUser;
use std::collections::BTreeSet;
use uuid::Uuid;

/// 测试夹具：携带全套数据权限字段的受控实体
struct Widget {
    owner_department: Option<Uuid>,
    created_by: Option<Uuid>,
    creator_department: Option<Uuid>,
    is_public: bool,
}

impl GovernedEntity for Widget {
    fn owner_department(&self) -> Option<Uuid> {
        self.owner_department
    }

    fn created_by(&self) -> Option<Uuid> {
        self.created_by
    }

    fn is_public(&self) -> bool {
        self.is_public
    }

    fn data_level(&self) -> i16 {
        2
    }

    fn creator_department(&self) -> Option<Uuid> {
        self.creator_department
    }
}

fn widget(owner_department: Option<Uuid>, is_public: bool) -> Widget {
    Widget {
        owner_department,
        created_by: None,
        creator_department: None,
        is_public,
    }
}

fn node(id: Uuid, parent: Option<Uuid>, level: i32) -> DeptNode {
    DeptNode {
        id,
        parent_id: parent,
        level,
        sort_order: 0,
        is_active: true,
    }
}

fn user_in(id: Uuid, department: Option<Uuid>) -> CurrentUser {
    CurrentUser {
        id: Some(id),
        username: "u1".to_string(),
        is_authenticated: true,
        is_superuser: false,
        department_id: department,
        scope_override: None,
    }
}

/// 场景 A：本部门范围的用户看不到兄弟部门的私有数据，但能看到其公开数据
#[test]
fn test_sibling_department_rows_hidden_unless_public() {
    let root = Uuid::new_v4();
    let d1 = Uuid::new_v4();
    let d2 = Uuid::new_v4();
    let tree = DepartmentTree::from_nodes([
        node(root, None, 1),
        node(d1, Some(root), 2),
        node(d2, Some(root), 2),
    ]);

    let u1 = user_in(Uuid::new_v4(), Some(d1));
    let decision = resolve_scope(&u1, &[DataScope::OwnDepartment], &tree);
    let predicate = build_predicate(&decision, &u1);

    let private_in_d2 = widget(Some(d2), false);
    let public_in_d2 = widget(Some(d2), true);
    let private_in_d1 = widget(Some(d1), false);

    assert!(!predicate.matches(&private_in_d2));
    assert!(predicate.matches(&public_in_d2));
    assert!(predicate.matches(&private_in_d1));
}

/// 场景 B：无角色但有子树覆盖的用户能看到子树内全部数据
#[test]
fn test_subtree_override_sees_descendant_rows() {
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

    let mut u2 = user_in(Uuid::new_v4(), Some(d1));
    u2.scope_override = Some(DataScope::Subtree);

    let decision = resolve_scope(&u2, &[], &tree);
    let predicate = build_predicate(&decision, &u2);

    assert!(predicate.matches(&widget(Some(d1), false)));
    assert!(predicate.matches(&widget(Some(d1a), false)));
    assert!(!predicate.matches(&widget(Some(d2), false)));
}

/// 测试部门集合为空时只有公开数据可见（is_public 是独立子句）
#[test]
fn test_empty_department_set_shows_public_only() {
    let predicate = RowPredicate::Department {
        department_ids: BTreeSet::new(),
    };

    assert!(!predicate.matches(&widget(Some(Uuid::new_v4()), false)));
    assert!(predicate.matches(&widget(Some(Uuid::new_v4()), true)));
    assert!(predicate.matches(&widget(None, true)));
    assert!(!predicate.matches(&widget(None, false)));
}

/// 测试本人数据分支：自己创建的和公开的可见，其余不可见
#[test]
fn test_self_only_owner_branch() {
    let me = Uuid::new_v4();
    let someone_else = Uuid::new_v4();
    let predicate = RowPredicate::Owner { user_id: me };

    let mine = Widget {
        owner_department: None,
        created_by: Some(me),
        creator_department: None,
        is_public: false,
    };
    let theirs = Widget {
        owner_department: None,
        created_by: Some(someone_else),
        creator_department: None,
        is_public: false,
    };
    let theirs_public = Widget {
        owner_department: None,
        created_by: Some(someone_else),
        creator_department: None,
        is_public: true,
    };
    let ownerless = Widget {
        owner_department: None,
        created_by: None,
        creator_department: None,
        is_public: false,
    };

    assert!(predicate.matches(&mine));
    assert!(!predicate.matches(&theirs));
    assert!(predicate.matches(&theirs_public));
    assert!(!predicate.matches(&ownerless));
}

/// 测试创建人部门子句：行本身没挂部门，但创建人在范围内的部门时可见
#[test]
fn test_creator_department_clause() {
    let d1 = Uuid::new_v4();
    let predicate = RowPredicate::Department {
        department_ids: [d1].into_iter().collect(),
    };

    let row = Widget {
        owner_department: None,
        created_by: Some(Uuid::new_v4()),
        creator_department: Some(d1),
        is_public: false,
    };

    assert!(predicate.matches(&row));
}

/// 测试未认证主体的谓词什么都匹配不到，包括公开数据
#[test]
fn test_anonymous_predicate_matches_nothing() {
    let tree = DepartmentTree::default();
    let anon = CurrentUser::anonymous();
    let decision = resolve_scope(&anon, &[], &tree);
    let predicate = build_predicate(&decision, &anon);

    assert_eq!(predicate, RowPredicate::Nothing);
    assert!(!predicate.matches(&widget(None, true)));
}

/// 测试全部数据谓词永真
#[test]
fn test_all_predicate_matches_everything() {
    let tree = DepartmentTree::default();
    let mut admin = user_in(Uuid::new_v4(), None);
    admin.is_superuser = true;

    let decision = resolve_scope(&admin, &[], &tree);
    let predicate = build_predicate(&decision, &admin);

    assert_eq!(predicate, RowPredicate::All);
    assert!(predicate.matches(&widget(None, false)));
}

/// 测试范围单调性落到行级：本部门可见的行在子树和全部范围下也可见
#[test]
fn test_row_visibility_monotonicity() {
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

    let u1 = user_in(Uuid::new_v4(), Some(d1));

    let rows = [
        widget(Some(d1), false),
        widget(Some(d1a), false),
        widget(Some(d2), false),
        widget(Some(d2), true),
        widget(None, false),
    ];

    let predicates: Vec<RowPredicate> =
        [DataScope::OwnDepartment, DataScope::Subtree, DataScope::All]
            .into_iter()
            .map(|scope| {
                let decision = resolve_scope(&u1, &[scope], &tree);
                build_predicate(&decision, &u1)
            })
            .collect();

    for row in &rows {
        // 每一档范围可见的行，在更宽的范围下必须仍然可见
        if predicates[0].matches(row) {
            assert!(predicates[1].matches(row));
        }
        if predicates[1].matches(row) {
            assert!(predicates[2].matches(row));
        }
    }
}
