//! 部门树单元测试
//!
//! 重点验证遍历在数据损坏（成环）时仍然终止并返回有限集合。

use rbac_system::models::department::{DepartmentTree, DeptNode};
use uuid::Uuid;

fn node(id: Uuid, parent: Option<Uuid>, level: i32, sort: i32) -> DeptNode {
    DeptNode {
        id,
        parent_id: parent,
        level,
        sort_order: sort,
        is_active: true,
    }
}

/// 测试正常树的后代集合
#[test]
fn test_descendants_of_nested_tree() {
    let root = Uuid::new_v4();
    let child = Uuid::new_v4();
    let grandchild = Uuid::new_v4();
    let sibling = Uuid::new_v4();

    let tree = DepartmentTree::from_nodes([
        node(root, None, 1, 0),
        node(child, Some(root), 2, 0),
        node(grandchild, Some(child), 3, 0),
        node(sibling, Some(root), 2, 1),
    ]);

    let descendants = tree.descendants(root);
    assert_eq!(descendants.len(), 3);
    assert!(descendants.contains(&child));
    assert!(descendants.contains(&grandchild));
    assert!(descendants.contains(&sibling));

    // 叶子没有后代
    assert!(tree.descendants(grandchild).is_empty());
}

/// 测试 subtree 包含节点自身
#[test]
fn test_subtree_includes_self() {
    let root = Uuid::new_v4();
    let child = Uuid::new_v4();
    let tree = DepartmentTree::from_nodes([node(root, None, 1, 0), node(child, Some(root), 2, 0)]);

    let subtree = tree.subtree(root);
    assert!(subtree.contains(&root));
    assert!(subtree.contains(&child));

    // 不在树里的 id 的子树就是它自己
    let unknown = Uuid::new_v4();
    assert_eq!(tree.subtree(unknown).len(), 1);
}

/// 测试环安全：父子互指时遍历仍然终止并返回有限集合
#[test]
fn test_descendants_terminates_on_cycle() {
    let a = Uuid::new_v4();
    let b = Uuid::new_v4();

    // a 和 b 互为父节点——损坏的数据
    let tree = DepartmentTree::from_nodes([node(a, Some(b), 1, 0), node(b, Some(a), 2, 0)]);

    let descendants = tree.descendants(a);
    assert!(descendants.len() <= 2);
    assert!(descendants.contains(&b));

    let descendants = tree.descendants(b);
    assert!(descendants.contains(&a));
}

/// 测试自指节点不会导致死循环
#[test]
fn test_self_referencing_node() {
    let a = Uuid::new_v4();
    let tree = DepartmentTree::from_nodes([node(a, Some(a), 1, 0)]);

    assert!(tree.descendants(a).is_empty());
    // 路径在环入口截断
    assert_eq!(tree.path(a), vec![a]);
}

/// 测试路径在环上终止
#[test]
fn test_path_terminates_on_cycle() {
    let a = Uuid::new_v4();
    let b = Uuid::new_v4();
    let tree = DepartmentTree::from_nodes([node(a, Some(b), 1, 0), node(b, Some(a), 2, 0)]);

    let path = tree.path(a);
    assert!(path.len() <= 2);
    assert_eq!(path.last(), Some(&a));
}

/// 测试三节点环
#[test]
fn test_three_node_cycle() {
    let a = Uuid::new_v4();
    let b = Uuid::new_v4();
    let c = Uuid::new_v4();
    let tree = DepartmentTree::from_nodes([
        node(a, Some(c), 1, 0),
        node(b, Some(a), 2, 0),
        node(c, Some(b), 3, 0),
    ]);

    for id in [a, b, c] {
        let descendants = tree.descendants(id);
        assert!(descendants.len() <= 2);
        assert!(!descendants.contains(&id));
    }
}
