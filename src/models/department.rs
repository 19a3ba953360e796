//! Department domain models and the in-memory department tree

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use uuid::Uuid;
use validator::Validate;

/// Department
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Department {
    pub id: Uuid,
    pub name: String,
    pub code: String,
    pub parent_id: Option<Uuid>,
    pub level: i32,
    pub sort_order: i32,
    pub leader: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Create department request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateDepartmentRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(min = 1, max = 50))]
    pub code: String,
    pub parent_id: Option<Uuid>,
    pub sort_order: Option<i32>,
    pub leader: Option<String>,
}

/// Update department request
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateDepartmentRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    pub sort_order: Option<i32>,
    pub leader: Option<String>,
    pub is_active: Option<bool>,
}

/// Reparent request. `parent_id = None` moves the department to the root.
#[derive(Debug, Deserialize)]
pub struct ReparentDepartmentRequest {
    pub parent_id: Option<Uuid>,
}

/// Department with nested children, for tree endpoints
#[derive(Debug, Clone, Serialize)]
pub struct DepartmentTreeNode {
    #[serde(flatten)]
    pub department: Department,
    pub children: Vec<DepartmentTreeNode>,
}

/// 将部门平铺列表组装为树 (按 sort_order 排序，仅含激活节点的子树关系)
pub fn build_department_tree(departments: &[Department]) -> Vec<DepartmentTreeNode> {
    let mut by_parent: HashMap<Option<Uuid>, Vec<&Department>> = HashMap::new();
    let known: HashSet<Uuid> = departments.iter().map(|d| d.id).collect();

    for dept in departments {
        // 父节点不在列表内时按根节点处理
        let key = dept.parent_id.filter(|p| known.contains(p));
        by_parent.entry(key).or_default().push(dept);
    }

    for children in by_parent.values_mut() {
        children.sort_by_key(|d| (d.sort_order, d.id));
    }

    fn attach(
        parent: Option<Uuid>,
        by_parent: &HashMap<Option<Uuid>, Vec<&Department>>,
        visited: &mut HashSet<Uuid>,
    ) -> Vec<DepartmentTreeNode> {
        let mut nodes = Vec::new();
        if let Some(children) = by_parent.get(&parent) {
            for dept in children {
                if !visited.insert(dept.id) {
                    continue;
                }
                nodes.push(DepartmentTreeNode {
                    department: (*dept).clone(),
                    children: attach(Some(dept.id), by_parent, visited),
                });
            }
        }
        nodes
    }

    attach(None, &by_parent, &mut HashSet::new())
}

/// Minimal node record the tree is built from
#[derive(Debug, Clone)]
pub struct DeptNode {
    pub id: Uuid,
    pub parent_id: Option<Uuid>,
    pub level: i32,
    pub sort_order: i32,
    pub is_active: bool,
}

impl From<&Department> for DeptNode {
    fn from(dept: &Department) -> Self {
        DeptNode {
            id: dept.id,
            parent_id: dept.parent_id,
            level: dept.level,
            sort_order: dept.sort_order,
            is_active: dept.is_active,
        }
    }
}

/// In-memory department hierarchy
///
/// 所有遍历都带访问标记，即使存储的数据意外成环也能终止。
#[derive(Debug, Clone, Default)]
pub struct DepartmentTree {
    nodes: HashMap<Uuid, DeptNode>,
    children: HashMap<Uuid, Vec<Uuid>>,
}

impl DepartmentTree {
    pub fn from_nodes(nodes: impl IntoIterator<Item = DeptNode>) -> Self {
        let mut tree = DepartmentTree::default();
        let mut index: HashMap<Uuid, DeptNode> = HashMap::new();
        for node in nodes {
            index.insert(node.id, node);
        }

        let mut children: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
        for node in index.values() {
            if let Some(parent) = node.parent_id {
                children.entry(parent).or_default().push(node.id);
            }
        }
        for ids in children.values_mut() {
            ids.sort_by_key(|id| {
                index
                    .get(id)
                    .map(|n| (n.sort_order, n.id))
                    .unwrap_or((i32::MAX, *id))
            });
        }

        tree.nodes = index;
        tree.children = children;
        tree
    }

    pub fn from_departments(departments: &[Department]) -> Self {
        Self::from_nodes(departments.iter().map(DeptNode::from))
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn get(&self, id: Uuid) -> Option<&DeptNode> {
        self.nodes.get(&id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// 直接子部门 (仅激活，按 sort_order 排序)
    pub fn children(&self, id: Uuid) -> Vec<Uuid> {
        self.children
            .get(&id)
            .map(|ids| {
                ids.iter()
                    .filter(|child| self.nodes.get(child).is_some_and(|n| n.is_active))
                    .copied()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// 直接子部门，含停用节点 (层级重算时需要覆盖整棵子树)
    pub fn children_unfiltered(&self, id: Uuid) -> Vec<Uuid> {
        self.children.get(&id).cloned().unwrap_or_default()
    }

    /// 所有传递子部门。广度优先并记录已访问节点，数据成环时也能返回有限集合。
    pub fn descendants(&self, id: Uuid) -> BTreeSet<Uuid> {
        let mut result = BTreeSet::new();
        let mut visited = HashSet::from([id]);
        let mut queue = VecDeque::from([id]);

        while let Some(current) = queue.pop_front() {
            for child in self.children(current) {
                if visited.insert(child) {
                    result.insert(child);
                    queue.push_back(child);
                }
            }
        }

        result
    }

    /// 本部门及所有子部门
    pub fn subtree(&self, id: Uuid) -> BTreeSet<Uuid> {
        let mut result = self.descendants(id);
        result.insert(id);
        result
    }

    /// 从根到该部门的路径，用于展示。遇到环时在环入口截断。
    pub fn path(&self, id: Uuid) -> Vec<Uuid> {
        let mut path = Vec::new();
        let mut visited = HashSet::new();
        let mut current = Some(id);

        while let Some(node_id) = current {
            if !visited.insert(node_id) {
                break;
            }
            let Some(node) = self.nodes.get(&node_id) else {
                break;
            };
            path.push(node_id);
            current = node.parent_id;
        }

        path.reverse();
        path
    }
}
