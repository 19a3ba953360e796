//! Menu domain models (UI visibility only, never API authorization)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;
use validator::Validate;

/// Menu node kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[repr(i16)]
pub enum MenuType {
    /// 目录
    Directory = 1,
    /// 菜单
    Menu = 2,
    /// 按钮
    Button = 3,
}

impl MenuType {
    pub fn label(&self) -> &'static str {
        match self {
            MenuType::Directory => "目录",
            MenuType::Menu => "菜单",
            MenuType::Button => "按钮",
        }
    }
}

impl TryFrom<i16> for MenuType {
    type Error = String;

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(MenuType::Directory),
            2 => Ok(MenuType::Menu),
            3 => Ok(MenuType::Button),
            other => Err(format!("invalid menu type: {}", other)),
        }
    }
}

impl Serialize for MenuType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i16(*self as i16)
    }
}

impl<'de> Deserialize<'de> for MenuType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = i16::deserialize(deserializer)?;
        MenuType::try_from(value).map_err(serde::de::Error::custom)
    }
}

/// Menu
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Menu {
    pub id: Uuid,
    pub name: String,
    pub title: String,
    pub icon: Option<String>,
    pub path: Option<String>,
    pub component: Option<String>,
    pub menu_type: MenuType,
    pub permission_code: Option<String>,
    pub parent_id: Option<Uuid>,
    pub sort_order: i32,
    pub visible: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Create menu request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateMenuRequest {
    #[validate(length(min = 1, max = 50))]
    pub name: String,
    #[validate(length(min = 1, max = 50))]
    pub title: String,
    pub icon: Option<String>,
    pub path: Option<String>,
    pub component: Option<String>,
    pub menu_type: Option<MenuType>,
    pub permission_code: Option<String>,
    pub parent_id: Option<Uuid>,
    pub sort_order: Option<i32>,
    pub visible: Option<bool>,
}

/// Update menu request
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateMenuRequest {
    #[validate(length(min = 1, max = 50))]
    pub title: Option<String>,
    pub icon: Option<String>,
    pub path: Option<String>,
    pub component: Option<String>,
    pub permission_code: Option<String>,
    pub sort_order: Option<i32>,
    pub visible: Option<bool>,
    pub is_active: Option<bool>,
}

/// Replace a role's menu set (diff-and-replace)
#[derive(Debug, Deserialize)]
pub struct AssignMenusRequest {
    pub menu_ids: Vec<Uuid>,
}

/// Menu with nested children
#[derive(Debug, Clone, Serialize)]
pub struct MenuTreeNode {
    #[serde(flatten)]
    pub menu: Menu,
    pub children: Vec<MenuTreeNode>,
}

/// 将菜单平铺列表组装为树 (按 sort_order 排序；父节点不在列表内时按根节点处理)
pub fn build_menu_tree(menus: &[Menu]) -> Vec<MenuTreeNode> {
    let known: HashSet<Uuid> = menus.iter().map(|m| m.id).collect();
    let mut by_parent: HashMap<Option<Uuid>, Vec<&Menu>> = HashMap::new();

    for menu in menus {
        let key = menu.parent_id.filter(|p| known.contains(p));
        by_parent.entry(key).or_default().push(menu);
    }

    for children in by_parent.values_mut() {
        children.sort_by_key(|m| (m.sort_order, m.id));
    }

    fn attach(
        parent: Option<Uuid>,
        by_parent: &HashMap<Option<Uuid>, Vec<&Menu>>,
        visited: &mut HashSet<Uuid>,
    ) -> Vec<MenuTreeNode> {
        let mut nodes = Vec::new();
        if let Some(children) = by_parent.get(&parent) {
            for menu in children {
                if !visited.insert(menu.id) {
                    continue;
                }
                nodes.push(MenuTreeNode {
                    menu: (*menu).clone(),
                    children: attach(Some(menu.id), by_parent, visited),
                });
            }
        }
        nodes
    }

    attach(None, &by_parent, &mut HashSet::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn menu(id: Uuid, parent: Option<Uuid>, sort: i32, title: &str) -> Menu {
        Menu {
            id,
            name: title.to_string(),
            title: title.to_string(),
            icon: None,
            path: None,
            component: None,
            menu_type: MenuType::Menu,
            permission_code: None,
            parent_id: parent,
            sort_order: sort,
            visible: true,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_build_menu_tree_nesting() {
        let root = Uuid::new_v4();
        let child = Uuid::new_v4();
        let menus = vec![menu(root, None, 0, "系统管理"), menu(child, Some(root), 0, "用户管理")];

        let tree = build_menu_tree(&menus);
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].children.len(), 1);
        assert_eq!(tree[0].children[0].menu.id, child);
    }

    #[test]
    fn test_build_menu_tree_sibling_order() {
        let root = Uuid::new_v4();
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        let menus = vec![
            menu(root, None, 0, "目录"),
            menu(second, Some(root), 2, "后面的"),
            menu(first, Some(root), 1, "前面的"),
        ];

        let tree = build_menu_tree(&menus);
        let children: Vec<Uuid> = tree[0].children.iter().map(|n| n.menu.id).collect();
        assert_eq!(children, vec![first, second]);
    }

    #[test]
    fn test_menu_type_try_from() {
        assert_eq!(MenuType::try_from(1), Ok(MenuType::Directory));
        assert_eq!(MenuType::try_from(3), Ok(MenuType::Button));
        assert!(MenuType::try_from(9).is_err());
    }
}
