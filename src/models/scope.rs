//! Data-scope core types: scope levels, scope resolution and row predicates
//!
//! Everything in this module is pure and database-free so the resolution and
//! filtering rules can be unit-tested against literal fixtures.

use crate::models::department::DepartmentTree;
use crate::models::user::CurrentUser;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sqlx::{Postgres, QueryBuilder};
use std::collections::BTreeSet;
use uuid::Uuid;

/// Data scope level. Smaller value = more permissive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, sqlx::Type)]
#[repr(i16)]
pub enum DataScope {
    /// 全部数据
    All = 1,
    /// 本部门及以下数据
    Subtree = 2,
    /// 本部门数据
    OwnDepartment = 3,
    /// 本人数据
    SelfOnly = 4,
}

impl DataScope {
    pub fn as_i16(self) -> i16 {
        self as i16
    }

    /// 数据权限显示名称
    pub fn label(&self) -> &'static str {
        match self {
            DataScope::All => "全部数据",
            DataScope::Subtree => "本部门及以下数据",
            DataScope::OwnDepartment => "本部门数据",
            DataScope::SelfOnly => "本人数据",
        }
    }
}

impl TryFrom<i16> for DataScope {
    type Error = String;

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(DataScope::All),
            2 => Ok(DataScope::Subtree),
            3 => Ok(DataScope::OwnDepartment),
            4 => Ok(DataScope::SelfOnly),
            other => Err(format!("invalid data scope: {}", other)),
        }
    }
}

// 与存量数据保持一致，序列化为数字 1..4
impl Serialize for DataScope {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i16(*self as i16)
    }
}

impl<'de> Deserialize<'de> for DataScope {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = i16::deserialize(deserializer)?;
        DataScope::try_from(value).map_err(serde::de::Error::custom)
    }
}

/// Set of departments a subject may touch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DepartmentSet {
    /// 不限制部门
    All,
    /// 限定在给定集合内；空集合表示不匹配任何部门数据
    Ids(BTreeSet<Uuid>),
}

impl DepartmentSet {
    pub fn contains(&self, id: Uuid) -> bool {
        match self {
            DepartmentSet::All => true,
            DepartmentSet::Ids(ids) => ids.contains(&id),
        }
    }

    pub fn is_unrestricted(&self) -> bool {
        matches!(self, DepartmentSet::All)
    }
}

/// Outcome of scope resolution for one subject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeDecision {
    pub scope: DataScope,
    pub departments: DepartmentSet,
}

/// 解析用户的有效数据权限
///
/// 优先级: 未认证 > 超级用户 > 用户自定义覆盖 > 角色中数值最小(最宽)的范围 > 本人数据。
/// 部门集合物化规则: Subtree = 本部门及所有子部门; OwnDepartment = 仅本部门;
/// 用户无部门时得到空集合(空集合意味着不匹配任何部门数据，而不是不限制)。
pub fn resolve_scope(
    user: &CurrentUser,
    role_scopes: &[DataScope],
    tree: &DepartmentTree,
) -> ScopeDecision {
    if !user.is_authenticated {
        return ScopeDecision {
            scope: DataScope::SelfOnly,
            departments: DepartmentSet::Ids(BTreeSet::new()),
        };
    }

    if user.is_superuser {
        return ScopeDecision {
            scope: DataScope::All,
            departments: DepartmentSet::All,
        };
    }

    let scope = user
        .scope_override
        .or_else(|| role_scopes.iter().min().copied())
        .unwrap_or(DataScope::SelfOnly);

    let departments = match scope {
        DataScope::All => DepartmentSet::All,
        DataScope::Subtree => match user.department_id {
            Some(dept) => DepartmentSet::Ids(tree.subtree(dept)),
            None => DepartmentSet::Ids(BTreeSet::new()),
        },
        DataScope::OwnDepartment => match user.department_id {
            Some(dept) => DepartmentSet::Ids(BTreeSet::from([dept])),
            None => DepartmentSet::Ids(BTreeSet::new()),
        },
        // 按创建人过滤，不做部门限制
        DataScope::SelfOnly => DepartmentSet::Ids(BTreeSet::new()),
    };

    ScopeDecision { scope, departments }
}

/// Row types subject to row-level filtering opt in by implementing this trait.
pub trait GovernedEntity {
    fn owner_department(&self) -> Option<Uuid>;
    fn created_by(&self) -> Option<Uuid>;
    fn is_public(&self) -> bool;
    fn data_level(&self) -> i16;

    /// 创建人所属部门。内存匹配时可提供；SQL 路径通过 users 表联查得到。
    fn creator_department(&self) -> Option<Uuid> {
        None
    }
}

/// Row-level predicate produced from a scope decision.
///
/// Types without the governed field set do not use this predicate; they fall
/// back to type-specific rules (departments/users filter by id-in-set, and
/// anything unmodeled matches nothing).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowPredicate {
    /// 永真
    All,
    /// 公开数据，或所属部门/创建人部门落在集合内
    Department { department_ids: BTreeSet<Uuid> },
    /// 公开数据，或本人创建
    Owner { user_id: Uuid },
    /// 永假
    Nothing,
}

/// 将范围决策翻译为行级过滤谓词
pub fn build_predicate(decision: &ScopeDecision, user: &CurrentUser) -> RowPredicate {
    match decision.scope {
        DataScope::All => RowPredicate::All,
        DataScope::Subtree | DataScope::OwnDepartment => match &decision.departments {
            DepartmentSet::All => RowPredicate::All,
            DepartmentSet::Ids(ids) => RowPredicate::Department {
                department_ids: ids.clone(),
            },
        },
        DataScope::SelfOnly => match user.id {
            Some(id) if user.is_authenticated => RowPredicate::Owner { user_id: id },
            _ => RowPredicate::Nothing,
        },
    }
}

impl RowPredicate {
    /// 内存匹配，用于详情校验与单元测试
    pub fn matches<E: GovernedEntity>(&self, row: &E) -> bool {
        match self {
            RowPredicate::All => true,
            RowPredicate::Department { department_ids } => {
                // is_public 是独立子句: 部门集合为空时公开数据仍然可见
                row.is_public()
                    || row
                        .owner_department()
                        .is_some_and(|d| department_ids.contains(&d))
                    || row
                        .creator_department()
                        .is_some_and(|d| department_ids.contains(&d))
            }
            RowPredicate::Owner { user_id } => {
                row.is_public() || row.created_by() == Some(*user_id)
            }
            RowPredicate::Nothing => false,
        }
    }

    /// 渲染为 SQL WHERE 子句片段
    ///
    /// `owner_field` 是代码内指定的列名(默认 created_by)，不接受外部输入。
    pub fn push_sql(&self, qb: &mut QueryBuilder<'_, Postgres>, owner_field: &str) {
        match self {
            RowPredicate::All => {
                qb.push("TRUE");
            }
            RowPredicate::Nothing => {
                qb.push("FALSE");
            }
            RowPredicate::Owner { user_id } => {
                qb.push("(is_public OR ")
                    .push(owner_field)
                    .push(" = ")
                    .push_bind(*user_id)
                    .push(")");
            }
            RowPredicate::Department { department_ids } => {
                let ids: Vec<Uuid> = department_ids.iter().copied().collect();
                qb.push("(is_public OR owner_department_id = ANY(")
                    .push_bind(ids.clone())
                    .push(") OR ")
                    .push(owner_field)
                    .push(" IN (SELECT id FROM users WHERE department_id = ANY(")
                    .push_bind(ids)
                    .push(")))");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_scope_ordering() {
        // 数值越小权限越宽，min() 即最宽范围
        let scopes = [DataScope::SelfOnly, DataScope::Subtree, DataScope::OwnDepartment];
        assert_eq!(scopes.iter().min().copied(), Some(DataScope::Subtree));
    }

    #[test]
    fn test_data_scope_try_from() {
        assert_eq!(DataScope::try_from(1), Ok(DataScope::All));
        assert_eq!(DataScope::try_from(4), Ok(DataScope::SelfOnly));
        assert!(DataScope::try_from(0).is_err());
        assert!(DataScope::try_from(5).is_err());
    }

    #[test]
    fn test_data_scope_serde_roundtrip() {
        let json = serde_json::to_string(&DataScope::Subtree).unwrap();
        assert_eq!(json, "2");
        let back: DataScope = serde_json::from_str(&json).unwrap();
        assert_eq!(back, DataScope::Subtree);
    }

    #[test]
    fn test_department_set_contains() {
        let id = Uuid::new_v4();
        assert!(DepartmentSet::All.contains(id));
        assert!(!DepartmentSet::Ids(BTreeSet::new()).contains(id));
        assert!(DepartmentSet::Ids(BTreeSet::from([id])).contains(id));
    }
}
