//! 数据模型模块
//! 身份与组织模型、策略规则、数据权限核心类型、业务示例模型

pub mod article;
pub mod department;
pub mod menu;
pub mod policy;
pub mod role;
pub mod scope;
pub mod user;
