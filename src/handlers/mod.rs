//! HTTP 处理器模块

pub mod health;
pub mod metrics;
pub mod auth;
pub mod user;
pub mod role;
pub mod department;
pub mod menu;
pub mod policy;
pub mod article;

use serde::Deserialize;

/// 通用分页参数
#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

impl ListParams {
    /// 换算为 (limit, offset)，页大小限制在 1..=100
    pub fn limit_offset(&self) -> (i64, i64) {
        let page = self.page.unwrap_or(1).max(1);
        let page_size = self.page_size.unwrap_or(20).clamp(1, 100);
        (page_size, (page - 1) * page_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_params_defaults() {
        let params = ListParams { page: None, page_size: None };
        assert_eq!(params.limit_offset(), (20, 0));
    }

    #[test]
    fn test_list_params_clamping() {
        let params = ListParams { page: Some(0), page_size: Some(1000) };
        assert_eq!(params.limit_offset(), (100, 0));

        let params = ListParams { page: Some(3), page_size: Some(10) };
        assert_eq!(params.limit_offset(), (10, 20));
    }
}
