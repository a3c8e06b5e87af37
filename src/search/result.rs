// ==========================================
// 制造执行系统 - 查询结果
// ==========================================

use crate::model::entity::Entity;

/// 查询结果
///
/// total_number_of_entities 为满足限制条件的总数，与分页无关
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchResult {
    pub entities: Vec<Entity>,
    pub total_number_of_entities: usize,
}

impl SearchResult {
    pub fn new(entities: Vec<Entity>, total_number_of_entities: usize) -> Self {
        Self {
            entities,
            total_number_of_entities,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// 当前页为空但总数非零（起始位置越过了末页）
    pub fn needs_page_correction(&self) -> bool {
        self.entities.is_empty() && self.total_number_of_entities > 0
    }
}

/// 修正后的起始位置：末页第一条记录
///
/// # 示例
/// - total=25, max=10 -> 20
/// - total=20, max=10 -> 10
pub fn corrected_first_result(first_result: usize, max_results: usize, total: usize) -> usize {
    if total == 0 || max_results == 0 {
        return 0;
    }
    if first_result < total {
        return first_result;
    }
    ((total - 1) / max_results) * max_results
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_corrected_first_result_snaps_to_last_page() {
        assert_eq!(corrected_first_result(30, 10, 25), 20);
        assert_eq!(corrected_first_result(20, 10, 20), 10);
        assert_eq!(corrected_first_result(100, 10, 5), 0);
        assert_eq!(corrected_first_result(5, 10, 25), 5);
        assert_eq!(corrected_first_result(10, 10, 0), 0);
    }

    #[test]
    fn test_needs_page_correction() {
        assert!(SearchResult::new(vec![], 3).needs_page_correction());
        assert!(!SearchResult::new(vec![], 0).needs_page_correction());
    }
}
