// ==========================================
// 制造执行系统 - 条件查询
// ==========================================

pub mod criteria;
pub mod restriction;
pub mod result;

pub use criteria::{Order, OrderDirection, SearchCriteria, SearchCriteriaBuilder};
pub use restriction::{Restriction, RestrictionOperator, Restrictions};
pub use result::{corrected_first_result, SearchResult};
