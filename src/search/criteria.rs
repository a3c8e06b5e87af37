// ==========================================
// 制造执行系统 - 条件查询
// ==========================================
// 职责: 查询条件（限制条件、排序、分页）与流式构建器
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::model::definition::DataDefinitionRef;
use crate::model::entity::Entity;
use crate::model::error::ModelResult;
use crate::repository::data_access::DataAccess;
use crate::search::restriction::Restriction;
use crate::search::result::SearchResult;

// ==========================================
// 排序
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderDirection {
    #[default]
    Asc,
    Desc,
}

impl fmt::Display for OrderDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderDirection::Asc => write!(f, "asc"),
            OrderDirection::Desc => write!(f, "desc"),
        }
    }
}

impl FromStr for OrderDirection {
    type Err = std::convert::Infallible;

    /// "asc" 为升序，其余一律降序
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("asc") {
            Ok(OrderDirection::Asc)
        } else {
            Ok(OrderDirection::Desc)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub field: String,
    pub direction: OrderDirection,
}

impl Order {
    pub fn asc(field: &str) -> Self {
        Self {
            field: field.to_string(),
            direction: OrderDirection::Asc,
        }
    }

    pub fn desc(field: &str) -> Self {
        Self {
            field: field.to_string(),
            direction: OrderDirection::Desc,
        }
    }

    pub fn is_asc(&self) -> bool {
        self.direction == OrderDirection::Asc
    }
}

// ==========================================
// SearchCriteria - 查询条件
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct SearchCriteria {
    target: DataDefinitionRef,
    restrictions: Vec<Restriction>,
    order: Option<Order>,
    first_result: usize,
    max_results: usize,
}

impl SearchCriteria {
    /// 无限制、无排序、不分页
    pub fn new(target: DataDefinitionRef) -> Self {
        Self {
            target,
            restrictions: Vec::new(),
            order: None,
            first_result: 0,
            max_results: usize::MAX,
        }
    }

    pub fn restricted_with(mut self, restriction: Restriction) -> Self {
        self.restrictions.push(restriction);
        self
    }

    /// 设置排序（至多一个，后设置的覆盖先前的）
    pub fn order_by(mut self, order: Order) -> Self {
        self.order = Some(order);
        self
    }

    pub fn with_first_result(mut self, first_result: usize) -> Self {
        self.first_result = first_result;
        self
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    pub fn target(&self) -> &DataDefinitionRef {
        &self.target
    }

    pub fn restrictions(&self) -> &[Restriction] {
        &self.restrictions
    }

    pub fn order(&self) -> Option<&Order> {
        self.order.as_ref()
    }

    pub fn first_result(&self) -> usize {
        self.first_result
    }

    pub fn max_results(&self) -> usize {
        self.max_results
    }

    /// 替换全部限制条件（执行前的取值转换使用）
    pub(crate) fn with_restrictions(mut self, restrictions: Vec<Restriction>) -> Self {
        self.restrictions = restrictions;
        self
    }
}

impl fmt::Display for SearchCriteria {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.target)?;
        if !self.restrictions.is_empty() {
            let parts: Vec<String> = self.restrictions.iter().map(|r| r.to_string()).collect();
            write!(f, " where {}", parts.join(" and "))?;
        }
        if let Some(order) = &self.order {
            write!(f, " order by {} {}", order.field, order.direction)?;
        }
        write!(f, " offset {}", self.first_result)?;
        if self.max_results != usize::MAX {
            write!(f, " limit {}", self.max_results)?;
        }
        Ok(())
    }
}

// ==========================================
// SearchCriteriaBuilder - 流式查询构建器
// ==========================================
#[derive(Clone)]
pub struct SearchCriteriaBuilder {
    access: Arc<dyn DataAccess>,
    criteria: SearchCriteria,
}

impl SearchCriteriaBuilder {
    pub fn new(access: Arc<dyn DataAccess>, target: DataDefinitionRef) -> Self {
        Self {
            access,
            criteria: SearchCriteria::new(target),
        }
    }

    pub fn restricted_with(mut self, restriction: Restriction) -> Self {
        self.criteria = self.criteria.restricted_with(restriction);
        self
    }

    pub fn order_asc_by(mut self, field: &str) -> Self {
        self.criteria = self.criteria.order_by(Order::asc(field));
        self
    }

    pub fn order_desc_by(mut self, field: &str) -> Self {
        self.criteria = self.criteria.order_by(Order::desc(field));
        self
    }

    pub fn with_first_result(mut self, first_result: usize) -> Self {
        self.criteria = self.criteria.with_first_result(first_result);
        self
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.criteria = self.criteria.with_max_results(max_results);
        self
    }

    pub fn criteria(&self) -> &SearchCriteria {
        &self.criteria
    }

    pub fn into_criteria(self) -> SearchCriteria {
        self.criteria
    }

    /// 执行查询
    pub fn list(&self) -> ModelResult<SearchResult> {
        self.access.execute(&self.criteria)
    }

    /// 第一条匹配记录
    pub fn first(&self) -> ModelResult<Option<Entity>> {
        let criteria = self.criteria.clone().with_max_results(1);
        Ok(self.access.execute(&criteria)?.entities.into_iter().next())
    }
}

impl fmt::Debug for SearchCriteriaBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchCriteriaBuilder")
            .field("criteria", &self.criteria)
            .finish()
    }
}
