// ==========================================
// 制造执行系统 - SQL 构建工具
// ==========================================
// 职责: 条件查询翻译为 SQL 时使用的标识符引用、LIKE 转义与流式构建器
// ==========================================

/// 引用 SQL 标识符（双引号，内部双引号加倍）
///
/// # 示例
/// ```
/// use mes_core::repository::sql_builder::quote_identifier;
///
/// assert_eq!(quote_identifier("basic_product"), "\"basic_product\"");
/// assert_eq!(quote_identifier("a\"b"), "\"a\"\"b\"");
/// ```
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// 通配符模式转为 LIKE 模式（'*' -> '%'，转义 % _ \）
///
/// 配合 `LIKE ? ESCAPE '\'` 使用
///
/// # 示例
/// ```
/// use mes_core::repository::sql_builder::glob_to_like;
///
/// assert_eq!(glob_to_like("bo*"), "bo%");
/// assert_eq!(glob_to_like("50%*"), "50\\%%");
/// ```
pub fn glob_to_like(pattern: &str) -> String {
    let mut like = String::with_capacity(pattern.len());
    for c in pattern.chars() {
        match c {
            '*' => like.push('%'),
            '%' | '_' | '\\' => {
                like.push('\\');
                like.push(c);
            }
            other => like.push(other),
        }
    }
    like
}

/// SQL 查询构建器（流式 API）
///
/// # 示例
/// ```
/// use mes_core::repository::sql_builder::SqlQueryBuilder;
///
/// let builder = SqlQueryBuilder::new("SELECT t.* FROM \"basic_product\" t")
///     .join("LEFT JOIN \"basic_unit\" j_unit ON j_unit.id = t.\"unit_id\"")
///     .where_clause("t.\"name\" = ?")
///     .where_clause("j_unit.\"code\" = ?")
///     .order_by("t.\"name\" ASC, t.id ASC")
///     .limit(10)
///     .offset(20);
///
/// let sql = builder.build();
/// assert!(sql.contains("WHERE t.\"name\" = ? AND j_unit.\"code\" = ?"));
/// assert!(sql.ends_with("ORDER BY t.\"name\" ASC, t.id ASC LIMIT 10 OFFSET 20"));
/// ```
#[derive(Debug, Clone)]
pub struct SqlQueryBuilder {
    select_clause: String,
    join_clauses: Vec<String>,
    where_clauses: Vec<String>,
    order_by_clause: Option<String>,
    limit_clause: Option<i64>,
    offset_clause: Option<i64>,
}

impl SqlQueryBuilder {
    /// 创建新的 SQL 查询构建器（select 包含 FROM 子句）
    pub fn new(select: &str) -> Self {
        Self {
            select_clause: select.to_string(),
            join_clauses: Vec::new(),
            where_clauses: Vec::new(),
            order_by_clause: None,
            limit_clause: None,
            offset_clause: None,
        }
    }

    /// 添加 JOIN 子句（重复的 JOIN 只保留一次）
    pub fn join(mut self, join: &str) -> Self {
        if !self.join_clauses.iter().any(|j| j == join) {
            self.join_clauses.push(join.to_string());
        }
        self
    }

    /// 添加 WHERE 条件
    pub fn where_clause(mut self, condition: &str) -> Self {
        self.where_clauses.push(condition.to_string());
        self
    }

    /// 添加 ORDER BY 子句
    pub fn order_by(mut self, order: &str) -> Self {
        self.order_by_clause = Some(order.to_string());
        self
    }

    /// 添加 LIMIT 子句（-1 表示不限制）
    pub fn limit(mut self, n: i64) -> Self {
        self.limit_clause = Some(n);
        self
    }

    /// 添加 OFFSET 子句（SQLite 要求 OFFSET 前必须有 LIMIT）
    pub fn offset(mut self, n: i64) -> Self {
        self.offset_clause = Some(n);
        self
    }

    fn push_from_and_where(&self, sql: &mut String) {
        for join in &self.join_clauses {
            sql.push(' ');
            sql.push_str(join);
        }
        if !self.where_clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&self.where_clauses.join(" AND "));
        }
    }

    /// 构建最终的 SQL 语句
    pub fn build(&self) -> String {
        let mut sql = self.select_clause.clone();
        self.push_from_and_where(&mut sql);

        if let Some(order) = &self.order_by_clause {
            sql.push_str(" ORDER BY ");
            sql.push_str(order);
        }

        match (self.limit_clause, self.offset_clause) {
            (Some(limit), Some(offset)) => sql.push_str(&format!(" LIMIT {} OFFSET {}", limit, offset)),
            (Some(limit), None) => sql.push_str(&format!(" LIMIT {}", limit)),
            (None, Some(offset)) => sql.push_str(&format!(" LIMIT -1 OFFSET {}", offset)),
            (None, None) => {}
        }

        sql
    }

    /// 构建计数语句（同样的 JOIN/WHERE，不带排序与分页）
    pub fn build_count(&self, count_select: &str) -> String {
        let mut sql = count_select.to_string();
        self.push_from_and_where(&mut sql);
        sql
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sql_builder_basic() {
        let sql = SqlQueryBuilder::new("SELECT t.* FROM \"basic_product\" t")
            .where_clause("t.\"name\" = ?")
            .build();

        assert_eq!(sql, "SELECT t.* FROM \"basic_product\" t WHERE t.\"name\" = ?");
    }

    #[test]
    fn test_sql_builder_duplicate_join_kept_once() {
        let sql = SqlQueryBuilder::new("SELECT t.* FROM t")
            .join("LEFT JOIN u j_u ON j_u.id = t.u_id")
            .join("LEFT JOIN u j_u ON j_u.id = t.u_id")
            .build();

        assert_eq!(sql.matches("LEFT JOIN").count(), 1);
    }

    #[test]
    fn test_sql_builder_offset_without_limit() {
        let sql = SqlQueryBuilder::new("SELECT t.* FROM t").offset(5).build();
        assert_eq!(sql, "SELECT t.* FROM t LIMIT -1 OFFSET 5");
    }

    #[test]
    fn test_sql_builder_count_ignores_paging() {
        let builder = SqlQueryBuilder::new("SELECT t.* FROM t")
            .join("LEFT JOIN u j_u ON j_u.id = t.u_id")
            .where_clause("j_u.code = ?")
            .order_by("t.id ASC")
            .limit(10)
            .offset(10);

        assert_eq!(
            builder.build_count("SELECT COUNT(*) FROM t"),
            "SELECT COUNT(*) FROM t LEFT JOIN u j_u ON j_u.id = t.u_id WHERE j_u.code = ?"
        );
    }

    #[test]
    fn test_glob_to_like_escapes_specials() {
        assert_eq!(glob_to_like("a_b*"), "a\\_b%");
        assert_eq!(glob_to_like("*x*"), "%x%");
    }
}
