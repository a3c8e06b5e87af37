// ==========================================
// 制造执行系统 - 校验结果
// ==========================================
// 职责: 承载一次校验过程产生的字段级/全局错误
// 说明: 校验结果作为返回值显式传递，不挂在实体上
// ==========================================

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::i18n;

/// 本地化错误消息（消息键 + 位置参数）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorMessage {
    pub key: String,
    pub params: Vec<String>,
}

impl ErrorMessage {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            params: Vec::new(),
        }
    }

    pub fn with_params<I, S>(key: impl Into<String>, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            key: key.into(),
            params: params.into_iter().map(Into::into).collect(),
        }
    }

    /// 按指定语言翻译
    pub fn translate(&self, locale: &str) -> String {
        i18n::translate_message(self, locale)
    }
}

// ==========================================
// ValidationOutcome - 校验结果
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationOutcome {
    field_errors: BTreeMap<String, Vec<ErrorMessage>>,
    global_errors: Vec<ErrorMessage>,
}

impl ValidationOutcome {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加字段错误（同一字段可有多条，保持追加顺序）
    pub fn add_error(&mut self, field: &str, message: ErrorMessage) {
        self.field_errors
            .entry(field.to_string())
            .or_default()
            .push(message);
    }

    pub fn add_global_error(&mut self, message: ErrorMessage) {
        self.global_errors.push(message);
    }

    pub fn is_valid(&self) -> bool {
        self.field_errors.is_empty() && self.global_errors.is_empty()
    }

    pub fn is_field_valid(&self, field: &str) -> bool {
        !self.field_errors.contains_key(field)
    }

    pub fn field_errors(&self, field: &str) -> &[ErrorMessage] {
        self.field_errors
            .get(field)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn all_field_errors(&self) -> &BTreeMap<String, Vec<ErrorMessage>> {
        &self.field_errors
    }

    pub fn global_errors(&self) -> &[ErrorMessage] {
        &self.global_errors
    }

    /// 错误总数（字段 + 全局）
    pub fn error_count(&self) -> usize {
        self.field_errors.values().map(Vec::len).sum::<usize>() + self.global_errors.len()
    }

    /// 合并另一次校验的结果
    pub fn merge(&mut self, other: ValidationOutcome) {
        for (field, messages) in other.field_errors {
            self.field_errors.entry(field).or_default().extend(messages);
        }
        self.global_errors.extend(other.global_errors);
    }

    /// 翻译全部字段错误
    pub fn translate_field_errors(&self, locale: &str) -> BTreeMap<String, Vec<String>> {
        self.field_errors
            .iter()
            .map(|(field, messages)| {
                (
                    field.clone(),
                    messages.iter().map(|m| m.translate(locale)).collect(),
                )
            })
            .collect()
    }

    /// 翻译全部全局错误
    pub fn translate_global_errors(&self, locale: &str) -> Vec<String> {
        self.global_errors
            .iter()
            .map(|m| m.translate(locale))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multiple_errors_per_field_keep_order() {
        let mut outcome = ValidationOutcome::new();
        outcome.add_error("name", ErrorMessage::new("first"));
        outcome.add_error("name", ErrorMessage::new("second"));

        let keys: Vec<&str> = outcome
            .field_errors("name")
            .iter()
            .map(|m| m.key.as_str())
            .collect();
        assert_eq!(keys, vec!["first", "second"]);
        assert!(!outcome.is_valid());
        assert!(outcome.is_field_valid("number"));
        assert_eq!(outcome.error_count(), 2);
    }

    #[test]
    fn test_merge() {
        let mut a = ValidationOutcome::new();
        a.add_error("name", ErrorMessage::new("first"));

        let mut b = ValidationOutcome::new();
        b.add_error("name", ErrorMessage::new("second"));
        b.add_global_error(ErrorMessage::new("global"));

        a.merge(b);
        assert_eq!(a.field_errors("name").len(), 2);
        assert_eq!(a.global_errors().len(), 1);
    }
}
