// ==========================================
// 制造执行系统 - 字段定义
// ==========================================

use std::fmt;

use crate::model::types::FieldType;
use crate::model::value::FieldValue;
use crate::validators::required::{RequiredOnCreateValidator, RequiredValidator};
use crate::validators::unique::UniqueValidator;
use crate::validators::FieldValidator;

/// 字段定义（名称、类型、默认值、标记、字段级校验器）
pub struct FieldDefinition {
    name: String,
    field_type: FieldType,
    default_value: Option<FieldValue>,
    required: bool,
    required_on_create: bool,
    unique: bool,
    read_only: bool,
    persistent: bool,
    validators: Vec<Box<dyn FieldValidator>>,
}

impl FieldDefinition {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            default_value: None,
            required: false,
            required_on_create: false,
            unique: false,
            read_only: false,
            persistent: true,
            validators: Vec::new(),
        }
    }

    // ===== 构建 =====

    /// 必填（追加必填校验器）
    pub fn required(mut self) -> Self {
        if !self.required {
            self.required = true;
            self.validators.push(Box::new(RequiredValidator::new()));
        }
        self
    }

    /// 新建时必填
    pub fn required_on_create(mut self) -> Self {
        if !self.required_on_create {
            self.required_on_create = true;
            self.validators.push(Box::new(RequiredOnCreateValidator::new()));
        }
        self
    }

    /// 唯一（追加唯一性校验器）
    pub fn unique(mut self) -> Self {
        if !self.unique {
            self.unique = true;
            self.validators.push(Box::new(UniqueValidator::new()));
        }
        self
    }

    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    /// 非持久化字段（参与校验，不落库）
    pub fn transient(mut self) -> Self {
        self.persistent = false;
        self
    }

    pub fn with_default(mut self, value: impl Into<FieldValue>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    pub fn with_validator(mut self, validator: impl FieldValidator + 'static) -> Self {
        self.validators.push(Box::new(validator));
        self
    }

    pub fn with_boxed_validator(mut self, validator: Box<dyn FieldValidator>) -> Self {
        self.validators.push(validator);
        self
    }

    // ===== 查询 =====

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn field_type(&self) -> &FieldType {
        &self.field_type
    }

    pub fn default_value(&self) -> Option<&FieldValue> {
        self.default_value.as_ref()
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn is_required_on_create(&self) -> bool {
        self.required_on_create
    }

    pub fn is_unique(&self) -> bool {
        self.unique
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn is_persistent(&self) -> bool {
        self.persistent
    }

    /// 是否对应存储列（持久化且非一对多）
    pub fn is_stored(&self) -> bool {
        self.persistent && !matches!(self.field_type, FieldType::HasMany { .. })
    }

    pub fn validators(&self) -> &[Box<dyn FieldValidator>] {
        &self.validators
    }
}

impl fmt::Debug for FieldDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDefinition")
            .field("name", &self.name)
            .field("field_type", &self.field_type)
            .field("required", &self.required)
            .field("unique", &self.unique)
            .field("persistent", &self.persistent)
            .field("validators", &self.validators.len())
            .finish()
    }
}
