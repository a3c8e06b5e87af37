// ==========================================
// 数据访问服务 + SQLite 存储集成测试
// ==========================================
// 测试目标: 保存/校验/检索/分页/级联/排序号在真实数据库上的行为
// ==========================================


use chrono::NaiveDate;
use mes_core::logging;
use mes_core::model::ModelError;
use mes_core::repository::{DataAccess, EntityStore, MemoryEntityStore, SqliteEntityStore};
use mes_core::search::{Restrictions, SearchCriteria};
use std::sync::Arc;
use rust_decimal::Decimal;
use std::str::FromStr;
use test_helpers::*;

fn field_error_keys(outcome: &mes_core::repository::SaveOutcome, field: &str) -> Vec<String> {
    outcome
        .validation
        .field_errors(field)
        .iter()
        .map(|m| m.key.clone())
        .collect()
}

// ==========================================
// 保存与类型转换
// ==========================================

#[test]
fn test_save_converts_all_field_types() {
    logging::init_test();
    let (_temp_file, db_path) = create_test_db().unwrap();
    let access = open_access(&db_path).unwrap();

    let mut product = new_entity(&access, &product_ref());
    product.set_field("number", "p-100");
    product.set_field("name", "Bolt M8");
    product.set_field("price", "12.50");
    product.set_field("quantity", "7");
    product.set_field("validFrom", "2024-01-05");
    let outcome = access.save(product).unwrap();
    assert!(outcome.is_valid(), "{:?}", outcome.validation);

    let id = outcome.entity.id().unwrap();
    let loaded = access.get(&product_ref(), id).unwrap().unwrap();
    assert_eq!(loaded.string_field("name"), Some("Bolt M8"));
    assert_eq!(loaded.decimal_field("price"), Some(Decimal::from_str("12.5").unwrap()));
    assert_eq!(loaded.integer_field("quantity"), Some(7));
    assert_eq!(loaded.string_field("kind"), Some("component"));
    assert_eq!(loaded.bool_field("active"), Some(true));
    assert_eq!(
        loaded.date_field("validFrom"),
        Some(NaiveDate::from_ymd_opt(2024, 1, 5).unwrap())
    );
    // onSave 钩子
    assert_eq!(loaded.string_field("code"), Some("P-100"));
}

#[test]
fn test_update_keeps_identity_and_runs_hooks() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    let access = open_access(&db_path).unwrap();
    let id = insert_product(&access, "p-1", "Bolt");

    let mut product = access.get(&product_ref(), id).unwrap().unwrap();
    product.set_field("number", "p-2");
    let outcome = access.save(product).unwrap();
    assert!(outcome.is_valid());
    assert_eq!(outcome.entity.id(), Some(id));
    assert_eq!(outcome.entity.string_field("code"), Some("P-2"));

    let total = access.find(&product_ref()).unwrap().list().unwrap().total_number_of_entities;
    assert_eq!(total, 1);
}

#[test]
fn test_update_of_missing_entity_fails() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    let access = open_access(&db_path).unwrap();

    let mut ghost = mes_core::model::Entity::with_id(product_ref(), 42);
    ghost.set_field("number", "p-1");
    ghost.set_field("name", "Ghost");
    assert!(matches!(access.save(ghost), Err(ModelError::EntityNotFound { .. })));
}

// ==========================================
// 校验
// ==========================================

#[test]
fn test_validation_errors_are_reported_per_field() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    let access = open_access(&db_path).unwrap();

    let cases = [
        ("price", "abc", "core.validate.field.error.invalidNumericFormat"),
        ("price", "-1", "core.validate.field.error.custom"),
        ("price", "1.234", "core.validate.field.error.invalidScale.max"),
        ("price", "123456.78", "core.validate.field.error.invalidPrecision.max"),
        ("quantity", "0", "core.validate.field.error.outOfRange.toSmall"),
        ("quantity", "101", "core.validate.field.error.outOfRange.toLarge"),
        ("kind", "raw", "core.validate.field.error.invalidDictionaryItem"),
        ("validTo", "05/01/2024", "core.validate.field.error.invalidDateFormat"),
    ];

    for (field, value, key) in cases {
        let mut product = new_entity(&access, &product_ref());
        product.set_field("number", "p-1");
        product.set_field("name", "Bolt");
        product.set_field(field, value);

        let outcome = access.save(product).unwrap();
        assert!(!outcome.is_valid(), "{} = {} 应校验失败", field, value);
        assert_eq!(field_error_keys(&outcome, field), vec![key.to_string()], "{} = {}", field, value);
    }

    assert_eq!(access.find(&product_ref()).unwrap().list().unwrap().total_number_of_entities, 0);
}

#[test]
fn test_required_and_unique() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    let access = open_access(&db_path).unwrap();
    insert_product(&access, "p-1", "Bolt");

    let mut product = new_entity(&access, &product_ref());
    product.set_field("number", "p-1");
    let outcome = access.save(product).unwrap();
    assert_eq!(
        field_error_keys(&outcome, "number"),
        vec!["core.validate.field.error.duplicated".to_string()]
    );
    assert_eq!(
        field_error_keys(&outcome, "name"),
        vec!["core.validate.field.error.missing".to_string()]
    );
    assert_eq!(
        outcome.validation.translate_field_errors("en")["name"],
        vec!["Field is required".to_string()]
    );
}

#[test]
fn test_entity_validator_adds_global_error() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    let access = open_access(&db_path).unwrap();

    let mut product = new_entity(&access, &product_ref());
    product.set_field("number", "p-1");
    product.set_field("name", "Bolt");
    product.set_field("validFrom", "2024-02-01");
    product.set_field("validTo", "2024-01-01");

    let outcome = access.save(product).unwrap();
    assert!(!outcome.is_valid());
    assert_eq!(outcome.validation.global_errors()[0].key, "core.validate.global.error.custom");
}

#[test]
fn test_reference_must_exist() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    let access = open_access(&db_path).unwrap();

    let mut operation = new_entity(&access, &operation_ref());
    operation.set_field("name", "cut");
    operation.set_field("product", 999i64);

    let outcome = access.save(operation).unwrap();
    assert_eq!(
        field_error_keys(&outcome, "product"),
        vec!["core.validate.field.error.referenceNotFound".to_string()]
    );
}

// ==========================================
// 检索与分页
// ==========================================

#[test]
fn test_search_like_order_and_paging() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    let access = open_access(&db_path).unwrap();
    for i in 1..=25 {
        insert_product(&access, &format!("P-{:02}", i), "product");
    }

    let page = access
        .find(&product_ref())
        .unwrap()
        .order_desc_by("number")
        .with_first_result(20)
        .with_max_results(10)
        .list()
        .unwrap();
    assert_eq!(page.total_number_of_entities, 25);
    assert_eq!(page.entities.len(), 5);
    assert_eq!(page.entities[0].string_field("number"), Some("P-05"));

    let like = access
        .find(&product_ref())
        .unwrap()
        .restricted_with(Restrictions::like("number", "p-1*"))
        .list()
        .unwrap();
    assert_eq!(like.total_number_of_entities, 10);

    let past_end = access
        .find(&product_ref())
        .unwrap()
        .with_first_result(30)
        .with_max_results(10)
        .list()
        .unwrap();
    assert!(past_end.needs_page_correction());
}

#[test]
fn test_search_through_relation_and_belongs_to() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    let access = open_access(&db_path).unwrap();
    let bolt = insert_product(&access, "P-01", "Bolt");
    let nut = insert_product(&access, "P-02", "Nut");
    insert_operation(&access, bolt, "cut");
    insert_operation(&access, bolt, "drill");
    insert_operation(&access, nut, "press");

    let bolt_operations = access
        .find(&operation_ref())
        .unwrap()
        .restricted_with(Restrictions::belongs_to("product", bolt))
        .list()
        .unwrap();
    assert_eq!(bolt_operations.total_number_of_entities, 2);

    let by_number = access
        .find(&operation_ref())
        .unwrap()
        .restricted_with(Restrictions::eq("product.number", "P-02"))
        .first()
        .unwrap()
        .unwrap();
    assert_eq!(by_number.string_field("name"), Some("press"));

    // 取值无法转换时结果为空
    let none = access
        .find(&product_ref())
        .unwrap()
        .restricted_with(Restrictions::eq("quantity", "many"))
        .list()
        .unwrap();
    assert_eq!(none.total_number_of_entities, 0);
}

#[test]
fn test_unsupported_search_is_rejected() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    let access = open_access(&db_path).unwrap();

    let order_by_list = access.find(&product_ref()).unwrap().order_asc_by("operations").list();
    assert!(matches!(order_by_list, Err(ModelError::UnsupportedFieldOperation { .. })));

    let unknown = access
        .find(&product_ref())
        .unwrap()
        .restricted_with(Restrictions::eq("weight", 1i64))
        .list();
    assert!(matches!(unknown, Err(ModelError::UnknownField { .. })));
}

#[test]
fn test_like_matches_same_rows_in_both_stores() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    let registry = Arc::new(test_schema().build(&test_hooks()).unwrap());
    let product = registry.resolve(&product_ref()).unwrap();

    let sqlite = SqliteEntityStore::new(&db_path, registry.clone()).unwrap();
    sqlite.ensure_all().unwrap();
    let memory = MemoryEntityStore::new(registry.clone());
    for definition in registry.definitions() {
        memory.ensure_schema(definition).unwrap();
    }
    let stores: [&dyn EntityStore; 2] = [&sqlite, &memory];

    for (number, name) in [("P-1", "Äpfel"), ("P-2", "bolt"), ("P-3", "Bolt M8")] {
        let mut entity = product.create();
        entity.set_field("number", number);
        entity.set_field("name", name);
        for store in stores {
            store.insert(&product, &entity).unwrap();
        }
    }

    for (pattern, expected) in [("BOLT*", 2), ("Äp*", 1), ("äp*", 0), ("*m8", 1)] {
        let criteria =
            SearchCriteria::new(product_ref()).restricted_with(Restrictions::like("name", pattern));
        for store in stores {
            let total = store.search(&product, &criteria).unwrap().total_number_of_entities;
            assert_eq!(total, expected, "pattern {}", pattern);
        }
    }
}

// ==========================================
// 级联与排序号
// ==========================================

#[test]
fn test_delete_cascades_and_nullifies() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    let access = open_access(&db_path).unwrap();
    let product = insert_product(&access, "P-01", "Bolt");
    let operation = insert_operation(&access, product, "cut");

    let mut order = new_entity(&access, &order_ref());
    order.set_field("number", "O-1");
    let order = access.save(order).unwrap().entity.id().unwrap();
    let mut line = new_entity(&access, &line_ref());
    line.set_field("product", "bolt");
    line.set_field("order", order);
    let line = access.save(line).unwrap().entity.id().unwrap();

    assert!(access.delete(&product_ref(), product).unwrap());
    assert!(access.get(&operation_ref(), operation).unwrap().is_none());

    assert!(access.delete(&order_ref(), order).unwrap());
    let line = access.get(&line_ref(), line).unwrap().unwrap();
    assert_eq!(line.belongs_to_id("order"), None);

    assert!(!access.delete(&order_ref(), order).unwrap());
}

#[test]
fn test_priority_move_and_delete() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    let access = open_access(&db_path).unwrap();
    let product = insert_product(&access, "P-01", "Bolt");
    let other = insert_product(&access, "P-02", "Nut");
    let first = insert_operation(&access, product, "cut");
    let second = insert_operation(&access, product, "drill");
    let third = insert_operation(&access, product, "paint");
    let foreign = insert_operation(&access, other, "press");

    let priority = |id: i64| {
        access
            .get(&operation_ref(), id)
            .unwrap()
            .unwrap()
            .integer_field("priority")
    };
    assert_eq!(priority(third), Some(3));
    assert_eq!(priority(foreign), Some(1));

    // 越界偏移收敛到第一位
    access.move_entity(&operation_ref(), third, -5).unwrap();
    assert_eq!(priority(third), Some(1));
    assert_eq!(priority(first), Some(2));
    assert_eq!(priority(second), Some(3));
    assert_eq!(priority(foreign), Some(1));

    access.delete(&operation_ref(), first).unwrap();
    assert_eq!(priority(third), Some(1));
    assert_eq!(priority(second), Some(2));

    let ordered = access
        .find(&operation_ref())
        .unwrap()
        .restricted_with(Restrictions::belongs_to("product", product))
        .order_asc_by("priority")
        .list()
        .unwrap();
    let names: Vec<_> = ordered.entities.iter().filter_map(|e| e.string_field("name")).collect();
    assert_eq!(names, vec!["paint", "drill"]);
}

#[test]
fn test_data_survives_reopen() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    let id = {
        let access = open_access(&db_path).unwrap();
        insert_product(&access, "P-01", "Bolt")
    };

    let access = open_access(&db_path).unwrap();
    let product = access.get(&product_ref(), id).unwrap().unwrap();
    assert_eq!(product.string_field("number"), Some("P-01"));
    let operations = product.has_many_field("operations").unwrap();
    assert!(operations.is_empty().unwrap());
}
