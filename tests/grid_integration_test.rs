// ==========================================
// 表格状态集成测试（SQLite）
// ==========================================
// 测试目标: 分页修正、选中实体删除/移动、消息翻译
// ==========================================


use mes_core::grid::{GridColumn, GridState, MessageType};
use mes_core::repository::DataAccess;
use serde_json::json;
use std::sync::Arc;
use test_helpers::*;

fn operation_grid(access: Arc<mes_core::repository::DataAccessService>) -> GridState {
    GridState::new(
        access,
        &operation_ref(),
        vec![
            GridColumn::for_field("name"),
            GridColumn::for_field("priority"),
            GridColumn::new("product").with_expression("#product['number']"),
        ],
    )
    .unwrap()
    .with_scope_field("product")
    .unwrap()
    .with_order("priority", "asc")
}

#[test]
fn test_page_past_end_is_corrected() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    let access = open_access(&db_path).unwrap();
    for i in 1..=25 {
        insert_product(&access, &format!("P-{:02}", i), "product");
    }

    let mut grid = GridState::new(access, &product_ref(), vec![GridColumn::for_field("number")])
        .unwrap()
        .with_order("number", "asc");
    grid.initialize_content(&json!({ "firstEntity": 40, "maxEntities": 10 }))
        .unwrap();

    let content = grid.render_content().unwrap();
    assert_eq!(content["firstEntity"], 20);
    assert_eq!(content["totalEntities"], 25);
    let entities = content["entities"].as_array().unwrap();
    assert_eq!(entities.len(), 5);
    assert_eq!(entities[0]["fields"]["number"], "P-21");
}

#[test]
fn test_scoped_grid_renders_related_columns() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    let access = open_access(&db_path).unwrap();
    let product = insert_product(&access, "P-01", "Bolt");
    insert_operation(&access, product, "cut");
    insert_operation(&access, product, "drill");

    let mut grid = operation_grid(access);
    grid.initialize_context(&json!({ "belongsToEntityId": product })).unwrap();

    let content = grid.render_content().unwrap();
    let entities = content["entities"].as_array().unwrap();
    assert_eq!(entities.len(), 2);
    assert_eq!(entities[0]["fields"]["name"], "cut");
    assert_eq!(entities[0]["fields"]["priority"], "1");
    assert_eq!(entities[0]["fields"]["product"], "P-01");
}

#[test]
fn test_move_and_remove_selected_entity() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    let access = open_access(&db_path).unwrap();
    let product = insert_product(&access, "P-01", "Bolt");
    let cut = insert_operation(&access, product, "cut");
    let drill = insert_operation(&access, product, "drill");

    let mut grid = operation_grid(access.clone());
    grid.on_scope_entity_id_change(Some(product)).unwrap();

    grid.perform_event("select", &[drill.to_string()]).unwrap();
    grid.perform_event("moveUp", &[]).unwrap();
    assert_eq!(grid.messages()[0].message, "Entity moved");
    assert_eq!(grid.messages()[0].message_type, MessageType::Success);

    let content = grid.render_content().unwrap();
    assert_eq!(content["entities"][0]["fields"]["name"], "drill");

    grid.perform_event("select", &[cut.to_string()]).unwrap();
    grid.perform_event("remove", &[]).unwrap();
    assert_eq!(grid.messages()[1].message, "Entity deleted");
    assert_eq!(grid.selected_entity_id(), None);
    assert!(access.get(&operation_ref(), cut).unwrap().is_none());

    // 无选中实体
    grid.perform_event("remove", &[]).unwrap();
    assert_eq!(grid.messages()[2].message, "Entity not found");
    assert_eq!(grid.messages()[2].message_type, MessageType::Failure);

    let content = grid.render_content().unwrap();
    assert_eq!(content["totalEntities"], 1);
}

#[test]
fn test_messages_follow_grid_locale() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    let access = open_access(&db_path).unwrap();
    let product = insert_product(&access, "P-01", "Bolt");
    let cut = insert_operation(&access, product, "cut");

    let mut grid = operation_grid(access).with_locale("zh-CN");
    grid.on_scope_entity_id_change(Some(product)).unwrap();
    grid.perform_event("select", &[cut.to_string()]).unwrap();
    grid.perform_event("remove", &[]).unwrap();
    assert_eq!(grid.messages()[0].message, "删除成功");
}

#[test]
fn test_unknown_event_is_an_error() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    let access = open_access(&db_path).unwrap();
    let mut grid = operation_grid(access);
    assert!(grid.perform_event("explode", &[]).is_err());
}
