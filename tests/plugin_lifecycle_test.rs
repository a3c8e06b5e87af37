// ==========================================
// 插件生命周期集成测试
// ==========================================
// 测试目标: 配置声明的插件 -> 初始化 -> 启用/禁用 -> 状态持久化与恢复
// ==========================================


use mes_core::plugin::{PluginError, PluginManager, PluginState};
use mes_core::repository::PluginStateRepository;
use test_helpers::*;

fn open_manager(db_path: &str) -> PluginManager {
    let repository = PluginStateRepository::new(db_path).unwrap();
    let mut manager = PluginManager::new().with_repository(repository);
    for plugin in test_schema().build_plugins().unwrap() {
        manager.register(plugin).unwrap();
    }
    manager.initialize().unwrap();
    manager
}

fn state(manager: &PluginManager, identifier: &str) -> PluginState {
    manager.plugin(identifier).unwrap().state()
}

#[test]
fn test_first_start_enables_system_plugins_only() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    let manager = open_manager(&db_path);

    assert_eq!(state(&manager, "basic"), PluginState::Enabled);
    assert_eq!(state(&manager, "orders"), PluginState::Disabled);

    let records = PluginStateRepository::new(&db_path).unwrap().list().unwrap();
    let persisted: Vec<_> = records
        .iter()
        .map(|r| (r.identifier.as_str(), r.version.as_str(), r.state))
        .collect();
    assert_eq!(
        persisted,
        vec![
            ("basic", "1.0.0", PluginState::Enabled),
            ("orders", "1.1.0", PluginState::Disabled),
        ]
    );
}

#[test]
fn test_states_survive_restart() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    {
        let mut manager = open_manager(&db_path);
        manager.enable_plugin("orders").unwrap();
        assert_eq!(state(&manager, "orders"), PluginState::Enabled);
    }

    let mut manager = open_manager(&db_path);
    assert_eq!(state(&manager, "orders"), PluginState::Enabled);

    manager.disable_plugin("orders").unwrap();
    drop(manager);

    let manager = open_manager(&db_path);
    assert_eq!(state(&manager, "orders"), PluginState::Disabled);
}

#[test]
fn test_system_plugin_and_dependents_block_disable() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    let mut manager = open_manager(&db_path);

    assert!(matches!(
        manager.disable_plugin("basic"),
        Err(PluginError::SystemPlugin(_))
    ));
    assert_eq!(state(&manager, "basic"), PluginState::Enabled);
}

#[test]
fn test_missing_dependency_blocks_enable() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    let repository = PluginStateRepository::new(&db_path).unwrap();
    let mut manager = PluginManager::new().with_repository(repository);
    for plugin in test_schema().build_plugins().unwrap() {
        if plugin.identifier() == "orders" {
            manager.register(plugin).unwrap();
        }
    }
    manager.initialize().unwrap();

    let err = manager.enable_plugin("orders").unwrap_err();
    assert!(matches!(err, PluginError::UnsatisfiedDependency { ref dependency, .. } if dependency == "basic"));
    assert_eq!(state(&manager, "orders"), PluginState::Disabled);
}

#[test]
fn test_unknown_plugin() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    let mut manager = open_manager(&db_path);
    assert!(matches!(
        manager.enable_plugin("reports"),
        Err(PluginError::PluginNotFound(_))
    ));
}
