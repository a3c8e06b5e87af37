// ==========================================
// 制造执行系统 - 插件管理器
// ==========================================
// 职责: 插件注册、持久化状态恢复、启用/禁用（依赖检查）
// 红线: 系统插件不能禁用；被已启用插件依赖的插件不能禁用
// ==========================================

use std::collections::BTreeMap;
use tracing::{info, warn};

use crate::plugin::core::Plugin;
use crate::plugin::error::{PluginError, PluginResult};
use crate::plugin::state::PluginState;
use crate::repository::plugin_state_repo::PluginStateRepository;

#[derive(Default)]
pub struct PluginManager {
    plugins: BTreeMap<String, Plugin>,
    repository: Option<PluginStateRepository>,
}

impl PluginManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// 配置状态持久化
    pub fn with_repository(mut self, repository: PluginStateRepository) -> Self {
        self.repository = Some(repository);
        self
    }

    pub fn register(&mut self, plugin: Plugin) -> PluginResult<()> {
        if self.plugins.contains_key(plugin.identifier()) {
            return Err(PluginError::DuplicatePlugin(plugin.identifier().to_string()));
        }
        self.plugins.insert(plugin.identifier().to_string(), plugin);
        Ok(())
    }

    pub fn plugin(&self, identifier: &str) -> Option<&Plugin> {
        self.plugins.get(identifier)
    }

    pub fn plugins(&self) -> impl Iterator<Item = &Plugin> {
        self.plugins.values()
    }

    fn require(&self, identifier: &str) -> PluginResult<&Plugin> {
        self.plugins
            .get(identifier)
            .ok_or_else(|| PluginError::PluginNotFound(identifier.to_string()))
    }

    fn require_mut(&mut self, identifier: &str) -> PluginResult<&mut Plugin> {
        self.plugins
            .get_mut(identifier)
            .ok_or_else(|| PluginError::PluginNotFound(identifier.to_string()))
    }

    fn persist(&self, identifier: &str) -> PluginResult<()> {
        let (Some(repository), Some(plugin)) = (&self.repository, self.plugins.get(identifier)) else {
            return Ok(());
        };
        repository.save(plugin.identifier(), &plugin.version().to_string(), plugin.state())?;
        Ok(())
    }

    /// 恢复持久化状态并初始化插件
    ///
    /// - 有记录: 恢复记录状态；Enabling 在恢复后完成启用
    /// - 无记录: 系统插件启用，其余禁用
    pub fn initialize(&mut self) -> PluginResult<()> {
        let identifiers: Vec<String> = self.plugins.keys().cloned().collect();

        for identifier in &identifiers {
            let record = match &self.repository {
                Some(repository) => repository.find(identifier)?,
                None => None,
            };
            let plugin = self.require_mut(identifier)?;
            if !plugin.has_state(PluginState::Unknown) {
                continue;
            }

            let restored = match &record {
                Some(record) => {
                    if record.version != plugin.version().to_string() {
                        warn!(
                            plugin = %identifier,
                            stored = %record.version,
                            current = %plugin.version(),
                            "插件版本与持久化记录不一致"
                        );
                    }
                    record.state
                }
                None if plugin.is_system() => PluginState::Enabled,
                None => PluginState::Disabled,
            };
            plugin.change_state_to(restored)?;
            if restored == PluginState::Enabling {
                plugin.change_state_to(PluginState::Enabled)?;
            }
            self.persist(identifier)?;
        }

        for plugin in self.plugins.values() {
            if plugin.has_state(PluginState::Unknown) || plugin.has_state(PluginState::Temporary) {
                continue;
            }
            plugin.init()?;
        }
        info!(plugins = identifiers.len(), "插件初始化完成");
        Ok(())
    }

    /// 检查依赖: 已注册、已启用且版本在区间内
    fn check_dependencies(&self, plugin: &Plugin) -> PluginResult<()> {
        for dependency in plugin.dependencies() {
            let satisfied = self
                .plugins
                .get(&dependency.identifier)
                .map(|d| d.has_state(PluginState::Enabled) && dependency.version.contains(d.version()))
                .unwrap_or(false);
            if !satisfied {
                return Err(PluginError::UnsatisfiedDependency {
                    identifier: plugin.identifier().to_string(),
                    dependency: dependency.identifier.clone(),
                    required: dependency.version.to_string(),
                });
            }
        }
        Ok(())
    }

    pub fn enable_plugin(&mut self, identifier: &str) -> PluginResult<()> {
        let plugin = self.require(identifier)?;
        if plugin.has_state(PluginState::Enabled) {
            return Ok(());
        }
        if let Err(e) = self.check_dependencies(plugin) {
            warn!(plugin = %identifier, error = %e, "插件启用被拒绝");
            return Err(e);
        }

        let plugin = self.require_mut(identifier)?;
        if plugin.has_state(PluginState::Temporary) {
            plugin.change_state_to(PluginState::Enabling)?;
        }
        plugin.change_state_to(PluginState::Enabled)?;
        self.persist(identifier)
    }

    pub fn disable_plugin(&mut self, identifier: &str) -> PluginResult<()> {
        let plugin = self.require(identifier)?;
        if plugin.has_state(PluginState::Disabled) {
            return Ok(());
        }
        if plugin.is_system() {
            warn!(plugin = %identifier, "系统插件不能禁用");
            return Err(PluginError::SystemPlugin(identifier.to_string()));
        }

        let dependents: Vec<String> = self
            .plugins
            .values()
            .filter(|p| p.has_state(PluginState::Enabled))
            .filter(|p| p.dependencies().iter().any(|d| d.identifier == identifier))
            .map(|p| p.identifier().to_string())
            .collect();
        if !dependents.is_empty() {
            warn!(plugin = %identifier, ?dependents, "插件仍被依赖，不能禁用");
            return Err(PluginError::HasEnabledDependents {
                identifier: identifier.to_string(),
                dependents,
            });
        }

        self.require_mut(identifier)?.change_state_to(PluginState::Disabled)?;
        self.persist(identifier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_sqlite_connection;
    use std::sync::{Arc, Mutex};

    fn plugin(identifier: &str, version: &str) -> Plugin {
        Plugin::builder(identifier).with_version(version).build().unwrap()
    }

    fn repository() -> PluginStateRepository {
        let conn = open_sqlite_connection(":memory:").unwrap();
        PluginStateRepository::from_connection(Arc::new(Mutex::new(conn))).unwrap()
    }

    #[test]
    fn test_initialize_defaults() {
        let mut manager = PluginManager::new();
        manager
            .register(Plugin::builder("core").with_version("1.0").as_system().build().unwrap())
            .unwrap();
        manager.register(plugin("basic", "1.0")).unwrap();
        manager.initialize().unwrap();

        assert_eq!(manager.plugin("core").unwrap().state(), PluginState::Enabled);
        assert_eq!(manager.plugin("basic").unwrap().state(), PluginState::Disabled);
        assert!(matches!(
            manager.register(plugin("basic", "2.0")),
            Err(PluginError::DuplicatePlugin(_))
        ));
    }

    #[test]
    fn test_dependencies_checked_on_enable() {
        let mut manager = PluginManager::new();
        manager.register(plugin("core", "1.5")).unwrap();
        manager
            .register(
                Plugin::builder("orders")
                    .with_version("1.0")
                    .with_dependency("core", "[1.0,2.0)")
                    .build()
                    .unwrap(),
            )
            .unwrap();
        manager.initialize().unwrap();

        assert!(matches!(
            manager.enable_plugin("orders"),
            Err(PluginError::UnsatisfiedDependency { .. })
        ));

        manager.enable_plugin("core").unwrap();
        manager.enable_plugin("orders").unwrap();
        assert_eq!(manager.plugin("orders").unwrap().state(), PluginState::Enabled);

        assert!(matches!(
            manager.disable_plugin("core"),
            Err(PluginError::HasEnabledDependents { .. })
        ));
        manager.disable_plugin("orders").unwrap();
        manager.disable_plugin("core").unwrap();
    }

    #[test]
    fn test_version_outside_range_is_rejected() {
        let mut manager = PluginManager::new();
        manager
            .register(Plugin::builder("core").with_version("2.0").as_system().build().unwrap())
            .unwrap();
        manager
            .register(
                Plugin::builder("orders")
                    .with_version("1.0")
                    .with_dependency("core", "[1.0,2.0)")
                    .build()
                    .unwrap(),
            )
            .unwrap();
        manager.initialize().unwrap();

        assert!(manager.enable_plugin("orders").is_err());
        assert!(matches!(manager.disable_plugin("core"), Err(PluginError::SystemPlugin(_))));
        assert!(matches!(manager.enable_plugin("missing"), Err(PluginError::PluginNotFound(_))));
    }

    #[test]
    fn test_states_are_persisted_and_restored() {
        let repository = repository();
        repository.save("basic", "1.0.0", PluginState::Enabling).unwrap();
        repository.save("temp", "1.0.0", PluginState::Temporary).unwrap();

        let mut manager = PluginManager::new().with_repository(repository);
        manager.register(plugin("basic", "1.0")).unwrap();
        manager.register(plugin("temp", "1.0")).unwrap();
        manager.initialize().unwrap();

        assert_eq!(manager.plugin("basic").unwrap().state(), PluginState::Enabled);
        assert_eq!(manager.plugin("temp").unwrap().state(), PluginState::Temporary);

        manager.enable_plugin("temp").unwrap();
        manager.disable_plugin("basic").unwrap();

        let repository = manager.repository.as_ref().unwrap();
        assert_eq!(repository.find("temp").unwrap().unwrap().state, PluginState::Enabled);
        assert_eq!(repository.find("basic").unwrap().unwrap().state, PluginState::Disabled);
    }
}
