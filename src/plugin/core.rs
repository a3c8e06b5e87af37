// ==========================================
// 制造执行系统 - 插件
// ==========================================
// 职责: 插件描述信息、依赖声明与状态迁移
// 红线: 非法状态迁移返回错误，模块失败时状态保持不变
// ==========================================

use std::cmp::Ordering;
use std::fmt;
use tracing::{debug, info};

use crate::plugin::error::{PluginError, PluginResult};
use crate::plugin::module::Module;
use crate::plugin::state::{is_transition_possible, PluginState};
use crate::plugin::version::{Version, VersionOfDependency};

/// 插件描述信息
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PluginInformation {
    pub name: Option<String>,
    pub description: Option<String>,
    pub vendor: Option<String>,
    pub vendor_url: Option<String>,
}

/// 依赖声明: 依赖插件标识 + 可接受的版本区间
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginDependency {
    pub identifier: String,
    pub version: VersionOfDependency,
}

pub struct Plugin {
    identifier: String,
    version: Version,
    state: PluginState,
    information: PluginInformation,
    modules: Vec<Box<dyn Module>>,
    dependencies: Vec<PluginDependency>,
    system: bool,
}

impl Plugin {
    pub fn builder(identifier: impl Into<String>) -> PluginBuilder {
        PluginBuilder::new(identifier)
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn version(&self) -> &Version {
        &self.version
    }

    pub fn state(&self) -> PluginState {
        self.state
    }

    pub fn has_state(&self, state: PluginState) -> bool {
        self.state == state
    }

    pub fn information(&self) -> &PluginInformation {
        &self.information
    }

    pub fn dependencies(&self) -> &[PluginDependency] {
        &self.dependencies
    }

    pub fn is_system(&self) -> bool {
        self.system
    }

    /// 迁移状态
    ///
    /// 从已知状态进入 Enabled / Disabled 时依次调用各模块的 enable / disable
    pub fn change_state_to(&mut self, target: PluginState) -> PluginResult<()> {
        if !is_transition_possible(self.state, target) {
            return Err(PluginError::InvalidStateTransition {
                identifier: self.identifier.clone(),
                from: self.state,
                to: target,
            });
        }

        if self.state != PluginState::Unknown {
            match target {
                PluginState::Enabled => self.run_modules("enable", |m| m.enable())?,
                PluginState::Disabled => self.run_modules("disable", |m| m.disable())?,
                _ => {}
            }
        }

        info!(plugin = %self.identifier, from = %self.state, to = %target, "插件状态迁移");
        self.state = target;
        Ok(())
    }

    fn run_modules<F>(&self, action: &str, f: F) -> PluginResult<()>
    where
        F: Fn(&dyn Module) -> anyhow::Result<()>,
    {
        for module in &self.modules {
            debug!(plugin = %self.identifier, module = module.name(), action, "调用插件模块");
            f(module.as_ref()).map_err(|source| PluginError::ModuleFailure {
                identifier: self.identifier.clone(),
                source,
            })?;
        }
        Ok(())
    }

    /// 比较同一插件的版本
    pub fn compare_version(&self, other: &Plugin) -> PluginResult<Ordering> {
        if self.identifier != other.identifier {
            return Err(PluginError::DifferentPlugins(
                self.identifier.clone(),
                other.identifier.clone(),
            ));
        }
        Ok(self.version.cmp(&other.version))
    }

    /// 初始化全部模块（Unknown 状态不允许）
    pub fn init(&self) -> PluginResult<()> {
        if self.has_state(PluginState::Unknown) {
            return Err(PluginError::UnknownState(self.identifier.clone()));
        }
        self.run_modules("init", |m| m.init())
    }

    /// 插件包文件名
    pub fn filename(&self) -> String {
        format!("{}-{}.jar", self.identifier, self.version)
    }
}

impl fmt::Debug for Plugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Plugin")
            .field("identifier", &self.identifier)
            .field("version", &self.version)
            .field("state", &self.state)
            .field("modules", &self.modules.iter().map(|m| m.name()).collect::<Vec<_>>())
            .field("dependencies", &self.dependencies)
            .field("system", &self.system)
            .finish()
    }
}

impl fmt::Display for Plugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.identifier, self.version)
    }
}

// ==========================================
// PluginBuilder
// ==========================================
pub struct PluginBuilder {
    identifier: String,
    version: Option<String>,
    information: PluginInformation,
    modules: Vec<Box<dyn Module>>,
    dependencies: Vec<(String, String)>,
    system: bool,
}

impl PluginBuilder {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            version: None,
            information: PluginInformation::default(),
            modules: Vec::new(),
            dependencies: Vec::new(),
            system: false,
        }
    }

    pub fn with_version(mut self, version: &str) -> Self {
        self.version = Some(version.to_string());
        self
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.information.name = Some(name.to_string());
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.information.description = Some(description.to_string());
        self
    }

    pub fn with_vendor(mut self, vendor: &str) -> Self {
        self.information.vendor = Some(vendor.to_string());
        self
    }

    pub fn with_vendor_url(mut self, vendor_url: &str) -> Self {
        self.information.vendor_url = Some(vendor_url.to_string());
        self
    }

    pub fn with_module(mut self, module: impl Module + 'static) -> Self {
        self.modules.push(Box::new(module));
        self
    }

    pub fn with_dependency(mut self, identifier: &str, version: &str) -> Self {
        self.dependencies.push((identifier.to_string(), version.to_string()));
        self
    }

    pub fn as_system(mut self) -> Self {
        self.system = true;
        self
    }

    /// 构建插件（解析版本与依赖区间），初始状态为 Unknown
    pub fn build(self) -> PluginResult<Plugin> {
        let version: Version = self
            .version
            .as_deref()
            .ok_or_else(|| PluginError::InvalidVersion(format!("{}: 未声明版本", self.identifier)))?
            .parse()?;
        let dependencies = self
            .dependencies
            .iter()
            .map(|(identifier, version)| {
                Ok(PluginDependency {
                    identifier: identifier.clone(),
                    version: version.parse()?,
                })
            })
            .collect::<PluginResult<Vec<_>>>()?;

        Ok(Plugin {
            identifier: self.identifier,
            version,
            state: PluginState::Unknown,
            information: self.information,
            modules: self.modules,
            dependencies,
            system: self.system,
        })
    }
}
