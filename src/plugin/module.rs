// ==========================================
// 制造执行系统 - 插件模块接口
// ==========================================

/// 插件模块（视图、模型、菜单等扩展点）
///
/// 插件启用/禁用时依次调用各模块；任一模块失败则中止状态迁移
pub trait Module: Send + Sync {
    /// 模块名称（日志使用）
    fn name(&self) -> &str;

    /// 插件初始化（应用启动时对已知状态插件调用）
    fn init(&self) -> anyhow::Result<()> {
        Ok(())
    }

    fn enable(&self) -> anyhow::Result<()>;

    fn disable(&self) -> anyhow::Result<()>;
}
