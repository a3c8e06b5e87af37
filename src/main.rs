// ==========================================
// 制造执行系统 - 命令行入口
// ==========================================
// 用法:
//   mes-core check   [--config <file>] [--schema <file>]   校验模型并准备存储
//   mes-core plugins [--config <file>] [--schema <file>]   列出插件状态
//   mes-core enable  <plugin> ...                          启用插件
//   mes-core disable <plugin> ...                          禁用插件
// ==========================================

use std::path::PathBuf;
use std::sync::Arc;

use mes_core::config::{MesSettings, SchemaConfig};
use mes_core::i18n;
use mes_core::model::HookRegistry;
use mes_core::plugin::PluginManager;
use mes_core::repository::{DataAccessService, PluginStateRepository, SqliteEntityStore};

#[derive(Debug, Default)]
struct CliArgs {
    command: String,
    target: Option<String>,
    config: Option<PathBuf>,
    schema: Option<PathBuf>,
}

fn parse_args(args: impl Iterator<Item = String>) -> Option<CliArgs> {
    let mut parsed = CliArgs {
        command: "check".to_string(),
        ..Default::default()
    };
    let mut positional = Vec::new();
    let mut args = args.peekable();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => parsed.config = Some(PathBuf::from(args.next()?)),
            "--schema" => parsed.schema = Some(PathBuf::from(args.next()?)),
            "-h" | "--help" => return None,
            _ => positional.push(arg),
        }
    }

    let mut positional = positional.into_iter();
    if let Some(command) = positional.next() {
        parsed.command = command;
    }
    parsed.target = positional.next();

    match parsed.command.as_str() {
        "check" | "plugins" => Some(parsed),
        "enable" | "disable" if parsed.target.is_some() => Some(parsed),
        _ => None,
    }
}

fn run(args: CliArgs) -> anyhow::Result<()> {
    let settings = MesSettings::load_or_default(args.config.as_deref())?;
    mes_core::logging::init(&settings.log_filter, settings.log_format);
    i18n::set_locale(&settings.locale);

    tracing::info!("制造执行系统 {}", mes_core::VERSION);
    tracing::info!("使用数据库: {}", settings.db_path);

    let schema_path = args
        .schema
        .or_else(|| settings.schema_path.as_ref().map(PathBuf::from))
        .ok_or_else(|| anyhow::anyhow!(i18n::t("cli.usage")))?;
    let schema = SchemaConfig::load(&schema_path)?;

    let registry = Arc::new(schema.build(&HookRegistry::new())?);
    let models = registry.definitions().count().to_string();
    println!("{}", i18n::t_with_args("cli.schema_loaded", &[("models", models.as_str())]));

    let store = SqliteEntityStore::new(&settings.db_path, registry.clone())?;
    store.ensure_all()?;
    let connection = store.connection();
    let access = DataAccessService::new(registry, Arc::new(store), settings.locale.clone());
    access.initialize()?;

    if args.command == "check" {
        println!(
            "{}",
            i18n::t_with_args("cli.schema_ok", &[("path", settings.db_path.as_str())])
        );
        return Ok(());
    }

    let mut manager =
        PluginManager::new().with_repository(PluginStateRepository::from_connection(connection)?);
    for plugin in schema.build_plugins()? {
        manager.register(plugin)?;
    }
    manager.initialize()?;

    match (args.command.as_str(), args.target.as_deref()) {
        ("enable", Some(identifier)) => manager.enable_plugin(identifier)?,
        ("disable", Some(identifier)) => manager.disable_plugin(identifier)?,
        _ => {}
    }

    for plugin in manager.plugins() {
        let version = plugin.version().to_string();
        println!(
            "{}",
            i18n::t_with_args(
                "cli.plugin_line",
                &[
                    ("identifier", plugin.identifier()),
                    ("version", version.as_str()),
                    ("state", plugin.state().as_str()),
                ]
            )
        );
    }
    Ok(())
}

fn main() {
    let Some(args) = parse_args(std::env::args().skip(1)) else {
        eprintln!("{}", i18n::t("cli.usage"));
        std::process::exit(2);
    };

    if let Err(e) = run(args) {
        let error = format!("{:#}", e);
        eprintln!("{}", i18n::t_with_args("cli.failed", &[("error", error.as_str())]));
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Option<CliArgs> {
        parse_args(args.iter().map(|s| s.to_string()))
    }

    #[test]
    fn test_parse_args() {
        let args = parse(&[]).unwrap();
        assert_eq!(args.command, "check");

        let args = parse(&["plugins", "--schema", "mes.json"]).unwrap();
        assert_eq!(args.command, "plugins");
        assert_eq!(args.schema, Some(PathBuf::from("mes.json")));

        let args = parse(&["enable", "orders", "--config", "mes.conf.json"]).unwrap();
        assert_eq!(args.target.as_deref(), Some("orders"));
        assert_eq!(args.config, Some(PathBuf::from("mes.conf.json")));
    }

    #[test]
    fn test_parse_args_rejects_invalid() {
        assert!(parse(&["enable"]).is_none());
        assert!(parse(&["unknown"]).is_none());
        assert!(parse(&["check", "--schema"]).is_none());
    }
}
