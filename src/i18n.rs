// ==========================================
// 国际化 (i18n) 模块
// ==========================================
// 使用 rust-i18n 库
// 支持英文（默认）和中文
// 消息参数: 命名参数 %{name}，校验消息使用位置参数 %{0}、%{1}…
// ==========================================
// 注意: rust_i18n::i18n! 宏已在 lib.rs 中初始化
// ==========================================

use crate::model::outcome::ErrorMessage;

/// 获取当前语言
pub fn current_locale() -> String {
    rust_i18n::locale().to_string()
}

/// 设置语言
///
/// # 参数
/// - locale: 语言代码（"en" 或 "zh-CN"）
pub fn set_locale(locale: &str) {
    rust_i18n::set_locale(locale);
}

/// 翻译消息（当前语言，无参数）
///
/// # 示例
/// ```no_run
/// use mes_core::i18n::t;
/// let msg = t("core.message.deleteMessage");
/// ```
pub fn t(key: &str) -> String {
    rust_i18n::t!(key).to_string()
}

/// 翻译消息（当前语言，命名参数）
///
/// # 示例
/// ```no_run
/// use mes_core::i18n::t_with_args;
/// let msg = t_with_args("cli.schema_loaded", &[("models", "12")]);
/// ```
pub fn t_with_args(key: &str, args: &[(&str, &str)]) -> String {
    let mut result = rust_i18n::t!(key).to_string();
    for (k, v) in args {
        let placeholder = format!("%{{{}}}", k);
        result = result.replace(&placeholder, v);
    }
    result
}

/// 按指定语言翻译（缺失时返回键本身）
pub fn t_in(key: &str, locale: &str) -> String {
    rust_i18n::t!(key, locale = locale).to_string()
}

fn is_missing(translated: &str, key: &str, locale: &str) -> bool {
    translated == key || translated == format!("{}.{}", locale, key)
}

/// 翻译错误消息，位置参数依次替换 %{0}、%{1}…
pub fn translate_message(message: &ErrorMessage, locale: &str) -> String {
    let mut result = t_in(&message.key, locale);
    for (index, param) in message.params.iter().enumerate() {
        let placeholder = format!("%{{{}}}", index);
        result = result.replace(&placeholder, param);
    }
    result
}

/// 依次尝试多个键，返回第一个有译文的翻译；都缺失时返回最后一个键
pub fn translate_first(keys: &[&str], locale: &str) -> String {
    for key in keys {
        let translated = t_in(key, locale);
        if !is_missing(&translated, key, locale) {
            return translated;
        }
    }
    keys.last().map(|k| k.to_string()).unwrap_or_default()
}

/// 语言对应的小数分隔符
pub fn decimal_separator(locale: &str) -> char {
    let language = locale.split(['-', '_']).next().unwrap_or(locale);
    match language {
        "pl" | "de" | "fr" | "it" | "es" | "ru" => ',',
        _ => '.',
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // rust-i18n 的 locale 为全局状态，且 Rust 测试默认并行执行；
    // 为避免测试互相干扰，这里对 i18n 相关测试串行化。
    static LOCALE_TEST_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn test_set_locale() {
        let _guard = LOCALE_TEST_LOCK.lock().unwrap();
        set_locale("zh-CN");
        assert_eq!(current_locale(), "zh-CN");

        set_locale("en");
        assert_eq!(current_locale(), "en");
    }

    #[test]
    fn test_translate_simple() {
        let _guard = LOCALE_TEST_LOCK.lock().unwrap();
        set_locale("zh-CN");
        assert_eq!(t("core.message.deleteMessage"), "删除成功");

        set_locale("en");
        assert_eq!(t("core.message.deleteMessage"), "Entity deleted");
    }

    #[test]
    fn test_translate_with_args() {
        let _guard = LOCALE_TEST_LOCK.lock().unwrap();
        set_locale("en");
        let msg = t_with_args("cli.schema_loaded", &[("models", "12")]);
        assert!(msg.contains("12"));
    }

    #[test]
    fn test_translate_message_positional() {
        let message = ErrorMessage::with_params("core.validate.field.error.outOfRange.toLarge", ["1", "10"]);
        assert_eq!(translate_message(&message, "en"), "Value is too large, allowed range is 1 - 10");

        let message = ErrorMessage::new("core.validate.field.error.missing");
        assert_eq!(translate_message(&message, "zh-CN"), "字段不能为空");
    }

    #[test]
    fn test_translate_first_falls_back() {
        assert_eq!(
            translate_first(&["products.grid.message.moveMessage", "core.message.moveMessage"], "en"),
            "Entity moved"
        );
        assert_eq!(translate_first(&["no.such.key"], "en"), "no.such.key");
    }

    #[test]
    fn test_decimal_separator() {
        assert_eq!(decimal_separator("en"), '.');
        assert_eq!(decimal_separator("pl"), ',');
        assert_eq!(decimal_separator("de-DE"), ',');
        assert_eq!(decimal_separator("zh-CN"), '.');
    }
}
