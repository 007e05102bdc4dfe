// ==========================================
// 平衡轮库存系统 - 多语言标签
// ==========================================
// 词条位于 locales/app.yml（rust-i18n，宏在 lib.rs 注册）
// 支持 es（默认）、en、zh-CN；BALANCIN_LOCALE 选择界面语言
// ==========================================

/// 默认语言（现场报表使用西语）
pub const DEFAULT_LOCALE: &str = "es";

pub const SUPPORTED_LOCALES: [&str; 3] = ["es", "en", "zh-CN"];

const LOCALE_ENV: &str = "BALANCIN_LOCALE";

/// 归一化语言代码
///
/// 忽略大小写与地区后缀（"EN_us" -> "en"，"zh" -> "zh-CN"），不支持的语言回落到默认语言
pub fn resolve_locale(requested: &str) -> &'static str {
    let requested = requested.trim().replace('_', "-");
    if let Some(exact) = SUPPORTED_LOCALES
        .iter()
        .find(|l| l.eq_ignore_ascii_case(&requested))
    {
        return *exact;
    }
    let language = requested.split('-').next().unwrap_or_default();
    SUPPORTED_LOCALES
        .iter()
        .find(|l| {
            !language.is_empty()
                && l.split('-')
                    .next()
                    .is_some_and(|prefix| prefix.eq_ignore_ascii_case(language))
        })
        .copied()
        .unwrap_or(DEFAULT_LOCALE)
}

/// 设置全局语言
///
/// # 返回
/// - 实际生效的语言代码
pub fn set_locale(locale: &str) -> &'static str {
    let resolved = resolve_locale(locale);
    rust_i18n::set_locale(resolved);
    resolved
}

/// 按 BALANCIN_LOCALE 设置语言（未设置时用默认语言）
pub fn init_from_env() -> &'static str {
    set_locale(&std::env::var(LOCALE_ENV).unwrap_or_default())
}

pub fn t(key: &str) -> String {
    rust_i18n::t!(key).to_string()
}

/// 带占位符的词条，逐个替换 `%{name}`
///
/// # 参数
/// - key: 词条键
/// - args: (占位符名, 取值)
pub fn t_with_args(key: &str, args: &[(&str, String)]) -> String {
    args.iter().fold(t(key), |text, (name, value)| {
        text.replace(&format!("%{{{}}}", name), value)
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::domain::types::HealthTier;
    use std::sync::Mutex;

    // locale 为进程级全局状态，切换语言的测试需串行
    pub(crate) static LOCALE_TEST_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn test_resolve_locale() {
        assert_eq!(resolve_locale("en"), "en");
        assert_eq!(resolve_locale(" EN_us "), "en");
        assert_eq!(resolve_locale("zh"), "zh-CN");
        assert_eq!(resolve_locale("zh-cn"), "zh-CN");
        assert_eq!(resolve_locale("es-CL"), "es");
        assert_eq!(resolve_locale("fr"), DEFAULT_LOCALE);
        assert_eq!(resolve_locale(""), DEFAULT_LOCALE);
    }

    #[test]
    fn test_set_locale_applies_resolved_code() {
        let _guard = LOCALE_TEST_LOCK.lock().unwrap();
        assert_eq!(set_locale("EN"), "en");
        assert_eq!(rust_i18n::locale().to_string(), "en");

        assert_eq!(set_locale("de"), DEFAULT_LOCALE);
        assert_eq!(rust_i18n::locale().to_string(), "es");
    }

    #[test]
    fn test_tier_labels_per_locale() {
        let _guard = LOCALE_TEST_LOCK.lock().unwrap();
        set_locale("es");
        assert_eq!(HealthTier::NoData.label(), "Sin OH");
        assert_eq!(HealthTier::Critical.label(), "Crítico");

        set_locale("zh-CN");
        assert_eq!(HealthTier::Alert.label(), "预警");

        set_locale(DEFAULT_LOCALE);
    }

    #[test]
    fn test_translate_with_args() {
        let _guard = LOCALE_TEST_LOCK.lock().unwrap();
        set_locale("en");
        let msg = t_with_args(
            "stock.insufficient",
            &[
                ("item", "POLEA-16N".to_string()),
                ("available", 6.to_string()),
                ("requested", 7.to_string()),
            ],
        );
        assert_eq!(msg, "Insufficient stock for POLEA-16N: 6 available, 7 requested");

        set_locale(DEFAULT_LOCALE);
    }
}
