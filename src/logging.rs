// ==========================================
// 平衡轮库存系统 - 日志初始化
// ==========================================
// RUST_LOG 控制级别（默认 info）
// BALANCIN_LOG_FORMAT=json 时逐行输出 JSON，供日志采集使用
// ==========================================

use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_FILTER: &str = "info";
const FORMAT_ENV: &str = "BALANCIN_LOG_FORMAT";

/// 日志输出格式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl LogFormat {
    /// 未识别的取值按文本格式处理
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "json" => LogFormat::Json,
            _ => LogFormat::Text,
        }
    }

    pub fn from_env() -> Self {
        std::env::var(FORMAT_ENV)
            .map(|v| Self::parse(&v))
            .unwrap_or_default()
    }
}

/// 初始化进程日志，格式取自 BALANCIN_LOG_FORMAT
///
/// ```no_run
/// balancin_inventory::logging::init();
/// ```
pub fn init() {
    init_with(LogFormat::from_env());
}

/// 以指定格式初始化；重复初始化只提示不中断
pub fn init_with(format: LogFormat) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let builder = fmt().with_env_filter(filter).with_target(true);
    let installed = match format {
        LogFormat::Text => builder.with_line_number(true).try_init(),
        LogFormat::Json => builder.json().flatten_event(true).try_init(),
    };
    if let Err(err) = installed {
        eprintln!("日志系统已存在，忽略本次初始化: {}", err);
    }
}

/// 测试用 debug 级别输出（可重复调用）
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}
