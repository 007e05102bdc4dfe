// ==========================================
// 平衡轮库存系统 - 主入口
// ==========================================
// 启动: 初始化日志与语言 → 打开/建库 → 读取台账参数 → 输出全局健康汇总
// 表现层（Web / CLI）以库的形式接入 AppState
// ==========================================

use std::error::Error;

use balancin_inventory::app::{get_default_db_path, AppState};
use balancin_inventory::config::LedgerSettings;
use balancin_inventory::{i18n, logging};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // 初始化日志系统
    logging::init();
    let locale = i18n::init_from_env();
    tracing::info!(locale, "界面语言");

    tracing::info!("==================================================");
    tracing::info!("{}", balancin_inventory::APP_NAME);
    tracing::info!("系统版本: {}", balancin_inventory::VERSION);
    tracing::info!("==================================================");

    // 获取数据库路径（命令行参数优先）
    let db_path = std::env::args().nth(1).unwrap_or_else(get_default_db_path);
    tracing::info!("使用数据库: {}", db_path);

    let app_state = AppState::new(db_path)?;

    let settings = LedgerSettings::load(app_state.config.as_ref()).await?;
    tracing::info!(
        alert_backlog_hours = settings.alert_backlog_hours,
        low_stock_threshold = settings.low_stock_threshold,
        default_interval_hours = settings.default_interval_hours,
        series_limit = settings.series_limit,
        "台账参数已加载"
    );

    let summary = app_state.overhaul_api.aggregate_global()?;
    tracing::info!("全局健康汇总: {}", serde_json::to_string(&summary)?);

    let dashboard = app_state.dashboard_api.inventory_dashboard()?;
    tracing::info!(
        components = dashboard.total_components,
        towers = dashboard.total_towers,
        low_stock = dashboard.low_stock_count,
        out_of_stock = dashboard.out_of_stock_count,
        "库存总览"
    );

    Ok(())
}
