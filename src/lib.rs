// ==========================================
// 平衡轮库存系统 - 核心库
// ==========================================
// 范围: 平衡轮目录、OH 台账与健康等级、备件库存流水、看板与导出
// 技术栈: Rust + SQLite
// 表现层（Web / CLI）只调用本库的 API 层
// ==========================================

// 初始化国际化系统
rust_i18n::i18n!("locales", fallback = "es");

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 业务规则
pub mod engine;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一/建表）
pub mod db;

// 日志系统
pub mod logging;

// 国际化
pub mod i18n;

// SQL 耗时观测
pub mod perf;

// API 层 - 业务接口
pub mod api;

// 应用层 - 装配
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{ComponentCategory, Direction, HealthTier, MovementKind, SpareCatalog};

// 领域实体
pub use domain::{
    Component, ComponentType, ComponentView, Line, OverhaulRecord, Section, SparePart,
    StockMovement, Tower,
};

// 引擎
pub use engine::{OverhaulHealthEngine, StockLedgerEngine};

// API
pub use api::{
    ApiError, ApiResult, CatalogApi, ComponentApi, DashboardApi, ExportApi, OverhaulApi,
    SparePartLedger,
};

pub use app::AppState;

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "平衡轮库存系统";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
        assert!(!APP_NAME.is_empty());
    }
}
