// ==========================================
// 平衡轮库存系统 - 引擎层
// ==========================================
// 职责: 实现业务规则引擎,不拼 SQL
// 红线: Engine 不拼 SQL
// ==========================================

pub mod aggregation;
pub mod overhaul_health;
pub mod stock_ledger;

// 重导出核心引擎
pub use aggregation::{
    aggregate_by_line, aggregate_by_tower, aggregate_global, backlog_chart, line_tier_chart,
    BacklogChart, LineTierChart, RatedComponent, TierAggregate, TierCounts, TierPercentages,
};
pub use overhaul_health::{HealthThresholds, OverhaulHealthEngine, DEFAULT_ALERT_BACKLOG_HOURS};
pub use stock_ledger::{StockLedgerEngine, StockRuleViolation};
