// ==========================================
// 平衡轮库存系统 - 台账配置读取 Trait
// ==========================================
// 职责: 定义 OH 分级 / 备件 / 导出所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use async_trait::async_trait;
use std::error::Error;

// ==========================================
// LedgerConfigReader Trait
// ==========================================
// 实现者: ConfigManager（从 config_kv 表读取）
#[async_trait]
pub trait LedgerConfigReader: Send + Sync {
    /// 获取 backlog 预警阈值（小时）
    ///
    /// # 说明
    /// 0 < backlog < 阈值 判为 ALERT
    ///
    /// # 默认值
    /// - 5000
    async fn get_alert_backlog_hours(&self) -> Result<i64, Box<dyn Error>>;

    /// 获取低库存阈值
    ///
    /// # 默认值
    /// - 5
    async fn get_low_stock_threshold(&self) -> Result<i64, Box<dyn Error>>;

    /// 获取新装平衡轮默认 OH 周期（小时）
    ///
    /// # 默认值
    /// - 30000
    async fn get_default_interval_hours(&self) -> Result<i64, Box<dyn Error>>;

    /// 获取 backlog 序列长度（1..=4）
    ///
    /// # 默认值
    /// - 4
    async fn get_series_limit(&self) -> Result<usize, Box<dyn Error>>;
}
