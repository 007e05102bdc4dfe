// ==========================================
// 平衡轮库存系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::config::ledger_config_trait::LedgerConfigReader;
use crate::db::open_sqlite_connection;
use crate::domain::component::DEFAULT_INTERVAL_HOURS;
use crate::domain::spare_part::DEFAULT_LOW_STOCK_THRESHOLD;
use crate::engine::overhaul_health::{HealthThresholds, DEFAULT_ALERT_BACKLOG_HOURS};
use async_trait::async_trait;
use rusqlite::{params, Connection};
use serde::Serialize;
use serde_json::json;
use std::collections::HashMap;
use std::error::Error;
use std::sync::{Arc, Mutex};

/// backlog 序列默认长度（导出固定 4 组）
pub const DEFAULT_SERIES_LIMIT: usize = 4;

/// 一次请求内使用的台账参数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LedgerSettings {
    pub alert_backlog_hours: i64,
    pub low_stock_threshold: i64,
    pub default_interval_hours: i64,
    pub series_limit: usize,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            alert_backlog_hours: DEFAULT_ALERT_BACKLOG_HOURS,
            low_stock_threshold: DEFAULT_LOW_STOCK_THRESHOLD,
            default_interval_hours: DEFAULT_INTERVAL_HOURS,
            series_limit: DEFAULT_SERIES_LIMIT,
        }
    }
}

impl LedgerSettings {
    pub fn health_thresholds(&self) -> HealthThresholds {
        HealthThresholds {
            alert_backlog_hours: self.alert_backlog_hours,
        }
    }

    /// 通过异步读取接口加载
    pub async fn load(reader: &dyn LedgerConfigReader) -> Result<Self, Box<dyn Error>> {
        Ok(Self {
            alert_backlog_hours: reader.get_alert_backlog_hours().await?,
            low_stock_threshold: reader.get_low_stock_threshold().await?,
            default_interval_hours: reader.get_default_interval_hours().await?,
            series_limit: reader.get_series_limit().await?,
        })
    }
}

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> Result<Self, Box<dyn Error>> {
        let conn = open_sqlite_connection(db_path)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, Box<dyn Error>> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    fn get_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    /// 读取 global scope 的配置值（公开方法，供其他模块复用）
    pub fn get_global_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        self.get_config_value(key)
    }

    /// 写入 global scope 的配置值（UPSERT）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value, updated_at) VALUES ('global', ?1, ?2, datetime('now'))
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;
        tracing::info!(config_key = key, value = value, "配置已更新");
        Ok(())
    }

    /// 整数配置，缺失或格式错误时取默认值
    fn get_i64_or_default(&self, key: &str, default: i64) -> Result<i64, Box<dyn Error>> {
        let Some(raw) = self.get_config_value(key)? else {
            return Ok(default);
        };
        match raw.trim().parse::<i64>() {
            Ok(v) => Ok(v),
            Err(_) => {
                tracing::warn!(config_key = key, raw_value = %raw, "配置格式错误，使用默认值");
                Ok(default)
            }
        }
    }

    /// 获取所有配置的快照（JSON格式）
    pub fn get_config_snapshot(&self) -> Result<String, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key")?;

        let mut config_map: HashMap<String, String> = HashMap::new();
        let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?;

        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }

        let json_value = json!(config_map);
        Ok(serde_json::to_string(&json_value)?)
    }

    // ===== 台账参数（同步读取，供 API 层每次请求使用） =====

    /// backlog 预警阈值（> 0，否则取默认）
    pub fn alert_backlog_hours(&self) -> Result<i64, Box<dyn Error>> {
        let v = self.get_i64_or_default(config_keys::ALERT_BACKLOG_HOURS, DEFAULT_ALERT_BACKLOG_HOURS)?;
        Ok(if v > 0 { v } else { DEFAULT_ALERT_BACKLOG_HOURS })
    }

    /// 低库存阈值（> 0，否则取默认）
    pub fn low_stock_threshold(&self) -> Result<i64, Box<dyn Error>> {
        let v = self.get_i64_or_default(config_keys::LOW_STOCK_THRESHOLD, DEFAULT_LOW_STOCK_THRESHOLD)?;
        Ok(if v > 0 { v } else { DEFAULT_LOW_STOCK_THRESHOLD })
    }

    /// 新装平衡轮默认 OH 周期（> 0，否则取默认）
    pub fn default_interval_hours(&self) -> Result<i64, Box<dyn Error>> {
        let v = self.get_i64_or_default(config_keys::DEFAULT_INTERVAL_HOURS, DEFAULT_INTERVAL_HOURS)?;
        Ok(if v > 0 { v } else { DEFAULT_INTERVAL_HOURS })
    }

    /// backlog 序列长度，限制在 1..=4
    pub fn series_limit(&self) -> Result<usize, Box<dyn Error>> {
        let v = self.get_i64_or_default(config_keys::SERIES_LIMIT, DEFAULT_SERIES_LIMIT as i64)?;
        Ok(v.clamp(1, DEFAULT_SERIES_LIMIT as i64) as usize)
    }

    /// 一次性读取全部台账参数
    pub fn ledger_settings(&self) -> Result<LedgerSettings, Box<dyn Error>> {
        Ok(LedgerSettings {
            alert_backlog_hours: self.alert_backlog_hours()?,
            low_stock_threshold: self.low_stock_threshold()?,
            default_interval_hours: self.default_interval_hours()?,
            series_limit: self.series_limit()?,
        })
    }
}

// ==========================================
// LedgerConfigReader Trait 实现
// ==========================================
#[async_trait]
impl LedgerConfigReader for ConfigManager {
    async fn get_alert_backlog_hours(&self) -> Result<i64, Box<dyn Error>> {
        self.alert_backlog_hours()
    }

    async fn get_low_stock_threshold(&self) -> Result<i64, Box<dyn Error>> {
        self.low_stock_threshold()
    }

    async fn get_default_interval_hours(&self) -> Result<i64, Box<dyn Error>> {
        self.default_interval_hours()
    }

    async fn get_series_limit(&self) -> Result<usize, Box<dyn Error>> {
        self.series_limit()
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // OH 健康等级
    pub const ALERT_BACKLOG_HOURS: &str = "alert_backlog_hours";
    pub const DEFAULT_INTERVAL_HOURS: &str = "default_interval_hours";

    // 备件
    pub const LOW_STOCK_THRESHOLD: &str = "low_stock_threshold";

    // 导出
    pub const SERIES_LIMIT: &str = "series_limit";
}
