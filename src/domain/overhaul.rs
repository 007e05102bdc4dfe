// ==========================================
// 平衡轮库存系统 - OH（检修工时）记录领域模型
// ==========================================
// 记录为不可变值对象:
// - 写入时快照线路名/塔号/方向/型号/周期，之后不随平衡轮迁移或改配而变化
// - backlog = 周期 - 运行小时（运行小时缺失时为空）
// ==========================================

use crate::domain::types::Direction;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

// ==========================================
// OverhaulRecord - OH 记录
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverhaulRecord {
    // ===== 主键 =====
    pub record_id: String,
    pub component_code: String,
    pub sequence_number: i64, // 每个平衡轮内唯一，由调用方指定

    // ===== OH 数据 =====
    pub overhaul_date: NaiveDate,
    pub operating_hours: Option<i64>, // None = 尚未测量
    pub backlog: Option<i64>,         // 与 operating_hours 同时有/无
    pub year: i32,
    pub weekday: String,

    // ===== 写入时快照 =====
    pub line_name: String,
    pub tower_number: String,
    pub direction: Direction,
    pub type_code: Option<String>,
    pub interval_hours: i64,

    // ===== 元数据 =====
    pub notes: Option<String>,
    pub recorded_by: String,
    pub created_at: NaiveDateTime,
}

impl OverhaulRecord {
    /// 导出用月-年标签（如 "May-24"）
    pub fn month_year_label(&self) -> String {
        self.overhaul_date.format("%b-%y").to_string()
    }
}

/// 新 OH 请求（表单已校验的标量）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewOverhaul {
    pub sequence_number: i64,
    pub overhaul_date: NaiveDate,
    pub operating_hours: Option<i64>,
    pub notes: Option<String>,
}

/// backlog 序列点（宽表导出/趋势图）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacklogPoint {
    pub sequence_number: i64,
    pub overhaul_date: NaiveDate,
    pub operating_hours: Option<i64>,
    pub backlog: Option<i64>,
}

impl From<&OverhaulRecord> for BacklogPoint {
    fn from(record: &OverhaulRecord) -> Self {
        Self {
            sequence_number: record.sequence_number,
            overhaul_date: record.overhaul_date,
            operating_hours: record.operating_hours,
            backlog: record.backlog,
        }
    }
}
