// ==========================================
// 平衡轮库存系统 - 备件与库存流水领域模型
// ==========================================
// 红线: 备件数量 == 最近一条流水的结存
// ==========================================

use crate::domain::types::{MovementKind, SpareCatalog};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// 低库存默认阈值（0 < 数量 < 阈值）
pub const DEFAULT_LOW_STOCK_THRESHOLD: i64 = 5;

// ==========================================
// SparePart - 备件
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SparePart {
    pub catalog: SpareCatalog,
    pub item_code: String,
    pub description: String,
    pub quantity: i64,
    pub location: Option<String>,
    pub notes: Option<String>,
    pub received_at: NaiveDateTime,
    pub last_movement_at: NaiveDateTime,
    pub last_exit_at: Option<NaiveDateTime>,
}

impl SparePart {
    pub fn in_stock(&self) -> bool {
        self.quantity > 0
    }

    pub fn is_low_stock(&self, threshold: i64) -> bool {
        self.quantity > 0 && self.quantity < threshold
    }
}

// ==========================================
// StockMovement - 库存流水
// ==========================================
// 只追加；每次变更恰好一条
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockMovement {
    pub movement_id: String,
    pub catalog: SpareCatalog,
    pub item_code: String,
    pub kind: MovementKind,
    pub quantity: i64,          // 建档/出入库为正数；调整为带符号差值
    pub resulting_balance: i64, // 本次变更后的结存
    pub notes: Option<String>,
    pub actor: Option<String>,
    pub moved_at: NaiveDateTime,
}

/// 一次库存变更: 变更后的备件 + 配对流水（同一事务内写入）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockChange {
    pub part: SparePart,
    pub movement: StockMovement,
}

/// 近期动态（流水 + 备件描述）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovementSummary {
    pub catalog: SpareCatalog,
    pub item_code: String,
    pub description: String,
    pub kind: MovementKind,
    pub quantity: i64,
    pub resulting_balance: i64,
    pub actor: Option<String>,
    pub moved_at: NaiveDateTime,
}

/// 新备件请求
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewSparePart {
    pub item_code: String,
    pub description: String,
    pub initial_quantity: i64,
    pub location: Option<String>,
    pub notes: Option<String>,
}

/// 列表筛选
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StockFilter {
    #[default]
    All,
    Low, // 0 < 数量 < 阈值
    Out, // 数量 == 0
}
