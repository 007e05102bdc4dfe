// ==========================================
// 平衡轮库存系统 - 基础目录领域模型
// ==========================================
// 线路 / 区段 / 塔 / 平衡轮型号
// ==========================================

use crate::domain::types::{ComponentCategory, Direction};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ==========================================
// Line - 线路
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Line {
    pub line_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub created_at: NaiveDateTime,
}

// ==========================================
// Section - 区段
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub section_id: i64,
    pub name: String,
}

// ==========================================
// Tower - 塔
// ==========================================
// 塔号仅在 (line, number, section) 内唯一
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tower {
    pub tower_id: i64,
    pub line_id: i64,
    pub section_id: i64,
    pub tower_number: String,
    pub asc_type_code: Option<String>,  // 上行槽位型号
    pub desc_type_code: Option<String>, // 下行槽位型号
    pub notes: Option<String>,
    pub created_at: NaiveDateTime,
}

impl Tower {
    /// 取槽位对应的型号代码
    pub fn type_for_slot(&self, direction: Direction) -> Option<&str> {
        match direction {
            Direction::Ascending => self.asc_type_code.as_deref(),
            Direction::Descending => self.desc_type_code.as_deref(),
        }
    }

    /// 塔号自然排序键（"2" < "10" < "10A"）
    pub fn natural_sort_key(&self) -> String {
        tower_sort_key(&self.tower_number)
    }
}

/// 塔号自然排序键: 数字前缀左补零到 3 位，保留字母后缀
pub fn tower_sort_key(tower_number: &str) -> String {
    let trimmed = tower_number.trim();
    let digits: String = trimmed.chars().take_while(|c| c.is_ascii_digit()).collect();
    let suffix = &trimmed[digits.len()..];
    if digits.is_empty() {
        return trimmed.to_uppercase();
    }
    format!("{:0>3}{}", digits, suffix.to_uppercase())
}

/// 塔及其所属线路/区段名称（用于展示与快照）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TowerView {
    pub tower: Tower,
    pub line_name: String,
    pub section_name: String,
}

// ==========================================
// ComponentType - 平衡轮型号
// ==========================================
// total_quantity 为资料性计数，不由已安装数量推导
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentType {
    pub code: String,
    pub category: ComponentCategory,
    pub total_quantity: i64,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl ComponentType {
    pub fn in_stock(&self) -> bool {
        self.total_quantity > 0
    }
}

/// 型号目录汇总
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TypeSummary {
    pub total_types: i64,
    pub total_quantity: i64,
    pub compression_quantity: i64,
    pub support_quantity: i64,
    pub combined_quantity: i64,
}
