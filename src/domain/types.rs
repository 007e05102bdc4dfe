// ==========================================
// 平衡轮库存系统 - 领域类型定义
// ==========================================
// 所有枚举均提供 to_db_str / from_str，与数据库文本列一一对应
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 安装方向 (Direction)
// ==========================================
// 每座塔最多一个上行、一个下行平衡轮
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    Ascending,  // 上行
    Descending, // 下行
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl Direction {
    /// 从字符串解析方向（兼容原始数据中的西语写法）
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "ASCENDING" | "ASCENDENTE" | "ASC" => Some(Direction::Ascending),
            "DESCENDING" | "DESCENDENTE" | "DES" | "DESC" => Some(Direction::Descending),
            _ => None,
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            Direction::Ascending => "ASCENDING",
            Direction::Descending => "DESCENDING",
        }
    }

    /// 图表用短标签
    pub fn short_label(&self) -> &'static str {
        match self {
            Direction::Ascending => "ASC",
            Direction::Descending => "DES",
        }
    }

    /// 本地化标签（导出）
    pub fn label(&self) -> String {
        match self {
            Direction::Ascending => crate::i18n::t("direction.ascending"),
            Direction::Descending => crate::i18n::t("direction.descending"),
        }
    }
}

// ==========================================
// 平衡轮类别 (Component Category)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComponentCategory {
    Compression, // 压索
    Support,     // 托索
    Combined,    // 组合
}

impl fmt::Display for ComponentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl ComponentCategory {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "COMPRESSION" | "COMPRESION" => Some(ComponentCategory::Compression),
            "SUPPORT" | "SOPORTE" => Some(ComponentCategory::Support),
            "COMBINED" | "COMBINADOS" => Some(ComponentCategory::Combined),
            _ => None,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            ComponentCategory::Compression => "COMPRESSION",
            ComponentCategory::Support => "SUPPORT",
            ComponentCategory::Combined => "COMBINED",
        }
    }

    pub fn label(&self) -> String {
        match self {
            ComponentCategory::Compression => crate::i18n::t("category.compression"),
            ComponentCategory::Support => crate::i18n::t("category.support"),
            ComponentCategory::Combined => crate::i18n::t("category.combined"),
        }
    }
}

// ==========================================
// 健康等级 (Health Tier)
// ==========================================
// 由最新一次 OH（按序号）的 backlog 判定
// 顺序: Normal < Alert < Critical，NoData 单独统计
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HealthTier {
    Normal,   // 正常
    Alert,    // 预警
    Critical, // 超期
    NoData,   // 无 OH 数据
}

impl fmt::Display for HealthTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl HealthTier {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "NORMAL" => Some(HealthTier::Normal),
            "ALERT" | "ALERTA" => Some(HealthTier::Alert),
            "CRITICAL" | "CRITICO" => Some(HealthTier::Critical),
            "NO_DATA" | "SIN_OH" => Some(HealthTier::NoData),
            _ => None,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            HealthTier::Normal => "NORMAL",
            HealthTier::Alert => "ALERT",
            HealthTier::Critical => "CRITICAL",
            HealthTier::NoData => "NO_DATA",
        }
    }

    /// 是否有测量数据（参与百分比统计）
    pub fn has_data(&self) -> bool {
        !matches!(self, HealthTier::NoData)
    }

    /// 看板配色
    pub fn chart_color(&self) -> &'static str {
        match self {
            HealthTier::Normal => "#28a745",
            HealthTier::Alert => "#ffc107",
            HealthTier::Critical => "#dc3545",
            HealthTier::NoData => "#6c757d",
        }
    }

    /// 本地化标签（导出与看板）
    pub fn label(&self) -> String {
        let key = match self {
            HealthTier::Normal => "tier.normal",
            HealthTier::Alert => "tier.alert",
            HealthTier::Critical => "tier.critical",
            HealthTier::NoData => "tier.no_data",
        };
        crate::i18n::t(key)
    }
}

// ==========================================
// 库存流水类型 (Movement Kind)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MovementKind {
    Entry,      // 入库
    Exit,       // 出库
    Creation,   // 建档
    Adjustment, // 盘点调整
}

impl fmt::Display for MovementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl MovementKind {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "ENTRY" => Some(MovementKind::Entry),
            "EXIT" => Some(MovementKind::Exit),
            "CREATION" => Some(MovementKind::Creation),
            "ADJUSTMENT" => Some(MovementKind::Adjustment),
            _ => None,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            MovementKind::Entry => "ENTRY",
            MovementKind::Exit => "EXIT",
            MovementKind::Creation => "CREATION",
            MovementKind::Adjustment => "ADJUSTMENT",
        }
    }

    pub fn label(&self) -> String {
        match self {
            MovementKind::Entry => crate::i18n::t("movement.entry"),
            MovementKind::Exit => crate::i18n::t("movement.exit"),
            MovementKind::Creation => crate::i18n::t("movement.creation"),
            MovementKind::Adjustment => crate::i18n::t("movement.adjustment"),
        }
    }
}

// ==========================================
// 备件目录 (Spare Catalog)
// ==========================================
// 两个目录行为完全一致，仅以目录标识区分
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SpareCatalog {
    ComponentSpares, // 平衡轮专用备件
    GeneralSpares,   // 通用备件
}

impl fmt::Display for SpareCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl SpareCatalog {
    pub const ALL: [SpareCatalog; 2] = [SpareCatalog::ComponentSpares, SpareCatalog::GeneralSpares];

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "COMPONENT_SPARES" => Some(SpareCatalog::ComponentSpares),
            "GENERAL_SPARES" => Some(SpareCatalog::GeneralSpares),
            _ => None,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            SpareCatalog::ComponentSpares => "COMPONENT_SPARES",
            SpareCatalog::GeneralSpares => "GENERAL_SPARES",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_parses_legacy_spellings() {
        assert_eq!(Direction::from_str("ASCENDENTE"), Some(Direction::Ascending));
        assert_eq!(Direction::from_str("descending"), Some(Direction::Descending));
        assert_eq!(Direction::from_str("sideways"), None);
        assert_eq!(Direction::Descending.short_label(), "DES");
    }

    #[test]
    fn test_enums_round_trip_through_db_str() {
        for kind in [
            MovementKind::Entry,
            MovementKind::Exit,
            MovementKind::Creation,
            MovementKind::Adjustment,
        ] {
            assert_eq!(MovementKind::from_str(kind.to_db_str()), Some(kind));
        }
        for catalog in SpareCatalog::ALL {
            assert_eq!(SpareCatalog::from_str(catalog.to_db_str()), Some(catalog));
        }
        assert_eq!(
            ComponentCategory::from_str("soporte"),
            Some(ComponentCategory::Support)
        );
    }

    #[test]
    fn test_tier_has_data() {
        assert!(HealthTier::Critical.has_data());
        assert!(!HealthTier::NoData.has_data());
        assert_eq!(HealthTier::NoData.chart_color(), "#6c757d");
    }
}
