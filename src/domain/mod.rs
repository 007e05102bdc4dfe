// ==========================================
// 平衡轮库存系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod catalog;
pub mod component;
pub mod overhaul;
pub mod spare_part;
pub mod types;

// 重导出核心类型
pub use catalog::{ComponentType, Line, Section, Tower, TowerView, TypeSummary};
pub use component::{Component, ComponentView, StatusChangeRecord};
pub use overhaul::{BacklogPoint, NewOverhaul, OverhaulRecord};
pub use spare_part::{
    MovementSummary, NewSparePart, SparePart, StockChange, StockFilter, StockMovement,
};
pub use types::{ComponentCategory, Direction, HealthTier, MovementKind, SpareCatalog};
