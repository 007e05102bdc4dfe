// ==========================================
// 平衡轮库存系统 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// 约束: 台账写入与主体变更同一事务（BEGIN IMMEDIATE）
// ==========================================

pub mod catalog_repo;
pub mod component_repo;
pub mod error;
pub mod overhaul_repo;
pub mod row_codec;
pub mod spare_part_repo;

// 重导出核心仓储
pub use catalog_repo::{CatalogRepository, NewTower, TowerOccupancy};
pub use component_repo::{ComponentChanges, ComponentRepository};
pub use error::{RepositoryError, RepositoryResult};
pub use overhaul_repo::{OverhaulRecordCounts, OverhaulRepository};
pub use spare_part_repo::SparePartRepository;
