// ==========================================
// 平衡轮库存系统 - API 层
// ==========================================
// 职责: 提供业务 API 接口,供表现层（Web / CLI）调用
// 约束: 表现层负责字段形状校验，这里只校验业务规则
// ==========================================

pub mod catalog_api;
pub mod component_api;
pub mod dashboard_api;
pub mod error;
pub mod export_api;
pub mod overhaul_api;
pub mod spare_part_api;

// 重导出核心类型
pub use catalog_api::CatalogApi;
pub use component_api::{CodeSuggestion, ComponentApi, ComponentDetail, InstallComponentRequest};
pub use dashboard_api::{
    DashboardApi, InventoryDashboard, InventorySearchResults, OverhaulDashboard,
    OverhaulDashboardFilter, SearchScope,
};
pub use error::{ApiError, ApiResult};
pub use export_api::{
    overhaul_export_headers, ExportApi, InventoryExportKind, OverhaulExportGroup, OverhaulExportRow,
};
pub use overhaul_api::{GlobalHealthSummary, OverhaulApi};
pub use spare_part_api::{SparePartLedger, SparePartList};
