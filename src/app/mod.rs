// ==========================================
// 平衡轮库存系统 - 应用层
// ==========================================
// 职责: 装配仓储、配置与 API，供表现层持有
// ==========================================

pub mod state;

// 重导出
pub use state::{get_default_db_path, AppState};
