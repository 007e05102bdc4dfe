// ==========================================
// 平衡轮库存系统 - 应用状态
// ==========================================
// 职责: 管理应用级别的共享状态和API实例
// 连接: 目录/平衡轮/配置共享一条连接；OH 与备件台账各自独立连接
// ==========================================

use std::sync::{Arc, Mutex};

use crate::api::{
    CatalogApi, ComponentApi, DashboardApi, ExportApi, OverhaulApi, SparePartLedger,
};
use crate::config::ConfigManager;
use crate::db::{init_schema, open_sqlite_connection, read_schema_version};
use crate::domain::types::SpareCatalog;
use crate::perf::{install_sql_profiling, SqlProfileSettings};
use crate::repository::{
    CatalogRepository, ComponentRepository, OverhaulRepository, SparePartRepository,
};

/// 应用状态
///
/// 包含所有API实例和共享资源，由表现层（Web / CLI）持有
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 基础目录API
    pub catalog_api: Arc<CatalogApi>,

    /// 平衡轮API
    pub component_api: Arc<ComponentApi>,

    /// OH 台账API
    pub overhaul_api: Arc<OverhaulApi>,

    /// 平衡轮专用备件台账
    pub component_spares: Arc<SparePartLedger>,

    /// 通用备件台账
    pub general_spares: Arc<SparePartLedger>,

    /// 看板API
    pub dashboard_api: Arc<DashboardApi>,

    /// 导出API
    pub export_api: Arc<ExportApi>,

    /// 配置管理器
    pub config: Arc<ConfigManager>,
}

impl AppState {
    /// 创建新的AppState实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径（不存在时自动创建并建表）
    ///
    /// # 返回
    /// - Ok(AppState): 应用状态实例
    /// - Err(String): 初始化错误
    pub fn new(db_path: String) -> Result<Self, String> {
        tracing::info!("初始化AppState，数据库路径: {}", db_path);

        let mut conn =
            open_sqlite_connection(&db_path).map_err(|e| format!("无法打开数据库: {}", e))?;
        init_schema(&conn).map_err(|e| format!("数据库建表失败: {}", e))?;
        let schema_version = read_schema_version(&conn)
            .map_err(|e| format!("无法读取 schema_version: {}", e))?;
        install_sql_profiling(&mut conn, SqlProfileSettings::from_env());
        tracing::info!(schema_version = ?schema_version, "数据库就绪");
        let conn = Arc::new(Mutex::new(conn));

        // ==========================================
        // 初始化Repository层
        // ==========================================
        let catalog_repo = Arc::new(CatalogRepository::from_connection(conn.clone()));
        let component_repo = Arc::new(ComponentRepository::from_connection(conn.clone()));
        let overhaul_repo = Arc::new(
            OverhaulRepository::new(&db_path)
                .map_err(|e| format!("无法创建OverhaulRepository: {}", e))?,
        );
        let spare_part_repo = Arc::new(
            SparePartRepository::new(&db_path)
                .map_err(|e| format!("无法创建SparePartRepository: {}", e))?,
        );

        let config = Arc::new(
            ConfigManager::from_connection(conn.clone())
                .map_err(|e| format!("无法创建ConfigManager: {}", e))?,
        );

        // ==========================================
        // 初始化API层
        // ==========================================
        let catalog_api = Arc::new(CatalogApi::new(catalog_repo.clone()));
        let component_api = Arc::new(ComponentApi::new(
            component_repo.clone(),
            overhaul_repo.clone(),
            config.clone(),
        ));
        let overhaul_api = Arc::new(OverhaulApi::new(
            overhaul_repo.clone(),
            component_repo.clone(),
            config.clone(),
        ));
        let component_spares = Arc::new(SparePartLedger::new(
            SpareCatalog::ComponentSpares,
            spare_part_repo.clone(),
            config.clone(),
        ));
        let general_spares = Arc::new(SparePartLedger::new(
            SpareCatalog::GeneralSpares,
            spare_part_repo,
            config.clone(),
        ));
        let dashboard_api = Arc::new(DashboardApi::new(
            catalog_repo.clone(),
            component_repo.clone(),
            overhaul_repo.clone(),
            overhaul_api.clone(),
            component_spares.clone(),
            general_spares.clone(),
            config.clone(),
        ));
        let export_api = Arc::new(ExportApi::new(
            catalog_repo,
            component_repo,
            overhaul_repo,
            overhaul_api.clone(),
            component_spares.clone(),
            general_spares.clone(),
        ));

        tracing::info!("AppState初始化完成");

        Ok(Self {
            db_path,
            catalog_api,
            component_api,
            overhaul_api,
            component_spares,
            general_spares,
            dashboard_api,
            export_api,
            config,
        })
    }

    /// 获取数据库路径
    pub fn get_db_path(&self) -> &str {
        &self.db_path
    }

    /// 按目录取备件台账
    pub fn spare_ledger(&self, catalog: SpareCatalog) -> &Arc<SparePartLedger> {
        match catalog {
            SpareCatalog::ComponentSpares => &self.component_spares,
            SpareCatalog::GeneralSpares => &self.general_spares,
        }
    }
}

// ==========================================
// 默认数据库路径辅助函数
// ==========================================

/// 获取默认数据库路径
///
/// # 返回
/// - 环境变量 BALANCIN_DB_PATH（非空时）
/// - 否则: 用户数据目录/balancin-inventory/balancin_inventory.db
/// - 拿不到用户数据目录时: ./balancin_inventory.db
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    if let Ok(path) = std::env::var("BALANCIN_DB_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./balancin_inventory.db");
    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("balancin-inventory");
        if let Err(e) = std::fs::create_dir_all(&dir) {
            tracing::warn!("无法创建数据目录 {}: {}", dir.display(), e);
        } else {
            path = dir.join("balancin_inventory.db");
        }
    }

    path.to_string_lossy().to_string()
}
