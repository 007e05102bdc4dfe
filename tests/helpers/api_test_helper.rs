// ==========================================
// API集成测试辅助工具
// ==========================================
// 职责: 提供API层集成测试的通用辅助函数
// ==========================================

#![allow(dead_code)]

use std::sync::Arc;

use chrono::NaiveDate;
use tempfile::NamedTempFile;

use balancin_inventory::api::{
    ApiResult, CatalogApi, ComponentApi, DashboardApi, ExportApi, InstallComponentRequest,
    OverhaulApi, SparePartLedger,
};
use balancin_inventory::app::AppState;
use balancin_inventory::config::ConfigManager;
use balancin_inventory::domain::component::ComponentView;
use balancin_inventory::domain::overhaul::{NewOverhaul, OverhaulRecord};
use balancin_inventory::domain::types::Direction;

use crate::test_helpers::create_test_db;

pub const TEST_USER: &str = "tester";
pub const TEST_SECTION: &str = "S1";

// ==========================================
// API测试环境
// ==========================================

/// API测试环境
///
/// 包含所有API实例（经 AppState 装配，与生产一致）
pub struct ApiTestEnv {
    pub db_path: String,
    pub catalog_api: Arc<CatalogApi>,
    pub component_api: Arc<ComponentApi>,
    pub overhaul_api: Arc<OverhaulApi>,
    pub component_spares: Arc<SparePartLedger>,
    pub general_spares: Arc<SparePartLedger>,
    pub dashboard_api: Arc<DashboardApi>,
    pub export_api: Arc<ExportApi>,
    pub config: Arc<ConfigManager>,

    // 临时文件（确保生命周期）
    _temp_file: NamedTempFile,
}

impl ApiTestEnv {
    /// 创建新的API测试环境（临时数据库 + 建表）
    pub fn new() -> Result<Self, String> {
        balancin_inventory::logging::init_test();

        let (temp_file, db_path) =
            create_test_db().map_err(|e| format!("创建测试数据库失败: {}", e))?;
        let state = AppState::new(db_path.clone())?;

        Ok(Self {
            db_path,
            catalog_api: state.catalog_api.clone(),
            component_api: state.component_api.clone(),
            overhaul_api: state.overhaul_api.clone(),
            component_spares: state.component_spares.clone(),
            general_spares: state.general_spares.clone(),
            dashboard_api: state.dashboard_api.clone(),
            export_api: state.export_api.clone(),
            config: state.config.clone(),
            _temp_file: temp_file,
        })
    }

    /// 登记塔（线路与区段不存在时自动创建），返回 tower_id
    pub fn add_tower(&self, line_name: &str, tower_number: &str, asc_type: &str, desc_type: &str) -> i64 {
        let line_id = self.ensure_line(line_name);
        let section_id = self.ensure_section(TEST_SECTION);
        self.catalog_api
            .create_tower(
                line_id,
                section_id,
                tower_number,
                Some(asc_type),
                Some(desc_type),
                None,
            )
            .expect("登记塔失败")
            .tower_id
    }

    pub fn ensure_line(&self, name: &str) -> i64 {
        let lines = self.catalog_api.list_lines().expect("查询线路失败");
        match lines.into_iter().find(|l| l.name == name) {
            Some(line) => line.line_id,
            None => self.catalog_api.create_line(name, None).expect("登记线路失败").line_id,
        }
    }

    pub fn ensure_section(&self, name: &str) -> i64 {
        let sections = self.catalog_api.list_sections().expect("查询区段失败");
        match sections.into_iter().find(|s| s.name == name) {
            Some(section) => section.section_id,
            None => self.catalog_api.create_section(name).expect("登记区段失败").section_id,
        }
    }

    /// 以指定周期安装平衡轮
    pub fn install(&self, code: &str, tower_id: i64, direction: Direction, interval_hours: i64) -> ComponentView {
        self.component_api
            .install_component(
                InstallComponentRequest {
                    code: code.to_string(),
                    tower_id,
                    direction,
                    interval_hours: Some(interval_hours),
                    notes: None,
                },
                TEST_USER,
            )
            .expect("安装平衡轮失败")
    }

    /// 记录一次 OH（日期按序号递增）
    pub fn record(&self, code: &str, sequence_number: i64, operating_hours: Option<i64>) -> ApiResult<OverhaulRecord> {
        self.record_on(code, sequence_number, date(2024, 5, 6), operating_hours)
    }

    pub fn record_on(
        &self,
        code: &str,
        sequence_number: i64,
        overhaul_date: NaiveDate,
        operating_hours: Option<i64>,
    ) -> ApiResult<OverhaulRecord> {
        self.overhaul_api.record_overhaul(
            code,
            NewOverhaul {
                sequence_number,
                overhaul_date,
                operating_hours,
                notes: None,
            },
            TEST_USER,
        )
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("非法日期")
}
