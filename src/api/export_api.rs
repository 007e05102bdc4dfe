// ==========================================
// 平衡轮库存系统 - 导出 API
// ==========================================
// 职责: 生成 OH 宽表与库存清单，经 csv crate 写出
// 红线: OH 宽表列序固定，最多 4 组 OH（报表约定）
// ==========================================

use std::io::Write;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::api::error::{ApiError, ApiResult};
use crate::api::overhaul_api::OverhaulApi;
use crate::api::spare_part_api::SparePartLedger;
use crate::domain::overhaul::OverhaulRecord;
use crate::domain::spare_part::StockFilter;
use crate::perf::PerfSpan;
use crate::repository::catalog_repo::CatalogRepository;
use crate::repository::component_repo::ComponentRepository;
use crate::repository::overhaul_repo::OverhaulRepository;

/// 宽表 OH 组数
pub const OH_EXPORT_GROUPS: usize = 4;

/// 宽表固定前缀列
pub const OVERHAUL_EXPORT_LEAD_HEADERS: [&str; 7] = [
    "Línea", "Sección", "Torre", "Sentido", "Código", "Tipo", "Rango OH",
];

/// 每组 OH 的列
pub const OVERHAUL_EXPORT_GROUP_HEADERS: [&str; 4] = ["Fecha", "Año", "Horas", "Backlog"];

pub const OVERHAUL_EXPORT_STATUS_HEADER: &str = "Estado";

const INSTALL_DATE_FORMAT: &str = "%d/%m/%Y";

/// 完整表头: 7 列 + 4 × (Fecha, Año, Horas, Backlog) + Estado
pub fn overhaul_export_headers() -> Vec<String> {
    let mut headers: Vec<String> = OVERHAUL_EXPORT_LEAD_HEADERS
        .iter()
        .map(|h| h.to_string())
        .collect();
    for n in 1..=OH_EXPORT_GROUPS {
        for column in OVERHAUL_EXPORT_GROUP_HEADERS {
            headers.push(format!("OH{} {}", n, column));
        }
    }
    headers.push(OVERHAUL_EXPORT_STATUS_HEADER.to_string());
    headers
}

/// 一组 OH 数据
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OverhaulExportGroup {
    pub sequence_number: i64,
    pub month_label: String, // "%b-%y"
    pub year: i32,
    pub operating_hours: Option<i64>,
    pub backlog: Option<i64>,
}

impl From<&OverhaulRecord> for OverhaulExportGroup {
    fn from(record: &OverhaulRecord) -> Self {
        Self {
            sequence_number: record.sequence_number,
            month_label: record.month_year_label(),
            year: record.year,
            operating_hours: record.operating_hours,
            backlog: record.backlog,
        }
    }
}

/// OH 宽表一行
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OverhaulExportRow {
    pub line_name: String,
    pub section_name: String,
    pub tower_number: String,
    pub direction: String,
    pub code: String,
    pub type_code: Option<String>,
    pub interval_hours: i64,
    pub groups: Vec<OverhaulExportGroup>, // 序号升序，最多 4 组
    pub status: String,
}

impl OverhaulExportRow {
    /// 展开为定长记录（缺失组填空）
    pub fn to_record(&self) -> Vec<String> {
        let mut record = vec![
            self.line_name.clone(),
            self.section_name.clone(),
            self.tower_number.clone(),
            self.direction.clone(),
            self.code.clone(),
            self.type_code.clone().unwrap_or_default(),
            self.interval_hours.to_string(),
        ];
        for slot in 0..OH_EXPORT_GROUPS {
            match self.groups.get(slot) {
                Some(group) => {
                    record.push(group.month_label.clone());
                    record.push(group.year.to_string());
                    record.push(opt_number(group.operating_hours));
                    record.push(opt_number(group.backlog));
                }
                None => record.extend(std::iter::repeat(String::new()).take(4)),
            }
        }
        record.push(self.status.clone());
        record
    }
}

/// 库存清单类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InventoryExportKind {
    Components,
    Types,
    ComponentSpares,
    GeneralSpares,
}

impl InventoryExportKind {
    pub fn headers(&self) -> &'static [&'static str] {
        match self {
            InventoryExportKind::Components => &[
                "Código", "Línea", "Torre", "Sección", "Sentido", "Rango OH", "Fecha Instalación",
            ],
            InventoryExportKind::Types => &["Código", "Tipo", "Cantidad Total"],
            InventoryExportKind::ComponentSpares | InventoryExportKind::GeneralSpares => {
                &["Item", "Descripción", "Cantidad", "Ubicación", "Observaciones"]
            }
        }
    }
}

// ==========================================
// ExportApi - 导出 API
// ==========================================
pub struct ExportApi {
    catalog_repo: Arc<CatalogRepository>,
    component_repo: Arc<ComponentRepository>,
    overhaul_repo: Arc<OverhaulRepository>,
    overhaul_api: Arc<OverhaulApi>,
    component_spares: Arc<SparePartLedger>,
    general_spares: Arc<SparePartLedger>,
}

impl ExportApi {
    pub fn new(
        catalog_repo: Arc<CatalogRepository>,
        component_repo: Arc<ComponentRepository>,
        overhaul_repo: Arc<OverhaulRepository>,
        overhaul_api: Arc<OverhaulApi>,
        component_spares: Arc<SparePartLedger>,
        general_spares: Arc<SparePartLedger>,
    ) -> Self {
        Self {
            catalog_repo,
            component_repo,
            overhaul_repo,
            overhaul_api,
            component_spares,
            general_spares,
        }
    }

    /// OH 宽表数据（线路、塔号自然序、方向）
    pub fn overhaul_export_rows(&self) -> ApiResult<Vec<OverhaulExportRow>> {
        let _perf = PerfSpan::enter("export.overhaul_rows");
        let rated = self.overhaul_api.rated_components(None, None)?;
        let mut recent = self.overhaul_repo.recent_by_component(OH_EXPORT_GROUPS)?;

        Ok(rated
            .into_iter()
            .map(|item| {
                let groups = recent
                    .remove(&item.view.component.code)
                    .unwrap_or_default()
                    .iter()
                    .map(OverhaulExportGroup::from)
                    .collect();
                OverhaulExportRow {
                    line_name: item.view.tower.line_name.clone(),
                    section_name: item.view.tower.section_name.clone(),
                    tower_number: item.view.tower.tower.tower_number.clone(),
                    direction: item.view.component.direction.label(),
                    code: item.view.component.code.clone(),
                    type_code: item.view.type_code.clone(),
                    interval_hours: item.view.component.interval_hours,
                    groups,
                    status: item.tier.label(),
                }
            })
            .collect())
    }

    /// 写出 OH 宽表 CSV，返回数据行数
    pub fn write_overhaul_csv<W: Write>(&self, writer: W) -> ApiResult<usize> {
        let rows = self.overhaul_export_rows()?;
        let mut csv_writer = csv::Writer::from_writer(writer);
        csv_writer.write_record(overhaul_export_headers())?;
        for row in &rows {
            csv_writer.write_record(row.to_record())?;
        }
        csv_writer
            .flush()
            .map_err(|e| ApiError::ExportError(e.to_string()))?;
        tracing::info!(rows = rows.len(), "OH 宽表已导出");
        Ok(rows.len())
    }

    /// 写出库存清单 CSV，返回数据行数
    pub fn write_inventory_csv<W: Write>(&self, kind: InventoryExportKind, writer: W) -> ApiResult<usize> {
        let _perf = PerfSpan::enter("export.inventory");
        let records = self.inventory_records(kind)?;
        let mut csv_writer = csv::Writer::from_writer(writer);
        csv_writer.write_record(kind.headers())?;
        for record in &records {
            csv_writer.write_record(record)?;
        }
        csv_writer
            .flush()
            .map_err(|e| ApiError::ExportError(e.to_string()))?;
        tracing::info!(kind = ?kind, rows = records.len(), "库存清单已导出");
        Ok(records.len())
    }

    fn inventory_records(&self, kind: InventoryExportKind) -> ApiResult<Vec<Vec<String>>> {
        let records = match kind {
            InventoryExportKind::Components => self
                .component_repo
                .list_views(None, None)?
                .into_iter()
                .map(|view| {
                    vec![
                        view.component.code.clone(),
                        view.tower.line_name.clone(),
                        view.tower.tower.tower_number.clone(),
                        view.tower.section_name.clone(),
                        view.component.direction.label(),
                        view.component.interval_hours.to_string(),
                        view.component
                            .registered_at
                            .format(INSTALL_DATE_FORMAT)
                            .to_string(),
                    ]
                })
                .collect(),
            InventoryExportKind::Types => self
                .catalog_repo
                .list_component_types()?
                .into_iter()
                .map(|t| vec![t.code, t.category.label(), t.total_quantity.to_string()])
                .collect(),
            InventoryExportKind::ComponentSpares => spare_records(&self.component_spares)?,
            InventoryExportKind::GeneralSpares => spare_records(&self.general_spares)?,
        };
        Ok(records)
    }
}

fn spare_records(ledger: &SparePartLedger) -> ApiResult<Vec<Vec<String>>> {
    Ok(ledger
        .list_items(None, StockFilter::All)?
        .items
        .into_iter()
        .map(|p| {
            vec![
                p.item_code,
                p.description,
                p.quantity.to_string(),
                p.location.unwrap_or_default(),
                p.notes.unwrap_or_default(),
            ]
        })
        .collect())
}

fn opt_number(value: Option<i64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}
