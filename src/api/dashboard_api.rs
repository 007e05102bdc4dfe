// ==========================================
// 平衡轮库存系统 - 看板 API
// ==========================================
// 职责: 库存总览、OH 看板、全局搜索
// 红线: 只读；筛选值只做绑定参数或内存比较，不拼接进 SQL
// ==========================================

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::api::error::{config_error, require_text, ApiResult};
use crate::api::overhaul_api::OverhaulApi;
use crate::api::spare_part_api::SparePartLedger;
use crate::config::ConfigManager;
use crate::domain::catalog::ComponentType;
use crate::domain::spare_part::{SparePart, StockFilter};
use crate::domain::types::HealthTier;
use crate::engine::aggregation::{
    aggregate_by_line, aggregate_global, backlog_chart, line_tier_chart, BacklogChart,
    LineTierChart, RatedComponent, TierAggregate, TierCounts, TierPercentages,
};
use crate::perf::PerfSpan;
use crate::repository::catalog_repo::{CatalogRepository, TowerOccupancy};
use crate::repository::component_repo::ComponentRepository;
use crate::repository::overhaul_repo::{OverhaulRecordCounts, OverhaulRepository};

const DASHBOARD_STOCK_LIST_LIMIT: usize = 10;
const BACKLOG_CHART_ROWS: usize = 20;
const SEARCH_TYPE_LIMIT: usize = 10;
const SEARCH_RESULT_LIMIT: usize = 20;

/// 库存总览
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InventoryDashboard {
    pub total_types: i64,
    pub total_type_quantity: i64,
    pub total_components: i64,
    pub total_towers: i64,
    pub total_lines: i64,
    pub ascending_components: i64,
    pub descending_components: i64,
    pub component_spare_items: i64,
    pub general_spare_items: i64,
    pub low_stock: Vec<SparePart>,    // 两个目录合并，前 10 条
    pub out_of_stock: Vec<SparePart>, // 两个目录合并，前 10 条
    pub low_stock_count: i64,
    pub out_of_stock_count: i64,
    pub normal_stock_count: i64,
    pub tier_counts: TierCounts,
    pub tier_percentages: TierPercentages,
}

/// OH 看板筛选（None 表示不筛选）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OverhaulDashboardFilter {
    pub line_name: Option<String>,      // 精确匹配（忽略大小写）
    pub tower: Option<String>,          // 塔号子串
    pub tier: Option<HealthTier>,
    pub component_code: Option<String>, // 精确匹配（忽略大小写）
}

impl OverhaulDashboardFilter {
    fn matches(&self, row: &RatedComponent) -> bool {
        if let Some(line) = non_blank(&self.line_name) {
            if !row.view.line_name().eq_ignore_ascii_case(line) {
                return false;
            }
        }
        if let Some(tower) = non_blank(&self.tower) {
            if !row
                .view
                .tower_number()
                .to_uppercase()
                .contains(&tower.to_uppercase())
            {
                return false;
            }
        }
        if let Some(tier) = self.tier {
            if row.tier != tier {
                return false;
            }
        }
        if let Some(code) = non_blank(&self.component_code) {
            if !row.view.component.code.eq_ignore_ascii_case(code) {
                return false;
            }
        }
        true
    }
}

/// OH 看板
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverhaulDashboard {
    pub rows: Vec<RatedComponent>,
    pub by_line: Vec<TierAggregate>,
    pub line_chart: LineTierChart,
    pub backlog_chart: BacklogChart,
    pub tier_counts: TierCounts,
    pub tier_percentages: TierPercentages,
    pub record_counts: OverhaulRecordCounts,
}

/// 搜索范围
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SearchScope {
    #[default]
    All,
    Types,
    Components,
    Towers,
    Spares,
}

impl SearchScope {
    fn includes(&self, other: SearchScope) -> bool {
        *self == SearchScope::All || *self == other
    }
}

/// 全局搜索结果
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InventorySearchResults {
    pub query: String,
    pub types: Vec<ComponentType>,
    pub components: Vec<RatedComponent>,
    pub towers: Vec<TowerOccupancy>,
    pub component_spares: Vec<SparePart>,
    pub general_spares: Vec<SparePart>,
}

impl InventorySearchResults {
    pub fn total(&self) -> usize {
        self.types.len()
            + self.components.len()
            + self.towers.len()
            + self.component_spares.len()
            + self.general_spares.len()
    }
}

// ==========================================
// DashboardApi - 看板 API
// ==========================================
pub struct DashboardApi {
    catalog_repo: Arc<CatalogRepository>,
    component_repo: Arc<ComponentRepository>,
    overhaul_repo: Arc<OverhaulRepository>,
    overhaul_api: Arc<OverhaulApi>,
    component_spares: Arc<SparePartLedger>,
    general_spares: Arc<SparePartLedger>,
    config: Arc<ConfigManager>,
}

impl DashboardApi {
    pub fn new(
        catalog_repo: Arc<CatalogRepository>,
        component_repo: Arc<ComponentRepository>,
        overhaul_repo: Arc<OverhaulRepository>,
        overhaul_api: Arc<OverhaulApi>,
        component_spares: Arc<SparePartLedger>,
        general_spares: Arc<SparePartLedger>,
        config: Arc<ConfigManager>,
    ) -> Self {
        Self {
            catalog_repo,
            component_repo,
            overhaul_repo,
            overhaul_api,
            component_spares,
            general_spares,
            config,
        }
    }

    /// 库存总览
    pub fn inventory_dashboard(&self) -> ApiResult<InventoryDashboard> {
        let _perf = PerfSpan::enter("dashboard.inventory");
        let threshold = self.config.low_stock_threshold().map_err(config_error)?;

        let type_summary = self.catalog_repo.type_summary()?;
        let (ascending, descending) = self.component_repo.count_by_direction()?;

        let mut low_stock = Vec::new();
        let mut out_of_stock = Vec::new();
        let mut normal_stock_count = 0;
        for ledger in [&self.component_spares, &self.general_spares] {
            let items = ledger.list_items(None, StockFilter::All)?.items;
            normal_stock_count += items.iter().filter(|p| p.quantity >= threshold).count() as i64;
            low_stock.extend(ledger.low_stock(Some(threshold))?);
            out_of_stock.extend(ledger.out_of_stock()?);
        }
        let low_stock_count = low_stock.len() as i64;
        let out_of_stock_count = out_of_stock.len() as i64;
        low_stock.truncate(DASHBOARD_STOCK_LIST_LIMIT);
        out_of_stock.truncate(DASHBOARD_STOCK_LIST_LIMIT);

        let rated = self.overhaul_api.rated_components(None, None)?;
        let (tier_counts, tier_percentages) = aggregate_global(&rated);

        Ok(InventoryDashboard {
            total_types: type_summary.total_types,
            total_type_quantity: type_summary.total_quantity,
            total_components: ascending + descending,
            total_towers: self.catalog_repo.count_towers()?,
            total_lines: self.catalog_repo.count_lines()?,
            ascending_components: ascending,
            descending_components: descending,
            component_spare_items: self.component_spares.count()?,
            general_spare_items: self.general_spares.count()?,
            low_stock,
            out_of_stock,
            low_stock_count,
            out_of_stock_count,
            normal_stock_count,
            tier_counts,
            tier_percentages,
        })
    }

    /// OH 看板
    ///
    /// # 说明
    /// - 行按线路、塔号自然序、方向排列
    /// - 线路图只含至少一个有数据平衡轮的线路
    /// - backlog 图取前 20 行，无数据时值为 0
    pub fn overhaul_dashboard(&self, filter: &OverhaulDashboardFilter) -> ApiResult<OverhaulDashboard> {
        let _perf = PerfSpan::enter("dashboard.overhaul");

        let rows: Vec<RatedComponent> = self
            .overhaul_api
            .rated_components(None, None)?
            .into_iter()
            .filter(|row| filter.matches(row))
            .collect();
        let by_line = aggregate_by_line(&rows);
        let (tier_counts, tier_percentages) = aggregate_global(&rows);

        tracing::debug!(rows = rows.len(), lines = by_line.len(), "OH 看板已生成");
        Ok(OverhaulDashboard {
            line_chart: line_tier_chart(&by_line),
            backlog_chart: backlog_chart(&rows, BACKLOG_CHART_ROWS),
            record_counts: self.overhaul_repo.counts()?,
            rows,
            by_line,
            tier_counts,
            tier_percentages,
        })
    }

    /// 全局搜索
    pub fn search_inventory(&self, query: &str, scope: SearchScope) -> ApiResult<InventorySearchResults> {
        let _perf = PerfSpan::enter("dashboard.search");
        let query = require_text(query, "搜索关键字")?;
        let mut results = InventorySearchResults {
            query: query.clone(),
            ..Default::default()
        };

        if scope.includes(SearchScope::Types) {
            results.types = self
                .catalog_repo
                .search_component_types(&query, SEARCH_TYPE_LIMIT)?;
        }
        if scope.includes(SearchScope::Components) {
            let views = self.component_repo.search(&query, SEARCH_RESULT_LIMIT)?;
            results.components = self.overhaul_api.rate(views)?;
        }
        if scope.includes(SearchScope::Towers) {
            results.towers = self.catalog_repo.search_towers(&query, SEARCH_RESULT_LIMIT)?;
        }
        if scope.includes(SearchScope::Spares) {
            results.component_spares = self.search_spares(&self.component_spares, &query)?;
            results.general_spares = self.search_spares(&self.general_spares, &query)?;
        }

        tracing::debug!(query = %query, scope = ?scope, hits = results.total(), "搜索完成");
        Ok(results)
    }

    fn search_spares(&self, ledger: &SparePartLedger, query: &str) -> ApiResult<Vec<SparePart>> {
        let mut items = ledger.list_items(Some(query), StockFilter::All)?.items;
        items.truncate(SEARCH_RESULT_LIMIT);
        Ok(items)
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}
