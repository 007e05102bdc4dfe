// ==========================================
// 平衡轮库存系统 - 备件台账 API
// ==========================================
// 职责: 单个备件目录的建档 / 入库 / 出库 / 盘点调整与查询
// 两个目录各持有一个 SparePartLedger 实例，行为一致
// ==========================================

use std::sync::Arc;

use serde::Serialize;

use crate::api::error::{config_error, optional_text, require_text, ApiError, ApiResult};
use crate::config::ConfigManager;
use crate::domain::spare_part::{
    MovementSummary, NewSparePart, SparePart, StockChange, StockFilter, StockMovement,
};
use crate::domain::types::SpareCatalog;
use crate::engine::stock_ledger::{
    ensure_positive, normalize_item_code, StockLedgerEngine, StockRuleViolation,
};
use crate::repository::error::RepositoryError;
use crate::repository::row_codec::now_timestamp;
use crate::repository::spare_part_repo::SparePartRepository;

/// 列表结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SparePartList {
    pub items: Vec<SparePart>,
    pub total_quantity: i64,
}

// ==========================================
// SparePartLedger - 备件台账
// ==========================================
pub struct SparePartLedger {
    catalog: SpareCatalog,
    repo: Arc<SparePartRepository>,
    engine: StockLedgerEngine,
    config: Arc<ConfigManager>,
}

impl SparePartLedger {
    pub fn new(
        catalog: SpareCatalog,
        repo: Arc<SparePartRepository>,
        config: Arc<ConfigManager>,
    ) -> Self {
        Self {
            catalog,
            repo,
            engine: StockLedgerEngine::new(),
            config,
        }
    }

    pub fn catalog(&self) -> SpareCatalog {
        self.catalog
    }

    /// 建档（初始数量可为 0，生成一条建档流水）
    ///
    /// # 返回
    /// - Err(DuplicateItem): 编码已存在于本目录
    /// - Err(InvalidQuantity): 初始数量为负
    pub fn create_item(
        &self,
        item_code: &str,
        description: &str,
        initial_quantity: i64,
        location: Option<&str>,
        notes: Option<&str>,
        user: Option<&str>,
    ) -> ApiResult<SparePart> {
        let request = NewSparePart {
            item_code: require_text(item_code, "备件编码")?,
            description: require_text(description, "备件描述")?,
            initial_quantity,
            location: optional_text(location),
            notes: optional_text(notes),
        };
        let actor = optional_text(user);
        let change = self
            .engine
            .plan_creation(self.catalog, &request, actor.as_deref(), now_timestamp())
            .map_err(|v| self.rejected(&request.item_code, RepositoryError::from(v)))?;

        self.repo.insert_with_creation(&change)?;
        self.log_change("备件已建档", &change);
        Ok(change.part)
    }

    /// 入库
    pub fn stock_entry(
        &self,
        item_code: &str,
        quantity: i64,
        notes: Option<&str>,
        user: Option<&str>,
    ) -> ApiResult<StockChange> {
        self.ensure_movement_quantity(item_code, quantity)?;
        let notes = optional_text(notes);
        let actor = optional_text(user);
        self.apply(item_code, "入库完成", |engine, part| {
            engine.plan_entry(part, quantity, notes, actor.as_deref(), now_timestamp())
        })
    }

    /// 出库
    ///
    /// # 返回
    /// - Err(InsufficientStock): 数量大于当前库存，状态不变
    /// - Err(InvalidQuantity): 数量 <= 0
    pub fn stock_exit(
        &self,
        item_code: &str,
        quantity: i64,
        notes: Option<&str>,
        user: Option<&str>,
    ) -> ApiResult<StockChange> {
        self.ensure_movement_quantity(item_code, quantity)?;
        let notes = optional_text(notes);
        let actor = optional_text(user);
        self.apply(item_code, "出库完成", |engine, part| {
            engine.plan_exit(part, quantity, notes, actor.as_deref(), now_timestamp())
        })
    }

    /// 盘点调整为指定数量（流水记带符号差值）
    pub fn adjust_quantity(
        &self,
        item_code: &str,
        new_quantity: i64,
        notes: Option<&str>,
        user: Option<&str>,
    ) -> ApiResult<StockChange> {
        let notes = optional_text(notes);
        let actor = optional_text(user);
        self.apply(item_code, "盘点调整完成", |engine, part| {
            engine.plan_adjustment(part, new_quantity, notes, actor.as_deref(), now_timestamp())
        })
    }

    pub fn get_item(&self, item_code: &str) -> ApiResult<SparePart> {
        let code = normalize_item_code(item_code);
        self.repo
            .find(self.catalog, &code)?
            .ok_or_else(|| ApiError::NotFound(format!("{} {} 不存在", self.catalog, code)))
    }

    /// 列表 + 模糊搜索 + 筛选，附总数量
    pub fn list_items(&self, query: Option<&str>, filter: StockFilter) -> ApiResult<SparePartList> {
        let threshold = self.config.low_stock_threshold().map_err(config_error)?;
        let items = self.repo.list(self.catalog, query, filter, threshold)?;
        let total_quantity = items.iter().map(|p| p.quantity).sum();
        Ok(SparePartList {
            items,
            total_quantity,
        })
    }

    /// 低库存（0 < 数量 < 阈值），阈值缺省取配置
    pub fn low_stock(&self, threshold: Option<i64>) -> ApiResult<Vec<SparePart>> {
        let threshold = match threshold {
            Some(v) if v > 0 => v,
            Some(v) => {
                return Err(ApiError::InvalidInput(format!("低库存阈值必须为正整数: {}", v)))
            }
            None => self.config.low_stock_threshold().map_err(config_error)?,
        };
        Ok(self.repo.list(self.catalog, None, StockFilter::Low, threshold)?)
    }

    pub fn out_of_stock(&self) -> ApiResult<Vec<SparePart>> {
        Ok(self.repo.list(self.catalog, None, StockFilter::Out, 0)?)
    }

    pub fn count(&self) -> ApiResult<i64> {
        Ok(self.repo.count(self.catalog)?)
    }

    /// 单个备件流水（新→旧）
    pub fn movement_history(&self, item_code: &str, limit: usize) -> ApiResult<Vec<StockMovement>> {
        let part = self.get_item(item_code)?;
        Ok(self.repo.movements(self.catalog, &part.item_code, limit)?)
    }

    /// 近期动态（建档/入库/出库）
    pub fn recent_activity(&self, limit: usize) -> ApiResult<Vec<MovementSummary>> {
        Ok(self.repo.recent_activity(self.catalog, limit)?)
    }

    fn apply<F>(&self, item_code: &str, message: &'static str, plan: F) -> ApiResult<StockChange>
    where
        F: FnOnce(&StockLedgerEngine, &SparePart) -> Result<StockChange, StockRuleViolation>,
    {
        let code = normalize_item_code(&require_text(item_code, "备件编码")?);
        let engine = &self.engine;
        let result = self.repo.apply_movement(self.catalog, &code, |part| {
            plan(engine, part).map_err(RepositoryError::from)
        });

        match result {
            Ok(change) => {
                self.log_change(message, &change);
                Ok(change)
            }
            Err(e) => Err(self.rejected(&code, e)),
        }
    }

    /// 数量校验先于编码查找
    fn ensure_movement_quantity(&self, item_code: &str, quantity: i64) -> ApiResult<()> {
        ensure_positive(quantity).map_err(|v| {
            self.rejected(&normalize_item_code(item_code), RepositoryError::from(v))
        })
    }

    fn rejected(&self, item_code: &str, err: RepositoryError) -> ApiError {
        let rule_violation = matches!(
            err,
            RepositoryError::InsufficientStock { .. }
                | RepositoryError::InvalidQuantity { .. }
                | RepositoryError::ValidationError(_)
        );
        let api_err = ApiError::from(err);
        if rule_violation {
            tracing::warn!(
                catalog = %self.catalog,
                item_code,
                error = %api_err,
                message = %api_err.user_message(),
                "库存变更被拒绝"
            );
        }
        api_err
    }

    fn log_change(&self, message: &'static str, change: &StockChange) {
        tracing::info!(
            catalog = %self.catalog,
            item_code = %change.part.item_code,
            kind = %change.movement.kind,
            quantity = change.movement.quantity,
            balance = change.movement.resulting_balance,
            actor = ?change.movement.actor,
            "{}",
            message
        );
    }
}
