// ==========================================
// 平衡轮库存系统 - 备件库存流水引擎
// ==========================================
// 红线: 每次数量变化恰好生成一条流水，流水结存 == 变更后数量
// 红线: 规则校验先于任何写入
// ==========================================
// 职责: 根据当前备件状态规划下一次变更（不拼 SQL）
// 输出: StockChange（由仓储在同一事务内落库）
// ==========================================

use crate::domain::spare_part::{NewSparePart, SparePart, StockChange, StockMovement};
use crate::domain::types::{MovementKind, SpareCatalog};
use crate::repository::error::RepositoryError;
use chrono::NaiveDateTime;
use thiserror::Error;
use uuid::Uuid;

/// 库存规则违反
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StockRuleViolation {
    #[error("数量必须大于 0: {requested}")]
    NonPositiveQuantity { requested: i64 },

    #[error("数量不能为负: {requested}")]
    NegativeQuantity { requested: i64 },

    #[error("库存不足: {item_code} 可用={available}, 请求={requested}")]
    InsufficientStock {
        catalog: SpareCatalog,
        item_code: String,
        available: i64,
        requested: i64,
    },

    #[error("调整前后数量相同: {quantity}")]
    NoChange { quantity: i64 },

    #[error("入库后数量超出上限: 现有={available}, 入库={requested}")]
    QuantityOverflow { available: i64, requested: i64 },
}

impl From<StockRuleViolation> for RepositoryError {
    fn from(violation: StockRuleViolation) -> Self {
        match violation {
            StockRuleViolation::NonPositiveQuantity { requested }
            | StockRuleViolation::NegativeQuantity { requested } => {
                RepositoryError::InvalidQuantity { requested }
            }
            StockRuleViolation::InsufficientStock {
                catalog,
                item_code,
                available,
                requested,
            } => RepositoryError::InsufficientStock {
                catalog,
                item_code,
                available,
                requested,
            },
            StockRuleViolation::NoChange { quantity } => {
                RepositoryError::ValidationError(format!("调整前后数量相同: {}", quantity))
            }
            overflow @ StockRuleViolation::QuantityOverflow { .. } => {
                RepositoryError::ValidationError(overflow.to_string())
            }
        }
    }
}

// ==========================================
// StockLedgerEngine - 库存变更规划
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct StockLedgerEngine;

impl StockLedgerEngine {
    pub fn new() -> Self {
        Self
    }

    /// 建档（初始数量可为 0）
    pub fn plan_creation(
        &self,
        catalog: SpareCatalog,
        request: &NewSparePart,
        actor: Option<&str>,
        now: NaiveDateTime,
    ) -> Result<StockChange, StockRuleViolation> {
        if request.initial_quantity < 0 {
            return Err(StockRuleViolation::NegativeQuantity {
                requested: request.initial_quantity,
            });
        }
        let part = SparePart {
            catalog,
            item_code: normalize_item_code(&request.item_code),
            description: request.description.trim().to_string(),
            quantity: request.initial_quantity,
            location: request.location.clone(),
            notes: request.notes.clone(),
            received_at: now,
            last_movement_at: now,
            last_exit_at: None,
        };
        let movement = movement_for(
            &part,
            MovementKind::Creation,
            request.initial_quantity,
            Some("Creación inicial".to_string()),
            actor,
            now,
        );
        Ok(StockChange { part, movement })
    }

    /// 入库
    pub fn plan_entry(
        &self,
        current: &SparePart,
        quantity: i64,
        notes: Option<String>,
        actor: Option<&str>,
        now: NaiveDateTime,
    ) -> Result<StockChange, StockRuleViolation> {
        ensure_positive(quantity)?;
        let total = current.quantity.checked_add(quantity).ok_or(
            StockRuleViolation::QuantityOverflow {
                available: current.quantity,
                requested: quantity,
            },
        )?;
        let mut part = current.clone();
        part.quantity = total;
        part.last_movement_at = now;
        let movement = movement_for(&part, MovementKind::Entry, quantity, notes, actor, now);
        Ok(StockChange { part, movement })
    }

    /// 出库
    pub fn plan_exit(
        &self,
        current: &SparePart,
        quantity: i64,
        notes: Option<String>,
        actor: Option<&str>,
        now: NaiveDateTime,
    ) -> Result<StockChange, StockRuleViolation> {
        ensure_positive(quantity)?;
        if quantity > current.quantity {
            return Err(StockRuleViolation::InsufficientStock {
                catalog: current.catalog,
                item_code: current.item_code.clone(),
                available: current.quantity,
                requested: quantity,
            });
        }
        let mut part = current.clone();
        part.quantity -= quantity;
        part.last_movement_at = now;
        part.last_exit_at = Some(now);
        let movement = movement_for(&part, MovementKind::Exit, quantity, notes, actor, now);
        Ok(StockChange { part, movement })
    }

    /// 盘点调整（流水数量为带符号差值）
    pub fn plan_adjustment(
        &self,
        current: &SparePart,
        new_quantity: i64,
        notes: Option<String>,
        actor: Option<&str>,
        now: NaiveDateTime,
    ) -> Result<StockChange, StockRuleViolation> {
        if new_quantity < 0 {
            return Err(StockRuleViolation::NegativeQuantity {
                requested: new_quantity,
            });
        }
        let delta = new_quantity - current.quantity;
        if delta == 0 {
            return Err(StockRuleViolation::NoChange {
                quantity: new_quantity,
            });
        }
        let mut part = current.clone();
        part.quantity = new_quantity;
        part.last_movement_at = now;
        let movement = movement_for(&part, MovementKind::Adjustment, delta, notes, actor, now);
        Ok(StockChange { part, movement })
    }
}

/// 编码统一大写去空白
pub fn normalize_item_code(code: &str) -> String {
    code.trim().to_uppercase()
}

/// 入库/出库数量必须 > 0
pub fn ensure_positive(quantity: i64) -> Result<(), StockRuleViolation> {
    if quantity <= 0 {
        return Err(StockRuleViolation::NonPositiveQuantity { requested: quantity });
    }
    Ok(())
}

fn movement_for(
    part: &SparePart,
    kind: MovementKind,
    quantity: i64,
    notes: Option<String>,
    actor: Option<&str>,
    now: NaiveDateTime,
) -> StockMovement {
    StockMovement {
        movement_id: Uuid::new_v4().to_string(),
        catalog: part.catalog,
        item_code: part.item_code.clone(),
        kind,
        quantity,
        resulting_balance: part.quantity,
        notes,
        actor: actor.map(str::to_string),
        moved_at: now,
    }
}
