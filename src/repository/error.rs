// ==========================================
// 平衡轮库存系统 - 仓储层错误类型
// ==========================================
// 工具: thiserror 派生宏
// 台账类错误（重复序号/重复编码/库存不足等）在事务内检出，检出即回滚
// ==========================================

use crate::domain::types::{Direction, SpareCatalog};
use thiserror::Error;

/// 仓储层错误类型
#[derive(Error, Debug)]
pub enum RepositoryError {
    // ===== 数据库错误 =====
    #[error("记录未找到: {entity} with id={id}")]
    NotFound { entity: String, id: String },

    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    #[error("数据库锁获取失败: {0}")]
    LockError(String),

    #[error("数据库事务失败: {0}")]
    DatabaseTransactionError(String),

    #[error("数据库查询失败: {0}")]
    DatabaseQueryError(String),

    #[error("唯一约束违反: {0}")]
    UniqueConstraintViolation(String),

    #[error("外键约束违反: {0}")]
    ForeignKeyViolation(String),

    // ===== 台账规则错误 =====
    #[error("OH 序号重复: component={component_code}, sequence={sequence_number}")]
    DuplicateSequence {
        component_code: String,
        sequence_number: i64,
    },

    #[error("编码已存在: {entity} {code}")]
    DuplicateItem { entity: String, code: String },

    #[error("槽位已被占用: tower_id={tower_id}, direction={direction}, occupant={occupant}")]
    SlotOccupied {
        tower_id: i64,
        direction: Direction,
        occupant: String,
    },

    #[error("数量无效: {requested}")]
    InvalidQuantity { requested: i64 },

    #[error("库存不足: {catalog} {item_code} 可用={available}, 请求={requested}")]
    InsufficientStock {
        catalog: SpareCatalog,
        item_code: String,
        available: i64,
        requested: i64,
    },

    // ===== 数据质量错误 =====
    #[error("数据验证失败: {0}")]
    ValidationError(String),

    // ===== 通用错误 =====
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RepositoryError {
    pub fn not_found(entity: &str, id: impl ToString) -> Self {
        RepositoryError::NotFound {
            entity: entity.to_string(),
            id: id.to_string(),
        }
    }
}

// 实现 From<rusqlite::Error>
impl From<rusqlite::Error> for RepositoryError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(_, Some(msg)) => {
                if msg.contains("UNIQUE") {
                    RepositoryError::UniqueConstraintViolation(msg)
                } else if msg.contains("FOREIGN KEY") {
                    RepositoryError::ForeignKeyViolation(msg)
                } else {
                    RepositoryError::DatabaseQueryError(msg)
                }
            }
            rusqlite::Error::QueryReturnedNoRows => RepositoryError::NotFound {
                entity: "Unknown".to_string(),
                id: "Unknown".to_string(),
            },
            _ => RepositoryError::DatabaseQueryError(err.to_string()),
        }
    }
}

/// Result 类型别名
pub type RepositoryResult<T> = Result<T, RepositoryError>;
