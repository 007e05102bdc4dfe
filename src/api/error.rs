// ==========================================
// 平衡轮库存系统 - API层错误类型
// ==========================================
// 职责: 定义API层错误类型，转换Repository错误为用户可读的错误消息
// 台账类错误保持类型化，供表现层按类别提示并回显表单
// ==========================================

use crate::i18n::t_with_args;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 台账规则错误
    // ==========================================
    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("OH 序号重复: 平衡轮 {component_code} 已存在第 {sequence_number} 次 OH")]
    DuplicateSequence {
        component_code: String,
        sequence_number: i64,
    },

    #[error("编码已存在: {0}")]
    DuplicateItem(String),

    #[error("槽位已被占用: {0}")]
    SlotOccupied(String),

    #[error("数量无效: {requested}（必须大于 0）")]
    InvalidQuantity { requested: i64 },

    #[error("库存不足: {item_code} 可用 {available}，请求 {requested}")]
    InsufficientStock {
        item_code: String,
        available: i64,
        requested: i64,
    },

    #[error("无效输入: {0}")]
    InvalidInput(String),

    // ==========================================
    // 数据访问错误
    // ==========================================
    #[error("数据库错误: {0}")]
    DatabaseError(String),

    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    // ==========================================
    // 导出错误
    // ==========================================
    #[error("导出失败: {0}")]
    ExportError(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("内部错误: {0}")]
    InternalError(String),
}

impl ApiError {
    /// 回显给操作员的提示（当前语言），台账类以外的错误沿用内部描述
    pub fn user_message(&self) -> String {
        match self {
            ApiError::InsufficientStock {
                item_code,
                available,
                requested,
            } => t_with_args(
                "stock.insufficient",
                &[
                    ("item", item_code.clone()),
                    ("available", available.to_string()),
                    ("requested", requested.to_string()),
                ],
            ),
            ApiError::InvalidQuantity { requested } => t_with_args(
                "stock.invalid_quantity",
                &[("requested", requested.to_string())],
            ),
            other => other.to_string(),
        }
    }
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            // 台账规则错误
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})不存在", entity, id))
            }
            RepositoryError::DuplicateSequence {
                component_code,
                sequence_number,
            } => ApiError::DuplicateSequence {
                component_code,
                sequence_number,
            },
            RepositoryError::DuplicateItem { entity, code } => {
                ApiError::DuplicateItem(format!("{} {}", entity, code))
            }
            RepositoryError::SlotOccupied {
                tower_id,
                direction,
                occupant,
            } => ApiError::SlotOccupied(format!(
                "塔 {} 的 {} 槽位已安装 {}",
                tower_id, direction, occupant
            )),
            RepositoryError::InvalidQuantity { requested } => ApiError::InvalidQuantity { requested },
            RepositoryError::InsufficientStock {
                item_code,
                available,
                requested,
                ..
            } => ApiError::InsufficientStock {
                item_code,
                available,
                requested,
            },

            // 数据库错误
            RepositoryError::DatabaseConnectionError(msg) => ApiError::DatabaseConnectionError(msg),
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseConnectionError(format!("数据库锁获取失败: {}", msg))
            }
            RepositoryError::DatabaseTransactionError(msg) | RepositoryError::DatabaseQueryError(msg) => {
                ApiError::DatabaseError(msg)
            }
            RepositoryError::UniqueConstraintViolation(msg) => {
                ApiError::InvalidInput(format!("唯一约束违反: {}", msg))
            }
            RepositoryError::ForeignKeyViolation(msg) => {
                ApiError::InvalidInput(format!("引用的记录不存在: {}", msg))
            }

            // 数据质量错误
            RepositoryError::ValidationError(msg) => ApiError::InvalidInput(msg),

            // 通用错误
            RepositoryError::Other(err) => ApiError::InternalError(err.to_string()),
        }
    }
}

impl From<csv::Error> for ApiError {
    fn from(err: csv::Error) -> Self {
        ApiError::ExportError(err.to_string())
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;

// ==========================================
// 输入校验辅助函数
// ==========================================

/// 必填文本（去首尾空白后非空）
pub fn require_text(value: &str, field: &str) -> ApiResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ApiError::InvalidInput(format!("{}不能为空", field)));
    }
    Ok(trimmed.to_string())
}

/// 可选文本（空白视为 None）
pub fn optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// 配置读取失败统一转为内部错误
pub fn config_error(err: Box<dyn std::error::Error>) -> ApiError {
    ApiError::InternalError(format!("配置读取失败: {}", err))
}
