// ==========================================
// 平衡轮库存系统 - 已安装平衡轮领域模型
// ==========================================
// 编码约定: BAL-<型号前缀>-<序号>
// 型号不落库: 由所属塔的上/下行槽位型号推导
// ==========================================

use crate::domain::catalog::TowerView;
use crate::domain::types::Direction;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// 默认 OH 周期（小时）
pub const DEFAULT_INTERVAL_HOURS: i64 = 30_000;

/// 编码前缀
pub const COMPONENT_CODE_PREFIX: &str = "BAL";

// ==========================================
// Component - 已安装平衡轮
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    pub code: String,
    pub tower_id: i64,
    pub direction: Direction,
    pub interval_hours: i64, // OH 周期（小时）
    pub notes: Option<String>,
    pub registered_at: NaiveDateTime,
}

// ==========================================
// StatusChangeRecord - 状态变更审计
// ==========================================
// 只追加，不修改
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusChangeRecord {
    pub change_id: String,
    pub component_code: String,
    pub previous_state: String,
    pub new_state: String,
    pub action: String,
    pub notes: Option<String>,
    pub changed_at: NaiveDateTime,
    pub actor: Option<String>,
}

/// 平衡轮及其安装位置（型号由槽位推导）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentView {
    pub component: Component,
    pub tower: TowerView,
    pub type_code: Option<String>,
}

impl ComponentView {
    pub fn line_name(&self) -> &str {
        &self.tower.line_name
    }

    pub fn line_id(&self) -> i64 {
        self.tower.tower.line_id
    }

    pub fn tower_number(&self) -> &str {
        &self.tower.tower.tower_number
    }
}

/// 状态与动作常量
pub mod lifecycle {
    pub const STATE_NEW: &str = "NUEVO";
    pub const STATE_INSTALLED: &str = "INSTALADO";

    pub const ACTION_INSTALL: &str = "INSTALACION";
    pub const ACTION_UPDATE: &str = "ACTUALIZACION";
    pub const ACTION_RELOCATE: &str = "REUBICACION";
}

/// 编码统一大写去空白（安装与所有查找共用）
pub fn normalize_component_code(code: &str) -> String {
    code.trim().to_uppercase()
}

/// 计算下一个平衡轮编码
///
/// # 规则
/// - 只识别 `BAL-<prefix>-<数字>` 形式的已有编码
/// - 取最大数字序号 + 1，三位补零
/// - 非数字后缀忽略
pub fn next_component_code<'a, I>(type_prefix: &str, existing_codes: I) -> (Option<String>, String)
where
    I: IntoIterator<Item = &'a str>,
{
    let head = format!("{}-{}-", COMPONENT_CODE_PREFIX, type_prefix);
    let mut last: Option<(u32, &str)> = None;

    for code in existing_codes {
        let Some(rest) = code.strip_prefix(&head) else {
            continue;
        };
        let Ok(number) = rest.parse::<u32>() else {
            continue;
        };
        if last.map_or(true, |(n, _)| number > n) {
            last = Some((number, code));
        }
    }

    let next_number = last.map_or(1, |(n, _)| n + 1);
    (
        last.map(|(_, code)| code.to_string()),
        format!("{}{:03}", head, next_number),
    )
}
