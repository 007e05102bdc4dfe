// ==========================================
// 平衡轮库存系统 - 平衡轮 API
// ==========================================
// 职责: 安装 / 更新 / 迁移 / 退役，编码推算，详情
// ==========================================

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::api::error::{config_error, optional_text, require_text, ApiError, ApiResult};
use crate::config::ConfigManager;
use crate::domain::component::{
    next_component_code, normalize_component_code, Component, ComponentView, StatusChangeRecord,
    COMPONENT_CODE_PREFIX,
};
use crate::domain::overhaul::OverhaulRecord;
use crate::domain::types::{Direction, HealthTier};
use crate::engine::overhaul_health::OverhaulHealthEngine;
use crate::repository::component_repo::{ComponentChanges, ComponentRepository};
use crate::repository::overhaul_repo::OverhaulRepository;
use crate::repository::row_codec::now_timestamp;

const DETAIL_HISTORY_LIMIT: usize = 10;
const DETAIL_OVERHAUL_LIMIT: usize = 5;

/// 安装请求
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstallComponentRequest {
    pub code: String,
    pub tower_id: i64,
    pub direction: Direction,
    pub interval_hours: Option<i64>, // None 时取配置默认周期
    pub notes: Option<String>,
}

/// 编码建议
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CodeSuggestion {
    pub last_code: Option<String>,
    pub next_code: String,
}

/// 平衡轮详情
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComponentDetail {
    pub view: ComponentView,
    pub status_history: Vec<StatusChangeRecord>, // 新→旧
    pub recent_overhauls: Vec<OverhaulRecord>,   // 序号降序
    pub tier: HealthTier,
    pub latest_backlog: Option<i64>,
}

// ==========================================
// ComponentApi - 平衡轮 API
// ==========================================
pub struct ComponentApi {
    component_repo: Arc<ComponentRepository>,
    overhaul_repo: Arc<OverhaulRepository>,
    config: Arc<ConfigManager>,
}

impl ComponentApi {
    pub fn new(
        component_repo: Arc<ComponentRepository>,
        overhaul_repo: Arc<OverhaulRepository>,
        config: Arc<ConfigManager>,
    ) -> Self {
        Self {
            component_repo,
            overhaul_repo,
            config,
        }
    }

    /// 安装平衡轮
    ///
    /// # 返回
    /// - Err(SlotOccupied): 该塔该方向已有平衡轮
    /// - Err(DuplicateItem): 编码已存在
    /// - Err(NotFound): 塔不存在
    /// - Err(InvalidInput): 编码为空或周期 <= 0
    pub fn install_component(
        &self,
        request: InstallComponentRequest,
        user: &str,
    ) -> ApiResult<ComponentView> {
        let code = require_component_code(&request.code)?;
        let user = require_text(user, "操作人")?;
        let interval_hours = match request.interval_hours {
            Some(v) => v,
            None => self.config.default_interval_hours().map_err(config_error)?,
        };
        ensure_interval(interval_hours)?;

        let component = Component {
            code: code.clone(),
            tower_id: request.tower_id,
            direction: request.direction,
            interval_hours,
            notes: optional_text(request.notes.as_deref()),
            registered_at: now_timestamp(),
        };
        self.component_repo.install(&component, &user)?;
        tracing::info!(
            code = %code,
            tower_id = request.tower_id,
            direction = %request.direction,
            interval_hours,
            actor = %user,
            "平衡轮已安装"
        );
        self.get_component(&code)
    }

    /// 按型号前缀推算下一个编码（BAL-<前缀>-NNN）
    pub fn next_component_code(&self, type_prefix: &str) -> ApiResult<CodeSuggestion> {
        let prefix = require_text(type_prefix, "型号前缀")?.to_uppercase();
        let head = format!("{}-{}-", COMPONENT_CODE_PREFIX, prefix);
        let existing = self.component_repo.codes_with_prefix(&head)?;
        let (last_code, next_code) =
            next_component_code(&prefix, existing.iter().map(String::as_str));
        Ok(CodeSuggestion {
            last_code,
            next_code,
        })
    }

    pub fn update_component(
        &self,
        code: &str,
        interval_hours: Option<i64>,
        notes: Option<&str>,
        user: &str,
    ) -> ApiResult<Component> {
        let code = require_component_code(code)?;
        let user = require_text(user, "操作人")?;
        if let Some(v) = interval_hours {
            ensure_interval(v)?;
        }
        let changes = ComponentChanges {
            interval_hours,
            notes: notes.map(|n| n.trim().to_string()),
        };
        let component = self.component_repo.update(&code, &changes, &user)?;
        tracing::info!(code = %code, interval_hours = component.interval_hours, actor = %user, "平衡轮已更新");
        Ok(component)
    }

    /// 迁移到其它塔/方向（OH 历史随编码保留）
    pub fn relocate_component(
        &self,
        code: &str,
        tower_id: i64,
        direction: Direction,
        user: &str,
    ) -> ApiResult<ComponentView> {
        let code = require_component_code(code)?;
        let user = require_text(user, "操作人")?;
        self.component_repo.relocate(&code, tower_id, direction, &user)?;
        tracing::info!(code = %code, tower_id, direction = %direction, actor = %user, "平衡轮已迁移");
        self.get_component(&code)
    }

    /// 退役（OH 记录与状态历史一并删除）
    pub fn decommission_component(&self, code: &str, user: &str) -> ApiResult<()> {
        let code = require_component_code(code)?;
        let user = require_text(user, "操作人")?;
        self.component_repo.delete(&code)?;
        tracing::warn!(code = %code, actor = %user, "平衡轮已退役");
        Ok(())
    }

    pub fn get_component(&self, code: &str) -> ApiResult<ComponentView> {
        let code = require_component_code(code)?;
        self.component_repo
            .find_view(&code)?
            .ok_or_else(|| ApiError::NotFound(format!("平衡轮 {} 不存在", code)))
    }

    pub fn component_detail(&self, code: &str) -> ApiResult<ComponentDetail> {
        let view = self.get_component(code)?;
        let code = view.component.code.clone();
        let status_history = self
            .component_repo
            .status_history(&code, DETAIL_HISTORY_LIMIT)?;
        let mut recent_overhauls = self
            .overhaul_repo
            .list_latest(&code, DETAIL_OVERHAUL_LIMIT)?;
        recent_overhauls.reverse();

        let thresholds = self
            .config
            .ledger_settings()
            .map_err(config_error)?
            .health_thresholds();
        let latest = recent_overhauls.first();
        let tier = OverhaulHealthEngine::new(thresholds).classify(latest);
        let latest_backlog = latest.and_then(|r| r.backlog);

        Ok(ComponentDetail {
            view,
            status_history,
            recent_overhauls,
            tier,
            latest_backlog,
        })
    }

    pub fn list_components(
        &self,
        direction: Option<Direction>,
        line_id: Option<i64>,
    ) -> ApiResult<Vec<ComponentView>> {
        Ok(self.component_repo.list_views(direction, line_id)?)
    }
}

/// 必填平衡轮编码（统一大写）
pub(crate) fn require_component_code(code: &str) -> ApiResult<String> {
    require_text(code, "平衡轮编码").map(|c| normalize_component_code(&c))
}

fn ensure_interval(interval_hours: i64) -> ApiResult<()> {
    if interval_hours <= 0 {
        return Err(ApiError::InvalidInput(format!(
            "OH 周期必须为正整数: {}",
            interval_hours
        )));
    }
    Ok(())
}
