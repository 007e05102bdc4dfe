// ==========================================
// 平衡轮库存系统 - OH 台账 API
// ==========================================
// 职责: 记录 OH、判定健康等级、backlog 序列、等级汇总
// 红线: 既有 OH 记录只读，不回写快照
// ==========================================

use std::sync::Arc;

use serde::Serialize;

use crate::api::component_api::require_component_code;
use crate::api::error::{config_error, require_text, ApiError, ApiResult};
use crate::config::ConfigManager;
use crate::domain::component::ComponentView;
use crate::domain::overhaul::{BacklogPoint, NewOverhaul, OverhaulRecord};
use crate::domain::types::{Direction, HealthTier};
use crate::engine::aggregation::{
    aggregate_by_line, aggregate_by_tower, aggregate_global, RatedComponent, TierAggregate,
    TierCounts, TierPercentages,
};
use crate::engine::overhaul_health::OverhaulHealthEngine;
use crate::repository::component_repo::ComponentRepository;
use crate::repository::error::RepositoryError;
use crate::repository::overhaul_repo::OverhaulRepository;
use crate::repository::row_codec::now_timestamp;

/// 全局等级汇总
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GlobalHealthSummary {
    pub total_components: i64,
    pub total_with_data: i64,
    pub counts: TierCounts,
    pub percentages: TierPercentages,
}

// ==========================================
// OverhaulApi - OH 台账 API
// ==========================================
pub struct OverhaulApi {
    overhaul_repo: Arc<OverhaulRepository>,
    component_repo: Arc<ComponentRepository>,
    config: Arc<ConfigManager>,
}

impl OverhaulApi {
    pub fn new(
        overhaul_repo: Arc<OverhaulRepository>,
        component_repo: Arc<ComponentRepository>,
        config: Arc<ConfigManager>,
    ) -> Self {
        Self {
            overhaul_repo,
            component_repo,
            config,
        }
    }

    /// 按当前配置构造分级引擎
    pub fn health_engine(&self) -> ApiResult<OverhaulHealthEngine> {
        let settings = self.config.ledger_settings().map_err(config_error)?;
        Ok(OverhaulHealthEngine::new(settings.health_thresholds()))
    }

    /// 记录一次 OH
    ///
    /// # 参数
    /// - component_code: 平衡轮编码
    /// - request: 序号 / 日期 / 运行小时 / 备注
    /// - user: 记录人
    ///
    /// # 返回
    /// - Ok(OverhaulRecord): 新记录（含 backlog、年份、星期与快照）
    /// - Err(DuplicateSequence): 该平衡轮已有相同序号
    /// - Err(NotFound): 平衡轮不存在
    /// - Err(InvalidInput): 序号 <= 0 或运行小时为负
    pub fn record_overhaul(
        &self,
        component_code: &str,
        request: NewOverhaul,
        user: &str,
    ) -> ApiResult<OverhaulRecord> {
        let code = require_component_code(component_code)?;
        let user = require_text(user, "记录人")?;
        if request.sequence_number <= 0 {
            return Err(ApiError::InvalidInput(format!(
                "OH 序号必须为正整数: {}",
                request.sequence_number
            )));
        }
        if let Some(hours) = request.operating_hours {
            if hours < 0 {
                return Err(ApiError::InvalidInput(format!("运行小时不能为负: {}", hours)));
            }
        }

        let engine = self.health_engine()?;
        let now = now_timestamp();
        let result = self
            .overhaul_repo
            .append_with(&code, request.sequence_number, |view| {
                engine.build_record(view, &request, &user, now)
            });

        match result {
            Ok(record) => {
                tracing::info!(
                    component_code = %record.component_code,
                    sequence_number = record.sequence_number,
                    operating_hours = ?record.operating_hours,
                    backlog = ?record.backlog,
                    "OH 已记录"
                );
                Ok(record)
            }
            Err(e @ RepositoryError::DuplicateSequence { .. }) => {
                tracing::warn!(component_code = %code, sequence_number = request.sequence_number, "OH 序号重复，拒绝写入");
                Err(e.into())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// 当前健康等级（按序号最大的 OH 记录）
    pub fn health_tier(&self, component_code: &str) -> ApiResult<HealthTier> {
        let code = self.ensure_component(component_code)?;
        let latest = self.overhaul_repo.find_latest(&code)?;
        Ok(self.health_engine()?.classify(latest.as_ref()))
    }

    /// 最近 N 条 backlog（N 由配置给出，上限 4），序号升序
    pub fn latest_backlog_series(&self, component_code: &str) -> ApiResult<Vec<BacklogPoint>> {
        let code = self.ensure_component(component_code)?;
        let limit = self.config.series_limit().map_err(config_error)?;
        let records = self.overhaul_repo.list_latest(&code, limit)?;
        Ok(records.iter().map(BacklogPoint::from).collect())
    }

    /// 建议的下一个序号（最大序号 + 1）
    pub fn next_sequence_number(&self, component_code: &str) -> ApiResult<i64> {
        let code = self.ensure_component(component_code)?;
        Ok(self.overhaul_repo.max_sequence(&code)?.unwrap_or(0) + 1)
    }

    pub fn list_overhauls(&self, component_code: &str) -> ApiResult<Vec<OverhaulRecord>> {
        let code = self.ensure_component(component_code)?;
        Ok(self.overhaul_repo.list_by_component(&code)?)
    }

    /// 全部平衡轮及其最新 OH 与等级（线路、塔号、方向序）
    pub fn rated_components(
        &self,
        direction: Option<Direction>,
        line_id: Option<i64>,
    ) -> ApiResult<Vec<RatedComponent>> {
        let views = self.component_repo.list_views(direction, line_id)?;
        self.rate(views)
    }

    /// 为给定平衡轮视图附加最新 OH 与等级
    pub fn rate(&self, views: Vec<ComponentView>) -> ApiResult<Vec<RatedComponent>> {
        let engine = self.health_engine()?;
        let mut latest = self.overhaul_repo.latest_by_component()?;
        Ok(views
            .into_iter()
            .map(|view| {
                let record = latest.remove(&view.component.code);
                let tier = engine.classify(record.as_ref());
                RatedComponent {
                    view,
                    latest: record,
                    tier,
                }
            })
            .collect())
    }

    pub fn aggregate_by_tower(&self, line_id: Option<i64>) -> ApiResult<Vec<TierAggregate>> {
        Ok(aggregate_by_tower(&self.rated_components(None, line_id)?))
    }

    pub fn aggregate_by_line(&self) -> ApiResult<Vec<TierAggregate>> {
        Ok(aggregate_by_line(&self.rated_components(None, None)?))
    }

    pub fn aggregate_global(&self) -> ApiResult<GlobalHealthSummary> {
        let (counts, percentages) = aggregate_global(&self.rated_components(None, None)?);
        Ok(GlobalHealthSummary {
            total_components: counts.total(),
            total_with_data: counts.total_with_data(),
            counts,
            percentages,
        })
    }

    fn ensure_component(&self, component_code: &str) -> ApiResult<String> {
        let code = require_component_code(component_code)?;
        if self.component_repo.find(&code)?.is_none() {
            return Err(ApiError::NotFound(format!("平衡轮 {} 不存在", code)));
        }
        Ok(code)
    }
}
