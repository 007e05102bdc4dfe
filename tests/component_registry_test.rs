// ==========================================
// 目录与平衡轮集成测试
// ==========================================
// 测试范围:
// 1. 线路 / 区段 / 塔 / 型号登记规则
// 2. 安装（槽位占用、编码唯一、默认周期）与编码推算
// 3. 迁移、更新、退役级联、详情
// ==========================================

mod helpers;
mod test_helpers;

use balancin_inventory::api::{ApiError, InstallComponentRequest};
use balancin_inventory::config::config_keys;
use balancin_inventory::domain::component::lifecycle;
use balancin_inventory::domain::types::{ComponentCategory, Direction, HealthTier};
use helpers::api_test_helper::*;

// ==========================================
// 基础目录
// ==========================================

#[test]
fn test_tower_registration_rules() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let line_id = env.ensure_line("L1");
    let section_id = env.ensure_section("S1");

    env.catalog_api
        .create_tower(line_id, section_id, "10", Some("16N"), Some("8N"), None)
        .unwrap();
    assert!(matches!(
        env.catalog_api
            .create_tower(line_id, section_id, "10", None, None, None),
        Err(ApiError::InvalidInput(_))
    ));
    assert!(matches!(
        env.catalog_api.create_tower(999, section_id, "11", None, None, None),
        Err(ApiError::NotFound(_))
    ));

    env.catalog_api
        .create_tower(line_id, section_id, "2", None, None, None)
        .unwrap();
    env.catalog_api
        .create_tower(line_id, section_id, "10A", None, None, None)
        .unwrap();
    let numbers: Vec<String> = env
        .catalog_api
        .list_towers(Some(line_id))
        .unwrap()
        .into_iter()
        .map(|t| t.tower.tower_number)
        .collect();
    assert_eq!(numbers, vec!["2", "10", "10A"]);

    let resolved = env.catalog_api.resolve_tower(line_id, "10", None).unwrap();
    assert_eq!(resolved.line_name, "L1");
    assert_eq!(
        env.catalog_api
            .type_for_slot(resolved.tower.tower_id, Direction::Descending)
            .unwrap()
            .as_deref(),
        Some("8N")
    );
}

#[test]
fn test_component_type_catalog() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    env.catalog_api
        .create_component_type("8N", ComponentCategory::Support, 20)
        .unwrap();
    env.catalog_api
        .create_component_type("16N", ComponentCategory::Compression, 12)
        .unwrap();
    assert!(matches!(
        env.catalog_api
            .create_component_type("16N", ComponentCategory::Compression, 1),
        Err(ApiError::DuplicateItem(_))
    ));

    let codes: Vec<String> = env
        .catalog_api
        .list_component_types()
        .unwrap()
        .into_iter()
        .map(|t| t.code)
        .collect();
    assert_eq!(codes, vec!["16N", "8N"]);

    let summary = env.catalog_api.type_summary().unwrap();
    assert_eq!(summary.total_types, 2);
    assert_eq!(summary.total_quantity, 32);
    assert_eq!(summary.compression_quantity, 12);
    assert_eq!(summary.support_quantity, 20);

    let tower_id = env.add_tower("L1", "1", "16N", "16N");
    env.install("BAL-16N-001", tower_id, Direction::Ascending, 30_000);
    env.install("BAL-16N-002", tower_id, Direction::Descending, 30_000);
    assert_eq!(env.catalog_api.installed_count("16N").unwrap(), 2);
    assert_eq!(env.catalog_api.installed_count("8N").unwrap(), 0);
}

// ==========================================
// 安装与编码
// ==========================================

#[test]
fn test_install_slot_and_code_rules() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let tower_id = env.add_tower("L1", "3", "16N", "8N");
    env.install("BAL-16N-001", tower_id, Direction::Ascending, 30_000);

    let request = |code: &str, direction| InstallComponentRequest {
        code: code.to_string(),
        tower_id,
        direction,
        interval_hours: None,
        notes: None,
    };

    assert!(matches!(
        env.component_api
            .install_component(request("BAL-16N-002", Direction::Ascending), TEST_USER),
        Err(ApiError::SlotOccupied(_))
    ));
    assert!(matches!(
        env.component_api
            .install_component(request("bal-16n-001", Direction::Descending), TEST_USER),
        Err(ApiError::DuplicateItem(_))
    ));
    assert!(matches!(
        env.component_api
            .install_component(request("  ", Direction::Descending), TEST_USER),
        Err(ApiError::InvalidInput(_))
    ));

    let mut bad_interval = request("BAL-8N-001", Direction::Descending);
    bad_interval.interval_hours = Some(0);
    assert!(matches!(
        env.component_api.install_component(bad_interval, TEST_USER),
        Err(ApiError::InvalidInput(_))
    ));

    env.config
        .set_global_config_value(config_keys::DEFAULT_INTERVAL_HOURS, "25000")
        .unwrap();
    let view = env
        .component_api
        .install_component(request("BAL-8N-001", Direction::Descending), TEST_USER)
        .unwrap();
    assert_eq!(view.component.interval_hours, 25_000);
    assert_eq!(view.type_code.as_deref(), Some("8N"));
}

#[test]
fn test_next_component_code() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let first = env.component_api.next_component_code("16n").unwrap();
    assert_eq!(first.last_code, None);
    assert_eq!(first.next_code, "BAL-16N-001");

    let t1 = env.add_tower("L1", "1", "16N", "16N");
    let t2 = env.add_tower("L1", "2", "16N", "16N");
    env.install("BAL-16N-001", t1, Direction::Ascending, 30_000);
    env.install("BAL-16N-009", t1, Direction::Descending, 30_000);
    env.install("BAL-16N-SPARE", t2, Direction::Ascending, 30_000);

    let next = env.component_api.next_component_code("16N").unwrap();
    assert_eq!(next.last_code.as_deref(), Some("BAL-16N-009"));
    assert_eq!(next.next_code, "BAL-16N-010");
}

// ==========================================
// 变更与详情
// ==========================================

#[test]
fn test_relocate_update_and_detail() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let t1 = env.add_tower("L1", "1", "16N", "8N");
    let t2 = env.add_tower("L1", "2", "16N", "8N");
    env.install("BAL-16N-001", t1, Direction::Ascending, 30_000);
    env.install("BAL-16N-002", t2, Direction::Ascending, 30_000);

    assert!(matches!(
        env.component_api
            .relocate_component("BAL-16N-001", t2, Direction::Ascending, TEST_USER),
        Err(ApiError::SlotOccupied(_))
    ));
    let moved = env
        .component_api
        .relocate_component("BAL-16N-001", t2, Direction::Descending, TEST_USER)
        .unwrap();
    assert_eq!(moved.tower.tower.tower_number, "2");
    assert_eq!(moved.type_code.as_deref(), Some("8N"));

    env.component_api
        .update_component("BAL-16N-001", Some(20_000), Some("cambio de eje"), TEST_USER)
        .unwrap();
    for seq in 1..=6 {
        env.record("BAL-16N-001", seq, Some(seq * 3_000)).unwrap();
    }

    let detail = env.component_api.component_detail("BAL-16N-001").unwrap();
    assert_eq!(detail.view.component.notes.as_deref(), Some("cambio de eje"));
    let actions: Vec<&str> = detail
        .status_history
        .iter()
        .map(|h| h.action.as_str())
        .collect();
    assert_eq!(
        actions,
        vec![
            lifecycle::ACTION_UPDATE,
            lifecycle::ACTION_RELOCATE,
            lifecycle::ACTION_INSTALL
        ]
    );
    let seqs: Vec<i64> = detail
        .recent_overhauls
        .iter()
        .map(|r| r.sequence_number)
        .collect();
    assert_eq!(seqs, vec![6, 5, 4, 3, 2]);
    // 20000 - 18000 = 2000
    assert_eq!(detail.latest_backlog, Some(2_000));
    assert_eq!(detail.tier, HealthTier::Alert);

    assert!(matches!(
        env.component_api.update_component("BAL-16N-001", Some(-1), None, TEST_USER),
        Err(ApiError::InvalidInput(_))
    ));
}

#[test]
fn test_decommission_cascades_history() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let tower_id = env.add_tower("L1", "1", "16N", "8N");
    env.install("BAL-16N-001", tower_id, Direction::Ascending, 30_000);
    env.record("BAL-16N-001", 1, Some(10_000)).unwrap();

    env.component_api
        .decommission_component("BAL-16N-001", TEST_USER)
        .unwrap();
    assert!(matches!(
        env.component_api.get_component("BAL-16N-001"),
        Err(ApiError::NotFound(_))
    ));
    assert!(matches!(
        env.component_api.decommission_component("BAL-16N-001", TEST_USER),
        Err(ApiError::NotFound(_))
    ));

    // 槽位释放后可重新安装同编码，OH 历史从零开始
    env.install("BAL-16N-001", tower_id, Direction::Ascending, 30_000);
    assert!(env.overhaul_api.list_overhauls("BAL-16N-001").unwrap().is_empty());
    assert_eq!(
        env.overhaul_api.health_tier("BAL-16N-001").unwrap(),
        HealthTier::NoData
    );
}

#[test]
fn test_component_code_resolves_in_any_case() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let t1 = env.add_tower("L1", "1", "16N", "8N");
    let t2 = env.add_tower("L1", "2", "16N", "8N");
    let view = env.install("bal-16n-001", t1, Direction::Ascending, 30_000);
    assert_eq!(view.component.code, "BAL-16N-001");

    // 以安装时的原样编码访问
    assert_eq!(
        env.overhaul_api.health_tier("bal-16n-001").unwrap(),
        HealthTier::NoData
    );
    let record = env.record(" bal-16n-001 ", 1, Some(28_000)).unwrap();
    assert_eq!(record.component_code, "BAL-16N-001");
    assert_eq!(env.overhaul_api.next_sequence_number("Bal-16N-001").unwrap(), 2);
    assert_eq!(env.overhaul_api.list_overhauls("bal-16n-001").unwrap().len(), 1);
    assert_eq!(
        env.overhaul_api.latest_backlog_series("bal-16n-001").unwrap().len(),
        1
    );

    env.component_api
        .update_component("bal-16n-001", Some(20_000), None, TEST_USER)
        .unwrap();
    env.component_api
        .relocate_component("bal-16n-001", t2, Direction::Ascending, TEST_USER)
        .unwrap();
    assert_eq!(
        env.component_api.get_component("bal-16n-001").unwrap().tower_number(),
        "2"
    );
    env.component_api
        .decommission_component("bal-16n-001", TEST_USER)
        .unwrap();
    assert!(matches!(
        env.component_api.get_component("BAL-16N-001"),
        Err(ApiError::NotFound(_))
    ));
}
