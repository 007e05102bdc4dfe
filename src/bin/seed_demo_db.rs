// ==========================================
// 平衡轮库存系统 - 演示库重建
// ==========================================
// 用法: seed_demo_db [db_path]
// 旧库先备份为 <db_path>.bak，再经 API 层写入一套演示数据
// ==========================================

use chrono::NaiveDate;
use std::error::Error;
use std::fs;
use std::path::Path;

use balancin_inventory::api::InstallComponentRequest;
use balancin_inventory::app::{get_default_db_path, AppState};
use balancin_inventory::domain::overhaul::NewOverhaul;
use balancin_inventory::domain::types::{ComponentCategory, Direction};
use balancin_inventory::{i18n, logging};

const SEED_USER: &str = "seed";

fn main() -> Result<(), Box<dyn Error>> {
    logging::init();
    let locale = i18n::init_from_env();
    tracing::info!(locale, "界面语言");

    let db_path = std::env::args().nth(1).unwrap_or_else(get_default_db_path);
    backup_and_reset_db(&db_path)?;

    let state = AppState::new(db_path.clone())?;
    seed_catalog_and_components(&state)?;
    seed_spares(&state)?;

    let summary = state.overhaul_api.aggregate_global()?;
    println!("seeded {}", db_path);
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn backup_and_reset_db(db_path: &str) -> Result<(), Box<dyn Error>> {
    let path = Path::new(db_path);
    if path.exists() {
        let backup = format!("{}.bak", db_path);
        fs::copy(path, &backup)?;
        fs::remove_file(path)?;
        println!("backup: {}", backup);
    }
    Ok(())
}

fn seed_catalog_and_components(state: &AppState) -> Result<(), Box<dyn Error>> {
    let catalog = &state.catalog_api;
    for (code, category, quantity) in [
        ("16N", ComponentCategory::Compression, 12),
        ("8N", ComponentCategory::Support, 20),
        ("4N/4N", ComponentCategory::Combined, 6),
    ] {
        catalog.create_component_type(code, category, quantity)?;
    }

    let section = catalog.create_section("S1")?;
    // (线路, 塔号, 上行型号, 下行型号, [上行运行小时...])
    let layout: [(&str, &str, &str, &str, &[i64]); 4] = [
        ("L1", "2", "16N", "8N", &[12_000, 24_000]),
        ("L1", "10", "16N", "8N", &[28_000]),
        ("L2", "1", "8N", "4N/4N", &[31_000]),
        ("L2", "3A", "8N", "8N", &[]),
    ];

    let mut lines = std::collections::HashMap::new();
    for (line_name, tower_number, asc_type, desc_type, hours) in layout {
        let line_id = match lines.get(line_name) {
            Some(id) => *id,
            None => {
                let line = catalog.create_line(line_name, None)?;
                lines.insert(line_name, line.line_id);
                line.line_id
            }
        };
        let tower = catalog.create_tower(
            line_id,
            section.section_id,
            tower_number,
            Some(asc_type),
            Some(desc_type),
            None,
        )?;

        for (direction, type_code) in [(Direction::Ascending, asc_type), (Direction::Descending, desc_type)] {
            let prefix = type_code.replace('/', "");
            let code = state.component_api.next_component_code(&prefix)?.next_code;
            state.component_api.install_component(
                InstallComponentRequest {
                    code: code.clone(),
                    tower_id: tower.tower_id,
                    direction,
                    interval_hours: None,
                    notes: None,
                },
                SEED_USER,
            )?;

            if direction != Direction::Ascending {
                continue;
            }
            for (i, operating_hours) in hours.iter().enumerate() {
                let sequence_number = i as i64 + 1;
                let overhaul_date = NaiveDate::from_ymd_opt(2023 + i as i32, 5, 6)
                    .ok_or("invalid seed date")?;
                state.overhaul_api.record_overhaul(
                    &code,
                    NewOverhaul {
                        sequence_number,
                        overhaul_date,
                        operating_hours: Some(*operating_hours),
                        notes: None,
                    },
                    SEED_USER,
                )?;
            }
        }
    }
    Ok(())
}

fn seed_spares(state: &AppState) -> Result<(), Box<dyn Error>> {
    let spares = &state.component_spares;
    spares.create_item("POLEA-16N", "Polea 16N", 10, Some("Bodega A"), None, Some(SEED_USER))?;
    spares.create_item("EJE-8N", "Eje 8N", 3, Some("Bodega A"), None, Some(SEED_USER))?;
    spares.create_item("RODAMIENTO-6205", "Rodamiento 6205", 0, Some("Bodega B"), None, Some(SEED_USER))?;
    spares.stock_exit("POLEA-16N", 4, Some("OH L1 T2"), Some(SEED_USER))?;

    let general = &state.general_spares;
    general.create_item("GRASA-EP2", "Grasa EP2", 24, Some("Bodega C"), None, Some(SEED_USER))?;
    general.create_item("PERNO-M16", "Perno M16", 2, None, None, Some(SEED_USER))?;
    general.stock_entry("PERNO-M16", 8, Some("Compra"), Some(SEED_USER))?;
    Ok(())
}
