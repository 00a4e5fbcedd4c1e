// ==========================================
// 归还事务集成测试
// ==========================================
// 职责: 验证归还事务的罚金计算、批次原子性、幂等与状态释放
// ==========================================


#[cfg(test)]
mod restitution_api_test {
    use chrono::NaiveDate;
    use equip_rental::api::error::ApiError;
    use equip_rental::api::{ReservationApi, RestitutionApi};
    use equip_rental::config::ConfigManager;
    use equip_rental::domain::types::UnitStatus;
    use equip_rental::engine::{PricingEngine, RiskEngine};
    use equip_rental::repository::{ContractRepository, EquipmentRepository};
    use rusqlite::Connection;
    use rust_decimal_macros::dec;
    use std::sync::Arc;
    use tempfile::NamedTempFile;

    use crate::test_helpers::{create_test_db, insert_client, insert_penalty_rate, insert_unit};

    // ==========================================
    // 测试辅助函数
    // ==========================================

    /// 创建测试环境: 一个客户 + 两台已租设备(一份两行合同)
    ///
    /// # 返回
    /// - 临时库、路径、合同行 id 列表、设备 id 列表
    fn setup_rented_env() -> (NamedTempFile, String, Vec<i64>, Vec<i64>) {
        let (temp_file, db_path) = create_test_db().unwrap();
        let conn = Connection::open(&db_path).unwrap();

        let client_id = insert_client(&conn, "伟", "王", "wang@test.cn", None).unwrap();
        let u1 = insert_unit(&conn, "SN-001", "100.00", "AVAILABLE").unwrap();
        let u2 = insert_unit(&conn, "SN-002", "100.00", "AVAILABLE").unwrap();

        // 应还日期 2024-01-10
        let api = reservation_api(&db_path);
        let (contract, _, _) = api
            .reserve(client_id, &[u1, u2], d(2024, 1, 1), d(2024, 1, 10))
            .unwrap();

        let contract_repo = ContractRepository::new(&db_path).unwrap();
        let line_ids: Vec<i64> = contract_repo
            .find_lines_by_contract(contract.contract_id)
            .unwrap()
            .iter()
            .map(|l| l.line_id)
            .collect();

        (temp_file, db_path, line_ids, vec![u1, u2])
    }

    fn reservation_api(db_path: &str) -> ReservationApi {
        ReservationApi::new(
            db_path,
            Arc::new(PricingEngine::new()),
            Arc::new(RiskEngine::new()),
        )
        .unwrap()
    }

    fn restitution_api(db_path: &str) -> RestitutionApi {
        RestitutionApi::new(db_path, Arc::new(ConfigManager::new(db_path).unwrap())).unwrap()
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    // ==========================================
    // 测试1: 按期归还
    // ==========================================

    #[test]
    fn test_restitute_on_time() {
        let (_temp_file, db_path, line_ids, unit_ids) = setup_rented_env();

        let api = restitution_api(&db_path);
        let updated = api.restitute(&line_ids, d(2024, 1, 10)).unwrap();

        assert_eq!(updated.len(), 2);
        for line in &updated {
            assert_eq!(line.actual_return_date, Some(d(2024, 1, 10)));
            assert_eq!(line.late_days, Some(0));
            assert_eq!(line.penalty_amount, Some(dec!(0.00)));
        }

        // 设备释放回 AVAILABLE
        let equipment_repo = EquipmentRepository::new(&db_path).unwrap();
        for id in unit_ids {
            assert_eq!(
                equipment_repo.find_by_id(id).unwrap().unwrap().status,
                UnitStatus::Available
            );
        }

        println!("✅ 按期归还测试通过");
    }

    // ==========================================
    // 测试2: 逾期罚金
    // ==========================================

    #[test]
    fn test_restitute_late_penalty() {
        let (_temp_file, db_path, line_ids, _unit_ids) = setup_rented_env();

        // 应还 2024-01-10,实还 2024-01-13 → 逾期 3 天 × 5.00 = 15.00
        let api = restitution_api(&db_path);
        let updated = api.restitute(&line_ids[..1], d(2024, 1, 13)).unwrap();

        assert_eq!(updated[0].late_days, Some(3));
        assert_eq!(updated[0].penalty_amount, Some(dec!(15.00)));

        // 落库值与返回值一致
        let contract_repo = ContractRepository::new(&db_path).unwrap();
        let stored = contract_repo
            .find_lines_by_contract(updated[0].contract_id)
            .unwrap();
        let stored_line = stored.iter().find(|l| l.line_id == updated[0].line_id).unwrap();
        assert_eq!(stored_line.penalty_amount, Some(dec!(15.00)));
        assert_eq!(stored_line.late_days, Some(3));
    }

    #[test]
    fn test_restitute_early_return_no_penalty() {
        let (_temp_file, db_path, line_ids, _unit_ids) = setup_rented_env();

        // 提前归还不产生负罚金
        let api = restitution_api(&db_path);
        let updated = api.restitute(&line_ids, d(2024, 1, 5)).unwrap();

        for line in &updated {
            assert_eq!(line.late_days, Some(0));
            assert_eq!(line.penalty_amount, Some(dec!(0.00)));
        }
    }

    // ==========================================
    // 测试3: 批次原子性与幂等
    // ==========================================

    #[test]
    fn test_restitute_already_returned_conflict_batch_untouched() {
        let (_temp_file, db_path, line_ids, unit_ids) = setup_rented_env();
        let api = restitution_api(&db_path);

        // 先归还第一行
        api.restitute(&line_ids[..1], d(2024, 1, 10)).unwrap();

        // 整批(含已归还行)再归还 → 整批失败
        let result = api.restitute(&line_ids, d(2024, 1, 12));
        match result {
            Err(ApiError::Conflict { reason, ids }) => {
                assert!(reason.contains("已归还"));
                assert_eq!(ids, vec![line_ids[0]]);
            }
            other => panic!("应为 Conflict,实际: {:?}", other.map(|_| ())),
        }

        // 第二行不被触及: 仍未归还,其设备仍为 RENTED
        let contract_repo = ContractRepository::new(&db_path).unwrap();
        let open = contract_repo.list_open_lines().unwrap();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].line_id, line_ids[1]);

        let equipment_repo = EquipmentRepository::new(&db_path).unwrap();
        assert_eq!(
            equipment_repo.find_by_id(unit_ids[1]).unwrap().unwrap().status,
            UnitStatus::Rented
        );

        println!("✅ 批次原子性测试通过");
    }

    #[test]
    fn test_restitute_twice_second_fails_no_side_effects() {
        let (_temp_file, db_path, line_ids, _unit_ids) = setup_rented_env();
        let api = restitution_api(&db_path);

        api.restitute(&line_ids, d(2024, 1, 13)).unwrap();

        // 同一批次第二次归还必然失败
        let result = api.restitute(&line_ids, d(2024, 1, 20));
        assert!(matches!(result, Err(ApiError::Conflict { .. })));

        // 归还事实不被第二次调用改写
        let contract_repo = ContractRepository::new(&db_path).unwrap();
        let lines = contract_repo.find_lines_by_contract(1).unwrap();
        for line in &lines {
            assert_eq!(line.actual_return_date, Some(d(2024, 1, 13)));
            assert_eq!(line.late_days, Some(3));
            assert_eq!(line.penalty_amount, Some(dec!(15.00)));
        }

        println!("✅ 幂等测试通过");
    }

    // ==========================================
    // 测试4: 校验与缺失资源
    // ==========================================

    #[test]
    fn test_restitute_empty_lines_fails_validation() {
        let (_temp_file, db_path, _line_ids, _unit_ids) = setup_rented_env();
        let api = restitution_api(&db_path);

        let result = api.restitute(&[], d(2024, 1, 10));
        match result {
            Err(ApiError::ValidationError(msg)) => assert!(msg.contains("未选择")),
            other => panic!("应为 ValidationError,实际: {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_restitute_unknown_line_not_found() {
        let (_temp_file, db_path, line_ids, unit_ids) = setup_rented_env();
        let api = restitution_api(&db_path);

        let result = api.restitute(&[line_ids[0], 888], d(2024, 1, 10));
        match result {
            Err(ApiError::NotFound { entity, ids }) => {
                assert_eq!(entity, "ContractLine");
                assert_eq!(ids, vec![888]);
            }
            other => panic!("应为 NotFound,实际: {:?}", other.map(|_| ())),
        }

        // 存在的那一行不被触及
        let equipment_repo = EquipmentRepository::new(&db_path).unwrap();
        assert_eq!(
            equipment_repo.find_by_id(unit_ids[0]).unwrap().unwrap().status,
            UnitStatus::Rented
        );
    }

    // ==========================================
    // 测试5: 日罚金配置覆写
    // ==========================================

    #[test]
    fn test_restitute_penalty_rate_override() {
        let (_temp_file, db_path, line_ids, _unit_ids) = setup_rented_env();

        // 覆写日罚金 5.00 → 7.50
        let conn = Connection::open(&db_path).unwrap();
        insert_penalty_rate(&conn, "7.50").unwrap();

        // 逾期 3 天 × 7.50 = 22.50
        let api = restitution_api(&db_path);
        let updated = api.restitute(&line_ids[..1], d(2024, 1, 13)).unwrap();

        assert_eq!(updated[0].penalty_amount, Some(dec!(22.50)));
    }

    // ==========================================
    // 测试6: 未归还行查询
    // ==========================================

    #[test]
    fn test_list_open_lines() {
        let (_temp_file, db_path, line_ids, _unit_ids) = setup_rented_env();
        let api = restitution_api(&db_path);

        assert_eq!(api.list_open_lines().unwrap().len(), 2);

        api.restitute(&line_ids[..1], d(2024, 1, 10)).unwrap();

        let open = api.list_open_lines().unwrap();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].line_id, line_ids[1]);
    }
}
