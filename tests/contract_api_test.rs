// ==========================================
// 合同展示 API 集成测试
// ==========================================
// 职责: 验证合同状态派生与罚金合计的展示组装
// ==========================================


#[cfg(test)]
mod contract_api_test {
    use chrono::NaiveDate;
    use equip_rental::api::{ContractApi, ReservationApi, RestitutionApi};
    use equip_rental::config::ConfigManager;
    use equip_rental::domain::types::ContractStatus;
    use equip_rental::engine::{PricingEngine, RiskEngine};
    use equip_rental::repository::ContractRepository;
    use rusqlite::Connection;
    use rust_decimal_macros::dec;
    use std::sync::Arc;
    use tempfile::NamedTempFile;

    use crate::test_helpers::{create_test_db, insert_client, insert_unit};

    // ==========================================
    // 测试辅助函数
    // ==========================================

    fn setup_test_env() -> (NamedTempFile, String, i64, Vec<i64>) {
        let (temp_file, db_path) = create_test_db().unwrap();
        let conn = Connection::open(&db_path).unwrap();

        let client_id = insert_client(&conn, "伟", "王", "wang@test.cn", None).unwrap();
        let mut unit_ids = Vec::new();
        for i in 1..=3 {
            unit_ids
                .push(insert_unit(&conn, &format!("SN-{:03}", i), "100.00", "AVAILABLE").unwrap());
        }

        (temp_file, db_path, client_id, unit_ids)
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

    fn contract_api(db_path: &str) -> ContractApi {
        ContractApi::new(Arc::new(ContractRepository::new(db_path).unwrap()))
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    // ==========================================
    // 测试1: 状态派生三分支
    // ==========================================

    #[test]
    fn test_contract_summaries_status_branches() {
        let (_temp_file, db_path, client_id, unit_ids) = setup_test_env();
        let reserve = reservation_api(&db_path);
        let restitute = restitution_api(&db_path);

        // 合同1: 应还 2024-01-10,全部逾期归还 → Completed
        let (c1, _, _) = reserve
            .reserve(client_id, &[unit_ids[0]], d(2024, 1, 1), d(2024, 1, 10))
            .unwrap();
        let contract_repo = ContractRepository::new(&db_path).unwrap();
        let c1_lines: Vec<i64> = contract_repo
            .find_lines_by_contract(c1.contract_id)
            .unwrap()
            .iter()
            .map(|l| l.line_id)
            .collect();
        restitute.restitute(&c1_lines, d(2024, 1, 13)).unwrap();

        // 合同2: 应还 2024-2-10,未归还 → 基准日 2024-3-1 时为 Overdue
        let (c2, _, _) = reserve
            .reserve(client_id, &[unit_ids[1]], d(2024, 2, 1), d(2024, 2, 10))
            .unwrap();

        // 合同3: 应还 2024-3-10,未归还 → 基准日 2024-3-1 时为 InProgress
        let (c3, _, _) = reserve
            .reserve(client_id, &[unit_ids[2]], d(2024, 3, 1), d(2024, 3, 10))
            .unwrap();

        let api = contract_api(&db_path);
        let summaries = api.list_contract_summaries(d(2024, 3, 1)).unwrap();

        // 最新合同在前
        assert_eq!(summaries.len(), 3);
        assert_eq!(summaries[0].contract.contract_id, c3.contract_id);
        assert_eq!(summaries[0].status, ContractStatus::InProgress);
        assert_eq!(summaries[0].open_line_count, 1);

        assert_eq!(summaries[1].contract.contract_id, c2.contract_id);
        assert_eq!(summaries[1].status, ContractStatus::Overdue);

        assert_eq!(summaries[2].contract.contract_id, c1.contract_id);
        assert_eq!(summaries[2].status, ContractStatus::Completed);
        assert_eq!(summaries[2].open_line_count, 0);
        // 逾期 3 天 × 5.00
        assert_eq!(summaries[2].total_penalties, dec!(15.00));

        println!("✅ 合同状态派生测试通过");
    }

    // ==========================================
    // 测试2: 罚金合计(部分归还)
    // ==========================================

    #[test]
    fn test_contract_summary_penalty_totals() {
        let (_temp_file, db_path, client_id, unit_ids) = setup_test_env();
        let reserve = reservation_api(&db_path);
        let restitute = restitution_api(&db_path);

        // 一份两行合同,先逾期归还其中一行
        let (contract, _, _) = reserve
            .reserve(
                client_id,
                &[unit_ids[0], unit_ids[1]],
                d(2024, 1, 1),
                d(2024, 1, 10),
            )
            .unwrap();

        let contract_repo = ContractRepository::new(&db_path).unwrap();
        let line_ids: Vec<i64> = contract_repo
            .find_lines_by_contract(contract.contract_id)
            .unwrap()
            .iter()
            .map(|l| l.line_id)
            .collect();
        restitute.restitute(&line_ids[..1], d(2024, 1, 12)).unwrap();

        let api = contract_api(&db_path);
        let summaries = api.list_contract_summaries(d(2024, 1, 12)).unwrap();

        assert_eq!(summaries.len(), 1);
        // 未归还行的罚金按 0 计,只合计已写入的 10.00
        assert_eq!(summaries[0].total_penalties, dec!(10.00));
        assert_eq!(summaries[0].open_line_count, 1);
        assert_eq!(summaries[0].status, ContractStatus::Overdue);
    }
}
