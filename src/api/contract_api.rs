// ==========================================
// 设备租赁管理系统 - 合同 API
// ==========================================
// 职责: 合同列表的只读展示组装(状态派生、罚金合计)
// 红线: 只读,不参与预约/归还事务;读到的是最终一致视图
// ==========================================

use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::api::error::ApiResult;
use crate::domain::contract::{ContractLine, ContractSummary};
use crate::domain::types::ContractStatus;
use crate::repository::contract_repo::ContractRepository;

// ==========================================
// ContractApi - 合同展示 API
// ==========================================

/// 合同API
///
/// 职责：
/// 1. 合同列表查询(含行)
/// 2. 展示状态派生(进行中/逾期中/已完结)
/// 3. 未归还行数与累计罚金统计
pub struct ContractApi {
    contract_repo: Arc<ContractRepository>,
}

impl ContractApi {
    /// 创建新的 ContractApi 实例
    pub fn new(contract_repo: Arc<ContractRepository>) -> Self {
        Self { contract_repo }
    }

    /// 查询合同列表展示结构(最新合同在前)
    ///
    /// # 参数
    /// - today: 判定逾期用的基准日期(由调用方注入,便于测试)
    pub fn list_contract_summaries(&self, today: NaiveDate) -> ApiResult<Vec<ContractSummary>> {
        let contracts = self.contract_repo.list_all()?;

        let mut summaries = Vec::with_capacity(contracts.len());
        for contract in contracts {
            let lines = self.contract_repo.find_lines_by_contract(contract.contract_id)?;

            let status = Self::derive_status(&lines, today);
            let open_line_count = lines.iter().filter(|l| l.is_open()).count();
            let total_penalties: Decimal = lines
                .iter()
                .filter_map(|l| l.penalty_amount)
                .sum();

            summaries.push(ContractSummary {
                contract,
                status,
                open_line_count,
                total_penalties,
            });
        }

        Ok(summaries)
    }

    /// 派生合同展示状态
    ///
    /// - Completed : 所有行均已归还
    /// - Overdue   : 存在未归还行且应还日期早于基准日
    /// - InProgress: 存在未归还行但尚未逾期
    pub fn derive_status(lines: &[ContractLine], today: NaiveDate) -> ContractStatus {
        let open: Vec<&ContractLine> = lines.iter().filter(|l| l.is_open()).collect();

        if open.is_empty() {
            return ContractStatus::Completed;
        }

        if open.iter().any(|l| l.planned_return_date < today) {
            return ContractStatus::Overdue;
        }

        ContractStatus::InProgress
    }
}
