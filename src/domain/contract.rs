// ==========================================
// 设备租赁管理系统 - 合同领域模型
// ==========================================
// 对齐: contract / contract_line 表
// 红线: 合同一经预约事务创建即不再修改;
//       合同行的归还三字段一经归还事务写入即不再修改
// ==========================================

use crate::domain::types::ContractStatus;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// ==========================================
// Contract - 租赁合同
// ==========================================
// 用途: 预约事务一次性创建,核心其后只读
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contract {
    // ===== 主键 =====
    pub contract_id: i64, // 自增主键,风险判定按其降序取最近一单

    // ===== 关联 =====
    pub client_id: i64,

    // ===== 租期 =====
    pub start_date: NaiveDate,
    pub end_date: NaiveDate, // 含当日,时长 = end - start + 1 天

    // ===== 审计字段 =====
    pub created_at: DateTime<Utc>,
}

// ==========================================
// ContractLine - 合同行
// ==========================================
// 一行对应一台设备;归还以行为粒度
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractLine {
    // ===== 主键与关联 =====
    pub line_id: i64,
    pub contract_id: i64,
    pub unit_id: i64,

    // ===== 归还约定 =====
    pub planned_return_date: NaiveDate, // 创建时取合同 end_date,之后不变

    // ===== 归还事实(归还事务一次性写入) =====
    pub actual_return_date: Option<NaiveDate>,
    pub late_days: Option<i64>,          // max(0, actual - planned)
    pub penalty_amount: Option<Decimal>, // late_days × 日罚金,非负,与 actual 同生同灭
}

impl ContractLine {
    /// 该行是否尚未归还
    pub fn is_open(&self) -> bool {
        self.actual_return_date.is_none()
    }

    /// 该行是否构成逾期归还（已归还且实际晚于应还）
    pub fn returned_late(&self) -> bool {
        match self.actual_return_date {
            Some(actual) => actual > self.planned_return_date,
            None => false,
        }
    }
}

// ==========================================
// ContractSummary - 合同列表展示结构
// ==========================================
// 用途: 合同列表页(状态 + 未归还行数 + 累计罚金),由 ContractApi 组装
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractSummary {
    pub contract: Contract,
    pub status: ContractStatus,
    pub open_line_count: usize,
    pub total_penalties: Decimal, // 已计罚金合计,NULL 按 0 计
}
