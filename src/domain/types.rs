// ==========================================
// 设备租赁管理系统 - 领域类型定义
// ==========================================
// 红线: 状态为封闭枚举,所有状态迁移点穷尽匹配
// 序列化格式: SCREAMING_SNAKE_CASE (与数据库一致)
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 设备状态 (Unit Status)
// ==========================================
// 状态迁移:
// - Available -> Rented   仅由预约事务执行
// - Rented -> Available   仅由归还事务执行
// - Maintenance / Scrapped 由外部维护流程写入,核心只读
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UnitStatus {
    Available,   // 在库可租
    Rented,      // 已租出
    Maintenance, // 维修中
    Scrapped,    // 已报废
}

impl fmt::Display for UnitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitStatus::Available => write!(f, "AVAILABLE"),
            UnitStatus::Rented => write!(f, "RENTED"),
            UnitStatus::Maintenance => write!(f, "MAINTENANCE"),
            UnitStatus::Scrapped => write!(f, "SCRAPPED"),
        }
    }
}

impl UnitStatus {
    /// 从字符串解析设备状态
    ///
    /// 状态列是预约/归还正确性的依据，未知值不做默认回退，由调用方转换为错误。
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "AVAILABLE" => Some(UnitStatus::Available),
            "RENTED" => Some(UnitStatus::Rented),
            "MAINTENANCE" => Some(UnitStatus::Maintenance),
            "SCRAPPED" => Some(UnitStatus::Scrapped),
            _ => None,
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            UnitStatus::Available => "AVAILABLE",
            UnitStatus::Rented => "RENTED",
            UnitStatus::Maintenance => "MAINTENANCE",
            UnitStatus::Scrapped => "SCRAPPED",
        }
    }
}

// ==========================================
// 合同展示状态 (Contract Status)
// ==========================================
// 由合同行派生,不落库:
// - Completed : 所有行均已归还
// - Overdue   : 存在未归还行且应还日期已过
// - InProgress: 存在未归还行但尚未逾期
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContractStatus {
    InProgress, // 进行中
    Overdue,    // 逾期中
    Completed,  // 已完结
}

impl fmt::Display for ContractStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContractStatus::InProgress => write!(f, "IN_PROGRESS"),
            ContractStatus::Overdue => write!(f, "OVERDUE"),
            ContractStatus::Completed => write!(f, "COMPLETED"),
        }
    }
}
