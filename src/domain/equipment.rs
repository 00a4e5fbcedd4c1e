// ==========================================
// 设备租赁管理系统 - 设备领域模型
// ==========================================
// 红线: status 列是在库事实的唯一口径,仅预约/归还事务可写
// 对齐: equipment_unit 表
// ==========================================

use crate::domain::types::UnitStatus;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// ==========================================
// EquipmentUnit - 设备台账
// ==========================================
// 不变式: status=RENTED 当且仅当存在 actual_return_date 为空的合同行引用该设备
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EquipmentUnit {
    // ===== 主键 =====
    pub unit_id: i64,

    // ===== 基础信息 =====
    pub serial_no: String, // 出厂序列号,唯一约束
    pub model_id: i64,     // 所属型号(型号目录由外部维护)

    // ===== 计价 =====
    pub daily_rate: Decimal, // 日租金,精确小数,库内 TEXT 存储

    // ===== 状态 =====
    pub status: UnitStatus,
}
