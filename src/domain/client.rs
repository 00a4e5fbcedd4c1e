// ==========================================
// 设备租赁管理系统 - 客户领域模型
// ==========================================
// 红线: 客户数据由外部维护,核心只读
// 对齐: client 表
// ==========================================

use serde::{Deserialize, Serialize};

// ==========================================
// Client - 客户
// ==========================================
// 用途: 预约事务读取 vip 标记,风险判定读取历史合同
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Client {
    // ===== 主键 =====
    pub client_id: i64,

    // ===== 基础信息 =====
    pub first_name: String,
    pub last_name: String,
    pub address: String,
    pub postal_code: String,
    pub phone: String,
    pub email: String, // 唯一约束

    // ===== 定价标记 =====
    // 三态: NULL=未评定 / 0=普通 / 1=VIP,定价时未评定按普通处理
    pub vip: Option<bool>,
}

impl Client {
    /// 是否按 VIP 定价（未评定视为普通客户）
    pub fn is_vip(&self) -> bool {
        self.vip.unwrap_or(false)
    }
}
