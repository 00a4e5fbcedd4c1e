// ==========================================
// 设备租赁管理系统 - 风险判定引擎
// ==========================================
// 职责: 由客户最近一份合同的归还记录判定风险标记
// 输入: 最近一份合同的全部合同行
// 输出: bool (true = 风险客户,定价时加价)
// 红线: 只看最近一单;更早合同的逾期历史不参与判定
// ==========================================

use crate::domain::contract::ContractLine;

// ==========================================
// RiskEngine - 风险判定引擎
// ==========================================
pub struct RiskEngine {
    // 无状态引擎,不需要注入依赖
    // Repository 操作由调用方处理
}

impl RiskEngine {
    /// 构造函数
    pub fn new() -> Self {
        Self {}
    }

    /// 判定客户是否为风险客户
    ///
    /// # 参数
    /// - latest_contract_lines: 客户最近一份合同(按 contract_id 降序取第一份)的
    ///   全部合同行;客户无历史合同时传空切片
    ///
    /// # 返回
    /// - true: 最近一单中任一行实际归还晚于应还日期
    /// - false: 无历史合同,或最近一单全部按期归还(含尚未归还的行)
    pub fn is_risky(&self, latest_contract_lines: &[ContractLine]) -> bool {
        latest_contract_lines.iter().any(|line| line.returned_late())
    }
}
