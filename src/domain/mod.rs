// ==========================================
// 设备租赁管理系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体与状态类型
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod client;
pub mod contract;
pub mod equipment;
pub mod types;

// 重导出核心类型
pub use client::Client;
pub use contract::{Contract, ContractLine, ContractSummary};
pub use equipment::EquipmentUnit;
pub use types::{ContractStatus, UnitStatus};
