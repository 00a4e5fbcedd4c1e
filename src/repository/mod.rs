// ==========================================
// 设备租赁管理系统 - 数据仓储层
// ==========================================
// 职责: 提供数据访问接口,屏蔽数据库细节
// 红线: Repository 不含业务逻辑
// 约束: 所有查询使用参数化,防止 SQL 注入
// ==========================================
// 事务约定: 带 `_in` / `_for_update` / `insert` 后缀的关联函数在调用方
// 持有的事务内运行(预约/归还协调器以 BEGIN IMMEDIATE 开启),
// 使单个事务可以跨 client / equipment_unit / contract 多表
// ==========================================

pub mod client_repo;
pub mod contract_repo;
pub mod equipment_repo;
pub mod error;

// 重导出核心仓储
pub use client_repo::ClientRepository;
pub use contract_repo::ContractRepository;
pub use equipment_repo::EquipmentRepository;
pub use error::{RepositoryError, RepositoryResult};
