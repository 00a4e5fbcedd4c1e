// ==========================================
// 设备租赁管理系统 - 归还 API
// ==========================================
// 职责: 租赁归还事务(加锁、逾期罚金计算、设备状态释放)
// 红线: 批次原子性——任一行已归还则整批失败,不做部分归还;
//       罚金用精确小数计算,不引入浮点漂移
// ==========================================

use std::sync::{Arc, Mutex};

use chrono::NaiveDate;
use rusqlite::{Connection, TransactionBehavior};
use rust_decimal::{Decimal, RoundingStrategy};
use tracing::{info, warn};

use crate::api::error::{ApiError, ApiResult};
use crate::config::config_manager::ConfigManager;
use crate::db::open_sqlite_connection;
use crate::domain::contract::ContractLine;
use crate::domain::types::UnitStatus;
use crate::repository::contract_repo::ContractRepository;
use crate::repository::equipment_repo::EquipmentRepository;
use crate::repository::error::RepositoryError;

// ==========================================
// RestitutionApi - 归还协调器
// ==========================================

/// 归还API
///
/// 职责：
/// 1. 加锁前的入参校验(选择集非空;归还日期由类型保证非空)
/// 2. BEGIN IMMEDIATE 写事务内锁定合同行与所涉设备
/// 3. 逾期天数与罚金计算(日罚金为具名配置项)
/// 4. 设备状态释放回 AVAILABLE
pub struct RestitutionApi {
    conn: Arc<Mutex<Connection>>,
    config_manager: Arc<ConfigManager>,
}

impl RestitutionApi {
    /// 创建新的 RestitutionApi 实例(独立连接)
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    /// - config_manager: 配置管理器(提供日罚金)
    pub fn new(db_path: &str, config_manager: Arc<ConfigManager>) -> ApiResult<Self> {
        let conn = open_sqlite_connection(db_path)
            .map_err(|e| ApiError::DatabaseError(e.to_string()))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            config_manager,
        })
    }

    /// 从已有连接创建实例
    pub fn from_connection(
        conn: Arc<Mutex<Connection>>,
        config_manager: Arc<ConfigManager>,
    ) -> Self {
        Self {
            conn,
            config_manager,
        }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> ApiResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| ApiError::from(RepositoryError::LockError(e.to_string())))
    }

    // ==========================================
    // 查询接口
    // ==========================================

    /// 查询所有未归还合同行(供归还表单使用)
    pub fn list_open_lines(&self) -> ApiResult<Vec<ContractLine>> {
        let conn = self.get_conn()?;
        Ok(ContractRepository::list_open_lines_in(&conn)?)
    }

    // ==========================================
    // 归还事务
    // ==========================================

    /// 归还一批合同行
    ///
    /// # 参数
    /// - line_ids: 合同行ID集合(非空,自动去重)
    /// - actual_return_date: 实际归还日期
    ///
    /// # 返回
    /// - Ok(Vec<ContractLine>): 已写入归还事实的合同行(按 line_id 升序)
    ///
    /// # 错误
    /// - `ApiError::ValidationError`: 选择集为空(加锁前检出)
    /// - `ApiError::NotFound`: 部分行ID不存在(携带缺失 id)
    /// - `ApiError::Conflict`: 部分行已归还(携带冲突 id,整批不动),
    ///   或锁等待超时;对同一批次重复调用第二次必然失败且无副作用
    pub fn restitute(
        &self,
        line_ids: &[i64],
        actual_return_date: NaiveDate,
    ) -> ApiResult<Vec<ContractLine>> {
        // ===== 加锁前校验 =====
        if line_ids.is_empty() {
            return Err(ApiError::ValidationError("未选择任何合同行".to_string()));
        }

        // 去重并升序排列,统一加锁顺序
        let mut ids = line_ids.to_vec();
        ids.sort_unstable();
        ids.dedup();

        // 日罚金: 单一具名配置项,缺省 5.00
        let penalty_rate = self
            .config_manager
            .penalty_rate_per_day()
            .map_err(|e| ApiError::InternalError(e.to_string()))?;

        // ===== 事务体 =====
        let mut conn = self.get_conn()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(RepositoryError::from)?;

        // 1. 锁定读取合同行(升序)
        let lines = ContractRepository::find_lines_for_update(&tx, &ids)?;

        // 2. 缺失 id 比对
        if lines.len() != ids.len() {
            let missing: Vec<i64> = ids
                .iter()
                .copied()
                .filter(|id| !lines.iter().any(|l| l.line_id == *id))
                .collect();
            warn!(?missing, "归还失败: 部分合同行不存在");
            return Err(ApiError::NotFound {
                entity: "ContractLine".to_string(),
                ids: missing,
            });
        }

        // 3. 已归还检查: 任一行已归还则整批失败
        let already_returned: Vec<i64> = lines
            .iter()
            .filter(|l| !l.is_open())
            .map(|l| l.line_id)
            .collect();
        if !already_returned.is_empty() {
            warn!(?already_returned, "归还失败: 合同行已归还");
            return Err(ApiError::Conflict {
                reason: "合同行已归还".to_string(),
                ids: already_returned,
            });
        }

        // 4. 锁定读取所涉设备行(升序)
        let mut unit_ids: Vec<i64> = lines.iter().map(|l| l.unit_id).collect();
        unit_ids.sort_unstable();
        unit_ids.dedup();
        let units = EquipmentRepository::find_for_update(&tx, &unit_ids)?;
        if units.len() != unit_ids.len() {
            return Err(ApiError::InternalError(
                "合同行引用的设备在台账中不存在".to_string(),
            ));
        }

        // 5. 逐行写入归还事实
        let mut updated = Vec::with_capacity(lines.len());
        for line in &lines {
            let late_days = (actual_return_date - line.planned_return_date)
                .num_days()
                .max(0);
            let penalty_amount = (penalty_rate * Decimal::from(late_days))
                .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);

            ContractRepository::update_line_return(
                &tx,
                line.line_id,
                actual_return_date,
                late_days,
                penalty_amount,
            )?;

            updated.push(ContractLine {
                actual_return_date: Some(actual_return_date),
                late_days: Some(late_days),
                penalty_amount: Some(penalty_amount),
                ..line.clone()
            });
        }

        // 6. 设备状态释放
        for unit in &units {
            match unit.status {
                UnitStatus::Rented => {}
                UnitStatus::Available | UnitStatus::Maintenance | UnitStatus::Scrapped => {
                    // 不变式要求未归还行引用的设备必为 RENTED
                    warn!(unit_id = unit.unit_id, status = %unit.status, "归还时设备状态异常");
                }
            }
            EquipmentRepository::update_status(&tx, unit.unit_id, UnitStatus::Available)?;
        }

        // 7. 提交
        tx.commit().map_err(RepositoryError::from)?;

        info!(
            line_count = updated.len(),
            unit_count = units.len(),
            %actual_return_date,
            "归还成功"
        );

        Ok(updated)
    }
}
