// ==========================================
// 设备租赁管理系统 - 预约 API
// ==========================================
// 职责: 租赁预约事务(校验、加锁、可用性检查、定价、建合同、改状态)
// 红线: 检查-落位全程在同一写事务内,杜绝同一台设备被并发双租;
//       任一步失败整体回滚,不留部分预约
// ==========================================

use std::sync::{Arc, Mutex};

use chrono::{NaiveDate, Utc};
use rusqlite::{Connection, TransactionBehavior};
use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::api::error::{ApiError, ApiResult};
use crate::db::open_sqlite_connection;
use crate::domain::contract::Contract;
use crate::domain::equipment::EquipmentUnit;
use crate::domain::types::UnitStatus;
use crate::engine::pricing::{PriceBreakdown, PricingEngine};
use crate::engine::risk::RiskEngine;
use crate::repository::client_repo::ClientRepository;
use crate::repository::contract_repo::ContractRepository;
use crate::repository::equipment_repo::EquipmentRepository;
use crate::repository::error::RepositoryError;

// ==========================================
// ReservationApi - 预约协调器
// ==========================================

/// 预约API
///
/// 职责：
/// 1. 加锁前的入参校验(选择集、日期范围)
/// 2. BEGIN IMMEDIATE 写事务内的可用性检查与落位
/// 3. 调用定价/风险引擎生成价格明细
/// 4. 合同与合同行创建、设备状态迁移
pub struct ReservationApi {
    conn: Arc<Mutex<Connection>>,
    pricing_engine: Arc<PricingEngine>,
    risk_engine: Arc<RiskEngine>,
}

impl ReservationApi {
    /// 创建新的 ReservationApi 实例(独立连接)
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    /// - pricing_engine: 定价引擎
    /// - risk_engine: 风险判定引擎
    pub fn new(
        db_path: &str,
        pricing_engine: Arc<PricingEngine>,
        risk_engine: Arc<RiskEngine>,
    ) -> ApiResult<Self> {
        let conn = open_sqlite_connection(db_path)
            .map_err(|e| ApiError::DatabaseError(e.to_string()))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            pricing_engine,
            risk_engine,
        })
    }

    /// 从已有连接创建实例
    pub fn from_connection(
        conn: Arc<Mutex<Connection>>,
        pricing_engine: Arc<PricingEngine>,
        risk_engine: Arc<RiskEngine>,
    ) -> Self {
        Self {
            conn,
            pricing_engine,
            risk_engine,
        }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> ApiResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| ApiError::from(RepositoryError::LockError(e.to_string())))
    }

    // ==========================================
    // 预约事务
    // ==========================================

    /// 创建租赁预约
    ///
    /// # 参数
    /// - client_id: 客户ID
    /// - unit_ids: 所租设备ID集合(非空,自动去重)
    /// - start_date / end_date: 租期首尾日(均含当日)
    ///
    /// # 返回
    /// - Ok((Contract, Vec<EquipmentUnit>, PriceBreakdown)): 新合同、
    ///   所租设备(状态已为 RENTED)、价格明细
    ///
    /// # 错误
    /// - `ApiError::ValidationError`: 选择集为空 / 日期范围非法(加锁前检出)
    /// - `ApiError::NotFound`: 客户不存在,或部分设备ID无对应台账(携带缺失 id)
    /// - `ApiError::Conflict`: 部分设备不可租(携带冲突 id),或锁等待超时
    ///
    /// # 并发
    /// 事务以 BEGIN IMMEDIATE 开启,写锁覆盖步骤 1-10 的完整检查-落位序列;
    /// 两个交叠设备集合的并发预约恰有一个成功,另一个得到 Conflict。
    pub fn reserve(
        &self,
        client_id: i64,
        unit_ids: &[i64],
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> ApiResult<(Contract, Vec<EquipmentUnit>, PriceBreakdown)> {
        // ===== 加锁前校验 =====
        if unit_ids.is_empty() {
            return Err(ApiError::ValidationError("未选择任何设备".to_string()));
        }
        if end_date < start_date {
            return Err(ApiError::ValidationError(
                "日期范围非法: 结束日期早于开始日期".to_string(),
            ));
        }

        // 租期含首尾: end - start + 1
        let duration_days = (end_date - start_date).num_days() + 1;
        if duration_days < 1 {
            return Err(ApiError::ValidationError("租期至少 1 天".to_string()));
        }

        // 去重并升序排列,统一加锁顺序
        let mut ids = unit_ids.to_vec();
        ids.sort_unstable();
        ids.dedup();

        // ===== 事务体 =====
        let mut conn = self.get_conn()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(RepositoryError::from)?;

        // 1. 客户存在性
        let client = ClientRepository::find_by_id_in(&tx, client_id)?.ok_or_else(|| {
            ApiError::NotFound {
                entity: "Client".to_string(),
                ids: vec![client_id],
            }
        })?;

        // 2. 锁定读取设备行(升序)
        let units = EquipmentRepository::find_for_update(&tx, &ids)?;

        // 3. 缺失 id 比对
        if units.len() != ids.len() {
            let missing: Vec<i64> = ids
                .iter()
                .copied()
                .filter(|id| !units.iter().any(|u| u.unit_id == *id))
                .collect();
            warn!(?missing, "预约失败: 部分设备不存在");
            return Err(ApiError::NotFound {
                entity: "EquipmentUnit".to_string(),
                ids: missing,
            });
        }

        // 4. 可用性检查: 任一台不可租则整单失败,不做部分预约
        let conflicting: Vec<i64> = units
            .iter()
            .filter(|u| match u.status {
                UnitStatus::Available => false,
                UnitStatus::Rented | UnitStatus::Maintenance | UnitStatus::Scrapped => true,
            })
            .map(|u| u.unit_id)
            .collect();
        if !conflicting.is_empty() {
            warn!(?conflicting, "预约失败: 设备不可租");
            return Err(ApiError::Conflict {
                reason: "设备不可租".to_string(),
                ids: conflicting,
            });
        }

        // 5. 折前总价 = Σ(日租金 × 租期天数)
        let base_total: Decimal = units
            .iter()
            .map(|u| u.daily_rate * Decimal::from(duration_days))
            .sum();

        // 6. 风险判定(同一事务内读取,视图一致)
        let latest_lines = match ContractRepository::find_latest_by_client_in(&tx, client_id)? {
            Some(latest) => ContractRepository::find_lines_by_contract_in(&tx, latest.contract_id)?,
            None => Vec::new(),
        };
        let client_risk = self.risk_engine.is_risky(&latest_lines);

        // 7. 定价
        let breakdown =
            self.pricing_engine
                .price(base_total, duration_days, client.is_vip(), client_risk);

        // 8. 创建合同
        let created_at = Utc::now();
        let contract_id =
            ContractRepository::insert(&tx, client_id, start_date, end_date, created_at)?;

        // 9-10. 建行 + 设备状态迁移
        for unit in &units {
            ContractRepository::insert_line(&tx, contract_id, unit.unit_id, end_date)?;
            EquipmentRepository::update_status(&tx, unit.unit_id, UnitStatus::Rented)?;
        }

        // 11. 提交
        tx.commit().map_err(RepositoryError::from)?;

        info!(
            contract_id,
            client_id,
            unit_count = units.len(),
            total = %breakdown.total,
            "预约成功"
        );

        let contract = Contract {
            contract_id,
            client_id,
            start_date,
            end_date,
            created_at,
        };

        // 返回的设备带上已提交的新状态
        let units = units
            .into_iter()
            .map(|mut u| {
                u.status = UnitStatus::Rented;
                u
            })
            .collect();

        Ok((contract, units, breakdown))
    }
}
