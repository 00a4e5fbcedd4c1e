// ==========================================
// 设备租赁管理系统 - 设备仓储
// ==========================================
// 职责: equipment_unit 表数据访问
// 红线: status 列仅预约/归还事务可写;事务内读取一律按 unit_id 升序,
//       保持统一的加锁顺序约定,避免交叠集合互相等待
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::equipment::EquipmentUnit;
use crate::domain::types::UnitStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, Result as SqliteResult, ToSql};
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

// ==========================================
// EquipmentRepository - 设备仓储
// ==========================================
pub struct EquipmentRepository {
    conn: Arc<Mutex<Connection>>,
}

impl EquipmentRepository {
    /// 创建新的 EquipmentRepository 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)
            .map_err(|e| RepositoryError::DatabaseConnectionError(e.to_string()))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建仓储实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 按 unit_id 查询设备
    pub fn find_by_id(&self, unit_id: i64) -> RepositoryResult<Option<EquipmentUnit>> {
        let conn = self.get_conn()?;
        let result = conn.query_row(
            r#"
            SELECT unit_id, serial_no, model_id, daily_rate, status
            FROM equipment_unit
            WHERE unit_id = ?1
            "#,
            params![unit_id],
            Self::map_row,
        );

        match result {
            Ok(unit) => Ok(Some(unit)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 查询所有设备（按 unit_id 排序）
    pub fn list_all(&self) -> RepositoryResult<Vec<EquipmentUnit>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT unit_id, serial_no, model_id, daily_rate, status
            FROM equipment_unit
            ORDER BY unit_id
            "#,
        )?;

        let rows = stmt.query_map([], Self::map_row)?;
        Ok(rows.collect::<SqliteResult<Vec<_>>>()?)
    }

    /// 查询在库可租设备（供预约表单使用）
    ///
    /// 注意: 这是最终一致的目录视图,预约事务内部不依赖该结果,
    /// 可用性一律以事务内锁定行的 status 为准。
    pub fn list_available(&self) -> RepositoryResult<Vec<EquipmentUnit>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT unit_id, serial_no, model_id, daily_rate, status
            FROM equipment_unit
            WHERE status = 'AVAILABLE'
            ORDER BY unit_id
            "#,
        )?;

        let rows = stmt.query_map([], Self::map_row)?;
        Ok(rows.collect::<SqliteResult<Vec<_>>>()?)
    }

    // ==========================================
    // 事务内访问（连接/事务由调用方持有）
    // ==========================================

    /// 锁定读取指定设备行（事务内使用）
    ///
    /// # 参数
    /// - ids: 去重后的 unit_id 集合
    ///
    /// # 说明
    /// - 调用方须已通过 BEGIN IMMEDIATE 持有写事务,本查询即为"锁定读":
    ///   在事务提交前,其他写事务无法观察或修改这些行
    /// - 结果按 unit_id 升序返回,与行锁数据库的加锁顺序约定一致
    /// - 不存在的 id 不报错,由调用方比对缺失集合
    pub fn find_for_update(conn: &Connection, ids: &[i64]) -> RepositoryResult<Vec<EquipmentUnit>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = ids.iter().map(|_| "?").collect::<Vec<_>>().join(", ");
        let sql = format!(
            r#"
            SELECT unit_id, serial_no, model_id, daily_rate, status
            FROM equipment_unit
            WHERE unit_id IN ({})
            ORDER BY unit_id
            "#,
            placeholders
        );

        let mut stmt = conn.prepare(&sql)?;
        let params_vec: Vec<&dyn ToSql> = ids.iter().map(|id| id as &dyn ToSql).collect();
        let rows = stmt.query_map(params_vec.as_slice(), Self::map_row)?;
        Ok(rows.collect::<SqliteResult<Vec<_>>>()?)
    }

    /// 更新设备状态（事务内使用）
    ///
    /// # 错误
    /// - `RepositoryError::NotFound`: unit_id 不存在
    pub fn update_status(
        conn: &Connection,
        unit_id: i64,
        status: UnitStatus,
    ) -> RepositoryResult<()> {
        let rows_affected = conn.execute(
            "UPDATE equipment_unit SET status = ?1 WHERE unit_id = ?2",
            params![status.to_db_str(), unit_id],
        )?;

        if rows_affected == 0 {
            return Err(RepositoryError::NotFound {
                entity: "EquipmentUnit".to_string(),
                ids: vec![unit_id],
            });
        }

        Ok(())
    }

    /// 辅助方法：将数据库行映射为 EquipmentUnit
    fn map_row(row: &rusqlite::Row) -> SqliteResult<EquipmentUnit> {
        let rate_text: String = row.get(3)?;
        let status_text: String = row.get(4)?;

        Ok(EquipmentUnit {
            unit_id: row.get(0)?,
            serial_no: row.get(1)?,
            model_id: row.get(2)?,
            daily_rate: Decimal::from_str(&rate_text).map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    3,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })?,
            // 状态列是预约正确性的依据,未知值直接报错,不做默认回退
            status: UnitStatus::from_str(&status_text).ok_or_else(|| {
                rusqlite::Error::FromSqlConversionFailure(
                    4,
                    rusqlite::types::Type::Text,
                    Box::new(std::io::Error::new(
                        std::io::ErrorKind::InvalidData,
                        format!("未知设备状态: {}", status_text),
                    )),
                )
            })?,
        })
    }
}
