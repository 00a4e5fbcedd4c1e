// ==========================================
// 设备租赁管理系统 - 合同仓储
// ==========================================
// 职责: contract / contract_line 表数据访问
// 红线: Repository 不含业务逻辑;
//       归还三字段只能经 update_line_return 从空值写为非空,不允许改写
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::contract::{Contract, ContractLine};
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, Result as SqliteResult, ToSql};
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

/// contract 表查询列清单
const CONTRACT_COLUMNS: &str = "contract_id, client_id, start_date, end_date, created_at";

/// contract_line 表查询列清单
const LINE_COLUMNS: &str =
    "line_id, contract_id, unit_id, planned_return_date, actual_return_date, late_days, penalty_amount";

// ==========================================
// ContractRepository - 合同仓储
// ==========================================
pub struct ContractRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ContractRepository {
    /// 创建新的 ContractRepository 实例
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

    // ==========================================
    // 读取接口
    // ==========================================

    /// 按 contract_id 查询合同
    pub fn find_by_id(&self, contract_id: i64) -> RepositoryResult<Option<Contract>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM contract WHERE contract_id = ?1",
            CONTRACT_COLUMNS
        );

        match conn.query_row(&sql, params![contract_id], Self::map_contract_row) {
            Ok(contract) => Ok(Some(contract)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 查询所有合同（按 contract_id 降序,最新在前）
    pub fn list_all(&self) -> RepositoryResult<Vec<Contract>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM contract ORDER BY contract_id DESC",
            CONTRACT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;

        let rows = stmt.query_map([], Self::map_contract_row)?;
        Ok(rows.collect::<SqliteResult<Vec<_>>>()?)
    }

    /// 查询客户最近一份合同
    pub fn find_latest_by_client(&self, client_id: i64) -> RepositoryResult<Option<Contract>> {
        let conn = self.get_conn()?;
        Self::find_latest_by_client_in(&conn, client_id)
    }

    /// 查询合同的所有行（按 line_id 升序）
    pub fn find_lines_by_contract(&self, contract_id: i64) -> RepositoryResult<Vec<ContractLine>> {
        let conn = self.get_conn()?;
        Self::find_lines_by_contract_in(&conn, contract_id)
    }

    /// 查询所有未归还合同行（供归还表单使用,按 line_id 升序）
    pub fn list_open_lines(&self) -> RepositoryResult<Vec<ContractLine>> {
        let conn = self.get_conn()?;
        Self::list_open_lines_in(&conn)
    }

    // ==========================================
    // 事务内访问（连接/事务由调用方持有）
    // ==========================================

    /// 查询客户最近一份合同（事务内使用,按 contract_id 降序取第一条）
    pub fn find_latest_by_client_in(
        conn: &Connection,
        client_id: i64,
    ) -> RepositoryResult<Option<Contract>> {
        let sql = format!(
            r#"SELECT {}
               FROM contract
               WHERE client_id = ?1
               ORDER BY contract_id DESC
               LIMIT 1"#,
            CONTRACT_COLUMNS
        );

        match conn.query_row(&sql, params![client_id], Self::map_contract_row) {
            Ok(contract) => Ok(Some(contract)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 查询合同的所有行（事务内使用）
    pub fn find_lines_by_contract_in(
        conn: &Connection,
        contract_id: i64,
    ) -> RepositoryResult<Vec<ContractLine>> {
        let sql = format!(
            "SELECT {} FROM contract_line WHERE contract_id = ?1 ORDER BY line_id",
            LINE_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;

        let rows = stmt.query_map(params![contract_id], Self::map_line_row)?;
        Ok(rows.collect::<SqliteResult<Vec<_>>>()?)
    }

    /// 查询所有未归还合同行（事务内使用）
    pub fn list_open_lines_in(conn: &Connection) -> RepositoryResult<Vec<ContractLine>> {
        let sql = format!(
            "SELECT {} FROM contract_line WHERE actual_return_date IS NULL ORDER BY line_id",
            LINE_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;

        let rows = stmt.query_map([], Self::map_line_row)?;
        Ok(rows.collect::<SqliteResult<Vec<_>>>()?)
    }

    /// 锁定读取指定合同行（事务内使用）
    ///
    /// # 说明
    /// - 调用方须已通过 BEGIN IMMEDIATE 持有写事务
    /// - 结果按 line_id 升序返回,与设备行一致的加锁顺序约定
    /// - 不存在的 id 不报错,由调用方比对缺失集合
    pub fn find_lines_for_update(
        conn: &Connection,
        ids: &[i64],
    ) -> RepositoryResult<Vec<ContractLine>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = ids.iter().map(|_| "?").collect::<Vec<_>>().join(", ");
        let sql = format!(
            "SELECT {} FROM contract_line WHERE line_id IN ({}) ORDER BY line_id",
            LINE_COLUMNS, placeholders
        );

        let mut stmt = conn.prepare(&sql)?;
        let params_vec: Vec<&dyn ToSql> = ids.iter().map(|id| id as &dyn ToSql).collect();
        let rows = stmt.query_map(params_vec.as_slice(), Self::map_line_row)?;
        Ok(rows.collect::<SqliteResult<Vec<_>>>()?)
    }

    /// 创建合同（事务内使用）
    ///
    /// # 返回
    /// - Ok(i64): 新合同的自增 contract_id
    pub fn insert(
        conn: &Connection,
        client_id: i64,
        start_date: NaiveDate,
        end_date: NaiveDate,
        created_at: DateTime<Utc>,
    ) -> RepositoryResult<i64> {
        conn.execute(
            r#"INSERT INTO contract (client_id, start_date, end_date, created_at)
               VALUES (?1, ?2, ?3, ?4)"#,
            params![
                client_id,
                start_date.format("%Y-%m-%d").to_string(),
                end_date.format("%Y-%m-%d").to_string(),
                created_at.to_rfc3339(),
            ],
        )?;

        Ok(conn.last_insert_rowid())
    }

    /// 创建合同行（事务内使用）
    ///
    /// 归还三字段建行时为 NULL,由归还事务一次性写入。
    ///
    /// # 返回
    /// - Ok(i64): 新行的自增 line_id
    pub fn insert_line(
        conn: &Connection,
        contract_id: i64,
        unit_id: i64,
        planned_return_date: NaiveDate,
    ) -> RepositoryResult<i64> {
        conn.execute(
            r#"INSERT INTO contract_line (contract_id, unit_id, planned_return_date)
               VALUES (?1, ?2, ?3)"#,
            params![
                contract_id,
                unit_id,
                planned_return_date.format("%Y-%m-%d").to_string(),
            ],
        )?;

        Ok(conn.last_insert_rowid())
    }

    /// 写入合同行归还结果（事务内使用）
    ///
    /// WHERE 条件限定 actual_return_date IS NULL,保证归还事实只写一次。
    ///
    /// # 错误
    /// - `RepositoryError::NotFound`: line_id 不存在或该行已归还
    pub fn update_line_return(
        conn: &Connection,
        line_id: i64,
        actual_return_date: NaiveDate,
        late_days: i64,
        penalty_amount: Decimal,
    ) -> RepositoryResult<()> {
        let rows_affected = conn.execute(
            r#"UPDATE contract_line
               SET actual_return_date = ?1, late_days = ?2, penalty_amount = ?3
               WHERE line_id = ?4 AND actual_return_date IS NULL"#,
            params![
                actual_return_date.format("%Y-%m-%d").to_string(),
                late_days,
                penalty_amount.to_string(),
                line_id,
            ],
        )?;

        if rows_affected == 0 {
            return Err(RepositoryError::NotFound {
                entity: "ContractLine".to_string(),
                ids: vec![line_id],
            });
        }

        Ok(())
    }

    // ==========================================
    // 行映射辅助方法
    // ==========================================

    /// 辅助方法：将数据库行映射为 Contract
    fn map_contract_row(row: &rusqlite::Row) -> SqliteResult<Contract> {
        let start_text: String = row.get(2)?;
        let end_text: String = row.get(3)?;
        let created_text: String = row.get(4)?;

        Ok(Contract {
            contract_id: row.get(0)?,
            client_id: row.get(1)?,
            start_date: Self::parse_date(2, &start_text)?,
            end_date: Self::parse_date(3, &end_text)?,
            created_at: created_text
                .parse::<DateTime<Utc>>()
                .map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(
                        4,
                        rusqlite::types::Type::Text,
                        Box::new(e),
                    )
                })?,
        })
    }

    /// 辅助方法：将数据库行映射为 ContractLine
    fn map_line_row(row: &rusqlite::Row) -> SqliteResult<ContractLine> {
        let planned_text: String = row.get(3)?;
        let actual_text: Option<String> = row.get(4)?;
        let penalty_text: Option<String> = row.get(6)?;

        let actual_return_date = match actual_text {
            Some(s) => Some(Self::parse_date(4, &s)?),
            None => None,
        };
        let penalty_amount = match penalty_text {
            Some(s) => Some(Decimal::from_str(&s).map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    6,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })?),
            None => None,
        };

        Ok(ContractLine {
            line_id: row.get(0)?,
            contract_id: row.get(1)?,
            unit_id: row.get(2)?,
            planned_return_date: Self::parse_date(3, &planned_text)?,
            actual_return_date,
            late_days: row.get(5)?,
            penalty_amount,
        })
    }

    /// 辅助方法：解析 %Y-%m-%d 日期列
    fn parse_date(idx: usize, s: &str) -> SqliteResult<NaiveDate> {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
    }
}
