// ==========================================
// 设备租赁管理系统 - 客户仓储
// ==========================================
// 职责: client 表只读访问
// 红线: Repository 不含业务逻辑
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::client::Client;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, Result as SqliteResult};
use std::sync::{Arc, Mutex};

// ==========================================
// ClientRepository - 客户仓储
// ==========================================
pub struct ClientRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ClientRepository {
    /// 创建新的 ClientRepository 实例
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

    /// 按 client_id 查询客户
    pub fn find_by_id(&self, client_id: i64) -> RepositoryResult<Option<Client>> {
        let conn = self.get_conn()?;
        Self::find_by_id_in(&conn, client_id)
    }

    /// 查询所有客户（按姓氏、名字排序,供预约表单使用）
    pub fn list_all(&self) -> RepositoryResult<Vec<Client>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT client_id, first_name, last_name, address, postal_code, phone, email, vip
            FROM client
            ORDER BY last_name, first_name
            "#,
        )?;

        let rows = stmt.query_map([], Self::map_row)?;
        Ok(rows.collect::<SqliteResult<Vec<_>>>()?)
    }

    // ==========================================
    // 事务内访问（连接/事务由调用方持有）
    // ==========================================

    /// 按 client_id 查询客户（事务内使用）
    pub fn find_by_id_in(conn: &Connection, client_id: i64) -> RepositoryResult<Option<Client>> {
        let result = conn.query_row(
            r#"
            SELECT client_id, first_name, last_name, address, postal_code, phone, email, vip
            FROM client
            WHERE client_id = ?1
            "#,
            params![client_id],
            Self::map_row,
        );

        match result {
            Ok(client) => Ok(Some(client)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 辅助方法：将数据库行映射为 Client
    fn map_row(row: &rusqlite::Row) -> SqliteResult<Client> {
        Ok(Client {
            client_id: row.get(0)?,
            first_name: row.get(1)?,
            last_name: row.get(2)?,
            address: row.get(3)?,
            postal_code: row.get(4)?,
            phone: row.get(5)?,
            email: row.get(6)?,
            // 三态 VIP: NULL 保留为未评定
            vip: row.get::<_, Option<i32>>(7)?.map(|v| v != 0),
        })
    }
}
