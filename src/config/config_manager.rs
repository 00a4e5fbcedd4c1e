// ==========================================
// 设备租赁管理系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::db::open_sqlite_connection;
use rusqlite::{params, Connection};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::json;
use std::collections::HashMap;
use std::error::Error;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

/// 日罚金默认值(每逾期一天)
///
/// 单一具名配置项,可经 config_kv 覆写;业务代码不散落罚金字面量。
pub const DEFAULT_PENALTY_RATE_PER_DAY: Decimal = dec!(5.00);

/// 日罚金配置键
pub const PENALTY_RATE_PER_DAY_KEY: &str = "penalty_rate_per_day";

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> Result<Self, Box<dyn Error>> {
        let conn = open_sqlite_connection(db_path)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, Box<dyn Error>> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    fn get_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    /// 读取 global scope 的配置值（公开方法，供其他模块复用）
    pub fn get_global_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        self.get_config_value(key)
    }

    /// 写入 global scope 的配置值（upsert 语义）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        conn.execute(
            r#"
            INSERT INTO config_kv (scope_id, key, value, updated_at)
            VALUES ('global', ?1, ?2, datetime('now'))
            ON CONFLICT(scope_id, key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
            params![key, value],
        )?;

        Ok(())
    }

    /// 读取日罚金(每逾期一天)
    ///
    /// # 返回
    /// - 配置存在且可解析: 配置值
    /// - 配置不存在: 默认值 5.00
    /// - 配置存在但非法: Err(解析错误)
    pub fn penalty_rate_per_day(&self) -> Result<Decimal, Box<dyn Error>> {
        match self.get_config_value(PENALTY_RATE_PER_DAY_KEY)? {
            Some(raw) => {
                let rate = Decimal::from_str(raw.trim())
                    .map_err(|e| format!("配置 {} 非法: {}", PENALTY_RATE_PER_DAY_KEY, e))?;
                if rate < Decimal::ZERO {
                    return Err(format!("配置 {} 不能为负: {}", PENALTY_RATE_PER_DAY_KEY, rate).into());
                }
                Ok(rate)
            }
            None => Ok(DEFAULT_PENALTY_RATE_PER_DAY),
        }
    }

    /// 获取所有配置的快照（JSON格式）
    ///
    /// # 用途
    /// - 操作留痕时记录当时生效的配置
    pub fn get_config_snapshot(&self) -> Result<String, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        // 查询所有global scope的配置
        let mut stmt = conn.prepare(
            "SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key"
        )?;

        let mut config_map: HashMap<String, String> = HashMap::new();
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
            ))
        })?;

        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }

        // 序列化为JSON
        let json_value = json!(config_map);
        Ok(serde_json::to_string(&json_value)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    /// 内存库 + 配置表
    fn test_manager() -> ConfigManager {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            r#"
            CREATE TABLE config_scope (
                scope_id TEXT PRIMARY KEY,
                scope_type TEXT NOT NULL,
                scope_key TEXT NOT NULL,
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                UNIQUE(scope_type, scope_key)
            );
            INSERT INTO config_scope (scope_id, scope_type, scope_key)
            VALUES ('global', 'GLOBAL', 'global');
            CREATE TABLE config_kv (
                scope_id TEXT NOT NULL REFERENCES config_scope(scope_id) ON DELETE CASCADE,
                key TEXT NOT NULL,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT (datetime('now')),
                PRIMARY KEY (scope_id, key)
            );
            "#,
        )
        .unwrap();
        ConfigManager::from_connection(Arc::new(Mutex::new(conn))).unwrap()
    }

    #[test]
    fn test_penalty_rate_default() {
        let manager = test_manager();
        assert_eq!(manager.penalty_rate_per_day().unwrap(), dec!(5.00));
    }

    #[test]
    fn test_penalty_rate_override() {
        let manager = test_manager();
        manager
            .set_global_config_value(PENALTY_RATE_PER_DAY_KEY, "7.50")
            .unwrap();
        assert_eq!(manager.penalty_rate_per_day().unwrap(), dec!(7.50));
    }

    #[test]
    fn test_penalty_rate_rejects_negative() {
        let manager = test_manager();
        manager
            .set_global_config_value(PENALTY_RATE_PER_DAY_KEY, "-1.00")
            .unwrap();
        assert!(manager.penalty_rate_per_day().is_err());
    }

    #[test]
    fn test_config_snapshot_contains_overrides() {
        let manager = test_manager();
        manager
            .set_global_config_value(PENALTY_RATE_PER_DAY_KEY, "9.00")
            .unwrap();

        let snapshot = manager.get_config_snapshot().unwrap();
        assert!(snapshot.contains("penalty_rate_per_day"));
        assert!(snapshot.contains("9.00"));
    }
}
