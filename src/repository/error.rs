// ==========================================
// 设备租赁管理系统 - 仓储层错误类型
// ==========================================
// 工具: thiserror 派生宏
// ==========================================

use thiserror::Error;

/// 仓储层错误类型
#[derive(Error, Debug)]
pub enum RepositoryError {
    // ===== 并发控制错误 =====
    #[error("锁等待超时: {0}")]
    LockTimeout(String),

    #[error("数据库锁获取失败: {0}")]
    LockError(String),

    // ===== 数据库错误 =====
    #[error("记录未找到: {entity} ids={ids:?}")]
    NotFound { entity: String, ids: Vec<i64> },

    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    #[error("数据库事务失败: {0}")]
    DatabaseTransactionError(String),

    #[error("数据库查询失败: {0}")]
    DatabaseQueryError(String),

    #[error("唯一约束违反: {0}")]
    UniqueConstraintViolation(String),

    #[error("外键约束违反: {0}")]
    ForeignKeyViolation(String),

    // ===== 业务规则错误 =====
    #[error("无效的状态转换: from={from} to={to}")]
    InvalidStateTransition { from: String, to: String },

    // ===== 数据质量错误 =====
    #[error("数据验证失败: {0}")]
    ValidationError(String),

    #[error("字段值错误 (field={field}): {message}")]
    FieldValueError { field: String, message: String },

    // ===== 通用错误 =====
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// 实现 From<rusqlite::Error>
// busy/locked 属于悲观锁等待超时,与其余数据库错误区分,便于上层判定可重试
impl From<rusqlite::Error> for RepositoryError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(e, msg) => {
                let detail = msg.unwrap_or_else(|| e.to_string());
                match e.code {
                    rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked => {
                        RepositoryError::LockTimeout(detail)
                    }
                    rusqlite::ErrorCode::ConstraintViolation => {
                        if detail.contains("UNIQUE") {
                            RepositoryError::UniqueConstraintViolation(detail)
                        } else if detail.contains("FOREIGN KEY") {
                            RepositoryError::ForeignKeyViolation(detail)
                        } else {
                            RepositoryError::DatabaseQueryError(detail)
                        }
                    }
                    _ => RepositoryError::DatabaseQueryError(detail),
                }
            }
            _ => RepositoryError::DatabaseQueryError(err.to_string()),
        }
    }
}

/// Result 类型别名
pub type RepositoryResult<T> = Result<T, RepositoryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_busy_error_maps_to_lock_timeout() {
        let err = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error {
                code: rusqlite::ErrorCode::DatabaseBusy,
                extended_code: 5,
            },
            Some("database is locked".to_string()),
        );
        let repo_err: RepositoryError = err.into();
        match repo_err {
            RepositoryError::LockTimeout(msg) => assert!(msg.contains("locked")),
            other => panic!("应映射为 LockTimeout,实际: {:?}", other),
        }
    }

    #[test]
    fn test_unique_violation_maps_to_constraint() {
        let err = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error {
                code: rusqlite::ErrorCode::ConstraintViolation,
                extended_code: 2067,
            },
            Some("UNIQUE constraint failed: client.email".to_string()),
        );
        let repo_err: RepositoryError = err.into();
        match repo_err {
            RepositoryError::UniqueConstraintViolation(msg) => assert!(msg.contains("email")),
            other => panic!("应映射为 UniqueConstraintViolation,实际: {:?}", other),
        }
    }
}
