// ==========================================
// 设备租赁管理系统 - API层错误类型
// ==========================================
// 职责: 定义API层错误类型,转换Repository错误为用户友好的错误消息
// 约定: 冲突/未找到错误必须携带具体资源 id,保证可解释性
// ==========================================

use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API层错误类型
///
/// 三类业务错误的判定时机:
/// - ValidationError: 加锁前检出,不留任何部分状态
/// - NotFound: 引用的客户/设备/合同行不存在,携带缺失 id
/// - Conflict: 资源存在但状态不符(设备不可租、行已归还、锁等待超时),
///   携带冲突 id;锁等待超时由调用方决定是否重试
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 业务错误
    // ==========================================
    #[error("数据验证失败: {0}")]
    ValidationError(String),

    #[error("资源未找到: {entity} ids={ids:?}")]
    NotFound { entity: String, ids: Vec<i64> },

    #[error("资源冲突: {reason} ids={ids:?}")]
    Conflict { reason: String, ids: Vec<i64> },

    // ==========================================
    // 数据访问错误(不透明的基础设施失败,事务已回滚)
    // ==========================================
    #[error("数据库错误: {0}")]
    DatabaseError(String),

    #[error("数据库事务失败: {0}")]
    DatabaseTransactionError(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ApiError {
    /// 该错误是否值得调用方重试(仅锁等待超时)
    pub fn is_retryable(&self) -> bool {
        matches!(self, ApiError::Conflict { reason, .. } if reason.contains("锁等待超时"))
    }
}

// ==========================================
// 从 RepositoryError 转换
// 目的: 将Repository层的技术错误转换为用户友好的业务错误
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            // 并发控制错误: 锁等待超时是一种可重试的冲突
            RepositoryError::LockTimeout(msg) => ApiError::Conflict {
                reason: format!("锁等待超时: {}", msg),
                ids: vec![],
            },
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseError(format!("数据库锁获取失败: {}", msg))
            }

            // 数据库错误
            RepositoryError::NotFound { entity, ids } => ApiError::NotFound { entity, ids },
            RepositoryError::DatabaseConnectionError(msg) => ApiError::DatabaseError(msg),
            RepositoryError::DatabaseTransactionError(msg) => {
                ApiError::DatabaseTransactionError(msg)
            }
            RepositoryError::DatabaseQueryError(msg) => ApiError::DatabaseError(msg),
            RepositoryError::UniqueConstraintViolation(msg) => {
                ApiError::DatabaseError(format!("唯一约束违反: {}", msg))
            }
            RepositoryError::ForeignKeyViolation(msg) => {
                ApiError::DatabaseError(format!("外键约束违反: {}", msg))
            }

            // 业务规则错误
            RepositoryError::InvalidStateTransition { from, to } => ApiError::Conflict {
                reason: format!("无效的状态转换: {} -> {}", from, to),
                ids: vec![],
            },

            // 数据质量错误
            RepositoryError::ValidationError(msg) => ApiError::ValidationError(msg),
            RepositoryError::FieldValueError { field, message } => {
                ApiError::DatabaseError(format!("字段{}错误: {}", field, message))
            }

            // 通用错误
            RepositoryError::InternalError(msg) => ApiError::InternalError(msg),
            RepositoryError::Other(err) => ApiError::Other(err),
        }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;
