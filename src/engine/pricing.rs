// ==========================================
// 设备租赁管理系统 - 定价引擎
// ==========================================
// 职责: 由基础总价与客户标记计算最终价格
// 输入: 基础总价 + 租期天数 + VIP/风险标记
// 输出: PriceBreakdown (价格明细,供界面展示与审计)
// 红线: 纯函数,无 I/O,无状态;折扣按固定顺序连乘,不做加法叠加
// ==========================================

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// 长租折扣触发天数(超过该天数才享受长租折扣)
pub const DURATION_DISCOUNT_THRESHOLD_DAYS: i64 = 7;

/// 长租折扣率
pub const DURATION_DISCOUNT_RATE: Decimal = dec!(0.10);

/// VIP 折扣率
pub const VIP_DISCOUNT_RATE: Decimal = dec!(0.15);

/// 风险客户加价率
pub const RISK_SURCHARGE_RATE: Decimal = dec!(0.05);

// ==========================================
// PriceBreakdown - 价格明细
// ==========================================
// 瞬态值对象,不落库;预约事务计算后随结果返回调用方
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceBreakdown {
    pub base_total: Decimal,        // 折前总价 = Σ(日租金 × 租期天数)
    pub duration_discount: Decimal, // 实际应用的长租折扣率(未触发为 0)
    pub vip_discount: Decimal,      // 实际应用的 VIP 折扣率
    pub risk_surcharge: Decimal,    // 实际应用的风险加价率
    pub total: Decimal,             // 最终总价,四舍五入保留 2 位
}

// ==========================================
// PricingEngine - 定价引擎
// ==========================================
pub struct PricingEngine {
    // 无状态引擎,不需要注入依赖
    // Repository 操作由调用方处理
}

impl PricingEngine {
    /// 构造函数
    pub fn new() -> Self {
        Self {}
    }

    /// 计算价格明细
    ///
    /// # 参数
    /// - base_total: 折前总价(非负)
    /// - duration_days: 租期天数(含首尾,≥1)
    /// - client_vip: 客户 VIP 标记
    /// - client_risk: 客户风险标记(最近一单存在逾期归还)
    ///
    /// # 规则(按固定顺序连乘)
    /// 1. 长租折扣: 超过 7 天减 10%
    /// 2. VIP 折扣: 再减 15%
    /// 3. 风险加价: 再加 5%
    /// 4. 最终总价四舍五入(half-up)保留 2 位小数
    pub fn price(
        &self,
        base_total: Decimal,
        duration_days: i64,
        client_vip: bool,
        client_risk: bool,
    ) -> PriceBreakdown {
        // 1. 确定各项应用费率
        let duration_discount = if duration_days > DURATION_DISCOUNT_THRESHOLD_DAYS {
            DURATION_DISCOUNT_RATE
        } else {
            Decimal::ZERO
        };
        let vip_discount = if client_vip {
            VIP_DISCOUNT_RATE
        } else {
            Decimal::ZERO
        };
        let risk_surcharge = if client_risk {
            RISK_SURCHARGE_RATE
        } else {
            Decimal::ZERO
        };

        // 2. 按固定顺序连乘
        let total = base_total
            * (Decimal::ONE - duration_discount)
            * (Decimal::ONE - vip_discount)
            * (Decimal::ONE + risk_surcharge);

        // 3. 返回明细
        PriceBreakdown {
            base_total,
            duration_discount,
            vip_discount,
            risk_surcharge,
            total: total.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero),
        }
    }
}
