// ==========================================
// 工厂流水线规划系统 - 资源数量值类型
// ==========================================
// 职责: 不可变的 (资源, 流量/分钟) 值对象与校验算术
// 红线: 流量永远 >= 0,负值构造/运算一律拒绝,不截断
// ==========================================

use crate::domain::demand::Demand;
use crate::domain::error::{FlowError, FlowResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

// ==========================================
// ResourceQuantity - 资源数量
// ==========================================

/// 资源数量值对象
///
/// 无标识,按 (resource, rate_per_minute) 判等与哈希。
/// 构造与算术均校验流量非负。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceQuantity {
    /// 资源标识(如 "IronOre" / "Water")
    pub resource: String,
    /// 流量(单位/分钟)
    pub rate_per_minute: f64,
}

impl ResourceQuantity {
    /// 创建资源数量
    ///
    /// # 错误
    /// - `InvalidValue`: rate 为负数或 NaN
    pub fn new(resource: impl Into<String>, rate_per_minute: f64) -> FlowResult<Self> {
        let resource = resource.into();
        if rate_per_minute.is_nan() || rate_per_minute < 0.0 {
            return Err(FlowError::invalid_value(
                format!("ResourceQuantity::new({})", resource),
                rate_per_minute,
            ));
        }
        Ok(Self {
            resource,
            rate_per_minute,
        })
    }

    /// 是否与另一数量属于同一资源
    pub fn has_same_resource(&self, other: &ResourceQuantity) -> bool {
        self.resource == other.resource
    }

    /// 同资源数量相加,返回新值
    ///
    /// # 错误
    /// - `InvalidOperation`: 资源不同
    pub fn add(&self, other: &ResourceQuantity) -> FlowResult<ResourceQuantity> {
        if !self.has_same_resource(other) {
            return Err(FlowError::invalid_operation(format!(
                "不同资源的数量不能相加: {} vs {}",
                self.resource, other.resource
            )));
        }
        ResourceQuantity::new(
            self.resource.clone(),
            self.rate_per_minute + other.rate_per_minute,
        )
    }

    /// 同资源数量相减,返回新值
    ///
    /// # 错误
    /// - `InvalidOperation`: 资源不同
    /// - `InvalidValue`: 结果为负
    pub fn subtract(&self, other: &ResourceQuantity) -> FlowResult<ResourceQuantity> {
        if !self.has_same_resource(other) {
            return Err(FlowError::invalid_operation(format!(
                "不同资源的数量不能相减: {} vs {}",
                self.resource, other.resource
            )));
        }
        let rate = self.rate_per_minute - other.rate_per_minute;
        if rate < 0.0 {
            return Err(FlowError::invalid_value(
                format!("ResourceQuantity::subtract({})", self.resource),
                rate,
            ));
        }
        ResourceQuantity::new(self.resource.clone(), rate)
    }

    /// 按比例缩放,返回新值
    ///
    /// # 错误
    /// - `InvalidValue`: factor 为负数或 NaN
    pub fn scale(&self, factor: f64) -> FlowResult<ResourceQuantity> {
        if factor.is_nan() || factor < 0.0 {
            return Err(FlowError::invalid_value(
                format!("ResourceQuantity::scale({})", self.resource),
                factor,
            ));
        }
        ResourceQuantity::new(self.resource.clone(), self.rate_per_minute * factor)
    }

    /// 转换为同资源同流量的独立需求
    pub fn to_demand(&self) -> Demand {
        // 构造值已经过校验,rate 必然合法
        Demand::single_unchecked(self.resource.clone(), self.rate_per_minute)
    }
}

// rate 由构造校验保证非 NaN,Eq/Hash 因此良定义
impl Eq for ResourceQuantity {}

impl Hash for ResourceQuantity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.resource.hash(state);
        self.rate_per_minute.to_bits().hash(state);
    }
}

// ==========================================
// 文本编码: "resource rate"
// ==========================================

impl fmt::Display for ResourceQuantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.resource, self.rate_per_minute)
    }
}

impl FromStr for ResourceQuantity {
    type Err = FlowError;

    /// 从 "resource rate" 文本解析
    ///
    /// # 错误
    /// - `FormatError`: 字段数不对或流量不是数字
    /// - `InvalidValue`: 流量为负
    fn from_str(s: &str) -> FlowResult<Self> {
        let mut parts = s.split_whitespace();
        let resource = parts
            .next()
            .ok_or_else(|| FlowError::FormatError(format!("空的数量文本: {:?}", s)))?;
        let rate_text = parts
            .next()
            .ok_or_else(|| FlowError::FormatError(format!("缺少流量字段: {:?}", s)))?;
        if parts.next().is_some() {
            return Err(FlowError::FormatError(format!("多余字段: {:?}", s)));
        }
        let rate: f64 = rate_text
            .parse()
            .map_err(|_| FlowError::FormatError(format!("流量不是数字: {:?}", rate_text)))?;
        ResourceQuantity::new(resource, rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_roundtrip() {
        let q = ResourceQuantity::new("IronOre", 60.0).unwrap();
        assert_eq!(q.resource, "IronOre");
        assert_eq!(q.rate_per_minute, 60.0);
    }

    #[test]
    fn test_new_rejects_negative() {
        let result = ResourceQuantity::new("IronOre", -1.0);
        assert!(matches!(result, Err(FlowError::InvalidValue { .. })));
    }

    #[test]
    fn test_new_rejects_nan() {
        let result = ResourceQuantity::new("IronOre", f64::NAN);
        assert!(matches!(result, Err(FlowError::InvalidValue { .. })));
    }

    #[test]
    fn test_add_same_resource() {
        let a = ResourceQuantity::new("IronOre", 30.0).unwrap();
        let b = ResourceQuantity::new("IronOre", 15.0).unwrap();
        assert_eq!(a.add(&b).unwrap().rate_per_minute, 45.0);
    }

    #[test]
    fn test_add_different_resource_fails() {
        let a = ResourceQuantity::new("IronOre", 30.0).unwrap();
        let b = ResourceQuantity::new("Copper", 15.0).unwrap();
        assert!(matches!(a.add(&b), Err(FlowError::InvalidOperation(_))));
    }

    #[test]
    fn test_subtract_negative_result_fails() {
        let a = ResourceQuantity::new("IronOre", 10.0).unwrap();
        let b = ResourceQuantity::new("IronOre", 15.0).unwrap();
        assert!(matches!(a.subtract(&b), Err(FlowError::InvalidValue { .. })));
    }

    #[test]
    fn test_scale() {
        let a = ResourceQuantity::new("IronOre", 30.0).unwrap();
        assert_eq!(a.scale(2.5).unwrap().rate_per_minute, 75.0);
        assert!(a.scale(-1.0).is_err());
    }

    #[test]
    fn test_equality_and_hash() {
        use std::collections::HashSet;
        let a = ResourceQuantity::new("IronOre", 30.0).unwrap();
        let b = ResourceQuantity::new("IronOre", 30.0).unwrap();
        let c = ResourceQuantity::new("IronOre", 31.0).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        let mut set = HashSet::new();
        set.insert(a);
        assert!(set.contains(&b));
        assert!(!set.contains(&c));
    }

    #[test]
    fn test_parse_text() {
        let q: ResourceQuantity = "Water 12.5".parse().unwrap();
        assert_eq!(q.resource, "Water");
        assert_eq!(q.rate_per_minute, 12.5);
        assert_eq!(q.to_string(), "Water 12.5");

        assert!(matches!(
            "Water".parse::<ResourceQuantity>(),
            Err(FlowError::FormatError(_))
        ));
        assert!(matches!(
            "Water abc".parse::<ResourceQuantity>(),
            Err(FlowError::FormatError(_))
        ));
        assert!(matches!(
            "Water 1 2".parse::<ResourceQuantity>(),
            Err(FlowError::FormatError(_))
        ));
        assert!(matches!(
            "Water -3".parse::<ResourceQuantity>(),
            Err(FlowError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_to_demand() {
        let q = ResourceQuantity::new("IronOre", 30.0).unwrap();
        let d = q.to_demand();
        assert_eq!(d.resource(), "IronOre");
        assert_eq!(d.rate_per_minute(), 30.0);
    }
}
