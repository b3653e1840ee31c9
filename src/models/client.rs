//! 客户信息与佣金
//!
//! 客户信息只有两个可选字段；佣金以最小货币单位精确换算，不经过浮点数

use crate::error::ConfigError;
use serde::{Deserialize, Deserializer, Serialize};

/// 客户信息
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientInfo {
    #[serde(default, deserialize_with = "non_blank")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "non_blank")]
    pub offer_id: Option<String>,
}

impl ClientInfo {
    /// 从 JSON 文本解析客户信息
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(ConfigError::InvalidClient)
    }

    /// 从两个独立字段构建
    pub fn new(name: Option<String>, offer_id: Option<String>) -> Self {
        Self {
            name: clean(name),
            offer_id: clean(offer_id),
        }
    }

    pub fn name_or_empty(&self) -> &str {
        self.name.as_deref().unwrap_or_default()
    }

    pub fn offer_id_or_empty(&self) -> &str {
        self.offer_id.as_deref().unwrap_or_default()
    }
}

fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn non_blank<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(clean(Option::<String>::deserialize(deserializer)?))
}

/// 佣金
///
/// `input` 保留操作员输入的原始文本（导出时原样回写），`minor` 为最小货币单位
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commission {
    pub input: String,
    pub minor: i64,
}

impl Commission {
    /// 解析主单位的十进制文本，例如 `"2.5"` → 250
    ///
    /// 空文本视为 0；小数位最多两位
    pub fn parse(input: &str) -> Result<Self, ConfigError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Ok(Self {
                input: String::new(),
                minor: 0,
            });
        }

        let invalid = || ConfigError::InvalidCommission(trimmed.to_string());

        let (negative, digits) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };
        let (whole, fraction) = digits.split_once('.').unwrap_or((digits, ""));

        if whole.is_empty() && fraction.is_empty() {
            return Err(invalid());
        }
        if fraction.len() > 2
            || !whole.chars().all(|c| c.is_ascii_digit())
            || !fraction.chars().all(|c| c.is_ascii_digit())
        {
            return Err(invalid());
        }

        let whole: i64 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| invalid())?
        };
        let fraction: i64 = format!("{:0<2}", fraction).parse().map_err(|_| invalid())?;

        let minor = whole
            .checked_mul(100)
            .and_then(|v| v.checked_add(fraction))
            .ok_or_else(invalid)?;

        Ok(Self {
            input: trimmed.to_string(),
            minor: if negative { -minor } else { minor },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_from_json_blank_fields() {
        let client = ClientInfo::from_json(r#"{"name":"Acme","offer_id":"  "}"#).unwrap();
        assert_eq!(client.name.as_deref(), Some("Acme"));
        assert_eq!(client.offer_id, None);
        assert_eq!(client.offer_id_or_empty(), "");
    }

    #[test]
    fn test_client_from_json_rejects_wrong_types() {
        assert!(ClientInfo::from_json(r#"{"name":42}"#).is_err());
    }

    #[test]
    fn test_client_ignores_extra_fields() {
        let client =
            ClientInfo::from_json(r#"{"name":"Acme","offer_id":"offer_1","region":"IN"}"#).unwrap();
        assert_eq!(client.offer_id.as_deref(), Some("offer_1"));
    }

    #[test]
    fn test_commission_exact_minor_units() {
        assert_eq!(Commission::parse("2.5").unwrap().minor, 250);
        assert_eq!(Commission::parse("2.3").unwrap().minor, 230);
        assert_eq!(Commission::parse("10").unwrap().minor, 1000);
        assert_eq!(Commission::parse(".75").unwrap().minor, 75);
        assert_eq!(Commission::parse("").unwrap().minor, 0);
        assert_eq!(Commission::parse("12.34").unwrap().minor, 1234);
    }

    #[test]
    fn test_commission_rejects_garbage() {
        assert!(Commission::parse("abc").is_err());
        assert!(Commission::parse("1.234").is_err());
        assert!(Commission::parse(".").is_err());
    }
}
