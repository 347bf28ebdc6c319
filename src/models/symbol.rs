use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ResearchError;

/// 交易所
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Market {
    #[serde(rename = "sh")]
    Sh,
    #[serde(rename = "sz")]
    Sz,
    #[serde(rename = "hk")]
    Hk,
}

impl Market {
    pub fn as_str(&self) -> &'static str {
        match self {
            Market::Sh => "sh",
            Market::Sz => "sz",
            Market::Hk => "hk",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Market::Sh => "上交所",
            Market::Sz => "深交所",
            Market::Hk => "港交所",
        }
    }

    /// 沪深A股（北向资金、两融、龙虎榜等数据仅覆盖内地市场）
    pub fn is_mainland(&self) -> bool {
        matches!(self, Market::Sh | Market::Sz)
    }

    /// 东方财富 secid 市场前缀
    fn secid_prefix(&self) -> &'static str {
        match self {
            Market::Sh => "1",
            Market::Sz => "0",
            Market::Hk => "116",
        }
    }
}

impl fmt::Display for Market {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Market {
    type Err = ResearchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sh" | "sse" | "shanghai" => Ok(Market::Sh),
            "sz" | "szse" | "shenzhen" => Ok(Market::Sz),
            "hk" | "hkex" | "hongkong" => Ok(Market::Hk),
            other => Err(ResearchError::InvalidSymbol {
                symbol: other.to_string(),
                reason: "未知市场，可选 sh / sz / hk".to_string(),
            }),
        }
    }
}

/// 证券标识：代码 + 市场，创建时校验，之后不可变，作为所有数据维度的关联键
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Symbol {
    code: String,
    market: Market,
}

impl Symbol {
    /// 校验代码与市场的组合，非法组合在任何请求发出前被拒绝
    pub fn new(code: &str, market: Market) -> Result<Self, ResearchError> {
        let code = code.trim();
        let invalid = |reason: &str| ResearchError::InvalidSymbol {
            symbol: format!("{}{}", market.as_str(), code),
            reason: reason.to_string(),
        };

        if code.is_empty() || !code.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid("代码必须为纯数字"));
        }

        let code = match market {
            Market::Sh | Market::Sz => {
                if code.len() != 6 {
                    return Err(invalid("A股代码必须为6位数字"));
                }
                let first = code.as_bytes()[0];
                let ok = match market {
                    Market::Sh => matches!(first, b'6' | b'9'),
                    _ => matches!(first, b'0' | b'2' | b'3'),
                };
                if !ok {
                    return Err(invalid("代码前缀与交易所不匹配"));
                }
                code.to_string()
            }
            Market::Hk => {
                if code.len() > 5 {
                    return Err(invalid("港股代码最多5位数字"));
                }
                format!("{:0>5}", code)
            }
        };

        Ok(Self { code, market })
    }

    /// 解析用户输入：支持 `sh600519` / `hk00700` 前缀格式，或纯6位A股代码（按首位推断交易所）
    pub fn parse(input: &str, market: Option<Market>) -> Result<Self, ResearchError> {
        let raw = input.trim().to_lowercase();
        for prefix in ["sh", "sz", "hk"] {
            if let Some(rest) = raw.strip_prefix(prefix) {
                let prefixed: Market = prefix.parse()?;
                if let Some(explicit) = market {
                    if explicit != prefixed {
                        return Err(ResearchError::InvalidSymbol {
                            symbol: input.to_string(),
                            reason: format!("代码前缀 {} 与指定市场 {} 冲突", prefixed, explicit),
                        });
                    }
                }
                return Self::new(rest, prefixed);
            }
        }

        match market {
            Some(m) => Self::new(&raw, m),
            None => {
                let inferred = match raw.chars().next() {
                    Some('6') | Some('9') if raw.len() == 6 => Market::Sh,
                    Some('0') | Some('2') | Some('3') if raw.len() == 6 => Market::Sz,
                    _ => {
                        return Err(ResearchError::InvalidSymbol {
                            symbol: input.to_string(),
                            reason: "无法推断交易所，请通过 --market 指定".to_string(),
                        })
                    }
                };
                Self::new(&raw, inferred)
            }
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn market(&self) -> Market {
        self.market
    }

    /// 东方财富 secid，如 `1.600519` / `0.000001` / `116.00700`
    pub fn secid(&self) -> String {
        format!("{}.{}", self.market.secid_prefix(), self.code)
    }

    /// 带市场前缀的代码，如 `sh600519`（腾讯/新浪接口使用）
    pub fn prefixed(&self) -> String {
        format!("{}{}", self.market.as_str(), self.code)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.market, self.code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_prefixed_and_plain() {
        let s = Symbol::parse("SH600519", None).unwrap();
        assert_eq!(s.market(), Market::Sh);
        assert_eq!(s.code(), "600519");
        assert_eq!(s.secid(), "1.600519");

        let s = Symbol::parse("000001", None).unwrap();
        assert_eq!(s.market(), Market::Sz);
        assert_eq!(s.prefixed(), "sz000001");

        let s = Symbol::parse("700", Some(Market::Hk)).unwrap();
        assert_eq!(s.code(), "00700");
        assert_eq!(s.secid(), "116.00700");
    }

    #[test]
    fn test_reject_invalid_combinations() {
        // 沪市代码配深交所
        assert!(Symbol::new("600519", Market::Sz).is_err());
        // 深市代码配上交所
        assert!(Symbol::new("300750", Market::Sh).is_err());
        assert!(Symbol::new("60051", Market::Sh).is_err());
        assert!(Symbol::new("123456", Market::Hk).is_err());
        assert!(Symbol::new("abc", Market::Hk).is_err());
        // 前缀与显式市场冲突
        assert!(Symbol::parse("sh600519", Some(Market::Sz)).is_err());
        // 无法推断
        assert!(Symbol::parse("00700", None).is_err());
    }

    #[test]
    fn test_market_from_str() {
        assert_eq!("SZ".parse::<Market>().unwrap(), Market::Sz);
        assert!("us".parse::<Market>().is_err());
        assert!(Market::Sh.is_mainland());
        assert!(!Market::Hk.is_mainland());
    }
}
