use encoding_rs::GB18030;

/// 腾讯行情接口返回 GBK 编码
pub fn gb18030_to_utf8(bytes: &[u8]) -> String {
    let (cow, _, _) = GB18030.decode(bytes);
    cow.into_owned()
}

/// 去掉 JSONP 包装: `jQuery(...)` / `datatable123(...);`，非 JSONP 原样返回
pub fn strip_jsonp(text: &str) -> &str {
    let trimmed = text.trim();
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        return trimmed;
    }
    match (trimmed.find('('), trimmed.rfind(')')) {
        (Some(start), Some(end)) if start < end => &trimmed[start + 1..end],
        _ => trimmed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_jsonp() {
        assert_eq!(strip_jsonp(r#"jQuery({"a":1});"#), r#"{"a":1}"#);
        assert_eq!(strip_jsonp(r#"datatable123({"b":"(x)"})"#), r#"{"b":"(x)"}"#);
        assert_eq!(strip_jsonp(r#" {"c":2} "#), r#"{"c":2}"#);
    }

    #[test]
    fn test_gb18030_decode() {
        // "贵州茅台" 的 GBK 编码
        let bytes = [0xB9, 0xF3, 0xD6, 0xDD, 0xC3, 0xA9, 0xCC, 0xA8];
        assert_eq!(gb18030_to_utf8(&bytes), "贵州茅台");
    }
}
