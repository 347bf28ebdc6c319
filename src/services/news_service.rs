use serde_json::Value;

use crate::models::news::NewsItem;

/// 东方财富个股新闻（搜索API，JSONP）
pub fn stock_news_url(base: &str, keyword: &str, page_size: usize) -> String {
    let param = serde_json::json!({
        "uid": "",
        "keyword": keyword,
        "type": ["cmsArticleWebOld"],
        "client": "web",
        "clientType": "web",
        "clientVersion": "curr",
        "param": {
            "cmsArticleWebOld": {
                "searchScope": "default",
                "sort": "default",
                "pageIndex": 1,
                "pageSize": page_size,
                "preTag": "",
                "postTag": ""
            }
        }
    });

    let param_str = urlencoding::encode(&param.to_string()).to_string();
    format!("{}/search/jsonp?cb=jQuery&param={}", base, param_str)
}

/// 解析搜索结果；没有文章时返回空列表
pub fn parse_stock_news(json: &Value) -> Vec<NewsItem> {
    let Some(articles) = json["result"]["cmsArticleWebOld"].as_array() else {
        return Vec::new();
    };

    articles
        .iter()
        .map(|art| {
            let text = |key: &str| art[key].as_str().unwrap_or("").to_string();
            NewsItem {
                id: format!("sn_{}", text("code")),
                title: strip_highlight(&text("title")),
                summary: strip_highlight(&text("content")),
                source: text("mediaName"),
                publish_time: text("date"),
                url: text("url"),
            }
        })
        .filter(|n| !n.title.is_empty())
        .collect()
}

/// 搜索接口会用 <em> 标出关键词
fn strip_highlight(s: &str) -> String {
    s.replace("<em>", "").replace("</em>", "")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_news_url_encodes_param() {
        let url = stock_news_url("https://search-api-web.eastmoney.com", "600519", 10);
        assert!(url.starts_with("https://search-api-web.eastmoney.com/search/jsonp?cb=jQuery&param=%7B"));
        assert!(url.contains("600519"));
    }

    #[test]
    fn test_parse_stock_news() {
        let body = json!({
            "code": 0,
            "result": {
                "cmsArticleWebOld": [
                    {
                        "code": "202406283117",
                        "title": "<em>贵州茅台</em>：2023年度分红实施",
                        "content": "公司发布权益分派实施公告",
                        "date": "2024-06-28 18:02:11",
                        "mediaName": "证券时报",
                        "url": "http://finance.eastmoney.com/a/202406283117.html"
                    },
                    {"code": "x", "title": "", "content": "", "date": "", "mediaName": "", "url": ""}
                ]
            }
        });
        let items = parse_stock_news(&body);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "贵州茅台：2023年度分红实施");
        assert_eq!(items[0].id, "sn_202406283117");
        assert_eq!(items[0].source, "证券时报");
    }

    #[test]
    fn test_parse_no_result() {
        assert!(parse_stock_news(&json!({"result": null})).is_empty());
    }
}
