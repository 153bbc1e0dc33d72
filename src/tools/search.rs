//! search_web 工具：调用配置的搜索端点，域名白名单、超时、结果大小限制
//!
//! 查询词作为 URL 参数编码后 GET；仅允许白名单内的域名（端点本身也须在白名单内）；
//! 对 HTML 响应使用 html2text 提取可读文本；超过 max_result_chars 时截断并追加 ...[truncated]。

use std::collections::HashSet;

use async_trait::async_trait;
use html2text::from_read;
use reqwest::{Client, Url};
use serde_json::Value;

use crate::config::SearchSection;
use crate::tools::{ArgKind, ArgSpec, Tool};

pub struct SearchWebTool {
    client: Client,
    endpoint: String,
    query_param: String,
    allowed_domains: HashSet<String>,
    max_result_chars: usize,
}

/// 简易去除 HTML 标签（html2text 失败时的回退）
fn strip_html_tags(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// 判断内容是否像 HTML（需提取可读文本）
fn looks_like_html(s: &str) -> bool {
    let s = s.trim_start();
    s.starts_with("<!")
        || s.starts_with("<html")
        || s.starts_with("<HTML")
        || (s.len() > 20 && s.contains('<') && (s.contains("</") || s.contains("<head")))
}

fn truncate_chars(body: String, max_chars: usize) -> String {
    if body.chars().count() > max_chars {
        body.chars().take(max_chars).collect::<String>() + "\n...[truncated]"
    } else {
        body
    }
}

impl SearchWebTool {
    pub fn new(cfg: &SearchSection) -> Self {
        const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(cfg.timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_default();
        Self {
            client,
            endpoint: cfg.endpoint.clone(),
            query_param: cfg.query_param.clone(),
            allowed_domains: cfg
                .allowed_domains
                .iter()
                .map(|s| s.to_lowercase())
                .collect(),
            max_result_chars: cfg.max_result_chars,
        }
    }

    fn build_url(&self, query: &str) -> Result<Url, String> {
        let url = Url::parse_with_params(&self.endpoint, &[(self.query_param.as_str(), query)])
            .map_err(|e| format!("Invalid search endpoint: {}", e))?;
        let host = url
            .host_str()
            .map(str::to_lowercase)
            .ok_or_else(|| "Search endpoint has no host".to_string())?;
        if !self.allowed_domains.contains(&host) {
            return Err(format!("Domain not in allowlist: {}", host));
        }
        Ok(url)
    }

    fn html_to_text(&self, html: &str) -> String {
        match from_read(html.as_bytes(), 120) {
            Ok(text) if !text.trim().is_empty() => text,
            _ => strip_html_tags(html),
        }
    }
}

#[async_trait]
impl Tool for SearchWebTool {
    fn name(&self) -> &str {
        "search_web"
    }

    fn description(&self) -> &str {
        "Search the web and return the readable text of the result page."
    }

    fn args_schema(&self) -> Vec<ArgSpec> {
        vec![ArgSpec::required("query", ArgKind::String, "Search query")]
    }

    async fn execute(&self, args: Value) -> Result<String, String> {
        let query = args
            .get("query")
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .trim();
        if query.is_empty() {
            return Err("Empty query".to_string());
        }
        let url = self.build_url(query)?;
        tracing::info!(url = %url, "search_web fetch");

        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| format!("Request failed: {}", e))?;
        if !resp.status().is_success() {
            return Err(format!("HTTP {}", resp.status()));
        }
        let body = resp
            .text()
            .await
            .map_err(|e| format!("Read body: {}", e))?;
        let body = body.trim_start_matches('\u{FEFF}');

        let text = if looks_like_html(body) {
            self.html_to_text(body)
        } else {
            body.to_string()
        };
        Ok(truncate_chars(text, self.max_result_chars))
    }
}
