//! 模型响应解码
//!
//! 模型返回的 JSON 经常包裹在 Markdown 代码块里，或前后夹杂说明文字。
//! 这里先截取 JSON 主体再做类型化解析，失败时返回 [`Decoded::Fallback`]。

use serde::de::DeserializeOwned;
use tracing::warn;

/// 解码结果
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded<T> {
    /// 解析成功
    Parsed(T),
    /// 解析失败，附带原因
    Fallback(String),
}

impl<T> Decoded<T> {
    pub fn is_parsed(&self) -> bool {
        matches!(self, Decoded::Parsed(_))
    }

    /// 取出结果，失败时使用给定的兜底值
    pub fn unwrap_or(self, fallback: T) -> T {
        match self {
            Decoded::Parsed(value) => value,
            Decoded::Fallback(_) => fallback,
        }
    }

    pub fn ok(self) -> Option<T> {
        match self {
            Decoded::Parsed(value) => Some(value),
            Decoded::Fallback(_) => None,
        }
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Decoded<U> {
        match self {
            Decoded::Parsed(value) => Decoded::Parsed(f(value)),
            Decoded::Fallback(reason) => Decoded::Fallback(reason),
        }
    }
}

impl<T: Default> Decoded<T> {
    pub fn unwrap_or_default(self) -> T {
        self.unwrap_or(T::default())
    }
}

/// 删除 ```json 与 ``` 代码块标记（不区分大小写）
fn strip_fences(text: &str) -> String {
    const OPEN: &str = "```json";

    let lower = text.to_ascii_lowercase();
    let mut out = String::with_capacity(text.len());
    let mut pos = 0;
    while let Some(offset) = lower[pos..].find(OPEN) {
        out.push_str(&text[pos..pos + offset]);
        pos += offset + OPEN.len();
    }
    out.push_str(&text[pos..]);

    out.replace("```", "")
}

/// 截取响应中的 JSON 主体
///
/// 以最先出现的 `{` 或 `[` 为起点，到最后一个对应的闭合符号为止；
/// 找不到时返回去掉代码块标记后的整段文本。
pub fn extract_json(text: &str) -> String {
    let cleaned = strip_fences(text);
    let cleaned = cleaned.trim();

    let (open, close) = match (cleaned.find('{'), cleaned.find('[')) {
        (Some(brace), Some(bracket)) if bracket < brace => (bracket, ']'),
        (Some(brace), _) => (brace, '}'),
        (None, Some(bracket)) => (bracket, ']'),
        (None, None) => return cleaned.to_string(),
    };

    match cleaned.rfind(close) {
        Some(end) if end > open => cleaned[open..=end].to_string(),
        _ => cleaned.to_string(),
    }
}

/// 截取并解析 JSON
pub fn decode_json<T: DeserializeOwned>(text: &str) -> Decoded<T> {
    if text.trim().is_empty() {
        return Decoded::Fallback("空响应".to_string());
    }

    let body = extract_json(text);
    match serde_json::from_str(&body) {
        Ok(value) => Decoded::Parsed(value),
        Err(e) => {
            warn!(error = %e, "模型响应解析失败，使用兜底值");
            Decoded::Fallback(e.to_string())
        }
    }
}
