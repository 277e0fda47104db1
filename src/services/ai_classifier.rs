//! 内容分类服务 - 业务能力层
//!
//! 先调用远程分类服务，任何失败（超时、网络错误、非 2xx、响应无法解析、
//! 未知标签）都会降级为本地关键词规则。调用方总能拿到一个分类，
//! 通过 `ClassifyOutcome` 区分是远程结果还是降级结果。

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::RemoteClassifierError;
use crate::models::{OTHER_LABEL, PREDEFINED_CATEGORIES, UNCLASSIFIED};

/// 标题最大字符数
const MAX_TITLE_CHARS: usize = 100;

/// 远程响应体上限
const MAX_REPLY_BYTES: usize = 1 << 20;

/// 本地规则：分类 → 内容中的标志词（中英文）
const CONTENT_MARKERS: &[(&str, &[&str])] = &[
    ("合同", &["合同", "agreement"]),
    ("简历", &["简历", "resume"]),
    ("发票", &["发票", "invoice"]),
    ("论文", &["论文", "thesis", "paper"]),
];

/// 内容分类结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassifyOutcome {
    /// 远程服务给出了可信的分类
    Success(String),
    /// 远程调用失败，使用了本地规则
    Degraded {
        category: String,
        reason: RemoteClassifierError,
    },
}

impl ClassifyOutcome {
    pub fn category(&self) -> &str {
        match self {
            ClassifyOutcome::Success(category) => category,
            ClassifyOutcome::Degraded { category, .. } => category,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, ClassifyOutcome::Degraded { .. })
    }

    fn degraded(category: impl Into<String>, reason: RemoteClassifierError) -> Self {
        ClassifyOutcome::Degraded {
            category: category.into(),
            reason,
        }
    }
}

#[derive(Debug, Serialize)]
struct ClassifyRequest<'a> {
    uid: &'a str,
    stream: bool,
    function_code: &'static str,
    function_parameters: FunctionParams<'a>,
    sec_text: SecText,
}

#[derive(Debug, Serialize)]
struct FunctionParams<'a> {
    title: &'a str,
    content: &'a str,
    candidate_tag_list: String,
}

#[derive(Debug, Serialize)]
struct SecText {
    from: &'static str,
    scene: &'static str,
}

/// 远程服务的外层响应，只关心 `reply`
#[derive(Debug, Deserialize)]
struct ClassifyResponse {
    reply: String,
    #[serde(default)]
    model: Option<String>,
}

/// `reply` 中携带的结构化分类结果
#[derive(Debug, Deserialize)]
struct ReplyResult {
    category: String,
    #[serde(default)]
    confidence: f64,
    #[serde(default)]
    reason: String,
}

/// 内容分类服务
///
/// 职责：
/// - 调用远程分类接口（带超时）
/// - 远程不可用时降级为本地规则
/// - 永远不向调用方返回错误
pub struct AiClassifier {
    client: reqwest::Client,
    api_url: String,
    api_token: String,
    uid: String,
    intention_code: String,
    product_name: String,
    timeout: Duration,
}

impl AiClassifier {
    pub fn new(config: &Config) -> Result<Self, RemoteClassifierError> {
        let client = reqwest::Client::builder()
            .timeout(config.ai_timeout())
            .build()
            .map_err(|e| RemoteClassifierError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            api_url: config.ai_api_url.trim().to_string(),
            api_token: config.ai_api_token.clone(),
            uid: config.ai_uid.clone(),
            intention_code: config.ai_intention_code.clone(),
            product_name: config.ai_product_name.clone(),
            timeout: config.ai_timeout(),
        })
    }

    pub fn is_enabled(&self) -> bool {
        !self.api_url.is_empty()
    }

    /// 根据文件名和提取到的内容分类
    ///
    /// 内容为空时用文件名代替内容发送。
    pub async fn classify(
        &self,
        filename: &str,
        content: &str,
        cancel: &CancellationToken,
    ) -> ClassifyOutcome {
        let title = title_from_filename(filename);
        let content = if content.trim().is_empty() {
            filename
        } else {
            content
        };

        if !self.is_enabled() {
            return ClassifyOutcome::degraded(
                local_heuristic(content),
                RemoteClassifierError::Disabled,
            );
        }

        let result = tokio::select! {
            _ = cancel.cancelled() => Err(RemoteClassifierError::Cancelled),
            result = self.request(&title, content) => result,
        };

        let outcome = match result {
            Ok(outcome) => outcome,
            Err(reason) => ClassifyOutcome::degraded(local_heuristic(content), reason),
        };

        if let ClassifyOutcome::Degraded { category, reason } = &outcome {
            warn!("远程分类降级: {} -> {} ({})", title, category, reason);
        }
        outcome
    }

    async fn request(
        &self,
        title: &str,
        content: &str,
    ) -> Result<ClassifyOutcome, RemoteClassifierError> {
        let body = ClassifyRequest {
            uid: &self.uid,
            stream: false,
            function_code: "doc_classify",
            function_parameters: FunctionParams {
                title,
                content,
                candidate_tag_list: candidate_tag_list(),
            },
            sec_text: SecText {
                from: "AI_WPS_VIP",
                scene: "ai_autolabel",
            },
        };

        debug!(
            "调用远程分类: {} (内容 {} 字符, 超时 {:?})",
            title,
            content.chars().count(),
            self.timeout
        );

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_token)
            .header("Client-Request-Id", uuid::Uuid::new_v4().to_string())
            .header("Ai-Gateway-Intention-Code", &self.intention_code)
            .header("Ai-Gateway-Product-Name", &self.product_name)
            .json(&body)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        let text = read_body_capped(response, MAX_REPLY_BYTES).await?;
        if !status.is_success() {
            return Err(RemoteClassifierError::BadStatus {
                status: status.as_u16(),
                body: preview(&text),
            });
        }

        let envelope: ClassifyResponse = serde_json::from_str(&text)
            .map_err(|e| RemoteClassifierError::UnparsableReply(e.to_string()))?;
        if let Some(model) = &envelope.model {
            debug!("远程分类模型: {}", model);
        }

        Ok(interpret_reply(title, &envelope.reply, content))
    }
}

/// 分块读取响应体，超过上限立即放弃
async fn read_body_capped(
    mut response: reqwest::Response,
    limit: usize,
) -> Result<String, RemoteClassifierError> {
    if response.content_length().is_some_and(|len| len > limit as u64) {
        return Err(RemoteClassifierError::ReplyTooLarge { limit });
    }

    let mut body = Vec::new();
    while let Some(chunk) = response.chunk().await.map_err(map_reqwest_error)? {
        if body.len() + chunk.len() > limit {
            return Err(RemoteClassifierError::ReplyTooLarge { limit });
        }
        body.extend_from_slice(&chunk);
    }
    Ok(String::from_utf8_lossy(&body).into_owned())
}

/// 解释远程服务的 `reply` 字段
fn interpret_reply(title: &str, reply: &str, content: &str) -> ClassifyOutcome {
    let parsed: Result<ReplyResult, _> = serde_json::from_str(strip_code_fence(reply));
    let result = match parsed {
        Ok(result) => result,
        Err(_) => {
            let reason = RemoteClassifierError::UnparsableReply(preview(reply));
            let category = PREDEFINED_CATEGORIES
                .iter()
                .map(|(name, _)| *name)
                .find(|name| reply.contains(name))
                .unwrap_or_else(|| local_heuristic(content));
            return ClassifyOutcome::degraded(category, reason);
        }
    };

    info!(
        "远程分类结果: {} -> {} (置信度: {:.2}, 原因: {})",
        title, result.category, result.confidence, result.reason
    );

    let label = result.category.trim();
    if PREDEFINED_CATEGORIES.iter().any(|(name, _)| *name == label) {
        ClassifyOutcome::Success(label.to_string())
    } else if label == OTHER_LABEL {
        ClassifyOutcome::Success(UNCLASSIFIED.to_string())
    } else {
        ClassifyOutcome::degraded(
            local_heuristic(content),
            RemoteClassifierError::UnrecognizedLabel(label.to_string()),
        )
    }
}

/// 本地规则：在小写内容中查找各分类的标志词
pub fn local_heuristic(content: &str) -> &'static str {
    let lower = content.to_lowercase();
    CONTENT_MARKERS
        .iter()
        .find(|(_, markers)| markers.iter().any(|m| lower.contains(m)))
        .map(|(category, _)| *category)
        .unwrap_or(UNCLASSIFIED)
}

/// 去掉扩展名并限制长度
pub fn title_from_filename(filename: &str) -> String {
    let stem = match filename.rfind('.') {
        Some(idx) if idx > 0 => &filename[..idx],
        _ => filename,
    };
    stem.chars().take(MAX_TITLE_CHARS).collect()
}

fn candidate_tag_list() -> String {
    PREDEFINED_CATEGORIES
        .iter()
        .map(|(name, _)| *name)
        .chain(std::iter::once(OTHER_LABEL))
        .map(|name| format!("'{}'", name))
        .collect::<Vec<_>>()
        .join(", ")
}

fn strip_code_fence(reply: &str) -> &str {
    let trimmed = reply.trim();
    trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .map(str::trim)
        .unwrap_or(trimmed)
}

fn map_reqwest_error(err: reqwest::Error) -> RemoteClassifierError {
    if err.is_timeout() {
        RemoteClassifierError::Timeout
    } else {
        RemoteClassifierError::Transport(err.to_string())
    }
}

fn preview(text: &str) -> String {
    const MAX: usize = 200;
    if text.chars().count() > MAX {
        text.chars().take(MAX).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    use super::*;

    /// 读完一个 HTTP 请求（头 + Content-Length 指定的正文）
    async fn read_request(stream: &mut TcpStream) {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = stream.read(&mut chunk).await.unwrap();
            if n == 0 {
                return;
            }
            buf.extend_from_slice(&chunk[..n]);
            let Some(header_end) = buf.windows(4).position(|w| w == b"\r\n\r\n") else {
                continue;
            };
            let headers = String::from_utf8_lossy(&buf[..header_end]).to_lowercase();
            let content_length = headers
                .lines()
                .find_map(|l| l.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if buf.len() >= header_end + 4 + content_length {
                return;
            }
        }
    }

    /// 启动一个只回复固定内容的 HTTP 服务
    async fn serve(status: u16, body: impl Into<String>) -> String {
        let body = body.into();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((mut stream, _)) = listener.accept().await {
                read_request(&mut stream).await;
                let response = format!(
                    "HTTP/1.1 {} X\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                let _ = stream.write_all(response.as_bytes()).await;
                let _ = stream.shutdown().await;
            }
        });
        format!("http://{}/api/v2/aigc/completions", addr)
    }

    /// 不带 Content-Length，写完正文后关闭连接
    async fn serve_unsized(body: String) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((mut stream, _)) = listener.accept().await {
                read_request(&mut stream).await;
                let head = "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nConnection: close\r\n\r\n";
                let _ = stream.write_all(head.as_bytes()).await;
                let _ = stream.write_all(body.as_bytes()).await;
                let _ = stream.shutdown().await;
            }
        });
        format!("http://{}/", addr)
    }

    /// 只接收连接、永不回复
    async fn serve_hanging() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((stream, _)) = listener.accept().await {
                held.push(stream);
            }
        });
        format!("http://{}/", addr)
    }

    async fn closed_port_url() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        format!("http://{}/", addr)
    }

    fn classifier(url: &str, timeout_ms: u64) -> AiClassifier {
        let config = Config {
            ai_api_url: url.to_string(),
            ai_timeout_ms: timeout_ms,
            ..Config::default()
        };
        AiClassifier::new(&config).unwrap()
    }

    #[test]
    fn test_local_heuristic() {
        assert_eq!(local_heuristic("This AGREEMENT is made"), "合同");
        assert_eq!(local_heuristic("个人简历"), "简历");
        assert_eq!(local_heuristic("Invoice #42"), "发票");
        assert_eq!(local_heuristic("a short paper on rust"), "论文");
        assert_eq!(local_heuristic("nothing here"), UNCLASSIFIED);
        assert_eq!(local_heuristic(""), UNCLASSIFIED);
    }

    #[test]
    fn test_title_from_filename() {
        assert_eq!(title_from_filename("合同_2024.pdf"), "合同_2024");
        assert_eq!(title_from_filename(".bashrc"), ".bashrc");
        assert_eq!(title_from_filename("noext"), "noext");
        let long = format!("{}.txt", "长".repeat(150));
        assert_eq!(title_from_filename(&long).chars().count(), MAX_TITLE_CHARS);
    }

    #[test]
    fn test_candidate_tag_list() {
        assert_eq!(
            candidate_tag_list(),
            "'合同', '简历', '发票', '论文', '其它分类'"
        );
    }

    #[test]
    fn test_interpret_reply_branches() {
        let ok = interpret_reply("t", r#"{"category":"发票","confidence":0.9,"reason":"x"}"#, "");
        assert_eq!(ok, ClassifyOutcome::Success("发票".to_string()));

        let other = interpret_reply("t", r#"{"category":"其它分类"}"#, "合同");
        assert_eq!(other, ClassifyOutcome::Success(UNCLASSIFIED.to_string()));

        let unknown = interpret_reply("t", r#"{"category":"菜谱"}"#, "resume of alice");
        assert_eq!(
            unknown,
            ClassifyOutcome::Degraded {
                category: "简历".to_string(),
                reason: RemoteClassifierError::UnrecognizedLabel("菜谱".to_string()),
            }
        );

        let fenced = interpret_reply("t", "```json\n{\"category\":\"论文\"}\n```", "");
        assert_eq!(fenced, ClassifyOutcome::Success("论文".to_string()));
    }

    #[test]
    fn test_interpret_unstructured_reply_salvages_category_name() {
        let outcome = interpret_reply("t", "我认为这是一份合同", "invoice");
        assert!(outcome.is_degraded());
        assert_eq!(outcome.category(), "合同");

        let outcome = interpret_reply("t", "无法判断", "invoice");
        assert_eq!(outcome.category(), "发票");
    }

    #[tokio::test]
    async fn test_remote_success() {
        let url = serve(
            200,
            r#"{"event":"done","reply":"{\"category\":\"简历\",\"confidence\":0.8,\"reason\":\"r\"}"}"#,
        )
        .await;
        let outcome = classifier(&url, 5_000)
            .classify("x.txt", "随便", &CancellationToken::new())
            .await;
        assert_eq!(outcome, ClassifyOutcome::Success("简历".to_string()));
    }

    #[tokio::test]
    async fn test_bad_status_degrades() {
        let url = serve(500, r#"{"error":"boom"}"#).await;
        let outcome = classifier(&url, 5_000)
            .classify("x.txt", "invoice total", &CancellationToken::new())
            .await;
        assert_eq!(outcome.category(), "发票");
        assert!(matches!(
            outcome,
            ClassifyOutcome::Degraded {
                reason: RemoteClassifierError::BadStatus { status: 500, .. },
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_oversized_reply_degrades() {
        let padding = " ".repeat(MAX_REPLY_BYTES + 1);
        for url in [
            serve(200, format!("{{\"reply\":\"合同\"}}{}", padding)).await,
            serve_unsized(format!("{}{{\"reply\":\"合同\"}}", padding)).await,
        ] {
            let outcome = classifier(&url, 5_000)
                .classify("x.txt", "Invoice #42", &CancellationToken::new())
                .await;
            assert_eq!(outcome.category(), "发票");
            assert_eq!(
                outcome,
                ClassifyOutcome::Degraded {
                    category: "发票".to_string(),
                    reason: RemoteClassifierError::ReplyTooLarge {
                        limit: MAX_REPLY_BYTES
                    },
                }
            );
        }
    }

    #[tokio::test]
    async fn test_malformed_body_degrades() {
        let url = serve(200, "<html>not json</html>").await;
        let outcome = classifier(&url, 5_000)
            .classify("x.txt", "nothing", &CancellationToken::new())
            .await;
        assert_eq!(outcome.category(), UNCLASSIFIED);
        assert!(matches!(
            outcome,
            ClassifyOutcome::Degraded {
                reason: RemoteClassifierError::UnparsableReply(_),
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_timeout_degrades() {
        let url = serve_hanging().await;
        let outcome = classifier(&url, 200)
            .classify("x.txt", "thesis draft", &CancellationToken::new())
            .await;
        assert_eq!(
            outcome,
            ClassifyOutcome::Degraded {
                category: "论文".to_string(),
                reason: RemoteClassifierError::Timeout,
            }
        );
    }

    #[tokio::test]
    async fn test_unreachable_degrades() {
        let url = closed_port_url().await;
        let outcome = classifier(&url, 2_000)
            .classify("简历.bin", "", &CancellationToken::new())
            .await;
        // 内容为空时使用文件名做本地判断
        assert_eq!(outcome.category(), "简历");
        assert!(matches!(
            outcome,
            ClassifyOutcome::Degraded {
                reason: RemoteClassifierError::Transport(_),
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_disabled_and_cancelled() {
        let outcome = classifier("", 1_000)
            .classify("x.txt", "agreement", &CancellationToken::new())
            .await;
        assert_eq!(
            outcome,
            ClassifyOutcome::Degraded {
                category: "合同".to_string(),
                reason: RemoteClassifierError::Disabled,
            }
        );

        let url = serve_hanging().await;
        let cancel = CancellationToken::new();
        cancel.cancel();
        let outcome = classifier(&url, 30_000)
            .classify("x.txt", "nothing", &cancel)
            .await;
        assert!(matches!(
            outcome,
            ClassifyOutcome::Degraded {
                reason: RemoteClassifierError::Cancelled,
                ..
            }
        ));
    }
}
