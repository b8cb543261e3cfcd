//! 评分服务 - 业务能力层
//!
//! 只负责"把提示词交给模型并拿回结构化评分"，不关心台账和流程
//!
//! ## 技术栈
//! - 使用 `async-openai` crate 进行 API 调用
//! - 托管 API 与本地兼容服务（LM Studio）共用同一套客户端
//! - 不使用 `response_format`，从返回文本中解析 JSON

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::GradingError;
use crate::models::GradingResult;

const HOSTED_SYSTEM_MESSAGE: &str = "You are a grading assistant for Swift assignments.";

const LOCAL_SYSTEM_MESSAGE: &str = "You are a grading assistant for Swift assignments. \
You must respond ONLY with valid JSON. Do not include any explanatory text before or after the JSON.";

/// 评分服务
///
/// 输入是已经注入学生代码的完整提示词，输出是解析好的评分结果。
/// 返回格式不完整视为该学生评分失败。
#[async_trait]
pub trait GradingService: Send + Sync {
    /// 使用的模型名称（日志用）
    fn model_name(&self) -> &str;

    async fn grade(&self, student_key: &str, prompt: &str) -> Result<GradingResult, GradingError>;
}

/// 基于 OpenAI 协议的评分服务
pub struct OpenAiGrader {
    client: Client<OpenAIConfig>,
    model_name: String,
    /// 本地模型不需要密钥，托管 API 缺少密钥时在评分时报错
    api_key_missing: bool,
    local: bool,
}

impl OpenAiGrader {
    /// 按配置创建评分服务
    pub fn new(config: &Config) -> Self {
        if config.use_local_model {
            let openai_config = OpenAIConfig::new()
                .with_api_key("lm-studio")
                .with_api_base(&config.local_model_endpoint);
            info!(
                "🖥  使用本地模型: {} ({})",
                config.local_model_name, config.local_model_endpoint
            );
            return Self {
                client: Client::with_config(openai_config),
                model_name: config.local_model_name.clone(),
                api_key_missing: false,
                local: true,
            };
        }

        let api_key = config.openai_api_key.clone().unwrap_or_default();
        let openai_config = OpenAIConfig::new()
            .with_api_key(&api_key)
            .with_api_base(&config.openai_api_base);
        info!("☁  使用 OpenAI 模型: {}", config.openai_model);

        Self {
            client: Client::with_config(openai_config),
            model_name: config.openai_model.clone(),
            api_key_missing: api_key.trim().is_empty(),
            local: false,
        }
    }

    /// 通用的模型调用，返回模型输出的原始文本
    async fn send_to_llm(&self, user_message: &str) -> Result<String, GradingError> {
        debug!("调用评分 API，模型: {}", self.model_name);
        debug!("提示词长度: {} 字符", user_message.len());

        let system_message = if self.local {
            LOCAL_SYSTEM_MESSAGE
        } else {
            HOSTED_SYSTEM_MESSAGE
        };

        let messages = vec![
            ChatCompletionRequestMessage::System(
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(system_message)
                    .build()
                    .map_err(|e| self.api_error(e))?,
            ),
            ChatCompletionRequestMessage::User(
                ChatCompletionRequestUserMessageArgs::default()
                    .content(user_message)
                    .build()
                    .map_err(|e| self.api_error(e))?,
            ),
        ];

        let mut builder = CreateChatCompletionRequestArgs::default();
        builder.model(&self.model_name).messages(messages);
        if self.local {
            builder.temperature(0.0_f32);
        }
        let request = builder.build().map_err(|e| self.api_error(e))?;

        let response = self.client.chat().create(request).await.map_err(|e| {
            warn!("评分 API 调用失败: {}", e);
            self.api_error(e)
        })?;

        debug!("评分 API 调用成功");

        response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or_else(|| GradingError::EmptyContent {
                model: self.model_name.clone(),
            })
    }

    fn api_error(&self, e: impl std::fmt::Display) -> GradingError {
        let message = if self.local {
            format!("{} (请确认 LM Studio 服务已启动并加载模型)", e)
        } else {
            e.to_string()
        };
        GradingError::ApiCallFailed {
            model: self.model_name.clone(),
            message,
        }
    }
}

#[async_trait]
impl GradingService for OpenAiGrader {
    fn model_name(&self) -> &str {
        &self.model_name
    }

    async fn grade(&self, student_key: &str, prompt: &str) -> Result<GradingResult, GradingError> {
        if self.api_key_missing {
            return Err(GradingError::MissingApiKey {
                var_name: "OPENAI_API_KEY".to_string(),
            });
        }

        if self.local {
            info!("  🤖 {} 评分中 (本地思考模型可能需要 1-3 分钟)...", student_key);
        } else {
            info!("  🤖 {} 评分中...", student_key);
        }

        let content = self.send_to_llm(prompt).await?;
        GradingResult::from_response(strip_reasoning(&content))
    }
}

/// 去掉思考模型输出的 `<think>...</think>` 段落
fn strip_reasoning(content: &str) -> &str {
    match content.rfind("</think>") {
        Some(end) => content[end + "</think>".len()..].trim(),
        None => content.trim(),
    }
}
