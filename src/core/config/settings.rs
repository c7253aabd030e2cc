use super::parsing::{
    env_optional, env_or_default, is_supported_artifact_extension, parse_bool, parse_environment,
    parse_f64, parse_string_list, parse_u32, parse_u64,
};
use super::types::{
    AiSettings, AssignmentSettings, ConfigError, RuntimeSettings, S3Settings, Settings,
    TelemetrySettings, UploadSettings,
};

const DEFAULT_GRADING_PROMPT: &str = "Требуется провести подробную оценку работы студента. \
Обратите внимание на полноту раскрытия темы, аргументацию, структуру и логику изложения, \
достоверность информации и грамотность. После анализа выдайте результат в виде JSON-объекта \
с двумя ключами: \"score\" — число от 0 до 100, и \"comment\" — развернутое обоснование \
выставленной оценки с рекомендациями по улучшению.";

impl Settings {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment =
            parse_environment(env_optional("GRADEFLOW_ENV").or_else(|| env_optional("ENVIRONMENT")));
        let strict_config = env_optional("GRADEFLOW_STRICT_CONFIG")
            .map(|value| parse_bool(&value))
            .unwrap_or(false)
            || environment.is_production();

        let api_key = env_or_default("OPENAI_API_KEY", "");
        let base_url = env_or_default("OPENAI_BASE_URL", "");
        let model = env_or_default("AI_MODEL", "GigaChat-Lite");
        let max_tokens = parse_u32("AI_MAX_TOKENS", env_or_default("AI_MAX_TOKENS", "4000"))?;
        let temperature = parse_f64("AI_TEMPERATURE", env_or_default("AI_TEMPERATURE", "0.1"))?;
        let request_timeout =
            parse_u64("AI_REQUEST_TIMEOUT", env_or_default("AI_REQUEST_TIMEOUT", "600"))?;

        let s3_endpoint = env_or_default("S3_ENDPOINT", "https://storage.yandexcloud.net");
        let s3_access_key = env_or_default("S3_ACCESS_KEY", "");
        let s3_secret_key = env_or_default("S3_SECRET_KEY", "");
        let s3_bucket = env_or_default("S3_BUCKET", "gradeflow-artifacts");
        let s3_region = env_or_default("S3_REGION", "ru-central1");
        let presigned_url_expire_minutes = parse_u64(
            "PRESIGNED_URL_EXPIRE_MINUTES",
            env_or_default("PRESIGNED_URL_EXPIRE_MINUTES", "60"),
        )?;

        let max_upload_size_mb =
            parse_u64("MAX_UPLOAD_SIZE_MB", env_or_default("MAX_UPLOAD_SIZE_MB", "10"))?;
        let allowed_artifact_extensions =
            parse_string_list(env_optional("ALLOWED_ARTIFACT_EXTENSIONS"), &["pdf", "docx"]);

        let grading_prompt = env_or_default("GRADING_PROMPT", DEFAULT_GRADING_PROMPT);
        let grading_weight =
            parse_f64("GRADING_WEIGHT", env_or_default("GRADING_WEIGHT", "1.0"))?;
        let auto_approve =
            env_optional("AUTO_APPROVE").map(|value| parse_bool(&value)).unwrap_or(false);

        let log_level = env_or_default("GRADEFLOW_LOG_LEVEL", "info");
        let json = env_optional("GRADEFLOW_LOG_JSON").map(|value| parse_bool(&value)).unwrap_or(false);
        let prometheus_enabled =
            env_optional("PROMETHEUS_ENABLED").map(|value| parse_bool(&value)).unwrap_or(false);

        let settings = Self {
            runtime: RuntimeSettings { environment, strict_config },
            ai: AiSettings {
                api_key,
                base_url: base_url.trim_end_matches('/').to_string(),
                model,
                max_tokens,
                temperature,
                request_timeout,
            },
            s3: S3Settings {
                endpoint: s3_endpoint,
                access_key: s3_access_key,
                secret_key: s3_secret_key,
                bucket: s3_bucket,
                region: s3_region,
                presigned_url_expire_minutes,
            },
            uploads: UploadSettings { max_upload_size_mb, allowed_artifact_extensions },
            assignment: AssignmentSettings { grading_prompt, grading_weight, auto_approve },
            telemetry: TelemetrySettings { log_level, json, prometheus_enabled },
        };

        settings.validate()?;
        Ok(settings)
    }

    pub fn runtime(&self) -> &RuntimeSettings {
        &self.runtime
    }

    pub fn ai(&self) -> &AiSettings {
        &self.ai
    }

    pub fn s3(&self) -> &S3Settings {
        &self.s3
    }

    pub fn uploads(&self) -> &UploadSettings {
        &self.uploads
    }

    pub fn assignment(&self) -> &AssignmentSettings {
        &self.assignment
    }

    pub fn telemetry(&self) -> &TelemetrySettings {
        &self.telemetry
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.uploads.allowed_artifact_extensions.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "ALLOWED_ARTIFACT_EXTENSIONS",
                value: String::from("<empty>"),
            });
        }

        for extension in &self.uploads.allowed_artifact_extensions {
            if !is_supported_artifact_extension(extension) {
                return Err(ConfigError::InvalidValue {
                    field: "ALLOWED_ARTIFACT_EXTENSIONS",
                    value: extension.clone(),
                });
            }
        }

        if self.ai.request_timeout == 0 {
            return Err(ConfigError::InvalidValue {
                field: "AI_REQUEST_TIMEOUT",
                value: "0".to_string(),
            });
        }

        if !(0.0..=2.0).contains(&self.ai.temperature) {
            return Err(ConfigError::InvalidValue {
                field: "AI_TEMPERATURE",
                value: self.ai.temperature.to_string(),
            });
        }

        if self.assignment.grading_weight < 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "GRADING_WEIGHT",
                value: self.assignment.grading_weight.to_string(),
            });
        }

        if self.s3.presigned_url_expire_minutes == 0 {
            return Err(ConfigError::InvalidValue {
                field: "PRESIGNED_URL_EXPIRE_MINUTES",
                value: "0".to_string(),
            });
        }

        if !(self.runtime.strict_config || self.runtime.environment.is_production()) {
            return Ok(());
        }

        if self.ai.api_key.is_empty() {
            return Err(ConfigError::MissingSecret("OPENAI_API_KEY"));
        }
        if self.ai.base_url.is_empty() {
            return Err(ConfigError::MissingSecret("OPENAI_BASE_URL"));
        }
        if self.s3.access_key.is_empty() || self.s3.secret_key.is_empty() {
            return Err(ConfigError::MissingSecret("S3_ACCESS_KEY/S3_SECRET_KEY"));
        }

        Ok(())
    }
}
