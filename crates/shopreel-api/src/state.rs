//! Application state.

use std::sync::Arc;

use tracing::warn;

use shopreel_models::JobProvider;
use shopreel_poller::{JobPoller, JobStatusSource, PollConfig};
use shopreel_providers::{
    ApiHzClient, ApiMartClient, DashScopeClient, LlmClient, PromptDirector, SiliconFlowClient,
};
use shopreel_storage::OssClient;
use shopreel_supabase::{
    DigitalAssetRepository, LicenseKeyRepository, ProfileRepository, ProjectRepository,
    RedeemCodeRepository, SupabaseClient,
};

use crate::auth::JwtVerifier;
use crate::config::ApiConfig;
use crate::error::{ApiError, ApiResult};
use crate::services::QuotaService;

/// Third-party clients. Each is optional so the server can start with a
/// partial configuration; routes that need a missing client answer 500.
#[derive(Clone, Default)]
pub struct Providers {
    pub llm: Option<LlmClient>,
    pub director: PromptDirector,
    pub dashscope: Option<DashScopeClient>,
    pub apimart: Option<ApiMartClient>,
    pub apihz: Option<ApiHzClient>,
    pub siliconflow: Option<SiliconFlowClient>,
    pub storage: Option<OssClient>,
}

impl Providers {
    /// Build every client whose configuration is present.
    pub fn from_env() -> Self {
        Self {
            llm: optional("llm", LlmClient::from_env()),
            director: PromptDirector::from_env(),
            dashscope: optional("dashscope", DashScopeClient::from_env()),
            apimart: optional("apimart", ApiMartClient::from_env()),
            apihz: optional("apihz", ApiHzClient::from_env()),
            siliconflow: optional("siliconflow", SiliconFlowClient::from_env()),
            storage: optional("oss", OssClient::from_env()),
        }
    }
}

/// Poll presets per provider, read once at startup.
#[derive(Debug, Clone)]
pub struct PollPresets {
    pub digital_human: PollConfig,
    pub sora: PollConfig,
}

impl PollPresets {
    pub fn from_env() -> Self {
        Self {
            digital_human: PollConfig::from_env(JobProvider::DashScope),
            sora: PollConfig::from_env(JobProvider::Sora),
        }
    }

    pub fn for_provider(&self, provider: JobProvider) -> &PollConfig {
        match provider {
            JobProvider::DashScope => &self.digital_human,
            JobProvider::Sora => &self.sora,
        }
    }
}

fn optional<T, E: std::fmt::Display>(name: &'static str, result: Result<T, E>) -> Option<T> {
    match result {
        Ok(client) => Some(client),
        Err(e) => {
            warn!(client = name, error = %e, "Client disabled");
            None
        }
    }
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub auth: Arc<JwtVerifier>,
    pub supabase: SupabaseClient,
    pub profiles: ProfileRepository,
    pub redeem_codes: RedeemCodeRepository,
    pub assets: DigitalAssetRepository,
    pub licenses: LicenseKeyRepository,
    pub projects: ProjectRepository,
    pub quota: QuotaService,
    pub providers: Providers,
    pub poll: PollPresets,
}

impl AppState {
    /// Wire state from explicit parts.
    pub fn new(config: ApiConfig, auth: JwtVerifier, supabase: SupabaseClient, providers: Providers) -> Self {
        let profiles = ProfileRepository::new(supabase.clone());
        let licenses = LicenseKeyRepository::new(supabase.clone());
        Self {
            config,
            auth: Arc::new(auth),
            quota: QuotaService::new(profiles.clone(), licenses.clone()),
            redeem_codes: RedeemCodeRepository::new(supabase.clone()),
            assets: DigitalAssetRepository::new(supabase.clone()),
            projects: ProjectRepository::new(supabase.clone()),
            profiles,
            licenses,
            supabase,
            providers,
            poll: PollPresets::from_env(),
        }
    }

    /// Create application state from the environment.
    pub fn from_env(config: ApiConfig) -> anyhow::Result<Self> {
        let auth = JwtVerifier::from_env()?;
        let supabase = SupabaseClient::from_env()?;
        Ok(Self::new(config, auth, supabase, Providers::from_env()))
    }

    pub fn llm(&self) -> ApiResult<&LlmClient> {
        self.providers.llm.as_ref().ok_or_else(|| not_configured("OPENAI_API_KEY"))
    }

    pub fn dashscope(&self) -> ApiResult<&DashScopeClient> {
        self.providers
            .dashscope
            .as_ref()
            .ok_or_else(|| not_configured("DASHSCOPE_API_KEY"))
    }

    pub fn apimart(&self) -> ApiResult<&ApiMartClient> {
        self.providers
            .apimart
            .as_ref()
            .ok_or_else(|| not_configured("APIMART_API_KEY"))
    }

    pub fn apihz(&self) -> ApiResult<&ApiHzClient> {
        self.providers
            .apihz
            .as_ref()
            .ok_or_else(|| ApiError::internal("缺少 APIHZ 配置信息"))
    }

    pub fn siliconflow(&self) -> ApiResult<&SiliconFlowClient> {
        self.providers
            .siliconflow
            .as_ref()
            .ok_or_else(|| ApiError::internal("缺少 SILICONFLOW_API_KEY"))
    }

    pub fn storage(&self) -> ApiResult<&OssClient> {
        self.providers
            .storage
            .as_ref()
            .ok_or_else(|| not_configured("OSS credentials"))
    }

    /// A poller for jobs owned by `provider`, using its preset.
    pub fn poller(&self, provider: JobProvider) -> ApiResult<JobPoller> {
        let source: Arc<dyn JobStatusSource> = match provider {
            JobProvider::DashScope => Arc::new(self.dashscope()?.clone()),
            JobProvider::Sora => Arc::new(self.apimart()?.clone()),
        };
        Ok(JobPoller::new(source, *self.poll.for_provider(provider)))
    }
}

fn not_configured(what: &str) -> ApiError {
    ApiError::internal(format!("Server configuration error: missing {what}"))
}
