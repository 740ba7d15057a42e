//! Application configuration module / 应用配置模块
//!
//! Manages application configuration loaded from config.json
//! Creates default config file on first run / 首次运行时创建默认配置文件

use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Global configuration instance / 全局配置实例
static CONFIG: OnceCell<Arc<RwLock<AppConfig>>> = OnceCell::new();

/// Application configuration / 应用配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Server configuration / 服务器配置
    pub server: ServerConfig,
    /// Database configuration / 数据库配置
    pub database: DatabaseConfig,
    /// Media file configuration / 媒体文件配置
    pub media: MediaConfig,
    /// Auth cache configuration / 认证缓存配置
    pub auth: AuthConfig,
    /// AI chat configuration / AI 聊天配置
    pub ai: AiConfig,
    /// Collection search configuration / 合集搜索配置
    pub search: SearchConfig,
}

/// Server configuration / 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server host address / 服务器监听地址
    pub host: String,
    /// Server port / 服务器端口
    pub port: u16,
}

/// Database configuration / 数据库配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Data directory path / 数据目录路径
    pub data_dir: String,
    /// Main database file path (relative to data_dir) / 主数据库文件路径
    pub db_file: String,
}

/// Media file configuration / 媒体文件配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    /// Directory holding sound/image files / 音频与图片文件目录
    pub dir: String,
    /// Number of cards returned by the preview endpoint / 预览接口返回的卡片数量
    pub preview_cards: i64,
}

/// Auth cache configuration / 认证缓存配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// How long verified token claims stay cached, in seconds / 令牌缓存有效期（秒）
    pub token_ttl_secs: u64,
}

/// AI chat configuration / AI 聊天配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    /// Model name used for chat / 聊天使用的模型名称
    pub model: String,
    /// Language used when the client does not send one / 客户端未指定时使用的语言
    pub default_language: String,
    /// Return a canned reply instead of calling the AI backend / 返回固定回复，不调用 AI 后端
    pub fake_api: bool,
}

/// Collection search configuration / 合集搜索配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Minimum number of full-text hits; fewer than this falls back to the
    /// fuzzy substring tier / 全文命中数低于该值时回退到模糊匹配
    pub min_exact_hits: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            media: MediaConfig::default(),
            auth: AuthConfig::default(),
            ai: AiConfig::default(),
            search: SearchConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            data_dir: "data".to_string(),
            db_file: "serverdata.db".to_string(),
        }
    }
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            dir: "media".to_string(),
            preview_cards: 10,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self { token_ttl_secs: 900 }
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            model: "gemini-1.5-flash".to_string(),
            default_language: "English".to_string(),
            fake_api: false,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self { min_exact_hits: 1 }
    }
}

impl AppConfig {
    /// Get the full database URL / 获取完整的数据库URL
    pub fn get_database_url(&self) -> String {
        let db_path = Path::new(&self.database.data_dir).join(&self.database.db_file);
        format!("sqlite:{}?mode=rwc", db_path.to_string_lossy())
    }

    /// Get the full data directory path / 获取完整的数据目录路径
    pub fn get_data_dir(&self) -> PathBuf {
        PathBuf::from(&self.database.data_dir)
    }

    /// Get the media directory path / 获取媒体目录路径
    pub fn get_media_dir(&self) -> PathBuf {
        PathBuf::from(&self.media.dir)
    }

    /// Get the server bind address / 获取服务器绑定地址
    pub fn get_bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

/// Get the config file path / 获取配置文件路径
fn get_config_path() -> PathBuf {
    std::env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join("config.json")
}

/// Load configuration from file, or create default if not exists / 加载配置文件，不存在则创建默认配置
pub fn load_config() -> Result<AppConfig, String> {
    let config_path = get_config_path();

    if config_path.exists() {
        let content = std::fs::read_to_string(&config_path)
            .map_err(|e| format!("Failed to read config file: {}", e))?;

        let config: AppConfig = serde_json::from_str(&content)
            .map_err(|e| format!("Failed to parse config file: {}", e))?;

        tracing::info!("Loaded configuration from {:?}", config_path);
        Ok(config)
    } else {
        let config = AppConfig::default();
        save_config(&config)?;
        tracing::info!("Created default configuration at {:?}", config_path);
        Ok(config)
    }
}

/// Save configuration to file / 保存配置到文件
pub fn save_config(config: &AppConfig) -> Result<(), String> {
    let config_path = get_config_path();

    let content = serde_json::to_string_pretty(config)
        .map_err(|e| format!("Failed to serialize config: {}", e))?;

    std::fs::write(&config_path, content)
        .map_err(|e| format!("Failed to write config file: {}", e))?;

    Ok(())
}

/// Get global configuration instance / 获取全局配置实例
pub fn get_config() -> Arc<RwLock<AppConfig>> {
    CONFIG
        .get_or_init(|| {
            let config = load_config().unwrap_or_default();
            Arc::new(RwLock::new(config))
        })
        .clone()
}

/// Get a read-only snapshot of current config / 获取当前配置的只读快照
pub fn config() -> AppConfig {
    get_config().read().clone()
}
