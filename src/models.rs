use serde::{Deserializer, Serialize, Deserialize};
use serde_with::skip_serializing_none;
use chrono::{DateTime, NaiveDateTime, Utc};
use std::collections::BTreeMap;
use std::fmt;

/// Target channel. Declaration order is the canonical iteration order.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Facebook,
    Instagram,
    Tiktok,
    Linkedin,
    Whatsapp,
}

impl Platform {
    pub const ALL: [Platform; 5] = [
        Platform::Facebook,
        Platform::Instagram,
        Platform::Tiktok,
        Platform::Linkedin,
        Platform::Whatsapp,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Facebook => "facebook",
            Platform::Instagram => "instagram",
            Platform::Tiktok => "tiktok",
            Platform::Linkedin => "linkedin",
            Platform::Whatsapp => "whatsapp",
        }
    }

    pub fn parse(s: &str) -> Option<Platform> {
        Platform::ALL.into_iter().find(|p| p.as_str() == s)
    }

    /// Icon for a platform name as the backend reports it; unknown names get a generic phone.
    pub fn icon_for(name: &str) -> &'static str {
        Platform::parse(name).map(|p| p.icon()).unwrap_or("📱")
    }

    pub fn icon(&self) -> &'static str {
        match self {
            Platform::Facebook => "📘",
            Platform::Instagram => "📸",
            Platform::Tiktok => "🎵",
            Platform::Linkedin => "💼",
            Platform::Whatsapp => "💬",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    #[default]
    Casual,
    Formal,
    Juvenil,
    Profesional,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Length {
    Corto,
    #[default]
    Medio,
    Largo,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum QualityLevel {
    #[default]
    Rapido,
    Profesional,
    Elite,
}

impl QualityLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            QualityLevel::Rapido => "rapido",
            QualityLevel::Profesional => "profesional",
            QualityLevel::Elite => "elite",
        }
    }
}

/// Body of `POST /api/generate/copy`.
#[skip_serializing_none]
#[derive(Serialize, Deserialize, Clone, PartialEq)]
pub struct GenerationRequest {
    pub product_name: String,
    pub description: String,
    pub platform: Platform,
    pub language: String,
    pub api_key: String,
    pub llm_provider: String,
    pub llm_model: String,
    pub tone: Tone,
    pub length: Length,
    pub use_emojis: bool,
    #[serde(default)]
    pub benefits: Option<Vec<String>>, // omitted when empty
    #[serde(default)]
    pub cta: Option<String>,
}

// api_key is a secret; keep it out of logs.
impl fmt::Debug for GenerationRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerationRequest")
            .field("product_name", &self.product_name)
            .field("description", &self.description)
            .field("platform", &self.platform)
            .field("language", &self.language)
            .field("api_key", &"***")
            .field("llm_provider", &self.llm_provider)
            .field("llm_model", &self.llm_model)
            .field("tone", &self.tone)
            .field("length", &self.length)
            .field("use_emojis", &self.use_emojis)
            .field("benefits", &self.benefits)
            .field("cta", &self.cta)
            .finish()
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CopyMetadata {
    pub provider: String,
    pub model: String,
    pub platform: String,
    pub language: String,
}

/// Raw response of `POST /api/generate/copy`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CopyResponse {
    pub copy_text: String,
    pub metadata: CopyMetadata,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct GenerationResult {
    pub copy_text: String,
    pub provider: String,
    pub model: String,
    pub platform: String,
    pub language: String,
}

impl From<CopyResponse> for GenerationResult {
    fn from(r: CopyResponse) -> Self {
        Self {
            copy_text: r.copy_text,
            provider: r.metadata.provider,
            model: r.metadata.model,
            platform: r.metadata.platform,
            language: r.metadata.language,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct HistoryEntry {
    pub id: String,
    #[serde(default)]
    pub product_id: Option<String>,
    /// Free-form names; the backend may list channels this client does not know.
    #[serde(default)]
    pub platforms: Option<Vec<String>>,
    #[serde(default)]
    pub quality_level: Option<String>,
    #[serde(deserialize_with = "utc_or_naive")]
    pub created_at: DateTime<Utc>,
}

/// RFC 3339 timestamps, or offset-less ones (the backend's naive UTC columns).
fn utc_or_naive<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
    let raw = String::deserialize(deserializer)?;
    if let Ok(at) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(at.with_timezone(&Utc));
    }
    raw.parse::<NaiveDateTime>()
        .map(|naive| naive.and_utc())
        .map_err(|e| serde::de::Error::custom(format!("invalid timestamp '{}': {}", raw, e)))
}

/// Body of `POST /api/config`. Every field is optional on the wire.
#[skip_serializing_none]
#[derive(Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct SaveConfigRequest {
    pub language: Option<String>,
    pub quality_level: Option<String>,
    pub llm_provider: Option<String>,
    pub llm_model: Option<String>,
    pub llm_api_key: Option<String>,
    pub image_provider: Option<String>,
    pub image_model: Option<String>,
    pub image_api_key: Option<String>,
}

impl fmt::Debug for SaveConfigRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |k: &Option<String>| k.as_ref().map(|_| "***");
        f.debug_struct("SaveConfigRequest")
            .field("language", &self.language)
            .field("quality_level", &self.quality_level)
            .field("llm_provider", &self.llm_provider)
            .field("llm_model", &self.llm_model)
            .field("llm_api_key", &redact(&self.llm_api_key))
            .field("image_provider", &self.image_provider)
            .field("image_model", &self.image_model)
            .field("image_api_key", &redact(&self.image_api_key))
            .finish()
    }
}

/// Generated text per platform, iterated in canonical platform order.
pub type CopyData = BTreeMap<Platform, String>;

/// Body of `POST /api/export/zip`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ExportRequest {
    pub copy_data: CopyData,
    pub product_name: String,
    pub platforms: Vec<Platform>,
    pub include_hashtags: bool,
    pub hashtags: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ShareUrlsResponse {
    pub urls: BTreeMap<String, String>,
}

/// Structured error body returned by the backend.
#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub detail: Option<serde_json::Value>,
}
