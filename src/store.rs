//! Per-session configuration store.
//!
//! Holds every user input that feeds a generation request plus the latest
//! outcome. Each setter replaces exactly one field; there is no derived
//! invalidation between fields.

use serde::{Serialize, Deserialize};

use crate::models::{
    GenerationRequest, GenerationResult, Length, Platform, QualityLevel, SaveConfigRequest, Tone,
};

pub const MAX_BENEFITS: usize = 3;
pub const DEFAULT_LANGUAGE: &str = "es-MX";

#[derive(Debug, Clone, PartialEq)]
pub struct ConfigStore {
    api_key: String,
    language: String,
    quality_level: QualityLevel,
    product_name: String,
    description: String,
    platform: Platform,
    tone: Tone,
    length: Length,
    use_emojis: bool,
    cta: String,
    benefits: Vec<String>,
    generated: Option<GenerationResult>,
    is_generating: bool,
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            language: DEFAULT_LANGUAGE.to_string(),
            quality_level: QualityLevel::default(),
            product_name: String::new(),
            description: String::new(),
            platform: Platform::Instagram,
            tone: Tone::default(),
            length: Length::default(),
            use_emojis: false,
            cta: String::new(),
            benefits: Vec::new(),
            generated: None,
            is_generating: false,
        }
    }
}

/// Serializable view of the store. The api key is never echoed back.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct StoreSnapshot {
    pub has_api_key: bool,
    pub language: String,
    pub quality_level: QualityLevel,
    pub product_name: String,
    pub description: String,
    pub platform: Platform,
    pub tone: Tone,
    pub length: Length,
    pub use_emojis: bool,
    pub cta: String,
    pub benefits: Vec<String>,
    pub generated_copy: Option<String>,
    pub is_generating: bool,
}

impl ConfigStore {
    pub fn new() -> Self { Self::default() }

    pub fn api_key(&self) -> &str { &self.api_key }
    pub fn language(&self) -> &str { &self.language }
    pub fn quality_level(&self) -> QualityLevel { self.quality_level }
    pub fn product_name(&self) -> &str { &self.product_name }
    pub fn description(&self) -> &str { &self.description }
    pub fn platform(&self) -> Platform { self.platform }
    pub fn tone(&self) -> Tone { self.tone }
    pub fn length(&self) -> Length { self.length }
    pub fn use_emojis(&self) -> bool { self.use_emojis }
    pub fn cta(&self) -> &str { &self.cta }
    pub fn benefits(&self) -> &[String] { &self.benefits }
    pub fn generated(&self) -> Option<&GenerationResult> { self.generated.as_ref() }
    pub fn generated_copy(&self) -> Option<&str> { self.generated.as_ref().map(|g| g.copy_text.as_str()) }
    pub fn is_generating(&self) -> bool { self.is_generating }

    pub fn set_api_key(&mut self, key: impl Into<String>) { self.api_key = key.into(); }
    pub fn set_language(&mut self, lang: impl Into<String>) { self.language = lang.into(); }
    pub fn set_quality_level(&mut self, level: QualityLevel) { self.quality_level = level; }
    pub fn set_product_name(&mut self, name: impl Into<String>) { self.product_name = name.into(); }
    pub fn set_description(&mut self, desc: impl Into<String>) { self.description = desc.into(); }
    pub fn set_platform(&mut self, platform: Platform) { self.platform = platform; }
    pub fn set_tone(&mut self, tone: Tone) { self.tone = tone; }
    pub fn set_length(&mut self, length: Length) { self.length = length; }
    pub fn set_use_emojis(&mut self, on: bool) { self.use_emojis = on; }
    pub fn set_cta(&mut self, cta: impl Into<String>) { self.cta = cta.into(); }
    pub fn set_generated(&mut self, result: Option<GenerationResult>) { self.generated = result; }
    pub fn set_is_generating(&mut self, on: bool) { self.is_generating = on; }

    /// Replaces the benefit list, keeping at most the first three entries.
    pub fn set_benefits(&mut self, mut benefits: Vec<String>) {
        benefits.truncate(MAX_BENEFITS);
        self.benefits = benefits;
    }

    /// Appends a trimmed benefit. Returns false when the input is blank or the list is full.
    pub fn add_benefit(&mut self, text: &str) -> bool {
        let text = text.trim();
        if text.is_empty() || self.benefits.len() >= MAX_BENEFITS {
            return false;
        }
        self.benefits.push(text.to_string());
        true
    }

    pub fn remove_benefit(&mut self, index: usize) -> Option<String> {
        if index < self.benefits.len() { Some(self.benefits.remove(index)) } else { None }
    }

    /// The first validation failure, if any, in the order the form reports them.
    pub fn validation_error(&self) -> Option<&'static str> {
        if self.api_key.trim().is_empty() {
            return Some("Por favor ingresa tu API key");
        }
        if self.product_name.trim().is_empty() || self.description.trim().is_empty() {
            return Some("Por favor completa el nombre y descripción del producto");
        }
        None
    }

    pub fn to_request(&self, llm_provider: &str, llm_model: &str) -> GenerationRequest {
        let cta = self.cta.trim();
        GenerationRequest {
            product_name: self.product_name.clone(),
            description: self.description.clone(),
            platform: self.platform,
            language: self.language.clone(),
            api_key: self.api_key.clone(),
            llm_provider: llm_provider.to_string(),
            llm_model: llm_model.to_string(),
            tone: self.tone,
            length: self.length,
            use_emojis: self.use_emojis,
            benefits: if self.benefits.is_empty() { None } else { Some(self.benefits.clone()) },
            cta: if cta.is_empty() { None } else { Some(cta.to_string()) },
        }
    }

    pub fn to_save_config(&self, llm_provider: &str, llm_model: &str) -> SaveConfigRequest {
        SaveConfigRequest {
            language: Some(self.language.clone()),
            quality_level: Some(self.quality_level.as_str().to_string()),
            llm_provider: Some(llm_provider.to_string()),
            llm_model: Some(llm_model.to_string()),
            llm_api_key: if self.api_key.is_empty() { None } else { Some(self.api_key.clone()) },
            ..Default::default()
        }
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            has_api_key: !self.api_key.is_empty(),
            language: self.language.clone(),
            quality_level: self.quality_level,
            product_name: self.product_name.clone(),
            description: self.description.clone(),
            platform: self.platform,
            tone: self.tone,
            length: self.length,
            use_emojis: self.use_emojis,
            cta: self.cta.clone(),
            benefits: self.benefits.clone(),
            generated_copy: self.generated_copy().map(str::to_string),
            is_generating: self.is_generating,
        }
    }
}

/// Partial update from the form. Each present field goes through its own setter.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct ConfigPatch {
    pub api_key: Option<String>,
    pub language: Option<String>,
    pub quality_level: Option<QualityLevel>,
    pub product_name: Option<String>,
    pub description: Option<String>,
    pub platform: Option<Platform>,
    pub tone: Option<Tone>,
    pub length: Option<Length>,
    pub use_emojis: Option<bool>,
    pub cta: Option<String>,
    pub benefits: Option<Vec<String>>,
}

impl ConfigPatch {
    pub fn apply(self, store: &mut ConfigStore) {
        if let Some(v) = self.api_key { store.set_api_key(v); }
        if let Some(v) = self.language { store.set_language(v); }
        if let Some(v) = self.quality_level { store.set_quality_level(v); }
        if let Some(v) = self.product_name { store.set_product_name(v); }
        if let Some(v) = self.description { store.set_description(v); }
        if let Some(v) = self.platform { store.set_platform(v); }
        if let Some(v) = self.tone { store.set_tone(v); }
        if let Some(v) = self.length { store.set_length(v); }
        if let Some(v) = self.use_emojis { store.set_use_emojis(v); }
        if let Some(v) = self.cta { store.set_cta(v); }
        if let Some(v) = self.benefits { store.set_benefits(v); }
    }
}
