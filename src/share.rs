//! Social sharing: native share sheet first, platform share intents as the
//! fallback, clipboard plus manual instructions where no intent exists.

use serde::{Serialize, Deserialize};
use tracing::{info, warn};
use urlencoding::encode;

use crate::backend::CopyBackend;
use crate::capabilities::{Clipboard, Launcher, NativeShare, NativeShareOutcome, SharePayload};
use crate::error::{ClientError, ShareError};
use crate::models::{CopyData, Platform};
use crate::renderer::{copy_text, CopyOutcome};

pub const MANUAL_POST_STEPS: [&str; 5] = [
    "Abre la app de la red social",
    "Crea un nuevo post",
    "Pega el texto (Ctrl+V o Cmd+V)",
    "Adjunta tu imagen si es necesario",
    "¡Publica!",
];

/// Platforms the backend can build a share URL for.
pub const BACKEND_SHARE_PLATFORMS: [Platform; 3] = [Platform::Facebook, Platform::Whatsapp, Platform::Linkedin];

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ShareTarget {
    Facebook,
    Twitter,
    Linkedin,
    Whatsapp,
    Telegram,
    Pinterest,
    Reddit,
    Email,
    Sms,
}

impl ShareTarget {
    pub const ALL: [ShareTarget; 9] = [
        ShareTarget::Facebook,
        ShareTarget::Twitter,
        ShareTarget::Linkedin,
        ShareTarget::Whatsapp,
        ShareTarget::Telegram,
        ShareTarget::Pinterest,
        ShareTarget::Reddit,
        ShareTarget::Email,
        ShareTarget::Sms,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ShareTarget::Facebook => "facebook",
            ShareTarget::Twitter => "twitter",
            ShareTarget::Linkedin => "linkedin",
            ShareTarget::Whatsapp => "whatsapp",
            ShareTarget::Telegram => "telegram",
            ShareTarget::Pinterest => "pinterest",
            ShareTarget::Reddit => "reddit",
            ShareTarget::Email => "email",
            ShareTarget::Sms => "sms",
        }
    }

    pub fn parse(s: &str) -> Option<ShareTarget> {
        ShareTarget::ALL.into_iter().find(|t| t.as_str() == s)
    }

    pub fn for_platform(platform: Platform) -> Option<ShareTarget> {
        match platform {
            Platform::Facebook => Some(ShareTarget::Facebook),
            Platform::Linkedin => Some(ShareTarget::Linkedin),
            Platform::Whatsapp => Some(ShareTarget::Whatsapp),
            Platform::Instagram | Platform::Tiktok => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShareContent<'a> {
    pub title: &'a str,
    pub text: &'a str,
    pub url: &'a str,
    pub image_url: Option<&'a str>,
}

/// Share-intent URL for `target`, or `None` when the target needs an image we do not have.
pub fn share_url(target: ShareTarget, content: &ShareContent<'_>) -> Option<String> {
    let text = encode(content.text);
    let title = encode(content.title);
    let url = encode(content.url);
    let s = match target {
        ShareTarget::Facebook => format!("https://www.facebook.com/sharer/sharer.php?u={url}"),
        ShareTarget::Twitter => format!("https://twitter.com/intent/tweet?text={text}&url={url}"),
        ShareTarget::Linkedin => format!("https://www.linkedin.com/sharing/share-offsite/?url={url}"),
        ShareTarget::Whatsapp => format!("https://api.whatsapp.com/send?text={text}%20{url}"),
        ShareTarget::Telegram => format!("https://t.me/share/url?url={url}&text={text}"),
        ShareTarget::Pinterest => {
            let media = encode(content.image_url?);
            format!("https://pinterest.com/pin/create/button/?url={url}&media={media}&description={text}")
        }
        ShareTarget::Reddit => format!("https://reddit.com/submit?url={url}&title={title}"),
        ShareTarget::Email => format!("mailto:?subject={title}&body={text}%0A%0A{url}"),
        ShareTarget::Sms => format!("sms:?body={text}%20{url}"),
    };
    Some(s)
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ShareOutcome {
    SharedNatively,
    /// The page is showing the native sheet and will report back.
    Delegated,
    OpenedUrl { url: String },
    CopiedWithInstructions { steps: Vec<String> },
    Failed { instruction: String },
    NothingToShare,
}

pub struct ShareContext<'a> {
    pub native: &'a dyn NativeShare,
    pub launcher: &'a dyn Launcher,
    pub clipboard: &'a dyn Clipboard,
}

pub async fn share_platform(
    ctx: &ShareContext<'_>,
    copy_data: &CopyData,
    platform: Platform,
    product_name: &str,
    page_url: &str,
) -> ShareOutcome {
    let Some(copy) = copy_data.get(&platform) else {
        return ShareOutcome::NothingToShare;
    };

    let payload = SharePayload {
        title: format!("{} - {}", product_name, platform),
        text: copy.clone(),
        url: Some(page_url.to_string()),
    };
    match ctx.native.share(&payload).await {
        NativeShareOutcome::Shared => return ShareOutcome::SharedNatively,
        NativeShareOutcome::Delegated => return ShareOutcome::Delegated,
        NativeShareOutcome::Cancelled => info!("🙅 Native share cancelled for {}, using share URL", platform),
        NativeShareOutcome::Failed(e) => warn!("Native share failed for {}: {}", platform, e),
        NativeShareOutcome::Unavailable => {}
    }

    let content = ShareContent { title: product_name, text: copy, url: page_url, image_url: None };
    if let Some(url) = ShareTarget::for_platform(platform).and_then(|t| share_url(t, &content)) {
        match ctx.launcher.open(&url, &format!("share-{}", platform)) {
            Ok(()) => return ShareOutcome::OpenedUrl { url },
            Err(e) => warn!("Could not open share window for {}: {}", platform, e),
        }
    }

    copy_with_instructions(ctx.clipboard, copy).await
}

/// Opens an explicit share intent for a platform's copy, e.g. posting the
/// Instagram text to Telegram or Pinterest.
pub fn open_intent(
    launcher: &dyn Launcher,
    copy_data: &CopyData,
    platform: Platform,
    target: ShareTarget,
    product_name: &str,
    page_url: &str,
    image_url: Option<&str>,
) -> ShareOutcome {
    let Some(copy) = copy_data.get(&platform) else {
        return ShareOutcome::NothingToShare;
    };
    let content = ShareContent { title: product_name, text: copy, url: page_url, image_url };
    let Some(url) = share_url(target, &content) else {
        return ShareOutcome::Failed { instruction: format!("{} necesita una imagen para compartir", target.as_str()) };
    };
    match launcher.open(&url, &format!("share-{}", target.as_str())) {
        Ok(()) => {
            info!("🔗 Opened {} intent for {}", target.as_str(), platform);
            ShareOutcome::OpenedUrl { url }
        }
        Err(e) => {
            warn!("Could not open {} intent: {}", target.as_str(), e);
            ShareOutcome::Failed { instruction: e.to_string() }
        }
    }
}

pub async fn copy_with_instructions(clipboard: &dyn Clipboard, copy: &str) -> ShareOutcome {
    match copy_text(clipboard, Some(copy)).await {
        CopyOutcome::Copied => ShareOutcome::CopiedWithInstructions {
            steps: MANUAL_POST_STEPS.iter().map(|s| s.to_string()).collect(),
        },
        CopyOutcome::Failed { instruction } => ShareOutcome::Failed { instruction },
        CopyOutcome::NothingToCopy => ShareOutcome::NothingToShare,
    }
}

/// Asks the backend for a pre-formatted share URL and opens it.
pub async fn share_via_backend(
    backend: &dyn CopyBackend,
    launcher: &dyn Launcher,
    copy_data: &CopyData,
    platform: Platform,
) -> Result<ShareOutcome, ClientError> {
    let Some(copy) = copy_data.get(&platform) else {
        return Ok(ShareOutcome::NothingToShare);
    };
    let response = backend.share_urls(platform, copy).await?;
    let Some(url) = response.urls.get(platform.as_str()) else {
        return Err(ClientError::Validation(ShareError::Unsupported(platform.to_string()).to_string()));
    };
    launcher
        .open(url, "_blank")
        .map_err(|e| ClientError::Validation(e.to_string()))?;
    Ok(ShareOutcome::OpenedUrl { url: url.clone() })
}
