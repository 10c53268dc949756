use std::cmp::Ordering;

use async_trait::async_trait;
use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Deserialize, Serialize};
use url::Url;

const LOGIN_FALLBACK_IMAGE: &str = "images/bwi-globe.png";

// ============================================================================
// Vault enums
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive, Serialize, Deserialize)]
#[repr(u8)]
#[serde(into = "u8", try_from = "u8")]
pub enum CipherType {
    Login = 1,
    SecureNote = 2,
    Card = 3,
    Identity = 4,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, IntoPrimitive, TryFromPrimitive, Serialize, Deserialize)]
#[repr(u8)]
#[serde(into = "u8", try_from = "u8")]
pub enum CipherRepromptType {
    #[default]
    None = 0,
    Password = 1,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum AuthenticationStatus {
    LoggedOut = 0,
    Locked = 1,
    Unlocked = 2,
}

/// When the inline menu shows up. Reported to frames as its numeric value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, IntoPrimitive, TryFromPrimitive, Serialize, Deserialize)]
#[repr(u8)]
#[serde(rename_all = "kebab-case")]
pub enum InlineMenuVisibility {
    Off = 0,
    #[default]
    OnButtonClick = 1,
    OnFieldFocus = 2,
}

// ============================================================================
// Decrypted vault items
// ============================================================================

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LoginView {
    pub username: Option<String>,
    #[serde(default)]
    pub uris: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubTitleView {
    pub sub_title: String,
}

/// A decrypted vault item, as handed over by the [`CipherService`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CipherView {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub cipher_type: CipherType,
    #[serde(default)]
    pub favorite: bool,
    #[serde(default)]
    pub reprompt: CipherRepromptType,
    #[serde(default)]
    pub login: Option<LoginView>,
    #[serde(default)]
    pub card: Option<SubTitleView>,
    #[serde(default)]
    pub identity: Option<SubTitleView>,
    /// Epoch milliseconds of the last autofill.
    #[serde(default)]
    pub last_used_date: Option<u64>,
}

/// Vault access used to populate the inline menu list.
#[async_trait]
pub trait CipherService: Send + Sync {
    async fn get_all_decrypted_for_url(&self, url: &str) -> Vec<CipherView>;

    /// Most recently used first, then by name.
    fn sort_ciphers_by_last_used_then_name(&self, a: &CipherView, b: &CipherView) -> Ordering {
        b.last_used_date
            .cmp(&a.last_used_date)
            .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
    }
}

// ============================================================================
// Inline menu list projection
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CipherIcon {
    pub image_enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub fallback_image: String,
    pub icon: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlayLoginData {
    pub username: Option<String>,
}

/// What the inline menu list renders for one cipher. Carries no secrets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlayCipherData {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub cipher_type: CipherType,
    pub reprompt: CipherRepromptType,
    pub favorite: bool,
    pub icon: CipherIcon,
    pub login: Option<OverlayLoginData>,
    pub card: Option<String>,
}

/// Favicon settings from configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct IconSettings {
    pub icons_url: String,
    pub show_favicons: bool,
}

impl OverlayCipherData {
    pub fn from_cipher(overlay_cipher_id: &str, cipher: &CipherView, icons: &IconSettings) -> Self {
        let login = (cipher.cipher_type == CipherType::Login).then(|| OverlayLoginData {
            username: cipher.login.as_ref().and_then(|login| login.username.clone()),
        });
        let card = (cipher.cipher_type == CipherType::Card)
            .then(|| cipher.card.as_ref().map(|card| card.sub_title.clone()))
            .flatten();

        Self {
            id: overlay_cipher_id.to_string(),
            name: cipher.name.clone(),
            cipher_type: cipher.cipher_type,
            reprompt: cipher.reprompt,
            favorite: cipher.favorite,
            icon: build_cipher_icon(cipher, icons),
            login,
            card,
        }
    }
}

pub fn build_cipher_icon(cipher: &CipherView, icons: &IconSettings) -> CipherIcon {
    let mut icon = CipherIcon {
        image_enabled: icons.show_favicons,
        image: None,
        fallback_image: String::new(),
        icon: match cipher.cipher_type {
            CipherType::Login => "bwi-globe",
            CipherType::Card => "bwi-credit-card",
            CipherType::Identity => "bwi-id-card",
            CipherType::SecureNote => "bwi-sticky-note",
        }
        .to_string(),
    };

    if cipher.cipher_type != CipherType::Login {
        return icon;
    }

    let Some(uri) = cipher.login.as_ref().and_then(|login| login.uris.first()) else {
        return icon;
    };

    if uri.starts_with("androidapp://") {
        icon.icon = "bwi-android".to_string();
    } else if uri.starts_with("iosapp://") {
        icon.icon = "bwi-apple".to_string();
    } else if icons.show_favicons && is_website(uri) {
        let absolute = if uri.contains("://") {
            uri.clone()
        } else {
            format!("http://{uri}")
        };
        if let Some(hostname) = Url::parse(&absolute).ok().and_then(|url| url.host_str().map(str::to_string)) {
            icon.image = Some(format!("{}/{hostname}/icon.png", icons.icons_url));
            icon.fallback_image = LOGIN_FALLBACK_IMAGE.to_string();
        }
    }
    icon
}

fn is_website(uri: &str) -> bool {
    uri.starts_with("http://") || uri.starts_with("https://") || (!uri.contains("://") && uri.contains('.'))
}
