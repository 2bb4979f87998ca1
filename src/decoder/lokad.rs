use serde::Serialize;

/// SLP v1 token payload.
pub const SLP_LOKAD: [u8; 4] = *b"SLP\0";
/// ALP token section inside an eMPP output.
pub const ALP_LOKAD: [u8; 4] = *b"SLP2";

pub const ALIAS_LOKAD: [u8; 4] = [0x2e, 0x78, 0x65, 0x63];
pub const PAYBUTTON_LOKAD: [u8; 4] = [0x50, 0x41, 0x59, 0x00];
pub const AIRDROP_LOKAD: [u8; 4] = [0x64, 0x72, 0x6f, 0x70];
pub const CASHTAB_MSG_LOKAD: [u8; 4] = [0x00, 0x74, 0x61, 0x62];
pub const CASHTAB_ENCRYPTED_LOKAD: [u8; 4] = [0x65, 0x74, 0x61, 0x62];
pub const SWAP_LOKAD: [u8; 4] = [0x53, 0x57, 0x50, 0x00];
pub const ECASHCHAT_LOKAD: [u8; 4] = [0x63, 0x68, 0x61, 0x74];
pub const PAYWALL_LOKAD: [u8; 4] = [0x70, 0x61, 0x79, 0x77];
pub const AUTH_LOKAD: [u8; 4] = [0x61, 0x75, 0x74, 0x68];
pub const ARTICLE_LOKAD: [u8; 4] = [0x62, 0x6c, 0x6f, 0x67];
/// Second push of an article tx that replies to another article.
pub const ARTICLE_REPLY_MARKER: [u8; 4] = [0x72, 0x70, 0x6c, 0x79];

/// Application protocols identified by a 4-byte LOKAD prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum AppLokad {
    Alias,
    PayButton,
    Airdrop,
    CashtabMsg,
    CashtabEncrypted,
    Swap,
    EcashChat,
    Paywall,
    Auth,
    Article,
}

impl AppLokad {
    pub fn from_prefix(prefix: &[u8]) -> Option<Self> {
        let prefix: [u8; 4] = prefix.try_into().ok()?;
        match prefix {
            ALIAS_LOKAD => Some(Self::Alias),
            PAYBUTTON_LOKAD => Some(Self::PayButton),
            AIRDROP_LOKAD => Some(Self::Airdrop),
            CASHTAB_MSG_LOKAD => Some(Self::CashtabMsg),
            CASHTAB_ENCRYPTED_LOKAD => Some(Self::CashtabEncrypted),
            SWAP_LOKAD => Some(Self::Swap),
            ECASHCHAT_LOKAD => Some(Self::EcashChat),
            PAYWALL_LOKAD => Some(Self::Paywall),
            AUTH_LOKAD => Some(Self::Auth),
            ARTICLE_LOKAD => Some(Self::Article),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Alias => "alias",
            Self::PayButton => "paybutton",
            Self::Airdrop => "airdrop",
            Self::CashtabMsg => "cashtab_msg",
            Self::CashtabEncrypted => "cashtab_encrypted",
            Self::Swap => "swap",
            Self::EcashChat => "ecashchat",
            Self::Paywall => "paywall",
            Self::Auth => "auth",
            Self::Article => "article",
        }
    }
}

impl std::fmt::Display for AppLokad {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
