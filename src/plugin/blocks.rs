//! Extension descriptor: identity, colours and the block palette.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{json, Value};
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator};

use super::args::DEFAULT_QR_TEXT;
use crate::qr::DEFAULT_QR_SIZE;

pub const EXTENSION_ID: &str = "roturwarpdrivefrontend";
pub const EXTENSION_NAME: &str = "Rotur Warpdrive Frontend";
const PRIMARY_COLOR: &str = "#c571f0";
const SECONDARY_COLOR: &str = "#321640";

/// Named actions the host can invoke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, AsRefStr)]
pub enum Opcode {
    #[strum(serialize = "generateLinkCode")]
    GenerateLinkCode,
    #[strum(serialize = "checkLinkStatus")]
    CheckLinkStatus,
    #[strum(serialize = "getLinkCode")]
    GetLinkCode,
    #[strum(serialize = "getLinkToken")]
    GetLinkToken,
    #[strum(serialize = "getLinkStatus")]
    GetLinkStatus,
    #[strum(serialize = "getUsername")]
    GetUsername,
    #[strum(serialize = "getAvatarURL")]
    GetAvatarUrl,
    #[strum(serialize = "getAccountObject")]
    GetAccountObject,
    #[strum(serialize = "showQR")]
    ShowQr,
    #[strum(serialize = "hideQR")]
    HideQr,
}

impl Opcode {
    pub fn block_type(self) -> BlockType {
        match self {
            Self::GetLinkCode
            | Self::GetLinkToken
            | Self::GetLinkStatus
            | Self::GetUsername
            | Self::GetAvatarUrl
            | Self::GetAccountObject => BlockType::Reporter,
            Self::GenerateLinkCode | Self::CheckLinkStatus | Self::ShowQr | Self::HideQr => {
                BlockType::Command
            }
        }
    }

    /// Label shown on the block.
    pub fn text(self) -> &'static str {
        match self {
            Self::GenerateLinkCode => "generate Rotur link code",
            Self::CheckLinkStatus => "check Rotur link status",
            Self::GetLinkCode => "link code",
            Self::GetLinkToken => "link token",
            Self::GetLinkStatus => "link status",
            Self::GetUsername => "username",
            Self::GetAvatarUrl => "avatar URL",
            Self::GetAccountObject => "account object",
            Self::ShowQr => "show QR for [TEXT] size [SIZE] y offset [Y]",
            Self::HideQr => "hide QR",
        }
    }

    fn arguments(self) -> BTreeMap<String, ArgumentInfo> {
        match self {
            Self::ShowQr => BTreeMap::from([
                ("TEXT".to_string(), ArgumentInfo::string(DEFAULT_QR_TEXT)),
                ("SIZE".to_string(), ArgumentInfo::number(f64::from(DEFAULT_QR_SIZE))),
                ("Y".to_string(), ArgumentInfo::number(0.0)),
            ]),
            _ => BTreeMap::new(),
        }
    }
}

impl serde::Serialize for Opcode {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_ref())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockType {
    Command,
    Reporter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ArgumentType {
    String,
    Number,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArgumentInfo {
    #[serde(rename = "type")]
    pub kind: ArgumentType,
    pub default_value: Value,
}

impl ArgumentInfo {
    fn string(default: &str) -> Self {
        Self {
            kind: ArgumentType::String,
            default_value: json!(default),
        }
    }

    fn number(default: f64) -> Self {
        Self {
            kind: ArgumentType::Number,
            default_value: json!(default),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockInfo {
    pub opcode: Opcode,
    pub block_type: BlockType,
    pub text: &'static str,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub arguments: BTreeMap<String, ArgumentInfo>,
}

/// Everything a host needs to register the extension.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtensionInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub color1: &'static str,
    pub color2: &'static str,
    pub blocks: Vec<BlockInfo>,
}

pub fn extension_info() -> ExtensionInfo {
    ExtensionInfo {
        id: EXTENSION_ID,
        name: EXTENSION_NAME,
        color1: PRIMARY_COLOR,
        color2: SECONDARY_COLOR,
        blocks: Opcode::iter()
            .map(|opcode| BlockInfo {
                opcode,
                block_type: opcode.block_type(),
                text: opcode.text(),
                arguments: opcode.arguments(),
            })
            .collect(),
    }
}
