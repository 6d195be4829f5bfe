//! Message and contact models for the decrypted store.
//!
//! The store keys messages by numeric type tags; both the primary type
//! and the miscellaneous sub-type are modeled as closed enums so the
//! rendering dispatch stays exhaustive, with an explicit `Unknown`
//! variant carrying the raw tag.

use serde::{Deserialize, Serialize};

/// Primary message type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    Text,
    Picture,
    Voice,
    VisitCard,
    Video,
    Location,
    Misc,
    System,
    Unknown(i64),
}

impl MessageType {
    /// Map a raw store tag to a typed variant.
    #[must_use]
    pub const fn from_raw(raw: i64) -> Self {
        match raw {
            1 => Self::Text,
            3 => Self::Picture,
            34 => Self::Voice,
            42 => Self::VisitCard,
            43 => Self::Video,
            48 => Self::Location,
            49 => Self::Misc,
            10000 => Self::System,
            other => Self::Unknown(other),
        }
    }

    /// The raw store tag for this variant.
    #[must_use]
    pub const fn raw(self) -> i64 {
        match self {
            Self::Text => 1,
            Self::Picture => 3,
            Self::Voice => 34,
            Self::VisitCard => 42,
            Self::Video => 43,
            Self::Location => 48,
            Self::Misc => 49,
            Self::System => 10000,
            Self::Unknown(raw) => raw,
        }
    }
}

/// Sub-type tag carried by miscellaneous (`MessageType::Misc`) messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MiscKind {
    Text,
    Music,
    ThirdPartyVideo,
    LinkCard,
    File,
    CustomEmoji,
    SharedEmoji,
    ForwardedBundle,
    MiniProgram,
    MiniProgram2,
    Channels,
    QuotedReply,
    Live,
    Game,
    Notice,
    Live2,
    SongIdentify,
    Transfer,
    RedPacket,
    Unknown(i64),
}

impl MiscKind {
    /// Map a raw store sub-type tag to a typed variant.
    #[must_use]
    pub const fn from_raw(raw: i64) -> Self {
        match raw {
            1 => Self::Text,
            3 => Self::Music,
            4 => Self::ThirdPartyVideo,
            5 => Self::LinkCard,
            6 => Self::File,
            8 => Self::CustomEmoji,
            15 => Self::SharedEmoji,
            19 => Self::ForwardedBundle,
            33 => Self::MiniProgram,
            36 => Self::MiniProgram2,
            51 => Self::Channels,
            57 => Self::QuotedReply,
            62 => Self::Live,
            68 => Self::Game,
            87 => Self::Notice,
            88 => Self::Live2,
            92 => Self::SongIdentify,
            2000 => Self::Transfer,
            2003 => Self::RedPacket,
            other => Self::Unknown(other),
        }
    }

    /// Localized category label used when no media path is rendered.
    #[must_use]
    pub fn label(self) -> String {
        match self {
            Self::Text => "文本消息".into(),
            Self::Music => "音乐消息".into(),
            Self::ThirdPartyVideo => "第三方视频".into(),
            Self::LinkCard => "链接卡片".into(),
            Self::File => "文件消息".into(),
            Self::CustomEmoji => "自定义表情".into(),
            Self::SharedEmoji => "分享表情".into(),
            Self::ForwardedBundle => "聊天记录合集".into(),
            Self::MiniProgram | Self::MiniProgram2 => "小程序".into(),
            Self::Channels => "视频号".into(),
            Self::QuotedReply => "引用消息".into(),
            Self::Live | Self::Live2 => "直播".into(),
            Self::Game => "游戏消息".into(),
            Self::Notice => "通知消息".into(),
            Self::SongIdentify => "听歌识曲".into(),
            Self::Transfer => "转账消息".into(),
            Self::RedPacket => "红包消息".into(),
            Self::Unknown(raw) => format!("未知杂项消息({raw})"),
        }
    }
}

/// Identity of the actual sender inside a group chat.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SenderIdentity {
    /// Store-internal identifier for the sub-sender.
    pub user_name: String,
    /// Nickname embedded alongside the message, if any.
    pub nick_name: String,
}

impl SenderIdentity {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.user_name.is_empty()
    }
}

/// File attachment metadata on a misc message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileInfo {
    pub file_name: String,
    pub file_path: String,
}

/// Music card metadata on a misc message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MusicInfo {
    pub title: String,
    pub display_name: String,
}

/// One message row from the store.
#[derive(Debug, Clone, Default)]
pub struct Message {
    pub raw_type: i64,
    pub raw_sub_type: i64,
    /// Creation time, unix seconds.
    pub create_time: i64,
    /// Whether the current account authored this message.
    pub is_sender: bool,
    /// Plain-text content (for text messages).
    pub content: String,
    pub image_path: String,
    pub video_path: String,
    pub voice_path: String,
    pub thumb_path: String,
    pub file_info: FileInfo,
    pub music_info: MusicInfo,
    pub location_label: String,
    pub card_nick_name: String,
    /// Present for group messages when the store knows the sub-sender.
    pub sender: SenderIdentity,
}

impl Message {
    /// Typed primary type.
    #[must_use]
    pub const fn message_type(&self) -> MessageType {
        MessageType::from_raw(self.raw_type)
    }

    /// Typed misc sub-type.
    #[must_use]
    pub const fn misc_kind(&self) -> MiscKind {
        MiscKind::from_raw(self.raw_sub_type)
    }
}

/// One contact (person or group) known to the store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Contact {
    /// Store-internal identifier.
    pub user_name: String,
    /// Original nickname, not a locally-assigned alias.
    pub nick_name: String,
    /// Locally-assigned alias, unused for speaker resolution.
    pub remark: String,
    /// Whether this contact is a group chat.
    pub is_group: bool,
}

/// The current account's own profile.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SelfProfile {
    pub user_name: String,
    pub nick_name: String,
}
