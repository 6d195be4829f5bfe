//! Message content rendering.
//!
//! Reduces a typed message to the transcript text: plain text passes
//! through, media types become a bracketed tag plus a resolved absolute
//! path (or a not-found tag), and miscellaneous messages dispatch on
//! their sub-kind. An empty rendering means the message is dropped.

use std::path::Path;

use crate::domain::{Message, MessageType, MiscKind};

use super::media_resolver::{resolve_media_path, MediaCategory};

/// Render one message's content relative to the account directory.
#[must_use]
pub fn render_content(account_dir: &Path, msg: &Message) -> String {
    match msg.message_type() {
        MessageType::Text => msg.content.clone(),
        MessageType::Picture => render_media(account_dir, &msg.image_path, MediaCategory::Image, "图片"),
        MessageType::Video => render_media(account_dir, &msg.video_path, MediaCategory::Video, "视频"),
        MessageType::Voice => render_media(account_dir, &msg.voice_path, MediaCategory::Voice, "语音"),
        MessageType::Location => {
            if msg.location_label.is_empty() {
                "[位置]".to_string()
            } else {
                format!("[位置] {}", msg.location_label)
            }
        }
        MessageType::VisitCard => {
            if msg.card_nick_name.is_empty() {
                "[名片]".to_string()
            } else {
                format!("[名片] {}", msg.card_nick_name)
            }
        }
        MessageType::Misc => render_misc(account_dir, msg),
        // System messages are filtered before rendering.
        MessageType::System => String::new(),
        MessageType::Unknown(raw) => format!("[其他消息类型: {raw}]"),
    }
}

/// Bracketed tag plus resolved path, or a not-found tag.
fn render_media(account_dir: &Path, raw: &str, category: MediaCategory, tag: &str) -> String {
    match resolve_media_path(account_dir, raw, category) {
        Some(path) if path.is_file() => format!("[{tag}] {}", path.display()),
        _ => format!("[{tag}] 文件不存在"),
    }
}

fn render_misc(account_dir: &Path, msg: &Message) -> String {
    let kind = msg.misc_kind();
    match kind {
        MiscKind::File => {
            if msg.file_info.file_name.is_empty() {
                return "[文件]".to_string();
            }
            match resolve_media_path(account_dir, &msg.file_info.file_path, MediaCategory::File) {
                Some(path) if path.is_file() => format!("[文件] {}", path.display()),
                _ => format!("[文件] {} (文件不存在)", msg.file_info.file_name),
            }
        }
        MiscKind::Music => {
            if msg.music_info.title.is_empty() {
                "[音乐]".to_string()
            } else {
                format!("[音乐] {} - {}", msg.music_info.title, msg.music_info.display_name)
            }
        }
        MiscKind::ThirdPartyVideo => render_thumb(account_dir, msg, "第三方视频"),
        MiscKind::LinkCard => render_thumb(account_dir, msg, "链接卡片"),
        MiscKind::MiniProgram | MiscKind::MiniProgram2 => render_thumb(account_dir, msg, "小程序"),
        MiscKind::Channels => render_thumb(account_dir, msg, "视频号"),
        _ => format!("[{}]", kind.label()),
    }
}

/// Thumbnail-backed cards render their resolved thumbnail path when one
/// is referenced; existence is not required for thumbnails.
fn render_thumb(account_dir: &Path, msg: &Message, tag: &str) -> String {
    match resolve_media_path(account_dir, &msg.thumb_path, MediaCategory::Thumbnail) {
        Some(path) => format!("[{tag}] {}", path.display()),
        None => format!("[{tag}]"),
    }
}
