//! Key shapes in the state store.

use vcut_models::VideoId;

pub fn video_info_key(id: &VideoId) -> String {
    format!("video_info:{}", id)
}

pub fn video_status_key(id: &VideoId) -> String {
    format!("video_status:{}", id)
}

pub fn chat_history_key(id: &VideoId) -> String {
    format!("chat_history:{}", id)
}

pub fn video_result_key(id: &VideoId) -> String {
    format!("video_result:{}", id)
}
