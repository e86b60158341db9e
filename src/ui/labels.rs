//! Bilingual UI labels (English and Chinese).
//!
//! Chinese is selected for any locale whose tag starts with "zh"
//! (zh, zh-CN, zh_TW.UTF-8, ...); everything else falls back to English.

/// The fixed set of user-facing strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Labels {
    pub title: &'static str,
    pub pitch_label: &'static str,
    pub play: &'static str,
    pub stop: &'static str,
    pub loading: &'static str,
    pub loaded: &'static str,
    pub stopped: &'static str,
    pub error: &'static str,
    pub no_file: &'static str,
    pub goodbye: &'static str,
    pub commands: &'static str,
    pub help_load: &'static str,
    pub help_step: &'static str,
    pub help_status: &'static str,
    pub help_quit: &'static str,
}

pub const EN: Labels = Labels {
    title: "Audio Player",
    pitch_label: "Pitch Shift:",
    play: "Play",
    stop: "Stop",
    loading: "Loading",
    loaded: "Loaded",
    stopped: "Stopped",
    error: "Error",
    no_file: "No file loaded",
    goodbye: "Bye",
    commands: "Commands:",
    help_load: "load an audio file",
    help_step: "one semitone up / down",
    help_status: "show player state",
    help_quit: "exit",
};

pub const ZH: Labels = Labels {
    title: "音频播放器",
    pitch_label: "转调:",
    play: "播放",
    stop: "停止",
    loading: "加载中",
    loaded: "已加载",
    stopped: "已停止",
    error: "错误",
    no_file: "未加载文件",
    goodbye: "再见",
    commands: "命令:",
    help_load: "加载音频文件",
    help_step: "升/降半音",
    help_status: "显示播放状态",
    help_quit: "退出",
};

/// Picks the label set for a locale tag.
pub fn for_locale(locale: &str) -> &'static Labels {
    if locale.starts_with("zh") {
        &ZH
    } else {
        &EN
    }
}

/// Reads the locale from the environment, in the usual precedence order.
pub fn detect_locale() -> String {
    ["LC_ALL", "LC_MESSAGES", "LANG"]
        .iter()
        .find_map(|var| std::env::var(var).ok().filter(|v| !v.is_empty()))
        .unwrap_or_else(|| "en".to_string())
}
