use super::cli::{parse_command, Args, UiCommand};
use super::labels;
use clap::Parser;
use std::path::PathBuf;

#[test]
fn locale_starting_with_zh_gets_chinese_labels() {
    assert_eq!(labels::for_locale("zh"), &labels::ZH);
    assert_eq!(labels::for_locale("zh-CN"), &labels::ZH);
    assert_eq!(labels::for_locale("zh_TW.UTF-8"), &labels::ZH);
}

#[test]
fn other_locales_get_english_labels() {
    assert_eq!(labels::for_locale("en"), &labels::EN);
    assert_eq!(labels::for_locale("en_US.UTF-8"), &labels::EN);
    assert_eq!(labels::for_locale("de-DE"), &labels::EN);
    assert_eq!(labels::for_locale(""), &labels::EN);
    // "zh" must match as a prefix, not a substring.
    assert_eq!(labels::for_locale("en-zh"), &labels::EN);
}

#[test]
fn chinese_labels_match_english_set() {
    assert_eq!(labels::ZH.title, "音频播放器");
    assert_eq!(labels::ZH.pitch_label, "转调:");
    assert_eq!(labels::ZH.play, "播放");
    assert_eq!(labels::ZH.stop, "停止");
    assert_eq!(labels::EN.title, "Audio Player");
    assert_eq!(labels::EN.pitch_label, "Pitch Shift:");
}

#[test]
fn chinese_help_labels_contain_no_english() {
    // The whole command reference must render in one language.
    for text in [
        labels::ZH.commands,
        labels::ZH.help_load,
        labels::ZH.help_step,
        labels::ZH.help_status,
        labels::ZH.help_quit,
        labels::ZH.loading,
        labels::ZH.no_file,
        labels::ZH.goodbye,
    ] {
        assert!(
            !text.chars().any(|c| c.is_ascii_alphabetic()),
            "label {:?} leaks English into the Chinese set",
            text
        );
    }
}

#[test]
fn alsa_device_argument_stays_unset_unless_given() {
    // No -d means no override; settings decide the device later, and an
    // explicit "-d default" is an override like any other.
    let args = Args::try_parse_from(["keyshift"]).unwrap();
    assert!(args.alsa_device.is_none());

    let args = Args::try_parse_from(["keyshift", "-d", "default"]).unwrap();
    assert_eq!(args.alsa_device.as_deref(), Some("default"));
}

#[test]
fn parse_basic_commands() {
    assert_eq!(parse_command("play"), Some(UiCommand::Play));
    assert_eq!(parse_command("p"), Some(UiCommand::Play));
    assert_eq!(parse_command("stop"), Some(UiCommand::Stop));
    assert_eq!(parse_command("s"), Some(UiCommand::Stop));
    assert_eq!(parse_command("quit"), Some(UiCommand::Quit));
    assert_eq!(parse_command("q"), Some(UiCommand::Quit));
    assert_eq!(parse_command("help"), Some(UiCommand::Help));
    assert_eq!(parse_command("status"), Some(UiCommand::Status));
}

#[test]
fn parse_is_case_insensitive_and_trims() {
    assert_eq!(parse_command("  PLAY  "), Some(UiCommand::Play));
    assert_eq!(parse_command("Stop"), Some(UiCommand::Stop));
}

#[test]
fn parse_load_keeps_path_verbatim() {
    assert_eq!(
        parse_command("load /music/song.flac"),
        Some(UiCommand::Load(PathBuf::from("/music/song.flac")))
    );
    assert_eq!(
        parse_command("l song with spaces.mp3"),
        Some(UiCommand::Load(PathBuf::from("song with spaces.mp3")))
    );
    // load without a path is not a command
    assert_eq!(parse_command("load"), None);
}

#[test]
fn parse_pitch_commands() {
    assert_eq!(parse_command("pitch 5"), Some(UiCommand::SetPitch(5)));
    assert_eq!(parse_command("pitch -12"), Some(UiCommand::SetPitch(-12)));
    assert_eq!(parse_command("pitch abc"), None);
    assert_eq!(parse_command("pitch"), None);
    assert_eq!(parse_command("+"), Some(UiCommand::PitchUp));
    assert_eq!(parse_command("-"), Some(UiCommand::PitchDown));
}

#[test]
fn parse_bare_integer_as_pitch() {
    assert_eq!(parse_command("7"), Some(UiCommand::SetPitch(7)));
    assert_eq!(parse_command("-3"), Some(UiCommand::SetPitch(-3)));
    assert_eq!(parse_command("0"), Some(UiCommand::SetPitch(0)));
    // Range enforcement happens in PitchShift::new, not here.
    assert_eq!(parse_command("99"), Some(UiCommand::SetPitch(99)));
}

#[test]
fn parse_rejects_unknown_input() {
    assert_eq!(parse_command(""), None);
    assert_eq!(parse_command("dance"), None);
    assert_eq!(parse_command("1 2"), None);
}
