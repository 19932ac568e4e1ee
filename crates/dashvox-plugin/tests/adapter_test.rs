use dashvox_plugin::{ConfigError, PluginConfig, PluginError, ReplyDecorator, TtsPlugin};
use dashvox_types::{ReplyContent, ReplyPart};
use dashvox_voice::SynthesisConfig;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::Path;

fn plugin_config(data_dir: &Path) -> PluginConfig {
    PluginConfig {
        synthesis: SynthesisConfig {
            data_dir: data_dir.to_path_buf(),
            persist_audio: true,
            ..SynthesisConfig::default()
        },
        tts_probability: 100,
        max_text_length: 512,
        ..PluginConfig::default()
    }
}

fn record_path(part: &ReplyPart) -> String {
    match part {
        ReplyPart::Record { file, url } => {
            assert_eq!(file, url, "file and url should both be the local path");
            file.clone()
        }
        other => panic!("expected a record part, got {:?}", other),
    }
}

fn assert_mock_wav(path: &str) {
    let reader = hound::WavReader::open(path).expect("record should point at a WAV file");
    assert_eq!(reader.spec().sample_rate, 24_000);
    assert_eq!(reader.duration(), 24_000);
}

#[tokio::test]
async fn test_reply_becomes_single_audio_part() {
    let dir = tempfile::tempdir().unwrap();
    let plugin = TtsPlugin::new(plugin_config(dir.path()));
    let mut reply = ReplyContent::plain("hello");

    assert!(plugin.convert_text_to_speech(&mut reply).await);

    assert_eq!(reply.chain.len(), 1);
    let path = record_path(&reply.chain[0]);
    assert!(Path::new(&path).exists());
    assert!(Path::new(&path).starts_with(dir.path()));
    assert_mock_wav(&path);
}

#[tokio::test]
async fn test_emit_both_keeps_text_before_audio() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = plugin_config(dir.path());
    config.synthesis.emit_both = true;
    let plugin = TtsPlugin::new(config);
    let mut reply = ReplyContent::plain("hello");

    assert!(plugin.convert_text_to_speech(&mut reply).await);

    assert_eq!(reply.chain.len(), 2);
    assert_eq!(reply.chain[0], ReplyPart::text("hello"));
    assert_mock_wav(&record_path(&reply.chain[1]));
}

#[tokio::test]
async fn test_multi_part_reply_is_joined() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = plugin_config(dir.path());
    config.synthesis.emit_both = true;
    let plugin = TtsPlugin::new(config);
    let mut reply = ReplyContent::new(vec![
        ReplyPart::At {
            target: "bob".to_string(),
        },
        ReplyPart::text(" Good "),
        ReplyPart::text("morning "),
    ]);

    assert!(plugin.convert_text_to_speech(&mut reply).await);
    assert_eq!(reply.chain[0], ReplyPart::text("Good morning"));
}

#[tokio::test]
async fn test_zero_probability_is_a_no_op() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = plugin_config(dir.path());
    config.tts_probability = 0;
    let plugin = TtsPlugin::new(config);
    let mut reply = ReplyContent::plain("hello");

    assert!(!plugin.convert_text_to_speech(&mut reply).await);
    assert_eq!(reply, ReplyContent::plain("hello"));
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_empty_text_is_a_no_op() {
    let dir = tempfile::tempdir().unwrap();
    let plugin = TtsPlugin::new(plugin_config(dir.path()));

    let mut blank = ReplyContent::plain("  \n ");
    assert!(!plugin.convert_text_to_speech(&mut blank).await);
    assert_eq!(blank, ReplyContent::plain("  \n "));

    let mut empty = ReplyContent::default();
    assert!(!plugin.convert_text_to_speech(&mut empty).await);
    assert!(empty.is_empty());

    let image_only = vec![ReplyPart::Image {
        url: "https://example.com/cat.png".to_string(),
    }];
    let mut textless = ReplyContent::new(image_only.clone());
    assert!(!plugin.convert_text_to_speech(&mut textless).await);
    assert_eq!(textless.chain, image_only);
}

#[tokio::test]
async fn test_text_over_max_length_is_a_no_op() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = plugin_config(dir.path());
    config.max_text_length = 5;
    let plugin = TtsPlugin::new(config);

    let mut long = ReplyContent::plain("hello!");
    assert!(!plugin.convert_text_to_speech(&mut long).await);
    assert_eq!(long, ReplyContent::plain("hello!"));

    // Length is counted in characters, not bytes.
    let mut exact = ReplyContent::plain("héllo");
    assert!(plugin.convert_text_to_speech(&mut exact).await);
}

#[tokio::test]
async fn test_sampling_skips_some_replies() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = plugin_config(dir.path());
    config.tts_probability = 30;
    let plugin = TtsPlugin::new(config);
    let mut rng = StdRng::seed_from_u64(42);

    let mut converted = 0;
    for i in 0..40 {
        let mut reply = ReplyContent::plain(format!("line {}", i));
        if plugin.convert_with_rng(&mut reply, &mut rng).await {
            converted += 1;
        } else {
            assert_eq!(reply, ReplyContent::plain(format!("line {}", i)));
        }
    }
    assert!(converted > 0 && converted < 40, "converted {}", converted);
}

#[tokio::test]
async fn test_generation_failure_leaves_reply_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("file-not-dir");
    std::fs::write(&blocker, b"x").unwrap();
    let plugin = TtsPlugin::new(plugin_config(&blocker));
    let mut reply = ReplyContent::plain("hello");

    assert!(!plugin.convert_text_to_speech(&mut reply).await);
    assert_eq!(reply, ReplyContent::plain("hello"));
}

#[tokio::test]
async fn test_plugin_works_through_host_hook() {
    let dir = tempfile::tempdir().unwrap();
    let decorator: Box<dyn ReplyDecorator> = Box::new(TtsPlugin::new(plugin_config(dir.path())));
    let mut reply = ReplyContent::plain("hello");

    decorator.on_decorating_result(&mut reply).await;

    assert_eq!(reply.chain.len(), 1);
    assert_mock_wav(&record_path(&reply.chain[0]));
}

#[tokio::test]
async fn test_plugin_from_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dashvox.toml");
    std::fs::write(&path, "voice = \"Ethan\"\ntts_probability = 100\n").unwrap();

    let plugin = TtsPlugin::from_config_path(path.to_str()).unwrap();
    assert_eq!(plugin.engine().config().voice, "Ethan");

    std::fs::write(&path, "tts_probability = \"always\"\n").unwrap();
    let result = TtsPlugin::from_config_path(path.to_str());
    assert!(matches!(
        result,
        Err(PluginError::Config(ConfigError::Parse(_)))
    ));
}
