use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use dashvox_voice::{Engine, SpeechSource, SynthesisConfig, PLACEHOLDER_API_KEY};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

const FAKE_AUDIO: &[u8] = b"RIFF\x24\x00\x00\x00WAVEremote-audio-bytes";

/// What the fake generation endpoint should answer.
#[derive(Clone, Copy)]
enum Behaviour {
    Success,
    Unauthorized,
    Malformed,
    BrokenDownload,
}

#[derive(Clone)]
struct MockState {
    addr: SocketAddr,
    behaviour: Behaviour,
    requests: Arc<Mutex<Vec<(Option<String>, Value)>>>,
}

async fn generate(
    State(state): State<MockState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    state.requests.lock().unwrap().push((auth, body));

    match state.behaviour {
        Behaviour::Success => (
            StatusCode::OK,
            Json(json!({
                "status_code": 200,
                "request_id": "req-1",
                "output": {
                    "finish_reason": "stop",
                    "audio": {"url": format!("http://{}/audio/out.wav", state.addr), "id": "audio-1"}
                }
            })),
        ),
        Behaviour::BrokenDownload => (
            StatusCode::OK,
            Json(json!({
                "output": {"audio": {"url": format!("http://{}/audio/missing.wav", state.addr)}}
            })),
        ),
        Behaviour::Unauthorized => (
            StatusCode::UNAUTHORIZED,
            Json(json!({"code": "InvalidApiKey", "message": "Invalid API-key provided."})),
        ),
        Behaviour::Malformed => (StatusCode::OK, Json(json!({"output": {}}))),
    }
}

async fn audio() -> Vec<u8> {
    FAKE_AUDIO.to_vec()
}

async fn missing_audio() -> StatusCode {
    StatusCode::NOT_FOUND
}

async fn spawn_mock(behaviour: Behaviour) -> (SocketAddr, Arc<Mutex<Vec<(Option<String>, Value)>>>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let requests = Arc::new(Mutex::new(Vec::new()));

    let state = MockState {
        addr,
        behaviour,
        requests: requests.clone(),
    };
    let app = Router::new()
        .route(
            "/api/v1/services/aigc/multimodal-generation/generation",
            post(generate),
        )
        .route("/audio/out.wav", get(audio))
        .route("/audio/missing.wav", get(missing_audio))
        .with_state(state);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (addr, requests)
}

fn config_for(addr: SocketAddr) -> SynthesisConfig {
    SynthesisConfig {
        api_base_url: format!("http://{}/api/v1", addr),
        persist_audio: true,
        ..SynthesisConfig::new("sk-test")
    }
}

fn is_mock_wav(path: &std::path::Path) -> bool {
    hound::WavReader::open(path)
        .map(|r| r.duration() == 24_000)
        .unwrap_or(false)
}

#[tokio::test]
async fn test_remote_audio_is_written_verbatim() {
    let (addr, requests) = spawn_mock(Behaviour::Success).await;
    let dir = tempfile::tempdir().unwrap();
    let engine = Engine::new(config_for(addr));

    let artifact = engine
        .try_generate_speech("hello", Some(dir.path()))
        .await
        .unwrap();

    assert_eq!(artifact.source, SpeechSource::Remote);
    assert_eq!(std::fs::read(&artifact.path).unwrap(), FAKE_AUDIO);

    let requests = requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    let (auth, body) = &requests[0];
    assert_eq!(auth.as_deref(), Some("Bearer sk-test"));
    assert_eq!(
        body,
        &json!({
            "model": "qwen3-tts-flash",
            "input": {"text": "hello", "voice": "Cherry", "language_type": "Auto"}
        })
    );
}

#[tokio::test]
async fn test_instructions_sent_for_instruct_model() {
    let (addr, requests) = spawn_mock(Behaviour::Success).await;
    let dir = tempfile::tempdir().unwrap();
    let config = SynthesisConfig {
        model: "qwen3-tts-instruct-flash".to_string(),
        voice: "Ethan".to_string(),
        language_type: "Chinese".to_string(),
        instructions: "Speak like a news anchor".to_string(),
        optimize_instructions: true,
        ..config_for(addr)
    };
    let engine = Engine::new(config);

    engine
        .try_generate_speech("news", Some(dir.path()))
        .await
        .unwrap();

    let requests = requests.lock().unwrap();
    let input = &requests[0].1["input"];
    assert_eq!(input["voice"], "Ethan");
    assert_eq!(input["language_type"], "Chinese");
    assert_eq!(input["instructions"], "Speak like a news anchor");
    assert_eq!(input["optimize_instructions"], true);
}

#[tokio::test]
async fn test_api_error_falls_back_to_mock() {
    let (addr, requests) = spawn_mock(Behaviour::Unauthorized).await;
    let dir = tempfile::tempdir().unwrap();
    let engine = Engine::new(config_for(addr));

    let artifact = engine
        .try_generate_speech("hello", Some(dir.path()))
        .await
        .unwrap();

    assert_eq!(artifact.source, SpeechSource::Mock);
    assert!(is_mock_wav(&artifact.path));
    assert_eq!(requests.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_malformed_response_falls_back_to_mock() {
    let (addr, _) = spawn_mock(Behaviour::Malformed).await;
    let dir = tempfile::tempdir().unwrap();
    let engine = Engine::new(config_for(addr));

    let artifact = engine
        .try_generate_speech("hello", Some(dir.path()))
        .await
        .unwrap();
    assert_eq!(artifact.source, SpeechSource::Mock);
    assert!(is_mock_wav(&artifact.path));
}

#[tokio::test]
async fn test_failed_download_falls_back_to_mock() {
    let (addr, _) = spawn_mock(Behaviour::BrokenDownload).await;
    let dir = tempfile::tempdir().unwrap();
    let engine = Engine::new(config_for(addr));

    let artifact = engine
        .try_generate_speech("hello", Some(dir.path()))
        .await
        .unwrap();
    assert_eq!(artifact.source, SpeechSource::Mock);
    assert!(is_mock_wav(&artifact.path));
}

#[tokio::test]
async fn test_unreachable_service_falls_back_to_mock() {
    // Bind and immediately drop a listener to get a port nobody is serving.
    let addr = {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    };
    let dir = tempfile::tempdir().unwrap();
    let engine = Engine::new(config_for(addr));

    let artifact = engine
        .try_generate_speech("hello", Some(dir.path()))
        .await
        .unwrap();
    assert_eq!(artifact.source, SpeechSource::Mock);
}

#[tokio::test]
async fn test_missing_credential_never_calls_remote() {
    for key in ["", PLACEHOLDER_API_KEY] {
        let (addr, requests) = spawn_mock(Behaviour::Success).await;
        let dir = tempfile::tempdir().unwrap();
        let config = SynthesisConfig {
            api_key: key.to_string(),
            ..config_for(addr)
        };
        let engine = Engine::new(config);

        let artifact = engine
            .try_generate_speech("hello", Some(dir.path()))
            .await
            .unwrap();

        assert_eq!(artifact.source, SpeechSource::Mock, "key {:?}", key);
        assert!(is_mock_wav(&artifact.path));
        assert_eq!(requests.lock().unwrap().len(), 0, "key {:?}", key);
    }
}
