use super::*;
use serde_json::json;
use studio_core::backend::GenerationRequest;
use studio_core::catalog::{get_backend_info, Resolution};
use studio_core::history::ResultRef;

fn keyed_config() -> AppConfig {
    AppConfig {
        fal_api_key: Some("fal-test".into()),
        google_api_key: Some("google-test".into()),
        ..Default::default()
    }
}

#[test]
fn test_classify_status() {
    assert!(matches!(classify_status(429, ""), BackendError::Unavailable(_)));
    assert!(matches!(classify_status(503, "overloaded"), BackendError::Unavailable(_)));
    assert!(matches!(classify_status(408, ""), BackendError::Unavailable(_)));

    match classify_status(422, r#"{"detail": [{"msg": "prompt violates content policy"}]}"#) {
        BackendError::Rejected(msg) => {
            assert!(msg.contains("422"));
            assert!(msg.contains("content policy"));
        }
        other => panic!("Expected Rejected, got {other:?}"),
    }

    assert!(matches!(classify_status(401, "bad key"), BackendError::Rejected(_)));
}

#[test]
fn test_extract_error_message_shapes() {
    assert_eq!(
        extract_error_message(r#"{"error": {"code": 400, "message": "API key not valid"}}"#),
        "API key not valid"
    );
    assert_eq!(extract_error_message(r#"{"detail": "Not enough balance"}"#), "Not enough balance");
    assert_eq!(
        extract_error_message(r#"{"detail": [{"msg": "a"}, {"msg": "b"}]}"#),
        "a; b"
    );
    assert_eq!(extract_error_message("  gateway exploded \n"), "gateway exploded");
}

#[test]
fn test_parse_fal_response() {
    let ok = parse_fal_response(json!({
        "images": [{"url": "https://fal.media/files/abc.png", "width": 1024, "height": 1024}],
        "description": "a brighter photo"
    }));
    assert!(ok.success);
    assert_eq!(
        ok.result_reference,
        Some(ResultRef("https://fal.media/files/abc.png".into()))
    );

    let nsfw = parse_fal_response(json!({
        "images": [{"url": "https://fal.media/files/black.png"}],
        "has_nsfw_concepts": [true]
    }));
    assert!(!nsfw.success);
    assert!(nsfw.message.unwrap().contains("safety"));

    let empty = parse_fal_response(json!({"images": []}));
    assert!(empty.success);
    assert!(empty.usable_reference().is_none());

    let garbage = parse_fal_response(json!({"images": "nope"}));
    assert!(garbage.success);
    assert!(garbage.usable_reference().is_none());
}

#[test]
fn test_parse_imagen_response() {
    let ok = parse_imagen_response(&json!({
        "predictions": [{"bytesBase64Encoded": "iVBORw0KGgo=", "mimeType": "image/png"}]
    }));
    let reference = ok.usable_reference().unwrap();
    assert!(reference.is_data_url());
    assert_eq!(reference.as_str(), "data:image/png;base64,iVBORw0KGgo=");

    let filtered = parse_imagen_response(&json!({
        "predictions": [{"raiFilteredReason": "Your prompt may violate our policies."}]
    }));
    assert!(!filtered.success);
    assert_eq!(
        filtered.message.as_deref(),
        Some("Your prompt may violate our policies.")
    );

    let empty = parse_imagen_response(&json!({}));
    assert!(empty.success);
    assert!(empty.usable_reference().is_none());
}

#[test]
fn test_image_dimensions() {
    assert_eq!(image_dimensions(Resolution::OneK, None), (1024, 1024));
    assert_eq!(image_dimensions(Resolution::TwoK, Some("16:9")), (2048, 1152));
    assert_eq!(image_dimensions(Resolution::OneK, Some("9:16")), (576, 1024));
    assert_eq!(image_dimensions(Resolution::OneK, Some("wide")), (1024, 1024));
}

#[test]
fn test_fal_request_bodies() {
    let edit = FalBackend::new(
        "k".into(),
        get_backend_info(BackendId::NanoBananaEdit).unwrap(),
        "https://fal.run".into(),
        30,
    );
    let body = edit.build_body(&GenerationRequest::new("add a hat").with_source("https://img/0.png".into()));
    assert_eq!(body["image_urls"][0], "https://img/0.png");
    assert_eq!(body["prompt"], "add a hat");
    assert_eq!(body["resolution"], "1K");

    // Each priced tier must reach the service
    let hat = GenerationRequest::new("add a hat").with_source("https://img/0.png".into());
    let four_k = edit.build_body(&hat.clone().with_resolution(Resolution::FourK));
    assert_eq!(four_k["resolution"], "4K");
    assert_ne!(four_k, edit.build_body(&hat));

    let gen = FalBackend::new(
        "k".into(),
        get_backend_info(BackendId::Seedream).unwrap(),
        "https://fal.run".into(),
        30,
    );
    let body = gen.build_body(&GenerationRequest::new("a fox").with_resolution(Resolution::TwoK));
    assert_eq!(body["image_size"]["width"], 2048);
    assert!(body.get("image_urls").is_none());
}

#[test]
fn test_imagen_request_body() {
    let imagen = ImagenBackend::new(
        "k".into(),
        get_backend_info(BackendId::Imagen4).unwrap(),
        "https://generativelanguage.googleapis.com".into(),
        30,
    );
    let body = imagen.build_body(&GenerationRequest::new("a lighthouse").with_aspect_ratio("16:9"));
    assert_eq!(body["instances"][0]["prompt"], "a lighthouse");
    assert_eq!(body["parameters"]["aspectRatio"], "16:9");
    assert_eq!(body["parameters"]["sampleImageSize"], "1K");
}

#[test]
fn test_create_backend_routing() {
    let config = keyed_config();
    for id in BackendId::ALL {
        let backend = create_backend(&config, id).unwrap();
        assert_eq!(backend.info().id, id);
    }
    assert_eq!(available_backends(&config).len(), 3);
}

#[test]
fn test_create_backend_missing_key() {
    let config = AppConfig {
        fal_api_key: Some("fal-only".into()),
        google_api_key: None,
        ..Default::default()
    };

    assert!(create_backend(&config, BackendId::Seedream).is_ok());
    match create_backend(&config, BackendId::Imagen4) {
        Err(BackendError::MissingApiKey(msg)) => assert!(msg.contains("GEMINI_API_KEY")),
        Err(other) => panic!("Expected MissingApiKey, got {other:?}"),
        Ok(_) => panic!("Expected MissingApiKey"),
    }
    assert_eq!(available_backends(&config), vec![BackendId::NanoBananaEdit, BackendId::Seedream]);
}

#[tokio::test]
async fn test_invalid_request_never_hits_network() {
    let config = keyed_config();
    let nano = create_backend(&config, BackendId::NanoBananaEdit).unwrap();

    let err = nano
        .generate(&GenerationRequest::new("remove background"))
        .await
        .unwrap_err();
    assert!(matches!(err, BackendError::InvalidRequest(_)));
}

#[tokio::test]
async fn test_unreachable_service_is_unavailable() {
    // Nothing listens on the discard port in test environments
    let config = AppConfig {
        fal_base_url: "http://127.0.0.1:9".into(),
        ..keyed_config()
    };
    let seedream = create_backend(&config, BackendId::Seedream).unwrap();

    let err = seedream
        .generate(&GenerationRequest::new("a quiet lake"))
        .await
        .unwrap_err();
    assert!(matches!(err, BackendError::Unavailable(_)));
}

/// Serve exactly one HTTP exchange on a local port with a fixed 200 body.
async fn serve_once(body: &'static str) -> String {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut request = Vec::new();
        let mut buf = [0u8; 4096];
        loop {
            let n = stream.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            request.extend_from_slice(&buf[..n]);
            let text = String::from_utf8_lossy(&request);
            if let Some(end) = text.find("\r\n\r\n") {
                let length = text[..end]
                    .lines()
                    .find_map(|l| {
                        let (name, value) = l.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if request.len() >= end + 4 + length {
                    break;
                }
            }
        }
        let response = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        stream.write_all(response.as_bytes()).await.unwrap();
        stream.shutdown().await.ok();
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn test_non_json_success_body_has_no_reference() {
    let config = AppConfig {
        fal_base_url: serve_once("<html>ok</html>").await,
        ..keyed_config()
    };
    let seedream = create_backend(&config, BackendId::Seedream).unwrap();

    let resp = seedream
        .generate(&GenerationRequest::new("a quiet lake"))
        .await
        .unwrap();
    assert!(resp.success);
    assert_eq!(resp.result_reference, None);
    assert!(resp.message.unwrap().contains("unreadable"));
}

#[tokio::test]
async fn test_non_json_success_body_is_invalid_result_in_session() {
    use std::sync::Arc;
    use studio_core::account::InMemoryAccount;
    use studio_core::error::SessionError;
    use studio_core::notify::TracingNotifier;
    use studio_session::GenerationSession;

    let config = AppConfig {
        google_base_url: serve_once("not json at all").await,
        ..keyed_config()
    };
    let imagen = create_backend(&config, BackendId::Imagen4).unwrap();
    let account = Arc::new(InMemoryAccount::new(3));
    let session = GenerationSession::new(None, account.clone(), Arc::new(TracingNotifier));

    let err = session
        .run(imagen.as_ref(), GenerationRequest::new("a lighthouse"))
        .await
        .unwrap_err();
    assert_eq!(err, SessionError::InvalidResult);
    assert_eq!(account.balance(), 3);
    assert!(session.history().is_empty());
}
