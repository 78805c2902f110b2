//! `RemoteClient` against a real listener running the service.

mod common;

use common::{analyzer, config, Scripted, GUIDE_JSON};
use std::sync::Arc;
use study_guardian::server::serve_with_shutdown;
use study_guardian::{
    AnalysisRequest, AttemptError, ErrorKind, Language, RemoteClient, RemoteError, ServerConfig,
};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio_test::{assert_err, assert_ok};

struct Running {
    url: String,
    stop: Option<oneshot::Sender<()>>,
    handle: tokio::task::JoinHandle<()>,
}

impl Running {
    async fn stop(mut self) {
        if let Some(tx) = self.stop.take() {
            let _ = tx.send(());
        }
        assert_ok!(self.handle.await);
    }
}

async fn start(generator: Arc<Scripted>, models: &[&str]) -> Running {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    let (tx, rx) = oneshot::channel::<()>();
    let analyzer = analyzer(config(models), generator);

    let handle = tokio::spawn(async move {
        let shutdown = async {
            let _ = rx.await;
        };
        serve_with_shutdown(listener, ServerConfig::default(), analyzer, shutdown)
            .await
            .unwrap();
    });
    Running {
        url,
        stop: Some(tx),
        handle,
    }
}

#[tokio::test]
async fn remote_text_analysis_round_trip() {
    let gen = Arc::new(Scripted::new().reply("gemini-2.5-flash", GUIDE_JSON));
    let server = start(gen.clone(), &["gemini-2.5-flash"]).await;
    let client = RemoteClient::new(&server.url, 10).unwrap();

    let request = AnalysisRequest::text("Mitosis notes", Language::Arabic).unwrap();
    let result = assert_ok!(client.analyze(&request).await);

    assert_eq!(result.used_model, "gemini-2.5-flash");
    assert_eq!(result.exam_questions.len(), 5);
    assert_eq!(gen.calls().len(), 1);

    server.stop().await;
}

#[tokio::test]
async fn remote_image_upload_keeps_mime_type() {
    let gen = Arc::new(Scripted::new().reply("gemini-2.5-flash", GUIDE_JSON));
    let server = start(gen.clone(), &["gemini-2.5-flash"]).await;
    let client = RemoteClient::new(&server.url, 10).unwrap();

    let request = AnalysisRequest::document(
        vec![0x89, b'P', b'N', b'G'],
        "image/png",
        Some("slide.png".into()),
        Language::English,
        1024,
    )
    .unwrap();
    assert_ok!(client.analyze(&request).await);

    let calls = gen.calls();
    assert!(matches!(
        &calls[0].request.parts[1],
        study_guardian::pipeline::assemble::ContentPart::InlineData { mime_type, .. } if mime_type == "image/png"
    ));

    server.stop().await;
}

#[tokio::test]
async fn remote_errors_carry_kind_and_friendly_text() {
    let gen = Arc::new(Scripted::new().fail(
        "gemini-2.5-flash",
        AttemptError::RateLimited {
            model: "gemini-2.5-flash".into(),
            message: "quota".into(),
        },
    ));
    let server = start(gen, &["gemini-2.5-flash"]).await;
    let client = RemoteClient::new(&server.url, 10).unwrap();

    let request = AnalysisRequest::text("notes", Language::English).unwrap();
    let err = assert_err!(client.analyze(&request).await);

    match &err {
        RemoteError::Api { status, body } => {
            assert_eq!(*status, 500);
            assert_eq!(body.kind, Some(ErrorKind::RateLimited));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(
        err.to_string(),
        "Usage limit exceeded. Please wait a moment and try again."
    );

    server.stop().await;
}

#[tokio::test]
async fn remote_health() {
    let server = start(Arc::new(Scripted::new()), &["gemini-2.5-flash"]).await;
    let client = RemoteClient::new(&server.url, 10).unwrap();

    let health = assert_ok!(client.health().await);
    assert_eq!(health.status, "ok");
    assert_eq!(health.keys_configured, 1);

    server.stop().await;
}
