use honyaku_types::{AppEvent, TextSource};
use std::time::Duration;
use tokio::time::timeout;

use crate::io::parse_input;

#[test]
fn test_plain_line_is_manual_translation() {
    match parse_input("  こんにちは  ") {
        Some(AppEvent::Translate { text, source }) => {
            assert_eq!(text, "こんにちは");
            assert_eq!(source, TextSource::Manual);
        }
        other => panic!("unexpected event: {:?}", other),
    }
}

#[test]
fn test_commands() {
    assert!(matches!(parse_input(":copy"), Some(AppEvent::CopyResult)));
    assert!(matches!(parse_input(":reset"), Some(AppEvent::ResetModel)));
    assert!(matches!(parse_input(":load"), Some(AppEvent::LoadModel)));
    match parse_input(":model gemma2:2b") {
        Some(AppEvent::SelectModel(id)) => assert_eq!(id, "gemma2:2b"),
        other => panic!("unexpected event: {:?}", other),
    }
}

#[test]
fn test_blank_and_unknown_lines_are_dropped() {
    assert!(parse_input("   ").is_none());
    assert!(parse_input(":model").is_none());
    assert!(parse_input(":frobnicate").is_none());
}

#[tokio::test]
async fn test_sync_sender_reaches_async_receiver() {
    // Clipboard callbacks run on a blocking thread
    let (tx, rx) = kanal::bounded_async::<AppEvent>(4);
    let sync_tx = tx.clone_sync();

    std::thread::spawn(move || {
        sync_tx
            .send(AppEvent::Translate {
                text: "copied".into(),
                source: TextSource::Clipboard,
            })
            .expect("send failed");
    });

    let result = timeout(Duration::from_secs(2), rx.recv()).await;
    match result {
        Ok(Ok(AppEvent::Translate { text, source })) => {
            assert_eq!(text, "copied");
            assert_eq!(source, TextSource::Clipboard);
        }
        Ok(Ok(_)) => panic!("Wrong event type"),
        Ok(Err(e)) => panic!("Channel error: {}", e),
        Err(_) => panic!("Timeout - event from blocking thread never arrived"),
    }
}
