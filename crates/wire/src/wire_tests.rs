// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire format tests: length-prefix framing and message encoding.

use super::*;
use crate::UpdateData;
use capd_core::CaptureStatus;

#[test]
fn status_message_uses_type_and_data_keys() {
    let encoded = encode(&WorkerMessage::Status(CaptureStatus::STARTED)).unwrap();
    let json: serde_json::Value = serde_json::from_slice(&encoded).unwrap();

    assert_eq!(json, serde_json::json!({ "type": "status", "data": 3 }));
}

#[test]
fn update_message_carries_sample_fields() {
    let message = WorkerMessage::Update(UpdateData { time: 10, received: 4, rate: 0.8, total: 40 });
    let json: serde_json::Value = serde_json::from_slice(&encode(&message).unwrap()).unwrap();

    assert_eq!(json["type"], "update");
    assert_eq!(json["data"]["received"], 4);
    assert_eq!(json["data"]["total"], 40);
}

#[test]
fn untagged_message_fails_to_decode() {
    let err = decode::<WorkerMessage>(br#"{"data": 3}"#).unwrap_err();
    assert!(err.is_malformed());
}

#[test]
fn unknown_tag_fails_to_decode() {
    let err = decode::<WorkerMessage>(br#"{"type": "shutdown", "data": null}"#).unwrap_err();
    assert!(err.is_malformed());
}

#[tokio::test]
async fn write_message_adds_length_prefix() {
    let data = b"test data";

    let mut buffer = Vec::new();
    write_message(&mut buffer, data).await.unwrap();

    let len = u32::from_be_bytes([buffer[0], buffer[1], buffer[2], buffer[3]]) as usize;
    assert_eq!(len, data.len());
    assert_eq!(&buffer[4..], data);
}

#[tokio::test]
async fn read_worker_message_skips_past_malformed_frame() {
    let mut buffer = Vec::new();
    write_message(&mut buffer, b"not json").await.unwrap();
    write_worker_message(&mut buffer, &WorkerMessage::Status(CaptureStatus::STOPPED))
        .await
        .unwrap();

    let mut cursor = std::io::Cursor::new(buffer);
    let first = read_worker_message(&mut cursor).await.unwrap_err();
    let second = read_worker_message(&mut cursor).await.unwrap();

    assert!(first.is_malformed());
    assert_eq!(second, WorkerMessage::Status(CaptureStatus::STOPPED));
}

#[tokio::test]
async fn eof_reports_connection_closed() {
    let mut cursor = std::io::Cursor::new(Vec::<u8>::new());
    let err = read_message(&mut cursor).await.unwrap_err();
    assert!(matches!(err, ProtocolError::ConnectionClosed));
}

#[tokio::test]
async fn oversized_frame_is_rejected() {
    let mut buffer = Vec::new();
    buffer.extend_from_slice(&((MAX_MESSAGE_SIZE as u32) + 1).to_be_bytes());

    let mut cursor = std::io::Cursor::new(buffer);
    let err = read_message(&mut cursor).await.unwrap_err();
    assert!(matches!(err, ProtocolError::MessageTooLarge { .. }));
}
