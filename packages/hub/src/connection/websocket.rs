//! [`Connection`] adapter over axum's upgraded WebSocket.

use async_trait::async_trait;
use axum::extract::ws::{self, Message, WebSocket};
use bytes::Bytes;
use futures_util::{
    SinkExt, StreamExt,
    stream::{SplitSink, SplitStream},
};
use tokio::sync::Mutex;

use super::{CloseFrame, Connection, Frame};
use crate::error::TransportError;

/// Upgraded axum socket split into independently locked halves, so the read
/// pump and the write pump never wait on each other.
pub struct AxumConnection {
    sink: Mutex<SplitSink<WebSocket, Message>>,
    stream: Mutex<SplitStream<WebSocket>>,
}

impl AxumConnection {
    pub fn new(socket: WebSocket) -> Self {
        let (sink, stream) = socket.split();
        Self {
            sink: Mutex::new(sink),
            stream: Mutex::new(stream),
        }
    }
}

#[async_trait]
impl Connection for AxumConnection {
    async fn read_frame(&self) -> Result<Frame, TransportError> {
        let mut stream = self.stream.lock().await;
        match stream.next().await {
            Some(Ok(message)) => Ok(from_message(message)),
            Some(Err(err)) => Err(err.into()),
            None => Err(TransportError::abnormal_closure()),
        }
    }

    async fn write_frame(&self, frame: Frame) -> Result<(), TransportError> {
        let message = into_message(frame)?;
        let mut sink = self.sink.lock().await;
        sink.send(message).await?;
        Ok(())
    }

    async fn close(&self) -> Result<(), TransportError> {
        let mut sink = self.sink.lock().await;
        sink.close().await?;
        Ok(())
    }
}

fn from_message(message: Message) -> Frame {
    match message {
        Message::Text(text) => Frame::Text(Bytes::copy_from_slice(text.as_str().as_bytes())),
        Message::Binary(payload) => Frame::Binary(payload),
        Message::Ping(payload) => Frame::Ping(payload),
        Message::Pong(payload) => Frame::Pong(payload),
        Message::Close(frame) => Frame::Close(frame.map(|frame| CloseFrame {
            code: frame.code,
            reason: frame.reason.as_str().to_owned(),
        })),
    }
}

fn into_message(frame: Frame) -> Result<Message, TransportError> {
    let message = match frame {
        Frame::Text(payload) => {
            let text = String::from_utf8(payload.to_vec()).map_err(|_| TransportError::InvalidUtf8)?;
            Message::Text(text.into())
        }
        Frame::Binary(payload) => Message::Binary(payload),
        Frame::Ping(payload) => Message::Ping(payload),
        Frame::Pong(payload) => Message::Pong(payload),
        Frame::Close(frame) => Message::Close(frame.map(|frame| ws::CloseFrame {
            code: frame.code,
            reason: frame.reason.into(),
        })),
    };
    Ok(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::ws::close_code;

    #[test]
    fn test_text_frame_round_trips_through_message() {
        // テスト項目: テキストフレームが axum の Message に変換できる
        // when (操作):
        let message = into_message(Frame::Text(Bytes::from_static(b"hello"))).unwrap();

        // then (期待する結果):
        assert_eq!(from_message(message), Frame::Text(Bytes::from_static(b"hello")));
    }

    #[test]
    fn test_invalid_utf8_text_frame_rejected() {
        // テスト項目: UTF-8 として不正なテキストフレームはエラーになる
        // when (操作):
        let result = into_message(Frame::Text(Bytes::from_static(&[0xff, 0xfe])));

        // then (期待する結果):
        assert_eq!(result.unwrap_err(), TransportError::InvalidUtf8);
    }

    #[test]
    fn test_close_frame_keeps_code_and_reason() {
        // テスト項目: クローズフレームのコードと理由が保持される
        // given (前提条件):
        let message = Message::Close(Some(ws::CloseFrame {
            code: close_code::AWAY,
            reason: "bye".into(),
        }));

        // when (操作):
        let frame = from_message(message);

        // then (期待する結果):
        assert_eq!(
            frame,
            Frame::Close(Some(CloseFrame {
                code: close_code::AWAY,
                reason: "bye".to_string(),
            }))
        );
    }
}
