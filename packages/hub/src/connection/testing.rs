//! Channel-backed [`Connection`] for unit tests.

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;
use tokio::sync::{Mutex, mpsc};

use super::{Connection, Frame};
use crate::error::TransportError;

/// Test side of a [`ChannelConnection`].
pub(crate) struct Peer {
    /// Frames (or errors) the client will read.
    pub inbound: mpsc::UnboundedSender<Result<Frame, TransportError>>,
    /// Frames the client wrote.
    pub outbound: mpsc::UnboundedReceiver<Frame>,
    pub close_count: Arc<AtomicUsize>,
}

impl Peer {
    pub fn close_count(&self) -> usize {
        self.close_count.load(Ordering::SeqCst)
    }
}

pub(crate) struct ChannelConnection {
    inbound: Mutex<mpsc::UnboundedReceiver<Result<Frame, TransportError>>>,
    outbound: mpsc::UnboundedSender<Frame>,
    close_count: Arc<AtomicUsize>,
}

impl ChannelConnection {
    pub fn pair() -> (Arc<Self>, Peer) {
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let close_count = Arc::new(AtomicUsize::new(0));
        let connection = Arc::new(Self {
            inbound: Mutex::new(inbound_rx),
            outbound: outbound_tx,
            close_count: close_count.clone(),
        });
        let peer = Peer {
            inbound: inbound_tx,
            outbound: outbound_rx,
            close_count,
        };
        (connection, peer)
    }
}

#[async_trait]
impl Connection for ChannelConnection {
    async fn read_frame(&self) -> Result<Frame, TransportError> {
        let mut inbound = self.inbound.lock().await;
        match inbound.recv().await {
            Some(frame) => frame,
            None => Err(TransportError::abnormal_closure()),
        }
    }

    async fn write_frame(&self, frame: Frame) -> Result<(), TransportError> {
        self.outbound
            .send(frame)
            .map_err(|_| TransportError::Io("peer dropped".to_string()))
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.close_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Never completes any operation, like a peer that stopped reading.
pub(crate) struct StalledConnection;

#[async_trait]
impl Connection for StalledConnection {
    async fn read_frame(&self) -> Result<Frame, TransportError> {
        std::future::pending().await
    }

    async fn write_frame(&self, _frame: Frame) -> Result<(), TransportError> {
        std::future::pending().await
    }

    async fn close(&self) -> Result<(), TransportError> {
        std::future::pending().await
    }
}
