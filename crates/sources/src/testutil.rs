//! Test doubles shared by the listener tests

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use hepflow_protocol::HepPacket;
use hepflow_sinks::{SearchParams, SearchResult, Writer, WriterError, WriterStats};
use parking_lot::Mutex;

/// Writer that captures submitted packets in memory.
#[derive(Default)]
pub(crate) struct CaptureWriter {
    pub packets: Mutex<Vec<HepPacket>>,
    pub reject: AtomicBool,
}

impl CaptureWriter {
    pub fn count(&self) -> usize {
        self.packets.lock().len()
    }
}

#[async_trait]
impl Writer for CaptureWriter {
    async fn submit(&self, packet: HepPacket) -> Result<(), WriterError> {
        if self.reject.load(Ordering::SeqCst) {
            return Err(WriterError::Backpressure);
        }
        self.packets.lock().push(packet);
        Ok(())
    }

    async fn flush(&self) -> Result<(), WriterError> {
        Ok(())
    }

    async fn close(&self) -> Result<(), WriterError> {
        Ok(())
    }

    async fn search(&self, _params: SearchParams) -> Result<SearchResult, WriterError> {
        Err(WriterError::Unsupported)
    }

    fn stats(&self) -> WriterStats {
        WriterStats::default()
    }
}

/// Poll until `condition` holds or a 2 second deadline passes.
pub(crate) async fn wait_until(what: &str, condition: impl Fn() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while !condition() {
        if tokio::time::Instant::now() > deadline {
            panic!("timed out waiting for {what}");
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// A valid v3 wire buffer for driving listeners.
pub(crate) fn sample_wire_packet(node_id: u32) -> Vec<u8> {
    let packet = HepPacket {
        version: 3,
        family: 2,
        protocol: 17,
        proto_type: 1,
        src_ip: "192.168.1.1".into(),
        dst_ip: "192.168.1.2".into(),
        src_port: 5060,
        dst_port: 5060,
        timestamp: 1_700_000_000,
        node_id,
        payload: b"OPTIONS sip:ping SIP/2.0".to_vec(),
        ..Default::default()
    };
    hepflow_protocol::encode(&packet).expect("sample packet encodes")
}
