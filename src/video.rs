use bytebuffer::ByteBuffer;
use log::{debug, warn};
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::{spawn, task};

use crate::errors::Result;

pub const VIDEO_WIDTH: u32 = 960;
pub const VIDEO_HEIGHT: u32 = 720;

const VIDEO_UDP_PORT: u32 = 11111;
const MAX_CHUNK_SIZE: usize = 1460;

pub type TelloVideoSender = mpsc::UnboundedSender<TelloVideoFrame>;
pub type TelloVideoReceiver = mpsc::UnboundedReceiver<TelloVideoFrame>;

pub fn make_tello_video_channel() -> (TelloVideoSender, TelloVideoReceiver) {
    mpsc::unbounded_channel()
}

/// One h264 access unit from the drone's 960x720 feed.
#[derive(Debug)]
pub struct TelloVideoFrame {
    pub data: Vec<u8>,
}

/// Reassembles the drone's video datagrams into whole frames. A chunk
/// shorter than the maximum datagram size ends the current frame.
struct FrameAssembler {
    buf: ByteBuffer,
}

impl FrameAssembler {
    fn new() -> Self {
        Self { buf: ByteBuffer::new() }
    }

    fn push(&mut self, chunk: &[u8]) -> Option<Vec<u8>> {
        if chunk.is_empty() {
            return None;
        }

        self.buf.write_bytes(chunk);

        if chunk.len() < MAX_CHUNK_SIZE {
            let complete = std::mem::replace(&mut self.buf, ByteBuffer::new());
            Some(complete.into_vec())
        } else {
            None
        }
    }
}

/// Background task receiving the video stream and passing reassembled
/// frames down the channel.
#[derive(Debug)]
pub(crate) struct VideoListener {
    task: task::JoinHandle<()>,
}

impl VideoListener {
    pub(crate) async fn start_listening(sender: TelloVideoSender) -> Result<Self> {
        let local_address = format!("0.0.0.0:{VIDEO_UDP_PORT}");
        debug!("video listener starting at {local_address}");

        let sock = UdpSocket::bind(&local_address).await?;

        let task = spawn(async move {
            let mut assembler = FrameAssembler::new();
            let mut chunk = vec![0; MAX_CHUNK_SIZE];
            loop {
                let n = match sock.recv(&mut chunk).await {
                    Ok(n) => n,
                    Err(err) => {
                        warn!("video receive failed: {err}");
                        break;
                    }
                };

                if let Some(data) = assembler.push(&chunk[..n]) {
                    // receiver gone means the display has shut down
                    if sender.send(TelloVideoFrame { data }).is_err() {
                        break;
                    }
                }
            }
        });

        Ok(Self { task })
    }

    pub(crate) fn stop_listening(&self) {
        debug!("video listener stopping");
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_chunk_completes_a_frame() {
        let mut assembler = FrameAssembler::new();
        assert!(assembler.push(&[7u8; MAX_CHUNK_SIZE]).is_none());
        assert!(assembler.push(&[7u8; MAX_CHUNK_SIZE]).is_none());

        let frame = assembler.push(&[1, 2, 3]).unwrap();
        assert_eq!(frame.len(), 2 * MAX_CHUNK_SIZE + 3);
        assert_eq!(&frame[frame.len() - 3..], &[1, 2, 3]);
    }

    #[test]
    fn next_frame_starts_clean() {
        let mut assembler = FrameAssembler::new();
        assembler.push(&[9u8; 100]).unwrap();

        let frame = assembler.push(&[4, 5]).unwrap();
        assert_eq!(frame, vec![4, 5]);
    }

    #[test]
    fn empty_datagram_is_ignored() {
        let mut assembler = FrameAssembler::new();
        assert!(assembler.push(&[]).is_none());
        let frame = assembler.push(&[8u8; 10]).unwrap();
        assert_eq!(frame.len(), 10);
    }
}
