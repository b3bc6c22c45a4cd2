//! Demultiplexer for the container engine's combined output stream
//!
//! Exec and attach endpoints interleave stdout and stderr on one connection.
//! Each frame starts with an 8-byte header: a one-byte stream selector
//! (0=stdin, 1=stdout, 2=stderr), three bytes of padding, and a big-endian
//! u32 payload length; the payload follows immediately. Frames can be split
//! arbitrarily across network chunks, so the parser is incremental.

use tracing::warn;

/// Header length preceding every frame payload
const HEADER_LEN: usize = 8;

/// Output channel a frame belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StdStream {
    Stdin,
    Stdout,
    Stderr,
}

impl StdStream {
    fn from_selector(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(StdStream::Stdin),
            1 => Some(StdStream::Stdout),
            2 => Some(StdStream::Stderr),
            _ => None,
        }
    }
}

/// A single demultiplexed frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub stream: StdStream,
    pub payload: Vec<u8>,
}

/// Incremental frame parser
///
/// Feed raw chunks as they arrive; complete frames are returned as soon as
/// their payload is fully buffered. Headers and payloads may span chunk
/// boundaries.
#[derive(Debug, Default)]
pub struct FrameDemuxer {
    buf: Vec<u8>,
}

impl FrameDemuxer {
    pub fn new() -> Self {
        FrameDemuxer::default()
    }

    /// Feed a chunk, returning every frame completed by it
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<Frame> {
        self.buf.extend_from_slice(chunk);

        let mut frames = Vec::new();
        loop {
            if self.buf.len() < HEADER_LEN {
                break;
            }
            let len = u32::from_be_bytes([self.buf[4], self.buf[5], self.buf[6], self.buf[7]])
                as usize;
            if self.buf.len() < HEADER_LEN + len {
                break;
            }

            let selector = self.buf[0];
            let payload: Vec<u8> = self.buf[HEADER_LEN..HEADER_LEN + len].to_vec();
            self.buf.drain(..HEADER_LEN + len);

            match StdStream::from_selector(selector) {
                Some(stream) => frames.push(Frame { stream, payload }),
                None => warn!(selector, "skipping frame with unknown stream selector"),
            }
        }
        frames
    }

    /// Bytes still buffered waiting for the rest of a frame
    pub fn pending(&self) -> usize {
        self.buf.len()
    }
}

/// Demultiplex a complete buffer in one pass
pub fn demux(buf: &[u8]) -> Vec<Frame> {
    FrameDemuxer::new().feed(buf)
}

/// Accumulator folding frames into per-channel text
///
/// Payloads are decoded lossily; invalid UTF-8 becomes replacement
/// characters rather than failing the whole execution.
#[derive(Debug, Default)]
pub struct ExecOutput {
    pub stdout: String,
    pub stderr: String,
}

impl ExecOutput {
    pub fn new() -> Self {
        ExecOutput::default()
    }

    /// Append raw bytes to the given channel
    pub fn append(&mut self, stream: StdStream, bytes: &[u8]) {
        let text = String::from_utf8_lossy(bytes);
        match stream {
            StdStream::Stdout => self.stdout.push_str(&text),
            StdStream::Stderr => self.stderr.push_str(&text),
            StdStream::Stdin => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame_bytes(selector: u8, payload: &[u8]) -> Vec<u8> {
        let mut out = vec![selector, 0, 0, 0];
        out.extend_from_slice(&(payload.len() as u32).to_be_bytes());
        out.extend_from_slice(payload);
        out
    }

    #[test]
    fn test_single_frame() {
        let frames = demux(&frame_bytes(1, b"hello"));
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].stream, StdStream::Stdout);
        assert_eq!(frames[0].payload, b"hello");
    }

    #[test]
    fn test_interleaved_channels_keep_order_without_cross_contamination() {
        let mut buf = Vec::new();
        buf.extend(frame_bytes(1, b"out1"));
        buf.extend(frame_bytes(2, b"err1"));
        buf.extend(frame_bytes(1, b"out2"));
        buf.extend(frame_bytes(2, b"err2"));

        let mut output = ExecOutput::new();
        for frame in demux(&buf) {
            output.append(frame.stream, &frame.payload);
        }

        assert_eq!(output.stdout, "out1out2");
        assert_eq!(output.stderr, "err1err2");
    }

    #[test]
    fn test_header_split_across_chunks() {
        let bytes = frame_bytes(2, b"stderr payload");
        let mut demuxer = FrameDemuxer::new();

        // Split in the middle of the header.
        assert!(demuxer.feed(&bytes[..5]).is_empty());
        let frames = demuxer.feed(&bytes[5..]);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].stream, StdStream::Stderr);
        assert_eq!(frames[0].payload, b"stderr payload");
        assert_eq!(demuxer.pending(), 0);
    }

    #[test]
    fn test_payload_split_across_chunks() {
        let bytes = frame_bytes(1, b"split payload");
        let mut demuxer = FrameDemuxer::new();

        assert!(demuxer.feed(&bytes[..HEADER_LEN + 3]).is_empty());
        let frames = demuxer.feed(&bytes[HEADER_LEN + 3..]);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].payload, b"split payload");
    }

    #[test]
    fn test_multiple_frames_in_one_chunk() {
        let mut buf = frame_bytes(1, b"a");
        buf.extend(frame_bytes(2, b"b"));
        buf.extend(frame_bytes(1, b"c"));

        let frames = demux(&buf);
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[1].stream, StdStream::Stderr);
    }

    #[test]
    fn test_unknown_selector_skipped() {
        let mut buf = frame_bytes(7, b"junk");
        buf.extend(frame_bytes(1, b"good"));

        let frames = demux(&buf);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].payload, b"good");
    }

    #[test]
    fn test_empty_payload_frame() {
        let frames = demux(&frame_bytes(1, b""));
        assert_eq!(frames.len(), 1);
        assert!(frames[0].payload.is_empty());
    }

    #[test]
    fn test_stdin_frames_ignored_by_accumulator() {
        let mut output = ExecOutput::new();
        output.append(StdStream::Stdin, b"typed");
        assert!(output.stdout.is_empty());
        assert!(output.stderr.is_empty());
    }
}
