//! Paced transmission
//!
//! At 4800 baud with XON/XOFF the Minitel cannot absorb a large burst, so
//! every payload goes out in small chunks, each flushed and followed by a
//! short pause.

use std::io::{self, Write};
use std::time::Duration;

use crate::sleeper::Sleeper;

/// Default chunk size in bytes
pub const DEFAULT_CHUNK_SIZE: usize = 32;

/// Default pause after each chunk
pub const DEFAULT_CHUNK_GAP: Duration = Duration::from_millis(10);

/// Burst size and inter-burst pause
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    /// Bytes written per burst (values below 1 are treated as 1)
    pub chunk_size: usize,
    /// Pause after every burst
    pub gap: Duration,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            gap: DEFAULT_CHUNK_GAP,
        }
    }
}

impl Pacing {
    /// Number of bursts needed for a payload of `len` bytes
    pub fn chunks_for(&self, len: usize) -> usize {
        len.div_ceil(self.chunk_size.max(1))
    }
}

/// Writes payloads in paced, flushed bursts
#[derive(Debug, Clone, Copy, Default)]
pub struct PacedTransmitter {
    pacing: Pacing,
}

impl PacedTransmitter {
    pub fn new(pacing: Pacing) -> Self {
        Self { pacing }
    }

    pub fn pacing(&self) -> Pacing {
        self.pacing
    }

    /// Send `bytes` to `out`, blocking until every burst is written
    ///
    /// Byte order is preserved and nothing is dropped. Returns the number
    /// of bursts written. Any write or flush failure is returned as-is.
    pub fn send<W>(&self, out: &mut W, bytes: &[u8], sleeper: &dyn Sleeper) -> io::Result<usize>
    where
        W: Write + ?Sized,
    {
        let mut bursts = 0;
        for chunk in bytes.chunks(self.pacing.chunk_size.max(1)) {
            out.write_all(chunk)?;
            out.flush()?;
            sleeper.sleep(self.pacing.gap);
            bursts += 1;
        }
        Ok(bursts)
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::sleeper::MockSleeper;

    /// Records each write call separately
    #[derive(Default)]
    struct Recorder {
        writes: Vec<Vec<u8>>,
        flushes: usize,
    }

    impl Write for Recorder {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.writes.push(buf.to_vec());
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            self.flushes += 1;
            Ok(())
        }
    }

    struct Broken;

    impl Write for Broken {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "link down"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_send_chunks_and_pauses() {
        let tx = PacedTransmitter::default();
        let sleeper = MockSleeper::new();
        let mut out = Recorder::default();
        let payload: Vec<u8> = (0..70u8).collect();

        let bursts = tx.send(&mut out, &payload, &sleeper).unwrap();

        assert_eq!(bursts, 3);
        assert_eq!(out.writes.len(), 3);
        assert_eq!(out.writes[0].len(), 32);
        assert_eq!(out.writes[1].len(), 32);
        assert_eq!(out.writes[2].len(), 6);
        assert_eq!(out.flushes, 3);
        assert_eq!(sleeper.call_count(), 3);
        assert_eq!(sleeper.total_duration(), Duration::from_millis(30));
    }

    #[test]
    fn test_send_empty_payload() {
        let tx = PacedTransmitter::default();
        let sleeper = MockSleeper::new();
        let mut out = Recorder::default();

        assert_eq!(tx.send(&mut out, b"", &sleeper).unwrap(), 0);
        assert!(out.writes.is_empty());
        assert_eq!(sleeper.call_count(), 0);
    }

    #[test]
    fn test_send_propagates_write_failure() {
        let tx = PacedTransmitter::default();
        let err = tx.send(&mut Broken, b"hello", &MockSleeper::new()).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }

    #[test]
    fn test_zero_chunk_size_is_one() {
        let pacing = Pacing {
            chunk_size: 0,
            gap: Duration::ZERO,
        };
        assert_eq!(pacing.chunks_for(5), 5);

        let mut out = Recorder::default();
        PacedTransmitter::new(pacing)
            .send(&mut out, b"abcde", &MockSleeper::new())
            .unwrap();
        assert_eq!(out.writes.len(), 5);
    }

    proptest! {
        #[test]
        fn prop_chunking_preserves_payload(payload in proptest::collection::vec(any::<u8>(), 0..500)) {
            let tx = PacedTransmitter::default();
            let mut out = Recorder::default();
            tx.send(&mut out, &payload, &MockSleeper::new()).unwrap();

            prop_assert_eq!(out.writes.len(), payload.len().div_ceil(32));
            prop_assert!(out.writes.iter().all(|w| !w.is_empty() && w.len() <= 32));
            let joined: Vec<u8> = out.writes.concat();
            prop_assert_eq!(joined, payload);
        }
    }
}
