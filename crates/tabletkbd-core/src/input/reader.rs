// Tabletkbd Input Layer - Event Stream Reader
// Reads whole input_event records from a blocking byte stream

use std::fs::File;
use std::io::{self, ErrorKind, Read};
use std::path::Path;

use super::event::{RawInputEvent, EVENT_SIZE};

/// Reads fixed-width kernel records from any byte stream.
///
/// A short trailing read (fewer than `EVENT_SIZE` bytes before end of
/// stream) is treated as end of stream, and the dangling bytes are dropped.
pub struct EventReader<R> {
    inner: R,
    records_read: u64,
}

impl EventReader<File> {
    /// Open a kernel device node read-only.
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        Ok(Self::new(File::open(path)?))
    }
}

impl<R: Read> EventReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            records_read: 0,
        }
    }

    /// Number of whole records decoded so far
    pub fn records_read(&self) -> u64 {
        self.records_read
    }

    /// Block until the next record is available.
    ///
    /// Returns `Ok(None)` at end of stream.
    pub fn next_event(&mut self) -> io::Result<Option<RawInputEvent>> {
        let mut buf = [0u8; EVENT_SIZE];
        let mut filled = 0;

        while filled < EVENT_SIZE {
            match self.inner.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }

        if filled < EVENT_SIZE {
            if filled > 0 {
                log::debug!("Dropping {} trailing bytes of a partial record", filled);
            }
            return Ok(None);
        }

        self.records_read += 1;
        Ok(Some(RawInputEvent::from_bytes(&buf)))
    }
}

impl<R: Read> Iterator for EventReader<R> {
    type Item = io::Result<RawInputEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_event().transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn stream(events: &[RawInputEvent]) -> Vec<u8> {
        events.iter().flat_map(|e| e.to_bytes()).collect()
    }

    /// Hands out at most `chunk` bytes per read, like a slow device.
    struct Trickle {
        data: Vec<u8>,
        pos: usize,
        chunk: usize,
    }

    impl Read for Trickle {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = self.chunk.min(buf.len()).min(self.data.len() - self.pos);
            buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }

    struct Broken;

    impl Read for Broken {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(ErrorKind::Other, "device unplugged"))
        }
    }

    #[test]
    fn test_reads_whole_records() {
        let events = [RawInputEvent::new(5, 1, 1), RawInputEvent::new(0, 0, 0)];
        let mut reader = EventReader::new(Cursor::new(stream(&events)));

        assert_eq!(reader.next_event().unwrap(), Some(events[0]));
        assert_eq!(reader.next_event().unwrap(), Some(events[1]));
        assert_eq!(reader.next_event().unwrap(), None);
        assert_eq!(reader.records_read(), 2);
    }

    #[test]
    fn test_partial_trailing_record_ends_stream() {
        let mut data = stream(&[RawInputEvent::new(5, 1, 0)]);
        data.extend_from_slice(&[0xAA; 10]);
        let reader = EventReader::new(Cursor::new(data));

        let events: Vec<_> = reader.map(|e| e.unwrap()).collect();
        assert_eq!(events, vec![RawInputEvent::new(5, 1, 0)]);
    }

    #[test]
    fn test_empty_stream() {
        let mut reader = EventReader::new(Cursor::new(Vec::new()));
        assert!(reader.next_event().unwrap().is_none());
    }

    #[test]
    fn test_split_reads_are_reassembled() {
        let events = [RawInputEvent::new(5, 1, 1), RawInputEvent::new(5, 1, 0)];
        let reader = EventReader::new(Trickle {
            data: stream(&events),
            pos: 0,
            chunk: 5,
        });

        let decoded: Vec<_> = reader.map(|e| e.unwrap()).collect();
        assert_eq!(decoded, events.to_vec());
    }

    #[test]
    fn test_read_error_is_reported() {
        let mut reader = EventReader::new(Broken);
        assert!(reader.next_event().is_err());
    }
}
