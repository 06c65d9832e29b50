//! Lazy stream of validated message lines.
//!
//! This is the outer layer of the decoder: whatever the source produces,
//! only lines splitting into exactly 22 comma-separated fields make it
//! through.  Anything else is logged and dropped, the stream keeps running.
//!

use tracing::error;

use tarmac_formats::MSG_FIELDS;

use crate::MessageSource;

/// Iterator adapter over a [MessageSource].
///
/// The iterator ends on source exhaustion or on a fatal source error, both
/// tear the stream down in an orderly way.
///
#[derive(Debug)]
pub struct MessageStream<S: MessageSource> {
    source: S,
}

impl<S: MessageSource> MessageStream<S> {
    pub fn new(source: S) -> Self {
        MessageStream { source }
    }
}

impl<S: MessageSource> Iterator for MessageStream<S> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        loop {
            match self.source.next_line() {
                Ok(Some(line)) => {
                    let len = line.split(',').count();
                    if len == MSG_FIELDS {
                        return Some(line);
                    }
                    error!(
                        "received wrong message length ({}/{}), skipping message '{}'",
                        len, MSG_FIELDS, line
                    );
                }
                Ok(None) => return None,
                Err(e) => {
                    error!("{}: {}", self.source.name(), e);
                    return None;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::MemorySource;

    const GOOD: &str = "MSG,8,1,1,400BE5,1,2019/10/16,20:48:00.473,2019/10/16,20:48:00.473,,,,,,,,,,,,0";

    #[test]
    fn test_stream_drops_short_lines() {
        let src = MemorySource::new(["garbage", GOOD, "MSG,3,too,short", ""]);
        let lines: Vec<String> = MessageStream::new(src).collect();

        assert_eq!(vec![GOOD.to_owned()], lines);
    }

    #[test]
    fn test_stream_keeps_running_after_bad_line() {
        let src = MemorySource::new(["x,y", GOOD, "z", GOOD]);
        let count = MessageStream::new(src).count();

        assert_eq!(2, count);
    }
}
