//! Canned message source for the test benches.
//!

use std::collections::VecDeque;

use crate::{MessageSource, SourceError};

#[derive(Debug, Default)]
pub struct MemorySource {
    lines: VecDeque<String>,
}

impl MemorySource {
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        MemorySource {
            lines: lines.into_iter().map(Into::into).collect(),
        }
    }
}

impl MessageSource for MemorySource {
    fn name(&self) -> String {
        "memory".to_owned()
    }

    fn next_line(&mut self) -> Result<Option<String>, SourceError> {
        Ok(self.lines.pop_front())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_source_drains() -> Result<(), SourceError> {
        let mut src = MemorySource::new(["a", "b"]);
        assert_eq!(Some("a".to_owned()), src.next_line()?);
        assert_eq!(Some("b".to_owned()), src.next_line()?);
        assert_eq!(None, src.next_line()?);
        assert_eq!(None, src.next_line()?);
        Ok(())
    }
}
