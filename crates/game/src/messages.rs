use std::collections::VecDeque;

pub const MESSAGE_LOG_CAPACITY: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub text: String,
    pub at_ms: u64,
}

#[derive(Debug, Clone, Default)]
pub struct MessageLog {
    entries: VecDeque<Message>,
}

impl MessageLog {
    pub fn push(&mut self, text: impl Into<String>, at_ms: u64) {
        if self.entries.len() == MESSAGE_LOG_CAPACITY {
            self.entries.pop_front();
        }
        self.entries.push_back(Message {
            text: text.into(),
            at_ms,
        });
    }

    pub fn latest(&self) -> Option<&Message> {
        self.entries.back()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Message> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oldest_entries_are_evicted() {
        let mut log = MessageLog::default();
        for i in 0..(MESSAGE_LOG_CAPACITY + 5) {
            log.push(format!("m{i}"), i as u64);
        }
        assert_eq!(log.len(), MESSAGE_LOG_CAPACITY);
        assert_eq!(log.iter().next().map(|m| m.text.as_str()), Some("m5"));
        assert_eq!(log.latest().map(|m| m.at_ms), Some(104));
    }
}
