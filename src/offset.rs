//! Topic partition identity and committed consumer positions.

/// A specific ordered partition within a named topic.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TopicPartition {
    pub topic: String,
    pub partition: i32,
}

impl TopicPartition {
    pub fn new(topic: impl Into<String>, partition: i32) -> Self {
        Self {
            topic: topic.into(),
            partition,
        }
    }
}

/// A consumer group's last acknowledged position in one partition.
///
/// Note that if there is no offset associated with a topic-partition under
/// that consumer group the broker does not set an error code, but returns
/// empty metadata and an offset of -1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumerOffset {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    pub metadata: Option<String>,
    pub error_code: i16,
}

impl ConsumerOffset {
    pub fn new(topic: impl Into<String>, partition: i32, offset: i64) -> Self {
        Self {
            topic: topic.into(),
            partition,
            offset,
            metadata: None,
            error_code: 0,
        }
    }

    /// A new snapshot of the same partition at another position.
    pub fn with_offset(&self, offset: i64, metadata: Option<String>) -> Self {
        Self {
            topic: self.topic.clone(),
            partition: self.partition,
            offset,
            metadata,
            error_code: self.error_code,
        }
    }

    pub fn topic_partition(&self) -> TopicPartition {
        TopicPartition::new(self.topic.clone(), self.partition)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn with_offset_keeps_identity() {
        let committed = ConsumerOffset::new("purchases", 3, 10);
        let next = committed.with_offset(11, Some("batch 7".to_string()));

        assert_eq!(next.topic_partition(), TopicPartition::new("purchases", 3));
        assert_eq!(next.offset, 11);
        assert_eq!(next.metadata.as_deref(), Some("batch 7"));
        assert_eq!(committed.offset, 10);
        assert_eq!(committed.metadata, None);
    }

    #[test]
    fn topic_partitions_order_by_topic_then_partition() {
        let mut tps = vec![
            TopicPartition::new("b", 0),
            TopicPartition::new("a", 1),
            TopicPartition::new("a", 0),
        ];
        tps.sort();
        assert_eq!(
            tps,
            vec![
                TopicPartition::new("a", 0),
                TopicPartition::new("a", 1),
                TopicPartition::new("b", 0),
            ]
        );
    }
}
