use tokio::sync::broadcast;

pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Titles,
    Chapters,
    History,
    Categories,
    Sources,
}

/// Emitted after a committed write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreChange {
    pub collection: Collection,
    /// Affected record ids. Empty means "possibly everything" (clears).
    pub ids: Vec<String>,
}

impl StoreChange {
    pub fn touches(&self, id: &str) -> bool {
        self.ids.is_empty() || self.ids.iter().any(|changed| changed == id)
    }
}

#[derive(Debug, Clone)]
pub struct ChangeNotifier {
    tx: broadcast::Sender<StoreChange>,
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }
}

impl ChangeNotifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        self.tx.subscribe()
    }

    pub fn emit<I>(&self, collection: Collection, ids: I)
    where
        I: IntoIterator<Item = String>,
    {
        // No subscribers is fine
        let _ = self.tx.send(StoreChange {
            collection,
            ids: ids.into_iter().collect(),
        });
    }

    pub fn emit_all(&self, collection: Collection) {
        self.emit(collection, std::iter::empty());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscribers_receive_changes() {
        let notifier = ChangeNotifier::default();
        let mut rx = notifier.subscribe();

        notifier.emit(Collection::Chapters, vec!["a".to_string()]);
        let change = rx.recv().await.unwrap();
        assert_eq!(change.collection, Collection::Chapters);
        assert!(change.touches("a"));
        assert!(!change.touches("b"));
    }

    #[test]
    fn test_emit_without_subscribers() {
        let notifier = ChangeNotifier::default();
        notifier.emit_all(Collection::History);
    }

    #[test]
    fn test_empty_ids_touch_everything() {
        let change = StoreChange {
            collection: Collection::History,
            ids: Vec::new(),
        };
        assert!(change.touches("anything"));
    }
}
