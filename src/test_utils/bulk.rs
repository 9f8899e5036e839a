use tonic::async_trait;

use crate::bulk::BulkRequestIterator;
use crate::proto::BulkRequest;

/// Iterator over a fixed list, optionally asking for a rollback right
/// after the item at `rollback_at`.
pub struct SliceBulkIterator {
    items: Vec<BulkRequest>,
    position: usize,
    current: Option<BulkRequest>,
    rollback_at: Option<usize>,
    rollback: bool,
}

impl SliceBulkIterator {
    pub fn new(items: Vec<BulkRequest>) -> Self {
        Self {
            items,
            position: 0,
            current: None,
            rollback_at: None,
            rollback: false,
        }
    }

    pub fn rollback_after(
        mut self,
        index: usize,
    ) -> Self {
        self.rollback_at = Some(index);
        self
    }
}

#[async_trait]
impl BulkRequestIterator for SliceBulkIterator {
    async fn next(&mut self) -> bool {
        if self.rollback_at == Some(self.position) {
            self.rollback_at = None;
            self.rollback = true;
            self.current = None;
            return true;
        }
        if self.position >= self.items.len() {
            self.current = None;
            return false;
        }
        self.current = Some(self.items[self.position].clone());
        self.position += 1;
        true
    }

    fn request(&self) -> Option<&BulkRequest> {
        self.current.as_ref()
    }

    fn rollback_requested(&mut self) -> bool {
        std::mem::take(&mut self.rollback)
    }
}
