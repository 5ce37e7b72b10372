//! ListLevelsHandler - Active levels in privilege order.

use std::sync::Arc;

use crate::application::retry::with_retry;
use crate::domain::membership::{MembershipError, MembershipLevel};
use crate::ports::LevelRepository;

/// Query for the purchasable level registry.
#[derive(Debug, Clone, Default)]
pub struct ListLevelsQuery;

/// Read-only handler returning active levels ordered by `sort_order`.
pub struct ListLevelsHandler {
    levels: Arc<dyn LevelRepository>,
}

impl ListLevelsHandler {
    pub fn new(levels: Arc<dyn LevelRepository>) -> Self {
        Self { levels }
    }

    pub async fn handle(
        &self,
        _query: ListLevelsQuery,
    ) -> Result<Vec<MembershipLevel>, MembershipError> {
        Ok(with_retry(|| self.levels.list_active()).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryStore;
    use crate::domain::foundation::LevelId;

    #[tokio::test]
    async fn lists_active_levels_in_sort_order() {
        let store = Arc::new(InMemoryStore::new());
        for (name, sort_order) in [("Gold", 20), ("Bronze", 1), ("Silver", 10)] {
            let level =
                MembershipLevel::create(LevelId::new(), name, sort_order, 10_000, 30).unwrap();
            store.save(&level).await.unwrap();
        }
        let mut legacy =
            MembershipLevel::create(LevelId::new(), "Legacy", 5, 10_000, 30).unwrap();
        store.save(&legacy).await.unwrap();
        legacy.retire().unwrap();
        store.update(&legacy).await.unwrap();

        let handler = ListLevelsHandler::new(store.clone());
        let levels = handler.handle(ListLevelsQuery).await.unwrap();

        let names: Vec<&str> = levels.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["Bronze", "Silver", "Gold"]);
    }
}
