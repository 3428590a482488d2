use crate::{
    domain::{reposition, BoardId, Card, CardChanges, CardId, Column, ColumnId, NewCard},
    error::{KanbanError, Result},
    service::locks::KeyedLocks,
    storage::Storage,
};
use std::sync::Arc;
use tracing::{debug, info};

/// Input for a new card. Without a position the card goes to the end of
/// its column.
#[derive(Debug, Clone)]
pub struct CreateCard {
    pub board_id: BoardId,
    pub column_id: ColumnId,
    pub title: String,
    pub description: Option<String>,
    pub position: Option<i64>,
}

/// Destination of a card move. `to_position` is clamped into the
/// destination column.
#[derive(Debug, Clone)]
pub struct MoveCard {
    pub to_column_id: ColumnId,
    pub to_position: i64,
}

/// Card use cases
#[derive(Clone)]
pub struct CardService {
    storage: Arc<dyn Storage>,
    locks: KeyedLocks,
}

impl CardService {
    pub fn new(storage: Arc<dyn Storage>, locks: KeyedLocks) -> Self {
        Self { storage, locks }
    }

    pub async fn create(&self, input: CreateCard) -> Result<Card> {
        let position = match input.position {
            Some(position) => position,
            None => self.storage.list_cards(&input.column_id).await?.len() as i64,
        };

        let card = Card::new(NewCard {
            board_id: input.board_id,
            column_id: input.column_id,
            title: input.title,
            description: input.description,
            position,
        })?;

        let column = self.column(card.column_id()).await?;
        ensure_same_board(&column, card.board_id())?;

        self.storage.create_card(&card).await?;
        info!(
            card_id = %card.id(),
            column_id = %card.column_id(),
            position = card.position(),
            "card created"
        );
        Ok(card)
    }

    pub async fn get(&self, id: &CardId) -> Result<Card> {
        self.storage
            .find_card(id)
            .await?
            .ok_or_else(|| KanbanError::not_found("Card", id))
    }

    /// Edits title and description. Placement is never written here, so a
    /// move committed meanwhile stays in effect.
    pub async fn update(&self, id: &CardId, changes: CardChanges) -> Result<Card> {
        let mut card = self.get(id).await?;
        card.update_details(changes)?;
        self.storage.update_card(&card).await?;
        info!(card_id = %id, "card updated");
        self.get(id).await
    }

    /// Moves a card into `to_column_id` at the clamped `to_position` and
    /// rewrites the positions of every card in that column as one batch.
    ///
    /// The source column is left as is after a cross-column move, so gaps may
    /// remain there.
    pub async fn move_to(&self, id: &CardId, target: MoveCard) -> Result<Card> {
        let to_column_id = target.to_column_id;
        if to_column_id.is_empty() {
            return Err(KanbanError::validation("toColumnId is required"));
        }
        let target_key = column_lock_key(&to_column_id);

        // The source column must be the one locked; retry if the card moved
        // while we waited
        let (mut card, source, _guards) = loop {
            let source = self.get(id).await?.column_id().clone();
            let guards = self
                .locks
                .lock_all(&[&column_lock_key(&source), &target_key])
                .await;

            let card = self.get(id).await?;
            if card.column_id() == &source {
                break (card, source, guards);
            }
            debug!(card_id = %id, "card changed column while waiting for lock");
        };

        let column = self.column(&to_column_id).await?;
        ensure_same_board(&column, card.board_id())?;

        let siblings = self.storage.list_cards(&to_column_id).await?;
        card.move_to(to_column_id.clone(), target.to_position.max(0))?;
        let ordered = reposition(siblings, card, target.to_position);

        self.storage.update_cards(&ordered).await?;
        debug!(column_id = %to_column_id, cards = ordered.len(), "column reindexed");

        let moved = ordered
            .into_iter()
            .find(|c| c.id() == id)
            .ok_or_else(|| KanbanError::not_found("Card", id))?;
        info!(
            card_id = %id,
            from_column = %source,
            to_column = %to_column_id,
            position = moved.position(),
            "card moved"
        );
        Ok(moved)
    }

    pub async fn delete(&self, id: &CardId) -> Result<()> {
        self.get(id).await?;
        self.storage.delete_card(id).await?;
        info!(card_id = %id, "card deleted");
        Ok(())
    }

    async fn column(&self, id: &ColumnId) -> Result<Column> {
        self.storage
            .find_column(id)
            .await?
            .ok_or_else(|| KanbanError::not_found("Column", id))
    }
}

fn column_lock_key(column_id: &ColumnId) -> String {
    format!("column:{column_id}")
}

fn ensure_same_board(column: &Column, board_id: &BoardId) -> Result<()> {
    if column.board_id() == board_id {
        Ok(())
    } else {
        Err(KanbanError::validation(format!(
            "Column {} does not belong to board {}",
            column.id(),
            board_id
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Board;
    use crate::storage::{BoardRepository, CardRepository, ColumnRepository, MemoryStorage};
    use std::time::Duration;

    struct Fixture {
        service: CardService,
        storage: Arc<MemoryStorage>,
        board: Board,
        a: Column,
        b: Column,
    }

    async fn fixture() -> Fixture {
        let storage = Arc::new(MemoryStorage::new());
        let board = Board::new("Roadmap").unwrap();
        storage.create_board(&board).await.unwrap();
        let a = Column::new(board.id().clone(), "A column", 0).unwrap();
        let b = Column::new(board.id().clone(), "B column", 1).unwrap();
        storage.create_column(&a).await.unwrap();
        storage.create_column(&b).await.unwrap();

        Fixture {
            service: CardService::new(storage.clone(), KeyedLocks::new()),
            storage,
            board,
            a,
            b,
        }
    }

    impl Fixture {
        async fn add(&self, column: &Column, title: &str) -> Card {
            self.service
                .create(CreateCard {
                    board_id: self.board.id().clone(),
                    column_id: column.id().clone(),
                    title: title.to_string(),
                    description: None,
                    position: None,
                })
                .await
                .unwrap()
        }

        async fn layout(&self, column: &Column) -> Vec<(String, i64)> {
            self.storage
                .list_cards(column.id())
                .await
                .unwrap()
                .into_iter()
                .map(|c| (c.title().to_string(), c.position()))
                .collect()
        }

        async fn move_card(&self, card: &Card, column: &Column, to_position: i64) -> Result<Card> {
            self.service
                .move_to(
                    card.id(),
                    MoveCard {
                        to_column_id: column.id().clone(),
                        to_position,
                    },
                )
                .await
        }
    }

    fn expected(pairs: &[(&str, i64)]) -> Vec<(String, i64)> {
        pairs.iter().map(|(t, p)| (t.to_string(), *p)).collect()
    }

    #[tokio::test]
    async fn test_create_appends_to_column_by_default() {
        let f = fixture().await;
        f.add(&f.a, "c1").await;
        let second = f.add(&f.a, "c2").await;
        assert_eq!(second.position(), 1);
    }

    #[tokio::test]
    async fn test_create_rejects_column_from_other_board() {
        let f = fixture().await;
        let other = Board::new("Other").unwrap();
        f.storage.create_board(&other).await.unwrap();

        let err = f
            .service
            .create(CreateCard {
                board_id: other.id().clone(),
                column_id: f.a.id().clone(),
                title: "Task".to_string(),
                description: None,
                position: Some(0),
            })
            .await
            .unwrap_err();
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn test_create_in_missing_column() {
        let f = fixture().await;
        let err = f
            .service
            .create(CreateCard {
                board_id: f.board.id().clone(),
                column_id: ColumnId::from("missing"),
                title: "Task".to_string(),
                description: None,
                position: Some(0),
            })
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_update_details() {
        let f = fixture().await;
        let card = f.add(&f.a, "Task").await;

        let updated = f
            .service
            .update(
                card.id(),
                CardChanges {
                    title: Some("Renamed".to_string()),
                    description: Some(Some("Details".to_string())),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.title(), "Renamed");
        assert_eq!(f.service.get(card.id()).await.unwrap().description(), Some("Details"));

        let err = f
            .service
            .update(
                card.id(),
                CardChanges {
                    title: Some("R".to_string()),
                    description: None,
                },
            )
            .await
            .unwrap_err();
        assert!(err.is_validation());
        assert_eq!(f.service.get(card.id()).await.unwrap().title(), "Renamed");
    }

    #[tokio::test]
    async fn test_update_keeps_concurrent_move() {
        let f = fixture().await;
        let c1 = f.add(&f.a, "c1").await;
        f.add(&f.a, "c2").await;

        // Edit loaded before the move commits
        let mut edited = f.service.get(c1.id()).await.unwrap();
        f.move_card(&c1, &f.b, 0).await.unwrap();
        edited
            .update_details(CardChanges {
                title: Some("Renamed".to_string()),
                description: None,
            })
            .unwrap();
        f.storage.update_card(&edited).await.unwrap();

        assert_eq!(f.layout(&f.b).await, expected(&[("Renamed", 0)]));
        assert_eq!(f.layout(&f.a).await, expected(&[("c2", 1)]));

        let updated = f
            .service
            .update(
                c1.id(),
                CardChanges {
                    title: None,
                    description: Some(Some("Details".to_string())),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.column_id(), f.b.id());
        assert_eq!(updated.position(), 0);
    }

    #[tokio::test]
    async fn test_move_relocks_when_card_changes_column() {
        let f = fixture().await;
        let c = Column::new(f.board.id().clone(), "C column", 2).unwrap();
        f.storage.create_column(&c).await.unwrap();
        let card = f.add(&f.a, "c1").await;

        let hold_a = f.service.locks.lock(&column_lock_key(f.a.id())).await;
        let service = f.service.clone();
        let id = card.id().clone();
        let to_column_id = f.b.id().clone();
        let pending = tokio::spawn(async move {
            service
                .move_to(
                    &id,
                    MoveCard {
                        to_column_id,
                        to_position: 0,
                    },
                )
                .await
        });
        tokio::time::sleep(Duration::from_millis(20)).await;

        // Another writer relocates the card to C and keeps C locked
        let hold_c = f.service.locks.lock(&column_lock_key(c.id())).await;
        let mut relocated = card.clone();
        relocated.move_to(c.id().clone(), 0).unwrap();
        f.storage.update_cards(&[relocated]).await.unwrap();
        drop(hold_a);

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!pending.is_finished());

        drop(hold_c);
        let moved = tokio::time::timeout(Duration::from_secs(1), pending)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(moved.column_id(), f.b.id());
        assert!(f.layout(&c).await.is_empty());
        assert_eq!(f.layout(&f.b).await, expected(&[("c1", 0)]));
    }

    #[cfg(feature = "sqlite-storage")]
    #[tokio::test]
    async fn test_move_scenarios_on_sqlite() {
        use crate::storage::SqliteStorage;

        let storage = Arc::new(SqliteStorage::open_in_memory().unwrap());
        let board = Board::new("Roadmap").unwrap();
        storage.create_board(&board).await.unwrap();
        let a = Column::new(board.id().clone(), "A column", 0).unwrap();
        let b = Column::new(board.id().clone(), "B column", 1).unwrap();
        storage.create_column(&a).await.unwrap();
        storage.create_column(&b).await.unwrap();
        let service = CardService::new(storage.clone(), KeyedLocks::new());

        let mut cards = Vec::new();
        for title in ["c1", "c2", "c3"] {
            let card = service
                .create(CreateCard {
                    board_id: board.id().clone(),
                    column_id: a.id().clone(),
                    title: title.to_string(),
                    description: None,
                    position: None,
                })
                .await
                .unwrap();
            cards.push(card);
        }

        let layout = |column: ColumnId| {
            let storage = storage.clone();
            async move {
                storage
                    .list_cards(&column)
                    .await
                    .unwrap()
                    .into_iter()
                    .map(|c| (c.title().to_string(), c.position()))
                    .collect::<Vec<_>>()
            }
        };

        let to = |column: &Column, to_position: i64| MoveCard {
            to_column_id: column.id().clone(),
            to_position,
        };

        service.move_to(cards[2].id(), to(&a, 0)).await.unwrap();
        assert_eq!(
            layout(a.id().clone()).await,
            expected(&[("c3", 0), ("c1", 1), ("c2", 2)])
        );

        service.move_to(cards[0].id(), to(&b, 5)).await.unwrap();
        assert_eq!(layout(b.id().clone()).await, expected(&[("c1", 0)]));
        assert_eq!(
            layout(a.id().clone()).await,
            expected(&[("c3", 0), ("c2", 2)])
        );
    }

    #[tokio::test]
    async fn test_move_within_column_to_front() {
        let f = fixture().await;
        f.add(&f.a, "c1").await;
        f.add(&f.a, "c2").await;
        let c3 = f.add(&f.a, "c3").await;

        let moved = f.move_card(&c3, &f.a, 0).await.unwrap();

        assert_eq!(moved.position(), 0);
        assert_eq!(
            f.layout(&f.a).await,
            expected(&[("c3", 0), ("c1", 1), ("c2", 2)])
        );
    }

    #[tokio::test]
    async fn test_move_across_columns_keeps_source_gaps() {
        let f = fixture().await;
        let c1 = f.add(&f.a, "c1").await;
        f.add(&f.a, "c2").await;
        f.add(&f.a, "c3").await;

        let moved = f.move_card(&c1, &f.b, 0).await.unwrap();

        assert_eq!(moved.column_id(), f.b.id());
        assert_eq!(f.layout(&f.b).await, expected(&[("c1", 0)]));
        assert_eq!(f.layout(&f.a).await, expected(&[("c2", 1), ("c3", 2)]));
    }

    #[tokio::test]
    async fn test_move_clamps_target_position() {
        let f = fixture().await;
        f.add(&f.b, "b1").await;
        f.add(&f.b, "b2").await;
        let low = f.add(&f.a, "low").await;
        let high = f.add(&f.a, "high").await;

        let moved = f.move_card(&low, &f.b, -10).await.unwrap();
        assert_eq!(moved.position(), 0);

        let moved = f.move_card(&high, &f.b, 9999).await.unwrap();
        assert_eq!(moved.position(), 3);

        assert_eq!(
            f.layout(&f.b).await,
            expected(&[("low", 0), ("b1", 1), ("b2", 2), ("high", 3)])
        );
    }

    #[tokio::test]
    async fn test_move_to_current_slot_rewrites_column() {
        let f = fixture().await;
        let c1 = f.add(&f.a, "c1").await;
        f.add(&f.a, "c2").await;
        let writes = f.storage.write_count();

        f.move_card(&c1, &f.a, 0).await.unwrap();

        assert_eq!(f.storage.write_count(), writes + 1);
        assert_eq!(f.layout(&f.a).await, expected(&[("c1", 0), ("c2", 1)]));
    }

    #[tokio::test]
    async fn test_move_missing_card_writes_nothing() {
        let f = fixture().await;
        f.add(&f.a, "c1").await;
        let writes = f.storage.write_count();

        let err = f
            .service
            .move_to(
                &CardId::from("missing"),
                MoveCard {
                    to_column_id: f.a.id().clone(),
                    to_position: 0,
                },
            )
            .await
            .unwrap_err();

        assert!(err.is_not_found());
        assert_eq!(f.storage.write_count(), writes);
    }

    #[tokio::test]
    async fn test_move_to_missing_column_writes_nothing() {
        let f = fixture().await;
        let card = f.add(&f.a, "c1").await;
        let writes = f.storage.write_count();

        let err = f
            .service
            .move_to(
                card.id(),
                MoveCard {
                    to_column_id: ColumnId::from("missing"),
                    to_position: 0,
                },
            )
            .await
            .unwrap_err();

        assert!(err.is_not_found());
        assert_eq!(f.storage.write_count(), writes);
    }

    #[tokio::test]
    async fn test_destination_positions_always_contiguous() {
        let f = fixture().await;
        let mut cards = Vec::new();
        for title in ["c1", "c2", "c3", "c4"] {
            cards.push(f.add(&f.a, title).await);
        }

        for (i, target) in [-3_i64, 0, 1, 2, 3, 4, 50].into_iter().enumerate() {
            let card = &cards[i % cards.len()];
            f.move_card(card, &f.a, target).await.unwrap();

            let positions: Vec<i64> = f.layout(&f.a).await.into_iter().map(|(_, p)| p).collect();
            assert_eq!(positions, vec![0, 1, 2, 3]);
        }
    }

    #[tokio::test]
    async fn test_concurrent_moves_keep_column_contiguous() {
        let f = fixture().await;
        let mut cards = Vec::new();
        for title in ["c1", "c2", "c3", "c4", "c5"] {
            cards.push(f.add(&f.a, title).await);
        }

        let mut handles = Vec::new();
        for (i, card) in cards.iter().enumerate() {
            let service = f.service.clone();
            let id = card.id().clone();
            let to_column_id = if i % 2 == 0 { f.a.id().clone() } else { f.b.id().clone() };
            handles.push(tokio::spawn(async move {
                service
                    .move_to(
                        &id,
                        MoveCard {
                            to_column_id,
                            to_position: 0,
                        },
                    )
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let positions: Vec<i64> = f.layout(&f.b).await.into_iter().map(|(_, p)| p).collect();
        assert_eq!(positions, vec![0, 1]);
    }

    #[tokio::test]
    async fn test_delete_missing_card_writes_nothing() {
        let f = fixture().await;
        let writes = f.storage.write_count();

        let err = f.service.delete(&CardId::from("missing")).await.unwrap_err();

        assert!(err.is_not_found());
        assert_eq!(f.storage.write_count(), writes);
    }
}
