//! Client-side board state.
//!
//! [`BoardStore`] mirrors the selected board's columns and cards. Card
//! moves and deletes are applied locally first; when the server refuses
//! them the store records the error and refetches the board.

use tracing::{debug, warn};

use crate::client::api::{ClientError, ClientResult, KanbanApi};
use crate::domain::{reposition, Board, BoardId, Card, CardId, ColumnId, ColumnWithCards};
use crate::dto::{CreateCardRequest, CreateColumnRequest, MoveCardRequest};

pub struct BoardStore<A> {
    api: A,
    boards: Vec<Board>,
    selected_board_id: Option<BoardId>,
    current_board: Option<Board>,
    columns: Vec<ColumnWithCards>,
    last_error: Option<String>,
}

impl<A: KanbanApi> BoardStore<A> {
    pub fn new(api: A) -> Self {
        Self {
            api,
            boards: Vec::new(),
            selected_board_id: None,
            current_board: None,
            columns: Vec::new(),
            last_error: None,
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn boards(&self) -> &[Board] {
        &self.boards
    }

    pub fn selected_board_id(&self) -> Option<&BoardId> {
        self.selected_board_id.as_ref()
    }

    /// The selected board as last fetched from the server
    pub fn current_board(&self) -> Option<&Board> {
        self.current_board.as_ref()
    }

    /// Columns of the selected board, ordered by position
    pub fn columns(&self) -> &[ColumnWithCards] {
        &self.columns
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn clear_error(&mut self) {
        self.last_error = None;
    }

    pub async fn load_boards(&mut self) -> ClientResult<()> {
        let result = self.api.list_boards().await;
        let boards = self.record(result)?;
        self.boards = boards;
        Ok(())
    }

    /// Makes `id` the selected board and loads it with its columns
    pub async fn select_board(&mut self, id: BoardId) -> ClientResult<()> {
        self.selected_board_id = Some(id.clone());
        self.current_board = None;
        self.columns.clear();

        let result = self.api.get_board(&id).await;
        self.current_board = Some(self.record(result)?);
        self.refresh_selected_board().await
    }

    /// Replaces local columns with the server's view of the selected board
    pub async fn refresh_selected_board(&mut self) -> ClientResult<()> {
        let board_id = self.selected()?;
        let result = self.api.list_columns(&board_id).await;
        let mut columns = self.record(result)?;

        columns.sort_by_key(|c| c.column.position());
        for column in &mut columns {
            column.cards.sort_by_key(Card::position);
        }
        debug!(board_id = %board_id, columns = columns.len(), "board refreshed");
        self.columns = columns;
        Ok(())
    }

    /// Creates a board and puts it first in the list
    pub async fn create_board(&mut self, name: &str) -> ClientResult<Board> {
        let result = self.api.create_board(name).await;
        let board = self.record(result)?;
        self.boards.insert(0, board.clone());
        Ok(board)
    }

    /// Appends a column to the selected board
    pub async fn create_column(&mut self, name: &str) -> ClientResult<()> {
        let board_id = self.selected()?;
        let req = CreateColumnRequest {
            board_id,
            name: name.to_string(),
            position: Some(self.columns.len() as i64),
        };
        let result = self.api.create_column(&req).await;
        self.record(result)?;
        self.refresh_selected_board().await
    }

    pub async fn create_card(
        &mut self,
        column_id: ColumnId,
        title: &str,
        description: Option<String>,
    ) -> ClientResult<Card> {
        let board_id = self.selected()?;
        let req = CreateCardRequest {
            board_id,
            column_id,
            title: title.to_string(),
            description,
            position: None,
        };
        let result = self.api.create_card(&req).await;
        let card = self.record(result)?;

        if let Some(column) = self.column_mut(card.column_id()) {
            column.cards.push(card.clone());
            column.cards.sort_by_key(Card::position);
        }
        Ok(card)
    }

    pub async fn delete_card(&mut self, id: &CardId) -> ClientResult<()> {
        for column in &mut self.columns {
            column.cards.retain(|c| c.id() != id);
        }

        let result = self.api.delete_card(id).await;
        self.settle(result).await
    }

    /// Moves a card locally with the same reposition rules the server uses,
    /// then asks the server to do the same
    pub async fn move_card(
        &mut self,
        id: &CardId,
        to_column_id: ColumnId,
        to_position: i64,
    ) -> ClientResult<()> {
        self.apply_move(id, &to_column_id, to_position)?;

        let req = MoveCardRequest {
            to_column_id,
            to_position,
        };
        let result = self.api.move_card(id, &req).await.map(|_| ());
        self.settle(result).await
    }

    fn apply_move(
        &mut self,
        id: &CardId,
        to_column_id: &ColumnId,
        to_position: i64,
    ) -> ClientResult<()> {
        let Some(mut card) = self.find_card(id).cloned() else {
            debug!(card_id = %id, "card not loaded, skipping local move");
            return Ok(());
        };
        if self.column_mut(to_column_id).is_none() {
            debug!(column_id = %to_column_id, "column not loaded, skipping local move");
            return Ok(());
        }
        card.move_to(to_column_id.clone(), to_position.max(0))?;

        for column in &mut self.columns {
            if column.id() != to_column_id {
                column.cards.retain(|c| c.id() != id);
            }
        }
        if let Some(column) = self.column_mut(to_column_id) {
            let cards = std::mem::take(&mut column.cards);
            column.cards = reposition(cards, card, to_position);
        }
        Ok(())
    }

    /// Keeps the optimistic state on success; otherwise records the error
    /// and reloads the board from the server
    async fn settle(&mut self, result: ClientResult<()>) -> ClientResult<()> {
        let Err(err) = result else {
            return Ok(());
        };
        warn!(error = %err, "server rejected change, refetching board");
        self.last_error = Some(err.to_string());
        if let Err(refresh_err) = self.refresh_selected_board().await {
            warn!(error = %refresh_err, "refetch failed");
        }
        Err(err)
    }

    fn record<T>(&mut self, result: ClientResult<T>) -> ClientResult<T> {
        if let Err(err) = &result {
            self.last_error = Some(err.to_string());
        }
        result
    }

    fn selected(&self) -> ClientResult<BoardId> {
        self.selected_board_id
            .clone()
            .ok_or(ClientError::NoBoardSelected)
    }

    fn find_card(&self, id: &CardId) -> Option<&Card> {
        self.columns
            .iter()
            .flat_map(|c| c.cards.iter())
            .find(|c| c.id() == id)
    }

    fn column_mut(&mut self, id: &ColumnId) -> Option<&mut ColumnWithCards> {
        self.columns.iter_mut().find(|c| c.id() == id)
    }
}
