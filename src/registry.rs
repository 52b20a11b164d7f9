//! Ownership bookkeeping: the local card and the cards taken by others.

use std::collections::BTreeSet;

use crate::card::{Card, Grid};
use crate::error::ProtocolViolation;
use crate::protocol::{CardId, ClientMessage};

/// Size of the coordinator's card pool unless configured otherwise.
pub const DEFAULT_CARD_POOL_SIZE: CardId = 1000;

/// Tracks the one card this session may own and the ids owned elsewhere.
///
/// Session-level gates (phase, ban) are checked by the caller; the registry
/// only enforces single ownership and the pool bounds.
#[derive(Debug, Clone)]
pub struct CardRegistry {
    pool_size: CardId,
    my_card: Option<Card>,
    pending: Option<CardId>,
    taken: BTreeSet<CardId>,
}

impl CardRegistry {
    pub fn new(pool_size: CardId) -> Self {
        Self {
            pool_size,
            my_card: None,
            pending: None,
            taken: BTreeSet::new(),
        }
    }

    pub fn my_card(&self) -> Option<&Card> {
        self.my_card.as_ref()
    }

    pub fn my_card_mut(&mut self) -> Option<&mut Card> {
        self.my_card.as_mut()
    }

    /// The id we asked for and have not yet been confirmed on.
    pub fn pending(&self) -> Option<CardId> {
        self.pending
    }

    fn my_card_id(&self) -> Option<CardId> {
        self.my_card.as_ref().and_then(|c| c.id)
    }

    /// Ids known to belong to other players, ascending.
    ///
    /// Ids only ever enter the underlying set; our own card id is filtered
    /// from the view in case a broadcast for it was recorded before the
    /// assignment named it.
    pub fn taken(&self) -> impl Iterator<Item = CardId> + '_ {
        let mine = self.my_card_id();
        self.taken.iter().copied().filter(move |id| Some(*id) != mine)
    }

    pub fn is_taken(&self, card_id: CardId) -> bool {
        self.my_card_id() != Some(card_id) && self.taken.contains(&card_id)
    }

    /// Build a buy request, or `None` when one card is already owned or
    /// requested, the id is outside the pool, or it is known to be taken.
    pub fn purchase(&mut self, card_id: CardId) -> Option<ClientMessage> {
        if self.my_card.is_some() || self.pending.is_some() {
            return None;
        }
        if card_id == 0 || card_id > self.pool_size || self.taken.contains(&card_id) {
            return None;
        }
        self.pending = Some(card_id);
        Some(ClientMessage::Buy { card_id })
    }

    /// Accept the coordinator's assignment. First assignment wins.
    ///
    /// # Errors
    ///
    /// [`ProtocolViolation::DuplicateAssignment`] when a card is already
    /// owned, [`ProtocolViolation::MalformedCard`] when the grid is invalid.
    pub fn on_assigned(
        &mut self,
        card_id: Option<CardId>,
        grid: Grid,
    ) -> Result<&Card, ProtocolViolation> {
        if let Some(held) = &self.my_card {
            return Err(ProtocolViolation::DuplicateAssignment {
                held: held.id,
                offered: card_id,
            });
        }
        grid.validate()?;

        let id = card_id.or(self.pending);
        self.pending = None;
        Ok(&*self.my_card.insert(Card::new(id, grid)))
    }

    /// Record a card owned by someone else. Returns `true` if it was new.
    ///
    /// Notices for our own card, or the one we are waiting on, are ignored:
    /// the broadcast and our confirmation may arrive in either order.
    pub fn on_taken(&mut self, card_id: CardId) -> bool {
        if self.my_card_id() == Some(card_id) || self.pending == Some(card_id) {
            return false;
        }
        self.taken.insert(card_id)
    }
}

impl Default for CardRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_CARD_POOL_SIZE)
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;
    use crate::card::tests::sample_grid;

    #[test]
    fn second_purchase_before_assignment_is_a_no_op() {
        let mut registry = CardRegistry::default();
        assert_eq!(
            registry.purchase(42),
            Some(ClientMessage::Buy { card_id: 42 })
        );
        assert_eq!(registry.purchase(42), None);
        assert_eq!(registry.purchase(7), None);
        assert_eq!(registry.pending(), Some(42));
    }

    #[test]
    fn purchase_outside_pool_is_a_no_op() {
        let mut registry = CardRegistry::new(10);
        assert_eq!(registry.purchase(0), None);
        assert_eq!(registry.purchase(11), None);
        assert_eq!(registry.pending(), None);
        assert!(registry.purchase(10).is_some());
    }

    #[test]
    fn assignment_uses_pending_id_when_none_is_sent() {
        let mut registry = CardRegistry::default();
        registry.purchase(42);
        let card = registry.on_assigned(None, sample_grid()).unwrap();
        assert_eq!(card.id, Some(42));
        assert_eq!(registry.pending(), None);
        assert_eq!(registry.purchase(9), None);
    }

    #[test]
    fn first_assignment_wins() {
        let mut registry = CardRegistry::default();
        registry.on_assigned(Some(1), sample_grid()).unwrap();
        let err = registry.on_assigned(Some(2), sample_grid()).unwrap_err();
        assert_eq!(
            err,
            ProtocolViolation::DuplicateAssignment {
                held: Some(1),
                offered: Some(2)
            }
        );
        assert_eq!(registry.my_card().unwrap().id, Some(1));
    }

    #[test]
    fn malformed_grid_leaves_registry_unassigned() {
        let mut registry = CardRegistry::default();
        registry.purchase(5);
        let bad: Grid = serde_json::from_str(
            r#"[[1,2,3,4,5],[16,17,18,19,20],[31,32,33,34,35],[46,47,48,49,50],[61,62,63,64,65]]"#,
        )
        .unwrap();
        assert!(matches!(
            registry.on_assigned(None, bad),
            Err(ProtocolViolation::MalformedCard(_))
        ));
        assert!(registry.my_card().is_none());
        assert_eq!(registry.pending(), Some(5));
    }

    #[test]
    fn taken_notice_for_own_card_is_ignored() {
        let mut registry = CardRegistry::default();
        registry.on_assigned(Some(42), sample_grid()).unwrap();
        assert!(!registry.on_taken(42));
        assert!(!registry.is_taken(42));
        assert!(registry.on_taken(43));
        assert!(!registry.on_taken(43));
        assert_eq!(registry.taken().collect::<Vec<_>>(), vec![43]);
    }

    #[test]
    fn taken_notice_racing_ahead_of_confirmation_is_ignored() {
        let mut registry = CardRegistry::default();
        registry.purchase(42);
        assert!(!registry.on_taken(42));
        registry.on_assigned(None, sample_grid()).unwrap();
        assert!(!registry.is_taken(42));
    }

    #[test]
    fn purchase_of_known_taken_card_is_a_no_op() {
        let mut registry = CardRegistry::default();
        assert!(registry.on_taken(17));
        assert_eq!(registry.purchase(17), None);
        assert_eq!(registry.pending(), None);
        assert!(registry.is_taken(17));
        assert!(registry.purchase(18).is_some());
    }

    #[test]
    fn taken_set_never_shrinks_when_assignment_names_a_taken_id() {
        let mut registry = CardRegistry::default();
        registry.on_taken(9);
        registry.on_taken(12);
        let card = registry.on_assigned(Some(9), sample_grid()).unwrap();
        assert_eq!(card.id, Some(9));

        // Hidden from the view, still recorded.
        assert_eq!(registry.taken().collect::<Vec<_>>(), vec![12]);
        assert!(!registry.is_taken(9));
        assert!(registry.taken.contains(&9));
    }
}
