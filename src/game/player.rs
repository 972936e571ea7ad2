use crate::cards::PlayerHand;
use crate::{Currency, PlayerId, SeatIdx};
use bitflags::bitflags;

bitflags! {
    /// Position tags a player can hold for the current hand. A player can
    /// carry several at once (heads-up button is also the small blind).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Position: u8 {
        const BUTTON = 1 << 0;
        const SMALL_BLIND = 1 << 1;
        const BIG_BLIND = 1 << 2;
        const UNDER_THE_GUN = 1 << 3;
        const BRING_IN = 1 << 4;
    }
}

#[derive(Debug, Clone)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub stack: Currency,
    pub seat: SeatIdx,
    pub hand: PlayerHand,
    /// Still in the current hand.
    pub is_active: bool,
    pub position: Position,
}

impl Player {
    pub fn new(id: PlayerId, name: impl Into<String>, stack: Currency, seat: SeatIdx) -> Self {
        Player {
            id,
            name: name.into(),
            stack,
            seat,
            hand: PlayerHand::new(),
            is_active: false,
            position: Position::default(),
        }
    }

    pub fn has_position(&self, p: Position) -> bool {
        self.position.contains(p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positions_can_stack() {
        let mut p = Player::new(PlayerId(1), "Alice", 500, 0);
        p.position = Position::BUTTON | Position::SMALL_BLIND;
        assert!(p.has_position(Position::BUTTON));
        assert!(p.has_position(Position::SMALL_BLIND));
        assert!(!p.has_position(Position::BIG_BLIND));
    }
}
