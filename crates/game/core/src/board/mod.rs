//! Paired-card board and the flip/match engine.
//!
//! A [`Board`] holds `2N` cards where every icon appears exactly twice. Flips
//! go through [`Board::flip`], which enforces the two-card window: once a
//! second card is turned the board enters [`BoardLock::Evaluating`]
//! synchronously, so any further flip is rejected until the pair is resolved.
//! Matching pairs resolve immediately; a mismatch stays on screen until the
//! caller invokes [`Board::resolve_mismatch`] after its presentation delay.

mod error;
mod icons;

pub use error::{BoardError, FlipRejection};
pub use icons::{IconId, IconSet};

use arrayvec::ArrayVec;
use rand::Rng;
use rand::seq::SliceRandom;

/// Visual state of a single card. `Matched` is terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case")]
pub enum CardState {
    FaceDown,
    FaceUp,
    Matched,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Card {
    /// Ordinal position on the board.
    pub id: usize,
    pub icon: IconId,
    pub state: CardState,
}

/// What the presentation layer is allowed to see of a card.
///
/// The icon is only exposed while the card is face up or matched.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CardView {
    pub position: usize,
    pub state: CardState,
    pub icon: Option<IconId>,
}

impl From<&Card> for CardView {
    fn from(card: &Card) -> Self {
        let icon = match card.state {
            CardState::FaceDown => None,
            CardState::FaceUp | CardState::Matched => Some(card.icon.clone()),
        };
        Self {
            position: card.id,
            state: card.state,
            icon,
        }
    }
}

/// Input discipline of the board.
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case")]
pub enum BoardLock {
    /// Shown for memorization; no flips accepted.
    Frozen,
    /// Accepting flips.
    Unlocked,
    /// Two cards are pending; flips rejected until the pair is resolved.
    Evaluating,
}

/// Result of an accepted flip.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FlipOutcome {
    /// First card of a pair turned; waiting for the second.
    FirstCard { position: usize },
    /// Both cards share an icon and are now matched. `won` is set when this
    /// was the last unmatched pair.
    Matched {
        first: usize,
        second: usize,
        won: bool,
    },
    /// The cards differ. They stay face up, with the board locked, until
    /// [`Board::resolve_mismatch`] is called.
    Mismatch { first: usize, second: usize },
}

impl FlipOutcome {
    /// True when the flip completed a pair (an attempt).
    pub fn completes_attempt(&self) -> bool {
        !matches!(self, Self::FirstCard { .. })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Board {
    cards: Vec<Card>,
    pending: ArrayVec<usize, 2>,
    lock: BoardLock,
}

impl Board {
    /// Duplicates the first `pair_count` icons and shuffles them uniformly.
    ///
    /// The shuffle is Fisher-Yates (`SliceRandom::shuffle` walks from the last
    /// index down, swapping with a uniform index in `[0, i]`). The new board
    /// starts face down and frozen.
    pub fn build<R: Rng + ?Sized>(
        icons: &IconSet,
        pair_count: usize,
        rng: &mut R,
    ) -> Result<Self, BoardError> {
        let mut layout = Self::doubled_icons(icons, pair_count)?;
        layout.shuffle(rng);
        Ok(Self::from_layout(layout))
    }

    /// The unshuffled layout: every icon twice, in icon-set order.
    pub fn doubled_icons(icons: &IconSet, pair_count: usize) -> Result<Vec<IconId>, BoardError> {
        if pair_count == 0 {
            return Err(BoardError::NoPairs);
        }
        if pair_count > icons.len() {
            return Err(BoardError::NotEnoughIcons {
                requested: pair_count,
                available: icons.len(),
            });
        }

        let chosen = &icons.as_slice()[..pair_count];
        Ok(chosen.iter().chain(chosen.iter()).cloned().collect())
    }

    /// Builds a board from a fixed layout. Used for replaying known boards.
    ///
    /// The caller is responsible for the "exactly two of each icon" rule.
    pub fn from_layout(layout: Vec<IconId>) -> Self {
        let cards = layout
            .into_iter()
            .enumerate()
            .map(|(id, icon)| Card {
                id,
                icon,
                state: CardState::FaceDown,
            })
            .collect();

        Self {
            cards,
            pending: ArrayVec::new(),
            lock: BoardLock::Frozen,
        }
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn card(&self, position: usize) -> Option<&Card> {
        self.cards.get(position)
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn pair_count(&self) -> usize {
        self.cards.len() / 2
    }

    pub fn lock(&self) -> BoardLock {
        self.lock
    }

    /// Positions flipped in the current, unresolved attempt.
    pub fn pending(&self) -> &[usize] {
        &self.pending
    }

    pub fn matched_pairs(&self) -> usize {
        self.cards
            .iter()
            .filter(|card| card.state == CardState::Matched)
            .count()
            / 2
    }

    pub fn is_won(&self) -> bool {
        !self.cards.is_empty()
            && self
                .cards
                .iter()
                .all(|card| card.state == CardState::Matched)
    }

    pub fn views(&self) -> Vec<CardView> {
        self.cards.iter().map(CardView::from).collect()
    }

    /// Turns every unmatched card face up.
    pub fn reveal_all(&mut self) {
        self.set_unmatched(CardState::FaceUp);
    }

    /// Turns every unmatched card face down and drops any pending attempt.
    pub fn hide_all(&mut self) {
        self.set_unmatched(CardState::FaceDown);
        self.pending.clear();
        if self.lock == BoardLock::Evaluating {
            self.lock = BoardLock::Unlocked;
        }
    }

    pub fn freeze(&mut self) {
        self.pending.clear();
        self.lock = BoardLock::Frozen;
    }

    pub fn unlock(&mut self) {
        self.pending.clear();
        self.lock = BoardLock::Unlocked;
    }

    /// Turns a card face up, evaluating the pair when it is the second one.
    pub fn flip(&mut self, position: usize) -> Result<FlipOutcome, FlipRejection> {
        let len = self.cards.len();
        let card = self
            .cards
            .get(position)
            .ok_or(FlipRejection::OutOfRange { position, len })?;

        match self.lock {
            BoardLock::Frozen => return Err(FlipRejection::Frozen),
            BoardLock::Evaluating => return Err(FlipRejection::Locked),
            BoardLock::Unlocked => {}
        }

        match card.state {
            CardState::Matched => return Err(FlipRejection::AlreadyMatched { position }),
            CardState::FaceUp => return Err(FlipRejection::AlreadyFaceUp { position }),
            CardState::FaceDown => {}
        }

        self.cards[position].state = CardState::FaceUp;
        self.pending.push(position);

        let [first, second] = match self.pending.as_slice() {
            &[first, second] => [first, second],
            _ => return Ok(FlipOutcome::FirstCard { position }),
        };

        // Lock before evaluating; nothing may slip in between.
        self.lock = BoardLock::Evaluating;

        if self.cards[first].icon == self.cards[second].icon {
            self.cards[first].state = CardState::Matched;
            self.cards[second].state = CardState::Matched;
            self.pending.clear();
            self.lock = BoardLock::Unlocked;
            Ok(FlipOutcome::Matched {
                first,
                second,
                won: self.is_won(),
            })
        } else {
            Ok(FlipOutcome::Mismatch { first, second })
        }
    }

    /// Flips a pending mismatched pair back down and unlocks the board.
    ///
    /// Returns the pair that was hidden, or `None` if nothing was pending
    /// (for example after the board was frozen or hidden in the meantime).
    pub fn resolve_mismatch(&mut self) -> Option<(usize, usize)> {
        if self.lock != BoardLock::Evaluating {
            return None;
        }
        let (first, second) = match self.pending.as_slice() {
            &[first, second] => (first, second),
            _ => return None,
        };

        for position in [first, second] {
            if self.cards[position].state == CardState::FaceUp {
                self.cards[position].state = CardState::FaceDown;
            }
        }
        self.pending.clear();
        self.lock = BoardLock::Unlocked;
        Some((first, second))
    }

    fn set_unmatched(&mut self, state: CardState) {
        for card in self
            .cards
            .iter_mut()
            .filter(|card| card.state != CardState::Matched)
        {
            card.state = state;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::HashMap;

    fn layout(icons: &[&str]) -> Board {
        let mut board = Board::from_layout(icons.iter().map(|s| IconId::new(*s)).collect());
        board.unlock();
        board
    }

    /// Returns the position of the other card carrying the same icon.
    fn partner(board: &Board, position: usize) -> usize {
        let icon = &board.cards()[position].icon;
        board
            .cards()
            .iter()
            .position(|card| card.id != position && &card.icon == icon)
            .unwrap()
    }

    #[test]
    fn build_places_every_icon_exactly_twice() {
        let icons = IconSet::default();
        for seed in 0..32 {
            let mut rng = StdRng::seed_from_u64(seed);
            let board = Board::build(&icons, icons.len(), &mut rng).unwrap();

            let mut counts: HashMap<&IconId, usize> = HashMap::new();
            for card in board.cards() {
                *counts.entry(&card.icon).or_default() += 1;
            }
            assert_eq!(counts.len(), icons.len());
            assert!(counts.values().all(|&count| count == 2));
        }
    }

    #[test]
    fn build_is_a_permutation_of_the_doubled_list() {
        let icons = IconSet::numbered(6).unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        let board = Board::build(&icons, 6, &mut rng).unwrap();

        let mut shuffled: Vec<IconId> = board.cards().iter().map(|c| c.icon.clone()).collect();
        let mut expected = Board::doubled_icons(&icons, 6).unwrap();
        shuffled.sort();
        expected.sort();
        assert_eq!(shuffled, expected);

        for (index, card) in board.cards().iter().enumerate() {
            assert_eq!(card.id, index);
            assert_eq!(card.state, CardState::FaceDown);
        }
        assert_eq!(board.lock(), BoardLock::Frozen);
    }

    #[test]
    fn build_rejects_bad_pair_counts() {
        let icons = IconSet::numbered(3).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(
            Board::build(&icons, 0, &mut rng).unwrap_err(),
            BoardError::NoPairs
        );
        assert_eq!(
            Board::build(&icons, 4, &mut rng).unwrap_err(),
            BoardError::NotEnoughIcons {
                requested: 4,
                available: 3
            }
        );
    }

    #[test]
    fn frozen_board_rejects_flips() {
        let mut board = Board::from_layout(vec!["a".into(), "a".into()]);
        board.reveal_all();
        assert_eq!(board.flip(0), Err(FlipRejection::Frozen));
        assert!(board.cards().iter().all(|c| c.state == CardState::FaceUp));
    }

    #[test]
    fn matching_pair_resolves_immediately() {
        let mut board = layout(&["a", "b", "a", "b"]);

        assert_eq!(board.flip(0), Ok(FlipOutcome::FirstCard { position: 0 }));
        assert_eq!(board.pending(), &[0]);
        assert_eq!(
            board.flip(2),
            Ok(FlipOutcome::Matched {
                first: 0,
                second: 2,
                won: false
            })
        );
        assert_eq!(board.lock(), BoardLock::Unlocked);
        assert!(board.pending().is_empty());
        assert_eq!(board.card(0).unwrap().state, CardState::Matched);
        assert_eq!(board.card(2).unwrap().state, CardState::Matched);
        assert_eq!(board.matched_pairs(), 1);
    }

    #[test]
    fn matched_cards_are_never_reflippable() {
        let mut board = layout(&["a", "b", "a", "b"]);
        board.flip(0).unwrap();
        board.flip(2).unwrap();

        assert_eq!(
            board.flip(0),
            Err(FlipRejection::AlreadyMatched { position: 0 })
        );
        board.hide_all();
        assert_eq!(board.card(2).unwrap().state, CardState::Matched);
        board.reveal_all();
        assert_eq!(
            board.flip(2),
            Err(FlipRejection::AlreadyMatched { position: 2 })
        );
    }

    #[test]
    fn same_card_twice_is_not_two_pending_flips() {
        let mut board = layout(&["a", "b", "a", "b"]);
        board.flip(1).unwrap();
        assert_eq!(
            board.flip(1),
            Err(FlipRejection::AlreadyFaceUp { position: 1 })
        );
        assert_eq!(board.pending(), &[1]);
        assert_eq!(board.lock(), BoardLock::Unlocked);
    }

    #[test]
    fn third_flip_is_rejected_until_mismatch_resolves() {
        let mut board = layout(&["a", "b", "a", "b", "c", "c"]);

        board.flip(0).unwrap();
        assert_eq!(
            board.flip(1),
            Ok(FlipOutcome::Mismatch {
                first: 0,
                second: 1
            })
        );
        assert_eq!(board.lock(), BoardLock::Evaluating);

        for position in 0..board.len() {
            assert!(board.flip(position).is_err());
        }
        assert_eq!(board.flip(4), Err(FlipRejection::Locked));

        assert_eq!(board.resolve_mismatch(), Some((0, 1)));
        assert_eq!(board.lock(), BoardLock::Unlocked);
        assert_eq!(board.card(0).unwrap().state, CardState::FaceDown);
        assert_eq!(board.card(1).unwrap().state, CardState::FaceDown);
        assert_eq!(board.flip(4), Ok(FlipOutcome::FirstCard { position: 4 }));
    }

    #[test]
    fn resolve_without_pending_pair_is_a_noop() {
        let mut board = layout(&["a", "a"]);
        assert_eq!(board.resolve_mismatch(), None);

        let mut board = layout(&["a", "b", "a", "b"]);
        board.flip(0).unwrap();
        board.flip(1).unwrap();
        board.freeze();
        assert_eq!(board.resolve_mismatch(), None);
        assert_eq!(board.card(0).unwrap().state, CardState::FaceUp);
    }

    #[test]
    fn win_is_reported_only_on_the_last_pair() {
        let icons = IconSet::numbered(6).unwrap();
        let mut rng = StdRng::seed_from_u64(42);
        let mut board = Board::build(&icons, 6, &mut rng).unwrap();
        board.unlock();

        let mut wins = 0;
        for position in 0..board.len() {
            if board.card(position).unwrap().state == CardState::Matched {
                continue;
            }
            board.flip(position).unwrap();
            let outcome = board.flip(partner(&board, position)).unwrap();
            match outcome {
                FlipOutcome::Matched { won, .. } => {
                    assert_eq!(won, board.matched_pairs() == 6);
                    wins += usize::from(won);
                }
                other => panic!("expected a match, got {other:?}"),
            }
        }
        assert_eq!(wins, 1);
        assert!(board.is_won());
    }

    #[test]
    fn views_hide_face_down_icons() {
        let mut board = layout(&["a", "b", "a", "b"]);
        board.flip(1).unwrap();
        let views = board.views();
        assert_eq!(views[0].icon, None);
        assert_eq!(views[1].icon, Some(IconId::new("b")));
        assert_eq!(views[1].state, CardState::FaceUp);
    }

    #[test]
    fn out_of_range_flip_is_rejected() {
        let mut board = layout(&["a", "a"]);
        assert_eq!(
            board.flip(9),
            Err(FlipRejection::OutOfRange { position: 9, len: 2 })
        );
    }
}
