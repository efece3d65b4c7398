/// Property-based tests for chip conservation using proptest
///
/// Random sequences of intents are thrown at a session. Whatever gets
/// accepted or rejected, no chip may appear or vanish within a hand and the
/// structural checks must keep passing. Between hands the tally only moves
/// when a reset replenishes stacks or a player leaves with theirs.
use proptest::prelude::*;
use rand::{SeedableRng, rngs::StdRng};
use teen_patti::{
    Chips, ConnectionId, Deck, PlayerId, RoomConfig, RoomId, Session,
    entities::SessionStatus,
};

#[derive(Debug, Clone)]
enum Op {
    Bet(Chips),
    Check,
    Fold,
    Reveal,
    Expire,
    Disconnect(usize),
    Rejoin(usize),
    Leave(usize),
    Reset,
    Start(u64),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (1u32..400).prop_map(Op::Bet),
        4 => Just(Op::Check),
        2 => Just(Op::Fold),
        1 => Just(Op::Reveal),
        1 => Just(Op::Expire),
        1 => (0usize..5).prop_map(Op::Disconnect),
        1 => (0usize..5).prop_map(Op::Rejoin),
        1 => (0usize..5).prop_map(Op::Leave),
        1 => Just(Op::Reset),
        1 => any::<u64>().prop_map(Op::Start),
    ]
}

fn chips_in_play(session: &Session) -> Chips {
    session.players().iter().map(|p| p.balance).sum::<Chips>() + session.pot()
}

fn seated(players: usize, balances: &[Chips]) -> (Session, Vec<(PlayerId, ConnectionId)>) {
    let config = RoomConfig {
        boot_amount: 5,
        shuffle_turn_order: false,
        ..Default::default()
    };
    let mut session = Session::new(RoomId::from("PROP01"), config);
    let seats = (0..players)
        .map(|i| {
            let connection = ConnectionId::new();
            let (id, _) = session
                .join(&format!("player{i}"), Some(balances[i]), connection)
                .unwrap();
            (id, connection)
        })
        .collect();
    (session, seats)
}

proptest! {
    #[test]
    fn test_chips_are_conserved_within_a_hand(
        players in 2usize..=5,
        balances in prop::collection::vec(1u32..500, 5),
        seed in any::<u64>(),
        ops in prop::collection::vec(op_strategy(), 1..80),
    ) {
        let (mut session, mut seats) = seated(players, &balances);
        let host = session.host().unwrap();
        let deck = Deck::shuffled_with(&mut StdRng::seed_from_u64(seed));
        session.start_game_with_deck(host, deck).unwrap();
        let mut expected = chips_in_play(&session);

        for op in ops {
            let active = session.active_player();
            match op {
                Op::Bet(amount) => {
                    if let Some(id) = active {
                        let _ = session.bet(id, amount);
                    }
                }
                Op::Check => {
                    if let Some(id) = active {
                        let _ = session.check(id);
                    }
                }
                Op::Fold => {
                    if let Some(id) = active {
                        let _ = session.fold(id);
                    }
                }
                Op::Reveal => {
                    if let Some(id) = active {
                        let _ = session.reveal(id);
                    }
                }
                Op::Expire => {
                    session.expire_turn(session.turn_seq());
                }
                Op::Disconnect(idx) => {
                    if let Some((id, connection)) = seats.get(idx).copied() {
                        let waiting = session.status() == SessionStatus::Waiting;
                        if !session.disconnect(id, connection).is_empty() && waiting {
                            // Outside a hand the player walks away with their stack.
                            expected = chips_in_play(&session);
                        }
                    }
                }
                Op::Rejoin(idx) => {
                    if let Some(seat) = seats.get_mut(idx) {
                        let connection = ConnectionId::new();
                        let rejoined = session
                            .reconnect_token(seat.0)
                            .is_some_and(|token| session.rejoin(seat.0, token, connection).is_ok());
                        if rejoined {
                            seat.1 = connection;
                        }
                    }
                }
                Op::Leave(idx) => {
                    if let Some((id, _)) = seats.get(idx).copied() {
                        let waiting = session.status() == SessionStatus::Waiting;
                        if session.leave(id).is_ok() && waiting {
                            expected = chips_in_play(&session);
                        }
                    }
                }
                Op::Reset => {
                    if !session.reset_for_next_round().is_empty() {
                        // Departed players are gone and empty stacks are
                        // replenished, so the next hand starts a new tally.
                        expected = chips_in_play(&session);
                    }
                }
                Op::Start(seed) => {
                    if let Some(host) = session.host() {
                        let deck = Deck::shuffled_with(&mut StdRng::seed_from_u64(seed));
                        if session.start_game_with_deck(host, deck).is_ok() {
                            expected = chips_in_play(&session);
                        }
                    }
                }
            }

            prop_assert!(session.check_invariants().is_ok(), "{:?}", session.check_invariants());
            prop_assert_eq!(chips_in_play(&session), expected);

            match session.status() {
                SessionStatus::Betting => {
                    let active = session.active_player().unwrap();
                    prop_assert!(session.player(active).unwrap().can_act());
                }
                SessionStatus::Waiting | SessionStatus::Settling => {
                    prop_assert_eq!(session.pot(), 0);
                    prop_assert!(session.active_player().is_none());
                }
                SessionStatus::Dealing | SessionStatus::Showdown => {
                    prop_assert!(false, "transient status {} observed", session.status());
                }
            }
        }
    }

    #[test]
    fn test_leaving_between_hands_takes_the_stack(
        balances in prop::collection::vec(1u32..500, 5),
        players in 2usize..=5,
        leaver in 0usize..5,
    ) {
        let (mut session, seats) = seated(players, &balances);
        let before = chips_in_play(&session);
        let idx = leaver % players;

        session.leave(seats[idx].0).unwrap();

        prop_assert_eq!(chips_in_play(&session), before - balances[idx]);
        prop_assert!(session.player(seats[idx].0).is_none());
        prop_assert!(session.check_invariants().is_ok());
    }

    #[test]
    fn test_settled_hand_pays_out_the_whole_pot(
        balances in prop::collection::vec(10u32..500, 5),
        players in 2usize..=5,
        seed in any::<u64>(),
    ) {
        let (mut session, _) = seated(players, &balances);
        let host = session.host().unwrap();
        let deck = Deck::shuffled_with(&mut StdRng::seed_from_u64(seed));
        session.start_game_with_deck(host, deck).unwrap();
        let total: Chips = balances[..players].iter().sum();

        // Everyone calls or checks until the hand is shown down.
        while session.status() == SessionStatus::Betting {
            let id = session.active_player().unwrap();
            let player = session.player(id).unwrap();
            let to_call = session.current_bet().saturating_sub(player.round_bet);
            if to_call == 0 {
                session.check(id).unwrap();
            } else {
                session.bet(id, to_call.min(player.balance)).unwrap();
            }
        }

        prop_assert_eq!(session.status(), SessionStatus::Settling);
        prop_assert_eq!(session.pot(), 0);
        let balances: Chips = session.players().iter().map(|p| p.balance).sum();
        prop_assert_eq!(balances, total);
    }
}
