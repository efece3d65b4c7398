use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use rand::{SeedableRng, rngs::StdRng};
use teen_patti::{
    Card, ConnectionId, Deck, PlayerId, RoomConfig, RoomId, Session,
    cards::Suit,
    hand::{evaluate, winners},
};

/// Session with `n_players` seated and a hand dealt
fn setup_session(n_players: usize) -> (Session, Vec<PlayerId>) {
    let config = RoomConfig {
        max_players: n_players.max(2),
        shuffle_turn_order: false,
        ..Default::default()
    };
    let mut session = Session::new(RoomId::from("BENCH1"), config);
    let ids: Vec<PlayerId> = (0..n_players)
        .map(|i| {
            session
                .join(&format!("player{i}"), None, ConnectionId::new())
                .unwrap()
                .0
        })
        .collect();
    let deck = Deck::shuffled_with(&mut StdRng::seed_from_u64(7));
    session.start_game_with_deck(ids[0], deck).unwrap();
    (session, ids)
}

fn bench_hand_eval(c: &mut Criterion) {
    let trail = [Card(14, Suit::Spade), Card(14, Suit::Heart), Card(14, Suit::Club)];
    let high_card = [Card(13, Suit::Spade), Card(9, Suit::Heart), Card(4, Suit::Club)];

    c.bench_function("hand_eval_trail", |b| {
        b.iter(|| evaluate(&trail));
    });
    c.bench_function("hand_eval_high_card", |b| {
        b.iter(|| evaluate(&high_card));
    });
}

/// Evaluate every hand dealt from a full deck
fn bench_hand_eval_full_deal(c: &mut Criterion) {
    let mut deck = Deck::shuffled_with(&mut StdRng::seed_from_u64(42));
    let hands = deck.deal(17).unwrap();

    c.bench_function("hand_eval_17_hands", |b| {
        b.iter(|| hands.iter().map(evaluate).collect::<Vec<_>>());
    });
}

fn bench_hand_comparison(c: &mut Criterion) {
    let mut deck = Deck::shuffled_with(&mut StdRng::seed_from_u64(3));
    let hands: Vec<_> = deck.deal(8).unwrap().iter().map(evaluate).collect();

    c.bench_function("hand_comparison_8_hands", |b| {
        b.iter(|| winners(&hands));
    });
}

fn bench_shuffle_and_deal(c: &mut Criterion) {
    c.bench_function("shuffle_and_deal_5_hands", |b| {
        let mut rng = StdRng::seed_from_u64(11);
        b.iter(|| {
            let mut deck = Deck::shuffled_with(&mut rng);
            deck.deal(5).unwrap()
        });
    });
}

/// Benchmark view generation with different player counts
fn bench_view_generation(c: &mut Criterion) {
    let mut group = c.benchmark_group("view_generation");

    for n_players in [2, 5, 10, 17].iter() {
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{n_players}_players")),
            n_players,
            |b, &n| {
                let (session, ids) = setup_session(n);
                b.iter(|| session.view_for(Some(ids[0])));
            },
        );
    }

    group.finish();
}

/// Benchmark a full betting round where everyone checks
fn bench_betting_round(c: &mut Criterion) {
    let mut group = c.benchmark_group("betting_round");

    for n_players in [2, 5, 10].iter() {
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{n_players}_players")),
            n_players,
            |b, &n| {
                b.iter_batched(
                    || setup_session(n).0,
                    |mut session| {
                        while session.betting_round() == 1 {
                            let Some(id) = session.active_player() else {
                                break;
                            };
                            session.check(id).unwrap();
                        }
                        session
                    },
                    criterion::BatchSize::SmallInput,
                );
            },
        );
    }

    group.finish();
}

criterion_group!(
    hand_evaluation,
    bench_hand_eval,
    bench_hand_eval_full_deal,
    bench_hand_comparison,
    bench_shuffle_and_deal,
);

criterion_group!(session_operations, bench_view_generation, bench_betting_round);

criterion_main!(hand_evaluation, session_operations);
