use std::collections::BTreeMap;

use caissa::domain::models::{
    AnalyzedGame, Bucket, Color, GameMeta, GameResult, MoveEvaluation, RatingTier,
};
use caissa::services::{CostScoreEngine, MoveEventExtractor, WeaknessSelector};
use chrono::{Duration, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

const MIDDLEGAME: &str = "r1bq1rk1/ppp2ppp/2np1n2/2b1p3/2B1P3/2PP1N2/PP3PPP/RNBQ1RK1 w - - 0 1";
const ENDGAME: &str = "8/5pk1/6p1/8/3R4/6P1/5PK1/8 w - - 0 1";

fn synthetic_game(index: i64, moves_per_game: u32) -> AnalyzedGame {
    let moves = (1..=moves_per_game)
        .map(|n| {
            let fen = if n > 40 { ENDGAME } else { MIDDLEGAME };
            let drop = i32::try_from((u32::try_from(index).unwrap_or(0) * 37 + n * 53) % 420).unwrap_or(0);
            MoveEvaluation::new(n, fen)
                .with_moves("Qd2", if n % 3 == 0 { "Bxf7+" } else { "Re1" })
                .with_evals(40, 40 - drop)
                .with_clock(600 - n * 5)
        })
        .collect();

    AnalyzedGame {
        meta: GameMeta {
            game_id: format!("bench-{index}"),
            user_id: "bench".to_string(),
            user_color: Color::White,
            result: GameResult::Loss,
            opponent: None,
            played_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap() + Duration::hours(index),
            opening_name: Some("Ruy Lopez".to_string()),
            user_rating: Some(1400),
        },
        moves,
    }
}

fn bench_window(c: &mut Criterion) {
    let extractor = MoveEventExtractor::default();
    let scorer = CostScoreEngine::default();
    let selector = WeaknessSelector::default();
    let reflections: BTreeMap<Bucket, usize> = BTreeMap::from([(Bucket::TimeDiscipline, 2)]);

    let mut group = c.benchmark_group("cost_scoring");
    for moves_per_game in [30_u32, 60] {
        let window: Vec<AnalyzedGame> = (0..15).map(|i| synthetic_game(i, moves_per_game)).collect();
        let (events, _) = extractor.extract_window(&window, RatingTier::Intermediate);

        group.bench_with_input(BenchmarkId::new("extract_window", moves_per_game), &window, |b, window| {
            b.iter(|| extractor.extract_window(black_box(window), RatingTier::Intermediate));
        });
        group.bench_with_input(BenchmarkId::new("score", moves_per_game), &events, |b, events| {
            b.iter(|| scorer.score(black_box(events), &reflections));
        });
        group.bench_with_input(BenchmarkId::new("select", moves_per_game), &events, |b, events| {
            let scores = scorer.score(events, &reflections);
            b.iter(|| selector.select(black_box(&scores), Some(1400), None));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_window);
criterion_main!(benches);
