//! Property tests for shapes, the replay codec and the tick kernel.

use almost_tetris::input::InputIntent;
use almost_tetris::replay::{InputEvent, ReplayRecord};
use almost_tetris::tetromino::PIECE_KINDS;
use almost_tetris::{EngineConfig, Game, InputKind, Shape};
use proptest::prelude::*;

/// Square 0/1 matrices of size 1..=5
fn matrix() -> impl Strategy<Value = Vec<Vec<u8>>> {
    (1usize..=5).prop_flat_map(|n| prop::collection::vec(prop::collection::vec(0u8..=1, n), n))
}

fn input_kind() -> impl Strategy<Value = InputKind> {
    prop::sample::select(InputKind::all().to_vec())
}

fn intent() -> impl Strategy<Value = InputIntent> {
    (-1i8..=1, 0u32..3, any::<bool>(), prop::bool::weighted(0.05)).prop_map(
        |(move_x, move_y, rotate, hard_drop)| InputIntent {
            move_x,
            move_y,
            rotate,
            hard_drop,
        },
    )
}

fn record() -> impl Strategy<Value = ReplayRecord> {
    (
        prop::collection::vec(1u8..=PIECE_KINDS as u8, 0..200),
        prop::collection::vec((0u32..100, input_kind()), 0..300),
    )
        .prop_map(|(pieces, steps)| {
            let mut tick = 0;
            let inputs = steps
                .into_iter()
                .map(|(gap, kind)| {
                    tick += gap;
                    InputEvent { tick, kind }
                })
                .collect();
            ReplayRecord { pieces, inputs }
        })
}

proptest! {
    #[test]
    fn four_rotations_are_identity(rows in matrix()) {
        prop_assume!(rows.iter().flatten().any(|&v| v != 0));
        let shape = Shape::new(rows.as_slice()).unwrap();
        let mut turned = shape.clone();
        for _ in 0..4 {
            turned = turned.rotated().unwrap();
        }
        prop_assert_eq!(turned, shape);
    }

    #[test]
    fn bounding_box_covers_every_cell(rows in matrix()) {
        prop_assume!(rows.iter().flatten().any(|&v| v != 0));
        let shape = Shape::new(rows.as_slice()).unwrap();
        let (ox, oy) = (shape.origin_x(), shape.origin_y());
        for (x, y) in shape.cells() {
            prop_assert!(x >= ox && x < ox + shape.width());
            prop_assert!(y >= oy && y < oy + shape.height());
        }
        prop_assert!(ox + shape.width() <= shape.size());
        prop_assert!(oy + shape.height() <= shape.size());
        // The box is tight on its top-left edges
        prop_assert!(shape.cells().any(|(x, _)| x == ox));
        prop_assert!(shape.cells().any(|(_, y)| y == oy));
    }

    #[test]
    fn binary_codec_preserves_records(record in record()) {
        let decoded = ReplayRecord::from_bytes(&record.to_bytes().unwrap()).unwrap();
        prop_assert_eq!(decoded, record);
    }

    #[test]
    fn truncated_raw_streams_never_panic(record in record(), cut in 0usize..64) {
        let raw = record.encode_raw().unwrap();
        let len = raw.len().saturating_sub(cut);
        // Either a clean decode or an error, never a panic
        let _ = ReplayRecord::decode_raw(&raw[..len]);
    }

    #[test]
    fn ticks_keep_the_grid_consistent(
        seed in any::<u64>(),
        intents in prop::collection::vec(intent(), 1..400),
    ) {
        let mut game = Game::new(EngineConfig {
            seed: Some(seed),
            ..EngineConfig::default()
        })
        .unwrap();

        for intent in intents {
            if game.is_game_over() {
                break;
            }
            let points = game.score().points;
            let lines = game.score().lines;
            game.step(intent);

            prop_assert!(game.score().points >= points);
            prop_assert!(game.score().lines >= lines);
            prop_assert!(game
                .board()
                .rows()
                .flatten()
                .all(|&v| v as usize <= PIECE_KINDS));
            prop_assert!(!game.board().rows().any(|row| row.iter().all(|&v| v != 0)));

            if game.is_game_over() {
                break;
            }
            let board = game.board();
            let piece = game.piece();
            prop_assert!(piece.cells().all(|(c, r)| board.in_bounds(c, r)));
            prop_assert!(!board.collides(piece.cells()));

            let (_, shadow_y) = game.shadow();
            prop_assert!(shadow_y >= piece.y);
            prop_assert!(!board.collides(game.shadow_piece().cells()));
        }
    }
}
