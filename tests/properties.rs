use proptest::prelude::*;

use pollynom::board::SlotResult;
use pollynom::{parse, sample_expression, Board, Dot, PlotSettings, SlotId};

fn expression() -> impl Strategy<Value = String> {
    let leaf = prop_oneof![
        Just("x".to_string()),
        Just("pi".to_string()),
        (0u32..40).prop_map(|n| n.to_string()),
        (1u32..40).prop_map(|n| format!("{}", f64::from(n) / 8.0)),
    ];
    leaf.prop_recursive(4, 24, 2, |inner| {
        prop_oneof![
            (inner.clone(), inner.clone()).prop_map(|(a, b)| format!("{a} + {b}")),
            (inner.clone(), inner.clone()).prop_map(|(a, b)| format!("({a}) - ({b})")),
            (inner.clone(), inner.clone()).prop_map(|(a, b)| format!("({a})*({b})")),
            (inner.clone(), inner.clone()).prop_map(|(a, b)| format!("({a}) / ({b})")),
            (inner.clone(), 0u32..4).prop_map(|(a, n)| format!("({a})^{n}")),
            inner.clone().prop_map(|a| format!("-({a})")),
            inner.clone().prop_map(|a| format!("sin({a})")),
            inner.clone().prop_map(|a| format!("sqrt({a})")),
            inner.clone().prop_map(|a| format!("ln({a})")),
            (inner.clone(), inner).prop_map(|(a, b)| format!("max({a}, {b})")),
        ]
    })
}

fn restricted_expression() -> impl Strategy<Value = String> {
    (expression(), -10i32..10, 1i32..10).prop_map(|(e, lo, width)| format!("{e} | {lo} <= x < {}", lo + width))
}

fn commit_all(board: &mut Board, settings: &PlotSettings) {
    let generation = board.begin_generation();
    let results = board
        .slots()
        .iter()
        .filter(|slot| slot.needs_sampling())
        .filter_map(|slot| {
            Some(SlotResult {
                slot: slot.id(),
                revision: slot.revision(),
                segments: sample_expression(slot.expression()?, settings),
            })
        })
        .collect();
    board.commit(generation, results).unwrap();
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn parsing_is_deterministic(text in prop_oneof![expression(), restricted_expression()]) {
        let first = parse(&text).unwrap();
        prop_assert_eq!(&first, &parse(&text).unwrap());
        prop_assert_eq!(&first, &parse(&first.to_string()).unwrap());
    }

    #[test]
    fn segments_hold_only_defined_finite_samples(text in prop_oneof![expression(), restricted_expression()]) {
        let settings = PlotSettings::with_range(-10.5, 10.5, 211);
        let expr = parse(&text).unwrap();
        for segment in sample_expression(&expr, &settings) {
            prop_assert!(segment.len() >= 2);
            for &(x, y) in segment.points() {
                prop_assert!(y.is_finite() && y.abs() <= settings.y_limit);
                prop_assert_eq!(expr.eval(x), Ok(y));
            }
        }
    }

    #[test]
    fn hits_only_accumulate(
        texts in prop::collection::vec(expression(), 1..4),
        cells in prop::collection::vec((-9i32..=9, -9i32..=9, any::<bool>()), 1..8),
    ) {
        let settings = PlotSettings::with_range(-10.5, 10.5, 301);
        let dots = cells
            .iter()
            .map(|&(x, y, good)| {
                if good { Dot::good(f64::from(x), f64::from(y)) } else { Dot::bad(f64::from(x), f64::from(y)) }
            })
            .collect();
        let mut board = Board::new(dots, 1);
        let mut previous = vec![false; cells.len()];
        for text in &texts {
            board.set_slot_text(SlotId(1), text).unwrap();
            commit_all(&mut board, &settings);
            let hits: Vec<bool> = board.dots().iter().map(Dot::is_hit).collect();
            for (before, now) in previous.iter().zip(&hits) {
                prop_assert!(!before || *now);
            }

            let score = board.score();
            commit_all(&mut board, &settings);
            prop_assert_eq!(board.score(), score);
            previous = hits;
        }
    }
}
