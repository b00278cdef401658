use std::fs;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use regex::Regex;

use pollynom::{
    Coordinator, DiskRepository, Dot, DotGenerator, FixedDotGenerator, LoadPolicy, MemoryRepository,
    PersistenceError, PlotSettings, PlotState, Repository, SlotId,
};

struct TestDir {
    path: PathBuf,
}

impl TestDir {
    fn new(tag: &str) -> Self {
        let ts = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_nanos());
        let path = std::env::temp_dir().join(format!("pollynom_{tag}_{}_{}", std::process::id(), ts));
        fs::create_dir_all(&path).expect("create temp test dir");
        Self { path }
    }
}

impl Drop for TestDir {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.path);
    }
}

fn played_game(settings: PlotSettings) -> Coordinator {
    let dots = FixedDotGenerator::default().generate().unwrap();
    let mut game = Coordinator::with_dots(dots, settings).unwrap();
    game.set_texts(&["1/x", "", "5.05"]).unwrap();
    game.request_recompute();
    assert!(matches!(game.wait(), PlotState::Done(_)));
    game
}

#[test]
fn saved_file_has_expected_shape() {
    let dir = TestDir::new("shape");
    let mut repository = DiskRepository::new(&dir.path);
    played_game(PlotSettings::default())
        .save_game(&mut repository, "round")
        .unwrap();

    let text = fs::read_to_string(dir.path.join("round.qpn")).unwrap();
    assert!(Regex::new(r#""dataVersion":\s*"1""#).unwrap().is_match(&text));
    assert!(Regex::new(r#""creationTime":\s*\d+"#).unwrap().is_match(&text));
    assert!(Regex::new(r#""functions":\s*\[\s*"1/x",\s*"",\s*"5.05",\s*"",\s*""\s*\]"#)
        .unwrap()
        .is_match(&text));
    assert!(Regex::new(r#""score":\s*1"#).unwrap().is_match(&text));

    let kinds = Regex::new(r#""kind":\s*"(good|bad)""#).unwrap();
    let kinds: Vec<&str> = kinds
        .captures_iter(&text)
        .map(|c| c.get(1).map_or("", |m| m.as_str()))
        .collect();
    assert_eq!(kinds, vec!["good", "good", "good", "good", "bad"]);
}

#[test]
fn loading_recomputes_by_default() {
    let dir = TestDir::new("recompute");
    let mut repository = DiskRepository::new(&dir.path);
    played_game(PlotSettings::default())
        .save_game(&mut repository, "round.qpn")
        .unwrap();

    let mut game = Coordinator::with_dots(vec![], PlotSettings::default()).unwrap();
    game.load_game(&repository, "round.qpn").unwrap();
    assert!(matches!(game.state(), PlotState::Computing(_)));
    assert!(game.board().dots().iter().all(|d| !d.is_hit()));
    assert_eq!(game.board().slot(SlotId(3)).unwrap().text(), "5.05");

    assert!(matches!(game.wait(), PlotState::Done(_)));
    assert_eq!(game.board().score(), 1);
}

#[test]
fn restore_policy_keeps_hits_and_score() {
    let settings = PlotSettings {
        load_policy: LoadPolicy::RestoreHits,
        ..PlotSettings::default()
    };
    let mut repository = MemoryRepository::new();
    played_game(settings.clone()).save_game(&mut repository, "round").unwrap();

    let mut game = Coordinator::with_dots(vec![], settings).unwrap();
    game.load_game(&repository, "round").unwrap();
    assert_eq!(game.board().score(), 1);
    assert_eq!(game.board().dots().iter().filter(|d| d.is_hit()).count(), 3);
    assert!(game.board().slot(SlotId(1)).unwrap().needs_sampling());
}

#[test]
fn failed_load_leaves_game_untouched() {
    let dir = TestDir::new("broken");
    let repository = DiskRepository::new(&dir.path);
    fs::write(dir.path.join("broken.qpn"), r#"{"dataVersion": "1", "dots": [{"x": 0}]}"#).unwrap();
    fs::write(
        dir.path.join("ugly.qpn"),
        r#"{"dataVersion": "1", "dots": [{"x": 0, "y": 0, "radius": 0.25, "kind": "ugly"}]}"#,
    )
    .unwrap();

    let mut game = played_game(PlotSettings::default());
    let before = game.update();

    assert!(matches!(
        game.load_game(&repository, "missing"),
        Err(PersistenceError::NotFound(_))
    ));
    assert!(matches!(
        game.load_game(&repository, "broken"),
        Err(PersistenceError::Json(_))
    ));
    assert!(matches!(
        game.load_game(&repository, "ugly"),
        Err(PersistenceError::Invalid(_))
    ));
    assert_eq!(game.update(), before);
}

#[test]
fn memory_repository_round_trip_keeps_weights_and_radii() {
    let dots = vec![
        Dot::good(1.0, 2.0).with_weight(3).with_radius(0.5),
        Dot::bad(-1.0, -2.0),
    ];
    let mut game = Coordinator::with_dots(dots.clone(), PlotSettings::default()).unwrap();
    game.set_slot_text(SlotId(2), "sin(x)").unwrap();

    let mut repository = MemoryRepository::new();
    game.save_game(&mut repository, "weights").unwrap();
    let document = repository.load("weights").unwrap();
    assert_eq!(document.functions[1], "sin(x)");

    let mut loaded = Coordinator::with_dots(vec![], PlotSettings::default()).unwrap();
    loaded.load_game(&repository, "weights").unwrap();
    loaded.wait();
    assert_eq!(loaded.board().dots(), &dots[..]);
}
