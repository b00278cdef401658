//! Saved games (`*.qpn`): a JSON document holding the dots and the text of
//! every function slot.

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::board::{Board, Dot, DotKind};
use crate::config::LoadPolicy;
use crate::error::PersistenceError;
use crate::scoring;

pub const DATA_VERSION: &str = "1";
pub const FILE_EXTENSION: &str = "qpn";

fn default_weight() -> u32 {
    1
}

fn is_false(value: &bool) -> bool {
    !*value
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DotRecord {
    pub x: f64,
    pub y: f64,
    pub radius: f64,
    pub kind: String,
    #[serde(default = "default_weight")]
    pub weight: u32,
    #[serde(default, skip_serializing_if = "is_false")]
    pub hit: bool,
}

impl DotRecord {
    fn from_dot(dot: &Dot) -> Self {
        let kind = match dot.kind() {
            DotKind::Good => "good",
            DotKind::Bad => "bad",
        };
        Self {
            x: dot.x(),
            y: dot.y(),
            radius: dot.radius(),
            kind: kind.to_string(),
            weight: dot.weight(),
            hit: dot.is_hit(),
        }
    }

    fn to_dot(&self, index: usize) -> Result<Dot, PersistenceError> {
        let invalid = |what: &str| PersistenceError::Invalid(format!("dot {index}: {what}"));
        let kind = match self.kind.as_str() {
            "good" => DotKind::Good,
            "bad" => DotKind::Bad,
            other => return Err(invalid(&format!("unknown kind '{other}'"))),
        };
        if !self.x.is_finite() || !self.y.is_finite() {
            return Err(invalid("coordinates must be finite"));
        }
        if !(self.radius.is_finite() && self.radius > 0.0) {
            return Err(invalid("radius must be positive"));
        }
        Ok(Dot::new(self.x, self.y, kind)
            .with_radius(self.radius)
            .with_weight(self.weight)
            .with_hit(self.hit))
    }
}

/// Serialized form of a board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameDocument {
    pub data_version: String,
    /// Seconds since the Unix epoch.
    #[serde(default)]
    pub creation_time: u64,
    pub dots: Vec<DotRecord>,
    #[serde(default)]
    pub functions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<i64>,
}

impl GameDocument {
    pub fn from_board(board: &Board) -> Self {
        let creation_time = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        Self {
            data_version: DATA_VERSION.to_string(),
            creation_time,
            dots: board.dots().iter().map(DotRecord::from_dot).collect(),
            functions: board.texts(),
            score: Some(board.score()),
        }
    }

    pub fn from_json(text: &str) -> Result<Self, PersistenceError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_json(&self) -> Result<String, PersistenceError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Checks the document against a board with `slot_count` slots and
    /// returns its dots.
    pub fn validate(&self, slot_count: usize) -> Result<Vec<Dot>, PersistenceError> {
        if self.data_version != DATA_VERSION {
            return Err(PersistenceError::Invalid(format!(
                "unsupported data version '{}'",
                self.data_version
            )));
        }
        if self.functions.len() > slot_count {
            return Err(PersistenceError::Invalid(format!(
                "{} functions do not fit into {slot_count} slots",
                self.functions.len()
            )));
        }
        self.dots
            .iter()
            .enumerate()
            .map(|(i, record)| record.to_dot(i))
            .collect()
    }

    /// Replaces the board's game with this document. On error the board is
    /// left as it was.
    pub fn apply(&self, board: &mut Board, policy: LoadPolicy) -> Result<(), PersistenceError> {
        let dots = self.validate(board.slots().len())?;
        let result = match policy {
            LoadPolicy::Recompute => board.reload(dots, &self.functions),
            LoadPolicy::RestoreHits => {
                let restored = scoring::score(&dots);
                if let Some(saved) = self.score.filter(|&saved| saved != restored) {
                    return Err(PersistenceError::Invalid(format!(
                        "saved score {saved} does not match hit dots ({restored})"
                    )));
                }
                board.restore(dots, &self.functions)
            }
        };
        result.map_err(|e| PersistenceError::Invalid(e.to_string()))
    }
}

/// Storage for saved games, addressed by an id.
pub trait Repository {
    fn write(&mut self, id: &str, text: &str) -> Result<(), PersistenceError>;
    fn read(&self, id: &str) -> Result<String, PersistenceError>;

    fn save(&mut self, board: &Board, id: &str) -> Result<(), PersistenceError> {
        let text = GameDocument::from_board(board).to_json()?;
        self.write(id, &text)
    }

    fn load(&self, id: &str) -> Result<GameDocument, PersistenceError> {
        GameDocument::from_json(&self.read(id)?)
    }
}

/// Games stored as files below a root directory. Ids without an extension
/// get `.qpn`.
#[derive(Debug, Clone)]
pub struct DiskRepository {
    root: PathBuf,
}

impl DiskRepository {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path_for(&self, id: &str) -> PathBuf {
        let mut path = self.root.join(id);
        if path.extension().is_none() {
            path.set_extension(FILE_EXTENSION);
        }
        path
    }
}

impl Default for DiskRepository {
    fn default() -> Self {
        Self::new(".")
    }
}

fn io_error(path: &Path, source: std::io::Error) -> PersistenceError {
    if source.kind() == ErrorKind::NotFound {
        PersistenceError::NotFound(path.display().to_string())
    } else {
        PersistenceError::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

impl Repository for DiskRepository {
    fn write(&mut self, id: &str, text: &str) -> Result<(), PersistenceError> {
        let path = self.path_for(id);
        fs::write(&path, text).map_err(|e| io_error(&path, e))
    }

    fn read(&self, id: &str) -> Result<String, PersistenceError> {
        let path = self.path_for(id);
        fs::read_to_string(&path).map_err(|e| io_error(&path, e))
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryRepository {
    games: HashMap<String, String>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.games.len()
    }

    pub fn is_empty(&self) -> bool {
        self.games.is_empty()
    }
}

impl Repository for MemoryRepository {
    fn write(&mut self, id: &str, text: &str) -> Result<(), PersistenceError> {
        self.games.insert(id.to_string(), text.to_string());
        Ok(())
    }

    fn read(&self, id: &str) -> Result<String, PersistenceError> {
        self.games
            .get(id)
            .cloned()
            .ok_or_else(|| PersistenceError::NotFound(id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::SlotId;

    fn board() -> Board {
        let mut board = Board::new(
            vec![Dot::good(1.0, 1.0), Dot::bad(2.5, 5.0).with_weight(2)],
            3,
        );
        board.set_slot_text(SlotId(1), "x").unwrap();
        board.set_slot_text(SlotId(3), "sin(").unwrap();
        board
    }

    #[test]
    fn document_mirrors_board() {
        let doc = GameDocument::from_board(&board());
        assert_eq!(doc.data_version, "1");
        assert_eq!(doc.functions, vec!["x", "", "sin("]);
        assert_eq!(doc.dots[1].kind, "bad");
        assert_eq!(doc.dots[1].weight, 2);
        assert_eq!(doc.score, Some(0));
    }

    #[test]
    fn save_then_load_restores_texts_and_dots() {
        let mut repo = MemoryRepository::new();
        let original = board();
        repo.save(&original, "game").unwrap();

        let mut loaded = Board::new(vec![], 3);
        repo.load("game").unwrap().apply(&mut loaded, LoadPolicy::Recompute).unwrap();
        assert_eq!(loaded.texts(), original.texts());
        assert_eq!(loaded.dots(), original.dots());
        assert_eq!(loaded.errors().len(), 1);
    }

    #[test]
    fn missing_fields_take_defaults() {
        let doc = GameDocument::from_json(
            r#"{"dataVersion": "1", "dots": [{"x": 0, "y": 0, "radius": 0.25, "kind": "good"}]}"#,
        )
        .unwrap();
        assert_eq!(doc.dots[0].weight, 1);
        assert!(!doc.dots[0].hit);
        assert!(doc.functions.is_empty());
        assert_eq!(doc.score, None);
    }

    #[test]
    fn invalid_documents_leave_board_alone() {
        let mut target = board();
        let before = target.clone();
        let cases = [
            r#"{"dataVersion": "2", "dots": []}"#,
            r#"{"dataVersion": "1", "dots": [{"x": 0, "y": 0, "radius": 0.25, "kind": "ugly"}]}"#,
            r#"{"dataVersion": "1", "dots": [{"x": 0, "y": 0, "radius": 0, "kind": "good"}]}"#,
            r#"{"dataVersion": "1", "dots": [], "functions": ["x", "x", "x", "x"]}"#,
            r#"{"dataVersion": "1", "dots": [{"x": 0, "y": 0, "radius": 1, "kind": "good", "hit": true}], "score": 5}"#,
        ];
        for text in cases {
            let doc = GameDocument::from_json(text).unwrap();
            let result = doc.apply(&mut target, LoadPolicy::RestoreHits);
            assert!(matches!(result, Err(PersistenceError::Invalid(_))), "{text}");
            assert_eq!(target, before);
        }
        assert!(matches!(GameDocument::from_json("{"), Err(PersistenceError::Json(_))));
    }

    #[test]
    fn load_policy_decides_about_hits() {
        let text = r#"{"dataVersion": "1", "dots": [
            {"x": 0, "y": 0, "radius": 0.25, "kind": "good", "hit": true},
            {"x": 1, "y": 1, "radius": 0.25, "kind": "bad"}
        ], "functions": ["x"], "score": 1}"#;
        let doc = GameDocument::from_json(text).unwrap();

        let mut restored = Board::new(vec![], 2);
        doc.apply(&mut restored, LoadPolicy::RestoreHits).unwrap();
        assert!(restored.dots()[0].is_hit());
        assert_eq!(restored.score(), 1);

        let mut recomputed = Board::new(vec![], 2);
        doc.apply(&mut recomputed, LoadPolicy::Recompute).unwrap();
        assert!(!recomputed.dots()[0].is_hit());
        assert_eq!(recomputed.score(), 0);
    }

    #[test]
    fn unknown_id_is_not_found() {
        let repo = MemoryRepository::new();
        assert!(matches!(repo.load("nope"), Err(PersistenceError::NotFound(_))));
        assert!(repo.is_empty());
    }

    #[test]
    fn disk_ids_get_the_game_extension() {
        let repo = DiskRepository::new("/tmp/games");
        assert_eq!(repo.path_for("level1"), PathBuf::from("/tmp/games/level1.qpn"));
        assert_eq!(repo.path_for("level1.json"), PathBuf::from("/tmp/games/level1.json"));
    }
}
