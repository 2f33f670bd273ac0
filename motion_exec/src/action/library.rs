//! # Action library
//!
//! The [`ActionRegistry`] trait is the only thing the dispatcher needs to resolve action names.
//! [`ActionLibrary`] is the implementation backed by the `actions.toml` parameter file.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::collections::HashMap;
use std::convert::TryFrom;
use std::sync::Arc;

use comms_if::eqpt::NUM_JOINTS;
use log::info;
use serde::Deserialize;
use util::params;

use super::{ActionCategory, ActionKind, ActionTemplate, GaitParams, Keyframe, TemplateError};

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// Resolves action names to templates.
pub trait ActionRegistry: Send + Sync {
    fn get(&self, name: &str) -> Option<Arc<ActionTemplate>>;
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// In-memory collection of templates indexed by name.
#[derive(Debug, Default, Clone)]
pub struct ActionLibrary {
    actions: HashMap<String, Arc<ActionTemplate>>,
}

/// Contents of the action library file.
#[derive(Debug, Deserialize)]
struct LibraryFile {
    action: Vec<ActionDef>,
}

/// An action as written in the library file. Exactly one of `gait` or `frames` must be given.
#[derive(Debug, Deserialize)]
struct ActionDef {
    name: String,

    category: ActionCategory,

    #[serde(default)]
    atomic: bool,

    #[serde(default = "default_repeat")]
    repeat: u32,

    gait: Option<GaitDef>,

    frames: Option<Vec<Keyframe>>,
}

#[derive(Debug, Deserialize)]
struct GaitDef {
    period_ms: u32,

    #[serde(default)]
    amplitude: [f32; NUM_JOINTS],

    #[serde(default)]
    offset: [f32; NUM_JOINTS],

    #[serde(default)]
    phase: [f32; NUM_JOINTS],
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum LibraryError {
    #[error("Could not load the action library: {0}")]
    LoadError(#[from] params::LoadError),

    #[error("Action {0} is defined more than once")]
    DuplicateName(String),

    #[error("Action {0} must have exactly one of a gait or a list of frames")]
    AmbiguousKind(String),

    #[error(transparent)]
    InvalidAction(#[from] TemplateError),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl ActionLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the library from a file in the parameters directory.
    pub fn load(path: &str) -> Result<Self, LibraryError> {
        let file: LibraryFile = params::load(path)?;
        let lib = Self::from_defs(file.action)?;
        info!("Loaded {} actions from {}", lib.len(), path);
        Ok(lib)
    }

    /// Build the library from the contents of a library file.
    pub fn from_toml_str(s: &str) -> Result<Self, LibraryError> {
        let file: LibraryFile = params::parse(s)?;
        Self::from_defs(file.action)
    }

    fn from_defs(defs: Vec<ActionDef>) -> Result<Self, LibraryError> {
        let mut lib = Self::new();
        for def in defs {
            lib.insert(ActionTemplate::try_from(def)?)?;
        }
        Ok(lib)
    }

    /// Add a template, rejecting invalid templates and duplicate names.
    pub fn insert(&mut self, template: ActionTemplate) -> Result<(), LibraryError> {
        template.validate()?;

        if self.actions.contains_key(&template.name) {
            return Err(LibraryError::DuplicateName(template.name));
        }

        self.actions
            .insert(template.name.clone(), Arc::new(template));
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Sorted list of action names.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.actions.keys().map(|k| k.as_str()).collect();
        names.sort_unstable();
        names
    }
}

impl ActionRegistry for ActionLibrary {
    fn get(&self, name: &str) -> Option<Arc<ActionTemplate>> {
        self.actions.get(name).cloned()
    }
}

impl TryFrom<ActionDef> for ActionTemplate {
    type Error = LibraryError;

    fn try_from(def: ActionDef) -> Result<Self, Self::Error> {
        let kind = match (def.gait, def.frames) {
            (Some(g), None) => ActionKind::GaitPeriodic {
                period_ms: g.period_ms,
                params: GaitParams {
                    amplitude: g.amplitude,
                    offset: g.offset,
                    phase: g.phase,
                },
            },
            (None, Some(frames)) => ActionKind::KeyframeSequence { frames },
            _ => return Err(LibraryError::AmbiguousKind(def.name)),
        };

        Ok(ActionTemplate {
            name: def.name,
            category: def.category,
            is_atomic: def.atomic,
            default_repeat_count: def.repeat,
            kind,
        })
    }
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn default_repeat() -> u32 {
    1
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::action::SHIPPED_ACTIONS;

    #[test]
    fn test_shipped_library() {
        let lib = ActionLibrary::from_toml_str(SHIPPED_ACTIONS).unwrap();

        for name in [
            "walk_forward",
            "walk_backward",
            "turn_left",
            "turn_right",
            "tracking_turn_left",
            "tracking_turn_right",
            "happy",
        ]
        .iter()
        {
            assert!(lib.get(name).is_some(), "{} missing from the library", name);
        }

        let walk = lib.get("walk_forward").unwrap();
        assert_eq!(walk.category, ActionCategory::Locomotion);
        assert_eq!(walk.duration_ms(), Some(6000));

        let happy = lib.get("happy").unwrap();
        match &happy.kind {
            ActionKind::KeyframeSequence { frames } => assert_eq!(frames.len(), 11),
            k => panic!("happy should be a keyframe sequence, got {:?}", k),
        }
        assert_eq!(happy.default_repeat_count, 1);

        assert!(lib.get("moonwalk").is_none());
    }

    #[test]
    fn test_library_errors() {
        let dup = r#"
            [[action]]
            name = "wave"
            category = "gesture"
            [action.gait]
            period_ms = 800

            [[action]]
            name = "wave"
            category = "gesture"
            [action.gait]
            period_ms = 900
        "#;
        match ActionLibrary::from_toml_str(dup) {
            Err(LibraryError::DuplicateName(n)) => assert_eq!(n, "wave"),
            r => panic!("Expected duplicate name error, got {:?}", r),
        }

        let neither = r#"
            [[action]]
            name = "nothing"
            category = "expression"
        "#;
        match ActionLibrary::from_toml_str(neither) {
            Err(LibraryError::AmbiguousKind(n)) => assert_eq!(n, "nothing"),
            r => panic!("Expected ambiguous kind error, got {:?}", r),
        }

        let zero = r#"
            [[action]]
            name = "frozen"
            category = "gesture"
            [action.gait]
            period_ms = 0
        "#;
        match ActionLibrary::from_toml_str(zero) {
            Err(LibraryError::InvalidAction(TemplateError::ZeroPeriod(n))) => {
                assert_eq!(n, "frozen")
            }
            r => panic!("Expected zero period error, got {:?}", r),
        }
    }
}
