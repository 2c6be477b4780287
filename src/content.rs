//! Portable rich-text document: an ordered block array plus an entity map.
//!
//! The JSON shape is the usual raw editor format:
//! `{"blocks":[{"key","text","type","depth","inlineStyleRanges","entityRanges","data"}],"entityMap":{}}`.
//! Maps are ordered so serializing the same document always yields the same text.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use uuid::Uuid;

const UNSTYLED: &str = "unstyled";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RichDocument {
    pub blocks: Vec<Block>,
    #[serde(default)]
    pub entity_map: BTreeMap<String, Entity>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub key: String,
    pub text: String,
    #[serde(rename = "type", default = "unstyled")]
    pub kind: String,
    #[serde(default)]
    pub depth: u32,
    #[serde(default)]
    pub inline_style_ranges: Vec<StyleRange>,
    #[serde(default)]
    pub entity_ranges: Vec<EntityRange>,
    #[serde(default)]
    pub data: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StyleRange {
    pub offset: u32,
    pub length: u32,
    pub style: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EntityRange {
    pub offset: u32,
    pub length: u32,
    pub key: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Entity {
    #[serde(rename = "type")]
    pub kind: String,
    pub mutability: String,
    #[serde(default)]
    pub data: Map<String, Value>,
}

fn unstyled() -> String {
    UNSTYLED.to_string()
}

fn block_key() -> String {
    Uuid::new_v4().simple().to_string()[..5].to_string()
}

impl Block {
    pub fn unstyled(text: impl Into<String>) -> Self {
        Self {
            key: block_key(),
            text: text.into(),
            kind: unstyled(),
            depth: 0,
            inline_style_ranges: Vec::new(),
            entity_ranges: Vec::new(),
            data: Map::new(),
        }
    }
}

impl RichDocument {
    /// A fresh editor holds a single empty block.
    pub fn empty() -> Self {
        Self {
            blocks: vec![Block::unstyled("")],
            entity_map: BTreeMap::new(),
        }
    }

    /// One unstyled block per line.
    pub fn from_plain_text(text: &str) -> Self {
        Self {
            blocks: text.split('\n').map(Block::unstyled).collect(),
            entity_map: BTreeMap::new(),
        }
    }

    pub fn plain_text(&self) -> String {
        self.blocks
            .iter()
            .map(|b| b.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// True when any block carries at least one character.
    pub fn has_text(&self) -> bool {
        self.blocks.iter().any(|b| !b.text.is_empty())
    }

    pub fn to_raw(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_raw(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}
