//! # Colloquy Core Library
//!
//! Game-agnostic conversation engine for NPC dialogue in open-world RPGs.
//!
//! A [`TalkManager`] drives every conversation the player has:
//!
//! - **Reputation**: how much an NPC likes the player, from regional and
//!   social group standing
//! - **Responses**: banded text records picked by disposition and social group
//! - **Rumor mill**: common rumors plus quest rumors and progress notes
//! - **Quest topics**: people, places and things quests make discussable
//! - **Topic lists**: "tell me about" and the three "where is" lists
//! - **Sessions**: targeting, refusal and per-partner topic knowledge
//! - **Work pool**: townsfolk offering quests
//!
//! The host game supplies text, quests, factions and player state through the
//! traits in [`text`] and [`world`], bundled per call into a [`TalkContext`].

#![deny(clippy::unwrap_used)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod buildings;
pub mod config;
pub mod error;
pub mod events;
pub mod manager;
pub mod registry;
pub mod reputation;
pub mod responses;
pub mod rumor;
pub mod session;
pub mod snapshot;
pub mod text;
pub mod topics;
pub mod types;
pub mod work;
pub mod world;

pub use config::TalkConfig;
pub use error::{Result, TalkError};
pub use manager::{ConverseOutcome, MobileNpc, StaticNpc, TalkManager, TargetOutcome};
pub use snapshot::ConversationSnapshot;
pub use text::{MacroSource, TextProvider, TextTable};
pub use topics::{TopicItem, TopicListKind, TopicLists, TopicRef};
pub use types::*;
pub use world::{FactionDirectory, QuestEngine, TalkContext};
