//! The conversation service.
//!
//! [`TalkManager`] owns every piece of dialogue state: the quest topic
//! registry, the rumor mill, post-quest greetings, the work pool, the current
//! session and the assembled topic lists. The host constructs one, keeps it
//! for the whole game, and passes a [`TalkContext`] into every call that
//! needs text, quests, factions or the player.

use chrono::Utc;
use indexmap::IndexMap;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, warn};

use crate::buildings::{BuildingDirectory, CompassDirection, REGIONAL_TABLE};
use crate::config::TalkConfig;
use crate::error::{Result, TalkError};
use crate::events::WorldEvent;
use crate::registry::{QuestResourceKind, QuestTopicRegistry};
use crate::reputation::compute_disposition;
use crate::responses::{
    DOES_NOT_KNOW, HINT_DIRECTION, HINT_ON_MAP, KNOWS, NO_RESPONSE, PLAYER_FOLLOW_UP,
    PLAYER_GREETING, QUESTION_NEWS, QUESTION_TELL_ME_ABOUT, QUESTION_WHERE_IS, REGIONAL_FOUND,
    REGIONAL_NOT_FOUND, WORK_AVAILABLE, WORK_NONE, WORK_TOPIC, greeting_record,
    organization_info_record, refusal_record,
};
use crate::rumor::{RumorKind, RumorMill};
use crate::session::{ConversationSession, Gate, NpcTarget};
use crate::snapshot::ConversationSnapshot;
use crate::text::{MacroSource, TextKey, TextProvider};
use crate::topics::{
    QuestionCategory, TopicItem, TopicListKind, TopicLists, TopicRef, assemble_location_list,
    assemble_person_list, assemble_tell_me_about,
};
use crate::types::{
    BuildingKey, FactionId, Gender, GuildGroup, MobileId, NpcIdentity, QuestId, RecordId,
    SocialGroup, TalkTone, TokenSeq, tokens_to_string,
};
use crate::work::{NpcWorkEntry, NpcWorkPool};
use crate::world::{DialogReveal, LocationSnapshot, PlayerState, ResourceHandle, TalkContext};

// ---------------------------------------------------------------------------
// Targets and outcomes
// ---------------------------------------------------------------------------

/// An NPC placed in a building.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticNpc {
    /// Name seed, stable for the NPC's lifetime.
    pub name_seed: i32,
    /// Faction the NPC belongs to.
    pub faction_id: FactionId,
    /// Gender.
    pub gender: Gender,
    /// Display name.
    pub display_name: String,
}

/// A wandering NPC.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MobileNpc {
    /// Runtime identity.
    pub id: MobileId,
    /// Display name.
    pub name: String,
    /// Gender.
    pub gender: Gender,
}

/// What happens after the player clicks an NPC.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetOutcome {
    /// Talk normally. `same_target` is set if nothing changed.
    Talk {
        /// The NPC already was the target.
        same_target: bool,
    },
    /// The NPC offers work; the host shows a quest offer instead of talking.
    OfferWork(NpcWorkEntry),
}

/// Result of trying to open the dialogue window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConverseOutcome {
    /// The NPC talks.
    Open,
    /// The NPC refuses with this line.
    Refused(String),
}

// ---------------------------------------------------------------------------
// Manager
// ---------------------------------------------------------------------------

/// The dialogue topic and reputation engine.
#[derive(Debug)]
pub struct TalkManager<R = StdRng> {
    config: TalkConfig,
    rng: R,
    registry: QuestTopicRegistry,
    rumor_mill: RumorMill,
    post_quest_messages: IndexMap<QuestId, TokenSeq>,
    work: NpcWorkPool,
    selected_questor: Option<i32>,
    session: ConversationSession,
    current_question: Option<TopicItem>,
    lists: TopicLists,
    lists_stale: bool,
    location: LocationSnapshot,
    buildings: BuildingDirectory,
    discovered: Vec<BuildingKey>,
}

impl TalkManager<StdRng> {
    /// Create a manager seeded from system entropy.
    #[must_use]
    pub fn new(config: TalkConfig) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }
}

impl<R: Rng> TalkManager<R> {
    /// Create a manager drawing randomness from `rng`.
    pub fn with_rng(config: TalkConfig, rng: R) -> Self {
        Self {
            config,
            rng,
            registry: QuestTopicRegistry::new(),
            rumor_mill: RumorMill::new(),
            post_quest_messages: IndexMap::new(),
            work: NpcWorkPool::new(),
            selected_questor: None,
            session: ConversationSession::new(),
            current_question: None,
            lists: TopicLists::default(),
            lists_stale: true,
            location: LocationSnapshot::default(),
            buildings: BuildingDirectory::default(),
            discovered: Vec::new(),
        }
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &TalkConfig {
        &self.config
    }

    /// Quest topics.
    #[must_use]
    pub fn registry(&self) -> &QuestTopicRegistry {
        &self.registry
    }

    /// The rumor pool.
    #[must_use]
    pub fn rumor_mill(&self) -> &RumorMill {
        &self.rumor_mill
    }

    /// The current session.
    #[must_use]
    pub fn session(&self) -> &ConversationSession {
        &self.session
    }

    /// NPCs offering work, as last built.
    #[must_use]
    pub fn work_pool(&self) -> &NpcWorkPool {
        &self.work
    }

    /// The current location.
    #[must_use]
    pub fn location(&self) -> &LocationSnapshot {
        &self.location
    }

    /// Buildings of the current location.
    #[must_use]
    pub fn buildings(&self) -> &BuildingDirectory {
        &self.buildings
    }

    // -----------------------------------------------------------------------
    // Location
    // -----------------------------------------------------------------------

    /// Switch to a new location: index its buildings and mark topic lists
    /// stale. The work pool is rebuilt the next time it is consulted.
    ///
    /// # Errors
    /// Returns [`TalkError::DuplicateBuildingKey`] if the snapshot is corrupt;
    /// the previous location stays in effect then.
    pub fn enter_location(&mut self, location: LocationSnapshot) -> Result<()> {
        self.buildings = BuildingDirectory::new(location.buildings.clone())?;
        debug!(
            location = %location.name,
            index = location.location_index,
            buildings = self.buildings.len(),
            "Entered location"
        );
        self.location = location;
        self.lists_stale = true;
        Ok(())
    }

    /// React to a world event.
    ///
    /// # Errors
    /// See [`TalkManager::enter_location`].
    pub fn handle_world_event(&mut self, event: &WorldEvent) -> Result<()> {
        self.enter_location(event.location().clone())
    }

    /// Buildings revealed on the map since the last call.
    pub fn take_discovered_buildings(&mut self) -> Vec<BuildingKey> {
        std::mem::take(&mut self.discovered)
    }

    // -----------------------------------------------------------------------
    // Rumor mill
    // -----------------------------------------------------------------------

    /// Seed common rumors into an empty mill.
    pub fn setup_common_rumors(&mut self, text: &dyn TextProvider) {
        self.rumor_mill
            .setup_common_rumors(self.config.rumors.common_rumor_count, text, &mut self.rng);
    }

    /// Add a rumor for a quest. The mill is seeded first if empty.
    pub fn add_quest_rumor(&mut self, text: &dyn TextProvider, quest: QuestId, variants: Vec<TokenSeq>) {
        self.setup_common_rumors(text);
        self.rumor_mill.add_quest_rumor(quest, variants);
    }

    /// Set the progress rumor of a quest. The mill is seeded first if empty.
    pub fn add_or_replace_quest_progress_rumor(
        &mut self,
        text: &dyn TextProvider,
        quest: QuestId,
        variants: Vec<TokenSeq>,
    ) {
        self.setup_common_rumors(text);
        self.rumor_mill.add_or_replace_quest_progress_rumor(quest, variants);
    }

    /// Remove the rumor-mill entries of a quest.
    pub fn remove_quest_rumors(&mut self, quest: QuestId) {
        self.rumor_mill.remove_quest_rumors(quest);
    }

    /// Remove the progress rumor of a quest.
    pub fn remove_quest_progress_rumors(&mut self, quest: QuestId) {
        self.rumor_mill.remove_quest_progress_rumors(quest);
    }

    /// Answer "any news?" with a random rumor.
    ///
    /// # Errors
    /// Propagates data-integrity faults raised while expanding hint macros.
    pub fn news_or_rumors(&mut self, ctx: &TalkContext<'_>) -> Result<String> {
        self.setup_common_rumors(ctx.text);
        let Some(entry) = self.rumor_mill.pick(&mut self.rng).cloned() else {
            return Ok(ctx.text.localized(TextKey::ResolvingError));
        };
        match (entry.kind, entry.quest) {
            (RumorKind::QuestProgress | RumorKind::QuestRumorMill, Some(quest)) if !entry.variants.is_empty() => {
                let variant = self.rng.gen_range(0..entry.variants.len());
                Ok(self.expand_quest_tokens(ctx, quest, entry.variants[variant].clone()))
            }
            _ => {
                let tokens = entry.variants.into_iter().next().unwrap_or_default();
                self.expand_tokens(ctx, tokens)
            }
        }
    }

    // -----------------------------------------------------------------------
    // Quest topics
    // -----------------------------------------------------------------------

    /// Register a quest topic with its answers. Rumor answers also go into
    /// the rumor mill. Returns `false` if the name is empty.
    #[allow(clippy::too_many_arguments)]
    pub fn add_quest_topic(
        &mut self,
        text: &dyn TextProvider,
        quest: QuestId,
        resource: Option<ResourceHandle>,
        name: &str,
        kind: QuestResourceKind,
        info_answers: Vec<TokenSeq>,
        rumor_answers: Vec<TokenSeq>,
    ) -> bool {
        let rumors = rumor_answers.clone();
        if !self
            .registry
            .add_topic(quest, resource, name, kind, info_answers, rumor_answers)
        {
            return false;
        }
        self.lists_stale = true;
        if !rumors.is_empty() {
            self.add_quest_rumor(text, quest, rumors);
        }
        true
    }

    /// Hide a topic, and optionally the topic it links to. "Tell me about" is
    /// rebuilt right away. Returns `false` on a soft miss.
    pub fn dialog_link(
        &mut self,
        ctx: &TalkContext<'_>,
        quest: QuestId,
        name: &str,
        kind: QuestResourceKind,
        linked: Option<(&str, QuestResourceKind)>,
    ) -> bool {
        if !self.registry.dialog_link(quest, name, kind, linked) {
            return false;
        }
        self.lists.tell_me_about = assemble_tell_me_about(&self.registry, ctx.factions, ctx.text);
        true
    }

    /// Make a hidden topic available again, or with `name` unset just refresh
    /// the lists of a known quest. Returns `Ok(false)` on a soft miss.
    ///
    /// # Errors
    /// Propagates topic list rebuild faults when rebuilding immediately.
    pub fn add_dialog(
        &mut self,
        ctx: &TalkContext<'_>,
        quest: QuestId,
        name: Option<&str>,
        rebuild_immediately: bool,
    ) -> Result<bool> {
        if !self.registry.contains_quest(quest) {
            warn!(quest = %quest, "Cannot add dialog for unknown quest");
            return Ok(false);
        }
        if let Some(name) = name {
            if !self.registry.set_available(quest, name) {
                return Ok(false);
            }
        }
        if rebuild_immediately {
            self.rebuild_topic_lists(ctx)?;
        } else {
            self.lists_stale = true;
        }
        Ok(true)
    }

    /// Drop every topic of a quest.
    pub fn remove_quest_topics(&mut self, quest: QuestId) {
        self.registry.remove_quest(quest);
        self.lists_stale = true;
    }

    /// Building a quest person can currently be found in.
    ///
    /// # Errors
    /// See [`QuestTopicRegistry::person_building_key`].
    pub fn person_building_key(&self, ctx: &TalkContext<'_>, quest: QuestId, name: &str) -> Result<BuildingKey> {
        self.registry.person_building_key(quest, name, ctx.quests)
    }

    /// Set the greeting a questor uses once their quest concluded.
    pub fn add_questor_post_quest_message(&mut self, quest: QuestId, tokens: TokenSeq) {
        self.post_quest_messages.insert(quest, tokens);
    }

    /// Remove a questor's post-quest greeting.
    pub fn remove_questor_post_quest_message(&mut self, quest: QuestId) {
        self.post_quest_messages.shift_remove(&quest);
    }

    fn apply_reveals(&mut self, quest: QuestId, reveals: &[DialogReveal]) {
        for reveal in reveals {
            let hidden = self
                .registry
                .entry(quest, &reveal.name)
                .is_some_and(|e| !e.available_for_dialog);
            if hidden && self.registry.set_available(quest, &reveal.name) {
                debug!(quest = %quest, name = %reveal.name, kind = ?reveal.kind, "Revealed dialog-linked topic");
                self.lists_stale = true;
            }
        }
    }

    // -----------------------------------------------------------------------
    // Topic lists
    // -----------------------------------------------------------------------

    /// All four topic lists as last assembled.
    #[must_use]
    pub fn topic_lists(&self) -> &TopicLists {
        &self.lists
    }

    /// One topic list.
    #[must_use]
    pub fn topic_list(&self, kind: TopicListKind) -> &[TopicItem] {
        self.lists.list(kind)
    }

    /// Whether the lists wait for a rebuild.
    #[must_use]
    pub fn topic_lists_stale(&self) -> bool {
        self.lists_stale
    }

    /// Rebuild all four topic lists now.
    ///
    /// # Errors
    /// Returns [`TalkError::BuildingNotFound`] if a local quest residence is
    /// not among the location's buildings.
    pub fn rebuild_topic_lists(&mut self, ctx: &TalkContext<'_>) -> Result<()> {
        self.lists.tell_me_about = assemble_tell_me_about(&self.registry, ctx.factions, ctx.text);
        self.lists.location = assemble_location_list(
            &self.buildings,
            self.location.map_id,
            &self.registry,
            ctx.quests,
            ctx.player.region,
            ctx.text,
        )?;
        self.rebuild_person_list(ctx);
        self.lists.thing.clear();
        self.lists_stale = false;
        debug!(
            tell_me_about = self.lists.tell_me_about.len(),
            location_groups = self.lists.location.len(),
            persons = self.lists.person.len(),
            "Rebuilt topic lists"
        );
        Ok(())
    }

    fn rebuild_person_list(&mut self, ctx: &TalkContext<'_>) {
        let partner = self
            .session
            .target()
            .filter(|t| t.is_static() && ctx.player.inside)
            .map(|t| t.name.as_str());
        self.lists.person = assemble_person_list(
            &self.registry,
            ctx.quests,
            ctx.player.map_id,
            ctx.player.interior_building,
            partner,
        );
    }

    /// Forget what the current NPC knows about every topic.
    pub fn reset_npc_knowledge(&mut self) {
        self.lists.reset_knowledge();
    }

    // -----------------------------------------------------------------------
    // Session
    // -----------------------------------------------------------------------

    /// Target a placed NPC. An NPC offering work is not targeted; the host
    /// shows the offer instead.
    ///
    /// # Errors
    /// Returns [`TalkError::MissingRegionFaction`] if disposition cannot be
    /// computed.
    pub fn target_static_npc(&mut self, ctx: &TalkContext<'_>, npc: &StaticNpc) -> Result<TargetOutcome> {
        if self.is_npc_offering_quest(ctx, npc.name_seed) {
            if let Some(entry) = self.work.get(npc.name_seed) {
                return Ok(TargetOutcome::OfferWork(entry.clone()));
            }
        }
        let faction = ctx.factions.faction(npc.faction_id);
        if faction.is_none() {
            warn!(faction = npc.faction_id.0, name = %npc.display_name, "Static NPC without faction record");
        }
        let target = NpcTarget {
            identity: NpcIdentity::Static {
                name_seed: npc.name_seed,
            },
            name: npc.display_name.clone(),
            gender: npc.gender,
            social_group: faction.as_ref().map_or(SocialGroup::Commoners, |f| f.sgroup),
            guild_group: faction.as_ref().map_or(GuildGroup::None, |f| f.ggroup),
            faction_id: Some(npc.faction_id),
            face: faction.and_then(|f| f.face),
        };
        self.apply_target(ctx, target)
    }

    /// Target a wandering NPC. Wanderers are commoners without a guild.
    ///
    /// # Errors
    /// Returns [`TalkError::MissingRegionFaction`] if disposition cannot be
    /// computed.
    pub fn target_mobile_npc(&mut self, ctx: &TalkContext<'_>, npc: &MobileNpc) -> Result<TargetOutcome> {
        let target = NpcTarget {
            identity: NpcIdentity::Mobile(npc.id),
            name: npc.name.clone(),
            gender: npc.gender,
            social_group: SocialGroup::Commoners,
            guild_group: GuildGroup::None,
            faction_id: None,
            face: None,
        };
        self.apply_target(ctx, target)
    }

    fn apply_target(&mut self, ctx: &TalkContext<'_>, target: NpcTarget) -> Result<TargetOutcome> {
        if self.session.is_same_target(&target.identity) {
            let disposition = self.session.disposition();
            self.session.set_target(target, disposition);
            return Ok(TargetOutcome::Talk { same_target: true });
        }
        let disposition = compute_disposition(target.social_group, ctx.player, ctx.factions)?;
        self.session.set_target(target, disposition);
        self.current_question = None;
        self.rebuild_person_list(ctx);
        Ok(TargetOutcome::Talk { same_target: false })
    }

    /// Gate before the dialogue window opens. A new partner forgets all
    /// topic knowledge; a hostile one refuses.
    ///
    /// # Errors
    /// Returns [`TalkError::NoTarget`] without a target.
    pub fn converse(&mut self, ctx: &TalkContext<'_>) -> Result<ConverseOutcome> {
        let target = self.session.target().cloned().ok_or(TalkError::NoTarget)?;
        match self.session.gate(self.config.conversation.refusal_threshold) {
            Gate::Proceed { new_partner } => {
                if new_partner {
                    self.reset_npc_knowledge();
                }
                Ok(ConverseOutcome::Open)
            }
            Gate::Refuse { first } => {
                let record = if first {
                    refusal_record(target.guild_group, ctx.player.is_member_of(target.guild_group))
                } else {
                    NO_RESPONSE
                };
                debug!(name = %target.name, first, "NPC refused to talk");
                Ok(ConverseOutcome::Refused(self.expand_record(ctx, record)?))
            }
        }
    }

    /// Open a conversation: reset the question counter, rebuild stale topic
    /// lists and make sure the rumor mill is seeded.
    ///
    /// # Errors
    /// Propagates topic list rebuild faults.
    pub fn start_conversation(&mut self, ctx: &TalkContext<'_>) -> Result<()> {
        self.session.start_conversation();
        self.current_question = None;
        if self.lists_stale {
            self.rebuild_topic_lists(ctx)?;
        }
        self.setup_common_rumors(ctx.text);
        Ok(())
    }

    /// Close the conversation.
    pub fn end_conversation(&mut self) {
        self.session.end_conversation();
        self.current_question = None;
    }

    /// The NPC's greeting.
    ///
    /// # Errors
    /// Returns [`TalkError::NoTarget`] without a target.
    pub fn greeting_text(&mut self, ctx: &TalkContext<'_>) -> Result<String> {
        let target = self.session.target().cloned().ok_or(TalkError::NoTarget)?;
        if let Some(seed) = target.name_seed() {
            let post_quest = self
                .post_quest_messages
                .iter()
                .find(|(quest, _)| {
                    ctx.quests
                        .persons(**quest)
                        .iter()
                        .any(|p| p.questor.is_some_and(|q| q.name_seed == seed))
                })
                .map(|(quest, tokens)| (*quest, tokens.clone()));
            if let Some((quest, tokens)) = post_quest {
                return Ok(self.expand_quest_tokens(ctx, quest, tokens));
            }
        }
        let record = greeting_record(
            self.session.disposition(),
            target.guild_group,
            ctx.player.is_member_of(target.guild_group),
        );
        self.expand_record(ctx, record)
    }

    /// The player's opening line for the next question: a greeting before
    /// the first answer, a follow-up after. Cached until the next answer.
    ///
    /// # Errors
    /// Propagates data-integrity faults raised while expanding macros.
    pub fn opening_line(&mut self, ctx: &TalkContext<'_>, tone: TalkTone) -> Result<String> {
        if let Some(line) = self.session.opening_line() {
            return Ok(line.to_string());
        }
        let base = if self.session.questions_asked() == 0 {
            PLAYER_GREETING
        } else {
            PLAYER_FOLLOW_UP
        };
        let line = self.expand_record(ctx, base.offset(tone.index()))?;
        self.session.cache_opening_line(line.clone());
        Ok(line)
    }

    fn set_key_subject(&mut self, ctx: &TalkContext<'_>, item: &TopicItem) {
        let key = &mut self.session.key_subject;
        key.caption.clone_from(&item.caption);
        key.category = item.question;
        key.quest = item.quest;
        match item.question {
            QuestionCategory::LocalBuilding => key.building = item.building_key,
            QuestionCategory::Regional => {
                key.caption = key.caption.replace(
                    &ctx.text.localized(TextKey::RegionalAnyCapitalized),
                    &ctx.text.localized(TextKey::RegionalAnyLowercase),
                );
            }
            _ => {}
        }
        self.current_question = Some(item.clone());
    }

    /// The player's question for a topic.
    ///
    /// # Errors
    /// Returns [`TalkError::InvalidTopic`] unless `topic` names a leaf.
    pub fn question_text(&mut self, ctx: &TalkContext<'_>, topic: TopicRef, tone: TalkTone) -> Result<String> {
        let item = self.lists.leaf_mut(topic)?.clone();
        self.question_text_for_item(ctx, &item, tone)
    }

    /// The player's question for a topic outside the lists, such as work.
    ///
    /// # Errors
    /// Propagates data-integrity faults raised while expanding macros.
    pub fn question_text_for_item(
        &mut self,
        ctx: &TalkContext<'_>,
        item: &TopicItem,
        tone: TalkTone,
    ) -> Result<String> {
        self.set_key_subject(ctx, item);
        let record = match item.question {
            QuestionCategory::None => return Ok(String::new()),
            QuestionCategory::Thing => return Ok(ctx.text.localized(TextKey::ThingNotImplemented)),
            QuestionCategory::News => QUESTION_NEWS,
            QuestionCategory::LocalBuilding | QuestionCategory::Person | QuestionCategory::Regional => {
                QUESTION_WHERE_IS
            }
            QuestionCategory::OrganizationInfo
            | QuestionCategory::Work
            | QuestionCategory::QuestLocation
            | QuestionCategory::QuestPerson
            | QuestionCategory::QuestItem => QUESTION_TELL_ME_ABOUT,
        };
        self.expand_record(ctx, record.offset(tone.index()))
    }

    /// The NPC's answer to a topic. What the NPC knows is remembered on the
    /// topic until knowledge is reset.
    ///
    /// # Errors
    /// Returns [`TalkError::InvalidTopic`] unless `topic` names a leaf, and
    /// propagates data-integrity faults of the answer.
    pub fn answer_text(&mut self, ctx: &TalkContext<'_>, topic: TopicRef) -> Result<String> {
        let mut item = self.lists.leaf_mut(topic)?.clone();
        let answer = self.answer_text_for_item(ctx, &mut item)?;
        if let Some(slot) = self.lists.get_mut(topic).filter(|s| s.caption == item.caption) {
            slot.knowledge = item.knowledge;
        }
        Ok(answer)
    }

    /// The NPC's answer to a topic outside the lists, such as work.
    ///
    /// # Errors
    /// Propagates data-integrity faults of the answer.
    pub fn answer_text_for_item(&mut self, ctx: &TalkContext<'_>, item: &mut TopicItem) -> Result<String> {
        self.set_key_subject(ctx, item);
        let answer = match item.question {
            QuestionCategory::None => String::new(),
            QuestionCategory::News => self.news_or_rumors(ctx)?,
            QuestionCategory::OrganizationInfo => match item.index {
                Some(index) => self.expand_record(ctx, organization_info_record(index))?,
                None => ctx.text.localized(TextKey::ResolvingError),
            },
            QuestionCategory::LocalBuilding
            | QuestionCategory::Person
            | QuestionCategory::Thing
            | QuestionCategory::QuestLocation
            | QuestionCategory::QuestPerson
            | QuestionCategory::QuestItem => self.knowledge_answer(ctx, item)?,
            QuestionCategory::Regional => self.regional_answer(ctx, item)?,
            QuestionCategory::Work => self.work_answer(ctx)?,
        };
        self.session.record_question();
        Ok(answer)
    }

    fn knowledge_answer(&mut self, ctx: &TalkContext<'_>, item: &mut TopicItem) -> Result<String> {
        let knows = item
            .knowledge
            .decide(&mut self.rng, self.config.knowledge.knows_chance);
        let group = self
            .session
            .target()
            .map_or(SocialGroup::Commoners, |t| t.social_group);
        let disposition = self.session.disposition();
        let record = if knows {
            KNOWS.select(disposition, group)
        } else {
            DOES_NOT_KNOW.select(disposition, group)
        };
        self.expand_record(ctx, record)
    }

    fn regional_answer(&mut self, ctx: &TalkContext<'_>, item: &TopicItem) -> Result<String> {
        let Some(entry) = item.index.and_then(|i| REGIONAL_TABLE.get(i).copied()) else {
            return Ok(ctx.text.localized(TextKey::ResolvingError));
        };
        let chosen = {
            let towns: Vec<_> = entry
                .matching_locations(&self.location.region.locations)
                .collect();
            if towns.is_empty() {
                None
            } else {
                Some(towns[self.rng.gen_range(0..towns.len())].name.clone())
            }
        };
        match chosen {
            Some(town) => {
                debug!(service = entry.name, town = %town, "Found regional service");
                self.session.location_of_regional_building = town;
                self.expand_record(ctx, REGIONAL_FOUND)
            }
            None => self.expand_record(ctx, REGIONAL_NOT_FOUND),
        }
    }

    // -----------------------------------------------------------------------
    // Hints
    // -----------------------------------------------------------------------

    /// A random "tell me about" answer of a quest topic, quest macros
    /// expanded and dialog-linked topics revealed.
    ///
    /// # Errors
    /// Propagates data-integrity faults raised while expanding macros.
    pub fn dialog_hint(&mut self, ctx: &TalkContext<'_>, quest: QuestId, name: &str) -> Result<String> {
        self.quest_topic_answer(ctx, quest, name, false)
    }

    /// A random rumor answer of a quest topic, falling back to its "tell me
    /// about" answers.
    ///
    /// # Errors
    /// Propagates data-integrity faults raised while expanding macros.
    pub fn dialog_hint2(&mut self, ctx: &TalkContext<'_>, quest: QuestId, name: &str) -> Result<String> {
        self.quest_topic_answer(ctx, quest, name, true)
    }

    fn quest_topic_answer(
        &mut self,
        ctx: &TalkContext<'_>,
        quest: QuestId,
        name: &str,
        prefer_rumors: bool,
    ) -> Result<String> {
        let tokens = {
            let Some(entry) = self.registry.entry(quest, name) else {
                warn!(quest = %quest, name, "Dialog hint for unknown quest topic");
                return Ok(ctx.text.localized(TextKey::ResolvingError));
            };
            let answers = if prefer_rumors && !entry.rumor_answers.is_empty() {
                &entry.rumor_answers
            } else {
                &entry.info_answers
            };
            if answers.is_empty() {
                return Ok(ctx.text.localized(TextKey::ResolvingError));
            }
            answers[self.rng.gen_range(0..answers.len())].clone()
        };
        Ok(self.expand_quest_tokens(ctx, quest, tokens))
    }

    fn honorific(text: &dyn TextProvider, player: &PlayerState) -> String {
        match player.gender {
            Gender::Male => text.localized(TextKey::Sir),
            Gender::Female => text.localized(TextKey::Madam),
        }
    }

    fn key_subject_direction(&self, ctx: &TalkContext<'_>) -> String {
        self.session
            .key_subject
            .building
            .and_then(|key| self.buildings.get(key))
            .and_then(|b| CompassDirection::between(ctx.player.position, b.position))
            .map_or_else(
                || ctx.text.localized(TextKey::ResolvingError),
                |d| ctx.text.localized(d.text_key()),
            )
    }

    fn mark_key_subject_location(&mut self) -> String {
        if self.session.mark_location_on_map {
            if let Some(key) = self.session.key_subject.building {
                if self.buildings.get(key).is_some() && !self.discovered.contains(&key) {
                    debug!(building = %key, "Revealed building on map");
                    self.discovered.push(key);
                }
            }
        }
        self.session.key_subject.caption.clone()
    }

    fn location_hint(&mut self, ctx: &TalkContext<'_>) -> Result<String> {
        let chance = self.config.hints.map_reveal_chance.clamp(0.0, 1.0);
        if !ctx.player.inside && self.rng.gen_bool(chance) {
            self.session.mark_location_on_map = true;
            let answer = self.expand_record(ctx, HINT_ON_MAP);
            self.session.mark_location_on_map = false;
            answer
        } else {
            self.session.mark_location_on_map = false;
            self.expand_record(ctx, HINT_DIRECTION)
        }
    }

    fn person_hint(&mut self, ctx: &TalkContext<'_>) -> Result<String> {
        let Some(quest) = self.session.key_subject.quest else {
            return Ok(ctx.text.localized(TextKey::ResolvingError));
        };
        let name = self.session.key_subject.caption.clone();
        let key = self.registry.person_building_key(quest, &name, ctx.quests)?;
        let building_name = self
            .buildings
            .get(key)
            .map(|b| b.name.clone())
            .unwrap_or_default();

        let saved = std::mem::replace(&mut self.session.key_subject.caption, building_name);
        self.session.key_subject.building = Some(key);
        self.session.mark_location_on_map = true;
        let answer = self.location_hint(ctx);
        self.session.mark_location_on_map = false;
        self.session.key_subject.caption = saved;
        answer
    }

    // -----------------------------------------------------------------------
    // Work
    // -----------------------------------------------------------------------

    fn refresh_work_pool(&mut self, ctx: &TalkContext<'_>) {
        if self.work.is_stale_for(self.location.location_index) {
            self.work.rebuild(
                self.location.location_index,
                &self.buildings,
                ctx.factions,
                ctx.player.one_based_region(),
                self.config.work.offer_chance,
                &mut self.rng,
            );
            self.selected_questor = None;
        }
    }

    /// Whether anyone in town offers work.
    pub fn work_available(&mut self, ctx: &TalkContext<'_>) -> bool {
        self.refresh_work_pool(ctx);
        !self.work.is_empty()
    }

    /// Whether clicking this NPC should show a quest offer.
    pub fn is_npc_offering_quest(&mut self, ctx: &TalkContext<'_>, name_seed: i32) -> bool {
        self.refresh_work_pool(ctx);
        self.work.contains(name_seed) && !ctx.quests.is_last_clicked_npc_active_questor()
    }

    /// Pick a random questor from the work pool.
    pub fn set_random_questor(&mut self) {
        self.selected_questor = self.work.pick(&mut self.rng).map(|e| e.name_seed);
        if let Some(seed) = self.selected_questor {
            debug!(seed, pool = self.work.len(), "Picked random questor");
        }
    }

    fn selected_questor(&self) -> Option<&NpcWorkEntry> {
        self.selected_questor.and_then(|seed| self.work.get(seed))
    }

    /// Full name of the selected questor.
    #[must_use]
    pub fn questor_name(&self, text: &dyn TextProvider) -> Option<String> {
        self.selected_questor()
            .map(|e| text.npc_full_name(e.name_seed, e.gender))
    }

    /// Gender of the selected questor.
    #[must_use]
    pub fn questor_gender(&self) -> Option<Gender> {
        self.selected_questor().map(|e| e.gender)
    }

    /// Building the selected questor waits in.
    #[must_use]
    pub fn questor_location(&self) -> Option<&str> {
        self.selected_questor().map(|e| e.building_name.as_str())
    }

    /// Drop an NPC from the work pool.
    pub fn remove_npc_questor(&mut self, name_seed: i32) {
        if self.work.remove(name_seed).is_some() {
            debug!(seed = name_seed, "Removed questor from work pool");
        }
        if self.selected_questor == Some(name_seed) {
            self.selected_questor = None;
        }
    }

    /// Caption of the work topic.
    ///
    /// # Errors
    /// Propagates data-integrity faults raised while expanding macros.
    pub fn work_string(&mut self, ctx: &TalkContext<'_>) -> Result<String> {
        self.expand_record(ctx, WORK_TOPIC)
    }

    /// The work topic, for asking and answering outside the lists.
    ///
    /// # Errors
    /// Propagates data-integrity faults raised while expanding macros.
    pub fn work_topic(&mut self, ctx: &TalkContext<'_>) -> Result<TopicItem> {
        Ok(TopicItem::leaf(self.work_string(ctx)?, QuestionCategory::Work))
    }

    fn work_answer(&mut self, ctx: &TalkContext<'_>) -> Result<String> {
        if !self.work_available(ctx) {
            return self.expand_record(ctx, WORK_NONE);
        }
        self.set_random_questor();
        self.expand_record(ctx, WORK_AVAILABLE)
    }

    // -----------------------------------------------------------------------
    // Save/load
    // -----------------------------------------------------------------------

    /// Capture the persistent state.
    #[must_use]
    pub fn snapshot(&self) -> ConversationSnapshot {
        ConversationSnapshot {
            quest_info: self.registry.clone(),
            rumor_mill: self.rumor_mill.clone(),
            questor_post_quest_messages: self.post_quest_messages.clone(),
            npcs_with_work: self.work.entries().cloned().collect(),
            saved_at: Utc::now(),
        }
    }

    /// Restore persistent state, relinking quest topics to live resources.
    /// The work pool is taken as built for the current location. Returns the
    /// number of topics left without a live resource.
    pub fn restore(&mut self, ctx: &TalkContext<'_>, snapshot: ConversationSnapshot) -> usize {
        self.registry = snapshot.quest_info;
        let orphans = self.registry.relink(ctx.quests);
        self.rumor_mill = snapshot.rumor_mill;
        self.post_quest_messages = snapshot.questor_post_quest_messages;
        self.work = NpcWorkPool::from_entries(Some(self.location.location_index), snapshot.npcs_with_work);
        self.selected_questor = None;
        self.setup_common_rumors(ctx.text);
        self.lists.tell_me_about = assemble_tell_me_about(&self.registry, ctx.factions, ctx.text);
        self.lists_stale = true;
        info!(
            quests = self.registry.quest_count(),
            rumors = self.rumor_mill.len(),
            work = self.work.len(),
            orphans,
            saved_at = %snapshot.saved_at,
            "Restored conversation state"
        );
        orphans
    }

    // -----------------------------------------------------------------------
    // Expansion
    // -----------------------------------------------------------------------

    fn expand_record(&mut self, ctx: &TalkContext<'_>, record: RecordId) -> Result<String> {
        let tokens = ctx.text.random_tokens(record, &mut self.rng);
        if tokens.is_empty() {
            warn!(record = %record, "Text record missing");
        }
        self.expand_tokens(ctx, tokens)
    }

    /// Quest text only goes through the quest engine's expansion; `%` codes
    /// in it are left as written.
    fn expand_quest_tokens(&mut self, ctx: &TalkContext<'_>, quest: QuestId, mut tokens: TokenSeq) -> String {
        if tokens.is_empty() {
            return ctx.text.localized(TextKey::ResolvingError);
        }
        let reveals = ctx.quests.expand_quest_message(quest, &mut tokens);
        self.apply_reveals(quest, &reveals);
        tokens_to_string(&tokens)
    }

    fn expand_tokens(&mut self, ctx: &TalkContext<'_>, mut tokens: TokenSeq) -> Result<String> {
        if tokens.is_empty() {
            return Ok(ctx.text.localized(TextKey::ResolvingError));
        }
        let mut macros = Macros {
            manager: self,
            ctx: *ctx,
            error: None,
        };
        ctx.text.expand_macros(&mut tokens, &mut macros);
        if let Some(error) = macros.error {
            return Err(error);
        }
        Ok(tokens_to_string(&tokens))
    }
}

/// Macro values drawn from the manager during one expansion. Faults raised by
/// nested lookups are held until the expansion finishes.
struct Macros<'m, 'c, R> {
    manager: &'m mut TalkManager<R>,
    ctx: TalkContext<'c>,
    error: Option<TalkError>,
}

impl<R: Rng> Macros<'_, '_, R> {
    fn capture(&mut self, result: Result<String>) -> String {
        match result {
            Ok(value) => value,
            Err(error) => {
                self.error.get_or_insert(error);
                String::new()
            }
        }
    }

    fn current_quest_topic(&self) -> Option<(QuestId, String)> {
        let item = self.manager.current_question.as_ref()?;
        Some((item.quest?, item.caption.clone()))
    }
}

impl<R: Rng> MacroSource for Macros<'_, '_, R> {
    fn npc_name(&self) -> String {
        self.manager
            .session
            .target()
            .map(|t| t.name.clone())
            .unwrap_or_default()
    }

    fn key_subject(&self) -> String {
        self.manager.session.key_subject.caption.clone()
    }

    fn honorific(&self) -> String {
        TalkManager::<R>::honorific(self.ctx.text, self.ctx.player)
    }

    fn regional_location(&self) -> String {
        self.manager.session.location_of_regional_building.clone()
    }

    fn direction(&mut self) -> String {
        self.manager.key_subject_direction(&self.ctx)
    }

    fn mark_location(&mut self) -> String {
        self.manager.mark_key_subject_location()
    }

    fn location_hint(&mut self) -> String {
        let ctx = self.ctx;
        let result = self.manager.location_hint(&ctx);
        self.capture(result)
    }

    fn person_hint(&mut self) -> String {
        let ctx = self.ctx;
        let result = self.manager.person_hint(&ctx);
        self.capture(result)
    }

    fn dialog_hint(&mut self) -> String {
        let ctx = self.ctx;
        let result = match self.current_quest_topic() {
            Some((quest, name)) => self.manager.dialog_hint(&ctx, quest, &name),
            None => Ok(ctx.text.localized(TextKey::ResolvingError)),
        };
        self.capture(result)
    }

    fn dialog_hint2(&mut self) -> String {
        let ctx = self.ctx;
        let result = match self.current_quest_topic() {
            Some((quest, name)) => self.manager.dialog_hint2(&ctx, quest, &name),
            None => Ok(ctx.text.localized(TextKey::ResolvingError)),
        };
        self.capture(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buildings::BuildingType;
    use crate::text::TextTable;
    use crate::types::{MapId, MapPosition, Token};
    use crate::world::{
        BuildingSummary, FactionKind, FactionRecord, FactionTable, PersonResource, PlaceResource,
        PlaceScope, QuestBook, QuestorData, SiteDetails,
    };

    fn factions() -> FactionTable {
        let mut table = FactionTable::new();
        table.insert(FactionRecord {
            id: FactionId(201),
            kind: FactionKind::Province,
            region: 1,
            rep: 0,
            sgroup: SocialGroup::Nobility,
            ggroup: GuildGroup::None,
            name: "Daggerfall".into(),
            face: None,
        });
        table
    }

    fn text() -> TextTable {
        TextTable::new()
            .with_record(7271, &["It is %lh"])
            .with_record(7266, &["No idea."])
            .with_record(7333, &["%di of here"])
            .with_record(7332, &["marked %loc"])
    }

    fn town() -> LocationSnapshot {
        LocationSnapshot {
            location_index: 3,
            map_id: MapId(1),
            name: "Daggerfall".into(),
            buildings: vec![
                BuildingSummary {
                    key: BuildingKey(5),
                    building_type: BuildingType::Tavern,
                    name: "The Rusty Anchor".into(),
                    faction_id: FactionId(0),
                    position: MapPosition::new(10.0, 0.0),
                    occupants: Vec::new(),
                },
                BuildingSummary {
                    key: BuildingKey(8),
                    building_type: BuildingType::House1,
                    name: "Gothal's House".into(),
                    faction_id: FactionId(0),
                    position: MapPosition::new(0.0, -10.0),
                    occupants: Vec::new(),
                },
            ],
            ..LocationSnapshot::default()
        }
    }

    fn manager(map_reveal_chance: f64) -> TalkManager<StdRng> {
        let mut config = TalkConfig::default();
        config.knowledge.knows_chance = 1.0;
        config.hints.map_reveal_chance = map_reveal_chance;
        let mut manager = TalkManager::with_rng(config, StdRng::seed_from_u64(11));
        manager.enter_location(town()).expect("town");
        manager
    }

    fn mobile(name: &str) -> MobileNpc {
        MobileNpc {
            id: MobileId::new(),
            name: name.into(),
            gender: Gender::Female,
        }
    }

    #[test]
    fn direction_hint_for_local_building() {
        let (text, quests, factions, player) = (text(), QuestBook::new(), factions(), PlayerState::default());
        let ctx = TalkContext { text: &text, quests: &quests, factions: &factions, player: &player };
        let mut manager = manager(0.0);
        manager.target_mobile_npc(&ctx, &mobile("Ana")).expect("target");
        manager.start_conversation(&ctx).expect("start");

        let tavern = manager
            .topic_lists()
            .find(TopicListKind::Location, "The Rusty Anchor")
            .expect("tavern topic");
        let answer = manager.answer_text(&ctx, tavern).expect("answer");
        assert_eq!(answer, "It is east of here");
        assert!(manager.take_discovered_buildings().is_empty());
        assert_eq!(manager.session().questions_asked(), 1);
    }

    #[test]
    fn map_hint_reveals_building_once() {
        let (text, quests, factions, player) = (text(), QuestBook::new(), factions(), PlayerState::default());
        let ctx = TalkContext { text: &text, quests: &quests, factions: &factions, player: &player };
        let mut manager = manager(1.0);
        manager.target_mobile_npc(&ctx, &mobile("Ana")).expect("target");
        manager.start_conversation(&ctx).expect("start");

        let tavern = manager
            .topic_lists()
            .find(TopicListKind::Location, "The Rusty Anchor")
            .expect("tavern topic");
        assert_eq!(manager.answer_text(&ctx, tavern).expect("answer"), "It is marked The Rusty Anchor");
        manager.answer_text(&ctx, tavern).expect("answer");
        assert_eq!(manager.take_discovered_buildings(), [BuildingKey(5)]);
        assert!(!manager.session().mark_location_on_map);
    }

    #[test]
    fn indoors_never_reveals() {
        let (text, quests, factions) = (text(), QuestBook::new(), factions());
        let player = PlayerState {
            inside: true,
            ..PlayerState::default()
        };
        let ctx = TalkContext { text: &text, quests: &quests, factions: &factions, player: &player };
        let mut manager = manager(1.0);
        manager.target_mobile_npc(&ctx, &mobile("Ana")).expect("target");
        manager.start_conversation(&ctx).expect("start");
        let tavern = manager
            .topic_lists()
            .find(TopicListKind::Location, "The Rusty Anchor")
            .expect("tavern topic");
        assert_eq!(manager.answer_text(&ctx, tavern).expect("answer"), "It is east of here");
        assert!(manager.take_discovered_buildings().is_empty());
    }

    #[test]
    fn person_hint_points_at_the_questor_building() {
        let text = text().with_record(7271, &["Try %ph"]);
        let factions = factions();
        let player = PlayerState {
            map_id: MapId(1),
            ..PlayerState::default()
        };
        let mut quests = QuestBook::new();
        quests.add_person(
            QuestId(42),
            PersonResource {
                handle: ResourceHandle(1),
                display_name: "Gothal".into(),
                questor: Some(QuestorData {
                    name_seed: 77,
                    map_id: MapId(1),
                    building_key: BuildingKey(8),
                }),
                assigned_place: None,
            },
        );
        let ctx = TalkContext { text: &text, quests: &quests, factions: &factions, player: &player };
        let mut manager = manager(0.0);
        manager.add_quest_topic(
            &text,
            QuestId(42),
            Some(ResourceHandle(1)),
            "Gothal",
            QuestResourceKind::Person,
            vec![vec![Token::text("A retired soldier.")]],
            Vec::new(),
        );
        manager.target_mobile_npc(&ctx, &mobile("Ana")).expect("target");
        manager.start_conversation(&ctx).expect("start");

        let gothal = manager
            .topic_lists()
            .find(TopicListKind::Person, "Gothal")
            .expect("person topic");
        assert_eq!(manager.answer_text(&ctx, gothal).expect("answer"), "Try south of here");
        assert_eq!(manager.session().key_subject.caption, "Gothal");
    }

    #[test]
    fn person_hint_without_resource_is_fatal() {
        let text = text().with_record(7271, &["Try %ph"]);
        let (quests, factions, player) = (QuestBook::new(), factions(), PlayerState::default());
        let ctx = TalkContext { text: &text, quests: &quests, factions: &factions, player: &player };
        let mut manager = manager(0.0);
        manager.add_quest_topic(&text, QuestId(42), None, "Gothal", QuestResourceKind::Person, Vec::new(), Vec::new());
        manager.target_mobile_npc(&ctx, &mobile("Ana")).expect("target");

        let mut item = TopicItem::leaf("Gothal", QuestionCategory::Person).with_quest(QuestId(42));
        let result = manager.answer_text_for_item(&ctx, &mut item);
        assert!(matches!(result, Err(TalkError::ResourceNotFound { .. })));
    }

    #[test]
    fn regional_answer_names_a_town() {
        let text = TextTable::new()
            .with_record(10, &["Try %t."])
            .with_record(11, &["None around here."]);
        let (quests, factions, player) = (QuestBook::new(), factions(), PlayerState::default());
        let ctx = TalkContext { text: &text, quests: &quests, factions: &factions, player: &player };
        let mut manager = manager(0.0);
        let mut location = town();
        location.region.locations = vec![crate::world::RegionLocation {
            name: "Gothway Garden".into(),
            key: 1 << 12,
        }];
        manager.enter_location(location).expect("town");
        manager.target_mobile_npc(&ctx, &mobile("Ana")).expect("target");
        manager.start_conversation(&ctx).expect("start");

        let bank = manager
            .topic_lists()
            .find(TopicListKind::Location, "Any Bank")
            .expect("bank topic");
        assert_eq!(manager.answer_text(&ctx, bank).expect("answer"), "Try Gothway Garden.");
        let question = manager.question_text(&ctx, bank, TalkTone::Normal);
        assert!(question.is_ok());
        assert_eq!(manager.session().key_subject.caption, "any Bank");

        let clothing = manager
            .topic_lists()
            .find(TopicListKind::Location, "Any Clothing Store")
            .expect("clothing topic");
        assert_eq!(manager.answer_text(&ctx, clothing).expect("answer"), "None around here.");
    }

    #[test]
    fn quest_locations_outside_town_are_skipped() {
        let (text, factions, player) = (text(), factions(), PlayerState::default());
        let mut quests = QuestBook::new();
        quests.add_place(
            QuestId(5),
            PlaceResource {
                handle: ResourceHandle(2),
                site: SiteDetails {
                    map_id: MapId(9),
                    building_key: BuildingKey(99),
                    building_name: Some("Far Manor".into()),
                    location_name: "Wayrest".into(),
                    scope: PlaceScope::Local,
                },
            },
        );
        let ctx = TalkContext { text: &text, quests: &quests, factions: &factions, player: &player };
        let mut manager = manager(0.0);
        manager.add_quest_topic(
            &text,
            QuestId(5),
            Some(ResourceHandle(2)),
            "Far Manor",
            QuestResourceKind::Location,
            Vec::new(),
            Vec::new(),
        );
        manager.rebuild_topic_lists(&ctx).expect("rebuild");
        assert!(manager.topic_lists().find(TopicListKind::Location, "Far Manor").is_none());
    }
}
