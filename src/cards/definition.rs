//! Card definitions - static card data.
//!
//! `CardDefinition` holds the immutable properties of a card: its kind,
//! cost, combat stats, triggered abilities and spell script. Instance data
//! (current health, sapped flag, zone) lives in `CardInstance` and the
//! owner's zones.
//!
//! Definitions are plain serde data so designers can author them as JSON.

use serde::{Deserialize, Serialize};

use crate::core::CatalogError;
use crate::effects::Script;

/// Unique identifier for a card definition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CardId(pub u32);

impl CardId {
    /// Create a new card ID.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for CardId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Card({})", self.0)
    }
}

/// What kind of card this is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardKind {
    /// Stays on the battlefield, attacks and can be attacked.
    Creature,
    /// One-shot effect, goes to the graveyard after casting.
    Spell,
    /// Stays on the battlefield, can be attacked, never attacks or counters.
    Artifact,
}

impl CardKind {
    /// Whether cards of this kind stay on the battlefield.
    #[must_use]
    pub const fn is_permanent(self) -> bool {
        matches!(self, CardKind::Creature | CardKind::Artifact)
    }
}

/// Events that fire triggered abilities.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerEvent {
    StartTurn,
    EndTurn,
    PlayCard,
    DealDamage,
    TakeDamage,
}

impl std::fmt::Display for TriggerEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TriggerEvent::StartTurn => "start_turn",
            TriggerEvent::EndTurn => "end_turn",
            TriggerEvent::PlayCard => "play_card",
            TriggerEvent::DealDamage => "deal_damage",
            TriggerEvent::TakeDamage => "take_damage",
        };
        f.write_str(name)
    }
}

/// An ability that runs when its event fires.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggeredAbility {
    /// Event this ability listens for.
    pub trigger: TriggerEvent,

    /// Script executed when it fires.
    pub effect: Script,

    /// Text used in the game log.
    pub description: String,
}

impl TriggeredAbility {
    /// Create a triggered ability.
    pub fn new(trigger: TriggerEvent, description: impl Into<String>, effect: Script) -> Self {
        Self {
            trigger,
            effect,
            description: description.into(),
        }
    }
}

/// Which kinds of targets a creature may attack.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttackTargeting {
    pub can_target_players: bool,
    pub can_target_creatures: bool,
    pub can_target_artifacts: bool,
}

impl Default for AttackTargeting {
    fn default() -> Self {
        Self {
            can_target_players: true,
            can_target_creatures: true,
            can_target_artifacts: true,
        }
    }
}

/// Static card definition.
///
/// ## Example
///
/// ```
/// use ccg_arena::cards::{CardDefinition, CardId, CardKind};
///
/// let wolf = CardDefinition::creature(CardId::new(1), "Grey Wolf", 2, 3, 2);
///
/// assert_eq!(wolf.kind, CardKind::Creature);
/// assert!(wolf.can_counter());
/// assert!(wolf.validate().is_ok());
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardDefinition {
    /// Unique identifier for this card definition.
    pub id: CardId,

    /// Card name (log lines, display).
    pub name: String,

    /// Card kind.
    pub kind: CardKind,

    /// Energy cost to play or cast.
    pub cost: i64,

    /// Damage dealt in combat.
    #[serde(default)]
    pub attack: i64,

    /// Max and starting health for permanents.
    #[serde(default)]
    pub health: i64,

    /// Rules text.
    #[serde(default)]
    pub description: String,

    /// Abilities fired by trigger events while on the battlefield.
    #[serde(default)]
    pub triggered_abilities: Vec<TriggeredAbility>,

    /// Script run when a spell is cast.
    #[serde(default)]
    pub spell_effect: Option<Script>,

    /// What a creature may attack.
    #[serde(default)]
    pub attack_targeting: AttackTargeting,
}

impl CardDefinition {
    /// Create a definition with zero stats.
    #[must_use]
    pub fn new(id: CardId, name: impl Into<String>, kind: CardKind, cost: i64) -> Self {
        Self {
            id,
            name: name.into(),
            kind,
            cost,
            attack: 0,
            health: 0,
            description: String::new(),
            triggered_abilities: Vec::new(),
            spell_effect: None,
            attack_targeting: AttackTargeting::default(),
        }
    }

    /// Create a creature definition.
    #[must_use]
    pub fn creature(
        id: CardId,
        name: impl Into<String>,
        cost: i64,
        attack: i64,
        health: i64,
    ) -> Self {
        Self {
            attack,
            health,
            ..Self::new(id, name, CardKind::Creature, cost)
        }
    }

    /// Create an artifact definition.
    #[must_use]
    pub fn artifact(id: CardId, name: impl Into<String>, cost: i64, health: i64) -> Self {
        Self {
            health,
            ..Self::new(id, name, CardKind::Artifact, cost)
        }
    }

    /// Create a spell definition.
    #[must_use]
    pub fn spell(id: CardId, name: impl Into<String>, cost: i64, effect: Script) -> Self {
        Self {
            spell_effect: Some(effect),
            ..Self::new(id, name, CardKind::Spell, cost)
        }
    }

    /// Add a triggered ability (builder pattern).
    #[must_use]
    pub fn with_ability(mut self, ability: TriggeredAbility) -> Self {
        self.triggered_abilities.push(ability);
        self
    }

    /// Set rules text (builder pattern).
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set attack targeting rules (builder pattern).
    #[must_use]
    pub fn with_attack_targeting(mut self, targeting: AttackTargeting) -> Self {
        self.attack_targeting = targeting;
        self
    }

    /// Abilities listening for `event`, in definition order.
    pub fn abilities_for(&self, event: TriggerEvent) -> impl Iterator<Item = &TriggeredAbility> {
        self.triggered_abilities
            .iter()
            .filter(move |ability| ability.trigger == event)
    }

    /// Whether this card strikes back when attacked.
    ///
    /// Only creatures with positive attack counter; artifacts never do,
    /// whatever their attack value says.
    #[must_use]
    pub fn can_counter(&self) -> bool {
        self.kind == CardKind::Creature && self.attack > 0
    }

    /// Check the definition is playable.
    pub fn validate(&self) -> Result<(), CatalogError> {
        if self.cost < 0 {
            return Err(CatalogError::Invalid(format!("{} has negative cost", self.name)));
        }
        if self.attack < 0 {
            return Err(CatalogError::Invalid(format!("{} has negative attack", self.name)));
        }
        match self.kind {
            CardKind::Creature | CardKind::Artifact if self.health <= 0 => {
                Err(CatalogError::Invalid(format!("{} needs positive health", self.name)))
            }
            CardKind::Spell if self.spell_effect.is_none() => Err(CatalogError::Invalid(format!(
                "{} is a spell without an effect",
                self.name
            ))),
            _ => Ok(()),
        }
    }
}
